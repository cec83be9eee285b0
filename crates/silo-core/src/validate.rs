//! Bucket and object-key naming rules.
//!
//! Bucket names follow the S3 rules; object keys are restricted to a safe
//! character set so they can double as filesystem-friendly identifiers.
//! Each validator reports the first failed rule as a single human-readable
//! message.

use std::net::Ipv4Addr;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum bucket name length.
pub const BUCKET_NAME_MIN_LEN: usize = 3;

/// Maximum bucket name length.
pub const BUCKET_NAME_MAX_LEN: usize = 63;

/// Maximum object key length in UTF-8 bytes.
pub const OBJECT_KEY_MAX_BYTES: usize = 1024;

/// Four dot-separated digit groups. `Ipv4Addr::from_str` alone accepts some
/// shorthand forms, so both checks must reject before a name passes.
static IPV4_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("static pattern"));

/// Validate a bucket name against the S3-style rules.
pub fn validate_bucket_name(name: &str) -> Result<(), String> {
    let len = name.len();
    if len < BUCKET_NAME_MIN_LEN || len > BUCKET_NAME_MAX_LEN {
        return Err(format!(
            "bucket name must be between {} and {} characters",
            BUCKET_NAME_MIN_LEN, BUCKET_NAME_MAX_LEN
        ));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(
            "bucket name may only contain lowercase letters, digits, dots, and hyphens".into(),
        );
    }

    let first = name.chars().next().unwrap_or('-');
    let last = name.chars().last().unwrap_or('-');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err("bucket name must start and end with a lowercase letter or digit".into());
    }

    if name.contains("..") {
        return Err("bucket name must not contain consecutive dots".into());
    }

    if Ipv4Addr::from_str(name).is_ok() || IPV4_GROUPS.is_match(name) {
        return Err("bucket name must not be formatted like an IP address".into());
    }

    if name.starts_with("xn--") {
        return Err("bucket name must not start with the reserved prefix 'xn--'".into());
    }

    if name.ends_with("-s3alias") || name.ends_with("--ol-s3") {
        return Err("bucket name must not end with a reserved suffix".into());
    }

    Ok(())
}

/// Validate an object key (the original filename).
pub fn validate_object_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("object key must not be empty".into());
    }

    if key.len() > OBJECT_KEY_MAX_BYTES {
        return Err(format!(
            "object key must not exceed {} bytes",
            OBJECT_KEY_MAX_BYTES
        ));
    }

    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\')
    {
        return Err("object key must not contain control characters or backslashes".into());
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
    {
        return Err(
            "object key may only contain letters, digits, dots, underscores, hyphens, and slashes"
                .into(),
        );
    }

    if key.starts_with('/') || key.ends_with('/') {
        return Err("object key must not begin or end with a slash".into());
    }

    if key.contains("//") {
        return Err("object key must not contain consecutive slashes".into());
    }

    Ok(())
}

/// Percent-decode an object key exactly once.
///
/// Invalid sequences leave the input untouched; decoding is never applied
/// twice, so `%2541` becomes `%41`, not `A`.
pub fn normalize_object_key(key: &str) -> String {
    match urlencoding::decode(key) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_accepts_plain_names() {
        for name in ["abc", "invoices", "my-bucket.2024", "a1b2c3", "x".repeat(63).as_str()] {
            assert!(validate_bucket_name(name).is_ok(), "expected ok: {name}");
        }
    }

    #[test]
    fn test_bucket_rejects_length() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"x".repeat(64)).is_err());
        assert!(validate_bucket_name("").is_err());
    }

    #[test]
    fn test_bucket_rejects_charset() {
        assert!(validate_bucket_name("Invalid-Bucket").is_err());
        assert!(validate_bucket_name("under_score").is_err());
        assert!(validate_bucket_name("spa ce").is_err());
        assert!(validate_bucket_name("émoji").is_err());
    }

    #[test]
    fn test_bucket_rejects_edge_characters() {
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("trailing-").is_err());
        assert!(validate_bucket_name(".leading").is_err());
        assert!(validate_bucket_name("trailing.").is_err());
    }

    #[test]
    fn test_bucket_rejects_consecutive_dots() {
        assert!(validate_bucket_name("a..b").is_err());
    }

    #[test]
    fn test_bucket_rejects_ipv4_literals() {
        assert!(validate_bucket_name("192.168.1.1").is_err());
        assert!(validate_bucket_name("1.2.3.4").is_err());
        // Out-of-range octets still match the 4-group shape and are rejected
        assert!(validate_bucket_name("999.999.999.999").is_err());
    }

    #[test]
    fn test_bucket_accepts_dotted_non_ip() {
        assert!(validate_bucket_name("1.2.3.4.5").is_ok());
        assert!(validate_bucket_name("v1.2.3").is_ok());
    }

    #[test]
    fn test_bucket_rejects_reserved_prefix_and_suffixes() {
        assert!(validate_bucket_name("xn--bucket").is_err());
        assert!(validate_bucket_name("bucket-s3alias").is_err());
        assert!(validate_bucket_name("bucket--ol-s3").is_err());
    }

    #[test]
    fn test_bucket_error_names_the_rule() {
        let msg = validate_bucket_name("192.168.1.1").unwrap_err();
        assert!(msg.contains("IP address"), "got: {msg}");
    }

    #[test]
    fn test_key_accepts_plain_names() {
        for key in ["report.pdf", "a/b/c.txt", "under_score-dash.bin", "x"] {
            assert!(validate_object_key(key).is_ok(), "expected ok: {key}");
        }
    }

    #[test]
    fn test_key_rejects_empty_and_oversized() {
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(&"x".repeat(1025)).is_err());
        assert!(validate_object_key(&"x".repeat(1024)).is_ok());
    }

    #[test]
    fn test_key_rejects_control_chars_and_backslash() {
        assert!(validate_object_key("a\x00b").is_err());
        assert!(validate_object_key("a\nb").is_err());
        assert!(validate_object_key("a\x7fb").is_err());
        assert!(validate_object_key("a\\b").is_err());
    }

    #[test]
    fn test_key_rejects_charset() {
        assert!(validate_object_key("sp ace.txt").is_err());
        assert!(validate_object_key("q?uery").is_err());
        assert!(validate_object_key("naïve.txt").is_err());
    }

    #[test]
    fn test_key_rejects_slash_placement() {
        assert!(validate_object_key("/leading").is_err());
        assert!(validate_object_key("trailing/").is_err());
        assert!(validate_object_key("a//b").is_err());
    }

    #[test]
    fn test_reject_set_closed_under_trailing_slash() {
        // Appending a slash to any accepted key produces a rejected key.
        for key in ["report.pdf", "a/b/c.txt", "x"] {
            assert!(validate_object_key(key).is_ok());
            assert!(validate_object_key(&format!("{key}/")).is_err());
        }
    }

    #[test]
    fn test_normalize_decodes_once() {
        assert_eq!(normalize_object_key("report%20final.pdf"), "report final.pdf");
        assert_eq!(normalize_object_key("a%2Fb"), "a/b");
        // Double-encoded input is decoded a single time only
        assert_eq!(normalize_object_key("%2541"), "%41");
    }

    #[test]
    fn test_normalize_leaves_plain_keys_alone() {
        assert_eq!(normalize_object_key("report.pdf"), "report.pdf");
    }
}
