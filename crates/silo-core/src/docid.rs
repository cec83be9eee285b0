//! DocId generation and deterministic blob path construction.
//!
//! A DocId is `"{yyyy}-{uuid4}"` (41 characters). The year prefix
//! partitions the directory tree; the first four hex characters of the
//! de-hyphenated UUID fan objects out across two shard levels:
//!
//! `{root}/{year}/{b1}/{b2}/{docId}/blob.{ext}`
//!
//! Example: UUID `3f0d2a7e-…` shards into `b1 = 3f`, `b2 = 0d`.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use uuid::Uuid;

/// Total length of a DocId: 4 year digits + hyphen + 36 uuid characters.
pub const DOC_ID_LEN: usize = 41;

/// File stem of every stored blob.
pub const BLOB_FILE_STEM: &str = "blob";

/// Transient sibling written during upload, renamed into place on commit.
pub const TEMP_FILE_NAME: &str = "blob.tmp";

/// A DocId split into its validated parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDocId {
    pub year: i32,
    pub uuid: Uuid,
}

/// Generate a fresh DocId for the given year (current UTC year if absent).
pub fn generate(year: Option<i32>) -> String {
    let year = year.unwrap_or_else(|| Utc::now().year());
    format!("{}-{}", year, Uuid::new_v4())
}

/// Parse a DocId, validating shape, year digits, and UUID suffix.
pub fn parse(doc_id: &str) -> Result<ParsedDocId, String> {
    if doc_id.len() != DOC_ID_LEN {
        return Err(format!(
            "doc id must be {} characters, got {}",
            DOC_ID_LEN,
            doc_id.len()
        ));
    }

    let (year_part, rest) = doc_id.split_at(4);
    if !year_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err("doc id must start with four year digits".into());
    }
    let Some(uuid_part) = rest.strip_prefix('-') else {
        return Err("doc id must have a hyphen after the year digits".into());
    };

    let uuid = Uuid::parse_str(uuid_part).map_err(|e| format!("doc id uuid invalid: {}", e))?;
    let year: i32 = year_part.parse().map_err(|_| "doc id year invalid".to_string())?;

    Ok(ParsedDocId { year, uuid })
}

/// Extract the year partition from a DocId.
pub fn extract_year(doc_id: &str) -> Result<i32, String> {
    parse(doc_id).map(|p| p.year)
}

/// Two-level shard directories from the de-hyphenated lowercase UUID hex.
pub fn shards(uuid: &Uuid) -> (String, String) {
    let hex = uuid.as_hyphenated().to_string().replace('-', "");
    (hex[0..2].to_string(), hex[2..4].to_string())
}

/// Directory holding a DocId's blob and temp files.
pub fn blob_dir(root: &Path, doc_id: &str) -> Result<PathBuf, String> {
    let parsed = parse(doc_id)?;
    let (b1, b2) = shards(&parsed.uuid);
    Ok(root
        .join(parsed.year.to_string())
        .join(b1)
        .join(b2)
        .join(doc_id))
}

/// Final blob path inside `dir`, with any leading dot stripped from `ext`.
pub fn blob_path(dir: &Path, ext: &str) -> PathBuf {
    let ext = ext.trim_start_matches('.');
    dir.join(format!("{}.{}", BLOB_FILE_STEM, ext))
}

/// Transient upload path inside `dir`.
pub fn temp_path(dir: &Path) -> PathBuf {
    dir.join(TEMP_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_given_year() {
        let id = generate(Some(2017));
        assert!(id.starts_with("2017-"));
        assert_eq!(id.len(), DOC_ID_LEN);
    }

    #[test]
    fn test_generate_defaults_to_current_year() {
        let id = generate(None);
        let year = Utc::now().year();
        assert!(id.starts_with(&format!("{}-", year)));
    }

    #[test]
    fn test_parse_round_trip() {
        let id = generate(Some(2021));
        let parsed = parse(&id).unwrap();
        assert_eq!(parsed.year, 2021);
        assert_eq!(format!("2021-{}", parsed.uuid), id);
    }

    #[test]
    fn test_extract_year_matches_prefix() {
        let id = generate(Some(1999));
        assert_eq!(extract_year(&id).unwrap(), 1999);
    }

    #[test]
    fn test_parse_rejects_missing_hyphen() {
        assert!(parse("20213f0d2a7e-1111-4111-8111-111111111111x").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(parse("2021-3f0d2a7e").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_non_digit_year() {
        assert!(parse("abcd-3f0d2a7e-1111-4111-8111-111111111111").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_uuid() {
        assert!(parse("2021-zzzzzzzz-1111-4111-8111-111111111111").is_err());
    }

    #[test]
    fn test_shards_use_dehyphenated_hex() {
        let uuid = Uuid::parse_str("3f0d2a7e-1111-4111-8111-111111111111").unwrap();
        let (b1, b2) = shards(&uuid);
        assert_eq!(b1, "3f");
        assert_eq!(b2, "0d");
    }

    #[test]
    fn test_blob_dir_layout() {
        let dir = blob_dir(
            Path::new("/data"),
            "2021-3f0d2a7e-1111-4111-8111-111111111111",
        )
        .unwrap();
        assert_eq!(
            dir,
            Path::new("/data/2021/3f/0d/2021-3f0d2a7e-1111-4111-8111-111111111111")
        );
    }

    #[test]
    fn test_blob_path_strips_leading_dot() {
        let dir = Path::new("/data/x");
        assert_eq!(blob_path(dir, ".pdf"), Path::new("/data/x/blob.pdf"));
        assert_eq!(blob_path(dir, "pdf"), Path::new("/data/x/blob.pdf"));
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(temp_path(Path::new("/d")), Path::new("/d/blob.tmp"));
    }

    #[test]
    fn test_blob_path_reproduces_on_disk_location() {
        // Path construction is deterministic for a given DocId and extension.
        let id = generate(Some(2024));
        let a = blob_path(&blob_dir(Path::new("/r"), &id).unwrap(), "bin");
        let b = blob_path(&blob_dir(Path::new("/r"), &id).unwrap(), "bin");
        assert_eq!(a, b);
    }
}
