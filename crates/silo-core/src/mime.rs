//! Multi-layer content-type identification.
//!
//! Resolution order over the first chunk of an upload:
//!
//! 1. Magic-byte table (longest signatures first)
//! 2. ZIP refinement to OOXML types (`docx`/`xlsx`/`pptx`)
//! 3. OLE2 refinement to legacy Office types via the filename extension
//! 4. RIFF container dispatch (`WEBP`/`WAVE`/`AVI `)
//! 5. Claimed content type, if it maps to a known extension
//! 6. Filename extension
//! 7. Printable-text heuristic
//! 8. `application/octet-stream` fallback
//!
//! The identifier never fails: every input resolves to some content type,
//! and the method that produced it is recorded alongside the result.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Fallback content type when every layer comes up empty.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// How the detected content type was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Magic,
    Extension,
    Header,
    Heuristic,
    Fallback,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Magic => "magic",
            DetectionMethod::Extension => "extension",
            DetectionMethod::Header => "header",
            DetectionMethod::Heuristic => "heuristic",
            DetectionMethod::Fallback => "fallback",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "magic" => DetectionMethod::Magic,
            "extension" => DetectionMethod::Extension,
            "header" => DetectionMethod::Header,
            "heuristic" => DetectionMethod::Heuristic,
            _ => DetectionMethod::Fallback,
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of content-type identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeDetection {
    pub detected_content_type: String,
    pub detected_extension: Option<String>,
    pub method: DetectionMethod,
    pub is_mismatch: bool,
    pub is_dangerous_mismatch: bool,
}

/// Magic byte signatures, longest prefix first.
///
/// Order matters: a longer signature must win over any shorter one sharing
/// a prefix (e.g. OLE2 before BMP-style two-byte entries).
const MAGIC_SIGNATURES: &[(&[u8], &str, &str)] = &[
    (
        &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
        "application/x-ole-storage",
        "bin",
    ),
    (
        &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        "image/png",
        "png",
    ),
    (
        &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C],
        "application/x-7z-compressed",
        "7z",
    ),
    (
        &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07],
        "application/vnd.rar",
        "rar",
    ),
    (&[0x25, 0x50, 0x44, 0x46], "application/pdf", "pdf"),
    (&[0x50, 0x4B, 0x03, 0x04], "application/zip", "zip"),
    (&[0x47, 0x49, 0x46, 0x38], "image/gif", "gif"),
    (&[0x4F, 0x67, 0x67, 0x53], "audio/ogg", "ogg"),
    (&[0x66, 0x4C, 0x61, 0x43], "audio/flac", "flac"),
    (&[0x7F, 0x45, 0x4C, 0x46], "application/x-executable", "bin"),
    (&[0xFE, 0xED, 0xFA, 0xCE], "application/x-mach-binary", "bin"),
    (&[0xFE, 0xED, 0xFA, 0xCF], "application/x-mach-binary", "bin"),
    (&[0xCA, 0xFE, 0xBA, 0xBE], "application/x-mach-binary", "bin"),
    (&[0x00, 0x61, 0x73, 0x6D], "application/wasm", "bin"),
    (&[0x49, 0x49, 0x2A, 0x00], "image/tiff", "tif"),
    (&[0x4D, 0x4D, 0x00, 0x2A], "image/tiff", "tif"),
    (&[0x49, 0x44, 0x33], "audio/mpeg", "mp3"),
    (&[0xFF, 0xD8, 0xFF], "image/jpeg", "jpg"),
    (&[0x4D, 0x5A], "application/x-msdownload", "exe"),
    (&[0x1F, 0x8B], "application/gzip", "gz"),
    (&[0x42, 0x4D], "image/bmp", "bmp"),
    (&[0x23, 0x21], "text/x-shellscript", "sh"),
];

/// Content types that force `attachment` disposition when the client
/// claimed something else: executable, script, and markup classes.
static DANGEROUS_CONTENT_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "application/x-msdownload",
        "application/x-executable",
        "application/x-mach-binary",
        "application/x-msdos-program",
        "application/wasm",
        "application/java-archive",
        "text/x-shellscript",
        "application/x-sh",
        "application/x-bat",
        "text/html",
        "application/xhtml+xml",
        "text/javascript",
        "application/javascript",
        "application/x-httpd-php",
        "application/hta",
    ]
    .into_iter()
    .collect()
});

/// Known mime → canonical extension table. Serves the `header` step and,
/// inverted, the `extension` step.
static MIME_TO_EXTENSION: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("application/pdf", "pdf"),
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
        ("image/gif", "gif"),
        ("image/webp", "webp"),
        ("image/bmp", "bmp"),
        ("image/tiff", "tif"),
        ("text/plain", "txt"),
        ("text/csv", "csv"),
        ("text/html", "html"),
        ("application/json", "json"),
        ("application/xml", "xml"),
        ("text/xml", "xml"),
        ("application/zip", "zip"),
        ("application/gzip", "gz"),
        ("application/x-7z-compressed", "7z"),
        ("application/vnd.rar", "rar"),
        ("application/msword", "doc"),
        (DOCX_MIME, "docx"),
        ("application/vnd.ms-excel", "xls"),
        (XLSX_MIME, "xlsx"),
        ("application/vnd.ms-powerpoint", "ppt"),
        (PPTX_MIME, "pptx"),
        ("application/vnd.ms-outlook", "msg"),
        ("application/rtf", "rtf"),
        ("application/vnd.oasis.opendocument.text", "odt"),
        ("application/vnd.oasis.opendocument.spreadsheet", "ods"),
        ("audio/mpeg", "mp3"),
        ("audio/wav", "wav"),
        ("audio/ogg", "ogg"),
        ("audio/flac", "flac"),
        ("video/mp4", "mp4"),
        ("video/x-msvideo", "avi"),
        ("video/webm", "webm"),
        ("video/quicktime", "mov"),
        ("application/x-msdownload", "exe"),
        ("application/octet-stream", "bin"),
    ]
    .into_iter()
    .collect()
});

/// Extension → mime, inverted from [`MIME_TO_EXTENSION`] with the first
/// mapping winning for aliased mimes (`xml`), plus extension aliases.
static EXTENSION_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (mime, ext) in MIME_TO_EXTENSION.iter() {
        map.entry(*ext).or_insert(*mime);
    }
    map.insert("jpeg", "image/jpeg");
    map.insert("tiff", "image/tiff");
    map.insert("htm", "text/html");
    map.insert("log", "text/plain");
    map.insert("txt", "text/plain");
    map.insert("xml", "application/xml");
    map
});

/// Identify the content type of an upload from its first chunk.
///
/// `chunk` is the first `FirstChunkSize` bytes; `filename` and `claimed`
/// participate in the later resolution steps when present.
pub fn identify(chunk: &[u8], filename: Option<&str>, claimed: Option<&str>) -> MimeDetection {
    let (mime, ext, method) = resolve(chunk, filename, claimed);

    let is_mismatch = claimed
        .map(|c| !c.trim().eq_ignore_ascii_case(&mime))
        .unwrap_or(false);
    let is_dangerous_mismatch = is_mismatch && DANGEROUS_CONTENT_TYPES.contains(mime.as_str());

    MimeDetection {
        detected_content_type: mime,
        detected_extension: ext,
        method,
        is_mismatch,
        is_dangerous_mismatch,
    }
}

fn resolve(
    chunk: &[u8],
    filename: Option<&str>,
    claimed: Option<&str>,
) -> (String, Option<String>, DetectionMethod) {
    // 1. Magic bytes, with ZIP/OLE2 refinement on a hit.
    if let Some((mime, ext)) = match_magic(chunk) {
        let (mime, ext) = match mime {
            "application/zip" => refine_zip(chunk).unwrap_or((mime, ext)),
            "application/x-ole-storage" => refine_ole2(filename).unwrap_or((mime, ext)),
            _ => (mime, ext),
        };
        return (mime.to_string(), Some(ext.to_string()), DetectionMethod::Magic);
    }

    // 4. RIFF containers carry their format at bytes 8-11.
    if let Some((mime, ext)) = match_riff(chunk) {
        return (mime.to_string(), Some(ext.to_string()), DetectionMethod::Magic);
    }

    // 5. Claimed type, if it maps to a known extension.
    if let Some(claimed) = claimed {
        let lowered = claimed.trim().to_ascii_lowercase();
        if let Some(ext) = MIME_TO_EXTENSION.get(lowered.as_str()) {
            return (lowered, Some((*ext).to_string()), DetectionMethod::Header);
        }
    }

    // 6. Filename extension.
    if let Some(ext) = filename.and_then(extension_of) {
        if let Some(mime) = EXTENSION_TO_MIME.get(ext.as_str()) {
            return (
                (*mime).to_string(),
                Some(ext),
                DetectionMethod::Extension,
            );
        }
    }

    // 7. Printable-text heuristic.
    if looks_like_text(chunk) {
        return (
            "text/plain".to_string(),
            Some("txt".to_string()),
            DetectionMethod::Heuristic,
        );
    }

    // 8. Fallback.
    (
        OCTET_STREAM.to_string(),
        Some("bin".to_string()),
        DetectionMethod::Fallback,
    )
}

fn match_magic(chunk: &[u8]) -> Option<(&'static str, &'static str)> {
    for (prefix, mime, ext) in MAGIC_SIGNATURES {
        if chunk.len() >= prefix.len() && &chunk[..prefix.len()] == *prefix {
            return Some((mime, ext));
        }
    }
    None
}

/// Inspect local-file-header entries of a partial ZIP for OOXML markers.
///
/// The central directory sits at end-of-file and is unavailable in a first
/// chunk, so entry names are read from the local headers instead. Any
/// truncation or inconsistency simply ends the scan.
fn refine_zip(chunk: &[u8]) -> Option<(&'static str, &'static str)> {
    let mut offset = 0usize;
    while offset + 30 <= chunk.len() {
        if &chunk[offset..offset + 4] != b"PK\x03\x04" {
            break;
        }
        let flags = u16::from_le_bytes([chunk[offset + 6], chunk[offset + 7]]);
        let compressed = u32::from_le_bytes([
            chunk[offset + 18],
            chunk[offset + 19],
            chunk[offset + 20],
            chunk[offset + 21],
        ]) as usize;
        let name_len = u16::from_le_bytes([chunk[offset + 26], chunk[offset + 27]]) as usize;
        let extra_len = u16::from_le_bytes([chunk[offset + 28], chunk[offset + 29]]) as usize;

        let name_start = offset + 30;
        let name_end = name_start.checked_add(name_len)?;
        if name_end > chunk.len() {
            break;
        }

        let name = &chunk[name_start..name_end];
        if name.starts_with(b"word/") {
            return Some((DOCX_MIME, "docx"));
        }
        if name.starts_with(b"xl/") {
            return Some((XLSX_MIME, "xlsx"));
        }
        if name.starts_with(b"ppt/") {
            return Some((PPTX_MIME, "pptx"));
        }

        // Sizes deferred to a data descriptor cannot be skipped over.
        if flags & 0x0008 != 0 && compressed == 0 {
            break;
        }
        offset = name_end + extra_len + compressed;
    }
    None
}

fn refine_ole2(filename: Option<&str>) -> Option<(&'static str, &'static str)> {
    match filename.and_then(extension_of)?.as_str() {
        "doc" => Some(("application/msword", "doc")),
        "xls" => Some(("application/vnd.ms-excel", "xls")),
        "ppt" => Some(("application/vnd.ms-powerpoint", "ppt")),
        "msg" => Some(("application/vnd.ms-outlook", "msg")),
        _ => None,
    }
}

fn match_riff(chunk: &[u8]) -> Option<(&'static str, &'static str)> {
    if chunk.len() < 12 || &chunk[0..4] != b"RIFF" {
        return None;
    }
    match &chunk[8..12] {
        b"WEBP" => Some(("image/webp", "webp")),
        b"WAVE" => Some(("audio/wav", "wav")),
        b"AVI " => Some(("video/x-msvideo", "avi")),
        _ => None,
    }
}

fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// At least 85% printable ASCII (or tab/newline/carriage-return) reads as
/// plain text. Empty input never does.
fn looks_like_text(chunk: &[u8]) -> bool {
    if chunk.is_empty() {
        return false;
    }
    let printable = chunk
        .iter()
        .filter(|&&b| (0x20..=0x7E).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r')
        .count();
    printable * 100 >= chunk.len() * 85
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_entry(name: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"PK\x03\x04");
        bytes.extend_from_slice(&[0x14, 0x00]); // version
        bytes.extend_from_slice(&[0x00, 0x00]); // flags
        bytes.extend_from_slice(&[0x00, 0x00]); // method
        bytes.extend_from_slice(&[0u8; 8]); // time, date, crc
        bytes.extend_from_slice(&0u32.to_le_bytes()); // compressed size
        bytes.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // extra length
        bytes.extend_from_slice(name);
        bytes
    }

    #[test]
    fn test_magic_detects_pdf() {
        let result = identify(b"%PDF-1.4\nrest", Some("report.pdf"), None);
        assert_eq!(result.detected_content_type, "application/pdf");
        assert_eq!(result.detected_extension.as_deref(), Some("pdf"));
        assert_eq!(result.method, DetectionMethod::Magic);
        assert!(!result.is_mismatch);
    }

    #[test]
    fn test_magic_overrides_extension_and_claim() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        let result = identify(&png, Some("fake.txt"), Some("text/plain"));
        assert_eq!(result.detected_content_type, "image/png");
        assert!(result.is_mismatch);
        assert!(!result.is_dangerous_mismatch);
    }

    #[test]
    fn test_dangerous_mismatch_for_mz_claimed_pdf() {
        let result = identify(&[0x4D, 0x5A, 0x90, 0x00], Some("x.pdf"), Some("application/pdf"));
        assert_eq!(result.detected_content_type, "application/x-msdownload");
        assert!(result.is_mismatch);
        assert!(result.is_dangerous_mismatch);
    }

    #[test]
    fn test_matching_claim_is_never_a_mismatch() {
        let result = identify(&[0x4D, 0x5A, 0x90, 0x00], None, Some("Application/X-MSDownload"));
        assert!(!result.is_mismatch);
        assert!(!result.is_dangerous_mismatch);
    }

    #[test]
    fn test_zip_without_markers_stays_zip() {
        let chunk = zip_entry(b"mimetype");
        let result = identify(&chunk, Some("archive.zip"), None);
        assert_eq!(result.detected_content_type, "application/zip");
        assert_eq!(result.detected_extension.as_deref(), Some("zip"));
    }

    #[test]
    fn test_zip_refines_to_docx() {
        let mut chunk = zip_entry(b"[Content_Types].xml");
        chunk.extend_from_slice(&zip_entry(b"word/document.xml"));
        let result = identify(&chunk, Some("letter.docx"), None);
        assert_eq!(result.detected_content_type, DOCX_MIME);
        assert_eq!(result.detected_extension.as_deref(), Some("docx"));
        assert_eq!(result.method, DetectionMethod::Magic);
    }

    #[test]
    fn test_zip_refines_to_xlsx_and_pptx() {
        let result = identify(&zip_entry(b"xl/workbook.xml"), None, None);
        assert_eq!(result.detected_extension.as_deref(), Some("xlsx"));

        let result = identify(&zip_entry(b"ppt/slides/slide1.xml"), None, None);
        assert_eq!(result.detected_extension.as_deref(), Some("pptx"));
    }

    #[test]
    fn test_truncated_zip_is_swallowed() {
        // Header claims a longer name than the chunk holds.
        let mut chunk = zip_entry(b"word/document.xml");
        chunk.truncate(34);
        let result = identify(&chunk, None, None);
        assert_eq!(result.detected_content_type, "application/zip");
    }

    #[test]
    fn test_short_zip_skips_refinement() {
        let result = identify(b"PK\x03\x04tiny", None, None);
        assert_eq!(result.detected_content_type, "application/zip");
    }

    #[test]
    fn test_ole2_refined_by_extension() {
        let ole = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00];
        let result = identify(&ole, Some("memo.doc"), None);
        assert_eq!(result.detected_content_type, "application/msword");
        assert_eq!(result.detected_extension.as_deref(), Some("doc"));

        let result = identify(&ole, Some("sheet.XLS"), None);
        assert_eq!(result.detected_content_type, "application/vnd.ms-excel");

        let result = identify(&ole, Some("unknown.dat"), None);
        assert_eq!(result.detected_content_type, "application/x-ole-storage");
    }

    #[test]
    fn test_riff_dispatch() {
        let mut webp = Vec::from(&b"RIFF"[..]);
        webp.extend_from_slice(&[0, 0, 0, 0]);
        webp.extend_from_slice(b"WEBP");
        assert_eq!(identify(&webp, None, None).detected_content_type, "image/webp");

        let mut wav = Vec::from(&b"RIFF"[..]);
        wav.extend_from_slice(&[0, 0, 0, 0]);
        wav.extend_from_slice(b"WAVE");
        assert_eq!(identify(&wav, None, None).detected_content_type, "audio/wav");

        let mut avi = Vec::from(&b"RIFF"[..]);
        avi.extend_from_slice(&[0, 0, 0, 0]);
        avi.extend_from_slice(b"AVI ");
        assert_eq!(identify(&avi, None, None).detected_content_type, "video/x-msvideo");
    }

    #[test]
    fn test_riff_too_short_falls_through() {
        let result = identify(b"RIFF\x00\x00", None, None);
        assert_ne!(result.method, DetectionMethod::Magic);
    }

    #[test]
    fn test_claimed_type_step() {
        // High-bit bytes dodge both magic and the text heuristic.
        let chunk = [0x80u8; 32];
        let result = identify(&chunk, None, Some("video/mp4"));
        assert_eq!(result.detected_content_type, "video/mp4");
        assert_eq!(result.detected_extension.as_deref(), Some("mp4"));
        assert_eq!(result.method, DetectionMethod::Header);
        assert!(!result.is_mismatch);
    }

    #[test]
    fn test_unknown_claim_falls_to_extension() {
        let chunk = [0x80u8; 32];
        let result = identify(&chunk, Some("clip.mov"), Some("application/x-made-up"));
        assert_eq!(result.detected_content_type, "video/quicktime");
        assert_eq!(result.method, DetectionMethod::Extension);
        assert!(result.is_mismatch);
    }

    #[test]
    fn test_text_heuristic() {
        let result = identify(b"hello, plain text\nwith lines\n", None, None);
        assert_eq!(result.detected_content_type, "text/plain");
        assert_eq!(result.detected_extension.as_deref(), Some("txt"));
        assert_eq!(result.method, DetectionMethod::Heuristic);
    }

    #[test]
    fn test_text_heuristic_threshold() {
        // 10 printable + 6 high bytes = 62% printable, below 85%.
        let mut chunk = Vec::from(&b"abcdefghij"[..]);
        chunk.extend_from_slice(&[0x90u8; 6]);
        let result = identify(&chunk, None, None);
        assert_eq!(result.method, DetectionMethod::Fallback);
    }

    #[test]
    fn test_fallback_for_empty_chunk() {
        let result = identify(b"", None, None);
        assert_eq!(result.detected_content_type, OCTET_STREAM);
        assert_eq!(result.detected_extension.as_deref(), Some("bin"));
        assert_eq!(result.method, DetectionMethod::Fallback);
    }

    #[test]
    fn test_longer_signatures_attempted_first() {
        for pair in MAGIC_SIGNATURES.windows(2) {
            assert!(
                pair[0].0.len() >= pair[1].0.len(),
                "signature table must be ordered longest-first: {:?} before {:?}",
                pair[0].0,
                pair[1].0
            );
        }
    }

    #[test]
    fn test_common_magic_signatures() {
        let cases: &[(&[u8], &str, &str)] = &[
            (b"GIF89a...", "image/gif", "gif"),
            (&[0x1F, 0x8B, 0x08, 0x00], "application/gzip", "gz"),
            (
                &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C, 0x00],
                "application/x-7z-compressed",
                "7z",
            ),
            (
                &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00],
                "application/vnd.rar",
                "rar",
            ),
            (&[0x49, 0x49, 0x2A, 0x00, 0x10], "image/tiff", "tif"),
            (&[0x4D, 0x4D, 0x00, 0x2A, 0x10], "image/tiff", "tif"),
            (&[0x42, 0x4D, 0x36, 0x00], "image/bmp", "bmp"),
            (b"ID3\x04\x00", "audio/mpeg", "mp3"),
            (b"OggS\x00", "audio/ogg", "ogg"),
            (b"fLaC\x00", "audio/flac", "flac"),
            (&[0xFF, 0xD8, 0xFF, 0xE1], "image/jpeg", "jpg"),
        ];
        for (chunk, mime, ext) in cases {
            let result = identify(chunk, None, None);
            assert_eq!(result.detected_content_type, *mime, "chunk {:?}", chunk);
            assert_eq!(result.detected_extension.as_deref(), Some(*ext));
            assert_eq!(result.method, DetectionMethod::Magic);
        }
    }

    #[test]
    fn test_detection_method_wire_strings() {
        assert_eq!(DetectionMethod::Magic.as_str(), "magic");
        assert_eq!(DetectionMethod::Extension.as_str(), "extension");
        assert_eq!(DetectionMethod::Header.as_str(), "header");
        assert_eq!(DetectionMethod::Heuristic.as_str(), "heuristic");
        assert_eq!(DetectionMethod::Fallback.as_str(), "fallback");
        assert_eq!(
            DetectionMethod::from_str_lossy("heuristic"),
            DetectionMethod::Heuristic
        );
        assert_eq!(
            DetectionMethod::from_str_lossy("unknown"),
            DetectionMethod::Fallback
        );
    }

    #[test]
    fn test_dangerous_requires_mismatch() {
        // Dangerous detected type with no claim: flagged only as detected.
        let result = identify(&[0x7F, 0x45, 0x4C, 0x46, 0x02], None, None);
        assert_eq!(result.detected_content_type, "application/x-executable");
        assert!(!result.is_mismatch);
        assert!(!result.is_dangerous_mismatch);
    }

    #[test]
    fn test_shebang_detected_as_script() {
        let result = identify(b"#!/bin/sh\necho hi\n", Some("run.txt"), Some("text/plain"));
        assert_eq!(result.detected_content_type, "text/x-shellscript");
        assert!(result.is_dangerous_mismatch);
    }
}
