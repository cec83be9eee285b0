//! Storage engine configuration.
//!
//! All options come from environment variables with documented defaults:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SILO_ROOT_PATH` | `/var/lib/silo/blobs` | Blob tree root |
//! | `SILO_MAX_UPLOAD_BYTES` | 1 GiB | Upload size cap |
//! | `SILO_UPLOAD_BUFFER_SIZE` | 64 KiB | Streaming copy buffer |
//! | `SILO_FIRST_CHUNK_SIZE` | 64 KiB | Bytes buffered for MIME detection |
//! | `SILO_ALLOWED_EXTENSIONS` | built-in list | Comma-separated allow-list |
//! | `SILO_INLINE_CONTENT_TYPES` | built-in list | Comma-separated inline types |
//! | `SILO_DEFAULT_BUCKETS` | (empty) | Buckets ensured at startup |

use std::collections::HashSet;
use std::path::PathBuf;

use silo_core::defaults;

/// Runtime options of the storage engine.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory of the blob tree.
    pub root_path: PathBuf,
    /// Hard cap on upload size in bytes.
    pub max_upload_bytes: u64,
    /// Copy buffer size for the streaming upload loop.
    pub upload_buffer_size: usize,
    /// Number of leading bytes buffered for MIME identification.
    pub first_chunk_size: usize,
    /// Extensions accepted for on-disk blob names (lowercase).
    pub allowed_extensions: HashSet<String>,
    /// Served content types allowed to render inline (lowercase).
    pub inline_content_types: HashSet<String>,
    /// Buckets ensured to exist at startup.
    pub default_buckets: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("/var/lib/silo/blobs"),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            upload_buffer_size: defaults::UPLOAD_BUFFER_SIZE,
            first_chunk_size: defaults::FIRST_CHUNK_SIZE,
            allowed_extensions: defaults::ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            inline_content_types: defaults::INLINE_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_buckets: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Build the configuration from environment variables (with defaults).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("SILO_ROOT_PATH") {
            config.root_path = PathBuf::from(path);
        }
        if let Some(v) = parse_env::<u64>("SILO_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = v;
        }
        if let Some(v) = parse_env::<usize>("SILO_UPLOAD_BUFFER_SIZE") {
            config.upload_buffer_size = v.max(1);
        }
        if let Some(v) = parse_env::<usize>("SILO_FIRST_CHUNK_SIZE") {
            config.first_chunk_size = v.max(1);
        }
        if let Ok(list) = std::env::var("SILO_ALLOWED_EXTENSIONS") {
            config.allowed_extensions = split_list(&list);
        }
        if let Ok(list) = std::env::var("SILO_INLINE_CONTENT_TYPES") {
            config.inline_content_types = split_list(&list);
        }
        if let Ok(list) = std::env::var("SILO_DEFAULT_BUCKETS") {
            config.default_buckets = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config
    }

    /// Whether a detected extension may be used for the on-disk blob name.
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions.contains(&ext.to_ascii_lowercase())
    }

    /// Whether a served content type may render inline.
    pub fn is_inline_content_type(&self, content_type: &str) -> bool {
        self.inline_content_types
            .contains(&content_type.to_ascii_lowercase())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn split_list(list: &str) -> HashSet<String> {
    list.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_upload_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.upload_buffer_size, 64 * 1024);
        assert_eq!(config.first_chunk_size, 64 * 1024);
        assert!(config.is_extension_allowed("pdf"));
        assert!(config.is_inline_content_type("application/pdf"));
        assert!(config.default_buckets.is_empty());
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        let config = StoreConfig::default();
        assert!(config.is_extension_allowed("PDF"));
        assert!(!config.is_extension_allowed("exe"));
    }

    #[test]
    fn test_inline_check_is_case_insensitive() {
        let config = StoreConfig::default();
        assert!(config.is_inline_content_type("Application/PDF"));
        assert!(!config.is_inline_content_type("application/x-msdownload"));
    }

    #[test]
    fn test_split_list_trims_and_lowercases() {
        let set = split_list(" Pdf , PNG ,,txt ");
        assert!(set.contains("pdf"));
        assert!(set.contains("png"));
        assert!(set.contains("txt"));
        assert_eq!(set.len(), 3);
    }
}
