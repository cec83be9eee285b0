//! # silo-store
//!
//! The storage engine of silo: streaming uploads with simultaneous hashing
//! and MIME identification, atomic blob placement, conditional-disposition
//! downloads, and bucket lifecycle management.

pub mod buckets;
pub mod config;
pub mod engine;
pub mod fs;

pub use buckets::BucketManager;
pub use config::StoreConfig;
pub use engine::{Disposition, DownloadBundle, StorageEngine};
pub use fs::{BlobFilesystem, TempGuard};
