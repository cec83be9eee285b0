//! # silo-migrate
//!
//! Crash-safe, resumable, sharded bulk migration of legacy records into
//! the silo storage engine. Every record's lifecycle lives in a persistent
//! log so interrupted runs resume exactly where they stopped, and workers
//! pinned to distinct shard tokens never touch the same row.

pub mod client;
pub mod config;
pub mod source;
pub mod worker;

pub use client::{UploadClient, UploadResult};
pub use config::MigrationConfig;
pub use source::{ContentDb, DocumentsDb};
pub use worker::MigrationWorker;
