#![forbid(unsafe_code)]

//! Core domain model and persistence for the Kraft training tracker.
//!
//! This crate provides:
//! - Domain types (catalog entries, loads, training sessions)
//! - The file-backed storage handle and its startup migration
//! - Catalog and training session operations
//! - Backup export and import

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod store;
pub mod migration;
pub mod catalog;
pub mod training;
pub mod exchange;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{Storage, StorageOptions};
pub use migration::MigrationReport;
pub use training::SessionUpdate;
pub use exchange::{backup_file_name, ExportDocument, ExportEntry, ImportSummary};
