//! Blob storage for uploaded file bytes.
//!
//! Implements the `FileStore` trait from `redflag-core` on the local
//! filesystem. Metadata lives in SQLite (`sqlite::upload`); this module
//! only handles the bytes on disk.

pub mod filesystem;

pub use filesystem::LocalFileStore;
