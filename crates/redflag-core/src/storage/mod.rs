//! Blob storage abstraction for uploaded bytes.

pub mod file_store;

pub use file_store::FileStore;
