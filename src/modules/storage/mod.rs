//! Storage module for file management
//!
//! Persists uploaded model content in a local directory.

mod local_storage;

pub use local_storage::LocalStorage;
