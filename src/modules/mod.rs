//! Modules layer - Infrastructure components for external integrations
//!
//! Contains adapters for resources outside the process, such as the uploads directory.

pub mod storage;
