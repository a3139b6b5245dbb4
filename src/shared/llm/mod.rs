//! Helpers for consuming free-form text-generation output.

pub mod parser;

pub use parser::parse_json_array;
