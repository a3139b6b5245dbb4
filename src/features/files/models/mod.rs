mod file;

pub use file::{FileRecord, TagMutation};
