pub mod constants;
pub mod llm;
pub mod prompts;
pub mod tags;
pub mod types;
