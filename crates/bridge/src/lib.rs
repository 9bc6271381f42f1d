pub mod converter;
pub mod engine;
pub mod errors;
pub mod iteration;
pub mod mcp;
pub mod mode_prompt;
pub mod models;
pub mod orchestrator;
pub mod prompt;
