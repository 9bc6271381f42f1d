pub mod base;
pub mod claude_cli;
pub mod mock;
