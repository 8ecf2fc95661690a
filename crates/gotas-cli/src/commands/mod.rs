pub mod serve;
pub mod tools;

// Re-export command handlers
pub use serve::ServeArgs;
pub use tools::ToolsCommand;
