//! CLI commands

mod batch;
mod completions;
mod config;
mod history;
mod logs;
mod sign;
mod tools;
mod verify;

pub use batch::BatchCommand;
pub use completions::CompletionsCommand;
pub use config::ConfigCommand;
pub use history::HistoryCommand;
pub use logs::LogsCommand;
pub use sign::SignCommand;
pub use tools::ToolsCommand;
pub use verify::VerifyCommand;
