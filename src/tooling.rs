//! Tooling & Integration Layer
//!
//! Command-line entry points over the dispatch service.

pub mod cli;

pub use cli::{AgentCommands, Cli, CliContext, Commands};
