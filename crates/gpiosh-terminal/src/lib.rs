//! Command interpreter and read-eval loop.
//!
//! The terminal is a registry-based dispatch system. Commands implement the
//! `Command` trait and are registered by name, with any number of aliases
//! sharing one descriptor. The session reads lines, splits them into
//! `;`-separated segments, resolves each command name, checks its arity, and
//! dispatches `execute()`.

mod commands;
mod interpreter;
pub mod pin_commands;
mod session;
pub mod system_commands;

/// Build the registry of built-in commands.
pub use commands::build_registry;
/// Register all built-in commands (list, read, write, sleep, exit, help) into a registry.
pub use commands::register_builtins;
/// A single executable command trait.
pub use interpreter::Command;
/// Output produced by a command (text or a signal).
pub use interpreter::CommandOutput;
/// Registry of available commands with dispatch.
pub use interpreter::CommandRegistry;
/// Registered metadata and handler for one command.
pub use interpreter::Descriptor;
/// Handle to a descriptor in the registry.
pub use interpreter::DescriptorId;
/// Mutable environment passed to every command.
pub use interpreter::Environment;
/// What the session does after a dispatched line.
pub use interpreter::Flow;
/// Help template substitution and arity checking.
pub use interpreter::{format_help, tokenize, validate};
/// Interactive loop, its input sources, and its cancellation link.
pub use session::{
    BufReadSource, CancelHandle, Input, LineSource, Session, SessionState, ShutdownReason,
};
