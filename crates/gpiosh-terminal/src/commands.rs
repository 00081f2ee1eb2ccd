//! Built-in command table: help, exit, and registration of every command.

use gpiosh_types::error::Result;

use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};
use crate::pin_commands::{ListCmd, ReadCmd, WriteCmd};
use crate::system_commands::SleepCmd;

/// Help template for `list` and its aliases.
pub const LIST_HELP: &str = "usage: $0";
/// Help template for `read` and its aliases.
pub const READ_HELP: &str = "usage: $0 <pin>";
/// Help template for `write` and its aliases.
pub const WRITE_HELP: &str = "usage: $0 <pin> <state|pull|input|output> [value]";
/// Help template for `sleep` and its aliases.
pub const SLEEP_HELP: &str = "usage: $0 <number><s|ms>\n\texample: $0 1s";

/// Build the registry of built-in commands. Called once at startup.
pub fn build_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();
    register_builtins(&mut reg);
    reg
}

/// Register all built-in commands and their aliases into `reg`.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register("list", Box::new(ListCmd), 0, LIST_HELP);
    alias_all(reg, "list", &["ls", "status"]);

    reg.register("read", Box::new(ReadCmd), 1, READ_HELP);
    alias_all(reg, "read", &["cat", "get"]);

    reg.register("write", Box::new(WriteCmd), 2, WRITE_HELP);
    alias_all(reg, "write", &["set"]);

    reg.register("sleep", Box::new(SleepCmd), 1, SLEEP_HELP);
    alias_all(reg, "sleep", &["wait"]);

    reg.register("exit", Box::new(ExitCmd), 0, "");
    reg.register("help", Box::new(HelpCmd), 0, "");
}

fn alias_all(reg: &mut CommandRegistry, name: &str, aliases: &[&str]) {
    for alias in aliases {
        if let Err(e) = reg.alias(name, alias) {
            log::error!("{e}");
        }
    }
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn execute(&self, _tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        // The listing needs the registry; the dispatcher renders it.
        Ok(CommandOutput::Help)
    }
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

struct ExitCmd;
impl Command for ExitCmd {
    fn execute(&self, _tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Exit)
    }
}
