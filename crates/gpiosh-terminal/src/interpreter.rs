//! Command trait, registry, and dispatch logic.
//!
//! The registry owns every command descriptor in an arena and maps names to
//! arena handles. Aliases store the same handle as their primary name, so a
//! change made through any name is seen through all of them.

use std::collections::HashMap;
use std::io::Write;

use gpiosh_platform::GpioService;
use gpiosh_types::error::{GpioshError, Result};

/// Placeholder replaced by the invoked command name in help templates.
pub const NAME_PLACEHOLDER: &str = "$0";

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Command produced no visible output.
    None,
    /// Signal to the dispatcher to print the command listing.
    Help,
    /// Signal to the session to stop reading input.
    Exit,
}

/// Mutable environment passed to every command.
pub struct Environment<'a> {
    /// The hardware collaborator.
    pub gpio: &'a mut dyn GpioService,
    /// Number of pins `list` reports.
    pub list_pins: u8,
}

/// A single executable command.
pub trait Command {
    /// Execute the command. `tokens[0]` is the name the user typed.
    fn execute(&self, tokens: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Handle to a descriptor in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId(usize);

/// Registered metadata and handler for one command.
pub struct Descriptor {
    name: String,
    handler: Box<dyn Command>,
    min_args: usize,
    help: String,
}

impl Descriptor {
    /// The primary name the descriptor was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum number of arguments, not counting the command name.
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    /// Raw help template (may be empty).
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Help text as seen by a user who typed `invoked`.
    pub fn help_for(&self, invoked: &str) -> String {
        format_help(&self.help, invoked)
    }

    /// Run the handler with the full token list.
    pub fn invoke(&self, tokens: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        self.handler.execute(tokens, env)
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

/// What the session should do after a line has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Registry of available commands with dispatch.
///
/// Populated once at startup and then only read. Names are case-sensitive.
#[derive(Default)]
pub struct CommandRegistry {
    /// Retired slots (descriptors whose last name was rebound) are `None`.
    descriptors: Vec<Option<Descriptor>>,
    names: HashMap<String, DescriptorId>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under `name`. An existing binding for `name` is
    /// replaced (last registration wins).
    pub fn register(
        &mut self,
        name: &str,
        handler: Box<dyn Command>,
        min_args: usize,
        help: &str,
    ) -> DescriptorId {
        let id = DescriptorId(self.descriptors.len());
        self.descriptors.push(Some(Descriptor {
            name: name.to_string(),
            handler,
            min_args,
            help: help.to_string(),
        }));
        self.bind(name, id);
        id
    }

    /// Bind `alias` to the descriptor already bound to `existing`.
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<DescriptorId> {
        let id = self.lookup_id(existing).ok_or_else(|| {
            GpioshError::Command(format!("alias {alias}: no such command: {existing}"))
        })?;
        self.bind(alias, id);
        Ok(id)
    }

    fn bind(&mut self, name: &str, id: DescriptorId) {
        let previous = self.names.insert(name.to_string(), id);
        if let Some(old) = previous
            && old != id
            && !self.names.values().any(|&bound| bound == old)
        {
            self.descriptors[old.0] = None;
        }
    }

    /// Handle bound to `name` (exact, case-sensitive match).
    pub fn lookup_id(&self, name: &str) -> Option<DescriptorId> {
        self.names.get(name).copied()
    }

    /// Descriptor bound to `name` (exact, case-sensitive match).
    pub fn lookup(&self, name: &str) -> Option<&Descriptor> {
        self.lookup_id(name).and_then(|id| self.descriptor(id))
    }

    /// Descriptor behind a handle.
    pub fn descriptor(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(id.0).and_then(Option::as_ref)
    }

    fn descriptor_mut(&mut self, name: &str) -> Result<&mut Descriptor> {
        let id = self
            .lookup_id(name)
            .ok_or_else(|| GpioshError::UnknownCommand(name.to_string()))?;
        self.descriptors
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| GpioshError::UnknownCommand(name.to_string()))
    }

    /// Replace the help template of the command bound to `name`. Every
    /// alias of the command sees the change.
    pub fn set_help(&mut self, name: &str, template: &str) -> Result<()> {
        self.descriptor_mut(name)?.help = template.to_string();
        Ok(())
    }

    /// Replace the minimum argument count of the command bound to `name`.
    /// Every alias of the command sees the change.
    pub fn set_min_args(&mut self, name: &str, min_args: usize) -> Result<()> {
        self.descriptor_mut(name)?.min_args = min_args;
        Ok(())
    }

    /// All bound names, aliases included, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound names (aliases count separately).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(name, raw help template)` for every bound name, sorted by name.
    pub fn help_table(&self) -> Vec<(&str, &str)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.lookup(name).map(|d| (name, d.help())))
            .collect()
    }

    /// Dispatch one input line.
    ///
    /// The line is split on `;` and each segment on whitespace. Segments run
    /// left to right. An unknown command or too few arguments stops the rest
    /// of the line; a failing handler only reports its error. Output is
    /// flushed after every segment so it is visible before a later segment
    /// blocks.
    pub fn execute_line(
        &self,
        line: &str,
        env: &mut Environment<'_>,
        out: &mut dyn Write,
    ) -> Result<Flow> {
        for segment in line.split(';') {
            let tokens = tokenize(segment);
            let Some(&name) = tokens.first() else {
                continue;
            };

            let Some(descriptor) = self.lookup(name) else {
                writeln!(out, "{}", GpioshError::UnknownCommand(name.to_string()))?;
                break;
            };

            if let Err(e) = validate(descriptor, &tokens) {
                writeln!(out, "{e}")?;
                let help = descriptor.help_for(name);
                if !help.is_empty() {
                    writeln!(out, "{name}\n\t{help}")?;
                }
                break;
            }

            log::debug!("dispatch {name} -> {} {:?}", descriptor.name(), &tokens[1..]);
            match descriptor.invoke(&tokens, env) {
                Ok(CommandOutput::Text(text)) => writeln!(out, "{text}")?,
                Ok(CommandOutput::None) => {},
                Ok(CommandOutput::Help) => self.write_help(out)?,
                Ok(CommandOutput::Exit) => {
                    out.flush()?;
                    return Ok(Flow::Exit);
                },
                Err(e) => {
                    writeln!(out, "{e}")?;
                    let help = descriptor.help_for(name);
                    if !help.is_empty() {
                        writeln!(out, "{help}")?;
                    }
                },
            }
            out.flush()?;
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    fn write_help(&self, out: &mut dyn Write) -> Result<()> {
        for (name, help) in self.help_table() {
            writeln!(out, "{name}\t{help}")?;
        }
        Ok(())
    }
}

/// Substitute `invoked` for every `$0` in `template`. An empty template
/// yields an empty string, meaning "no help available".
pub fn format_help(template: &str, invoked: &str) -> String {
    if template.is_empty() {
        return String::new();
    }
    template.replace(NAME_PLACEHOLDER, invoked)
}

/// Check that `tokens` (command name first) carries at least the
/// descriptor's minimum argument count.
pub fn validate(descriptor: &Descriptor, tokens: &[&str]) -> Result<()> {
    if tokens.len().saturating_sub(1) < descriptor.min_args() {
        return Err(GpioshError::NotEnoughArgs {
            name: tokens.first().unwrap_or(&descriptor.name()).to_string(),
            expected: descriptor.min_args(),
        });
    }
    Ok(())
}

/// Split one segment on whitespace.
pub fn tokenize(segment: &str) -> Vec<&str> {
    segment.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpiosh_platform::SimulatedGpio;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every invocation it receives.
    struct RecordCmd {
        log: Rc<RefCell<Vec<String>>>,
    }
    impl Command for RecordCmd {
        fn execute(&self, tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            self.log.borrow_mut().push(tokens.join(" "));
            Ok(CommandOutput::Text(format!("ran {}", tokens.join(" "))))
        }
    }

    struct FailCmd;
    impl Command for FailCmd {
        fn execute(&self, tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            Err(GpioshError::InvalidPin(tokens[1].to_string()))
        }
    }

    struct ExitCmd;
    impl Command for ExitCmd {
        fn execute(&self, _tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
            Ok(CommandOutput::Exit)
        }
    }

    fn recorder() -> (Box<dyn Command>, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Box::new(RecordCmd { log: Rc::clone(&log) }), log)
    }

    fn run(reg: &CommandRegistry, line: &str) -> (Flow, String) {
        let mut gpio = SimulatedGpio::new();
        let mut env = Environment {
            gpio: &mut gpio,
            list_pins: 28,
        };
        let mut out = Vec::new();
        let flow = reg.execute_line(line, &mut env, &mut out).unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    // -- Registry --

    #[test]
    fn register_and_lookup() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        let id = reg.register("read", cmd, 1, "usage: $0 <pin>");
        let d = reg.lookup("read").unwrap();
        assert_eq!(d.name(), "read");
        assert_eq!(d.min_args(), 1);
        assert_eq!(d.help(), "usage: $0 <pin>");
        assert_eq!(reg.lookup_id("read"), Some(id));
    }

    #[test]
    fn lookup_is_case_sensitive_and_exact() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("read", cmd, 1, "");
        assert!(reg.lookup("READ").is_none());
        assert!(reg.lookup("rea").is_none());
        assert!(reg.lookup("reads").is_none());
    }

    #[test]
    fn alias_shares_descriptor() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        let id = reg.register("read", cmd, 1, "");
        assert_eq!(reg.alias("read", "cat").unwrap(), id);
        assert_eq!(reg.alias("read", "get").unwrap(), id);
        let primary = reg.lookup("read").unwrap();
        assert!(std::ptr::eq(primary, reg.lookup("cat").unwrap()));
        assert!(std::ptr::eq(primary, reg.lookup("get").unwrap()));
    }

    #[test]
    fn alias_of_alias_shares_descriptor() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        let id = reg.register("write", cmd, 2, "");
        reg.alias("write", "set").unwrap();
        assert_eq!(reg.alias("set", "put").unwrap(), id);
    }

    #[test]
    fn alias_of_unknown_command_fails() {
        let mut reg = CommandRegistry::new();
        let err = reg.alias("missing", "m").unwrap_err();
        assert!(format!("{err}").contains("missing"));
        assert!(reg.lookup("m").is_none());
    }

    #[test]
    fn set_help_through_alias_visible_everywhere() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("write", cmd, 2, "");
        reg.alias("write", "set").unwrap();
        reg.set_help("set", "usage: $0 <pin>").unwrap();
        assert_eq!(reg.lookup("write").unwrap().help(), "usage: $0 <pin>");
        assert_eq!(reg.lookup("set").unwrap().help(), "usage: $0 <pin>");
    }

    #[test]
    fn set_min_args_through_alias_visible_everywhere() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("sleep", cmd, 0, "");
        reg.alias("sleep", "wait").unwrap();
        reg.set_min_args("wait", 1).unwrap();
        assert_eq!(reg.lookup("sleep").unwrap().min_args(), 1);
    }

    #[test]
    fn set_help_on_unknown_name_fails() {
        let mut reg = CommandRegistry::new();
        assert!(matches!(
            reg.set_help("nope", "x"),
            Err(GpioshError::UnknownCommand(_))
        ));
        assert!(reg.set_min_args("nope", 1).is_err());
    }

    #[test]
    fn reregister_last_wins() {
        let mut reg = CommandRegistry::new();
        let (first, _) = recorder();
        let (second, _) = recorder();
        let old = reg.register("ls", first, 0, "old");
        let new = reg.register("ls", second, 0, "new");
        assert_ne!(old, new);
        assert_eq!(reg.lookup("ls").unwrap().help(), "new");
        // The orphaned descriptor is retired.
        assert!(reg.descriptor(old).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn reregister_keeps_descriptor_still_reachable_by_alias() {
        let mut reg = CommandRegistry::new();
        let (first, _) = recorder();
        let (second, _) = recorder();
        let old = reg.register("ls", first, 0, "old");
        reg.alias("ls", "list").unwrap();
        reg.register("ls", second, 0, "new");
        assert_eq!(reg.lookup_id("list"), Some(old));
        assert_eq!(reg.lookup("list").unwrap().help(), "old");
    }

    #[test]
    fn names_are_sorted_and_include_aliases() {
        let mut reg = CommandRegistry::new();
        let (a, _) = recorder();
        let (b, _) = recorder();
        reg.register("write", a, 2, "");
        reg.register("help", b, 0, "");
        reg.alias("write", "set").unwrap();
        assert_eq!(reg.names(), vec!["help", "set", "write"]);
        assert_eq!(reg.len(), 3);
        assert!(!reg.is_empty());
    }

    #[test]
    fn help_table_lists_raw_templates() {
        let mut reg = CommandRegistry::new();
        let (a, _) = recorder();
        reg.register("read", a, 1, "usage: $0 <pin>");
        reg.alias("read", "cat").unwrap();
        assert_eq!(
            reg.help_table(),
            vec![("cat", "usage: $0 <pin>"), ("read", "usage: $0 <pin>")]
        );
    }

    // -- Help formatting --

    #[test]
    fn format_help_substitutes_invoked_name() {
        assert_eq!(format_help("usage: $0 <pin>", "cat"), "usage: cat <pin>");
    }

    #[test]
    fn format_help_replaces_every_placeholder() {
        assert_eq!(
            format_help("usage: $0 <number><s|ms>\n\texample: $0 1s", "wait"),
            "usage: wait <number><s|ms>\n\texample: wait 1s"
        );
    }

    #[test]
    fn format_help_empty_template() {
        assert_eq!(format_help("", "cat"), "");
    }

    #[test]
    fn format_help_without_placeholder() {
        assert_eq!(format_help("lists pins", "ls"), "lists pins");
    }

    // -- Validation --

    #[test]
    fn validate_boundaries() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("write", cmd, 2, "");
        let d = reg.lookup("write").unwrap();
        assert!(validate(d, &["write", "5"]).is_err());
        assert!(validate(d, &["write", "5", "input"]).is_ok());
        assert!(validate(d, &["write", "5", "state", "high"]).is_ok());
    }

    #[test]
    fn validate_reports_invoked_name_and_count() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("read", cmd, 1, "");
        reg.alias("read", "cat").unwrap();
        let d = reg.lookup("cat").unwrap();
        match validate(d, &["cat"]) {
            Err(GpioshError::NotEnoughArgs { name, expected }) => {
                assert_eq!(name, "cat");
                assert_eq!(expected, 1);
            },
            other => panic!("expected NotEnoughArgs, got {other:?}"),
        }
    }

    #[test]
    fn validate_zero_min_args() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("ls", cmd, 0, "");
        let d = reg.lookup("ls").unwrap();
        assert!(validate(d, &["ls"]).is_ok());
        assert!(validate(d, &[]).is_ok());
    }

    // -- Tokenizing --

    #[test]
    fn tokenize_collapses_whitespace() {
        assert_eq!(tokenize("  write \t5  state high "), vec![
            "write", "5", "state", "high"
        ]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    // -- Line dispatch --

    #[test]
    fn runs_every_segment_in_order() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        let (flow, out) = run(&reg, "read 1 ; read 2");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(*log.borrow(), vec!["read 1", "read 2"]);
        assert_eq!(out, "ran read 1\nran read 2\n");
    }

    #[test]
    fn unknown_command_stops_rest_of_line() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        let (flow, out) = run(&reg, "read 1; bogus; read 2");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(*log.borrow(), vec!["read 1"]);
        assert!(out.contains("unknown command: bogus"));
        assert!(!out.contains("read 2"));
    }

    #[test]
    fn insufficient_args_stops_rest_of_line_and_prints_help() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "usage: $0 <pin>");
        reg.alias("read", "cat").unwrap();
        let (_, out) = run(&reg, "cat; read 2");
        assert!(log.borrow().is_empty());
        assert_eq!(out, "not enough arguments, expected 1\ncat\n\tusage: cat <pin>\n");
    }

    #[test]
    fn insufficient_args_without_help() {
        let mut reg = CommandRegistry::new();
        let (cmd, _) = recorder();
        reg.register("read", cmd, 1, "");
        let (_, out) = run(&reg, "read");
        assert_eq!(out, "not enough arguments, expected 1\n");
    }

    #[test]
    fn handler_error_reports_and_continues() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        reg.register("fail", Box::new(FailCmd), 1, "usage: $0 <pin>");
        let (_, out) = run(&reg, "fail x; read 3");
        assert_eq!(*log.borrow(), vec!["read 3"]);
        assert_eq!(out, "invalid pin number: x\nusage: fail <pin>\nran read 3\n");
    }

    #[test]
    fn empty_segments_are_skipped() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        let (_, out) = run(&reg, ";; read 1 ;  ; read 2;");
        assert_eq!(*log.borrow(), vec!["read 1", "read 2"]);
        assert!(!out.contains("unknown"));
    }

    #[test]
    fn empty_line_does_nothing() {
        let reg = CommandRegistry::new();
        let (flow, out) = run(&reg, "");
        assert_eq!(flow, Flow::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn exit_stops_line_and_signals() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        reg.register("exit", Box::new(ExitCmd), 0, "");
        let (flow, _) = run(&reg, "read 1; exit; read 2");
        assert_eq!(flow, Flow::Exit);
        assert_eq!(*log.borrow(), vec!["read 1"]);
    }

    #[test]
    fn case_sensitive_dispatch() {
        let mut reg = CommandRegistry::new();
        let (cmd, log) = recorder();
        reg.register("read", cmd, 1, "");
        let (_, out) = run(&reg, "READ 1");
        assert!(log.borrow().is_empty());
        assert!(out.contains("unknown command: READ"));
    }
}
