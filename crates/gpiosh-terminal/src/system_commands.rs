//! System commands: sleep.

use std::time::Duration;

use gpiosh_types::error::{GpioshError, Result};

use crate::interpreter::{Command, CommandOutput, Environment};

/// Parse `<N>s` or `<N>ms` into a duration.
pub fn parse_duration(token: &str) -> Result<Duration> {
    let invalid = || GpioshError::InvalidDuration(token.to_string());
    // `ms` must be checked first: it also ends in `s`.
    let (digits, from_count): (&str, fn(u64) -> Duration) =
        if let Some(digits) = token.strip_suffix("ms") {
            (digits, Duration::from_millis)
        } else if let Some(digits) = token.strip_suffix('s') {
            (digits, Duration::from_secs)
        } else {
            return Err(invalid());
        };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map(from_count).map_err(|_| invalid())
}

// ---------------------------------------------------------------------------
// sleep
// ---------------------------------------------------------------------------

/// Blocks the dispatch thread. Later segments and the next prompt wait.
pub(crate) struct SleepCmd;
impl Command for SleepCmd {
    fn execute(&self, tokens: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        if tokens.len() != 2 {
            return Err(GpioshError::Command(format!(
                "{}: expected exactly one duration",
                tokens[0]
            )));
        }
        let duration = parse_duration(tokens[1])?;
        log::debug!("sleeping for {duration:?}");
        std::thread::sleep(duration);
        Ok(CommandOutput::None)
    }
}
