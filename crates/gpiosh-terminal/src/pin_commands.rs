//! Pin commands: list, read, write.

use gpiosh_platform::GpioService;
use gpiosh_types::error::{GpioshError, Result};
use gpiosh_types::gpio::{Direction, Pin, PinState, Pull};

use crate::interpreter::{Command, CommandOutput, Environment};

/// Parse a pin token and check it against the backend's pin range.
pub fn parse_pin(token: &str, gpio: &dyn GpioService) -> Result<Pin> {
    let invalid = || GpioshError::InvalidPin(token.to_string());
    // `u8::from_str` would also take a leading `+`.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match token.parse::<Pin>() {
        Ok(pin) if pin < gpio.pin_count() => Ok(pin),
        _ => Err(invalid()),
    }
}

/// Token at `index`, or a command error naming what is missing. Arity is
/// normally checked before dispatch, but the minimum can be lowered at
/// runtime.
fn arg<'t>(tokens: &[&'t str], index: usize, what: &str) -> Result<&'t str> {
    tokens.get(index).copied().ok_or_else(|| {
        let name = tokens.first().copied().unwrap_or_default();
        GpioshError::Command(format!("{name}: missing {what}"))
    })
}

/// One report line: `Pin <n>:\t<state>\t<pull>`.
pub fn pin_report(gpio: &dyn GpioService, pin: Pin) -> String {
    format!("Pin {pin}:\t{}\t{}", gpio.read(pin), gpio.read_pull(pin))
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

pub(crate) struct ListCmd;
impl Command for ListCmd {
    fn execute(&self, tokens: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if tokens.len() > 1 {
            return Err(GpioshError::Command(format!(
                "{}: unexpected argument '{}'",
                tokens[0], tokens[1]
            )));
        }
        let count = env.list_pins.min(env.gpio.pin_count());
        let lines: Vec<String> = (0..count).map(|pin| pin_report(&*env.gpio, pin)).collect();
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// read
// ---------------------------------------------------------------------------

pub(crate) struct ReadCmd;
impl Command for ReadCmd {
    fn execute(&self, tokens: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let pin = parse_pin(arg(tokens, 1, "pin")?, &*env.gpio)?;
        Ok(CommandOutput::Text(pin_report(&*env.gpio, pin)))
    }
}

// ---------------------------------------------------------------------------
// write
// ---------------------------------------------------------------------------

/// What a `write` invocation changes on the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    State(PinState),
    Pull(Pull),
    Direction(Direction),
}

impl PinWrite {
    /// Parse `<mode> [value]`. Keywords are case-insensitive.
    pub fn parse(mode: &str, value: Option<&str>) -> Result<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "state" => value
                .and_then(PinState::from_keyword)
                .map(Self::State)
                .ok_or_else(|| GpioshError::InvalidState(value.map(str::to_string))),
            "pull" => value
                .and_then(Pull::from_keyword)
                .map(Self::Pull)
                .ok_or_else(|| GpioshError::InvalidPull(value.map(str::to_string))),
            "input" => Ok(Self::Direction(Direction::Input)),
            "output" => Ok(Self::Direction(Direction::Output)),
            _ => Err(GpioshError::InvalidMode(mode.to_string())),
        }
    }

    /// Apply the change through the hardware collaborator.
    pub fn apply(self, gpio: &mut dyn GpioService, pin: Pin) -> Result<()> {
        match self {
            Self::State(state) => gpio.write(pin, state),
            Self::Pull(pull) => gpio.set_pull(pin, pull),
            Self::Direction(direction) => gpio.set_direction(pin, direction),
        }
    }
}

pub(crate) struct WriteCmd;
impl Command for WriteCmd {
    fn execute(&self, tokens: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let pin = parse_pin(arg(tokens, 1, "pin")?, &*env.gpio)?;
        let change = PinWrite::parse(arg(tokens, 2, "mode")?, tokens.get(3).copied())?;
        change.apply(&mut *env.gpio, pin)?;
        log::debug!("pin {pin}: applied {change:?}");
        // Read back so the user sees the effect.
        Ok(CommandOutput::Text(pin_report(&*env.gpio, pin)))
    }
}
