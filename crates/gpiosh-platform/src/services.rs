//! GPIO service trait and simulated implementation.

use gpiosh_types::error::{GpioshError, Result};
use gpiosh_types::gpio::{Direction, Pin, PinState, Pull};

// ---------------------------------------------------------------------------
// GPIO service
// ---------------------------------------------------------------------------

/// Abstraction over a bank of general-purpose I/O lines.
///
/// The shell issues exactly one call per parsed command and never batches.
/// Reads are infallible: a backend that cannot read a pin reports
/// `Unknown`. Mutating calls fail if the backend is not open or the pin is
/// out of range.
pub trait GpioService {
    /// Acquire the hardware (map registers, open device nodes).
    fn open(&mut self) -> Result<()>;

    /// Release the hardware. Calling `close` on a closed service is an error.
    fn close(&mut self) -> Result<()>;

    /// Number of addressable pins; valid pin ids are `0..pin_count()`.
    fn pin_count(&self) -> u8;

    /// Current logical level of `pin`.
    fn read(&self, pin: Pin) -> PinState;

    /// Drive `pin` to `state`.
    fn write(&mut self, pin: Pin, state: PinState) -> Result<()>;

    /// Configure the internal pull resistor of `pin`.
    fn set_pull(&mut self, pin: Pin, pull: Pull) -> Result<()>;

    /// Current pull configuration of `pin`.
    fn read_pull(&self, pin: Pin) -> Pull;

    /// Switch `pin` between input and output.
    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<()>;
}

/// Reject pins outside `0..count` and unopened backends.
pub(crate) fn check_pin(open: bool, pin: Pin, count: u8) -> Result<()> {
    if !open {
        return Err(GpioshError::Gpio("GPIO not open".to_string()));
    }
    if pin >= count {
        return Err(GpioshError::Gpio(format!(
            "pin {pin} out of range (0..{count})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Simulated implementation
// ---------------------------------------------------------------------------

/// Default pin count of the simulated bank (matches the BCM2835 bank).
pub const SIMULATED_PIN_COUNT: u8 = 54;

#[derive(Debug, Clone, Copy)]
struct PinSlot {
    state: PinState,
    pull: Pull,
    direction: Direction,
}

impl Default for PinSlot {
    fn default() -> Self {
        Self {
            state: PinState::Low,
            pull: Pull::None,
            direction: Direction::Input,
        }
    }
}

/// In-memory GPIO bank. Writes are reflected by subsequent reads.
pub struct SimulatedGpio {
    pins: Vec<PinSlot>,
    open: bool,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::with_pin_count(SIMULATED_PIN_COUNT)
    }

    pub fn with_pin_count(count: u8) -> Self {
        Self {
            pins: vec![PinSlot::default(); count as usize],
            open: false,
        }
    }

    /// Whether `open` has been called without a matching `close`.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Direction last set on `pin`, if the pin exists.
    pub fn direction(&self, pin: Pin) -> Option<Direction> {
        self.pins.get(pin as usize).map(|slot| slot.direction)
    }

    fn slot_mut(&mut self, pin: Pin) -> Result<&mut PinSlot> {
        check_pin(self.open, pin, self.pin_count())?;
        Ok(&mut self.pins[pin as usize])
    }
}

impl Default for SimulatedGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioService for SimulatedGpio {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(GpioshError::Gpio("GPIO already open".to_string()));
        }
        self.open = true;
        log::debug!("simulated GPIO bank opened ({} pins)", self.pins.len());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(GpioshError::Gpio("GPIO not open".to_string()));
        }
        self.open = false;
        Ok(())
    }

    fn pin_count(&self) -> u8 {
        self.pins.len() as u8
    }

    fn read(&self, pin: Pin) -> PinState {
        match self.pins.get(pin as usize) {
            Some(slot) if self.open => slot.state,
            _ => PinState::Unknown,
        }
    }

    fn write(&mut self, pin: Pin, state: PinState) -> Result<()> {
        if state == PinState::Unknown {
            return Err(GpioshError::Gpio(format!(
                "cannot drive pin {pin} to an unknown level"
            )));
        }
        self.slot_mut(pin)?.state = state;
        Ok(())
    }

    fn set_pull(&mut self, pin: Pin, pull: Pull) -> Result<()> {
        if pull == Pull::Unknown {
            return Err(GpioshError::Gpio(format!(
                "cannot set pin {pin} to an unknown pull"
            )));
        }
        self.slot_mut(pin)?.pull = pull;
        Ok(())
    }

    fn read_pull(&self, pin: Pin) -> Pull {
        match self.pins.get(pin as usize) {
            Some(slot) if self.open => slot.pull,
            _ => Pull::Unknown,
        }
    }

    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<()> {
        self.slot_mut(pin)?.direction = direction;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-module tests
// ---------------------------------------------------------------------------
