//! Memory-mapped GPIO for BCM2835/BCM2836/BCM2837 and BCM2711 SoCs.
//!
//! Maps the 4 KiB GPIO register block exposed by `/dev/gpiomem` and drives it
//! with volatile 32-bit accesses. `/dev/gpiomem` only exposes the GPIO block,
//! so no root privileges are needed beyond membership of the `gpio` group.

use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::time::Duration;

use gpiosh_types::error::{GpioshError, Result};
use gpiosh_types::gpio::{Direction, Pin, PinState, Pull};

use crate::services::{GpioService, check_pin};

/// Size of the mapped register block in bytes.
const BLOCK_SIZE: usize = 4 * 1024;

/// Addressable pins on every supported SoC.
pub const MMIO_PIN_COUNT: u8 = 54;

// Register word offsets.
const GPFSEL0: usize = 0;
const GPSET0: usize = 7;
const GPCLR0: usize = 10;
const GPLEV0: usize = 13;
const GPPUD: usize = 37;
const GPPUDCLK0: usize = 38;
const GPPUPPDN0: usize = 57;
const GPPUPPDN3: usize = 60;

/// Legacy SoCs read this filler word ("gpio") where BCM2711 has its pull
/// control registers.
const LEGACY_FILLER: u32 = 0x6770_696f;

/// Settle time for the legacy pull clocking sequence (>= 150 core cycles).
const PULL_SETTLE: Duration = Duration::from_micros(1);

/// Pull register layout, probed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullLayout {
    /// BCM2835..2837: write-only GPPUD/GPPUDCLK clocking sequence.
    Legacy,
    /// BCM2711: two readable bits per pin in GPIO_PUP_PDN_CNTRL.
    Bcm2711,
}

/// GPIO bank backed by the memory-mapped register block.
pub struct MmioGpio {
    path: PathBuf,
    regs: Option<NonNull<u32>>,
    layout: PullLayout,
}

impl MmioGpio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            regs: None,
            layout: PullLayout::Legacy,
        }
    }

    /// Device node this bank maps.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_reg(&self, offset: usize) -> Option<u32> {
        let base = self.regs?;
        debug_assert!(offset * 4 < BLOCK_SIZE);
        // SAFETY: `base` maps BLOCK_SIZE bytes and every offset used by this
        // module lies inside the GPIO block.
        Some(unsafe { base.as_ptr().add(offset).read_volatile() })
    }

    fn write_reg(&mut self, offset: usize, value: u32) -> Result<()> {
        let base = self
            .regs
            .ok_or_else(|| GpioshError::Gpio("GPIO not open".to_string()))?;
        debug_assert!(offset * 4 < BLOCK_SIZE);
        // SAFETY: see `read_reg`.
        unsafe { base.as_ptr().add(offset).write_volatile(value) };
        Ok(())
    }

    fn unmap(&mut self) -> Result<()> {
        let Some(base) = self.regs.take() else {
            return Err(GpioshError::Gpio("GPIO not open".to_string()));
        };
        // SAFETY: `base` was returned by a successful mmap of BLOCK_SIZE bytes
        // and is not used after this call.
        let rc = unsafe { libc::munmap(base.as_ptr().cast(), BLOCK_SIZE) };
        if rc != 0 {
            return Err(GpioshError::Gpio(format!(
                "munmap {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    fn legacy_pull(&mut self, pin: Pin, pull: Pull) -> Result<()> {
        let code = match pull {
            Pull::Down => 1,
            Pull::Up => 2,
            _ => 0,
        };
        let clk = GPPUDCLK0 + pin as usize / 32;
        self.write_reg(GPPUD, code)?;
        std::thread::sleep(PULL_SETTLE);
        self.write_reg(clk, 1 << (pin % 32))?;
        std::thread::sleep(PULL_SETTLE);
        self.write_reg(GPPUD, 0)?;
        self.write_reg(clk, 0)
    }

    fn bcm2711_pull(&mut self, pin: Pin, pull: Pull) -> Result<()> {
        let code = match pull {
            Pull::Up => 1,
            Pull::Down => 2,
            _ => 0,
        };
        let offset = GPPUPPDN0 + pin as usize / 16;
        let shift = (pin % 16) * 2;
        let current = self.read_reg(offset).unwrap_or(0);
        self.write_reg(offset, (current & !(3 << shift)) | (code << shift))
    }
}

impl GpioService for MmioGpio {
    fn open(&mut self) -> Result<()> {
        if self.regs.is_some() {
            return Err(GpioshError::Gpio("GPIO already open".to_string()));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(&self.path)
            .map_err(|e| GpioshError::Gpio(format!("{}: {e}", self.path.display())))?;

        // SAFETY: mapping a fresh region of a valid descriptor; the kernel
        // picks the address. The mapping outlives `file`.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                BLOCK_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(GpioshError::Gpio(format!(
                "mmap {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            )));
        }
        self.regs = NonNull::new(ptr.cast::<u32>());

        self.layout = match self.read_reg(GPPUPPDN3) {
            Some(LEGACY_FILLER) | None => PullLayout::Legacy,
            Some(_) => PullLayout::Bcm2711,
        };
        log::info!(
            "Mapped GPIO registers from {} ({:?} pull layout)",
            self.path.display(),
            self.layout
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.unmap()
    }

    fn pin_count(&self) -> u8 {
        MMIO_PIN_COUNT
    }

    fn read(&self, pin: Pin) -> PinState {
        if pin >= MMIO_PIN_COUNT {
            return PinState::Unknown;
        }
        match self.read_reg(GPLEV0 + pin as usize / 32) {
            Some(level) if level & (1 << (pin % 32)) != 0 => PinState::High,
            Some(_) => PinState::Low,
            None => PinState::Unknown,
        }
    }

    fn write(&mut self, pin: Pin, state: PinState) -> Result<()> {
        check_pin(self.regs.is_some(), pin, MMIO_PIN_COUNT)?;
        let bank = pin as usize / 32;
        let bit = 1 << (pin % 32);
        match state {
            PinState::High => self.write_reg(GPSET0 + bank, bit),
            PinState::Low => self.write_reg(GPCLR0 + bank, bit),
            PinState::Unknown => Err(GpioshError::Gpio(format!(
                "cannot drive pin {pin} to an unknown level"
            ))),
        }
    }

    fn set_pull(&mut self, pin: Pin, pull: Pull) -> Result<()> {
        check_pin(self.regs.is_some(), pin, MMIO_PIN_COUNT)?;
        if pull == Pull::Unknown {
            return Err(GpioshError::Gpio(format!(
                "cannot set pin {pin} to an unknown pull"
            )));
        }
        match self.layout {
            PullLayout::Legacy => self.legacy_pull(pin, pull),
            PullLayout::Bcm2711 => self.bcm2711_pull(pin, pull),
        }
    }

    fn read_pull(&self, pin: Pin) -> Pull {
        if pin >= MMIO_PIN_COUNT || self.layout == PullLayout::Legacy {
            return Pull::Unknown;
        }
        let offset = GPPUPPDN0 + pin as usize / 16;
        let shift = (pin % 16) * 2;
        match self.read_reg(offset).map(|v| (v >> shift) & 3) {
            Some(0) => Pull::None,
            Some(1) => Pull::Up,
            Some(2) => Pull::Down,
            _ => Pull::Unknown,
        }
    }

    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<()> {
        check_pin(self.regs.is_some(), pin, MMIO_PIN_COUNT)?;
        let offset = GPFSEL0 + pin as usize / 10;
        let shift = (pin % 10) * 3;
        let mode = match direction {
            Direction::Input => 0b000,
            Direction::Output => 0b001,
        };
        let current = self.read_reg(offset).unwrap_or(0);
        self.write_reg(offset, (current & !(0b111 << shift)) | (mode << shift))
    }
}

impl Drop for MmioGpio {
    fn drop(&mut self) {
        if self.regs.is_some()
            && let Err(e) = self.unmap()
        {
            log::warn!("{e}");
        }
    }
}
