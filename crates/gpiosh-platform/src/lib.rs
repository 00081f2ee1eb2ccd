//! Hardware abstraction for gpiosh.
//!
//! The shell only talks to a [`GpioService`]. Two backends exist: the
//! memory-mapped register bank used on Raspberry Pi boards, and an
//! in-memory bank used on development machines and in tests.

pub mod mmio;
pub mod services;

pub use mmio::MmioGpio;
pub use services::{GpioService, SimulatedGpio};

use gpiosh_types::config::{BackendKind, GpioshConfig};

/// Build the backend selected by `config`. The returned service is not open.
pub fn create_backend(config: &GpioshConfig) -> Box<dyn GpioService> {
    match config.backend {
        BackendKind::Mmio => Box::new(MmioGpio::new(config.gpiomem_path.clone())),
        BackendKind::Simulated => Box::new(SimulatedGpio::new()),
    }
}
