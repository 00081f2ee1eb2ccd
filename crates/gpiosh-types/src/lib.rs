//! Foundation types for gpiosh.
//!
//! This crate contains the hardware-agnostic types shared by every gpiosh
//! crate: pin levels and pull configurations, shell configuration, and the
//! error type.

pub mod config;
pub mod error;
pub mod gpio;
