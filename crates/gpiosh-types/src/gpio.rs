//! Hardware-agnostic GPIO pin types.
//!
//! Every backend maps its register contents to these enums. The shell never
//! sees raw register values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A pin identifier (BCM numbering).
pub type Pin = u8;

/// Logical level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinState {
    Low,
    High,
    /// The backend could not read the level.
    Unknown,
}

impl PinState {
    /// Parse a level keyword (case-insensitive).
    ///
    /// Accepts `high`/`1`/`on`/`true` and `low`/`0`/`off`/`false`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "high" | "1" | "on" | "true" => Some(Self::High),
            "low" | "0" | "off" | "false" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::High => write!(f, "High"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Internal pull resistor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pull {
    None,
    Up,
    Down,
    Off,
    /// The backend cannot report the pull (e.g. BCM2835 has no readback).
    Unknown,
}

impl Pull {
    /// Parse a pull keyword (case-insensitive): `none`, `up`, `down`, `off`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
            Self::Off => write!(f, "Off"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}
