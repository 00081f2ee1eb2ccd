//! Shell configuration.
//!
//! Loaded once at startup from an optional TOML file. Every field has a
//! default, so an empty file (or no file at all) yields a working config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GpioshError, Result};

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "GPIOSH_CONFIG";

/// Environment variable overriding the configured backend.
pub const BACKEND_ENV: &str = "GPIOSH_BACKEND";

/// Which GPIO backend drives the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Memory-mapped BCM283x / BCM2711 registers.
    Mmio,
    /// In-memory pins, for development machines and tests.
    Simulated,
}

impl BackendKind {
    /// Parse a backend name (case-insensitive). `sim` is accepted for `simulated`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mmio" => Some(Self::Mmio),
            "simulated" | "sim" => Some(Self::Simulated),
            _ => None,
        }
    }
}

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioshConfig {
    pub backend: BackendKind,
    /// Device node mapped by the MMIO backend.
    pub gpiomem_path: PathBuf,
    /// Number of pins `list` reports, starting at pin 0.
    pub list_pins: u8,
    /// Prompt prefix, rendered as `<prompt_name>@<hostname>> `.
    pub prompt_name: String,
    /// Consecutive line-read failures tolerated before the session stops.
    pub max_read_errors: u32,
}

impl Default for GpioshConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mmio,
            gpiomem_path: PathBuf::from("/dev/gpiomem"),
            list_pins: 28,
            prompt_name: "gpio".to_string(),
            max_read_errors: 3,
        }
    }
}

impl GpioshConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.max_read_errors == 0 {
            return Err(GpioshError::Config(
                "max_read_errors must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GpioshError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Resolve the effective config from the process environment.
    ///
    /// `GPIOSH_CONFIG` names a file to load (defaults otherwise) and
    /// `GPIOSH_BACKEND` overrides the backend.
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var(BACKEND_ENV).ok(),
        )
    }

    fn resolve(path: Option<PathBuf>, backend: Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)?
            },
            None => Self::default(),
        };
        if let Some(name) = backend {
            config.backend = BackendKind::from_name(&name).ok_or_else(|| {
                GpioshError::Config(format!("{BACKEND_ENV}: unknown backend '{name}'"))
            })?;
        }
        Ok(config)
    }

    /// The prompt shown before every line read.
    pub fn prompt(&self, hostname: &str) -> String {
        format!("{}@{hostname}> ", self.prompt_name)
    }
}
