//! Error types for gpiosh.

use std::io;

/// Errors produced by the gpiosh crates.
#[derive(Debug, thiserror::Error)]
pub enum GpioshError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("not enough arguments, expected {expected}")]
    NotEnoughArgs {
        /// The name the command was invoked under.
        name: String,
        expected: usize,
    },

    #[error("invalid pin number: {0}")]
    InvalidPin(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid mode: {0}, hint: state/pull/input/output")]
    InvalidMode(String),

    #[error("invalid state{}, hint: high/low, 1/0, on/off, true/false", offending(.0))]
    InvalidState(Option<String>),

    #[error("invalid pull{}, hint: none/up/down/off", offending(.0))]
    InvalidPull(Option<String>),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

fn offending(token: &Option<String>) -> String {
    match token {
        Some(t) => format!(": {t}"),
        None => String::new(),
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GpioshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_display() {
        let e = GpioshError::UnknownCommand("bogus".into());
        assert_eq!(format!("{e}"), "unknown command: bogus");
    }

    #[test]
    fn not_enough_args_display() {
        let e = GpioshError::NotEnoughArgs {
            name: "cat".into(),
            expected: 1,
        };
        assert_eq!(format!("{e}"), "not enough arguments, expected 1");
    }

    #[test]
    fn invalid_pin_display() {
        let e = GpioshError::InvalidPin("x7".into());
        assert_eq!(format!("{e}"), "invalid pin number: x7");
    }

    #[test]
    fn invalid_duration_display() {
        let e = GpioshError::InvalidDuration("2x".into());
        assert_eq!(format!("{e}"), "invalid duration: 2x");
    }

    #[test]
    fn invalid_mode_display() {
        let e = GpioshError::InvalidMode("blink".into());
        assert_eq!(
            format!("{e}"),
            "invalid mode: blink, hint: state/pull/input/output"
        );
    }

    #[test]
    fn invalid_state_with_token() {
        let e = GpioshError::InvalidState(Some("maybe".into()));
        assert_eq!(
            format!("{e}"),
            "invalid state: maybe, hint: high/low, 1/0, on/off, true/false"
        );
    }

    #[test]
    fn invalid_state_missing_token() {
        let e = GpioshError::InvalidState(None);
        assert_eq!(
            format!("{e}"),
            "invalid state, hint: high/low, 1/0, on/off, true/false"
        );
    }

    #[test]
    fn invalid_pull_display() {
        let e = GpioshError::InvalidPull(Some("sideways".into()));
        assert_eq!(
            format!("{e}"),
            "invalid pull: sideways, hint: none/up/down/off"
        );
        let e = GpioshError::InvalidPull(None);
        assert_eq!(format!("{e}"), "invalid pull, hint: none/up/down/off");
    }

    #[test]
    fn gpio_error_display() {
        let e = GpioshError::Gpio("/dev/gpiomem: permission denied".into());
        assert_eq!(
            format!("{e}"),
            "GPIO error: /dev/gpiomem: permission denied"
        );
    }

    #[test]
    fn config_error_display() {
        let e = GpioshError::Config("missing file".into());
        assert_eq!(format!("{e}"), "config error: missing file");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: GpioshError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let bad_toml = "this is [[[not valid toml";
        let toml_err = toml::from_str::<toml::Value>(bad_toml).unwrap_err();
        let e: GpioshError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn result_alias_err() {
        let r: Result<i32> = Err(GpioshError::Command("oops".into()));
        assert!(r.is_err());
    }
}
