//! gpiosh entry point.
//!
//! Interactive shell for inspecting and driving GPIO lines. Type `help` at
//! the `gpio@<host>> ` prompt for the command list; `exit`, Ctrl-C, or
//! Ctrl-D leave the shell.

mod console;

use std::io::{self, BufReader};
use std::os::fd::AsRawFd;

use anyhow::{Context, Result};

use console::{LineEditor, RawMode};
use gpiosh_platform::GpioService;
use gpiosh_terminal::{BufReadSource, Environment, Session, ShutdownReason, build_registry};
use gpiosh_types::config::GpioshConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GpioshConfig::from_env().context("loading configuration")?;
    log::info!("Starting gpiosh ({:?} backend)", config.backend);

    let mut gpio = gpiosh_platform::create_backend(&config);
    gpio.open().context("opening GPIO")?;

    // Close the bank even if the shell itself failed.
    let result = run_shell(&config, gpio.as_mut());
    let closed = gpio.close().context("closing GPIO");
    let reason = result?;
    closed?;

    log::info!("Shut down ({reason:?})");
    Ok(())
}

fn run_shell(config: &GpioshConfig, gpio: &mut dyn GpioService) -> Result<ShutdownReason> {
    let host = console::hostname().unwrap_or_else(|| "unknown".to_string());
    let prompt = config.prompt(&host);
    let registry = build_registry();

    // Link signals before the terminal enters raw mode.
    let mut session = Session::new(config.max_read_errors);
    let cancel = session.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel()).context("installing interrupt handler")?;

    let stdin = io::stdin();
    // Restored on drop, on every path out of this function.
    let raw = RawMode::enable(stdin.as_raw_fd()).context("enabling raw terminal mode")?;
    if raw.is_some() {
        session.start(LineEditor::new(prompt, stdin))?;
    } else {
        log::info!("stdin is not a terminal; reading plain lines");
        let source = BufReadSource::new(BufReader::new(stdin))
            .with_prompt(prompt, Box::new(io::stdout()));
        session.start(source)?;
    }

    let mut env = Environment {
        gpio,
        list_pins: config.list_pins,
    };
    let reason = session.run(&registry, &mut env, &mut io::stdout(), &mut io::stderr())?;
    if reason == ShutdownReason::Interrupted && raw.is_some() {
        // Leave the cursor on a fresh line after a signal at the prompt.
        println!();
    }
    Ok(reason)
}
