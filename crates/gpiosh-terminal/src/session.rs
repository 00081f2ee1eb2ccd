//! Interactive read-eval loop and its cancellation link.
//!
//! A reader thread owns the line source and reads exactly one line each time
//! the dispatch thread asks for one. Its results share a channel with
//! cancellation requests, so the dispatch thread blocks in one place and an
//! interrupt that arrives while it waits for input ends the loop at once. An
//! interrupt that arrives while a line is being dispatched (including during
//! `sleep`) stays queued until that line has finished.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, Sender};

use gpiosh_types::error::{GpioshError, Result};

use crate::interpreter::{CommandRegistry, Environment, Flow};

/// One result of asking the line source for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A complete line, without its terminator.
    Line(String),
    /// The user pressed the interrupt key at the prompt.
    Interrupt,
    /// The source is exhausted.
    Eof,
}

/// A blocking source of input lines. Implementations print their own prompt.
pub trait LineSource: Send {
    fn read_line(&mut self) -> io::Result<Input>;
}

/// Lines from any buffered reader, with an optional prompt.
pub struct BufReadSource<R> {
    reader: R,
    prompt: Option<(String, Box<dyn Write + Send>)>,
}

impl<R: BufRead + Send> BufReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: None,
        }
    }

    /// Print `prompt` to `writer` before every read.
    pub fn with_prompt(
        mut self,
        prompt: impl Into<String>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        self.prompt = Some((prompt.into(), writer));
        self
    }
}

impl<R: BufRead + Send> LineSource for BufReadSource<R> {
    fn read_line(&mut self) -> io::Result<Input> {
        if let Some((prompt, writer)) = &mut self.prompt {
            writer.write_all(prompt.as_bytes())?;
            writer.flush()?;
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(Input::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Input::Line(line))
    }
}

enum Event {
    Read(io::Result<Input>),
    Cancel,
}

/// Cloneable handle that stops a running session from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    events: Sender<Event>,
}

impl CancelHandle {
    /// Request shutdown. Observed the next time the session waits for input.
    pub fn cancel(&self) {
        // A closed channel means the session already stopped.
        let _ = self.events.send(Event::Cancel);
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Cancelled,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The `exit` command ran.
    ExitCommand,
    /// An external interrupt or the interrupt key.
    Interrupted,
    /// The line source is exhausted.
    EndOfInput,
    /// Too many consecutive line-read failures.
    ReadFailures,
}

/// The interactive read-eval loop.
pub struct Session {
    requests: Sender<()>,
    /// Handed to the reader thread by `start`.
    request_rx: Option<Receiver<()>>,
    events: Receiver<Event>,
    cancel: CancelHandle,
    max_read_errors: u32,
    stopped: Option<ShutdownReason>,
}

impl Session {
    /// Create a session without a reader. Its cancel handle is live at
    /// once, so an interrupt can be linked before input is touched.
    pub fn new(max_read_errors: u32) -> Self {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (event_tx, events) = mpsc::channel();
        Self {
            requests,
            request_rx: Some(request_rx),
            events,
            cancel: CancelHandle { events: event_tx },
            max_read_errors: max_read_errors.max(1),
            stopped: None,
        }
    }

    /// Start the reader thread for `source`. A session has one reader.
    pub fn start(&mut self, source: impl LineSource + 'static) -> Result<()> {
        let request_rx = self
            .request_rx
            .take()
            .ok_or_else(|| {
                GpioshError::Command("session reader already started".to_string())
            })?;
        let reader_tx = self.cancel.events.clone();
        let mut source = source;

        std::thread::Builder::new()
            .name("gpiosh-reader".to_string())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    let input = source.read_line();
                    let exhausted = matches!(input, Ok(Input::Eof));
                    if reader_tx.send(Event::Read(input)).is_err() || exhausted {
                        break;
                    }
                }
            })?;
        Ok(())
    }

    /// `new` followed by `start`. The session is `Running` once this
    /// returns.
    pub fn spawn(source: impl LineSource + 'static, max_read_errors: u32) -> Result<Self> {
        let mut session = Self::new(max_read_errors);
        session.start(source)?;
        Ok(session)
    }

    /// Handle for linking an external interrupt to this session.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        match self.stopped {
            Some(_) => SessionState::Cancelled,
            None => SessionState::Running,
        }
    }

    /// Run until cancelled. Command output goes to `out`, read failures to
    /// `diag`. Errors are a failure to write output or a reader that was
    /// never started.
    pub fn run(
        &mut self,
        registry: &CommandRegistry,
        env: &mut Environment<'_>,
        out: &mut dyn Write,
        diag: &mut dyn Write,
    ) -> Result<ShutdownReason> {
        if let Some(reason) = self.stopped {
            return Ok(reason);
        }
        if self.request_rx.is_some() {
            return Err(GpioshError::Command("session reader not started".to_string()));
        }
        let mut read_errors = 0u32;
        let reason = loop {
            if self.cancel_queued() {
                break ShutdownReason::Interrupted;
            }
            // A failed send means the reader thread is gone.
            if self.requests.send(()).is_err() {
                break ShutdownReason::EndOfInput;
            }
            let Ok(event) = self.events.recv() else {
                break ShutdownReason::EndOfInput;
            };
            match event {
                Event::Cancel | Event::Read(Ok(Input::Interrupt)) => {
                    break ShutdownReason::Interrupted;
                },
                Event::Read(Ok(Input::Eof)) => break ShutdownReason::EndOfInput,
                Event::Read(Ok(Input::Line(line))) => {
                    read_errors = 0;
                    if registry.execute_line(&line, env, out)? == Flow::Exit {
                        break ShutdownReason::ExitCommand;
                    }
                },
                Event::Read(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {},
                Event::Read(Err(e)) => {
                    read_errors += 1;
                    log::warn!(
                        "line read failed ({read_errors}/{}): {e}",
                        self.max_read_errors
                    );
                    writeln!(diag, "error reading command: {e}")?;
                    diag.flush()?;
                    if read_errors >= self.max_read_errors {
                        break ShutdownReason::ReadFailures;
                    }
                },
            }
        };
        log::info!("session stopped: {reason:?}");
        self.stopped = Some(reason);
        Ok(reason)
    }

    /// Whether a cancel arrived while the last line was dispatched. Reads are
    /// requested one at a time, so no line result can be waiting here.
    fn cancel_queued(&self) -> bool {
        self.events
            .try_iter()
            .any(|event| matches!(event, Event::Cancel))
    }
}
