//! Terminal plumbing: raw mode, the interactive line editor, host name.

use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::RawFd;

use gpiosh_terminal::{Input, LineSource};

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const ESC: u8 = 0x1b;
const DELETE: u8 = 0x7f;

// ---------------------------------------------------------------------------
// Raw mode
// ---------------------------------------------------------------------------

/// Puts a TTY into raw mode and restores the saved attributes on drop.
///
/// Output post-processing stays on so `\n` still reaches the screen as CRLF.
pub struct RawMode {
    fd: RawFd,
    original: libc::termios,
}

impl RawMode {
    /// Enable raw mode on `fd`. Returns `None` when `fd` is not a terminal.
    pub fn enable(fd: RawFd) -> io::Result<Option<Self>> {
        // SAFETY: isatty only inspects the descriptor.
        if unsafe { libc::isatty(fd) } != 1 {
            return Ok(None);
        }
        let mut attrs = MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fills the struct on success.
        if unsafe { libc::tcgetattr(fd, attrs.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: initialised by the successful tcgetattr above.
        let original = unsafe { attrs.assume_init() };

        let mut raw = original;
        // SAFETY: cfmakeraw only rewrites the flags of the struct it is given.
        unsafe { libc::cfmakeraw(&mut raw) };
        raw.c_oflag |= libc::OPOST | libc::ONLCR;
        // SAFETY: `raw` is a fully initialised termios.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        log::debug!("raw mode enabled on fd {fd}");
        Ok(Some(Self { fd, original }))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        // SAFETY: restores the attributes read in `enable`.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.original) } != 0 {
            log::warn!(
                "failed to restore terminal: {}",
                io::Error::last_os_error()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Line editor
// ---------------------------------------------------------------------------

/// Minimal line editor for a raw-mode terminal: echo, backspace, Enter,
/// Ctrl-C, and Ctrl-D on an empty line. Escape sequences (arrow keys and
/// the like) are swallowed.
pub struct LineEditor<R> {
    prompt: String,
    input: R,
}

impl<R: Read> LineEditor<R> {
    pub fn new(prompt: String, input: R) -> Self {
        Self { prompt, input }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Consume the rest of an escape sequence (`ESC [ ... final` or `ESC x`).
    fn skip_escape(&mut self) -> io::Result<()> {
        match self.next_byte()? {
            Some(b'[') | Some(b'O') => {
                while let Some(b) = self.next_byte()? {
                    if (0x40..=0x7e).contains(&b) {
                        break;
                    }
                }
            },
            _ => {},
        }
        Ok(())
    }
}

/// Drop the last UTF-8 character from `line`. Returns false if it was empty.
fn pop_char(line: &mut Vec<u8>) -> bool {
    while let Some(b) = line.pop() {
        if b & 0xc0 != 0x80 {
            return true;
        }
    }
    false
}

impl<R: Read + Send> LineSource for LineEditor<R> {
    fn read_line(&mut self) -> io::Result<Input> {
        let mut out = io::stdout();
        out.write_all(self.prompt.as_bytes())?;
        out.flush()?;

        let mut line = Vec::new();
        loop {
            let Some(byte) = self.next_byte()? else {
                out.write_all(b"\n")?;
                out.flush()?;
                if line.is_empty() {
                    return Ok(Input::Eof);
                }
                break;
            };
            match byte {
                b'\r' | b'\n' => {
                    out.write_all(b"\n")?;
                    break;
                },
                CTRL_C => {
                    out.write_all(b"^C\n")?;
                    out.flush()?;
                    return Ok(Input::Interrupt);
                },
                CTRL_D if line.is_empty() => {
                    out.write_all(b"\n")?;
                    out.flush()?;
                    return Ok(Input::Eof);
                },
                BACKSPACE | DELETE => {
                    if pop_char(&mut line) {
                        out.write_all(b"\x08 \x08")?;
                    }
                },
                ESC => self.skip_escape()?,
                b if b >= 0x20 => {
                    line.push(b);
                    out.write_all(&[b])?;
                },
                _ => {},
            }
            out.flush()?;
        }
        out.flush()?;
        Ok(Input::Line(String::from_utf8_lossy(&line).into_owned()))
    }
}

// ---------------------------------------------------------------------------
// Host name
// ---------------------------------------------------------------------------

/// The machine's host name, or `None` if it cannot be read.
pub fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes.
    if unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) } != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = std::str::from_utf8(&buf[..end]).ok()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}
