//! Console line discipline

use core::fmt::Write;

use super::{execute, parse_line, ConsoleError, LineBuffer};

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Console state: one line being typed.
pub struct Console {
    line: LineBuffer,
    /// Last byte was CR, swallow a following LF
    after_cr: bool,
}

impl Console {
    /// Create new console
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            after_cr: false,
        }
    }

    /// Process a single input byte.
    ///
    /// Returns `Some(result)` when a command ran, `None` otherwise. Errors
    /// are also printed as `E0x: message` before the next prompt.
    pub fn process_byte(&mut self, byte: u8, out: &mut dyn Write) -> Option<Result<(), ConsoleError>> {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');

        match byte {
            // CRLF counts once
            b'\n' if after_cr => None,

            b'\r' | b'\n' => {
                let _ = writeln!(out);
                let result = if self.line.is_empty() {
                    None
                } else {
                    let result = execute(&parse_line(self.line.as_str()), out);
                    if let Err(e) = result {
                        let _ = writeln!(out, "{}", e);
                    }
                    self.line.clear();
                    Some(result)
                };
                self.print_prompt(out);
                result
            }

            // Backspace / DEL
            0x7F | 0x08 => {
                if self.line.backspace() {
                    let _ = write!(out, "\x08 \x08");
                }
                None
            }

            // Ctrl+C
            0x03 => {
                let _ = writeln!(out, "^C");
                self.line.clear();
                self.print_prompt(out);
                None
            }

            // Ctrl+U (clear line)
            0x15 => {
                for _ in 0..self.line.len() {
                    let _ = write!(out, "\x08 \x08");
                }
                self.line.clear();
                None
            }

            // Printable character, echoed if it fits
            0x20..=0x7E => {
                if self.line.push(byte) {
                    let _ = write!(out, "{}", byte as char);
                }
                None
            }

            _ => None,
        }
    }

    /// Current input line
    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    /// Print the prompt
    pub fn print_prompt(&self, out: &mut dyn Write) {
        let _ = write!(out, "sniffer> ");
    }

    /// Print welcome banner
    pub fn print_banner(&self, out: &mut dyn Write) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", VERSION);
        let _ = writeln!(out, "Type 'help' for commands.");
        self.print_prompt(out);
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
