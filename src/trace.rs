//! Trace records and the sink they are written to.
//!
//! Record format (field order is fixed, parsed by external tooling):
//!
//! ```text
//! S,0xAA,{W|R},{A|N}[,0xDD]*[,P]
//! ```
//!
//! Lines starting with `# ` on the same channel are comments.

use core::fmt::{self, Write};

/// Largest capture depth a decoder may be built with.
pub const MAX_CAPTURE_DEPTH: usize = 64;

/// Longest possible record: `S` + `,0xAA,W,A` + per byte `,0xDD,A` + `,P`.
pub const LINE_CAPACITY: usize = 1 + 9 + MAX_CAPTURE_DEPTH * 7 + 2;

/// Destination for trace records.
///
/// Called only from the decoder task. Errors belong to the sink; the decoder
/// counts them and carries on.
pub trait TraceSink {
    type Error;

    /// Write bytes as-is, no terminator added.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Push buffered output to the wire.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Write one line, terminate it and flush.
    fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        self.write_raw(line.as_bytes())?;
        self.write_raw(b"\n")?;
        self.flush()
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    type Error = S::Error;

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write_raw(bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }

    fn write_line(&mut self, line: &str) -> Result<(), Self::Error> {
        (**self).write_line(line)
    }
}

/// Acknowledge bit as seen on the wire (low = acknowledged).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nak,
}

impl Ack {
    /// Decode from the sampled SDA level.
    #[inline]
    pub const fn from_level(high: bool) -> Self {
        if high {
            Ack::Nak
        } else {
            Ack::Ack
        }
    }

    /// Trace field letter.
    pub const fn as_char(self) -> char {
        match self {
            Ack::Ack => 'A',
            Ack::Nak => 'N',
        }
    }
}

/// Transfer direction from the low bit of the address byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    /// Decode from the R/W bit (1 = read).
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Direction::Read
        } else {
            Direction::Write
        }
    }

    /// Trace field letter.
    pub const fn as_char(self) -> char {
        match self {
            Direction::Write => 'W',
            Direction::Read => 'R',
        }
    }
}

/// Fixed-capacity text buffer for the record being assembled.
///
/// Sized so a record of [`MAX_CAPTURE_DEPTH`] bytes always fits; writes past
/// the end are truncated rather than failing.
pub struct TraceLine {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl TraceLine {
    /// Create empty line
    pub const fn new() -> Self {
        Self {
            buf: [0u8; LINE_CAPACITY],
            len: 0,
        }
    }

    /// Start marker.
    pub fn push_start(&mut self) {
        let _ = self.write_str("S");
    }

    /// Address and direction fields.
    pub fn push_address(&mut self, address: u8, direction: Direction) {
        let _ = write!(self, ",0x{:02X},{}", address, direction.as_char());
    }

    /// Acknowledge field.
    pub fn push_ack(&mut self, ack: Ack) {
        let _ = write!(self, ",{}", ack.as_char());
    }

    /// One data byte.
    pub fn push_byte(&mut self, byte: u8) {
        let _ = write!(self, ",0x{:02X}", byte);
    }

    /// Stop marker.
    pub fn push_stop(&mut self) {
        let _ = self.write_str(",P");
    }

    /// Get line as string slice
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// Get line length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Clear line
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for TraceLine {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for TraceLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let available = self.buf.len() - self.len;
        let to_copy = bytes.len().min(available);
        self.buf[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write a `# `-prefixed comment line to a sink.
///
/// Used for banners and errors that share the trace channel.
pub fn write_comment<S: TraceSink + ?Sized>(
    sink: &mut S,
    args: fmt::Arguments<'_>,
) -> Result<(), S::Error> {
    let mut line = TraceLine::new();
    let _ = line.write_str("# ");
    let _ = line.write_fmt(args);
    sink.write_line(line.as_str())
}
