//! I2C transaction decoder finite state machine.
//!
//! Pure logic, no hardware dependencies. Consumes edge events,
//! produces trace records. Fully testable on host.
//!
//! # States
//!
//! ```text
//!          START
//! Idle ──────────▶ Address ──8 bits──▶ AckAddress ──1 bit──▶ Data
//!  ▲                                                        │  ▲
//!  │ STOP (any state): ",P" + emit                    8 bits│  │1 bit
//!  │ START (any state): emit partial, restart               ▼  │
//!  └──────────────────────────────────────────────────── AckData
//! ```
//!
//! Every (state, event) pair has a defined transition; nothing here fails.

use crate::event::{EdgeEvent, EventKind};
use crate::trace::{Ack, Direction, TraceLine, TraceSink, MAX_CAPTURE_DEPTH};

/// Default number of data bytes kept per transaction.
pub const DEFAULT_CAPTURE_DEPTH: usize = 64;

/// Decoder phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No transaction open.
    Idle,
    /// Shifting in the address + R/W byte.
    Address,
    /// Waiting for the address acknowledge bit.
    AckAddress,
    /// Shifting in a data byte.
    Data,
    /// Waiting for the data acknowledge bit.
    AckData,
}

/// Output format options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceFormat {
    /// Append `,A`/`,N` after every captured data byte.
    ///
    /// Off by default: the compact format only records the address ACK.
    pub data_acks: bool,
}

/// Decoder counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Records closed by a STOP.
    pub completed: u32,
    /// Records flushed without a STOP (repeated start, missed edge, shutdown).
    pub partial: u32,
    /// Data bytes not recorded because the capture depth was reached.
    pub bytes_dropped: u32,
    /// BIT/STOP events seen while idle.
    pub ignored: u32,
    /// Sink writes that returned an error.
    pub sink_errors: u32,
}

/// MSB-first bit accumulator.
#[derive(Clone, Copy, Debug, Default)]
struct ShiftReg {
    value: u8,
    count: u8,
}

impl ShiftReg {
    const fn new() -> Self {
        Self { value: 0, count: 0 }
    }

    /// Shift one bit in. Returns the byte once 8 bits are in.
    #[inline]
    fn shift(&mut self, bit: bool) -> Option<u8> {
        self.value = (self.value << 1) | bit as u8;
        self.count += 1;
        if self.count == 8 {
            let byte = self.value;
            self.reset();
            Some(byte)
        } else {
            None
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.value = 0;
        self.count = 0;
    }
}

/// I2C transaction decoder.
///
/// Owned by the single decoder task; never touched from interrupt context.
///
/// # Example
///
/// ```ignore
/// let mut decoder: Decoder = Decoder::new();
/// while let Some(event) = queue.try_dequeue() {
///     decoder.feed(event, &mut sink);
/// }
/// ```
pub struct Decoder<const DEPTH: usize = DEFAULT_CAPTURE_DEPTH> {
    // FSM state
    phase: Phase,
    shift: ShiftReg,

    // Current transaction
    address: u8,
    direction: Direction,
    data: [u8; DEPTH],
    data_len: usize,
    /// Whether the byte awaiting its ack was recorded.
    byte_kept: bool,
    line: TraceLine,

    // Format: requested vs latched for the open record
    format: TraceFormat,
    active_format: TraceFormat,

    stats: DecoderStats,
}

impl<const DEPTH: usize> Decoder<DEPTH> {
    /// Create an idle decoder with the compact format.
    pub const fn new() -> Self {
        Self::with_format(TraceFormat { data_acks: false })
    }

    /// Create an idle decoder with the given format.
    pub const fn with_format(format: TraceFormat) -> Self {
        const {
            assert!(DEPTH > 0, "Capture depth must be at least 1");
            assert!(DEPTH <= MAX_CAPTURE_DEPTH, "Capture depth exceeds trace line capacity");
        };

        Self {
            phase: Phase::Idle,
            shift: ShiftReg::new(),
            address: 0,
            direction: Direction::Write,
            data: [0u8; DEPTH],
            data_len: 0,
            byte_kept: false,
            line: TraceLine::new(),
            format,
            active_format: format,
            stats: DecoderStats {
                completed: 0,
                partial: 0,
                bytes_dropped: 0,
                ignored: 0,
                sink_errors: 0,
            },
        }
    }

    /// Change the output format.
    ///
    /// Takes effect at the next START so an open record keeps one format.
    pub fn set_format(&mut self, format: TraceFormat) {
        self.format = format;
    }

    /// Process one edge event.
    pub fn feed<S: TraceSink + ?Sized>(&mut self, event: EdgeEvent, sink: &mut S) {
        match event.kind {
            EventKind::Start => self.on_start(sink),
            EventKind::Stop => self.on_stop(sink),
            EventKind::Bit => self.on_bit(event.bit),
        }
    }

    /// Emit whatever is open as a partial record and go idle.
    ///
    /// Used at shutdown. No-op when idle.
    pub fn flush<S: TraceSink + ?Sized>(&mut self, sink: &mut S) {
        if self.phase != Phase::Idle {
            self.emit(sink);
            self.stats.partial = self.stats.partial.wrapping_add(1);
            self.reset();
        }
    }

    fn on_start<S: TraceSink + ?Sized>(&mut self, sink: &mut S) {
        // Repeated start or missed STOP: keep what we have, start over
        self.flush(sink);

        self.phase = Phase::Address;
        self.shift.reset();
        self.data_len = 0;
        self.active_format = self.format;
        self.line.push_start();
    }

    fn on_stop<S: TraceSink + ?Sized>(&mut self, sink: &mut S) {
        if self.phase == Phase::Idle {
            self.stats.ignored = self.stats.ignored.wrapping_add(1);
            return;
        }

        self.line.push_stop();
        self.emit(sink);
        self.stats.completed = self.stats.completed.wrapping_add(1);
        self.reset();
    }

    fn on_bit(&mut self, bit: bool) {
        match self.phase {
            Phase::Idle => {
                self.stats.ignored = self.stats.ignored.wrapping_add(1);
            }

            Phase::Address => {
                if let Some(byte) = self.shift.shift(bit) {
                    self.address = byte >> 1;
                    self.direction = Direction::from_bit(byte & 1 != 0);
                    self.line.push_address(self.address, self.direction);
                    self.phase = Phase::AckAddress;
                }
            }

            Phase::AckAddress => {
                self.line.push_ack(Ack::from_level(bit));
                self.shift.reset();
                self.phase = Phase::Data;
            }

            Phase::Data => {
                if let Some(byte) = self.shift.shift(bit) {
                    self.byte_kept = self.data_len < DEPTH;
                    if self.byte_kept {
                        self.data[self.data_len] = byte;
                        self.data_len += 1;
                        self.line.push_byte(byte);
                    } else {
                        // Keep bit alignment, lose the byte
                        self.stats.bytes_dropped = self.stats.bytes_dropped.wrapping_add(1);
                    }
                    self.phase = Phase::AckData;
                }
            }

            Phase::AckData => {
                // The ack of a dropped byte is not recorded either
                if self.active_format.data_acks && self.byte_kept {
                    self.line.push_ack(Ack::from_level(bit));
                }
                self.shift.reset();
                self.phase = Phase::Data;
            }
        }
    }

    fn emit<S: TraceSink + ?Sized>(&mut self, sink: &mut S) {
        if sink.write_line(self.line.as_str()).is_err() {
            self.stats.sink_errors = self.stats.sink_errors.wrapping_add(1);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.shift.reset();
        self.data_len = 0;
        self.byte_kept = false;
        self.line.clear();
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Check if no transaction is open.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Address of the open transaction, once its first byte is complete.
    pub fn address(&self) -> Option<u8> {
        match self.phase {
            Phase::Idle | Phase::Address => None,
            _ => Some(self.address),
        }
    }

    /// Direction of the open transaction, once its first byte is complete.
    pub fn direction(&self) -> Option<Direction> {
        self.address().map(|_| self.direction)
    }

    /// Data bytes captured so far in the open transaction.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_len]
    }

    /// The record being assembled (empty when idle).
    #[inline]
    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    /// Counters since construction.
    #[inline]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Maximum data bytes kept per transaction.
    #[inline]
    pub const fn capture_depth(&self) -> usize {
        DEPTH
    }
}

impl<const DEPTH: usize> Default for Decoder<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}
