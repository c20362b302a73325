//! Module: event
//!
//! Purpose: Edge event records handed from the GPIO interrupt to the decoder.
//! One record per qualifying transition on the observed bus.
//!
//! Architecture:
//! - Compact 2-byte `#[repr(C)]` value, `Copy`, no allocation
//! - Created in interrupt context, consumed and discarded by the decoder
//! - Edge classification is pure logic so it can be tested on the host
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Kind of bus condition observed by the edge source.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// SDA fell while SCL was high.
    Start = 0,
    /// SDA rose while SCL was high.
    Stop = 1,
    /// SCL rose; SDA was sampled as a data bit.
    Bit = 2,
}

/// A single edge event.
///
/// Memory layout:
/// ```text
/// [kind:1][bit:1] = 2 bytes
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeEvent {
    /// What happened on the bus.
    pub kind: EventKind,

    /// Sampled SDA level. Only meaningful for [`EventKind::Bit`].
    pub bit: bool,
}

impl EdgeEvent {
    /// Placeholder used to initialise queue storage.
    pub const EMPTY: Self = Self::STOP;

    /// START condition.
    pub const START: Self = Self {
        kind: EventKind::Start,
        bit: false,
    };

    /// STOP condition.
    pub const STOP: Self = Self {
        kind: EventKind::Stop,
        bit: false,
    };

    /// Clocked data bit with the sampled SDA level.
    #[inline]
    pub const fn bit(level: bool) -> Self {
        Self {
            kind: EventKind::Bit,
            bit: level,
        }
    }
}

/// Classify an SDA transition.
///
/// SDA changes only mean something while SCL is high: falling is START,
/// rising is STOP. With SCL low it is an ordinary data setup change and
/// produces no event.
///
/// # Arguments
/// * `scl_high` - SCL level sampled in the SDA interrupt
/// * `sda_high` - SDA level after the transition
#[inline]
pub const fn classify_sda_edge(scl_high: bool, sda_high: bool) -> Option<EdgeEvent> {
    if !scl_high {
        return None;
    }
    if sda_high {
        Some(EdgeEvent::STOP)
    } else {
        Some(EdgeEvent::START)
    }
}

/// Classify an SCL rising edge: data is valid, sample SDA.
#[inline]
pub const fn classify_scl_rise(sda_high: bool) -> EdgeEvent {
    EdgeEvent::bit(sda_high)
}

/// Expand a byte into its eight BIT events, most-significant bit first.
///
/// This is the order the bits appear on the wire.
pub fn byte_bits(byte: u8) -> impl Iterator<Item = EdgeEvent> {
    (0..8).rev().map(move |shift| EdgeEvent::bit((byte >> shift) & 1 != 0))
}

// ============================================================================
// Tests
// ============================================================================
