//! # esp32-i2c-sniffer
//!
//! Passive I2C bus monitor: watches SDA/SCL on two GPIO inputs and prints
//! one text record per transaction, e.g. `S,0x28,R,A,0xCA,P`.
//!
//! ## Architecture
//!
//! ```text
//! GPIO ISR ──EdgeEvent──▶ EventQueue ──▶ Sniffer task ──▶ Decoder ──▶ TraceSink (UART0)
//!                                            │
//!                                            └─ SNIFFER_LOG / SNIFFER_STATS
//!                                                    │
//!                         service task (UART1) ◀─────┘  logs, console, reports
//! ```
//!
//! - The interrupt side only classifies edges and enqueues; it never blocks
//! - One task owns the decoder and the trace sink
//! - No mutexes: atomics and SPSC rings between contexts
//!
//! Everything outside `hal` runs on the host and is covered by `cargo test`.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod console;
pub mod decoder;
pub mod event;
pub mod globals;
pub mod logging;
pub mod queue;
pub mod service_port;
pub mod sniffer;
pub mod stats;
pub mod trace;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use config::SnifferConfig;
pub use decoder::{Decoder, DecoderStats, Phase, TraceFormat};
pub use event::{EdgeEvent, EventKind};
pub use globals::{CONFIG, SNIFFER_LOG, SNIFFER_STATS, SYSTEM_LOG};
pub use queue::{EventQueue, SpinWaiter, Waiter};
pub use sniffer::Sniffer;
pub use stats::{SnifferStats, StatsSnapshot};
pub use trace::{TraceLine, TraceSink};
