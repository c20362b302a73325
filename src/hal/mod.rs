//! Hardware Abstraction Layer for the sniffer.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Decoding stays in core modules, HAL is just I/O.

pub mod edges;
pub mod signal;
pub mod uart;

pub use edges::{DECODER_SIGNAL, EVENT_QUEUE};
pub use signal::TaskSignal;
pub use uart::{init_service_uart, init_trace_uart, UartSink};
