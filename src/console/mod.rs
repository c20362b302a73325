//! Serial console for configuration and diagnostics
//!
//! Polled by the service task - no dedicated task.
//! Zero heap allocation - all static buffers.

pub mod commands;
pub mod console;
pub mod error;
pub mod line_buffer;
pub mod parser;

pub use commands::{command_names, execute, COMMANDS};
pub use console::{Console, VERSION};
pub use error::ConsoleError;
pub use line_buffer::{LineBuffer, LINE_SIZE};
pub use parser::{parse_line, ParsedCommand};
