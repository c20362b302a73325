//! Global instances shared between tasks.
//!
//! One log stream per producing task so each stream stays single-producer.

use crate::config::SnifferConfig;
use crate::logging::LogStream;
use crate::stats::SnifferStats;

/// Decoder task log stream.
///
/// Single producer (decoder task), single consumer (service task drain).
pub static SNIFFER_LOG: LogStream = LogStream::new();

/// System log stream for startup code and the service task.
///
/// Startup writes before the service task exists, so there is still only
/// one producer at a time.
pub static SYSTEM_LOG: LogStream = LogStream::new();

/// Decoder counters published for the console.
pub static SNIFFER_STATS: SnifferStats = SnifferStats::new();

/// Runtime configuration.
pub static CONFIG: SnifferConfig = SnifferConfig::new();
