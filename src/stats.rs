//! Shared sniffer statistics.
//!
//! The decoder's own counters live in its task. They are published here
//! after each batch so other tasks (console, periodic report) can read
//! them without touching decoder state.
//!
//! Single writer (decoder task), any number of readers.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::decoder::DecoderStats;

/// Thread-safe snapshot holder.
///
/// # Usage
///
/// ```ignore
/// static STATS: SnifferStats = SnifferStats::new();
///
/// // Decoder task, after processing a batch:
/// STATS.publish(&decoder.stats(), queue.overflow_count(), queue.len() as u32);
///
/// // Console:
/// let s = STATS.snapshot();
/// ```
pub struct SnifferStats {
    /// Records closed by a STOP.
    completed: AtomicU32,

    /// Records flushed without a STOP.
    partial: AtomicU32,

    /// Data bytes past the capture depth.
    bytes_dropped: AtomicU32,

    /// Events ignored while idle.
    ignored: AtomicU32,

    /// Failed sink writes.
    sink_errors: AtomicU32,

    /// Events lost on a full queue (mirrors the queue's own counter).
    queue_overflow: AtomicU32,

    /// Highest queue fill level observed by the decoder task.
    queue_peak: AtomicU32,
}

impl SnifferStats {
    /// Create zeroed statistics.
    pub const fn new() -> Self {
        Self {
            completed: AtomicU32::new(0),
            partial: AtomicU32::new(0),
            bytes_dropped: AtomicU32::new(0),
            ignored: AtomicU32::new(0),
            sink_errors: AtomicU32::new(0),
            queue_overflow: AtomicU32::new(0),
            queue_peak: AtomicU32::new(0),
        }
    }

    /// Publish decoder and queue counters.
    #[inline]
    pub fn publish(&self, decoder: &DecoderStats, queue_overflow: u32, queue_len: u32) {
        self.completed.store(decoder.completed, Ordering::Relaxed);
        self.partial.store(decoder.partial, Ordering::Relaxed);
        self.bytes_dropped.store(decoder.bytes_dropped, Ordering::Relaxed);
        self.ignored.store(decoder.ignored, Ordering::Relaxed);
        self.sink_errors.store(decoder.sink_errors, Ordering::Relaxed);
        self.queue_overflow.store(queue_overflow, Ordering::Relaxed);
        self.queue_peak.fetch_max(queue_len, Ordering::Relaxed);
    }

    /// Get events lost on a full queue.
    #[inline]
    pub fn queue_overflow(&self) -> u32 {
        self.queue_overflow.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    #[inline]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            queue_overflow: self.queue_overflow.load(Ordering::Relaxed),
            queue_peak: self.queue_peak.load(Ordering::Relaxed),
        }
    }
}

impl Default for SnifferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of sniffer statistics at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub completed: u32,
    pub partial: u32,
    pub bytes_dropped: u32,
    pub ignored: u32,
    pub sink_errors: u32,
    pub queue_overflow: u32,
    pub queue_peak: u32,
}
