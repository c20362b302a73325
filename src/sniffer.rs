//! Decoder task loop.
//!
//! Glues the event queue to the decoder and the trace sink, and keeps the
//! shared statistics current.
//!
//! # Rules
//!
//! - One `Sniffer` per queue: it is the queue's only consumer
//! - It owns the sink, so trace lines are never interleaved
//! - It never blocks anything but itself; a full queue is the ISR's problem,
//!   reported here as a warning

use crate::config::SnifferConfig;
use crate::decoder::{Decoder, TraceFormat, DEFAULT_CAPTURE_DEPTH};
use crate::logging::{timestamp_us, LogStream};
use crate::queue::{EventQueue, Waiter, EVENT_QUEUE_LEN};
use crate::stats::SnifferStats;
use crate::trace::TraceSink;

/// Decoder task state.
///
/// # Example
///
/// ```ignore
/// static QUEUE: EventQueue = EventQueue::new();
///
/// let mut sniffer = Sniffer::new(&QUEUE, uart_sink, &CONFIG, &SNIFFER_STATS, &SNIFFER_LOG);
/// sniffer.run(&signal);
/// ```
pub struct Sniffer<
    'a,
    S: TraceSink,
    const N: usize = EVENT_QUEUE_LEN,
    const DEPTH: usize = DEFAULT_CAPTURE_DEPTH,
> {
    queue: &'a EventQueue<N>,
    decoder: Decoder<DEPTH>,
    sink: S,
    config: &'a SnifferConfig,
    stats: &'a SnifferStats,
    log: &'a LogStream,

    // Last values reported, to log deltas only
    config_gen: u16,
    seen_overflow: u32,
    seen_sink_errors: u32,
}

impl<'a, S: TraceSink, const N: usize, const DEPTH: usize> Sniffer<'a, S, N, DEPTH> {
    /// Create the task state. The trace format is taken from `config`.
    pub fn new(
        queue: &'a EventQueue<N>,
        sink: S,
        config: &'a SnifferConfig,
        stats: &'a SnifferStats,
        log: &'a LogStream,
    ) -> Self {
        Self {
            queue,
            decoder: Decoder::with_format(TraceFormat {
                data_acks: config.data_acks(),
            }),
            sink,
            config,
            stats,
            log,
            config_gen: config.generation(),
            seen_overflow: queue.overflow_count(),
            seen_sink_errors: 0,
        }
    }

    /// Decode everything currently queued without blocking.
    ///
    /// Returns the number of events processed.
    pub fn poll(&mut self) -> usize {
        let backlog = self.queue.len();
        let count = self.drain_queue();
        self.housekeeping(backlog);
        count
    }

    /// Wait for at least one event, then decode the whole backlog.
    ///
    /// Returns the number of events processed (always at least one).
    pub fn step<W: Waiter + ?Sized>(&mut self, waiter: &W) -> usize {
        let first = self.queue.dequeue_blocking(waiter);
        let backlog = self.queue.len() + 1;
        self.decoder.feed(first, &mut self.sink);

        let count = 1 + self.drain_queue();
        self.housekeeping(backlog);
        count
    }

    /// Decoder task body. Never returns.
    pub fn run<W: Waiter + ?Sized>(&mut self, waiter: &W) -> ! {
        loop {
            self.step(waiter);
        }
    }

    /// Decode what is left, then emit any open transaction as partial.
    pub fn shutdown(&mut self) {
        let backlog = self.queue.len();
        self.drain_queue();
        self.decoder.flush(&mut self.sink);
        self.housekeeping(backlog);
    }

    fn drain_queue(&mut self) -> usize {
        let mut count = 0;
        for event in self.queue.drain() {
            self.decoder.feed(event, &mut self.sink);
            count += 1;
        }
        count
    }

    fn housekeeping(&mut self, backlog: usize) {
        let now = timestamp_us();

        let generation = self.config.generation();
        if generation != self.config_gen {
            self.config_gen = generation;
            let data_acks = self.config.data_acks();
            self.decoder.set_format(TraceFormat { data_acks });
            crate::rt_debug!(self.log, now, "trace format: data_acks={}", data_acks);
        }

        let overflow = self.queue.overflow_count();
        if overflow != self.seen_overflow {
            let lost = overflow.wrapping_sub(self.seen_overflow);
            self.seen_overflow = overflow;
            crate::rt_warn!(self.log, now, "event queue full: {} events lost", lost);
        }

        let decoder_stats = self.decoder.stats();
        if decoder_stats.sink_errors != self.seen_sink_errors {
            let failed = decoder_stats.sink_errors.wrapping_sub(self.seen_sink_errors);
            self.seen_sink_errors = decoder_stats.sink_errors;
            crate::rt_error!(self.log, now, "trace output: {} lines failed", failed);
        }

        self.stats.publish(&decoder_stats, overflow, backlog as u32);
    }

    /// Get the trace sink.
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Get the decoder.
    #[inline]
    pub fn decoder(&self) -> &Decoder<DEPTH> {
        &self.decoder
    }
}
