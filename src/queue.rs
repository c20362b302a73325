//! Lock-free SPSC (Single Producer, Single Consumer) event queue.
//!
//! The only handoff point between the GPIO interrupt and the decoder task.
//!
//! # Architecture
//!
//! ```text
//! GPIO ISR ──try_enqueue──▶ EventQueue ──dequeue_blocking──▶ Decoder task
//!                           (lock-free)
//!                           (bounded, FIFO)
//! ```
//!
//! # Rules
//!
//! - Producer never blocks and never allocates; a full queue drops the event
//! - Dropped events are counted in an atomic overflow counter
//! - Events dequeue in exactly the order they were enqueued
//! - Only atomic operations for synchronization

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::event::EdgeEvent;

/// Default queue length: 128 events.
///
/// One I2C byte costs 9 BIT events, so this holds ~14 bytes of backlog.
pub const EVENT_QUEUE_LEN: usize = 128;

/// How the consumer waits when the queue is empty.
///
/// On target this parks the task on a FreeRTOS notification raised by the
/// ISR after a successful enqueue. Spurious wakeups are fine: the queue is
/// re-checked after every `wait()`.
pub trait Waiter {
    /// Wait until the producer may have enqueued something.
    fn wait(&self);
}

/// Busy-wait waiter for host builds and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinWaiter;

impl Waiter for SpinWaiter {
    #[inline]
    fn wait(&self) {
        core::hint::spin_loop();
    }
}

/// Lock-free bounded FIFO of [`EdgeEvent`]s.
///
/// # Safety
///
/// Uses `UnsafeCell` internally but is safe to use because:
/// - Single producer (both line handlers run from the one GPIO interrupt)
/// - Single consumer (the decoder task)
/// - A slot is only written while it is outside `[head, tail)` and only read
///   while inside it
///
/// # Memory Ordering
///
/// - Producer publishes a slot with `Release` on `tail`
/// - Consumer frees a slot with `Release` on `head`
/// - Each side loads the other's index with `Acquire`
pub struct EventQueue<const N: usize = EVENT_QUEUE_LEN> {
    /// Ring buffer of events.
    slots: UnsafeCell<[EdgeEvent; N]>,

    /// Next slot to write (monotonically increasing, wraps via mask).
    tail: AtomicU32,

    /// Next slot to read.
    head: AtomicU32,

    /// Events discarded because the queue was full.
    overflow: AtomicU32,
}

// SAFETY: Single producer, single consumer, atomic coordination.
unsafe impl<const N: usize> Sync for EventQueue<N> {}
unsafe impl<const N: usize> Send for EventQueue<N> {}

impl<const N: usize> EventQueue<N> {
    /// Mask for wrapping index to buffer size.
    const MASK: usize = N - 1;

    /// Create a new empty queue.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Queue size must be power of 2");

        Self {
            slots: UnsafeCell::new([EdgeEvent::EMPTY; N]),
            tail: AtomicU32::new(0),
            head: AtomicU32::new(0),
            overflow: AtomicU32::new(0),
        }
    }

    /// Try to enqueue an event (interrupt context).
    ///
    /// Returns `false` and discards the event if the queue is full.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates.
    #[inline]
    pub fn try_enqueue(&self, event: EdgeEvent) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) >= N as u32 {
            self.overflow.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        // SAFETY: Single producer; slot is not visible to the consumer until
        // tail is published below.
        unsafe {
            (*self.slots.get())[(tail as usize) & Self::MASK] = event;
        }

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Take the oldest event, if any.
    #[inline]
    pub fn try_dequeue(&self) -> Option<EdgeEvent> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        // SAFETY: Single consumer; slot was published by the producer's
        // Release store on tail.
        let event = unsafe { (*self.slots.get())[(head as usize) & Self::MASK] };

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(event)
    }

    /// Block until an event is available and return it.
    ///
    /// No timeout: a silent bus is the normal idle condition.
    #[inline]
    pub fn dequeue_blocking<W: Waiter + ?Sized>(&self, waiter: &W) -> EdgeEvent {
        loop {
            if let Some(event) = self.try_dequeue() {
                return event;
            }
            waiter.wait();
        }
    }

    /// Drain all currently queued events.
    ///
    /// Events enqueued while draining are yielded too.
    #[inline]
    pub fn drain(&self) -> Drain<'_, N> {
        Drain { queue: self }
    }

    /// Number of events waiting.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) as usize
    }

    /// Check if there is nothing to dequeue.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get total count of events dropped on a full queue.
    #[inline]
    pub fn overflow_count(&self) -> u32 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Get the queue capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator for draining all available events.
pub struct Drain<'q, const N: usize> {
    queue: &'q EventQueue<N>,
}

impl<'q, const N: usize> Iterator for Drain<'q, N> {
    type Item = EdgeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.try_dequeue()
    }
}
