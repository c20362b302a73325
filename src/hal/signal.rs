//! Task wakeup from the GPIO interrupt.
//!
//! The decoder task parks on a FreeRTOS direct-to-task notification; the
//! line handlers raise it after each successful enqueue.

use core::num::NonZeroU32;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use esp_idf_svc::hal::delay::BLOCK;
use esp_idf_svc::hal::task;
use esp_idf_svc::sys::{tskTaskControlBlock, TaskHandle_t};

use crate::queue::Waiter;

/// Notification target for one waiting task.
pub struct TaskSignal {
    task: AtomicPtr<tskTaskControlBlock>,
}

impl TaskSignal {
    /// Create an unbound signal. Notifications are dropped until bound.
    pub const fn new() -> Self {
        Self {
            task: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Bind to the calling task. Must be done before the ISRs are installed.
    pub fn bind_current(&self) {
        if let Some(handle) = task::current() {
            self.task.store(handle, Ordering::Release);
        }
    }

    /// Wake the bound task. Safe from ISR context.
    #[inline]
    pub fn notify_from_isr(&self) {
        let handle: TaskHandle_t = self.task.load(Ordering::Acquire);
        if !handle.is_null() {
            // SAFETY: handle belongs to the decoder task, which never exits
            unsafe {
                task::notify_and_yield(handle, NonZeroU32::MIN);
            }
        }
    }
}

impl Default for TaskSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter for TaskSignal {
    #[inline]
    fn wait(&self) {
        task::wait_notification(BLOCK);
    }
}
