//! GPIO edge capture for the two bus lines.
//!
//! Both pins are plain inputs without pulls; the sniffer never drives the
//! bus. SCL interrupts on the rising edge (data valid), SDA on any edge
//! (START/STOP candidates). Handlers run in ISR context: they sample the
//! lines, enqueue at most one event and wake the decoder task.

use core::ffi::c_void;
use core::sync::atomic::{AtomicI32, Ordering};

use esp_idf_svc::sys::{
    esp, gpio_config, gpio_config_t, gpio_get_level, gpio_install_isr_service,
    gpio_int_type_t_GPIO_INTR_ANYEDGE, gpio_int_type_t_GPIO_INTR_POSEDGE, gpio_isr_handler_add,
    gpio_isr_handler_remove, gpio_mode_t_GPIO_MODE_INPUT, gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
    gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_set_intr_type, esp_err_t, EspError, ESP_ERR_INVALID_STATE,
};

use crate::event::{classify_scl_rise, classify_sda_edge, EdgeEvent};
use crate::queue::EventQueue;

use super::signal::TaskSignal;

/// ISR → decoder task event queue.
pub static EVENT_QUEUE: EventQueue = EventQueue::new();

/// Wakes the decoder task after an enqueue.
pub static DECODER_SIGNAL: TaskSignal = TaskSignal::new();

/// Pin numbers read by the handlers.
struct BusLines {
    sda: AtomicI32,
    scl: AtomicI32,
}

static LINES: BusLines = BusLines {
    sda: AtomicI32::new(-1),
    scl: AtomicI32::new(-1),
};

#[inline(always)]
fn level(pin: i32) -> bool {
    // SAFETY: pin was configured as input before the handlers were added
    unsafe { gpio_get_level(pin) != 0 }
}

#[inline(always)]
fn publish(event: EdgeEvent) {
    if EVENT_QUEUE.try_enqueue(event) {
        DECODER_SIGNAL.notify_from_isr();
    }
}

/// SCL rising edge: SDA is the bit value.
unsafe extern "C" fn scl_rising_isr(_arg: *mut c_void) {
    publish(classify_scl_rise(level(LINES.sda.load(Ordering::Relaxed))));
}

/// SDA edge: START or STOP if SCL is high, otherwise a data transition.
unsafe extern "C" fn sda_edge_isr(_arg: *mut c_void) {
    let scl_high = level(LINES.scl.load(Ordering::Relaxed));
    let sda_high = level(LINES.sda.load(Ordering::Relaxed));
    if let Some(event) = classify_sda_edge(scl_high, sda_high) {
        publish(event);
    }
}

/// Configure both pins and install the edge handlers.
///
/// Bind [`DECODER_SIGNAL`] to the decoder task first, or the first events
/// will sit in the queue until something else wakes it.
///
/// An already-installed GPIO ISR service is reused. If the SDA handler
/// cannot be added the SCL handler is removed again.
pub fn start(sda: u8, scl: u8) -> Result<(), EspError> {
    let sda = i32::from(sda);
    let scl = i32::from(scl);
    LINES.sda.store(sda, Ordering::Relaxed);
    LINES.scl.store(scl, Ordering::Relaxed);

    let io = gpio_config_t {
        pin_bit_mask: (1u64 << sda) | (1u64 << scl),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
        ..Default::default()
    };

    // SAFETY: plain ESP-IDF driver calls with valid arguments; handlers are
    // 'static functions that touch only statics.
    unsafe {
        esp!(gpio_config(&io))?;

        let err = gpio_install_isr_service(0);
        if err != ESP_ERR_INVALID_STATE as esp_err_t {
            esp!(err)?;
        }

        esp!(gpio_isr_handler_add(scl, Some(scl_rising_isr), core::ptr::null_mut()))?;
        if let Err(e) = esp!(gpio_isr_handler_add(sda, Some(sda_edge_isr), core::ptr::null_mut())) {
            gpio_isr_handler_remove(scl);
            return Err(e);
        }

        esp!(gpio_set_intr_type(scl, gpio_int_type_t_GPIO_INTR_POSEDGE))?;
        esp!(gpio_set_intr_type(sda, gpio_int_type_t_GPIO_INTR_ANYEDGE))?;
    }

    Ok(())
}

/// Remove both handlers. Events already queued stay queued.
pub fn stop() -> Result<(), EspError> {
    let sda = LINES.sda.load(Ordering::Relaxed);
    let scl = LINES.scl.load(Ordering::Relaxed);
    if sda < 0 || scl < 0 {
        return Ok(());
    }

    // SAFETY: removing handlers that were added by start()
    unsafe {
        esp!(gpio_isr_handler_remove(scl))?;
        esp!(gpio_isr_handler_remove(sda))?;
    }
    LINES.sda.store(-1, Ordering::Relaxed);
    LINES.scl.store(-1, Ordering::Relaxed);
    Ok(())
}
