//! ESP32 I2C Sniffer - Main entry point
//!
//! 1. Load configuration from NVS
//! 2. Start the service task (UART1: logs + console)
//! 3. Open the trace port (UART0) and announce the pins
//! 4. Install the SDA/SCL edge handlers
//! 5. Become the decoder task

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

#[cfg(target_os = "espidf")]
mod firmware {
    extern crate alloc;

    use alloc::boxed::Box;
    use core::ffi::c_void;

    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::task;
    use esp_idf_svc::hal::uart::UartDriver;
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};

    use esp32_i2c_sniffer::config::{load_config_from_nvs, MigrationResult, NvsError};
    use esp32_i2c_sniffer::hal::{edges, init_service_uart, init_trace_uart, DECODER_SIGNAL, EVENT_QUEUE};
    use esp32_i2c_sniffer::logging::timestamp_us;
    use esp32_i2c_sniffer::trace::write_comment;
    use esp32_i2c_sniffer::{rt_error, rt_info, rt_warn, service_port, Sniffer};
    use esp32_i2c_sniffer::{CONFIG, SNIFFER_LOG, SNIFFER_STATS, SYSTEM_LOG};

    /// Decoder task priority (above the service task, below WiFi/timers).
    const SNIFFER_PRIORITY: u32 = 5;

    /// Service task priority and stack.
    const SERVICE_PRIORITY: u8 = 2;
    const SERVICE_STACK: usize = 6 * 1024;

    #[no_mangle]
    fn main() {
        esp_idf_sys::link_patches();

        // Only this task logs to SYSTEM_LOG until the service task exists
        match load_config_from_nvs(&CONFIG) {
            Ok(MigrationResult::FreshInstall) => {
                rt_info!(SYSTEM_LOG, timestamp_us(), "config: defaults (nothing stored)");
            }
            Ok(MigrationResult::UpToDate) => {
                rt_info!(SYSTEM_LOG, timestamp_us(), "config: loaded from NVS");
            }
            Ok(MigrationResult::Migrated { from_version, to_version }) => {
                rt_info!(SYSTEM_LOG, timestamp_us(), "config: migrated v{} -> v{}", from_version, to_version);
            }
            Err(NvsError::TooNew { stored_version }) => {
                rt_warn!(SYSTEM_LOG, timestamp_us(), "config: schema v{} too new, using defaults", stored_version);
            }
            Err(e) => {
                rt_warn!(SYSTEM_LOG, timestamp_us(), "config: NVS load failed ({}), using defaults", e);
            }
        }

        // From here on this task is the decoder task and logs to SNIFFER_LOG
        if let Err(e) = run() {
            rt_error!(SNIFFER_LOG, timestamp_us(), "startup failed: {}", e);
        }
    }

    fn run() -> Result<(), EspError> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let service_uart = init_service_uart(peripherals.uart1, pins.gpio6, pins.gpio7)?;
        spawn_service(service_uart)?;

        #[cfg(not(feature = "esp32s3"))]
        let trace_tx = pins.gpio21;
        #[cfg(feature = "esp32s3")]
        let trace_tx = pins.gpio43;
        let mut sink = init_trace_uart(peripherals.uart0, trace_tx)?;

        let sda = CONFIG.sda_pin();
        let scl = CONFIG.scl_pin();
        write_comment(&mut sink, format_args!("I2C sniffer started SDA={} SCL={}", sda, scl))?;
        rt_info!(SNIFFER_LOG, timestamp_us(), "I2C sniffer started SDA={} SCL={}", sda, scl);

        // Handlers may fire as soon as they are added
        DECODER_SIGNAL.bind_current();
        if let Err(e) = edges::start(sda, scl) {
            write_comment(&mut sink, format_args!("ERROR: i2c_sniffer_start failed"))?;
            return Err(e);
        }

        // SAFETY: null handle = calling task
        unsafe {
            esp_idf_sys::vTaskPrioritySet(core::ptr::null_mut(), SNIFFER_PRIORITY);
        }

        let mut sniffer: Sniffer<'_, _> =
            Sniffer::new(&EVENT_QUEUE, sink, &CONFIG, &SNIFFER_STATS, &SNIFFER_LOG);
        sniffer.run(&DECODER_SIGNAL)
    }

    extern "C" fn service_entry(arg: *mut c_void) {
        // SAFETY: arg is the Box leaked by spawn_service, taken exactly once
        let uart = unsafe { Box::from_raw(arg as *mut UartDriver<'static>) };
        service_port::task::run(*uart)
    }

    fn spawn_service(uart: UartDriver<'static>) -> Result<(), EspError> {
        let arg = Box::into_raw(Box::new(uart)) as *mut c_void;

        // SAFETY: service_entry takes ownership of arg
        let created = unsafe {
            task::create(service_entry, c"service", SERVICE_STACK, arg, SERVICE_PRIORITY, None)
        };

        if let Err(e) = created {
            // SAFETY: the task was not created, arg is still ours
            drop(unsafe { Box::from_raw(arg as *mut UartDriver<'static>) });
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("sniffer: firmware binary, build it for an ESP-IDF target");
}
