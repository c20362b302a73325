//! UART ports.
//!
//! Two ports, two jobs:
//!
//! ```text
//! UART0 TX ──▶ trace stream   (decoder task only)
//! UART1 TX ──▶ service port   (logs, console output)
//! UART1 RX ◀── service port   (console input)
//! ```
//!
//! Keeping diagnostics off UART0 means the trace stream stays
//! machine-parseable: only records and `#` comment lines ever appear there.

use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver, UartTxDriver, UART0, UART1};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::sys::EspError;

use crate::trace::TraceSink;

/// Trace port baud rate.
///
/// A 100 kHz bus produces roughly five times its raw byte rate in text.
pub const TRACE_BAUD: u32 = 921_600;

/// Service port baud rate.
pub const SERVICE_BAUD: u32 = 115_200;

/// Trace sink on a TX-only UART.
///
/// Lines are complete once they are in the driver's TX ring; `flush` does
/// not wait for the wire.
pub struct UartSink<'d> {
    uart: UartTxDriver<'d>,
}

impl<'d> UartSink<'d> {
    pub fn new(uart: UartTxDriver<'d>) -> Self {
        Self { uart }
    }
}

impl TraceSink for UartSink<'_> {
    type Error = EspError;

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), EspError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let written = self.uart.write(rest)?;
            rest = &rest[written..];
        }
        Ok(())
    }
}

/// Initialize UART0 TX-only for the trace stream.
pub fn init_trace_uart<'d>(
    uart: impl Peripheral<P = UART0> + 'd,
    tx_pin: impl Peripheral<P = impl OutputPin> + 'd,
) -> Result<UartSink<'d>, EspError> {
    let config = uart::config::Config::default().baudrate(Hertz(TRACE_BAUD));

    let driver = UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &config,
    )?;

    Ok(UartSink::new(driver))
}

/// Initialize UART1 TX+RX for the service port.
pub fn init_service_uart<'d>(
    uart: impl Peripheral<P = UART1> + 'd,
    tx_pin: impl Peripheral<P = impl OutputPin> + 'd,
    rx_pin: impl Peripheral<P = impl InputPin> + 'd,
) -> Result<UartDriver<'d>, EspError> {
    let config = uart::config::Config::default().baudrate(Hertz(SERVICE_BAUD));

    UartDriver::new(
        uart,
        tx_pin,
        rx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &config,
    )
}
