//! Service port: diagnostics out, console in.
//!
//! Runs in its own low-priority task on UART1, separate from the trace
//! stream on UART0.
//!
//! # Hardware Setup
//!
//! ```text
//! GPIO6 (TX) ──────▶ USB-UART RX
//! GPIO7 (RX) ◀────── USB-UART TX
//! ```
//!
//! Each pass drains both log streams, feeds console input, and emits the
//! periodic reports (dropped log messages every 10 s, bus statistics every
//! `stats_interval_s`).

use core::fmt::{self, Write};

use crate::config::SnifferConfig;
use crate::console::Console;
use crate::logging::{format_entry, LogLevel, LogStream, MAX_MSG_LEN};
use crate::stats::SnifferStats;

/// Dropped-message report period.
pub const DROP_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Formatted log line: timestamp, level and message.
const ENTRY_BUF_LEN: usize = MAX_MSG_LEN + 32;

/// Terminal adapter: `\n` becomes `\r\n`.
pub struct CrLf<W>(pub W);

impl<W: Write> Write for CrLf<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut lines = s.split('\n');
        if let Some(first) = lines.next() {
            self.0.write_str(first)?;
        }
        for line in lines {
            self.0.write_str("\r\n")?;
            self.0.write_str(line)?;
        }
        Ok(())
    }
}

/// Service port state.
pub struct ServicePort<'a> {
    sniffer_log: &'a LogStream,
    system_log: &'a LogStream,
    config: &'a SnifferConfig,
    stats: &'a SnifferStats,
    console: Console,
    config_gen: u16,
    last_drop_report: i64,
    last_stats_report: i64,
}

impl<'a> ServicePort<'a> {
    /// Create the port and apply the configured log level to both streams.
    pub fn new(
        sniffer_log: &'a LogStream,
        system_log: &'a LogStream,
        config: &'a SnifferConfig,
        stats: &'a SnifferStats,
    ) -> Self {
        let port = Self {
            sniffer_log,
            system_log,
            config,
            stats,
            console: Console::new(),
            config_gen: config.generation(),
            last_drop_report: 0,
            last_stats_report: 0,
        };
        port.apply_log_level();
        port
    }

    /// Print the console banner.
    pub fn start(&mut self, now_us: i64, out: &mut dyn Write) {
        self.last_drop_report = now_us;
        self.last_stats_report = now_us;
        self.console.print_banner(out);
    }

    /// One service pass.
    ///
    /// Returns true if anything was written or read, so the caller can
    /// sleep when idle.
    pub fn poll(&mut self, now_us: i64, input: &[u8], out: &mut dyn Write) -> bool {
        let mut work_done = false;

        let generation = self.config.generation();
        if generation != self.config_gen {
            self.config_gen = generation;
            self.apply_log_level();
        }

        // Decoder task logs first: they are the time-critical ones
        work_done |= drain_stream(self.sniffer_log, out);
        work_done |= drain_stream(self.system_log, out);

        for &byte in input {
            self.console.process_byte(byte, out);
            work_done = true;
        }

        if now_us - self.last_drop_report >= DROP_REPORT_INTERVAL_US {
            self.last_drop_report = now_us;
            work_done |= self.report_dropped(now_us, out);
        }

        let interval_s = self.config.stats_interval_s();
        if interval_s > 0 && now_us - self.last_stats_report >= i64::from(interval_s) * 1_000_000 {
            self.last_stats_report = now_us;
            let s = self.stats.snapshot();
            crate::rt_info!(
                self.system_log,
                now_us,
                "stats: {} complete, {} partial, {} lost, {} dropped bytes",
                s.completed,
                s.partial,
                s.queue_overflow,
                s.bytes_dropped
            );
        }

        work_done
    }

    fn apply_log_level(&self) {
        let level = self.config.log_level();
        self.sniffer_log.set_level(level);
        self.system_log.set_level(level);
    }

    fn report_dropped(&self, now_us: i64, out: &mut dyn Write) -> bool {
        let sniffer = self.sniffer_log.dropped();
        let system = self.system_log.dropped();
        if sniffer == 0 && system == 0 {
            return false;
        }

        let _ = writeln!(
            out,
            "[{:10}] {}: log dropped: sniffer={} system={}",
            now_us,
            LogLevel::Warn.as_str(),
            sniffer,
            system
        );
        self.sniffer_log.reset_dropped();
        self.system_log.reset_dropped();
        true
    }

    /// Console state (for tests and diagnostics).
    pub fn console(&self) -> &Console {
        &self.console
    }
}

fn drain_stream(stream: &LogStream, out: &mut dyn Write) -> bool {
    let mut buf = [0u8; ENTRY_BUF_LEN];
    let mut any = false;
    while let Some(entry) = stream.drain() {
        let len = format_entry(&entry, &mut buf);
        let _ = out.write_str(core::str::from_utf8(&buf[..len]).unwrap_or("<invalid utf8>\n"));
        any = true;
    }
    any
}

/// Service task body on the target.
#[cfg(target_os = "espidf")]
pub mod task {
    use core::fmt;

    use esp_idf_svc::hal::delay::{FreeRtos, NON_BLOCK};
    use esp_idf_svc::hal::uart::UartDriver;

    use super::{CrLf, ServicePort};
    use crate::globals::{CONFIG, SNIFFER_LOG, SNIFFER_STATS, SYSTEM_LOG};
    use crate::logging::timestamp_us;

    /// Idle poll period (ms).
    const IDLE_DELAY_MS: u32 = 10;

    /// `fmt::Write` over the service UART.
    struct UartWriter<'u, 'd>(&'u UartDriver<'d>);

    impl fmt::Write for UartWriter<'_, '_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let mut rest = s.as_bytes();
            while !rest.is_empty() {
                let written = self.0.write(rest).map_err(|_| fmt::Error)?;
                rest = &rest[written..];
            }
            Ok(())
        }
    }

    /// Drain logs and serve the console forever.
    pub fn run(uart: UartDriver<'_>) -> ! {
        let mut port = ServicePort::new(&SNIFFER_LOG, &SYSTEM_LOG, &CONFIG, &SNIFFER_STATS);
        let mut out = CrLf(UartWriter(&uart));
        let mut input = [0u8; 32];

        port.start(timestamp_us(), &mut out);

        loop {
            let n = uart.read(&mut input, NON_BLOCK).unwrap_or(0);
            if !port.poll(timestamp_us(), &input[..n], &mut out) {
                FreeRtos::delay_ms(IDLE_DELAY_MS);
            }
        }
    }
}
