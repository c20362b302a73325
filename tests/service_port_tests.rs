//! Service port tests: log draining, periodic reports and console input.

use esp32_i2c_sniffer::config::SnifferConfig;
use esp32_i2c_sniffer::console::VERSION;
use esp32_i2c_sniffer::logging::{LogLevel, LogStream};
use esp32_i2c_sniffer::service_port::{CrLf, ServicePort, DROP_REPORT_INTERVAL_US};
use esp32_i2c_sniffer::stats::SnifferStats;
use esp32_i2c_sniffer::{rt_info, rt_warn};

struct Fixture {
    sniffer_log: LogStream,
    system_log: LogStream,
    config: SnifferConfig,
    stats: SnifferStats,
}

impl Fixture {
    fn new() -> Self {
        Self {
            sniffer_log: LogStream::new(),
            system_log: LogStream::new(),
            config: SnifferConfig::new(),
            stats: SnifferStats::new(),
        }
    }

    fn port(&self) -> ServicePort<'_> {
        ServicePort::new(&self.sniffer_log, &self.system_log, &self.config, &self.stats)
    }
}

#[test]
fn test_banner_and_prompt() {
    let fx = Fixture::new();
    let mut port = fx.port();
    let mut out = String::new();

    port.start(0, &mut out);

    assert!(out.contains(VERSION));
    assert!(out.ends_with("sniffer> "));
}

#[test]
fn test_drains_sniffer_log_before_system_log() {
    let fx = Fixture::new();
    let mut port = fx.port();
    let mut out = String::new();

    rt_info!(fx.system_log, 20, "from system");
    rt_warn!(fx.sniffer_log, 10, "from sniffer");

    assert!(port.poll(30, &[], &mut out));
    let sniffer_at = out.find("WARN: from sniffer").unwrap();
    let system_at = out.find("INFO: from system").unwrap();
    assert!(sniffer_at < system_at);

    // Nothing left to do
    assert!(!port.poll(40, &[], &mut out));
}

#[test]
fn test_log_level_follows_config() {
    let fx = Fixture::new();
    fx.config.set_log_level(LogLevel::Error);
    let mut port = fx.port();
    assert_eq!(fx.sniffer_log.level(), LogLevel::Error);

    fx.config.set_log_level(LogLevel::Debug);
    port.poll(0, &[], &mut String::new());

    assert_eq!(fx.sniffer_log.level(), LogLevel::Debug);
    assert_eq!(fx.system_log.level(), LogLevel::Debug);
}

#[test]
fn test_dropped_messages_reported_periodically() {
    let fx = Fixture::new();
    let mut port = fx.port();
    let mut out = String::new();
    port.start(0, &mut out);

    for i in 0..100 {
        rt_info!(fx.sniffer_log, i, "burst {}", i);
    }
    assert!(fx.sniffer_log.dropped() > 0);

    out.clear();
    port.poll(DROP_REPORT_INTERVAL_US - 1, &[], &mut out);
    assert!(!out.contains("log dropped"));

    out.clear();
    port.poll(DROP_REPORT_INTERVAL_US, &[], &mut out);
    assert!(out.contains("WARN: log dropped: sniffer="));
    assert!(out.contains("system=0"));
    assert_eq!(fx.sniffer_log.dropped(), 0);
}

#[test]
fn test_periodic_stats_report() {
    let fx = Fixture::new();
    fx.config.set_stats_interval_s(2).unwrap();
    let mut port = fx.port();
    let mut out = String::new();
    port.start(0, &mut out);

    // Queued at 2 s, printed on the next pass
    port.poll(2_000_000, &[], &mut out);
    out.clear();
    port.poll(2_000_001, &[], &mut out);

    assert!(out.contains("INFO: stats: 0 complete, 0 partial, 0 lost, 0 dropped bytes"));
}

#[test]
fn test_stats_report_disabled() {
    let fx = Fixture::new();
    fx.config.set_stats_interval_s(0).unwrap();
    let mut port = fx.port();
    let mut out = String::new();
    port.start(0, &mut out);

    port.poll(3_600_000_000, &[], &mut out);
    out.clear();
    port.poll(3_600_000_001, &[], &mut out);

    assert!(!out.contains("stats:"));
}

#[test]
fn test_console_input() {
    let fx = Fixture::new();
    let mut port = fx.port();
    let mut out = CrLf(String::new());

    assert!(port.poll(0, b"help reboot\r\n", &mut out));

    assert!(out.0.contains("help reboot\r\n"));
    assert!(out.0.contains("reboot confirm\r\n"));
    assert_eq!(port.console().line(), "");
}
