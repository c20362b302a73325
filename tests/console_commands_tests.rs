//! Command handler tests
//!
//! Commands act on the global `CONFIG`. Tests run in parallel, so each
//! parameter is written by at most one test.

use esp32_i2c_sniffer::config::{ParamType, ParamValue, DEFAULT_SCL_PIN, DEFAULT_SDA_PIN};
use esp32_i2c_sniffer::console::commands::{command_names, execute, parse_value, COMMANDS};
use esp32_i2c_sniffer::console::parser::parse_line;
use esp32_i2c_sniffer::console::{Console, ConsoleError};
use esp32_i2c_sniffer::CONFIG;

#[test]
fn test_command_registry_has_all_commands() {
    let expected = ["help", "show", "set", "save", "stats", "debug", "reboot", "factory-reset"];

    for name in expected {
        assert!(
            COMMANDS.iter().any(|c| c.name == name),
            "Command '{}' should be in registry",
            name
        );
    }
    assert_eq!(command_names().count(), expected.len());
}

#[test]
fn test_execute_unknown_command() {
    let cmd = parse_line("foobar");
    let result = execute(&cmd, &mut TestOutput::new());

    assert_eq!(result, Err(ConsoleError::UnknownCommand));
}

#[test]
fn test_execute_blank_line() {
    let cmd = parse_line("   ");
    let mut output = TestOutput::new();

    assert_eq!(execute(&cmd, &mut output), Ok(()));
    assert_eq!(output.as_str(), "");
}

#[test]
fn test_execute_help() {
    let cmd = parse_line("help");
    let mut output = TestOutput::new();
    let result = execute(&cmd, &mut output);

    assert!(result.is_ok());
    assert!(output.contains("factory-reset confirm"));
    assert!(output.contains("stats [bus|heap]"));
}

#[test]
fn test_execute_help_single_command() {
    let mut output = TestOutput::new();
    execute(&parse_line("help set"), &mut output).unwrap();
    assert!(output.contains("set <name> <value>"));

    assert_eq!(
        execute(&parse_line("help flash"), &mut TestOutput::new()),
        Err(ConsoleError::UnknownCommand)
    );
}

#[test]
fn test_show_all_params() {
    let mut output = TestOutput::new();
    execute(&parse_line("show"), &mut output).unwrap();

    for name in ["sda_pin=", "scl_pin=", "data_acks=", "log_level=", "stats_interval_s="] {
        assert!(output.contains(name), "missing {}", name);
    }
}

#[test]
fn test_show_pattern() {
    let mut output = TestOutput::new();
    execute(&parse_line("show s*"), &mut output).unwrap();

    assert!(output.contains("sda_pin="));
    assert!(output.contains("scl_pin="));
    assert!(!output.contains("data_acks="));

    assert_eq!(
        execute(&parse_line("show wpm"), &mut TestOutput::new()),
        Err(ConsoleError::UnknownParam)
    );
}

#[test]
fn test_set_data_acks() {
    let mut output = TestOutput::new();
    execute(&parse_line("set data_acks on"), &mut output).unwrap();

    assert!(CONFIG.data_acks());
    assert!(output.contains("data_acks=true"));
    assert!(!output.contains("reboot"));
}

#[test]
fn test_set_stats_interval() {
    let mut output = TestOutput::new();
    execute(&parse_line("set stats_interval_s 120"), &mut output).unwrap();
    assert_eq!(CONFIG.stats_interval_s(), 120);
    assert!(output.contains("stats_interval_s=120"));

    assert_eq!(
        execute(&parse_line("set stats_interval_s 3601"), &mut TestOutput::new()),
        Err(ConsoleError::OutOfRange)
    );
    assert_eq!(
        execute(&parse_line("set stats_interval_s soon"), &mut TestOutput::new()),
        Err(ConsoleError::InvalidValue)
    );
    assert_eq!(CONFIG.stats_interval_s(), 120);
}

#[test]
fn test_set_pin_conflict() {
    let cmd = format!("set sda_pin {}", DEFAULT_SCL_PIN);
    let result = execute(&parse_line(&cmd), &mut TestOutput::new());

    assert_eq!(result, Err(ConsoleError::PinConflict));
}

#[test]
fn test_set_reserved_pin() {
    let mut output = TestOutput::new();
    let result = execute(&parse_line("set sda_pin 6"), &mut output);
    assert_eq!(result, Err(ConsoleError::PinReserved));
    assert_eq!(ConsoleError::PinReserved.to_string(), "E09: pin is reserved");

    assert_eq!(
        execute(&parse_line("set scl_pin 7"), &mut TestOutput::new()),
        Err(ConsoleError::PinReserved)
    );
}

#[test]
fn test_set_pins_together() {
    // Same values as the defaults: other tests rely on them
    let cmd = format!("set pins {} {}", DEFAULT_SDA_PIN, DEFAULT_SCL_PIN);
    let mut output = TestOutput::new();
    execute(&parse_line(&cmd), &mut output).unwrap();

    assert!(output.contains(&format!("sda_pin={}", DEFAULT_SDA_PIN)));
    assert!(output.contains(&format!("scl_pin={}", DEFAULT_SCL_PIN)));
    assert!(output.contains("(save and reboot to apply)"));

    let errors = [
        ("set pins 3 3", ConsoleError::PinConflict),
        ("set pins 6 3", ConsoleError::PinReserved),
        ("set pins 3", ConsoleError::MissingArg),
        ("set pins 3 x", ConsoleError::InvalidValue),
        ("set pins 3 2 1", ConsoleError::InvalidValue),
        ("set pins 3 99", ConsoleError::OutOfRange),
    ];
    for (line, expected) in errors {
        assert_eq!(execute(&parse_line(line), &mut TestOutput::new()), Err(expected), "{}", line);
    }
    assert_eq!(CONFIG.sda_pin(), DEFAULT_SDA_PIN);
    assert_eq!(CONFIG.scl_pin(), DEFAULT_SCL_PIN);
}

#[test]
fn test_set_argument_errors() {
    assert_eq!(
        execute(&parse_line("set"), &mut TestOutput::new()),
        Err(ConsoleError::MissingArg)
    );
    assert_eq!(
        execute(&parse_line("set scl_pin"), &mut TestOutput::new()),
        Err(ConsoleError::MissingArg)
    );
    assert_eq!(
        execute(&parse_line("set wpm 25"), &mut TestOutput::new()),
        Err(ConsoleError::UnknownParam)
    );
    assert_eq!(
        execute(&parse_line("set scl_pin 5 6"), &mut TestOutput::new()),
        Err(ConsoleError::InvalidValue)
    );
}

#[test]
fn test_parse_value() {
    assert_eq!(parse_value(ParamType::Bool, "off"), Ok(ParamValue::Bool(false)));
    assert_eq!(parse_value(ParamType::Bool, "1"), Ok(ParamValue::Bool(true)));
    assert_eq!(parse_value(ParamType::Bool, "yes"), Err(ConsoleError::InvalidValue));

    let pin = ParamType::U8 { min: 0, max: 21 };
    assert_eq!(parse_value(pin, "21"), Ok(ParamValue::U8(21)));
    assert_eq!(parse_value(pin, "22"), Err(ConsoleError::OutOfRange));
    assert_eq!(parse_value(pin, "-1"), Err(ConsoleError::InvalidValue));
    assert_eq!(parse_value(pin, "300"), Err(ConsoleError::InvalidValue));
}

#[test]
fn test_debug_level() {
    let mut output = TestOutput::new();
    execute(&parse_line("debug debug"), &mut output).unwrap();
    assert!(output.contains("log level: DEBUG"));

    let mut output = TestOutput::new();
    execute(&parse_line("debug 4"), &mut output).unwrap();
    assert!(output.contains("log level: TRACE"));

    assert_eq!(
        execute(&parse_line("debug 5"), &mut TestOutput::new()),
        Err(ConsoleError::OutOfRange)
    );
    assert_eq!(
        execute(&parse_line("debug loud"), &mut TestOutput::new()),
        Err(ConsoleError::InvalidValue)
    );
}

#[test]
fn test_stats_bus() {
    let mut output = TestOutput::new();
    execute(&parse_line("stats bus"), &mut output).unwrap();

    assert!(output.contains("transactions: "));
    assert!(output.contains("queue: "));
    assert!(!output.contains("uptime"));

    assert_eq!(
        execute(&parse_line("stats wifi"), &mut TestOutput::new()),
        Err(ConsoleError::InvalidValue)
    );
}

#[test]
fn test_save_without_storage() {
    let result = execute(&parse_line("save"), &mut TestOutput::new());
    assert_eq!(result, Err(ConsoleError::NvsError));
}

#[test]
fn test_execute_reboot_requires_confirm() {
    let cmd = parse_line("reboot");
    let result = execute(&cmd, &mut TestOutput::new());

    assert_eq!(result, Err(ConsoleError::RequiresConfirm));
}

#[test]
fn test_factory_reset_requires_confirm() {
    let result = execute(&parse_line("factory-reset now"), &mut TestOutput::new());
    assert_eq!(result, Err(ConsoleError::RequiresConfirm));
}

#[test]
fn test_console_line_discipline() {
    let mut console = Console::new();
    let mut output = TestOutput::new();

    for &b in b"stats\x7F\x7Fx" {
        assert_eq!(console.process_byte(b, &mut output), None);
    }
    assert_eq!(console.line(), "stax");

    // CRLF executes once
    assert_eq!(
        console.process_byte(b'\r', &mut output),
        Some(Err(ConsoleError::UnknownCommand))
    );
    assert_eq!(console.process_byte(b'\n', &mut output), None);
    assert!(output.contains("E01: unknown command"));
    assert!(output.as_str().ends_with("sniffer> "));
    assert_eq!(console.line(), "");
}

#[test]
fn test_console_ctrl_c_discards_line() {
    let mut console = Console::new();
    let mut output = TestOutput::new();

    for &b in b"reboot confirm" {
        console.process_byte(b, &mut output);
    }
    assert_eq!(console.process_byte(0x03, &mut output), None);
    assert_eq!(console.line(), "");
    assert!(output.contains("^C"));
}

// Test output buffer
struct TestOutput {
    buf: [u8; 1024],
    len: usize,
}

impl TestOutput {
    fn new() -> Self {
        Self { buf: [0u8; 1024], len: 0 }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    fn contains(&self, s: &str) -> bool {
        self.as_str().contains(s)
    }
}

impl core::fmt::Write for TestOutput {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let available = self.buf.len() - self.len;
        let to_copy = bytes.len().min(available);
        self.buf[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}
