//! Command handlers

use core::fmt::Write;

use super::parser::ParsedCommand;
use super::ConsoleError;
use crate::config::{
    erase_nvs, find_param, find_params_matching, save_config_to_nvs, ParamDescriptor, ParamType,
    ParamValue, PARAMS,
};
use crate::globals::{CONFIG, SNIFFER_STATS, SYSTEM_LOG};
use crate::logging::{timestamp_us, LogLevel};

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub usage: &'static str,
    pub brief: &'static str,
    pub handler: fn(&ParsedCommand<'_>, &mut dyn Write) -> Result<(), ConsoleError>,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", usage: "help [command]", brief: "List commands", handler: cmd_help },
    CommandDescriptor { name: "show", usage: "show [name|prefix*]", brief: "Show parameters", handler: cmd_show },
    CommandDescriptor { name: "set", usage: "set <name> <value>", brief: "Set parameter value (set pins <sda> <scl> for both)", handler: cmd_set },
    CommandDescriptor { name: "save", usage: "save", brief: "Persist parameters to NVS", handler: cmd_save },
    CommandDescriptor { name: "stats", usage: "stats [bus|heap]", brief: "Capture statistics", handler: cmd_stats },
    CommandDescriptor { name: "debug", usage: "debug [level]", brief: "Show or set log level", handler: cmd_debug },
    CommandDescriptor { name: "reboot", usage: "reboot confirm", brief: "Restart system", handler: cmd_reboot },
    CommandDescriptor { name: "factory-reset", usage: "factory-reset confirm", brief: "Erase NVS and reboot", handler: cmd_factory_reset },
];

/// Execute a parsed command
pub fn execute(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if cmd.is_empty() {
        return Ok(());
    }

    let descriptor = COMMANDS
        .iter()
        .find(|c| c.name == cmd.command)
        .ok_or(ConsoleError::UnknownCommand)?;

    (descriptor.handler)(cmd, out)
}

/// Get all command names
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|c| c.name)
}

// --- Command Implementations ---

fn cmd_help(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(name) = cmd.arg(0) {
        let c = COMMANDS
            .iter()
            .find(|c| c.name == name)
            .ok_or(ConsoleError::UnknownCommand)?;
        let _ = writeln!(out, "{}", c.usage);
        let _ = writeln!(out, "  {}", c.brief);
    } else {
        for c in COMMANDS {
            let _ = writeln!(out, "  {:<22} {}", c.usage, c.brief);
        }
    }
    Ok(())
}

fn print_param(p: &ParamDescriptor, out: &mut dyn Write) {
    let _ = writeln!(out, "{}={}", p.name, (p.get_fn)(&CONFIG));
}

fn cmd_show(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    match cmd.arg(0) {
        None => {
            for p in PARAMS {
                print_param(p, out);
            }
        }
        Some(pattern) => {
            let mut found = false;
            for p in find_params_matching(pattern) {
                print_param(p, out);
                found = true;
            }
            if !found {
                return Err(ConsoleError::UnknownParam);
            }
        }
    }
    Ok(())
}

/// Parse console text into a value of the parameter's type.
pub fn parse_value(param_type: ParamType, text: &str) -> Result<ParamValue, ConsoleError> {
    match param_type {
        ParamType::Bool => match text {
            "true" | "1" | "on" => Ok(ParamValue::Bool(true)),
            "false" | "0" | "off" => Ok(ParamValue::Bool(false)),
            _ => Err(ConsoleError::InvalidValue),
        },
        ParamType::U8 { min, max } => {
            let v: u8 = text.parse().map_err(|_| ConsoleError::InvalidValue)?;
            if v < min || v > max {
                return Err(ConsoleError::OutOfRange);
            }
            Ok(ParamValue::U8(v))
        }
        ParamType::U32 { min, max } => {
            let v: u32 = text.parse().map_err(|_| ConsoleError::InvalidValue)?;
            if v < min || v > max {
                return Err(ConsoleError::OutOfRange);
            }
            Ok(ParamValue::U32(v))
        }
    }
}

fn cmd_set(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let name = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    if name == "pins" {
        return cmd_set_pins(cmd, out);
    }
    let text = cmd.arg(1).ok_or(ConsoleError::MissingArg)?;
    if cmd.word_count > 2 {
        return Err(ConsoleError::InvalidValue);
    }

    let param = find_param(name).ok_or(ConsoleError::UnknownParam)?;
    let value = parse_value(param.param_type, text)?;
    (param.set_fn)(&CONFIG, value)?;

    print_param(param, out);
    if param.reboot_required {
        let _ = writeln!(out, "(save and reboot to apply)");
    }
    crate::rt_info!(SYSTEM_LOG, timestamp_us(), "config: {}={}", param.name, value);
    Ok(())
}

/// `set pins <sda> <scl>`: both lines in one write, so they can be swapped.
fn cmd_set_pins(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let sda = cmd.arg(1).ok_or(ConsoleError::MissingArg)?;
    let scl = cmd.arg(2).ok_or(ConsoleError::MissingArg)?;
    if cmd.word_count > 3 {
        return Err(ConsoleError::InvalidValue);
    }

    let sda: u8 = sda.parse().map_err(|_| ConsoleError::InvalidValue)?;
    let scl: u8 = scl.parse().map_err(|_| ConsoleError::InvalidValue)?;
    CONFIG.set_pins(sda, scl)?;

    let _ = writeln!(out, "sda_pin={}", CONFIG.sda_pin());
    let _ = writeln!(out, "scl_pin={}", CONFIG.scl_pin());
    let _ = writeln!(out, "(save and reboot to apply)");
    crate::rt_info!(SYSTEM_LOG, timestamp_us(), "config: pins sda={} scl={}", sda, scl);
    Ok(())
}

fn cmd_save(_cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Err(e) = save_config_to_nvs(&CONFIG) {
        crate::rt_error!(SYSTEM_LOG, timestamp_us(), "save failed: {}", e);
        return Err(ConsoleError::NvsError);
    }
    let _ = writeln!(out, "saved");
    Ok(())
}

fn cmd_stats(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    match cmd.arg(0) {
        None => {
            let _ = writeln!(out, "uptime: {}s", timestamp_us() / 1_000_000);
            cmd_stats_bus(out)
        }
        Some("bus") => cmd_stats_bus(out),
        Some("heap") => cmd_stats_heap(out),
        Some(_) => Err(ConsoleError::InvalidValue),
    }
}

fn cmd_stats_bus(out: &mut dyn Write) -> Result<(), ConsoleError> {
    let s = SNIFFER_STATS.snapshot();
    let _ = writeln!(out, "transactions: {} complete, {} partial", s.completed, s.partial);
    let _ = writeln!(out, "bytes dropped: {}", s.bytes_dropped);
    let _ = writeln!(out, "events ignored: {}", s.ignored);
    let _ = writeln!(out, "queue: {} lost, peak {}", s.queue_overflow, s.queue_peak);
    let _ = writeln!(out, "trace errors: {}", s.sink_errors);
    Ok(())
}

fn cmd_stats_heap(out: &mut dyn Write) -> Result<(), ConsoleError> {
    #[cfg(target_os = "espidf")]
    {
        // SAFETY: read-only heap queries
        let free = unsafe { esp_idf_svc::sys::esp_get_free_heap_size() };
        let min = unsafe { esp_idf_svc::sys::esp_get_minimum_free_heap_size() };

        let _ = writeln!(out, "heap free: {} bytes", free);
        let _ = writeln!(out, "heap min:  {} bytes", min);
    }

    #[cfg(not(target_os = "espidf"))]
    {
        let _ = writeln!(out, "heap: n/a on host");
    }

    Ok(())
}

fn cmd_debug(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(arg) = cmd.arg(0) {
        let level = match LogLevel::parse(arg) {
            Some(level) => level,
            None => {
                let n: u8 = arg.parse().map_err(|_| ConsoleError::InvalidValue)?;
                if n > LogLevel::Trace as u8 {
                    return Err(ConsoleError::OutOfRange);
                }
                LogLevel::from_u8(n)
            }
        };
        CONFIG.set_log_level(level);
    }

    let _ = writeln!(out, "log level: {}", CONFIG.log_level().as_str());
    Ok(())
}

fn cmd_reboot(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if cmd.arg(0) != Some("confirm") {
        return Err(ConsoleError::RequiresConfirm);
    }

    let _ = writeln!(out, "Restarting...");
    restart();
    Ok(())
}

fn cmd_factory_reset(cmd: &ParsedCommand<'_>, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if cmd.arg(0) != Some("confirm") {
        return Err(ConsoleError::RequiresConfirm);
    }

    erase_nvs().map_err(|_| ConsoleError::NvsError)?;
    CONFIG.reset();
    let _ = writeln!(out, "NVS erased, restarting...");
    restart();
    Ok(())
}

#[cfg(target_os = "espidf")]
fn restart() {
    // SAFETY: does not return
    unsafe { esp_idf_svc::sys::esp_restart() }
}

#[cfg(not(target_os = "espidf"))]
fn restart() {}
