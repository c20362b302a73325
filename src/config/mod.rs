//! Module: config
//!
//! Purpose: Runtime configuration for the sniffer.
//!
//! Architecture:
//! - `SnifferConfig`: every field is an atomic, readable from any task
//! - `generation` is bumped on each change so the decoder task can notice
//!   updates with a single load
//! - `PARAMS`: name-indexed table used by the console (`show`/`set`)
//! - Pins are applied at boot; other parameters are live
//!
//! Safety: RT-safe. All access via atomics, no locks.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::logging::LogLevel;

// NVS persistence
pub mod nvs;

pub use nvs::{erase_nvs, load_config_from_nvs, save_config_to_nvs, MigrationResult, NvsError, NVS_NAMESPACE};

/// Highest GPIO number accepted for the bus lines.
#[cfg(not(feature = "esp32s3"))]
pub const MAX_GPIO: u8 = 21;
#[cfg(feature = "esp32s3")]
pub const MAX_GPIO: u8 = 48;

/// GPIOs the bus lines may not use: service UART (6/7), trace TX (21),
/// SPI flash (12-17) and USB (18/19).
#[cfg(not(feature = "esp32s3"))]
pub const RESERVED_PINS: &[u8] = &[6, 7, 12, 13, 14, 15, 16, 17, 18, 19, 21];

/// GPIOs the bus lines may not use: service UART (6/7), USB (19/20),
/// SPI flash/PSRAM (26-32) and trace TX (43).
#[cfg(feature = "esp32s3")]
pub const RESERVED_PINS: &[u8] = &[6, 7, 19, 20, 26, 27, 28, 29, 30, 31, 32, 43];

/// Longest periodic stats interval (seconds).
pub const MAX_STATS_INTERVAL_S: u32 = 3600;

/// Default SDA GPIO (set by build.rs).
pub const DEFAULT_SDA_PIN: u8 = parse_u8(env!("SNIFFER_DEFAULT_SDA"));

/// Default SCL GPIO (set by build.rs).
pub const DEFAULT_SCL_PIN: u8 = parse_u8(env!("SNIFFER_DEFAULT_SCL"));

/// Default periodic stats interval (seconds).
pub const DEFAULT_STATS_INTERVAL_S: u32 = 60;

/// Parse a decimal u8 at compile time.
const fn parse_u8(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        assert!(bytes[i].is_ascii_digit(), "not a decimal number");
        value = value * 10 + (bytes[i] - b'0');
        i += 1;
    }
    value
}

/// Why a parameter write was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamSetError {
    /// Value outside the parameter's range.
    OutOfRange,
    /// Value type does not match the parameter.
    TypeMismatch,
    /// SDA and SCL would use the same GPIO.
    PinConflict,
    /// GPIO is taken by a UART, flash or USB.
    PinReserved,
}

impl core::fmt::Display for ParamSetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamSetError::OutOfRange => f.write_str("out of range"),
            ParamSetError::TypeMismatch => f.write_str("type mismatch"),
            ParamSetError::PinConflict => f.write_str("SDA and SCL must differ"),
            ParamSetError::PinReserved => f.write_str("pin is reserved"),
        }
    }
}

/// Sniffer configuration.
///
/// Written by the console and the NVS loader, read by the decoder and
/// service tasks.
pub struct SnifferConfig {
    sda_pin: AtomicU8,
    scl_pin: AtomicU8,
    data_acks: AtomicBool,
    log_level: AtomicU8,
    stats_interval_s: AtomicU32,
    generation: AtomicU16,
}

impl SnifferConfig {
    /// Create config with build-time defaults.
    pub const fn new() -> Self {
        Self {
            sda_pin: AtomicU8::new(DEFAULT_SDA_PIN),
            scl_pin: AtomicU8::new(DEFAULT_SCL_PIN),
            data_acks: AtomicBool::new(false),
            log_level: AtomicU8::new(LogLevel::Info as u8),
            stats_interval_s: AtomicU32::new(DEFAULT_STATS_INTERVAL_S),
            generation: AtomicU16::new(0),
        }
    }

    /// SDA GPIO number.
    #[inline]
    pub fn sda_pin(&self) -> u8 {
        self.sda_pin.load(Ordering::Relaxed)
    }

    /// SCL GPIO number.
    #[inline]
    pub fn scl_pin(&self) -> u8 {
        self.scl_pin.load(Ordering::Relaxed)
    }

    /// Per-byte acknowledgement field in traces.
    #[inline]
    pub fn data_acks(&self) -> bool {
        self.data_acks.load(Ordering::Relaxed)
    }

    /// Log level applied to both log streams.
    #[inline]
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.log_level.load(Ordering::Relaxed))
    }

    /// Periodic stats report interval, 0 = off.
    #[inline]
    pub fn stats_interval_s(&self) -> u32 {
        self.stats_interval_s.load(Ordering::Relaxed)
    }

    /// Change counter. Incremented on every successful write.
    #[inline]
    pub fn generation(&self) -> u16 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn set_sda_pin(&self, pin: u8) -> Result<(), ParamSetError> {
        check_pin(pin)?;
        if pin == self.scl_pin() {
            return Err(ParamSetError::PinConflict);
        }
        self.sda_pin.store(pin, Ordering::Relaxed);
        self.bump();
        Ok(())
    }

    pub fn set_scl_pin(&self, pin: u8) -> Result<(), ParamSetError> {
        check_pin(pin)?;
        if pin == self.sda_pin() {
            return Err(ParamSetError::PinConflict);
        }
        self.scl_pin.store(pin, Ordering::Relaxed);
        self.bump();
        Ok(())
    }

    /// Set both pins at once (swapping SDA and SCL is allowed).
    pub fn set_pins(&self, sda: u8, scl: u8) -> Result<(), ParamSetError> {
        check_pin(sda)?;
        check_pin(scl)?;
        if sda == scl {
            return Err(ParamSetError::PinConflict);
        }
        self.sda_pin.store(sda, Ordering::Relaxed);
        self.scl_pin.store(scl, Ordering::Relaxed);
        self.bump();
        Ok(())
    }

    pub fn set_data_acks(&self, enabled: bool) {
        self.data_acks.store(enabled, Ordering::Relaxed);
        self.bump();
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.log_level.store(level as u8, Ordering::Relaxed);
        self.bump();
    }

    pub fn set_stats_interval_s(&self, seconds: u32) -> Result<(), ParamSetError> {
        if seconds > MAX_STATS_INTERVAL_S {
            return Err(ParamSetError::OutOfRange);
        }
        self.stats_interval_s.store(seconds, Ordering::Relaxed);
        self.bump();
        Ok(())
    }

    /// Restore build-time defaults.
    pub fn reset(&self) {
        self.sda_pin.store(DEFAULT_SDA_PIN, Ordering::Relaxed);
        self.scl_pin.store(DEFAULT_SCL_PIN, Ordering::Relaxed);
        self.data_acks.store(false, Ordering::Relaxed);
        self.log_level.store(LogLevel::Info as u8, Ordering::Relaxed);
        self.stats_interval_s.store(DEFAULT_STATS_INTERVAL_S, Ordering::Relaxed);
        self.bump();
    }

    #[inline]
    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a GPIO can observe a bus line.
pub fn is_pin_usable(pin: u8) -> bool {
    check_pin(pin).is_ok()
}

fn check_pin(pin: u8) -> Result<(), ParamSetError> {
    if pin > MAX_GPIO {
        Err(ParamSetError::OutOfRange)
    } else if RESERVED_PINS.contains(&pin) {
        Err(ParamSetError::PinReserved)
    } else {
        Ok(())
    }
}

// ============================================================================
// Parameter table
// ============================================================================

/// Parameter value as seen by the console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    U8(u8),
    U32(u32),
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::U8(n) => write!(f, "{}", n),
            ParamValue::U32(n) => write!(f, "{}", n),
        }
    }
}

/// Parameter type with range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    U8 { min: u8, max: u8 },
    U32 { min: u32, max: u32 },
}

/// Parameter descriptor.
pub struct ParamDescriptor {
    pub name: &'static str,
    pub brief: &'static str,
    pub param_type: ParamType,
    /// Change needs `save` + reboot to take effect.
    pub reboot_required: bool,
    pub get_fn: fn(&SnifferConfig) -> ParamValue,
    pub set_fn: fn(&SnifferConfig, ParamValue) -> Result<(), ParamSetError>,
}

/// All parameters, in display order.
pub static PARAMS: &[ParamDescriptor] = &[
    ParamDescriptor {
        name: "sda_pin",
        brief: "GPIO observing SDA",
        param_type: ParamType::U8 { min: 0, max: MAX_GPIO },
        reboot_required: true,
        get_fn: |c| ParamValue::U8(c.sda_pin()),
        set_fn: |c, v| match v {
            ParamValue::U8(pin) => c.set_sda_pin(pin),
            _ => Err(ParamSetError::TypeMismatch),
        },
    },
    ParamDescriptor {
        name: "scl_pin",
        brief: "GPIO observing SCL",
        param_type: ParamType::U8 { min: 0, max: MAX_GPIO },
        reboot_required: true,
        get_fn: |c| ParamValue::U8(c.scl_pin()),
        set_fn: |c, v| match v {
            ParamValue::U8(pin) => c.set_scl_pin(pin),
            _ => Err(ParamSetError::TypeMismatch),
        },
    },
    ParamDescriptor {
        name: "data_acks",
        brief: "Trace ACK/NAK after each data byte",
        param_type: ParamType::Bool,
        reboot_required: false,
        get_fn: |c| ParamValue::Bool(c.data_acks()),
        set_fn: |c, v| match v {
            ParamValue::Bool(b) => {
                c.set_data_acks(b);
                Ok(())
            }
            _ => Err(ParamSetError::TypeMismatch),
        },
    },
    ParamDescriptor {
        name: "log_level",
        brief: "0=error 1=warn 2=info 3=debug 4=trace",
        param_type: ParamType::U8 { min: 0, max: LogLevel::Trace as u8 },
        reboot_required: false,
        get_fn: |c| ParamValue::U8(c.log_level() as u8),
        set_fn: |c, v| match v {
            ParamValue::U8(n) if n <= LogLevel::Trace as u8 => {
                c.set_log_level(LogLevel::from_u8(n));
                Ok(())
            }
            ParamValue::U8(_) => Err(ParamSetError::OutOfRange),
            _ => Err(ParamSetError::TypeMismatch),
        },
    },
    ParamDescriptor {
        name: "stats_interval_s",
        brief: "Periodic stats report, 0 = off",
        param_type: ParamType::U32 { min: 0, max: MAX_STATS_INTERVAL_S },
        reboot_required: false,
        get_fn: |c| ParamValue::U32(c.stats_interval_s()),
        set_fn: |c, v| match v {
            ParamValue::U32(n) => c.set_stats_interval_s(n),
            _ => Err(ParamSetError::TypeMismatch),
        },
    },
];

/// Find a parameter by exact name.
pub fn find_param(name: &str) -> Option<&'static ParamDescriptor> {
    PARAMS.iter().find(|p| p.name == name)
}

/// Find parameters by prefix pattern (`"s*"`); without `*` the match is exact.
pub fn find_params_matching(pattern: &str) -> impl Iterator<Item = &'static ParamDescriptor> + '_ {
    let (prefix, wildcard) = match pattern.strip_suffix('*') {
        Some(prefix) => (prefix, true),
        None => (pattern, false),
    };
    PARAMS.iter().filter(move |p| {
        if wildcard {
            p.name.starts_with(prefix)
        } else {
            p.name == prefix
        }
    })
}

/// All parameter names.
pub fn param_names() -> impl Iterator<Item = &'static str> + Clone {
    PARAMS.iter().map(|p| p.name)
}
