//! NVS persistence for the sniffer configuration with schema versioning.
//!
//! # Version History
//!
//! - **v1** (current): sda_pin, scl_pin, data_acks, log_level, stats_interval_s
//!
//! Adding a field means bumping `CURRENT_SCHEMA_VERSION` and adding a
//! `(from, to)` arm to `migrate_config()`.

use crate::config::SnifferConfig;
#[cfg(target_os = "espidf")]
use crate::logging::LogLevel;
#[cfg(target_os = "espidf")]
use core::cmp::Ordering;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::*;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Current NVS schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for sniffer configuration
pub const NVS_NAMESPACE: &str = "sniffer_cfg";

// NVS keys (15 chars max)
#[cfg(target_os = "espidf")]
const VERSION_KEY: &str = "schema_ver";
#[cfg(target_os = "espidf")]
const SDA_KEY: &str = "sda_pin";
#[cfg(target_os = "espidf")]
const SCL_KEY: &str = "scl_pin";
#[cfg(target_os = "espidf")]
const ACKS_KEY: &str = "data_acks";
#[cfg(target_os = "espidf")]
const LEVEL_KEY: &str = "log_level";
#[cfg(target_os = "espidf")]
const STATS_KEY: &str = "stats_int_s";

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Nothing stored yet, defaults kept
    FreshInstall,
    /// Schema up-to-date, loaded successfully
    UpToDate,
    /// Migrated from older version
    Migrated { from_version: u32, to_version: u32 },
}

/// NVS operation errors
#[derive(Debug)]
pub enum NvsError {
    /// NVS initialization failed
    #[cfg(target_os = "espidf")]
    InitFailed(EspError),
    /// Schema version too new (downgrade not supported)
    TooNew { stored_version: u32 },
    /// NVS read/write error
    #[cfg(target_os = "espidf")]
    IoError(EspError),
    /// Unsupported migration path
    UnsupportedMigration { from: u32, to: u32 },
    /// Feature not available on this platform
    #[cfg(not(target_os = "espidf"))]
    NotAvailable,
}

#[cfg(target_os = "espidf")]
impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

impl core::fmt::Display for NvsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(target_os = "espidf")]
            NvsError::InitFailed(e) => write!(f, "init failed: {}", e),
            NvsError::TooNew { stored_version } => {
                write!(f, "schema v{} is newer than v{}", stored_version, CURRENT_SCHEMA_VERSION)
            }
            #[cfg(target_os = "espidf")]
            NvsError::IoError(e) => write!(f, "I/O error: {}", e),
            NvsError::UnsupportedMigration { from, to } => {
                write!(f, "no migration from v{} to v{}", from, to)
            }
            #[cfg(not(target_os = "espidf"))]
            NvsError::NotAvailable => f.write_str("NVS not available"),
        }
    }
}

/// Open the config namespace.
///
/// The default partition handle is dropped with the returned storage, so
/// this can be called again later (e.g. by the `save` command).
#[cfg(target_os = "espidf")]
fn open() -> Result<EspNvs<NvsDefault>, NvsError> {
    let partition = EspDefaultNvsPartition::take().map_err(NvsError::InitFailed)?;
    EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)
}

/// Load configuration from NVS into `config`, migrating if needed.
///
/// Stored values that fail validation are skipped and the current value
/// is kept.
#[cfg(target_os = "espidf")]
pub fn load_config_from_nvs(config: &SnifferConfig) -> Result<MigrationResult, NvsError> {
    let mut storage = open()?;

    let stored_version = storage.get_u32(VERSION_KEY)?.unwrap_or(0);

    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => {
            load_v1(&storage, config)?;
            Ok(MigrationResult::UpToDate)
        }
        Ordering::Less => {
            if stored_version == 0 {
                Ok(MigrationResult::FreshInstall)
            } else {
                migrate_config(&mut storage, stored_version, CURRENT_SCHEMA_VERSION)?;
                load_v1(&storage, config)?;
                Ok(MigrationResult::Migrated {
                    from_version: stored_version,
                    to_version: CURRENT_SCHEMA_VERSION,
                })
            }
        }
        Ordering::Greater => Err(NvsError::TooNew { stored_version }),
    }
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn load_config_from_nvs(_config: &SnifferConfig) -> Result<MigrationResult, NvsError> {
    Err(NvsError::NotAvailable)
}

/// Save `config` to NVS with version stamp.
#[cfg(target_os = "espidf")]
pub fn save_config_to_nvs(config: &SnifferConfig) -> Result<(), NvsError> {
    let mut storage = open()?;

    storage.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
    save_v1(&mut storage, config)?;

    Ok(())
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn save_config_to_nvs(_config: &SnifferConfig) -> Result<(), NvsError> {
    Err(NvsError::NotAvailable)
}

/// Erase the whole default NVS partition.
#[cfg(target_os = "espidf")]
pub fn erase_nvs() -> Result<(), NvsError> {
    esp_idf_svc::sys::esp!(unsafe { esp_idf_svc::sys::nvs_flash_erase() })?;
    Ok(())
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn erase_nvs() -> Result<(), NvsError> {
    Err(NvsError::NotAvailable)
}

// ========================================
// v1 Schema Load/Save
// ========================================

#[cfg(target_os = "espidf")]
fn load_v1(storage: &EspNvs<NvsDefault>, config: &SnifferConfig) -> Result<(), NvsError> {
    let sda = storage.get_u8(SDA_KEY)?.unwrap_or(config.sda_pin());
    let scl = storage.get_u8(SCL_KEY)?.unwrap_or(config.scl_pin());
    // Reserved, out-of-range or equal pins keep the defaults
    let _ = config.set_pins(sda, scl);

    if let Some(acks) = storage.get_u8(ACKS_KEY)? {
        config.set_data_acks(acks != 0);
    }
    if let Some(level) = storage.get_u8(LEVEL_KEY)? {
        if level <= LogLevel::Trace as u8 {
            config.set_log_level(LogLevel::from_u8(level));
        }
    }
    if let Some(interval) = storage.get_u32(STATS_KEY)? {
        let _ = config.set_stats_interval_s(interval);
    }

    Ok(())
}

#[cfg(target_os = "espidf")]
fn save_v1(storage: &mut EspNvs<NvsDefault>, config: &SnifferConfig) -> Result<(), NvsError> {
    storage.set_u8(SDA_KEY, config.sda_pin())?;
    storage.set_u8(SCL_KEY, config.scl_pin())?;
    storage.set_u8(ACKS_KEY, config.data_acks() as u8)?;
    storage.set_u8(LEVEL_KEY, config.log_level() as u8)?;
    storage.set_u32(STATS_KEY, config.stats_interval_s())?;
    Ok(())
}

// ========================================
// Migration Logic
// ========================================

#[cfg(target_os = "espidf")]
fn migrate_config(
    _storage: &mut EspNvs<NvsDefault>,
    from_version: u32,
    to_version: u32,
) -> Result<(), NvsError> {
    // v1 is the first schema: every older stamp is foreign. New arms
    // rewrite keys, then restamp VERSION_KEY.
    Err(NvsError::UnsupportedMigration {
        from: from_version,
        to: to_version,
    })
}
