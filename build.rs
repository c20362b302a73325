// ESP32 I2C Sniffer - Build Script
//
// Exports the ESP-IDF environment, stamps the version string and resolves
// the default sniffer pins.

use std::process::Command;

/// Default SDA/SCL GPIOs when no override is given.
const DEFAULT_SDA: u8 = 4;
const DEFAULT_SCL: u8 = 5;

/// Per-chip GPIO limit and reserved pins, as in `config::MAX_GPIO` and
/// `config::RESERVED_PINS`.
struct ChipPins {
    max_gpio: u8,
    reserved: &'static [u8],
}

const ESP32C3_PINS: ChipPins = ChipPins {
    max_gpio: 21,
    reserved: &[6, 7, 12, 13, 14, 15, 16, 17, 18, 19, 21],
};

const ESP32S3_PINS: ChipPins = ChipPins {
    max_gpio: 48,
    reserved: &[6, 7, 19, 20, 26, 27, 28, 29, 30, 31, 32, 43],
};

fn main() {
    // ESP-IDF environment setup (MUST be first!)
    embuild::espidf::sysenv::output();

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING=I2CSniffer v{}-g{}", version, git_hash);

    // Default pins, overridable at build time (menuconfig equivalent)
    let chip = if std::env::var_os("CARGO_FEATURE_ESP32S3").is_some() {
        &ESP32S3_PINS
    } else {
        &ESP32C3_PINS
    };
    let sda = pin_from_env("SNIFFER_GPIO_SDA", DEFAULT_SDA, chip);
    let scl = pin_from_env("SNIFFER_GPIO_SCL", DEFAULT_SCL, chip);
    if sda == scl {
        panic!("SNIFFER_GPIO_SDA and SNIFFER_GPIO_SCL must differ (both are {})", sda);
    }
    println!("cargo:rustc-env=SNIFFER_DEFAULT_SDA={}", sda);
    println!("cargo:rustc-env=SNIFFER_DEFAULT_SCL={}", scl);

    println!("cargo:rerun-if-env-changed=SNIFFER_GPIO_SDA");
    println!("cargo:rerun-if-env-changed=SNIFFER_GPIO_SCL");

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn pin_from_env(var: &str, default: u8, chip: &ChipPins) -> u8 {
    let pin = match std::env::var(var) {
        Ok(raw) => match raw.trim().parse::<u8>() {
            Ok(pin) => pin,
            Err(_) => panic!("{} must be a GPIO number, got '{}'", var, raw),
        },
        Err(_) => default,
    };

    if pin > chip.max_gpio {
        panic!("{}={} is out of range (0..={})", var, pin, chip.max_gpio);
    }
    if chip.reserved.contains(&pin) {
        panic!("{}={} is reserved (UART, flash or USB): {:?}", var, pin, chip.reserved);
    }
    pin
}
