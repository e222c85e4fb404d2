//! Build script for barograph-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time
//! - Generates `board_config.rs` with the bus configuration constants

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = validate_config();
    generate_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml configuration at compile time
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml configuration file.          ║\n\
            ║  Please create one in the barograph-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_required_sections(&config);

    let mut errors = Vec::new();
    validate_clocks(&config, &mut errors);
    validate_i2c(&config, &mut errors);
    validate_spi(&config, &mut errors);
    validate_sensor(&config, &mut errors);
    report("Invalid board configuration", &errors);

    println!("cargo:warning=board.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn report<S: AsRef<str>>(title: &str, errors: &[S]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Validate that required sections exist
fn validate_required_sections(config: &toml::Value) {
    let errors: Vec<String> = ["clocks", "i2c", "spi", "sensor"]
        .iter()
        .filter(|section| !matches!(config.get(**section), Some(toml::Value::Table(_))))
        .map(|section| format!("Missing [{}] section", section))
        .collect();

    report("Missing required sections in board.toml", &errors);
}

/// Look up `[section] key` as an integer within `range`
fn integer(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(value)) if range.contains(value) => *value,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            *range.start()
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            *range.start()
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            *range.start()
        }
    }
}

const BUDGET_RANGE: std::ops::RangeInclusive<i64> = 1..=u32::MAX as i64;

fn validate_clocks(config: &toml::Value, errors: &mut Vec<String>) {
    integer(config, "clocks", "sysclk_hz", 1_000_000..=72_000_000, errors);
    integer(config, "clocks", "spi_pclk_hz", 1_000_000..=72_000_000, errors);
    if let Err(e) = i2c_clock_source(config) {
        errors.push(e);
    }
}

/// HSI frequency on the STM32F3
const HSI_HZ: i64 = 8_000_000;

/// `[clocks] i2c_clock_source` as the `I2cKernelClock` variant name
fn i2c_clock_source(config: &toml::Value) -> Result<&'static str, String> {
    match config.get("clocks").and_then(|c| c.get("i2c_clock_source")) {
        Some(toml::Value::String(source)) => match source.as_str() {
            "hsi" => Ok("Hsi"),
            "sysclk" => Ok("Sysclk"),
            other => Err(format!("[clocks] unknown i2c_clock_source '{}'", other)),
        },
        Some(_) => Err("[clocks] i2c_clock_source must be a string".to_string()),
        None => Err("[clocks] missing 'i2c_clock_source'".to_string()),
    }
}

fn validate_i2c(config: &toml::Value, errors: &mut Vec<String>) {
    let frequency = integer(config, "i2c", "frequency", 1..=1_000_000, errors);
    if ![100_000, 400_000, 1_000_000].contains(&frequency) {
        errors.push("[i2c] frequency must be 100000, 400000 or 1000000".to_string());
    }
    for key in ["address_timeout", "first_byte_timeout", "data_timeout", "stop_timeout"] {
        integer(config, "i2c", key, BUDGET_RANGE, errors);
    }
}

fn validate_spi(config: &toml::Value, errors: &mut Vec<String>) {
    let pclk = integer(config, "clocks", "spi_pclk_hz", 1..=72_000_000, &mut Vec::new());
    let max = integer(config, "spi", "max_frequency", 1..=36_000_000, errors);
    if spi_divider(pclk, max).is_none() {
        errors.push("[spi] max_frequency is below spi_pclk_hz / 256".to_string());
    }
    integer(config, "spi", "mode", 0..=3, errors);
    integer(config, "spi", "dummy_byte", 0..=0xFF, errors);
    integer(config, "spi", "transmit_timeout", BUDGET_RANGE, errors);
    integer(config, "spi", "receive_timeout", BUDGET_RANGE, errors);
}

fn validate_sensor(config: &toml::Value, errors: &mut Vec<String>) {
    // 7-bit addresses outside the reserved blocks
    integer(config, "sensor", "i2c_address", 0x08..=0x77, errors);
    integer(config, "sensor", "chip_id", 0..=0xFF, errors);
    integer(config, "sensor", "poll_interval_ms", 10..=60_000, errors);
}

/// Smallest SCK divider (as BR field value) keeping SCK at or below `max`
fn spi_divider(pclk: i64, max: i64) -> Option<u8> {
    (0u8..8).find(|br| pclk / (2i64 << br) <= max)
}

/// Emit `board_config.rs` into OUT_DIR
fn generate_config(config: &toml::Value) {
    let mut errors = Vec::new();
    let mut get = |section: &str, key: &str| integer(config, section, key, i64::MIN..=i64::MAX, &mut errors);

    let sysclk_hz = get("clocks", "sysclk_hz");
    let spi_pclk_hz = get("clocks", "spi_pclk_hz");
    let i2c_frequency = get("i2c", "frequency");
    let address_timeout = get("i2c", "address_timeout");
    let first_byte_timeout = get("i2c", "first_byte_timeout");
    let data_timeout = get("i2c", "data_timeout");
    let stop_timeout = get("i2c", "stop_timeout");
    let max_frequency = get("spi", "max_frequency");
    let mode = get("spi", "mode");
    let dummy_byte = get("spi", "dummy_byte");
    let transmit_timeout = get("spi", "transmit_timeout");
    let receive_timeout = get("spi", "receive_timeout");
    let i2c_address = get("sensor", "i2c_address");
    let chip_id = get("sensor", "chip_id");
    let poll_interval_ms = get("sensor", "poll_interval_ms");

    let i2c_clock = i2c_clock_source(config).unwrap_or("Hsi");
    let i2c_kernel_hz = match i2c_clock {
        "Sysclk" => sysclk_hz,
        _ => HSI_HZ,
    };

    let divider = match spi_divider(spi_pclk_hz, max_frequency) {
        Some(br) => 2u32 << br,
        None => 256,
    };

    let generated = format!(
        "// Generated from board.toml by build.rs\n\
        \n\
        pub const I2C_KERNEL_CLOCK: I2cKernelClock = I2cKernelClock::{i2c_clock};\n\
        \n\
        pub const I2C_CONFIG: I2cConfig = I2cConfig {{\n\
        \x20   kernel_clock_hz: {i2c_kernel_hz},\n\
        \x20   frequency: {i2c_frequency},\n\
        \x20   timeouts: I2cTimeouts {{\n\
        \x20       address: TimeoutBudget::new({address_timeout}),\n\
        \x20       first_byte: TimeoutBudget::new({first_byte_timeout}),\n\
        \x20       data: TimeoutBudget::new({data_timeout}),\n\
        \x20       stop: TimeoutBudget::new({stop_timeout}),\n\
        \x20   }},\n\
        }};\n\
        \n\
        pub const SPI_CONFIG: SpiConfig = SpiConfig {{\n\
        \x20   divider: BaudDivider::Div{divider},\n\
        \x20   mode: Mode::Mode{mode},\n\
        \x20   dummy_byte: {dummy_byte:#04x},\n\
        \x20   timeouts: SpiTimeouts {{\n\
        \x20       transmit: TimeoutBudget::new({transmit_timeout}),\n\
        \x20       receive: TimeoutBudget::new({receive_timeout}),\n\
        \x20   }},\n\
        }};\n\
        \n\
        pub const SPI_PCLK_HZ: u32 = {spi_pclk_hz};\n\
        pub const SENSOR_I2C_ADDRESS: u8 = {i2c_address:#04x};\n\
        pub const SENSOR_CHIP_ID: u8 = {chip_id:#04x};\n\
        pub const POLL_INTERVAL_MS: u64 = {poll_interval_ms};\n"
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board_config.rs"), generated).unwrap();
}
