//! STM32F3-specific bus engines for barograph
//!
//! This crate implements the `barograph-hal` I2C and SPI traits on the
//! STM32F3 I2C v2 and SPI v2 peripherals. Supported chips include:
//!
//! - STM32F303RE (Nucleo-F303RE)
//! - STM32F303K8
//!
//! # Features
//!
//! - `pac` - Memory-mapped register binding through embassy-stm32
//! - `stm32f303re` / `stm32f303k8` - Select the chip (implies `pac`)
//! - `defmt` - Enable logging and debug formatting support
//! - `serde` - Serialize bus configuration types
//!
//! # Usage
//!
//! Board bring-up enables the peripheral clocks and routes the pins,
//! then hands the register blocks to the engines:
//!
//! ```ignore
//! let mut i2c = I2cMaster::new(I2cMmio::new(pac::I2C1), I2cConfig::STANDARD);
//! i2c.init();
//!
//! let cs = EmbeddedHalPin::new(Output::new(p.PB6, Level::High, Speed::VeryHigh), true);
//! let mut spi = SpiMaster::new(SpiMmio::new(pac::SPI1), cs, SpiConfig::default());
//! spi.init();
//! ```
//!
//! Without `pac` the crate builds on the host and the engines run against
//! simulated peripherals in the unit tests.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod gpio;
pub mod i2c;
#[cfg(feature = "pac")]
pub mod mmio;
pub mod registers;
pub mod spi;

#[cfg(test)]
mod sim;

pub use gpio::EmbeddedHalPin;
pub use i2c::{I2cMaster, I2cTiming};
#[cfg(feature = "pac")]
pub use mmio::{I2cMmio, SpiMmio};
pub use spi::SpiMaster;

// Re-export shared types from barograph-hal
pub use barograph_hal::{
    I2cConfig, I2cError, I2cRegisterBus, OutputPin, Phase, SpiConfig, SpiError, SpiTransfer,
};
