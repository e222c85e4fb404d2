//! Barograph Hardware Abstraction Layer
//!
//! This crate defines the chip-agnostic pieces of the synchronous bus
//! engines: raw register access, poll-count timeouts, the transaction
//! phase model, and the I2C/SPI traits and configuration types that
//! chip-specific HALs implement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (barograph-firmware)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  barograph-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  barograph-hal-stm32f3 (engines)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  RegisterInterface (MMIO or simulated)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`regs::RegisterInterface`] - Raw peripheral register access
//! - [`gpio::OutputPin`] - Chip-select and other digital outputs
//! - [`i2c::I2cRegisterBus`] - Addressed register read/write on I2C
//! - [`spi::SpiTransfer`] - Full-duplex SPI exchange and burst reads

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod phase;
pub mod regs;
pub mod spi;
pub mod timeout;

// Re-export key traits at crate root for convenience
pub use gpio::{ChipSelectGuard, OutputPin};
pub use i2c::{I2cConfig, I2cError, I2cRegisterBus};
pub use phase::Phase;
pub use regs::RegisterInterface;
pub use spi::{SpiConfig, SpiError, SpiTransfer};
pub use timeout::{wait_until, Timeout, TimeoutBudget};
