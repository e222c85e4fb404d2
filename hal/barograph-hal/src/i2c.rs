//! I2C bus abstractions
//!
//! Provides the register-oriented I2C master trait, its configuration,
//! and the phase-tagged error type shared by chip-specific engines.

use crate::phase::Phase;
use crate::timeout::TimeoutBudget;

/// Largest byte count a single transfer can program (8-bit NBYTES field)
pub const MAX_TRANSFER_LEN: usize = 255;

/// Highest 7-bit device address
pub const MAX_ADDRESS: u8 = 0x7F;

/// I2C bus master with addressed register access
///
/// Every call blocks until the transaction completes or one of its
/// waits runs out of budget. The buffer passed to
/// [`read_register`](Self::read_register) is only meaningful on `Ok`.
pub trait I2cRegisterBus {
    /// Configure the peripheral
    ///
    /// Idempotent: calling it again rewrites the same values.
    fn init(&mut self);

    /// Read `buf.len()` bytes starting at `register` of the device at `address`
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address, `0x00..=0x7F`
    /// * `register` - Register address byte sent before the read
    /// * `buf` - Buffer to read into (1 to 255 bytes)
    fn read_register(&mut self, address: u8, register: u8, buf: &mut [u8])
        -> Result<(), I2cError>;

    /// Write `data` starting at `register` of the device at `address`
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address, `0x00..=0x7F`
    /// * `register` - Register address byte sent before the payload
    /// * `data` - Payload (1 to 254 bytes, the register byte takes one slot)
    fn write_register(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), I2cError>;
}

/// Which wait of the address phase ran out of budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWait {
    /// The peripheral never asked for the register address byte (TXIS).
    /// Usually a wrong device address or a wiring fault.
    TransmitReady,
    /// The register address byte was never acknowledged (TC)
    TransferComplete,
}

/// Error from I2C transactions
///
/// Each variant names the phase that failed to reach its status
/// condition within budget. No variant implies that a STOP was issued:
/// after any failure the bus may still be held and the caller should
/// re-initialize the peripheral before trusting it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Address phase timeout
    AddressPhaseTimeout(AddressWait),
    /// Data phase timeout with `remaining` bytes not yet transferred
    DataPhaseTimeout {
        /// Bytes still unread (read) or unsent (write)
        remaining: usize,
    },
    /// STOP was never detected. The payload may have moved completely,
    /// but the transaction is still a failure since a stuck bus
    /// threatens every later transaction.
    StopPhaseTimeout,
    /// Byte count outside `1..=255` (register byte included for writes)
    InvalidLength,
    /// Device address above `0x7F`. Addresses are never masked, since a
    /// truncated address would reach a different device.
    InvalidAddress,
}

impl I2cError {
    /// Phase in which the transaction failed
    ///
    /// `InvalidLength` and `InvalidAddress` are reported as the address
    /// phase since they are rejected before anything goes on the bus.
    pub const fn phase(&self) -> Phase {
        match self {
            I2cError::AddressPhaseTimeout(_)
            | I2cError::InvalidLength
            | I2cError::InvalidAddress => Phase::AddressOrCommand,
            I2cError::DataPhaseTimeout { .. } => Phase::Data,
            I2cError::StopPhaseTimeout => Phase::Completion,
        }
    }

    /// Check if the error came from an exhausted poll budget
    pub const fn is_timeout(&self) -> bool {
        !matches!(self, I2cError::InvalidLength | I2cError::InvalidAddress)
    }
}

impl core::fmt::Display for I2cError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            I2cError::AddressPhaseTimeout(AddressWait::TransmitReady) => {
                write!(f, "I2C address phase timeout (no transmit request)")
            }
            I2cError::AddressPhaseTimeout(AddressWait::TransferComplete) => {
                write!(f, "I2C address phase timeout (register byte not completed)")
            }
            I2cError::DataPhaseTimeout { remaining } => {
                write!(f, "I2C data phase timeout, {} bytes remaining", remaining)
            }
            I2cError::StopPhaseTimeout => write!(f, "I2C stop phase timeout"),
            I2cError::InvalidLength => write!(f, "I2C transfer length out of range"),
            I2cError::InvalidAddress => write!(f, "I2C address is not a 7-bit address"),
        }
    }
}

/// Poll budgets for each I2C wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I2cTimeouts {
    /// TXIS / TC waits while sending the register address
    pub address: TimeoutBudget,
    /// First RXNE wait of a read (covers the restart and device latency)
    pub first_byte: TimeoutBudget,
    /// Every later RXNE wait, and every TXIS wait for payload bytes
    pub data: TimeoutBudget,
    /// STOPF wait
    pub stop: TimeoutBudget,
}

impl I2cTimeouts {
    /// Budgets used by the presets
    pub const DEFAULT: Self = Self {
        address: TimeoutBudget::new(100_000),
        first_byte: TimeoutBudget::new(1_000_000),
        data: TimeoutBudget::new(100_000),
        stop: TimeoutBudget::new(100_000),
    };
}

impl Default for I2cTimeouts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I2cConfig {
    /// Peripheral kernel clock in Hz, as selected by board bring-up
    pub kernel_clock_hz: u32,
    /// SCL frequency in Hz
    pub frequency: u32,
    /// Poll budgets
    pub timeouts: I2cTimeouts,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Kernel clock assumed by the presets (SYSCLK at 48 MHz)
    pub const DEFAULT_KERNEL_CLOCK_HZ: u32 = 48_000_000;

    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self::with_frequency(100_000);

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self::with_frequency(400_000);

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self::with_frequency(1_000_000);

    const fn with_frequency(frequency: u32) -> Self {
        Self {
            kernel_clock_hz: Self::DEFAULT_KERNEL_CLOCK_HZ,
            frequency,
            timeouts: I2cTimeouts::DEFAULT,
        }
    }

    /// Same configuration with a different kernel clock
    pub const fn kernel_clock(mut self, hz: u32) -> Self {
        self.kernel_clock_hz = hz;
        self
    }
}
