//! SPI bus abstractions
//!
//! Provides the full-duplex SPI master trait used by the engines, its
//! configuration, and the direction-tagged error type.

use crate::phase::Phase;
use crate::timeout::TimeoutBudget;

/// Bit OR'd into the register address to mark a sensor read
pub const READ_BIT: u8 = 0x80;

/// Dummy bytes clocked out after the address of a burst read
pub const BURST_DUMMY_BYTES: usize = 2;

/// SPI bus master
///
/// `transfer8`/`transfer16` exchange one frame and leave chip-select
/// alone; `burst_read` frames a whole sensor read including
/// chip-select.
pub trait SpiTransfer {
    /// Configure the peripheral with the chip-select line deasserted
    fn init(&mut self);

    /// Exchange one byte
    fn transfer8(&mut self, byte: u8) -> Result<u8, SpiError>;

    /// Exchange one 16-bit word
    fn transfer16(&mut self, word: u16) -> Result<u16, SpiError>;

    /// Read `buf.len()` bytes starting at `register`
    ///
    /// Sends `register | READ_BIT` and two dummy bytes with the device
    /// selected, then collects the response. The device is deselected on
    /// every exit path.
    fn burst_read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SpiError>;
}

/// Error from SPI transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// The transmit buffer never became empty; the frame was not accepted
    TransmitTimeout,
    /// The frame went out but no response arrived
    ReceiveTimeout {
        /// Frames still expected when the wait gave up
        remaining: usize,
    },
}

impl SpiError {
    /// Phase in which the transaction failed
    pub const fn phase(&self) -> Phase {
        match self {
            SpiError::TransmitTimeout => Phase::AddressOrCommand,
            SpiError::ReceiveTimeout { .. } => Phase::Data,
        }
    }
}

impl core::fmt::Display for SpiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpiError::TransmitTimeout => write!(f, "SPI transmit timeout"),
            SpiError::ReceiveTimeout { remaining } => {
                write!(f, "SPI receive timeout, {} frames remaining", remaining)
            }
        }
    }
}

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockPhase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, ClockPhase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, ClockPhase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, ClockPhase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, ClockPhase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, ClockPhase::CaptureOnSecondTransition),
        }
    }
}

/// Peripheral clock divider for SCK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BaudDivider {
    Div2 = 0,
    Div4 = 1,
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

impl BaudDivider {
    /// Divider ratio
    pub const fn ratio(self) -> u32 {
        2 << (self as u32)
    }

    /// Smallest divider that keeps SCK at or below `max_hz`
    ///
    /// Returns `None` if even the largest divider is too fast.
    pub fn for_max_frequency(pclk_hz: u32, max_hz: u32) -> Option<Self> {
        const ALL: [BaudDivider; 8] = [
            BaudDivider::Div2,
            BaudDivider::Div4,
            BaudDivider::Div8,
            BaudDivider::Div16,
            BaudDivider::Div32,
            BaudDivider::Div64,
            BaudDivider::Div128,
            BaudDivider::Div256,
        ];
        ALL.into_iter().find(|d| pclk_hz / d.ratio() <= max_hz)
    }
}

/// Poll budgets for each SPI wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiTimeouts {
    /// TXE waits
    pub transmit: TimeoutBudget,
    /// RXNE waits
    pub receive: TimeoutBudget,
}

impl Default for SpiTimeouts {
    fn default() -> Self {
        Self {
            transmit: TimeoutBudget::new(1_000_000),
            receive: TimeoutBudget::new(1_000_000),
        }
    }
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiConfig {
    /// SCK divider from the peripheral clock
    pub divider: BaudDivider,
    /// Clock polarity and phase
    pub mode: Mode,
    /// Byte clocked out after the address of a burst read
    pub dummy_byte: u8,
    /// Poll budgets
    pub timeouts: SpiTimeouts,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            // 48 MHz APB2 / 128 = 375 kHz
            divider: BaudDivider::Div128,
            mode: Mode::Mode0,
            dummy_byte: 0x42,
            timeouts: SpiTimeouts::default(),
        }
    }
}
