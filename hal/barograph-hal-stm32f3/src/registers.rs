//! STM32F3 register map for the I2C (v2) and SPI (v2) peripherals
//!
//! Offsets and bit positions follow RM0316. Only the fields the engines
//! touch are listed.

/// I2C peripheral registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cRegister {
    Cr1,
    Cr2,
    Timingr,
    Isr,
    Icr,
    Rxdr,
    Txdr,
}

impl I2cRegister {
    /// Byte offset from the peripheral base address
    pub const fn offset(self) -> usize {
        match self {
            I2cRegister::Cr1 => 0x00,
            I2cRegister::Cr2 => 0x04,
            I2cRegister::Timingr => 0x10,
            I2cRegister::Isr => 0x18,
            I2cRegister::Icr => 0x1C,
            I2cRegister::Rxdr => 0x24,
            I2cRegister::Txdr => 0x28,
        }
    }
}

/// SPI peripheral registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiRegister {
    Cr1,
    Cr2,
    Sr,
    /// Data register, half-word access (packs two 8-bit frames)
    Dr,
    /// Data register, byte access (exactly one 8-bit frame)
    Dr8,
}

impl SpiRegister {
    /// Byte offset from the peripheral base address
    pub const fn offset(self) -> usize {
        match self {
            SpiRegister::Cr1 => 0x00,
            SpiRegister::Cr2 => 0x04,
            SpiRegister::Sr => 0x08,
            SpiRegister::Dr | SpiRegister::Dr8 => 0x0C,
        }
    }
}

/// I2C bit fields
pub mod i2c {
    // CR1
    pub const CR1_PE: u32 = 1 << 0;

    // CR2
    pub const CR2_SADD_POS: u32 = 0;
    pub const CR2_SADD_WIDTH: u32 = 10;
    pub const CR2_RD_WRN: u32 = 1 << 10;
    pub const CR2_START: u32 = 1 << 13;
    pub const CR2_STOP: u32 = 1 << 14;
    pub const CR2_NBYTES_POS: u32 = 16;
    pub const CR2_NBYTES_WIDTH: u32 = 8;
    pub const CR2_AUTOEND: u32 = 1 << 25;

    // TIMINGR
    pub const TIMINGR_SCLL_POS: u32 = 0;
    pub const TIMINGR_SCLH_POS: u32 = 8;
    pub const TIMINGR_SDADEL_POS: u32 = 16;
    pub const TIMINGR_SCLDEL_POS: u32 = 20;
    pub const TIMINGR_PRESC_POS: u32 = 28;

    // ISR
    pub const ISR_TXIS: u32 = 1 << 1;
    pub const ISR_RXNE: u32 = 1 << 2;
    pub const ISR_STOPF: u32 = 1 << 5;
    pub const ISR_TC: u32 = 1 << 6;

    // ICR
    pub const ICR_STOPCF: u32 = 1 << 5;
}

/// SPI bit fields
pub mod spi {
    // CR1
    pub const CR1_CPHA: u32 = 1 << 0;
    pub const CR1_CPOL: u32 = 1 << 1;
    pub const CR1_MSTR: u32 = 1 << 2;
    pub const CR1_BR_POS: u32 = 3;
    pub const CR1_BR_WIDTH: u32 = 3;
    pub const CR1_SPE: u32 = 1 << 6;
    pub const CR1_SSI: u32 = 1 << 8;
    pub const CR1_SSM: u32 = 1 << 9;

    // CR2
    pub const CR2_DS_POS: u32 = 8;
    pub const CR2_DS_WIDTH: u32 = 4;
    /// DS encoding for 8-bit frames
    pub const CR2_DS_8BIT: u32 = 0b0111;
    pub const CR2_FRXTH: u32 = 1 << 12;

    // SR
    pub const SR_RXNE: u32 = 1 << 0;
    pub const SR_TXE: u32 = 1 << 1;
    pub const SR_BSY: u32 = 1 << 7;
    /// RX FIFO level: empty, quarter, half, full
    pub const SR_FRLVL_POS: u32 = 9;
    pub const SR_FRLVL_WIDTH: u32 = 2;

    /// RX FIFO depth in 8-bit frames
    pub const RX_FIFO_DEPTH: usize = 4;
}
