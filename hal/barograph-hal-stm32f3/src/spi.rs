//! SPI master engine for STM32F3
//!
//! Polled full-duplex exchange on the SPI v2 peripheral with a
//! software-driven chip-select line. The peripheral runs with 8-bit
//! frames; a 16-bit transfer packs two frames into one half-word access.
//!
//! Burst read framing for the BMP390:
//!
//! ```text
//! CS   ‾‾\____________________________________________/‾‾
//! MOSI     reg|0x80  dummy  dummy  dummy ..  dummy
//! MISO     --        --     --     data[0] .. data[n-1]
//! ```

use barograph_hal::gpio::{ChipSelectGuard, OutputPin};
use barograph_hal::regs::{field, wait_for_flags, with_field, RegisterInterface};
use barograph_hal::spi::{
    ClockPhase, Polarity, SpiConfig, SpiError, SpiTimeouts, SpiTransfer, BURST_DUMMY_BYTES,
    READ_BIT,
};
use barograph_hal::timeout::wait_until;

use crate::registers::spi::*;
use crate::registers::SpiRegister;

/// Frames clocked before the response of a burst read
const HEADER_FRAMES: usize = 1 + BURST_DUMMY_BYTES;

/// SPI master engine
///
/// Owns one SPI peripheral instance and the chip-select line of the
/// device behind it. Like [`I2cMaster`](crate::i2c::I2cMaster) it is not
/// `Clone`, and concurrent callers must serialize access themselves.
pub struct SpiMaster<R, CS> {
    regs: R,
    cs: CS,
    config: SpiConfig,
}

impl<R, CS> SpiMaster<R, CS>
where
    R: RegisterInterface<Register = SpiRegister>,
    CS: OutputPin,
{
    /// Create an engine around a register block and chip-select line
    ///
    /// Board bring-up must already have enabled the peripheral clock and
    /// routed SCK/MISO/MOSI to the peripheral. `cs` must be a push-pull
    /// output. Call [`init`](Self::init) before use.
    pub fn new(regs: R, cs: CS, config: SpiConfig) -> Self {
        Self { regs, cs, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Release the register block and chip-select line
    pub fn free(self) -> (R, CS) {
        (self.regs, self.cs)
    }

    /// Configure and enable the peripheral
    ///
    /// Chip-select is driven inactive before anything else so the
    /// device cannot see clock edges while selected.
    pub fn init(&mut self) {
        self.cs.set_high();

        self.regs.write(SpiRegister::Cr1, 0);
        self.regs.write(SpiRegister::Cr2, 0);

        let (polarity, phase) = self.config.mode.into();
        let mut cr1 = with_field(0, CR1_BR_POS, CR1_BR_WIDTH, self.config.divider as u32);
        if polarity == Polarity::IdleHigh {
            cr1 |= CR1_CPOL;
        }
        if phase == ClockPhase::CaptureOnSecondTransition {
            cr1 |= CR1_CPHA;
        }
        // LSBFIRST stays clear: MSB first
        self.regs.write(SpiRegister::Cr1, cr1);

        self.regs.write(
            SpiRegister::Cr2,
            with_field(0, CR2_DS_POS, CR2_DS_WIDTH, CR2_DS_8BIT) | CR2_FRXTH,
        );

        // Software NSS held high keeps the peripheral in master mode
        self.regs.set_bits(SpiRegister::Cr1, CR1_MSTR | CR1_SSM | CR1_SSI);
        self.regs.set_bits(SpiRegister::Cr1, CR1_SPE);
        drain_rx(&mut self.regs);

        debug!("SPI init: divider /{}", self.config.divider.ratio());
    }

    /// Exchange one byte
    ///
    /// Chip-select is left as it is.
    pub fn transfer8(&mut self, byte: u8) -> Result<u8, SpiError> {
        drain_rx(&mut self.regs);
        exchange8(&mut self.regs, &self.config.timeouts, byte)
    }

    /// Exchange one 16-bit word (two 8-bit frames, low byte first)
    pub fn transfer16(&mut self, word: u16) -> Result<u16, SpiError> {
        // RXNE must wait for both frames of the packed half-word
        drain_rx(&mut self.regs);
        self.regs.clear_bits(SpiRegister::Cr2, CR2_FRXTH);
        let result = exchange16(&mut self.regs, &self.config.timeouts, word);
        self.regs.set_bits(SpiRegister::Cr2, CR2_FRXTH);
        result
    }

    /// Read `buf.len()` bytes starting at `register`
    ///
    /// Frames the read as `register | READ_BIT`, two dummy bytes and one
    /// dummy frame per response byte, all with the device selected. The
    /// device is deselected exactly once on every exit path.
    pub fn burst_read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SpiError> {
        let Self { regs, cs, config } = self;
        let timeouts = &config.timeouts;

        regs.set_bits(SpiRegister::Cr2, CR2_FRXTH);
        drain_rx(regs);

        let total = HEADER_FRAMES + buf.len();
        let header = [register | READ_BIT, config.dummy_byte, config.dummy_byte];

        let _cs = ChipSelectGuard::select(cs);

        for (i, &byte) in header.iter().enumerate() {
            // Header responses carry no data
            exchange8(regs, timeouts, byte).map_err(|e| burst_failed(register, e, total - i))?;
        }

        let len = buf.len();
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = exchange8(regs, timeouts, config.dummy_byte)
                .map_err(|e| burst_failed(register, e, len - i))?;
        }

        trace!("SPI burst read {} bytes from {=u8:#x}", len, register);
        Ok(())
    }

    /// Wait until the peripheral has finished shifting out the last frame
    fn wait_idle(&mut self) -> Result<(), SpiError> {
        let regs = &mut self.regs;
        wait_until(self.config.timeouts.transmit, || {
            regs.read(SpiRegister::Sr) & SR_BSY == 0
        })
        .map_err(|_| SpiError::TransmitTimeout)
    }
}

/// Discard frames a failed exchange left in the RX FIFO
///
/// Without this the next exchange would return the stale frame as its
/// own response.
fn drain_rx<R>(regs: &mut R)
where
    R: RegisterInterface<Register = SpiRegister>,
{
    let mut dropped = 0;
    while dropped < RX_FIFO_DEPTH
        && field(regs.read(SpiRegister::Sr), SR_FRLVL_POS, SR_FRLVL_WIDTH) != 0
    {
        regs.read(SpiRegister::Dr8);
        dropped += 1;
    }
    if dropped > 0 {
        debug!("SPI dropped {} stale RX frames", dropped);
    }
}

fn exchange8<R>(regs: &mut R, timeouts: &SpiTimeouts, byte: u8) -> Result<u8, SpiError>
where
    R: RegisterInterface<Register = SpiRegister>,
{
    wait_for_flags(regs, SpiRegister::Sr, SR_TXE, timeouts.transmit)
        .map_err(|_| SpiError::TransmitTimeout)?;

    // Byte access queues exactly one 8-bit frame
    regs.write(SpiRegister::Dr8, u32::from(byte));

    wait_for_flags(regs, SpiRegister::Sr, SR_RXNE, timeouts.receive)
        .map_err(|_| SpiError::ReceiveTimeout { remaining: 1 })?;

    Ok(regs.read(SpiRegister::Dr8) as u8)
}

fn exchange16<R>(regs: &mut R, timeouts: &SpiTimeouts, word: u16) -> Result<u16, SpiError>
where
    R: RegisterInterface<Register = SpiRegister>,
{
    wait_for_flags(regs, SpiRegister::Sr, SR_TXE, timeouts.transmit)
        .map_err(|_| SpiError::TransmitTimeout)?;

    regs.write(SpiRegister::Dr, u32::from(word));

    wait_for_flags(regs, SpiRegister::Sr, SR_RXNE, timeouts.receive)
        .map_err(|_| SpiError::ReceiveTimeout { remaining: 1 })?;

    Ok(regs.read(SpiRegister::Dr) as u16)
}

/// Rewrite a single-frame error with the frames left in the burst
fn burst_failed(register: u8, error: SpiError, remaining: usize) -> SpiError {
    let error = match error {
        SpiError::TransmitTimeout => SpiError::TransmitTimeout,
        SpiError::ReceiveTimeout { .. } => SpiError::ReceiveTimeout { remaining },
    };
    warn!("SPI burst read of {=u8:#x} failed: {}", register, error);
    error
}

impl<R, CS> SpiTransfer for SpiMaster<R, CS>
where
    R: RegisterInterface<Register = SpiRegister>,
    CS: OutputPin,
{
    fn init(&mut self) {
        SpiMaster::init(self)
    }

    fn transfer8(&mut self, byte: u8) -> Result<u8, SpiError> {
        SpiMaster::transfer8(self, byte)
    }

    fn transfer16(&mut self, word: u16) -> Result<u16, SpiError> {
        SpiMaster::transfer16(self, word)
    }

    fn burst_read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SpiError> {
        SpiMaster::burst_read(self, register, buf)
    }
}

impl<R, CS> embedded_hal::spi::ErrorType for SpiMaster<R, CS> {
    type Error = SpiError;
}

/// Byte-wide bus access for `embedded-hal` drivers
///
/// Chip-select is not touched; pair the engine with a device wrapper
/// that frames transactions, or drive the line directly.
impl<R, CS> embedded_hal::spi::SpiBus<u8> for SpiMaster<R, CS>
where
    R: RegisterInterface<Register = SpiRegister>,
    CS: OutputPin,
{
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let dummy = self.config.dummy_byte;
        for word in words.iter_mut() {
            *word = self.transfer8(dummy)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for &word in words {
            self.transfer8(word)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let dummy = self.config.dummy_byte;
        for i in 0..read.len().max(write.len()) {
            let received = self.transfer8(write.get(i).copied().unwrap_or(dummy))?;
            if let Some(slot) = read.get_mut(i) {
                *slot = received;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words.iter_mut() {
            *word = self.transfer8(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.wait_idle()
    }
}
