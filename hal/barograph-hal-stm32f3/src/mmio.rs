//! Memory-mapped register binding
//!
//! Binds the engines to the real I2C and SPI register blocks through the
//! embassy-stm32 PAC. Only the base address comes from the PAC; accesses
//! use the offsets in [`registers`](crate::registers) so that the SPI
//! data register can be touched with the exact width the engine asks
//! for.

use barograph_hal::regs::RegisterInterface;
use core::ptr;
use embassy_stm32::pac;

use crate::registers::{I2cRegister, SpiRegister};

/// I2C register block
pub struct I2cMmio {
    base: *mut u8,
}

impl I2cMmio {
    /// Bind an I2C instance, e.g. `I2cMmio::new(pac::I2C1)`
    ///
    /// The caller must hand each instance to exactly one engine.
    pub fn new(instance: pac::i2c::I2c) -> Self {
        Self {
            base: instance.as_ptr() as *mut u8,
        }
    }

    fn reg(&self, reg: I2cRegister) -> *mut u32 {
        self.base.wrapping_add(reg.offset()) as *mut u32
    }
}

impl RegisterInterface for I2cMmio {
    type Register = I2cRegister;

    fn read(&mut self, reg: I2cRegister) -> u32 {
        // SAFETY: base points at an I2C register block and every offset
        // lies inside it, word-aligned
        unsafe { ptr::read_volatile(self.reg(reg)) }
    }

    fn write(&mut self, reg: I2cRegister, value: u32) {
        // SAFETY: as for read
        unsafe { ptr::write_volatile(self.reg(reg), value) }
    }
}

/// SPI register block
pub struct SpiMmio {
    base: *mut u8,
}

impl SpiMmio {
    /// Bind an SPI instance, e.g. `SpiMmio::new(pac::SPI1)`
    ///
    /// The caller must hand each instance to exactly one engine.
    pub fn new(instance: pac::spi::Spi) -> Self {
        Self {
            base: instance.as_ptr() as *mut u8,
        }
    }
}

impl RegisterInterface for SpiMmio {
    type Register = SpiRegister;

    fn read(&mut self, reg: SpiRegister) -> u32 {
        let addr = self.base.wrapping_add(reg.offset());
        // SAFETY: base points at an SPI register block; DR supports byte
        // and half-word access, the other registers word access
        unsafe {
            match reg {
                SpiRegister::Dr8 => u32::from(ptr::read_volatile(addr)),
                SpiRegister::Dr => u32::from(ptr::read_volatile(addr as *mut u16)),
                _ => ptr::read_volatile(addr as *mut u32),
            }
        }
    }

    fn write(&mut self, reg: SpiRegister, value: u32) {
        let addr = self.base.wrapping_add(reg.offset());
        // SAFETY: as for read
        unsafe {
            match reg {
                SpiRegister::Dr8 => ptr::write_volatile(addr, value as u8),
                SpiRegister::Dr => ptr::write_volatile(addr as *mut u16, value as u16),
                _ => ptr::write_volatile(addr as *mut u32, value),
            }
        }
    }
}
