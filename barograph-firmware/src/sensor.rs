//! BMP390 access over either bus
//!
//! Only the pieces the demo needs: chip id check, power mode and the raw
//! pressure/temperature block. Compensation is left to the host.

use barograph_hal::{I2cError, I2cRegisterBus, SpiError, SpiTransfer};

pub const REG_CHIP_ID: u8 = 0x00;
pub const REG_DATA: u8 = 0x04;
pub const REG_PWR_CTRL: u8 = 0x1B;

/// PWR_CTRL: pressure and temperature enabled, normal mode
pub const PWR_NORMAL_ALL: u8 = 0x33;

/// Raw 24-bit pressure and temperature counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct RawSample {
    pub pressure: u32,
    pub temperature: u32,
}

impl RawSample {
    /// Decode the DATA_0..DATA_5 block (little-endian 24-bit values)
    pub fn from_bytes(data: &[u8; 6]) -> Self {
        Self {
            pressure: u32::from_le_bytes([data[0], data[1], data[2], 0]),
            temperature: u32::from_le_bytes([data[3], data[4], data[5], 0]),
        }
    }
}

/// BMP390 on I2C
pub struct I2cSensor {
    address: u8,
}

impl I2cSensor {
    pub const fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn chip_id<B: I2cRegisterBus>(&self, bus: &mut B) -> Result<u8, I2cError> {
        let mut id = [0u8; 1];
        bus.read_register(self.address, REG_CHIP_ID, &mut id)?;
        Ok(id[0])
    }

    /// Start continuous measurements
    pub fn start<B: I2cRegisterBus>(&self, bus: &mut B) -> Result<(), I2cError> {
        bus.write_register(self.address, REG_PWR_CTRL, &[PWR_NORMAL_ALL])
    }

    pub fn sample<B: I2cRegisterBus>(&self, bus: &mut B) -> Result<RawSample, I2cError> {
        let mut data = [0u8; 6];
        bus.read_register(self.address, REG_DATA, &mut data)?;
        Ok(RawSample::from_bytes(&data))
    }
}

/// BMP390 on SPI (chip-select owned by the bus engine)
pub struct SpiSensor;

impl SpiSensor {
    pub fn chip_id<B: SpiTransfer>(&self, bus: &mut B) -> Result<u8, SpiError> {
        let mut id = [0u8; 1];
        bus.burst_read(REG_CHIP_ID, &mut id)?;
        Ok(id[0])
    }

    pub fn sample<B: SpiTransfer>(&self, bus: &mut B) -> Result<RawSample, SpiError> {
        let mut data = [0u8; 6];
        bus.burst_read(REG_DATA, &mut data)?;
        Ok(RawSample::from_bytes(&data))
    }
}
