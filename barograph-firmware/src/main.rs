//! Barograph - Nucleo-F303RE demo firmware
//!
//! Brings up I2C1 and SPI1, builds one engine for each and polls a
//! BMP390 on both buses from a single task. That task is the only owner
//! of the engines, so no locking is needed.

#![no_std]
#![no_main]

mod board;
mod sensor;

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use barograph_hal_stm32f3::{I2cMaster, I2cMmio, SpiMaster, SpiMmio};

use crate::board::{ChipSelect, I2cPins, SpiPins};
use crate::sensor::{I2cSensor, SpiSensor};

/// Bus settings from board.toml
mod board_config {
    use crate::board::I2cKernelClock;
    use barograph_hal::i2c::I2cTimeouts;
    use barograph_hal::spi::{BaudDivider, Mode, SpiTimeouts};
    use barograph_hal::{I2cConfig, SpiConfig, TimeoutBudget};

    include!(concat!(env!("OUT_DIR"), "/board_config.rs"));
}

type BoardI2c = I2cMaster<I2cMmio>;
type BoardSpi = SpiMaster<SpiMmio, ChipSelect>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Barograph starting...");

    let p = embassy_stm32::init(Default::default());

    let i2c_regs = board::i2c1(
        I2cPins {
            i2c: p.I2C1,
            scl: p.PB8,
            sda: p.PB9,
        },
        board_config::I2C_KERNEL_CLOCK,
    );
    let (spi_regs, cs) = board::spi1(SpiPins {
        spi: p.SPI1,
        sck: p.PA5,
        miso: p.PA6,
        mosi: p.PA7,
        cs: p.PB6,
    });

    let mut i2c = I2cMaster::new(i2c_regs, board_config::I2C_CONFIG);
    i2c.init();

    let mut spi = SpiMaster::new(spi_regs, cs, board_config::SPI_CONFIG);
    spi.init();

    info!(
        "Buses up: I2C {} Hz, SPI {} Hz",
        board_config::I2C_CONFIG.frequency,
        board_config::SPI_PCLK_HZ / board_config::SPI_CONFIG.divider.ratio()
    );

    spawner.spawn(sensor_task(i2c, spi)).unwrap();
}

#[embassy_executor::task]
async fn sensor_task(mut i2c: BoardI2c, mut spi: BoardSpi) {
    let i2c_sensor = I2cSensor::new(board_config::SENSOR_I2C_ADDRESS);
    let spi_sensor = SpiSensor;

    let mut i2c_ready = false;
    let mut ticker = Ticker::every(Duration::from_millis(board_config::POLL_INTERVAL_MS));

    loop {
        if !i2c_ready {
            i2c_ready = detect_i2c_sensor(&mut i2c, &i2c_sensor);
        }
        if i2c_ready {
            match i2c_sensor.sample(&mut i2c) {
                Ok(sample) => info!("I2C sample: {}", sample),
                Err(e) => {
                    warn!("I2C sample failed in {} phase: {}", e.phase(), e);
                    // The bus may still be held after a failure
                    i2c.init();
                    i2c_ready = false;
                }
            }
        }

        match spi_sensor.chip_id(&mut spi) {
            Ok(id) if id == board_config::SENSOR_CHIP_ID => match spi_sensor.sample(&mut spi) {
                Ok(sample) => info!("SPI sample: {}", sample),
                Err(e) => warn!("SPI sample failed: {}", e),
            },
            Ok(id) => warn!("SPI chip id {=u8:#x}, expected {=u8:#x}", id, board_config::SENSOR_CHIP_ID),
            Err(e) => error!("SPI sensor not responding: {}", e),
        }

        ticker.next().await;
    }
}

/// Check the I2C chip id and start measurements
fn detect_i2c_sensor(i2c: &mut BoardI2c, sensor: &I2cSensor) -> bool {
    match sensor.chip_id(i2c) {
        Ok(id) if id == board_config::SENSOR_CHIP_ID => {}
        Ok(id) => {
            warn!("I2C chip id {=u8:#x}, expected {=u8:#x}", id, board_config::SENSOR_CHIP_ID);
            return false;
        }
        Err(e) => {
            error!("I2C sensor not responding: {}", e);
            i2c.init();
            return false;
        }
    }

    match sensor.start(i2c) {
        Ok(()) => {
            info!("I2C sensor at {=u8:#x} running", board_config::SENSOR_I2C_ADDRESS);
            true
        }
        Err(e) => {
            error!("I2C sensor start failed: {}", e);
            i2c.init();
            false
        }
    }
}
