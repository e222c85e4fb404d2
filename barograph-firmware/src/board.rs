//! Nucleo-F303RE board bring-up
//!
//! Enables the bus peripheral clocks and routes the bus pins to their
//! alternate functions. The engines take over from there.
//!
//! | Signal   | Pin  | AF  |
//! |----------|------|-----|
//! | I2C1 SCL | PB8  | AF4 |
//! | I2C1 SDA | PB9  | AF4 |
//! | SPI1 SCK | PA5  | AF5 |
//! | SPI1 MISO| PA6  | AF5 |
//! | SPI1 MOSI| PA7  | AF5 |
//! | BMP390 CS| PB6  | GPIO|

use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals;
use embassy_stm32::pac::rcc::vals::Icsw;
use embassy_stm32::peripherals::{I2C1, PA5, PA6, PA7, PB6, PB8, PB9, SPI1};
use embassy_stm32::Peri;

use barograph_hal_stm32f3::{EmbeddedHalPin, I2cMmio, SpiMmio};

/// Chip-select line of the SPI sensor
pub type ChipSelect = EmbeddedHalPin<Output<'static>>;

/// Peripherals claimed for the I2C bus
#[allow(dead_code)]
pub struct I2cPins {
    pub i2c: Peri<'static, I2C1>,
    pub scl: Peri<'static, PB8>,
    pub sda: Peri<'static, PB9>,
}

/// Peripherals claimed for the SPI bus
#[allow(dead_code)]
pub struct SpiPins {
    pub spi: Peri<'static, SPI1>,
    pub sck: Peri<'static, PA5>,
    pub miso: Peri<'static, PA6>,
    pub mosi: Peri<'static, PA7>,
    pub cs: Peri<'static, PB6>,
}

/// Kernel clock feeding the I2C1 timing generator
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum I2cKernelClock {
    /// 8 MHz internal oscillator (reset value)
    Hsi,
    /// System clock
    Sysclk,
}

#[derive(Clone, Copy)]
enum Drive {
    PushPull,
    OpenDrain,
}

/// Switch a pin to alternate function `af`
fn alternate(port: pac::gpio::Gpio, pin: usize, af: u8, drive: Drive) {
    port.afr(pin / 8).modify(|w| w.set_afr(pin % 8, af));
    match drive {
        Drive::PushPull => {
            port.otyper().modify(|w| w.set_ot(pin, vals::Ot::PUSHPULL));
            port.pupdr().modify(|w| w.set_pupdr(pin, vals::Pupdr::FLOATING));
        }
        Drive::OpenDrain => {
            // Nucleo has no bus pull-ups fitted
            port.otyper().modify(|w| w.set_ot(pin, vals::Ot::OPENDRAIN));
            port.pupdr().modify(|w| w.set_pupdr(pin, vals::Pupdr::PULLUP));
        }
    }
    port.moder().modify(|w| w.set_moder(pin, vals::Moder::ALTERNATE));
}

/// Bring up I2C1 and return its register block
///
/// `clock` must match the `kernel_clock_hz` the engine's timing is
/// derived from. build.rs generates both from the same board.toml entry.
pub fn i2c1(_pins: I2cPins, clock: I2cKernelClock) -> I2cMmio {
    let source = match clock {
        I2cKernelClock::Hsi => Icsw::HSI,
        I2cKernelClock::Sysclk => Icsw::SYSCLK,
    };
    // Select the kernel clock while the peripheral clock is still gated
    pac::RCC.cfgr3().modify(|w| w.set_i2c1sw(source));
    pac::RCC.apb1enr().modify(|w| w.set_i2c1en(true));
    alternate(pac::GPIOB, 8, 4, Drive::OpenDrain);
    alternate(pac::GPIOB, 9, 4, Drive::OpenDrain);

    I2cMmio::new(pac::I2C1)
}

/// Bring up SPI1 and return its register block with the sensor chip-select
///
/// Chip-select starts high so the sensor is deselected before SCK is
/// routed.
pub fn spi1(pins: SpiPins) -> (SpiMmio, ChipSelect) {
    let cs = EmbeddedHalPin::new(Output::new(pins.cs, Level::High, Speed::VeryHigh), true);

    pac::RCC.apb2enr().modify(|w| w.set_spi1en(true));
    alternate(pac::GPIOA, 5, 5, Drive::PushPull);
    alternate(pac::GPIOA, 6, 5, Drive::PushPull);
    alternate(pac::GPIOA, 7, 5, Drive::PushPull);

    (SpiMmio::new(pac::SPI1), cs)
}
