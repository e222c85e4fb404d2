//! GPIO adapters
//!
//! Board bring-up usually hands out chip-select lines as embassy-stm32
//! `Output` pins or other `embedded-hal` pins. [`EmbeddedHalPin`] lets
//! those drive the engines' [`OutputPin`] seam.

use barograph_hal::gpio::OutputPin;
use core::convert::Infallible;

/// [`OutputPin`] over an infallible `embedded-hal` output
///
/// The last commanded level is tracked locally, so the wrapped pin does
/// not need to support reading back its output state.
pub struct EmbeddedHalPin<P> {
    pin: P,
    high: bool,
}

impl<P> EmbeddedHalPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    /// Wrap a pin, driving it to `initial_high`
    pub fn new(mut pin: P, initial_high: bool) -> Self {
        let result = if initial_high { pin.set_high() } else { pin.set_low() };
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
        Self {
            pin,
            high: initial_high,
        }
    }

    /// Release the wrapped pin
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EmbeddedHalPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.high = true,
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.high = false,
            Err(never) => match never {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
