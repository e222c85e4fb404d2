//! GPIO pin abstractions
//!
//! The bus engines only need one GPIO capability from board bring-up: a
//! push-pull output they can drive as an SPI chip-select line.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip. The pin is expected to already be configured as
/// an output.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Toggle the pin state
    fn toggle(&mut self) {
        if self.is_set_high() {
            self.set_low();
        } else {
            self.set_high();
        }
    }

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

impl<P: OutputPin + ?Sized> OutputPin for &mut P {
    fn set_high(&mut self) {
        (**self).set_high();
    }

    fn set_low(&mut self) {
        (**self).set_low();
    }

    fn is_set_high(&self) -> bool {
        (**self).is_set_high()
    }
}

/// Active-low chip-select held for the lifetime of the guard
///
/// Creating the guard drives the line low (selected). Dropping it drives
/// the line high again, so every exit path of a transaction, including
/// early returns through `?`, deselects the device exactly once.
pub struct ChipSelectGuard<'a, P: OutputPin> {
    pin: &'a mut P,
}

impl<'a, P: OutputPin> ChipSelectGuard<'a, P> {
    /// Assert the chip-select line
    pub fn select(pin: &'a mut P) -> Self {
        pin.set_low();
        Self { pin }
    }
}

impl<P: OutputPin> Drop for ChipSelectGuard<'_, P> {
    fn drop(&mut self) {
        self.pin.set_high();
    }
}
