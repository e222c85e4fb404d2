//! Raw peripheral register access
//!
//! A [`RegisterInterface`] is the leaf of the bus stack: read and write
//! access to the fixed set of control, status and data registers of one
//! peripheral instance. It carries no protocol logic. Chip HALs bind it
//! to memory-mapped registers; tests bind it to a simulated peripheral.

use crate::timeout::{wait_until, Timeout, TimeoutBudget};

/// Register-level access to one peripheral instance
pub trait RegisterInterface {
    /// Identifier for a register of this peripheral
    type Register: Copy;

    /// Read the current value of a register
    ///
    /// Takes `&mut self` because reads of data registers have side
    /// effects (popping a receive FIFO, clearing a status flag).
    fn read(&mut self, reg: Self::Register) -> u32;

    /// Write a full value to a register
    fn write(&mut self, reg: Self::Register, value: u32);

    /// Read-modify-write a register
    fn modify<F>(&mut self, reg: Self::Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set the bits of `mask`, leaving the others untouched
    fn set_bits(&mut self, reg: Self::Register, mask: u32) {
        self.modify(reg, |v| v | mask);
    }

    /// Clear the bits of `mask`, leaving the others untouched
    fn clear_bits(&mut self, reg: Self::Register, mask: u32) {
        self.modify(reg, |v| v & !mask);
    }

    /// Check whether every bit of `mask` is set
    fn flags_set(&mut self, reg: Self::Register, mask: u32) -> bool {
        self.read(reg) & mask == mask
    }
}

impl<R: RegisterInterface + ?Sized> RegisterInterface for &mut R {
    type Register = R::Register;

    fn read(&mut self, reg: Self::Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Self::Register, value: u32) {
        (**self).write(reg, value)
    }
}

/// Poll a status register until every bit of `mask` is set
///
/// Returns [`Timeout`] when the budget runs out first.
pub fn wait_for_flags<R>(
    regs: &mut R,
    reg: R::Register,
    mask: u32,
    budget: TimeoutBudget,
) -> Result<(), Timeout>
where
    R: RegisterInterface + ?Sized,
{
    wait_until(budget, || regs.flags_set(reg, mask))
}

/// Read a field of `width` bits starting at bit `pos`
pub const fn field(value: u32, pos: u32, width: u32) -> u32 {
    (value >> pos) & ((1 << width) - 1)
}

/// Replace a field of `width` bits starting at bit `pos`
pub const fn with_field(value: u32, pos: u32, width: u32, field: u32) -> u32 {
    let mask = ((1 << width) - 1) << pos;
    (value & !mask) | ((field << pos) & mask)
}
