//! Poll-count timeouts
//!
//! Every wait in the bus engines is a busy poll of a status flag bounded
//! by a [`TimeoutBudget`]. The budget counts poll iterations, not wall
//! clock time, so its real duration scales with core clock and bus
//! latency.

/// Remaining poll iterations for one wait phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeoutBudget(u32);

impl TimeoutBudget {
    /// Create a budget of `polls` iterations
    pub const fn new(polls: u32) -> Self {
        Self(polls)
    }

    /// Iterations left
    pub const fn remaining(&self) -> u32 {
        self.0
    }

    /// Check if the budget is used up
    pub const fn is_exhausted(&self) -> bool {
        self.0 == 0
    }

    /// Consume one iteration
    ///
    /// Returns `false` if the budget was already exhausted.
    pub fn tick(&mut self) -> bool {
        match self.0.checked_sub(1) {
            Some(left) => {
                self.0 = left;
                true
            }
            None => false,
        }
    }
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self(100_000)
    }
}

impl From<u32> for TimeoutBudget {
    fn from(polls: u32) -> Self {
        Self::new(polls)
    }
}

/// A wait ran out of budget before its condition became true
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout;

impl core::fmt::Display for Timeout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "poll budget exhausted")
    }
}

/// Busy-wait until `ready` returns true or the budget runs out
///
/// The condition is checked before the budget, so a condition that holds
/// on the last permitted poll still succeeds. A budget of `n` allows
/// `n + 1` polls. Once the budget is zero and the condition is false,
/// the wait fails.
pub fn wait_until<F>(mut budget: TimeoutBudget, mut ready: F) -> Result<(), Timeout>
where
    F: FnMut() -> bool,
{
    loop {
        if ready() {
            return Ok(());
        }
        if !budget.tick() {
            return Err(Timeout);
        }
    }
}
