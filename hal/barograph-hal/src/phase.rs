//! Transaction phases
//!
//! Both engines run the same state machine:
//!
//! ```text
//! Idle → AddressOrCommand → Data → Completion → { Ok | Err(phase) }
//! ```
//!
//! Each arrow is one or more bounded waits with a fresh budget. There is
//! no retry inside an engine; recovery belongs to the caller.

/// Phase of a bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Device address, register address or command byte(s)
    AddressOrCommand,
    /// Payload transfer
    Data,
    /// Stop condition or chip-select release
    Completion,
}

impl Phase {
    /// Short lowercase name, used in log output
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::AddressOrCommand => "address",
            Phase::Data => "data",
            Phase::Completion => "completion",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
