//! I2C master engine for STM32F3
//!
//! Polled register read/write transactions on the I2C v2 peripheral.
//! Every wait is bounded by its own poll budget and a failure reports the
//! phase it happened in.
//!
//! # Transactions
//!
//! Register read (repeated start, STOP issued by software):
//!
//! ```text
//! S | addr+W | reg | Sr | addr+R | data[0] .. data[n-1] | P
//! ```
//!
//! Register write (AUTOEND, STOP issued by hardware after NBYTES):
//!
//! ```text
//! S | addr+W | reg | data[0] .. data[n-1] | P
//! ```
//!
//! Neither path issues a STOP after a failure, so a timed-out
//! transaction can leave the bus held. Re-run [`I2cMaster::init`] before
//! retrying if that matters to the caller.

use barograph_hal::i2c::{
    AddressWait, I2cConfig, I2cError, I2cRegisterBus, MAX_ADDRESS, MAX_TRANSFER_LEN,
};
use barograph_hal::regs::{wait_for_flags, with_field, RegisterInterface};
use barograph_hal::timeout::{Timeout, TimeoutBudget};

use crate::registers::i2c::*;
use crate::registers::I2cRegister;

/// Prescaled timing clock the SCL counts are derived from
pub const TIMING_CLOCK_HZ: u32 = 12_000_000;

/// Values for the TIMINGR register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cTiming {
    /// Kernel clock prescaler (PRESC + 1 divides)
    pub presc: u8,
    /// SCL low period in prescaled ticks
    pub scll: u8,
    /// SCL high period in prescaled ticks
    pub sclh: u8,
    /// Data hold time
    pub sdadel: u8,
    /// Data setup time
    pub scldel: u8,
}

impl I2cTiming {
    /// Derive timing for `bus_hz` from the peripheral kernel clock
    ///
    /// The prescaler brings the kernel clock down to roughly
    /// [`TIMING_CLOCK_HZ`], then SCL low and high each take half a bus
    /// period. A 48 MHz kernel clock at 100 kHz gives PRESC = 3 and
    /// SCLL = SCLH = 0x3C.
    pub fn for_bus(kernel_clock_hz: u32, bus_hz: u32) -> Self {
        let presc = (kernel_clock_hz / TIMING_CLOCK_HZ).saturating_sub(1).min(15);
        let tick_hz = kernel_clock_hz / (presc + 1);
        let half_period = (tick_hz / bus_hz.max(1).saturating_mul(2)).clamp(1, 255);

        Self {
            presc: presc as u8,
            scll: half_period as u8,
            sclh: half_period as u8,
            sdadel: 0,
            scldel: 0,
        }
    }

    /// Timing for an [`I2cConfig`]
    pub fn from_config(config: &I2cConfig) -> Self {
        Self::for_bus(config.kernel_clock_hz, config.frequency)
    }

    /// Encode as a TIMINGR value
    pub const fn timingr(&self) -> u32 {
        ((self.presc as u32 & 0x0F) << TIMINGR_PRESC_POS)
            | ((self.scldel as u32 & 0x0F) << TIMINGR_SCLDEL_POS)
            | ((self.sdadel as u32 & 0x0F) << TIMINGR_SDADEL_POS)
            | ((self.sclh as u32) << TIMINGR_SCLH_POS)
            | ((self.scll as u32) << TIMINGR_SCLL_POS)
    }

    /// Resulting SCL frequency in Hz
    pub const fn bus_frequency(&self, kernel_clock_hz: u32) -> u32 {
        let tick_hz = kernel_clock_hz / (self.presc as u32 + 1);
        tick_hz / (self.scll as u32 + self.sclh as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Write,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndMode {
    /// Hardware sends STOP once NBYTES have moved
    Auto,
    /// Software sends STOP (or a repeated START)
    Software,
}

/// Validate a byte count against the 8-bit NBYTES field
fn check_address(address: u8) -> Result<(), I2cError> {
    if address > MAX_ADDRESS {
        return Err(I2cError::InvalidAddress);
    }
    Ok(())
}

fn transfer_len(len: usize) -> Result<u8, I2cError> {
    if len == 0 || len > MAX_TRANSFER_LEN {
        return Err(I2cError::InvalidLength);
    }
    Ok(len as u8)
}

/// I2C master engine
///
/// Owns one I2C peripheral instance. Not `Clone`: two owners issuing
/// interleaved register writes would corrupt both transactions, so
/// callers in a preemptive environment must serialize access (one owning
/// task, or a mutex around the engine).
pub struct I2cMaster<R> {
    regs: R,
    config: I2cConfig,
    timing: I2cTiming,
}

impl<R> I2cMaster<R>
where
    R: RegisterInterface<Register = I2cRegister>,
{
    /// Create an engine around a register block
    ///
    /// Board bring-up must already have enabled the peripheral clock,
    /// selected its kernel clock, and routed SCL/SDA as open-drain
    /// alternate-function pins. Call [`init`](Self::init) before use.
    pub fn new(regs: R, config: I2cConfig) -> Self {
        Self {
            regs,
            timing: I2cTiming::from_config(&config),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Get the derived bus timing
    pub fn timing(&self) -> I2cTiming {
        self.timing
    }

    /// Release the register block
    pub fn free(self) -> R {
        self.regs
    }

    /// Configure and enable the peripheral
    ///
    /// Disables the peripheral, clears CR1/CR2/TIMINGR, programs the bus
    /// timing and re-enables it. Safe to call again at any time.
    pub fn init(&mut self) {
        self.regs.clear_bits(I2cRegister::Cr1, CR1_PE);

        self.regs.write(I2cRegister::Cr1, 0);
        self.regs.write(I2cRegister::Cr2, 0);
        self.regs.write(I2cRegister::Timingr, 0);

        self.regs.write(I2cRegister::Timingr, self.timing.timingr());

        self.regs.set_bits(I2cRegister::Cr1, CR1_PE);

        debug!(
            "I2C init: {} Hz (PRESC={}, SCLL={}, SCLH={})",
            self.config.frequency,
            self.timing.presc,
            self.timing.scll,
            self.timing.sclh
        );
    }

    /// Read `buf.len()` bytes starting at `register` of device `address`
    ///
    /// Writes the register address, then restarts in read mode for
    /// `buf.len()` bytes and finally sends STOP. On error the contents
    /// of `buf` must not be used.
    pub fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), I2cError> {
        check_address(address)?;
        let nbytes = transfer_len(buf.len())?;
        let timeouts = self.config.timeouts;

        // Address phase: one byte, no AUTOEND so the restart can follow
        self.configure_transfer(address, 1, Direction::Write, EndMode::Software);
        self.regs.write(I2cRegister::Icr, ICR_STOPCF);
        self.regs.set_bits(I2cRegister::Cr2, CR2_START);

        self.wait(ISR_TXIS, timeouts.address)
            .map_err(|_| timed_out(address, I2cError::AddressPhaseTimeout(AddressWait::TransmitReady)))?;

        self.regs.write(I2cRegister::Txdr, u32::from(register));

        self.wait(ISR_TC, timeouts.address).map_err(|_| {
            timed_out(address, I2cError::AddressPhaseTimeout(AddressWait::TransferComplete))
        })?;

        // Data phase
        self.configure_transfer(address, nbytes, Direction::Read, EndMode::Software);
        self.regs.set_bits(I2cRegister::Cr2, CR2_START);

        let len = buf.len();
        for (i, byte) in buf.iter_mut().enumerate() {
            let budget = if i == 0 { timeouts.first_byte } else { timeouts.data };
            self.wait(ISR_RXNE, budget)
                .map_err(|_| timed_out(address, I2cError::DataPhaseTimeout { remaining: len - i }))?;

            // Reading RXDR clears RXNE
            *byte = self.regs.read(I2cRegister::Rxdr) as u8;
        }

        // Stop phase
        self.regs.set_bits(I2cRegister::Cr2, CR2_STOP);
        self.wait(ISR_STOPF, timeouts.stop)
            .map_err(|_| timed_out(address, I2cError::StopPhaseTimeout))?;

        trace!("I2C read {} bytes from {=u8:#x} reg {=u8:#x}", len, address, register);
        Ok(())
    }

    /// Write `data` starting at `register` of device `address`
    ///
    /// NBYTES covers the register byte plus the payload and AUTOEND is
    /// set, so the peripheral sends STOP on its own after the last byte.
    pub fn write_register(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), I2cError> {
        check_address(address)?;
        if data.is_empty() {
            return Err(I2cError::InvalidLength);
        }
        let nbytes = transfer_len(data.len() + 1)?;
        let timeouts = self.config.timeouts;

        self.configure_transfer(address, nbytes, Direction::Write, EndMode::Auto);
        self.regs.write(I2cRegister::Icr, ICR_STOPCF);
        self.regs.set_bits(I2cRegister::Cr2, CR2_START);

        // Address phase
        self.wait(ISR_TXIS, timeouts.address)
            .map_err(|_| timed_out(address, I2cError::AddressPhaseTimeout(AddressWait::TransmitReady)))?;

        self.regs.write(I2cRegister::Txdr, u32::from(register));

        // Data phase
        for (i, &byte) in data.iter().enumerate() {
            self.wait(ISR_TXIS, timeouts.data).map_err(|_| {
                timed_out(address, I2cError::DataPhaseTimeout { remaining: data.len() - i })
            })?;

            self.regs.write(I2cRegister::Txdr, u32::from(byte));
        }

        // Stop phase (AUTOEND)
        self.wait(ISR_STOPF, timeouts.stop)
            .map_err(|_| timed_out(address, I2cError::StopPhaseTimeout))?;

        trace!("I2C wrote {} bytes to {=u8:#x} reg {=u8:#x}", data.len(), address, register);
        Ok(())
    }

    /// Program target address, direction, byte count and end mode
    ///
    /// The 7-bit address is left-aligned into SADD[7:1].
    fn configure_transfer(&mut self, address: u8, nbytes: u8, direction: Direction, end: EndMode) {
        self.regs.modify(I2cRegister::Cr2, |cr2| {
            let cr2 = with_field(cr2, CR2_SADD_POS, CR2_SADD_WIDTH, u32::from(address) << 1);
            let cr2 = with_field(cr2, CR2_NBYTES_POS, CR2_NBYTES_WIDTH, u32::from(nbytes));
            let cr2 = match direction {
                Direction::Read => cr2 | CR2_RD_WRN,
                Direction::Write => cr2 & !CR2_RD_WRN,
            };
            match end {
                EndMode::Auto => cr2 | CR2_AUTOEND,
                EndMode::Software => cr2 & !CR2_AUTOEND,
            }
        });
    }

    fn wait(&mut self, flag: u32, budget: TimeoutBudget) -> Result<(), Timeout> {
        wait_for_flags(&mut self.regs, I2cRegister::Isr, flag, budget)
    }
}

fn timed_out(address: u8, error: I2cError) -> I2cError {
    warn!("I2C transaction with {=u8:#x} failed in {} phase: {}", address, error.phase(), error);
    error
}

impl<R> I2cRegisterBus for I2cMaster<R>
where
    R: RegisterInterface<Register = I2cRegister>,
{
    fn init(&mut self) {
        I2cMaster::init(self)
    }

    fn read_register(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), I2cError> {
        I2cMaster::read_register(self, address, register, buf)
    }

    fn write_register(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), I2cError> {
        I2cMaster::write_register(self, address, register, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{I2cFault, SimI2c};
    use proptest::prelude::*;

    const BMP390_ADDR: u8 = 0x76;

    // Short budgets keep the failure paths fast
    fn test_config() -> I2cConfig {
        let mut config = I2cConfig::default();
        config.timeouts.first_byte = TimeoutBudget::new(1_000);
        config.timeouts.data = TimeoutBudget::new(1_000);
        config.timeouts.stop = TimeoutBudget::new(1_000);
        config.timeouts.address = TimeoutBudget::new(1_000);
        config
    }

    fn engine(sim: SimI2c) -> I2cMaster<SimI2c> {
        let mut i2c = I2cMaster::new(sim, test_config());
        i2c.init();
        i2c
    }

    #[test]
    fn test_timing_for_48mhz_standard_mode() {
        let timing = I2cTiming::for_bus(48_000_000, 100_000);
        assert_eq!(timing.presc, 3);
        assert_eq!(timing.scll, 0x3C);
        assert_eq!(timing.sclh, 0x3C);
        assert_eq!(timing.timingr(), 0x3000_3C3C);
        assert_eq!(timing.bus_frequency(48_000_000), 100_000);
    }

    #[test]
    fn test_timing_for_hsi() {
        let timing = I2cTiming::for_bus(8_000_000, 100_000);
        assert_eq!(timing.presc, 0);
        assert_eq!(timing.scll, 40);
        assert_eq!(timing.bus_frequency(8_000_000), 100_000);
    }

    #[test]
    fn test_timing_clamps() {
        // Very slow bus on a fast clock saturates the counters
        let timing = I2cTiming::for_bus(72_000_000, 1_000);
        assert_eq!(timing.scll, 255);

        // Prescaler never exceeds its 4-bit field
        let timing = I2cTiming::for_bus(400_000_000, 100_000);
        assert_eq!(timing.presc, 15);
    }

    #[test]
    fn test_init_programs_timing_and_enables() {
        let i2c = engine(SimI2c::new(BMP390_ADDR));
        let sim = i2c.free();
        assert_eq!(sim.timingr, 0x3000_3C3C);
        assert_eq!(sim.cr1 & CR1_PE, CR1_PE);
        assert_eq!(sim.cr2, 0);
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        i2c.init();
        let sim = i2c.free();
        assert_eq!(sim.timingr, 0x3000_3C3C);
        assert_eq!(sim.cr1, CR1_PE);
    }

    #[test]
    fn test_read_two_bytes() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.device.registers[0x00] = 0x3C;
        sim.device.registers[0x01] = 0x00;
        let mut i2c = engine(sim);

        let mut buf = [0xAA; 2];
        assert_eq!(i2c.read_register(BMP390_ADDR, 0x00, &mut buf), Ok(()));
        assert_eq!(buf, [0x3C, 0x00]);

        let sim = i2c.free();
        // Register byte is the only thing written
        assert_eq!(sim.tx_log.as_slice(), &[0x00]);
        assert_eq!(sim.stop_requests, 1);
    }

    #[test]
    fn test_read_programs_address_and_restart() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        let mut buf = [0u8; 3];
        i2c.read_register(BMP390_ADDR, 0x10, &mut buf).unwrap();

        let sim = i2c.free();
        assert_eq!(sim.starts.len(), 2);

        let first = sim.starts[0];
        assert_eq!(first & 0x3FF, u32::from(BMP390_ADDR) << 1);
        assert_eq!(first & CR2_RD_WRN, 0);
        assert_eq!((first >> CR2_NBYTES_POS) & 0xFF, 1);
        assert_eq!(first & CR2_AUTOEND, 0);

        let second = sim.starts[1];
        assert_eq!(second & CR2_RD_WRN, CR2_RD_WRN);
        assert_eq!((second >> CR2_NBYTES_POS) & 0xFF, 3);
        assert_eq!(second & CR2_AUTOEND, 0);
    }

    #[test]
    fn test_read_without_address_ack_leaves_buffer() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::NoAddressAck;
        let mut i2c = engine(sim);

        let mut buf = [0xAA; 2];
        assert_eq!(
            i2c.read_register(BMP390_ADDR, 0x00, &mut buf),
            Err(I2cError::AddressPhaseTimeout(AddressWait::TransmitReady))
        );
        assert_eq!(buf, [0xAA, 0xAA]);
    }

    #[test]
    fn test_read_wrong_device_address() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        let mut buf = [0u8; 1];
        assert_eq!(
            i2c.read_register(0x77, 0x00, &mut buf),
            Err(I2cError::AddressPhaseTimeout(AddressWait::TransmitReady))
        );
    }

    #[test]
    fn test_read_register_byte_not_completed() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::NoRegisterAck;
        let mut i2c = engine(sim);

        let mut buf = [0u8; 1];
        assert_eq!(
            i2c.read_register(BMP390_ADDR, 0x00, &mut buf),
            Err(I2cError::AddressPhaseTimeout(AddressWait::TransferComplete))
        );
    }

    #[test]
    fn test_read_data_stall_reports_remaining() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::StallAfter(2);
        let mut i2c = engine(sim);

        let mut buf = [0u8; 5];
        assert_eq!(
            i2c.read_register(BMP390_ADDR, 0x00, &mut buf),
            Err(I2cError::DataPhaseTimeout { remaining: 3 })
        );

        // No STOP after a failure
        assert_eq!(i2c.free().stop_requests, 0);
    }

    #[test]
    fn test_read_stop_not_detected() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.device.registers[0x04] = 0x5A;
        sim.fault = I2cFault::NoStop;
        let mut i2c = engine(sim);

        let mut buf = [0u8; 1];
        assert_eq!(
            i2c.read_register(BMP390_ADDR, 0x04, &mut buf),
            Err(I2cError::StopPhaseTimeout)
        );
    }

    #[test]
    fn test_read_rejects_bad_lengths() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        assert_eq!(i2c.read_register(BMP390_ADDR, 0, &mut []), Err(I2cError::InvalidLength));

        let mut big = [0u8; 256];
        assert_eq!(
            i2c.read_register(BMP390_ADDR, 0, &mut big),
            Err(I2cError::InvalidLength)
        );

        // Nothing went on the bus
        assert!(i2c.free().starts.is_empty());
    }

    #[test]
    fn test_write_register_then_payload() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        assert_eq!(i2c.write_register(BMP390_ADDR, 0x1B, &[0x33, 0x01]), Ok(()));

        let sim = i2c.free();
        assert_eq!(sim.tx_log.as_slice(), &[0x1B, 0x33, 0x01]);
        assert_eq!(sim.device.registers[0x1B], 0x33);
        assert_eq!(sim.device.registers[0x1C], 0x01);

        let start = sim.starts[0];
        assert_eq!((start >> CR2_NBYTES_POS) & 0xFF, 3);
        assert_eq!(start & CR2_AUTOEND, CR2_AUTOEND);
        assert_eq!(start & CR2_RD_WRN, 0);
        // STOP comes from AUTOEND, not software
        assert_eq!(sim.stop_requests, 0);
    }

    #[test]
    fn test_write_then_read_back() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        i2c.write_register(BMP390_ADDR, 0x7E, &[0xB6]).unwrap();

        let mut buf = [0u8; 1];
        i2c.read_register(BMP390_ADDR, 0x7E, &mut buf).unwrap();
        assert_eq!(buf, [0xB6]);
    }

    #[test]
    fn test_write_failures() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::NoAddressAck;
        let mut i2c = engine(sim);
        assert_eq!(
            i2c.write_register(BMP390_ADDR, 0x00, &[1]),
            Err(I2cError::AddressPhaseTimeout(AddressWait::TransmitReady))
        );

        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::StallAfter(1);
        let mut i2c = engine(sim);
        assert_eq!(
            i2c.write_register(BMP390_ADDR, 0x00, &[1, 2, 3]),
            Err(I2cError::DataPhaseTimeout { remaining: 2 })
        );

        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::NoStop;
        let mut i2c = engine(sim);
        assert_eq!(
            i2c.write_register(BMP390_ADDR, 0x00, &[1]),
            Err(I2cError::StopPhaseTimeout)
        );
    }

    #[test]
    fn test_stale_stop_flag_does_not_complete_write() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        let mut buf = [0u8; 1];
        let mut i2c = I2cMaster::new(&mut sim, test_config());
        i2c.init();
        i2c.read_register(BMP390_ADDR, 0x00, &mut buf).unwrap();
        drop(i2c);

        // STOPF from the read is still set; the write must clear it first
        sim.fault = I2cFault::NoStop;
        let mut i2c = I2cMaster::new(&mut sim, test_config());
        assert_eq!(
            i2c.write_register(BMP390_ADDR, 0x00, &[1]),
            Err(I2cError::StopPhaseTimeout)
        );
    }

    #[test]
    fn test_write_rejects_bad_lengths() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));
        assert_eq!(i2c.write_register(BMP390_ADDR, 0, &[]), Err(I2cError::InvalidLength));
        assert_eq!(
            i2c.write_register(BMP390_ADDR, 0, &[0u8; 255]),
            Err(I2cError::InvalidLength)
        );
        assert!(i2c.write_register(BMP390_ADDR, 0, &[0u8; 254]).is_ok());
    }

    #[test]
    fn test_rejects_addresses_above_7_bits() {
        let mut i2c = engine(SimI2c::new(BMP390_ADDR));

        // 0xF6 would alias 0x76 once shifted into SADD[7:1]
        let mut buf = [0u8; 1];
        assert_eq!(
            i2c.read_register(BMP390_ADDR | 0x80, 0x00, &mut buf),
            Err(I2cError::InvalidAddress)
        );
        assert_eq!(
            i2c.write_register(BMP390_ADDR | 0x80, 0x1B, &[0x33]),
            Err(I2cError::InvalidAddress)
        );

        let sim = i2c.free();
        assert!(sim.starts.is_empty());
        assert!(sim.tx_log.is_empty());
        assert_eq!(sim.device.registers[0x1B], 0);
    }

    #[test]
    fn test_timeouts_are_bounded_by_config() {
        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.fault = I2cFault::NoAddressAck;

        let mut config = I2cConfig::default();
        config.timeouts.address = TimeoutBudget::new(25);
        let mut i2c = I2cMaster::new(sim, config);
        i2c.init();

        let mut buf = [0u8; 1];
        assert!(i2c.read_register(BMP390_ADDR, 0, &mut buf).is_err());
        assert_eq!(i2c.free().isr_polls, 26);
    }

    #[test]
    fn test_trait_object_usage() {
        fn chip_id(bus: &mut dyn I2cRegisterBus) -> Result<u8, I2cError> {
            let mut id = [0u8; 1];
            bus.read_register(BMP390_ADDR, 0x00, &mut id)?;
            Ok(id[0])
        }

        let mut sim = SimI2c::new(BMP390_ADDR);
        sim.device.registers[0] = 0x60;
        let mut i2c = engine(sim);
        assert_eq!(chip_id(&mut i2c), Ok(0x60));
    }

    proptest! {
        #[test]
        fn prop_read_fills_buffer_in_order(
            start in 0u8..=255,
            len in 1usize..=64,
            seed in any::<u8>(),
        ) {
            let mut sim = SimI2c::new(BMP390_ADDR);
            for (i, reg) in sim.device.registers.iter_mut().enumerate() {
                *reg = (i as u8).wrapping_mul(7).wrapping_add(seed);
            }
            let expected: Vec<u8> = (0..len)
                .map(|i| sim.device.registers[start.wrapping_add(i as u8) as usize])
                .collect();

            let mut i2c = engine(sim);
            let mut buf = vec![0u8; len];
            prop_assert_eq!(i2c.read_register(BMP390_ADDR, start, &mut buf), Ok(()));
            prop_assert_eq!(buf, expected);
        }

        #[test]
        fn prop_write_sends_register_then_payload(
            register in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 1..=64),
        ) {
            let mut i2c = engine(SimI2c::new(BMP390_ADDR));
            prop_assert_eq!(i2c.write_register(BMP390_ADDR, register, &payload), Ok(()));

            let sim = i2c.free();
            prop_assert_eq!(sim.tx_log[0], register);
            prop_assert_eq!(&sim.tx_log[1..], payload.as_slice());
        }

        #[test]
        fn prop_stalled_read_never_succeeds(len in 1usize..=32, stall in 0usize..32) {
            prop_assume!(stall < len);
            let mut sim = SimI2c::new(BMP390_ADDR);
            sim.fault = I2cFault::StallAfter(stall);

            let mut i2c = engine(sim);
            let mut buf = vec![0u8; len];
            prop_assert_eq!(
                i2c.read_register(BMP390_ADDR, 0, &mut buf),
                Err(I2cError::DataPhaseTimeout { remaining: len - stall })
            );
        }
    }
}
