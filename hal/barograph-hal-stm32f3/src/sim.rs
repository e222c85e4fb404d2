//! Simulated I2C and SPI peripherals for host tests
//!
//! Each simulator implements [`RegisterInterface`] with just enough of the
//! RM0316 flag behaviour for the engines: status flags rise when the
//! modelled device makes progress, data register accesses clear them, and
//! fault knobs stop the device at a chosen point.

use std::cell::RefCell;
use std::rc::Rc;

use barograph_hal::gpio::OutputPin;
use barograph_hal::regs::{field, RegisterInterface};
use heapless::{Deque, Vec};

use crate::registers::{i2c, spi, I2cRegister, SpiRegister};

/// Where the simulated I2C device stops cooperating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cFault {
    None,
    /// Address is never acknowledged, TXIS never rises
    NoAddressAck,
    /// Register byte is accepted but never completes (no TC)
    NoRegisterAck,
    /// Payload stops moving after this many bytes
    StallAfter(usize),
    /// STOP is never detected
    NoStop,
}

/// Register file behind a 7-bit address with an auto-incrementing pointer
pub struct SimI2cDevice {
    pub address: u8,
    pub registers: [u8; 256],
    pointer: u8,
}

impl SimI2cDevice {
    fn read_next(&mut self) -> u8 {
        let value = self.registers[self.pointer as usize];
        self.pointer = self.pointer.wrapping_add(1);
        value
    }

    fn write_next(&mut self, value: u8) {
        self.registers[self.pointer as usize] = value;
        self.pointer = self.pointer.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Copy)]
struct I2cTransfer {
    read: bool,
    nbytes: u8,
    autoend: bool,
    /// Bytes moved in this transfer, register byte included
    moved: u8,
    /// The next written byte sets the device pointer
    expect_pointer: bool,
}

pub struct SimI2c {
    pub cr1: u32,
    pub cr2: u32,
    pub timingr: u32,
    isr: u32,
    pub device: SimI2cDevice,
    pub fault: I2cFault,
    /// Every byte written to TXDR
    pub tx_log: Vec<u8, 512>,
    /// CR2 value at every START
    pub starts: Vec<u32, 16>,
    /// Software STOP requests
    pub stop_requests: u32,
    /// ISR reads
    pub isr_polls: u32,
    transfer: Option<I2cTransfer>,
    /// Payload bytes moved since the last START with address write
    payload_moved: usize,
}

impl SimI2c {
    pub fn new(address: u8) -> Self {
        Self {
            cr1: 0,
            cr2: 0,
            timingr: 0,
            isr: 0,
            device: SimI2cDevice {
                address,
                registers: [0; 256],
                pointer: 0,
            },
            fault: I2cFault::None,
            tx_log: Vec::new(),
            starts: Vec::new(),
            stop_requests: 0,
            isr_polls: 0,
            transfer: None,
            payload_moved: 0,
        }
    }

    fn stalled(&self) -> bool {
        matches!(self.fault, I2cFault::StallAfter(n) if self.payload_moved >= n)
    }

    fn start(&mut self, cr2: u32) {
        let _ = self.starts.push(cr2);
        self.isr &= !(i2c::ISR_TC | i2c::ISR_TXIS | i2c::ISR_RXNE);

        let address = (field(cr2, i2c::CR2_SADD_POS, i2c::CR2_SADD_WIDTH) >> 1) as u8;
        if address != self.device.address || self.fault == I2cFault::NoAddressAck {
            self.transfer = None;
            return;
        }

        let read = cr2 & i2c::CR2_RD_WRN != 0;
        if !read {
            self.payload_moved = 0;
        }
        self.transfer = Some(I2cTransfer {
            read,
            nbytes: field(cr2, i2c::CR2_NBYTES_POS, i2c::CR2_NBYTES_WIDTH) as u8,
            autoend: cr2 & i2c::CR2_AUTOEND != 0,
            moved: 0,
            expect_pointer: !read,
        });

        if read {
            self.raise_rxne();
        } else {
            self.isr |= i2c::ISR_TXIS;
        }
    }

    fn raise_rxne(&mut self) {
        if !self.stalled() {
            self.isr |= i2c::ISR_RXNE;
        }
    }

    fn stop(&mut self) {
        self.transfer = None;
        if self.fault != I2cFault::NoStop {
            self.isr |= i2c::ISR_STOPF;
        }
    }

    /// Transfer reached NBYTES
    fn complete(&mut self, transfer: I2cTransfer) {
        if transfer.autoend {
            self.stop();
        } else {
            self.isr |= i2c::ISR_TC;
        }
    }

    fn write_txdr(&mut self, value: u8) {
        let _ = self.tx_log.push(value);
        self.isr &= !i2c::ISR_TXIS;

        let Some(mut transfer) = self.transfer else {
            return;
        };
        if transfer.read {
            return;
        }

        let was_pointer = transfer.expect_pointer;
        if was_pointer {
            self.device.pointer = value;
            transfer.expect_pointer = false;
        } else {
            self.device.write_next(value);
            self.payload_moved += 1;
        }
        transfer.moved += 1;
        self.transfer = Some(transfer);

        if was_pointer && self.fault == I2cFault::NoRegisterAck {
            return;
        }
        if transfer.moved < transfer.nbytes {
            if !self.stalled() {
                self.isr |= i2c::ISR_TXIS;
            }
        } else {
            self.complete(transfer);
        }
    }

    fn read_rxdr(&mut self) -> u8 {
        if self.isr & i2c::ISR_RXNE == 0 {
            return 0;
        }
        self.isr &= !i2c::ISR_RXNE;

        let Some(mut transfer) = self.transfer else {
            return 0;
        };
        let value = self.device.read_next();
        self.payload_moved += 1;
        transfer.moved += 1;
        self.transfer = Some(transfer);

        if transfer.moved < transfer.nbytes {
            self.raise_rxne();
        } else {
            self.complete(transfer);
        }
        value
    }
}

impl RegisterInterface for SimI2c {
    type Register = I2cRegister;

    fn read(&mut self, reg: I2cRegister) -> u32 {
        match reg {
            I2cRegister::Cr1 => self.cr1,
            I2cRegister::Cr2 => self.cr2,
            I2cRegister::Timingr => self.timingr,
            I2cRegister::Isr => {
                self.isr_polls += 1;
                self.isr
            }
            I2cRegister::Icr => 0,
            I2cRegister::Rxdr => u32::from(self.read_rxdr()),
            I2cRegister::Txdr => 0,
        }
    }

    fn write(&mut self, reg: I2cRegister, value: u32) {
        match reg {
            I2cRegister::Cr1 => self.cr1 = value,
            I2cRegister::Cr2 => {
                // START and STOP are cleared by hardware once acted on
                self.cr2 = value & !(i2c::CR2_START | i2c::CR2_STOP);
                if value & i2c::CR2_START != 0 {
                    self.start(value);
                }
                if value & i2c::CR2_STOP != 0 {
                    self.stop_requests += 1;
                    self.stop();
                }
            }
            I2cRegister::Timingr => self.timingr = value,
            I2cRegister::Isr => {}
            I2cRegister::Icr => {
                if value & i2c::ICR_STOPCF != 0 {
                    self.isr &= !i2c::ISR_STOPF;
                }
            }
            I2cRegister::Rxdr => {}
            I2cRegister::Txdr => self.write_txdr(value as u8),
        }
    }
}

/// Chip-select line shared between a test and [`SimSpi`]
///
/// Starts out high (pulled up, deselected).
#[derive(Debug)]
pub struct CsLine {
    pub high: bool,
    /// Every level driven, in order
    pub levels: Vec<bool, 64>,
    /// Falling edges (selections)
    pub selects: u32,
    /// Rising edges (releases)
    pub releases: u32,
}

impl Default for CsLine {
    fn default() -> Self {
        Self {
            high: true,
            levels: Vec::new(),
            selects: 0,
            releases: 0,
        }
    }
}

/// Test [`OutputPin`] recording into a shared [`CsLine`]
#[derive(Clone, Default)]
pub struct SimCs(pub Rc<RefCell<CsLine>>);

impl OutputPin for SimCs {
    fn set_high(&mut self) {
        let mut line = self.0.borrow_mut();
        if !line.high {
            line.releases += 1;
        }
        line.high = true;
        let _ = line.levels.push(true);
    }

    fn set_low(&mut self) {
        let mut line = self.0.borrow_mut();
        if line.high {
            line.selects += 1;
        }
        line.high = false;
        let _ = line.levels.push(false);
    }

    fn is_set_high(&self) -> bool {
        self.0.borrow().high
    }
}

/// What sits on the other end of the simulated SPI bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiResponder {
    /// MISO returns each frame as it was sent
    Echo,
    /// Sensor answering `reg | 0x80, dummy, dummy` with its register file
    /// while selected
    Sensor,
}

pub struct SimSpi {
    pub cr1: u32,
    pub cr2: u32,
    pub responder: SpiResponder,
    pub registers: [u8; 256],
    /// TXE never rises
    pub tx_stuck: bool,
    /// Frames per selection that get a response, `None` for all
    pub respond_frames: Option<usize>,
    /// Every frame clocked out
    pub tx_log: Vec<u8, 512>,
    /// Frames clocked while SPE was clear
    pub dropped_frames: u32,
    /// Level of chip-select when SPE was set
    pub cs_at_enable: Option<bool>,
    rx_fifo: Deque<u8, 4>,
    cs: Rc<RefCell<CsLine>>,
    seen_selects: u32,
    frame_in_selection: usize,
    pointer: u8,
}

impl SimSpi {
    pub fn new(responder: SpiResponder, cs: &SimCs) -> Self {
        Self {
            cr1: 0,
            cr2: 0,
            responder,
            registers: [0; 256],
            tx_stuck: false,
            respond_frames: None,
            tx_log: Vec::new(),
            dropped_frames: 0,
            cs_at_enable: None,
            rx_fifo: Deque::new(),
            cs: cs.0.clone(),
            seen_selects: 0,
            frame_in_selection: 0,
            pointer: 0,
        }
    }

    fn enabled(&self) -> bool {
        self.cr1 & spi::CR1_SPE != 0
    }

    fn rx_threshold(&self) -> usize {
        if self.cr2 & spi::CR2_FRXTH != 0 {
            1
        } else {
            2
        }
    }

    fn status(&self) -> u32 {
        let mut sr = 0;
        if !self.tx_stuck {
            sr |= spi::SR_TXE;
        }
        if self.rx_fifo.len() >= self.rx_threshold() {
            sr |= spi::SR_RXNE;
        }
        let level = match self.rx_fifo.len() {
            0 => 0,
            1 => 1,
            2 | 3 => 2,
            _ => 3,
        };
        sr | (level << spi::SR_FRLVL_POS)
    }

    fn clock_frame(&mut self, mosi: u8) {
        if !self.enabled() || self.tx_stuck {
            self.dropped_frames += 1;
            return;
        }
        let _ = self.tx_log.push(mosi);

        let (selected, selects) = {
            let line = self.cs.borrow();
            (!line.high, line.selects)
        };
        if selects != self.seen_selects {
            self.seen_selects = selects;
            self.frame_in_selection = 0;
        }
        let frame = self.frame_in_selection;
        self.frame_in_selection += 1;

        if self.respond_frames.is_some_and(|limit| frame >= limit) {
            return;
        }

        let miso = match self.responder {
            SpiResponder::Echo => mosi,
            SpiResponder::Sensor if !selected => 0xFF,
            SpiResponder::Sensor => match frame {
                0 => {
                    self.pointer = mosi & 0x7F;
                    0x00
                }
                1 | 2 => 0x00,
                _ => {
                    let value = self.registers[self.pointer as usize];
                    self.pointer = self.pointer.wrapping_add(1);
                    value
                }
            },
        };
        // Overrun drops the newest frame, as OVR would
        let _ = self.rx_fifo.push_back(miso);
    }
}

impl RegisterInterface for SimSpi {
    type Register = SpiRegister;

    fn read(&mut self, reg: SpiRegister) -> u32 {
        match reg {
            SpiRegister::Cr1 => self.cr1,
            SpiRegister::Cr2 => self.cr2,
            SpiRegister::Sr => self.status(),
            SpiRegister::Dr8 => u32::from(self.rx_fifo.pop_front().unwrap_or(0)),
            SpiRegister::Dr => {
                let low = self.rx_fifo.pop_front().unwrap_or(0);
                let high = self.rx_fifo.pop_front().unwrap_or(0);
                u32::from(u16::from_le_bytes([low, high]))
            }
        }
    }

    fn write(&mut self, reg: SpiRegister, value: u32) {
        match reg {
            SpiRegister::Cr1 => {
                if value & spi::CR1_SPE != 0 && !self.enabled() {
                    self.cs_at_enable = Some(self.cs.borrow().high);
                }
                self.cr1 = value;
            }
            SpiRegister::Cr2 => self.cr2 = value,
            SpiRegister::Sr => {}
            SpiRegister::Dr8 => self.clock_frame(value as u8),
            SpiRegister::Dr => {
                let [low, high] = (value as u16).to_le_bytes();
                self.clock_frame(low);
                self.clock_frame(high);
            }
        }
    }
}
