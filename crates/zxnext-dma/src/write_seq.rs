//! Write sequencer: turns the port byte stream into WR0-WR6 updates.
//!
//! An idle sequencer identifies the register a base byte belongs to from its
//! fixed bit pattern. Base bytes that announce trailing fields leave the
//! sequencer pointing at the next field to fill; 16-bit fields arrive low
//! byte first and each byte is applied as soon as it lands.
//!
//! | Base byte                              | Register |
//! |----------------------------------------|----------|
//! | `0x0xx010` (D6, D2, D1, D0 = 0, 0, 1, 0) | WR5      |
//! | `0xxxx100`                             | WR1      |
//! | `0xxxx000`                             | WR2      |
//! | `0xxxxxxx` otherwise                   | WR0      |
//! | `1xxxxx00`                             | WR3      |
//! | `1xxxxx01`                             | WR4      |
//! | `1xxxxx10`                             | WR5      |
//! | `1xxxxx11`                             | WR6      |

use std::fmt;

use crate::ZxnDma;
use crate::read_seq::ReadMask;
use crate::registers::{AddressMode, CycleLength, TransferMode};

/// A programmable write register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRegister {
    /// Direction, Port A address, block length.
    Wr0,
    /// Port A configuration.
    Wr1,
    /// Port B configuration.
    Wr2,
    /// Match/interrupt control on the Z80 DMA. Unused on the Next.
    Wr3,
    /// Transfer mode, Port B address.
    Wr4,
    /// Auto restart, `/CE` + `/WAIT`.
    Wr5,
    /// Commands.
    Wr6,
}

impl WriteRegister {
    /// Identify the register a base byte addresses.
    #[must_use]
    pub fn identify(value: u8) -> Self {
        if value & 0x80 == 0 {
            if value & 0x47 == 0x02 {
                return Self::Wr5;
            }
            match value & 0x07 {
                0b100 => Self::Wr1,
                0b000 => Self::Wr2,
                _ => Self::Wr0,
            }
        } else {
            match value & 0x03 {
                0b00 => Self::Wr3,
                0b01 => Self::Wr4,
                0b10 => Self::Wr5,
                _ => Self::Wr6,
            }
        }
    }
}

impl fmt::Display for WriteRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            Self::Wr0 => 0,
            Self::Wr1 => 1,
            Self::Wr2 => 2,
            Self::Wr3 => 3,
            Self::Wr4 => 4,
            Self::Wr5 => 5,
            Self::Wr6 => 6,
        };
        write!(f, "WR{n}")
    }
}

/// The field the next written byte fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSequence {
    /// Waiting for a base byte.
    Idle,
    PortAStartLow,
    PortAStartHigh,
    BlockLengthLow,
    BlockLengthHigh,
    PortATiming,
    PortBTiming,
    PortBPrescalar,
    PortBStartLow,
    PortBStartHigh,
    /// Operand of READ_MASK_FOLLOWS.
    ReadMask,
}

impl WriteSequence {
    /// Register whose tail is being received.
    #[must_use]
    pub fn register(self) -> Option<WriteRegister> {
        match self {
            Self::Idle => None,
            Self::PortAStartLow | Self::PortAStartHigh | Self::BlockLengthLow | Self::BlockLengthHigh => {
                Some(WriteRegister::Wr0)
            }
            Self::PortATiming => Some(WriteRegister::Wr1),
            Self::PortBTiming | Self::PortBPrescalar => Some(WriteRegister::Wr2),
            Self::PortBStartLow | Self::PortBStartHigh => Some(WriteRegister::Wr4),
            Self::ReadMask => Some(WriteRegister::Wr6),
        }
    }

    /// Trailing bytes still expected, counting this field.
    #[must_use]
    pub fn remaining(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::PortAStartLow => 4,
            Self::PortAStartHigh => 3,
            Self::BlockLengthLow | Self::PortBTiming | Self::PortBStartLow => 2,
            Self::BlockLengthHigh
            | Self::PortATiming
            | Self::PortBPrescalar
            | Self::PortBStartHigh
            | Self::ReadMask => 1,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::PortAStartLow => Self::PortAStartHigh,
            Self::PortAStartHigh => Self::BlockLengthLow,
            Self::BlockLengthLow => Self::BlockLengthHigh,
            Self::PortBTiming => Self::PortBPrescalar,
            Self::PortBStartLow => Self::PortBStartHigh,
            _ => Self::Idle,
        }
    }
}

impl ZxnDma {
    /// Feed one byte to the write sequencer, as a port write does after
    /// selecting the personality.
    pub fn write_byte(&mut self, value: u8) {
        if self.write_seq == WriteSequence::Idle {
            self.write_base(WriteRegister::identify(value), value);
        } else {
            self.write_field(value);
        }
    }

    /// Write a byte to a named register, skipping identification.
    ///
    /// If `register` is mid-sequence the byte continues its tail, otherwise
    /// it is that register's base byte.
    pub fn write_register(&mut self, register: WriteRegister, value: u8) {
        if self.write_seq.register() == Some(register) {
            self.write_field(value);
        } else {
            self.write_base(register, value);
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn write_base(&mut self, register: WriteRegister, value: u8) {
        log::trace!("DMA {register} <- {value:#04X}");
        self.write_seq = WriteSequence::Idle;

        match register {
            WriteRegister::Wr0 => {
                self.regs.direction_a_to_b = value & 0x40 != 0;
                // The full tail is always consumed, whatever D3-D6 announce.
                self.write_seq = WriteSequence::PortAStartLow;
            }
            WriteRegister::Wr1 => {
                self.regs.port_a_is_io = value & 0x08 != 0;
                self.regs.port_a_address_mode = AddressMode::from_wr_bits(value);
                if value & 0x40 != 0 {
                    self.write_seq = WriteSequence::PortATiming;
                }
            }
            WriteRegister::Wr2 => {
                self.regs.port_b_is_io = value & 0x08 != 0;
                self.regs.port_b_address_mode = AddressMode::from_wr_bits(value);
                if value & 0x40 != 0 {
                    self.write_seq = WriteSequence::PortBTiming;
                }
            }
            WriteRegister::Wr3 => {}
            WriteRegister::Wr4 => {
                self.regs.transfer_mode = TransferMode::from_wr4(value);
                if value & 0x01 != 0 {
                    self.write_seq = WriteSequence::PortBStartLow;
                }
            }
            WriteRegister::Wr5 => {
                self.regs.auto_restart = value & 0x20 != 0;
                self.regs.ce_wait_multiplexed = value & 0x10 != 0;
            }
            WriteRegister::Wr6 => self.execute_command(value),
        }
    }

    fn write_field(&mut self, value: u8) {
        let field = self.write_seq;
        self.write_seq = field.next();
        log::trace!("DMA {field:?} <- {value:#04X}");

        let regs = &mut self.regs;
        match field {
            WriteSequence::Idle => {}
            WriteSequence::PortAStartLow => set_low(&mut regs.port_a_start_address, value),
            WriteSequence::PortAStartHigh => set_high(&mut regs.port_a_start_address, value),
            WriteSequence::BlockLengthLow => set_low(&mut regs.block_length, value),
            WriteSequence::BlockLengthHigh => set_high(&mut regs.block_length, value),
            WriteSequence::PortATiming => {
                regs.port_a_cycle_length = CycleLength::from_timing_byte(value);
            }
            WriteSequence::PortBTiming => {
                regs.port_b_cycle_length = CycleLength::from_timing_byte(value);
            }
            WriteSequence::PortBPrescalar => regs.port_b_prescalar = value,
            WriteSequence::PortBStartLow => set_low(&mut regs.port_b_start_address, value),
            WriteSequence::PortBStartHigh => set_high(&mut regs.port_b_start_address, value),
            WriteSequence::ReadMask => self.read_mask = ReadMask::from_byte(value),
        }
    }
}

fn set_low(word: &mut u16, value: u8) {
    *word = (*word & 0xFF00) | u16::from(value);
}

fn set_high(word: &mut u16, value: u8) {
    *word = (*word & 0x00FF) | (u16::from(value) << 8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReadSequence;

    fn write_all(dma: &mut ZxnDma, bytes: &[u8]) {
        for &byte in bytes {
            dma.write_byte(byte);
        }
    }

    #[test]
    fn base_byte_identification() {
        assert_eq!(WriteRegister::identify(0x7D), WriteRegister::Wr0);
        assert_eq!(WriteRegister::identify(0x79), WriteRegister::Wr0);
        assert_eq!(WriteRegister::identify(0x14), WriteRegister::Wr1);
        assert_eq!(WriteRegister::identify(0x54), WriteRegister::Wr1);
        assert_eq!(WriteRegister::identify(0x10), WriteRegister::Wr2);
        assert_eq!(WriteRegister::identify(0x50), WriteRegister::Wr2);
        assert_eq!(WriteRegister::identify(0x80), WriteRegister::Wr3);
        assert_eq!(WriteRegister::identify(0xBD), WriteRegister::Wr4);
        assert_eq!(WriteRegister::identify(0x82), WriteRegister::Wr5);
        assert_eq!(WriteRegister::identify(0x32), WriteRegister::Wr5);
        assert_eq!(WriteRegister::identify(0x12), WriteRegister::Wr5);
        assert_eq!(WriteRegister::identify(0xC3), WriteRegister::Wr6);
        assert_eq!(WriteRegister::identify(0xCF), WriteRegister::Wr6);
    }

    #[test]
    fn wr0_consumes_four_byte_tail() {
        let mut dma = ZxnDma::new();
        dma.write_byte(0x7D);
        assert_eq!(dma.write_sequence(), WriteSequence::PortAStartLow);
        assert_eq!(dma.write_sequence().remaining(), 4);

        dma.write_byte(0x34);
        assert_eq!(dma.registers().port_a_start_address, 0x0034, "low byte applies at once");
        dma.write_byte(0x12);
        dma.write_byte(0x00);
        assert_eq!(dma.write_sequence(), WriteSequence::BlockLengthHigh);
        dma.write_byte(0x01);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);

        let regs = dma.registers();
        assert!(regs.direction_a_to_b);
        assert_eq!(regs.port_a_start_address, 0x1234);
        assert_eq!(regs.block_length, 0x0100);
    }

    #[test]
    fn wr0_direction_bit() {
        let mut dma = ZxnDma::new();
        write_all(&mut dma, &[0x3D, 0, 0, 0, 0]);
        assert!(!dma.registers().direction_a_to_b);
        write_all(&mut dma, &[0x7D, 0, 0, 0, 0]);
        assert!(dma.registers().direction_a_to_b);
    }

    #[test]
    fn wr0_tail_is_consumed_even_without_announcing_bits() {
        let mut dma = ZxnDma::new();
        // 0x01: transfer, no address or length bits set
        write_all(&mut dma, &[0x01, 0xCF, 0x87, 0x10, 0x00]);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
        let regs = dma.registers();
        assert_eq!(regs.port_a_start_address, 0x87CF, "command-looking bytes land in the tail");
        assert_eq!(regs.block_length, 0x0010);
        assert!(!regs.dma_enabled);
    }

    #[test]
    fn wr1_port_a_configuration() {
        let mut dma = ZxnDma::new();
        dma.write_byte(0x2C); // I/O, decrement
        let regs = dma.registers();
        assert!(regs.port_a_is_io);
        assert_eq!(regs.port_a_address_mode, AddressMode::Decrement);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);

        dma.write_byte(0x44); // memory, fixed, timing follows
        assert_eq!(dma.write_sequence(), WriteSequence::PortATiming);
        dma.write_byte(0x02);
        let regs = dma.registers();
        assert!(!regs.port_a_is_io);
        assert_eq!(regs.port_a_address_mode, AddressMode::Fixed);
        assert_eq!(regs.port_a_cycle_length, CycleLength::Cycles2);
    }

    #[test]
    fn wr2_timing_and_prescalar() {
        let mut dma = ZxnDma::new();
        write_all(&mut dma, &[0x68, 0x00, 0x37]);
        let regs = dma.registers();
        assert!(regs.port_b_is_io);
        assert_eq!(regs.port_b_address_mode, AddressMode::Decrement);
        assert_eq!(regs.port_b_cycle_length, CycleLength::Cycles4);
        assert_eq!(regs.port_b_prescalar, 0x37);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
    }

    #[test]
    fn wr4_port_b_address_follows_base_byte() {
        let mut dma = ZxnDma::new();
        write_all(&mut dma, &[0xBD, 0x78, 0x56]);
        assert_eq!(dma.registers().port_b_start_address, 0x5678);
        assert_eq!(dma.registers().transfer_mode, TransferMode::Continuous);

        // Bit 2 clear still announces the address
        write_all(&mut dma, &[0xCD, 0x00, 0x20]);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
        assert_eq!(dma.registers().transfer_mode, TransferMode::Burst);
        assert_eq!(dma.registers().port_b_start_address, 0x2000);
    }

    #[test]
    fn wr4_direct_write_takes_port_b_address() {
        let mut dma = ZxnDma::new();
        dma.write_register(WriteRegister::Wr4, 0x01);
        assert_eq!(dma.write_sequence(), WriteSequence::PortBStartLow);
        dma.write_register(WriteRegister::Wr4, 0x78);
        dma.write_register(WriteRegister::Wr4, 0x56);
        assert_eq!(dma.registers().port_b_start_address, 0x5678);
        assert_eq!(dma.registers().transfer_mode, TransferMode::Burst);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
    }

    #[test]
    fn wr4_without_enable_bit_has_no_tail() {
        let mut dma = ZxnDma::new();
        dma.write_register(WriteRegister::Wr4, 0x10);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
        assert_eq!(dma.registers().transfer_mode, TransferMode::Continuous);
    }

    #[test]
    fn wr5_flags() {
        let mut dma = ZxnDma::new();
        dma.write_byte(0xA2);
        assert!(dma.registers().auto_restart);
        assert!(!dma.registers().ce_wait_multiplexed);
        dma.write_byte(0x12);
        assert!(!dma.registers().auto_restart);
        assert!(dma.registers().ce_wait_multiplexed);
        dma.write_byte(0x82);
        assert!(!dma.registers().auto_restart);
        assert!(!dma.registers().ce_wait_multiplexed);
    }

    #[test]
    fn wr3_is_ignored() {
        let mut dma = ZxnDma::new();
        let before = dma.registers();
        dma.write_byte(0xC0);
        assert_eq!(dma.registers(), before);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
    }

    #[test]
    fn read_mask_follows() {
        let mut dma = ZxnDma::new();
        dma.write_byte(0xBB);
        assert_eq!(dma.write_sequence(), WriteSequence::ReadMask);
        dma.write_byte(0xFF);
        assert_eq!(dma.read_mask().bits(), 0x7F, "mask keeps seven bits");
        dma.write_byte(0xBB);
        dma.write_byte(0x60);
        assert_eq!(dma.read_mask().bits(), 0x60);
    }

    #[test]
    fn writes_do_not_move_read_cursor() {
        let mut dma = ZxnDma::new();
        let _ = dma.read_byte();
        let _ = dma.read_byte();
        assert_eq!(dma.read_sequence(), ReadSequence::CounterHigh);
        write_all(&mut dma, &[0x7D, 0x00, 0x80, 0x10, 0x00, 0x14, 0x10]);
        assert_eq!(dma.read_sequence(), ReadSequence::CounterHigh);
    }

    #[test]
    fn direct_register_writes() {
        let mut dma = ZxnDma::new();
        // 0x05 would identify as WR0 on the port
        dma.write_register(WriteRegister::Wr4, 0x05);
        assert_eq!(dma.write_sequence(), WriteSequence::PortBStartLow);
        dma.write_register(WriteRegister::Wr4, 0x00);
        dma.write_register(WriteRegister::Wr4, 0xC0);
        assert_eq!(dma.registers().port_b_start_address, 0xC000);
        assert_eq!(dma.registers().transfer_mode, TransferMode::Burst);

        dma.write_register(WriteRegister::Wr0, 0x40);
        dma.write_register(WriteRegister::Wr0, 0xFF);
        assert_eq!(dma.write_sequence(), WriteSequence::PortAStartHigh);
        // A different register abandons the WR0 tail
        dma.write_register(WriteRegister::Wr1, 0x24);
        assert_eq!(dma.write_sequence(), WriteSequence::Idle);
        assert_eq!(dma.registers().port_a_address_mode, AddressMode::Decrement);
    }

    #[test]
    fn pending_field_countdown() {
        let mut dma = ZxnDma::new();
        dma.write_byte(0x7D);
        let mut counts = Vec::new();
        while dma.write_sequence() != WriteSequence::Idle {
            counts.push(dma.write_sequence().remaining());
            dma.write_byte(0);
        }
        assert_eq!(counts, vec![4, 3, 2, 1]);
    }
}
