//! Read sequencer: what a data-port read returns.
//!
//! Reads walk a fixed cycle, status → counter → Port A → Port B, skipping
//! the members the read mask leaves out. Status is always served.

use bitflags::bitflags;

use crate::ZxnDma;

/// Status with the block complete (`0011_011T`).
const STATUS_END_OF_BLOCK: u8 = 0x36;
/// Status while a block is in progress (`0001_101T`).
const STATUS_IN_PROGRESS: u8 = 0x1A;
const STATUS_TRANSFERRED: u8 = 0x01;

bitflags! {
    /// Read mask written after READ_MASK_FOLLOWS.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReadMask: u8 {
        const STATUS = 0x01;
        const PORT_B_HIGH = 0x02;
        const PORT_B_LOW = 0x04;
        const PORT_A_HIGH = 0x08;
        const PORT_A_LOW = 0x10;
        const COUNTER_HIGH = 0x20;
        const COUNTER_LOW = 0x40;
    }
}

impl ReadMask {
    /// Mask byte as written to the port. Bit 7 is ignored.
    #[must_use]
    pub fn from_byte(value: u8) -> Self {
        Self::from_bits_truncate(value)
    }
}

/// Position in the read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSequence {
    Status,
    CounterLow,
    CounterHigh,
    PortALow,
    PortAHigh,
    PortBLow,
    PortBHigh,
}

impl ReadSequence {
    fn successor(self) -> Self {
        match self {
            Self::Status => Self::CounterLow,
            Self::CounterLow => Self::CounterHigh,
            Self::CounterHigh => Self::PortALow,
            Self::PortALow => Self::PortAHigh,
            Self::PortAHigh => Self::PortBLow,
            Self::PortBLow => Self::PortBHigh,
            Self::PortBHigh => Self::Status,
        }
    }

    fn mask_bit(self) -> ReadMask {
        match self {
            Self::Status => ReadMask::STATUS,
            Self::CounterLow => ReadMask::COUNTER_LOW,
            Self::CounterHigh => ReadMask::COUNTER_HIGH,
            Self::PortALow => ReadMask::PORT_A_LOW,
            Self::PortAHigh => ReadMask::PORT_A_HIGH,
            Self::PortBLow => ReadMask::PORT_B_LOW,
            Self::PortBHigh => ReadMask::PORT_B_HIGH,
        }
    }

    /// Whether a read at this position returns data under `mask`.
    #[must_use]
    pub fn is_served(self, mask: ReadMask) -> bool {
        self == Self::Status || mask.contains(self.mask_bit())
    }
}

/// The member served after `cursor`, wrapping through status.
#[must_use]
pub fn next_enabled(cursor: ReadSequence, mask: ReadMask) -> ReadSequence {
    let mut next = cursor.successor();
    while !next.is_served(mask) {
        next = next.successor();
    }
    next
}

impl ZxnDma {
    /// Serve one byte from the read sequence and advance the cursor.
    pub fn read_byte(&mut self) -> u8 {
        let cursor = if self.read_seq.is_served(self.read_mask) {
            self.read_seq
        } else {
            next_enabled(self.read_seq, self.read_mask)
        };
        let value = self.read_field(cursor);
        self.read_seq = next_enabled(cursor, self.read_mask);
        value
    }

    /// Current status byte, without touching the read cursor.
    #[must_use]
    pub fn status_byte(&self) -> u8 {
        let mut status = if self.status.end_of_block_reached {
            STATUS_END_OF_BLOCK
        } else {
            STATUS_IN_PROGRESS
        };
        if self.status.at_least_one_byte_transferred {
            status |= STATUS_TRANSFERRED;
        }
        status
    }

    fn read_field(&self, field: ReadSequence) -> u8 {
        let counter = self.transfer.byte_counter;
        let port_a = self.regs.port_a_start_address;
        let port_b = self.regs.port_b_start_address;
        match field {
            ReadSequence::Status => self.status_byte(),
            ReadSequence::CounterLow => counter as u8,
            ReadSequence::CounterHigh => (counter >> 8) as u8,
            ReadSequence::PortALow => port_a as u8,
            ReadSequence::PortAHigh => (port_a >> 8) as u8,
            ReadSequence::PortBLow => port_b as u8,
            ReadSequence::PortBHigh => (port_b >> 8) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_mask(dma: &mut ZxnDma, mask: u8) {
        dma.write_byte(0xBB);
        dma.write_byte(mask);
        dma.write_byte(0xA7);
    }

    #[test]
    fn full_mask_walks_seven_steps() {
        let mask = ReadMask::all();
        let mut cursor = ReadSequence::Status;
        let mut visited = vec![cursor];
        for _ in 0..7 {
            cursor = next_enabled(cursor, mask);
            visited.push(cursor);
        }
        assert_eq!(
            visited,
            vec![
                ReadSequence::Status,
                ReadSequence::CounterLow,
                ReadSequence::CounterHigh,
                ReadSequence::PortALow,
                ReadSequence::PortAHigh,
                ReadSequence::PortBLow,
                ReadSequence::PortBHigh,
                ReadSequence::Status,
            ]
        );
    }

    #[test]
    fn empty_mask_stays_on_status() {
        let mask = ReadMask::empty();
        assert_eq!(next_enabled(ReadSequence::Status, mask), ReadSequence::Status);
        assert_eq!(next_enabled(ReadSequence::PortALow, mask), ReadSequence::Status);
    }

    #[test]
    fn sparse_mask_skips_members() {
        let mask = ReadMask::from_byte(0x55); // counter lo, A lo, B lo, status
        assert_eq!(next_enabled(ReadSequence::Status, mask), ReadSequence::CounterLow);
        assert_eq!(next_enabled(ReadSequence::CounterLow, mask), ReadSequence::PortALow);
        assert_eq!(next_enabled(ReadSequence::PortALow, mask), ReadSequence::PortBLow);
        assert_eq!(next_enabled(ReadSequence::PortBLow, mask), ReadSequence::Status);
    }

    #[test]
    fn status_byte_values() {
        let mut dma = ZxnDma::new();
        assert_eq!(dma.status_byte(), 0x36);
        dma.status.at_least_one_byte_transferred = true;
        assert_eq!(dma.status_byte(), 0x37);
        dma.status.end_of_block_reached = false;
        assert_eq!(dma.status_byte(), 0x1B);
        assert_eq!(dma.status_byte() & 0xC0, 0);
    }

    #[test]
    fn mid_block_status_after_one_byte() {
        let mut dma = ZxnDma::new();
        let mut bus = emu_core::SimpleBus::new();
        for byte in [0x7D, 0x00, 0x80, 0x04, 0x00, 0xBD, 0x00, 0x90, 0xCF, 0x87] {
            dma.write_byte(byte);
        }
        dma.request_bus();
        dma.perform_read_cycle(&mut bus);
        dma.perform_write_cycle(&mut bus);
        dma.release_bus();
        dma.write_byte(0xBF);
        assert_eq!(dma.read_byte(), 0x1B);
    }

    #[test]
    fn reinitialize_after_complete_block_reads_idle_status() {
        let mut dma = ZxnDma::new();
        let mut bus = emu_core::SimpleBus::new();
        for byte in [0x7D, 0x00, 0x80, 0x04, 0x00, 0xBD, 0x00, 0x90, 0xCF, 0x87] {
            dma.write_byte(byte);
        }
        dma.execute_continuous_transfer(&mut bus);
        assert_eq!(dma.status_byte(), 0x37);
        dma.write_byte(0x8B);
        dma.write_byte(0xBF);
        assert_eq!(dma.read_byte(), 0x36);
    }

    #[test]
    fn mask_zero_always_reads_status() {
        let mut dma = ZxnDma::new();
        set_mask(&mut dma, 0x00);
        for _ in 0..5 {
            assert_eq!(dma.read_byte(), 0x36);
            assert_eq!(dma.read_sequence(), ReadSequence::Status);
        }
    }

    #[test]
    fn reads_port_addresses_in_order() {
        let mut dma = ZxnDma::new();
        for byte in [0x7D, 0x34, 0x12, 0x00, 0x01, 0xBD, 0x78, 0x56] {
            dma.write_byte(byte);
        }
        set_mask(&mut dma, 0x7F);
        let bytes: Vec<u8> = (0..8).map(|_| dma.read_byte()).collect();
        assert_eq!(bytes, vec![0x36, 0x00, 0x00, 0x34, 0x12, 0x78, 0x56, 0x36]);
    }

    #[test]
    fn counter_read_is_live() {
        let mut dma = ZxnDma::new();
        set_mask(&mut dma, 0x60);
        assert_eq!(dma.read_byte(), 0x36);
        dma.transfer.byte_counter = 0xBEEF;
        assert_eq!(dma.read_byte(), 0xEF);
        assert_eq!(dma.read_byte(), 0xBE);
        assert_eq!(dma.read_sequence(), ReadSequence::Status);
    }

    #[test]
    fn cursor_on_masked_out_member_moves_forward() {
        let mut dma = ZxnDma::new();
        for byte in [0x7D, 0x34, 0x12, 0x00, 0x00] {
            dma.write_byte(byte);
        }
        let _ = dma.read_byte(); // status
        assert_eq!(dma.read_sequence(), ReadSequence::CounterLow);
        dma.write_byte(0xBB);
        dma.write_byte(0x10); // Port A low only
        assert_eq!(dma.read_byte(), 0x34);
        assert_eq!(dma.read_sequence(), ReadSequence::Status);
    }

    #[test]
    fn restart_commands_return_to_status() {
        for opcode in [0xA7, 0x8B, 0xBF] {
            let mut dma = ZxnDma::new();
            let _ = dma.read_byte();
            let _ = dma.read_byte();
            dma.write_byte(opcode);
            assert_eq!(dma.read_sequence(), ReadSequence::Status, "opcode {opcode:#04X}");
            assert_eq!(dma.read_mask(), ReadMask::all(), "mask untouched by {opcode:#04X}");
        }
    }
}
