//! Register file: the programmable state written through WR0-WR5.
//!
//! Field decoders live next to the types they produce so the write
//! sequencer only has to know which bits to hand over.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a port address moves after each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AddressMode {
    Fixed,
    Increment,
    Decrement,
}

impl AddressMode {
    /// Decode the two-bit mode field from bits 5-4 of WR1/WR2.
    ///
    /// 00 = fixed, 01 = increment, 10 = decrement, 11 = fixed.
    #[must_use]
    pub fn from_wr_bits(value: u8) -> Self {
        match (value >> 4) & 0x03 {
            0b01 => Self::Increment,
            0b10 => Self::Decrement,
            _ => Self::Fixed,
        }
    }

    /// Apply one step to `address`, wrapping at 0x10000.
    #[must_use]
    pub fn step(self, address: u16) -> u16 {
        match self {
            Self::Fixed => address,
            Self::Increment => address.wrapping_add(1),
            Self::Decrement => address.wrapping_sub(1),
        }
    }
}

/// Bus cycle length for one port, in T-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CycleLength {
    Cycles4,
    Cycles3,
    Cycles2,
}

impl CycleLength {
    /// Decode the low two bits of a timing byte.
    #[must_use]
    pub fn from_timing_byte(value: u8) -> Self {
        match value & 0x03 {
            0b00 => Self::Cycles4,
            0b01 => Self::Cycles3,
            _ => Self::Cycles2,
        }
    }

    #[must_use]
    pub fn t_states(self) -> u32 {
        match self {
            Self::Cycles4 => 4,
            Self::Cycles3 => 3,
            Self::Cycles2 => 2,
        }
    }
}

/// Execution strategy selected by WR4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferMode {
    /// Whole block while the bus is held.
    Continuous,
    /// One byte per bus grant, paced by the prescalar.
    Burst,
}

impl TransferMode {
    /// Bit 4 of WR4: 1 = continuous, 0 = burst.
    #[must_use]
    pub fn from_wr4(value: u8) -> Self {
        if value & 0x10 != 0 {
            Self::Continuous
        } else {
            Self::Burst
        }
    }
}

/// Register personality, chosen by the port the CPU last touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DmaMode {
    /// Z80 DMA compatible (port 0x0B): length + 1 bytes, counter seeded at 0xFFFF.
    Legacy,
    /// zxnDMA (port 0x6B): exact length, counter seeded at 0.
    Zxn,
}

/// Snapshot of the programmable registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmaRegisters {
    /// True for Port A → Port B.
    pub direction_a_to_b: bool,
    pub port_a_start_address: u16,
    pub port_b_start_address: u16,
    pub block_length: u16,
    pub port_a_address_mode: AddressMode,
    pub port_b_address_mode: AddressMode,
    pub port_a_is_io: bool,
    pub port_b_is_io: bool,
    pub port_a_cycle_length: CycleLength,
    pub port_b_cycle_length: CycleLength,
    /// Burst pacing divider, stored as written.
    pub port_b_prescalar: u8,
    pub transfer_mode: TransferMode,
    /// WR5 bit 4: `/CE` and `/WAIT` share a pin.
    pub ce_wait_multiplexed: bool,
    pub auto_restart: bool,
    pub dma_enabled: bool,
}

impl DmaRegisters {
    /// Power-on register contents.
    #[must_use]
    pub fn power_on() -> Self {
        Self {
            direction_a_to_b: true,
            port_a_start_address: 0,
            port_b_start_address: 0,
            block_length: 0,
            port_a_address_mode: AddressMode::Increment,
            port_b_address_mode: AddressMode::Increment,
            port_a_is_io: false,
            port_b_is_io: false,
            port_a_cycle_length: CycleLength::Cycles3,
            port_b_cycle_length: CycleLength::Cycles3,
            port_b_prescalar: 0,
            transfer_mode: TransferMode::Continuous,
            ce_wait_multiplexed: false,
            auto_restart: false,
            dma_enabled: false,
        }
    }

    /// Timing fields only.
    #[must_use]
    pub fn timing(&self) -> TimingParameters {
        TimingParameters {
            port_a_cycle_length: self.port_a_cycle_length,
            port_b_cycle_length: self.port_b_cycle_length,
            port_b_prescalar: self.port_b_prescalar,
        }
    }

    /// Cost of one read + write cycle pair.
    #[must_use]
    pub fn byte_cycles(&self) -> u32 {
        self.port_a_cycle_length.t_states() + self.port_b_cycle_length.t_states()
    }

    /// (mode, is_io) of the port bytes are read from.
    pub(crate) fn source_port(&self) -> (AddressMode, bool) {
        if self.direction_a_to_b {
            (self.port_a_address_mode, self.port_a_is_io)
        } else {
            (self.port_b_address_mode, self.port_b_is_io)
        }
    }

    /// (mode, is_io) of the port bytes are written to.
    pub(crate) fn dest_port(&self) -> (AddressMode, bool) {
        if self.direction_a_to_b {
            (self.port_b_address_mode, self.port_b_is_io)
        } else {
            (self.port_a_address_mode, self.port_a_is_io)
        }
    }
}

impl Default for DmaRegisters {
    fn default() -> Self {
        Self::power_on()
    }
}

/// Per-port cycle lengths and the burst prescalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingParameters {
    pub port_a_cycle_length: CycleLength,
    pub port_b_cycle_length: CycleLength,
    pub port_b_prescalar: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_mode_field_decoding() {
        assert_eq!(AddressMode::from_wr_bits(0x04), AddressMode::Fixed);
        assert_eq!(AddressMode::from_wr_bits(0x14), AddressMode::Increment);
        assert_eq!(AddressMode::from_wr_bits(0x24), AddressMode::Decrement);
        assert_eq!(AddressMode::from_wr_bits(0x34), AddressMode::Fixed);
    }

    #[test]
    fn address_steps_wrap() {
        assert_eq!(AddressMode::Increment.step(0xFFFF), 0x0000);
        assert_eq!(AddressMode::Decrement.step(0x0000), 0xFFFF);
        assert_eq!(AddressMode::Fixed.step(0x1234), 0x1234);
    }

    #[test]
    fn timing_byte_uses_low_two_bits() {
        assert_eq!(CycleLength::from_timing_byte(0xFC), CycleLength::Cycles4);
        assert_eq!(CycleLength::from_timing_byte(0x01), CycleLength::Cycles3);
        assert_eq!(CycleLength::from_timing_byte(0x02), CycleLength::Cycles2);
        assert_eq!(CycleLength::from_timing_byte(0x03), CycleLength::Cycles2);
    }

    #[test]
    fn wr4_mode_bit() {
        assert_eq!(TransferMode::from_wr4(0xBD), TransferMode::Continuous);
        assert_eq!(TransferMode::from_wr4(0xDD), TransferMode::Continuous);
        assert_eq!(TransferMode::from_wr4(0xAD), TransferMode::Burst);
        assert_eq!(TransferMode::from_wr4(0x8D), TransferMode::Burst);
    }

    #[test]
    fn direction_selects_source_and_destination_ports() {
        let mut regs = DmaRegisters::power_on();
        regs.port_a_address_mode = AddressMode::Decrement;
        regs.port_b_is_io = true;
        assert_eq!(regs.source_port(), (AddressMode::Decrement, false));
        assert_eq!(regs.dest_port(), (AddressMode::Increment, true));

        regs.direction_a_to_b = false;
        assert_eq!(regs.source_port(), (AddressMode::Increment, true));
        assert_eq!(regs.dest_port(), (AddressMode::Decrement, false));
    }

    #[test]
    fn default_cycle_pair_costs_six() {
        assert_eq!(DmaRegisters::power_on().byte_cycles(), 6);
    }
}
