//! WR6 command processor.
//!
//! Commands execute as soon as their byte is written. Opcodes the Next
//! doesn't implement (interrupt control, force ready, the search commands)
//! are accepted and do nothing.

use crate::ZxnDma;
use crate::read_seq::ReadSequence;
use crate::registers::{CycleLength, DmaMode};
use crate::transfer::{DmaState, StatusFlags};
use crate::write_seq::WriteSequence;

const CMD_INITIALIZE_READ_SEQUENCE: u8 = 0xA7;
const CMD_REINITIALIZE_STATUS_BYTE: u8 = 0x8B;
const CMD_DISABLE_DMA: u8 = 0x83;
const CMD_ENABLE_DMA: u8 = 0x87;
const CMD_READ_MASK_FOLLOWS: u8 = 0xBB;
const CMD_READ_STATUS_BYTE: u8 = 0xBF;
const CMD_RESET: u8 = 0xC3;
const CMD_RESET_PORT_A_TIMING: u8 = 0xC7;
const CMD_RESET_PORT_B_TIMING: u8 = 0xCB;
const CMD_LOAD: u8 = 0xCF;
const CMD_CONTINUE: u8 = 0xD3;

/// A WR6 command the controller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    ResetPortATiming,
    ResetPortBTiming,
    Load,
    Continue,
    DisableDma,
    EnableDma,
    ReadMaskFollows,
    InitializeReadSequence,
    ReinitializeStatusByte,
    ReadStatusByte,
}

impl Command {
    /// Decode a WR6 byte. `None` for opcodes with no effect here.
    #[must_use]
    pub fn decode(value: u8) -> Option<Self> {
        Some(match value {
            CMD_RESET => Self::Reset,
            CMD_RESET_PORT_A_TIMING => Self::ResetPortATiming,
            CMD_RESET_PORT_B_TIMING => Self::ResetPortBTiming,
            CMD_LOAD => Self::Load,
            CMD_CONTINUE => Self::Continue,
            CMD_DISABLE_DMA => Self::DisableDma,
            CMD_ENABLE_DMA => Self::EnableDma,
            CMD_READ_MASK_FOLLOWS => Self::ReadMaskFollows,
            CMD_INITIALIZE_READ_SEQUENCE => Self::InitializeReadSequence,
            CMD_REINITIALIZE_STATUS_BYTE => Self::ReinitializeStatusByte,
            CMD_READ_STATUS_BYTE => Self::ReadStatusByte,
            _ => return None,
        })
    }

    #[must_use]
    pub fn opcode(self) -> u8 {
        match self {
            Self::Reset => CMD_RESET,
            Self::ResetPortATiming => CMD_RESET_PORT_A_TIMING,
            Self::ResetPortBTiming => CMD_RESET_PORT_B_TIMING,
            Self::Load => CMD_LOAD,
            Self::Continue => CMD_CONTINUE,
            Self::DisableDma => CMD_DISABLE_DMA,
            Self::EnableDma => CMD_ENABLE_DMA,
            Self::ReadMaskFollows => CMD_READ_MASK_FOLLOWS,
            Self::InitializeReadSequence => CMD_INITIALIZE_READ_SEQUENCE,
            Self::ReinitializeStatusByte => CMD_REINITIALIZE_STATUS_BYTE,
            Self::ReadStatusByte => CMD_READ_STATUS_BYTE,
        }
    }
}

impl ZxnDma {
    /// Issue a command as if its opcode had been written to WR6.
    pub fn command(&mut self, command: Command) {
        log::debug!("DMA command {command:?}");

        match command {
            Command::Reset => {
                let regs = &mut self.regs;
                regs.direction_a_to_b = true;
                regs.port_a_cycle_length = CycleLength::Cycles3;
                regs.port_b_cycle_length = CycleLength::Cycles3;
                regs.port_b_prescalar = 0;
                regs.ce_wait_multiplexed = false;
                regs.auto_restart = false;
                regs.dma_enabled = false;
                self.prescalar_timer = 0;
                self.status = StatusFlags::power_on();
                self.state = DmaState::Idle;
                self.write_seq = WriteSequence::Idle;
                self.release_bus();
            }
            Command::ResetPortATiming => {
                self.regs.port_a_cycle_length = CycleLength::Cycles3;
            }
            Command::ResetPortBTiming => {
                self.regs.port_b_cycle_length = CycleLength::Cycles3;
                self.regs.port_b_prescalar = 0;
                self.prescalar_timer = 0;
            }
            Command::Load => {
                self.load_addresses();
                self.transfer.byte_counter = 0;
                self.block_progress = 0;
            }
            Command::Continue => {
                self.transfer.byte_counter = 0;
                self.block_progress = 0;
            }
            Command::DisableDma => {
                self.regs.dma_enabled = false;
                self.state = DmaState::Idle;
                self.release_bus();
            }
            Command::EnableDma => {
                self.regs.dma_enabled = true;
                self.seed_counter();
                self.block_progress = 0;
                self.state = DmaState::StartDma;
            }
            Command::ReadMaskFollows => self.write_seq = WriteSequence::ReadMask,
            Command::InitializeReadSequence | Command::ReadStatusByte => {
                self.read_seq = ReadSequence::Status;
            }
            Command::ReinitializeStatusByte => {
                self.read_seq = ReadSequence::Status;
                self.status = StatusFlags::power_on();
            }
        }
    }

    pub(crate) fn execute_command(&mut self, value: u8) {
        match Command::decode(value) {
            Some(command) => self.command(command),
            None => log::trace!("DMA ignoring WR6 {value:#04X}"),
        }
    }

    /// Copy the port start addresses into the transfer pointers, by direction.
    pub(crate) fn load_addresses(&mut self) {
        let (source, dest) = if self.regs.direction_a_to_b {
            (self.regs.port_a_start_address, self.regs.port_b_start_address)
        } else {
            (self.regs.port_b_start_address, self.regs.port_a_start_address)
        };
        self.transfer.source_address = source;
        self.transfer.dest_address = dest;
    }

    /// Counter value a freshly started block counts up from.
    pub(crate) fn seed_counter(&mut self) {
        self.transfer.byte_counter = match self.mode {
            DmaMode::Legacy => 0xFFFF,
            DmaMode::Zxn => 0x0000,
        };
    }
}
