//! Transfer engine and bus arbitration.
//!
//! Every byte is a read cycle from the source port followed by a write
//! cycle to the destination port. Three drivers sit on top:
//!
//! - `execute_continuous_transfer` moves the rest of the block in one call.
//! - `execute_burst_transfer` moves as many bytes as a T-state budget pays
//!   for and picks up where it stopped on the next call.
//! - `step_dma` is called once per CPU instruction boundary and runs the
//!   BUSREQ/BUSACK handshake, moving at most one byte per call.

use emu_core::{Bus, IoBus};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ZxnDma;
use crate::registers::{DmaMode, TransferMode};

/// Live transfer pointers and counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransferState {
    pub source_address: u16,
    pub dest_address: u16,
    /// Counts up once per byte, wrapping at 0x10000.
    pub byte_counter: u16,
    /// Byte latched by the last read cycle.
    pub data_byte: u8,
}

/// Flags reported in the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusFlags {
    pub end_of_block_reached: bool,
    pub at_least_one_byte_transferred: bool,
}

impl StatusFlags {
    /// Power-on flags: no block in progress, nothing moved.
    #[must_use]
    pub fn power_on() -> Self {
        Self {
            end_of_block_reached: true,
            at_least_one_byte_transferred: false,
        }
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::power_on()
    }
}

/// Stepped-execution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DmaState {
    /// Nothing to do.
    Idle,
    /// Enabled, bus not yet requested.
    StartDma,
    /// BUSREQ raised, waiting for the CPU's BUSACK.
    WaitingAck,
    /// Bus held, moving bytes.
    Transferring,
}

/// BUSREQ/BUSACK lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusControl {
    pub bus_requested: bool,
    pub bus_acknowledged: bool,
}

impl ZxnDma {
    /// Bytes a full block moves under the current personality.
    #[must_use]
    pub fn effective_block_length(&self) -> u32 {
        let length = u32::from(self.regs.block_length);
        match self.mode {
            DmaMode::Legacy => length + 1,
            DmaMode::Zxn => length,
        }
    }

    /// Read one byte from the source and latch it.
    pub fn perform_read_cycle<B: Bus + IoBus>(&mut self, bus: &mut B) -> u8 {
        let (_, is_io) = self.regs.source_port();
        let address = self.transfer.source_address;
        let value = if is_io {
            bus.io_read(address as u8)
        } else {
            bus.read(address)
        };
        self.transfer.data_byte = value;
        value
    }

    /// Write the latched byte to the destination, then step both addresses
    /// and the counter.
    pub fn perform_write_cycle<B: Bus + IoBus>(&mut self, bus: &mut B) {
        let (source_mode, _) = self.regs.source_port();
        let (dest_mode, is_io) = self.regs.dest_port();
        let address = self.transfer.dest_address;
        let value = self.transfer.data_byte;
        if is_io {
            bus.io_write(address as u8, value);
        } else {
            bus.write(address, value);
        }
        log::trace!(
            "DMA {:#06X} -> {address:#06X}: {value:#04X}",
            self.transfer.source_address
        );

        self.transfer.source_address = source_mode.step(self.transfer.source_address);
        self.transfer.dest_address = dest_mode.step(address);
        self.transfer.byte_counter = self.transfer.byte_counter.wrapping_add(1);
        self.block_progress = self.block_progress.saturating_add(1);
        self.status.at_least_one_byte_transferred = true;
        self.status.end_of_block_reached = false;
    }

    /// Move the rest of the block. Returns the number of bytes moved.
    pub fn execute_continuous_transfer<B: Bus + IoBus>(&mut self, bus: &mut B) -> u32 {
        if !self.regs.dma_enabled {
            return 0;
        }

        self.state = DmaState::Transferring;
        let mut moved = 0;
        while !self.block_complete() {
            self.transfer_byte(bus);
            moved += 1;
        }
        self.finish_block();
        moved
    }

    /// Move bytes until the block completes or `budget` T-states can't pay
    /// for another one. Returns the number of bytes moved.
    pub fn execute_burst_transfer<B: Bus + IoBus>(&mut self, bus: &mut B, budget: u32) -> u32 {
        if !self.regs.dma_enabled
            || self.regs.transfer_mode == TransferMode::Continuous
            || budget == 0
        {
            return 0;
        }

        let cost = self.regs.byte_cycles();
        let mut remaining = budget;
        let mut moved = 0;
        while !self.block_complete() && remaining >= cost {
            self.transfer_byte(bus);
            remaining -= cost;
            moved += 1;
        }

        if self.block_complete() {
            self.finish_block();
        } else if moved > 0 {
            self.state = DmaState::Transferring;
        }
        moved
    }

    /// Advance stepped execution by one CPU instruction boundary.
    ///
    /// Returns the T-states the CPU loses to the DMA: the cycle cost of a
    /// continuous-mode byte, or the prescalar delay after a burst-mode byte.
    /// Handshake steps and completion cost nothing.
    pub fn step_dma<B: Bus + IoBus>(&mut self, bus: &mut B) -> u32 {
        if !self.regs.dma_enabled || self.state == DmaState::Idle {
            return 0;
        }

        if !self.bus.bus_requested {
            if self.block_complete() {
                // Zero-length block, or the bus was dropped after the last byte.
                self.finish_block();
                return 0;
            }
            self.request_bus();
            return 0;
        }
        if !self.bus.bus_acknowledged {
            return 0;
        }
        if self.block_complete() {
            self.finish_block();
            return 0;
        }

        self.state = DmaState::Transferring;
        self.transfer_byte(bus);

        match self.regs.transfer_mode {
            TransferMode::Continuous => self.regs.byte_cycles(),
            TransferMode::Burst => {
                let delay = self.config.prescaler_delay(self.regs.port_b_prescalar);
                self.prescalar_timer = delay;
                self.release_bus();
                self.state = DmaState::StartDma;
                delay
            }
        }
    }

    /// Raise BUSREQ.
    pub fn request_bus(&mut self) {
        self.bus.bus_requested = true;
        self.prescalar_timer = 0;
        self.state = DmaState::WaitingAck;
    }

    /// The CPU grants the bus. Ignored unless BUSREQ is raised.
    pub fn acknowledge_bus(&mut self) {
        if self.bus.bus_requested {
            self.bus.bus_acknowledged = true;
        }
    }

    /// Drop BUSREQ and BUSACK.
    pub fn release_bus(&mut self) {
        self.bus = BusControl::default();
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn block_complete(&self) -> bool {
        self.block_progress >= self.effective_block_length()
    }

    fn transfer_byte<B: Bus + IoBus>(&mut self, bus: &mut B) {
        self.perform_read_cycle(bus);
        self.perform_write_cycle(bus);
    }

    fn finish_block(&mut self) {
        log::debug!(
            "DMA block complete: {} bytes, counter {:#06X}",
            self.block_progress,
            self.transfer.byte_counter
        );
        self.status.end_of_block_reached = true;
        self.state = DmaState::Idle;
        self.release_bus();

        if self.regs.auto_restart {
            self.load_addresses();
            self.seed_counter();
            self.block_progress = 0;
            self.state = DmaState::StartDma;
        }
    }
}
