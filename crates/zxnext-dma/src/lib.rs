//! ZX Spectrum Next DMA controller.
//!
//! The device owns its registers and reaches memory and I/O only through
//! the `emu-core` bus traits handed to each transfer call.
//!
//! The Next's DMA is a Zilog Z80 DMA work-alike with two personalities,
//! selected by the port the CPU addresses:
//!
//! - **Port $0B**: Z80 DMA compatible. A block of length N moves N + 1
//!   bytes and ENABLE seeds the byte counter with $FFFF.
//! - **Port $6B**: zxnDMA. A block of length N moves exactly N bytes and
//!   ENABLE seeds the counter with 0.
//!
//! # Register interface
//!
//! Each port is a single byte pipe. Writes are decoded by the write
//! sequencer into WR0-WR6; base bytes that announce trailing fields keep
//! the sequencer busy until the tail has arrived. Reads return the status
//! byte, counter and port addresses in a mask-filtered cyclic order.
//!
//! # State machine
//!
//! Idle → (ENABLE) StartDma → (BUSREQ) WaitingAck → (BUSACK) Transferring
//! → block complete → Idle. Hosts that don't model bus arbitration skip the
//! handshake with `execute_continuous_transfer` or `execute_burst_transfer`.

pub mod commands;
pub mod config;
pub mod read_seq;
pub mod registers;
pub mod transfer;
pub mod validation;
pub mod write_seq;

use emu_core::{Observable, Value};

pub use commands::Command;
pub use config::DmaConfig;
pub use read_seq::{ReadMask, ReadSequence};
pub use registers::{
    AddressMode, CycleLength, DmaMode, DmaRegisters, TimingParameters, TransferMode,
};
pub use transfer::{BusControl, DmaState, StatusFlags, TransferState};
pub use validation::{DmaError, MAX_TRANSFER_SIZE};
pub use write_seq::{WriteRegister, WriteSequence};

/// Z80 DMA compatible port (low byte of the 16-bit port address).
pub const LEGACY_PORT: u8 = 0x0B;

/// zxnDMA port (low byte of the 16-bit port address).
pub const ZXN_PORT: u8 = 0x6B;

/// Personality selected by a port address, or `None` if the DMA doesn't
/// decode it.
#[must_use]
pub fn port_mode(port: u16) -> Option<DmaMode> {
    match port as u8 {
        LEGACY_PORT => Some(DmaMode::Legacy),
        ZXN_PORT => Some(DmaMode::Zxn),
        _ => None,
    }
}

/// ZX Spectrum Next DMA controller.
pub struct ZxnDma {
    config: DmaConfig,
    /// Personality of the port last touched.
    mode: DmaMode,
    regs: DmaRegisters,
    transfer: TransferState,
    status: StatusFlags,
    read_mask: ReadMask,
    /// Next field a data-port read returns.
    read_seq: ReadSequence,
    /// Field the next written byte fills, or idle.
    write_seq: WriteSequence,
    state: DmaState,
    bus: BusControl,
    /// Pacing delay (T-states) owed after the last burst byte.
    prescalar_timer: u32,
    /// Bytes moved since the block was last started by ENABLE, LOAD or
    /// CONTINUE.
    block_progress: u32,
}

impl ZxnDma {
    /// Create a DMA controller with the Next's default clocks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DmaConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DmaConfig) -> Self {
        Self {
            config,
            mode: config.initial_mode,
            regs: DmaRegisters::power_on(),
            transfer: TransferState::default(),
            status: StatusFlags::power_on(),
            read_mask: ReadMask::all(),
            read_seq: ReadSequence::Status,
            write_seq: WriteSequence::Idle,
            state: DmaState::Idle,
            bus: BusControl::default(),
            prescalar_timer: 0,
            block_progress: 0,
        }
    }

    /// Restore every register and sequencer to its power-on value.
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config);
    }

    /// CPU OUT to a DMA port. Ports the DMA doesn't decode are ignored.
    pub fn write_port(&mut self, port: u16, value: u8) {
        if let Some(mode) = port_mode(port) {
            self.select_mode(mode);
            self.write_byte(value);
        }
    }

    /// CPU IN from a DMA port. Returns `None` for ports the DMA doesn't
    /// decode, so the caller can supply the floating bus value.
    pub fn read_port(&mut self, port: u16) -> Option<u8> {
        let mode = port_mode(port)?;
        self.select_mode(mode);
        Some(self.read_byte())
    }

    #[must_use]
    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    #[must_use]
    pub fn dma_mode(&self) -> DmaMode {
        self.mode
    }

    /// Force the personality without a port access.
    pub fn set_dma_mode(&mut self, mode: DmaMode) {
        self.select_mode(mode);
    }

    #[must_use]
    pub fn registers(&self) -> DmaRegisters {
        self.regs
    }

    #[must_use]
    pub fn transfer_state(&self) -> TransferState {
        self.transfer
    }

    #[must_use]
    pub fn status_flags(&self) -> StatusFlags {
        self.status
    }

    #[must_use]
    pub fn timing_parameters(&self) -> TimingParameters {
        self.regs.timing()
    }

    #[must_use]
    pub fn read_sequence(&self) -> ReadSequence {
        self.read_seq
    }

    #[must_use]
    pub fn read_mask(&self) -> ReadMask {
        self.read_mask
    }

    #[must_use]
    pub fn write_sequence(&self) -> WriteSequence {
        self.write_seq
    }

    #[must_use]
    pub fn dma_state(&self) -> DmaState {
        self.state
    }

    #[must_use]
    pub fn bus_control(&self) -> BusControl {
        self.bus
    }

    #[must_use]
    pub fn prescalar_timer(&self) -> u32 {
        self.prescalar_timer
    }

    /// Point the transfer at a new source without a LOAD.
    pub fn set_source_address(&mut self, address: u16) {
        self.transfer.source_address = address;
    }

    /// Point the transfer at a new destination without a LOAD.
    pub fn set_dest_address(&mut self, address: u16) {
        self.transfer.dest_address = address;
    }

    /// Set the enable bit directly. Unlike ENABLE_DMA this leaves the
    /// counter and transfer state alone.
    pub fn set_dma_enabled(&mut self, enabled: bool) {
        self.regs.dma_enabled = enabled;
        if !enabled {
            self.state = DmaState::Idle;
            self.release_bus();
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn select_mode(&mut self, mode: DmaMode) {
        if self.mode != mode {
            log::debug!("DMA personality {:?} -> {mode:?}", self.mode);
            self.mode = mode;
        }
    }
}

impl Default for ZxnDma {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for ZxnDma {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("port_a.") {
            match rest {
                "address" => Some(self.regs.port_a_start_address.into()),
                "mode" => Some(format!("{:?}", self.regs.port_a_address_mode).into()),
                "io" => Some(self.regs.port_a_is_io.into()),
                "cycles" => Some(self.regs.port_a_cycle_length.t_states().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("port_b.") {
            match rest {
                "address" => Some(self.regs.port_b_start_address.into()),
                "mode" => Some(format!("{:?}", self.regs.port_b_address_mode).into()),
                "io" => Some(self.regs.port_b_is_io.into()),
                "cycles" => Some(self.regs.port_b_cycle_length.t_states().into()),
                "prescalar" => Some(self.regs.port_b_prescalar.into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("transfer.") {
            match rest {
                "source" => Some(self.transfer.source_address.into()),
                "dest" => Some(self.transfer.dest_address.into()),
                "counter" => Some(self.transfer.byte_counter.into()),
                "data" => Some(self.transfer.data_byte.into()),
                "length" => Some(self.effective_block_length().into()),
                "progress" => Some(self.block_progress.into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("status.") {
            match rest {
                "end_of_block" => Some(self.status.end_of_block_reached.into()),
                "transferred" => Some(self.status.at_least_one_byte_transferred.into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("bus.") {
            match rest {
                "requested" => Some(self.bus.bus_requested.into()),
                "acknowledged" => Some(self.bus.bus_acknowledged.into()),
                _ => None,
            }
        } else {
            match path {
                "mode" => Some(format!("{:?}", self.mode).into()),
                "state" => Some(format!("{:?}", self.state).into()),
                "enabled" => Some(self.regs.dma_enabled.into()),
                "direction" => Some(if self.regs.direction_a_to_b { "A->B" } else { "B->A" }.into()),
                "block_length" => Some(self.regs.block_length.into()),
                "transfer_mode" => Some(format!("{:?}", self.regs.transfer_mode).into()),
                "auto_restart" => Some(self.regs.auto_restart.into()),
                "status" => Some(self.status_byte().into()),
                "read.mask" => Some(self.read_mask.bits().into()),
                "read.cursor" => Some(format!("{:?}", self.read_seq).into()),
                "write.sequence" => Some(format!("{:?}", self.write_seq).into()),
                "prescalar_timer" => Some(self.prescalar_timer.into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "mode",
            "state",
            "enabled",
            "direction",
            "block_length",
            "transfer_mode",
            "auto_restart",
            "status",
            "port_a.address",
            "port_a.mode",
            "port_a.io",
            "port_a.cycles",
            "port_b.address",
            "port_b.mode",
            "port_b.io",
            "port_b.cycles",
            "port_b.prescalar",
            "transfer.source",
            "transfer.dest",
            "transfer.counter",
            "transfer.data",
            "transfer.length",
            "transfer.progress",
            "status.end_of_block",
            "status.transferred",
            "read.mask",
            "read.cursor",
            "write.sequence",
            "bus.requested",
            "bus.acknowledged",
            "prescalar_timer",
        ]
    }
}
