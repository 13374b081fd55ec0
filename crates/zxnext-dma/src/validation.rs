//! Host-side checks for code that programs the DMA directly.
//!
//! The port pipe never consults these: a Z80 program may rewrite registers
//! mid-transfer and the hardware lets it. Debuggers and loaders that want to
//! catch that call the `try_` entry points instead.

use std::fmt;

use crate::ZxnDma;
use crate::registers::DmaMode;
use crate::transfer::DmaState;
use crate::write_seq::WriteRegister;

/// Largest block a single transfer can describe.
pub const MAX_TRANSFER_SIZE: u32 = 0x1_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmaError {
    /// A register was written while a transfer was in progress.
    RegisterLocked {
        register: WriteRegister,
        state: DmaState,
    },
    /// Requested block size exceeds `MAX_TRANSFER_SIZE`.
    TransferTooLarge(u32),
}

impl fmt::Display for DmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterLocked { register, state } => {
                write!(f, "cannot write {register} while DMA is {state:?}")
            }
            Self::TransferTooLarge(size) => write!(
                f,
                "transfer of {size} bytes exceeds the {MAX_TRANSFER_SIZE} byte limit",
            ),
        }
    }
}

impl std::error::Error for DmaError {}

impl ZxnDma {
    /// Enabled and somewhere between ENABLE and block completion.
    #[must_use]
    pub fn is_transfer_active(&self) -> bool {
        self.regs.dma_enabled
            && matches!(
                self.state,
                DmaState::StartDma | DmaState::WaitingAck | DmaState::Transferring
            )
    }

    /// Check that `register` may be written now.
    ///
    /// # Errors
    ///
    /// `DmaError::RegisterLocked` while a transfer is active.
    pub fn validate_register_write(&self, register: WriteRegister) -> Result<(), DmaError> {
        if self.is_transfer_active() {
            return Err(DmaError::RegisterLocked {
                register,
                state: self.state,
            });
        }
        Ok(())
    }

    /// `write_register` that refuses to touch an active transfer.
    ///
    /// # Errors
    ///
    /// `DmaError::RegisterLocked` while a transfer is active. Nothing is
    /// written in that case.
    pub fn try_write_register(&mut self, register: WriteRegister, value: u8) -> Result<(), DmaError> {
        self.validate_register_write(register)?;
        self.write_register(register, value);
        Ok(())
    }

    /// Check a host-side block size before programming it.
    ///
    /// # Errors
    ///
    /// `DmaError::TransferTooLarge` above `MAX_TRANSFER_SIZE`.
    pub fn validate_transfer_size(size: u32) -> Result<(), DmaError> {
        if size > MAX_TRANSFER_SIZE {
            return Err(DmaError::TransferTooLarge(size));
        }
        Ok(())
    }

    /// Whether the byte counter has run past the programmed length.
    ///
    /// The legacy counter starts at $FFFF and wraps through zero, so it
    /// never reports.
    #[must_use]
    pub fn detect_counter_overflow(&self) -> bool {
        match self.mode {
            DmaMode::Legacy => false,
            DmaMode::Zxn => self.transfer.byte_counter >= self.regs.block_length,
        }
    }
}
