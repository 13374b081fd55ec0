//! Core traits shared by chip emulators.
//!
//! Chips never own the memory map or the port space. They reach both through
//! the bus traits here, and expose their internals through `Observable`.

mod bus;
mod observable;

pub use bus::{Bus, IoBus, SimpleBus};
pub use observable::{Observable, Value};
