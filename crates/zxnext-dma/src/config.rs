//! Construction-time configuration.

use crate::registers::DmaMode;

/// Configuration for creating a DMA controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaConfig {
    /// Personality at power-on and after `reset()`.
    pub initial_mode: DmaMode,
    /// CPU clock the returned T-state counts are measured against.
    pub cpu_clock_hz: u32,
    /// Clock the burst prescalar divides. 875 kHz on the Next.
    pub prescaler_clock_hz: u32,
}

impl DmaConfig {
    /// T-states to wait after a burst byte for the given prescalar.
    ///
    /// A prescalar of 0 paces like 1.
    #[must_use]
    pub fn prescaler_delay(&self, prescalar: u8) -> u32 {
        if self.prescaler_clock_hz == 0 {
            return 0;
        }
        let steps = u64::from(prescalar.max(1));
        let delay = steps * u64::from(self.cpu_clock_hz) / u64::from(self.prescaler_clock_hz);
        u32::try_from(delay).unwrap_or(u32::MAX)
    }
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self {
            initial_mode: DmaMode::Zxn,
            cpu_clock_hz: 3_500_000,
            prescaler_clock_hz: 875_000,
        }
    }
}
