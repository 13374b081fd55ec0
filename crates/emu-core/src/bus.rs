//! Memory and I/O bus interfaces.

/// Memory bus interface.
///
/// Bus masters (CPUs, DMA controllers) reach memory through this trait. The
/// bus handles address decoding and paging; addresses wrap at 0x10000.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// I/O port bus interface.
///
/// Peripherals that decode only A0-A7 see an 8-bit port space, so a bus
/// master that drives ports this way addresses them with a `u8`.
pub trait IoBus {
    /// Read a byte from the given port.
    fn io_read(&mut self, port: u8) -> u8;

    /// Write a byte to the given port.
    fn io_write(&mut self, port: u8, value: u8);
}

/// Flat 64K RAM with a 256-byte port space.
///
/// No paging, no contention. Unmapped ports read back whatever was last
/// written to them (0xFF at power-on).
pub struct SimpleBus {
    /// Memory contents.
    pub memory: Box<[u8; 0x1_0000]>,
    /// Port latches.
    pub ports: [u8; 0x100],
    /// Every port write, in order.
    pub port_writes: Vec<(u8, u8)>,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x1_0000]),
            ports: [0xFF; 0x100],
            port_writes: Vec::new(),
        }
    }

    /// Copy `data` into memory starting at `address`, wrapping at 0xFFFF.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.memory[address.wrapping_add(i as u16) as usize] = byte;
        }
    }

    /// Read `len` bytes from `address` without side effects.
    #[must_use]
    pub fn peek_range(&self, address: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.memory[address.wrapping_add(i as u16) as usize])
            .collect()
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

impl IoBus for SimpleBus {
    fn io_read(&mut self, port: u8) -> u8 {
        self.ports[port as usize]
    }

    fn io_write(&mut self, port: u8, value: u8) {
        self.ports[port as usize] = value;
        self.port_writes.push((port, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFE, &[1, 2, 3]);
        assert_eq!(bus.read(0xFFFE), 1);
        assert_eq!(bus.read(0xFFFF), 2);
        assert_eq!(bus.read(0x0000), 3);
    }

    #[test]
    fn port_writes_are_latched_and_logged() {
        let mut bus = SimpleBus::new();
        assert_eq!(bus.io_read(0xFE), 0xFF, "unwritten ports float high");
        bus.io_write(0xFE, 0x07);
        bus.io_write(0xFE, 0x00);
        assert_eq!(bus.io_read(0xFE), 0x00);
        assert_eq!(bus.port_writes, vec![(0xFE, 0x07), (0xFE, 0x00)]);
    }
}
