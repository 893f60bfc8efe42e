//! Bus adapter traits supplied to CPU cores.

use crate::{InterruptLines, ResetKind};

/// Memory bus interface.
///
/// Every call is one bus cycle as seen by the rest of the machine. Reads
/// must carry the side effects of the device being read even when the CPU
/// discards the value (dummy reads).
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// Separate I/O port space (Z80 `IN`/`OUT`).
pub trait IoBus {
    fn port_in(&mut self, port: u8) -> u8;

    fn port_out(&mut self, port: u8, value: u8);
}

/// Cycle accounting and peripheral catch-up.
///
/// The core charges cycles with [`add_cycles`](Self::add_cycles) as soon as
/// it knows an instruction will consume them, then calls
/// [`synchronize`](Self::synchronize) with the number of charged cycles that
/// have *not* elapsed yet. The implementation runs every dependent unit up
/// to "charged minus `extra`" in that unit's own clock domain.
pub trait Synchronize {
    /// Charge `cycles` CPU cycles to the machine timebase.
    fn add_cycles(&mut self, cycles: u8);

    /// Run dependent units up to the current cycle minus `extra`.
    ///
    /// Called with a zero delta more often than not; implementations must
    /// treat that as cheap. Negative values are treated as zero.
    fn synchronize(&mut self, extra: i32);

    /// Interrupt lines the CPU polls.
    fn interrupts(&mut self) -> &mut InterruptLines;

    /// Hook fired when the CPU services a reset request.
    fn on_reset(&mut self, _kind: ResetKind) {}
}
