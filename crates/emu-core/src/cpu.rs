//! CPU core trait.

/// How a reset was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Cold start: the machine also returns its units to power-on state.
    Power,
    /// Reset button: registers keep their contents apart from S, PC and I.
    Soft,
}

/// A CPU core driven one instruction at a time.
///
/// The bus is passed in rather than owned so the top-level assembler keeps
/// ownership of every unit and can inspect them between steps.
pub trait Cpu<B: ?Sized> {
    /// Execute one instruction, or one interrupt/reset sequence in its place.
    fn step(&mut self, bus: &mut B);

    /// Program counter.
    fn pc(&self) -> u16;

    /// Elapsed CPU cycles since construction (wrapping).
    fn cycles(&self) -> u64;

    /// Request a reset, serviced at the start of the next `step()`.
    fn request_reset(&mut self, kind: ResetKind);
}
