//! Seams to the output layer.
//!
//! Pixel rendering and sound synthesis live outside the timing core. A
//! machine hands completed frames to a [`FrameSink`] from inside its
//! dispatcher, and drives sound chips through [`AudioUnit`].

/// A completed picture, borrowed for the duration of delivery.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub width: usize,
    pub height: usize,
    /// ARGB pixels, row-major.
    pub pixels: &'a [u32],
    /// Frames completed since power-on, starting at 1.
    pub number: u64,
}

/// Receives frames synchronously as the picture unit completes them.
pub trait FrameSink {
    fn present(&mut self, frame: &Frame<'_>);
}

impl<F: FnMut(&Frame<'_>)> FrameSink for F {
    fn present(&mut self, frame: &Frame<'_>) {
        self(frame);
    }
}

/// A sound chip advanced in its own clock domain.
pub trait AudioUnit {
    /// Run the chip for `ticks` of its own clock.
    fn run(&mut self, ticks: u32);

    /// Register write from the CPU.
    fn write(&mut self, value: u8);
}

/// Stand-in sound chip for headless runs: counts ticks, keeps the last
/// register write.
#[derive(Debug, Clone, Default)]
pub struct HeadlessAudio {
    ticks: u64,
    last_write: Option<u8>,
}

impl HeadlessAudio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn last_write(&self) -> Option<u8> {
        self.last_write
    }
}

impl AudioUnit for HeadlessAudio {
    fn run(&mut self, ticks: u32) {
        self.ticks += u64::from(ticks);
    }

    fn write(&mut self, value: u8) {
        self.last_write = Some(value);
    }
}
