//! Sega Master System video display processor.
//!
//! A timing model of the 315-5124/5246: the horizontal unit counter, the
//! line and V counters, the frame and line interrupts, and the two CPU
//! ports with VRAM and CRAM behind them. Tiles and sprites are not
//! composed; each active line is filled with the backdrop colour.
//!
//! # Ports
//!
//! | Port     | Read                     | Write                        |
//! |----------|--------------------------|------------------------------|
//! | Data     | Buffered VRAM read       | VRAM or CRAM write            |
//! | Control  | Status (clears flags)    | Address/code/register, 2 bytes |
//!
//! # Timing
//!
//! The VDP is clocked in units of master/5, three per Z80 cycle. A line
//! is 684 units, counted from -94 to 589 so that the H counter (`unit / 4`)
//! reads 0 at the start of the active display.

mod timing;
mod vdp;

pub use timing::VdpTiming;
pub use vdp::{FB_WIDTH, Vdp};
