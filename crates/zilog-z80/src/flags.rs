//! F register bits and flag lookup helpers.

/// Sign: bit 7 of the result.
pub const SF: u8 = 0x80;
/// Zero.
pub const ZF: u8 = 0x40;
/// Undocumented copy of result bit 5.
pub const YF: u8 = 0x20;
/// Half carry out of bit 3 (bit 11 for 16-bit arithmetic).
pub const HF: u8 = 0x10;
/// Undocumented copy of result bit 3.
pub const XF: u8 = 0x08;
/// Parity or overflow, depending on the instruction.
pub const PF: u8 = 0x04;
/// Set by subtractions, read by DAA.
pub const NF: u8 = 0x02;
/// Carry.
pub const CF: u8 = 0x01;

/// True when `value` has an even number of set bits.
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

/// S, Z and the two undocumented bits for a result byte.
#[must_use]
pub const fn sz53(value: u8) -> u8 {
    let zero = if value == 0 { ZF } else { 0 };
    (value & (SF | YF | XF)) | zero
}

/// [`sz53`] plus P/V as parity.
#[must_use]
pub const fn sz53p(value: u8) -> u8 {
    let p = if parity(value) { PF } else { 0 };
    sz53(value) | p
}
