//! Arithmetic and logic on bytes and register pairs.
//!
//! Every operation returns the result together with the complete new F
//! value; the caller decides which of the old flags survive.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// Word result of a 16-bit add or subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WideResult {
    pub value: u16,
    pub flags: u8,
}

pub(crate) fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let sum = u16::from(a) + u16::from(b) + u16::from(carry);
    let value = sum as u8;
    let half = (a ^ b ^ value) & HF;
    let overflow = if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 { PF } else { 0 };
    AluResult {
        value,
        flags: sz53(value) | half | overflow | (sum >> 8) as u8 & CF,
    }
}

pub(crate) fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let diff = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(carry));
    let value = diff as u8;
    let half = (a ^ b ^ value) & HF;
    let overflow = if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 { PF } else { 0 };
    AluResult {
        value,
        flags: sz53(value) | half | overflow | NF | (diff >> 8) as u8 & CF,
    }
}

pub(crate) fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: sz53p(value) | HF }
}

pub(crate) fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: sz53p(value) }
}

pub(crate) fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: sz53p(value) }
}

/// Compare: a subtraction whose X/Y bits come from the operand.
pub(crate) fn cp8(a: u8, b: u8) -> AluResult {
    let diff = sub8(a, b, false);
    AluResult {
        value: a,
        flags: (diff.flags & !(YF | XF)) | (b & (YF | XF)),
    }
}

/// One of the eight accumulator operations, indexed by opcode bits 5-3.
pub(crate) fn accumulate(op: u8, a: u8, b: u8, f: u8) -> AluResult {
    let carry = f & CF != 0;
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        _ => cp8(a, b),
    }
}

pub(crate) fn inc8(v: u8, f: u8) -> AluResult {
    let value = v.wrapping_add(1);
    let half = if v & 0x0F == 0x0F { HF } else { 0 };
    let overflow = if v == 0x7F { PF } else { 0 };
    AluResult {
        value,
        flags: sz53(value) | half | overflow | (f & CF),
    }
}

pub(crate) fn dec8(v: u8, f: u8) -> AluResult {
    let value = v.wrapping_sub(1);
    let half = if v & 0x0F == 0 { HF } else { 0 };
    let overflow = if v == 0x80 { PF } else { 0 };
    AluResult {
        value,
        flags: sz53(value) | half | overflow | NF | (f & CF),
    }
}

/// CB-group rotate or shift, indexed by opcode bits 5-3:
/// RLC RRC RL RR SLA SRA SLL SRL.
pub(crate) fn shift(op: u8, v: u8, f: u8) -> AluResult {
    let carry_in = f & CF;
    let (value, carry) = match op & 7 {
        0 => (v.rotate_left(1), v >> 7),
        1 => (v.rotate_right(1), v & 1),
        2 => ((v << 1) | carry_in, v >> 7),
        3 => ((v >> 1) | (carry_in << 7), v & 1),
        4 => (v << 1, v >> 7),
        5 => ((v >> 1) | (v & 0x80), v & 1),
        6 => ((v << 1) | 1, v >> 7),
        _ => (v >> 1, v & 1),
    };
    AluResult {
        value,
        flags: sz53p(value) | carry,
    }
}

/// `ADD HL,rr`: S, Z and P/V are kept from `f`.
pub(crate) fn add16(a: u16, b: u16, f: u8) -> WideResult {
    let sum = u32::from(a) + u32::from(b);
    let value = sum as u16;
    let half = ((a ^ b ^ value) >> 8) as u8 & HF;
    WideResult {
        value,
        flags: (f & (SF | ZF | PF)) | ((value >> 8) as u8 & (YF | XF)) | half | (sum >> 16) as u8,
    }
}

pub(crate) fn adc16(a: u16, b: u16, f: u8) -> WideResult {
    let sum = u32::from(a) + u32::from(b) + u32::from(f & CF);
    let value = sum as u16;
    wide_flags(a, b, value, (sum >> 16) as u8 & CF, false)
}

pub(crate) fn sbc16(a: u16, b: u16, f: u8) -> WideResult {
    let diff = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(f & CF));
    let value = diff as u16;
    wide_flags(a, b, value, (diff >> 16) as u8 & CF, true)
}

fn wide_flags(a: u16, b: u16, value: u16, carry: u8, subtract: bool) -> WideResult {
    let high = (value >> 8) as u8;
    let half = ((a ^ b ^ value) >> 8) as u8 & HF;
    let same_sign = (a ^ b) & 0x8000 == 0;
    let overflow = if same_sign != subtract && (a ^ value) & 0x8000 != 0 { PF } else { 0 };
    let zero = if value == 0 { ZF } else { 0 };
    let n = if subtract { NF } else { 0 };
    WideResult {
        value,
        flags: (high & (SF | YF | XF)) | zero | half | overflow | n | carry,
    }
}

/// Decimal adjust after an add or subtract, as selected by N.
pub(crate) fn daa(a: u8, f: u8) -> AluResult {
    let low = a & 0x0F;
    let subtract = f & NF != 0;
    let mut correction = 0;
    let mut carry = f & CF;
    if f & HF != 0 || low > 9 {
        correction |= 0x06;
    }
    if carry != 0 || a > 0x99 {
        correction |= 0x60;
        carry = CF;
    }
    let (value, half) = if subtract {
        (a.wrapping_sub(correction), f & HF != 0 && low < 6)
    } else {
        (a.wrapping_add(correction), low > 9)
    };
    let half = if half { HF } else { 0 };
    AluResult {
        value,
        flags: sz53p(value) | (f & NF) | half | carry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_half_and_overflow() {
        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, SF | HF | PF);
        let r = add8(0xFF, 0x00, true);
        assert_eq!(r.value, 0);
        assert_eq!(r.flags, ZF | HF | CF);
    }

    #[test]
    fn sub_borrows() {
        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags, SF | YF | HF | XF | NF | CF);
        let r = sub8(0x80, 0x01, false);
        assert_eq!(r.flags & PF, PF);
    }

    #[test]
    fn compare_takes_undocumented_bits_from_operand() {
        let r = cp8(0x00, 0x28);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags & (YF | XF), YF | XF);
        assert_eq!(r.flags & CF, CF);
    }

    #[test]
    fn inc_dec_keep_carry() {
        assert_eq!(inc8(0x7F, CF).flags, SF | HF | PF | CF);
        assert_eq!(dec8(0x01, 0).flags, ZF | NF);
        assert_eq!(dec8(0x80, 0).flags & PF, PF);
    }

    #[test]
    fn shifts() {
        assert_eq!(shift(0, 0x81, 0).value, 0x03);
        assert_eq!(shift(2, 0x80, CF).value, 0x01);
        assert_eq!(shift(5, 0x81, 0).value, 0xC0);
        assert_eq!(shift(6, 0x00, 0).value, 0x01);
        assert_eq!(shift(7, 0x01, 0).flags, ZF | PF | CF);
    }

    #[test]
    fn wide_arithmetic() {
        let r = add16(0x0FFF, 0x0001, ZF);
        assert_eq!(r.value, 0x1000);
        assert_eq!(r.flags, ZF | HF);
        let r = sbc16(0x0000, 0x0000, CF);
        assert_eq!(r.value, 0xFFFF);
        assert_eq!(r.flags & (SF | NF | CF | HF), SF | NF | CF | HF);
        let r = adc16(0x7FFF, 0x0000, CF);
        assert_eq!(r.flags & (PF | SF), PF | SF);
        assert_eq!(sbc16(0x8000, 0x0001, 0).flags & PF, PF);
    }

    #[test]
    fn decimal_adjust() {
        // 0x15 + 0x27 = 0x3C -> 0x42
        assert_eq!(daa(0x3C, 0).value, 0x42);
        // 0x99 + 0x01 = 0x9A -> 0x00 with carry
        let r = daa(0x9A, 0);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags & (ZF | CF), ZF | CF);
        // 0x42 - 0x15 = 0x2D, H set -> 0x27
        assert_eq!(daa(0x2D, NF | HF).value, 0x27);
    }
}
