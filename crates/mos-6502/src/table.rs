//! Opcode decode table.
//!
//! Three 16-per-row tables (mnemonic, addressing mode, base cycles) are
//! folded into [`OPCODES`] at compile time. Dispatch is a single index.
//!
//! Base cycles include the opcode fetch and every fixed bus cycle of the
//! addressing mode. Read-class indexed modes add one more on a page
//! crossing; write and read-modify-write forms already pay for the fix-up
//! cycle in their base count.

/// Instruction mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial. Everything below `Jam` runs as a timing stub.
    Jam, Slo, Rla, Sre, Rra, Sax, Lax, Dcp, Isc, Anc, Alr, Arr, Xaa, Axs,
    Ahx, Shx, Shy, Tas, Las,
}

impl Mnemonic {
    /// True for unofficial operations whose architectural effect is not
    /// modelled: they perform their addressing-mode bus cycles and consume
    /// their base cycle count, nothing more.
    #[must_use]
    pub const fn is_stub(self) -> bool {
        matches!(
            self,
            Self::Slo | Self::Rla | Self::Sre | Self::Rra | Self::Sax | Self::Lax
                | Self::Dcp | Self::Isc | Self::Anc | Self::Alr | Self::Arr | Self::Xaa
                | Self::Axs | Self::Ahx | Self::Shx | Self::Shy | Self::Tas | Self::Las
        )
    }

    /// Operations that fetch their own operands so they can poll for
    /// interrupts between operand bytes.
    #[must_use]
    pub const fn fetches_own_operand(self) -> bool {
        matches!(
            self,
            Self::Brk | Self::Jsr | Self::Jmp | Self::Rti | Self::Rts
                | Self::Bcc | Self::Bcs | Self::Beq | Self::Bmi | Self::Bne
                | Self::Bpl | Self::Bvc | Self::Bvs
        )
    }
}

/// Addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    /// abs,X for reads: dummy read and +1 cycle only on page crossing.
    AbsoluteX,
    /// abs,X for writes and RMW: dummy read always.
    AbsoluteXWrite,
    AbsoluteY,
    AbsoluteYWrite,
    /// (zp,X)
    IndirectX,
    /// (zp),Y for reads.
    IndirectY,
    /// (zp),Y for writes and RMW.
    IndirectYWrite,
    Relative,
    /// JMP (abs)
    Indirect,
}

/// One decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    /// Base cycle count, opcode fetch included.
    pub cycles: u8,
}

impl Opcode {
    /// True for the 151 documented NMOS opcodes.
    #[must_use]
    pub const fn is_documented(&self, byte: u8) -> bool {
        match self.mnemonic {
            Mnemonic::Nop => byte == 0xEA,
            Mnemonic::Sbc => byte != 0xEB,
            m => !m.is_stub() && !matches!(m, Mnemonic::Jam),
        }
    }
}

const IMP: Mode = Mode::Implied;
const ACC: Mode = Mode::Accumulator;
const IMM: Mode = Mode::Immediate;
const ZP: Mode = Mode::ZeroPage;
const ZPX: Mode = Mode::ZeroPageX;
const ZPY: Mode = Mode::ZeroPageY;
const ABS: Mode = Mode::Absolute;
const ABX: Mode = Mode::AbsoluteX;
const AXW: Mode = Mode::AbsoluteXWrite;
const ABY: Mode = Mode::AbsoluteY;
const AYW: Mode = Mode::AbsoluteYWrite;
const IZX: Mode = Mode::IndirectX;
const IZY: Mode = Mode::IndirectY;
const IYW: Mode = Mode::IndirectYWrite;
const REL: Mode = Mode::Relative;
const IND: Mode = Mode::Indirect;

#[rustfmt::skip]
const MODES: [Mode; 256] = [
    IMP, IZX, IMP, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 0x00
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0x10
    ABS, IZX, IMP, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 0x20
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0x30
    IMP, IZX, IMP, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, ACC, IMM, ABS, ABS, ABS, ABS, // 0x40
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0x50
    IMP, IZX, IMP, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, ACC, IMM, IND, ABS, ABS, ABS, // 0x60
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0x70
    IMM, IZX, IMM, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 0x80
    REL, IYW, IMP, IYW, ZPX, ZPX, ZPY, ZPY, IMP, AYW, IMP, AYW, AXW, AXW, AYW, AYW, // 0x90
    IMM, IZX, IMM, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 0xA0
    REL, IZY, IMP, IZY, ZPX, ZPX, ZPY, ZPY, IMP, ABY, IMP, ABY, ABX, ABX, ABY, ABY, // 0xB0
    IMM, IZX, IMM, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 0xC0
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0xD0
    IMM, IZX, IMM, IZX, ZP,  ZP,  ZP,  ZP,  IMP, IMM, IMP, IMM, ABS, ABS, ABS, ABS, // 0xE0
    REL, IZY, IMP, IYW, ZPX, ZPX, ZPX, ZPX, IMP, ABY, IMP, AYW, ABX, ABX, AXW, AXW, // 0xF0
];

#[rustfmt::skip]
const CYCLES: [u8; 256] = [
    7, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 0x00
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x10
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 0x20
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x30
    6, 6, 2, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 0x40
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x50
    6, 6, 2, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 0x60
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x70
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0x80
    2, 6, 2, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 0x90
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0xA0
    2, 5, 2, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // 0xB0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xC0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xD0
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xE0
    2, 5, 2, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xF0
];

use Mnemonic as M;

#[rustfmt::skip]
const MNEMONICS: [Mnemonic; 256] = [
    M::Brk, M::Ora, M::Jam, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo, M::Php, M::Ora, M::Asl, M::Anc, M::Nop, M::Ora, M::Asl, M::Slo,
    M::Bpl, M::Ora, M::Jam, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo, M::Clc, M::Ora, M::Nop, M::Slo, M::Nop, M::Ora, M::Asl, M::Slo,
    M::Jsr, M::And, M::Jam, M::Rla, M::Bit, M::And, M::Rol, M::Rla, M::Plp, M::And, M::Rol, M::Anc, M::Bit, M::And, M::Rol, M::Rla,
    M::Bmi, M::And, M::Jam, M::Rla, M::Nop, M::And, M::Rol, M::Rla, M::Sec, M::And, M::Nop, M::Rla, M::Nop, M::And, M::Rol, M::Rla,
    M::Rti, M::Eor, M::Jam, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre, M::Pha, M::Eor, M::Lsr, M::Alr, M::Jmp, M::Eor, M::Lsr, M::Sre,
    M::Bvc, M::Eor, M::Jam, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre, M::Cli, M::Eor, M::Nop, M::Sre, M::Nop, M::Eor, M::Lsr, M::Sre,
    M::Rts, M::Adc, M::Jam, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra, M::Pla, M::Adc, M::Ror, M::Arr, M::Jmp, M::Adc, M::Ror, M::Rra,
    M::Bvs, M::Adc, M::Jam, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra, M::Sei, M::Adc, M::Nop, M::Rra, M::Nop, M::Adc, M::Ror, M::Rra,
    M::Nop, M::Sta, M::Nop, M::Sax, M::Sty, M::Sta, M::Stx, M::Sax, M::Dey, M::Nop, M::Txa, M::Xaa, M::Sty, M::Sta, M::Stx, M::Sax,
    M::Bcc, M::Sta, M::Jam, M::Ahx, M::Sty, M::Sta, M::Stx, M::Sax, M::Tya, M::Sta, M::Txs, M::Tas, M::Shy, M::Sta, M::Shx, M::Ahx,
    M::Ldy, M::Lda, M::Ldx, M::Lax, M::Ldy, M::Lda, M::Ldx, M::Lax, M::Tay, M::Lda, M::Tax, M::Lax, M::Ldy, M::Lda, M::Ldx, M::Lax,
    M::Bcs, M::Lda, M::Jam, M::Lax, M::Ldy, M::Lda, M::Ldx, M::Lax, M::Clv, M::Lda, M::Tsx, M::Las, M::Ldy, M::Lda, M::Ldx, M::Lax,
    M::Cpy, M::Cmp, M::Nop, M::Dcp, M::Cpy, M::Cmp, M::Dec, M::Dcp, M::Iny, M::Cmp, M::Dex, M::Axs, M::Cpy, M::Cmp, M::Dec, M::Dcp,
    M::Bne, M::Cmp, M::Jam, M::Dcp, M::Nop, M::Cmp, M::Dec, M::Dcp, M::Cld, M::Cmp, M::Nop, M::Dcp, M::Nop, M::Cmp, M::Dec, M::Dcp,
    M::Cpx, M::Sbc, M::Nop, M::Isc, M::Cpx, M::Sbc, M::Inc, M::Isc, M::Inx, M::Sbc, M::Nop, M::Sbc, M::Cpx, M::Sbc, M::Inc, M::Isc,
    M::Beq, M::Sbc, M::Jam, M::Isc, M::Nop, M::Sbc, M::Inc, M::Isc, M::Sed, M::Sbc, M::Nop, M::Isc, M::Nop, M::Sbc, M::Inc, M::Isc,
];

const fn build() -> [Opcode; 256] {
    let mut table = [Opcode {
        mnemonic: Mnemonic::Jam,
        mode: Mode::Implied,
        cycles: 2,
    }; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = Opcode {
            mnemonic: MNEMONICS[i],
            mode: MODES[i],
            cycles: CYCLES[i],
        };
        i += 1;
    }
    table
}

/// Decode table indexed by opcode byte.
pub static OPCODES: [Opcode; 256] = build();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_count_is_151() {
        let count = (0..=255u8)
            .filter(|&b| OPCODES[usize::from(b)].is_documented(b))
            .count();
        assert_eq!(count, 151);
    }

    #[test]
    fn spot_check_entries() {
        assert_eq!(
            OPCODES[0x9D],
            Opcode { mnemonic: Mnemonic::Sta, mode: Mode::AbsoluteXWrite, cycles: 5 }
        );
        assert_eq!(
            OPCODES[0xB1],
            Opcode { mnemonic: Mnemonic::Lda, mode: Mode::IndirectY, cycles: 5 }
        );
        assert_eq!(
            OPCODES[0x6C],
            Opcode { mnemonic: Mnemonic::Jmp, mode: Mode::Indirect, cycles: 5 }
        );
        assert_eq!(OPCODES[0x00].cycles, 7);
    }

    #[test]
    fn every_jam_is_two_cycles() {
        for (byte, op) in OPCODES.iter().enumerate() {
            if op.mnemonic == Mnemonic::Jam {
                assert_eq!(op.cycles, 2, "opcode {byte:#04X}");
            }
        }
    }
}
