//! Instruction decode and execution.
//!
//! Opcodes are split into the usual x/y/z/p/q fields. A run of `DD`/`FD`
//! prefixes selects IX or IY in place of HL for the instruction that
//! follows; only the last one counts. `(HL)` operands become `(IX+d)`
//! with a displacement fetch and five internal T-states, and H/L operands
//! become the index halves unless the same instruction also uses `(IX+d)`.

use tracing::trace;

use crate::Z80;
use crate::alu::{AluResult, accumulate, adc16, add16, daa, dec8, inc8, sbc16, shift, sub8};
use crate::cpu::Z80Bus;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, parity, sz53, sz53p};

/// Register pair standing in for HL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Interrupt mode selected by `ED 46`..`ED 7E`, by opcode bits 5-3.
const INTERRUPT_MODES: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

impl Z80 {
    pub(crate) fn execute<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, first: u8) {
        let mut opcode = first;
        let mut index = Index::Hl;
        while let 0xDD | 0xFD = opcode {
            index = if opcode == 0xDD { Index::Ix } else { Index::Iy };
            opcode = self.fetch_opcode(bus);
        }

        match (opcode, index) {
            (0xCB, Index::Hl) => self.execute_cb(bus),
            (0xCB, _) => self.execute_index_cb(bus, index),
            (0xED, _) => self.execute_ed(bus),
            _ => self.execute_main(bus, opcode, index),
        }
    }

    // ========================================================================
    // Operand helpers
    // ========================================================================

    pub(crate) fn index_reg(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_reg(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// 8-bit register by its 3-bit code. Code 6 is never a register.
    fn reg(&self, code: u8, index: Index) -> u8 {
        let r = &self.regs;
        match code {
            0 => r.b,
            1 => r.c,
            2 => r.d,
            3 => r.e,
            4 => (self.index_reg(index) >> 8) as u8,
            5 => self.index_reg(index) as u8,
            _ => r.a,
        }
    }

    fn set_reg(&mut self, code: u8, index: Index, value: u8) {
        match code {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => {
                let pair = self.index_reg(index);
                self.set_index_reg(index, (pair & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let pair = self.index_reg(index);
                self.set_index_reg(index, (pair & 0xFF00) | u16::from(value));
            }
            _ => self.regs.a = value,
        }
    }

    /// BC, DE, HL (or the index) and SP.
    fn pair(&self, p: u8, index: Index) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(index),
            _ => self.regs.sp,
        }
    }

    fn set_pair(&mut self, p: u8, index: Index, value: u16) {
        match p {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(index, value),
            _ => self.regs.sp = value,
        }
    }

    /// As [`pair`](Self::pair) with AF in place of SP, for PUSH and POP.
    fn stack_pair(&self, p: u8, index: Index) -> u16 {
        if p == 3 {
            self.regs.af()
        } else {
            self.pair(p, index)
        }
    }

    fn set_stack_pair(&mut self, p: u8, index: Index, value: u16) {
        if p == 3 {
            self.regs.set_af(value);
        } else {
            self.set_pair(p, index, value);
        }
    }

    fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    /// Address of a `(HL)` operand. For an index, fetches the displacement
    /// and spends the five T-states of the address add.
    fn operand_address<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, index: Index) -> u16 {
        if index == Index::Hl {
            return self.regs.hl();
        }
        let d = self.fetch(bus) as i8;
        self.idle(bus, 5);
        self.displaced(index, d)
    }

    fn displaced(&mut self, index: Index, d: i8) -> u16 {
        let addr = self.index_reg(index).wrapping_add_signed(i16::from(d));
        self.regs.wz = addr;
        addr
    }

    fn relative_jump(&mut self, d: i8) {
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d));
        self.regs.wz = self.regs.pc;
    }

    fn apply(&mut self, result: AluResult) -> u8 {
        self.set_flags(result.flags);
        result.value
    }

    // ========================================================================
    // Unprefixed and DD/FD opcodes
    // ========================================================================

    fn execute_main<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, opcode: u8, index: Index) {
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        match opcode >> 6 {
            0 => self.execute_x0(bus, y, z, index),
            1 if opcode == 0x76 => self.regs.halted = true,
            1 => self.load_register(bus, y, z, index),
            2 => {
                let value = if z == 6 {
                    let addr = self.operand_address(bus, index);
                    self.read(bus, addr)
                } else {
                    self.reg(z, index)
                };
                self.alu_a(y, value);
            }
            _ => self.execute_x3(bus, y, z, index),
        }
    }

    fn alu_a(&mut self, op: u8, value: u8) {
        let result = accumulate(op, self.regs.a, value, self.regs.f);
        self.set_flags(result.flags);
        self.regs.a = result.value;
    }

    fn load_register<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8, z: u8, index: Index) {
        if z == 6 {
            let addr = self.operand_address(bus, index);
            let value = self.read(bus, addr);
            self.set_reg(y, Index::Hl, value);
        } else if y == 6 {
            let addr = self.operand_address(bus, index);
            let value = self.reg(z, Index::Hl);
            self.write(bus, addr, value);
        } else {
            let value = self.reg(z, index);
            self.set_reg(y, index, value);
        }
    }

    fn execute_x0<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8, z: u8, index: Index) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => match y {
                0 => {}
                1 => self.regs.swap_af(),
                2 => {
                    self.idle(bus, 1);
                    let d = self.fetch(bus) as i8;
                    self.regs.b = self.regs.b.wrapping_sub(1);
                    if self.regs.b != 0 {
                        self.idle(bus, 5);
                        self.relative_jump(d);
                    }
                }
                3 => {
                    let d = self.fetch(bus) as i8;
                    self.idle(bus, 5);
                    self.relative_jump(d);
                }
                _ => {
                    let d = self.fetch(bus) as i8;
                    if self.condition(y - 4) {
                        self.idle(bus, 5);
                        self.relative_jump(d);
                    }
                }
            },
            1 if q == 0 => {
                let value = self.fetch_word(bus);
                self.set_pair(p, index, value);
            }
            1 => {
                self.idle(bus, 7);
                let target = self.index_reg(index);
                let result = add16(target, self.pair(p, index), self.regs.f);
                self.regs.wz = target.wrapping_add(1);
                self.set_index_reg(index, result.value);
                self.set_flags(result.flags);
            }
            2 => self.load_indirect(bus, p, q, index),
            3 => {
                self.idle(bus, 2);
                let value = self.pair(p, index);
                let value = if q == 0 {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.set_pair(p, index, value);
            }
            4 | 5 => {
                let step = |v: u8, f: u8| if z == 4 { inc8(v, f) } else { dec8(v, f) };
                if y == 6 {
                    let addr = self.operand_address(bus, index);
                    let value = self.read(bus, addr);
                    self.idle(bus, 1);
                    let result = step(value, self.regs.f);
                    let value = self.apply(result);
                    self.write(bus, addr, value);
                } else {
                    let result = step(self.reg(y, index), self.regs.f);
                    let value = self.apply(result);
                    self.set_reg(y, index, value);
                }
            }
            6 => {
                if y != 6 {
                    let value = self.fetch(bus);
                    self.set_reg(y, index, value);
                } else if index == Index::Hl {
                    let value = self.fetch(bus);
                    self.write(bus, self.regs.hl(), value);
                } else {
                    // The add overlaps the immediate fetch.
                    let d = self.fetch(bus) as i8;
                    let value = self.fetch(bus);
                    self.idle(bus, 2);
                    let addr = self.displaced(index, d);
                    self.write(bus, addr, value);
                }
            }
            _ => self.accumulator_op(y),
        }
    }

    fn load_indirect<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, p: u8, q: u8, index: Index) {
        match (p, q) {
            (0 | 1, 0) => {
                let addr = self.pair(p, index);
                self.write(bus, addr, self.regs.a);
                self.regs.wz = u16::from_be_bytes([self.regs.a, addr.wrapping_add(1) as u8]);
            }
            (0 | 1, _) => {
                let addr = self.pair(p, index);
                self.regs.a = self.read(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }
            (2, 0) => {
                let addr = self.fetch_word(bus);
                self.write_word(bus, addr, self.index_reg(index));
                self.regs.wz = addr.wrapping_add(1);
            }
            (2, _) => {
                let addr = self.fetch_word(bus);
                let value = self.read_word(bus, addr);
                self.set_index_reg(index, value);
                self.regs.wz = addr.wrapping_add(1);
            }
            (_, 0) => {
                let addr = self.fetch_word(bus);
                self.write(bus, addr, self.regs.a);
                self.regs.wz = u16::from_be_bytes([self.regs.a, addr.wrapping_add(1) as u8]);
            }
            _ => {
                let addr = self.fetch_word(bus);
                self.regs.a = self.read(bus, addr);
                self.regs.wz = addr.wrapping_add(1);
            }
        }
    }

    /// RLCA RRCA RLA RRA DAA CPL SCF CCF.
    fn accumulator_op(&mut self, y: u8) {
        let a = self.regs.a;
        let f = self.regs.f;
        let kept = f & (SF | ZF | PF);
        match y {
            0 => {
                let value = a.rotate_left(1);
                self.regs.a = value;
                self.set_flags(kept | (value & (YF | XF)) | (value & CF));
            }
            1 => {
                let value = a.rotate_right(1);
                self.regs.a = value;
                self.set_flags(kept | (value & (YF | XF)) | (a & CF));
            }
            2 => {
                let value = (a << 1) | (f & CF);
                self.regs.a = value;
                self.set_flags(kept | (value & (YF | XF)) | (a >> 7));
            }
            3 => {
                let value = (a >> 1) | (f << 7);
                self.regs.a = value;
                self.set_flags(kept | (value & (YF | XF)) | (a & CF));
            }
            4 => {
                let result = daa(a, f);
                self.regs.a = self.apply(result);
            }
            5 => {
                let value = !a;
                self.regs.a = value;
                self.set_flags((f & (SF | ZF | PF | CF)) | HF | NF | (value & (YF | XF)));
            }
            6 => {
                let xy = ((self.prev_q ^ f) | a) & (YF | XF);
                self.set_flags(kept | xy | CF);
            }
            _ => {
                let xy = ((self.prev_q ^ f) | a) & (YF | XF);
                let half = if f & CF != 0 { HF } else { 0 };
                self.set_flags(kept | xy | half | ((f & CF) ^ CF));
            }
        }
    }

    fn execute_x3<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8, z: u8, index: Index) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => {
                self.idle(bus, 1);
                if self.condition(y) {
                    self.ret(bus);
                }
            }
            1 if q == 0 => {
                let value = self.pop(bus);
                self.set_stack_pair(p, index, value);
            }
            1 => match p {
                0 => self.ret(bus),
                1 => self.regs.swap_main(),
                2 => self.regs.pc = self.index_reg(index),
                _ => {
                    self.idle(bus, 2);
                    self.regs.sp = self.index_reg(index);
                }
            },
            2 => {
                let target = self.fetch_word(bus);
                self.regs.wz = target;
                if self.condition(y) {
                    self.regs.pc = target;
                }
            }
            3 => match y {
                0 => {
                    let target = self.fetch_word(bus);
                    self.regs.wz = target;
                    self.regs.pc = target;
                }
                2 => {
                    let n = self.fetch(bus);
                    let a = self.regs.a;
                    self.port_out(bus, u16::from_be_bytes([a, n]), a);
                    self.regs.wz = u16::from_be_bytes([a, n.wrapping_add(1)]);
                }
                3 => {
                    let n = self.fetch(bus);
                    let port = u16::from_be_bytes([self.regs.a, n]);
                    self.regs.a = self.port_in(bus, port);
                    self.regs.wz = port.wrapping_add(1);
                }
                4 => {
                    let sp = self.regs.sp;
                    let lo = self.read(bus, sp);
                    let hi = self.read(bus, sp.wrapping_add(1));
                    self.idle(bus, 1);
                    let [old_lo, old_hi] = self.index_reg(index).to_le_bytes();
                    self.write(bus, sp.wrapping_add(1), old_hi);
                    self.write(bus, sp, old_lo);
                    self.idle(bus, 2);
                    let value = u16::from_le_bytes([lo, hi]);
                    self.set_index_reg(index, value);
                    self.regs.wz = value;
                }
                5 => {
                    let de = self.regs.de();
                    self.regs.set_de(self.regs.hl());
                    self.regs.set_hl(de);
                }
                6 => {
                    self.regs.iff1 = false;
                    self.regs.iff2 = false;
                }
                // EI. 1 is the CB prefix, dispatched before decode.
                _ => {
                    self.regs.iff1 = true;
                    self.regs.iff2 = true;
                    self.ei_delay = true;
                }
            },
            4 => {
                let target = self.fetch_word(bus);
                self.regs.wz = target;
                if self.condition(y) {
                    self.call(bus, target);
                }
            }
            5 if q == 0 => {
                self.idle(bus, 1);
                let value = self.stack_pair(p, index);
                self.push(bus, value);
            }
            // Only CALL nn reaches here; the other three are prefixes.
            5 => {
                let target = self.fetch_word(bus);
                self.regs.wz = target;
                self.call(bus, target);
            }
            6 => {
                let n = self.fetch(bus);
                self.alu_a(y, n);
            }
            _ => {
                self.idle(bus, 1);
                self.call_restart(bus, u16::from(y) * 8);
            }
        }
    }

    fn ret<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        self.regs.pc = self.pop(bus);
        self.regs.wz = self.regs.pc;
    }

    fn call<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, target: u16) {
        self.idle(bus, 1);
        self.call_restart(bus, target);
    }

    fn call_restart<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, target: u16) {
        self.push(bus, self.regs.pc);
        self.regs.pc = target;
        self.regs.wz = target;
    }

    // ========================================================================
    // CB: rotates, shifts and bit operations
    // ========================================================================

    fn bit_test(&mut self, bit: u8, value: u8, xy: u8) {
        let set = value & (1 << bit);
        let mut f = (self.regs.f & CF) | HF | (xy & (YF | XF));
        if set == 0 {
            f |= ZF | PF;
        }
        if bit == 7 && set != 0 {
            f |= SF;
        }
        self.set_flags(f);
    }

    /// Rotate, RES or SET on `value`, by opcode bits 7-6 and 5-3.
    fn modify(&mut self, x: u8, y: u8, value: u8) -> u8 {
        match x {
            0 => {
                let result = shift(y, value, self.regs.f);
                self.apply(result)
            }
            2 => value & !(1 << y),
            _ => value | (1 << y),
        }
    }

    fn execute_cb<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let opcode = self.fetch_opcode(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        if z == 6 {
            let addr = self.regs.hl();
            let value = self.read(bus, addr);
            self.idle(bus, 1);
            if x == 1 {
                self.bit_test(y, value, (self.regs.wz >> 8) as u8);
            } else {
                let result = self.modify(x, y, value);
                self.write(bus, addr, result);
            }
        } else {
            let value = self.reg(z, Index::Hl);
            if x == 1 {
                self.bit_test(y, value, value);
            } else {
                let result = self.modify(x, y, value);
                self.set_reg(z, Index::Hl, result);
            }
        }
    }

    /// `DD CB d op`: the operation byte is read as data, not fetched as an
    /// opcode, and the result is also copied to the register in bits 2-0.
    fn execute_index_cb<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, index: Index) {
        let d = self.fetch(bus) as i8;
        let opcode = self.fetch(bus);
        self.idle(bus, 2);
        let addr = self.displaced(index, d);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;

        let value = self.read(bus, addr);
        self.idle(bus, 1);
        if x == 1 {
            self.bit_test(y, value, (addr >> 8) as u8);
            return;
        }
        let result = self.modify(x, y, value);
        self.write(bus, addr, result);
        if z != 6 {
            self.set_reg(z, Index::Hl, result);
        }
    }

    // ========================================================================
    // ED
    // ========================================================================

    fn execute_ed<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let opcode = self.fetch_opcode(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        match x {
            1 => self.execute_ed_x1(bus, y, z),
            2 if z <= 3 && y >= 4 => self.block(bus, y, z),
            _ => trace!(opcode = format_args!("ED {opcode:02X}"), "undefined opcode"),
        }
    }

    fn execute_ed_x1<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8, z: u8) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => {
                let bc = self.regs.bc();
                let value = self.port_in(bus, bc);
                self.regs.wz = bc.wrapping_add(1);
                self.set_flags((self.regs.f & CF) | sz53p(value));
                if y != 6 {
                    self.set_reg(y, Index::Hl, value);
                }
            }
            1 => {
                let bc = self.regs.bc();
                let value = if y == 6 { 0 } else { self.reg(y, Index::Hl) };
                self.port_out(bus, bc, value);
                self.regs.wz = bc.wrapping_add(1);
            }
            2 => {
                self.idle(bus, 7);
                let hl = self.regs.hl();
                let operand = self.pair(p, Index::Hl);
                let result = if q == 0 {
                    sbc16(hl, operand, self.regs.f)
                } else {
                    adc16(hl, operand, self.regs.f)
                };
                self.regs.wz = hl.wrapping_add(1);
                self.regs.set_hl(result.value);
                self.set_flags(result.flags);
            }
            3 => {
                let addr = self.fetch_word(bus);
                if q == 0 {
                    self.write_word(bus, addr, self.pair(p, Index::Hl));
                } else {
                    let value = self.read_word(bus, addr);
                    self.set_pair(p, Index::Hl, value);
                }
                self.regs.wz = addr.wrapping_add(1);
            }
            4 => {
                let result = sub8(0, self.regs.a, false);
                self.regs.a = self.apply(result);
            }
            5 => {
                // RETN and RETI both restore IFF1.
                self.regs.iff1 = self.regs.iff2;
                self.ret(bus);
            }
            6 => {
                self.regs.im = INTERRUPT_MODES[usize::from(y)];
                trace!(mode = self.regs.im, "interrupt mode");
            }
            _ => self.execute_ed_z7(bus, y),
        }
    }

    /// `LD I,A`, `LD R,A`, `LD A,I`, `LD A,R`, `RRD` and `RLD`.
    fn execute_ed_z7<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8) {
        match y {
            0 => {
                self.idle(bus, 1);
                self.regs.i = self.regs.a;
            }
            1 => {
                self.idle(bus, 1);
                self.regs.r = self.regs.a;
            }
            2 | 3 => {
                self.idle(bus, 1);
                let value = if y == 2 { self.regs.i } else { self.regs.r };
                self.regs.a = value;
                let iff2 = if self.regs.iff2 { PF } else { 0 };
                self.set_flags((self.regs.f & CF) | sz53(value) | iff2);
                self.ld_a_ir = true;
            }
            4 | 5 => {
                let hl = self.regs.hl();
                let memory = self.read(bus, hl);
                self.idle(bus, 4);
                let a = self.regs.a;
                let (stored, low) = if y == 4 {
                    ((a << 4) | (memory >> 4), memory & 0x0F)
                } else {
                    ((memory << 4) | (a & 0x0F), memory >> 4)
                };
                self.write(bus, hl, stored);
                self.regs.a = (a & 0xF0) | low;
                self.set_flags((self.regs.f & CF) | sz53p(self.regs.a));
                self.regs.wz = hl.wrapping_add(1);
            }
            _ => {}
        }
    }

    // ========================================================================
    // Block transfer, search and I/O
    // ========================================================================

    /// LDI/CPI/INI/OUTI and the D, IR and DR variants, by bits 4-3 (step
    /// and repeat) and 1-0 (operation).
    fn block<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, y: u8, z: u8) {
        let down = y & 1 != 0;
        let repeat = y >= 6;
        let delta: i16 = if down { -1 } else { 1 };
        match z {
            0 => self.block_load(bus, delta, repeat),
            1 => self.block_compare(bus, delta, repeat),
            2 => self.block_in(bus, delta, repeat),
            _ => self.block_out(bus, delta, repeat),
        }
    }

    /// Rewind PC onto the instruction for another pass. X and Y then come
    /// from PC bits 13 and 11.
    fn repeat_block<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, f: u8) -> u8 {
        self.idle(bus, 5);
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
        (f & !(YF | XF)) | ((self.regs.pc >> 8) as u8 & (YF | XF))
    }

    fn block_load<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, delta: i16, repeat: bool) {
        let hl = self.regs.hl();
        let de = self.regs.de();
        let value = self.read(bus, hl);
        self.write(bus, de, value);
        self.idle(bus, 2);
        self.regs.set_hl(hl.wrapping_add_signed(delta));
        self.regs.set_de(de.wrapping_add_signed(delta));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let n = value.wrapping_add(self.regs.a);
        let mut f = (self.regs.f & (SF | ZF | CF)) | (n & XF) | ((n << 4) & YF);
        if bc != 0 {
            f |= PF;
            if repeat {
                f = self.repeat_block(bus, f);
            }
        }
        self.set_flags(f);
    }

    fn block_compare<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, delta: i16, repeat: bool) {
        let hl = self.regs.hl();
        let value = self.read(bus, hl);
        self.idle(bus, 5);
        self.regs.set_hl(hl.wrapping_add_signed(delta));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);
        self.regs.wz = self.regs.wz.wrapping_add_signed(delta);

        let a = self.regs.a;
        let result = a.wrapping_sub(value);
        let half = (a ^ value ^ result) & HF;
        let n = result.wrapping_sub(u8::from(half != 0));
        let mut f = (self.regs.f & CF) | NF | half | (sz53(result) & (SF | ZF));
        f |= (n & XF) | ((n << 4) & YF);
        if bc != 0 {
            f |= PF;
            if repeat && result != 0 {
                f = self.repeat_block(bus, f);
            }
        }
        self.set_flags(f);
    }

    fn block_in<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, delta: i16, repeat: bool) {
        self.idle(bus, 1);
        let bc = self.regs.bc();
        let value = self.port_in(bus, bc);
        let hl = self.regs.hl();
        self.write(bus, hl, value);
        self.regs.wz = bc.wrapping_add_signed(delta);
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.set_hl(hl.wrapping_add_signed(delta));

        let c = self.regs.c.wrapping_add_signed(delta as i8);
        self.finish_block_io(bus, value, u16::from(value) + u16::from(c), repeat);
    }

    fn block_out<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, delta: i16, repeat: bool) {
        self.idle(bus, 1);
        let hl = self.regs.hl();
        let value = self.read(bus, hl);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.bc();
        self.port_out(bus, bc, value);
        self.regs.wz = bc.wrapping_add_signed(delta);
        self.regs.set_hl(hl.wrapping_add_signed(delta));

        let l = self.regs.l;
        self.finish_block_io(bus, value, u16::from(value) + u16::from(l), repeat);
    }

    /// Flags after INI/OUTI and friends. `k` is the transferred byte plus
    /// the adjusted C (input) or the new L (output).
    fn finish_block_io<B: Z80Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        value: u8,
        k: u16,
        repeat: bool,
    ) {
        let b = self.regs.b;
        let mut f = sz53(b);
        if value & 0x80 != 0 {
            f |= NF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        if parity((k as u8 & 7) ^ b) {
            f |= PF;
        }
        if repeat && b != 0 {
            f = self.repeat_block(bus, f);
            f = interrupted_io_flags(f, value, b);
        }
        self.set_flags(f);
    }
}

/// P/V and H of a repeating block I/O instruction caught between passes.
fn interrupted_io_flags(f: u8, value: u8, b: u8) -> u8 {
    let mut f = f;
    if f & CF != 0 {
        f &= !HF;
        let (next, half) = if value & 0x80 != 0 {
            (b.wrapping_sub(1), b & 0x0F == 0x00)
        } else {
            (b.wrapping_add(1), b & 0x0F == 0x0F)
        };
        if !parity(next & 7) {
            f ^= PF;
        }
        if half {
            f |= HF;
        }
    } else if !parity(b & 7) {
        f ^= PF;
    }
    f
}
