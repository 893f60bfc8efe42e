//! Operation execution.
//!
//! Operations poll for interrupts immediately before their final bus cycle,
//! except where the real CPU polls elsewhere (branches, CLI).

use emu_core::{Bus, Synchronize};
use tracing::trace;

use crate::addressing::Operand;
use crate::cpu::Interrupt;
use crate::flags::{C, D, I, N, V, Z};
use crate::table::{Mnemonic, Mode, Opcode};
use crate::{Mos6502, Status};

impl Mos6502 {
    pub(crate) fn execute<B: Bus + Synchronize>(&mut self, bus: &mut B, byte: u8, op: Opcode) {
        let operand = if op.mnemonic.fetches_own_operand() {
            Operand::None
        } else {
            self.resolve(bus, op.mode)
        };

        match op.mnemonic {
            // Loads and stores
            Mnemonic::Lda => {
                self.regs.a = self.load(bus, operand);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Ldx => {
                self.regs.x = self.load(bus, operand);
                self.regs.p.update_nz(self.regs.x);
            }
            Mnemonic::Ldy => {
                self.regs.y = self.load(bus, operand);
                self.regs.p.update_nz(self.regs.y);
            }
            Mnemonic::Sta => self.store(bus, operand, self.regs.a),
            Mnemonic::Stx => self.store(bus, operand, self.regs.x),
            Mnemonic::Sty => self.store(bus, operand, self.regs.y),

            // ALU
            Mnemonic::Ora => {
                let val = self.load(bus, operand);
                self.do_ora(val);
            }
            Mnemonic::And => {
                let val = self.load(bus, operand);
                self.do_and(val);
            }
            Mnemonic::Eor => {
                let val = self.load(bus, operand);
                self.do_eor(val);
            }
            Mnemonic::Adc => {
                let val = self.load(bus, operand);
                self.do_adc(val);
            }
            Mnemonic::Sbc => {
                let val = self.load(bus, operand);
                self.do_adc(!val);
            }
            Mnemonic::Cmp => {
                let val = self.load(bus, operand);
                self.do_compare(self.regs.a, val);
            }
            Mnemonic::Cpx => {
                let val = self.load(bus, operand);
                self.do_compare(self.regs.x, val);
            }
            Mnemonic::Cpy => {
                let val = self.load(bus, operand);
                self.do_compare(self.regs.y, val);
            }
            Mnemonic::Bit => {
                let val = self.load(bus, operand);
                self.regs.p.set_if(Z, self.regs.a & val == 0);
                self.regs.p.set_if(N, val & 0x80 != 0);
                self.regs.p.set_if(V, val & 0x40 != 0);
            }

            // Read-modify-write
            Mnemonic::Asl => self.modify(bus, operand, Self::do_asl),
            Mnemonic::Lsr => self.modify(bus, operand, Self::do_lsr),
            Mnemonic::Rol => self.modify(bus, operand, Self::do_rol),
            Mnemonic::Ror => self.modify(bus, operand, Self::do_ror),
            Mnemonic::Inc => self.modify(bus, operand, Self::do_inc),
            Mnemonic::Dec => self.modify(bus, operand, Self::do_dec),

            // Register increments and transfers
            Mnemonic::Inx => self.transfer(bus, |cpu| {
                cpu.regs.x = cpu.regs.x.wrapping_add(1);
                cpu.regs.x
            }),
            Mnemonic::Iny => self.transfer(bus, |cpu| {
                cpu.regs.y = cpu.regs.y.wrapping_add(1);
                cpu.regs.y
            }),
            Mnemonic::Dex => self.transfer(bus, |cpu| {
                cpu.regs.x = cpu.regs.x.wrapping_sub(1);
                cpu.regs.x
            }),
            Mnemonic::Dey => self.transfer(bus, |cpu| {
                cpu.regs.y = cpu.regs.y.wrapping_sub(1);
                cpu.regs.y
            }),
            Mnemonic::Tax => self.transfer(bus, |cpu| {
                cpu.regs.x = cpu.regs.a;
                cpu.regs.x
            }),
            Mnemonic::Tay => self.transfer(bus, |cpu| {
                cpu.regs.y = cpu.regs.a;
                cpu.regs.y
            }),
            Mnemonic::Txa => self.transfer(bus, |cpu| {
                cpu.regs.a = cpu.regs.x;
                cpu.regs.a
            }),
            Mnemonic::Tya => self.transfer(bus, |cpu| {
                cpu.regs.a = cpu.regs.y;
                cpu.regs.a
            }),
            Mnemonic::Tsx => self.transfer(bus, |cpu| {
                cpu.regs.x = cpu.regs.s;
                cpu.regs.x
            }),
            Mnemonic::Txs => {
                self.implied(bus);
                self.regs.s = self.regs.x;
            }

            // Flags
            Mnemonic::Clc => self.op_flag(bus, C, false),
            Mnemonic::Sec => self.op_flag(bus, C, true),
            Mnemonic::Cld => self.op_flag(bus, D, false),
            Mnemonic::Sed => self.op_flag(bus, D, true),
            Mnemonic::Clv => self.op_flag(bus, V, false),
            Mnemonic::Sei => self.op_flag(bus, I, true),
            Mnemonic::Cli => {
                self.int_delay = true;
                self.op_flag(bus, I, false);
            }

            // Branches
            Mnemonic::Bpl => self.op_branch(bus, !self.regs.p.is_set(N)),
            Mnemonic::Bmi => self.op_branch(bus, self.regs.p.is_set(N)),
            Mnemonic::Bvc => self.op_branch(bus, !self.regs.p.is_set(V)),
            Mnemonic::Bvs => self.op_branch(bus, self.regs.p.is_set(V)),
            Mnemonic::Bcc => self.op_branch(bus, !self.regs.p.is_set(C)),
            Mnemonic::Bcs => self.op_branch(bus, self.regs.p.is_set(C)),
            Mnemonic::Bne => self.op_branch(bus, !self.regs.p.is_set(Z)),
            Mnemonic::Beq => self.op_branch(bus, self.regs.p.is_set(Z)),

            // Jumps, calls, returns
            Mnemonic::Jmp if op.mode == Mode::Indirect => self.op_jmp_ind(bus),
            Mnemonic::Jmp => self.op_jmp_abs(bus),
            Mnemonic::Jsr => self.op_jsr(bus),
            Mnemonic::Rts => self.op_rts(bus),
            Mnemonic::Rti => self.op_rti(bus),
            Mnemonic::Brk => self.interrupt_sequence(bus, Interrupt::Brk),

            // Stack
            Mnemonic::Pha => {
                let _ = self.read(bus, self.regs.pc);
                self.poll(bus);
                self.push(bus, self.regs.a);
            }
            Mnemonic::Php => {
                let _ = self.read(bus, self.regs.pc);
                self.poll(bus);
                self.push(bus, self.regs.p.to_byte_brk());
            }
            Mnemonic::Pla => {
                self.stack_prelude(bus);
                self.regs.a = self.pull(bus);
                self.regs.p.update_nz(self.regs.a);
            }
            Mnemonic::Plp => {
                self.stack_prelude(bus);
                self.regs.p = Status::pulled(self.pull(bus));
            }

            Mnemonic::Nop => {
                // Unofficial forms with an operand still read it.
                let _ = self.load(bus, operand);
            }
            Mnemonic::Jam => {
                trace!(opcode = byte, pc = self.regs.pc, "JAM opcode run as NOP");
                self.implied(bus);
            }

            // Unspecified effect, correct timing.
            Mnemonic::Slo
            | Mnemonic::Rla
            | Mnemonic::Sre
            | Mnemonic::Rra
            | Mnemonic::Sax
            | Mnemonic::Lax
            | Mnemonic::Dcp
            | Mnemonic::Isc
            | Mnemonic::Anc
            | Mnemonic::Alr
            | Mnemonic::Arr
            | Mnemonic::Xaa
            | Mnemonic::Axs
            | Mnemonic::Ahx
            | Mnemonic::Shx
            | Mnemonic::Shy
            | Mnemonic::Tas
            | Mnemonic::Las => {
                trace!(opcode = byte, pc = self.regs.pc, "unofficial opcode stubbed");
                self.poll(bus);
            }
        }
    }

    // ========================================================================
    // Operand access
    // ========================================================================

    /// Final read of a read-class operation.
    fn load<B: Bus + Synchronize>(&mut self, bus: &mut B, operand: Operand) -> u8 {
        self.poll(bus);
        match operand {
            Operand::Memory(addr) => self.read(bus, addr),
            Operand::Accumulator | Operand::None => {
                let _ = self.read(bus, self.regs.pc);
                self.regs.a
            }
        }
    }

    fn store<B: Bus + Synchronize>(&mut self, bus: &mut B, operand: Operand, value: u8) {
        self.poll(bus);
        if let Operand::Memory(addr) = operand {
            self.write(bus, addr, value);
        }
    }

    /// Read, write back unchanged, write modified.
    fn modify<B: Bus + Synchronize>(
        &mut self,
        bus: &mut B,
        operand: Operand,
        f: fn(&mut Self, u8) -> u8,
    ) {
        match operand {
            Operand::Memory(addr) => {
                let value = self.read(bus, addr);
                self.write(bus, addr, value);
                let result = f(self, value);
                self.poll(bus);
                self.write(bus, addr, result);
            }
            Operand::Accumulator | Operand::None => {
                self.implied(bus);
                let a = self.regs.a;
                self.regs.a = f(self, a);
            }
        }
    }

    /// Two-cycle implied instruction: poll, then a dummy read at PC.
    fn implied<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        self.poll(bus);
        let _ = self.read(bus, self.regs.pc);
    }

    fn transfer<B: Bus + Synchronize>(&mut self, bus: &mut B, f: fn(&mut Self) -> u8) {
        self.implied(bus);
        let result = f(self);
        self.regs.p.update_nz(result);
    }

    /// Dummy read at PC and at the stack top before a pull.
    fn stack_prelude<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let _ = self.read(bus, self.regs.pc);
        let _ = self.read(bus, self.regs.stack_addr());
        self.poll(bus);
    }

    // ========================================================================
    // ALU
    // ========================================================================

    fn do_ora(&mut self, val: u8) {
        self.regs.a |= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_and(&mut self, val: u8) {
        self.regs.a &= val;
        self.regs.p.update_nz(self.regs.a);
    }

    fn do_eor(&mut self, val: u8) {
        self.regs.a ^= val;
        self.regs.p.update_nz(self.regs.a);
    }

    /// Binary add with carry. SBC passes the inverted operand.
    fn do_adc(&mut self, val: u8) {
        let a = self.regs.a;
        let sum = u16::from(a) + u16::from(val) + u16::from(self.regs.p.is_set(C));
        let result = sum as u8;
        self.regs.p.set_if(C, sum > 0xFF);
        self.regs.p.set_if(V, (a ^ result) & (val ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn do_compare(&mut self, reg: u8, val: u8) {
        self.regs.p.set_if(C, reg >= val);
        self.regs.p.update_nz(reg.wrapping_sub(val));
    }

    fn do_asl(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = val << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_lsr(&mut self, val: u8) -> u8 {
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = val >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn do_rol(&mut self, val: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, val & 0x80 != 0);
        let result = (val << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn do_ror(&mut self, val: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, val & 0x01 != 0);
        let result = (val >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn do_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn do_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    // ========================================================================
    // Individual instruction implementations
    // ========================================================================

    fn op_flag<B: Bus + Synchronize>(&mut self, bus: &mut B, flag: u8, set: bool) {
        self.implied(bus);
        self.regs.p.set_if(flag, set);
    }

    /// Branches poll once after the offset fetch. A taken branch that
    /// crosses a page polls again before each of its two extra cycles; one
    /// that stays in the page does not, so an interrupt arriving during its
    /// third cycle waits for the next instruction.
    fn op_branch<B: Bus + Synchronize>(&mut self, bus: &mut B, taken: bool) {
        self.poll(bus);
        let offset = self.fetch(bus) as i8;
        if !taken {
            return;
        }
        self.charge(bus, 1);
        let pc = self.regs.pc;
        let target = pc.wrapping_add_signed(i16::from(offset));
        let crossed = (pc ^ target) & 0xFF00 != 0;
        if crossed {
            self.charge(bus, 1);
            self.poll(bus);
        }
        let _ = self.read(bus, pc);
        if crossed {
            self.poll(bus);
            let _ = self.read(bus, (pc & 0xFF00) | (target & 0x00FF));
        }
        self.regs.pc = target;
    }

    fn op_jmp_abs<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let lo = self.fetch(bus);
        self.poll(bus);
        let hi = self.read(bus, self.regs.pc);
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    fn op_jmp_ind<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let ptr = self.fetch_word(bus);
        let lo = self.read(bus, ptr);
        self.poll(bus);
        // The pointer's high byte is read without carry into its page.
        let hi = self.read(bus, (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    fn op_jsr<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let lo = self.fetch(bus);
        let _ = self.read(bus, self.regs.stack_addr());
        let [pcl, pch] = self.regs.pc.to_le_bytes();
        self.push(bus, pch);
        self.push(bus, pcl);
        self.poll(bus);
        let hi = self.read(bus, self.regs.pc);
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }

    fn op_rts<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let _ = self.read(bus, self.regs.pc);
        let _ = self.read(bus, self.regs.stack_addr());
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        let addr = u16::from_le_bytes([lo, hi]);
        self.poll(bus);
        let _ = self.read(bus, addr);
        self.regs.pc = addr.wrapping_add(1);
    }

    /// RTI restores P before its last poll, so the pulled I flag takes
    /// effect for that poll with no delay.
    fn op_rti<B: Bus + Synchronize>(&mut self, bus: &mut B) {
        let _ = self.read(bus, self.regs.pc);
        let _ = self.read(bus, self.regs.stack_addr());
        self.regs.p = Status::pulled(self.pull(bus));
        let lo = self.pull(bus);
        self.poll(bus);
        let hi = self.pull(bus);
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }
}
