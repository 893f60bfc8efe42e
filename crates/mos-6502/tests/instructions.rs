//! Unit tests for 6502 instruction behavior.

use emu_core::SimpleBus;
use mos_6502::{Mos6502, flags};

/// Load a program at $0200 and set PC there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6502, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.skip_reset(0x0200);
}

fn run(cpu: &mut Mos6502, bus: &mut SimpleBus, instructions: usize) {
    for _ in 0..instructions {
        cpu.step(bus);
    }
}

#[test]
fn test_stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF, "SP should be back to $FF after PLA");
    assert_eq!(bus.peek(0x01FF), 0x42);
}

#[test]
fn test_pla_sets_zero_and_negative() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDA #$80; PHA; LDA #$00; PLA
    let program = [0xA9, 0x80, 0x48, 0xA9, 0x00, 0x68];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 3);
    assert!(cpu.regs.p.is_set(flags::Z));
    run(&mut cpu, &mut bus, 1);
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::Z));
}

#[test]
fn test_stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert!(cpu.regs.p.is_set(flags::C), "PLP should restore carry flag");
    assert!(!cpu.regs.p.is_set(flags::B), "B never lives in P");
    assert_eq!(cpu.regs.s, 0xFF, "SP should be back to $FF");
    // PHP pushes B and U set.
    assert_eq!(bus.peek(0x01FF) & 0x30, 0x30);
}

#[test]
fn test_brk_stack_layout() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.set_vector(0xFFFE, 0x0300);

    let program = [
        0xA2, 0xFF, // LDX #$FF    @ $0200
        0x9A, // TXS         @ $0202
        0x58, // CLI         @ $0203
        0x00, // BRK         @ $0204
        0xEA, // padding     @ $0205 (skipped)
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.pc, 0x0300, "PC should be at BRK vector target");
    assert_eq!(cpu.regs.s, 0xFC, "three pushes from $FF");
    assert!(cpu.regs.p.is_set(flags::I), "I flag should be set after BRK");

    // Return address skips the padding byte.
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x06);

    let pushed_p = bus.peek(0x01FD);
    assert_eq!(pushed_p & 0x30, 0x30, "Pushed P should have B and U set");
    assert_eq!(pushed_p & 0x04, 0x00, "Pushed P should NOT have I set");
}

#[test]
fn test_brk_after_plp_of_zero() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.set_vector(0xFFFE, 0x0300);
    bus.load(0x0300, &[0x08]); // PHP

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0xA9, 0x00, // LDA #$00
        0x48, // PHA
        0xA9, 0x42, // LDA #$42
        0x28, // PLP
        0x00, // BRK
        0xEA, // padding
    ];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 8);

    assert_eq!(cpu.regs.s, 0xFB, "SP should be $FB after BRK+PHP");
    // PLP of $00 leaves only U; BRK adds B.
    assert_eq!(bus.peek(0x01FD), 0x30);
    // PHP inside the handler sees I set by BRK.
    assert_eq!(bus.peek(0x01FC), 0x34);
}

#[test]
fn test_brk_after_absolute_addressing() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.set_vector(0xFFFE, 0x0300);
    bus.poke(0x1234, 0x42);

    // LDA $1234; BRK
    setup_program(&mut bus, &mut cpu, &[0xAD, 0x34, 0x12, 0x00, 0xEA]);
    run(&mut cpu, &mut bus, 2);

    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.pc, 0x0300, "BRK must use $FFFE");
}

#[test]
fn test_brk_after_jmp_indirect() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.set_vector(0xFFFE, 0x0300);
    bus.load(0x1000, &[0x00, 0x04]);
    bus.load(0x0400, &[0x00, 0xEA]);

    // JMP ($1000) -> $0400: BRK
    setup_program(&mut bus, &mut cpu, &[0x6C, 0x00, 0x10]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0400);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0300);
}

#[test]
fn test_jmp_indirect_page_wrap_bug() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    // Pointer at $10FF: low byte from $10FF, high byte from $1000.
    bus.poke(0x10FF, 0x34);
    bus.poke(0x1000, 0x12);
    bus.poke(0x1100, 0x56);

    setup_program(&mut bus, &mut cpu, &[0x6C, 0xFF, 0x10]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn test_jsr_rts_round_trip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0x0300, &[0xA9, 0x07, 0x60]); // LDA #7; RTS

    // JSR $0300; LDX #$01
    setup_program(&mut bus, &mut cpu, &[0x20, 0x00, 0x03, 0xA2, 0x01]);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.a, 0x07);
    assert_eq!(cpu.regs.x, 0x01);
    assert_eq!(cpu.regs.pc, 0x0205);
    assert_eq!(cpu.regs.s, 0xFD);
}

#[test]
fn test_adc_sets_overflow_on_signed_wrap() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // CLC; LDA #$50; ADC #$50
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x50, 0x69, 0x50]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0xA0);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_adc_carry_out() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$FF; ADC #$00
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0xFF, 0x69, 0x00]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::V));
}

#[test]
fn test_sbc_borrow_and_overflow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$50; SBC #$B0  => $A0, V set, borrow (C clear)
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x50, 0xE9, 0xB0]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0xA0);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_unofficial_sbc_matches_official() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$10; SBC #$01 via $EB
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x10, 0xEB, 0x01]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.regs.a, 0x0F);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn test_decimal_flag_does_not_change_arithmetic() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SED; CLC; LDA #$09; ADC #$01 => binary $0A
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x18, 0xA9, 0x09, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 4);

    assert_eq!(cpu.regs.a, 0x0A);
    assert!(cpu.regs.p.is_set(flags::D));
}

#[test]
fn test_cmp_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDA #$40; CMP #$40; CMP #$41; CMP #$3F
    let program = [0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41, 0xC9, 0x3F];
    setup_program(&mut bus, &mut cpu, &program);

    run(&mut cpu, &mut bus, 2);
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::C));

    run(&mut cpu, &mut bus, 1);
    assert!(!cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::N));

    run(&mut cpu, &mut bus, 1);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(!cpu.regs.p.is_set(flags::N));
}

#[test]
fn test_bit_copies_operand_bits() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.poke(0x0010, 0xC0);

    // LDA #$01; BIT $10
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x01, 0x24, 0x10]);
    run(&mut cpu, &mut bus, 2);

    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::V));
    assert_eq!(cpu.regs.a, 0x01);
}

#[test]
fn test_rol_ror_through_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$80; ROL A; ROR A
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x80, 0x2A, 0x6A]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.regs.p.is_set(flags::C));

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn test_lsr_memory() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.poke(0x0300, 0x03);

    // LSR $0300
    setup_program(&mut bus, &mut cpu, &[0x4E, 0x00, 0x03]);
    run(&mut cpu, &mut bus, 1);

    assert_eq!(bus.peek(0x0300), 0x01);
    assert!(cpu.regs.p.is_set(flags::C));
    assert_eq!(cpu.cycles(), 6);
}

#[test]
fn test_dec_wraps_and_sets_negative() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // DEC $10
    setup_program(&mut bus, &mut cpu, &[0xC6, 0x10]);
    run(&mut cpu, &mut bus, 1);

    assert_eq!(bus.peek(0x0010), 0xFF);
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn test_transfers_update_flags_except_txs() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDX #$00; TXS; TSX; LDA #$80; TAY
    let program = [0xA2, 0x00, 0x9A, 0xBA, 0xA9, 0x80, 0xA8];
    setup_program(&mut bus, &mut cpu, &program);

    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.s, 0x00);
    run(&mut cpu, &mut bus, 1);
    assert!(cpu.regs.p.is_set(flags::Z));
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.y, 0x80);
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn test_inx_dey_wrap() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDX #$FF; INX; DEY
    setup_program(&mut bus, &mut cpu, &[0xA2, 0xFF, 0xE8, 0x88]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.x, 0x00);
    assert!(cpu.regs.p.is_set(flags::Z));
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.y, 0xFF);
}

#[test]
fn test_indexed_indirect_wraps_in_zero_page() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    // ($F0,X) with X=$10 reads the pointer from $00/$01.
    bus.poke(0x0000, 0x00);
    bus.poke(0x0001, 0x04);
    bus.poke(0x0400, 0x99);

    // LDX #$10; LDA ($F0,X)
    setup_program(&mut bus, &mut cpu, &[0xA2, 0x10, 0xA1, 0xF0]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.a, 0x99);
}

#[test]
fn test_indirect_indexed_store() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0x0040, &[0x00, 0x04]);

    // LDY #$05; LDA #$77; STA ($40),Y
    setup_program(&mut bus, &mut cpu, &[0xA0, 0x05, 0xA9, 0x77, 0x91, 0x40]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(bus.peek(0x0405), 0x77);
}

#[test]
fn test_zero_page_y_wraps() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.poke(0x0002, 0x5C);

    // LDY #$04; LDX $FE,Y
    setup_program(&mut bus, &mut cpu, &[0xA0, 0x04, 0xB6, 0xFE]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.x, 0x5C);
}

#[test]
fn test_illegal_nop_single_byte() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // $1A is a single-byte NOP
    setup_program(&mut bus, &mut cpu, &[0x1A, 0xA9, 0x42]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0201, "Single-byte NOP should advance PC by 1");

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x42, "Next instruction should execute normally");
}

#[test]
fn test_illegal_nop_two_byte() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // $80 is a two-byte NOP (immediate)
    setup_program(&mut bus, &mut cpu, &[0x80, 0xFF, 0xA9, 0x42]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0202, "Two-byte NOP should advance PC by 2");

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x42, "Next instruction should execute normally");
}

#[test]
fn test_illegal_nop_three_byte() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // $0C is a three-byte NOP (absolute)
    setup_program(&mut bus, &mut cpu, &[0x0C, 0x00, 0x10, 0xA9, 0x42]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0203, "Three-byte NOP should advance PC by 3");
    assert_eq!(cpu.cycles(), 4);

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x42, "Next instruction should execute normally");
}

#[test]
fn test_jam_runs_as_two_cycle_nop() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // $02 is a JAM/KIL opcode
    setup_program(&mut bus, &mut cpu, &[0x02, 0xA9, 0x42]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x0201);
    assert_eq!(cpu.cycles(), 2);

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x42, "execution continues past JAM");
}

#[test]
fn test_stubbed_unofficial_opcode_leaves_registers() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.poke(0x0010, 0x55);

    // LAX $10 is stubbed: timing only.
    setup_program(&mut bus, &mut cpu, &[0xA7, 0x10]);
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x00);
    assert_eq!(cpu.regs.x, 0x00);
    assert_eq!(cpu.regs.pc, 0x0202);
    assert_eq!(cpu.cycles(), 3);
}
