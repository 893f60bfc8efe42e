//! INT and NMI acceptance: sampling point, masking, modes and timing.

use emu_core::{SimpleBus, Signal};
use zilog_z80::{IM1_VECTOR, NMI_VECTOR, Z80};

/// CPU at $0000 with SP at $8000 and NOPs in both handlers.
fn boot(program: &[u8]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, program);
    let mut cpu = Z80::new();
    cpu.skip_reset(0x0000);
    cpu.regs.sp = 0x8000;
    (cpu, bus)
}

/// Same, with IM 1 and interrupts enabled.
fn enabled(program: &[u8]) -> (Z80, SimpleBus) {
    let (mut cpu, bus) = boot(program);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;
    cpu.regs.iff2 = true;
    (cpu, bus)
}

fn return_address(bus: &SimpleBus) -> u16 {
    u16::from_le_bytes([bus.peek(0x7FFE), bus.peek(0x7FFF)])
}

#[test]
fn int_is_ignored_while_disabled() {
    let (mut cpu, mut bus) = boot(&[0x00, 0x00, 0x00]);
    bus.schedule(0, Signal::AssertIrq);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.pc, 0x0003);
}

#[test]
fn im1_restart_takes_thirteen_cycles() {
    let (mut cpu, mut bus) = enabled(&[0x00, 0x00]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(cpu.cycles(), 4 + 13);
    assert!(!cpu.regs.iff1 && !cpu.regs.iff2);
    assert_eq!(return_address(&bus), 0x0001);
}

#[test]
fn mode_zero_reads_the_floating_bus_as_rst_38() {
    let (mut cpu, mut bus) = enabled(&[0x00, 0x00]);
    cpu.regs.im = 0;
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(cpu.cycles(), 4 + 13);
}

#[test]
fn im2_jumps_through_the_table() {
    let (mut cpu, mut bus) = enabled(&[0x00, 0x00]);
    cpu.regs.im = 2;
    cpu.regs.i = 0x40;
    bus.load(0x40FF, &[0x34, 0x12]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.cycles(), 4 + 19);
}

#[test]
fn ei_holds_off_int_for_one_instruction() {
    // EI ; NOP ; NOP
    let (mut cpu, mut bus) = boot(&[0xFB, 0x00, 0x00]);
    cpu.regs.im = 1;
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(cpu.regs.iff1);
    assert!(cpu.ei_delay);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0002);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(return_address(&bus), 0x0002);
}

#[test]
fn ei_run_keeps_int_out() {
    let (mut cpu, mut bus) = boot(&[0xFB, 0xFB, 0xFB, 0x00]);
    cpu.regs.im = 1;
    bus.schedule(0, Signal::AssertIrq);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.pc, 0x0003);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0004);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
}

#[test]
fn int_raised_during_last_cycle_is_seen_at_the_boundary() {
    // LD A,n runs over elapsed 0-7.
    let (mut cpu, mut bus) = enabled(&[0x3E, 0x00, 0x00]);
    bus.schedule(6, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
}

#[test]
fn int_raised_after_the_boundary_waits_an_instruction() {
    let (mut cpu, mut bus) = enabled(&[0x3E, 0x00, 0x00, 0x00]);
    bus.schedule(8, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0003);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IM1_VECTOR);
    assert_eq!(return_address(&bus), 0x0003);
}

#[test]
fn int_released_mid_instruction_is_missed() {
    let (mut cpu, mut bus) = enabled(&[0x3E, 0x00, 0x00]);
    bus.schedule(2, Signal::AssertIrq);
    bus.schedule(4, Signal::ReleaseIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0003);
}

#[test]
fn nmi_is_an_edge_serviced_once() {
    let (mut cpu, mut bus) = enabled(&[0x00; 4]);
    bus.load(NMI_VECTOR, &[0x00; 4]);
    bus.schedule(0, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_VECTOR);
    assert_eq!(cpu.cycles(), 4 + 11);
    assert!(!cpu.regs.iff1);
    assert!(cpu.regs.iff2);
    // Line still held: no second entry.
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_VECTOR + 1);
}

#[test]
fn nmi_wins_over_int_and_ignores_di() {
    let (mut cpu, mut bus) = boot(&[0x00, 0x00]);
    bus.schedule(0, Signal::AssertIrq);
    bus.schedule(0, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_VECTOR);
}

#[test]
fn retn_restores_iff1_from_iff2() {
    let (mut cpu, mut bus) = enabled(&[0x00, 0x00]);
    // RETN
    bus.load(NMI_VECTOR, &[0xED, 0x45]);
    bus.schedule(0, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(!cpu.regs.iff1);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0001);
    assert!(cpu.regs.iff1);
}

#[test]
fn nmi_wakes_halt_and_returns_past_it() {
    // HALT ; NOP
    let (mut cpu, mut bus) = boot(&[0x76, 0x00]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.regs.halted);
    bus.schedule(bus.elapsed() + 1, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(!cpu.regs.halted);
    assert_eq!(cpu.regs.pc, NMI_VECTOR);
    assert_eq!(return_address(&bus), 0x0001);
}
