//! Interrupt polling: when IRQ and NMI are latched and when they are taken.

use emu_core::{SimpleBus, Signal};
use mos_6502::{IRQ_VECTOR, Mos6502, NMI_VECTOR, RESET_VECTOR, flags};

const NMI_HANDLER: u16 = 0x9000;
const IRQ_HANDLER: u16 = 0xA000;

/// CPU at `pc` with handlers full of NOPs.
fn at(pc: u16, program: &[u8]) -> (Mos6502, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(pc, program);
    bus.set_vector(NMI_VECTOR, NMI_HANDLER);
    bus.set_vector(IRQ_VECTOR, IRQ_HANDLER);
    bus.load(NMI_HANDLER, &[0xEA; 4]);
    bus.load(IRQ_HANDLER, &[0xEA; 4]);
    let mut cpu = Mos6502::new();
    cpu.skip_reset(pc);
    (cpu, bus)
}

/// Same, with the I flag clear.
fn unmasked(pc: u16, program: &[u8]) -> (Mos6502, SimpleBus) {
    let (mut cpu, bus) = at(pc, program);
    cpu.regs.p.clear(flags::I);
    (cpu, bus)
}

#[test]
fn irq_is_ignored_while_interrupts_are_disabled() {
    let (mut cpu, mut bus) = at(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0202);
}

#[test]
fn irq_is_taken_after_current_instruction() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!(cpu.cycles(), 2 + 7);
    assert!(cpu.regs.p.is_set(flags::I));
    // Hardware interrupt pushes P with B clear.
    assert_eq!(bus.peek(0x01FB) & flags::B, 0);
    assert_eq!(bus.peek(0x01FB) & flags::U, flags::U);
    // Return address is the next instruction.
    assert_eq!((bus.peek(0x01FD), bus.peek(0x01FC)), (0x02, 0x01));
}

#[test]
fn irq_released_before_poll_is_not_taken() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xAD, 0x00, 0x03, 0xEA]);
    // Held only during the operand fetch of LDA $0300.
    bus.schedule(1, Signal::AssertIrq);
    bus.schedule(2, Signal::ReleaseIrq);
    cpu.step(&mut bus);
    assert!(!cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0204);
}

#[test]
fn irq_seen_at_start_of_final_cycle_is_taken() {
    // LDA $0300: polls when cycle 3 begins.
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xAD, 0x00, 0x03, 0xEA]);
    bus.schedule(3, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn irq_arriving_during_final_cycle_waits_one_instruction() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xAD, 0x00, 0x03, 0xEA]);
    bus.schedule(4, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0204, "NOP runs first");
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn cli_delays_a_pending_irq_by_one_instruction() {
    // CLI; NOP; NOP with IRQ already held.
    let (mut cpu, mut bus) = at(0x0200, &[0x58, 0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(!cpu.regs.p.is_set(flags::I));
    assert!(cpu.int_delay());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0202, "instruction after CLI still runs");
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!((bus.peek(0x01FD), bus.peek(0x01FC)), (0x02, 0x02));
}

#[test]
fn plp_clearing_i_polls_with_old_flag() {
    // PLP pulls P with I clear; NOP; then the IRQ.
    let (mut cpu, mut bus) = at(0x0200, &[0x28, 0xEA, 0xEA]);
    cpu.regs.s = 0xFC;
    bus.poke(0x01FD, flags::U);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(!cpu.regs.p.is_set(flags::I));
    assert!(!cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0202);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn rti_clearing_i_takes_irq_immediately() {
    let (mut cpu, mut bus) = at(0x0200, &[0x40]);
    cpu.regs.s = 0xFA;
    bus.load(0x01FB, &[flags::U, 0x00, 0x03]);
    bus.load(0x0300, &[0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0300);
    assert!(cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER, "no instruction at $0300 runs");
    assert_eq!((bus.peek(0x01FD), bus.peek(0x01FC)), (0x03, 0x00));
}

#[test]
fn irq_latched_before_sei_is_still_taken() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0x78, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(cpu.regs.p.is_set(flags::I));
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn sei_masks_irq_raised_during_following_load() {
    let mut bus = SimpleBus::new();
    // SEI; LDA #$01; BRK; padding
    bus.load(0x8000, &[0x78, 0xA9, 0x01, 0x00, 0x00]);
    bus.set_vector(RESET_VECTOR, 0x8000);
    bus.set_vector(IRQ_VECTOR, IRQ_HANDLER);
    bus.load(IRQ_HANDLER, &[0xEA; 4]);
    let mut cpu = Mos6502::new();

    // Reset 0-6, SEI 7-8, LDA 9-10.
    bus.schedule(10, Signal::AssertIrq);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x8003, "IRQ not taken before BRK");
    assert_eq!(cpu.regs.a, 0x01);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert_eq!(bus.peek(0x01FB) & flags::B, flags::B, "BRK pushes B set");
    assert_eq!((bus.peek(0x01FD), bus.peek(0x01FC)), (0x80, 0x05));

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER + 1, "held IRQ stays masked");
}

#[test]
fn taken_branch_within_page_does_not_poll_on_its_last_cycle() {
    // BCC +0 (taken, 3 cycles) then NOP.
    let (mut cpu, mut bus) = unmasked(0x0200, &[0x90, 0x00, 0xEA, 0xEA]);
    bus.schedule(2, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert_eq!(cpu.cycles(), 3);
    assert!(!cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0203, "NOP ran before the IRQ");
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn three_cycle_load_catches_same_irq_timing() {
    // LDA $10 polls at the start of its third cycle.
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xA5, 0x10, 0xEA]);
    bus.schedule(2, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert!(cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn taken_branch_across_page_polls_before_last_cycle() {
    // BCC +1 at $02FD lands on $0300.
    let (mut cpu, mut bus) = unmasked(0x02FD, &[0x90, 0x01]);
    bus.load(0x0300, &[0xEA]);
    bus.schedule(3, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0300);
    assert_eq!(cpu.cycles(), 4);
    assert!(cpu.irq_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn untaken_branch_polls_at_operand_fetch() {
    // BCS +4 not taken (C clear).
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xB0, 0x04, 0xEA]);
    bus.schedule(1, Signal::AssertIrq);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0202);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
}

#[test]
fn nmi_is_taken_regardless_of_i_flag() {
    let (mut cpu, mut bus) = at(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertNmi);
    cpu.step(&mut bus);
    assert!(cpu.nmi_pending());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert!(!cpu.nmi_pending());
}

#[test]
fn held_nmi_line_is_serviced_once() {
    let (mut cpu, mut bus) = at(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertNmi);
    bus.schedule(1, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER + 2);
}

#[test]
fn second_nmi_edge_after_release_is_serviced_again() {
    let (mut cpu, mut bus) = at(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertNmi);
    bus.schedule(3, Signal::ReleaseNmi);
    bus.schedule(9, Signal::AssertNmi);
    cpu.step(&mut bus); // NOP 0-1
    cpu.step(&mut bus); // NMI 2-8
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    cpu.step(&mut bus); // NOP 9-10, latches the new edge
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert_eq!(cpu.regs.s, 0xFD - 6);
}

#[test]
fn nmi_during_irq_pushes_takes_over_vector() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    // IRQ sequence runs at cycles 2-8; pushes end at cycle 6.
    bus.schedule(5, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert_eq!(
        bus.peek(0x01FB) & flags::B,
        0,
        "pushed P still marks a hardware interrupt"
    );
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER + 1, "NMI serviced once");
}

/// IRQ sequence at cycles 2-8 with an NMI edge arriving at `nmi_at`.
/// Returns the handler the sequence vectored to.
fn irq_vector_with_nmi_at(nmi_at: u64) -> u16 {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    bus.schedule(nmi_at, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.regs.pc
}

#[test]
fn nmi_by_fourth_sequence_cycle_takes_over_vector() {
    for nmi_at in 2..=6 {
        assert_eq!(irq_vector_with_nmi_at(nmi_at), NMI_HANDLER, "NMI at {nmi_at}");
    }
}

#[test]
fn nmi_during_status_push_is_too_late_for_vector() {
    for nmi_at in 7..=9 {
        assert_eq!(irq_vector_with_nmi_at(nmi_at), IRQ_HANDLER, "NMI at {nmi_at}");
    }
}

#[test]
fn nmi_during_brk_pushes_keeps_break_flag() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0x00, 0xFF]);
    // BRK runs at cycles 0-6.
    bus.schedule(4, Signal::AssertNmi);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
    assert_ne!(bus.peek(0x01FB) & flags::B, 0);
}

#[test]
fn nmi_during_vector_fetch_waits_for_first_handler_instruction() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0xEA, 0xEA]);
    bus.schedule(0, Signal::AssertIrq);
    bus.schedule(8, Signal::AssertNmi);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER + 1);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, NMI_HANDLER);
}

#[test]
fn brk_then_rti_restores_flags() {
    let (mut cpu, mut bus) = unmasked(0x0200, &[0x00, 0xFF, 0xEA]);
    bus.load(IRQ_HANDLER, &[0x40]);
    cpu.regs.p.set(flags::C);
    cpu.regs.p.set(flags::V);
    cpu.regs.p.set(flags::N);
    let before = cpu.regs.p;

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, IRQ_HANDLER);
    assert!(cpu.regs.p.is_set(flags::I));
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x0202);
    assert_eq!(cpu.regs.p, before);
    assert!(!cpu.regs.p.is_set(flags::B));
}
