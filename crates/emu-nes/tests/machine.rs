//! Whole-machine runs of small hand-assembled programs.
//!
//! Each program sets up one interrupt source (with the APU frame IRQ
//! inhibited unless it is the one under test), enables IRQs and idles; the
//! handler counts into zero page `$10`. The counts check that each source
//! reaches the CPU through the bus at the expected rate.

use emu_core::Frame;
use emu_nes::{Nes, NesConfig, NesRegion};

/// Place `code` at `offset` in `prg`.
fn put(prg: &mut [u8], offset: usize, code: &[u8]) {
    prg[offset..offset + code.len()].copy_from_slice(code);
}

/// Vectors at the top of `prg`: NMI, reset, IRQ.
fn vectors(prg: &mut [u8], nmi: u16, reset: u16, irq: u16) {
    let top = prg.len() - 6;
    for (i, v) in [nmi, reset, irq].into_iter().enumerate() {
        prg[top + i * 2] = v as u8;
        prg[top + i * 2 + 1] = (v >> 8) as u8;
    }
}

fn build(config: NesConfig) -> Nes {
    Nes::new(config, Box::new(|_: &Frame<'_>| {})).expect("machine")
}

fn irq_count(nes: &Nes) -> u8 {
    nes.bus().peek_ram(0x10)
}

#[test]
fn boots_and_waits_for_vblank() {
    let mut prg = vec![0xEA; 0x8000];
    put(
        &mut prg,
        0,
        &[
            0x78, // SEI
            0xD8, // CLD
            0xA2, 0xFF, // LDX #$FF
            0x9A, // TXS
            0xAD, 0x02, 0x20, // vblank1: LDA $2002
            0x10, 0xFB, //          BPL vblank1
            0xAD, 0x02, 0x20, // vblank2: LDA $2002
            0x10, 0xFB, //          BPL vblank2
            0x4C, 0x0F, 0x80, // idle: JMP $800F
        ],
    );
    vectors(&mut prg, 0x8000, 0x8000, 0x8000);
    let mut nes = build(NesConfig {
        prg_rom: prg,
        ..NesConfig::default()
    });
    assert_eq!(nes.cpu().regs.pc, 0x8000);

    let idle = 0x800Fu16..=0x8011;
    for _ in 0..4 {
        nes.run_frame();
    }
    assert!(idle.contains(&nes.cpu().regs.pc), "PC ${:04X}", nes.cpu().regs.pc);
}

#[test]
fn apu_frame_irq_once_per_sequence() {
    let mut prg = vec![0xEA; 0x8000];
    // CLI; JMP $8001. Handler: INC $10; LDA $4015; RTI.
    put(&mut prg, 0, &[0x58, 0x4C, 0x01, 0x80]);
    put(&mut prg, 0x100, &[0xE6, 0x10, 0xAD, 0x15, 0x40, 0x40]);
    vectors(&mut prg, 0x8000, 0x8000, 0x8100);
    let mut nes = build(NesConfig {
        prg_rom: prg,
        ..NesConfig::default()
    });
    for _ in 0..10 {
        nes.run_frame();
    }
    // First flag at cycle 29829, then every 29830.
    let expected = (nes.cpu().cycles() - 29_829) / 29_830 + 1;
    let fired = u64::from(irq_count(&nes));
    assert!(fired.abs_diff(expected) <= 1, "{fired} vs {expected}");
}

#[test]
fn mmc3_scanline_irq() {
    let mut prg = vec![0xEA; 0x8000];
    put(
        &mut prg,
        0,
        &[
            0x78, 0xD8, 0xA2, 0xFF, 0x9A, // SEI; CLD; LDX #$FF; TXS
            0xA9, 0x40, 0x8D, 0x17, 0x40, // frame IRQ off
            0xA9, 0x08, 0x8D, 0x00, 0x20, // sprites from $1000
            0xA9, 0x18, 0x8D, 0x01, 0x20, // rendering on
            0xA9, 0x0A, 0x8D, 0x00, 0xC0, // latch 10
            0x8D, 0x01, 0xC0, // reload
            0x8D, 0x01, 0xE0, // enable
            0x58, // CLI
            0x4C, 0x20, 0x80, // JMP $8020
        ],
    );
    // INC $10; STA $E000; STA $E001; RTI
    put(
        &mut prg,
        0x100,
        &[0xE6, 0x10, 0x8D, 0x00, 0xE0, 0x8D, 0x01, 0xE0, 0x40],
    );
    vectors(&mut prg, 0x8000, 0x8000, 0x8100);
    let mut nes = build(NesConfig {
        prg_rom: prg,
        mapper: 4,
        ..NesConfig::default()
    });
    nes.run_frame();
    let before = irq_count(&nes);
    nes.run_frame();
    let per_frame = irq_count(&nes).wrapping_sub(before);
    // One A12 rise per rendered line, an IRQ every 11.
    assert!((21..=22).contains(&per_frame), "{per_frame}");
}

#[test]
fn disk_system_timer_irq() {
    let mut bios = vec![0xEA; 0x2000];
    put(
        &mut bios,
        0,
        &[
            0x78, // SEI
            0xA9, 0x40, 0x8D, 0x17, 0x40, // frame IRQ off
            0xA9, 0x01, 0x8D, 0x23, 0x40, // disk I/O on
            0xA9, 0xE8, 0x8D, 0x20, 0x40, // reload $03E8
            0xA9, 0x03, 0x8D, 0x21, 0x40, //
            0xA9, 0x03, 0x8D, 0x22, 0x40, // repeat, enable
            0x58, // CLI
            0x4C, 0x1B, 0xE0, // JMP $E01B
        ],
    );
    // INC $10; LDA $4030; RTI
    put(&mut bios, 0x100, &[0xE6, 0x10, 0xAD, 0x30, 0x40, 0x40]);
    vectors(&mut bios, 0xE000, 0xE000, 0xE100);
    let mut nes = build(NesConfig {
        prg_rom: bios,
        disk_system: true,
        ..NesConfig::default()
    });
    nes.run_frame();
    let before = irq_count(&nes);
    let cycles = nes.run_frame();
    let fired = u64::from(irq_count(&nes).wrapping_sub(before));
    // One IRQ per 1001 cycles.
    let expected = cycles / 1001;
    assert!(fired.abs_diff(expected) <= 1, "{fired} vs {expected}");
}

#[test]
fn pal_machine_runs_longer_frames() {
    let mut prg = vec![0xEA; 0x4000];
    vectors(&mut prg, 0xC000, 0xC000, 0xC000);
    let mut nes = build(NesConfig {
        region: NesRegion::Pal,
        prg_rom: prg,
        ..NesConfig::default()
    });
    nes.run_frame();
    assert!(nes.run_frame() > 33_000);
}
