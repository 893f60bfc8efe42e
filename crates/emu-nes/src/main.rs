//! NES emulator binary.
//!
//! Runs a raw PRG image headless for a number of frames and reports where
//! the CPU ended up. `RUST_LOG` controls logging (`emu_nes=trace` shows
//! every delivered frame).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use emu_core::{Frame, Observable};
use emu_nes::{Mirroring, Nes, NesConfig, NesRegion};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RegionArg {
    Ntsc,
    Pal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MirroringArg {
    Horizontal,
    Vertical,
}

#[derive(Debug, Parser)]
#[command(name = "emu-nes", about = "Headless NES timing core")]
struct Args {
    /// PRG ROM image (raw, no header), or the BIOS with --disk-system.
    prg: PathBuf,
    /// CHR ROM image. Omit for CHR RAM.
    #[arg(long)]
    chr: Option<PathBuf>,
    /// iNES mapper number.
    #[arg(long, default_value_t = 0)]
    mapper: u16,
    #[arg(long, value_enum, default_value_t = RegionArg::Ntsc)]
    region: RegionArg,
    /// Hardwired nametable mirroring.
    #[arg(long, value_enum, default_value_t = MirroringArg::Horizontal)]
    mirroring: MirroringArg,
    /// Run as a Famicom Disk System with the image as BIOS.
    #[arg(long)]
    disk_system: bool,
    /// Frames to run.
    #[arg(long, default_value_t = 60)]
    frames: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let prg_rom = std::fs::read(&args.prg)
        .with_context(|| format!("reading PRG image {}", args.prg.display()))?;
    let chr_rom = match &args.chr {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("reading CHR image {}", path.display()))?,
        None => Vec::new(),
    };

    let config = NesConfig {
        region: match args.region {
            RegionArg::Ntsc => NesRegion::Ntsc,
            RegionArg::Pal => NesRegion::Pal,
        },
        prg_rom,
        chr_rom,
        mirroring: match args.mirroring {
            MirroringArg::Horizontal => Mirroring::Horizontal,
            MirroringArg::Vertical => Mirroring::Vertical,
        },
        mapper: args.mapper,
        disk_system: args.disk_system,
    };

    let mut nes = Nes::new(config, Box::new(|_: &Frame<'_>| {}))
        .context("building the machine")?;
    let mut cycles = 0;
    for _ in 0..args.frames {
        cycles += nes.run_frame();
    }

    info!(
        frames = nes.frame_count(),
        cycles,
        pc = format_args!("${:04X}", nes.cpu().regs.pc),
        "run complete"
    );
    if let Some(state) = nes.query("cpu.p") {
        info!(p = %state, "final status");
    }
    Ok(())
}
