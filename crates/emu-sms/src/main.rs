//! Master System emulator binary.
//!
//! Runs a cartridge image headless for a number of frames and reports
//! where the Z80 ended up. `RUST_LOG` controls logging (`emu_sms=trace`
//! shows every delivered frame, `zilog_z80=trace` every interrupt).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use emu_core::{Frame, Observable};
use emu_sms::{SlotMapper, Sms, SmsConfig, SmsRegion};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zilog_z80::Z80;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RegionArg {
    Ntsc,
    Pal,
    Japan,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapperArg {
    Sega,
    Codemasters,
    Generic,
}

#[derive(Debug, Parser)]
#[command(name = "emu-sms", about = "Headless Master System")]
struct Args {
    /// Cartridge ROM image.
    rom: PathBuf,
    #[arg(long, value_enum, default_value_t = RegionArg::Ntsc)]
    region: RegionArg,
    /// Slot mapper. Guessed from the image size when omitted.
    #[arg(long, value_enum)]
    mapper: Option<MapperArg>,
    /// Frames to run.
    #[arg(long, default_value_t = 60)]
    frames: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("reading ROM image {}", args.rom.display()))?;

    let region = match args.region {
        RegionArg::Ntsc => SmsRegion::Ntsc,
        RegionArg::Pal => SmsRegion::Pal,
        RegionArg::Japan => SmsRegion::Japan,
    };
    let mut config = SmsConfig::new(region, rom);
    if let Some(mapper) = args.mapper {
        config.slot_mapper = match mapper {
            MapperArg::Sega => SlotMapper::Sega,
            MapperArg::Codemasters => SlotMapper::Codemasters,
            MapperArg::Generic => SlotMapper::Generic,
        };
    }

    let mut sms = Sms::new(config, Z80::new(), Box::new(|_: &Frame<'_>| {}))
        .context("building the machine")?;
    let mut cycles = 0;
    for _ in 0..args.frames {
        cycles += sms.run_frame();
    }

    info!(
        frames = sms.frame_count(),
        cycles,
        pc = format_args!("${:04X}", sms.cpu().regs.pc),
        "run complete"
    );
    if let Some(af) = sms.cpu().query("af") {
        info!(af = %af, "final AF");
    }
    Ok(())
}
