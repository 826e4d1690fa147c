// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use synpad_config::{ConditionSet, MachineManifest};
use synpad_core::cpu::Arm7;
use synpad_core::metrics::{MetricsReport, PerformanceMetrics};
use synpad_core::video::{FrameBuffer, HeadlessPresenter};
use synpad_core::{Cpu, DebugControl, Machine, StopReason};
use tracing::{error, info};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const SUMMARY_SCHEMA_VERSION: &str = "1.0";

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "SynPad ARM/Thumb emulator", long_about = None)]
struct Cli {
    /// Path to the machine manifest (YAML)
    #[arg(short, long)]
    system: Option<PathBuf>,

    /// Boot image copied into the boot region
    #[arg(long)]
    boot: Option<PathBuf>,

    /// Cartridge image copied into the cartridge region
    #[arg(long)]
    cartridge: Option<PathBuf>,

    /// Program to run: ELF, or a raw binary placed at the RAM base
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Maximum number of steps to execute (default: manifest limit)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Breakpoint PC address (repeatable). Stops simulation when PC matches.
    #[arg(long, value_parser = parse_u32_addr)]
    breakpoint: Vec<u32>,

    /// Write a machine snapshot (JSON) when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print a JSON run summary on stdout
    #[arg(long)]
    json: bool,

    /// Enable instruction-level execution tracing
    #[arg(short, long)]
    trace: bool,

    /// Evaluate all sixteen ARM condition codes
    #[arg(long)]
    full_conditions: bool,
}

#[derive(Debug, Serialize)]
struct ImageDigest {
    role: &'static str,
    path: PathBuf,
    sha256: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    summary_schema_version: String,
    machine: String,
    stop_reason: StopReason,
    steps_executed: u64,
    pc: u32,
    thumb: bool,
    status_word: u32,
    registers: Vec<u32>,
    interrupt_pending: bool,
    frames_presented: u64,
    metrics: MetricsReport,
    images: Vec<ImageDigest>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    run(cli)
}

fn run(cli: Cli) -> ExitCode {
    info!("Starting SynPad");

    let manifest = match prepare_manifest(&cli) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut machine = match synpad_core::system::build_machine(&manifest) {
        Ok(machine) => machine,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let metrics = Arc::new(PerformanceMetrics::new());
    machine.observers.push(metrics.clone());
    metrics.reset();

    let program_path = program_path(&cli, &manifest);
    if let Some(path) = &program_path {
        let ram_base = machine.bus.memory_map().ram.base;
        info!("Loading program: {:?}", path);
        let program = match synpad_loader::load_program(path, ram_base) {
            Ok(program) => program,
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        };
        if let Err(e) = machine.load_program(&program) {
            error!("Failed to load program into memory: {}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    for addr in &cli.breakpoint {
        machine.add_breakpoint(*addr);
    }

    let max_steps = cli.max_steps.unwrap_or(manifest.limits.max_steps);
    let frame_interval = u64::from(manifest.limits.frame_interval.max(1));
    let mut presenter = HeadlessPresenter::new();
    let stop_reason = run_simulation_loop(
        &mut machine,
        &mut presenter,
        max_steps,
        frame_interval,
        &metrics,
        cli.trace,
    );
    machine.stop();

    if let Some(path) = &cli.snapshot {
        if let Err(e) = write_snapshot(path, &machine) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    }

    report_metrics(&machine, &metrics, &stop_reason);

    if cli.json {
        let summary = RunSummary {
            summary_schema_version: SUMMARY_SCHEMA_VERSION.to_string(),
            machine: manifest.name.clone(),
            stop_reason,
            steps_executed: machine.total_steps,
            pc: machine.cpu.get_pc(),
            thumb: machine.cpu.in_thumb(),
            status_word: machine.cpu.status_word(),
            registers: (0..16).map(|r| machine.cpu.get_register(r)).collect(),
            interrupt_pending: machine.interrupt_pending(),
            frames_presented: presenter.frames_presented(),
            metrics: metrics.report(),
            images: image_digests(&manifest, program_path.as_deref()),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize run summary: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    ExitCode::from(EXIT_PASS)
}

/// Load the manifest and fold command-line overrides into it.
fn prepare_manifest(cli: &Cli) -> anyhow::Result<MachineManifest> {
    let mut manifest = synpad_core::system::load_manifest(cli.system.as_deref())?;
    let cwd = std::env::current_dir()?;

    if let Some(boot) = &cli.boot {
        manifest.images.boot = Some(cwd.join(boot).to_string_lossy().into_owned());
    }
    if let Some(cartridge) = &cli.cartridge {
        manifest.images.cartridge = Some(cwd.join(cartridge).to_string_lossy().into_owned());
    }
    if cli.full_conditions {
        manifest.cpu.condition_codes = ConditionSet::Full;
    }
    Ok(manifest)
}

fn program_path(cli: &Cli, manifest: &MachineManifest) -> Option<PathBuf> {
    cli.image.clone().or_else(|| {
        manifest
            .images
            .program
            .as_deref()
            .map(|p| manifest.resolve_path(p))
    })
}

fn run_simulation_loop(
    machine: &mut Machine<Arm7>,
    presenter: &mut HeadlessPresenter,
    max_steps: u64,
    frame_interval: u64,
    metrics: &PerformanceMetrics,
    trace: bool,
) -> StopReason {
    let frame = FrameBuffer::new();
    let mut remaining = max_steps;

    info!("Running for {} steps...", max_steps);
    while remaining > 0 {
        let chunk = remaining.min(frame_interval);
        match machine.run(Some(chunk)) {
            StopReason::MaxStepsReached => {
                remaining -= chunk;
                frame.present(&mut *presenter);
                if !trace {
                    info!(
                        "Progress: {} steps, current IPS: {:.2}",
                        machine.total_steps,
                        metrics.get_ips()
                    );
                }
            }
            other => {
                if let StopReason::Breakpoint(pc) = other {
                    info!(
                        "Breakpoint hit at PC={:#x} (step={})",
                        pc, machine.total_steps
                    );
                }
                return other;
            }
        }
    }
    StopReason::MaxStepsReached
}

fn write_snapshot(path: &Path, machine: &Machine<Arm7>) -> anyhow::Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot parent dir {:?}", parent))?;
    }
    let json = machine
        .snapshot()
        .to_json()
        .context("Failed to serialize snapshot")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write snapshot {:?}", path))?;
    info!("Snapshot written to {:?}", path);
    Ok(())
}

fn sha256_hex(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            Some(format!("{:x}", hasher.finalize()))
        }
        Err(e) => {
            error!("Failed to read {:?} for hashing: {}", path, e);
            None
        }
    }
}

fn image_digests(manifest: &MachineManifest, program: Option<&Path>) -> Vec<ImageDigest> {
    let boot = manifest
        .images
        .boot
        .as_deref()
        .map(|p| ("boot", manifest.resolve_path(p)));
    let cartridge = manifest
        .images
        .cartridge
        .as_deref()
        .map(|p| ("cartridge", manifest.resolve_path(p)));
    let program = program.map(|p| ("program", p.to_path_buf()));

    [boot, cartridge, program]
        .into_iter()
        .flatten()
        .filter_map(|(role, path)| {
            sha256_hex(&path).map(|sha256| ImageDigest { role, path, sha256 })
        })
        .collect()
}

fn report_metrics(machine: &Machine<Arm7>, metrics: &PerformanceMetrics, reason: &StopReason) {
    let report = metrics.report();
    info!("Simulation loop finished: {:?}", reason);
    info!("Final PC: {:#x}", machine.cpu.get_pc());
    info!("Total Instructions: {}", report.instructions);
    info!("Skipped (condition failed): {}", report.skipped);
    info!("Faults: {}", report.faults);
    info!("Average IPS: {:.2}", report.ips);
}
