// f0blink - NUCLEO-F042K6 clock bring-up and SysTick blinker
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use f0blink_config::SimulationManifest;
use f0blink_core::board::{LED, TOGGLE_PERIOD_TICKS};
use f0blink_core::{Clocks, Toggler};
use f0blink_sim::{Board, BusFault, RunSummary, SystemBus};

mod vcd_trace;

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "NUCLEO-F042K6 blinker on a register-level simulator",
    long_about = None
)]
struct Cli {
    /// Path to the simulation manifest (YAML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the simulated run length in milliseconds
    #[arg(short, long)]
    duration_ms: Option<u64>,

    /// Enable register-level tracing
    #[arg(short, long)]
    trace: bool,

    /// Write the PB3 waveform as VCD
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// Write the run report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write a board state snapshot (JSON) at the end of the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print the run report to stdout as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunStatus {
    Pass,
    ClockFault,
    BusFault,
}

#[derive(Debug, Serialize)]
struct ClockReport {
    sysclk_hz: u32,
    hclk_hz: u32,
    pclk_hz: u32,
    tick_rate_hz: u32,
    tick_period_cycles: u32,
}

impl From<Clocks> for ClockReport {
    fn from(clocks: Clocks) -> Self {
        Self {
            sysclk_hz: clocks.sysclk_hz,
            hclk_hz: clocks.hclk_hz,
            pclk_hz: clocks.pclk_hz,
            tick_rate_hz: clocks.tick_rate_hz,
            tick_period_cycles: clocks.tick_period_cycles(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RunReport {
    result_schema_version: String,
    status: RunStatus,
    board: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clocks: Option<ClockReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<RunSummary>,
    faults: Vec<BusFault>,
}

impl RunReport {
    fn new(board: &str, status: RunStatus) -> Self {
        Self {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status,
            board: board.to_string(),
            message: None,
            clocks: None,
            summary: None,
            faults: Vec::new(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine-readable
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let manifest = match load_manifest(&cli) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    run(&cli, &manifest)
}

fn load_manifest(cli: &Cli) -> anyhow::Result<SimulationManifest> {
    let mut manifest = match &cli.config {
        Some(path) => {
            info!("Loading simulation manifest: {:?}", path);
            SimulationManifest::from_file(path)?
        }
        None => SimulationManifest::default(),
    };

    if let Some(duration_ms) = cli.duration_ms {
        manifest.duration_ms = duration_ms;
        manifest.validate()?;
    }

    Ok(manifest)
}

fn run(cli: &Cli, manifest: &SimulationManifest) -> ExitCode {
    info!("Starting f0blink simulation");
    let mut board = Board::from_manifest(manifest);

    let clocks = match board.configure_clocks(manifest.wait.to_policy()) {
        Ok(clocks) => clocks,
        Err(e) => {
            error!("Clock configuration failed: {}", e);
            let mut report = RunReport::new(&manifest.name, RunStatus::ClockFault);
            report.message = Some(e.to_string());
            report.faults = board.bus().faults().to_vec();
            return finish(cli, &board, &report, EXIT_RUNTIME_ERROR);
        }
    };

    board.configure_led();
    let mut toggler = Toggler::new(LED, TOGGLE_PERIOD_TICKS);
    let summary = board.run_for(manifest.duration(), &mut |bus: &mut SystemBus| {
        toggler.on_tick(bus)
    });

    info!(
        "Ran {:?}: {} ticks, {} toggles, {:.3} Hz on PB{}",
        Duration::from_secs_f64(summary.elapsed_secs),
        summary.ticks,
        summary.toggles,
        summary.observed_frequency_hz,
        LED.index()
    );

    let faults = board.bus().faults().to_vec();
    let (status, code) = if faults.is_empty() {
        (RunStatus::Pass, EXIT_PASS)
    } else {
        for fault in &faults {
            warn!("Bus fault: {}", fault);
        }
        (RunStatus::BusFault, EXIT_RUNTIME_ERROR)
    };

    let mut report = RunReport::new(&manifest.name, status);
    report.clocks = Some(clocks.into());
    report.summary = Some(summary);
    report.faults = faults;

    if let Some(path) = &cli.vcd {
        if let Err(e) = vcd_trace::write_waveform(
            path,
            board.waveform(),
            board.total_cycles(),
            board.bus().hclk_hz(),
        ) {
            error!("Failed to write VCD {:?}: {:#}", path, e);
            return finish(cli, &board, &report, EXIT_RUNTIME_ERROR);
        }
        info!("Waveform written to {:?}", path);
    }

    finish(cli, &board, &report, code)
}

/// Writes the report and snapshot artifacts, then maps `code` to the exit code.
fn finish(cli: &Cli, board: &Board, report: &RunReport, code: u8) -> ExitCode {
    let mut code = code;

    if let Some(path) = &cli.report {
        if let Err(e) = write_json(path, report) {
            error!("Failed to write report {:?}: {:#}", path, e);
            code = EXIT_RUNTIME_ERROR;
        }
    }

    if let Some(path) = &cli.snapshot {
        if let Err(e) = write_json(path, &board.snapshot()) {
            error!("Failed to write snapshot {:?}: {:#}", path, e);
            code = EXIT_RUNTIME_ERROR;
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                code = EXIT_RUNTIME_ERROR;
            }
        }
    }

    ExitCode::from(code)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
