//! Schematic Runner
//!
//! Drives the live plant schematic headless: telemetry ticks on the refresh
//! interval, operator commands from stdin, one line of output per tick.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use schematic_core::{
    NetworkModel, NodeId, RenderSnapshot, RngSource, SchematicView, TelemetryConfig,
    TelemetrySimulator, ViewSettings, ViewportConfig,
};
use schematic_runner::{Driver, DriverHandle, Line, TickOutput};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "schematic", about = "Live water-treatment schematic, headless")]
struct Args {
    /// Milliseconds between telemetry ticks
    #[arg(long, default_value = "5000")]
    refresh_ms: u64,

    /// Seed for a reproducible telemetry run
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Output per tick
    #[arg(long, default_value = "summary", value_parser = ["json", "summary"])]
    format: String,

    /// Topology JSON to load instead of the reference plant
    #[arg(long)]
    topology: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let result = runtime.block_on(run(args));
    // The stdin reader sits in a blocking read; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = ViewSettings::default().with_refresh_millis(args.refresh_ms)?;
    let model = match &args.topology {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read topology {}", path.display()))?;
            NetworkModel::from_json(&json)?
        }
        None => NetworkModel::initialize(),
    };
    let source = match args.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_entropy(),
    };
    let view = SchematicView::new(
        model,
        TelemetrySimulator::new(TelemetryConfig::default(), source),
        ViewportConfig::default(),
        settings,
    );

    let (mut driver, handle) = Driver::new(view);
    if let Some(ticks) = args.ticks {
        driver = driver.with_tick_limit(ticks);
    }
    let mut outputs = driver.subscribe();
    let driver_task = tokio::spawn(driver.run());
    let json = args.format == "json";

    tokio::spawn(read_commands(handle.clone(), json));
    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_handle.shutdown().await;
        }
    });
    drop(handle);

    while let Some(output) = outputs.recv().await {
        print_tick(&output, json)?;
    }

    let view = driver_task.await.context("Driver task failed")?;
    tracing::info!(ticks = view.simulator().ticks(), "Done");
    Ok(())
}

async fn read_commands(handle: DriverHandle, json: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match line.parse::<Line>() {
            Ok(Line::Command(command)) => handle.send(command).await,
            Ok(Line::Print) => handle
                .snapshot()
                .await
                .map(|snapshot| print_snapshot(&snapshot, json)),
            Ok(Line::Inspect) => handle.inspect().await.map(|details| {
                println!("{}", details.unwrap_or_else(|| "no selection".to_owned()));
            }),
            Ok(Line::Quit) => {
                handle.shutdown().await;
                break;
            }
            Err(err) => {
                tracing::warn!(%err, line = %line.trim(), "Ignoring command");
                Ok(())
            }
        };

        if result.is_err() {
            break;
        }
    }
}

fn print_tick(output: &TickOutput, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", output.snapshot.to_json()?);
    } else {
        let report = &output.report;
        println!(
            "tick {} at {}: {} nodes, {} edges updated, {} status changes, {} skipped | {}",
            report.tick,
            report.at.format("%H:%M:%S"),
            report.updated_nodes,
            report.updated_edges,
            report.status_changes.len(),
            report.skipped.len(),
            summary(&output.snapshot),
        );
    }
    Ok(())
}

fn print_snapshot(snapshot: &RenderSnapshot, json: bool) {
    if json {
        match snapshot.to_json() {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::warn!(%err, "Failed to encode snapshot"),
        }
    } else {
        println!(
            "tick {} | zoom {:.1} pan ({:.0}, {:.0}) | selected {} | {}",
            snapshot.tick,
            snapshot.transform.zoom,
            snapshot.transform.pan.x,
            snapshot.transform.pan.y,
            snapshot.selected.as_ref().map_or("none", NodeId::as_str),
            summary(snapshot),
        );
    }
}

fn summary(snapshot: &RenderSnapshot) -> String {
    let counts = &snapshot.counts;
    format!(
        "normal {} warning {} critical {} inactive {}",
        counts.normal, counts.warning, counts.critical, counts.inactive
    )
}
