//! Runs a landmark recording through the gesture pipeline without a window
//! and prints every page turn it would cause.
//!
//! Usage: gesture_replay RECORDING.jsonl [--config FILE] [--trace FILE] [--pages N]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use gesture_reader::classifier::GestureKind;
use gesture_reader::config::GestureConfig;
use gesture_reader::data::GestureTraceExporter;
use gesture_reader::navigator::PageNavigator;
use gesture_reader::pipeline::GesturePipeline;
use gesture_reader::source::ReplaySource;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut recording = None;
    let mut config_path = None;
    let mut trace_path = None;
    let mut pages = 100usize;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(args.next().context("--config needs a file")?)),
            "--trace" => trace_path = Some(PathBuf::from(args.next().context("--trace needs a file")?)),
            "--pages" => {
                pages = args
                    .next()
                    .context("--pages needs a number")?
                    .parse()
                    .context("--pages expects a number")?
            }
            flag if flag.starts_with("--") => bail!("Unknown option {}", flag),
            _ => recording = Some(PathBuf::from(&arg)),
        }
    }
    let recording = recording
        .context("Usage: gesture_replay RECORDING.jsonl [--config FILE] [--trace FILE] [--pages N]")?;

    let config = GestureConfig::resolve(config_path.as_deref())?;
    let mut pipeline = GesturePipeline::new(config).context("Invalid gesture configuration")?;
    let mut navigator = PageNavigator::new(pages);
    let mut trace = trace_path.map(GestureTraceExporter::for_path).transpose()?;

    let mut frames = 0u64;
    let mut mouth_touches = 0u64;
    let mut turns = 0u64;
    for frame in ReplaySource::open(&recording)? {
        let frame = frame?;
        let outcome = pipeline.tick(&frame);
        frames += 1;
        if outcome.event.kind == GestureKind::MouthTouch {
            mouth_touches += 1;
        }
        if let Some(trace) = trace.as_mut() {
            trace.add_tick(&outcome, pipeline.state())?;
        }
        if let Some(command) = outcome.command {
            turns += 1;
            navigator.apply(command);
            let (left, right) = navigator.spread().page_numbers();
            println!(
                "{:>9.3}s  {:<8}  {:<10}  pages {}-{}",
                frame.timestamp,
                command.as_str(),
                outcome.event.kind.as_str(),
                left.map_or("-".to_string(), |p| p.to_string()),
                right.map_or("-".to_string(), |p| p.to_string()),
            );
        }
    }

    if let Some(trace) = trace {
        trace.finish()?;
    }
    println!(
        "{} frames, {} mouth touches, {} page turns (final state: {})",
        frames,
        mouth_touches,
        turns,
        pipeline.state().label()
    );
    Ok(())
}
