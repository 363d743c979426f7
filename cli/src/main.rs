//! Tonestack offline host
//!
//! Stands in for the device layer: renders a sine test tone through the
//! engine block by block and prints one JSON line per block.
//!
//! ```text
//! tonestack [--rig PATH] [--save PATH] [--freq HZ] [--blocks N]
//!           [--sample-rate HZ] [--block-size N]
//!           [--enable STAGE]... [--set STAGE.CONTROL=VALUE]...
//!           [--cabinet NAME] [--modulation TYPE]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tonestack_core::{BufferReport, Engine, EngineConfig, RigSettings, StreamConfig};

#[derive(Parser, Debug)]
#[command(name = "tonestack", about = "Render a test tone through the Tonestack engine")]
struct Cli {
    /// Rig file to apply before rendering
    #[arg(long)]
    rig: Option<PathBuf>,

    /// Save the final rig here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Test tone frequency in Hz
    #[arg(long = "freq", default_value_t = 110.0)]
    frequency: f32,

    /// Number of blocks to render
    #[arg(long, default_value_t = 16)]
    blocks: usize,

    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    #[arg(long, default_value_t = 4096)]
    block_size: u32,

    /// Enable a stage (repeatable)
    #[arg(long)]
    enable: Vec<String>,

    /// Set a control as STAGE.CONTROL=VALUE (repeatable)
    #[arg(long = "set", value_parser = parse_control)]
    controls: Vec<ControlArg>,

    /// Cabinet preset name
    #[arg(long)]
    cabinet: Option<String>,

    /// Modulation type (chorus, flanger, tremolo)
    #[arg(long)]
    modulation: Option<String>,
}

impl Cli {
    fn stream(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
        }
    }
}

/// One `--set STAGE.CONTROL=VALUE` argument
#[derive(Debug, Clone, PartialEq)]
struct ControlArg {
    stage: String,
    control: String,
    value: f32,
}

fn parse_control(arg: &str) -> Result<ControlArg, String> {
    let (target, number) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE.CONTROL=VALUE, got {}", arg))?;
    let (stage, control) = target
        .split_once('.')
        .ok_or_else(|| format!("expected STAGE.CONTROL, got {}", target))?;
    let value = number
        .parse()
        .map_err(|e| format!("invalid value {}: {}", number, e))?;

    Ok(ControlArg {
        stage: stage.to_string(),
        control: control.to_string(),
        value,
    })
}

fn report_line(block: usize, report: &BufferReport) -> serde_json::Value {
    json!({
        "block": block,
        "input_level": report.input_level.normalized_level,
        "output_level": report.output_level.normalized_level,
        "pitch": {
            "frequency_hz": report.pitch.frequency_hz,
            "note": report.pitch.note_name,
            "cents": report.pitch.cents_deviation,
            "voiced": report.pitch.is_voiced,
        },
    })
}

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tonestack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = Cli::parse();

    let config = EngineConfig {
        stream: options.stream(),
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(config).context("failed to create engine")?;

    if let Some(path) = &options.rig {
        let rig = RigSettings::load(path)?;
        engine.apply_settings(&rig);
    }
    for stage in &options.enable {
        engine.set_stage_enabled(stage, true)?;
    }
    for arg in &options.controls {
        engine.set_control(&arg.stage, &arg.control, arg.value)?;
    }
    if let Some(name) = &options.cabinet {
        engine.select_cabinet_preset(name)?;
    }
    if let Some(name) = &options.modulation {
        engine.select_modulation_type(name)?;
    }

    engine.start()?;
    info!(
        "Rendering {} blocks of {:.1} Hz through cabinet '{}'",
        options.blocks,
        options.frequency,
        engine.active_cabinet_preset()
    );

    let stream = engine.config().stream;
    let block_size = stream.block_size as usize;
    let block_duration = stream.block_duration();
    let phase_step = 2.0 * std::f32::consts::PI * options.frequency / stream.sample_rate as f32;

    let mut phase = 0.0_f32;
    let mut input = vec![0.0_f32; block_size];
    let mut output = vec![0.0_f32; block_size];

    for block in 0..options.blocks {
        for sample in input.iter_mut() {
            *sample = phase.sin() * 0.5;
            phase = (phase + phase_step) % (2.0 * std::f32::consts::PI);
        }

        let report = engine.process_buffer(&input, &mut output)?;
        println!("{}", report_line(block, &report));

        // Pace like a device so the LFO clock advances between blocks
        std::thread::sleep(block_duration.min(Duration::from_millis(100)));
    }

    while let Some(event) = engine.poll_event() {
        info!("event: {}", serde_json::to_string(&event)?);
    }
    let stats = engine.stats();
    info!(
        "Processed {} blocks ({} late, {} LFO ticks dropped)",
        stats.buffers_processed, stats.late_buffers, stats.lfo_ticks_dropped
    );

    engine.stop()?;

    if let Some(path) = &options.save {
        engine.snapshot("cli").save(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let options = Cli::try_parse_from(["tonestack"]).unwrap();
        assert_eq!(options.blocks, 16);
        assert_eq!(options.stream(), StreamConfig::default());
        assert!(options.rig.is_none());
    }

    #[test]
    fn test_parse_controls() {
        let options = Cli::try_parse_from([
            "tonestack",
            "--set",
            "distortion.drive=0.8",
            "--enable",
            "distortion",
            "--enable",
            "delay",
            "--cabinet",
            "Vintage 4x12",
            "--block-size",
            "1024",
        ])
        .unwrap();

        assert_eq!(
            options.controls,
            vec![ControlArg {
                stage: "distortion".to_string(),
                control: "drive".to_string(),
                value: 0.8,
            }]
        );
        assert_eq!(options.enable, vec!["distortion", "delay"]);
        assert_eq!(options.cabinet.as_deref(), Some("Vintage 4x12"));
        assert_eq!(options.stream().block_size, 1024);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Cli::try_parse_from(["tonestack", "--wobble"]).is_err());
        assert!(Cli::try_parse_from(["tonestack", "--freq"]).is_err());
        assert!(Cli::try_parse_from(["tonestack", "--set", "drive=0.5"]).is_err());
        assert!(Cli::try_parse_from(["tonestack", "--set", "distortion.drive"]).is_err());
        assert!(Cli::try_parse_from(["tonestack", "--set", "distortion.drive=loud"]).is_err());
    }
}
