//! chartlib: command-line front end for the chart library.
//!
//! Renders, validates and converts chart JSON files without the editor UI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};

use chartlib::{
    generate_position_map, load_chart_file, serializer, validate_chart, write_svg, Chart,
    ChartError, Config, Platform, Timeline,
};

#[derive(Parser, Debug)]
#[command(name = "chartlib", about = "Rhythm game chart timing, path and export tool")]
struct Args {
    /// Path to a config JSON file.
    #[arg(long, env = "CHARTLIB_CONFIG")]
    config: Option<PathBuf>,

    /// Platform the pre-delay in chart files is expressed for.
    #[arg(long, value_enum)]
    platform: Option<PlatformArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a chart to chart_visualization.svg.
    Render {
        input: PathBuf,
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Pixels per world unit.
        #[arg(long)]
        scale: Option<f64>,
    },
    /// Print validation errors and warnings.
    Validate { input: PathBuf },
    /// Print the position map JSON.
    Positions {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert between the exported chart and autosave formats.
    Convert {
        input: PathBuf,
        #[arg(long, value_enum, default_value = "export")]
        to: Format,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the path position at a time or beat.
    Sample {
        input: PathBuf,
        /// Playback time in seconds.
        #[arg(long, conflicts_with = "beat")]
        time: Option<f64>,
        /// Beat on the chart-global grid.
        #[arg(long)]
        beat: Option<f64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PlatformArg {
    Windows,
    Macos,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::Macos => Platform::MacOs,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Export,
    Autosave,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, ChartError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(platform) = args.platform {
        config.platform = platform.into();
    }

    match args.command {
        Command::Render {
            input,
            out_dir,
            scale,
        } => {
            let chart = load(&input, &config)?;
            let mut options = config.svg;
            if let Some(scale) = scale.filter(|s| *s > 0.0) {
                options.scale = scale;
            }
            let path = write_svg(&chart, &options, &out_dir)?;
            println!("{}", path.display());
        }
        Command::Validate { input } => {
            let chart = load(&input, &config)?;
            let report = validate_chart(&chart);
            for e in &report.errors {
                println!("error: {e}");
            }
            for w in &report.warnings {
                println!("warning: {w}");
            }
            info!(
                "{}: {} errors, {} warnings",
                input.display(),
                report.errors.len(),
                report.warnings.len()
            );
            if !report.is_ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Positions { input, output } => {
            let chart = load(&input, &config)?;
            let json = serde_json::to_string_pretty(&generate_position_map(&chart))?;
            emit(&json, output.as_deref())?;
        }
        Command::Convert { input, to, output } => {
            let chart = load(&input, &config)?;
            let json = match to {
                Format::Export => serializer::export_chart_json(&chart, config.platform)?,
                Format::Autosave => serializer::autosave_to_json(&chart, config.platform)?,
            };
            emit(&json, output.as_deref())?;
        }
        Command::Sample { input, time, beat } => {
            let chart = load(&input, &config)?;
            let timeline = Timeline::compute(&chart);
            let position = match (time, beat) {
                (_, Some(beat)) => timeline.path().position_at_beat(beat, timeline.context()),
                (time, None) => timeline.position_at_time(time.unwrap_or(0.0)),
            };
            match position {
                Some(p) => println!("{:.4} {:.4}", p.x, p.y),
                None => {
                    println!("no path");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load(input: &Path, config: &Config) -> Result<Chart, ChartError> {
    let mut chart = load_chart_file(input, config.platform)?;
    if let Some(multiplier) = config.speed_multiplier {
        chart.speed_multiplier = multiplier;
    }
    info!("loaded {} ({} notes)", input.display(), chart.notes.len());
    Ok(chart)
}

fn emit(text: &str, output: Option<&Path>) -> Result<(), ChartError> {
    match output {
        Some(path) => std::fs::write(path, text).map_err(|e| ChartError::io(path, e)),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
