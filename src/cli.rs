use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, info};

use minirender::{RendererKind, Settings, create_renderer};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum Pipeline {
    Rasterization,
    Raytracing,
}

impl From<Pipeline> for RendererKind {
    fn from(pipeline: Pipeline) -> Self {
        match pipeline {
            Pipeline::Rasterization => RendererKind::Rasterization,
            Pipeline::Raytracing => RendererKind::Raytracing,
        }
    }
}

/// Renders a Wavefront OBJ model to a PNG image on the CPU.
#[derive(Parser)]
#[command(name = "minirender-cli")]
struct Args {
    /// TOML settings file, defaults are used for everything it doesn't set
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    debug_level: LogLevel,

    #[arg(short, long)]
    renderer: Option<Pipeline>,

    /// Image width in pixels
    #[arg(long)]
    width: Option<usize>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<usize>,

    #[arg(short, long)]
    model: Option<PathBuf>,

    /// MTL file with material colors
    #[arg(long)]
    material: Option<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ray tracing recursion depth
    #[arg(short, long)]
    depth: Option<usize>,

    /// Fisheye distortion factor of the rasterizer, 0 disables it
    #[arg(long)]
    fish_eye: Option<f32>,

    /// Number of ray generation threads
    #[arg(long)]
    workers: Option<NonZeroUsize>,
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(renderer) = &self.renderer {
            settings.renderer = renderer.clone().into();
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(model) = &self.model {
            settings.model_path = model.clone();
        }
        if let Some(material) = &self.material {
            settings.material_path = Some(material.clone());
        }
        if let Some(output) = &self.output {
            settings.result_path = output.clone();
        }
        if let Some(depth) = self.depth {
            settings.raytracing_depth = depth;
        }
        if let Some(fish_eye) = self.fish_eye {
            settings.fish_eye = fish_eye;
        }
        if let Some(workers) = self.workers {
            settings.worker_count = Some(workers);
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.debug_level.clone().into())
        .init();

    let settings = args.settings().context("Invalid settings")?;
    info!(
        "Rendering {:?} with {:?} at {}x{}",
        settings.model_path, settings.renderer, settings.width, settings.height
    );

    // Only the ray tracer reports rows
    let bar = match settings.renderer {
        RendererKind::Raytracing => ProgressBar::new(settings.height as u64),
        RendererKind::Rasterization => ProgressBar::hidden(),
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} rows, {elapsed}")
            .context("Progress bar template")?,
    );

    let mut renderer = create_renderer(settings);
    renderer.set_progress_callback({
        let bar = bar.clone();
        Box::new(move |_row| bar.inc(1))
    });

    renderer.init()?;
    renderer.render()?;
    bar.finish();

    Ok(())
}
