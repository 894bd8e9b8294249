//! Clusterdrop: rotate rows and invert columns to build 3×3 single-colour clusters
//! on a rising black-and-white board, in the terminal.

mod animator;
mod app;
mod board;
mod config;
mod game;
mod gravity;
mod highscores;
mod input;
mod matching;
mod particles;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use config::Tuning;
use std::path::PathBuf;

/// Options derived from CLI that drive the simulation and the frame loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tuning: Tuning,
    pub seed: u64,
    pub frame_rate: f64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let defaults = Tuning::default();
    let tuning = Tuning {
        hold_time: args.hold_time.unwrap_or(defaults.hold_time),
        fall_speed: args.fall_speed.unwrap_or(defaults.fall_speed),
        slide_rate: args.slide_rate.unwrap_or(defaults.slide_rate),
        morph_rate: args.morph_rate.unwrap_or(defaults.morph_rate),
        intake_rate: args.intake_rate.unwrap_or(defaults.intake_rate),
        ..defaults
    };
    tuning.validate()?;
    let config = GameConfig {
        tuning,
        seed: args.seed.unwrap_or_else(rand::random),
        frame_rate: config::validate_frame_rate(args.frame_rate)?,
        no_animation: args.no_animation,
    };

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded, using defaults: {e}");
        theme::Theme::default_for(args.palette)
    });
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// The terminal is in alternate-screen mode, so logs only go to a file.
fn init_logging(log_file: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = log_file else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Black-and-white cluster puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "clusterdrop",
    version,
    about = "Rotate rows and invert columns to make 3×3 single-colour clusters before the board fills.",
    long_about = "Clusterdrop is a terminal puzzle on a 10×15 board of black and white pieces.\n\n\
        Rotate a row one step right, or swap black and white down a column. Every 3×3 block of \
        one colour bursts for 100 points and the pieces above fall into the hole. A new row \
        keeps rising from below.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Space/Enter  Rotate row   x / i / Tab  Invert column\n  \
        P              Pause         R            Restart      Q / Esc      Quit\n\n\
        MOUSE:\n  Left click rotates the row under the pointer, right click inverts the column.\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Seed for the board and incoming rows. Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Hold time before a detached piece starts to fall (units; decays at 10/s).
    #[arg(long, value_name = "UNITS")]
    pub hold_time: Option<f32>,

    /// Falling piece slide speed in pixels per second (tiles are 32 px).
    #[arg(long, value_name = "PX_PER_SEC")]
    pub fall_speed: Option<f32>,

    /// Row rotation slide speed in pixels per second.
    #[arg(long, value_name = "PX_PER_SEC")]
    pub slide_rate: Option<f32>,

    /// Column inversion morph speed in phase units per second (a morph lasts 120).
    #[arg(long, value_name = "RATE")]
    pub morph_rate: Option<f32>,

    /// Rise speed of the incoming row in pixels per second.
    #[arg(long, value_name = "PX_PER_SEC")]
    pub intake_rate: Option<f32>,

    /// Target frames (and simulation steps) per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the cluster-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
