use std::env;
use std::fmt;

use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Runtime configuration for the demo tracer binary. The library itself is
/// configured entirely through its API; these settings only shape the sample
/// pin-cell problem and its track layout.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Number of pin cells along each side of the lattice.
    #[serde(default = "default_lattice_size")]
    pub lattice_size: usize,
    /// Centre-to-centre pin spacing in cm.
    #[serde(default = "default_pin_pitch")]
    pub pin_pitch: f64,
    /// Fuel pin radius in cm.
    #[serde(default = "default_fuel_radius")]
    pub fuel_radius: f64,
    /// Equal-area rings per fuel pin.
    #[serde(default = "default_num_rings")]
    pub num_rings: u32,
    /// Angular sectors per fuel pin.
    #[serde(default = "default_num_sectors")]
    pub num_sectors: u32,
    /// Azimuthal angles in (0, pi).
    #[serde(default = "default_num_azim")]
    pub num_azim: usize,
    /// Perpendicular spacing between tracks in cm.
    #[serde(default = "default_track_spacing")]
    pub track_spacing: f64,
}

fn default_lattice_size() -> usize {
    3
}

fn default_pin_pitch() -> f64 {
    1.26
}

fn default_fuel_radius() -> f64 {
    0.4
}

fn default_num_rings() -> u32 {
    3
}

fn default_num_sectors() -> u32 {
    8
}

fn default_num_azim() -> usize {
    4
}

fn default_track_spacing() -> f64 {
    0.1
}

/// Loads the configuration file, then layers environment variables and
/// command-line arguments on top.
pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root();
    let config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(false))
        .add_source(Environment::with_prefix("mocgeo"))
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Error loading configuration: {}", err);
            std::process::exit(1);
        });

    let mut config: Settings = settings.try_deserialize().unwrap_or_else(|err| {
        eprintln!("Error deserializing configuration: {}", err);
        std::process::exit(1);
    });

    // Parse command-line arguments and override values
    let args = CliArgs::parse();

    if let Some(size) = args.size {
        config.lattice_size = size;
    }
    if let Some(pitch) = args.pitch {
        config.pin_pitch = pitch;
    }
    if let Some(radius) = args.radius {
        config.fuel_radius = radius;
    }
    if let Some(rings) = args.rings {
        config.num_rings = rings;
    }
    if let Some(sectors) = args.sectors {
        config.num_sectors = sectors;
    }
    if let Some(azim) = args.azim {
        config.num_azim = azim;
    }
    if let Some(spacing) = args.spacing {
        config.track_spacing = spacing;
    }

    validate_config(&config);

    Ok(config)
}

/// Retrieve the directory holding the config subdirectory:
/// 1. CARGO_MANIFEST_DIR when running through cargo.
/// 2. MOCGEO_ROOT_DIR when set explicitly.
/// 3. The current working directory otherwise.
fn retrieve_project_root() -> std::path::PathBuf {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        std::path::PathBuf::from(manifest_dir)
    } else if let Ok(path) = env::var("MOCGEO_ROOT_DIR") {
        std::path::PathBuf::from(path)
    } else {
        env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
    }
}

fn validate_config(config: &Settings) {
    assert!(config.lattice_size > 0, "Lattice size must be at least 1");
    assert!(config.pin_pitch > 0.0, "Pin pitch must be greater than 0");
    assert!(
        config.fuel_radius > 0.0 && 2.0 * config.fuel_radius < config.pin_pitch,
        "Fuel pins must fit inside the pin pitch"
    );
    assert!(config.num_azim > 0, "At least one azimuthal angle is required");
    assert!(
        config.track_spacing > 0.0,
        "Track spacing must be greater than 0"
    );
}

#[derive(Parser, Debug)]
#[command(version, about = "mocgeo - 2D CSG ray tracing for neutron transport")]
pub struct CliArgs {
    /// Number of pin cells along each side of the lattice.
    #[arg(short = 'n', long)]
    size: Option<usize>,

    /// Centre-to-centre pin spacing in cm.
    #[arg(long)]
    pitch: Option<f64>,

    /// Fuel pin radius in cm.
    #[arg(short, long)]
    radius: Option<f64>,

    /// Number of equal-area rings per fuel pin.
    #[arg(long)]
    rings: Option<u32>,

    /// Number of angular sectors per fuel pin.
    #[arg(long)]
    sectors: Option<u32>,

    /// Number of azimuthal track angles in (0, pi).
    #[arg(short, long)]
    azim: Option<usize>,

    /// Perpendicular spacing between tracks in cm.
    #[arg(short, long)]
    spacing: Option<f64>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Lattice: {0} x {0} pins at {1:.4} cm pitch
  - Fuel radius: {2:.4} cm ({3} rings, {4} sectors)
  - Tracks: {5} azimuthal angles at {6:.4} cm spacing",
            self.lattice_size,
            self.pin_pitch,
            self.fuel_radius,
            self.num_rings,
            self.num_sectors,
            self.num_azim,
            self.track_spacing,
        )
    }
}
