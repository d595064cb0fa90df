use std::f32::consts::{PI, TAU};
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{GearError, Result};

/// Smallest tooth count accepted by [`GearParameters::validate`].
pub const MIN_TEETH: u32 = 5;

/// Smallest curve sample count: the fillet, the pitch point and at least one
/// tip-ward sample all have to fit on one flank.
pub const MIN_CURVE_SAMPLES: usize = 6;

/// Cutter depth D+f in module units.
pub const DEFAULT_DEPTH_FACTOR: f32 = 2.157;

/// Pressure angle range accepted by validation (degrees).
const PRESSURE_ANGLE_RANGE_DEG: (f32, f32) = (10.0, 35.0);

/// Flank curve used for the tooth profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ToothProfile {
    /// True involute of the base circle.
    #[default]
    #[value(name = "exact")]
    ExactInvolute,
    /// Circular arc with the involute's radius of curvature at the pitch point.
    #[value(name = "arc")]
    ArcApproximation,
}

impl std::fmt::Display for ToothProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToothProfile::ExactInvolute => write!(f, "exact"),
            ToothProfile::ArcApproximation => write!(f, "arc"),
        }
    }
}

/// Newton-Raphson settings for the flank solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    /// Fixed number of iterations; there is no convergence test.
    pub iterations: u32,
    /// When set, a residual above this value after the fixed iterations is
    /// reported as [`GearError::NonConvergence`].
    pub residual_tolerance: Option<f32>,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            iterations: 6,
            residual_tolerance: None,
        }
    }
}

/// Gear geometry parameters, in module-1 units (pitch diameter == tooth count).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearParameters {
    pub teeth: u32,
    /// Pressure angle in radians.
    pub pressure_angle: f32,
    /// The gear spans `-half_thickness..=half_thickness` along z.
    pub half_thickness: f32,
    pub depth_factor: f32,
    /// Angular fraction of one circular pitch between the two flanks of a
    /// tooth, measured on the pitch circle. The remainder is the space
    /// between teeth.
    pub gap_fraction: f32,
    /// Profile points per flank.
    pub curve_samples: usize,
    pub fillet_radius: f32,
    /// Points on the root fillet arc, counted within `curve_samples`.
    pub fillet_samples: usize,
    pub profile: ToothProfile,
    pub newton: NewtonConfig,
}

impl Default for GearParameters {
    fn default() -> Self {
        Self {
            teeth: 16,
            pressure_angle: 20.0_f32.to_radians(),
            half_thickness: 4.0,
            depth_factor: DEFAULT_DEPTH_FACTOR,
            gap_fraction: 0.48,
            curve_samples: 16,
            fillet_radius: 0.2,
            fillet_samples: 4,
            profile: ToothProfile::default(),
            newton: NewtonConfig::default(),
        }
    }
}

impl GearParameters {
    /// Parameters for the given tooth count, pressure angle (radians) and
    /// axial half-thickness, with default constants for everything else.
    pub fn new(teeth: u32, pressure_angle: f32, half_thickness: f32) -> Self {
        Self {
            teeth,
            pressure_angle,
            half_thickness,
            ..Default::default()
        }
    }

    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GearError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| GearError::Config(format!("Malformed gear parameters: {e}")))
    }

    pub fn pitch_radius(&self) -> f32 {
        self.teeth as f32 / 2.0
    }

    pub fn base_radius(&self) -> f32 {
        self.pitch_radius() * self.pressure_angle.cos()
    }

    /// Outer (tip) radius, (N + 2) / 2.
    pub fn major_radius(&self) -> f32 {
        (self.teeth + 2) as f32 / 2.0
    }

    /// Root radius, (N + 2) / 2 - depth factor.
    pub fn minor_radius(&self) -> f32 {
        self.major_radius() - self.depth_factor
    }

    /// Tooth count at which the root circle meets the base circle. Gears with
    /// more teeth than this keep the whole flank on the involute.
    pub fn critical_tooth_count(&self) -> f32 {
        2.0 * (self.depth_factor - 1.0) / (1.0 - self.pressure_angle.cos())
    }

    pub fn uses_pure_involute(&self) -> bool {
        self.teeth as f32 > self.critical_tooth_count()
    }

    /// Angle between the pitch points of the two flanks of one tooth.
    pub fn gap_angle(&self) -> f32 {
        self.gap_fraction * TAU / self.teeth as f32
    }

    /// Index of the pitch-circle sample on a flank.
    pub fn pitch_sample(&self) -> usize {
        self.curve_samples / 2
    }

    pub fn vertices_per_sector(&self) -> usize {
        8 * (1 + self.curve_samples)
    }

    /// 8 N (1 + S) + 2: all sector blocks plus the two hub centres.
    pub fn vertex_count(&self) -> usize {
        self.teeth as usize * self.vertices_per_sector() + 2
    }

    /// 24 N S.
    pub fn index_count(&self) -> usize {
        24 * self.teeth as usize * self.curve_samples
    }

    /// N (12 S - 6): flanks, fillets and root floor.
    pub fn cut_index_count(&self) -> usize {
        self.teeth as usize * (12 * self.curve_samples - 6)
    }

    /// Check the parameters before they reach the mesh generator, which does
    /// not validate its input.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GearError::InvalidParameter(msg));

        if self.teeth < MIN_TEETH {
            return invalid(format!(
                "teeth must be at least {MIN_TEETH}, got {}",
                self.teeth
            ));
        }
        let (lo, hi) = PRESSURE_ANGLE_RANGE_DEG;
        let pa_deg = self.pressure_angle * 180.0 / PI;
        if !pa_deg.is_finite() || pa_deg < lo || pa_deg > hi {
            return invalid(format!(
                "pressure angle must lie in {lo}..={hi} degrees, got {pa_deg}"
            ));
        }
        if !(self.half_thickness.is_finite() && self.half_thickness > 0.0) {
            return invalid(format!(
                "half thickness must be positive, got {}",
                self.half_thickness
            ));
        }
        if !(self.depth_factor.is_finite() && self.depth_factor > 1.0) {
            return invalid(format!(
                "depth factor must exceed the addendum (1.0), got {}",
                self.depth_factor
            ));
        }
        if self.minor_radius() <= 0.0 {
            return invalid(format!(
                "root radius {} is not positive for {} teeth",
                self.minor_radius(),
                self.teeth
            ));
        }
        if !(self.gap_fraction > 0.0 && self.gap_fraction < 1.0) {
            return invalid(format!(
                "gap fraction must lie in (0, 1), got {}",
                self.gap_fraction
            ));
        }
        if self.curve_samples < MIN_CURVE_SAMPLES {
            return invalid(format!(
                "curve samples must be at least {MIN_CURVE_SAMPLES}, got {}",
                self.curve_samples
            ));
        }
        if self.fillet_samples < 2 || self.fillet_samples >= self.pitch_sample() {
            return invalid(format!(
                "fillet samples must lie in 2..{}, got {}",
                self.pitch_sample(),
                self.fillet_samples
            ));
        }
        if !(self.fillet_radius.is_finite() && self.fillet_radius > 0.0) {
            return invalid(format!(
                "fillet radius must be positive, got {}",
                self.fillet_radius
            ));
        }
        if self.minor_radius() + self.fillet_radius >= self.pitch_radius() {
            return invalid(format!(
                "fillet radius {} does not fit between root and pitch circle",
                self.fillet_radius
            ));
        }
        if self.newton.iterations == 0 {
            return invalid("newton iterations must be at least 1".into());
        }
        if let Some(tol) = self.newton.residual_tolerance {
            if !(tol.is_finite() && tol > 0.0) {
                return invalid(format!("residual tolerance must be positive, got {tol}"));
            }
        }
        if self.vertex_count() > u32::MAX as usize {
            return invalid(format!(
                "{} vertices do not fit a u32 index buffer",
                self.vertex_count()
            ));
        }
        Ok(())
    }
}

/// Colours and surface finish of the two surface groups.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialStyle {
    pub cut_color: [f32; 4],
    pub blank_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for MaterialStyle {
    fn default() -> Self {
        Self {
            cut_color: [0.184, 0.310, 0.184, 1.0],
            blank_color: [0.1, 0.2, 0.5, 1.0],
            metallic: 0.8,
            roughness: 0.4,
        }
    }
}

/// GLB export parameters.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    pub compress: bool,
    pub style: MaterialStyle,
}

/// Fully resolved run configuration (constructed from CLI args).
#[derive(Debug, Clone, Default)]
pub struct GearConfig {
    pub gear: GearParameters,
    /// Tooth count of a second, meshing gear.
    pub mate_teeth: Option<u32>,
    pub output: Option<PathBuf>,
    pub export: ExportConfig,
    pub dry_run: bool,
    pub verbose: bool,
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "gear-mesh",
    about = "Involute spur gear mesh generator",
    version
)]
pub struct CliArgs {
    /// Number of teeth
    #[arg(short = 'n', long)]
    pub teeth: Option<u32>,

    /// Pressure angle in degrees (14.5, 20, 25, ...)
    #[arg(long)]
    pub pressure_angle: Option<f32>,

    /// Axial half-thickness
    #[arg(long)]
    pub thickness: Option<f32>,

    /// Profile points per flank
    #[arg(long)]
    pub samples: Option<usize>,

    /// Root fillet radius
    #[arg(long)]
    pub fillet_radius: Option<f32>,

    /// Points on the root fillet arc
    #[arg(long)]
    pub fillet_samples: Option<usize>,

    /// Cutter depth in module units
    #[arg(long)]
    pub depth_factor: Option<f32>,

    /// Tooth fraction of the circular pitch
    #[arg(long)]
    pub gap_fraction: Option<f32>,

    /// Flank curve: exact or arc
    #[arg(long, value_enum)]
    pub profile: Option<ToothProfile>,

    /// Newton-Raphson iteration count
    #[arg(long)]
    pub newton_iterations: Option<u32>,

    /// Fail when the root finder residual exceeds this value
    #[arg(long)]
    pub residual_tolerance: Option<f32>,

    /// Tooth count of a second gear meshing with the first
    #[arg(long)]
    pub mate: Option<u32>,

    /// JSON file with gear parameters (flags override its values)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output GLB file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Apply EXT_meshopt_compression to the GLB buffers
    #[arg(long)]
    pub compress: bool,

    /// Build and report mesh stats only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl GearConfig {
    /// Resolve CLI arguments, reading the parameter file if one is given.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut gear = match &args.config {
            Some(path) => GearParameters::from_json_file(path)?,
            None => GearParameters::default(),
        };

        if let Some(teeth) = args.teeth {
            gear.teeth = teeth;
        }
        if let Some(degrees) = args.pressure_angle {
            gear.pressure_angle = degrees.to_radians();
        }
        if let Some(thickness) = args.thickness {
            gear.half_thickness = thickness;
        }
        if let Some(samples) = args.samples {
            gear.curve_samples = samples;
        }
        if let Some(radius) = args.fillet_radius {
            gear.fillet_radius = radius;
        }
        if let Some(samples) = args.fillet_samples {
            gear.fillet_samples = samples;
        }
        if let Some(depth) = args.depth_factor {
            gear.depth_factor = depth;
        }
        if let Some(fraction) = args.gap_fraction {
            gear.gap_fraction = fraction;
        }
        if let Some(profile) = args.profile {
            gear.profile = profile;
        }
        if let Some(iterations) = args.newton_iterations {
            gear.newton.iterations = iterations;
        }
        if args.residual_tolerance.is_some() {
            gear.newton.residual_tolerance = args.residual_tolerance;
        }

        Ok(GearConfig {
            gear,
            mate_teeth: args.mate,
            output: args.output,
            export: ExportConfig {
                compress: args.compress,
                style: MaterialStyle::default(),
            },
            dry_run: args.dry_run,
            verbose: args.verbose,
        })
    }
}
