//! Pipeline configuration.
//!
//! Every section and field is optional in the TOML file; missing values fall
//! back to the defaults below, which are the values the regression formulas
//! and smoothing thresholds were tuned with.
//!
//! ```toml
//! [pipeline]
//! body_prefix = "actor1:"
//! smoothing_enabled = false
//!
//! [body]
//! height_cm = 182
//!
//! [solver]
//! max_iterations = 200
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ik::SolverSettings;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub body: BodyConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Actor namespace stripped from marker labels. Empty accepts all.
    #[serde(default)]
    pub body_prefix: String,
    #[serde(default = "default_true")]
    pub ik_enabled: bool,
    #[serde(default = "default_true")]
    pub reconstruction_enabled: bool,
    #[serde(default = "default_true")]
    pub smoothing_enabled: bool,
}

/// Externally known body measurements. Zero means "estimate".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct BodyConfig {
    #[serde(default)]
    pub height_cm: u32,
    #[serde(default)]
    pub mass_kg: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Iteration cap of the FABRIK retry after CCD fails.
    #[serde(default = "default_fallback_iterations")]
    pub fallback_iterations: usize,
    /// Tip-to-target distance counted as reached (meters).
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SmoothingConfig {
    /// Largest per-frame displacement of a repaired limb joint (meters).
    #[serde(default = "default_max_displacement")]
    pub max_displacement: f64,
    /// Largest per-frame rotation distance (`1 - |q1·q2|`) before damping.
    #[serde(default = "default_max_rotation_distance")]
    pub max_rotation_distance: f64,
}

/// Proportional joint-center offsets, in the joint frame, for a joint whose
/// marker width equals `reference_width`. X is authored for the left side.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocalizationConfig {
    #[serde(default = "default_knee_offset")]
    pub knee_offset: [f64; 3],
    #[serde(default = "default_ankle_offset")]
    pub ankle_offset: [f64; 3],
    #[serde(default = "default_reference_width")]
    pub reference_width: f64,
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> usize {
    140
}

fn default_fallback_iterations() -> usize {
    100
}

fn default_distance_threshold() -> f64 {
    0.01
}

fn default_max_displacement() -> f64 {
    0.025
}

fn default_max_rotation_distance() -> f64 {
    0.03
}

fn default_knee_offset() -> [f64; 3] {
    [-0.1033, -0.0981, 0.0597]
}

fn default_ankle_offset() -> [f64; 3] {
    [-0.1060, -0.0295, 0.0121]
}

fn default_reference_width() -> f64 {
    0.2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            body_prefix: String::new(),
            ik_enabled: true,
            reconstruction_enabled: true,
            smoothing_enabled: true,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            fallback_iterations: default_fallback_iterations(),
            distance_threshold: default_distance_threshold(),
        }
    }
}

impl SolverConfig {
    /// Settings of the primary (CCD) solver.
    pub fn primary(&self) -> SolverSettings {
        SolverSettings::new(self.max_iterations, self.distance_threshold)
    }

    /// Settings of the FABRIK retry.
    pub fn fallback(&self) -> SolverSettings {
        SolverSettings::new(self.fallback_iterations, self.distance_threshold)
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            max_displacement: default_max_displacement(),
            max_rotation_distance: default_max_rotation_distance(),
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            knee_offset: default_knee_offset(),
            ankle_offset: default_ankle_offset(),
            reference_width: default_reference_width(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
