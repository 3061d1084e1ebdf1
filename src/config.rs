//! Benchmark configuration
//!
//! Every section falls back to the values in `constants`, so an empty TOML document
//! (or no file at all) reproduces the stock benchmark.

use crate::constants::kernel::{FORCE_X, FORCE_Y, FORCE_Z, VALUE_X, VALUE_Y, VALUE_Z};
use crate::constants::particles::NUM_PARTICLES;
use crate::constants::population::{BUCKET_CAPACITY, DENSITY};
use crate::error::{config_error, BenchError, BenchResult};
use crate::kernels::{Execution, Kernel, KernelConstants};
use crate::layout::{HotFields, LayoutKind, ParticleSchema, Scalar};
use crate::population::PopulationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Scalar type of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// `f32`
    #[default]
    Single,
    /// `f64`
    Double,
}

impl Precision {
    pub fn name(self) -> &'static str {
        match self {
            Precision::Single => "f32",
            Precision::Double => "f64",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Benchmark mode, the single argument of every layout binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// allocate, force
    Force,
    /// allocate, update
    Update,
    /// allocate, populate, force
    ApplyAction,
    /// allocate, populate
    Populate,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Force, Mode::Update, Mode::ApplyAction, Mode::Populate];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Force => "force",
            Mode::Update => "update",
            Mode::ApplyAction => "apply_action",
            Mode::Populate => "populate",
        }
    }

    pub fn populates(self) -> bool {
        matches!(self, Mode::ApplyAction | Mode::Populate)
    }

    /// Kernel run after allocation (and population), if any
    pub fn kernel(self) -> Option<Kernel> {
        match self {
            Mode::Force => Some(Kernel::Force),
            Mode::Update => Some(Kernel::Update),
            Mode::ApplyAction => Some(Kernel::ApplyAction),
            Mode::Populate => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| {
                config_error(format!(
                    "unrecognized mode '{}' (expected force, update, apply_action or populate)",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub count: usize,
    pub precision: Precision,
    pub hot_fields: HotFields,
    /// Unused scalars per particle, footprint only
    pub cold_fields: usize,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: NUM_PARTICLES,
            precision: Precision::Single,
            hot_fields: HotFields::Full,
            cold_fields: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    pub force: [f64; 3],
    pub value: [f64; 3],
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            force: [FORCE_X, FORCE_Y, FORCE_Z],
            value: [VALUE_X, VALUE_Y, VALUE_Z],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSettings {
    pub bucket_capacity: usize,
    /// Defaults to `count / bucket_capacity`
    pub num_buckets: Option<usize>,
    pub density: f64,
    /// Derived from the clock when unset
    pub seed: Option<u64>,
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            bucket_capacity: BUCKET_CAPACITY,
            num_buckets: None,
            density: DENSITY,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub mode: Execution,
    /// rayon pool size for parallel runs; `num_cpus` when unset
    pub worker_threads: Option<usize>,
}

impl ExecutionSettings {
    pub fn threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteSettings {
    pub layouts: Vec<LayoutKind>,
    pub modes: Vec<Mode>,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            layouts: LayoutKind::ALL.to_vec(),
            modes: Mode::ALL.to_vec(),
        }
    }
}

/// Complete benchmark configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub particles: ParticleSettings,
    pub kernel: KernelSettings,
    pub population: PopulationSettings,
    pub execution: ExecutionSettings,
    pub suite: SuiteSettings,
}

impl BenchConfig {
    pub fn from_toml_str(source: &str) -> BenchResult<Self> {
        let config: BenchConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        log::info!("[config] loaded {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> BenchResult<String> {
        toml::to_string_pretty(self).map_err(|e| config_error(format!("cannot serialize config: {}", e)))
    }

    pub fn validate(&self) -> BenchResult<()> {
        let population = &self.population;
        if !population.density.is_finite() || !(0.0..=1.0).contains(&population.density) {
            return Err(config_error(format!(
                "population.density {} is outside [0, 1]",
                population.density
            )));
        }

        if population.bucket_capacity == 0 && population.num_buckets.is_none() {
            return Err(config_error("population.bucket_capacity must be positive"));
        }

        if self.kernel.force.iter().chain(&self.kernel.value).any(|v| !v.is_finite()) {
            return Err(config_error("kernel constants must be finite"));
        }

        if self.execution.worker_threads == Some(0) {
            return Err(config_error("execution.worker_threads must be positive"));
        }

        if self.suite.layouts.is_empty() || self.suite.modes.is_empty() {
            return Err(config_error("suite needs at least one layout and one mode"));
        }

        if population.density == 1.0 {
            log::warn!("[config] density 1.0 saturates every bucket; populate runs will reject heavily");
        }

        Ok(())
    }

    pub fn schema(&self) -> ParticleSchema {
        ParticleSchema {
            hot: self.particles.hot_fields,
            cold_fields: self.particles.cold_fields,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.population.num_buckets.unwrap_or_else(|| {
            self.particles
                .count
                .checked_div(self.population.bucket_capacity)
                .unwrap_or(0)
        })
    }

    /// Engine input for a store of `particles.count`; the engine validates the rest
    pub fn population_config(&self) -> PopulationConfig {
        PopulationConfig::new(
            self.particles.count,
            self.num_buckets(),
            self.population.bucket_capacity,
            self.population.density,
        )
    }

    pub fn kernel_constants<T: Scalar>(&self) -> KernelConstants<T> {
        KernelConstants::from_f64(self.kernel.force, self.kernel.value)
    }
}
