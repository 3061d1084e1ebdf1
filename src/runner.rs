//! Benchmark runner
//!
//! Maps `(layout, mode)` to the pipeline allocate → (populate) → kernel for the
//! configured precision, timing each phase.

use crate::config::{BenchConfig, Mode, Precision};
use crate::error::{config_error, BenchResult};
use crate::kernels::{apply_kernel, Execution, KernelStore};
use crate::layout::{AosStore, AosoaStore, LayoutKind, ParticleStore, Scalar, SoaStore};
use crate::population::{populate, populate_sharded, PopulationReport};
use crate::profiling::{PhaseTimings, ScopeProfiler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const CSV_HEADER: &str = "layout,mode,precision,particles,elapsed_ms,footprint_bytes";

/// Result of one `(layout, mode)` run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub layout: LayoutKind,
    pub mode: Mode,
    pub precision: Precision,
    pub particles: usize,
    pub footprint_bytes: usize,
    pub timings: PhaseTimings,
    /// Present for modes that populate
    pub population: Option<PopulationReport>,
    pub seed: Option<u64>,
}

impl RunReport {
    /// Wall time across every phase, allocation included
    pub fn elapsed(&self) -> Duration {
        self.timings.total()
    }

    /// `"<layout> <mode>: <seconds>"`
    pub fn summary_line(&self) -> String {
        format!("{} {}: {:.02}", self.layout, self.mode, self.elapsed().as_secs_f64())
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.3},{}",
            self.layout,
            self.mode,
            self.precision,
            self.particles,
            self.elapsed().as_secs_f64() * 1000.0,
            self.footprint_bytes
        )
    }
}

/// Seed from the configuration, or the clock when unset
fn resolve_seed(config: &BenchConfig) -> u64 {
    match config.population.seed {
        Some(seed) => seed,
        None => {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or_default();
            log::info!("[runner] no population seed configured, using {}", seed);
            seed
        }
    }
}

fn run_store<T, S>(layout: LayoutKind, mode: Mode, config: &BenchConfig) -> BenchResult<RunReport>
where
    T: Scalar,
    S: KernelStore<T>,
{
    let execution = config.execution.mode;
    let mut timings = PhaseTimings::new();

    let mut store = timings.time("allocate", || S::allocate(config.particles.count, config.schema()))?;

    let mut population = None;
    let mut seed = None;
    if mode.populates() {
        let population_config = config.population_config();
        let run_seed = resolve_seed(config);
        let report = timings.time("populate", || match execution {
            Execution::Sequential => {
                let mut rng = StdRng::seed_from_u64(run_seed);
                populate(&mut store, &population_config, &mut rng)
            }
            Execution::Parallel => populate_sharded(
                &mut store,
                &population_config,
                run_seed,
                config.execution.threads(),
            ),
        })?;
        log::info!(
            "[runner] {} populated {} particles ({} draws, {} rejected)",
            layout,
            report.inserted,
            report.draws,
            report.rejections
        );
        population = Some(report);
        seed = Some(run_seed);
    }

    if let Some(kernel) = mode.kernel() {
        let constants = config.kernel_constants::<T>();
        timings.time("kernel", || apply_kernel(&mut store, kernel, &constants, execution));
    }

    std::hint::black_box(&store);

    Ok(RunReport {
        layout,
        mode,
        precision: config.particles.precision,
        particles: store.len(),
        footprint_bytes: store.footprint_bytes(),
        timings,
        population,
        seed,
    })
}

fn run_with<T: Scalar>(layout: LayoutKind, mode: Mode, config: &BenchConfig) -> BenchResult<RunReport> {
    match layout {
        LayoutKind::Aos => run_store::<T, AosStore<T>>(layout, mode, config),
        LayoutKind::Soa => run_store::<T, SoaStore<T>>(layout, mode, config),
        LayoutKind::Aosoa => run_store::<T, AosoaStore<T>>(layout, mode, config),
    }
}

fn dispatch(layout: LayoutKind, mode: Mode, config: &BenchConfig) -> BenchResult<RunReport> {
    match config.particles.precision {
        Precision::Single => run_with::<f32>(layout, mode, config),
        Precision::Double => run_with::<f64>(layout, mode, config),
    }
}

/// Run one layout in one mode
pub fn run(layout: LayoutKind, mode: Mode, config: &BenchConfig) -> BenchResult<RunReport> {
    let _profiler = ScopeProfiler::new("run");
    log::info!(
        "[runner] {} {}: {} {} particles, {:?}",
        layout,
        mode,
        config.particles.count,
        config.particles.precision,
        config.execution.mode
    );

    let report = match config.execution.mode {
        Execution::Sequential => dispatch(layout, mode, config)?,
        Execution::Parallel => {
            let threads = config.execution.threads();
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|idx| format!("layout-bench-{}", idx))
                .build()
                .map_err(|e| config_error(format!("cannot build {} worker threads: {}", threads, e)))?;
            pool.install(|| dispatch(layout, mode, config))?
        }
    };

    log::info!("[runner] {}", report.summary_line());
    Ok(report)
}

/// Every configured layout for every configured mode, modes outermost
pub fn run_suite(config: &BenchConfig) -> BenchResult<Vec<RunReport>> {
    crate::profile_scope!("suite");
    config.validate()?;
    let mut reports = Vec::with_capacity(config.suite.modes.len() * config.suite.layouts.len());
    for &mode in &config.suite.modes {
        for &layout in &config.suite.layouts {
            reports.push(run(layout, mode, config)?);
        }
    }
    Ok(reports)
}
