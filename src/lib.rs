//! Layout Bench
//!
//! Compares array-of-structures, structure-of-arrays and blocked AoSoA particle storage
//! on the same numeric kernels and capacity-bounded population.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod kernels;
pub mod layout;
pub mod population;
pub mod profiling;
pub mod runner;

pub use config::{BenchConfig, Mode, Precision};
pub use error::{BenchError, BenchResult};
pub use kernels::{apply_kernel, apply_reference, Execution, Kernel, KernelConstants, KernelStore};
pub use layout::{
    AosStore, AosoaStore, Field, HotFields, LayoutKind, Particle, ParticleSchema, ParticleStore, Scalar,
    SoaStore,
};
pub use population::{populate, populate_sharded, PopulationConfig, PopulationReport};
pub use runner::{run, run_suite, RunReport};
