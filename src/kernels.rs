//! Per-particle numeric kernels
//!
//! The arithmetic lives here as scalar functions so every layout evaluates the exact
//! same expressions; stores only decide the loop shape. `apply_reference` defines the
//! expected result through the logical `get`/`set` contract, one particle at a time in
//! ascending index order.

use crate::constants::kernel::{FORCE_X, FORCE_Y, FORCE_Z, VALUE_X, VALUE_Y, VALUE_Z};
use crate::error::BenchResult;
use crate::layout::{Field, Particle, ParticleStore, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kernel selected by a benchmark mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// One explicit integration step with a charge-weighted term
    Force,
    /// Unconditional position overwrite
    Update,
    /// Force equations applied to a populated store
    ApplyAction,
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kernel::Force => "force",
            Kernel::Update => "update",
            Kernel::ApplyAction => "apply_action",
        };
        f.write_str(name)
    }
}

/// How a kernel walks the index range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    #[default]
    Sequential,
    /// Partition particles across rayon workers
    Parallel,
}

/// Fixed kernel constants converted to the run's scalar type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConstants<T> {
    /// `[K_X, K_Y, K_Z]`; the force equation reads only `K_Y` and `K_Z`
    pub force: [T; 3],
    /// `[V_X, V_Y, V_Z]` written by the update kernel
    pub value: [T; 3],
}

impl<T: Scalar> KernelConstants<T> {
    pub fn from_f64(force: [f64; 3], value: [f64; 3]) -> Self {
        Self {
            force: force.map(T::from_f64),
            value: value.map(T::from_f64),
        }
    }

    #[inline]
    pub fn k_y(&self) -> T {
        self.force[1]
    }

    #[inline]
    pub fn k_z(&self) -> T {
        self.force[2]
    }
}

impl<T: Scalar> Default for KernelConstants<T> {
    fn default() -> Self {
        Self::from_f64([FORCE_X, FORCE_Y, FORCE_Z], [VALUE_X, VALUE_Y, VALUE_Z])
    }
}

#[inline(always)]
pub fn force_x<T: Scalar>(x: T, vx: T) -> T {
    x + vx
}

#[inline(always)]
pub fn force_y<T: Scalar>(y: T, vy: T, charge: T, k_y: T) -> T {
    y + (vy + k_y * charge)
}

#[inline(always)]
pub fn force_z<T: Scalar>(z: T, vz: T, k_z: T) -> T {
    z + vz * k_z
}

/// Force step on a particle snapshot
pub fn force_particle<T: Scalar>(particle: &mut Particle<T>, constants: &KernelConstants<T>) {
    let [vx, vy, vz] = particle.velocity;
    let [x, y, z] = particle.position;
    particle.position = [
        force_x(x, vx),
        force_y(y, vy, particle.charge, constants.k_y()),
        force_z(z, vz, constants.k_z()),
    ];
}

/// Stores that run kernels over their own physical layout
pub trait KernelStore<T: Scalar>: ParticleStore<T> {
    /// `x += vx; y += vy + K_Y * c; z += vz * K_Z` for every particle.
    /// Velocity and charge read as zero when the schema drops them.
    fn apply_force(&mut self, constants: &KernelConstants<T>, execution: Execution);

    /// `position = value` for every particle
    fn overwrite_positions(&mut self, value: [T; 3], execution: Execution);
}

/// Run `kernel` once over every particle of `store`
pub fn apply_kernel<T, S>(
    store: &mut S,
    kernel: Kernel,
    constants: &KernelConstants<T>,
    execution: Execution,
) where
    T: Scalar,
    S: KernelStore<T>,
{
    if store.is_empty() {
        log::debug!("[kernels] {} on empty {} store, nothing to do", kernel, store.layout());
        return;
    }

    log::debug!(
        "[kernels] {} over {} {} particles ({:?})",
        kernel,
        store.len(),
        store.layout(),
        execution
    );

    match kernel {
        Kernel::Force | Kernel::ApplyAction => store.apply_force(constants, execution),
        Kernel::Update => store.overwrite_positions(constants.value, execution),
    }
}

/// Sequential reference through logical field access only
pub fn apply_reference<T, S>(
    store: &mut S,
    kernel: Kernel,
    constants: &KernelConstants<T>,
) -> BenchResult<()>
where
    T: Scalar,
    S: ParticleStore<T> + ?Sized,
{
    for index in 0..store.len() {
        let mut particle = store.particle(index)?;
        match kernel {
            Kernel::Force | Kernel::ApplyAction => force_particle(&mut particle, constants),
            Kernel::Update => particle.position = constants.value,
        }
        store.set(index, Field::X, particle.position[0])?;
        store.set(index, Field::Y, particle.position[1])?;
        store.set(index, Field::Z, particle.position[2])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: [f64; 3], expected: [f64; 3]) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "expected {:?}, got {:?}", expected, actual);
        }
    }

    #[test]
    fn test_force_step_without_charge() {
        let constants = KernelConstants::<f64>::from_f64([1.0, 2.5, 0.3], [6.2, 2.7, 1.1]);
        let mut particle = Particle::new([0.0, 0.0, 0.0], [1.0, 2.0, 3.0], 0.0);

        force_particle(&mut particle, &constants);

        assert_close(particle.position, [1.0, 2.0, 0.9]);
    }

    #[test]
    fn test_force_step_with_charge() {
        let constants = KernelConstants::<f64>::from_f64([1.0, 2.5, 0.3], [6.2, 2.7, 1.1]);
        let mut particle = Particle::new([0.0, 0.0, 0.0], [1.0, 2.0, 3.0], 1.2);

        force_particle(&mut particle, &constants);

        assert_close(particle.position, [1.0, 5.0, 0.9]);
    }

    #[test]
    fn test_force_x_constant_is_unused() {
        let a = KernelConstants::<f32>::from_f64([1.0, 2.5, 0.3], [0.0; 3]);
        let b = KernelConstants::<f32>::from_f64([100.0, 2.5, 0.3], [0.0; 3]);
        let mut pa = Particle::new([1.0, 1.0, 1.0], [0.5, 0.5, 0.5], 1.0);
        let mut pb = pa;

        force_particle(&mut pa, &a);
        force_particle(&mut pb, &b);

        assert_eq!(pa, pb);
    }

    #[test]
    fn test_default_constants() {
        let constants = KernelConstants::<f64>::default();
        assert_eq!(constants.force, [1.0, 2.5, 0.3]);
        assert_eq!(constants.value, [6.2, 2.7, 1.1]);
    }
}
