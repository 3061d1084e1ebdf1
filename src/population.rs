//! Capacity-bounded random population
//!
//! Fills a store by drawing bucket ids uniformly and appending into the drawn bucket
//! until a target count is reached. Full buckets reject the draw. Bucket `b`, slot `s`
//! addresses logical particle `b * bucket_capacity + s`, so a bucket's occupied
//! particles are always a contiguous prefix of its range.

use crate::constants::population::RAND_RANGE;
use crate::error::{config_error, BenchResult};
use crate::layout::{Field, ParticleStore, Scalar};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Population engine input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationConfig {
    /// Total logical capacity; must equal the store length
    pub num_particles: usize,
    pub num_buckets: usize,
    pub bucket_capacity: usize,
    /// Fraction of `num_particles` to fill, in `[0, 1]`
    pub density: f64,
}

impl PopulationConfig {
    pub fn new(num_particles: usize, num_buckets: usize, bucket_capacity: usize, density: f64) -> Self {
        Self {
            num_particles,
            num_buckets,
            bucket_capacity,
            density,
        }
    }

    /// Buckets of `num_particles / num_buckets` each
    pub fn even(num_particles: usize, num_buckets: usize, density: f64) -> Self {
        let bucket_capacity = if num_buckets == 0 {
            0
        } else {
            num_particles / num_buckets
        };
        Self::new(num_particles, num_buckets, bucket_capacity, density)
    }

    /// `floor(num_particles * density)`
    pub fn target(&self) -> usize {
        (self.num_particles as f64 * self.density).floor() as usize
    }

    pub fn total_capacity(&self) -> Option<usize> {
        self.num_buckets.checked_mul(self.bucket_capacity)
    }

    /// Reject configurations that could not terminate or would address outside the
    /// store. Returns the target count.
    pub fn validate(&self, store_len: usize) -> BenchResult<usize> {
        if !self.density.is_finite() || !(0.0..=1.0).contains(&self.density) {
            return Err(config_error(format!(
                "density {} is outside [0, 1]",
                self.density
            )));
        }

        if self.num_particles != store_len {
            return Err(config_error(format!(
                "population sized for {} particles but store holds {}",
                self.num_particles, store_len
            )));
        }

        let total_capacity = self.total_capacity().ok_or_else(|| {
            config_error(format!(
                "{} buckets x {} slots overflows usize",
                self.num_buckets, self.bucket_capacity
            ))
        })?;

        if total_capacity > self.num_particles {
            return Err(config_error(format!(
                "{} buckets x {} slots exceed the {} particle slots of the store",
                self.num_buckets, self.bucket_capacity, self.num_particles
            )));
        }

        let target = self.target();
        if target > total_capacity {
            return Err(config_error(format!(
                "target {} exceeds total bucket capacity {} ({} buckets x {})",
                target, total_capacity, self.num_buckets, self.bucket_capacity
            )));
        }

        Ok(target)
    }
}

/// Logical particle index of `slot` within `bucket`
#[inline]
pub fn bucket_slot_index(bucket: usize, slot: usize, bucket_capacity: usize) -> usize {
    bucket * bucket_capacity + slot
}

/// Occupancy bookkeeping for one population run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    capacity: usize,
    occupancy: Vec<usize>,
}

impl Buckets {
    pub fn new(count: usize, capacity: usize) -> Self {
        Self {
            capacity,
            occupancy: vec![0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self, bucket: usize) -> bool {
        self.occupancy[bucket] >= self.capacity
    }

    /// Append to `bucket`, returning the claimed slot, or `None` if it is full
    pub fn claim(&mut self, bucket: usize) -> Option<usize> {
        let occupancy = &mut self.occupancy[bucket];
        if *occupancy >= self.capacity {
            return None;
        }
        let slot = *occupancy;
        *occupancy += 1;
        Some(slot)
    }

    pub fn occupancy(&self) -> &[usize] {
        &self.occupancy
    }

    pub fn total(&self) -> usize {
        self.occupancy.iter().sum()
    }

    pub fn into_occupancy(self) -> Vec<usize> {
        self.occupancy
    }
}

/// Outcome of a population run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationReport {
    /// Final occupancy per bucket
    pub occupancy: Vec<usize>,
    pub inserted: usize,
    /// Bucket ids drawn, rejected draws included
    pub draws: u64,
    pub rejections: u64,
}

impl PopulationReport {
    /// Fraction of draws that hit a full bucket
    pub fn rejection_rate(&self) -> f64 {
        if self.draws == 0 {
            0.0
        } else {
            self.rejections as f64 / self.draws as f64
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FillStats {
    draws: u64,
    rejections: u64,
}

/// Raw `[0, 2^31)` randomness cast to the scalar type
#[inline]
fn random_value<T: Scalar, R: Rng>(rng: &mut R) -> T {
    T::from_f64(rng.gen_range(0..RAND_RANGE) as f64)
}

/// Rejection loop over `buckets`, which cover global bucket ids starting at
/// `first_bucket`. `write` receives each accepted particle's index and field values.
fn fill_buckets<T, R, W>(
    buckets: &mut Buckets,
    first_bucket: usize,
    target: usize,
    fields: &[Field],
    rng: &mut R,
    mut write: W,
) -> BenchResult<FillStats>
where
    T: Scalar,
    R: Rng,
    W: FnMut(usize, &[T]) -> BenchResult<()>,
{
    let mut stats = FillStats::default();
    let mut values = vec![T::ZERO; fields.len()];
    let mut inserted = 0;

    while inserted < target {
        stats.draws += 1;
        let bucket = rng.gen_range(0..buckets.len());
        let Some(slot) = buckets.claim(bucket) else {
            stats.rejections += 1;
            continue;
        };

        for value in values.iter_mut() {
            *value = random_value(rng);
        }
        write(bucket_slot_index(first_bucket + bucket, slot, buckets.capacity()), &values)?;
        inserted += 1;
    }

    Ok(stats)
}

fn warn_on_saturation(config: &PopulationConfig, target: usize) {
    if target > 0 && Some(target) == config.total_capacity() {
        log::warn!(
            "[population] target {} saturates every bucket; draws near the end are mostly rejected",
            target
        );
    }
}

/// Populate `store` sequentially from `rng`
pub fn populate<T, S, R>(
    store: &mut S,
    config: &PopulationConfig,
    rng: &mut R,
) -> BenchResult<PopulationReport>
where
    T: Scalar,
    S: ParticleStore<T> + ?Sized,
    R: Rng,
{
    let target = config.validate(store.len())?;
    warn_on_saturation(config, target);
    log::debug!(
        "[population] filling {} of {} slots across {} buckets of {}",
        target,
        config.num_particles,
        config.num_buckets,
        config.bucket_capacity
    );

    let fields = store.schema().stored_fields();
    let mut buckets = Buckets::new(config.num_buckets, config.bucket_capacity);
    let stats = fill_buckets(&mut buckets, 0, target, fields, rng, |index, values: &[T]| {
        for (&field, &value) in fields.iter().zip(values) {
            store.set(index, field, value)?;
        }
        Ok(())
    })?;

    let report = PopulationReport {
        occupancy: buckets.into_occupancy(),
        inserted: target,
        draws: stats.draws,
        rejections: stats.rejections,
    };
    log::debug!(
        "[population] {} inserted, {} draws, {:.1}% rejected",
        report.inserted,
        report.draws,
        report.rejection_rate() * 100.0
    );
    Ok(report)
}

/// Contiguous bucket range owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ShardPlan {
    index: usize,
    first_bucket: usize,
    bucket_count: usize,
    target: usize,
}

/// Split buckets into `shard_count` contiguous ranges and `target` across them in
/// proportion to capacity. Every shard target fits its capacity.
fn plan_shards(
    num_buckets: usize,
    bucket_capacity: usize,
    target: usize,
    shard_count: usize,
) -> Vec<ShardPlan> {
    let total_capacity = (num_buckets * bucket_capacity) as u128;
    let mut plans: Vec<ShardPlan> = (0..shard_count)
        .map(|index| {
            let start = (index as u128 * num_buckets as u128 / shard_count as u128) as usize;
            let end = ((index as u128 + 1) * num_buckets as u128 / shard_count as u128) as usize;
            let capacity = ((end - start) * bucket_capacity) as u128;
            let share = if total_capacity == 0 {
                0
            } else {
                (target as u128 * capacity / total_capacity) as usize
            };
            ShardPlan {
                index,
                first_bucket: start,
                bucket_count: end - start,
                target: share,
            }
        })
        .collect();

    let mut remaining = target - plans.iter().map(|p| p.target).sum::<usize>();
    while remaining > 0 {
        for plan in plans.iter_mut() {
            if remaining == 0 {
                break;
            }
            if plan.target < plan.bucket_count * bucket_capacity {
                plan.target += 1;
                remaining -= 1;
            }
        }
    }

    plans
}

#[inline]
fn shard_seed(seed: u64, shard: usize) -> u64 {
    seed ^ (shard as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

struct ShardOutput<T> {
    indices: Vec<usize>,
    values: Vec<T>,
    occupancy: Vec<usize>,
    stats: FillStats,
}

fn run_shard<T: Scalar>(
    plan: &ShardPlan,
    bucket_capacity: usize,
    fields: &[Field],
    seed: u64,
) -> BenchResult<ShardOutput<T>> {
    let mut rng = StdRng::seed_from_u64(shard_seed(seed, plan.index));
    let mut buckets = Buckets::new(plan.bucket_count, bucket_capacity);
    let mut indices = Vec::with_capacity(plan.target);
    let mut values = Vec::with_capacity(plan.target * fields.len());

    let stats = fill_buckets(
        &mut buckets,
        plan.first_bucket,
        plan.target,
        fields,
        &mut rng,
        |index, particle: &[T]| {
            indices.push(index);
            values.extend_from_slice(particle);
            Ok(())
        },
    )?;

    Ok(ShardOutput {
        indices,
        values,
        occupancy: buckets.into_occupancy(),
        stats,
    })
}

/// Populate with buckets sharded across rayon workers.
///
/// Each shard owns a disjoint bucket range and its own generator derived from
/// `(seed, shard)`, so no occupancy counter is shared. Generated particles are
/// written back in shard order. Results depend on `shards` as well as `seed`.
pub fn populate_sharded<T, S>(
    store: &mut S,
    config: &PopulationConfig,
    seed: u64,
    shards: usize,
) -> BenchResult<PopulationReport>
where
    T: Scalar,
    S: ParticleStore<T> + ?Sized,
{
    let target = config.validate(store.len())?;
    warn_on_saturation(config, target);

    let shard_count = shards.clamp(1, config.num_buckets.max(1));
    let plans = plan_shards(config.num_buckets, config.bucket_capacity, target, shard_count);
    let fields = store.schema().stored_fields();
    log::debug!(
        "[population] filling {} slots with {} shards (seed {})",
        target,
        shard_count,
        seed
    );

    let outputs = plans
        .par_iter()
        .map(|plan| run_shard::<T>(plan, config.bucket_capacity, fields, seed))
        .collect::<BenchResult<Vec<_>>>()?;

    let mut report = PopulationReport {
        occupancy: Vec::with_capacity(config.num_buckets),
        inserted: 0,
        draws: 0,
        rejections: 0,
    };

    for output in outputs {
        let per_particle = fields.len();
        for (&index, particle) in output.indices.iter().zip(output.values.chunks_exact(per_particle)) {
            for (&field, &value) in fields.iter().zip(particle) {
                store.set(index, field, value)?;
            }
        }
        report.inserted += output.indices.len();
        report.draws += output.stats.draws;
        report.rejections += output.stats.rejections;
        report.occupancy.extend(output.occupancy);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::layout::{AosStore, ParticleSchema};

    #[test]
    fn test_bucket_claims_append() {
        let mut buckets = Buckets::new(2, 2);
        assert_eq!(buckets.claim(1), Some(0));
        assert_eq!(buckets.claim(1), Some(1));
        assert_eq!(buckets.claim(1), None);
        assert!(buckets.is_full(1));
        assert!(!buckets.is_full(0));
        assert_eq!(buckets.occupancy(), &[0, 2]);
        assert_eq!(buckets.total(), 2);
    }

    #[test]
    fn test_target_floors() {
        assert_eq!(PopulationConfig::even(16, 4, 0.5).target(), 8);
        assert_eq!(PopulationConfig::even(10, 5, 0.33).target(), 3);
        assert_eq!(PopulationConfig::even(16, 4, 0.0).target(), 0);
    }

    #[test]
    fn test_validate_rejects_bad_density() {
        for density in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = PopulationConfig::even(16, 4, density);
            assert!(matches!(config.validate(16), Err(BenchError::Config(_))));
        }
    }

    #[test]
    fn test_validate_rejects_unreachable_target() {
        // 4 buckets of 2 cannot hold 8
        let config = PopulationConfig::new(16, 4, 2, 0.5);
        assert!(config.validate(16).is_err());

        let config = PopulationConfig::new(16, 4, 2, 0.25);
        assert_eq!(config.validate(16).unwrap(), 4);
    }

    #[test]
    fn test_validate_rejects_buckets_outside_store() {
        let config = PopulationConfig::new(16, 5, 4, 0.5);
        assert!(config.validate(16).is_err());
        assert!(PopulationConfig::even(16, 4, 0.5).validate(12).is_err());
    }

    #[test]
    fn test_zero_target_draws_nothing() {
        let mut store = AosStore::<f32>::allocate(16, ParticleSchema::full()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let report = populate(&mut store, &PopulationConfig::even(16, 4, 0.0), &mut rng).unwrap();

        assert_eq!(report.draws, 0);
        assert_eq!(report.occupancy, vec![0; 4]);
        assert!(store.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_plan_shards_covers_target() {
        for (buckets, capacity, target, shards) in [(4, 4, 8, 3), (10, 3, 30, 4), (7, 5, 1, 7), (5, 2, 0, 2)] {
            let plans = plan_shards(buckets, capacity, target, shards);
            assert_eq!(plans.iter().map(|p| p.target).sum::<usize>(), target);
            assert_eq!(plans.iter().map(|p| p.bucket_count).sum::<usize>(), buckets);
            for plan in &plans {
                assert!(plan.target <= plan.bucket_count * capacity);
            }
        }
    }

    #[test]
    fn test_full_density_saturates_every_bucket() {
        let mut store = AosStore::<f64>::allocate(12, ParticleSchema::position_only()).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        let report = populate(&mut store, &PopulationConfig::even(12, 3, 1.0), &mut rng).unwrap();

        assert_eq!(report.occupancy, vec![4, 4, 4]);
        assert_eq!(report.draws - report.rejections, 12);
    }
}
