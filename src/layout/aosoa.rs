//! Blocked array-of-structures-of-arrays store
//!
//! Particles are grouped in blocks of `B`. Inside a block every field is a lane of
//! `B` scalars, followed by the cold padding lanes:
//!
//! ```text
//! block 0: [x0..x15][y0..y15][z0..z15][vx0..vx15] .. [v0..v15][cold..]
//! block 1: [x16..x31][y16..y31] ..
//! ```
//!
//! The final block is padded to `B`; slots past `len` are never observable.

use super::{scalar_count, zeroed_buffer, Field, LayoutKind, ParticleSchema, ParticleStore, Scalar};
use crate::constants::particles::BLOCK_SIZE;
use crate::error::{check_index, config_error, BenchError, BenchResult};
use crate::kernels::{force_x, force_y, force_z, Execution, KernelConstants, KernelStore};
use rayon::prelude::*;

/// Logical index → `(block, slot)`. The only place AoSoA addressing is derived.
#[inline]
pub const fn block_slot(index: usize, block_size: usize) -> (usize, usize) {
    (index / block_size, index % block_size)
}

pub struct AosoaStore<T, const B: usize = BLOCK_SIZE> {
    blocks: Vec<T>,
    len: usize,
    schema: ParticleSchema,
}

impl<T: Scalar, const B: usize> AosoaStore<T, B> {
    pub const BLOCK_SIZE: usize = B;

    /// Scalars per block, all lanes included
    #[inline]
    fn block_stride(&self) -> usize {
        self.schema.stride() * B
    }

    #[inline]
    fn offset(&self, index: usize, slot: usize) -> usize {
        let (block, lane) = block_slot(index, B);
        block * self.block_stride() + slot * B + lane
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len() / self.block_stride()
    }

    /// Raw scalars of one block, padding lanes included
    pub fn block(&self, block: usize) -> Option<&[T]> {
        let stride = self.block_stride();
        self.blocks.get(block * stride..(block + 1) * stride)
    }
}

/// Force step over the first `live` slots of one block
#[inline]
fn force_block<T: Scalar, const B: usize>(
    block: &mut [T],
    live: usize,
    dynamics: bool,
    k_y: T,
    k_z: T,
) {
    let (position, inputs) = block.split_at_mut(3 * B);
    let (x, yz) = position.split_at_mut(B);
    let (y, z) = yz.split_at_mut(B);
    let (x, y, z) = (&mut x[..live], &mut y[..live], &mut z[..live]);

    if dynamics {
        let inputs: &[T] = inputs;
        let lane = |field: Field| {
            let start = (field.ordinal() - 3) * B;
            &inputs[start..start + live]
        };
        let (vx, vy, vz, charge) = (lane(Field::Vx), lane(Field::Vy), lane(Field::Vz), lane(Field::Charge));

        for (x, &vx) in x.iter_mut().zip(vx) {
            *x = force_x(*x, vx);
        }
        for ((y, &vy), &c) in y.iter_mut().zip(vy).zip(charge) {
            *y = force_y(*y, vy, c, k_y);
        }
        for (z, &vz) in z.iter_mut().zip(vz) {
            *z = force_z(*z, vz, k_z);
        }
    } else {
        let zero = T::ZERO;
        for x in x.iter_mut() {
            *x = force_x(*x, zero);
        }
        for y in y.iter_mut() {
            *y = force_y(*y, zero, zero, k_y);
        }
        for z in z.iter_mut() {
            *z = force_z(*z, zero, k_z);
        }
    }
}

#[inline]
fn overwrite_block<T: Scalar, const B: usize>(block: &mut [T], live: usize, value: [T; 3]) {
    for (lane, &v) in block[..3 * B].chunks_exact_mut(B).zip(value.iter()) {
        lane[..live].fill(v);
    }
}

impl<T: Scalar, const B: usize> ParticleStore<T> for AosoaStore<T, B> {
    fn allocate(len: usize, schema: ParticleSchema) -> BenchResult<Self> {
        if B == 0 {
            return Err(config_error("AoSoA block size must be positive"));
        }

        let block_count = len.div_ceil(B);
        let per_block = scalar_count::<T>(schema.stride(), B)?;
        let blocks = zeroed_buffer(scalar_count::<T>(block_count, per_block)?)?;

        log::debug!(
            "[aosoa] {} particles in {} blocks of {} ({} scalars per block)",
            len,
            block_count,
            B,
            per_block
        );

        Ok(Self {
            blocks,
            len,
            schema,
        })
    }

    fn layout(&self) -> LayoutKind {
        LayoutKind::Aosoa
    }

    fn schema(&self) -> ParticleSchema {
        self.schema
    }

    fn len(&self) -> usize {
        self.len
    }

    fn footprint_bytes(&self) -> usize {
        self.blocks.len() * std::mem::size_of::<T>()
    }

    fn get(&self, index: usize, field: Field) -> BenchResult<T> {
        check_index(index, self.len)?;
        Ok(match self.schema.slot(field) {
            Some(slot) => self.blocks[self.offset(index, slot)],
            None => T::ZERO,
        })
    }

    fn set(&mut self, index: usize, field: Field, value: T) -> BenchResult<()> {
        check_index(index, self.len)?;
        let slot = self
            .schema
            .slot(field)
            .ok_or(BenchError::FieldNotStored { field })?;
        let offset = self.offset(index, slot);
        self.blocks[offset] = value;
        Ok(())
    }
}

impl<T: Scalar, const B: usize> KernelStore<T> for AosoaStore<T, B> {
    fn apply_force(&mut self, constants: &KernelConstants<T>, execution: Execution) {
        let stride = self.block_stride();
        let len = self.len;
        let dynamics = self.schema.has_dynamics();
        let (k_y, k_z) = (constants.k_y(), constants.k_z());
        let step = move |(block_index, block): (usize, &mut [T])| {
            let live = (len - block_index * B).min(B);
            force_block::<T, B>(block, live, dynamics, k_y, k_z);
        };

        match execution {
            Execution::Sequential => self.blocks.chunks_exact_mut(stride).enumerate().for_each(step),
            Execution::Parallel => self.blocks.par_chunks_exact_mut(stride).enumerate().for_each(step),
        }
    }

    fn overwrite_positions(&mut self, value: [T; 3], execution: Execution) {
        let stride = self.block_stride();
        let len = self.len;
        let step = move |(block_index, block): (usize, &mut [T])| {
            let live = (len - block_index * B).min(B);
            overwrite_block::<T, B>(block, live, value);
        };

        match execution {
            Execution::Sequential => self.blocks.chunks_exact_mut(stride).enumerate().for_each(step),
            Execution::Parallel => self.blocks.par_chunks_exact_mut(stride).enumerate().for_each(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_slot_mapping() {
        assert_eq!(block_slot(0, 16), (0, 0));
        assert_eq!(block_slot(15, 16), (0, 15));
        assert_eq!(block_slot(16, 16), (1, 0));
        assert_eq!(block_slot(37, 16), (2, 5));
    }

    #[test]
    fn test_partial_final_block() {
        let mut store = AosoaStore::<f64>::allocate(17, ParticleSchema::full()).unwrap();
        assert_eq!(store.block_count(), 2);
        assert_eq!(store.len(), 17);

        store.set(16, Field::Y, 4.0).unwrap();
        // block 1, y lane, slot 0
        assert_eq!(store.block(1).unwrap()[16], 4.0);
        assert!(store.get(17, Field::Y).is_err());
    }

    #[test]
    fn test_padding_slots_untouched_by_kernels() {
        let mut store = AosoaStore::<f32, 4>::allocate(5, ParticleSchema::full()).unwrap();
        store.overwrite_positions([1.0, 2.0, 3.0], Execution::Sequential);

        let tail = store.block(1).unwrap();
        assert_eq!(&tail[0..4], &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&tail[4..8], &[2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cold_lanes_extend_blocks() {
        let schema = ParticleSchema::position_only().with_cold_fields(2);
        let store = AosoaStore::<f32, 8>::allocate(8, schema).unwrap();
        assert_eq!(store.footprint_bytes(), 5 * 8 * 4);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let result = AosoaStore::<f32, 0>::allocate(4, ParticleSchema::full());
        assert!(matches!(result, Err(BenchError::Config(_))));
    }
}
