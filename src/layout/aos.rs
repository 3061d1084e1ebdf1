//! Array-of-structures store
//!
//! One contiguous buffer of fixed-stride records. Record `i` starts at `i * stride`;
//! the hot fields come first in `Field` order and cold padding fills the rest.

use super::{scalar_count, zeroed_buffer, Field, LayoutKind, ParticleSchema, ParticleStore, Scalar};
use crate::error::{check_index, BenchError, BenchResult};
use crate::kernels::{force_x, force_y, force_z, Execution, KernelConstants, KernelStore};
use rayon::prelude::*;

pub struct AosStore<T> {
    records: Vec<T>,
    len: usize,
    schema: ParticleSchema,
}

impl<T: Scalar> AosStore<T> {
    #[inline]
    fn offset(&self, index: usize, slot: usize) -> usize {
        index * self.schema.stride() + slot
    }

    /// Raw record of one particle, cold padding included
    pub fn record(&self, index: usize) -> BenchResult<&[T]> {
        check_index(index, self.len)?;
        let start = self.offset(index, 0);
        Ok(&self.records[start..start + self.schema.stride()])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }
}

#[inline(always)]
fn force_record<T: Scalar>(record: &mut [T], dynamics: bool, k_y: T, k_z: T) {
    let (vx, vy, vz, charge) = if dynamics {
        (
            record[Field::Vx.ordinal()],
            record[Field::Vy.ordinal()],
            record[Field::Vz.ordinal()],
            record[Field::Charge.ordinal()],
        )
    } else {
        (T::ZERO, T::ZERO, T::ZERO, T::ZERO)
    };

    record[0] = force_x(record[0], vx);
    record[1] = force_y(record[1], vy, charge, k_y);
    record[2] = force_z(record[2], vz, k_z);
}

impl<T: Scalar> ParticleStore<T> for AosStore<T> {
    fn allocate(len: usize, schema: ParticleSchema) -> BenchResult<Self> {
        let count = scalar_count::<T>(len, schema.stride())?;
        let records = zeroed_buffer(count)?;

        Ok(Self {
            records,
            len,
            schema,
        })
    }

    fn layout(&self) -> LayoutKind {
        LayoutKind::Aos
    }

    fn schema(&self) -> ParticleSchema {
        self.schema
    }

    fn len(&self) -> usize {
        self.len
    }

    fn footprint_bytes(&self) -> usize {
        self.records.len() * std::mem::size_of::<T>()
    }

    fn get(&self, index: usize, field: Field) -> BenchResult<T> {
        check_index(index, self.len)?;
        Ok(match self.schema.slot(field) {
            Some(slot) => self.records[self.offset(index, slot)],
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
        self.records[offset] = value;
        Ok(())
    }
}

impl<T: Scalar> KernelStore<T> for AosStore<T> {
    fn apply_force(&mut self, constants: &KernelConstants<T>, execution: Execution) {
        let stride = self.schema.stride();
        let dynamics = self.schema.has_dynamics();
        let (k_y, k_z) = (constants.k_y(), constants.k_z());
        let step = move |record: &mut [T]| force_record(record, dynamics, k_y, k_z);

        match execution {
            Execution::Sequential => self.records.chunks_exact_mut(stride).for_each(step),
            Execution::Parallel => self.records.par_chunks_exact_mut(stride).for_each(step),
        }
    }

    fn overwrite_positions(&mut self, value: [T; 3], execution: Execution) {
        let stride = self.schema.stride();
        let step = move |record: &mut [T]| record[..3].copy_from_slice(&value);

        match execution {
            Execution::Sequential => self.records.chunks_exact_mut(stride).for_each(step),
            Execution::Parallel => self.records.par_chunks_exact_mut(stride).for_each(step),
        }
    }
}
