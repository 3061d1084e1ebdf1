//! Structure of Arrays (SoA) particle store
//!
//! Each stored field gets its own contiguous column of `len` scalars, aligned by
//! index. Cold padding lives in one separate buffer of `cold_fields * len` scalars.

use super::{scalar_count, zeroed_buffer, Field, LayoutKind, ParticleSchema, ParticleStore, Scalar};
use crate::error::{check_index, BenchError, BenchResult};
use crate::kernels::{force_x, force_y, force_z, Execution, KernelConstants, KernelStore};
use rayon::prelude::*;

pub struct SoaStore<T> {
    /// One column per stored field, in `Field` order
    columns: Vec<Vec<T>>,
    /// Footprint-only padding, never addressed
    cold: Vec<T>,
    len: usize,
    schema: ParticleSchema,
}

impl<T: Scalar> SoaStore<T> {
    /// Column for `field`, `None` if the schema drops it
    pub fn column(&self, field: Field) -> Option<&[T]> {
        self.schema
            .slot(field)
            .map(|slot| self.columns[slot].as_slice())
    }

    pub fn cold_len(&self) -> usize {
        self.cold.len()
    }
}

/// Apply `step` to every element of a column
fn map_in_place<T, F>(column: &mut [T], step: F, execution: Execution)
where
    T: Scalar,
    F: Fn(T) -> T + Send + Sync,
{
    match execution {
        Execution::Sequential => column.iter_mut().for_each(|value| *value = step(*value)),
        Execution::Parallel => column.par_iter_mut().for_each(|value| *value = step(*value)),
    }
}

fn integrate_x<T: Scalar>(x: &mut [T], vx: &[T], execution: Execution) {
    match execution {
        Execution::Sequential => x
            .iter_mut()
            .zip(vx)
            .for_each(|(x, &vx)| *x = force_x(*x, vx)),
        Execution::Parallel => x
            .par_iter_mut()
            .zip(vx.par_iter())
            .for_each(|(x, &vx)| *x = force_x(*x, vx)),
    }
}

fn integrate_y<T: Scalar>(y: &mut [T], vy: &[T], charge: &[T], k_y: T, execution: Execution) {
    match execution {
        Execution::Sequential => y
            .iter_mut()
            .zip(vy)
            .zip(charge)
            .for_each(|((y, &vy), &c)| *y = force_y(*y, vy, c, k_y)),
        Execution::Parallel => y
            .par_iter_mut()
            .zip(vy.par_iter())
            .zip(charge.par_iter())
            .for_each(|((y, &vy), &c)| *y = force_y(*y, vy, c, k_y)),
    }
}

fn integrate_z<T: Scalar>(z: &mut [T], vz: &[T], k_z: T, execution: Execution) {
    match execution {
        Execution::Sequential => z
            .iter_mut()
            .zip(vz)
            .for_each(|(z, &vz)| *z = force_z(*z, vz, k_z)),
        Execution::Parallel => z
            .par_iter_mut()
            .zip(vz.par_iter())
            .for_each(|(z, &vz)| *z = force_z(*z, vz, k_z)),
    }
}

impl<T: Scalar> ParticleStore<T> for SoaStore<T> {
    fn allocate(len: usize, schema: ParticleSchema) -> BenchResult<Self> {
        let columns = schema
            .stored_fields()
            .iter()
            .map(|_| zeroed_buffer(len))
            .collect::<BenchResult<Vec<_>>>()?;
        let cold = zeroed_buffer(scalar_count::<T>(len, schema.cold_fields)?)?;

        Ok(Self {
            columns,
            cold,
            len,
            schema,
        })
    }

    fn layout(&self) -> LayoutKind {
        LayoutKind::Soa
    }

    fn schema(&self) -> ParticleSchema {
        self.schema
    }

    fn len(&self) -> usize {
        self.len
    }

    fn footprint_bytes(&self) -> usize {
        let scalars: usize = self.columns.iter().map(Vec::len).sum::<usize>() + self.cold.len();
        scalars * std::mem::size_of::<T>()
    }

    fn get(&self, index: usize, field: Field) -> BenchResult<T> {
        check_index(index, self.len)?;
        Ok(match self.schema.slot(field) {
            Some(slot) => self.columns[slot][index],
            None => T::ZERO,
        })
    }

    fn set(&mut self, index: usize, field: Field, value: T) -> BenchResult<()> {
        check_index(index, self.len)?;
        let slot = self
            .schema
            .slot(field)
            .ok_or(BenchError::FieldNotStored { field })?;
        self.columns[slot][index] = value;
        Ok(())
    }
}

impl<T: Scalar> KernelStore<T> for SoaStore<T> {
    fn apply_force(&mut self, constants: &KernelConstants<T>, execution: Execution) {
        let (k_y, k_z) = (constants.k_y(), constants.k_z());
        let (position, inputs) = self.columns.split_at_mut(3);
        let [x, y, z] = position else {
            return;
        };

        // One pass per component
        match inputs {
            [vx, vy, vz, charge, ..] => {
                integrate_x(x, vx, execution);
                integrate_y(y, vy, charge, k_y, execution);
                integrate_z(z, vz, k_z, execution);
            }
            _ => {
                let zero = T::ZERO;
                map_in_place(x, |x| force_x(x, zero), execution);
                map_in_place(y, |y| force_y(y, zero, zero, k_y), execution);
                map_in_place(z, |z| force_z(z, zero, k_z), execution);
            }
        }
    }

    fn overwrite_positions(&mut self, value: [T; 3], execution: Execution) {
        for (column, &v) in self.columns[..3].iter_mut().zip(value.iter()) {
            map_in_place(column, |_| v, execution);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_index_aligned() {
        let mut store = SoaStore::<f32>::allocate(5, ParticleSchema::full()).unwrap();
        store.set(3, Field::Vy, 2.0).unwrap();
        store.set(3, Field::X, 1.0).unwrap();

        assert_eq!(store.column(Field::Vy).unwrap()[3], 2.0);
        assert_eq!(store.column(Field::X).unwrap()[3], 1.0);
        assert_eq!(store.column(Field::X).unwrap().len(), 5);
    }

    #[test]
    fn test_cold_buffer_sized_per_particle() {
        let schema = ParticleSchema::position_only().padded();
        let store = SoaStore::<f64>::allocate(8, schema).unwrap();

        assert_eq!(store.cold_len(), 80);
        assert!(store.column(Field::Vx).is_none());
        assert_eq!(store.footprint_bytes(), (3 * 8 + 80) * 8);
    }

    #[test]
    fn test_force_on_position_only_adds_zero() {
        let mut store = SoaStore::<f32>::allocate(2, ParticleSchema::position_only()).unwrap();
        store.set(0, Field::X, 1.5).unwrap();
        store.set(1, Field::Z, -2.0).unwrap();

        store.apply_force(&KernelConstants::default(), Execution::Sequential);

        assert_eq!(store.particle(0).unwrap().position, [1.5, 0.0, 0.0]);
        assert_eq!(store.particle(1).unwrap().position, [0.0, 0.0, -2.0]);
    }

    #[test]
    fn test_zero_length_store() {
        let mut store = SoaStore::<f64>::allocate(0, ParticleSchema::full()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.particles().count(), 0);
        store.apply_force(&KernelConstants::default(), Execution::Parallel);
        assert!(store.get(0, Field::X).is_err());
    }
}
