//! Particle layout strategies
//!
//! A particle is a logical record (`position`, `velocity`, `charge`, plus two unused
//! scalars). Each store decides where those fields live in memory:
//!
//! ```text
//! AoS:    [x0 y0 z0 vx0 .. v0 | x1 y1 z1 vx1 .. v1 | ...]
//! SoA:    x: [x0 x1 x2 ...]  y: [y0 y1 y2 ...]  ...
//! AoSoA:  [x0..x15 y0..y15 .. v0..v15 | x16..x31 y16..y31 .. | ...]
//! ```
//!
//! All three expose the same logical index space through [`ParticleStore`].

pub mod aos;
pub mod aosoa;
pub mod soa;

pub use aos::AosStore;
pub use aosoa::{block_slot, AosoaStore};
pub use soa::SoaStore;

use crate::constants::particles::COLD_FIELDS;
use crate::error::{allocation_error, BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// Numeric type a benchmark variant runs with (`f32` or `f64`)
pub trait Scalar:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + Add<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    const ZERO: Self;
    const NAME: &'static str;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const NAME: &'static str = "f32";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const NAME: &'static str = "f64";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// Logical particle fields, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    X,
    Y,
    Z,
    Vx,
    Vy,
    Vz,
    Charge,
    Mass,
    Volume,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::X,
        Field::Y,
        Field::Z,
        Field::Vx,
        Field::Vy,
        Field::Vz,
        Field::Charge,
        Field::Mass,
        Field::Volume,
    ];

    /// Position of this field within a record/block when stored
    #[inline]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

static FULL_FIELDS: [Field; 9] = Field::ALL;
static POSITION_FIELDS: [Field; 3] = [Field::X, Field::Y, Field::Z];

/// Which logical fields a store physically holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotFields {
    /// Position, velocity, charge, mass and volume
    #[default]
    Full,
    /// Position only
    Position,
}

impl HotFields {
    pub fn fields(self) -> &'static [Field] {
        match self {
            HotFields::Full => &FULL_FIELDS,
            HotFields::Position => &POSITION_FIELDS,
        }
    }

    pub fn count(self) -> usize {
        self.fields().len()
    }
}

/// Storage shape of one particle: hot fields plus unaddressable cold padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleSchema {
    pub hot: HotFields,
    pub cold_fields: usize,
}

impl Default for ParticleSchema {
    fn default() -> Self {
        Self::full()
    }
}

impl ParticleSchema {
    pub const fn full() -> Self {
        Self {
            hot: HotFields::Full,
            cold_fields: 0,
        }
    }

    pub const fn position_only() -> Self {
        Self {
            hot: HotFields::Position,
            cold_fields: 0,
        }
    }

    pub const fn with_cold_fields(mut self, cold_fields: usize) -> Self {
        self.cold_fields = cold_fields;
        self
    }

    /// Carry the standard `COLD_FIELDS` padding scalars
    pub const fn padded(self) -> Self {
        self.with_cold_fields(COLD_FIELDS)
    }

    pub fn stored_fields(&self) -> &'static [Field] {
        self.hot.fields()
    }

    /// Slot of `field` among the stored fields, `None` if the schema drops it
    #[inline]
    pub fn slot(&self, field: Field) -> Option<usize> {
        let ordinal = field.ordinal();
        (ordinal < self.hot.count()).then_some(ordinal)
    }

    #[inline]
    pub fn stores(&self, field: Field) -> bool {
        self.slot(field).is_some()
    }

    /// Scalars per particle including cold padding
    #[inline]
    pub fn stride(&self) -> usize {
        self.hot.count() + self.cold_fields
    }

    /// Velocity and charge are present, so force kernels read real inputs
    #[inline]
    pub fn has_dynamics(&self) -> bool {
        self.hot == HotFields::Full
    }
}

/// Snapshot of every logical field of one particle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle<T> {
    pub position: [T; 3],
    pub velocity: [T; 3],
    pub charge: T,
    pub mass: T,
    pub volume: T,
}

impl<T: Scalar> Particle<T> {
    pub fn new(position: [T; 3], velocity: [T; 3], charge: T) -> Self {
        Self {
            position,
            velocity,
            charge,
            mass: T::ZERO,
            volume: T::ZERO,
        }
    }

    pub fn field(&self, field: Field) -> T {
        match field {
            Field::X => self.position[0],
            Field::Y => self.position[1],
            Field::Z => self.position[2],
            Field::Vx => self.velocity[0],
            Field::Vy => self.velocity[1],
            Field::Vz => self.velocity[2],
            Field::Charge => self.charge,
            Field::Mass => self.mass,
            Field::Volume => self.volume,
        }
    }

    pub fn set_field(&mut self, field: Field, value: T) {
        match field {
            Field::X => self.position[0] = value,
            Field::Y => self.position[1] = value,
            Field::Z => self.position[2] = value,
            Field::Vx => self.velocity[0] = value,
            Field::Vy => self.velocity[1] = value,
            Field::Vz => self.velocity[2] = value,
            Field::Charge => self.charge = value,
            Field::Mass => self.mass = value,
            Field::Volume => self.volume = value,
        }
    }
}

/// Memory layout strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Aos,
    Soa,
    Aosoa,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 3] = [LayoutKind::Aos, LayoutKind::Soa, LayoutKind::Aosoa];

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Aos => "aos",
            LayoutKind::Soa => "soa",
            LayoutKind::Aosoa => "aosoa",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutKind::ALL
            .into_iter()
            .find(|layout| layout.name() == s)
            .ok_or_else(|| BenchError::Config(format!("unrecognized layout '{}'", s)))
    }
}

/// Logical random access to N particles, independent of physical layout
pub trait ParticleStore<T: Scalar> {
    /// Reserve zeroed storage for exactly `len` particles
    fn allocate(len: usize, schema: ParticleSchema) -> BenchResult<Self>
    where
        Self: Sized;

    fn layout(&self) -> LayoutKind;

    fn schema(&self) -> ParticleSchema;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of particle storage held, cold padding included
    fn footprint_bytes(&self) -> usize;

    /// Read one field. Fields the schema does not store read as zero.
    fn get(&self, index: usize, field: Field) -> BenchResult<T>;

    /// Write one field
    fn set(&mut self, index: usize, field: Field, value: T) -> BenchResult<()>;

    fn particle(&self, index: usize) -> BenchResult<Particle<T>> {
        let mut particle = Particle::default();
        for &field in &Field::ALL {
            particle.set_field(field, self.get(index, field)?);
        }
        Ok(particle)
    }

    /// Write every stored field of `particle` to `index`; dropped fields are skipped
    fn write_particle(&mut self, index: usize, particle: &Particle<T>) -> BenchResult<()> {
        let schema = self.schema();
        for &field in schema.stored_fields() {
            self.set(index, field, particle.field(field))?;
        }
        Ok(())
    }

    /// Lazy ascending traversal; call again to restart
    fn particles(&self) -> Particles<'_, T, Self>
    where
        Self: Sized,
    {
        Particles::new(self)
    }

    fn for_each<F>(&self, mut f: F)
    where
        Self: Sized,
        F: FnMut(usize, Particle<T>),
    {
        for (index, particle) in self.particles().enumerate() {
            f(index, particle);
        }
    }
}

/// Iterator over the particles of a store in logical index order
pub struct Particles<'a, T, S> {
    store: &'a S,
    next: usize,
    len: usize,
    _scalar: PhantomData<T>,
}

impl<'a, T: Scalar, S: ParticleStore<T>> Particles<'a, T, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            next: 0,
            len: store.len(),
            _scalar: PhantomData,
        }
    }
}

impl<'a, T: Scalar, S: ParticleStore<T>> Iterator for Particles<'a, T, S> {
    type Item = Particle<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let particle = self.store.particle(self.next).ok()?;
        self.next += 1;
        Some(particle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Scalar, S: ParticleStore<T>> ExactSizeIterator for Particles<'a, T, S> {}

/// Zero-filled buffer of `count` scalars; failure is reported, never aborts
pub(crate) fn zeroed_buffer<T: Scalar>(count: usize) -> BenchResult<Vec<T>> {
    let bytes = count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| allocation_error(usize::MAX, "requested size overflows usize"))?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(count)
        .map_err(|e| allocation_error(bytes, e))?;
    buffer.resize(count, T::ZERO);

    log::debug!("[layout] reserved {} x {} ({} bytes)", count, T::NAME, bytes);
    Ok(buffer)
}

/// `len * per_particle` scalars, with overflow reported as an allocation error
pub(crate) fn scalar_count<T: Scalar>(len: usize, per_particle: usize) -> BenchResult<usize> {
    len.checked_mul(per_particle).ok_or_else(|| {
        allocation_error(
            usize::MAX,
            format!(
                "{} particles x {} {} overflows usize",
                len,
                per_particle,
                T::NAME
            ),
        )
    })
}
