// Layout Bench Constants - SINGLE SOURCE OF TRUTH
//
// Every default used by the stores, kernels and population engine lives here.
// Configuration files override these values; nothing else hardcodes them.

/// Particle store sizing
pub mod particles {
    /// Default particle count for a benchmark run (2^27)
    pub const NUM_PARTICLES: usize = 134_217_728;

    /// AoSoA block width in particles
    pub const BLOCK_SIZE: usize = 16;

    /// Unused scalars carried per particle by the footprint-matching variants
    pub const COLD_FIELDS: usize = 10;
}

/// Kernel constants
pub mod kernel {
    /// Force components. FORCE_X is part of the configuration surface but the
    /// force equation only reads FORCE_Y and FORCE_Z.
    pub const FORCE_X: f64 = 1.0;
    pub const FORCE_Y: f64 = 2.5;
    pub const FORCE_Z: f64 = 0.3;

    /// Values written by the update kernel
    pub const VALUE_X: f64 = 6.2;
    pub const VALUE_Y: f64 = 2.7;
    pub const VALUE_Z: f64 = 1.1;
}

/// Population engine defaults
pub mod population {
    /// Bucket capacity in particles
    pub const BUCKET_CAPACITY: usize = 64;

    /// Fraction of total capacity filled by a populate run
    pub const DENSITY: f64 = 0.5;

    /// Raw random values are drawn from [0, RAND_RANGE)
    pub const RAND_RANGE: u32 = 1 << 31;
}
