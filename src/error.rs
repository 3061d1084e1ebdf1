//! Error types for layout-bench
//!
//! Library code returns `BenchResult`; binaries wrap these in `anyhow` with context.

use crate::layout::Field;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Allocation of {requested} bytes failed: {reason}")]
    Allocation {
        requested: usize,
        reason: String,
    },

    #[error("Particle index {index} out of range for store of {len} particles")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    #[error("Field {field:?} is not stored by this particle schema")]
    FieldNotStored {
        field: Field,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for benchmark results
pub type BenchResult<T> = Result<T, BenchError>;

/// Create an allocation error
pub fn allocation_error(requested: usize, reason: impl std::fmt::Display) -> BenchError {
    BenchError::Allocation {
        requested,
        reason: reason.to_string(),
    }
}

/// Create a configuration error
pub fn config_error(message: impl Into<String>) -> BenchError {
    BenchError::Config(message.into())
}

impl From<toml::de::Error> for BenchError {
    fn from(e: toml::de::Error) -> Self {
        config_error(format!("invalid TOML: {}", e))
    }
}

/// Check a logical index against a store length
#[inline]
pub fn check_index(index: usize, len: usize) -> BenchResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(BenchError::IndexOutOfRange { index, len })
    }
}
