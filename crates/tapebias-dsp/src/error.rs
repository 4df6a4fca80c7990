//! LUT binding and loading errors.
//!
//! Only configuration paths return these. The per-sample path is total.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{table}: expected {expected} values ({m_size}x{h_size}), got {actual}")]
    SizeMismatch {
        table: &'static str,
        m_size: usize,
        h_size: usize,
        expected: usize,
        actual: usize,
    },

    #[error("LUT grid {m_size}x{h_size} too small: need at least 2 points per axis")]
    GridTooSmall { m_size: usize, h_size: usize },

    #[error("{table}: {len} bytes is not a whole number of f64 values")]
    TruncatedData { table: &'static str, len: usize },

    #[error("invalid axis range [{min}, {max}]")]
    InvalidAxis { min: f64, max: f64 },
}

pub type LutResult<T> = Result<T, LutError>;
