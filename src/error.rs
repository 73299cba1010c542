//! Error types shared by the filtering primitives and the transform pipeline.

use std::fmt;
use thiserror::Error;

/// Result type for DTCWT operations
pub type Result<T> = std::result::Result<T, DtcwtError>;

/// The two coefficient families a filter set can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterFamily {
    /// Odd/biorthogonal filters used at level 1
    Biort,
    /// Quarter-sample-shift filters used at levels >= 2
    Qshift,
}

impl fmt::Display for FilterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterFamily::Biort => write!(f, "biort"),
            FilterFamily::Qshift => write!(f, "qshift"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DtcwtError {
    /// Row count does not satisfy the filter's decimation/interpolation period
    #[error("No. of rows ({rows}) must be a multiple of {multiple}")]
    RowCount { rows: usize, multiple: usize },

    /// The two filters of a pair differ in length
    #[error("Filter pair lengths must match: {a} != {b}")]
    FilterLengthMismatch { a: usize, b: usize },

    /// A filter pair member has odd length
    #[error("Filter pair length must be even, got {0}")]
    OddFilterLength(usize),

    /// Input has more than two axes
    #[error("The entered image is {0}, please enter each image slice separately")]
    ImageRank(String),

    /// An image or column set with no samples along a filtered axis
    #[error("Cannot transform an empty input of shape {0:?}")]
    EmptyInput((usize, usize)),

    /// A filter with no taps
    #[error("Filter must have at least one tap")]
    EmptyFilter,

    /// A complex quad tensor does not hold exactly two bands
    #[error("Expected 2 complex bands to unpack, got {0}")]
    BandCount(usize),

    /// A dimension that must be halved exactly is odd
    #[error("Cannot halve odd dimension {0}")]
    OddDimension(usize),

    /// Reconstruction produced a lowpass image that does not fit the next level
    #[error("Sizes of subbands are not valid: reconstructed {found:?}, expected {expected:?}")]
    ReconstructionShape {
        found: (usize, usize),
        expected: (usize, usize),
    },

    /// A subband tensor is not shaped (rows, cols, 6)
    #[error("Subband tensor at level {level} has shape {shape:?}, expected (rows, cols, 6)")]
    SubbandShape { level: usize, shape: Vec<usize> },

    /// Gain mask is not shaped (6, levels)
    #[error("Gain mask has shape {found:?}, expected {expected:?}")]
    GainMaskShape {
        found: (usize, usize),
        expected: (usize, usize),
    },

    /// No coefficient set is known under this name
    #[error("No filter coefficients named '{0}'")]
    UnknownName(String),

    /// The name belongs to the other coefficient family
    #[error("Wavelet '{name}' does not define {requested} coefficients (it is a {found} set)")]
    WrongFamily {
        name: String,
        requested: FilterFamily,
        found: FilterFamily,
    },

    /// A coefficient cannot be represented in the sample type
    #[error("Coefficient {0} is not representable in the sample type")]
    Unrepresentable(f64),

    #[error("FFT failed: {0}")]
    Fft(#[from] realfft::FftError),
}
