//! 2-D Dual-Tree Complex Wavelet Transform.
//!
//! An image is decomposed into a real lowpass image and, per level, six complex subbands that
//! are selective to edges at ±15°, ±45° and ±75°. Level 1 uses odd-length biort filters and levels
//! >= 2 the quarter-sample-shift (qshift) filter trees.
//!
//! ```no_run
//! use dtcwt::{CoeffCache, Transform2d};
//! use ndarray::Array2;
//!
//! let cache = CoeffCache::new();
//! let xform = Transform2d::<f64>::new("near_sym_a", "qshift_b", &cache).unwrap();
//! let image = Array2::<f64>::zeros((64, 64));
//! let pyramid = xform.forward(image.view(), 4, false).unwrap();
//! let recon = xform.inverse(&pyramid, None).unwrap();
//! assert_eq!(recon.dim(), (64, 64));
//! ```

use std::iter::Sum;

pub mod coeffs;
pub mod config;
pub mod convolve;
pub mod error;
pub mod lowlevel;
pub mod transform2d;
mod utils;

pub use coeffs::{
    Biort, BuiltinCoeffs, CoeffCache, CoeffSource, FilterSet, FilterSpec, Qshift, DEFAULT_BIORT,
    DEFAULT_QSHIFT,
};
pub use config::TransformConfig;
pub use convolve::column_convolve;
pub use error::{DtcwtError, FilterFamily, Result};
pub use lowlevel::{coldfilt, colfilter, colifilt};
pub use transform2d::{
    c2q, forward_transform, inverse_transform, q2c, Extension, Pyramid, Transform2d,
};
pub use utils::reflect;

/// Floating point sample type the transform runs on (`f32` or `f64`)
pub trait Sample: realfft::FftNum + num_traits::Float + Sum {}

impl<T> Sample for T where T: realfft::FftNum + num_traits::Float + Sum {}
