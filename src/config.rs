//! Transform settings that can be read from any serde format.
//!
//! ```json
//! { "biort": "legall", "qshift": "qshift_b", "levels": 4, "include_scale": true }
//! ```
//!
//! Missing fields take their defaults: `near_sym_a`, `qshift_a`, 3 levels and no scales.

use crate::{
    coeffs::{CoeffCache, CoeffSource, DEFAULT_BIORT, DEFAULT_QSHIFT},
    error::Result,
    transform2d::{Pyramid, Transform2d},
    Sample,
};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Number of levels used when none is given
pub const DEFAULT_LEVELS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Name of the level 1 filter set
    pub biort: String,
    /// Name of the level >= 2 filter set
    pub qshift: String,
    pub levels: usize,
    /// Keep the lowpass image of every level
    pub include_scale: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            biort: DEFAULT_BIORT.to_string(),
            qshift: DEFAULT_QSHIFT.to_string(),
            levels: DEFAULT_LEVELS,
            include_scale: false,
        }
    }
}

impl TransformConfig {
    /// Resolves the named filter sets through `cache`
    pub fn build<T: Sample, S: CoeffSource>(
        &self,
        cache: &CoeffCache<S>,
    ) -> Result<Transform2d<T>> {
        Transform2d::new(self.biort.as_str(), self.qshift.as_str(), cache)
    }

    pub fn forward<T: Sample, S: CoeffSource>(
        &self,
        x: ArrayView2<T>,
        cache: &CoeffCache<S>,
    ) -> Result<Pyramid<T>> {
        self.build(cache)?.forward(x, self.levels, self.include_scale)
    }
}
