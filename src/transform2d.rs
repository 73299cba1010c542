//! Forward and inverse 2-D dual-tree complex wavelet transform.
//!
//! Level 1 uses the odd-length biort filters without decimation, levels >= 2 use the q-shift
//! filter trees. At every level the three highpass images (horizontal, vertical and diagonal) are
//! each packed into two complex subbands, giving six orientations:
//!
//! | band | orientation | pair       |
//! |------|-------------|------------|
//! | 0    | 15°         | horizontal |
//! | 1    | 45°         | diagonal   |
//! | 2    | 75°         | vertical   |
//! | 3    | 105°        | vertical   |
//! | 4    | 135°        | diagonal   |
//! | 5    | 165°        | horizontal |

use crate::{
    coeffs::{Biort, CoeffCache, CoeffSource, FilterSpec, Qshift, DEFAULT_BIORT, DEFAULT_QSHIFT},
    error::{DtcwtError, Result},
    lowlevel::{coldfilt, colfilter, colifilt},
    utils::{from_f64, halve},
    Sample,
};
use log::{debug, warn};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, ArrayViewD, Axis, Ix2};
use num_complex::Complex;
use std::fmt;

/// Subband pairs for the horizontal, vertical and diagonal quad images
const HORIZONTAL: [usize; 2] = [0, 5];
const VERTICAL: [usize; 2] = [2, 3];
const DIAGONAL: [usize; 2] = [1, 4];

/// Converts quads of real samples into pairs of complex subbands. `y` is arranged as repeating
/// 2x2 quads
///
/// ```text
///  a----b
///  |    |
///  c----d
/// ```
///
/// from which `p = (a + jb) / sqrt(2)` and `q = (d - jc) / sqrt(2)` are formed. The result has
/// shape `(rows / 2, cols / 2, 2)` and holds `p - q` and `p + q`.
pub fn q2c<T: Sample>(y: ArrayView2<T>) -> Result<Array3<Complex<T>>> {
    let rows = halve(y.nrows())?;
    let cols = halve(y.ncols())?;
    let h = from_f64::<T>(0.5)?.sqrt();
    Ok(Array3::from_shape_fn((rows, cols, 2), |(i, j, k)| {
        let p = Complex::new(y[[2 * i, 2 * j]], y[[2 * i, 2 * j + 1]]) * h;
        let q = Complex::new(y[[2 * i + 1, 2 * j + 1]], -y[[2 * i + 1, 2 * j]]) * h;
        if k == 0 {
            p - q
        } else {
            p + q
        }
    }))
}

/// Scales the two complex subbands in `w` by `gain` and converts them back into real quads.
/// This is the inverse of [`q2c`] when `gain` is `[1, 1]`:
///
/// ```text
///  A----B     Re   Im of w[.., .., 0]
///  |    |
///  C----D     Re   Im of w[.., .., 1]
/// ```
pub fn c2q<T: Sample>(w: ArrayView3<Complex<T>>, gain: [T; 2]) -> Result<Array2<T>> {
    let (rows, cols, bands) = w.dim();
    if bands != 2 {
        return Err(DtcwtError::BandCount(bands));
    }
    let mut x = Array2::<T>::zeros((rows * 2, cols * 2));
    // both bands switched off
    if gain.iter().all(|g| *g == T::zero()) {
        return Ok(x);
    }

    let h = from_f64::<T>(0.5)?.sqrt();
    let (sc0, sc1) = (gain[0] * h, gain[1] * h);
    for i in 0..rows {
        for j in 0..cols {
            let p = w[[i, j, 0]] * sc0 + w[[i, j, 1]] * sc1;
            let q = w[[i, j, 0]] * sc0 - w[[i, j, 1]] * sc1;
            // recover the four corners of the quad
            x[[2 * i, 2 * j]] = p.re;
            x[[2 * i, 2 * j + 1]] = p.im;
            x[[2 * i + 1, 2 * j]] = q.im;
            x[[2 * i + 1, 2 * j + 1]] = -q.re;
        }
    }
    Ok(x)
}

/// Record of the row/column duplicated to make an odd-sized image even
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub original: (usize, usize),
    pub extended: (usize, usize),
}

impl Extension {
    pub fn row_added(&self) -> bool {
        self.extended.0 != self.original.0
    }

    pub fn col_added(&self) -> bool {
        self.extended.1 != self.original.1
    }

    fn duplicated(&self) -> &'static str {
        match (self.row_added(), self.col_added()) {
            (true, true) => "The bottom row and rightmost column have been duplicated",
            (true, false) => "The bottom row has been duplicated",
            (false, true) => "The rightmost column has been duplicated",
            (false, false) => "Nothing has been duplicated",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The image entered is now a {}x{} NOT a {}x{}. {}, prior to decomposition.",
            self.extended.0,
            self.extended.1,
            self.original.0,
            self.original.1,
            self.duplicated()
        )
    }
}

/// Result of a forward transform
#[derive(Debug, Clone)]
pub struct Pyramid<T> {
    /// Real lowpass image from the final level
    pub lowpass: Array2<T>,
    /// Complex highpass subbands of shape `(rows, cols, 6)`, finest level first
    pub highpasses: Vec<Array3<Complex<T>>>,
    /// Lowpass image of every level, finest first, when requested
    pub scales: Option<Vec<Array2<T>>>,
    /// Set when the input had odd dimensions and was extended before decomposition
    pub extension: Option<Extension>,
}

impl<T> Pyramid<T> {
    pub fn levels(&self) -> usize {
        self.highpasses.len()
    }
}

/// Filters applied along one direction at a given level
enum Stage<'a, T> {
    Biort(&'a Biort<T>),
    Qshift(&'a Qshift<T>),
}

impl<'a, T: Sample> Stage<'a, T> {
    fn analysis_lo(&self, x: ArrayView2<T>) -> Result<Array2<T>> {
        match self {
            Stage::Biort(b) => colfilter(x, &b.h0o),
            Stage::Qshift(q) => coldfilt(x, &q.h0b, &q.h0a),
        }
    }

    fn analysis_hi(&self, x: ArrayView2<T>) -> Result<Array2<T>> {
        match self {
            Stage::Biort(b) => colfilter(x, &b.h1o),
            Stage::Qshift(q) => coldfilt(x, &q.h1b, &q.h1a),
        }
    }

    fn synthesis_lo(&self, x: ArrayView2<T>) -> Result<Array2<T>> {
        match self {
            Stage::Biort(b) => colfilter(x, &b.g0o),
            Stage::Qshift(q) => colifilt(x, &q.g0b, &q.g0a),
        }
    }

    fn synthesis_hi(&self, x: ArrayView2<T>) -> Result<Array2<T>> {
        match self {
            Stage::Biort(b) => colfilter(x, &b.g1o),
            Stage::Qshift(q) => colifilt(x, &q.g1b, &q.g1a),
        }
    }

    /// Decomposes `x` into its lowpass image and the six subbands of this level
    fn analyse(&self, x: ArrayView2<T>) -> Result<(Array2<T>, Array3<Complex<T>>)> {
        // columns first, then rows on the transposed result
        let lo = self.analysis_lo(x)?.reversed_axes();
        let hi = self.analysis_hi(x)?.reversed_axes();
        let lolo = self.analysis_lo(lo.view())?.reversed_axes();

        let quad = |x: ArrayView2<T>, highpass: bool| -> Result<Array3<Complex<T>>> {
            let y = if highpass {
                self.analysis_hi(x)?
            } else {
                self.analysis_lo(x)?
            };
            q2c(y.reversed_axes().view())
        };
        let ((horizontal, vertical), diagonal) = rayon::join(
            || rayon::join(|| quad(hi.view(), false), || quad(lo.view(), true)),
            || quad(hi.view(), true),
        );

        let shape = (halve(lolo.nrows())?, halve(lolo.ncols())?, 6);
        let mut bands = Array3::<Complex<T>>::zeros(shape);
        for (pair, packed) in [
            (HORIZONTAL, horizontal?),
            (VERTICAL, vertical?),
            (DIAGONAL, diagonal?),
        ] {
            for (k, band) in pair.iter().enumerate() {
                bands
                    .index_axis_mut(Axis(2), *band)
                    .assign(&packed.index_axis(Axis(2), k));
            }
        }
        Ok((lolo, bands))
    }

    /// Recombines the lowpass image `z` with the six subbands of this level
    fn synthesise(
        &self,
        z: ArrayView2<T>,
        bands: &Array3<Complex<T>>,
        gains: [T; 6],
    ) -> Result<Array2<T>> {
        let quad = |pair: [usize; 2]| {
            c2q(
                bands.select(Axis(2), &pair).view(),
                [gains[pair[0]], gains[pair[1]]],
            )
        };
        let lh = quad(HORIZONTAL)?;
        let hl = quad(VERTICAL)?;
        let hh = quad(DIAGONAL)?;

        // columns first, then rows on the transposed result
        let (y1, y2) = rayon::join(
            || -> Result<Array2<T>> {
                Ok(self.synthesis_lo(z)? + self.synthesis_hi(lh.view())?)
            },
            || -> Result<Array2<T>> {
                Ok(self.synthesis_lo(hl.view())? + self.synthesis_hi(hh.view())?)
            },
        );
        let (y1, y2) = (y1?, y2?);
        Ok((self.synthesis_lo(y1.t())? + self.synthesis_hi(y2.t())?).reversed_axes())
    }
}

/// Duplicates the first and last rows and/or columns until both dimensions are multiples of 4
fn pad_to_multiple_of_4<T: Sample>(x: Array2<T>) -> Array2<T> {
    let border = |len: usize| -> Vec<usize> {
        std::iter::once(0)
            .chain(0..len)
            .chain(std::iter::once(len - 1))
            .collect()
    };
    let x = if x.nrows() % 4 != 0 {
        x.select(Axis(0), &border(x.nrows()))
    } else {
        x
    };
    if x.ncols() % 4 != 0 {
        x.select(Axis(1), &border(x.ncols()))
    } else {
        x
    }
}

/// Duplicates the last row and/or column of an odd-sized image
fn extend_to_even<T: Sample>(x: ArrayView2<T>) -> (Array2<T>, Option<Extension>) {
    let original = x.dim();
    let grow = |len: usize| -> Vec<usize> {
        let mut idx: Vec<usize> = (0..len).collect();
        if len % 2 != 0 {
            idx.push(len - 1);
        }
        idx
    };
    let extended = x
        .select(Axis(0), &grow(original.0))
        .select(Axis(1), &grow(original.1));
    let extension = (extended.dim() != original).then(|| Extension {
        original,
        extended: extended.dim(),
    });
    (extended, extension)
}

/// A 2-D DTCWT with resolved level 1 (biort) and level >= 2 (qshift) filters.
#[derive(Debug, Clone)]
pub struct Transform2d<T> {
    biort: Biort<T>,
    qshift: Qshift<T>,
}

impl<T: Sample> Transform2d<T> {
    /// Resolves the filter specs once, either by name through `cache` or from explicit
    /// coefficients.
    pub fn new<S: CoeffSource>(
        biort: impl Into<FilterSpec<Biort<T>>>,
        qshift: impl Into<FilterSpec<Qshift<T>>>,
        cache: &CoeffCache<S>,
    ) -> Result<Self> {
        Ok(Self {
            biort: biort.into().resolve(cache)?,
            qshift: qshift.into().resolve(cache)?,
        })
    }

    /// Uses the `near_sym_a` and `qshift_a` filters
    pub fn with_defaults<S: CoeffSource>(cache: &CoeffCache<S>) -> Result<Self> {
        Self::new(DEFAULT_BIORT, DEFAULT_QSHIFT, cache)
    }

    pub fn biort(&self) -> &Biort<T> {
        &self.biort
    }

    pub fn qshift(&self) -> &Qshift<T> {
        &self.qshift
    }

    /// Like [`Transform2d::forward`] for an image of arbitrary rank. Scalars and vectors are
    /// treated as a single row; images with more than two axes are rejected.
    pub fn forward_dyn(
        &self,
        x: ArrayViewD<T>,
        nlevels: usize,
        include_scale: bool,
    ) -> Result<Pyramid<T>> {
        let image = match x.ndim() {
            0 | 1 => Array2::from_shape_vec((1, x.len()), x.iter().copied().collect())
                .map_err(|_| rank_error(&x))?,
            2 => x
                .view()
                .into_dimensionality::<Ix2>()
                .map_err(|_| rank_error(&x))?
                .to_owned(),
            _ => return Err(rank_error(&x)),
        };
        self.forward(image.view(), nlevels, include_scale)
    }

    /// Performs an `nlevels` decomposition of `x`. If either dimension of `x` is odd the last
    /// row/column is duplicated first; this is logged and recorded in [`Pyramid::extension`].
    pub fn forward(
        &self,
        x: ArrayView2<T>,
        nlevels: usize,
        include_scale: bool,
    ) -> Result<Pyramid<T>> {
        if x.is_empty() {
            return Err(DtcwtError::EmptyInput(x.dim()));
        }
        let (x, extension) = extend_to_even(x);
        if let Some(ext) = &extension {
            warn!(
                "The image entered is now a {}x{} NOT a {}x{}.",
                ext.extended.0, ext.extended.1, ext.original.0, ext.original.1
            );
            warn!("{}, prior to decomposition.", ext.duplicated());
        }

        let mut highpasses = Vec::with_capacity(nlevels);
        let mut scales = include_scale.then(|| Vec::with_capacity(nlevels));
        let mut lolo = x;

        for level in 0..nlevels {
            let (next, bands) = if level == 0 {
                Stage::Biort(&self.biort).analyse(lolo.view())?
            } else {
                lolo = pad_to_multiple_of_4(lolo);
                Stage::Qshift(&self.qshift).analyse(lolo.view())?
            };
            debug!(
                "level {}: lowpass {:?}, subbands {:?}",
                level + 1,
                next.dim(),
                bands.dim()
            );
            lolo = next;
            highpasses.push(bands);
            if let Some(scales) = scales.as_mut() {
                scales.push(lolo.clone());
            }
        }

        Ok(Pyramid {
            lowpass: lolo,
            highpasses,
            scales,
            extension,
        })
    }

    /// Reconstructs an image from `pyramid`. `gain_mask[[d, l]]` scales subband `d` of level `l`
    /// (both zero-indexed); it defaults to all ones and must have shape `(6, levels)`. A zero gain
    /// lets the band be skipped.
    pub fn inverse(
        &self,
        pyramid: &Pyramid<T>,
        gain_mask: Option<ArrayView2<T>>,
    ) -> Result<Array2<T>> {
        let nlevels = pyramid.levels();
        let gain_mask = match gain_mask {
            Some(mask) if mask.dim() != (6, nlevels) => {
                return Err(DtcwtError::GainMaskShape {
                    found: mask.dim(),
                    expected: (6, nlevels),
                })
            }
            Some(mask) => mask.to_owned(),
            None => Array2::ones((6, nlevels)),
        };
        for (level, bands) in pyramid.highpasses.iter().enumerate() {
            if bands.dim().2 != 6 {
                return Err(DtcwtError::SubbandShape {
                    level,
                    shape: bands.shape().to_vec(),
                });
            }
        }
        let gains = |level: usize| -> [T; 6] {
            let column = gain_mask.column(level);
            [column[0], column[1], column[2], column[3], column[4], column[5]]
        };

        let mut z = pyramid.lowpass.clone();
        for level in (0..nlevels).rev() {
            let bands = &pyramid.highpasses[level];
            let expected = (bands.dim().0 * 2, bands.dim().1 * 2);
            if z.dim() != expected {
                return Err(DtcwtError::ReconstructionShape {
                    found: z.dim(),
                    expected,
                });
            }
            if level == 0 {
                z = Stage::Biort(&self.biort).synthesise(z.view(), bands, gains(level))?;
                break;
            }
            z = Stage::Qshift(&self.qshift).synthesise(z.view(), bands, gains(level))?;

            // undo the padding to a multiple of 4 done by the forward transform
            let finer = pyramid.highpasses[level - 1].dim();
            let expected = (finer.0 * 2, finer.1 * 2);
            if z.nrows() == expected.0 + 2 {
                z = z.slice(s![1..-1, ..]).to_owned();
            }
            if z.ncols() == expected.1 + 2 {
                z = z.slice(s![.., 1..-1]).to_owned();
            }
            debug!("level {}: reconstructed lowpass {:?}", level, z.dim());
        }
        Ok(z)
    }
}

fn rank_error<T>(x: &ArrayViewD<T>) -> DtcwtError {
    let shape: Vec<String> = x.shape().iter().map(|d| d.to_string()).collect();
    DtcwtError::ImageRank(shape.join("x"))
}

/// Performs an `nlevels` forward transform of `x` with the given filter specs
pub fn forward_transform<T: Sample, S: CoeffSource>(
    x: ArrayView2<T>,
    nlevels: usize,
    biort: impl Into<FilterSpec<Biort<T>>>,
    qshift: impl Into<FilterSpec<Qshift<T>>>,
    include_scale: bool,
    cache: &CoeffCache<S>,
) -> Result<Pyramid<T>> {
    Transform2d::new(biort, qshift, cache)?.forward(x, nlevels, include_scale)
}

/// Reconstructs an image from `pyramid` with the given filter specs
pub fn inverse_transform<T: Sample, S: CoeffSource>(
    pyramid: &Pyramid<T>,
    biort: impl Into<FilterSpec<Biort<T>>>,
    qshift: impl Into<FilterSpec<Qshift<T>>>,
    gain_mask: Option<ArrayView2<T>>,
    cache: &CoeffCache<S>,
) -> Result<Array2<T>> {
    Transform2d::new(biort, qshift, cache)?.inverse(pyramid, gain_mask)
}
