//! Column filters used by the transform pipeline: symmetric filtering without decimation
//! ([`colfilter`]), the decimating two-filter tree ([`coldfilt`]) and its interpolating dual
//! ([`colifilt`]). All of them operate down the columns; row filtering is done by the caller on a
//! transposed view.

use crate::{
    convolve::column_convolve,
    error::{DtcwtError, Result},
    utils::symm_ext_idx,
    Sample,
};
use ndarray::{s, Array2, ArrayView2, Axis};

/// Polyphase components of a filter pair. Due to 0-indexing the "odd" samples are the ones at even
/// offsets.
struct Polyphase<T> {
    hao: Vec<T>,
    hae: Vec<T>,
    hbo: Vec<T>,
    hbe: Vec<T>,
    /// true when sum(ha * hb) > 0, which selects the interleave order
    positive: bool,
}

impl<T: Sample> Polyphase<T> {
    fn new(ha: &[T], hb: &[T]) -> Self {
        let odd = |h: &[T]| h.iter().step_by(2).copied().collect::<Vec<T>>();
        let even = |h: &[T]| h.iter().skip(1).step_by(2).copied().collect::<Vec<T>>();
        let dot: T = ha.iter().zip(hb.iter()).map(|(a, b)| *a * *b).sum();
        Self {
            hao: odd(ha),
            hae: even(ha),
            hbo: odd(hb),
            hbe: even(hb),
            positive: dot > T::zero(),
        }
    }
}

fn check_pair<T>(ha: &[T], hb: &[T]) -> Result<()> {
    if ha.is_empty() || hb.is_empty() {
        return Err(DtcwtError::EmptyFilter);
    }
    if ha.len() != hb.len() {
        return Err(DtcwtError::FilterLengthMismatch {
            a: ha.len(),
            b: hb.len(),
        });
    }
    if ha.len() % 2 != 0 {
        return Err(DtcwtError::OddFilterLength(ha.len()));
    }
    Ok(())
}

/// Gathers the rows `xe[t]` of `x` for every `t` in `taps`
fn gather<T: Sample>(
    x: &ArrayView2<T>,
    xe: &[usize],
    taps: impl Iterator<Item = usize>,
) -> Array2<T> {
    let rows: Vec<usize> = taps.map(|t| xe[t]).collect();
    x.select(Axis(0), &rows)
}

/// Filters the columns of `x` with `h`, without decimation. If `h` has odd length each output
/// sample is aligned with an input sample and the output has the shape of `x`. If `h` has even
/// length each output sample sits at the mid point of a pair of input samples and the output has
/// one extra row.
pub fn colfilter<T: Sample>(x: ArrayView2<T>, h: &[T]) -> Result<Array2<T>> {
    if x.nrows() == 0 {
        return Err(DtcwtError::EmptyInput(x.dim()));
    }
    let rows = x.nrows() as isize;
    let m2 = (h.len() / 2) as isize;

    // symmetric extension with repeated end samples; reflection handles rows < m2
    let xe = symm_ext_idx(-m2, rows + m2, x.nrows());
    column_convolve(x.select(Axis(0), &xe).view(), h)
}

/// Filters the columns of `x` with the pair `ha` and `hb` (conceptually `hb = reverse(ha)`),
/// decimating by two. `ha` operates on the odd samples of `x` and `hb` on the even ones; the two
/// half-rate outputs are interleaved into the result.
///
/// ```text
///                   ext        top edge                     bottom edge       ext
/// Level 1:        !               |               !               |               !
/// odd filt on .    b   b   b   b   a   a   a   a   a   a   a   a   b   b   b   b
/// odd filt on .      a   a   a   a   b   b   b   b   b   b   b   b   a   a   a   a
/// Level 2:        !               |               !               |               !
/// +q filt on x      b       b       a       a       a       a       b       b
/// -q filt on o          a       a       b       b       b       b       a       a
/// ```
///
/// Fails if the number of rows is not a multiple of 4, or if the filters differ in length or
/// have odd length.
pub fn coldfilt<T: Sample>(x: ArrayView2<T>, ha: &[T], hb: &[T]) -> Result<Array2<T>> {
    let (rows, cols) = x.dim();
    if rows == 0 {
        return Err(DtcwtError::EmptyInput((rows, cols)));
    }
    if rows % 4 != 0 {
        return Err(DtcwtError::RowCount { rows, multiple: 4 });
    }
    check_pair(ha, hb)?;

    let m = ha.len();
    let xe = symm_ext_idx(-(m as isize), (rows + m) as isize, rows);
    let p = Polyphase::new(ha, hb);

    let t = || (5..rows + 2 * m - 2).step_by(4);
    let ya = column_convolve(gather(&x, &xe, t().map(|t| t - 1)).view(), &p.hao)?
        + column_convolve(gather(&x, &xe, t().map(|t| t - 3)).view(), &p.hae)?;
    let yb = column_convolve(gather(&x, &xe, t()).view(), &p.hbo)?
        + column_convolve(gather(&x, &xe, t().map(|t| t - 2)).view(), &p.hbe)?;

    let (sa, sb) = if p.positive { (0, 1) } else { (1, 0) };
    let mut y = Array2::<T>::zeros((rows / 2, cols));
    y.slice_mut(s![sa..;2, ..]).assign(&ya);
    y.slice_mut(s![sb..;2, ..]).assign(&yb);
    Ok(y)
}

/// Filters the columns of `x` with the pair `ha` and `hb` (conceptually `hb = reverse(ha)`),
/// interpolating by two. This is the dual of [`coldfilt`]:
///
/// ```text
///                   ext       left edge                      right edge       ext
/// Level 2:        !               |               !               |               !
/// +q filt on x      b       b       a       a       a       a       b       b
/// -q filt on o          a       a       b       b       b       b       a       a
/// Level 1:        !               |               !               |               !
/// odd filt on .    b   b   b   b   a   a   a   a   a   a   a   a   b   b   b   b
/// odd filt on .      a   a   a   a   b   b   b   b   b   b   b   b   a   a   a   a
/// ```
///
/// An all-zero input returns zeros without filtering. Fails if the number of rows is odd, or if
/// the filters differ in length or have odd length.
pub fn colifilt<T: Sample>(x: ArrayView2<T>, ha: &[T], hb: &[T]) -> Result<Array2<T>> {
    let (rows, cols) = x.dim();
    if rows % 2 != 0 {
        return Err(DtcwtError::RowCount { rows, multiple: 2 });
    }
    check_pair(ha, hb)?;

    if x.iter().all(|v| *v == T::zero()) {
        return Ok(Array2::zeros((rows * 2, cols)));
    }
    interpolate(x, ha, hb)
}

fn interpolate<T: Sample>(x: ArrayView2<T>, ha: &[T], hb: &[T]) -> Result<Array2<T>> {
    let (rows, cols) = x.dim();
    let m = ha.len();
    let m2 = m / 2;
    let xe = symm_ext_idx(-(m2 as isize), (rows + m2) as isize, rows);
    let p = Polyphase::new(ha, hb);

    // m/2 even: t starts on d samples, m/2 odd: t starts on b samples
    let (t_start, t_stop) = if m2 % 2 == 0 {
        (3, rows + m)
    } else {
        (2, rows + m - 1)
    };
    let t = || (t_start..t_stop).step_by(2);
    let (ta_shift, tb_shift) = if p.positive { (0, 1) } else { (1, 0) };
    let ta = |back: usize| gather(&x, &xe, t().map(move |t| t - ta_shift - back));
    let tb = |back: usize| gather(&x, &xe, t().map(move |t| t - tb_shift - back));

    let phases = if m2 % 2 == 0 {
        [
            column_convolve(tb(2).view(), &p.hae)?,
            column_convolve(ta(2).view(), &p.hbe)?,
            column_convolve(tb(0).view(), &p.hao)?,
            column_convolve(ta(0).view(), &p.hbo)?,
        ]
    } else {
        [
            column_convolve(tb(0).view(), &p.hao)?,
            column_convolve(ta(0).view(), &p.hbo)?,
            column_convolve(tb(0).view(), &p.hae)?,
            column_convolve(ta(0).view(), &p.hbe)?,
        ]
    };

    let mut y = Array2::<T>::zeros((rows * 2, cols));
    for (offset, phase) in phases.iter().enumerate() {
        y.slice_mut(s![offset..;4, ..]).assign(phase);
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coeffs::{BuiltinCoeffs, CoeffCache, Qshift};
    use ndarray::Array2;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-1.0..1.0))
    }

    fn qshift(name: &str) -> Qshift<f64> {
        CoeffCache::<BuiltinCoeffs>::new().qshift(name).unwrap()
    }

    // 8 taps, so m/2 is even
    fn db4_qshift() -> Qshift<f64> {
        Qshift::from_h0b(&[
            -0.010597401785069032,
            0.0328830116668852,
            0.030841381835560764,
            -0.18703481171909309,
            -0.027983769416859854,
            0.6308807679298589,
            0.7148465705529157,
            0.2303778133088965,
        ])
    }

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        a.iter()
            .zip(b.iter())
            .for_each(|(x, y)| assert!((x - y).abs() < tol, "{} != {}", x, y));
    }

    #[test]
    fn colfilter_shapes() {
        let x = random_matrix(7, 3, 1);
        assert_eq!(colfilter(x.view(), &[0.25, 0.5, 0.25]).unwrap().dim(), (7, 3));
        assert_eq!(colfilter(x.view(), &[0.5, 0.5]).unwrap().dim(), (8, 3));
        // filter longer than the signal
        let h = vec![0.1; 13];
        assert_eq!(colfilter(x.view(), &h).unwrap().dim(), (7, 3));
    }

    #[test]
    fn colfilter_even_length_repeats_edges() {
        let x = ndarray::array![[1.], [2.], [4.]];
        let y = colfilter(x.view(), &[0.5, 0.5]).unwrap();
        assert_eq!(y, ndarray::array![[1.], [1.5], [3.], [4.]]);
    }

    #[test]
    fn colfilter_identity_kernel() {
        let x = random_matrix(10, 4, 2);
        let y = colfilter(x.view(), &[0., 1., 0.]).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn coldfilt_preconditions() {
        let q = qshift("qshift_a");
        let x = random_matrix(6, 2, 3);
        assert!(matches!(
            coldfilt(x.view(), &q.h0b, &q.h0a),
            Err(DtcwtError::RowCount { rows: 6, multiple: 4 })
        ));
        let x = random_matrix(8, 2, 3);
        assert!(matches!(
            coldfilt(x.view(), &q.h0b, &q.h0a[1..]),
            Err(DtcwtError::FilterLengthMismatch { a: 10, b: 9 })
        ));
        assert!(matches!(
            coldfilt(x.view(), &q.h0b[1..], &q.h0a[1..]),
            Err(DtcwtError::OddFilterLength(9))
        ));
    }

    #[test]
    fn empty_inputs_and_filters_are_rejected() {
        let q = qshift("qshift_a");
        let empty = Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            colfilter(empty.view(), &[0.25, 0.5, 0.25]),
            Err(DtcwtError::EmptyInput((0, 4)))
        ));
        assert!(matches!(
            coldfilt(empty.view(), &q.h0b, &q.h0a),
            Err(DtcwtError::EmptyInput((0, 4)))
        ));
        let x = random_matrix(8, 2, 5);
        assert!(matches!(
            coldfilt(x.view(), &[], &[]),
            Err(DtcwtError::EmptyFilter)
        ));
        assert!(matches!(
            colifilt(x.view(), &[], &[]),
            Err(DtcwtError::EmptyFilter)
        ));
    }

    #[test]
    fn colifilt_preconditions() {
        let q = qshift("qshift_a");
        let x = random_matrix(5, 2, 3);
        assert!(matches!(
            colifilt(x.view(), &q.g0b, &q.g0a),
            Err(DtcwtError::RowCount { rows: 5, multiple: 2 })
        ));
        let x = random_matrix(6, 2, 3);
        assert!(matches!(
            colifilt(x.view(), &q.g0b[..9], &q.g0a[..9]),
            Err(DtcwtError::OddFilterLength(9))
        ));
    }

    #[test]
    fn decimate_then_interpolate_recovers_shape() {
        let q = qshift("qshift_b");
        let x = random_matrix(12, 5, 4);
        let lo = coldfilt(x.view(), &q.h0b, &q.h0a).unwrap();
        assert_eq!(lo.dim(), (6, 5));
        assert_eq!(colifilt(lo.view(), &q.g0b, &q.g0a).unwrap().dim(), (12, 5));
    }

    #[test]
    fn qshift_tree_reconstructs_columns() {
        for (name, q) in [
            ("qshift_a", qshift("qshift_a")),
            ("qshift_b", qshift("qshift_b")),
            ("db4", db4_qshift()),
        ] {
            for rows in [4, 8, 12, 20, 36] {
                let x = random_matrix(rows, 3, rows as u64);
                let lo = coldfilt(x.view(), &q.h0b, &q.h0a).unwrap();
                let hi = coldfilt(x.view(), &q.h1b, &q.h1a).unwrap();
                let y = colifilt(lo.view(), &q.g0b, &q.g0a).unwrap()
                    + colifilt(hi.view(), &q.g1b, &q.g1a).unwrap();
                println!("{} rows={}", name, rows);
                assert_close(&y, &x, 1e-9);
            }
        }
    }

    #[test]
    fn zero_fast_path_matches_general_path() {
        for q in [qshift("qshift_a"), db4_qshift()] {
            let x = Array2::<f64>::zeros((10, 3));
            let fast = colifilt(x.view(), &q.g0b, &q.g0a).unwrap();
            let general = interpolate(x.view(), &q.g0b, &q.g0a).unwrap();
            assert_eq!(fast.dim(), (20, 3));
            assert_eq!(fast, general);
        }
    }

    #[test]
    fn interleave_order_follows_filter_sign() {
        let q = qshift("qshift_a");
        assert!(Polyphase::new(&q.h0b, &q.h0a).positive);
        assert!(!Polyphase::new(&q.h1b, &q.h1a).positive);
    }
}
