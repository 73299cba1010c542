//! Column convolution engine.
//!
//! Every column of a matrix is convolved with the same 1-D kernel and only the "valid" part of
//! the result is kept, i.e. the samples unaffected by zero padding. Short convolutions are done
//! directly, longer ones through a power-of-two real FFT.

use crate::{
    error::{DtcwtError, Result},
    utils::{conv_center, conv_direct, conv_len, conv_valid_len, from_f64},
    Sample,
};
use log::trace;
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use rayon::prelude::*;
use realfft::RealFftPlanner;

/// Full convolution lengths below this are computed directly
pub const DIRECT_CONV_CUTOFF: usize = 32;

/// Convolves the columns of `x` with `h`, returning only the valid section of
/// `|x.nrows() - h.len()| + 1` rows.
pub fn column_convolve<T: Sample>(x: ArrayView2<T>, h: &[T]) -> Result<Array2<T>> {
    if h.is_empty() {
        return Err(DtcwtError::EmptyFilter);
    }
    if x.nrows() == 0 {
        return Err(DtcwtError::EmptyInput(x.dim()));
    }
    let full_len = conv_len(x.nrows(), h.len());
    if full_len < DIRECT_CONV_CUTOFF {
        trace!("direct convolution, full length {}", full_len);
        Ok(column_convolve_direct(x, h))
    } else {
        trace!("fft convolution, full length {}", full_len);
        column_convolve_fft(x, h)
    }
}

pub(crate) fn column_convolve_direct<T: Sample>(x: ArrayView2<T>, h: &[T]) -> Array2<T> {
    let full_len = conv_len(x.nrows(), h.len());
    let valid_len = conv_valid_len(x.nrows(), h.len());
    let (lidx, uidx) = conv_center(full_len, valid_len);

    let mut result = Array2::<T>::zeros((valid_len, x.ncols()));
    Zip::from(result.columns_mut())
        .and(x.columns())
        .par_for_each(|mut out, column| {
            let mut full = vec![T::zero(); full_len];
            conv_direct(&column.to_vec(), h, &mut full);
            out.assign(&ArrayView1::from(&full[lidx..uidx]));
        });
    result
}

pub(crate) fn column_convolve_fft<T: Sample>(x: ArrayView2<T>, h: &[T]) -> Result<Array2<T>> {
    let full_len = conv_len(x.nrows(), h.len());
    let valid_len = conv_valid_len(x.nrows(), h.len());
    let (lidx, uidx) = conv_center(full_len, valid_len);

    // always use a 2^n sized transform
    let fft_len = full_len.next_power_of_two();
    let mut planner = RealFftPlanner::<T>::new();
    let r2c = planner.plan_fft_forward(fft_len);
    let c2r = planner.plan_fft_inverse(fft_len);
    let scale = T::one() / from_f64::<T>(fft_len as f64)?;

    let mut kernel = r2c.make_input_vec();
    kernel[0..h.len()].copy_from_slice(h);
    let mut kernel_fft = r2c.make_output_vec();
    r2c.process(&mut kernel, &mut kernel_fft)?;

    let columns = (0..x.ncols())
        .into_par_iter()
        .map(|c| -> Result<Vec<T>> {
            let mut signal = r2c.make_input_vec();
            signal
                .iter_mut()
                .zip(x.column(c).iter())
                .for_each(|(s, v)| *s = *v);
            let mut spectrum = r2c.make_output_vec();
            r2c.process(&mut signal, &mut spectrum)?;

            spectrum
                .iter_mut()
                .zip(kernel_fft.iter())
                .for_each(|(s, k)| *s = *s * *k);
            // dc and nyquist bins of a real signal carry no imaginary part
            spectrum[0].im = T::zero();
            if let Some(nyquist) = spectrum.last_mut() {
                nyquist.im = T::zero();
            }

            let mut conv = c2r.make_output_vec();
            c2r.process(&mut spectrum, &mut conv)?;
            Ok(conv[lidx..uidx].iter().map(|v| *v * scale).collect())
        })
        .collect::<Result<Vec<_>>>()?;

    let mut result = Array2::<T>::zeros((valid_len, x.ncols()));
    result
        .columns_mut()
        .into_iter()
        .zip(columns.iter())
        .for_each(|(mut out, column)| out.assign(&ArrayView1::from(&column[..])));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn valid_section_is_centred() {
        let x = array![[1.], [2.], [3.], [4.]];
        let y = column_convolve(x.view(), &[1., 1.]).unwrap();
        assert_eq!(y, array![[3.], [5.], [7.]]);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            column_convolve(x.view(), &[1.0]),
            Err(DtcwtError::EmptyInput((0, 3)))
        ));
        let x = Array2::<f64>::ones((4, 3));
        assert!(matches!(
            column_convolve(x.view(), &[]),
            Err(DtcwtError::EmptyFilter)
        ));
    }

    #[test]
    fn direct_and_fft_paths_agree_across_cutoff() {
        let h: Vec<f64> = vec![-0.05, 0.25, 0.6, 0.25, -0.05, 0.1, -0.3];
        // full lengths 30, 31, 32, 33 straddle the dispatch cutoff
        for rows in 24..28 {
            let x = random_matrix(rows, 5, rows as u64);
            let direct = column_convolve_direct(x.view(), &h);
            let fft = column_convolve_fft(x.view(), &h).unwrap();
            assert_eq!(direct.dim(), (rows - h.len() + 1, 5));
            assert_eq!(direct.dim(), fft.dim());
            direct.iter().zip(fft.iter()).for_each(|(a, b)| {
                assert!((a - b).abs() <= 1e-6 * a.abs().max(1.), "{} != {}", a, b);
            });
        }
    }

    #[test]
    fn fft_path_in_single_precision() {
        let x = random_matrix(40, 3, 9).mapv(|v| v as f32);
        let h = [0.5f32, -0.25, 0.125, 1.0];
        let direct = column_convolve_direct(x.view(), &h);
        let fft = column_convolve(x.view(), &h).unwrap();
        direct
            .iter()
            .zip(fft.iter())
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-4));
    }

    #[test]
    fn transposed_views_are_convolved_by_column() {
        let x = random_matrix(6, 20, 4);
        let h = [1.0, 2.0, 1.0];
        let y = column_convolve(x.t(), &h).unwrap();
        let expected = column_convolve(x.t().to_owned().view(), &h).unwrap();
        assert_eq!(y.dim(), (18, 6));
        assert_eq!(y, expected);
    }
}
