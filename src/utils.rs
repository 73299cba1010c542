use crate::{error::DtcwtError, Sample};

/// Reflects the values in `x` about the scalars `minx` and `maxx`. A long linearly increasing
/// series is turned into a ramp that goes up and down between the two bounds. If `x` holds
/// integers and the bounds are (integer + 0.5), the ramps repeat their end samples. An empty
/// range (`maxx <= minx`) maps every value to `minx`.
pub fn reflect(x: &[f64], minx: f64, maxx: f64) -> Vec<f64> {
    if maxx <= minx {
        return vec![minx; x.len()];
    }
    x.iter()
        .map(|&v| {
            let mut y = v;
            loop {
                if y > maxx {
                    y = 2. * maxx - y;
                } else if y < minx {
                    y = 2. * minx - y;
                } else {
                    break y;
                }
            }
        })
        .collect()
}

/// Returns row indices `lo..hi` folded into `0..len` by symmetric extension with repeated end
/// samples. Works for extensions longer than `len`.
pub fn symm_ext_idx(lo: isize, hi: isize, len: usize) -> Vec<usize> {
    let virtual_idx: Vec<f64> = (lo..hi).map(|i| i as f64).collect();
    reflect(&virtual_idx, -0.5, len as f64 - 0.5)
        .into_iter()
        .map(|i| i as usize)
        .collect()
}

/// Performs a direct convolution of the input with the kernel. The length of the result is:
/// input.len() + kernel.len() - 1
pub fn conv_direct<T: Sample>(input: &[T], kernel: &[T], result: &mut [T]) {
    result.iter_mut().for_each(|x| *x = T::zero());

    let input_len = input.len();
    let kernel_len = kernel.len();
    let result_len = conv_len(input_len, kernel_len);

    for i in 0..result_len {
        for j in 0..kernel_len {
            if i >= j && i - j < input_len {
                result[i] = result[i] + input[i - j] * kernel[j];
            }
        }
    }
}

/// Returns the lower and upper (non-inclusive) index of the central portion of the convolution
pub fn conv_center(sig_len: usize, center_len: usize) -> (usize, usize) {
    let f = (sig_len - center_len) / 2;
    (f, f + center_len)
}

/// Retuns the length of the resulting convolution given the signal length and the filter length
pub fn conv_len(sig_len: usize, filt_len: usize) -> usize {
    sig_len + filt_len - 1
}

/// Returns the length of the part of the convolution unaffected by zero padding
pub fn conv_valid_len(sig_len: usize, filt_len: usize) -> usize {
    sig_len.abs_diff(filt_len) + 1
}

/// Halves a dimension that must be even
pub fn halve(len: usize) -> Result<usize, DtcwtError> {
    if len % 2 != 0 {
        return Err(DtcwtError::OddDimension(len));
    }
    Ok(len / 2)
}

pub fn from_f64<T: Sample>(v: f64) -> Result<T, DtcwtError> {
    T::from_f64(v).ok_or(DtcwtError::Unrepresentable(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn reflect_keeps_values_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let len = rng.gen_range(1..12) as f64;
            let x: Vec<f64> = (0..50).map(|_| rng.gen_range(-100..100) as f64).collect();
            let y = reflect(&x, -0.5, len - 0.5);
            assert!(y.iter().all(|&v| v >= -0.5 && v <= len - 0.5));
        }
    }

    #[test]
    fn reflect_is_identity_in_range() {
        let x = [0., 1., 2., 3., 4.];
        assert_eq!(reflect(&x, -0.5, 4.5), x.to_vec());
    }

    #[test]
    fn reflect_collapses_empty_range() {
        assert_eq!(reflect(&[3., -2., 0.5], 1., 1.), vec![1., 1., 1.]);
        assert_eq!(reflect(&[4.], -0.5, -0.5), vec![-0.5]);
    }

    #[test]
    fn symm_ext_repeats_end_samples() {
        assert_eq!(symm_ext_idx(-2, 6, 4), vec![1, 0, 0, 1, 2, 3, 3, 2]);
        // extension longer than the signal ramps back and forth
        assert_eq!(symm_ext_idx(-3, 5, 2), vec![1, 1, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn direct_convolution() {
        let mut r = [0.; 4];
        conv_direct(&[1., 2., 3.], &[1., -1.], &mut r);
        assert_eq!(r, [1., 1., 1., -3.]);
    }

    #[test]
    fn halve_rejects_odd() {
        assert_eq!(halve(6).unwrap(), 3);
        assert!(matches!(halve(5), Err(DtcwtError::OddDimension(5))));
    }
}
