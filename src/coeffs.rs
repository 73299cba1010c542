//! Filter coefficient sets and the provider that resolves them by name.
//!
//! Level 1 of the transform uses a "biort" set of odd/biorthogonal filters, levels >= 2 use a
//! "qshift" set of even-length quarter-sample-shift filters. Named sets are looked up through a
//! [`CoeffSource`] and memoized by a [`CoeffCache`] that the caller owns and passes around.

use crate::{
    error::{DtcwtError, FilterFamily, Result},
    utils::from_f64,
    Sample,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

/// Biort set used when none is named
pub const DEFAULT_BIORT: &str = "near_sym_a";
/// Qshift set used when none is named
pub const DEFAULT_QSHIFT: &str = "qshift_a";

/// Level 1 filters: analysis lowpass/highpass `h0o`/`h1o` and synthesis lowpass/highpass
/// `g0o`/`g1o`. Lengths may be odd or even.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biort<T> {
    pub h0o: Vec<T>,
    pub g0o: Vec<T>,
    pub h1o: Vec<T>,
    pub g1o: Vec<T>,
}

/// Level >= 2 filters for the two trees (`a` and `b`). All eight vectors have the same even
/// length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qshift<T> {
    pub h0a: Vec<T>,
    pub h0b: Vec<T>,
    pub g0a: Vec<T>,
    pub g0b: Vec<T>,
    pub h1a: Vec<T>,
    pub h1b: Vec<T>,
    pub g1a: Vec<T>,
    pub g1b: Vec<T>,
}

/// Multiplies every other sample by -1, starting with the sign `first`
fn modulate<T: Sample>(h: &[T], first: T) -> Vec<T> {
    h.iter()
        .enumerate()
        .map(|(n, &v)| if n % 2 == 0 { v * first } else { -v * first })
        .collect()
}

fn reversed<T: Copy>(h: &[T]) -> Vec<T> {
    h.iter().rev().copied().collect()
}

fn cast_vec<T: Sample>(h: &[f64]) -> Result<Vec<T>> {
    h.iter().map(|&v| from_f64(v)).collect()
}

impl<T: Sample> Biort<T> {
    /// Completes a set from its two lowpass filters; the highpass filters are their modulated
    /// counterparts.
    pub fn from_lowpass(h0o: &[T], g0o: &[T]) -> Self {
        Self {
            h0o: h0o.to_vec(),
            g0o: g0o.to_vec(),
            h1o: modulate(g0o, -T::one()),
            g1o: modulate(h0o, T::one()),
        }
    }
}

impl<T: Sample> Qshift<T> {
    /// Builds the eight filters of an orthonormal q-shift set from the tree `b` lowpass filter,
    /// which should have a quarter sample advance from its mid point.
    pub fn from_h0b(h0b: &[T]) -> Self {
        let h0a = reversed(h0b);
        let h1a = modulate(h0b, -T::one());
        let h1b = reversed(&h1a);
        Self {
            g0a: h0b.to_vec(),
            g0b: h0a.clone(),
            g1a: h1b.clone(),
            g1b: h1a.clone(),
            h0a,
            h0b: h0b.to_vec(),
            h1a,
            h1b,
        }
    }
}

impl Biort<f64> {
    pub fn cast<T: Sample>(&self) -> Result<Biort<T>> {
        Ok(Biort {
            h0o: cast_vec(&self.h0o)?,
            g0o: cast_vec(&self.g0o)?,
            h1o: cast_vec(&self.h1o)?,
            g1o: cast_vec(&self.g1o)?,
        })
    }
}

impl Qshift<f64> {
    pub fn cast<T: Sample>(&self) -> Result<Qshift<T>> {
        Ok(Qshift {
            h0a: cast_vec(&self.h0a)?,
            h0b: cast_vec(&self.h0b)?,
            g0a: cast_vec(&self.g0a)?,
            g0b: cast_vec(&self.g0b)?,
            h1a: cast_vec(&self.h1a)?,
            h1b: cast_vec(&self.h1b)?,
            g1a: cast_vec(&self.g1a)?,
            g1b: cast_vec(&self.g1b)?,
        })
    }
}

/// A named coefficient set as stored by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterSet {
    Biort(Biort<f64>),
    Qshift(Qshift<f64>),
}

impl FilterSet {
    pub fn family(&self) -> FilterFamily {
        match self {
            FilterSet::Biort(_) => FilterFamily::Biort,
            FilterSet::Qshift(_) => FilterFamily::Qshift,
        }
    }
}

/// Something that can produce coefficient sets by name
pub trait CoeffSource: Send + Sync {
    /// Returns the set stored under `name`, or [`DtcwtError::UnknownName`]
    fn load(&self, name: &str) -> Result<FilterSet>;
}

/// Filter families carried by the crate.
///
/// | name         | family | taps   |
/// |--------------|--------|--------|
/// | `antonini`   | biort  | 9, 7   |
/// | `legall`     | biort  | 5, 3   |
/// | `near_sym_a` | biort  | 5, 7   |
/// | `near_sym_b` | biort  | 13, 19 |
/// | `qshift_a`   | qshift | 10, 10 |
/// | `qshift_b`   | qshift | 14, 14 |
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCoeffs;

impl BuiltinCoeffs {
    pub const NAMES: [&'static str; 6] = [
        "antonini",
        "legall",
        "near_sym_a",
        "near_sym_b",
        "qshift_a",
        "qshift_b",
    ];
}

impl CoeffSource for BuiltinCoeffs {
    fn load(&self, name: &str) -> Result<FilterSet> {
        let set = match name {
            "antonini" => FilterSet::Biort(Biort::from_lowpass(
                &[
                    0.026748757410810,
                    -0.016864118442875,
                    -0.078223266528990,
                    0.266864118442875,
                    0.602949018236360,
                    0.266864118442875,
                    -0.078223266528990,
                    -0.016864118442875,
                    0.026748757410810,
                ],
                &[
                    -0.045635881557125,
                    -0.028771763114250,
                    0.295635881557125,
                    0.557543526228500,
                    0.295635881557125,
                    -0.028771763114250,
                    -0.045635881557125,
                ],
            )),
            "legall" => FilterSet::Biort(Biort::from_lowpass(
                &[-0.125, 0.25, 0.75, 0.25, -0.125],
                &[0.25, 0.5, 0.25],
            )),
            "near_sym_a" => FilterSet::Biort(Biort::from_lowpass(
                &[-0.05, 0.25, 0.6, 0.25, -0.05],
                &[
                    -3. / 280.,
                    -15. / 280.,
                    73. / 280.,
                    170. / 280.,
                    73. / 280.,
                    -15. / 280.,
                    -3. / 280.,
                ],
            )),
            "near_sym_b" => FilterSet::Biort(Biort::from_lowpass(
                &[
                    -9. / 5120.,
                    0.,
                    114. / 5120.,
                    -240. / 5120.,
                    -247. / 5120.,
                    1520. / 5120.,
                    2844. / 5120.,
                    1520. / 5120.,
                    -247. / 5120.,
                    -240. / 5120.,
                    114. / 5120.,
                    0.,
                    -9. / 5120.,
                ],
                &[
                    81. / 1146880.,
                    0.,
                    -1539. / 1146880.,
                    -2160. / 1146880.,
                    8208. / 1146880.,
                    27360. / 1146880.,
                    -63816. / 1146880.,
                    -59280. / 1146880.,
                    343786. / 1146880.,
                    641600. / 1146880.,
                    343786. / 1146880.,
                    -59280. / 1146880.,
                    -63816. / 1146880.,
                    27360. / 1146880.,
                    8208. / 1146880.,
                    -2160. / 1146880.,
                    -1539. / 1146880.,
                    0.,
                    81. / 1146880.,
                ],
            )),
            "qshift_a" => FilterSet::Qshift(Qshift::from_h0b(&[
                0.0511304052838317,
                -0.0139753702468888,
                -0.109836051665971,
                0.263839561058938,
                0.766628467793037,
                0.563655710127052,
                0.000873622695217097,
                -0.100231219507476,
                -0.00168968127252815,
                -0.00618188189211644,
            ])),
            "qshift_b" => FilterSet::Qshift(Qshift::from_h0b(&[
                0.00325314276365318,
                -0.00388321199915849,
                0.0346603468448535,
                -0.0388728012688278,
                -0.117203887699115,
                0.275295384668882,
                0.756145643892522,
                0.568810420712123,
                0.0118660920337970,
                -0.106711804686665,
                0.0238253847949203,
                0.0170252238815540,
                -0.00543947593727412,
                -0.00455689562847549,
            ])),
            _ => return Err(DtcwtError::UnknownName(name.to_string())),
        };
        Ok(set)
    }
}

/// Memoizes the sets of a [`CoeffSource`] by name. Each name is loaded at most once per cache;
/// failed lookups are not remembered.
pub struct CoeffCache<S = BuiltinCoeffs> {
    source: S,
    loaded: Mutex<HashMap<String, Arc<FilterSet>>>,
}

impl CoeffCache<BuiltinCoeffs> {
    pub fn new() -> Self {
        Self::with_source(BuiltinCoeffs)
    }
}

impl Default for CoeffCache<BuiltinCoeffs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CoeffSource> CoeffCache<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the set stored under `name`, loading it on first use
    pub fn get(&self, name: &str) -> Result<Arc<FilterSet>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = loaded.get(name) {
            return Ok(Arc::clone(set));
        }
        debug!("loading filter coefficients '{}'", name);
        let set = Arc::new(self.source.load(name)?);
        loaded.insert(name.to_string(), Arc::clone(&set));
        Ok(set)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Loads a level 1 set. Fails if `name` is unknown or names a qshift set.
    pub fn biort(&self, name: &str) -> Result<Biort<f64>> {
        match &*self.get(name)? {
            FilterSet::Biort(b) => Ok(b.clone()),
            other => Err(DtcwtError::WrongFamily {
                name: name.to_string(),
                requested: FilterFamily::Biort,
                found: other.family(),
            }),
        }
    }

    /// Loads a level >= 2 set. Fails if `name` is unknown or names a biort set.
    pub fn qshift(&self, name: &str) -> Result<Qshift<f64>> {
        match &*self.get(name)? {
            FilterSet::Qshift(q) => Ok(q.clone()),
            other => Err(DtcwtError::WrongFamily {
                name: name.to_string(),
                requested: FilterFamily::Qshift,
                found: other.family(),
            }),
        }
    }
}

/// Either the name of a set known to a [`CoeffCache`] or the coefficients themselves
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec<C> {
    Named(String),
    Explicit(C),
}

impl<C> From<&str> for FilterSpec<C> {
    fn from(name: &str) -> Self {
        FilterSpec::Named(name.to_string())
    }
}

impl<C> From<String> for FilterSpec<C> {
    fn from(name: String) -> Self {
        FilterSpec::Named(name)
    }
}

impl<T> From<Biort<T>> for FilterSpec<Biort<T>> {
    fn from(coeffs: Biort<T>) -> Self {
        FilterSpec::Explicit(coeffs)
    }
}

impl<T> From<Qshift<T>> for FilterSpec<Qshift<T>> {
    fn from(coeffs: Qshift<T>) -> Self {
        FilterSpec::Explicit(coeffs)
    }
}

impl<T: Sample> FilterSpec<Biort<T>> {
    pub fn resolve<S: CoeffSource>(self, cache: &CoeffCache<S>) -> Result<Biort<T>> {
        match self {
            FilterSpec::Named(name) => cache.biort(&name)?.cast(),
            FilterSpec::Explicit(coeffs) => Ok(coeffs),
        }
    }
}

impl<T: Sample> FilterSpec<Qshift<T>> {
    pub fn resolve<S: CoeffSource>(self, cache: &CoeffCache<S>) -> Result<Qshift<T>> {
        match self {
            FilterSpec::Named(name) => cache.qshift(&name)?.cast(),
            FilterSpec::Explicit(coeffs) => Ok(coeffs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        loads: AtomicUsize,
    }

    impl CoeffSource for Counting {
        fn load(&self, name: &str) -> Result<FilterSet> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            BuiltinCoeffs.load(name)
        }
    }

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn sets_load_once_per_name() {
        let cache = CoeffCache::with_source(Counting {
            loads: AtomicUsize::new(0),
        });
        assert!(!cache.is_cached("qshift_b"));
        cache.qshift("qshift_b").unwrap();
        cache.qshift("qshift_b").unwrap();
        cache.biort("near_sym_a").unwrap();
        assert!(cache.is_cached("qshift_b"));
        assert_eq!(cache.source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let cache = CoeffCache::new();
        assert!(matches!(
            cache.biort("near_sym_z"),
            Err(DtcwtError::UnknownName(name)) if name == "near_sym_z"
        ));
        assert!(!cache.is_cached("near_sym_z"));
    }

    #[test]
    fn wrong_family_is_rejected() {
        let cache = CoeffCache::new();
        assert!(matches!(
            cache.biort("qshift_a"),
            Err(DtcwtError::WrongFamily {
                requested: FilterFamily::Biort,
                found: FilterFamily::Qshift,
                ..
            })
        ));
        assert!(matches!(
            cache.qshift("legall"),
            Err(DtcwtError::WrongFamily {
                requested: FilterFamily::Qshift,
                found: FilterFamily::Biort,
                ..
            })
        ));
    }

    #[test]
    fn builtin_sets_have_expected_lengths() {
        let cache = CoeffCache::new();
        for (name, lo, hi) in [
            ("antonini", 9, 7),
            ("legall", 5, 3),
            ("near_sym_a", 5, 7),
            ("near_sym_b", 13, 19),
        ] {
            let b = cache.biort(name).unwrap();
            assert_eq!((b.h0o.len(), b.h1o.len()), (lo, hi), "{}", name);
            assert_eq!((b.g0o.len(), b.g1o.len()), (hi, lo), "{}", name);
        }
        for (name, len) in [("qshift_a", 10), ("qshift_b", 14)] {
            let q = cache.qshift(name).unwrap();
            for h in [&q.h0a, &q.h0b, &q.g0a, &q.g0b, &q.h1a, &q.h1b, &q.g1a, &q.g1b] {
                assert_eq!(h.len(), len, "{}", name);
            }
        }
    }

    #[test]
    fn qshift_lowpass_is_orthonormal() {
        let cache = CoeffCache::new();
        for name in ["qshift_a", "qshift_b"] {
            let h = cache.qshift(name).unwrap().h0a;
            assert!((h.iter().sum::<f64>() - 2f64.sqrt()).abs() < 1e-12);
            assert!((dot(&h, &h) - 1.).abs() < 1e-12);
            for shift in (2..h.len()).step_by(2) {
                assert!(dot(&h[shift..], &h[..h.len() - shift]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn near_sym_a_matches_published_values() {
        let b = CoeffCache::new().biort("near_sym_a").unwrap();
        let g1o = [-0.05, -0.25, 0.6, -0.25, -0.05];
        b.g1o
            .iter()
            .zip(g1o.iter())
            .for_each(|(a, e)| assert!((a - e).abs() < 1e-15));
        assert!((b.h1o[0] - 0.010714285714286).abs() < 1e-12);
        assert!((b.h1o[3] - 0.607142857142857).abs() < 1e-12);
        assert!(b.h1o.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn biort_sets_are_biorthogonal() {
        let cache = CoeffCache::new();
        for name in ["antonini", "legall", "near_sym_a", "near_sym_b"] {
            let b = cache.biort(name).unwrap();
            assert!((b.h0o.iter().sum::<f64>() - 1.).abs() < 1e-12, "{}", name);
            assert!((b.g0o.iter().sum::<f64>() - 1.).abs() < 1e-12, "{}", name);
            // h0o * g0o vanishes at every even offset from its centre except 0
            let mut p = vec![0.; b.h0o.len() + b.g0o.len() - 1];
            for (i, h) in b.h0o.iter().enumerate() {
                for (j, g) in b.g0o.iter().enumerate() {
                    p[i + j] += h * g;
                }
            }
            let c = p.len() / 2;
            assert!((p[c] - 0.5).abs() < 1e-12, "{}", name);
            for k in (2..=c).step_by(2) {
                assert!(p[c - k].abs() < 1e-12, "{} offset {}", name, k);
            }
        }
    }

    #[test]
    fn near_sym_b_matches_published_values() {
        let b = CoeffCache::new().biort("near_sym_b").unwrap();
        assert!((b.h1o[0] + 7.0626e-05).abs() < 1e-9);
        assert!((b.h1o[8] + 0.29976).abs() < 1e-5);
        assert!((b.h1o[9] - 0.55943).abs() < 1e-5);
        assert!((b.g1o[6] - 0.55546875).abs() < 1e-15);
    }

    #[test]
    fn specs_resolve_names_and_explicit_sets() {
        let cache = CoeffCache::new();
        let named: FilterSpec<Biort<f32>> = "legall".into();
        let b = named.resolve(&cache).unwrap();
        assert_eq!(b.h0o, vec![-0.125f32, 0.25, 0.75, 0.25, -0.125]);

        let explicit = Biort::from_lowpass(&[1.0], &[1.0]);
        let spec: FilterSpec<Biort<f64>> = explicit.clone().into();
        assert_eq!(spec.resolve(&cache).unwrap(), explicit);
    }

    #[test]
    fn explicit_sets_deserialize() {
        let json = r#"{"h0o":[0.5,0.5],"g0o":[0.5,0.5],"h1o":[-0.5,0.5],"g1o":[0.5,-0.5]}"#;
        let b: Biort<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(b.h1o, vec![-0.5, 0.5]);
    }
}
