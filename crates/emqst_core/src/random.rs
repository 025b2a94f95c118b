//! Seeded randomness for EMQST
//!
//! Gantree: L0_Foundation → Random
//!
//! Every randomized trial owns a `ChaCha8Rng` derived from the run seed, a
//! stream constant naming the stage, and the trial index. Trials therefore
//! draw the same numbers no matter how the worker pool schedules them.

use crate::density::DensityMatrix;
use crate::error::EmqstResult;
use crate::linalg::Operator;
use nalgebra::DVector;
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Binomial, Distribution, StandardNormal};

// ============================================================================
// Streams
// Gantree: streams // 단계별 난수 스트림
// ============================================================================

/// Calibration outcome sampling
pub const CALIBRATION_STREAM: u64 = 1;

/// QST outcome sampling
pub const QST_DATA_STREAM: u64 = 2;

/// Estimator internals (BME particles)
pub const ESTIMATOR_STREAM: u64 = 3;

/// True-state ensemble generation
pub const ENSEMBLE_STREAM: u64 = 4;

/// SplitMix64 finalizer
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generator for one trial
/// Gantree: trial_rng(seed,stream,index) -> ChaCha8Rng // 재현 가능한 시행
pub fn trial_rng(seed: u64, stream: u64, index: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(splitmix64(seed ^ splitmix64(index)));
    rng.set_stream(stream);
    rng
}

/// Fold words into one stream index
pub fn stream_key<I: IntoIterator<Item = u64>>(words: I) -> u64 {
    words
        .into_iter()
        .fold(0u64, |acc, w| splitmix64(acc.rotate_left(17) ^ w))
}

/// Fresh seed from OS entropy
pub fn entropy_seed() -> u64 {
    rand::thread_rng().gen()
}

// ============================================================================
// Random States
// ============================================================================

/// Standard complex Gaussian (real and imaginary parts N(0, 1/2))
pub fn complex_normal<R: Rng + ?Sized>(rng: &mut R) -> Complex64 {
    let re: f64 = rng.sample(StandardNormal);
    let im: f64 = rng.sample(StandardNormal);
    Complex64::new(re, im) * std::f64::consts::FRAC_1_SQRT_2
}

/// Complex Ginibre matrix of shape `rows x cols`
pub fn ginibre<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Operator {
    Operator::from_fn(rows, cols, |_, _| complex_normal(rng))
}

/// Haar-random pure state
/// Gantree: haar_random_pure(dim,rng) -> DensityMatrix // Haar 측도
pub fn haar_random_pure<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> EmqstResult<DensityMatrix> {
    let psi = DVector::from_fn(dim, |_, _| complex_normal(rng));
    DensityMatrix::from_pure(&psi)
}

/// Mixed state from the Hilbert-Schmidt measure (full-rank Ginibre)
pub fn hilbert_schmidt_random<R: Rng + ?Sized>(
    dim: usize,
    rng: &mut R,
) -> EmqstResult<DensityMatrix> {
    let a = ginibre(dim, dim, rng);
    DensityMatrix::from_unnormalized(&(&a * a.adjoint()))
}

// ============================================================================
// Sampling
// ============================================================================

/// Multinomial counts for `shots` draws from `probs` (renormalized)
/// Gantree: multinomial(probs,shots,rng) -> Vec<u64> // 다항 샘플링
pub fn multinomial<R: Rng + ?Sized>(probs: &[f64], shots: u64, rng: &mut R) -> Vec<u64> {
    let total: f64 = probs.iter().map(|p| p.max(0.0)).sum();
    let mut counts = vec![0u64; probs.len()];
    if total <= 0.0 || probs.is_empty() {
        return counts;
    }

    let mut remaining = shots;
    let mut mass = 1.0;
    let last = probs.len() - 1;
    for (k, p) in probs.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if k == last {
            counts[k] = remaining;
            break;
        }
        let q = (p.max(0.0) / total / mass).clamp(0.0, 1.0);
        let draw = match Binomial::new(remaining, q) {
            Ok(binomial) => binomial.sample(rng),
            Err(_) => 0,
        };
        counts[k] = draw;
        remaining -= draw;
        mass -= p.max(0.0) / total;
        if mass <= 0.0 {
            break;
        }
    }
    counts
}

/// Single categorical draw (index into `probs`, renormalized)
pub fn categorical<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let total: f64 = probs.iter().map(|p| p.max(0.0)).sum();
    let mut u = rng.gen::<f64>() * total;
    for (k, p) in probs.iter().enumerate() {
        u -= p.max(0.0);
        if u < 0.0 {
            return k;
        }
    }
    probs.len().saturating_sub(1)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_trial_rng_reproducible() {
        let mut a = trial_rng(42, QST_DATA_STREAM, 7);
        let mut b = trial_rng(42, QST_DATA_STREAM, 7);
        let xa: u64 = a.gen();
        let xb: u64 = b.gen();
        assert_eq!(xa, xb);
    }

    #[test]
    fn test_trial_rng_independent_streams() {
        let mut a = trial_rng(42, QST_DATA_STREAM, 7);
        let mut b = trial_rng(42, ESTIMATOR_STREAM, 7);
        let mut c = trial_rng(42, QST_DATA_STREAM, 8);
        let xa: u64 = a.gen();
        assert_ne!(xa, b.gen::<u64>());
        assert_ne!(xa, c.gen::<u64>());
    }

    #[test]
    fn test_multinomial_conserves_shots() {
        let mut rng = trial_rng(5, QST_DATA_STREAM, 0);
        let counts = multinomial(&[0.2, 0.5, 0.3], 10_000, &mut rng);
        assert_eq!(counts.iter().sum::<u64>(), 10_000);
        assert!((counts[1] as f64 / 10_000.0 - 0.5).abs() < 0.03);
    }

    #[test]
    fn test_multinomial_degenerate() {
        let mut rng = trial_rng(5, QST_DATA_STREAM, 1);
        assert_eq!(multinomial(&[1.0, 0.0], 50, &mut rng), vec![50, 0]);
        assert_eq!(multinomial(&[0.0, 1.0], 50, &mut rng), vec![0, 50]);
    }

    #[test]
    fn test_categorical_frequencies() {
        let mut rng = trial_rng(9, QST_DATA_STREAM, 0);
        let hits = (0..4000)
            .filter(|_| categorical(&[0.25, 0.75], &mut rng) == 1)
            .count();
        assert!((hits as f64 / 4000.0 - 0.75).abs() < 0.03);
    }

    #[test]
    fn test_haar_state_is_pure() {
        let mut rng = trial_rng(1, ENSEMBLE_STREAM, 0);
        let rho = haar_random_pure(4, &mut rng).unwrap();
        assert_abs_diff_eq!(rho.purity(), 1.0, epsilon = 1e-10);
        assert!(rho.is_valid(1e-9));
    }

    #[test]
    fn test_hilbert_schmidt_state_is_mixed() {
        let mut rng = trial_rng(3, ENSEMBLE_STREAM, 0);
        let rho = hilbert_schmidt_random(2, &mut rng).unwrap();
        assert!(rho.is_valid(1e-9));
        assert!(rho.purity() < 1.0);
    }
}
