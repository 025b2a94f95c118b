//! True-state generators for benchmarking
//!
//! Gantree: L5_Benchmark → Generators
//!
//! Seeded ensembles of target states. Each state draws from its own
//! generator keyed by its index, so growing an ensemble keeps the states
//! it already had.

use emqst_core::ensemble::{BlochAngles, TrueStateEnsemble};
use emqst_core::error::EmqstResult;
use emqst_core::random::{self, ENSEMBLE_STREAM};
use emqst_core::DensityMatrix;
use std::f64::consts::{FRAC_PI_2, PI};

/// True-state generator for benchmarks
/// Gantree: EnsembleGenerator // 참 상태 생성기
#[derive(Debug, Clone, Copy)]
pub struct EnsembleGenerator {
    /// Random seed
    seed: Option<u64>,
}

impl EnsembleGenerator {
    /// Create new generator (entropy-seeded draws)
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Create generator with seed
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    // ========================================================================
    // Random Ensembles
    // ========================================================================

    /// Haar-random pure states
    pub fn haar(&self, num_qubits: usize, count: usize) -> EmqstResult<TrueStateEnsemble> {
        TrueStateEnsemble::haar_random(num_qubits, count, self.seed())
    }

    /// Random product pure states with recorded Bloch angles
    pub fn product(&self, num_qubits: usize, count: usize) -> EmqstResult<TrueStateEnsemble> {
        TrueStateEnsemble::random_product(num_qubits, count, self.seed())
    }

    /// Mixed states from the Hilbert-Schmidt measure
    pub fn mixed(&self, num_qubits: usize, count: usize) -> EmqstResult<TrueStateEnsemble> {
        let seed = self.seed();
        let dim = 1usize << num_qubits;
        let states = (0..count)
            .map(|i| {
                let mut rng = random::trial_rng(seed, ENSEMBLE_STREAM, i as u64);
                random::hilbert_schmidt_random(dim, &mut rng)
            })
            .collect::<EmqstResult<Vec<_>>>()?;
        Ok(TrueStateEnsemble::new(states))
    }

    // ========================================================================
    // Fixed Ensembles
    // ========================================================================

    /// Products of the six Pauli eigenstates (`6^n` states)
    pub fn pauli_eigenstates(&self, num_qubits: usize) -> EmqstResult<TrueStateEnsemble> {
        let axes = [
            BlochAngles::new(0.0, 0.0),
            BlochAngles::new(PI, 0.0),
            BlochAngles::new(FRAC_PI_2, 0.0),
            BlochAngles::new(FRAC_PI_2, PI),
            BlochAngles::new(FRAC_PI_2, FRAC_PI_2),
            BlochAngles::new(FRAC_PI_2, 3.0 * FRAC_PI_2),
        ];
        let angles = (0..num_qubits).fold(vec![Vec::new()], |acc, _| {
            acc.into_iter()
                .flat_map(|prefix: Vec<BlochAngles>| {
                    axes.iter().map(move |&a| {
                        let mut next = prefix.clone();
                        next.push(a);
                        next
                    })
                })
                .collect()
        });
        TrueStateEnsemble::from_angles(angles)
    }

    /// `count` copies of the maximally mixed state
    pub fn maximally_mixed(&self, num_qubits: usize, count: usize) -> TrueStateEnsemble {
        let rho = DensityMatrix::maximally_mixed(1usize << num_qubits);
        TrueStateEnsemble::new(vec![rho; count])
    }

    // ========================================================================
    // Sweeps
    // ========================================================================

    /// Haar ensembles of increasing size sharing their leading states
    pub fn ensemble_scaling(
        &self,
        num_qubits: usize,
        sizes: &[usize],
    ) -> EmqstResult<Vec<TrueStateEnsemble>> {
        let seed = self.seed();
        sizes
            .iter()
            .map(|&count| TrueStateEnsemble::haar_random(num_qubits, count, seed))
            .collect()
    }

    // ========================================================================
    // Utility
    // ========================================================================

    /// Fixed seed, or a fresh one per call
    fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(random::entropy_seed)
    }
}

impl Default for EnsembleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_haar() {
        let gen = EnsembleGenerator::with_seed(42);
        let ensemble = gen.haar(2, 5).unwrap();

        assert_eq!(ensemble.len(), 5);
        for rho in ensemble.iter() {
            assert_eq!(rho.dim(), 4);
            assert_abs_diff_eq!(rho.purity(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_haar_reproducibility() {
        let a = EnsembleGenerator::with_seed(7).haar(1, 4).unwrap();
        let b = EnsembleGenerator::with_seed(7).haar(1, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_product_has_angles() {
        let ensemble = EnsembleGenerator::with_seed(3).product(2, 3).unwrap();
        let angles = ensemble.angles().unwrap();
        assert_eq!(angles.len(), 3);
        assert!(angles.iter().all(|a| a.len() == 2));
    }

    #[test]
    fn test_mixed_states_valid() {
        let ensemble = EnsembleGenerator::with_seed(5).mixed(1, 6).unwrap();
        for rho in ensemble.iter() {
            assert!(rho.is_valid(1e-9));
            assert!(rho.purity() < 1.0);
        }
    }

    #[test]
    fn test_pauli_eigenstates() {
        let gen = EnsembleGenerator::new();
        assert_eq!(gen.pauli_eigenstates(1).unwrap().len(), 6);

        let two = gen.pauli_eigenstates(2).unwrap();
        assert_eq!(two.len(), 36);
        for rho in two.iter() {
            assert_abs_diff_eq!(rho.purity(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_maximally_mixed() {
        let ensemble = EnsembleGenerator::new().maximally_mixed(2, 3);
        assert_eq!(ensemble.len(), 3);
        assert_abs_diff_eq!(ensemble.states()[0].purity(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_ensemble_scaling_shares_prefix() {
        let gen = EnsembleGenerator::with_seed(11);
        let ensembles = gen.ensemble_scaling(1, &[2, 5]).unwrap();

        assert_eq!(ensembles[0].len(), 2);
        assert_eq!(ensembles[1].len(), 5);
        assert_eq!(ensembles[0].states(), &ensembles[1].states()[..2]);
    }
}
