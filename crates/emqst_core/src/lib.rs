//! # EMQST Core
//!
//! Foundation types for the noise-corrected quantum state tomography benchmark.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_core // L0: Foundation (완료)
//!     L0_Foundation // 기반 타입/상수/에러 (완료)
//!         Errors // 에러 타입 (완료)
//!         Constants // 수치/노이즈/추정 상수 (완료)
//!         LinAlg // 복소 행렬 유틸 (완료)
//!         DensityMatrix // 밀도 행렬 (완료)
//!         Povm // POVM + 측정 연산자 집합 (완료)
//!         Random // 시드 기반 난수 (완료)
//!         TrueStateEnsemble // 참 상태 앙상블 (완료)
//!         Parallel // 작업자 풀 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_core::prelude::*;
//!
//! // Nominal Pauli measurements on one qubit
//! let nominal = MeasurementOperatorSet::pauli(1).unwrap();
//! assert_eq!(nominal.len(), 3);
//!
//! // Born rule on |0>
//! let rho = DensityMatrix::from_bloch([0.0, 0.0, 1.0]).unwrap();
//! let probs = nominal.get(2).unwrap().probabilities(&rho);
//! assert!((probs[0] - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Random Ensembles
//!
//! ```rust
//! use emqst_core::prelude::*;
//!
//! let ensemble = TrueStateEnsemble::haar_random(2, 8, 42).unwrap();
//! assert_eq!(ensemble.len(), 8);
//! assert!(ensemble.validate_qubits(2).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Error types (Gantree: L0_Foundation → Errors)
pub mod error;

/// Constants (Gantree: L0_Foundation → Constants)
pub mod constants;

/// Linear algebra helpers (Gantree: L0_Foundation → LinAlg)
pub mod linalg;

/// Density matrices (Gantree: L0_Foundation → DensityMatrix)
pub mod density;

/// POVMs and operator sets (Gantree: L0_Foundation → Povm)
pub mod povm;

/// Seeded randomness (Gantree: L0_Foundation → Random)
pub mod random;

/// True-state ensembles (Gantree: L0_Foundation → TrueStateEnsemble)
pub mod ensemble;

/// Worker pools (Gantree: L0_Foundation → Parallel)
pub mod parallel;

// ============================================================================
// Re-exports
// ============================================================================

pub use constants::{calibration, estimation, fitting, noise, numerics};
pub use density::DensityMatrix;
pub use ensemble::{BlochAngles, TrueStateEnsemble};
pub use error::{EmqstError, EmqstResult};
pub use linalg::Operator;
pub use povm::{MeasurementOperatorSet, PauliBasis, Povm};
pub use parallel::worker_pool;
pub use random::trial_rng;

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases
    //!
    //! ```rust
    //! use emqst_core::prelude::*;
    //! ```

    pub use crate::constants::{calibration, estimation, fitting, noise, numerics};
    pub use crate::density::DensityMatrix;
    pub use crate::ensemble::{BlochAngles, TrueStateEnsemble};
    pub use crate::error::{EmqstError, EmqstResult};
    pub use crate::linalg::Operator;
    pub use crate::povm::{MeasurementOperatorSet, PauliBasis, Povm};
    pub use crate::parallel::worker_pool;
    pub use crate::random::trial_rng;
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pauli_set_is_complete_per_povm() {
        for n in 1..=2 {
            let set = MeasurementOperatorSet::pauli(n).unwrap();
            assert_eq!(set.len(), 3usize.pow(n as u32));
            for povm in set.iter() {
                assert!(Povm::validate(povm.elements(), 1e-10).is_ok());
            }
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let ensemble = TrueStateEnsemble::haar_random(2, 4, 9).unwrap();
        let set = MeasurementOperatorSet::pauli(2).unwrap();
        for rho in ensemble.iter() {
            for povm in set.iter() {
                let total: f64 = povm.probabilities(rho).iter().sum();
                assert_abs_diff_eq!(total, 1.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_pauli_set_is_informationally_complete_for_bloch() {
        // <Z> from the Z POVM reproduces the Bloch z-component
        let rho = DensityMatrix::from_bloch([0.1, -0.3, 0.6]).unwrap();
        let set = MeasurementOperatorSet::pauli(1).unwrap();
        let probs: Vec<Vec<f64>> = set.iter().map(|p| p.probabilities(&rho)).collect();
        assert_abs_diff_eq!(probs[0][0] - probs[0][1], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[1][0] - probs[1][1], -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[2][0] - probs[2][1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_set_distance_to_self_is_zero() {
        let set = MeasurementOperatorSet::pauli(2).unwrap();
        assert_abs_diff_eq!(set.max_distance(&set).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fidelity_of_estimate_with_itself() {
        let ensemble = TrueStateEnsemble::random_product(1, 3, 4).unwrap();
        for rho in ensemble.iter() {
            assert_abs_diff_eq!(rho.infidelity(rho), 0.0, epsilon = 1e-8);
        }
    }
}
