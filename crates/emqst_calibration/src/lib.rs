//! # EMQST Calibration
//!
//! Self-consistent device tomography of measurement operators.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_calibration // L2: Calibration (완료)
//!     CalibrationStateSet // 보정 상태 (완료)
//!         default_for(), born_table()
//!     CalibrationData // 보정 측정 데이터 (완료)
//!         simulate(), exact(), from_counts()
//!     DeviceTomography // ML POVM 재구성 (완료)
//!         reconstruct(), reconstruct_povm()
//!     CalibrationStage // 보정 단계 (완료)
//!         calibrate(), CalibrationSource, CalibrationReport
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_calibration::prelude::*;
//! use emqst_core::MeasurementOperatorSet;
//!
//! let nominal = MeasurementOperatorSet::pauli(1).unwrap();
//! let states = default_calibration(1).unwrap();
//!
//! // Exact data under the nominal operators reproduces them
//! let result = CalibrationStage::default()
//!     .calibrate(1, 1, &nominal, &states, &nominal, &CalibrationSource::Exact)
//!     .unwrap();
//! assert!(result.reconstructed.max_distance(&nominal).unwrap() < 1e-2);
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Calibration states (Gantree: L2_Calibration → CalibrationStateSet)
pub mod calibration_states;

/// Device tomography (Gantree: L2_Calibration → DeviceTomography)
pub mod device_tomography;

/// Calibration stage (Gantree: L2_Calibration → CalibrationStage)
pub mod stage;

// ============================================================================
// Re-exports
// ============================================================================

pub use calibration_states::{default_calibration, CalibrationStateSet};
pub use device_tomography::{CalibrationData, DeviceTomography, PovmFit, TomographyResult};
pub use stage::{CalibrationReport, CalibrationResult, CalibrationSource, CalibrationStage};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports

    pub use crate::calibration_states::{default_calibration, CalibrationStateSet};
    pub use crate::device_tomography::{CalibrationData, DeviceTomography};
    pub use crate::stage::{
        CalibrationReport, CalibrationResult, CalibrationSource, CalibrationStage,
    };
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use emqst_core::prelude::*;
    use emqst_noise::prelude::*;

    fn noisy_set(num_qubits: usize, mode: NoiseMode) -> (MeasurementOperatorSet, MeasurementOperatorSet) {
        let nominal = MeasurementOperatorSet::pauli(num_qubits).unwrap();
        let noisy = NoiseModel::new(mode).apply(&nominal).unwrap();
        (nominal, noisy)
    }

    #[test]
    fn test_self_consistency_with_exact_data() {
        // noisy set as its own guess with unlimited shots is a fixed point
        let (_, noisy) = noisy_set(1, NoiseMode::Depolarizing);
        let states = default_calibration(1).unwrap();
        let result = CalibrationStage::default()
            .calibrate(1, 1, &noisy, &states, &noisy, &CalibrationSource::Exact)
            .unwrap();
        assert!(result.reconstructed.max_distance(&noisy).unwrap() < 1e-9);
    }

    #[test]
    fn test_self_consistency_with_projective_operators() {
        // mode 0 leaves rank-one projectors, a boundary point of the POVM set
        let (nominal, noisy) = noisy_set(1, NoiseMode::None);
        assert_eq!(noisy, nominal);
        let states = default_calibration(1).unwrap();
        let result = CalibrationStage::default()
            .calibrate(1, 1, &noisy, &states, &noisy, &CalibrationSource::Exact)
            .unwrap();
        assert!(result.converged);
        assert!(!result.disabled);
        for d in result.reconstructed.distances(&noisy).unwrap() {
            assert!(d < 1e-8, "distance {}", d);
        }
    }

    #[test]
    fn test_depolarizing_recovered_from_samples() {
        let (nominal, noisy) = noisy_set(1, NoiseMode::Depolarizing);
        let states = default_calibration(1).unwrap();
        let stage = CalibrationStage::new(DeviceTomography::default(), 2);
        let result = stage
            .calibrate(
                1,
                20_000,
                &noisy,
                &states,
                &nominal,
                &CalibrationSource::Simulated { seed: 7 },
            )
            .unwrap();
        let distance = result.reconstructed.max_distance(&noisy).unwrap();
        assert!(distance < 0.05, "distance {} too large", distance);
        assert!(distance < nominal.max_distance(&noisy).unwrap());
    }

    #[test]
    fn test_every_single_qubit_mode_is_recovered_exactly() {
        let states = default_calibration(1).unwrap();
        for mode in [
            NoiseMode::Rotation,
            NoiseMode::Readout,
            NoiseMode::AmplitudeDamping,
            NoiseMode::RotationDepolarizing,
        ] {
            let (nominal, noisy) = noisy_set(1, mode);
            let result = CalibrationStage::default()
                .calibrate(1, 1, &noisy, &states, &nominal, &CalibrationSource::Exact)
                .unwrap();
            let distance = result.reconstructed.max_distance(&noisy).unwrap();
            assert!(distance < 0.05, "mode {} distance {}", mode, distance);
        }
    }

    #[test]
    fn test_two_qubit_calibration_runs() {
        let (nominal, noisy) = noisy_set(2, NoiseMode::Depolarizing);
        let states = default_calibration(2).unwrap();
        let stage = CalibrationStage::new(DeviceTomography::new(500, 1e-8), 2);
        let result = stage
            .calibrate(
                2,
                2_000,
                &noisy,
                &states,
                &nominal,
                &CalibrationSource::Simulated { seed: 3 },
            )
            .unwrap();
        assert_eq!(result.reconstructed.len(), 9);
        assert_eq!(result.iterations.len(), 9);
    }

    #[test]
    fn test_external_counts_used_verbatim() {
        let (nominal, noisy) = noisy_set(1, NoiseMode::Depolarizing);
        let states = default_calibration(1).unwrap();
        let data = CalibrationData::simulate(&noisy, &states, 5_000, 11).unwrap();
        let from_data = CalibrationStage::default()
            .calibrate(
                1,
                0,
                &nominal,
                &states,
                &nominal,
                &CalibrationSource::External(data),
            )
            .unwrap();
        assert!(!from_data.disabled);
        assert!(from_data.reconstructed.max_distance(&noisy).unwrap() < 0.1);
    }
}
