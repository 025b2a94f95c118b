//! # EMQST Engine
//!
//! Noise-corrected QST benchmark orchestration.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_engine // L4: Integration (완료)
//!     BenchmarkConfig // 벤치마크 설정 (완료)
//!         single_qubit(), quick(), benchmark(), ideal()
//!         with_*(), validate()
//!     RunContext // 실행 컨텍스트 (완료)
//!         create_run(), persist(), close()
//!     ExperimentalData // 실험 데이터 (완료)
//!     AggregateResult // 앙상블 평균 (완료)
//!         mean_curve()
//!     PowerLawFit // 멱법칙 맞춤 (완료)
//!         fit_power_law() - Levenberg-Marquardt
//!     Plot // 수렴 그래프 (완료)
//!     BenchmarkOrchestrator // 벤치마크 조율 (완료)
//!         prepare() → apply_noise() → calibrate() → generate_data()
//!         → estimate() → aggregate() → report()
//!         run() - 전체 실행
//!     run_benchmark() // 진입점 (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_engine::prelude::*;
//! use emqst_core::TrueStateEnsemble;
//!
//! let results = std::env::temp_dir().join("emqst_doc_quick_start");
//! let config = BenchmarkConfig::quick(1)
//!     .with_qst_shots(64)
//!     .with_calibration_shots(1_000)
//!     .with_seed(42)
//!     .with_results_dir(&results);
//! let ensemble = TrueStateEnsemble::haar_random(1, 3, 42).unwrap();
//!
//! let outcome = run_benchmark(config, ensemble, None, None).unwrap();
//! assert_eq!(outcome.corrected_infidelity()[0].len(), 64);
//! println!("calibration distance: {:.3e}", outcome.calibration.max_distance);
//! # std::fs::remove_dir_all(&results).ok();
//! ```
//!
//! ## Staged Execution
//!
//! ```rust
//! use emqst_engine::prelude::*;
//! use emqst_core::TrueStateEnsemble;
//!
//! let results = std::env::temp_dir().join("emqst_doc_staged");
//! let config = BenchmarkConfig::ideal(1)
//!     .with_estimator(EstimatorKind::Mle)
//!     .with_qst_shots(32)
//!     .with_results_dir(&results);
//! let ensemble = TrueStateEnsemble::haar_random(1, 2, 1).unwrap();
//!
//! let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble);
//! orchestrator.prepare().unwrap();
//! orchestrator.apply_noise().unwrap();
//! orchestrator.calibrate().unwrap();
//! orchestrator.generate_data().unwrap();
//! orchestrator.estimate().unwrap();
//! orchestrator.aggregate().unwrap();
//! orchestrator.report().unwrap();
//! assert_eq!(orchestrator.stage(), PipelineStage::Reported);
//! # std::fs::remove_dir_all(&results).ok();
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Configuration (Gantree: L4_Integration → BenchmarkConfig)
pub mod config;

/// Run directories and artifacts (Gantree: L4_Integration → RunContext)
pub mod run_context;

/// Measured data (Gantree: L4_Integration → ExperimentalData)
pub mod experimental;

/// Ensemble averaging (Gantree: L4_Integration → AggregateResult)
pub mod aggregate;

/// Power-law fitting (Gantree: L4_Integration → PowerLawFit)
pub mod fit;

/// Convergence plot (Gantree: L4_Integration → Plot)
pub mod plot;

/// Orchestration (Gantree: L4_Integration → BenchmarkOrchestrator)
pub mod orchestrator;

// ============================================================================
// Re-exports
// ============================================================================

pub use aggregate::{mean_curve, AggregateResult};
pub use config::BenchmarkConfig;
pub use experimental::ExperimentalData;
pub use fit::{fit_power_law, FitSettings, PowerLawFit, TrackFits};
pub use orchestrator::{
    run_benchmark, BenchmarkOrchestrator, BenchmarkOutcome, PipelineStage, PipelineState,
};
pub use plot::plot_infidelities;
pub use run_context::RunContext;

// ============================================================================
// Prelude
// ============================================================================

/// Convenient imports for common use cases
pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use emqst_engine::prelude::*;
    //! ```

    pub use crate::aggregate::AggregateResult;
    pub use crate::config::BenchmarkConfig;
    pub use crate::experimental::ExperimentalData;
    pub use crate::fit::{FitSettings, PowerLawFit};
    pub use crate::orchestrator::{
        run_benchmark, BenchmarkOrchestrator, BenchmarkOutcome, PipelineStage,
    };
    pub use emqst_noise::{NoiseMode, NoiseModel};
    pub use emqst_qst::EstimatorKind;
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;
    use emqst_calibration::default_calibration;
    use emqst_core::{EmqstError, MeasurementOperatorSet, TrueStateEnsemble};
    use emqst_qst::{BmeEstimator, MeasurementData};
    use std::fs;
    use std::path::PathBuf;

    fn temp_results(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "emqst_engine_{}_{}",
            tag,
            uuid::Uuid::new_v4().simple()
        ))
    }

    #[test]
    fn test_noiseless_tracks_identical() {
        let root = temp_results("noiseless");
        let config = BenchmarkConfig::ideal(1)
            .with_qst_shots(256)
            .with_bme(BmeEstimator {
                particles: 200,
                ..BmeEstimator::default()
            })
            .with_cores(2)
            .with_seed(5)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(1, 4, 5).unwrap();

        let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble);
        let outcome = orchestrator.run().unwrap();

        let state = orchestrator.state();
        assert_eq!(state.noisy, state.nominal);
        assert!(outcome.calibration.disabled);

        assert_eq!(outcome.corrected_infidelity().len(), 4);
        assert!(outcome.corrected_infidelity().iter().all(|t| t.len() == 256));
        assert!(outcome.uncorrected_infidelity().iter().all(|t| t.len() == 256));
        for rho in outcome
            .corrected_estimates()
            .iter()
            .chain(outcome.uncorrected_estimates())
        {
            assert!(rho.is_valid(1e-8));
        }
        assert_eq!(outcome.corrected_infidelity(), outcome.uncorrected_infidelity());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_calibration_corrects_depolarizing_bias() {
        let root = temp_results("depolarizing");
        let config = BenchmarkConfig::quick(1)
            .with_noise_mode(NoiseMode::Depolarizing)
            .with_calibration_shots(20_000)
            .with_qst_shots(1_500)
            .with_cores(4)
            .with_seed(7)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(1, 6, 7).unwrap();

        let outcome = run_benchmark(config, ensemble, None, None).unwrap();
        assert!(outcome.calibration.max_distance >= 0.0);
        assert!(outcome.calibration.max_distance < 0.05);

        let (corrected, uncorrected) = outcome.aggregate.tail_means(1_000).unwrap();
        assert!(
            corrected < uncorrected,
            "corrected {} vs uncorrected {}",
            corrected,
            uncorrected
        );
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_empty_ensemble_fails_at_aggregation() {
        let root = temp_results("empty");
        let config = BenchmarkConfig::ideal(1)
            .with_estimator(EstimatorKind::Mle)
            .with_qst_shots(16)
            .with_results_dir(&root);
        let mut orchestrator = BenchmarkOrchestrator::new(config, TrueStateEnsemble::new(vec![]));
        orchestrator.estimate().unwrap();
        assert!(matches!(orchestrator.aggregate(), Err(EmqstError::EmptyEnsemble)));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_aggregate_invariant_to_ensemble_order() {
        let root = temp_results("order");
        let config = BenchmarkConfig::quick(1)
            .with_qst_shots(64)
            .with_seed(3)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(1, 5, 3).unwrap();
        let reordered = ensemble.permuted(&[4, 3, 2, 1, 0]).unwrap();

        let a = run_benchmark(config.clone(), ensemble, None, None).unwrap();
        let b = run_benchmark(config, reordered, None, None).unwrap();

        let pairs = [
            (&a.aggregate.corrected_mean, &b.aggregate.corrected_mean),
            (&a.aggregate.uncorrected_mean, &b.aggregate.uncorrected_mean),
        ];
        for (x, y) in pairs {
            assert_eq!(x.len(), y.len());
            for (p, q) in x.iter().zip(y.iter()) {
                assert!((p - q).abs() < 1e-10, "{} vs {}", p, q);
            }
        }
        fs::remove_dir_all(&root).ok();
    }

    fn measured_data(ensemble: &TrueStateEnsemble, shots: usize) -> ExperimentalData {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let states = default_calibration(1).unwrap();
        let counts = nominal
            .iter()
            .map(|povm| {
                states
                    .born_table(povm)
                    .into_iter()
                    .map(|row| row.into_iter().map(|p| (p * 1000.0).round() as u64).collect())
                    .collect()
            })
            .collect();
        let records = MeasurementData::simulate(&nominal, ensemble, shots, 17)
            .unwrap()
            .records()
            .to_vec();
        ExperimentalData::new(counts, records)
    }

    #[test]
    fn test_experimental_mode_forces_no_noise() {
        let root = temp_results("experimental");
        let ensemble = TrueStateEnsemble::haar_random(1, 3, 9).unwrap();
        let config = BenchmarkConfig::quick(1)
            .with_noise_mode(NoiseMode::Rotation)
            .with_experimental(true)
            .with_qst_shots(50)
            .with_results_dir(&root);

        let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble.clone())
            .with_experimental_data(measured_data(&ensemble, 50));
        let outcome = orchestrator.run().unwrap();
        let state = orchestrator.state();
        assert_eq!(state.noisy, state.nominal);
        assert!(outcome.corrected_infidelity().iter().all(|t| t.len() == 50));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_experimental_mode_requires_data() {
        let root = temp_results("no_data");
        let config = BenchmarkConfig::quick(1)
            .with_experimental(true)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(1, 1, 1).unwrap();
        let err = run_benchmark(config, ensemble, None, None).unwrap_err();
        assert!(matches!(err, EmqstError::MissingExperimentalData(_)));
        assert!(!root.exists());
    }

    #[test]
    fn test_unsupported_noise_aborts_before_any_stage() {
        let root = temp_results("unsupported");
        let config = BenchmarkConfig::quick(2)
            .with_noise_mode(NoiseMode::AmplitudeDamping)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(2, 1, 1).unwrap();
        let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble);
        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, EmqstError::UnsupportedNoise { mode: 4, qubits: 2 }));
        assert_eq!(orchestrator.stage(), PipelineStage::Initial);
        assert!(!root.exists());
    }

    #[test]
    fn test_storage_failure_aborts() {
        let root = temp_results("storage");
        fs::create_dir_all(&root).unwrap();
        let blocker = root.join("results_file");
        fs::write(&blocker, b"not a directory").unwrap();

        let config = BenchmarkConfig::ideal(1).with_results_dir(&blocker);
        let ensemble = TrueStateEnsemble::haar_random(1, 1, 1).unwrap();
        let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble);
        assert!(matches!(orchestrator.run(), Err(EmqstError::Storage(_))));
        assert_eq!(orchestrator.stage(), PipelineStage::Initial);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_two_qubit_depolarizing_run() {
        let root = temp_results("two_qubit");
        let config = BenchmarkConfig::quick(2)
            .with_qst_shots(90)
            .with_calibration_shots(500)
            .with_seed(4)
            .with_results_dir(&root);
        let ensemble = TrueStateEnsemble::haar_random(2, 2, 4).unwrap();
        let outcome = run_benchmark(config, ensemble, None, None).unwrap();
        assert_eq!(outcome.calibration.distances.len(), 9);
        assert!(outcome.corrected_estimates().iter().all(|r| r.is_valid(1e-8)));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_power_law_recovery() {
        let curve: Vec<f64> = (1..=2_500)
            .map(|n| 0.4 * (n as f64).powf(-0.8) * (1.0 + 0.01 * ((n as f64) * 1.3).cos()))
            .collect();
        let fit = fit_power_law(&curve, &FitSettings::default()).unwrap();
        assert!((fit.b + 0.8).abs() < 0.05);
    }
}
