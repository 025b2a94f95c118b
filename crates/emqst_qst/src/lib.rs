//! # EMQST QST
//!
//! Per-shot quantum state estimation under an assumed operator set.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_qst // L3: Estimation (완료)
//!     MeasurementData // 공유 측정 데이터 (완료)
//!         Outcome, OutcomeRecord, CountTable
//!         simulate(), from_records(), truncated()
//!     MleEstimator // RρR 최대우도 (완료)
//!     BmeEstimator // SIS 베이지안 평균 (완료)
//!     Estimator // MLE | BME 태그 열거형 (완료)
//!         EstimatorKind, Trajectory
//!     EstimationTrack // 추정 트랙 (완료)
//!         run(), infidelity(), rho_estimates()
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_qst::prelude::*;
//! use emqst_core::prelude::*;
//!
//! let ops = MeasurementOperatorSet::pauli(1).unwrap();
//! let ensemble = TrueStateEnsemble::haar_random(1, 2, 7).unwrap();
//! let data = MeasurementData::simulate(&ops, &ensemble, 50, 7).unwrap();
//!
//! let mut track = EstimationTrack::new("nominal", EstimatorKind::Mle.into(), 1, 7);
//! track.run(&ops, &ensemble, &data).unwrap();
//! assert_eq!(track.infidelity().unwrap()[0].len(), 50);
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Per-shot outcome data (Gantree: L3_Estimation → MeasurementData)
pub mod outcomes;

/// Maximum-likelihood estimation (Gantree: L3_Estimation → MleEstimator)
pub mod mle;

/// Bayesian mean estimation (Gantree: L3_Estimation → BmeEstimator)
pub mod bme;

/// Estimator selection (Gantree: L3_Estimation → Estimator)
pub mod estimator;

/// Estimation tracks (Gantree: L3_Estimation → EstimationTrack)
pub mod track;

// ============================================================================
// Re-exports
// ============================================================================

pub use bme::BmeEstimator;
pub use estimator::{Estimator, EstimatorKind, Trajectory};
pub use mle::MleEstimator;
pub use outcomes::{CountTable, MeasurementData, Outcome, OutcomeRecord};
pub use track::{EstimationTrack, TrackResult};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports

    pub use crate::bme::BmeEstimator;
    pub use crate::estimator::{Estimator, EstimatorKind, Trajectory};
    pub use crate::mle::MleEstimator;
    pub use crate::outcomes::{MeasurementData, Outcome, OutcomeRecord};
    pub use crate::track::{EstimationTrack, TrackResult};
}

// ============================================================================
// Integration Tests
// ============================================================================
