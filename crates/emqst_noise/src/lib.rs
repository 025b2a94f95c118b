//! # EMQST Noise
//!
//! Synthetic measurement noise for POVM sets.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_noise // L1: Noise Model (완료)
//!     NoiseMode // 노이즈 코드 (완료)
//!         None, Depolarizing, Rotation, Readout
//!         AmplitudeDamping, RotationDepolarizing
//!     NoiseModel // 측정 노이즈 모델 (완료)
//!         new(), from_code(), ideal(), with_*()
//!         apply(), apply_single_operator_noise(), check_supported()
//!     Channels // 하이젠베르크 그림 채널 (완료)
//!         apply_depolarizing(), apply_rotation()
//!         apply_readout(), apply_amplitude_damping()
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_noise::prelude::*;
//! use emqst_core::MeasurementOperatorSet;
//!
//! let nominal = MeasurementOperatorSet::pauli(1).unwrap();
//! let noisy = NoiseModel::from_code(1).unwrap().apply(&nominal).unwrap();
//! assert!(noisy.max_distance(&nominal).unwrap() > 0.0);
//! ```
//!
//! ## Multi-qubit Restriction
//!
//! ```rust
//! use emqst_noise::prelude::*;
//! use emqst_core::{EmqstError, MeasurementOperatorSet};
//!
//! let nominal = MeasurementOperatorSet::pauli(2).unwrap();
//! let err = NoiseModel::new(NoiseMode::Rotation).apply(&nominal).unwrap_err();
//! assert!(matches!(err, EmqstError::UnsupportedNoise { .. }));
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Measurement noise model (Gantree: L1_Noise → NoiseModel)
pub mod noise_model;

// ============================================================================
// Re-exports
// ============================================================================

pub use noise_model::{
    apply_amplitude_damping, apply_depolarizing, apply_readout, apply_rotation, NoiseMode,
    NoiseModel,
};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports

    pub use crate::noise_model::{apply_depolarizing, NoiseMode, NoiseModel};
}

// ============================================================================
// Integration Tests
// ============================================================================
