//! Estimator selection
//!
//! Gantree: L3_Estimation → Estimator
//!
//! Tagged enum over the available state estimators. Adding an estimator
//! means adding a variant; every match below is exhaustive.

use crate::bme::BmeEstimator;
use crate::mle::MleEstimator;
use crate::outcomes::OutcomeRecord;
use emqst_core::density::DensityMatrix;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::povm::MeasurementOperatorSet;
use emqst_core::random::{self, ESTIMATOR_STREAM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-shot infidelities plus the final estimate for one true state
/// Gantree: Trajectory // 샷별 궤적
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// 1 - F(true, estimate) after each shot
    pub infidelity: Vec<f64>,
    /// Estimate after the last shot
    pub estimate: DensityMatrix,
}

impl Trajectory {
    /// Number of shots covered
    pub fn len(&self) -> usize {
        self.infidelity.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.infidelity.is_empty()
    }

    /// Infidelity after the last shot
    pub fn final_infidelity(&self) -> Option<f64> {
        self.infidelity.last().copied()
    }
}

// ============================================================================
// EstimatorKind
// ============================================================================

/// Estimator selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    /// Maximum likelihood
    #[serde(rename = "MLE")]
    Mle,
    /// Bayesian mean
    #[serde(rename = "BME")]
    Bme,
}

impl FromStr for EstimatorKind {
    type Err = EmqstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MLE" => Ok(EstimatorKind::Mle),
            "BME" => Ok(EstimatorKind::Bme),
            other => Err(EmqstError::InvalidParameter(format!(
                "unknown estimator '{}': expected MLE or BME",
                other
            ))),
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Mle => write!(f, "MLE"),
            EstimatorKind::Bme => write!(f, "BME"),
        }
    }
}

// ============================================================================
// Estimator
// ============================================================================

/// Configured estimator
/// Gantree: Estimator // MLE | BME
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    /// RρR maximum likelihood
    Mle(MleEstimator),
    /// SIS Bayesian mean
    Bme(BmeEstimator),
}

impl Estimator {
    /// Default-configured estimator of a kind
    pub fn from_kind(kind: EstimatorKind) -> Self {
        match kind {
            EstimatorKind::Mle => Estimator::Mle(MleEstimator::default()),
            EstimatorKind::Bme => Estimator::Bme(BmeEstimator::default()),
        }
    }

    /// Selector of this estimator
    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Mle(_) => EstimatorKind::Mle,
            Estimator::Bme(_) => EstimatorKind::Bme,
        }
    }

    /// Estimate one true state from its record
    ///
    /// Estimator randomness depends only on `(seed, state_key)`, so two
    /// tracks run with the same seed share it. The key comes from
    /// [`TrueStateEnsemble::stream_keys`](emqst_core::ensemble::TrueStateEnsemble::stream_keys).
    pub fn estimate(
        &self,
        operators: &MeasurementOperatorSet,
        record: &OutcomeRecord,
        true_state: &DensityMatrix,
        seed: u64,
        state_key: u64,
    ) -> EmqstResult<Trajectory> {
        match self {
            Estimator::Mle(mle) => mle.estimate(operators, record, true_state),
            Estimator::Bme(bme) => {
                let mut rng = random::trial_rng(seed, ESTIMATOR_STREAM, state_key);
                bme.estimate(operators, record, true_state, &mut rng)
            }
        }
    }
}

impl From<EstimatorKind> for Estimator {
    fn from(kind: EstimatorKind) -> Self {
        Estimator::from_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mle".parse::<EstimatorKind>().unwrap(), EstimatorKind::Mle);
        assert_eq!("BME".parse::<EstimatorKind>().unwrap(), EstimatorKind::Bme);
        assert!("LSQ".parse::<EstimatorKind>().is_err());
        assert_eq!(EstimatorKind::Bme.to_string(), "BME");
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [EstimatorKind::Mle, EstimatorKind::Bme] {
            assert_eq!(Estimator::from_kind(kind).kind(), kind);
        }
        let json = serde_json::to_string(&EstimatorKind::Mle).unwrap();
        assert_eq!(json, "\"MLE\"");
    }
}
