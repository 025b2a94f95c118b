//! Estimation track
//!
//! Gantree: L3_Estimation → EstimationTrack
//!
//! Runs one estimator over a whole ensemble under one assumed operator set.
//! The benchmark builds two tracks (corrected and uncorrected) and feeds
//! both the same [`MeasurementData`]. A track holds only the result of its
//! most recent run.

use crate::estimator::{Estimator, EstimatorKind, Trajectory};
use crate::outcomes::MeasurementData;
use emqst_core::density::DensityMatrix;
use emqst_core::ensemble::TrueStateEnsemble;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::parallel::worker_pool;
use emqst_core::povm::MeasurementOperatorSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trajectories of one completed run
/// Gantree: TrackResult // 트랙 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    /// Per-state infidelity sequences, `[state][shot]`
    pub infidelity: Vec<Vec<f64>>,
    /// Per-state final estimates
    pub estimates: Vec<DensityMatrix>,
    /// Estimator used
    pub estimator: EstimatorKind,
    /// Wall-clock time
    #[serde(skip)]
    pub elapsed: Duration,
}

impl TrackResult {
    /// Collect per-state trajectories
    pub fn from_trajectories(
        trajectories: Vec<Trajectory>,
        estimator: EstimatorKind,
        elapsed: Duration,
    ) -> Self {
        let (infidelity, estimates) = trajectories
            .into_iter()
            .map(|t| (t.infidelity, t.estimate))
            .unzip();
        Self {
            infidelity,
            estimates,
            estimator,
            elapsed,
        }
    }

    /// Number of true states
    pub fn num_states(&self) -> usize {
        self.estimates.len()
    }
}

/// One estimator applied under one operator set
/// Gantree: EstimationTrack // 추정 트랙
#[derive(Debug, Clone)]
pub struct EstimationTrack {
    label: String,
    estimator: Estimator,
    num_cores: usize,
    seed: u64,
    result: Option<TrackResult>,
}

impl EstimationTrack {
    /// Create an idle track
    pub fn new(label: impl Into<String>, estimator: Estimator, num_cores: usize, seed: u64) -> Self {
        Self {
            label: label.into(),
            estimator,
            num_cores,
            seed,
            result: None,
        }
    }

    /// Track label (e.g. "corrected")
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Configured estimator
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// Estimate every true state under `operators`
    /// Gantree: run(ops,ensemble,data) -> Result<&TrackResult> // 추정 실행
    ///
    /// Any previous result is dropped before the new run starts, so a failed
    /// run leaves the track not ready.
    pub fn run(
        &mut self,
        operators: &MeasurementOperatorSet,
        ensemble: &TrueStateEnsemble,
        data: &MeasurementData,
    ) -> EmqstResult<&TrackResult> {
        self.result = None;
        ensemble.validate_qubits(operators.num_qubits())?;
        if data.num_states() != ensemble.len() {
            return Err(EmqstError::DimensionMismatch {
                expected: ensemble.len(),
                found: data.num_states(),
            });
        }
        data.check_against(operators)?;

        let start = Instant::now();
        log::info!(
            "[{}] {} over {} states x {} shots ({} cores)",
            self.label,
            self.estimator.kind(),
            ensemble.len(),
            data.shots(),
            self.num_cores
        );

        let pool = worker_pool(self.num_cores)?;
        let estimator = self.estimator;
        let seed = self.seed;
        let keys = ensemble.stream_keys();
        let trajectories = pool.install(|| {
            ensemble
                .states()
                .par_iter()
                .zip(data.records().par_iter())
                .zip(keys.par_iter())
                .map(|((truth, record), &key)| estimator.estimate(operators, record, truth, seed, key))
                .collect::<EmqstResult<Vec<_>>>()
        })?;

        let elapsed = start.elapsed();
        log::info!("[{}] finished in {:.2?}", self.label, elapsed);
        Ok(self.result.insert(TrackResult::from_trajectories(
            trajectories,
            estimator.kind(),
            elapsed,
        )))
    }

    /// Infidelity trajectories of the last run
    /// Gantree: infidelity() -> Result<&[Vec<f64>]> // get_infidelity
    pub fn infidelity(&self) -> EmqstResult<&[Vec<f64>]> {
        Ok(&self.ready()?.infidelity)
    }

    /// Final estimates of the last run
    /// Gantree: rho_estimates() -> Result<&[DensityMatrix]> // get_rho_estm
    pub fn rho_estimates(&self) -> EmqstResult<&[DensityMatrix]> {
        Ok(&self.ready()?.estimates)
    }

    /// Result of the last run
    pub fn result(&self) -> EmqstResult<&TrackResult> {
        self.ready()
    }

    /// Move the last result out, leaving the track not ready
    pub fn take_result(&mut self) -> EmqstResult<TrackResult> {
        self.result
            .take()
            .ok_or_else(|| EmqstError::StateNotReady(format!("track '{}' has not run", self.label)))
    }

    fn ready(&self) -> EmqstResult<&TrackResult> {
        self.result
            .as_ref()
            .ok_or_else(|| EmqstError::StateNotReady(format!("track '{}' has not run", self.label)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(shots: usize) -> (MeasurementOperatorSet, TrueStateEnsemble, MeasurementData) {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let ensemble = TrueStateEnsemble::haar_random(1, 3, 21).unwrap();
        let data = MeasurementData::simulate(&ops, &ensemble, shots, 8).unwrap();
        (ops, ensemble, data)
    }

    #[test]
    fn test_accessors_before_run() {
        let track = EstimationTrack::new("corrected", EstimatorKind::Mle.into(), 1, 0);
        assert!(matches!(track.infidelity(), Err(EmqstError::StateNotReady(_))));
        assert!(matches!(track.rho_estimates(), Err(EmqstError::StateNotReady(_))));
    }

    #[test]
    fn test_run_fills_result() {
        let (ops, ensemble, data) = setup(32);
        let mut track = EstimationTrack::new("corrected", EstimatorKind::Mle.into(), 2, 0);
        track.run(&ops, &ensemble, &data).unwrap();
        let inf = track.infidelity().unwrap();
        assert_eq!(inf.len(), 3);
        assert!(inf.iter().all(|t| t.len() == 32));
        assert_eq!(track.rho_estimates().unwrap().len(), 3);
    }

    #[test]
    fn test_rerun_replaces_result() {
        let (ops, ensemble, data) = setup(16);
        let mut track = EstimationTrack::new("t", EstimatorKind::Mle.into(), 1, 0);
        track.run(&ops, &ensemble, &data).unwrap();
        let short = data.truncated(8).unwrap();
        track.run(&ops, &ensemble, &short).unwrap();
        assert!(track.infidelity().unwrap().iter().all(|t| t.len() == 8));
    }

    #[test]
    fn test_failed_run_clears_result() {
        let (ops, ensemble, data) = setup(16);
        let mut track = EstimationTrack::new("t", EstimatorKind::Mle.into(), 1, 0);
        track.run(&ops, &ensemble, &data).unwrap();
        let two = MeasurementOperatorSet::pauli(2).unwrap();
        assert!(track.run(&two, &ensemble, &data).is_err());
        assert!(track.infidelity().is_err());
    }

    #[test]
    fn test_parallelism_does_not_change_results() {
        let (ops, ensemble, data) = setup(24);
        let mut one = EstimationTrack::new("a", EstimatorKind::Bme.into(), 1, 5);
        let mut four = EstimationTrack::new("b", EstimatorKind::Bme.into(), 4, 5);
        one.run(&ops, &ensemble, &data).unwrap();
        four.run(&ops, &ensemble, &data).unwrap();
        assert_eq!(one.infidelity().unwrap(), four.infidelity().unwrap());
    }
}
