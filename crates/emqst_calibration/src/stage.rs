//! Calibration stage
//!
//! Gantree: L2_Calibration → CalibrationStage
//!
//! Glue between the benchmark and device tomography: obtains calibration
//! outcomes (simulated under the true operators, exact, or measured), runs
//! the reconstruction inside a bounded worker pool and reports timing and
//! convergence. Non-convergence never fails the stage; the best estimate is
//! returned with a warning.

use crate::calibration_states::CalibrationStateSet;
use crate::device_tomography::{CalibrationData, DeviceTomography};
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::parallel::worker_pool;
use emqst_core::povm::MeasurementOperatorSet;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Where calibration outcomes come from
/// Gantree: CalibrationSource // 보정 데이터 출처
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationSource {
    /// Multinomial sampling under the true operators
    Simulated {
        /// Run seed
        seed: u64,
    },
    /// Expected frequencies (unlimited shots)
    Exact,
    /// Counts measured on hardware
    External(CalibrationData),
}

/// Calibration outcome with diagnostics
/// Gantree: CalibrationResult // 보정 결과
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Reconstructed operator set
    pub reconstructed: MeasurementOperatorSet,
    /// Tomography iterations per POVM (empty when disabled)
    pub iterations: Vec<usize>,
    /// Whether every POVM converged
    pub converged: bool,
    /// Whether calibration was skipped (zero shots)
    pub disabled: bool,
    /// Wall-clock time of the stage
    pub elapsed: Duration,
}

/// Summary persisted alongside run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Distance between reconstructed and noisy sets, per POVM
    pub distances: Vec<f64>,
    /// Largest per-POVM distance
    pub max_distance: f64,
    /// Tomography iterations per POVM
    pub iterations: Vec<usize>,
    /// Whether every POVM converged
    pub converged: bool,
    /// Whether calibration was skipped
    pub disabled: bool,
    /// Stage time in seconds
    pub elapsed_secs: f64,
}

impl CalibrationReport {
    /// Build from a stage result and the diagnostic distances
    pub fn new(result: &CalibrationResult, distances: Vec<f64>) -> Self {
        let max_distance = distances.iter().copied().fold(0.0, f64::max);
        Self {
            distances,
            max_distance,
            iterations: result.iterations.clone(),
            converged: result.converged,
            disabled: result.disabled,
            elapsed_secs: result.elapsed.as_secs_f64(),
        }
    }
}

/// Device tomography run for a benchmark
/// Gantree: CalibrationStage // 보정 단계
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStage {
    tomography: DeviceTomography,
    num_cores: usize,
}

impl CalibrationStage {
    /// Create with a tomography budget and worker count
    pub fn new(tomography: DeviceTomography, num_cores: usize) -> Self {
        Self {
            tomography,
            num_cores,
        }
    }

    /// Tomography settings
    pub fn tomography(&self) -> &DeviceTomography {
        &self.tomography
    }

    /// Reconstruct the operators the device actually measures
    /// Gantree: calibrate(n,shots,true_ops,states,guess,source) -> Result<CalibrationResult> // 보정
    ///
    /// `true_operators` is used only to generate outcomes when the source is
    /// simulated or exact; the reconstruction itself sees frequencies only.
    pub fn calibrate(
        &self,
        num_qubits: usize,
        shots_per_state: u64,
        true_operators: &MeasurementOperatorSet,
        states: &CalibrationStateSet,
        initial_guess: &MeasurementOperatorSet,
        source: &CalibrationSource,
    ) -> EmqstResult<CalibrationResult> {
        let start = Instant::now();
        if true_operators.num_qubits() != num_qubits || states.num_qubits() != num_qubits {
            return Err(EmqstError::DimensionMismatch {
                expected: num_qubits,
                found: true_operators.num_qubits().max(states.num_qubits()),
            });
        }
        if initial_guess.len() != true_operators.len() {
            return Err(EmqstError::DimensionMismatch {
                expected: true_operators.len(),
                found: initial_guess.len(),
            });
        }

        let simulated = !matches!(source, CalibrationSource::External(_));
        if simulated && shots_per_state == 0 {
            log::info!("Calibration disabled (0 shots): using the initial guess unchanged");
            return Ok(CalibrationResult {
                reconstructed: initial_guess.clone(),
                iterations: Vec::new(),
                converged: true,
                disabled: true,
                elapsed: start.elapsed(),
            });
        }

        let pool = worker_pool(self.num_cores)?;
        log::info!(
            "Calibrating {} POVMs on {} states ({} shots each, {} cores)",
            initial_guess.len(),
            states.len(),
            shots_per_state,
            self.num_cores
        );

        let tomography = pool.install(|| -> EmqstResult<_> {
            let data = match source {
                CalibrationSource::Simulated { seed } => {
                    CalibrationData::simulate(true_operators, states, shots_per_state, *seed)?
                }
                CalibrationSource::Exact => CalibrationData::exact(true_operators, states)?,
                CalibrationSource::External(data) => data.clone(),
            };
            self.tomography.reconstruct(&data, states, initial_guess)
        })?;

        let elapsed = start.elapsed();
        let converged = tomography.all_converged();
        if converged {
            log::info!("Calibration converged in {:.2?}", elapsed);
        } else {
            log::warn!(
                "Calibration hit the iteration cap ({}) on {} of {} POVMs after {:.2?}; using best estimate",
                self.tomography.max_iterations,
                tomography.converged.iter().filter(|c| !**c).count(),
                tomography.converged.len(),
                elapsed
            );
        }

        Ok(CalibrationResult {
            reconstructed: tomography.operators,
            iterations: tomography.iterations,
            converged,
            disabled: false,
            elapsed,
        })
    }
}

impl Default for CalibrationStage {
    fn default() -> Self {
        Self::new(DeviceTomography::default(), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration_states::default_calibration;

    #[test]
    fn test_zero_shots_disables_calibration() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let states = default_calibration(1).unwrap();
        let result = CalibrationStage::default()
            .calibrate(1, 0, &nominal, &states, &nominal, &CalibrationSource::Simulated { seed: 1 })
            .unwrap();
        assert!(result.disabled);
        assert_eq!(result.reconstructed, nominal);
    }

    #[test]
    fn test_qubit_mismatch_rejected() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let states = default_calibration(1).unwrap();
        let err = CalibrationStage::default()
            .calibrate(2, 10, &nominal, &states, &nominal, &CalibrationSource::Exact)
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_report_max_distance() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let result = CalibrationResult {
            reconstructed: nominal,
            iterations: vec![3, 4, 5],
            converged: true,
            disabled: false,
            elapsed: Duration::from_millis(5),
        };
        let report = CalibrationReport::new(&result, vec![0.01, 0.03, 0.02]);
        assert_eq!(report.max_distance, 0.03);
        assert_eq!(report.iterations, vec![3, 4, 5]);
    }
}
