//! Self-consistent device tomography
//!
//! Gantree: L2_Calibration → DeviceTomography
//!
//! Reconstructs the measurement operators of a device from outcome
//! frequencies on known calibration states. The reconstruction only ever
//! sees [`CalibrationData`]; the true operators enter through
//! [`CalibrationData::simulate`] and nowhere else.
//!
//! The estimator is the maximum-likelihood fixed point
//! `E_k ← Λ^{-1/2} R_k E_k R_k Λ^{-1/2}` with `R_k = Σ_j f_jk / p_jk ρ_j`
//! and `Λ = Σ_k R_k E_k R_k`, which keeps every iterate positive and complete.

use crate::calibration_states::CalibrationStateSet;
use emqst_core::constants::calibration::{MAX_ITERATIONS, TOLERANCE};
use emqst_core::constants::numerics::PROBABILITY_FLOOR;
use emqst_core::density::DensityMatrix;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::linalg::{self, Operator};
use emqst_core::povm::{MeasurementOperatorSet, Povm};
use emqst_core::random::{self, CALIBRATION_STREAM};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest element eigenvalue accepted as a starting point
const RANK_FLOOR: f64 = 1e-6;

/// Weight of I/K mixed into rank-deficient starting points
const START_MIXING: f64 = 0.05;

// ============================================================================
// CalibrationData
// ============================================================================

/// Outcome frequencies of every POVM on every calibration state
/// Gantree: CalibrationData // 보정 측정 데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    /// Relative frequencies indexed `[povm][state][outcome]`
    frequencies: Vec<Vec<Vec<f64>>>,

    /// Shots per (POVM, state) pair, `None` for expected frequencies
    shots_per_state: Option<u64>,
}

impl CalibrationData {
    /// Sample counts under the true operators
    /// Gantree: simulate(true_ops,states,shots,seed) -> Result<Self> // 모의 측정
    pub fn simulate(
        true_operators: &MeasurementOperatorSet,
        states: &CalibrationStateSet,
        shots_per_state: u64,
        seed: u64,
    ) -> EmqstResult<Self> {
        check_shapes(true_operators, states)?;
        if shots_per_state == 0 {
            return Err(EmqstError::InvalidParameter(
                "calibration needs at least one shot per state".into(),
            ));
        }
        let num_states = states.len();
        let frequencies = true_operators
            .povms()
            .par_iter()
            .enumerate()
            .map(|(i, povm)| {
                states
                    .states()
                    .iter()
                    .enumerate()
                    .map(|(j, rho)| {
                        let index = (i * num_states + j) as u64;
                        let mut rng = random::trial_rng(seed, CALIBRATION_STREAM, index);
                        let counts =
                            random::multinomial(&povm.probabilities(rho), shots_per_state, &mut rng);
                        counts
                            .into_iter()
                            .map(|n| n as f64 / shots_per_state as f64)
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            frequencies,
            shots_per_state: Some(shots_per_state),
        })
    }

    /// Expected frequencies (the unlimited-shot limit)
    pub fn exact(
        true_operators: &MeasurementOperatorSet,
        states: &CalibrationStateSet,
    ) -> EmqstResult<Self> {
        check_shapes(true_operators, states)?;
        let frequencies = true_operators
            .iter()
            .map(|povm| states.born_table(povm))
            .collect();
        Ok(Self {
            frequencies,
            shots_per_state: None,
        })
    }

    /// Externally measured counts indexed `[povm][state][outcome]`
    pub fn from_counts(counts: &[Vec<Vec<u64>>]) -> EmqstResult<Self> {
        let mut shots = None;
        let mut frequencies = Vec::with_capacity(counts.len());
        for per_povm in counts {
            let mut rows = Vec::with_capacity(per_povm.len());
            for row in per_povm {
                let total: u64 = row.iter().sum();
                if total == 0 {
                    return Err(EmqstError::InsufficientData {
                        needed: 1,
                        available: 0,
                    });
                }
                shots = Some(shots.map_or(total, |s: u64| s.min(total)));
                rows.push(row.iter().map(|&n| n as f64 / total as f64).collect());
            }
            frequencies.push(rows);
        }
        if frequencies.is_empty() {
            return Err(EmqstError::MissingExperimentalData(
                "calibration counts are empty".into(),
            ));
        }
        Ok(Self {
            frequencies,
            shots_per_state: shots,
        })
    }

    /// Number of POVMs covered
    pub fn num_povms(&self) -> usize {
        self.frequencies.len()
    }

    /// Frequencies of one POVM, `[state][outcome]`
    pub fn povm_frequencies(&self, povm: usize) -> Option<&[Vec<f64>]> {
        self.frequencies.get(povm).map(Vec::as_slice)
    }

    /// Shots per pair, if sampled
    pub fn shots_per_state(&self) -> Option<u64> {
        self.shots_per_state
    }

    /// Check the data matches an operator set shape and a state count
    pub fn check_against(&self, operators: &MeasurementOperatorSet, num_states: usize) -> EmqstResult<()> {
        if self.frequencies.len() != operators.len() {
            return Err(EmqstError::DimensionMismatch {
                expected: operators.len(),
                found: self.frequencies.len(),
            });
        }
        for (per_povm, povm) in self.frequencies.iter().zip(operators.iter()) {
            if per_povm.len() != num_states {
                return Err(EmqstError::DimensionMismatch {
                    expected: num_states,
                    found: per_povm.len(),
                });
            }
            if let Some(row) = per_povm.iter().find(|r| r.len() != povm.num_outcomes()) {
                return Err(EmqstError::DimensionMismatch {
                    expected: povm.num_outcomes(),
                    found: row.len(),
                });
            }
        }
        Ok(())
    }
}

fn check_shapes(operators: &MeasurementOperatorSet, states: &CalibrationStateSet) -> EmqstResult<()> {
    if operators.num_qubits() != states.num_qubits() {
        return Err(EmqstError::DimensionMismatch {
            expected: operators.num_qubits(),
            found: states.num_qubits(),
        });
    }
    Ok(())
}

// ============================================================================
// DeviceTomography
// ============================================================================

/// Outcome of reconstructing one POVM
#[derive(Debug, Clone, PartialEq)]
pub struct PovmFit {
    /// Reconstructed POVM
    pub povm: Povm,
    /// Iterations used
    pub iterations: usize,
    /// Whether the change fell below tolerance
    pub converged: bool,
    /// Log-likelihood of the returned POVM
    pub log_likelihood: f64,
}

/// Reconstructed operator set plus convergence diagnostics
/// Gantree: TomographyResult // 재구성 결과
#[derive(Debug, Clone, PartialEq)]
pub struct TomographyResult {
    /// Reconstructed operators
    pub operators: MeasurementOperatorSet,
    /// Iterations per POVM
    pub iterations: Vec<usize>,
    /// Convergence flag per POVM
    pub converged: Vec<bool>,
}

impl TomographyResult {
    /// Whether every POVM converged
    pub fn all_converged(&self) -> bool {
        self.converged.iter().all(|&c| c)
    }
}

/// Maximum-likelihood POVM reconstruction
/// Gantree: DeviceTomography // 장치 토모그래피
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceTomography {
    /// Iteration cap per POVM
    pub max_iterations: usize,
    /// Maximum Frobenius change treated as converged
    pub tolerance: f64,
}

impl Default for DeviceTomography {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl DeviceTomography {
    /// Create with explicit budget
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    /// Reconstruct every POVM (parallel over POVMs)
    /// Gantree: reconstruct(data,states,guess) -> Result<TomographyResult> // 재구성
    pub fn reconstruct(
        &self,
        data: &CalibrationData,
        states: &CalibrationStateSet,
        initial_guess: &MeasurementOperatorSet,
    ) -> EmqstResult<TomographyResult> {
        check_shapes(initial_guess, states)?;
        data.check_against(initial_guess, states.len())?;

        let fits = initial_guess
            .povms()
            .par_iter()
            .enumerate()
            .map(|(i, guess)| {
                let freqs = data.povm_frequencies(i).ok_or(EmqstError::DimensionMismatch {
                    expected: initial_guess.len(),
                    found: data.num_povms(),
                })?;
                self.reconstruct_povm(freqs, states.states(), guess)
            })
            .collect::<EmqstResult<Vec<_>>>()?;

        let iterations = fits.iter().map(|f| f.iterations).collect();
        let converged = fits.iter().map(|f| f.converged).collect();
        let operators =
            MeasurementOperatorSet::new(initial_guess.num_qubits(), fits.into_iter().map(|f| f.povm).collect())?;

        Ok(TomographyResult {
            operators,
            iterations,
            converged,
        })
    }

    /// Fixed-point reconstruction of a single POVM
    pub fn reconstruct_povm(
        &self,
        frequencies: &[Vec<f64>],
        states: &[DensityMatrix],
        initial_guess: &Povm,
    ) -> EmqstResult<PovmFit> {
        let mut current = full_rank_start(initial_guess);
        let mut best = (log_likelihood(frequencies, states, &current), current.clone());
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let next = match fixed_point_step(frequencies, states, &current) {
                Ok(next) => next,
                Err(e) => {
                    log::warn!("POVM reconstruction stopped at iteration {}: {}", iterations, e);
                    break;
                }
            };
            let change = next
                .iter()
                .zip(current.iter())
                .map(|(a, b)| linalg::frobenius_norm(&(a - b)))
                .fold(0.0, f64::max);
            current = next;

            let ll = log_likelihood(frequencies, states, &current);
            if ll >= best.0 {
                best = (ll, current.clone());
            }
            if change < self.tolerance {
                converged = true;
                break;
            }
        }

        let (log_likelihood, elements) = best;
        let elements = elements.iter().map(linalg::hermitian_part).collect();
        Ok(PovmFit {
            povm: Povm::new(elements)?,
            iterations,
            converged,
            log_likelihood,
        })
    }
}

/// Starting point with full-rank elements
///
/// The fixed-point map never enlarges the support of an element, so
/// rank-deficient guesses (ideal projectors) are mixed toward I/K first.
fn full_rank_start(guess: &Povm) -> Vec<Operator> {
    let elements = guess.elements();
    let deficient = elements
        .iter()
        .any(|e| linalg::min_eigenvalue(e) < RANK_FLOOR);
    if !deficient {
        return elements.to_vec();
    }
    let dim = guess.dim();
    let share = linalg::scale(&linalg::identity(dim), START_MIXING / elements.len() as f64);
    elements
        .iter()
        .map(|e| linalg::scale(e, 1.0 - START_MIXING) + &share)
        .collect()
}

/// One step of the POVM fixed-point map
fn fixed_point_step(
    frequencies: &[Vec<f64>],
    states: &[DensityMatrix],
    elements: &[Operator],
) -> EmqstResult<Vec<Operator>> {
    let dim = elements[0].nrows();
    let mut r_ops = vec![Operator::zeros(dim, dim); elements.len()];

    for (rho, row) in states.iter().zip(frequencies.iter()) {
        for (k, e) in elements.iter().enumerate() {
            let f = row[k];
            if f <= 0.0 {
                continue;
            }
            let p = rho.expectation(e).max(PROBABILITY_FLOOR);
            r_ops[k] += linalg::scale(rho.matrix(), f / p);
        }
    }

    let products: Vec<Operator> = r_ops
        .iter()
        .zip(elements.iter())
        .map(|(r, e)| r * e * r)
        .collect();
    let lambda = products
        .iter()
        .fold(Operator::zeros(dim, dim), |acc, m| acc + m);
    let lambda_inv_sqrt = linalg::inv_sqrtm_pd(&linalg::hermitian_part(&lambda))?;

    Ok(products
        .iter()
        .map(|m| linalg::hermitian_part(&(&lambda_inv_sqrt * m * &lambda_inv_sqrt)))
        .collect())
}

/// Σ_j Σ_k f_jk log p_jk
fn log_likelihood(frequencies: &[Vec<f64>], states: &[DensityMatrix], elements: &[Operator]) -> f64 {
    states
        .iter()
        .zip(frequencies.iter())
        .map(|(rho, row)| {
            elements
                .iter()
                .zip(row.iter())
                .filter(|(_, f)| **f > 0.0)
                .map(|(e, f)| f * rho.expectation(e).max(PROBABILITY_FLOOR).ln())
                .sum::<f64>()
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration_states::default_calibration;
    use approx::assert_abs_diff_eq;
    use emqst_core::povm::PauliBasis;

    fn depolarized_z(p: f64) -> Povm {
        let z = PauliBasis::Z.povm();
        z.map_elements(|e| {
            linalg::scale(e, 1.0 - p) + linalg::scale(&linalg::identity(2), p * 0.5 * linalg::real_trace(e))
        })
        .unwrap()
    }

    #[test]
    fn test_true_povm_is_fixed_point() {
        let states = default_calibration(1).unwrap();
        let truth = depolarized_z(0.2);
        let freqs = states.born_table(&truth);
        let fit = DeviceTomography::default()
            .reconstruct_povm(&freqs, states.states(), &truth)
            .unwrap();
        assert!(fit.converged);
        assert_abs_diff_eq!(fit.povm.distance(&truth).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_recovers_from_nominal_guess() {
        let states = default_calibration(1).unwrap();
        let truth = depolarized_z(0.2);
        let freqs = states.born_table(&truth);
        let fit = DeviceTomography::new(20_000, 1e-12)
            .reconstruct_povm(&freqs, states.states(), &PauliBasis::Z.povm())
            .unwrap();
        assert!(fit.povm.distance(&truth).unwrap() < 1e-3);
    }

    #[test]
    fn test_simulated_data_shape() {
        let states = default_calibration(1).unwrap();
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let data = CalibrationData::simulate(&ops, &states, 100, 3).unwrap();
        assert_eq!(data.num_povms(), 3);
        assert_eq!(data.shots_per_state(), Some(100));
        for i in 0..3 {
            for row in data.povm_frequencies(i).unwrap() {
                assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            }
        }
        let again = CalibrationData::simulate(&ops, &states, 100, 3).unwrap();
        assert_eq!(data, again);
    }

    #[test]
    fn test_from_counts() {
        let counts = vec![vec![vec![30, 70], vec![50, 50]]];
        let data = CalibrationData::from_counts(&counts).unwrap();
        assert_abs_diff_eq!(data.povm_frequencies(0).unwrap()[0][1], 0.7, epsilon = 1e-12);
        assert!(CalibrationData::from_counts(&[vec![vec![0, 0]]]).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let states = default_calibration(1).unwrap();
        let one = MeasurementOperatorSet::pauli(1).unwrap();
        let data = CalibrationData::exact(&one, &states).unwrap();
        let two = MeasurementOperatorSet::pauli(2).unwrap();
        let two_states = default_calibration(2).unwrap();
        assert!(DeviceTomography::default()
            .reconstruct(&data, &two_states, &two)
            .is_err());
    }
}
