//! Maximum-likelihood state estimation
//!
//! Gantree: L3_Estimation → MleEstimator
//!
//! Per-shot RρR iteration: after every new shot the estimate is refined by
//! `ρ ← R ρ R / Tr(R ρ R)` with `R = Σ n_jk / p_jk E_jk`, warm-started from
//! the previous shot's estimate.

use crate::estimator::Trajectory;
use crate::outcomes::{CountTable, OutcomeRecord};
use emqst_core::constants::estimation::{MLE_ITERATIONS_PER_SHOT, MLE_TOLERANCE};
use emqst_core::constants::numerics::PROBABILITY_FLOOR;
use emqst_core::density::DensityMatrix;
use emqst_core::error::EmqstResult;
use emqst_core::linalg::{self, Operator};
use emqst_core::povm::MeasurementOperatorSet;
use serde::{Deserialize, Serialize};

/// RρR maximum-likelihood estimator
/// Gantree: MleEstimator // 최대우도 추정
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MleEstimator {
    /// Iteration cap after each shot
    pub iterations_per_shot: usize,
    /// Stop when the Frobenius change drops below this
    pub tolerance: f64,
}

impl Default for MleEstimator {
    fn default() -> Self {
        Self {
            iterations_per_shot: MLE_ITERATIONS_PER_SHOT,
            tolerance: MLE_TOLERANCE,
        }
    }
}

impl MleEstimator {
    /// Create with explicit budget
    pub fn new(iterations_per_shot: usize, tolerance: f64) -> Self {
        Self {
            iterations_per_shot,
            tolerance,
        }
    }

    /// Estimate along one outcome record
    /// Gantree: estimate(ops,record,truth) -> Result<Trajectory> // estimate_mle
    pub fn estimate(
        &self,
        operators: &MeasurementOperatorSet,
        record: &OutcomeRecord,
        true_state: &DensityMatrix,
    ) -> EmqstResult<Trajectory> {
        let mut counts = CountTable::new(operators);
        let mut rho = linalg::scale(
            &linalg::identity(operators.dim()),
            1.0 / operators.dim() as f64,
        );
        let mut infidelity = Vec::with_capacity(record.len());
        let mut estimate = DensityMatrix::maximally_mixed(operators.dim());

        for shot in record.iter() {
            counts.add(shot);
            for _ in 0..self.iterations_per_shot {
                let next = rrr_step(operators, &counts, &rho);
                let change = linalg::frobenius_norm(&(&next - &rho));
                rho = next;
                if change < self.tolerance {
                    break;
                }
            }
            estimate = DensityMatrix::from_unnormalized(&rho)?;
            infidelity.push(estimate.infidelity(true_state));
        }

        Ok(Trajectory {
            infidelity,
            estimate,
        })
    }

    /// Fully converged estimate from a fixed count table
    pub fn estimate_from_counts(
        &self,
        operators: &MeasurementOperatorSet,
        counts: &CountTable,
        max_iterations: usize,
    ) -> EmqstResult<DensityMatrix> {
        let mut rho = linalg::scale(
            &linalg::identity(operators.dim()),
            1.0 / operators.dim() as f64,
        );
        for _ in 0..max_iterations {
            let next = rrr_step(operators, counts, &rho);
            let change = linalg::frobenius_norm(&(&next - &rho));
            rho = next;
            if change < self.tolerance {
                break;
            }
        }
        DensityMatrix::from_unnormalized(&rho)
    }
}

/// ρ → RρR / Tr(RρR)
fn rrr_step(operators: &MeasurementOperatorSet, counts: &CountTable, rho: &Operator) -> Operator {
    let dim = rho.nrows();
    let mut r = Operator::zeros(dim, dim);
    for (j, k, n) in counts.nonzero() {
        if let Some(e) = operators.get(j).and_then(|p| p.element(k)) {
            let p = linalg::trace_product(rho, e).max(PROBABILITY_FLOOR);
            r += linalg::scale(e, n as f64 / p);
        }
    }
    // rounding in RρR grows negative eigenvalues on near-pure estimates
    let next = linalg::psd_projection(&(&r * rho * &r));
    let tr = linalg::real_trace(&next);
    if tr > 0.0 && tr.is_finite() {
        linalg::scale(&next, 1.0 / tr)
    } else {
        rho.clone()
    }
}
