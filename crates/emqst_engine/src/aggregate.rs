//! Ensemble averaging
//!
//! Gantree: L4_Integration → AggregateResult
//!
//! Element-wise mean of per-state infidelity trajectories, one mean curve
//! per track, indexed by shot count.

use emqst_core::error::{EmqstError, EmqstResult};
use emqst_qst::TrackResult;
use serde::{Deserialize, Serialize};

/// Element-wise mean over trajectories
/// Gantree: mean_curve(trajectories) -> Result<Vec<f64>> // 평균 곡선
pub fn mean_curve(trajectories: &[Vec<f64>]) -> EmqstResult<Vec<f64>> {
    let first = trajectories.first().ok_or(EmqstError::EmptyEnsemble)?;
    let len = first.len();
    if let Some(bad) = trajectories.iter().find(|t| t.len() != len) {
        return Err(EmqstError::DimensionMismatch {
            expected: len,
            found: bad.len(),
        });
    }

    let count = trajectories.len() as f64;
    let mut mean = vec![0.0; len];
    for trajectory in trajectories {
        for (m, x) in mean.iter_mut().zip(trajectory) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= count);
    Ok(mean)
}

/// Mean convergence curves of both tracks
/// Gantree: AggregateResult // 앙상블 평균
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Mean infidelity with reconstructed operators
    pub corrected_mean: Vec<f64>,
    /// Mean infidelity with nominal operators
    pub uncorrected_mean: Vec<f64>,
    /// True states averaged over
    pub ensemble_size: usize,
}

impl AggregateResult {
    /// Average both tracks
    pub fn from_tracks(corrected: &TrackResult, uncorrected: &TrackResult) -> EmqstResult<Self> {
        let corrected_mean = mean_curve(&corrected.infidelity)?;
        let uncorrected_mean = mean_curve(&uncorrected.infidelity)?;
        if corrected_mean.len() != uncorrected_mean.len() {
            return Err(EmqstError::DimensionMismatch {
                expected: corrected_mean.len(),
                found: uncorrected_mean.len(),
            });
        }
        Ok(Self {
            corrected_mean,
            uncorrected_mean,
            ensemble_size: corrected.num_states(),
        })
    }

    /// Shots per curve
    pub fn shots(&self) -> usize {
        self.corrected_mean.len()
    }

    /// Mean of each curve over shots `from..`, (corrected, uncorrected)
    pub fn tail_means(&self, from: usize) -> Option<(f64, f64)> {
        let tail = |curve: &[f64]| {
            let tail = curve.get(from..).filter(|t| !t.is_empty())?;
            Some(tail.iter().sum::<f64>() / tail.len() as f64)
        };
        Some((tail(&self.corrected_mean)?, tail(&self.uncorrected_mean)?))
    }

    /// Final mean infidelities, (corrected, uncorrected)
    pub fn final_means(&self) -> Option<(f64, f64)> {
        Some((
            *self.corrected_mean.last()?,
            *self.uncorrected_mean.last()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_elementwise_mean() {
        let mean = mean_curve(&[vec![1.0, 0.5], vec![0.0, 0.25]]).unwrap();
        assert_eq!(mean, vec![0.5, 0.375]);
    }

    #[test]
    fn test_empty_ensemble() {
        assert!(matches!(mean_curve(&[]), Err(EmqstError::EmptyEnsemble)));
    }

    #[test]
    fn test_ragged_rejected() {
        assert!(mean_curve(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_order_invariance() {
        let a = vec![vec![0.3, 0.1, 0.07], vec![0.9, 0.2, 0.01], vec![0.11, 0.6, 0.4]];
        let b = vec![a[2].clone(), a[0].clone(), a[1].clone()];
        let (ma, mb) = (mean_curve(&a).unwrap(), mean_curve(&b).unwrap());
        for (x, y) in ma.iter().zip(&mb) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_tail_means() {
        let agg = AggregateResult {
            corrected_mean: vec![1.0, 0.2, 0.1],
            uncorrected_mean: vec![1.0, 0.4, 0.3],
            ensemble_size: 2,
        };
        let (c, u) = agg.tail_means(1).unwrap();
        assert_abs_diff_eq!(c, 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(u, 0.35, epsilon = 1e-12);
        assert!(agg.tail_means(3).is_none());
        assert_eq!(agg.final_means(), Some((0.1, 0.3)));
    }
}
