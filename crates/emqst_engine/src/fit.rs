//! Power-law convergence fit
//!
//! Gantree: L4_Integration → PowerLawFit
//!
//! Levenberg-Marquardt least squares for `f(n) = a·n^b` on a mean
//! infidelity curve, with shots indexed from `n = 1`. The first
//! `window_start` points are a transient and are excluded.

use emqst_core::constants::fitting::{
    CLUSTER_CORE_THRESHOLD, COST_TOL, FIT_WINDOW_START, INITIAL_GUESS, MAX_ITERATIONS,
    PLOT_CUTOFF, STEP_TOL,
};
use emqst_core::error::{EmqstError, EmqstResult};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Damping bounds for the Marquardt parameter
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e16;

// ============================================================================
// FitSettings
// ============================================================================

/// Fit and plot settings
/// Gantree: FitSettings // 곡선 맞춤 설정
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSettings {
    /// Shots excluded from the fit
    pub window_start: usize,
    /// Points skipped on the plot
    pub plot_cutoff: usize,
    /// Runs with this many cores or more skip fitting and plotting
    pub cluster_threshold: usize,
    /// Starting (a, b)
    pub initial_guess: (f64, f64),
    /// Iteration cap
    pub max_iterations: usize,
    /// Relative step tolerance
    pub step_tolerance: f64,
    /// Relative cost-reduction tolerance
    pub cost_tolerance: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            window_start: FIT_WINDOW_START,
            plot_cutoff: PLOT_CUTOFF,
            cluster_threshold: CLUSTER_CORE_THRESHOLD,
            initial_guess: INITIAL_GUESS,
            max_iterations: MAX_ITERATIONS,
            step_tolerance: STEP_TOL,
            cost_tolerance: COST_TOL,
        }
    }
}

impl FitSettings {
    /// Set the transient window
    pub fn with_window_start(mut self, window_start: usize) -> Self {
        self.window_start = window_start;
        self
    }

    /// Check parameters
    pub fn validate(&self) -> EmqstResult<()> {
        if self.max_iterations == 0 {
            return Err(EmqstError::InvalidParameter(
                "fit iteration cap must be at least 1".into(),
            ));
        }
        if self.cluster_threshold == 0 {
            return Err(EmqstError::InvalidParameter(
                "cluster threshold must be at least 1".into(),
            ));
        }
        if !(self.step_tolerance > 0.0 && self.cost_tolerance > 0.0) {
            return Err(EmqstError::InvalidParameter(
                "fit tolerances must be positive".into(),
            ));
        }
        let (a, b) = self.initial_guess;
        if !(a.is_finite() && b.is_finite()) {
            return Err(EmqstError::InvalidParameter(
                "fit initial guess must be finite".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// PowerLawFit
// ============================================================================

/// Fitted `a·n^b`
/// Gantree: PowerLawFit // 멱법칙 맞춤
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawFit {
    /// Prefactor
    pub a: f64,
    /// Exponent
    pub b: f64,
    /// Whether a stopping criterion was met before the cap
    pub converged: bool,
    /// Iterations used
    pub iterations: usize,
    /// Half the residual sum of squares
    pub cost: f64,
    /// Points included in the fit
    pub points: usize,
}

impl PowerLawFit {
    /// Model value at shot count `n`
    pub fn evaluate(&self, n: f64) -> f64 {
        self.a * n.powf(self.b)
    }
}

impl std::fmt::Display for PowerLawFit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4e}·n^{:.4}", self.a, self.b)
    }
}

/// Fits of both mean curves; `None` where fitting was skipped
/// Gantree: TrackFits // 트랙별 맞춤
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFits {
    /// Fit of the corrected curve
    pub corrected: Option<PowerLawFit>,
    /// Fit of the uncorrected curve
    pub uncorrected: Option<PowerLawFit>,
}

/// Fit `a·n^b` to `curve[window_start..]`
/// Gantree: fit_power_law(curve,settings) -> Result<PowerLawFit> // curve_fit
///
/// Fails with `InsufficientData` when fewer than two points lie past the
/// transient window. Hitting the iteration cap is not an error: the best
/// parameters come back with `converged = false`.
pub fn fit_power_law(curve: &[f64], settings: &FitSettings) -> EmqstResult<PowerLawFit> {
    settings.validate()?;
    if curve.len() < settings.window_start + 2 {
        return Err(EmqstError::InsufficientData {
            needed: settings.window_start + 2,
            available: curve.len(),
        });
    }

    let points: Vec<(f64, f64)> = curve
        .iter()
        .enumerate()
        .skip(settings.window_start)
        .map(|(i, &y)| ((i + 1) as f64, y))
        .collect();
    if points.iter().any(|(_, y)| !y.is_finite()) {
        return Err(EmqstError::InvalidParameter(
            "curve contains non-finite values".into(),
        ));
    }

    let mut params = Vector2::new(settings.initial_guess.0, settings.initial_guess.1);
    let mut cost = half_sse(&points, &params);
    let mut lambda = LAMBDA_INIT;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < settings.max_iterations {
        iterations += 1;
        let (jtj, jtr) = normal_equations(&points, &params);
        let damped = jtj + Matrix2::from_diagonal(&jtj.diagonal()) * lambda;

        let step = match damped.try_inverse() {
            Some(inv) => -(inv * jtr),
            None => {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            }
        };

        let candidate = params + step;
        let candidate_cost = half_sse(&points, &candidate);
        if candidate_cost.is_finite() && candidate_cost < cost {
            let reduction = (cost - candidate_cost) / cost.max(f64::MIN_POSITIVE);
            let small_step =
                step.norm() <= settings.step_tolerance * (params.norm() + settings.step_tolerance);
            params = candidate;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(f64::EPSILON);
            if small_step || reduction < settings.cost_tolerance {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // no descent direction left at machine precision
                converged = true;
                break;
            }
        }
    }

    if !converged {
        log::warn!(
            "Power-law fit hit the iteration cap ({}); using best parameters a={:.4e}, b={:.4}",
            settings.max_iterations,
            params[0],
            params[1]
        );
    }

    Ok(PowerLawFit {
        a: params[0],
        b: params[1],
        converged,
        iterations,
        cost,
        points: points.len(),
    })
}

fn half_sse(points: &[(f64, f64)], params: &Vector2<f64>) -> f64 {
    0.5 * points
        .iter()
        .map(|&(n, y)| {
            let r = params[0] * n.powf(params[1]) - y;
            r * r
        })
        .sum::<f64>()
}

/// (JᵀJ, Jᵀr) for the residuals a·n^b − y
fn normal_equations(points: &[(f64, f64)], params: &Vector2<f64>) -> (Matrix2<f64>, Vector2<f64>) {
    let (a, b) = (params[0], params[1]);
    points.iter().fold(
        (Matrix2::zeros(), Vector2::zeros()),
        |(jtj, jtr), &(n, y)| {
            let nb = n.powf(b);
            let j = Vector2::new(nb, a * nb * n.ln());
            let r = a * nb - y;
            (jtj + j * j.transpose(), jtr + j * r)
        },
    )
}
