//! Constants for EMQST
//!
//! Gantree: L0_Foundation → Constants
//!
//! Numerical tolerances, default noise strengths, estimator budgets, and
//! curve-fitting windows used across the benchmark.

// ============================================================================
// Numerical Tolerances
// Gantree: numerics // 수치 허용오차
// ============================================================================

pub mod numerics {
    //! Tolerances for validating quantum objects

    /// Tolerance for trace and completeness checks
    pub const VALIDATION_TOL: f64 = 1e-8;

    /// Smallest eigenvalue still treated as non-negative
    pub const PSD_TOL: f64 = 1e-9;

    /// Floor applied to outcome probabilities before division or log
    pub const PROBABILITY_FLOOR: f64 = 1e-12;
}

// ============================================================================
// Noise Constants
// Gantree: noise // 합성 노이즈 기본값
// ============================================================================

pub mod noise {
    //! Default strengths of the synthetic measurement noise channels

    /// Depolarizing strength p in E' = (1-p) E + p Tr(E)/d I
    pub const DEFAULT_DEPOLARIZING: f64 = 0.1;

    /// Coherent over-rotation about the y-axis (radians)
    pub const DEFAULT_ROTATION_RAD: f64 = std::f64::consts::PI / 8.0;

    /// Probability of reading 1 when the ideal outcome is 0
    pub const DEFAULT_READOUT_P01: f64 = 0.05;

    /// Probability of reading 0 when the ideal outcome is 1
    pub const DEFAULT_READOUT_P10: f64 = 0.12;

    /// Amplitude damping rate gamma
    pub const DEFAULT_DAMPING: f64 = 0.15;
}

// ============================================================================
// Calibration Constants
// Gantree: calibration // 장치 토모그래피
// ============================================================================

pub mod calibration {
    //! Device tomography iteration budget

    /// Iteration cap for the POVM fixed-point reconstruction
    pub const MAX_ITERATIONS: usize = 5_000;

    /// Maximum element-wise Frobenius change treated as converged
    pub const TOLERANCE: f64 = 1e-10;
}

// ============================================================================
// Estimation Constants
// Gantree: estimation // 상태 추정
// ============================================================================

pub mod estimation {
    //! Per-shot estimator budgets

    /// RρR iterations allowed per new shot (warm-started)
    pub const MLE_ITERATIONS_PER_SHOT: usize = 25;

    /// RρR stopping tolerance (Frobenius change)
    pub const MLE_TOLERANCE: f64 = 1e-9;

    /// Number of BME particles
    pub const BME_PARTICLES: usize = 500;

    /// Resample when ESS / particles drops below this fraction
    pub const BME_RESAMPLE_FRACTION: f64 = 0.5;

    /// Metropolis-Hastings moves per particle after resampling
    pub const BME_MH_STEPS: usize = 3;

    /// Gaussian random-walk scale on the Ginibre parameters
    pub const BME_PROPOSAL_SCALE: f64 = 0.1;
}

// ============================================================================
// Fitting Constants
// Gantree: fitting // 멱법칙 피팅
// ============================================================================

pub mod fitting {
    //! Power-law fit of mean infidelity curves

    /// Shots excluded from the fit as initial transient
    pub const FIT_WINDOW_START: usize = 1000;

    /// Points skipped when plotting
    pub const PLOT_CUTOFF: usize = 10;

    /// Core count at or above which a run is treated as a cluster job (no plotting)
    pub const CLUSTER_CORE_THRESHOLD: usize = 10;

    /// Initial guess (a, b) for f(n) = a n^b
    pub const INITIAL_GUESS: (f64, f64) = (1.0, -0.5);

    /// Levenberg-Marquardt iteration cap
    pub const MAX_ITERATIONS: usize = 500;

    /// Relative step tolerance
    pub const STEP_TOL: f64 = 1e-10;

    /// Relative cost-reduction tolerance
    pub const COST_TOL: f64 = 1e-14;
}

// ============================================================================
// Tests
// ============================================================================
