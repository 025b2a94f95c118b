//! Benchmark configuration
//!
//! Gantree: L4_Integration → BenchmarkConfig
//!
//! Everything one benchmark invocation needs besides its true-state
//! ensemble: budgets, noise, estimator, parallelism and output location.

use crate::fit::FitSettings;
use emqst_calibration::DeviceTomography;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_noise::{NoiseMode, NoiseModel};
use emqst_qst::{BmeEstimator, Estimator, EstimatorKind, MleEstimator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Worker count used by the presets
pub const DEFAULT_CORES: usize = 4;

/// Results root used by the presets
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Benchmark configuration
/// Gantree: BenchmarkConfig // 벤치마크 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    // ========================================================================
    // Core Parameters
    // ========================================================================
    /// Number of qubits
    pub num_qubits: usize,

    /// QST shots per true state (trajectory length)
    pub qst_shots: usize,

    /// Calibration shots per (POVM, calibration state); 0 disables calibration
    pub calibration_shots: u64,

    /// State estimator for both tracks
    pub estimator: EstimatorKind,

    // ========================================================================
    // Noise Parameters
    // ========================================================================
    /// Synthetic measurement noise
    pub noise: NoiseModel,

    /// Use measured (hardware) outcomes instead of simulation; forces noise off
    pub experimental: bool,

    /// Calibrate from expected frequencies instead of sampled counts
    pub exact_calibration: bool,

    // ========================================================================
    // Execution Parameters
    // ========================================================================
    /// Worker threads for calibration and estimation
    pub num_cores: usize,

    /// Master seed; drawn from entropy when absent
    pub seed: Option<u64>,

    /// Parent directory of per-run result directories
    pub results_dir: PathBuf,

    // ========================================================================
    // Algorithm Settings
    // ========================================================================
    /// Device tomography budget
    pub tomography: DeviceTomography,

    /// MLE budget
    pub mle: MleEstimator,

    /// BME sampler settings
    pub bme: BmeEstimator,

    /// Power-law fit and plot settings
    pub fit: FitSettings,

    // ========================================================================
    // Caller Metadata
    // ========================================================================
    /// Opaque caller settings persisted as `experimental_settings`
    pub experimental_settings: serde_json::Value,
}

impl BenchmarkConfig {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Single-qubit depolarizing benchmark
    /// Gantree: single_qubit() -> Self // 기본 1큐비트
    pub fn single_qubit() -> Self {
        Self {
            num_qubits: 1,
            qst_shots: 10_000,
            calibration_shots: 10_000,
            estimator: EstimatorKind::Bme,
            noise: NoiseModel::new(NoiseMode::Depolarizing),
            experimental: false,
            exact_calibration: false,
            num_cores: DEFAULT_CORES,
            seed: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            tomography: DeviceTomography::default(),
            mle: MleEstimator::default(),
            bme: BmeEstimator::default(),
            fit: FitSettings::default(),
            experimental_settings: serde_json::Value::Null,
        }
    }

    /// Small budgets for smoke runs
    pub fn quick(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            qst_shots: 256,
            calibration_shots: 2_000,
            estimator: EstimatorKind::Mle,
            ..Self::single_qubit()
        }
    }

    /// Reproducible benchmark (fixed seed)
    pub fn benchmark(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            qst_shots: 10_000,
            calibration_shots: 100_000,
            seed: Some(42),
            ..Self::single_qubit()
        }
    }

    /// No noise, no calibration
    pub fn ideal(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            calibration_shots: 0,
            noise: NoiseModel::ideal(),
            ..Self::single_qubit()
        }
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set qubit count
    pub fn with_qubits(mut self, num_qubits: usize) -> Self {
        self.num_qubits = num_qubits;
        self
    }

    /// Set QST shots per state
    pub fn with_qst_shots(mut self, shots: usize) -> Self {
        self.qst_shots = shots;
        self
    }

    /// Set calibration shots per pair
    pub fn with_calibration_shots(mut self, shots: u64) -> Self {
        self.calibration_shots = shots;
        self
    }

    /// Set estimator
    pub fn with_estimator(mut self, estimator: EstimatorKind) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set noise model
    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        self
    }

    /// Set noise mode with default strengths
    pub fn with_noise_mode(mut self, mode: NoiseMode) -> Self {
        self.noise = NoiseModel::new(mode);
        self
    }

    /// Enable or disable experimental (measured) data
    pub fn with_experimental(mut self, experimental: bool) -> Self {
        self.experimental = experimental;
        self
    }

    /// Calibrate from expected frequencies
    pub fn with_exact_calibration(mut self, exact: bool) -> Self {
        self.exact_calibration = exact;
        self
    }

    /// Set worker count
    pub fn with_cores(mut self, num_cores: usize) -> Self {
        self.num_cores = num_cores;
        self
    }

    /// Set master seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set results root
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set tomography budget
    pub fn with_tomography(mut self, tomography: DeviceTomography) -> Self {
        self.tomography = tomography;
        self
    }

    /// Set MLE budget
    pub fn with_mle(mut self, mle: MleEstimator) -> Self {
        self.mle = mle;
        self
    }

    /// Set BME sampler
    pub fn with_bme(mut self, bme: BmeEstimator) -> Self {
        self.bme = bme;
        self
    }

    /// Set fit settings
    pub fn with_fit(mut self, fit: FitSettings) -> Self {
        self.fit = fit;
        self
    }

    /// Attach caller settings
    pub fn with_experimental_settings(mut self, settings: serde_json::Value) -> Self {
        self.experimental_settings = settings;
        self
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Configured estimator for both tracks
    pub fn to_estimator(&self) -> Estimator {
        match self.estimator {
            EstimatorKind::Mle => Estimator::Mle(self.mle),
            EstimatorKind::Bme => Estimator::Bme(self.bme),
        }
    }

    /// Noise actually injected (none in experimental mode)
    pub fn effective_noise(&self) -> NoiseModel {
        if self.experimental {
            NoiseModel::ideal()
        } else {
            self.noise.clone()
        }
    }

    /// Whether mean curves are fitted and plotted
    ///
    /// Only for BME below the cluster threshold.
    pub fn fits_enabled(&self) -> bool {
        self.estimator == EstimatorKind::Bme && self.num_cores < self.fit.cluster_threshold
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration
    /// Gantree: validate() -> Result<()> // 설정 검증
    pub fn validate(&self) -> EmqstResult<()> {
        if self.num_qubits == 0 {
            return Err(EmqstError::InvalidParameter("qubits must be at least 1".into()));
        }
        if self.qst_shots == 0 {
            return Err(EmqstError::InvalidParameter(
                "QST shots must be at least 1".into(),
            ));
        }
        if self.num_cores == 0 {
            return Err(EmqstError::InvalidParameter(
                "core count must be at least 1".into(),
            ));
        }
        if self.results_dir.as_os_str().is_empty() {
            return Err(EmqstError::InvalidParameter(
                "results directory must not be empty".into(),
            ));
        }

        self.noise.validate()?;
        if !self.experimental {
            self.noise.check_supported(self.num_qubits)?;
        }

        if self.tomography.max_iterations == 0 || !(self.tomography.tolerance > 0.0) {
            return Err(EmqstError::InvalidParameter(
                "tomography needs a positive iteration cap and tolerance".into(),
            ));
        }
        if self.mle.iterations_per_shot == 0 {
            return Err(EmqstError::InvalidParameter(
                "MLE needs at least one iteration per shot".into(),
            ));
        }
        self.bme.validate()?;
        self.fit.validate()?;
        Ok(())
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self::single_qubit()
    }
}

impl fmt::Display for BenchmarkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BenchmarkConfig({}Q, {} QST shots, {} calibration shots, {}, noise {}{}, {} cores)",
            self.num_qubits,
            self.qst_shots,
            self.calibration_shots,
            self.estimator,
            self.noise.mode(),
            if self.experimental { " [experimental]" } else { "" },
            self.num_cores
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(BenchmarkConfig::single_qubit().validate().is_ok());
        assert!(BenchmarkConfig::quick(2).validate().is_ok());
        assert!(BenchmarkConfig::benchmark(1).validate().is_ok());
        assert!(BenchmarkConfig::ideal(3).validate().is_ok());
        assert_eq!(BenchmarkConfig::benchmark(1).seed, Some(42));
        assert_eq!(BenchmarkConfig::ideal(1).calibration_shots, 0);
    }

    #[test]
    fn test_builder_chain() {
        let config = BenchmarkConfig::quick(1)
            .with_qst_shots(512)
            .with_calibration_shots(0)
            .with_estimator(EstimatorKind::Bme)
            .with_cores(2)
            .with_seed(7)
            .with_results_dir("/tmp/emqst");
        assert_eq!(config.qst_shots, 512);
        assert_eq!(config.calibration_shots, 0);
        assert_eq!(config.to_estimator().kind(), EstimatorKind::Bme);
        assert_eq!(config.seed, Some(7));
        assert!(config.fits_enabled());
        assert!(!config.clone().with_cores(16).fits_enabled());
    }

    #[test]
    fn test_unsupported_multi_qubit_noise() {
        let config = BenchmarkConfig::quick(2).with_noise_mode(NoiseMode::Readout);
        assert!(matches!(
            config.validate(),
            Err(EmqstError::UnsupportedNoise { mode: 3, qubits: 2 })
        ));
        // measured data never gets synthetic noise
        assert!(config.with_experimental(true).validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BenchmarkConfig::quick(0).validate().is_err());
        assert!(BenchmarkConfig::quick(1).with_cores(0).validate().is_err());
        assert!(BenchmarkConfig::quick(1).with_qst_shots(0).validate().is_err());
        assert!(BenchmarkConfig::quick(1)
            .with_tomography(DeviceTomography::new(0, 1e-10))
            .validate()
            .is_err());
    }

    #[test]
    fn test_experimental_disables_noise() {
        let config = BenchmarkConfig::single_qubit().with_experimental(true);
        assert!(config.effective_noise().mode().is_none());
        assert_eq!(
            BenchmarkConfig::single_qubit().effective_noise().mode(),
            NoiseMode::Depolarizing
        );
    }

    #[test]
    fn test_display_and_serde() {
        let config = BenchmarkConfig::quick(1).with_seed(3);
        assert!(config.to_string().contains("1Q"));
        let json = serde_json::to_string(&config).unwrap();
        let back: BenchmarkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, Some(3));
        assert_eq!(back.qst_shots, config.qst_shots);
        assert_eq!(back.estimator, config.estimator);
        assert_eq!(back.noise.mode(), config.noise.mode());
    }
}
