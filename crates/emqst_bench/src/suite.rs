//! Benchmark suite for EMQST
//!
//! Gantree: L5_Benchmark → BenchSuite
//!
//! Sweeps the noise-corrected QST benchmark over noise modes, shot budgets
//! and estimators, collecting one summary row per run.

use crate::generators::EnsembleGenerator;
use emqst_core::error::EmqstResult;
use emqst_engine::{run_benchmark, BenchmarkConfig, BenchmarkOutcome};
use emqst_noise::NoiseMode;
use emqst_qst::EstimatorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Fraction of the shot budget averaged for the tail comparison
const TAIL_FRACTION: f64 = 0.25;

/// Single benchmark result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Benchmark name
    pub name: String,

    /// Number of qubits
    pub qubits: usize,

    /// Noise mode
    pub noise: NoiseMode,

    /// Estimator
    pub estimator: EstimatorKind,

    /// QST shots per true state
    pub shots: usize,

    /// Calibration shots per calibration state
    pub calibration_shots: u64,

    /// True states averaged over
    pub ensemble_size: usize,

    /// Largest reconstructed-vs-noisy POVM distance
    pub calibration_distance: f64,

    /// Mean corrected infidelity over the last quarter of shots
    pub corrected_tail: f64,

    /// Mean uncorrected infidelity over the last quarter of shots
    pub uncorrected_tail: f64,

    /// Relative tail reduction from calibration, in percent
    pub improvement_percent: f64,

    /// Fitted corrected exponent
    pub corrected_exponent: Option<f64>,

    /// Fitted uncorrected exponent
    pub uncorrected_exponent: Option<f64>,

    /// Master seed of the run
    pub seed: u64,

    /// Execution time (milliseconds)
    pub time_ms: u64,

    /// Run directory
    pub run_dir: PathBuf,
}

impl BenchmarkResult {
    /// Create from a benchmark outcome
    pub fn from_outcome(
        name: &str,
        config: &BenchmarkConfig,
        outcome: &BenchmarkOutcome,
        time_ms: u64,
    ) -> Self {
        let shots = outcome.aggregate.shots();
        let from = shots - ((shots as f64 * TAIL_FRACTION).ceil() as usize).min(shots);
        let (corrected_tail, uncorrected_tail) = outcome
            .aggregate
            .tail_means(from)
            .unwrap_or((f64::NAN, f64::NAN));
        let improvement_percent = if uncorrected_tail > 0.0 {
            (uncorrected_tail - corrected_tail) / uncorrected_tail * 100.0
        } else {
            0.0
        };
        let (corrected_exponent, uncorrected_exponent) = outcome.exponents();

        Self {
            name: name.to_string(),
            qubits: config.num_qubits,
            noise: config.effective_noise().mode(),
            estimator: config.estimator,
            shots,
            calibration_shots: config.calibration_shots,
            ensemble_size: outcome.aggregate.ensemble_size,
            calibration_distance: outcome.calibration.max_distance,
            corrected_tail,
            uncorrected_tail,
            improvement_percent,
            corrected_exponent,
            uncorrected_exponent,
            seed: outcome.seed,
            time_ms,
            run_dir: outcome.run_dir.clone(),
        }
    }
}

/// Benchmark suite
/// Gantree: BenchSuite // 벤치마크 스위트
pub struct BenchSuite {
    /// Base seed for reproducibility
    seed: u64,

    /// True states per run
    ensemble_size: usize,

    /// Results root for every run
    results_dir: PathBuf,

    /// Worker threads per run
    cores: usize,

    /// Results
    results: Vec<BenchmarkResult>,
}

impl BenchSuite {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create new benchmark suite
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Create with seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ensemble_size: 10,
            results_dir: PathBuf::from(emqst_engine::config::DEFAULT_RESULTS_DIR),
            cores: emqst_engine::config::DEFAULT_CORES,
            results: Vec::new(),
        }
    }

    /// Set true states per run
    pub fn with_ensemble_size(mut self, size: usize) -> Self {
        self.ensemble_size = size;
        self
    }

    /// Set results root
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set worker threads per run
    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    // ========================================================================
    // Individual Benchmarks
    // ========================================================================

    /// Run one benchmark on a seeded Haar ensemble
    ///
    /// The suite's seed, results root and core count override the config's.
    pub fn bench(&mut self, name: &str, config: BenchmarkConfig) -> EmqstResult<BenchmarkResult> {
        let config = config
            .with_seed(self.seed)
            .with_cores(self.cores)
            .with_results_dir(&self.results_dir);
        log::info!("Running benchmark: {} ({})", name, config);

        let ensemble =
            EnsembleGenerator::with_seed(self.seed).haar(config.num_qubits, self.ensemble_size)?;

        let start = Instant::now();
        let outcome = run_benchmark(config.clone(), ensemble, None, None)?;
        let time_ms = start.elapsed().as_millis() as u64;

        let result = BenchmarkResult::from_outcome(name, &config, &outcome, time_ms);
        self.results.push(result.clone());
        Ok(result)
    }

    // ========================================================================
    // Benchmark Suites
    // ========================================================================

    /// Sweep noise modes at a fixed shot budget
    pub fn run_noise_sweep(
        &mut self,
        qubits: usize,
        modes: &[NoiseMode],
        shots: usize,
    ) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Noise Sweep ({}Q, {} shots) ===", qubits, shots);

        modes
            .iter()
            .map(|&mode| {
                let name = format!("noise_{}", mode.label());
                let config = BenchmarkConfig::quick(qubits)
                    .with_noise_mode(mode)
                    .with_qst_shots(shots);
                self.bench(&name, config)
            })
            .collect()
    }

    /// Sweep QST shot budgets at a fixed noise mode
    pub fn run_shot_sweep(
        &mut self,
        qubits: usize,
        mode: NoiseMode,
        budgets: &[usize],
    ) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Shot Sweep ({}Q, noise {}) ===", qubits, mode);

        budgets
            .iter()
            .map(|&shots| {
                let name = format!("shots_{}", shots);
                let config = BenchmarkConfig::quick(qubits)
                    .with_noise_mode(mode)
                    .with_qst_shots(shots);
                self.bench(&name, config)
            })
            .collect()
    }

    /// Sweep calibration shot budgets at a fixed noise mode
    pub fn run_calibration_sweep(
        &mut self,
        qubits: usize,
        mode: NoiseMode,
        budgets: &[u64],
        shots: usize,
    ) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Calibration Sweep ({}Q, noise {}) ===", qubits, mode);

        budgets
            .iter()
            .map(|&calibration_shots| {
                let name = format!("calibration_{}", calibration_shots);
                let config = BenchmarkConfig::quick(qubits)
                    .with_noise_mode(mode)
                    .with_qst_shots(shots)
                    .with_calibration_shots(calibration_shots);
                self.bench(&name, config)
            })
            .collect()
    }

    /// MLE and BME on the same settings
    pub fn run_estimator_comparison(
        &mut self,
        qubits: usize,
        mode: NoiseMode,
        shots: usize,
    ) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Estimator Comparison ({}Q, {} shots) ===", qubits, shots);

        [EstimatorKind::Mle, EstimatorKind::Bme]
            .into_iter()
            .map(|kind| {
                let name = format!("estimator_{}", kind).to_lowercase();
                let config = BenchmarkConfig::quick(qubits)
                    .with_noise_mode(mode)
                    .with_qst_shots(shots)
                    .with_estimator(kind);
                self.bench(&name, config)
            })
            .collect()
    }

    /// Run full benchmark suite
    pub fn run_all(&mut self) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Running Full Benchmark Suite ===");

        let mut all_results = Vec::new();

        let modes = [
            NoiseMode::None,
            NoiseMode::Depolarizing,
            NoiseMode::Rotation,
            NoiseMode::Readout,
            NoiseMode::AmplitudeDamping,
            NoiseMode::RotationDepolarizing,
        ];
        all_results.extend(self.run_noise_sweep(1, &modes, 2_000)?);
        all_results.extend(self.run_shot_sweep(1, NoiseMode::Depolarizing, &[500, 2_000, 5_000])?);
        all_results.extend(self.run_calibration_sweep(
            1,
            NoiseMode::Readout,
            &[100, 1_000, 10_000],
            2_000,
        )?);
        all_results.extend(self.run_estimator_comparison(1, NoiseMode::Depolarizing, 1_000)?);
        all_results.extend(self.run_noise_sweep(2, &[NoiseMode::Depolarizing], 1_000)?);

        Ok(all_results)
    }

    /// Run quick benchmark (for testing)
    pub fn run_quick(&mut self) -> EmqstResult<Vec<BenchmarkResult>> {
        log::info!("=== Running Quick Benchmark ===");

        let mut results = Vec::new();
        for (name, mode) in [
            ("quick_depolarizing", NoiseMode::Depolarizing),
            ("quick_readout", NoiseMode::Readout),
        ] {
            let config = BenchmarkConfig::quick(1)
                .with_noise_mode(mode)
                .with_qst_shots(120)
                .with_calibration_shots(1_000);
            results.push(self.bench(name, config)?);
        }
        Ok(results)
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Get all results
    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    /// Clear results
    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Get statistics
    pub fn statistics(&self) -> BenchmarkStatistics {
        BenchmarkStatistics::from_results(&self.results)
    }
}

impl Default for BenchSuite {
    fn default() -> Self {
        Self::new()
    }
}

/// Benchmark statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStatistics {
    /// Number of benchmarks
    pub count: usize,

    /// Average improvement percentage
    pub avg_improvement_percent: f64,

    /// Maximum improvement percentage
    pub max_improvement_percent: f64,

    /// Minimum improvement percentage
    pub min_improvement_percent: f64,

    /// Average calibration distance
    pub avg_calibration_distance: f64,

    /// Average execution time (ms)
    pub avg_time_ms: f64,

    /// Total execution time (ms)
    pub total_time_ms: u64,

    /// Share of runs where the corrected tail beat the uncorrected one
    pub corrected_win_rate: f64,
}

impl BenchmarkStatistics {
    /// Compute statistics from results
    pub fn from_results(results: &[BenchmarkResult]) -> Self {
        if results.is_empty() {
            return Self {
                count: 0,
                avg_improvement_percent: 0.0,
                max_improvement_percent: 0.0,
                min_improvement_percent: 0.0,
                avg_calibration_distance: 0.0,
                avg_time_ms: 0.0,
                total_time_ms: 0,
                corrected_win_rate: 0.0,
            };
        }

        let count = results.len();
        let improvements: Vec<f64> = results.iter().map(|r| r.improvement_percent).collect();
        let total_time_ms: u64 = results.iter().map(|r| r.time_ms).sum();
        let wins = results
            .iter()
            .filter(|r| r.corrected_tail < r.uncorrected_tail)
            .count();

        Self {
            count,
            avg_improvement_percent: improvements.iter().sum::<f64>() / count as f64,
            max_improvement_percent: improvements
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max),
            min_improvement_percent: improvements.iter().cloned().fold(f64::INFINITY, f64::min),
            avg_calibration_distance: results.iter().map(|r| r.calibration_distance).sum::<f64>()
                / count as f64,
            avg_time_ms: total_time_ms as f64 / count as f64,
            total_time_ms,
            corrected_win_rate: wins as f64 / count as f64,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_results(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("emqst_bench_{}_{}", tag, std::process::id()))
    }

    pub(crate) fn sample_results() -> Vec<BenchmarkResult> {
        let row = |name: &str, noise, corrected_tail, uncorrected_tail, time_ms| BenchmarkResult {
            name: name.to_string(),
            qubits: 1,
            noise,
            estimator: EstimatorKind::Mle,
            shots: 2_000,
            calibration_shots: 10_000,
            ensemble_size: 10,
            calibration_distance: 0.01,
            corrected_tail,
            uncorrected_tail,
            improvement_percent: (uncorrected_tail - corrected_tail) / uncorrected_tail * 100.0,
            corrected_exponent: Some(-0.95),
            uncorrected_exponent: None,
            seed: 42,
            time_ms,
            run_dir: PathBuf::from("results/run"),
        };
        vec![
            row("test1", NoiseMode::Depolarizing, 0.002, 0.004, 100),
            row("test2", NoiseMode::Readout, 0.003, 0.015, 200),
        ]
    }

    #[test]
    fn test_bench_suite_new() {
        let suite = BenchSuite::new();
        assert!(suite.results().is_empty());
    }

    #[test]
    fn test_bench_single() {
        let root = temp_results("single");
        let mut suite = BenchSuite::with_seed(42)
            .with_ensemble_size(2)
            .with_cores(2)
            .with_results_dir(&root);
        let config = BenchmarkConfig::quick(1).with_qst_shots(40);
        let result = suite.bench("test", config).unwrap();

        assert_eq!(result.qubits, 1);
        assert_eq!(result.noise, NoiseMode::Depolarizing);
        assert_eq!(result.shots, 40);
        assert_eq!(result.ensemble_size, 2);
        assert_eq!(result.seed, 42);
        assert!(result.run_dir.starts_with(&root));
        assert_eq!(suite.results().len(), 1);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_noise_sweep() {
        let root = temp_results("noise_sweep");
        let mut suite = BenchSuite::with_seed(1)
            .with_ensemble_size(2)
            .with_results_dir(&root);
        let results = suite
            .run_noise_sweep(1, &[NoiseMode::None, NoiseMode::Rotation], 30)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "noise_none");
        assert_eq!(results[1].noise, NoiseMode::Rotation);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_shot_sweep() {
        let root = temp_results("shot_sweep");
        let mut suite = BenchSuite::with_seed(1)
            .with_ensemble_size(1)
            .with_results_dir(&root);
        let results = suite
            .run_shot_sweep(1, NoiseMode::Depolarizing, &[20, 40])
            .unwrap();

        assert_eq!(results.iter().map(|r| r.shots).collect::<Vec<_>>(), vec![20, 40]);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_unsupported_sweep_fails() {
        let root = temp_results("unsupported");
        let mut suite = BenchSuite::with_seed(1).with_results_dir(&root);
        assert!(suite.run_noise_sweep(2, &[NoiseMode::Readout], 10).is_err());
        assert!(suite.results().is_empty());
    }

    #[test]
    fn test_statistics() {
        let stats = BenchmarkStatistics::from_results(&sample_results());

        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_time_ms, 300);
        assert_eq!(stats.corrected_win_rate, 1.0);
        assert!((stats.max_improvement_percent - 80.0).abs() < 1e-9);
        assert!((stats.min_improvement_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_statistics() {
        let suite = BenchSuite::new();
        let stats = suite.statistics();

        assert_eq!(stats.count, 0);
    }
}
