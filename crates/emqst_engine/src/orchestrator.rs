//! Benchmark orchestration
//!
//! Gantree: L4_Integration → BenchmarkOrchestrator
//!
//! Staged execution of one noise-corrected QST benchmark:
//! prepare → apply_noise → calibrate → generate_data → estimate →
//! aggregate → report. Each stage can be called on its own; missing
//! earlier stages are run first. Outcome data is generated once under the
//! noisy operators and shared by the corrected and uncorrected tracks.

use crate::aggregate::AggregateResult;
use crate::config::BenchmarkConfig;
use crate::experimental::ExperimentalData;
use crate::fit::{fit_power_law, PowerLawFit, TrackFits};
use crate::plot::{plot_infidelities, PLOT_FILE};
use crate::run_context::RunContext;
use emqst_calibration::{
    default_calibration, CalibrationReport, CalibrationResult, CalibrationSource,
    CalibrationStage, CalibrationStateSet,
};
use emqst_core::density::DensityMatrix;
use emqst_core::ensemble::{BlochAngles, TrueStateEnsemble};
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::parallel::worker_pool;
use emqst_core::povm::MeasurementOperatorSet;
use emqst_core::random;
use emqst_noise::{NoiseMode, NoiseModel};
use emqst_qst::{EstimationTrack, MeasurementData, TrackResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// Caller settings artifact
pub const EXPERIMENTAL_SETTINGS: &str = "experimental_settings";
/// Calibration settings artifact
pub const DT_SETTINGS: &str = "DT_settings";
/// True states and QST data settings artifact
pub const QST_SETTINGS: &str = "QST_settings";
/// Raw results artifact
pub const QST_RESULTS: &str = "QST_results";

// ============================================================================
// Stages
// ============================================================================

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Nothing run yet
    Initial,
    /// Config validated, run directory created, nominal operators built
    Prepared,
    /// Noisy operators available
    NoiseApplied,
    /// Reconstructed operators available
    Calibrated,
    /// Shared outcome data available
    DataGenerated,
    /// Both tracks estimated
    Estimated,
    /// Mean curves computed
    Aggregated,
    /// Fits, plot and artifacts written
    Reported,
}

/// Intermediate results of a benchmark run
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// Current stage
    pub stage: PipelineStage,
    /// Resolved master seed
    pub seed: Option<u64>,
    /// Output namespace
    pub context: Option<RunContext>,
    /// Calibration states in use
    pub calibration_states: Option<CalibrationStateSet>,
    /// Ideal Pauli operators
    pub nominal: Option<MeasurementOperatorSet>,
    /// Operators the device actually measures
    pub noisy: Option<MeasurementOperatorSet>,
    /// Device tomography outcome
    pub calibration: Option<CalibrationResult>,
    /// Calibration diagnostics
    pub calibration_report: Option<CalibrationReport>,
    /// Outcome data shared by both tracks
    pub data: Option<MeasurementData>,
    /// Track run with reconstructed operators
    pub corrected: Option<TrackResult>,
    /// Track run with nominal operators
    pub uncorrected: Option<TrackResult>,
    /// Ensemble means
    pub aggregate: Option<AggregateResult>,
    /// Power-law fits
    pub fits: TrackFits,
}

impl PipelineState {
    /// Fresh state
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Initial,
            seed: None,
            context: None,
            calibration_states: None,
            nominal: None,
            noisy: None,
            calibration: None,
            calibration_report: None,
            data: None,
            corrected: None,
            uncorrected: None,
            aggregate: None,
            fits: TrackFits::default(),
        }
    }

    /// Check if calibrated
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_some()
    }

    /// Check if both tracks ran
    pub fn is_estimated(&self) -> bool {
        self.corrected.is_some() && self.uncorrected.is_some()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

fn not_ready(what: &str) -> EmqstError {
    EmqstError::StateNotReady(format!("{} is not available yet", what))
}

// ============================================================================
// Artifacts
// ============================================================================

/// Calibration settings persisted as `DT_settings`
#[derive(Debug, Serialize)]
struct DtSettings<'a> {
    num_qubits: usize,
    calibration_states: &'a CalibrationStateSet,
    calibration_shots: u64,
    nominal_operators: &'a MeasurementOperatorSet,
    reconstructed_operators: &'a MeasurementOperatorSet,
    experimental: bool,
    noise: &'a NoiseModel,
    noisy_operators: &'a MeasurementOperatorSet,
    calibration: &'a CalibrationReport,
    seed: u64,
    config: &'a BenchmarkConfig,
}

/// True states and data settings persisted as `QST_settings`
#[derive(Debug, Serialize)]
struct QstSettings<'a> {
    num_qubits: usize,
    true_states: &'a [DensityMatrix],
    true_state_angles: Option<&'a [Vec<BlochAngles>]>,
    qst_shots: usize,
    noise_mode: NoiseMode,
    experimental: bool,
    seed: u64,
}

/// Raw results persisted as `QST_results`, fields in fixed order
#[derive(Debug, Serialize)]
struct QstResults<'a> {
    corrected_infidelity: &'a [Vec<f64>],
    uncorrected_infidelity: &'a [Vec<f64>],
    corrected_estimates: &'a [DensityMatrix],
    uncorrected_estimates: &'a [DensityMatrix],
}

// ============================================================================
// Outcome
// ============================================================================

/// Everything a completed benchmark produced
/// Gantree: BenchmarkOutcome // 벤치마크 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkOutcome {
    /// Reconstructed-operator track
    pub corrected: TrackResult,
    /// Nominal-operator track
    pub uncorrected: TrackResult,
    /// Ensemble means
    pub aggregate: AggregateResult,
    /// Power-law fits (absent when skipped)
    pub fits: TrackFits,
    /// Calibration diagnostics
    pub calibration: CalibrationReport,
    /// Run directory
    pub run_dir: PathBuf,
    /// Files written
    pub artifacts: Vec<PathBuf>,
    /// Master seed (replays the run)
    pub seed: u64,
}

impl BenchmarkOutcome {
    /// Corrected infidelity trajectories, `[state][shot]`
    pub fn corrected_infidelity(&self) -> &[Vec<f64>] {
        &self.corrected.infidelity
    }

    /// Uncorrected infidelity trajectories, `[state][shot]`
    pub fn uncorrected_infidelity(&self) -> &[Vec<f64>] {
        &self.uncorrected.infidelity
    }

    /// Corrected final estimates
    pub fn corrected_estimates(&self) -> &[DensityMatrix] {
        &self.corrected.estimates
    }

    /// Uncorrected final estimates
    pub fn uncorrected_estimates(&self) -> &[DensityMatrix] {
        &self.uncorrected.estimates
    }

    /// Fitted exponents, (corrected, uncorrected)
    pub fn exponents(&self) -> (Option<f64>, Option<f64>) {
        (
            self.fits.corrected.map(|f| f.b),
            self.fits.uncorrected.map(|f| f.b),
        )
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Staged benchmark runner
/// Gantree: BenchmarkOrchestrator // 벤치마크 조율
#[derive(Debug, Clone)]
pub struct BenchmarkOrchestrator {
    config: BenchmarkConfig,
    ensemble: TrueStateEnsemble,
    calibration_states: Option<CalibrationStateSet>,
    experimental_data: Option<ExperimentalData>,
    state: PipelineState,
}

impl BenchmarkOrchestrator {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create with a configuration and the true states to estimate
    pub fn new(config: BenchmarkConfig, ensemble: TrueStateEnsemble) -> Self {
        Self {
            config,
            ensemble,
            calibration_states: None,
            experimental_data: None,
            state: PipelineState::new(),
        }
    }

    /// Use these calibration states instead of the default Pauli eigenstates
    pub fn with_calibration_states(mut self, states: CalibrationStateSet) -> Self {
        self.calibration_states = Some(states);
        self
    }

    /// Use measured data (experimental mode)
    pub fn with_experimental_data(mut self, data: ExperimentalData) -> Self {
        self.experimental_data = Some(data);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current stage
    pub fn stage(&self) -> PipelineStage {
        self.state.stage
    }

    /// Intermediate results
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Configuration
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// True states
    pub fn ensemble(&self) -> &TrueStateEnsemble {
        &self.ensemble
    }

    // ========================================================================
    // Pipeline Stages
    // ========================================================================

    /// Stage 1: validate, create the run directory, build nominal operators
    /// Gantree: prepare() -> Result<&RunContext> // 준비
    pub fn prepare(&mut self) -> EmqstResult<&RunContext> {
        let start = Instant::now();
        self.config.validate()?;
        if self.config.experimental {
            if self.experimental_data.is_none() {
                return Err(EmqstError::MissingExperimentalData(
                    "experimental mode needs measured calibration counts and QST records".into(),
                ));
            }
            if !self.config.noise.mode().is_none() {
                log::warn!(
                    "Experimental mode: ignoring requested noise mode {}",
                    self.config.noise.mode()
                );
            }
        }

        let n = self.config.num_qubits;
        self.ensemble.validate_qubits(n)?;
        let calibration_states = match &self.calibration_states {
            Some(states) if states.num_qubits() != n => {
                return Err(EmqstError::DimensionMismatch {
                    expected: n,
                    found: states.num_qubits(),
                });
            }
            Some(states) => states.clone(),
            None => default_calibration(n)?,
        };
        let nominal = MeasurementOperatorSet::pauli(n)?;
        let seed = self.config.seed.unwrap_or_else(random::entropy_seed);

        // storage failure aborts before any numerical stage
        let mut context = RunContext::create_run(&self.config.results_dir)?;
        context.persist(EXPERIMENTAL_SETTINGS, &self.config.experimental_settings)?;

        log::info!(
            "Prepared {} with {} true states, {} calibration states, {} POVMs (seed {}) in {:.2?}",
            self.config,
            self.ensemble.len(),
            calibration_states.len(),
            nominal.len(),
            seed,
            start.elapsed()
        );

        self.state = PipelineState::new();
        self.state.seed = Some(seed);
        self.state.calibration_states = Some(calibration_states);
        self.state.nominal = Some(nominal);
        self.state.stage = PipelineStage::Prepared;
        Ok(self.state.context.insert(context))
    }

    /// Stage 2: noisy operators (the nominal ones in experimental mode)
    /// Gantree: apply_noise() -> Result<&Set> // 노이즈 적용
    pub fn apply_noise(&mut self) -> EmqstResult<&MeasurementOperatorSet> {
        if self.state.stage < PipelineStage::Prepared {
            self.prepare()?;
        }
        let nominal = self.state.nominal.as_ref().ok_or_else(|| not_ready("nominal operators"))?;

        let noisy = if self.config.experimental {
            log::info!("Experimental mode: noise injection disabled");
            nominal.clone()
        } else {
            let noise = self.config.effective_noise();
            log::info!("Applying noise {} to {} POVMs", noise.mode(), nominal.len());
            noise.apply(nominal)?
        };

        self.state.stage = PipelineStage::NoiseApplied;
        Ok(self.state.noisy.insert(noisy))
    }

    /// Stage 3: reconstruct the operators from calibration outcomes
    /// Gantree: calibrate() -> Result<&CalibrationResult> // 보정
    ///
    /// The nominal operators seed the reconstruction; the distance to the
    /// noisy operators is reported but never gates the run.
    pub fn calibrate(&mut self) -> EmqstResult<&CalibrationResult> {
        if self.state.stage < PipelineStage::NoiseApplied {
            self.apply_noise()?;
        }
        let first_pass = self.state.stage < PipelineStage::Calibrated;
        let state = &self.state;
        let seed = state.seed.ok_or_else(|| not_ready("seed"))?;
        let nominal = state.nominal.as_ref().ok_or_else(|| not_ready("nominal operators"))?;
        let noisy = state.noisy.as_ref().ok_or_else(|| not_ready("noisy operators"))?;
        let states = state
            .calibration_states
            .as_ref()
            .ok_or_else(|| not_ready("calibration states"))?;

        let source = match &self.experimental_data {
            Some(data) if self.config.experimental => {
                let measured = data.calibration_data()?;
                measured.check_against(nominal, states.len())?;
                CalibrationSource::External(measured)
            }
            _ if self.config.exact_calibration => CalibrationSource::Exact,
            _ => CalibrationSource::Simulated { seed },
        };

        let stage = CalibrationStage::new(self.config.tomography, self.config.num_cores);
        let result = stage.calibrate(
            self.config.num_qubits,
            self.config.calibration_shots,
            noisy,
            states,
            nominal,
            &source,
        )?;

        let report = CalibrationReport::new(&result, result.reconstructed.distances(noisy)?);
        log::info!(
            "Calibration: max distance {:.4e} to the noisy operators, {} shots per state, {:.2?}",
            report.max_distance,
            self.config.calibration_shots,
            result.elapsed
        );

        self.state.calibration_report = Some(report);
        self.state.calibration = Some(result);
        self.state.stage = PipelineStage::Calibrated;
        // written before estimation so a failed run keeps its calibration record
        if first_pass {
            self.persist_calibration()?;
        }
        self.state.calibration.as_ref().ok_or_else(|| not_ready("calibration"))
    }

    /// Stage 4: outcome records under the noisy operators, shared by both tracks
    /// Gantree: generate_data() -> Result<&MeasurementData> // 측정 데이터 생성
    pub fn generate_data(&mut self) -> EmqstResult<&MeasurementData> {
        if self.state.stage < PipelineStage::Calibrated {
            self.calibrate()?;
        }
        let start = Instant::now();
        let first_pass = self.state.stage < PipelineStage::DataGenerated;
        let seed = self.state.seed.ok_or_else(|| not_ready("seed"))?;
        let noisy = self.state.noisy.as_ref().ok_or_else(|| not_ready("noisy operators"))?;

        let data = match &self.experimental_data {
            Some(measured) if self.config.experimental => {
                let data = measured.measurement_data()?;
                if data.num_states() != self.ensemble.len() {
                    return Err(EmqstError::DimensionMismatch {
                        expected: self.ensemble.len(),
                        found: data.num_states(),
                    });
                }
                data.check_against(noisy)?;
                if data.num_states() > 0 && data.shots() != self.config.qst_shots {
                    log::warn!(
                        "Measured records hold {} shots, configured {}; truncating to the shorter",
                        data.shots(),
                        self.config.qst_shots
                    );
                    data.truncated(data.shots().min(self.config.qst_shots))?
                } else {
                    data
                }
            }
            _ => {
                let pool = worker_pool(self.config.num_cores)?;
                pool.install(|| {
                    MeasurementData::simulate(noisy, &self.ensemble, self.config.qst_shots, seed)
                })?
            }
        };

        log::info!(
            "Outcome data: {} states x {} shots on {} qubit(s) in {:.2?}",
            data.num_states(),
            data.shots(),
            self.config.num_qubits,
            start.elapsed()
        );
        self.state.data = Some(data);
        self.state.stage = PipelineStage::DataGenerated;
        if first_pass {
            self.persist_qst_settings()?;
        }
        self.state.data.as_ref().ok_or_else(|| not_ready("outcome data"))
    }

    /// Stage 5: corrected and uncorrected tracks over the same data
    /// Gantree: estimate() -> Result<(&TrackResult,&TrackResult)> // 추정
    pub fn estimate(&mut self) -> EmqstResult<(&TrackResult, &TrackResult)> {
        if self.state.stage < PipelineStage::DataGenerated {
            self.generate_data()?;
        }
        let state = &self.state;
        let seed = state.seed.ok_or_else(|| not_ready("seed"))?;
        let data = state.data.as_ref().ok_or_else(|| not_ready("outcome data"))?;
        let nominal = state.nominal.as_ref().ok_or_else(|| not_ready("nominal operators"))?;
        let reconstructed = &state
            .calibration
            .as_ref()
            .ok_or_else(|| not_ready("calibration"))?
            .reconstructed;

        let estimator = self.config.to_estimator();
        let cores = self.config.num_cores;
        let mut corrected = EstimationTrack::new("corrected", estimator, cores, seed);
        let mut uncorrected = EstimationTrack::new("uncorrected", estimator, cores, seed);
        corrected.run(reconstructed, &self.ensemble, data)?;
        uncorrected.run(nominal, &self.ensemble, data)?;

        self.state.corrected = Some(corrected.take_result()?);
        self.state.uncorrected = Some(uncorrected.take_result()?);
        self.state.stage = PipelineStage::Estimated;

        match (&self.state.corrected, &self.state.uncorrected) {
            (Some(c), Some(u)) => Ok((c, u)),
            _ => Err(not_ready("track results")),
        }
    }

    /// Stage 6: ensemble means
    /// Gantree: aggregate() -> Result<&AggregateResult> // 평균
    pub fn aggregate(&mut self) -> EmqstResult<&AggregateResult> {
        if self.state.stage < PipelineStage::Estimated {
            self.estimate()?;
        }
        let corrected = self.state.corrected.as_ref().ok_or_else(|| not_ready("corrected track"))?;
        let uncorrected = self
            .state
            .uncorrected
            .as_ref()
            .ok_or_else(|| not_ready("uncorrected track"))?;
        let aggregate = AggregateResult::from_tracks(corrected, uncorrected)?;

        if let Some((c, u)) = aggregate.final_means() {
            log::info!(
                "Mean infidelity after {} shots over {} states: corrected {:.4e}, uncorrected {:.4e}",
                aggregate.shots(),
                aggregate.ensemble_size,
                c,
                u
            );
        }
        self.state.stage = PipelineStage::Aggregated;
        Ok(self.state.aggregate.insert(aggregate))
    }

    /// Stage 7: fit, plot and persist
    /// Gantree: report() -> Result<&TrackFits> // 보고
    ///
    /// Fit and plot failures are logged; a persistence failure fails the run.
    pub fn report(&mut self) -> EmqstResult<&TrackFits> {
        if self.state.stage < PipelineStage::Aggregated {
            self.aggregate()?;
        }
        let first_pass = self.state.stage < PipelineStage::Reported;
        let aggregate = self.state.aggregate.as_ref().ok_or_else(|| not_ready("aggregate"))?;
        let context = self.state.context.as_ref().ok_or_else(|| not_ready("run context"))?;

        let mut plot_path = None;
        let fits = if self.config.fits_enabled() {
            let fits = TrackFits {
                corrected: self.fit_curve("corrected", &aggregate.corrected_mean),
                uncorrected: self.fit_curve("uncorrected", &aggregate.uncorrected_mean),
            };
            let path = context.artifact_path(PLOT_FILE);
            match plot_infidelities(aggregate, &fits, self.config.fit.plot_cutoff, &path) {
                Ok(()) => {
                    let latest = context.latest_plot_path();
                    if let Err(e) = fs::copy(&path, &latest) {
                        log::warn!("Cannot update {}: {}", latest.display(), e);
                    }
                    plot_path = Some(path);
                }
                Err(e) => log::warn!("Plot not written: {}", e),
            }
            fits
        } else {
            log::debug!(
                "Fit and plot skipped ({} on {} cores)",
                self.config.estimator,
                self.config.num_cores
            );
            TrackFits::default()
        };

        if let (Some(path), Some(context)) = (plot_path, self.state.context.as_mut()) {
            context.register(path);
        }
        if first_pass {
            self.persist_results()?;
        }
        self.state.fits = fits;
        self.state.stage = PipelineStage::Reported;
        Ok(&self.state.fits)
    }

    fn fit_curve(&self, label: &str, curve: &[f64]) -> Option<PowerLawFit> {
        match fit_power_law(curve, &self.config.fit) {
            Ok(fit) => {
                log::info!("[{}] power-law fit {} ({} points)", label, fit, fit.points);
                Some(fit)
            }
            Err(e) => {
                log::info!("[{}] power-law fit skipped: {}", label, e);
                None
            }
        }
    }

    fn persist_calibration(&mut self) -> EmqstResult<()> {
        let state = &mut self.state;
        let seed = state.seed.ok_or_else(|| not_ready("seed"))?;
        let context = state.context.as_mut().ok_or_else(|| not_ready("run context"))?;
        let (Some(states), Some(nominal), Some(noisy), Some(calibration), Some(report)) = (
            state.calibration_states.as_ref(),
            state.nominal.as_ref(),
            state.noisy.as_ref(),
            state.calibration.as_ref(),
            state.calibration_report.as_ref(),
        ) else {
            return Err(not_ready("calibration settings"));
        };

        let noise = self.config.effective_noise();
        context.persist(
            DT_SETTINGS,
            &DtSettings {
                num_qubits: self.config.num_qubits,
                calibration_states: states,
                calibration_shots: self.config.calibration_shots,
                nominal_operators: nominal,
                reconstructed_operators: &calibration.reconstructed,
                experimental: self.config.experimental,
                noise: &noise,
                noisy_operators: noisy,
                calibration: report,
                seed,
                config: &self.config,
            },
        )?;
        Ok(())
    }

    fn persist_qst_settings(&mut self) -> EmqstResult<()> {
        let state = &mut self.state;
        let seed = state.seed.ok_or_else(|| not_ready("seed"))?;
        let data = state.data.as_ref().ok_or_else(|| not_ready("outcome data"))?;
        let context = state.context.as_mut().ok_or_else(|| not_ready("run context"))?;

        context.persist(
            QST_SETTINGS,
            &QstSettings {
                num_qubits: self.config.num_qubits,
                true_states: self.ensemble.states(),
                true_state_angles: self.ensemble.angles(),
                qst_shots: data.shots(),
                noise_mode: self.config.effective_noise().mode(),
                experimental: self.config.experimental,
                seed,
            },
        )?;
        Ok(())
    }

    fn persist_results(&mut self) -> EmqstResult<()> {
        let state = &mut self.state;
        let context = state.context.as_mut().ok_or_else(|| not_ready("run context"))?;
        let (Some(corrected), Some(uncorrected)) = (state.corrected.as_ref(), state.uncorrected.as_ref())
        else {
            return Err(not_ready("track results"));
        };

        context.persist(
            QST_RESULTS,
            &QstResults {
                corrected_infidelity: &corrected.infidelity,
                uncorrected_infidelity: &uncorrected.infidelity,
                corrected_estimates: &corrected.estimates,
                uncorrected_estimates: &uncorrected.estimates,
            },
        )?;
        Ok(())
    }

    /// Run every remaining stage and collect the outcome
    /// Gantree: run() -> Result<BenchmarkOutcome> // 전체 실행
    ///
    /// A run that already reached `Reported` starts over in a new directory.
    pub fn run(&mut self) -> EmqstResult<BenchmarkOutcome> {
        let start = Instant::now();
        if self.state.stage == PipelineStage::Reported {
            self.reset();
        }
        self.report()?;

        let state = &mut self.state;
        let context = state.context.take().ok_or_else(|| not_ready("run context"))?;
        let run_dir = context.dir().to_path_buf();
        let outcome = BenchmarkOutcome {
            corrected: state.corrected.clone().ok_or_else(|| not_ready("corrected track"))?,
            uncorrected: state
                .uncorrected
                .clone()
                .ok_or_else(|| not_ready("uncorrected track"))?,
            aggregate: state.aggregate.clone().ok_or_else(|| not_ready("aggregate"))?,
            fits: state.fits,
            calibration: state
                .calibration_report
                .clone()
                .ok_or_else(|| not_ready("calibration report"))?,
            seed: state.seed.ok_or_else(|| not_ready("seed"))?,
            artifacts: context.close(),
            run_dir,
        };
        log::info!("Benchmark finished in {:.2?}", start.elapsed());
        Ok(outcome)
    }

    // ========================================================================
    // Reset
    // ========================================================================

    /// Drop all intermediate results
    pub fn reset(&mut self) {
        self.state = PipelineState::new();
    }

    /// Reset with a new configuration
    pub fn reconfigure(&mut self, config: BenchmarkConfig) {
        self.config = config;
        self.state = PipelineState::new();
    }
}

/// One-call benchmark
/// Gantree: run_benchmark(config,ensemble,cal_states,exp_data) -> Result<BenchmarkOutcome> // 진입점
pub fn run_benchmark(
    config: BenchmarkConfig,
    ensemble: TrueStateEnsemble,
    calibration_states: Option<CalibrationStateSet>,
    experimental_data: Option<ExperimentalData>,
) -> EmqstResult<BenchmarkOutcome> {
    let mut orchestrator = BenchmarkOrchestrator::new(config, ensemble);
    if let Some(states) = calibration_states {
        orchestrator = orchestrator.with_calibration_states(states);
    }
    if let Some(data) = experimental_data {
        orchestrator = orchestrator.with_experimental_data(data);
    }
    orchestrator.run()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use emqst_qst::{BmeEstimator, EstimatorKind};
    use std::path::Path;

    fn temp_results(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "emqst_orchestrator_{}_{}",
            tag,
            uuid::Uuid::new_v4().simple()
        ))
    }

    fn quick_config(root: &Path) -> BenchmarkConfig {
        BenchmarkConfig::quick(1)
            .with_qst_shots(40)
            .with_calibration_shots(500)
            .with_cores(2)
            .with_seed(11)
            .with_results_dir(root)
    }

    #[test]
    fn test_new_orchestrator() {
        let orch = BenchmarkOrchestrator::new(
            BenchmarkConfig::quick(1),
            TrueStateEnsemble::haar_random(1, 2, 1).unwrap(),
        );
        assert_eq!(orch.stage(), PipelineStage::Initial);
        assert!(!orch.state().is_calibrated());
    }

    #[test]
    fn test_staged_execution() {
        let root = temp_results("staged");
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 3).unwrap();
        let mut orch = BenchmarkOrchestrator::new(quick_config(&root), ensemble);

        orch.prepare().unwrap();
        assert_eq!(orch.stage(), PipelineStage::Prepared);
        orch.apply_noise().unwrap();
        assert_eq!(orch.stage(), PipelineStage::NoiseApplied);
        orch.calibrate().unwrap();
        assert_eq!(orch.stage(), PipelineStage::Calibrated);
        assert_eq!(orch.generate_data().unwrap().shots(), 40);
        let (c, u) = orch.estimate().unwrap();
        assert_eq!(c.num_states(), 2);
        assert_eq!(u.num_states(), 2);
        assert_eq!(orch.aggregate().unwrap().shots(), 40);
        orch.report().unwrap();
        assert_eq!(orch.stage(), PipelineStage::Reported);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_later_stage_runs_prerequisites() {
        let root = temp_results("prereq");
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 3).unwrap();
        let mut orch = BenchmarkOrchestrator::new(quick_config(&root), ensemble);
        orch.aggregate().unwrap();
        assert_eq!(orch.stage(), PipelineStage::Aggregated);
        assert!(orch.state().is_estimated());
        fs::remove_dir_all(&root).ok();
    }

    fn read_artifact(dir: &Path, name: &str) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(dir.join(format!("{}.json", name))).unwrap())
            .unwrap()
    }

    #[test]
    fn test_run_persists_artifacts() {
        let root = temp_results("artifacts");
        let ensemble = TrueStateEnsemble::random_product(1, 2, 3).unwrap();
        let config = quick_config(&root).with_noise_mode(NoiseMode::Depolarizing);
        let outcome = run_benchmark(config, ensemble.clone(), None, None).unwrap();
        for name in [EXPERIMENTAL_SETTINGS, DT_SETTINGS, QST_SETTINGS, QST_RESULTS] {
            assert!(outcome.run_dir.join(format!("{}.json", name)).is_file());
        }
        let raw = read_artifact(&outcome.run_dir, QST_RESULTS);
        assert_eq!(raw["corrected_infidelity"].as_array().unwrap().len(), 2);
        assert_eq!(outcome.seed, 11);

        let settings = read_artifact(&outcome.run_dir, QST_SETTINGS);
        assert_eq!(settings["qst_shots"], 40);
        assert_eq!(settings["noise_mode"], 1);
        assert_eq!(settings["true_states"].as_array().unwrap().len(), 2);
        let angles: Vec<Vec<BlochAngles>> =
            serde_json::from_value(settings["true_state_angles"].clone()).unwrap();
        let expected = ensemble.angles().unwrap();
        assert_eq!(angles.len(), expected.len());
        for (got, want) in angles.iter().flatten().zip(expected.iter().flatten()) {
            assert!((got.theta - want.theta).abs() < 1e-12);
            assert!((got.phi - want.phi).abs() < 1e-12);
        }
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_calibration_record_written_before_estimation() {
        let root = temp_results("dt_early");
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 3).unwrap();
        let mut orch = BenchmarkOrchestrator::new(quick_config(&root), ensemble);
        orch.calibrate().unwrap();

        let dir = orch.state().context.as_ref().unwrap().dir().to_path_buf();
        assert!(dir.join(format!("{}.json", DT_SETTINGS)).is_file());
        assert!(!dir.join(format!("{}.json", QST_SETTINGS)).exists());
        assert!(!dir.join(format!("{}.json", QST_RESULTS)).exists());
        let dt = read_artifact(&dir, DT_SETTINGS);
        assert_eq!(dt["seed"], 11);

        // repeating a stage keeps the write-once artifacts intact
        orch.calibrate().unwrap();
        orch.generate_data().unwrap();
        assert!(dir.join(format!("{}.json", QST_SETTINGS)).is_file());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_bme_run_writes_plot() {
        let root = temp_results("plot");
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 3).unwrap();
        let config = quick_config(&root)
            .with_qst_shots(60)
            .with_estimator(EstimatorKind::Bme)
            .with_bme(BmeEstimator {
                particles: 100,
                ..BmeEstimator::default()
            });
        let outcome = run_benchmark(config, ensemble, None, None).unwrap();
        // 60 shots is inside the transient window: fit skipped, plot still drawn
        assert_eq!(outcome.fits, TrackFits::default());
        assert!(outcome.run_dir.join(PLOT_FILE).is_file());
        assert!(root.join(crate::run_context::LATEST_RUN_PLOT).is_file());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_rerun_uses_fresh_directory() {
        let root = temp_results("rerun");
        let ensemble = TrueStateEnsemble::haar_random(1, 1, 3).unwrap();
        let mut orch = BenchmarkOrchestrator::new(quick_config(&root), ensemble);
        let first = orch.run().unwrap();
        let second = orch.run().unwrap();
        assert_ne!(first.run_dir, second.run_dir);
        assert_eq!(first.corrected_infidelity(), second.corrected_infidelity());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_mismatched_calibration_states() {
        let root = temp_results("calstates");
        let ensemble = TrueStateEnsemble::haar_random(1, 1, 3).unwrap();
        let err = run_benchmark(
            quick_config(&root),
            ensemble,
            Some(default_calibration(2).unwrap()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EmqstError::DimensionMismatch { .. }));
        fs::remove_dir_all(&root).ok();
    }
}
