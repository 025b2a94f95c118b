//! Measurement noise model for EMQST
//!
//! Gantree: L1_Noise → NoiseModel
//!
//! Turns the nominal measurement operators into the "true" operators of an
//! imperfect device. All channels act in the Heisenberg picture, so every
//! transformed POVM stays positive and complete. Single-qubit systems accept
//! every channel; multi-qubit systems are restricted to depolarizing noise.

use emqst_core::constants::noise::{
    DEFAULT_DAMPING, DEFAULT_DEPOLARIZING, DEFAULT_READOUT_P01, DEFAULT_READOUT_P10,
    DEFAULT_ROTATION_RAD,
};
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::linalg::{self, c, Operator};
use emqst_core::povm::{MeasurementOperatorSet, Povm};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// NoiseMode
// ============================================================================

/// Synthetic noise selector
/// Gantree: NoiseMode // 노이즈 코드 0..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoiseMode {
    /// No noise: true operators equal the nominal ones
    None,
    /// Depolarizing shrink toward Tr(E)/d I
    Depolarizing,
    /// Coherent over-rotation about the y-axis
    Rotation,
    /// Asymmetric readout confusion
    Readout,
    /// Amplitude damping before measurement
    AmplitudeDamping,
    /// Over-rotation followed by depolarizing
    RotationDepolarizing,
}

impl NoiseMode {
    /// Numeric code
    pub fn code(&self) -> u8 {
        match self {
            NoiseMode::None => 0,
            NoiseMode::Depolarizing => 1,
            NoiseMode::Rotation => 2,
            NoiseMode::Readout => 3,
            NoiseMode::AmplitudeDamping => 4,
            NoiseMode::RotationDepolarizing => 5,
        }
    }

    /// Whether this mode leaves the operators untouched
    pub fn is_none(&self) -> bool {
        matches!(self, NoiseMode::None)
    }

    /// Whether the mode can be applied to `num_qubits` qubits
    pub fn supports(&self, num_qubits: usize) -> bool {
        num_qubits == 1 || matches!(self, NoiseMode::None | NoiseMode::Depolarizing)
    }

    /// Short label
    pub fn label(&self) -> &'static str {
        match self {
            NoiseMode::None => "none",
            NoiseMode::Depolarizing => "depolarizing",
            NoiseMode::Rotation => "rotation",
            NoiseMode::Readout => "readout",
            NoiseMode::AmplitudeDamping => "amplitude-damping",
            NoiseMode::RotationDepolarizing => "rotation+depolarizing",
        }
    }
}

impl TryFrom<u8> for NoiseMode {
    type Error = EmqstError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(NoiseMode::None),
            1 => Ok(NoiseMode::Depolarizing),
            2 => Ok(NoiseMode::Rotation),
            3 => Ok(NoiseMode::Readout),
            4 => Ok(NoiseMode::AmplitudeDamping),
            5 => Ok(NoiseMode::RotationDepolarizing),
            other => Err(EmqstError::InvalidNoiseMode(other)),
        }
    }
}

impl From<NoiseMode> for u8 {
    fn from(mode: NoiseMode) -> u8 {
        mode.code()
    }
}

impl Default for NoiseMode {
    fn default() -> Self {
        NoiseMode::None
    }
}

impl fmt::Display for NoiseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}

// ============================================================================
// NoiseModel
// ============================================================================

/// Noise mode plus channel strengths
/// Gantree: NoiseModel // 측정 노이즈 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    /// Selected channel
    /// Gantree: mode: NoiseMode // 노이즈 종류
    mode: NoiseMode,

    /// Depolarizing strength p
    depolarizing: f64,

    /// Over-rotation angle (radians)
    rotation_rad: f64,

    /// P(read 1 | ideal 0)
    readout_p01: f64,

    /// P(read 0 | ideal 1)
    readout_p10: f64,

    /// Amplitude damping rate
    damping: f64,
}

impl NoiseModel {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create with default strengths
    /// Gantree: new(mode) -> Self // 기본 강도
    pub fn new(mode: NoiseMode) -> Self {
        Self {
            mode,
            depolarizing: DEFAULT_DEPOLARIZING,
            rotation_rad: DEFAULT_ROTATION_RAD,
            readout_p01: DEFAULT_READOUT_P01,
            readout_p10: DEFAULT_READOUT_P10,
            damping: DEFAULT_DAMPING,
        }
    }

    /// Create from a numeric mode code
    pub fn from_code(code: u8) -> EmqstResult<Self> {
        Ok(Self::new(NoiseMode::try_from(code)?))
    }

    /// Noiseless model
    pub fn ideal() -> Self {
        Self::new(NoiseMode::None)
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set depolarizing strength
    pub fn with_depolarizing(mut self, p: f64) -> Self {
        self.depolarizing = p;
        self
    }

    /// Set over-rotation angle
    pub fn with_rotation(mut self, rad: f64) -> Self {
        self.rotation_rad = rad;
        self
    }

    /// Set readout flip probabilities
    pub fn with_readout(mut self, p01: f64, p10: f64) -> Self {
        self.readout_p01 = p01;
        self.readout_p10 = p10;
        self
    }

    /// Set amplitude damping rate
    pub fn with_damping(mut self, gamma: f64) -> Self {
        self.damping = gamma;
        self
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check strengths are probabilities
    pub fn validate(&self) -> EmqstResult<()> {
        for (name, value) in [
            ("depolarizing", self.depolarizing),
            ("readout_p01", self.readout_p01),
            ("readout_p10", self.readout_p10),
            ("damping", self.damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EmqstError::InvalidParameter(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !self.rotation_rad.is_finite() {
            return Err(EmqstError::InvalidParameter("rotation angle must be finite".into()));
        }
        Ok(())
    }

    /// Fail fast when the mode is not available for this system size
    /// Gantree: check_supported(n) -> Result<()> // 다중 큐비트 제한
    pub fn check_supported(&self, num_qubits: usize) -> EmqstResult<()> {
        if self.mode.supports(num_qubits) {
            Ok(())
        } else {
            Err(EmqstError::UnsupportedNoise {
                mode: self.mode.code(),
                qubits: num_qubits,
            })
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Selected mode
    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    /// Depolarizing strength
    pub fn depolarizing(&self) -> f64 {
        self.depolarizing
    }

    /// Over-rotation angle
    pub fn rotation_rad(&self) -> f64 {
        self.rotation_rad
    }

    /// Readout flip probabilities (p01, p10)
    pub fn readout(&self) -> (f64, f64) {
        (self.readout_p01, self.readout_p10)
    }

    /// Amplitude damping rate
    pub fn damping(&self) -> f64 {
        self.damping
    }

    // ========================================================================
    // Application
    // ========================================================================

    /// Produce the noisy operator set
    /// Gantree: apply(&self,nominal) -> Result<Set> // 노이즈 적용
    pub fn apply(&self, nominal: &MeasurementOperatorSet) -> EmqstResult<MeasurementOperatorSet> {
        self.validate()?;
        self.check_supported(nominal.num_qubits())?;

        if self.mode.is_none() {
            return Ok(nominal.clone());
        }

        let povms = if nominal.num_qubits() == 1 {
            nominal
                .iter()
                .map(|p| self.apply_single_operator_noise(p))
                .collect::<EmqstResult<Vec<_>>>()?
        } else {
            nominal
                .iter()
                .map(|p| apply_depolarizing(p, self.depolarizing))
                .collect::<EmqstResult<Vec<_>>>()?
        };

        log::debug!(
            "Applied {} noise to {} POVMs on {} qubit(s)",
            self.mode,
            povms.len(),
            nominal.num_qubits()
        );
        MeasurementOperatorSet::new(nominal.num_qubits(), povms)
    }

    /// Noise transform for one single-qubit POVM
    /// Gantree: apply_single_operator_noise(povm) -> Result<Povm> // 단일 큐비트 변환
    pub fn apply_single_operator_noise(&self, povm: &Povm) -> EmqstResult<Povm> {
        match self.mode {
            NoiseMode::None => Ok(povm.clone()),
            NoiseMode::Depolarizing => apply_depolarizing(povm, self.depolarizing),
            NoiseMode::Rotation => apply_rotation(povm, self.rotation_rad),
            NoiseMode::Readout => apply_readout(povm, self.readout_p01, self.readout_p10),
            NoiseMode::AmplitudeDamping => apply_amplitude_damping(povm, self.damping),
            NoiseMode::RotationDepolarizing => {
                apply_depolarizing(&apply_rotation(povm, self.rotation_rad)?, self.depolarizing)
            }
        }
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self::ideal()
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoiseModel(mode={})", self.mode)
    }
}

// ============================================================================
// Channels (Heisenberg picture)
// ============================================================================

/// E → (1-p) E + p Tr(E)/d I, any dimension
/// Gantree: apply_depolarizing(povm,p) -> Result<Povm> // 탈분극
pub fn apply_depolarizing(povm: &Povm, p: f64) -> EmqstResult<Povm> {
    let d = povm.dim();
    let id = linalg::identity(d);
    povm.map_elements(|e| {
        let shrink = linalg::scale(e, 1.0 - p);
        let mix = linalg::scale(&id, p * linalg::real_trace(e) / d as f64);
        shrink + mix
    })
}

/// E → U† E U with U = exp(-i θ Y / 2) on one qubit
pub fn apply_rotation(povm: &Povm, theta: f64) -> EmqstResult<Povm> {
    require_single_qubit(povm)?;
    let half = theta / 2.0;
    let y = linalg::pauli_y();
    let u = linalg::scale(&linalg::identity(2), half.cos())
        - y.map(|z| z * Complex64::new(0.0, half.sin()));
    let u_dag = u.adjoint();
    povm.map_elements(|e| &u_dag * e * &u)
}

/// Outcome relabeling by the confusion matrix [[1-p01, p10], [p01, 1-p10]]
pub fn apply_readout(povm: &Povm, p01: f64, p10: f64) -> EmqstResult<Povm> {
    require_single_qubit(povm)?;
    let elements = povm.elements();
    if elements.len() != 2 {
        return Err(EmqstError::InvalidPovm(format!(
            "readout confusion needs a two-outcome POVM, got {}",
            elements.len()
        )));
    }
    let e0 = &elements[0];
    let e1 = &elements[1];
    Povm::new(vec![
        linalg::scale(e0, 1.0 - p01) + linalg::scale(e1, p10),
        linalg::scale(e0, p01) + linalg::scale(e1, 1.0 - p10),
    ])
}

/// E → Σ_k K_k† E K_k for the amplitude damping Kraus pair
pub fn apply_amplitude_damping(povm: &Povm, gamma: f64) -> EmqstResult<Povm> {
    require_single_qubit(povm)?;
    let k0 = Operator::from_row_slice(2, 2, &[c(1.0), c(0.0), c(0.0), c((1.0 - gamma).sqrt())]);
    let k1 = Operator::from_row_slice(2, 2, &[c(0.0), c(gamma.sqrt()), c(0.0), c(0.0)]);
    let (k0_dag, k1_dag) = (k0.adjoint(), k1.adjoint());
    povm.map_elements(|e| &k0_dag * e * &k0 + &k1_dag * e * &k1)
}

fn require_single_qubit(povm: &Povm) -> EmqstResult<()> {
    if povm.dim() == 2 {
        Ok(())
    } else {
        Err(EmqstError::DimensionMismatch {
            expected: 2,
            found: povm.dim(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use emqst_core::density::DensityMatrix;
    use emqst_core::povm::PauliBasis;

    #[test]
    fn test_mode_codes() {
        for code in 0..=5u8 {
            assert_eq!(NoiseMode::try_from(code).unwrap().code(), code);
        }
        assert_eq!(NoiseMode::try_from(6), Err(EmqstError::InvalidNoiseMode(6)));
    }

    #[test]
    fn test_mode_zero_is_identity() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let noisy = NoiseModel::ideal().apply(&nominal).unwrap();
        assert_eq!(noisy, nominal);
    }

    #[test]
    fn test_depolarizing_shrinks_probabilities() {
        let z = PauliBasis::Z.povm();
        let noisy = apply_depolarizing(&z, 0.2).unwrap();
        let zero = DensityMatrix::from_bloch([0.0, 0.0, 1.0]).unwrap();
        let probs = noisy.probabilities(&zero);
        assert_abs_diff_eq!(probs[0], 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_readout_confusion() {
        let z = PauliBasis::Z.povm();
        let noisy = apply_readout(&z, 0.05, 0.12).unwrap();
        let one = DensityMatrix::from_bloch([0.0, 0.0, -1.0]).unwrap();
        let probs = noisy.probabilities(&one);
        assert_abs_diff_eq!(probs[0], 0.12, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[1], 0.88, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_moves_z_toward_x() {
        let z = PauliBasis::Z.povm();
        let rotated = apply_rotation(&z, std::f64::consts::FRAC_PI_2).unwrap();
        // quarter turn about y maps the Z measurement onto ±X
        let plus = DensityMatrix::from_bloch([1.0, 0.0, 0.0]).unwrap();
        let probs = rotated.probabilities(&plus);
        assert!((probs[0] - 1.0).abs() < 1e-10 || probs[0].abs() < 1e-10);
    }

    #[test]
    fn test_amplitude_damping() {
        let z = PauliBasis::Z.povm();
        let damped = apply_amplitude_damping(&z, 0.3).unwrap();
        let one = DensityMatrix::from_bloch([0.0, 0.0, -1.0]).unwrap();
        assert_abs_diff_eq!(damped.probabilities(&one)[0], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_every_mode_keeps_povms_valid() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        for code in 1..=5u8 {
            let noisy = NoiseModel::from_code(code).unwrap().apply(&nominal).unwrap();
            assert_eq!(noisy.len(), nominal.len());
            assert!(noisy.max_distance(&nominal).unwrap() > 0.0);
        }
    }

    #[test]
    fn test_multi_qubit_restriction() {
        let nominal = MeasurementOperatorSet::pauli(2).unwrap();
        assert!(NoiseModel::new(NoiseMode::Depolarizing).apply(&nominal).is_ok());
        for mode in [NoiseMode::Rotation, NoiseMode::Readout, NoiseMode::AmplitudeDamping] {
            let err = NoiseModel::new(mode).apply(&nominal).unwrap_err();
            assert!(matches!(err, EmqstError::UnsupportedNoise { qubits: 2, .. }));
        }
    }

    #[test]
    fn test_mode_serializes_as_code() {
        let model = NoiseModel::new(NoiseMode::Readout).with_readout(0.02, 0.03);
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"mode\":3"));
        let back: NoiseModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert!(serde_json::from_str::<NoiseMode>("9").is_err());
    }

    #[test]
    fn test_invalid_strength_rejected() {
        let nominal = MeasurementOperatorSet::pauli(1).unwrap();
        let model = NoiseModel::new(NoiseMode::Depolarizing).with_depolarizing(1.5);
        assert!(model.apply(&nominal).is_err());
    }
}
