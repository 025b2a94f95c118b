//! Calibration states
//!
//! Gantree: L2_Calibration → CalibrationStateSet
//!
//! Known preparable states that drive device tomography. The default set
//! is every tensor product of the six single-qubit Pauli eigenstates, which
//! spans the operator space and so identifies any POVM.

use emqst_core::density::DensityMatrix;
use emqst_core::ensemble::BlochAngles;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::povm::Povm;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// Bloch angles of |0>, |1>, |+>, |->, |+i>, |-i>
pub const PAULI_EIGENSTATE_ANGLES: [(f64, f64); 6] = [
    (0.0, 0.0),
    (PI, 0.0),
    (FRAC_PI_2, 0.0),
    (FRAC_PI_2, PI),
    (FRAC_PI_2, FRAC_PI_2),
    (FRAC_PI_2, 3.0 * FRAC_PI_2),
];

/// Calibration states with their preparation angles
/// Gantree: CalibrationStateSet // 보정 상태 집합
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStateSet {
    num_qubits: usize,
    states: Vec<DensityMatrix>,
    angles: Vec<Vec<BlochAngles>>,
}

impl CalibrationStateSet {
    /// Create from explicit states and angles
    pub fn new(
        num_qubits: usize,
        states: Vec<DensityMatrix>,
        angles: Vec<Vec<BlochAngles>>,
    ) -> EmqstResult<Self> {
        if states.is_empty() {
            return Err(EmqstError::InvalidParameter(
                "calibration needs at least one state".into(),
            ));
        }
        if !angles.is_empty() && angles.len() != states.len() {
            return Err(EmqstError::InvalidParameter(format!(
                "{} angle entries for {} calibration states",
                angles.len(),
                states.len()
            )));
        }
        let dim = 1usize << num_qubits;
        if let Some(bad) = states.iter().find(|s| s.dim() != dim) {
            return Err(EmqstError::DimensionMismatch {
                expected: dim,
                found: bad.dim(),
            });
        }
        Ok(Self {
            num_qubits,
            states,
            angles,
        })
    }

    /// Default set: 6^n products of Pauli eigenstates
    /// Gantree: default_for(n) -> Result<Self> // default_calibration
    pub fn default_for(num_qubits: usize) -> EmqstResult<Self> {
        if num_qubits == 0 {
            return Err(EmqstError::InvalidParameter(
                "qubit count must be at least 1".into(),
            ));
        }
        let count = 6usize.pow(num_qubits as u32);
        let mut states = Vec::with_capacity(count);
        let mut angles = Vec::with_capacity(count);

        for index in 0..count {
            let mut rest = index;
            let mut per_qubit = vec![BlochAngles::new(0.0, 0.0); num_qubits];
            for q in (0..num_qubits).rev() {
                let (theta, phi) = PAULI_EIGENSTATE_ANGLES[rest % 6];
                per_qubit[q] = BlochAngles::new(theta, phi);
                rest /= 6;
            }
            states.push(BlochAngles::product_state(&per_qubit)?);
            angles.push(per_qubit);
        }

        Self::new(num_qubits, states, angles)
    }

    /// Number of qubits
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if empty (never true for a constructed set)
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States in order
    pub fn states(&self) -> &[DensityMatrix] {
        &self.states
    }

    /// Preparation angles (empty when states were given without them)
    pub fn angles(&self) -> &[Vec<BlochAngles>] {
        &self.angles
    }

    /// Born probabilities of one POVM on every state, `[state][outcome]`
    pub fn born_table(&self, povm: &Povm) -> Vec<Vec<f64>> {
        self.states.iter().map(|rho| povm.probabilities(rho)).collect()
    }
}

/// Default calibration states for `num_qubits`
pub fn default_calibration(num_qubits: usize) -> EmqstResult<CalibrationStateSet> {
    CalibrationStateSet::default_for(num_qubits)
}
