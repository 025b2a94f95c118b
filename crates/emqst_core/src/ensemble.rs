//! True-state ensembles
//!
//! Gantree: L0_Foundation → TrueStateEnsemble
//!
//! The ordered list of target states a benchmark estimates, optionally with
//! the per-qubit Bloch angles that produced them.

use crate::density::DensityMatrix;
use crate::error::{EmqstError, EmqstResult};
use crate::random::{self, ENSEMBLE_STREAM};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

// ============================================================================
// BlochAngles
// ============================================================================

/// Polar and azimuthal angle of a single-qubit pure state
/// Gantree: BlochAngles{{theta,phi}} // 블로흐 구면 각도
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlochAngles {
    /// Polar angle in [0, π]
    pub theta: f64,
    /// Azimuthal angle in [0, 2π)
    pub phi: f64,
}

impl BlochAngles {
    /// Create new angles
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// Unit Bloch vector
    pub fn to_bloch_vector(&self) -> [f64; 3] {
        [
            self.theta.sin() * self.phi.cos(),
            self.theta.sin() * self.phi.sin(),
            self.theta.cos(),
        ]
    }

    /// Pure single-qubit state
    pub fn to_state(&self) -> EmqstResult<DensityMatrix> {
        DensityMatrix::from_bloch(self.to_bloch_vector())
    }

    /// Product state over several qubits (first entry = first qubit)
    pub fn product_state(angles: &[BlochAngles]) -> EmqstResult<DensityMatrix> {
        let (first, rest) = angles.split_first().ok_or_else(|| {
            EmqstError::InvalidParameter("product state needs at least one qubit".into())
        })?;
        rest.iter()
            .try_fold(first.to_state()?, |acc, a| Ok(acc.tensor(&a.to_state()?)))
    }
}

// ============================================================================
// TrueStateEnsemble
// ============================================================================

/// Ordered target states for one benchmark run
/// Gantree: TrueStateEnsemble // 참 상태 앙상블
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueStateEnsemble {
    states: Vec<DensityMatrix>,
    angles: Option<Vec<Vec<BlochAngles>>>,
}

impl TrueStateEnsemble {
    /// Create from explicit states
    pub fn new(states: Vec<DensityMatrix>) -> Self {
        Self {
            states,
            angles: None,
        }
    }

    /// Create with per-state angle metadata
    pub fn with_angles(
        states: Vec<DensityMatrix>,
        angles: Vec<Vec<BlochAngles>>,
    ) -> EmqstResult<Self> {
        if angles.len() != states.len() {
            return Err(EmqstError::InvalidParameter(format!(
                "{} angle entries for {} states",
                angles.len(),
                states.len()
            )));
        }
        Ok(Self {
            states,
            angles: Some(angles),
        })
    }

    /// Product pure states built from angles
    pub fn from_angles(angles: Vec<Vec<BlochAngles>>) -> EmqstResult<Self> {
        let states = angles
            .iter()
            .map(|a| BlochAngles::product_state(a))
            .collect::<EmqstResult<Vec<_>>>()?;
        Self::with_angles(states, angles)
    }

    /// Haar-random pure states from a seed
    /// Gantree: haar_random(n,count,seed) -> Self // 무작위 앙상블
    pub fn haar_random(num_qubits: usize, count: usize, seed: u64) -> EmqstResult<Self> {
        let dim = 1usize << num_qubits;
        let states = (0..count)
            .map(|i| {
                let mut rng = random::trial_rng(seed, ENSEMBLE_STREAM, i as u64);
                random::haar_random_pure(dim, &mut rng)
            })
            .collect::<EmqstResult<Vec<_>>>()?;
        Ok(Self::new(states))
    }

    /// Random product pure states with recorded angles (uniform on the sphere)
    pub fn random_product(num_qubits: usize, count: usize, seed: u64) -> EmqstResult<Self> {
        use rand::Rng;
        let angles = (0..count)
            .map(|i| {
                let mut rng = random::trial_rng(seed, ENSEMBLE_STREAM, i as u64);
                (0..num_qubits)
                    .map(|_| {
                        let u: f64 = rng.gen_range(-1.0..=1.0);
                        BlochAngles::new(u.acos(), rng.gen_range(0.0..2.0 * PI))
                    })
                    .collect()
            })
            .collect();
        Self::from_angles(angles)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States in order
    pub fn states(&self) -> &[DensityMatrix] {
        &self.states
    }

    /// Angle metadata, if any
    pub fn angles(&self) -> Option<&[Vec<BlochAngles>]> {
        self.angles.as_deref()
    }

    /// Iterate states
    pub fn iter(&self) -> impl Iterator<Item = &DensityMatrix> {
        self.states.iter()
    }

    /// Per-state random stream indices
    ///
    /// Keyed by state content, with repeats of one state numbered in turn,
    /// so reordering the ensemble reorders the keys with it.
    pub fn stream_keys(&self) -> Vec<u64> {
        let mut seen: HashMap<u64, u64> = HashMap::new();
        self.states
            .iter()
            .map(|rho| {
                let fingerprint = rho.fingerprint();
                let repeat = seen.entry(fingerprint).or_insert(0);
                let key = random::stream_key([fingerprint, *repeat]);
                *repeat += 1;
                key
            })
            .collect()
    }

    /// Reordered copy (`order[i]` is the source index of entry i)
    pub fn permuted(&self, order: &[usize]) -> EmqstResult<Self> {
        let mut seen = vec![false; self.len()];
        if order.len() != self.len() {
            return Err(EmqstError::InvalidParameter("permutation length mismatch".into()));
        }
        for &i in order {
            if i >= self.len() || seen[i] {
                return Err(EmqstError::InvalidParameter(format!(
                    "index {} is not a valid permutation entry",
                    i
                )));
            }
            seen[i] = true;
        }
        Ok(Self {
            states: order.iter().map(|&i| self.states[i].clone()).collect(),
            angles: self
                .angles
                .as_ref()
                .map(|a| order.iter().map(|&i| a[i].clone()).collect()),
        })
    }

    /// Check every state lives on `num_qubits` qubits
    pub fn validate_qubits(&self, num_qubits: usize) -> EmqstResult<()> {
        let dim = 1usize << num_qubits;
        match self.states.iter().find(|s| s.dim() != dim) {
            Some(bad) => Err(EmqstError::DimensionMismatch {
                expected: dim,
                found: bad.dim(),
            }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
