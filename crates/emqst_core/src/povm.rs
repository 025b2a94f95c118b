//! POVMs and measurement operator sets
//!
//! Gantree: L0_Foundation → Povm, MeasurementOperatorSet
//!
//! A [`Povm`] is one measurement setting: positive operators summing to the
//! identity. A [`MeasurementOperatorSet`] is the ordered list of settings used
//! for tomography (the Pauli set by default). Sets are immutable once built
//! and can be shared read-only across worker threads.

use crate::constants::numerics::{PSD_TOL, VALIDATION_TOL};
use crate::density::DensityMatrix;
use crate::error::{EmqstError, EmqstResult};
use crate::linalg::{self, Operator};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Povm
// ============================================================================

/// Positive operator-valued measure
/// Gantree: Povm // 측정 연산자
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Povm {
    elements: Vec<Operator>,
}

impl Povm {
    /// Create with validation (positivity and completeness)
    pub fn new(elements: Vec<Operator>) -> EmqstResult<Self> {
        Self::validate(&elements, VALIDATION_TOL)?;
        Ok(Self { elements })
    }

    /// Validate a candidate element list
    pub fn validate(elements: &[Operator], tol: f64) -> EmqstResult<()> {
        let first = elements
            .first()
            .ok_or_else(|| EmqstError::InvalidPovm("no elements".into()))?;
        let dim = first.nrows();
        let mut total = Operator::zeros(dim, dim);

        for (k, e) in elements.iter().enumerate() {
            if e.nrows() != dim || e.ncols() != dim {
                return Err(EmqstError::DimensionMismatch {
                    expected: dim,
                    found: e.nrows().max(e.ncols()),
                });
            }
            if !linalg::is_hermitian(e, tol) {
                return Err(EmqstError::InvalidPovm(format!("element {} is not Hermitian", k)));
            }
            let floor = linalg::min_eigenvalue(e);
            if floor < -PSD_TOL.max(tol) {
                return Err(EmqstError::InvalidPovm(format!(
                    "element {} has negative eigenvalue {:.3e}",
                    k, floor
                )));
            }
            total += e;
        }

        let defect = (total - linalg::identity(dim)).norm();
        if defect > tol.max(VALIDATION_TOL) * dim as f64 {
            return Err(EmqstError::InvalidPovm(format!(
                "elements sum to identity only within {:.3e}",
                defect
            )));
        }
        Ok(())
    }

    /// Projective measurement from a list of (not necessarily normalized) basis vectors' projectors
    pub fn from_projectors(projectors: Vec<Operator>) -> EmqstResult<Self> {
        Self::new(projectors)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// POVM elements in outcome order
    pub fn elements(&self) -> &[Operator] {
        &self.elements
    }

    /// Element for outcome `k`
    pub fn element(&self, k: usize) -> Option<&Operator> {
        self.elements.get(k)
    }

    /// Number of outcomes
    pub fn num_outcomes(&self) -> usize {
        self.elements.len()
    }

    /// Hilbert space dimension
    pub fn dim(&self) -> usize {
        self.elements[0].nrows()
    }

    // ========================================================================
    // Born Rule
    // ========================================================================

    /// Outcome probabilities Tr(ρ E_k), clipped at zero
    /// Gantree: probabilities(&self,rho) -> Vec<f64> // 보른 규칙
    pub fn probabilities(&self, rho: &DensityMatrix) -> Vec<f64> {
        self.elements
            .iter()
            .map(|e| rho.expectation(e).max(0.0))
            .collect()
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// Apply an element-wise map and re-validate the result
    pub fn map_elements<F>(&self, f: F) -> EmqstResult<Povm>
    where
        F: Fn(&Operator) -> Operator,
    {
        Povm::new(self.elements.iter().map(f).collect())
    }

    /// Tensor product of two POVMs (outcome index = k_self * n_other + k_other)
    pub fn tensor(&self, other: &Povm) -> Povm {
        let mut elements = Vec::with_capacity(self.num_outcomes() * other.num_outcomes());
        for a in &self.elements {
            for b in &other.elements {
                elements.push(a.kronecker(b));
            }
        }
        Povm { elements }
    }

    // ========================================================================
    // Distance
    // ========================================================================

    /// Operator-space distance ½ Σ_k ‖P_k − Q_k‖_op
    /// Gantree: distance(&self,other) -> f64 // POVM 거리
    pub fn distance(&self, other: &Povm) -> EmqstResult<f64> {
        if self.num_outcomes() != other.num_outcomes() {
            return Err(EmqstError::InvalidPovm(format!(
                "outcome counts differ: {} vs {}",
                self.num_outcomes(),
                other.num_outcomes()
            )));
        }
        if self.dim() != other.dim() {
            return Err(EmqstError::DimensionMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        let total: f64 = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(p, q)| linalg::operator_norm(&(p - q)))
            .sum();
        Ok(0.5 * total)
    }
}

// ============================================================================
// MeasurementOperatorSet
// ============================================================================

/// Single-qubit measurement basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauliBasis {
    /// X eigenbasis
    X,
    /// Y eigenbasis
    Y,
    /// Z (computational) eigenbasis
    Z,
}

impl PauliBasis {
    /// All three bases in canonical order
    pub const ALL: [PauliBasis; 3] = [PauliBasis::X, PauliBasis::Y, PauliBasis::Z];

    /// Eigenprojectors (+1 first, then −1)
    pub fn projectors(&self) -> [Operator; 2] {
        let pauli = match self {
            PauliBasis::X => linalg::pauli_x(),
            PauliBasis::Y => linalg::pauli_y(),
            PauliBasis::Z => linalg::pauli_z(),
        };
        let id = linalg::identity(2);
        [
            linalg::scale(&(&id + &pauli), 0.5),
            linalg::scale(&(&id - &pauli), 0.5),
        ]
    }

    /// Single-qubit projective POVM in this basis
    pub fn povm(&self) -> Povm {
        let [plus, minus] = self.projectors();
        Povm {
            elements: vec![plus, minus],
        }
    }

    /// Basis label
    pub fn to_char(&self) -> char {
        match self {
            PauliBasis::X => 'X',
            PauliBasis::Y => 'Y',
            PauliBasis::Z => 'Z',
        }
    }
}

/// Ordered list of POVMs used for tomography
/// Gantree: MeasurementOperatorSet // POVM 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementOperatorSet {
    num_qubits: usize,
    povms: Vec<Povm>,
}

impl MeasurementOperatorSet {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create with dimension check against the qubit count
    pub fn new(num_qubits: usize, povms: Vec<Povm>) -> EmqstResult<Self> {
        if povms.is_empty() {
            return Err(EmqstError::InvalidPovm("operator set has no POVMs".into()));
        }
        let dim = 1usize << num_qubits;
        if let Some(bad) = povms.iter().find(|p| p.dim() != dim) {
            return Err(EmqstError::DimensionMismatch {
                expected: dim,
                found: bad.dim(),
            });
        }
        Ok(Self { num_qubits, povms })
    }

    /// Nominal Pauli measurement set: 3^n settings with 2^n outcomes each
    /// Gantree: pauli(n) -> Self // generate_nominal
    pub fn pauli(num_qubits: usize) -> EmqstResult<Self> {
        if num_qubits == 0 {
            return Err(EmqstError::InvalidParameter(
                "qubit count must be at least 1".into(),
            ));
        }
        let settings = 3usize.pow(num_qubits as u32);
        let mut povms = Vec::with_capacity(settings);

        for index in 0..settings {
            let bases = Self::bases_for_index(index, num_qubits);
            let povm = bases
                .iter()
                .skip(1)
                .fold(bases[0].povm(), |acc, b| acc.tensor(&b.povm()));
            povms.push(povm);
        }

        Self::new(num_qubits, povms)
    }

    /// Basis assignment for a setting index (first qubit most significant)
    pub fn bases_for_index(index: usize, num_qubits: usize) -> Vec<PauliBasis> {
        let mut digits = vec![PauliBasis::X; num_qubits];
        let mut rest = index;
        for q in (0..num_qubits).rev() {
            digits[q] = PauliBasis::ALL[rest % 3];
            rest /= 3;
        }
        digits
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Number of qubits
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Hilbert space dimension
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Number of POVMs
    pub fn len(&self) -> usize {
        self.povms.len()
    }

    /// Check if empty (never true for a constructed set)
    pub fn is_empty(&self) -> bool {
        self.povms.is_empty()
    }

    /// POVM at index
    pub fn get(&self, index: usize) -> Option<&Povm> {
        self.povms.get(index)
    }

    /// All POVMs
    pub fn povms(&self) -> &[Povm] {
        &self.povms
    }

    /// Iterate POVMs
    pub fn iter(&self) -> impl Iterator<Item = &Povm> {
        self.povms.iter()
    }

    /// Total number of outcomes across all POVMs
    pub fn total_outcomes(&self) -> usize {
        self.povms.iter().map(Povm::num_outcomes).sum()
    }

    // ========================================================================
    // Distances
    // ========================================================================

    /// Per-POVM distances to another set of the same shape
    pub fn distances(&self, other: &MeasurementOperatorSet) -> EmqstResult<Vec<f64>> {
        if self.len() != other.len() {
            return Err(EmqstError::InvalidPovm(format!(
                "set sizes differ: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        self.povms
            .iter()
            .zip(other.povms.iter())
            .map(|(a, b)| a.distance(b))
            .collect()
    }

    /// Largest per-POVM distance
    pub fn max_distance(&self, other: &MeasurementOperatorSet) -> EmqstResult<f64> {
        Ok(self.distances(other)?.into_iter().fold(0.0, f64::max))
    }
}

impl fmt::Display for MeasurementOperatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeasurementOperatorSet({} qubit(s), {} POVMs)",
            self.num_qubits,
            self.povms.len()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pauli_single_qubit() {
        let set = MeasurementOperatorSet::pauli(1).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.total_outcomes(), 6);
        assert_eq!(set.dim(), 2);
    }

    #[test]
    fn test_pauli_two_qubits() {
        let set = MeasurementOperatorSet::pauli(2).unwrap();
        assert_eq!(set.len(), 9);
        for povm in set.iter() {
            assert_eq!(povm.num_outcomes(), 4);
            assert_eq!(povm.dim(), 4);
        }
    }

    #[test]
    fn test_bases_for_index() {
        let bases = MeasurementOperatorSet::bases_for_index(5, 2);
        // 5 = 1*3 + 2 -> (Y, Z)
        assert_eq!(bases, vec![PauliBasis::Y, PauliBasis::Z]);
    }

    #[test]
    fn test_invalid_povm_rejected() {
        let [plus, _] = PauliBasis::Z.projectors();
        assert!(Povm::new(vec![plus]).is_err());
        assert!(Povm::new(vec![]).is_err());
    }

    #[test]
    fn test_born_rule() {
        let rho = DensityMatrix::from_bloch([0.0, 0.0, 1.0]).unwrap();
        let probs = PauliBasis::Z.povm().probabilities(&rho);
        assert_abs_diff_eq!(probs[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[1], 0.0, epsilon = 1e-12);

        let probs_x = PauliBasis::X.povm().probabilities(&rho);
        assert_abs_diff_eq!(probs_x[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_properties() {
        let x = PauliBasis::X.povm();
        let z = PauliBasis::Z.povm();
        assert_abs_diff_eq!(x.distance(&x).unwrap(), 0.0, epsilon = 1e-12);
        let d_xz = x.distance(&z).unwrap();
        let d_zx = z.distance(&x).unwrap();
        assert!(d_xz > 0.0);
        assert_abs_diff_eq!(d_xz, d_zx, epsilon = 1e-12);
    }

    #[test]
    fn test_set_distance_shape_mismatch() {
        let one = MeasurementOperatorSet::pauli(1).unwrap();
        let two = MeasurementOperatorSet::pauli(2).unwrap();
        assert!(one.distances(&two).is_err());
    }
}
