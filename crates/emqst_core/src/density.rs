//! Density matrices for EMQST
//!
//! Gantree: L0_Foundation → DensityMatrix
//!
//! Validated wrapper around a complex matrix that is Hermitian, positive
//! semidefinite and of unit trace. Estimators build their outputs through
//! [`DensityMatrix::from_unnormalized`], which restores Hermiticity and the
//! trace after floating-point drift.

use crate::constants::numerics::{PSD_TOL, VALIDATION_TOL};
use crate::error::{EmqstError, EmqstResult};
use crate::linalg::{self, Operator};
use crate::random;
use nalgebra::DVector;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantum state as a density matrix
/// Gantree: DensityMatrix // 밀도 행렬
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityMatrix {
    matrix: Operator,
}

impl DensityMatrix {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create with validation
    /// Gantree: new(m) -> Result<Self> // 생성+검증
    pub fn new(matrix: Operator) -> EmqstResult<Self> {
        Self::validate(&matrix, VALIDATION_TOL)?;
        Ok(Self { matrix })
    }

    /// Hermitize and normalize a positive matrix
    pub fn from_unnormalized(matrix: &Operator) -> EmqstResult<Self> {
        let herm = linalg::hermitian_part(matrix);
        let tr = linalg::real_trace(&herm);
        if !(tr.is_finite() && tr > 0.0) {
            return Err(EmqstError::InvalidDensityMatrix(format!(
                "cannot normalize matrix with trace {}",
                tr
            )));
        }
        let normalized = linalg::scale(&herm, 1.0 / tr);
        if linalg::min_eigenvalue(&normalized) < -PSD_TOL.sqrt() {
            return Err(EmqstError::InvalidDensityMatrix(
                "matrix is not positive semidefinite".into(),
            ));
        }
        Ok(Self { matrix: normalized })
    }

    /// Pure state |ψ⟩⟨ψ| from a (not necessarily normalized) state vector
    pub fn from_pure(state: &DVector<Complex64>) -> EmqstResult<Self> {
        let norm = state.norm();
        if norm <= f64::EPSILON {
            return Err(EmqstError::InvalidDensityMatrix("zero state vector".into()));
        }
        let psi = state.map(|z| z / norm);
        let outer = &psi * psi.adjoint();
        Self::from_unnormalized(&outer)
    }

    /// Single-qubit state from a Bloch vector with |r| <= 1
    pub fn from_bloch(r: [f64; 3]) -> EmqstResult<Self> {
        let len = (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt();
        if len > 1.0 + VALIDATION_TOL {
            return Err(EmqstError::InvalidDensityMatrix(format!(
                "Bloch vector length {:.6} exceeds 1",
                len
            )));
        }
        Ok(Self {
            matrix: linalg::bloch_operator(r),
        })
    }

    /// Maximally mixed state I/d
    pub fn maximally_mixed(dim: usize) -> Self {
        Self {
            matrix: linalg::scale(&linalg::identity(dim), 1.0 / dim as f64),
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check Hermiticity, unit trace and positivity
    pub fn validate(matrix: &Operator, tol: f64) -> EmqstResult<()> {
        if !matrix.is_square() {
            return Err(EmqstError::InvalidDensityMatrix(format!(
                "matrix is {}x{}, not square",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if !linalg::is_hermitian(matrix, tol) {
            return Err(EmqstError::InvalidDensityMatrix("matrix is not Hermitian".into()));
        }
        let tr = matrix.trace();
        if (tr.re - 1.0).abs() > tol || tr.im.abs() > tol {
            return Err(EmqstError::InvalidDensityMatrix(format!(
                "trace is {:.6}{:+.6}i, expected 1",
                tr.re, tr.im
            )));
        }
        let floor = linalg::min_eigenvalue(matrix);
        if floor < -tol {
            return Err(EmqstError::InvalidDensityMatrix(format!(
                "negative eigenvalue {:.3e}",
                floor
            )));
        }
        Ok(())
    }

    /// Check validity within a tolerance
    pub fn is_valid(&self, tol: f64) -> bool {
        Self::validate(&self.matrix, tol).is_ok()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Underlying matrix
    pub fn matrix(&self) -> &Operator {
        &self.matrix
    }

    /// Hilbert space dimension
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of qubits (log2 of dimension)
    pub fn num_qubits(&self) -> usize {
        self.dim().trailing_zeros() as usize
    }

    /// Trace (should be 1)
    pub fn trace(&self) -> f64 {
        linalg::real_trace(&self.matrix)
    }

    /// Purity Tr(ρ²)
    pub fn purity(&self) -> f64 {
        linalg::trace_product(&self.matrix, &self.matrix)
    }

    /// Tr(ρ A) for a Hermitian observable or POVM element
    pub fn expectation(&self, op: &Operator) -> f64 {
        linalg::trace_product(&self.matrix, op)
    }

    /// Bloch vector of a single-qubit state
    pub fn bloch_vector(&self) -> Option<[f64; 3]> {
        if self.dim() != 2 {
            return None;
        }
        Some([
            self.expectation(&linalg::pauli_x()),
            self.expectation(&linalg::pauli_y()),
            self.expectation(&linalg::pauli_z()),
        ])
    }

    // ========================================================================
    // Distances
    // ========================================================================

    /// Uhlmann fidelity F(ρ, σ) = (Tr √(√ρ σ √ρ))²
    /// Gantree: fidelity(&self,other) -> f64 // 충실도
    pub fn fidelity(&self, other: &DensityMatrix) -> f64 {
        let sqrt_rho = linalg::sqrtm_psd(&self.matrix);
        let inner = &sqrt_rho * &other.matrix * &sqrt_rho;
        let (values, _) = linalg::eigh(&inner);
        let root_sum: f64 = values.iter().map(|&x| x.max(0.0).sqrt()).sum();
        (root_sum * root_sum).clamp(0.0, 1.0)
    }

    /// 1 - F(ρ, σ)
    pub fn infidelity(&self, other: &DensityMatrix) -> f64 {
        1.0 - self.fidelity(other)
    }

    /// Content hash of the matrix entries
    ///
    /// Equal matrices hash equally wherever they sit in an ensemble.
    pub fn fingerprint(&self) -> u64 {
        random::stream_key(
            self.matrix
                .iter()
                .flat_map(|z| [z.re.to_bits(), z.im.to_bits()]),
        )
    }

    /// Tensor product ρ ⊗ σ
    pub fn tensor(&self, other: &DensityMatrix) -> DensityMatrix {
        Self {
            matrix: self.matrix.kronecker(&other.matrix),
        }
    }
}

impl fmt::Display for DensityMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DensityMatrix(dim={}, purity={:.4})",
            self.dim(),
            self.purity()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
