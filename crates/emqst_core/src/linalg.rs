//! Linear algebra helpers for EMQST
//!
//! Gantree: L0_Foundation → LinAlg
//!
//! Thin layer over `nalgebra` complex matrices: Hermitian matrix
//! functions, norms, Kronecker products, and the Pauli matrices.

use crate::error::{EmqstError, EmqstResult};
use nalgebra::DMatrix;
use num_complex::Complex64;

/// Complex operator on a 2^n dimensional Hilbert space
/// Gantree: Operator // pub type Operator = DMatrix<Complex64>
pub type Operator = DMatrix<Complex64>;

/// Real scalar as complex
#[inline]
pub fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

/// Identity operator of dimension `dim`
pub fn identity(dim: usize) -> Operator {
    Operator::identity(dim, dim)
}

/// Multiply every entry by a real scalar
pub fn scale(m: &Operator, s: f64) -> Operator {
    m.map(|z| z * s)
}

/// (M + M†) / 2
pub fn hermitian_part(m: &Operator) -> Operator {
    (m + m.adjoint()).map(|z| z * 0.5)
}

/// Re Tr(A B) without forming the product
pub fn trace_product(a: &Operator, b: &Operator) -> f64 {
    let d = a.nrows();
    let mut acc = Complex64::new(0.0, 0.0);
    for i in 0..d {
        for j in 0..d {
            acc += a[(i, j)] * b[(j, i)];
        }
    }
    acc.re
}

/// Real part of the trace
pub fn real_trace(m: &Operator) -> f64 {
    m.trace().re
}

/// Eigen-decomposition of the Hermitian part of `m`
///
/// Returns (eigenvalues, eigenvectors as columns).
pub fn eigh(m: &Operator) -> (Vec<f64>, Operator) {
    let eig = hermitian_part(m).symmetric_eigen();
    (eig.eigenvalues.iter().copied().collect(), eig.eigenvectors)
}

/// Apply a real function to the spectrum of a Hermitian matrix
/// Gantree: hermitian_map(m,f) -> Operator // 행렬 함수
pub fn hermitian_map<F>(m: &Operator, f: F) -> Operator
where
    F: Fn(f64) -> f64,
{
    let (values, vectors) = eigh(m);
    let dim = values.len();
    let mut scaled = vectors.clone();
    for (j, &lambda) in values.iter().enumerate() {
        let fj = f(lambda);
        for i in 0..dim {
            scaled[(i, j)] *= fj;
        }
    }
    &scaled * vectors.adjoint()
}

/// Square root of a positive semidefinite matrix (negative eigenvalues clipped)
pub fn sqrtm_psd(m: &Operator) -> Operator {
    hermitian_map(m, |x| x.max(0.0).sqrt())
}

/// Nearest positive semidefinite matrix in Frobenius norm (negative eigenvalues zeroed)
pub fn psd_projection(m: &Operator) -> Operator {
    hermitian_part(&hermitian_map(m, |x| x.max(0.0)))
}

/// Inverse square root of a positive definite matrix
pub fn inv_sqrtm_pd(m: &Operator) -> EmqstResult<Operator> {
    let floor = min_eigenvalue(m);
    if floor <= f64::EPSILON {
        return Err(EmqstError::InvalidParameter(format!(
            "matrix is not positive definite (min eigenvalue {:.3e})",
            floor
        )));
    }
    Ok(hermitian_map(m, |x| 1.0 / x.sqrt()))
}

/// Smallest eigenvalue of the Hermitian part
pub fn min_eigenvalue(m: &Operator) -> f64 {
    eigh(m).0.into_iter().fold(f64::INFINITY, f64::min)
}

/// Operator (spectral) norm of a Hermitian matrix
pub fn operator_norm(m: &Operator) -> f64 {
    eigh(m).0.into_iter().map(f64::abs).fold(0.0, f64::max)
}

/// Frobenius norm
pub fn frobenius_norm(m: &Operator) -> f64 {
    m.norm()
}

/// Check whether a matrix is Hermitian within `tol`
pub fn is_hermitian(m: &Operator, tol: f64) -> bool {
    m.is_square() && (m - m.adjoint()).norm() <= tol
}

/// Kronecker product of a sequence of operators (left to right)
pub fn kron_all(ops: &[Operator]) -> Operator {
    ops.iter()
        .fold(identity(1), |acc, op| acc.kronecker(op))
}

// ============================================================================
// Pauli Matrices
// ============================================================================

/// Pauli X
pub fn pauli_x() -> Operator {
    Operator::from_row_slice(2, 2, &[c(0.0), c(1.0), c(1.0), c(0.0)])
}

/// Pauli Y
pub fn pauli_y() -> Operator {
    Operator::from_row_slice(
        2,
        2,
        &[
            c(0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 1.0),
            c(0.0),
        ],
    )
}

/// Pauli Z
pub fn pauli_z() -> Operator {
    Operator::from_row_slice(2, 2, &[c(1.0), c(0.0), c(0.0), c(-1.0)])
}

/// Single-qubit operator from a Bloch vector: (I + r·σ) / 2
pub fn bloch_operator(r: [f64; 3]) -> Operator {
    let sum = identity(2) + scale(&pauli_x(), r[0]) + scale(&pauli_y(), r[1])
        + scale(&pauli_z(), r[2]);
    scale(&sum, 0.5)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_psd_projection_clips_negative_eigenvalue() {
        // eigenvalues 1 + 1e-4 and -1e-4
        let m = bloch_operator([0.0, 0.0, 1.0 + 2e-4]);
        assert!(min_eigenvalue(&m) < -5e-5);
        let projected = psd_projection(&m);
        assert!(min_eigenvalue(&projected) > -1e-12);
        assert_abs_diff_eq!(real_trace(&projected), 1.0 + 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_pauli_algebra() {
        let xy = pauli_x() * pauli_y();
        let iz = pauli_z().map(|z| z * Complex64::new(0.0, 1.0));
        assert_abs_diff_eq!((xy - iz).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sqrtm_squares_back() {
        let m = bloch_operator([0.3, -0.2, 0.5]);
        let s = sqrtm_psd(&m);
        assert_abs_diff_eq!((&s * &s - &m).norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_inv_sqrtm() {
        let m = scale(&identity(2), 4.0);
        let inv = inv_sqrtm_pd(&m).unwrap();
        assert_abs_diff_eq!(inv[(0, 0)].re, 0.5, epsilon = 1e-12);
        assert!(inv_sqrtm_pd(&bloch_operator([0.0, 0.0, 1.0])).is_err());
    }

    #[test]
    fn test_trace_product_matches_full_product() {
        let a = bloch_operator([0.1, 0.7, -0.2]);
        let b = pauli_y();
        assert_abs_diff_eq!(trace_product(&a, &b), (&a * &b).trace().re, epsilon = 1e-12);
        assert_abs_diff_eq!(trace_product(&a, &b), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_kron_dimensions() {
        let k = kron_all(&[pauli_x(), pauli_z(), identity(2)]);
        assert_eq!(k.nrows(), 8);
        assert!(is_hermitian(&k, 1e-12));
    }

    #[test]
    fn test_operator_norm() {
        assert_abs_diff_eq!(operator_norm(&pauli_z()), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(min_eigenvalue(&pauli_x()), -1.0, epsilon = 1e-12);
    }
}
