//! Error types for EMQST
//!
//! Gantree: L0_Foundation → Errors
//!
//! One error enum shared by every layer of the benchmark. Configuration
//! errors abort a run before any stage executes; numerical shortfalls are
//! flagged as recoverable so callers can degrade to best-effort results.

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use thiserror::Error;

/// Main error type for EMQST
/// Gantree: EmqstError // enum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmqstError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Unknown synthetic noise code
    #[error("Invalid noise mode {0}: expected a code in 0..=5")]
    InvalidNoiseMode(u8),

    /// Noise mode not available for this system size
    /// Gantree: UnsupportedNoise{{mode,qubits}} // 다중 큐비트 노이즈
    #[error("Noise mode {mode} is not supported for {qubits} qubits: only depolarizing noise is implemented for multi-qubit systems")]
    UnsupportedNoise { mode: u8, qubits: usize },

    /// Matrix is not a valid density matrix
    #[error("Invalid density matrix: {0}")]
    InvalidDensityMatrix(String),

    /// Operator set is not a valid POVM
    #[error("Invalid POVM: {0}")]
    InvalidPovm(String),

    /// Operator dimensions do not agree
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Generic invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Experimental mode requested without measurement data
    #[error("Missing experimental data: {0}")]
    MissingExperimentalData(String),

    // ========================================================================
    // Run Errors
    // ========================================================================
    /// No true states to average over
    /// Gantree: EmptyEnsemble // 빈 앙상블
    #[error("True-state ensemble is empty: cannot average infidelities")]
    EmptyEnsemble,

    /// Accessor used before any estimation run completed
    #[error("State not ready: {0}")]
    StateNotReady(String),

    /// Results storage could not be created or written
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Numerical Errors
    // ========================================================================
    /// Iterative method hit its cap
    #[error("Convergence failed after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    /// Not enough data points for the requested operation
    #[error("Insufficient data: need {needed} points, have {available}")]
    InsufficientData { needed: usize, available: usize },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// File I/O error
    #[error("File error: {0}")]
    File(String),

    /// Plot rendering error
    #[error("Plot error: {0}")]
    Plot(String),
}

/// Result type alias for EMQST operations
/// Gantree: EmqstResult<T> // type alias
pub type EmqstResult<T> = Result<T, EmqstError>;

// ============================================================================
// Error Conversion Helpers
// ============================================================================

impl From<serde_json::Error> for EmqstError {
    fn from(err: serde_json::Error) -> Self {
        EmqstError::Json(err.to_string())
    }
}

impl From<std::io::Error> for EmqstError {
    fn from(err: std::io::Error) -> Self {
        EmqstError::File(err.to_string())
    }
}

// ============================================================================
// Error Helpers
// ============================================================================

impl EmqstError {
    /// Check if error is recoverable (best-effort result still usable)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EmqstError::ConvergenceFailed { .. }
                | EmqstError::InsufficientData { .. }
                | EmqstError::Plot(_)
        )
    }

    /// Check if error is a configuration/validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            EmqstError::InvalidNoiseMode(_)
                | EmqstError::UnsupportedNoise { .. }
                | EmqstError::InvalidDensityMatrix(_)
                | EmqstError::InvalidPovm(_)
                | EmqstError::DimensionMismatch { .. }
                | EmqstError::InvalidParameter(_)
                | EmqstError::MissingExperimentalData(_)
        )
    }

    /// Check if error must abort the run
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

// ============================================================================
// Tests
// ============================================================================
