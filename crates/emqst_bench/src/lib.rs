//! # EMQST Bench
//!
//! Sweeps and reports for the noise-corrected QST benchmark.
//!
//! ## Gantree Architecture
//!
//! ```text
//! emqst_bench // L5: Benchmark (완료)
//!     EnsembleGenerator // 참 상태 생성기 (완료)
//!         haar(), product(), mixed()
//!         pauli_eigenstates(), maximally_mixed()
//!         ensemble_scaling()
//!     BenchSuite // 벤치마크 스위트 (완료)
//!         bench()
//!         run_noise_sweep(), run_shot_sweep()
//!         run_calibration_sweep(), run_estimator_comparison()
//!         run_quick(), run_all()
//!         statistics()
//!     Reporter // 결과 리포팅 (완료)
//!         to_markdown(), to_json(), to_csv(), to_text()
//!         comparison_report(), noise_sweep_report(), shot_sweep_report()
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use emqst_bench::prelude::*;
//!
//! let root = std::env::temp_dir().join("emqst_bench_doc_quick");
//! let mut suite = BenchSuite::with_seed(42)
//!     .with_ensemble_size(2)
//!     .with_results_dir(&root);
//! let results = suite.run_quick().unwrap();
//!
//! let report = Reporter::to_markdown(&results);
//! println!("{}", report);
//! # std::fs::remove_dir_all(&root).ok();
//! ```
//!
//! ## Ensemble Generation
//!
//! ```rust
//! use emqst_bench::prelude::*;
//!
//! let gen = EnsembleGenerator::with_seed(42);
//!
//! let haar = gen.haar(1, 20).unwrap();
//! let mixed = gen.mixed(2, 5).unwrap();
//! let axes = gen.pauli_eigenstates(1).unwrap();
//! assert_eq!(axes.len(), 6);
//! ```

#![warn(missing_docs)]

// ============================================================================
// Module Declarations
// ============================================================================

/// True-state generators (Gantree: L5_Benchmark → Generators)
pub mod generators;

/// Benchmark suite (Gantree: L5_Benchmark → BenchSuite)
pub mod suite;

/// Reporting (Gantree: L5_Benchmark → Reporter)
pub mod reporter;

// ============================================================================
// Re-exports
// ============================================================================

pub use generators::EnsembleGenerator;
pub use reporter::{ReportFormat, Reporter};
pub use suite::{BenchSuite, BenchmarkResult, BenchmarkStatistics};

// ============================================================================
// Prelude
// ============================================================================

/// Convenient imports for common use cases
pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use emqst_bench::prelude::*;
    //! ```

    pub use crate::generators::EnsembleGenerator;
    pub use crate::reporter::{ReportFormat, Reporter};
    pub use crate::suite::{BenchSuite, BenchmarkResult, BenchmarkStatistics};
}

// ============================================================================
// Integration Tests
// ============================================================================
