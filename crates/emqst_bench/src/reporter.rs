//! Benchmark reporting
//!
//! Gantree: L5_Benchmark → Reporter
//!
//! Markdown, JSON, CSV and plain-text renderings of sweep results.

use crate::suite::{BenchmarkResult, BenchmarkStatistics};
use std::fmt::{self, Write};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Markdown table
    Markdown,
    /// JSON
    Json,
    /// CSV
    Csv,
    /// Plain text summary
    Text,
}

/// Benchmark reporter
/// Gantree: Reporter // 결과 리포팅
pub struct Reporter;

/// Writing into a `String` never fails
fn render(body: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut output = String::new();
    let _ = body(&mut output);
    output
}

fn exponent(b: Option<f64>) -> String {
    b.map_or_else(|| "-".to_string(), |b| format!("{:.3}", b))
}

impl Reporter {
    // ========================================================================
    // Format Converters
    // ========================================================================

    /// Generate report in specified format
    pub fn report(results: &[BenchmarkResult], format: ReportFormat) -> String {
        match format {
            ReportFormat::Markdown => Self::to_markdown(results),
            ReportFormat::Json => Self::to_json(results),
            ReportFormat::Csv => Self::to_csv(results),
            ReportFormat::Text => Self::to_text(results),
        }
    }

    /// Convert results to Markdown table
    pub fn to_markdown(results: &[BenchmarkResult]) -> String {
        let stats = BenchmarkStatistics::from_results(results);
        render(|out| {
            writeln!(out, "# EMQST Benchmark Results\n")?;

            writeln!(out, "## Summary\n")?;
            writeln!(out, "- **Benchmarks**: {}", stats.count)?;
            writeln!(
                out,
                "- **Avg Improvement**: {:.2}%",
                stats.avg_improvement_percent
            )?;
            writeln!(
                out,
                "- **Max Improvement**: {:.2}%",
                stats.max_improvement_percent
            )?;
            writeln!(
                out,
                "- **Corrected Win Rate**: {:.1}%",
                stats.corrected_win_rate * 100.0
            )?;
            writeln!(
                out,
                "- **Avg Calibration Distance**: {:.3e}",
                stats.avg_calibration_distance
            )?;
            writeln!(
                out,
                "- **Total Time**: {:.2}s\n",
                stats.total_time_ms as f64 / 1000.0
            )?;

            writeln!(out, "## Detailed Results\n")?;
            writeln!(
                out,
                "| Name | Qubits | Noise | Estimator | Shots | Cal. Dist | Corrected | Uncorrected | Improve% | b (corr) | b (uncorr) | Time(ms) |"
            )?;
            writeln!(
                out,
                "|------|--------|-------|-----------|-------|-----------|-----------|-------------|----------|----------|------------|----------|"
            )?;
            for r in results {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {:.3e} | {:.4e} | {:.4e} | {:.2}% | {} | {} | {} |",
                    r.name,
                    r.qubits,
                    r.noise.label(),
                    r.estimator,
                    r.shots,
                    r.calibration_distance,
                    r.corrected_tail,
                    r.uncorrected_tail,
                    r.improvement_percent,
                    exponent(r.corrected_exponent),
                    exponent(r.uncorrected_exponent),
                    r.time_ms
                )?;
            }
            Ok(())
        })
    }

    /// Convert results to JSON
    pub fn to_json(results: &[BenchmarkResult]) -> String {
        let stats = BenchmarkStatistics::from_results(results);

        let report = serde_json::json!({
            "statistics": stats,
            "results": results,
        });

        serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
    }

    /// Convert results to CSV
    pub fn to_csv(results: &[BenchmarkResult]) -> String {
        render(|out| {
            writeln!(out, "name,qubits,noise,estimator,shots,calibration_shots,ensemble_size,calibration_distance,corrected_tail,uncorrected_tail,improvement_percent,corrected_exponent,uncorrected_exponent,seed,time_ms")?;
            for r in results {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                    r.name,
                    r.qubits,
                    r.noise.code(),
                    r.estimator,
                    r.shots,
                    r.calibration_shots,
                    r.ensemble_size,
                    r.calibration_distance,
                    r.corrected_tail,
                    r.uncorrected_tail,
                    r.improvement_percent,
                    r.corrected_exponent.map(|b| b.to_string()).unwrap_or_default(),
                    r.uncorrected_exponent.map(|b| b.to_string()).unwrap_or_default(),
                    r.seed,
                    r.time_ms
                )?;
            }
            Ok(())
        })
    }

    /// Convert results to plain text summary
    pub fn to_text(results: &[BenchmarkResult]) -> String {
        let stats = BenchmarkStatistics::from_results(results);
        render(|out| {
            writeln!(out, "EMQST Benchmark Results")?;
            writeln!(out, "=======================\n")?;

            writeln!(out, "Summary:")?;
            writeln!(out, "  Benchmarks run: {}", stats.count)?;
            writeln!(
                out,
                "  Average improvement: {:.2}%",
                stats.avg_improvement_percent
            )?;
            writeln!(
                out,
                "  Best improvement: {:.2}%",
                stats.max_improvement_percent
            )?;
            writeln!(
                out,
                "  Worst improvement: {:.2}%",
                stats.min_improvement_percent
            )?;
            writeln!(
                out,
                "  Corrected win rate: {:.1}%",
                stats.corrected_win_rate * 100.0
            )?;
            writeln!(
                out,
                "  Total time: {:.2}s\n",
                stats.total_time_ms as f64 / 1000.0
            )?;

            writeln!(out, "Individual Results:")?;
            for r in results {
                writeln!(
                    out,
                    "  {} ({}Q, {}, {}, {} shots): corrected {:.3e} vs uncorrected {:.3e} ({:+.2}%), {}ms",
                    r.name,
                    r.qubits,
                    r.noise.label(),
                    r.estimator,
                    r.shots,
                    r.corrected_tail,
                    r.uncorrected_tail,
                    r.improvement_percent,
                    r.time_ms
                )?;
            }
            Ok(())
        })
    }

    // ========================================================================
    // Specialized Reports
    // ========================================================================

    /// Generate comparison report between two result sets
    pub fn comparison_report(baseline: &[BenchmarkResult], candidate: &[BenchmarkResult]) -> String {
        let base = BenchmarkStatistics::from_results(baseline);
        let cand = BenchmarkStatistics::from_results(candidate);
        render(|out| {
            writeln!(out, "# EMQST Comparison Report\n")?;

            writeln!(out, "## Statistics Comparison\n")?;
            writeln!(out, "| Metric | Baseline | Candidate | Change |")?;
            writeln!(out, "|--------|----------|-----------|--------|")?;
            writeln!(
                out,
                "| Avg Improvement | {:.2}% | {:.2}% | {:.2}% |",
                base.avg_improvement_percent,
                cand.avg_improvement_percent,
                cand.avg_improvement_percent - base.avg_improvement_percent
            )?;
            writeln!(
                out,
                "| Avg Cal. Distance | {:.3e} | {:.3e} | {:.3e} |",
                base.avg_calibration_distance,
                cand.avg_calibration_distance,
                cand.avg_calibration_distance - base.avg_calibration_distance
            )?;
            writeln!(
                out,
                "| Avg Time (ms) | {:.0} | {:.0} | {:.0} |",
                base.avg_time_ms,
                cand.avg_time_ms,
                cand.avg_time_ms - base.avg_time_ms
            )?;
            writeln!(
                out,
                "| Corrected Win Rate | {:.1}% | {:.1}% | {:.1}% |",
                base.corrected_win_rate * 100.0,
                cand.corrected_win_rate * 100.0,
                (cand.corrected_win_rate - base.corrected_win_rate) * 100.0
            )?;
            Ok(())
        })
    }

    /// Generate noise sweep report
    pub fn noise_sweep_report(results: &[BenchmarkResult]) -> String {
        render(|out| {
            writeln!(out, "# Noise Sweep Analysis\n")?;
            writeln!(
                out,
                "| Noise | Cal. Distance | Corrected | Uncorrected | Improvement% |"
            )?;
            writeln!(
                out,
                "|-------|---------------|-----------|-------------|--------------|"
            )?;
            for r in results {
                writeln!(
                    out,
                    "| {} | {:.3e} | {:.4e} | {:.4e} | {:.2}% |",
                    r.noise,
                    r.calibration_distance,
                    r.corrected_tail,
                    r.uncorrected_tail,
                    r.improvement_percent
                )?;
            }
            Ok(())
        })
    }

    /// Generate shot sweep report
    pub fn shot_sweep_report(results: &[BenchmarkResult]) -> String {
        render(|out| {
            writeln!(out, "# Shot Sweep Analysis\n")?;
            writeln!(
                out,
                "| Shots | Corrected | Uncorrected | b (corr) | b (uncorr) | Time(ms) |"
            )?;
            writeln!(
                out,
                "|-------|-----------|-------------|----------|------------|----------|"
            )?;
            for r in results {
                writeln!(
                    out,
                    "| {} | {:.4e} | {:.4e} | {} | {} | {} |",
                    r.shots,
                    r.corrected_tail,
                    r.uncorrected_tail,
                    exponent(r.corrected_exponent),
                    exponent(r.uncorrected_exponent),
                    r.time_ms
                )?;
            }
            Ok(())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
