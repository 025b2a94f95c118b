//! Measured (hardware) data
//!
//! Gantree: L4_Integration → ExperimentalData
//!
//! In experimental mode no outcome is simulated: calibration counts and
//! the per-shot QST records come from a JSON document.

use emqst_calibration::CalibrationData;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_qst::{MeasurementData, OutcomeRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Measured calibration counts and QST records
/// Gantree: ExperimentalData // 실험 데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentalData {
    /// Calibration counts, `[povm][calibration state][outcome]`
    pub calibration_counts: Vec<Vec<Vec<u64>>>,
    /// One record per true state
    pub records: Vec<OutcomeRecord>,
}

impl ExperimentalData {
    /// Create from measured counts and records
    pub fn new(calibration_counts: Vec<Vec<Vec<u64>>>, records: Vec<OutcomeRecord>) -> Self {
        Self {
            calibration_counts,
            records,
        }
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> EmqstResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON file
    pub fn load(path: impl AsRef<Path>) -> EmqstResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            EmqstError::MissingExperimentalData(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Calibration frequencies for device tomography
    pub fn calibration_data(&self) -> EmqstResult<CalibrationData> {
        CalibrationData::from_counts(&self.calibration_counts)
    }

    /// QST records shared by both tracks
    pub fn measurement_data(&self) -> EmqstResult<MeasurementData> {
        MeasurementData::from_records(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emqst_qst::Outcome;

    fn sample() -> ExperimentalData {
        ExperimentalData::new(
            vec![vec![vec![90, 10], vec![40, 60]]],
            vec![
                OutcomeRecord::new(vec![Outcome::new(0, 1), Outcome::new(0, 0)]),
                OutcomeRecord::new(vec![Outcome::new(0, 0), Outcome::new(0, 0)]),
            ],
        )
    }

    #[test]
    fn test_json_roundtrip() {
        let data = sample();
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(ExperimentalData::from_json(&json).unwrap(), data);
    }

    #[test]
    fn test_conversions() {
        let data = sample();
        let cal = data.calibration_data().unwrap();
        assert_eq!(cal.num_povms(), 1);
        assert_eq!(cal.shots_per_state(), Some(100));
        let qst = data.measurement_data().unwrap();
        assert_eq!(qst.num_states(), 2);
        assert_eq!(qst.shots(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = ExperimentalData::load("/nonexistent/emqst/data.json").unwrap_err();
        assert!(matches!(err, EmqstError::MissingExperimentalData(_)));
    }

    #[test]
    fn test_uneven_records_rejected() {
        let mut data = sample();
        data.records.push(OutcomeRecord::new(vec![Outcome::new(0, 0)]));
        assert!(data.measurement_data().is_err());
    }
}
