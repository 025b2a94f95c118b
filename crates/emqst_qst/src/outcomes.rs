//! Per-shot outcome data
//!
//! Gantree: L3_Estimation → MeasurementData
//!
//! Raw QST data is generated once under the noisy operators and then handed
//! read-only to every estimation track, so the corrected and uncorrected
//! tracks differ only in the operators they assume. Shot `i` of every record
//! uses POVM `i mod m`.

use emqst_core::ensemble::TrueStateEnsemble;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::povm::MeasurementOperatorSet;
use emqst_core::random::{self, QST_DATA_STREAM};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Outcome
// ============================================================================

/// One shot: which POVM was measured and which outcome clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    /// POVM index in the operator set
    pub povm: usize,
    /// Outcome index within the POVM
    pub outcome: usize,
}

impl Outcome {
    /// Create new outcome
    pub fn new(povm: usize, outcome: usize) -> Self {
        Self { povm, outcome }
    }
}

/// Ordered shots taken on one true state
/// Gantree: OutcomeRecord // 상태별 측정 기록
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeRecord {
    outcomes: Vec<Outcome>,
}

impl OutcomeRecord {
    /// Create from shots
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    /// Number of shots
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Shots in order
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Iterate shots
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }
}

// ============================================================================
// MeasurementData
// ============================================================================

/// Outcome records for a whole ensemble
/// Gantree: MeasurementData // 공유 측정 데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementData {
    records: Vec<OutcomeRecord>,
    shots: usize,
}

impl MeasurementData {
    /// Sample every record under the (noisy) operators, parallel over states
    /// Gantree: simulate(ops,ensemble,shots,seed) -> Result<Self> // 데이터 생성
    pub fn simulate(
        operators: &MeasurementOperatorSet,
        ensemble: &TrueStateEnsemble,
        shots: usize,
        seed: u64,
    ) -> EmqstResult<Self> {
        ensemble.validate_qubits(operators.num_qubits())?;
        let m = operators.len();

        let keys = ensemble.stream_keys();
        let records = ensemble
            .states()
            .par_iter()
            .zip(keys.par_iter())
            .map(|(rho, &key)| {
                let table: Vec<Vec<f64>> = operators.iter().map(|p| p.probabilities(rho)).collect();
                let mut rng = random::trial_rng(seed, QST_DATA_STREAM, key);
                let outcomes = (0..shots)
                    .map(|i| {
                        let povm = i % m;
                        Outcome::new(povm, random::categorical(&table[povm], &mut rng))
                    })
                    .collect();
                OutcomeRecord::new(outcomes)
            })
            .collect();

        Ok(Self { records, shots })
    }

    /// Wrap externally measured records (all of equal length)
    pub fn from_records(records: Vec<OutcomeRecord>) -> EmqstResult<Self> {
        let shots = records.first().map_or(0, OutcomeRecord::len);
        if let Some(bad) = records.iter().find(|r| r.len() != shots) {
            return Err(EmqstError::DimensionMismatch {
                expected: shots,
                found: bad.len(),
            });
        }
        Ok(Self { records, shots })
    }

    /// Number of records (true states)
    pub fn num_states(&self) -> usize {
        self.records.len()
    }

    /// Shots per record
    pub fn shots(&self) -> usize {
        self.shots
    }

    /// Record for one state
    pub fn record(&self, index: usize) -> Option<&OutcomeRecord> {
        self.records.get(index)
    }

    /// All records
    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    /// Keep only the first `shots` shots of every record
    pub fn truncated(&self, shots: usize) -> EmqstResult<Self> {
        if shots > self.shots {
            return Err(EmqstError::InsufficientData {
                needed: shots,
                available: self.shots,
            });
        }
        Ok(Self {
            records: self
                .records
                .iter()
                .map(|r| OutcomeRecord::new(r.outcomes[..shots].to_vec()))
                .collect(),
            shots,
        })
    }

    /// Check every shot refers to an existing POVM outcome
    pub fn check_against(&self, operators: &MeasurementOperatorSet) -> EmqstResult<()> {
        for record in &self.records {
            for shot in record.iter() {
                let povm = operators.get(shot.povm).ok_or(EmqstError::DimensionMismatch {
                    expected: operators.len(),
                    found: shot.povm + 1,
                })?;
                if shot.outcome >= povm.num_outcomes() {
                    return Err(EmqstError::DimensionMismatch {
                        expected: povm.num_outcomes(),
                        found: shot.outcome + 1,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// CountTable
// ============================================================================

/// Cumulative outcome counts, `[povm][outcome]`
/// Gantree: CountTable // 누적 계수
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTable {
    counts: Vec<Vec<u64>>,
    total: u64,
}

impl CountTable {
    /// Empty table shaped like an operator set
    pub fn new(operators: &MeasurementOperatorSet) -> Self {
        Self {
            counts: operators.iter().map(|p| vec![0; p.num_outcomes()]).collect(),
            total: 0,
        }
    }

    /// Record one shot
    pub fn add(&mut self, shot: &Outcome) {
        self.counts[shot.povm][shot.outcome] += 1;
        self.total += 1;
    }

    /// Total shots recorded
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count for one outcome
    pub fn count(&self, povm: usize, outcome: usize) -> u64 {
        self.counts[povm][outcome]
    }

    /// Non-zero entries as (povm, outcome, count)
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.counts.iter().enumerate().flat_map(|(j, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, n)| **n > 0)
                .map(move |(k, n)| (j, k, *n))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_povms() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 1).unwrap();
        let data = MeasurementData::simulate(&ops, &ensemble, 10, 5).unwrap();
        assert_eq!(data.num_states(), 2);
        assert_eq!(data.shots(), 10);
        for record in data.records() {
            for (i, shot) in record.iter().enumerate() {
                assert_eq!(shot.povm, i % 3);
                assert!(shot.outcome < 2);
            }
        }
    }

    #[test]
    fn test_simulation_is_seeded() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let ensemble = TrueStateEnsemble::haar_random(1, 3, 1).unwrap();
        let a = MeasurementData::simulate(&ops, &ensemble, 50, 9).unwrap();
        let b = MeasurementData::simulate(&ops, &ensemble, 50, 9).unwrap();
        let c = MeasurementData::simulate(&ops, &ensemble, 50, 10).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deterministic_outcomes_for_eigenstate() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let zero = emqst_core::DensityMatrix::from_bloch([0.0, 0.0, 1.0]).unwrap();
        let ensemble = TrueStateEnsemble::new(vec![zero]);
        let data = MeasurementData::simulate(&ops, &ensemble, 30, 2).unwrap();
        for shot in data.records()[0].iter().filter(|s| s.povm == 2) {
            assert_eq!(shot.outcome, 0);
        }
    }

    #[test]
    fn test_count_table() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let mut table = CountTable::new(&ops);
        table.add(&Outcome::new(0, 1));
        table.add(&Outcome::new(0, 1));
        table.add(&Outcome::new(2, 0));
        assert_eq!(table.total(), 3);
        assert_eq!(table.count(0, 1), 2);
        assert_eq!(table.nonzero().count(), 2);
    }

    #[test]
    fn test_records_validated() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let bad = MeasurementData::from_records(vec![OutcomeRecord::new(vec![Outcome::new(4, 0)])])
            .unwrap();
        assert!(bad.check_against(&ops).is_err());
        let uneven = MeasurementData::from_records(vec![
            OutcomeRecord::new(vec![Outcome::new(0, 0)]),
            OutcomeRecord::new(vec![]),
        ]);
        assert!(uneven.is_err());
    }

    #[test]
    fn test_truncated() {
        let ops = MeasurementOperatorSet::pauli(1).unwrap();
        let ensemble = TrueStateEnsemble::haar_random(1, 2, 1).unwrap();
        let data = MeasurementData::simulate(&ops, &ensemble, 20, 5).unwrap();
        let short = data.truncated(8).unwrap();
        assert_eq!(short.shots(), 8);
        assert_eq!(short.records()[1].outcomes(), &data.records()[1].outcomes()[..8]);
        assert!(data.truncated(21).is_err());
    }
}
