//! Bayesian mean state estimation
//!
//! Gantree: L3_Estimation → BmeEstimator
//!
//! Sequential importance sampling over density matrices `ρ = AA† / Tr AA†`
//! with a complex Ginibre prior on `A` (the Hilbert-Schmidt measure). Every
//! shot multiplies the weights by the outcome likelihood; when the effective
//! sample size collapses the population is resampled and rejuvenated with
//! Metropolis-Hastings moves that target the full posterior.

use crate::estimator::Trajectory;
use crate::outcomes::{CountTable, OutcomeRecord};
use emqst_core::constants::estimation::{
    BME_MH_STEPS, BME_PARTICLES, BME_PROPOSAL_SCALE, BME_RESAMPLE_FRACTION,
};
use emqst_core::constants::numerics::PROBABILITY_FLOOR;
use emqst_core::density::DensityMatrix;
use emqst_core::error::{EmqstError, EmqstResult};
use emqst_core::linalg::{self, Operator};
use emqst_core::povm::MeasurementOperatorSet;
use emqst_core::random;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// SIS posterior-mean estimator
/// Gantree: BmeEstimator // 베이지안 평균 추정
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmeEstimator {
    /// Number of particles
    pub particles: usize,
    /// Resample when ESS / particles falls below this
    pub resample_fraction: f64,
    /// MH moves per particle after resampling
    pub mh_steps: usize,
    /// Random-walk scale on the Ginibre parameters
    pub proposal_scale: f64,
}

impl Default for BmeEstimator {
    fn default() -> Self {
        Self {
            particles: BME_PARTICLES,
            resample_fraction: BME_RESAMPLE_FRACTION,
            mh_steps: BME_MH_STEPS,
            proposal_scale: BME_PROPOSAL_SCALE,
        }
    }
}

/// One weighted sample
#[derive(Debug, Clone)]
struct Particle {
    factor: Operator,
    rho: Operator,
    log_weight: f64,
}

impl Particle {
    fn from_factor(factor: Operator) -> Self {
        let rho = normalized_gram(&factor);
        Self {
            factor,
            rho,
            log_weight: 0.0,
        }
    }
}

fn normalized_gram(a: &Operator) -> Operator {
    let g = a * a.adjoint();
    let tr = linalg::real_trace(&g).max(f64::MIN_POSITIVE);
    linalg::scale(&g, 1.0 / tr)
}

impl BmeEstimator {
    /// Check parameters
    pub fn validate(&self) -> EmqstResult<()> {
        if self.particles == 0 {
            return Err(EmqstError::InvalidParameter("BME needs at least one particle".into()));
        }
        if !(0.0..=1.0).contains(&self.resample_fraction) {
            return Err(EmqstError::InvalidParameter(format!(
                "resample fraction must be in [0, 1], got {}",
                self.resample_fraction
            )));
        }
        if self.proposal_scale.is_nan() || self.proposal_scale <= 0.0 {
            return Err(EmqstError::InvalidParameter(
                "proposal scale must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Estimate along one outcome record
    /// Gantree: estimate(ops,record,truth,rng) -> Result<Trajectory> // estimate_bme
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        operators: &MeasurementOperatorSet,
        record: &OutcomeRecord,
        true_state: &DensityMatrix,
        rng: &mut R,
    ) -> EmqstResult<Trajectory> {
        self.validate()?;
        let dim = operators.dim();
        let mut population: Vec<Particle> = (0..self.particles)
            .map(|_| Particle::from_factor(random::ginibre(dim, dim, rng)))
            .collect();
        let mut counts = CountTable::new(operators);
        let mut infidelity = Vec::with_capacity(record.len());
        let mut estimate = DensityMatrix::maximally_mixed(dim);

        for shot in record.iter() {
            counts.add(shot);
            let element = operators
                .get(shot.povm)
                .and_then(|p| p.element(shot.outcome))
                .ok_or(EmqstError::DimensionMismatch {
                    expected: operators.len(),
                    found: shot.povm + 1,
                })?;

            for particle in population.iter_mut() {
                let p = linalg::trace_product(&particle.rho, element).max(PROBABILITY_FLOOR);
                particle.log_weight += p.ln();
            }
            normalize_log_weights(&mut population);

            if effective_sample_size(&population) < self.resample_fraction * self.particles as f64 {
                population = systematic_resample(&population, rng);
                self.rejuvenate(&mut population, operators, &counts, rng);
            }

            estimate = DensityMatrix::from_unnormalized(&posterior_mean(&population, dim))?;
            infidelity.push(estimate.infidelity(true_state));
        }

        Ok(Trajectory {
            infidelity,
            estimate,
        })
    }

    /// Metropolis-Hastings random walk on every particle's factor
    fn rejuvenate<R: Rng + ?Sized>(
        &self,
        population: &mut [Particle],
        operators: &MeasurementOperatorSet,
        counts: &CountTable,
        rng: &mut R,
    ) {
        let dim = operators.dim();
        for particle in population.iter_mut() {
            let mut current = log_target(&particle.factor, &particle.rho, operators, counts);
            for _ in 0..self.mh_steps {
                let step = linalg::scale(&random::ginibre(dim, dim, rng), self.proposal_scale);
                let proposal = &particle.factor + step;
                let rho = normalized_gram(&proposal);
                let candidate = log_target(&proposal, &rho, operators, counts);
                if rng.gen::<f64>().ln() < candidate - current {
                    particle.factor = proposal;
                    particle.rho = rho;
                    current = candidate;
                }
            }
        }
    }
}

/// log prior(A) + log likelihood(ρ(A))
fn log_target(
    factor: &Operator,
    rho: &Operator,
    operators: &MeasurementOperatorSet,
    counts: &CountTable,
) -> f64 {
    let prior = -factor.norm_squared();
    let likelihood: f64 = counts
        .nonzero()
        .filter_map(|(j, k, n)| {
            let e = operators.get(j)?.element(k)?;
            Some(n as f64 * linalg::trace_product(rho, e).max(PROBABILITY_FLOOR).ln())
        })
        .sum();
    prior + likelihood
}

/// Shift log weights so they sum to one in linear space
fn normalize_log_weights(population: &mut [Particle]) {
    let max = population
        .iter()
        .map(|p| p.log_weight)
        .fold(f64::NEG_INFINITY, f64::max);
    let total: f64 = population.iter().map(|p| (p.log_weight - max).exp()).sum();
    let shift = max + total.ln();
    for particle in population.iter_mut() {
        particle.log_weight -= shift;
    }
}

/// 1 / Σ w²
fn effective_sample_size(population: &[Particle]) -> f64 {
    let sum_sq: f64 = population.iter().map(|p| (2.0 * p.log_weight).exp()).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

/// Systematic resampling; returned particles carry equal weight
fn systematic_resample<R: Rng + ?Sized>(population: &[Particle], rng: &mut R) -> Vec<Particle> {
    let n = population.len();
    let equal = -(n as f64).ln();
    let offset: f64 = rng.gen::<f64>() / n as f64;
    let mut resampled = Vec::with_capacity(n);
    let mut cumulative = 0.0;
    let mut source = 0;

    for i in 0..n {
        let target = offset + i as f64 / n as f64;
        while source < n - 1 && cumulative + population[source].log_weight.exp() < target {
            cumulative += population[source].log_weight.exp();
            source += 1;
        }
        let mut chosen = population[source].clone();
        chosen.log_weight = equal;
        resampled.push(chosen);
    }
    resampled
}

/// Σ w_i ρ_i
fn posterior_mean(population: &[Particle], dim: usize) -> Operator {
    population
        .iter()
        .fold(Operator::zeros(dim, dim), |acc, p| acc + linalg::scale(&p.rho, p.log_weight.exp()))
}
