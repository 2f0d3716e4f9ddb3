// src/ground_state.rs
//
// Projected-gradient relaxation towards a local energy minimum.
//
// Update (zero external field, one effective-field build per step):
//   S_i <- normalize(S_i + step · B_eff,i)
//
// Since B_eff = -∂E/∂S, this is gradient descent followed by projection back
// onto the unit sphere at every site.
//
// Stop: every `check_every` steps, compare against the configuration saved at
// the previous checkpoint; converged when max |ΔS component| < tolerance.
// Running out of steps is not an error: the current configuration is returned
// and the report says `converged = false`.

use serde::{Deserialize, Serialize};

use crate::chain::ChainField;
use crate::effective_field::build_b_eff;
use crate::error::ChainError;
use crate::initial_states::{init_random_cube, seeded_rng};
use crate::params::CouplingParameters;
use crate::vec3::try_normalize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundStateSettings {
    pub max_steps: usize,
    pub tolerance: f64,
    /// Descent step multiplying B_eff.
    pub relaxation_step: f64,
    /// Steps between convergence checks.
    pub check_every: usize,
    /// Seed for the random initial configuration. `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for GroundStateSettings {
    fn default() -> Self {
        Self {
            max_steps: 20_000,
            tolerance: 1e-8,
            relaxation_step: 0.05,
            check_every: 500,
            seed: None,
        }
    }
}

impl GroundStateSettings {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "tolerance",
                constraint: "must be finite and >= 0",
            });
        }
        if !(self.relaxation_step > 0.0) || !self.relaxation_step.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "relaxation_step",
                constraint: "must be finite and > 0",
            });
        }
        if self.check_every == 0 {
            return Err(ChainError::InvalidParameter {
                field: "check_every",
                constraint: "must be >= 1",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundStateReport {
    pub steps: usize,
    pub converged: bool,
    /// Max component change over the last checkpoint interval (INFINITY if none was reached).
    pub final_max_change: f64,
    /// Zero-norm sites left unnormalised (summed over all steps).
    pub degenerate_sites: usize,
    /// Seed of the initial configuration, if it was random.
    pub seed: Option<u64>,
}

/// Relax `m` in place (zero external field). `settings.seed` is ignored here.
pub fn relax_in_place(
    m: &mut ChainField,
    coupling: &CouplingParameters,
    settings: &GroundStateSettings,
) -> GroundStateReport {
    let n = m.len();
    let mut b_eff = ChainField::zeros(n);
    let mut checkpoint = m.clone();
    let check_every = settings.check_every.max(1);

    let mut degenerate = 0usize;
    let mut last_change = f64::INFINITY;

    for step in 1..=settings.max_steps {
        build_b_eff(m, coupling, None, &mut b_eff);

        for (s, b) in m.data.iter_mut().zip(b_eff.data.iter()) {
            let trial = [
                s[0] + settings.relaxation_step * b[0],
                s[1] + settings.relaxation_step * b[1],
                s[2] + settings.relaxation_step * b[2],
            ];
            match try_normalize(trial) {
                Some(u) => *s = u,
                None => {
                    *s = trial;
                    degenerate += 1;
                }
            }
        }

        if step % check_every == 0 {
            last_change = m.max_abs_diff(&checkpoint);
            log::debug!("ground_state: step={} max_change={:.3e}", step, last_change);

            if last_change < settings.tolerance {
                return finish(step, true, last_change, degenerate);
            }
            checkpoint.data.copy_from_slice(&m.data);
        }
    }

    log::warn!(
        "ground_state: not converged after {} steps (last max change {:.3e}, tolerance {:.1e})",
        settings.max_steps,
        last_change,
        settings.tolerance
    );
    finish(settings.max_steps, false, last_change, degenerate)
}

fn finish(steps: usize, converged: bool, final_max_change: f64, degenerate: usize) -> GroundStateReport {
    if degenerate > 0 {
        log::warn!("ground_state: {} zero-norm site updates were left unnormalised", degenerate);
    }
    GroundStateReport {
        steps,
        converged,
        final_max_change,
        degenerate_sites: degenerate,
        seed: None,
    }
}

/// Relax a random (cube-then-normalise) configuration of `n` sites.
///
/// The seed actually used is returned in the report so that a run with
/// `seed: None` can be reproduced.
pub fn find_ground_state(
    n: usize,
    coupling: &CouplingParameters,
    settings: &GroundStateSettings,
) -> Result<(ChainField, GroundStateReport), ChainError> {
    if n == 0 {
        return Err(ChainError::EmptyChain);
    }
    coupling.validate()?;
    settings.validate()?;

    let seed = settings.seed.unwrap_or_else(rand::random);
    let mut rng = seeded_rng(seed);
    let mut m = ChainField::new(n);
    init_random_cube(&mut m, &mut rng);

    let mut report = relax_in_place(&mut m, coupling, settings);
    report.seed = Some(seed);

    log::debug!(
        "ground_state: N={} seed={} steps={} converged={}",
        n,
        seed,
        report.steps,
        report.converged
    );
    Ok((m, report))
}
