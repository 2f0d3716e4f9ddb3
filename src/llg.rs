// src/llg.rs
//
// Landau–Lifshitz–Gilbert dynamics of the chain:
//
//   dS/dt = -γ S × B_eff - α S × (S × B_eff)
//
// B_eff comes from `effective_field::build_b_eff` on the renormalised spins
// plus the external field sampled at time t. The flat 3N state is advanced
// by the adaptive Dormand–Prince stepper in `ode`.

use std::cell::{Cell, RefCell};

use crate::chain::ChainField;
use crate::effective_field::build_b_eff;
use crate::error::ChainError;
use crate::external_field::ExternalField;
use crate::ode::{OdeSystem, Rk45Settings, integrate};
use crate::params::{CouplingParameters, LlgParams};
use crate::trajectory::Trajectory;
use crate::vec3::{cross, try_normalize};

/// LLG right-hand side for one site.
#[inline]
pub fn llg_torque(s: [f64; 3], b: [f64; 3], params: &LlgParams) -> [f64; 3] {
    let s_cross_b = cross(s, b);
    let s_cross_s_cross_b = cross(s, s_cross_b);
    [
        -params.gamma * s_cross_b[0] - params.alpha * s_cross_s_cross_b[0],
        -params.gamma * s_cross_b[1] - params.alpha * s_cross_s_cross_b[1],
        -params.gamma * s_cross_b[2] - params.alpha * s_cross_s_cross_b[2],
    ]
}

struct LlgScratch {
    spins: ChainField,
    h_ext: ChainField,
    b_eff: ChainField,
}

/// The chain as an ODE system on the flattened state [x0, y0, z0, x1, ...].
pub struct LlgSystem<'a, F: ExternalField> {
    coupling: CouplingParameters,
    params: LlgParams,
    field: &'a F,
    scratch: RefCell<LlgScratch>,
    degenerate_sites: Cell<usize>,
}

impl<'a, F: ExternalField> LlgSystem<'a, F> {
    pub fn new(n_sites: usize, coupling: CouplingParameters, params: LlgParams, field: &'a F) -> Self {
        Self {
            coupling,
            params,
            field,
            scratch: RefCell::new(LlgScratch {
                spins: ChainField::zeros(n_sites),
                h_ext: ChainField::zeros(n_sites),
                b_eff: ChainField::zeros(n_sites),
            }),
            degenerate_sites: Cell::new(0),
        }
    }

    /// Zero-norm sites met so far (each occurrence in each evaluation counts).
    pub fn degenerate_sites(&self) -> usize {
        self.degenerate_sites.get()
    }
}

impl<F: ExternalField> OdeSystem for LlgSystem<'_, F> {
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let mut guard = self.scratch.borrow_mut();
        let scratch = &mut *guard;

        // Renormalise the integrator's intermediate state; zero-norm sites are left as is.
        scratch.spins.copy_from_flat(y);
        let degenerate = scratch.spins.renormalize();
        if degenerate > 0 {
            self.degenerate_sites.set(self.degenerate_sites.get() + degenerate);
        }

        let h_ext = if self.field.is_zero() {
            None
        } else {
            scratch.h_ext.set_uniform(0.0, 0.0, 0.0);
            self.field.accumulate(t, &mut scratch.h_ext);
            Some(&scratch.h_ext)
        };

        build_b_eff(&scratch.spins, &self.coupling, h_ext, &mut scratch.b_eff);

        for ((out, s), b) in dydt
            .chunks_exact_mut(3)
            .zip(scratch.spins.data.iter())
            .zip(scratch.b_eff.data.iter())
        {
            let d = llg_torque(*s, *b, &self.params);
            out.copy_from_slice(&d);
        }
    }

    fn project(&self, y: &mut [f64]) {
        for c in y.chunks_exact_mut(3) {
            if let Some(u) = try_normalize([c[0], c[1], c[2]]) {
                c.copy_from_slice(&u);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
    /// Zero-norm sites skipped during renormalisation.
    pub degenerate_sites: usize,
}

/// Output times 0, dt, 2dt, ... strictly below `t_end` (plus `t_start` offset).
pub fn sample_times(t_start: f64, t_end: f64, dt: f64) -> Vec<f64> {
    if !(dt > 0.0) || !(t_end > t_start) {
        return Vec::new();
    }
    let n = ((t_end - t_start) / dt).ceil() as usize;
    (0..n)
        .map(|k| t_start + k as f64 * dt)
        .filter(|&t| t < t_end)
        .collect()
}

/// Integrate the LLG equation from `initial` over `t_span`, sampling the
/// configuration at every time in `t_eval`.
///
/// Stepper failure is returned as `ChainError::Integration`; no partial
/// trajectory is produced.
pub fn integrate_llg<F: ExternalField>(
    initial: &ChainField,
    coupling: &CouplingParameters,
    params: &LlgParams,
    field: &F,
    t_span: (f64, f64),
    t_eval: &[f64],
    settings: &Rk45Settings,
) -> Result<(Trajectory, IntegrationReport), ChainError> {
    if initial.is_empty() {
        return Err(ChainError::EmptyChain);
    }
    coupling.validate()?;
    params.validate()?;
    settings.validate()?;

    let n = initial.len();
    let system = LlgSystem::new(n, *coupling, *params, field);
    let y0 = initial.flatten();

    let sol = integrate(&system, t_span, &y0, t_eval, settings)?;

    let mut frames = Vec::with_capacity(sol.y.len());
    for y in &sol.y {
        frames.push(ChainField::from_flat(y)?);
    }

    let report = IntegrationReport {
        accepted_steps: sol.stats.accepted_steps,
        rejected_steps: sol.stats.rejected_steps,
        rhs_evaluations: sol.stats.rhs_evaluations,
        degenerate_sites: system.degenerate_sites(),
    };

    if report.degenerate_sites > 0 {
        log::warn!(
            "llg: {} zero-norm site evaluations were left unnormalised",
            report.degenerate_sites
        );
    }
    log::debug!(
        "llg: N={} accepted={} rejected={} rhs={}",
        n,
        report.accepted_steps,
        report.rejected_steps,
        report.rhs_evaluations
    );

    Ok((Trajectory::new(sol.t, frames)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_field::{UniformBias, ZeroField};
    use crate::ode::OdeError;

    #[test]
    fn torque_vanishes_for_parallel_field() {
        let p = LlgParams {
            gamma: 1.0,
            alpha: 0.3,
        };
        let d = llg_torque([0.0, 0.0, 1.0], [0.0, 0.0, 5.0], &p);
        assert_eq!(d, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn damping_pulls_towards_field() {
        // S along x, B along z: damping term -α S×(S×B) = α B_perp (towards +z)
        let p = LlgParams {
            gamma: 0.0,
            alpha: 1.0,
        };
        let d = llg_torque([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], &p);
        assert!((d[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn sample_times_exclude_end() {
        let t = sample_times(0.0, 2.0, 0.5);
        assert_eq!(t, vec![0.0, 0.5, 1.0, 1.5]);
        assert!(sample_times(0.0, 1.0, 0.0).is_empty());
        assert_eq!(sample_times(0.0, 200.0, 0.5).len(), 400);
    }

    #[test]
    fn rhs_renormalises_its_input() {
        let field = ZeroField;
        let c = CouplingParameters::new(1.0, 0.3, -0.1);
        let p = LlgParams::default();
        let sys = LlgSystem::new(3, c, p, &field);

        let unit = [0.6, 0.0, 0.8, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let scaled: Vec<f64> = unit.iter().map(|v| 3.0 * v).collect();

        let mut d1 = [0.0; 9];
        let mut d2 = [0.0; 9];
        sys.rhs(0.0, &unit, &mut d1);
        sys.rhs(0.0, &scaled, &mut d2);
        for k in 0..9 {
            assert!((d1[k] - d2[k]).abs() < 1e-14);
        }
    }

    #[test]
    fn zero_norm_sites_are_counted_not_fatal() {
        let field = ZeroField;
        let sys = LlgSystem::new(2, CouplingParameters::default(), LlgParams::default(), &field);
        let y = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let mut d = [0.0; 6];
        sys.rhs(0.0, &y, &mut d);
        assert_eq!(sys.degenerate_sites(), 1);
        assert!(d.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn uniform_state_is_stationary_under_parallel_bias() {
        let m = ChainField::new(16);
        let bias = UniformBias::along_z(0.5);
        let t_eval = sample_times(0.0, 5.0, 1.0);
        let (traj, report) = integrate_llg(
            &m,
            &CouplingParameters::default(),
            &LlgParams::default(),
            &bias,
            (0.0, 5.0),
            &t_eval,
            &Rk45Settings::default(),
        )
        .unwrap();

        assert_eq!(traj.len(), 5);
        assert_eq!(report.degenerate_sites, 0);
        let last = traj.frames().last().unwrap();
        assert!(last.max_abs_diff(&m) < 1e-12);
    }

    #[test]
    fn empty_chain_is_rejected() {
        let res = integrate_llg(
            &ChainField::new(0),
            &CouplingParameters::default(),
            &LlgParams::default(),
            &ZeroField,
            (0.0, 1.0),
            &[0.0],
            &Rk45Settings::default(),
        );
        assert!(matches!(res, Err(ChainError::EmptyChain)));
    }

    #[test]
    fn zero_first_step_is_a_settings_error() {
        let settings = Rk45Settings {
            h_init: Some(0.0),
            ..Rk45Settings::default()
        };
        let res = integrate_llg(
            &ChainField::new(4),
            &CouplingParameters::default(),
            &LlgParams::default(),
            &ZeroField,
            (0.0, 1.0),
            &[1.0],
            &settings,
        );
        assert!(matches!(
            res,
            Err(ChainError::Integration(OdeError::InvalidSettings { field: "h_init", .. }))
        ));
    }
}
