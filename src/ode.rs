// src/ode.rs
//
// Adaptive explicit Runge–Kutta integrator (Dormand–Prince 5(4), FSAL).
//
// - Generic over a right-hand side `OdeSystem::rhs(t, y, dydt)` on a flat state.
// - Error control: scaled RMS norm with scale_i = atol + rtol * max(|y_i|, |y_new_i|).
// - Output: the state at each requested time, hit exactly by clamping the step
//   to land on the next output time (the state is never interpolated).
// - After each accepted step `OdeSystem::project` may re-impose a constraint on
//   the state. The FSAL stage is reused, so a projection must not change the
//   value of the right-hand side.

use serde::{Deserialize, Serialize};

/// Right-hand side of dy/dt = f(t, y).
pub trait OdeSystem {
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);

    /// Re-impose a state constraint after an accepted step.
    fn project(&self, _y: &mut [f64]) {}
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OdeError {
    #[error("invalid time span [{t_start}, {t_end}]: need finite t_start < t_end")]
    InvalidSpan { t_start: f64, t_end: f64 },

    #[error("output times must be finite, non-decreasing and inside the time span")]
    InvalidOutputTimes,

    #[error("step size {h:.3e} fell below the minimum at t = {t}")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("step budget of {steps} attempts exhausted at t = {t}")]
    MaxStepsExceeded { t: f64, steps: usize },

    #[error("non-finite state encountered at t = {t}")]
    NonFinite { t: f64 },

    #[error("stepper setting `{field}` violates constraint: {constraint}")]
    InvalidSettings {
        field: &'static str,
        constraint: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rk45Settings {
    /// Relative tolerance.
    pub rtol: f64,
    /// Absolute tolerance.
    pub atol: f64,
    /// Controller safety factor.
    pub headroom: f64,
    /// Bounds on the step-size change per attempt.
    pub min_factor: f64,
    pub max_factor: f64,
    /// First step; chosen automatically when None.
    pub h_init: Option<f64>,
    /// Step ceiling; unbounded when None.
    pub h_max: Option<f64>,
    /// Absolute floor on the step size (a relative floor of 10 ulp(t) also applies).
    pub h_min: f64,
    /// Hard cap on step attempts (accepted + rejected).
    pub max_steps: usize,
}

impl Default for Rk45Settings {
    fn default() -> Self {
        Self {
            rtol: 1e-3,
            atol: 1e-6,
            headroom: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
            h_init: None,
            h_max: None,
            h_min: 1e-14,
            max_steps: 5_000_000,
        }
    }
}

impl Rk45Settings {
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), OdeError> {
        let bad = |field, constraint| Err(OdeError::InvalidSettings { field, constraint });

        if !(self.rtol.is_finite() && self.rtol >= 0.0) {
            return bad("rtol", "finite and >= 0");
        }
        if !(self.atol.is_finite() && self.atol >= 0.0) {
            return bad("atol", "finite and >= 0");
        }
        if self.rtol == 0.0 && self.atol == 0.0 {
            return bad("rtol/atol", "not both 0");
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return bad("headroom", "0 < headroom <= 1");
        }
        if !(self.min_factor > 0.0 && self.min_factor < 1.0) {
            return bad("min_factor", "0 < min_factor < 1");
        }
        if !(self.max_factor > 1.0) {
            return bad("max_factor", "max_factor > 1");
        }
        if let Some(h0) = self.h_init {
            if !(h0.is_finite() && h0 > 0.0) {
                return bad("h_init", "finite and > 0");
            }
        }
        if let Some(hm) = self.h_max {
            if !(hm > 0.0) {
                return bad("h_max", "> 0");
            }
        }
        if !(self.h_min.is_finite() && self.h_min >= 0.0) {
            return bad("h_min", "finite and >= 0");
        }
        if self.max_steps == 0 {
            return bad("max_steps", ">= 1");
        }
        Ok(())
    }

    #[inline]
    fn h_ceiling(&self) -> f64 {
        self.h_max.unwrap_or(f64::INFINITY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OdeStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
}

/// States at the requested output times.
#[derive(Debug, Clone)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub stats: OdeStats,
}

// Dormand–Prince tableau
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; 6]; 7] = [
    [0.0; 6],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    // Last row = 5th-order weights (FSAL)
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

// Difference between 5th- and embedded 4th-order weights
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

fn rms_scaled(v: &[f64], scale: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let s: f64 = v
        .iter()
        .zip(scale.iter())
        .map(|(x, sc)| {
            let r = x / sc;
            r * r
        })
        .sum();
    (s / v.len() as f64).sqrt()
}

/// Hairer–Wanner initial step heuristic.
fn initial_step<S: OdeSystem>(
    sys: &S,
    t0: f64,
    y0: &[f64],
    f0: &[f64],
    span: f64,
    settings: &Rk45Settings,
    stats: &mut OdeStats,
) -> f64 {
    let scale: Vec<f64> = y0
        .iter()
        .map(|y| settings.atol + y.abs() * settings.rtol)
        .collect();
    let d0 = rms_scaled(y0, &scale);
    let d1 = rms_scaled(f0, &scale);

    let h0 = (if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    })
    .min(span);

    let y1: Vec<f64> = y0.iter().zip(f0).map(|(y, f)| y + h0 * f).collect();
    let mut f1 = vec![0.0; y0.len()];
    sys.rhs(t0 + h0, &y1, &mut f1);
    stats.rhs_evaluations += 1;

    let df: Vec<f64> = f1.iter().zip(f0).map(|(a, b)| a - b).collect();
    let d2 = rms_scaled(&df, &scale) / h0;

    let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / 5.0)
    };

    (100.0 * h0).min(h1).min(span).min(settings.h_ceiling())
}

/// One Dormand–Prince attempt from (t, y) with step h.
///
/// On entry `k[0]` holds f(t, y). On exit `y_new` holds the 5th-order
/// solution, `k[6]` holds f(t + h, y_new) and the scaled error norm is returned.
fn dp_attempt<S: OdeSystem>(
    sys: &S,
    t: f64,
    h: f64,
    y: &[f64],
    k: &mut [Vec<f64>; 7],
    y_new: &mut [f64],
    settings: &Rk45Settings,
) -> f64 {
    let n = y.len();
    for s in 1..7 {
        let (done, rest) = k.split_at_mut(s);
        for i in 0..n {
            let mut acc = 0.0;
            for (j, kj) in done.iter().enumerate() {
                acc += A[s][j] * kj[i];
            }
            y_new[i] = y[i] + h * acc;
        }
        sys.rhs(t + C[s] * h, y_new, &mut rest[0]);
    }

    // After s = 6, y_new is the 5th-order solution (A[6] = b).
    let mut sum = 0.0;
    for i in 0..n {
        let mut err = 0.0;
        for (s, ks) in k.iter().enumerate() {
            err += E[s] * ks[i];
        }
        err *= h;
        let sc = settings.atol + settings.rtol * y[i].abs().max(y_new[i].abs());
        let r = err / sc;
        sum += r * r;
    }
    if n == 0 { 0.0 } else { (sum / n as f64).sqrt() }
}

/// Integrate dy/dt = f(t, y) from `t_span.0` to `t_span.1`, returning the
/// state at every time in `t_eval` (non-decreasing, within the span).
pub fn integrate<S: OdeSystem>(
    sys: &S,
    t_span: (f64, f64),
    y0: &[f64],
    t_eval: &[f64],
    settings: &Rk45Settings,
) -> Result<OdeSolution, OdeError> {
    settings.validate()?;
    let (t_start, t_end) = t_span;
    if !(t_start.is_finite() && t_end.is_finite() && t_start < t_end) {
        return Err(OdeError::InvalidSpan { t_start, t_end });
    }
    let in_span = |t: f64| t.is_finite() && t >= t_start && t <= t_end;
    if !t_eval.iter().all(|&t| in_span(t)) || t_eval.windows(2).any(|w| w[1] < w[0]) {
        return Err(OdeError::InvalidOutputTimes);
    }

    let n = y0.len();
    let mut stats = OdeStats::default();
    let mut t = t_start;
    let mut y = y0.to_vec();
    sys.project(&mut y);

    let mut k: [Vec<f64>; 7] = std::array::from_fn(|_| vec![0.0; n]);
    let mut y_new = vec![0.0; n];

    sys.rhs(t, &y, &mut k[0]);
    stats.rhs_evaluations += 1;

    let mut h = match settings.h_init {
        Some(h0) => h0.min(settings.h_ceiling()),
        None => initial_step(sys, t, &y, &k[0], t_end - t_start, settings, &mut stats),
    };

    let mut out_t = Vec::with_capacity(t_eval.len());
    let mut out_y = Vec::with_capacity(t_eval.len());

    for &target in t_eval {
        let mut rejected_this_step = false;

        while t < target {
            let remaining = target - t;
            let landing = h >= remaining;
            let h_try = if landing { remaining } else { h };

            if stats.accepted_steps + stats.rejected_steps >= settings.max_steps {
                return Err(OdeError::MaxStepsExceeded {
                    t,
                    steps: settings.max_steps,
                });
            }

            let err = dp_attempt(sys, t, h_try, &y, &mut k, &mut y_new, settings);
            stats.rhs_evaluations += 6;

            if !err.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
                // Hard rejection: retry with the largest allowed shrink.
                stats.rejected_steps += 1;
                rejected_this_step = true;
                h = h_try * settings.min_factor;
                if h < h_floor(t, settings) {
                    return Err(OdeError::NonFinite { t });
                }
                continue;
            }

            if err <= 1.0 {
                stats.accepted_steps += 1;
                t = if landing { target } else { t + h_try };
                std::mem::swap(&mut y, &mut y_new);
                sys.project(&mut y);
                k.swap(0, 6);

                let mut factor = if err == 0.0 {
                    settings.max_factor
                } else {
                    (settings.headroom * err.powf(-0.2)).min(settings.max_factor)
                };
                if rejected_this_step {
                    factor = factor.min(1.0);
                }
                let proposed = h_try * factor;
                // A step shortened only to land on an output time says nothing
                // about the stable step size; keep the previous one if larger.
                h = if landing && h_try < h {
                    proposed.max(h)
                } else {
                    proposed
                };
                h = h.min(settings.h_ceiling());
                rejected_this_step = false;
            } else {
                stats.rejected_steps += 1;
                rejected_this_step = true;
                let factor = (settings.headroom * err.powf(-0.2)).max(settings.min_factor);
                h = h_try * factor;
                if h < h_floor(t, settings) {
                    log::debug!("rk45: step underflow at t={:.6e}, h={:.3e}, err={:.3e}", t, h, err);
                    return Err(OdeError::StepSizeUnderflow { t, h });
                }
            }
        }

        out_t.push(target);
        out_y.push(y.clone());
    }

    Ok(OdeSolution {
        t: out_t,
        y: out_y,
        stats,
    })
}

#[inline]
fn h_floor(t: f64, settings: &Rk45Settings) -> f64 {
    settings.h_min.max(10.0 * f64::EPSILON * t.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;
    impl OdeSystem for Decay {
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -y[0];
        }
    }

    struct Oscillator;
    impl OdeSystem for Oscillator {
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        }
    }

    struct BlowUp;
    impl OdeSystem for BlowUp {
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[0] * y[0];
        }
    }

    #[test]
    fn exponential_decay_matches_closed_form() {
        let t_eval = [0.0, 0.5, 1.0, 2.0];
        let settings = Rk45Settings::with_tolerances(1e-10, 1e-12);
        let sol = integrate(&Decay, (0.0, 2.0), &[1.0], &t_eval, &settings).unwrap();

        assert_eq!(sol.t, t_eval.to_vec());
        for (t, y) in sol.t.iter().zip(sol.y.iter()) {
            let exact = (-t).exp();
            assert!(
                (y[0] - exact).abs() < 1e-8,
                "t={}: got {}, expected {}",
                t,
                y[0],
                exact
            );
        }
        assert!(sol.stats.accepted_steps > 0);
    }

    #[test]
    fn harmonic_oscillator_full_period() {
        let two_pi = 2.0 * std::f64::consts::PI;
        let settings = Rk45Settings::with_tolerances(1e-9, 1e-12);
        let sol = integrate(&Oscillator, (0.0, two_pi), &[1.0, 0.0], &[two_pi], &settings).unwrap();

        let y = &sol.y[0];
        assert!((y[0] - 1.0).abs() < 1e-6, "x(2pi) = {}", y[0]);
        assert!(y[1].abs() < 1e-6, "v(2pi) = {}", y[1]);
    }

    #[test]
    fn default_tolerances_are_loose_but_sane() {
        let sol = integrate(&Decay, (0.0, 5.0), &[1.0], &[5.0], &Rk45Settings::default()).unwrap();
        let exact = (-5.0_f64).exp();
        assert!((sol.y[0][0] - exact).abs() < 1e-4);
    }

    #[test]
    fn finite_time_blow_up_is_reported() {
        let settings = Rk45Settings {
            max_steps: 100_000,
            ..Rk45Settings::default()
        };
        let res = integrate(&BlowUp, (0.0, 2.0), &[1.0], &[2.0], &settings);
        assert!(res.is_err(), "integrating past y' = y^2 singularity must fail");
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let s = Rk45Settings::default();
        assert!(matches!(
            integrate(&Decay, (1.0, 1.0), &[1.0], &[1.0], &s),
            Err(OdeError::InvalidSpan { .. })
        ));
        assert!(matches!(
            integrate(&Decay, (0.0, 1.0), &[1.0], &[0.5, 0.2], &s),
            Err(OdeError::InvalidOutputTimes)
        ));
        assert!(matches!(
            integrate(&Decay, (0.0, 1.0), &[1.0], &[1.5], &s),
            Err(OdeError::InvalidOutputTimes)
        ));
    }

    #[test]
    fn degenerate_settings_are_rejected_up_front() {
        let zero_first_step = Rk45Settings {
            h_init: Some(0.0),
            ..Rk45Settings::default()
        };
        assert!(matches!(
            integrate(&Decay, (0.0, 1.0), &[1.0], &[1.0], &zero_first_step),
            Err(OdeError::InvalidSettings { field: "h_init", .. })
        ));

        let no_tolerance = Rk45Settings::with_tolerances(0.0, 0.0);
        assert!(matches!(
            integrate(&Decay, (0.0, 1.0), &[1.0], &[1.0], &no_tolerance),
            Err(OdeError::InvalidSettings { .. })
        ));

        let inverted = Rk45Settings {
            min_factor: 1.5,
            ..Rk45Settings::default()
        };
        assert!(inverted.validate().is_err());
        assert!(Rk45Settings::default().validate().is_ok());
        assert!(Rk45Settings::with_tolerances(0.0, 1e-8).validate().is_ok());
    }
}
