// src/kinematics.rs
//
// Soliton measurement pipeline:
//
//   Trajectory --track_core--> CoreTrack --extract_velocity--> VelocityFit
//   {(h, VelocityFit)}  --fit_mobility-->  MobilityFit
//
// The core is the set of sites whose S.z lies below a threshold (reversed
// magnetisation against a +z background); its position is the plain mean of
// those site indices.
//
// Every stage can legitimately come up empty (no nucleation, soliton dies
// before the fit window, too few valid field points). Those outcomes are
// `Missing`, never a panic and never a numeric placeholder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fit::fit_line;
use crate::trajectory::Trajectory;

/// Default core threshold on S.z.
pub const CORE_THRESHOLD: f64 = 0.0;

/// Offset added to velocity standard errors when they are used as fit sigmas.
pub const SIGMA_FLOOR: f64 = 1e-10;

/// An observable that could not be measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("no soliton core detected in any sample")]
    NoSolitonDetected,

    #[error("need at least 2 core samples inside the fit window, found {found}")]
    InsufficientFitData { found: usize },

    #[error("least-squares fit failed")]
    FitFailure,

    #[error("need at least 2 valid (field, velocity) points, found {found}")]
    InsufficientVelocityData { found: usize },
}

/// Core position over time. Only samples with a non-empty core appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreTrack {
    pub times: Vec<f64>,
    pub positions: Vec<f64>,
}

impl CoreTrack {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Samples with `t_start < t < t_end`.
    pub fn within(&self, window: &FitWindow) -> (Vec<f64>, Vec<f64>) {
        self.times
            .iter()
            .zip(self.positions.iter())
            .filter(|&(&t, _)| window.contains(t))
            .map(|(&t, &x)| (t, x))
            .unzip()
    }
}

/// Mean index of the sites with `S.z < threshold`, or `None` if there are none.
pub fn core_position(sz: impl IntoIterator<Item = f64>, threshold: f64) -> Option<f64> {
    let mut sum = 0usize;
    let mut count = 0usize;
    for (i, z) in sz.into_iter().enumerate() {
        if z < threshold {
            sum += i;
            count += 1;
        }
    }
    (count > 0).then(|| sum as f64 / count as f64)
}

/// Locate the soliton core in every sample of `traj`.
pub fn track_core(traj: &Trajectory, threshold: f64) -> Result<CoreTrack, Missing> {
    let mut track = CoreTrack::default();
    for (t, frame) in traj.samples() {
        if let Some(x) = core_position(frame.data.iter().map(|s| s[2]), threshold) {
            track.times.push(t);
            track.positions.push(x);
        }
    }

    if track.is_empty() {
        return Err(Missing::NoSolitonDetected);
    }
    Ok(track)
}

/// Open time interval used for the linear velocity fit. It excludes the
/// nucleation transient and late-time boundary effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWindow {
    pub t_start: f64,
    pub t_end: f64,
}

impl Default for FitWindow {
    fn default() -> Self {
        Self {
            t_start: 30.0,
            t_end: 150.0,
        }
    }
}

impl FitWindow {
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t > self.t_start && t < self.t_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityFit {
    /// Sites per unit time.
    pub velocity: f64,
    /// `None` when the fit used exactly two samples.
    pub velocity_stderr: Option<f64>,
    pub intercept: f64,
    pub samples: usize,
}

/// Fit position = v·t + b over the in-window part of a core track.
pub fn extract_velocity(track: &CoreTrack, window: &FitWindow) -> Result<VelocityFit, Missing> {
    let (t, x) = track.within(window);
    if t.len() < 2 {
        return Err(Missing::InsufficientFitData { found: t.len() });
    }

    let fit = fit_line(&t, &x, None).ok_or(Missing::FitFailure)?;
    Ok(VelocityFit {
        velocity: fit.slope,
        velocity_stderr: fit.slope_stderr,
        intercept: fit.intercept,
        samples: fit.n,
    })
}

/// Core tracking followed by velocity extraction with the default threshold.
pub fn measure_velocity(traj: &Trajectory, window: &FitWindow) -> Result<VelocityFit, Missing> {
    let track = track_core(traj, CORE_THRESHOLD)?;
    extract_velocity(&track, window)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobilityWeighting {
    /// Ordinary least squares.
    #[default]
    Unweighted,
    /// Weight each point by its velocity standard error (plus `SIGMA_FLOOR`).
    VelocityStderr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobilityFit {
    /// dv/dh
    pub mobility: f64,
    pub mobility_stderr: Option<f64>,
    /// Velocity extrapolated to zero bias.
    pub intrinsic_velocity: f64,
    pub intrinsic_velocity_stderr: Option<f64>,
    /// Valid (h, v) points used.
    pub points: usize,
}

/// Fit v = μ·h + v_int over the points whose velocity was measured.
///
/// `fields` and `velocities` are paired by index and must have equal length;
/// missing or non-finite velocities are skipped.
pub fn fit_mobility(
    fields: &[f64],
    velocities: &[Result<VelocityFit, Missing>],
    weighting: MobilityWeighting,
) -> Result<MobilityFit, Missing> {
    if fields.len() != velocities.len() {
        return Err(Missing::FitFailure);
    }

    let mut h = Vec::new();
    let mut v = Vec::new();
    let mut sigma = Vec::new();

    for (&hi, vi) in fields.iter().zip(velocities.iter()) {
        if let Ok(fit) = vi {
            if hi.is_finite() && fit.velocity.is_finite() {
                h.push(hi);
                v.push(fit.velocity);
                // Missing stderr counts as zero, so the floor alone sets the weight
                sigma.push(fit.velocity_stderr.filter(|e| e.is_finite()).unwrap_or(0.0) + SIGMA_FLOOR);
            }
        }
    }

    if h.len() < 2 {
        return Err(Missing::InsufficientVelocityData { found: h.len() });
    }

    let sigma = match weighting {
        MobilityWeighting::Unweighted => None,
        MobilityWeighting::VelocityStderr => Some(sigma.as_slice()),
    };
    let fit = fit_line(&h, &v, sigma).ok_or(Missing::FitFailure)?;

    Ok(MobilityFit {
        mobility: fit.slope,
        mobility_stderr: fit.slope_stderr,
        intrinsic_velocity: fit.intercept,
        intrinsic_velocity_stderr: fit.intercept_stderr,
        points: fit.n,
    })
}
