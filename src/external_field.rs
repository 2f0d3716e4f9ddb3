// src/external_field.rs
//
// Time- and site-dependent external fields.
//
// A field is anything that can add its value at time t to every site of a
// chain. Fields compose by addition (`pulse.plus(bias)`), so a driven run is a
// nucleation pulse plus a static bias rather than a bag of keyword arguments.

use serde::{Deserialize, Serialize};

use crate::chain::ChainField;

pub trait ExternalField {
    /// Add this field's contribution at time `t` to every site of `out`.
    fn accumulate(&self, t: f64, out: &mut ChainField);

    /// True if the field vanishes at all times (lets solvers skip evaluation).
    fn is_zero(&self) -> bool {
        false
    }

    /// Evaluate the field at time `t` on a chain of `n` sites.
    fn sample(&self, t: f64, n: usize) -> ChainField {
        let mut out = ChainField::zeros(n);
        self.accumulate(t, &mut out);
        out
    }

    /// Superpose another field on top of this one.
    fn plus<G: ExternalField>(self, other: G) -> Superposed<Self, G>
    where
        Self: Sized,
    {
        Superposed(self, other)
    }
}

impl<T: ExternalField + ?Sized> ExternalField for &T {
    fn accumulate(&self, t: f64, out: &mut ChainField) {
        (**self).accumulate(t, out);
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

/// No external field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroField;

impl ExternalField for ZeroField {
    fn accumulate(&self, _t: f64, _out: &mut ChainField) {}

    fn is_zero(&self) -> bool {
        true
    }
}

/// Localised pulse, Gaussian in time and in site index:
///
///   h(t, i) = amplitude · exp(-(t - t0)² / 2τ²) · exp(-(i - center)² / 2σ²) · direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianPulse {
    pub amplitude: f64,
    pub t0: f64,
    pub tau: f64,
    pub center: f64,
    pub sigma: f64,
    pub direction: [f64; 3],
}

impl GaussianPulse {
    /// The nucleation pulse used for soliton runs: h0 = -10 J along x,
    /// centred at t0 = 2 (τ = 0.5) on the middle of the chain (σ = 3 sites).
    pub fn nucleation(n_sites: usize, j: f64) -> Self {
        Self {
            amplitude: -10.0 * j,
            t0: 2.0,
            tau: 0.5,
            center: (n_sites / 2) as f64,
            sigma: 3.0,
            direction: [1.0, 0.0, 0.0],
        }
    }

    #[inline]
    pub fn time_profile(&self, t: f64) -> f64 {
        let dt = t - self.t0;
        self.amplitude * (-(dt * dt) / (2.0 * self.tau * self.tau)).exp()
    }

    #[inline]
    pub fn space_profile(&self, i: usize) -> f64 {
        let di = i as f64 - self.center;
        (-(di * di) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

impl ExternalField for GaussianPulse {
    fn accumulate(&self, t: f64, out: &mut ChainField) {
        let a = self.time_profile(t);
        if a == 0.0 {
            return;
        }
        let u = self.direction;
        for (i, h) in out.data.iter_mut().enumerate() {
            let s = a * self.space_profile(i);
            h[0] += s * u[0];
            h[1] += s * u[1];
            h[2] += s * u[2];
        }
    }
}

/// Static, spatially uniform bias field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformBias {
    pub field: [f64; 3],
}

impl UniformBias {
    /// Bias of strength `h` along z (the mobility-measurement drive).
    pub fn along_z(h: f64) -> Self {
        Self {
            field: [0.0, 0.0, h],
        }
    }
}

impl ExternalField for UniformBias {
    fn accumulate(&self, _t: f64, out: &mut ChainField) {
        for h in &mut out.data {
            h[0] += self.field[0];
            h[1] += self.field[1];
            h[2] += self.field[2];
        }
    }

    fn is_zero(&self) -> bool {
        self.field == [0.0; 3]
    }
}

/// Sum of two fields.
#[derive(Debug, Clone, Copy)]
pub struct Superposed<A, B>(pub A, pub B);

impl<A: ExternalField, B: ExternalField> ExternalField for Superposed<A, B> {
    fn accumulate(&self, t: f64, out: &mut ChainField) {
        self.0.accumulate(t, out);
        self.1.accumulate(t, out);
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero() && self.1.is_zero()
    }
}

/// Adapter for an arbitrary `(time, site) -> vector` function.
pub struct SiteFn<F>(pub F);

impl<F> ExternalField for SiteFn<F>
where
    F: Fn(f64, usize) -> [f64; 3],
{
    fn accumulate(&self, t: f64, out: &mut ChainField) {
        for (i, h) in out.data.iter_mut().enumerate() {
            let v = (self.0)(t, i);
            h[0] += v[0];
            h[1] += v[1];
            h[2] += v[2];
        }
    }
}
