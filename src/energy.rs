// src/energy.rs
//
// Energy functional of the chain. Its negative gradient with respect to S_i is
// exactly the B_eff built in `effective_field`:
//
//   E = -J Σ_k S_k·S_{k+1} + D Σ_k (S_k × S_{k+1})_z + Da Σ_k S_k,z² - Σ_k H_k·S_k

use crate::chain::{ChainField, next_index};
use crate::params::CouplingParameters;
use crate::vec3::{cross, dot};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyBreakdown {
    pub exchange: f64,
    pub dmi: f64,
    pub anisotropy: f64,
    pub zeeman: f64,
}

impl EnergyBreakdown {
    pub fn total(&self) -> f64 {
        self.exchange + self.dmi + self.anisotropy + self.zeeman
    }
}

/// Energy split by term. `h_ext = None` means zero external field.
pub fn compute_energy(
    m: &ChainField,
    coupling: &CouplingParameters,
    h_ext: Option<&ChainField>,
) -> EnergyBreakdown {
    let n = m.len();
    let mut e = EnergyBreakdown::default();

    for i in 0..n {
        let s = m.data[i];
        let sn = m.data[next_index(i, n)];

        e.exchange -= coupling.j * dot(s, sn);
        e.dmi += coupling.d * cross(s, sn)[2];
        e.anisotropy += coupling.da * s[2] * s[2];
    }

    if let Some(h) = h_ext {
        e.zeeman = -m
            .data
            .iter()
            .zip(h.data.iter())
            .map(|(s, hi)| dot(*s, *hi))
            .sum::<f64>();
    }

    e
}

/// Total energy (exchange + DMI + anisotropy + Zeeman).
pub fn compute_total_energy(
    m: &ChainField,
    coupling: &CouplingParameters,
    h_ext: Option<&ChainField>,
) -> f64 {
    compute_energy(m, coupling, h_ext).total()
}
