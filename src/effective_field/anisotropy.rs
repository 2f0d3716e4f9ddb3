// src/effective_field/anisotropy.rs

use crate::chain::ChainField;

/// Add uniaxial anisotropy contribution to B_eff.
///
/// For E_ani = Da Σ_i (S_i,z)^2 we get B_ani = (0, 0, -2 Da S_z).
/// Da < 0 makes z an easy axis.
pub fn add_uniaxial_anisotropy_field(m: &ChainField, b_eff: &mut ChainField, da: f64) {
    if da == 0.0 {
        return;
    }
    let coeff = -2.0 * da;
    for (m_site, b_site) in m.data.iter().zip(b_eff.data.iter_mut()) {
        b_site[2] += coeff * m_site[2];
    }
}
