// src/effective_field/dmi.rs
//
// Bulk-like chain DMI with the D vector fixed along the chain normal (z).
//
// Energy:
//   E_DMI = D Σ_k (S_k × S_{k+1})_z
//
// Effective field, with diff[i] = S[i+1] - S[i-1]:
//   B_DMI[i] = ( -D diff_y, +D diff_x, 0 )

use crate::chain::{ChainField, next_index, prev_index};

pub fn add_dmi_field(m: &ChainField, b_eff: &mut ChainField, d: f64) {
    if d == 0.0 {
        return;
    }
    let n = m.len();
    for i in 0..n {
        let sp = m.data[prev_index(i, n)];
        let sn = m.data[next_index(i, n)];
        let diff_x = sn[0] - sp[0];
        let diff_y = sn[1] - sp[1];

        let b = &mut b_eff.data[i];
        b[0] += -d * diff_y;
        b[1] += d * diff_x;
    }
}
