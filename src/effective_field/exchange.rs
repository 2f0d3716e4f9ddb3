// src/effective_field/exchange.rs

use crate::chain::{ChainField, next_index, prev_index};

/// Add the isotropic Heisenberg exchange field:
///   B_heis[i] = J (S[i-1] + S[i+1])   (periodic neighbours)
pub fn add_exchange_field(m: &ChainField, b_eff: &mut ChainField, j: f64) {
    if j == 0.0 {
        return;
    }
    let n = m.len();
    for i in 0..n {
        let sp = m.data[prev_index(i, n)];
        let sn = m.data[next_index(i, n)];
        let b = &mut b_eff.data[i];
        b[0] += j * (sp[0] + sn[0]);
        b[1] += j * (sp[1] + sn[1]);
        b[2] += j * (sp[2] + sn[2]);
    }
}
