// src/effective_field/zeeman.rs

use crate::chain::ChainField;

/// Add an externally supplied per-site field to every site.
pub fn add_zeeman_field(b_eff: &mut ChainField, h_ext: &ChainField) {
    debug_assert_eq!(b_eff.len(), h_ext.len());
    for (b, h) in b_eff.data.iter_mut().zip(h_ext.data.iter()) {
        b[0] += h[0];
        b[1] += h[1];
        b[2] += h[2];
    }
}
