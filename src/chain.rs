// src/chain.rs

use crate::error::ChainError;
use crate::vec3::try_normalize;

/// Left neighbour of site `i` on a periodic chain of `n` sites.
#[inline]
pub fn prev_index(i: usize, n: usize) -> usize {
    debug_assert!(i < n);
    if i == 0 { n - 1 } else { i - 1 }
}

/// Right neighbour of site `i` on a periodic chain of `n` sites.
#[inline]
pub fn next_index(i: usize, n: usize) -> usize {
    debug_assert!(i < n);
    if i + 1 == n { 0 } else { i + 1 }
}

/// Per-site 3-vector field on a periodic 1D chain.
/// Holds spin configurations (unit vectors) as well as effective and external fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainField {
    pub data: Vec<[f64; 3]>,
}

impl ChainField {
    /// Create a chain of `n` sites, initialised along +z (the metastable
    /// ferromagnetic state used before a nucleation pulse).
    pub fn new(n: usize) -> Self {
        Self {
            data: vec![[0.0, 0.0, 1.0]; n],
        }
    }

    /// Create an all-zero field of `n` sites.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![[0.0; 3]; n],
        }
    }

    pub fn from_vec(data: Vec<[f64; 3]>) -> Self {
        Self { data }
    }

    /// Unflatten a state vector laid out as [x0, y0, z0, x1, y1, z1, ...].
    pub fn from_flat(flat: &[f64]) -> Result<Self, ChainError> {
        if flat.len() % 3 != 0 {
            return Err(ChainError::LengthMismatch {
                expected: flat.len() - flat.len() % 3,
                got: flat.len(),
            });
        }
        let data = flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Ok(Self { data })
    }

    /// Flatten to [x0, y0, z0, x1, ...] (length 3N).
    pub fn flatten(&self) -> Vec<f64> {
        self.data.iter().flat_map(|v| v.iter().copied()).collect()
    }

    /// Copy a flat state vector into this field without reallocating.
    pub fn copy_from_flat(&mut self, flat: &[f64]) {
        debug_assert_eq!(flat.len(), 3 * self.data.len());
        for (v, c) in self.data.iter_mut().zip(flat.chunks_exact(3)) {
            *v = [c[0], c[1], c[2]];
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set all sites to the same vector (x, y, z).
    pub fn set_uniform(&mut self, x: f64, y: f64, z: f64) {
        for site in &mut self.data {
            *site = [x, y, z];
        }
    }

    /// Renormalise every site to unit length.
    ///
    /// Sites with exactly zero norm are left untouched; their count is returned
    /// so that callers can log or accumulate it.
    pub fn renormalize(&mut self) -> usize {
        let mut degenerate = 0;
        for site in &mut self.data {
            match try_normalize(*site) {
                Some(u) => *site = u,
                None => degenerate += 1,
            }
        }
        degenerate
    }

    /// max_i | |S_i| - 1 |
    pub fn max_norm_deviation(&self) -> f64 {
        self.data
            .iter()
            .map(|v| ((v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt() - 1.0).abs())
            .fold(0.0, f64::max)
    }

    /// Maximum absolute per-component difference to another field of equal length.
    pub fn max_abs_diff(&self, other: &ChainField) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        let mut max = 0.0_f64;
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            for k in 0..3 {
                max = max.max((a[k] - b[k]).abs());
            }
        }
        max
    }

    /// Mean of component `k` (0 = x, 1 = y, 2 = z) over all sites.
    pub fn mean_component(&self, k: usize) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|v| v[k]).sum::<f64>() / self.data.len() as f64
    }

    /// Population standard deviation of component `k`.
    pub fn std_component(&self, k: usize) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean_component(k);
        let var = self
            .data
            .iter()
            .map(|v| (v[k] - mean) * (v[k] - mean))
            .sum::<f64>()
            / self.data.len() as f64;
        var.sqrt()
    }

    /// Cyclically relabel sites: site i moves to (i + k) mod N.
    pub fn rotate_sites(&mut self, k: usize) {
        if self.data.is_empty() {
            return;
        }
        let k = k % self.data.len();
        self.data.rotate_right(k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_wrap_around() {
        assert_eq!(prev_index(0, 5), 4);
        assert_eq!(next_index(4, 5), 0);
        assert_eq!(prev_index(3, 5), 2);
        assert_eq!(next_index(0, 1), 0);
        assert_eq!(prev_index(0, 1), 0);
    }

    #[test]
    fn flatten_layout_is_site_major() {
        let f = ChainField::from_vec(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(f.flatten(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let back = ChainField::from_flat(&f.flatten()).unwrap();
        assert_eq!(back, f);
        assert!(ChainField::from_flat(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn renormalize_skips_zero_sites() {
        let mut f = ChainField::from_vec(vec![[2.0, 0.0, 0.0], [0.0; 3], [0.0, 3.0, 4.0]]);
        let degenerate = f.renormalize();
        assert_eq!(degenerate, 1);
        assert_eq!(f.data[0], [1.0, 0.0, 0.0]);
        assert_eq!(f.data[1], [0.0; 3]);
        assert!((f.data[2][1] - 0.6).abs() < 1e-15);
    }

    #[test]
    fn rotate_moves_site_i_to_i_plus_k() {
        let mut f = ChainField::from_vec(vec![[0.0; 3], [1.0; 3], [2.0; 3], [3.0; 3]]);
        f.rotate_sites(1);
        assert_eq!(f.data[1], [0.0; 3]);
        assert_eq!(f.data[0], [3.0; 3]);
    }

    #[test]
    fn statistics_of_uniform_state() {
        let f = ChainField::new(10);
        assert_eq!(f.mean_component(2), 1.0);
        assert_eq!(f.std_component(2), 0.0);
        assert_eq!(f.max_norm_deviation(), 0.0);
    }
}
