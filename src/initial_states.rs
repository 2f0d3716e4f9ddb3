// src/initial_states.rs
//
// Initial spin configurations (seed generators) for the periodic chain.
//
// Conventions:
// - Every generated site is unit length.
// - Randomness comes from a caller-supplied RNG so runs are reproducible from a seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::chain::ChainField;
use crate::vec3::{normalize, try_normalize};

/// Seeded RNG used by all stochastic initialisers.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Uniform + small random tilt (useful to bias relaxation towards a phase
/// while still breaking symmetry).
pub fn init_uniform_with_noise<R: Rng>(m: &mut ChainField, dir: [f64; 3], noise: f64, rng: &mut R) {
    let base = normalize(dir);
    for v in &mut m.data {
        let dx = noise * rng.random_range(-1.0..1.0);
        let dy = noise * rng.random_range(-1.0..1.0);
        let dz = noise * rng.random_range(-1.0..1.0);
        *v = normalize([base[0] + dx, base[1] + dy, base[2] + dz]);
    }
}

/// Random directions: each component drawn uniformly in [-0.5, 0.5), then normalised.
///
/// This is cube-then-normalise, so the directions are NOT uniform on the
/// sphere (the cube diagonals are over-represented). It is only a
/// symmetry-breaking seed for relaxation.
pub fn init_random_cube<R: Rng>(m: &mut ChainField, rng: &mut R) {
    for v in &mut m.data {
        *v = loop {
            let x = rng.random_range(-0.5..0.5);
            let y = rng.random_range(-0.5..0.5);
            let z = rng.random_range(-0.5..0.5);
            if let Some(u) = try_normalize([x, y, z]) {
                break u;
            }
        };
    }
}

/// Allocating variant of [`init_random_cube`] from a seed.
pub fn random_cube(n: usize, seed: u64) -> ChainField {
    let mut m = ChainField::new(n);
    let mut rng = seeded_rng(seed);
    init_random_cube(&mut m, &mut rng);
    m
}

/// Seed a reversed (-z) domain of sites `[start, start + width)` (wrapping)
/// in a +z background. Hand-built soliton seed for tests and for biasing.
pub fn seed_reversed_domain(m: &mut ChainField, start: usize, width: usize) {
    let n = m.len();
    m.set_uniform(0.0, 0.0, 1.0);
    if n == 0 {
        return;
    }
    for k in 0..width.min(n) {
        m.data[(start + k) % n] = [0.0, 0.0, -1.0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_cube_is_unit_and_reproducible() {
        let a = random_cube(64, 7);
        let b = random_cube(64, 7);
        let c = random_cube(64, 8);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.max_norm_deviation() < 1e-12);
    }

    #[test]
    fn noisy_uniform_stays_near_direction() {
        let mut m = ChainField::new(32);
        let mut rng = seeded_rng(1);
        init_uniform_with_noise(&mut m, [1.0, 0.0, 0.0], 0.05, &mut rng);
        for v in &m.data {
            assert!(v[0] > 0.99, "tilt too large: {:?}", v);
        }
        assert!(m.max_norm_deviation() < 1e-12);
    }

    #[test]
    fn reversed_domain_wraps() {
        let mut m = ChainField::new(10);
        seed_reversed_domain(&mut m, 8, 4);
        let reversed: Vec<usize> = (0..10).filter(|&i| m.data[i][2] < 0.0).collect();
        assert_eq!(reversed, vec![0, 1, 8, 9]);
    }
}
