// src/vec3.rs

/// 3D vector dot product.
#[inline]
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 3D vector cross product: a × b.
#[inline]
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean length.
#[inline]
pub fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

/// Normalise a 3D vector to unit length. Returns `None` for the zero vector,
/// leaving the caller to decide how a degenerate site is handled.
#[inline]
pub fn try_normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let n2 = dot(v, v);
    if n2 == 0.0 {
        return None;
    }
    let inv = 1.0 / n2.sqrt();
    Some([v[0] * inv, v[1] * inv, v[2] * inv])
}

/// Normalise a 3D vector to unit length. If zero, return (0, 0, 1).
#[inline]
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    try_normalize(v).unwrap_or([0.0, 0.0, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cross([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_vector_has_no_direction() {
        assert!(try_normalize([0.0; 3]).is_none());
        assert_eq!(normalize([0.0; 3]), [0.0, 0.0, 1.0]);

        let v = try_normalize([3.0, 0.0, 4.0]).unwrap();
        assert!((norm(v) - 1.0).abs() < 1e-15);
        assert!((v[0] - 0.6).abs() < 1e-15);
    }
}
