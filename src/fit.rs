// src/fit.rs
//
// Least-squares straight line y = slope·x + intercept, optionally weighted by
// per-point standard deviations (w = 1/σ²).
//
// Standard errors use the covariance of the normal equations scaled by the
// reduced chi-square χ²/(n - 2). With exactly two points there are no degrees
// of freedom left and the errors are reported as `None`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_stderr: Option<f64>,
    pub intercept_stderr: Option<f64>,
    /// Number of points used.
    pub n: usize,
}

impl LineFit {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `(x, y)`. Returns `None` if fewer than two points, if
/// the inputs are non-finite or mismatched, if any sigma is non-positive, or
/// if all x coincide.
pub fn fit_line(x: &[f64], y: &[f64], sigma: Option<&[f64]>) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    if let Some(s) = sigma {
        if s.len() != n || s.iter().any(|&v| !(v > 0.0) || !v.is_finite()) {
            return None;
        }
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let weight = |i: usize| sigma.map_or(1.0, |s| 1.0 / (s[i] * s[i]));

    let mut sw = 0.0;
    let mut swx = 0.0;
    let mut swy = 0.0;
    for i in 0..n {
        let w = weight(i);
        sw += w;
        swx += w * x[i];
        swy += w * y[i];
    }
    let x_bar = swx / sw;
    let y_bar = swy / sw;

    // Centred sums for stability
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let w = weight(i);
        let dx = x[i] - x_bar;
        sxx += w * dx * dx;
        sxy += w * dx * (y[i] - y_bar);
    }

    let scale = x.iter().fold(0.0_f64, |a, &v| a.max((v - x_bar).abs()));
    if !(sxx > 0.0) || scale == 0.0 || sxx <= 1e-24 * sw * scale * scale {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }

    let (slope_stderr, intercept_stderr) = if n > 2 {
        let chi2: f64 = (0..n)
            .map(|i| {
                let r = y[i] - (slope * x[i] + intercept);
                weight(i) * r * r
            })
            .sum();
        let s2 = chi2 / (n - 2) as f64;
        let var_slope = s2 / sxx;
        let var_intercept = s2 * (1.0 / sw + x_bar * x_bar / sxx);
        (Some(var_slope.sqrt()), Some(var_intercept.sqrt()))
    } else {
        (None, None)
    };

    Some(LineFit {
        slope,
        intercept,
        slope_stderr,
        intercept_stderr,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line_is_recovered_with_zero_error() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 2.5 * v - 1.0).collect();
        let f = fit_line(&x, &y, None).unwrap();
        assert!((f.slope - 2.5).abs() < 1e-12, "slope = {}", f.slope);
        assert!((f.intercept + 1.0).abs() < 1e-12, "intercept = {}", f.intercept);
        assert!(f.slope_stderr.unwrap() < 1e-12);
        assert_eq!(f.n, 5);
    }

    #[test]
    fn stderr_matches_hand_computation() {
        // Residuals (+1, -2, +1) around y = x: chi2 = 6, dof = 1, Sxx = 2
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, -1.0, 3.0];
        let f = fit_line(&x, &y, None).unwrap();
        assert!((f.slope - 1.0).abs() < 1e-12);
        assert!((f.intercept - 0.0).abs() < 1e-12);
        assert!((f.slope_stderr.unwrap() - 3.0_f64.sqrt()).abs() < 1e-12);
        // var(b) = s2 (1/n + x̄²/Sxx) = 6 (1/3 + 1/2) = 5
        assert!((f.intercept_stderr.unwrap() - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn two_points_have_no_stderr() {
        let f = fit_line(&[1.0, 3.0], &[0.0, 4.0], None).unwrap();
        assert!((f.slope - 2.0).abs() < 1e-12);
        assert!(f.slope_stderr.is_none());
    }

    #[test]
    fn weights_pull_towards_precise_points() {
        // Two precise points on y = x, one wild point with a huge sigma
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 10.0];
        let sigma = [1e-3, 1e-3, 1e3];
        let f = fit_line(&x, &y, Some(&sigma)).unwrap();
        assert!((f.slope - 1.0).abs() < 1e-6, "slope = {}", f.slope);
    }

    #[test]
    fn degenerate_inputs_give_none() {
        assert!(fit_line(&[1.0], &[1.0], None).is_none());
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0], None).is_none());
        assert!(fit_line(&[0.0, 1.0], &[f64::NAN, 1.0], None).is_none());
        assert!(fit_line(&[0.0, 1.0], &[0.0, 1.0], Some(&[1.0, 0.0])).is_none());
    }
}
