//! Scalar discrete algebraic Riccati equation
//!
//! Solves `p = a² p − (a b p)² / (r + b² p) + q` for the stabilizing
//! `p ≥ 0`. The LQR uses `(a, b)`; the Kalman filter uses the dual
//! `(a, c)`.

/// Stabilizing solution of the scalar DARE, or `None` if there is none.
///
/// Rearranged, the equation is the quadratic
/// `b² p² + (r (1 − a²) − q b²) p − q r = 0`, whose non-negative root is
/// the stabilizing one.
pub fn solve_dare(a: f64, b: f64, q: f64, r: f64) -> Option<f64> {
    if ![a, b, q, r].iter().all(|v| v.is_finite()) || q <= 0.0 || r <= 0.0 {
        return None;
    }

    let b2 = b * b;
    let p = if b2 < f64::EPSILON {
        // Uncontrollable: only solvable when the mode decays on its own.
        if a.abs() >= 1.0 {
            return None;
        }
        q / (1.0 - a * a)
    } else {
        let lin = r * (1.0 - a * a) - q * b2;
        let disc = lin * lin + 4.0 * b2 * q * r;
        let root = disc.sqrt();
        // Pick the numerically stable form of the positive root.
        if lin <= 0.0 {
            (root - lin) / (2.0 * b2)
        } else {
            2.0 * q * r / (lin + root)
        }
    };

    (p.is_finite() && p >= 0.0).then_some(p)
}

/// Residual of the DARE at `p`, used to check a solution.
pub fn dare_residual(a: f64, b: f64, q: f64, r: f64, p: f64) -> f64 {
    a * a * p - (a * b * p).powi(2) / (r + b * b * p) + q - p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dare_solution_satisfies_equation() {
        for &(a, b, q, r) in &[
            (0.77, 2.27, 1.0 / 64.0, 1.0 / 144.0),
            (0.5, 1.0, 1.0, 1.0),
            (1.2, 0.3, 2.0, 0.5),
            (0.99, 10.0, 1e-3, 1e3),
        ] {
            let p = solve_dare(a, b, q, r).unwrap();
            assert!(p >= 0.0);
            assert!(dare_residual(a, b, q, r, p).abs() < 1e-9 * (1.0 + p));
        }
    }

    #[test]
    fn test_dare_scalar_identity() {
        // a = 0 collapses to p = q
        let p = solve_dare(0.0, 1.0, 2.0, 3.0).unwrap();
        assert!((p - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_dare_uncontrollable_unstable_has_no_solution() {
        assert_eq!(solve_dare(1.5, 0.0, 1.0, 1.0), None);
        assert!(solve_dare(0.5, 0.0, 1.0, 1.0).is_some());
    }

    #[test]
    fn test_dare_rejects_bad_weights() {
        assert_eq!(solve_dare(0.5, 1.0, 0.0, 1.0), None);
        assert_eq!(solve_dare(0.5, 1.0, 1.0, -1.0), None);
        assert_eq!(solve_dare(f64::NAN, 1.0, 1.0, 1.0), None);
    }
}
