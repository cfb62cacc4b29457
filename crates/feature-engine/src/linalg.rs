//! Small Dense Least Squares
//!
//! Minimum-norm least-squares solve through a one-sided Jacobi SVD. The
//! systems here are tall and narrow (window length × AR order), so the
//! column-rotation form is both simple and accurate.

const MAX_SWEEPS: usize = 60;

/// Solve `min ||A·x − y||` for `A` given column-wise, returning the
/// minimum-norm solution.
///
/// Singular values below `ε·max(m, n)·σ_max` are treated as zero. Non-finite
/// input yields a vector of NaN.
pub(crate) fn least_squares(columns: &[Vec<f64>], y: &[f64]) -> Vec<f64> {
    let n = columns.len();
    let m = y.len();
    if n == 0 {
        return Vec::new();
    }
    let finite = y.iter().all(|v| v.is_finite())
        && columns
            .iter()
            .all(|c| c.len() == m && c.iter().all(|v| v.is_finite()));
    if !finite {
        return vec![f64::NAN; n];
    }

    let mut u: Vec<Vec<f64>> = columns.to_vec();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|j| (0..n).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..n {
            for q in p + 1..n {
                let alpha = dot(&u[p], &u[p]);
                let beta = dot(&u[q], &u[q]);
                let gamma = dot(&u[p], &u[q]);
                if gamma.abs() <= f64::EPSILON * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;

                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                rotate(&mut u, p, q, c, s);
                rotate(&mut v, p, q, c, s);
            }
        }
        if !rotated {
            break;
        }
    }

    let sigma: Vec<f64> = u.iter().map(|col| dot(col, col).sqrt()).collect();
    let sigma_max = sigma.iter().cloned().fold(0.0, f64::max);
    let cutoff = f64::EPSILON * m.max(n) as f64 * sigma_max;

    let mut x = vec![0.0; n];
    for j in 0..n {
        if sigma[j] <= cutoff {
            continue;
        }
        // u[j] = σ_j·U_j, so U_jᵀy / σ_j = u[j]ᵀy / σ_j²
        let coeff = dot(&u[j], y) / (sigma[j] * sigma[j]);
        for (xi, vij) in x.iter_mut().zip(v[j].iter()) {
            *xi += coeff * vij;
        }
    }
    x
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Apply a Givens rotation to columns `p` and `q`
fn rotate(cols: &mut [Vec<f64>], p: usize, q: usize, c: f64, s: f64) {
    let (head, tail) = cols.split_at_mut(q);
    let (cp, cq) = (&mut head[p], &mut tail[0]);
    for (a, b) in cp.iter_mut().zip(cq.iter_mut()) {
        let (x, y) = (*a, *b);
        *a = c * x - s * y;
        *b = s * x + c * y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_system() {
        // y = 2·a − 3·b
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![1.0, -1.0, 2.0, 0.5, 3.0];
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 2.0 * a - 3.0 * b).collect();
        let x = least_squares(&[a, b], &y);
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] + 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_overdetermined_fit() {
        // Regression through the origin: slope = Σxy / Σx²
        let a = vec![1.0, 2.0, 3.0];
        let y = vec![1.0, 2.0, 2.0];
        let x = least_squares(&[a], &y);
        assert!((x[0] - 11.0 / 14.0).abs() < 1e-12);
    }

    #[test]
    fn test_rank_deficient_min_norm() {
        // Duplicate columns: the minimum-norm answer splits the weight evenly
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = a.iter().map(|v| 4.0 * v).collect();
        let x = least_squares(&[a.clone(), a], &y);
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_matrix() {
        let x = least_squares(&[vec![0.0; 4], vec![0.0; 4]], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(x, vec![0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_input() {
        let x = least_squares(&[vec![1.0, f64::NAN]], &[1.0, 2.0]);
        assert!(x[0].is_nan());
    }
}
