//! Dense linear solvers for the normal equations of small fits.
//!
//! Gaussian elimination with partial pivoting, both for fixed-size systems
//! (Levenberg-Marquardt steps) and for runtime-sized ones (polynomial fits).

/// Pivots below this magnitude are treated as singular.
const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `A x = b` for a fixed-size system. Returns `None` if `A` is singular.
#[allow(clippy::needless_range_loop)]
pub fn solve<const N: usize>(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    let mut matrix = *a;
    let mut rhs = *b;
    let scale = pivot_scale(a.iter().flat_map(|row| row.iter()));

    for col in 0..N {
        let mut max_row = col;
        let mut max_val = matrix[col][col].abs();
        for row in (col + 1)..N {
            if matrix[row][col].abs() > max_val {
                max_val = matrix[row][col].abs();
                max_row = row;
            }
        }

        if max_val <= PIVOT_EPSILON * scale {
            return None;
        }

        if max_row != col {
            matrix.swap(col, max_row);
            rhs.swap(col, max_row);
        }

        for row in (col + 1)..N {
            let factor = matrix[row][col] / matrix[col][col];
            let pivot_row = matrix[col];
            for (j, m) in matrix[row].iter_mut().enumerate().skip(col) {
                *m -= factor * pivot_row[j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = rhs[i];
        for (j, &xj) in x.iter().enumerate().skip(i + 1) {
            sum -= matrix[i][j] * xj;
        }
        x[i] = sum / matrix[i][i];
    }

    Some(x)
}

/// Invert a fixed-size matrix column by column. Returns `None` if singular.
#[allow(clippy::needless_range_loop)]
pub fn invert<const N: usize>(a: &[[f64; N]; N]) -> Option<[[f64; N]; N]> {
    let mut inverse = [[0.0f64; N]; N];
    for col in 0..N {
        let mut unit = [0.0f64; N];
        unit[col] = 1.0;
        let x = solve(a, &unit)?;
        for row in 0..N {
            inverse[row][col] = x[row];
        }
    }
    Some(inverse)
}

/// Solve a runtime-sized square system. `a` is row-major `n × n`.
#[allow(clippy::needless_range_loop)]
pub fn solve_dynamic(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    debug_assert!(a.len() == n && a.iter().all(|row| row.len() == n));
    let scale = pivot_scale(a.iter().flat_map(|row| row.iter()));

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &bi)| {
            let mut new_row = row.clone();
            new_row.push(bi);
            new_row
        })
        .collect();

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val <= PIVOT_EPSILON * scale {
            return None;
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = aug[i][n];
        for j in (i + 1)..n {
            x[i] -= aug[i][j] * x[j];
        }
        x[i] /= aug[i][i];
    }

    Some(x)
}

/// Largest absolute entry, floored at 1 so tiny-but-regular systems still solve.
fn pivot_scale<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.fold(1.0f64, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_identity() {
        let a = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let b = [1.0, 2.0, 3.0];
        let x = solve(&a, &b).unwrap();
        for i in 0..3 {
            assert!((x[i] - b[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 2.0]];
        let b = [2.0, 1.0, 6.0];
        let x = solve(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        assert!((x[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular_returns_none() {
        let a = [[1.0, 2.0], [2.0, 4.0]];
        assert!(solve(&a, &[1.0, 2.0]).is_none());
        assert!(solve(&[[0.0; 4]; 4], &[1.0; 4]).is_none());
    }

    #[test]
    fn test_invert_roundtrip() {
        let a = [[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(&a).unwrap();
        // inverse = 1/10 * [[6, -7], [-2, 4]]
        assert!((inv[0][0] - 0.6).abs() < 1e-12);
        assert!((inv[0][1] + 0.7).abs() < 1e-12);
        assert!((inv[1][0] + 0.2).abs() < 1e-12);
        assert!((inv[1][1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_dynamic_matches_fixed() {
        let a = [[3.0, 2.0, -1.0], [2.0, -2.0, 4.0], [-1.0, 0.5, -1.0]];
        let b = [1.0, -2.0, 0.0];
        let fixed = solve(&a, &b).unwrap();
        let dynamic = solve_dynamic(&a.iter().map(|r| r.to_vec()).collect::<Vec<_>>(), &b).unwrap();
        // Known solution (1, -2, -2)
        for i in 0..3 {
            assert!((fixed[i] - dynamic[i]).abs() < 1e-12);
        }
        assert!((fixed[0] - 1.0).abs() < 1e-12);
        assert!((fixed[1] + 2.0).abs() < 1e-12);
        assert!((fixed[2] + 2.0).abs() < 1e-12);
    }
}
