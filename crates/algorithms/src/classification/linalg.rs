//! Small dense linear algebra for class statistics

use ndarray::{Array1, Array2, ArrayView1};
use irrigis_core::{Error, Result};

/// Mean vector of the given rows of `x`
pub(crate) fn mean_of(x: &Array2<f64>, rows: &[usize]) -> Array1<f64> {
    let mut mean = Array1::<f64>::zeros(x.ncols());
    for &r in rows {
        mean += &x.row(r);
    }
    if !rows.is_empty() {
        mean /= rows.len() as f64;
    }
    mean
}

/// Scatter matrix `sum (x - mean)(x - mean)^T` of the given rows
pub(crate) fn scatter(x: &Array2<f64>, rows: &[usize], mean: &Array1<f64>) -> Array2<f64> {
    let p = x.ncols();
    let mut s = Array2::<f64>::zeros((p, p));
    for &r in rows {
        let d = &x.row(r) - mean;
        for i in 0..p {
            for j in i..p {
                s[(i, j)] += d[i] * d[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            s[(i, j)] = s[(j, i)];
        }
    }
    s
}

/// Inverse by Gauss-Jordan elimination with partial pivoting.
///
/// A near-singular matrix gets a small ridge on its diagonal before
/// inversion, which keeps constant bands from failing the whole model.
pub(crate) fn invert(m: &Array2<f64>) -> Result<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(Error::Algorithm(format!("cannot invert a {}x{} matrix", n, m.ncols())));
    }
    let trace: f64 = (0..n).map(|i| m[(i, i)].abs()).sum();
    let ridge = (trace / n.max(1) as f64).max(1.0) * 1e-9;

    for attempt in 0..2 {
        let mut a = m.clone();
        if attempt == 1 {
            for i in 0..n {
                a[(i, i)] += ridge * 1e3;
            }
        }
        if let Some(inv) = gauss_jordan(a, ridge) {
            return Ok(inv);
        }
    }
    Err(Error::Algorithm("singular covariance matrix".into()))
}

fn gauss_jordan(mut a: Array2<f64>, eps: f64) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut inv = Array2::<f64>::eye(n);
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[(i, col)].abs().total_cmp(&a[(j, col)].abs()))?;
        if a[(pivot, col)].abs() <= eps {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap((pivot, k), (col, k));
                inv.swap((pivot, k), (col, k));
            }
        }
        let p = a[(col, col)];
        for k in 0..n {
            a[(col, k)] /= p;
            inv[(col, k)] /= p;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let f = a[(row, col)];
            if f == 0.0 {
                continue;
            }
            for k in 0..n {
                a[(row, k)] -= f * a[(col, k)];
                inv[(row, k)] -= f * inv[(col, k)];
            }
        }
    }
    Some(inv)
}

/// `d^T m d`
pub(crate) fn quad_form(m: &Array2<f64>, d: ArrayView1<'_, f64>) -> f64 {
    d.dot(&m.dot(&d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_invert() {
        let m = array![[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(&m).unwrap();
        let id = m.dot(&inv);
        assert_relative_eq!(id[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(id[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(id[(1, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(id[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_matrix_gets_ridge() {
        let m = array![[1.0, 1.0], [1.0, 1.0]];
        let inv = invert(&m).unwrap();
        assert!(inv.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_mean_and_scatter() {
        let x = array![[1.0, 2.0], [3.0, 6.0], [100.0, 100.0]];
        let mean = mean_of(&x, &[0, 1]);
        assert_eq!(mean, array![2.0, 4.0]);
        let s = scatter(&x, &[0, 1], &mean);
        assert_eq!(s, array![[2.0, 4.0], [4.0, 8.0]]);
        assert_relative_eq!(quad_form(&s, array![1.0, 0.0].view()), 2.0);
    }
}
