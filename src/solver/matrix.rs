//! Small dense matrices for junction scattering and Newton iteration.
//!
//! The matrices here are tiny (a handful of ports), so everything is a
//! row-major `Vec<f64>` with preallocated LU storage. Nothing in this module
//! allocates after construction.

use std::fmt;

/// Pivot magnitude below which a matrix is treated as singular.
pub const PIVOT_EPSILON: f64 = 1e-15;

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Mat {
    /// Create a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row slices. All rows must have the same length.
    pub fn from_rows(rows: &[&[f64]]) -> Self {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols, "ragged matrix rows");
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            cols,
            data,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get element at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Set element at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Add to element at (row, col).
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] += value;
    }

    /// Borrow one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// `out = self · x`
    #[inline]
    pub fn mul_vec(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for (r, o) in out.iter_mut().enumerate() {
            *o = dot(self.row(r), x);
        }
    }

    /// `out += self · x`
    #[inline]
    pub fn mul_vec_add(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for (r, o) in out.iter_mut().enumerate() {
            *o += dot(self.row(r), x);
        }
    }

    /// `out = self · rhs`, without allocating.
    pub fn mul_into(&self, rhs: &Mat, out: &mut Mat) {
        debug_assert_eq!(self.cols, rhs.rows);
        debug_assert_eq!((out.rows, out.cols), (self.rows, rhs.cols));
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut acc = 0.0;
                for k in 0..self.cols {
                    acc += self.get(i, k) * rhs.get(k, j);
                }
                out.set(i, j, acc);
            }
        }
    }
}

/// Dot product of two equal-length slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// The matrix could not be factored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularMatrix {
    /// Elimination step at which no usable pivot was found.
    pub pivot: usize,
}

impl fmt::Display for SingularMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no usable pivot in column {}", self.pivot)
    }
}

/// LU decomposition with partial pivoting and preallocated storage.
#[derive(Debug, Clone)]
pub struct Lu {
    size: usize,
    lu: Vec<f64>,
    pivots: Vec<usize>,
}

impl Lu {
    /// Create storage for an `size × size` system.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Factor `a` in place of the previous factorization.
    pub fn factor(&mut self, a: &Mat) -> std::result::Result<(), SingularMatrix> {
        let n = self.size;
        debug_assert_eq!((a.rows(), a.cols()), (n, n));
        self.lu.copy_from_slice(&a.data);

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < PIVOT_EPSILON || !max_val.is_finite() {
                return Err(SingularMatrix { pivot: k });
            }

            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve `A x = b` with the current factorization.
    pub fn solve(&self, b: &[f64], x: &mut [f64]) {
        let n = self.size;
        debug_assert_eq!(b.len(), n);
        debug_assert_eq!(x.len(), n);

        for i in 0..n {
            x[i] = b[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                x[i] -= self.lu[i * n + j] * x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= self.lu[i * n + j] * x[j];
            }
            x[i] /= self.lu[i * n + i];
        }
    }
}

/// K-method matrices of a nonlinear root junction:
///
/// ```text
/// x = E·a + F·i(x)     (device port voltages)
/// b = M·a + N·i(x)     (waves sent back into the subtrees)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MatData {
    /// Device voltages from subtree waves, device ports × subtrees.
    pub e: Mat,
    /// Device voltages from device currents, device ports × device ports.
    pub f: Mat,
    /// Reflected waves from subtree waves, subtrees × subtrees.
    pub m: Mat,
    /// Reflected waves from device currents, subtrees × device ports.
    pub n: Mat,
}

impl MatData {
    /// Zero-sized matrices for a junction of the given shape.
    pub fn new(subtrees: usize, device_ports: usize) -> Self {
        Self {
            e: Mat::zeros(device_ports, subtrees),
            f: Mat::zeros(device_ports, device_ports),
            m: Mat::zeros(subtrees, subtrees),
            n: Mat::zeros(subtrees, device_ports),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lu_solve() {
        let a = Mat::from_rows(&[&[2.0, 1.0, 0.0], &[1.0, 3.0, 1.0], &[0.0, 1.0, 4.0]]);
        let mut lu = Lu::new(3);
        lu.factor(&a).unwrap();

        let b = [3.0, 5.0, 5.0];
        let mut x = [0.0; 3];
        lu.solve(&b, &mut x);

        let mut check = [0.0; 3];
        a.mul_vec(&x, &mut check);
        for (c, b) in check.iter().zip(b) {
            assert_abs_diff_eq!(*c, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lu_needs_pivoting() {
        let a = Mat::from_rows(&[&[0.0, 1.0], &[1.0, 0.0]]);
        let mut lu = Lu::new(2);
        lu.factor(&a).unwrap();
        let mut x = [0.0; 2];
        lu.solve(&[2.0, 7.0], &mut x);
        assert_abs_diff_eq!(x[0], 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_detected() {
        let a = Mat::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]);
        let mut lu = Lu::new(2);
        assert!(lu.factor(&a).is_err());
    }

    #[test]
    fn test_mul_into() {
        let a = Mat::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = Mat::from_rows(&[&[0.0, 1.0], &[1.0, -1.0]]);
        let mut out = Mat::zeros(2, 2);
        a.mul_into(&b, &mut out);
        assert_eq!(out, Mat::from_rows(&[&[2.0, -1.0], &[4.0, -1.0]]));
    }
}
