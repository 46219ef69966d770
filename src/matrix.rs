//! Linear operators and matrix polynomials.
//!
//! The sweep hands the eigensolver an ordered list of coefficient matrices
//! `A_0, …, A_d` that together define the matrix polynomial
//! `P(λ) = λ^d·A_d + … + λ·A_1 + A_0`. Checking a computed eigenpair only ever needs
//! the action `P(λ)x`, so this module formalizes that through the [`LinearOperator`]
//! trait and builds [`MatrixPolynomial`] on top of it. Both the sparse component
//! matrices and the dense matrices used inside the dense solver implement the
//! trait.
//!
//! The module also holds two small sparse helpers: [`coalesce_triplets`] for the
//! assembler and [`sparse_to_dense`] for the dense solver.

use faer::{
    Mat, MatRef, c64,
    sparse::{SparseColMat, Triplet},
    traits::ComplexField,
};

/// Represents a linear operator that can be applied to a vector (or a matrix).
pub trait LinearOperator<T: ComplexField> {
    /// Returns the number of rows of the operator.
    fn nrows(&self) -> usize;

    /// Returns the number of columns of the operator.
    fn ncols(&self) -> usize;

    /// Applies the operator to `rhs`, returning `A * rhs`.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions do not match.
    fn apply(&self, rhs: MatRef<'_, T>) -> Mat<T>;
}

impl<T: ComplexField> LinearOperator<T> for Mat<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    #[inline]
    fn apply(&self, rhs: MatRef<'_, T>) -> Mat<T> {
        assert_eq!(
            self.as_ref().ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.as_ref().ncols(),
            rhs.nrows(),
        );
        self.as_ref() * rhs
    }
}

impl LinearOperator<c64> for SparseColMat<usize, c64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.as_ref().nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.as_ref().ncols()
    }

    fn apply(&self, rhs: MatRef<'_, c64>) -> Mat<c64> {
        assert_eq!(
            self.as_ref().ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.as_ref().ncols(),
            rhs.nrows(),
        );
        let mut out = Mat::<c64>::zeros(self.as_ref().nrows(), rhs.ncols());
        for t in self.triplet_iter() {
            for j in 0..rhs.ncols() {
                out[(t.row, j)] += *t.val * rhs[(t.col, j)];
            }
        }
        out
    }
}

/// Expands a sparse matrix into a dense one.
pub fn sparse_to_dense(a: &SparseColMat<usize, c64>) -> Mat<c64> {
    let mut out = Mat::<c64>::zeros(a.nrows(), a.ncols());
    for t in a.triplet_iter() {
        out[(t.row, t.col)] += *t.val;
    }
    out
}

/// Sorts triplets in column-major order and sums duplicates in place.
///
/// The sort is stable and duplicates are added in their original order, so the result
/// only depends on the input sequence.
pub fn coalesce_triplets(triplets: &mut Vec<Triplet<usize, usize, c64>>) {
    triplets.sort_by_key(|t| (t.col, t.row));
    triplets.dedup_by(|next, kept| {
        if next.row == kept.row && next.col == kept.col {
            kept.val += next.val;
            true
        } else {
            false
        }
    });
}

/// The matrix polynomial `P(λ) = Σ λ^i A_i` over an ordered list of coefficients.
///
/// `coefficients[i]` multiplies `λ^i`.
pub struct MatrixPolynomial<'a, O> {
    coefficients: &'a [O],
}

impl<'a, O: LinearOperator<c64>> MatrixPolynomial<'a, O> {
    pub fn new(coefficients: &'a [O]) -> Self {
        Self { coefficients }
    }

    /// Polynomial degree `d`; a single coefficient is degree 0.
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Computes `P(λ) x` by Horner's rule.
    pub fn apply_at(&self, lambda: c64, x: MatRef<'_, c64>) -> Mat<c64> {
        let mut acc = Mat::<c64>::zeros(x.nrows(), x.ncols());
        for a_i in self.coefficients.iter().rev() {
            let a_x = a_i.apply(x);
            acc = Mat::from_fn(x.nrows(), x.ncols(), |i, j| acc[(i, j)] * lambda + a_x[(i, j)]);
        }
        acc
    }

    /// Relative residual `‖P(λ)x‖ / (Σ |λ|^i ‖A_i‖ ‖x‖)`, with the coefficient norms supplied
    /// by the caller so they are computed once per solve.
    pub fn relative_residual(&self, lambda: c64, x: MatRef<'_, c64>, norms: &[f64]) -> f64 {
        let r = self.apply_at(lambda, x).norm_l2();
        let scale: f64 = norms
            .iter()
            .enumerate()
            .map(|(i, n)| n * lambda.norm().powi(i as i32))
            .sum::<f64>()
            * x.norm_l2();
        if scale == 0.0 { r } else { r / scale }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    fn c(re: f64) -> c64 {
        c64::new(re, 0.0)
    }

    #[test]
    fn test_sparse_apply_matches_dense() {
        let triplets = vec![
            Triplet { row: 0, col: 0, val: c(2.0) },
            Triplet { row: 1, col: 0, val: c64::new(0.0, 1.0) },
            Triplet { row: 1, col: 1, val: c(-3.0) },
        ];
        let sparse = SparseColMat::try_new_from_triplets(2, 2, &triplets).unwrap();
        let dense = sparse_to_dense(&sparse);
        let x: Mat<c64> = mat![[c(1.0)], [c(2.0)]];

        let expected = dense.apply(x.as_ref());
        assert_eq!(sparse.apply(x.as_ref()), expected);
        assert_eq!(expected[(1, 0)], c64::new(-6.0, 1.0));
    }

    #[test]
    #[should_panic(
        expected = "Dimension mismatch: operator columns (2) do not match vector rows (3)."
    )]
    fn test_dimension_mismatch_panic() {
        let matrix: Mat<c64> = mat![[c(1.0), c(0.0)], [c(0.0), c(1.0)]];
        let vector: Mat<c64> = mat![[c(1.0)], [c(2.0)], [c(3.0)]];
        let operator: &dyn LinearOperator<c64> = &matrix;
        operator.apply(vector.as_ref());
    }

    #[test]
    fn test_coalesce_sums_duplicates_in_column_major_order() {
        let mut triplets = vec![
            Triplet { row: 1, col: 1, val: c(1.0) },
            Triplet { row: 0, col: 0, val: c(2.0) },
            Triplet { row: 1, col: 1, val: c(0.5) },
            Triplet { row: 0, col: 1, val: c(4.0) },
        ];
        coalesce_triplets(&mut triplets);
        let flat: Vec<(usize, usize, c64)> = triplets.iter().map(|t| (t.row, t.col, t.val)).collect();
        assert_eq!(
            flat,
            vec![(0, 0, c(2.0)), (0, 1, c(4.0)), (1, 1, c(1.5))]
        );
    }

    #[test]
    fn test_polynomial_residual_vanishes_at_eigenvalue() {
        // P(λ) = λ²·I + λ·0 + diag(-4, -9): eigenvalues ±2 on e_0 and ±3 on e_1.
        let a0: Mat<c64> = mat![[c(-4.0), c(0.0)], [c(0.0), c(-9.0)]];
        let a1: Mat<c64> = Mat::zeros(2, 2);
        let a2: Mat<c64> = mat![[c(1.0), c(0.0)], [c(0.0), c(1.0)]];
        let coefficients = [a0, a1, a2];
        let poly = MatrixPolynomial::new(&coefficients);
        let norms: Vec<f64> = coefficients.iter().map(|a| a.norm_l2()).collect();

        assert_eq!(poly.degree(), 2);
        let e1: Mat<c64> = mat![[c(0.0)], [c(1.0)]];
        assert_eq!(poly.relative_residual(c(-3.0), e1.as_ref(), &norms), 0.0);
        assert!(poly.relative_residual(c(2.0), e1.as_ref(), &norms) > 0.1);
    }
}
