//! The eigensolver seam.
//!
//! The sweep never looks inside the numerical method that solves
//! `(λ^d·A_d + … + λ·A_1 + A_0) U = 0`. It drives any type implementing
//! [`PolynomialEigensolver`] through the same protocol at every parameter step:
//!
//! 1. [`set_operators`](PolynomialEigensolver::set_operators) with the assembled
//!    coefficient matrices, ordered by ascending degree;
//! 2. [`set_target`](PolynomialEigensolver::set_target) and, optionally,
//!    [`set_initial_space`](PolynomialEigensolver::set_initial_space);
//! 3. a blocking [`solve`](PolynomialEigensolver::solve);
//! 4. [`converged_count`](PolynomialEigensolver::converged_count) and
//!    [`eigenpair`](PolynomialEigensolver::eigenpair) to read the results, the pair at
//!    index 0 being the one closest to the target.
//!
//! [`crate::algorithms::LinearizationSolver`] is the implementation shipped with the crate.

use crate::error::SweepError;
use faer::{Mat, MatRef, c64, sparse::SparseColMat};

/// One eigenvalue with its (optional) eigenvector, stored as a single-column matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub eigenvalue: c64,
    pub eigenvector: Option<Mat<c64>>,
}

/// A solver for polynomial eigenvalue problems, treated as a black box by the sweep.
pub trait PolynomialEigensolver {
    /// Sets the polynomial coefficients; `operators[i]` multiplies `λ^i`.
    fn set_operators(&mut self, operators: &[&SparseColMat<usize, c64>])
    -> Result<(), SweepError>;

    /// Sets the value the wanted eigenvalues should be closest to.
    fn set_target(&mut self, target: c64);

    /// Supplies (or clears) a vector to seed the search space of the next solve.
    fn set_initial_space(&mut self, vector: Option<MatRef<'_, c64>>) -> Result<(), SweepError>;

    /// Runs the solve to completion.
    fn solve(&mut self) -> Result<(), SweepError>;

    /// Number of eigenpairs the last solve converged.
    fn converged_count(&self) -> usize;

    /// Returns converged eigenpair `index`, ordered by closeness to the target.
    fn eigenpair(&self, index: usize) -> Result<EigenPair, SweepError>;
}
