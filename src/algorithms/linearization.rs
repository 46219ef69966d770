//! Dense companion-linearization solver for polynomial eigenvalue problems.
//!
//! For `P(λ) = Σ_{i=0}^{d} λ^i A_i` with `n × n` coefficients, the vector
//! `z = [x; λx; …; λ^{d-1}x]` turns `P(λ)x = 0` into the `dn × dn` generalized
//! problem `C z = λ B z` (first companion form):
//!
//! ```text
//!     | 0    I    0   …   0       |        | I              |
//! C = | 0    0    I   …   0       |    B = |   I            |
//!     | …                         |        |     …          |
//!     | -A_0 -A_1 …   -A_{d-1}    |        |          A_d   |
//! ```
//!
//! Shift-and-invert around the target σ maps it to the standard problem
//! `(C − σB)⁻¹ B z = μ z` with `λ = σ + 1/μ`, so the eigenvalues closest to the target
//! become the largest `μ`. The dense eigendecomposition comes from [`faer`].
//!
//! Candidates are ordered by `|λ − σ|` and the first `nev` whose relative residual
//! `‖P(λ)x‖ / (Σ|λ|^i‖A_i‖ ‖x‖)` is below the tolerance are reported as converged.
//!
//! This is a direct method intended for small and moderate problem sizes: memory grows
//! as `O((dn)²)`. Being direct, it has no use for an initial search space; one may be
//! supplied and is checked for consistency, then ignored.

use crate::{
    error::{SweepError, SweepErrorKind},
    matrix::{MatrixPolynomial, sparse_to_dense},
    solvers::{EigenPair, PolynomialEigensolver},
};
use faer::{Mat, MatRef, c64, prelude::*, sparse::SparseColMat};

/// Relative size of the shift perturbation applied when `C − σB` is singular.
const SHIFT_PERTURBATION: f64 = 1e-8;

/// Dense polynomial eigensolver based on a companion linearization.
#[derive(Debug, Clone)]
pub struct LinearizationSolver {
    nev: usize,
    tol: f64,
    operators: Vec<Mat<c64>>,
    norms: Vec<f64>,
    target: c64,
    initial_space: Option<Mat<c64>>,
    converged: Vec<EigenPair>,
}

impl LinearizationSolver {
    /// Creates a solver reporting up to `nev` eigenpairs with relative residual below `tol`.
    pub fn new(nev: usize, tol: f64) -> Self {
        Self {
            nev,
            tol,
            operators: Vec::new(),
            norms: Vec::new(),
            target: c64::new(1.0, 0.0),
            initial_space: None,
            converged: Vec::new(),
        }
    }

    /// Problem dimension `n` of the current operators.
    fn dim(&self) -> usize {
        self.operators.first().map_or(0, |a| a.nrows())
    }

    /// Builds `C − σB` and `B` for the current operators.
    fn linearize(&self, sigma: c64) -> (Mat<c64>, Mat<c64>) {
        let n = self.dim();
        let d = self.operators.len() - 1;
        let size = d * n;
        let one = c64::new(1.0, 0.0);

        let mut shifted = Mat::<c64>::zeros(size, size);
        let mut b = Mat::<c64>::zeros(size, size);

        // Identity rows `λ z_k = z_{k+1}`.
        for k in 0..d - 1 {
            for i in 0..n {
                let row = k * n + i;
                shifted[(row, row)] = -sigma;
                shifted[(row, row + n)] = one;
                b[(row, row)] = one;
            }
        }

        // Last block row holds the coefficients.
        let last = (d - 1) * n;
        let a_d = &self.operators[d];
        for (j, a_j) in self.operators[..d].iter().enumerate() {
            for col in 0..n {
                for row in 0..n {
                    shifted[(last + row, j * n + col)] = -a_j[(row, col)];
                }
            }
        }
        for col in 0..n {
            for row in 0..n {
                shifted[(last + row, last + col)] -= sigma * a_d[(row, col)];
                b[(last + row, last + col)] = a_d[(row, col)];
            }
        }

        (shifted, b)
    }

    /// Computes `(C − σB)⁻¹ B`, or `None` if the shifted matrix is numerically singular.
    fn shift_invert(&self, sigma: c64) -> Option<Mat<c64>> {
        let (shifted, b) = self.linearize(sigma);
        let m = shifted.as_ref().partial_piv_lu().solve(&b);
        let finite = (0..m.ncols())
            .all(|j| (0..m.nrows()).all(|i| m[(i, j)].re.is_finite() && m[(i, j)].im.is_finite()));
        finite.then_some(m)
    }
}

/// Scales `x` to unit norm and rotates it so its largest entry is real and positive.
fn normalize(x: Mat<c64>) -> Option<Mat<c64>> {
    let norm = x.norm_l2();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    let pivot = (0..x.nrows())
        .map(|i| x[(i, 0)])
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))?;
    let phase = pivot.conj() / pivot.norm();
    Some(Mat::from_fn(x.nrows(), 1, |i, _| x[(i, 0)] * phase / norm))
}

impl PolynomialEigensolver for LinearizationSolver {
    fn set_operators(
        &mut self,
        operators: &[&SparseColMat<usize, c64>],
    ) -> Result<(), SweepError> {
        if operators.len() < 2 {
            return Err(SweepError::solver(format!(
                "a polynomial eigenproblem needs at least 2 operators, got {}",
                operators.len()
            )));
        }
        let n = operators[0].nrows();
        if let Some(bad) = operators
            .iter()
            .position(|a| a.nrows() != n || a.ncols() != n)
        {
            return Err(SweepError::solver(format!(
                "operator {bad} is {}x{}, expected {n}x{n}",
                operators[bad].nrows(),
                operators[bad].ncols()
            )));
        }

        self.operators = operators.iter().map(|a| sparse_to_dense(a)).collect();
        self.norms = self.operators.iter().map(|a| a.norm_l2()).collect();
        self.converged.clear();
        Ok(())
    }

    fn set_target(&mut self, target: c64) {
        self.target = target;
    }

    fn set_initial_space(&mut self, vector: Option<MatRef<'_, c64>>) -> Result<(), SweepError> {
        self.initial_space = match vector {
            None => None,
            Some(v) if !self.operators.is_empty() && v.nrows() != self.dim() => {
                return Err(SweepErrorKind::Solver(format!(
                    "initial space has {} rows, the problem dimension is {}",
                    v.nrows(),
                    self.dim()
                ))
                .into());
            }
            Some(v) => Some(v.to_owned()),
        };
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SweepError> {
        if self.operators.len() < 2 {
            return Err(SweepError::solver("solve called before set_operators"));
        }
        self.converged.clear();
        let n = self.dim();
        if n == 0 {
            return Ok(());
        }

        let mut sigma = self.target;
        let m = match self.shift_invert(sigma) {
            Some(m) => m,
            None => {
                let delta = SHIFT_PERTURBATION * (1.0 + sigma.norm());
                log::warn!(
                    "Shifted linearization is singular at the target; perturbing the shift by {delta:e}."
                );
                sigma += c64::new(delta, 0.0);
                self.shift_invert(sigma).ok_or_else(|| {
                    SweepError::solver("shifted linearization is singular after perturbation")
                })?
            }
        };

        let evd = m
            .as_ref()
            .eigen()
            .map_err(|e| SweepError::from(SweepErrorKind::EvdError(e)))?;
        let s = evd.S();
        let u = evd.U();

        let size = m.nrows();
        let mu_max = (0..size).map(|j| s[j].norm()).fold(0.0_f64, f64::max);
        let cutoff = f64::EPSILON * size as f64 * mu_max;

        // Finite eigenvalues only: a vanishing μ corresponds to λ = ∞.
        let mut candidates: Vec<(f64, c64, usize)> = (0..size)
            .filter(|&j| s[j].norm() > cutoff)
            .map(|j| {
                let lambda = sigma + s[j].inv();
                ((lambda - self.target).norm(), lambda, j)
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let polynomial = MatrixPolynomial::new(&self.operators);
        for (_, lambda, j) in candidates {
            if self.converged.len() == self.nev {
                break;
            }
            let Some(x) = normalize(Mat::from_fn(n, 1, |i, _| u[(i, j)])) else {
                continue;
            };
            let residual = polynomial.relative_residual(lambda, x.as_ref(), &self.norms);
            log::debug!("Candidate λ = {lambda} has relative residual {residual:e}.");
            if residual <= self.tol {
                self.converged.push(EigenPair {
                    eigenvalue: lambda,
                    eigenvector: Some(x),
                });
            }
        }

        log::debug!(
            "Linearization of size {size} solved around σ = {sigma}: {} of {} requested pairs converged.",
            self.converged.len(),
            self.nev
        );
        Ok(())
    }

    fn converged_count(&self) -> usize {
        self.converged.len()
    }

    fn eigenpair(&self, index: usize) -> Result<EigenPair, SweepError> {
        self.converged.get(index).cloned().ok_or_else(|| {
            SweepError::solver(format!(
                "eigenpair {index} requested but only {} converged",
                self.converged.len()
            ))
        })
    }
}
