//! Assembly of a family's coefficient matrix at one parameter step.
//!
//! `A(p) = Σ_i c_i(p) · C_i` over the family's components `C_i`, added in declaration
//! order. Each family owns one [`AssembledMatrix`] that is reused across the whole sweep:
//! at every step its triplet scratch buffer is cleared, refilled with the scaled
//! component entries, coalesced, and compressed into a fresh sparse matrix. Since the
//! additions and the coalescing order depend only on the declaration order, assembling
//! twice at the same parameter yields bit-identical matrices.

use crate::{
    error::SweepError,
    matrix::coalesce_triplets,
    sweep::{
        evaluator::CoefficientEvaluator,
        loader::{Coefficient, CoefficientBinding, MatrixComponentSet},
    },
};
use faer::{
    c64,
    sparse::{SparseColMat, SymbolicSparseColMat, Triplet},
};

/// The persistent accumulator holding one family's assembled matrix.
#[derive(Debug, Clone)]
pub struct AssembledMatrix {
    nrows: usize,
    ncols: usize,
    scratch: Vec<Triplet<usize, usize, c64>>,
    matrix: SparseColMat<usize, c64>,
}

impl AssembledMatrix {
    /// Creates a zero accumulator of the given shape.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        let symbolic =
            SymbolicSparseColMat::<usize>::new_checked(nrows, ncols, vec![0; ncols + 1], None, vec![]);
        Self {
            nrows,
            ncols,
            scratch: Vec::new(),
            matrix: SparseColMat::new(symbolic, vec![]),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// The matrix produced by the last assembly.
    pub fn matrix(&self) -> &SparseColMat<usize, c64> {
        &self.matrix
    }

    fn zero(&mut self) {
        self.scratch.clear();
    }

    fn add_scaled(&mut self, weight: c64, component: &SparseColMat<usize, c64>) {
        self.scratch.extend(component.triplet_iter().map(|t| Triplet {
            row: t.row,
            col: t.col,
            val: weight * *t.val,
        }));
    }

    fn finalize(&mut self, coalesce: bool) -> Result<(), SweepError> {
        if coalesce {
            coalesce_triplets(&mut self.scratch);
        }
        self.matrix = SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &self.scratch)
            .map_err(|e| {
                SweepError::solver(format!("failed to compress the assembled matrix: {e:?}"))
            })?;
        Ok(())
    }
}

/// Builds each family's coefficient matrix from its components and bound coefficients.
pub struct MatrixAssembler;

impl MatrixAssembler {
    /// Overwrites `acc` with `Σ_i c_i(p) · C_i` at parameter step `parameter_index`.
    ///
    /// A family with a single constant coefficient skips coalescing: its only
    /// component is already in compressed column order.
    pub fn assemble(
        evaluator: &CoefficientEvaluator<'_>,
        components: &MatrixComponentSet,
        binding: &CoefficientBinding,
        parameter_index: usize,
        acc: &mut AssembledMatrix,
    ) -> Result<(), SweepError> {
        if (acc.nrows, acc.ncols) != components.shape() {
            return Err(SweepError::config(
                format!("{}dat", components.family()),
                format!(
                    "components are {}x{} but the accumulator is {}x{}",
                    components.shape().0,
                    components.shape().1,
                    acc.nrows,
                    acc.ncols
                ),
            ));
        }

        acc.zero();

        if let ([component], Some(Coefficient::Constant(_))) =
            (components.components(), binding.get(0))
        {
            let weight = evaluator.evaluate(binding, 0, parameter_index)?;
            acc.add_scaled(weight, component);
            return acc.finalize(false);
        }

        for (i, component) in components.components().iter().enumerate() {
            let weight = evaluator.evaluate(binding, i, parameter_index)?;
            acc.add_scaled(weight, component);
        }
        acc.finalize(true)?;

        log::debug!(
            "Assembled family `{}` at parameter index {parameter_index}: {} stored entries.",
            binding.family(),
            acc.scratch.len()
        );
        Ok(())
    }
}
