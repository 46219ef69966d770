//! The parameter sweep state machine.
//!
//! ```text
//! Init → (Assemble → Solve → Continue)* → Done
//!                      └──── 0 converged ───→ Aborted
//! ```
//!
//! Every step reassembles each family's coefficient matrix from scratch, hands the
//! ordered matrices to the eigensolver, and folds the leading eigenpair into the
//! [`ContinuationState`] for the next step. Steps run strictly in sequence.

use crate::{
    config::SweepConfig,
    error::SweepError,
    scalar::{DisplayComplex, Scalar},
    script::ScriptContext,
    solvers::{EigenPair, PolynomialEigensolver},
    sweep::{
        assembler::{AssembledMatrix, MatrixAssembler},
        continuation::ContinuationState,
        evaluator::CoefficientEvaluator,
        loader::{CoefficientBinding, ComponentLoader, MatrixComponentSet},
    },
    utils::{data_loader::MatrixStore, results::ResultsWriter},
};
use faer::{c64, sparse::SparseColMat};
use std::path::PathBuf;

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepStatus {
    /// Every parameter value was processed.
    Done,
    /// The solve at `step` converged no eigenpair; later values were not processed.
    Aborted { step: usize, parameter: Scalar },
}

/// The outcome of one completed parameter step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub index: usize,
    pub parameter: Scalar,
    /// Converged pairs in solver order; the first one is the leading pair.
    pub eigenpairs: Vec<EigenPair>,
    /// Files the eigenvectors of this step were written to.
    pub saved: Vec<PathBuf>,
}

/// Completed steps in order, plus the terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub status: SweepStatus,
    pub steps: Vec<StepResult>,
}

impl SweepReport {
    pub fn is_done(&self) -> bool {
        self.status == SweepStatus::Done
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepState {
    Init,
    Assemble(usize),
    Solve(usize),
    Continue(usize),
    Done,
    Aborted(usize),
}

/// One family's loaded data and its reusable accumulator.
struct Family {
    components: MatrixComponentSet,
    binding: CoefficientBinding,
    accumulator: AssembledMatrix,
}

/// Drives a sweep over the configured parameter values.
///
/// The orchestrator borrows the [`ScriptContext`] the configuration ran in, since the
/// coefficient functions it evaluates live in that interpreter.
pub struct SweepOrchestrator<'a, S, M> {
    script: &'a ScriptContext,
    config: SweepConfig,
    families: Vec<Family>,
    solver: S,
    store: M,
    results: Option<ResultsWriter>,
    continuation: ContinuationState,
    state: SweepState,
    steps: Vec<StepResult>,
}

impl<'a, S: PolynomialEigensolver, M: MatrixStore> SweepOrchestrator<'a, S, M> {
    /// Loads every family declared in `config`.
    ///
    /// # Errors
    ///
    /// A configuration error if any family fails to load or the families differ in shape
    /// or are not square. Nothing is solved before all families are loaded.
    pub fn new(
        script: &'a ScriptContext,
        config: SweepConfig,
        store: M,
        solver: S,
    ) -> Result<Self, SweepError> {
        let loader = ComponentLoader::new(script, &store);
        let mut families = Vec::with_capacity(config.families.len());
        let mut shape = None;

        for name in &config.families {
            let loaded = loader.load(name)?;
            let (nrows, ncols) = loaded.components.shape();
            if nrows != ncols {
                return Err(SweepError::config(
                    name,
                    format!("coefficient matrices must be square, family is {nrows}x{ncols}"),
                ));
            }
            match shape {
                None => shape = Some((nrows, ncols)),
                Some(expected) if expected != (nrows, ncols) => {
                    return Err(SweepError::config(
                        name,
                        format!(
                            "family is {nrows}x{ncols} but `{}` is {}x{}",
                            config.families[0], expected.0, expected.1
                        ),
                    ));
                }
                Some(_) => {}
            }
            families.push(Family {
                components: loaded.components,
                binding: loaded.binding,
                accumulator: AssembledMatrix::zeros(nrows, ncols),
            });
        }

        Ok(Self {
            script,
            continuation: ContinuationState::new(&config.options),
            config,
            families,
            solver,
            store,
            results: None,
            state: SweepState::Init,
            steps: Vec::new(),
        })
    }

    /// Appends every completed step to `writer`.
    pub fn with_results(mut self, writer: ResultsWriter) -> Self {
        self.results = Some(writer);
        self
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn continuation(&self) -> &ContinuationState {
        &self.continuation
    }

    /// Runs the sweep to completion.
    ///
    /// A step that converges no eigenpair ends the sweep with [`SweepStatus::Aborted`];
    /// that is reported, not returned as an error.
    ///
    /// # Errors
    ///
    /// Evaluation, solver and storage errors stop the sweep immediately. Steps already
    /// completed have been written to the results table, if any.
    pub fn run(&mut self) -> Result<SweepReport, SweepError> {
        log::info!(
            "Starting sweep `{}` over {} parameter values.",
            self.script.name(),
            self.config.parameters.len()
        );

        self.state = SweepState::Init;
        loop {
            self.state = match self.state {
                SweepState::Init => self.init()?,
                SweepState::Assemble(p) => self.assemble(p)?,
                SweepState::Solve(p) => self.solve(p)?,
                SweepState::Continue(p) => self.advance(p)?,
                SweepState::Done => {
                    log::info!("Sweep finished: {} steps completed.", self.steps.len());
                    return Ok(SweepReport {
                        status: SweepStatus::Done,
                        steps: std::mem::take(&mut self.steps),
                    });
                }
                SweepState::Aborted(p) => {
                    let parameter = self.parameter(p)?;
                    log::warn!(
                        "No eigenpair converged at parameter {parameter} (step {}); aborting the sweep after {} completed steps.",
                        p + 1,
                        self.steps.len()
                    );
                    return Ok(SweepReport {
                        status: SweepStatus::Aborted { step: p, parameter },
                        steps: std::mem::take(&mut self.steps),
                    });
                }
            };
        }
    }

    fn parameter(&self, p: usize) -> Result<Scalar, SweepError> {
        self.config
            .parameters
            .get(p)
            .ok_or_else(|| SweepError::solver(format!("no parameter at index {p}")))
    }

    fn init(&mut self) -> Result<SweepState, SweepError> {
        self.continuation = ContinuationState::new(&self.config.options);
        self.steps.clear();

        let options = &self.config.options;
        if options.save_solutions {
            std::fs::create_dir_all(&options.output_dir)
                .map_err(|e| SweepError::storage(&options.output_dir, e))?;
        }

        Ok(if self.config.parameters.is_empty() {
            SweepState::Done
        } else {
            SweepState::Assemble(0)
        })
    }

    fn assemble(&mut self, p: usize) -> Result<SweepState, SweepError> {
        let evaluator = CoefficientEvaluator::new(&self.config.parameters);
        for family in &mut self.families {
            MatrixAssembler::assemble(
                &evaluator,
                &family.components,
                &family.binding,
                p,
                &mut family.accumulator,
            )?;
        }
        Ok(SweepState::Solve(p))
    }

    fn solve(&mut self, p: usize) -> Result<SweepState, SweepError> {
        let operators: Vec<&SparseColMat<usize, c64>> = self
            .families
            .iter()
            .map(|f| f.accumulator.matrix())
            .collect();
        self.solver.set_operators(&operators)?;
        self.solver.set_target(self.continuation.target());
        self.solver.set_initial_space(self.continuation.warm_start())?;
        self.solver.solve()?;

        Ok(if self.solver.converged_count() == 0 {
            SweepState::Aborted(p)
        } else {
            SweepState::Continue(p)
        })
    }

    fn advance(&mut self, p: usize) -> Result<SweepState, SweepError> {
        let parameter = self.parameter(p)?;
        let eigenpairs = (0..self.solver.converged_count())
            .map(|i| self.solver.eigenpair(i))
            .collect::<Result<Vec<_>, _>>()?;

        let values: Vec<String> = eigenpairs
            .iter()
            .map(|pair| DisplayComplex(pair.eigenvalue).to_string())
            .collect();
        log::info!(
            "[{}/{}] {parameter}, {}",
            p + 1,
            self.config.parameters.len(),
            values.join(", ")
        );

        self.continuation.advance(&eigenpairs[0]);
        let saved = self.persist(parameter, &eigenpairs)?;

        let step = StepResult {
            index: p,
            parameter,
            eigenpairs,
            saved,
        };
        if let Some(writer) = &mut self.results {
            writer.write_step(&step)?;
        }
        self.steps.push(step);

        Ok(if p + 1 < self.config.parameters.len() {
            SweepState::Assemble(p + 1)
        } else {
            SweepState::Done
        })
    }

    /// Writes the leading eigenvector, or all of them with `save_all_solutions`.
    fn persist(
        &self,
        parameter: Scalar,
        eigenpairs: &[EigenPair],
    ) -> Result<Vec<PathBuf>, SweepError> {
        let options = &self.config.options;
        if !options.save_solutions {
            return Ok(Vec::new());
        }
        let count = if options.save_all_solutions {
            eigenpairs.len()
        } else {
            1
        };

        let mut saved = Vec::with_capacity(count);
        for (i, pair) in eigenpairs.iter().take(count).enumerate() {
            let Some(vector) = &pair.eigenvector else {
                log::warn!("Eigenpair {i} at parameter {parameter} has no eigenvector to save.");
                continue;
            };
            let path = options
                .output_dir
                .join(format!("u_{}_{i}.mtx", parameter.file_label()));
            self.store
                .write_vector(&path, vector.as_ref())
                .map_err(|e| SweepError::storage(&path, e))?;
            log::debug!("Saved eigenvector {i} to {path:?}.");
            saved.push(path);
        }
        Ok(saved)
    }
}
