//! The parameter sweep: loading matrix families, assembling their coefficient matrices
//! at each parameter value, and driving the eigensolver with continuation between steps.

pub mod assembler;
pub mod continuation;
pub mod evaluator;
pub mod loader;
pub mod orchestrator;

pub use assembler::{AssembledMatrix, MatrixAssembler};
pub use continuation::ContinuationState;
pub use evaluator::CoefficientEvaluator;
pub use loader::{
    Coefficient, CoefficientBinding, ComponentLoader, LoadedFamily, MatrixComponentSet,
};
pub use orchestrator::{StepResult, SweepOrchestrator, SweepReport, SweepStatus};
