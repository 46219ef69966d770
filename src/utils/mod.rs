//! Storage helpers shared by the sweep and the command-line runner.
//!
//! - **`data_loader`**: the [`data_loader::MatrixStore`] seam and its Matrix Market
//!   implementation, used to read component matrices and write eigenvectors.
//! - **`results`**: the CSV table of eigenvalues per parameter step.

pub mod data_loader;
pub mod results;
