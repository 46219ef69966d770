//! Parameter sweeps over sparse matrix-polynomial eigenvalue problems.
//!
//! For every value `w` of a parameter sequence this crate solves
//!
//! ```text
//! (λ^d·A_d(w) + … + λ·A_1(w) + A_0(w)) u = 0
//! ```
//!
//! where each coefficient matrix is a weighted sum of fixed sparse components,
//! `A_k(w) = Σ_i c_{k,i}(w) · C_{k,i}`. The components are read from Matrix Market files
//! and the weights `c_{k,i}` are constants or functions defined in a Lua configuration
//! script. Each parameter step reassembles the coefficient matrices, asks an eigensolver
//! for the eigenpairs closest to a target, and can carry the leading eigenpair over to the
//! next step as the new target and search-space seed.
//!
//! ## Modules
//!
//! - [`script`]: the Lua interpreter holding the configuration and coefficient functions.
//! - [`config`]: options and the parameter sequence read from the script.
//! - [`sweep`]: loading families, assembling matrices and the sweep state machine.
//! - [`solvers`]: the [`solvers::PolynomialEigensolver`] seam, with the dense
//!   [`algorithms::LinearizationSolver`] behind it.
//! - [`matrix`]: linear operators and the matrix polynomial `P(λ)x` used for residuals.
//! - [`utils`]: Matrix Market storage and the CSV results table.
//!
//! ## Example
//!
//! A linear family `K(w) + λ·E` with `K(w) = -w·diag(1, 2)` and `E = I` has the
//! eigenvalues `w` and `2w`; with the default target `1` the sweep follows `λ = w`.
//!
//! ```rust
//! use qepps::{
//!     algorithms::LinearizationSolver, config::SweepConfig, script::ScriptContext,
//!     sweep::SweepOrchestrator, utils::data_loader::MatrixMarketStore,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let write = |name: &str, body: &str| -> std::io::Result<String> {
//!     let path = dir.path().join(name);
//!     std::fs::write(&path, format!("%%MatrixMarket matrix coordinate real general\n{body}"))?;
//!     Ok(path.display().to_string())
//! };
//! let k = write("k.mtx", "2 2 2\n1 1 1\n2 2 2\n")?;
//! let e = write("e.mtx", "2 2 2\n1 1 1\n2 2 1\n")?;
//!
//! let script = ScriptContext::from_source(
//!     "sweep.lua",
//!     &format!(
//!         r#"
//!         parameters = {{ 0.8, 1.2 }}
//!         families = {{ "K", "E" }}
//!         Kdat = {{ {k:?} }}; Kfuncs = {{ function(w) return -w end }}
//!         Edat = {{ {e:?} }}; Efuncs = {{ 1 }}
//!         "#
//!     ),
//! )?;
//! let config = SweepConfig::from_script(&script)?;
//! let solver = LinearizationSolver::new(config.options.nev, config.options.tol);
//! let mut sweep = SweepOrchestrator::new(&script, config, MatrixMarketStore, solver)?;
//! let report = sweep.run()?;
//!
//! assert!(report.is_done());
//! let leading: Vec<f64> = report
//!     .steps
//!     .iter()
//!     .map(|step| step.eigenpairs[0].eigenvalue.re)
//!     .collect();
//! assert!((leading[0] - 0.8).abs() < 1e-10);
//! assert!((leading[1] - 1.2).abs() < 1e-10);
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod config;
pub mod error;
pub mod matrix;
pub mod scalar;
pub mod script;
pub mod solvers;
pub mod sweep;
pub mod utils;

pub use config::{ParameterSet, SweepConfig, SweepOptions};
pub use error::{ErrorCategory, SweepError};
pub use scalar::Scalar;
pub use script::ScriptContext;
pub use solvers::{EigenPair, PolynomialEigensolver};
pub use sweep::{SweepOrchestrator, SweepReport, SweepStatus};
