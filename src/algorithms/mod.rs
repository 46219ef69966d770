//! Eigensolver implementations.
//!
//! The sweep only depends on the [`crate::solvers::PolynomialEigensolver`] trait. This
//! module holds the concrete solvers shipped with the crate:
//!
//! - [`linearization`]: a dense companion-linearization solver with shift-and-invert
//!   around the target, suitable for small and moderate problem sizes.

pub mod linearization;

pub use linearization::LinearizationSolver;
