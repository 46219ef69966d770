//! This module defines the custom error types for the library.
//!
//! Every fatal condition of a sweep is funnelled into a single public type,
//! [`SweepError`], which wraps a private kind enum. Callers that need to branch on
//! the broad class of failure use [`SweepError::category`].
//!
//! A step whose solve converges no eigenpair is deliberately *not* an error: the
//! orchestrator ends the sweep with [`crate::sweep::SweepStatus::Aborted`] instead.
//!
//! Note that [`faer::linalg::evd::EvdError`] does not implement the standard
//! [`std::error::Error`] trait, so we wrap it manually.
use std::path::PathBuf;
use thiserror::Error;

/// Represents all fatal errors that can occur while configuring or running a sweep.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct SweepError(#[from] SweepErrorKind);

/// Broad classification of a [`SweepError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing declarations in the configuration script.
    Config,
    /// A coefficient could not be evaluated for some parameter value.
    Eval,
    /// The eigensolver failed numerically or was misused.
    Solver,
    /// Writing a result to durable storage failed.
    Storage,
}

/// Private enum containing the distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
pub(crate) enum SweepErrorKind {
    /// A configuration entry is missing or has the wrong shape.
    #[error("Configuration error in `{key}`: {message}")]
    Config { key: String, message: String },

    /// A component matrix file could not be read or parsed.
    #[error("Failed to load component {index} of family `{family}` from {path:?}: {message}")]
    ComponentFile {
        family: String,
        index: usize,
        path: PathBuf,
        message: String,
    },

    /// The component file list and the coefficient list of a family differ in length.
    #[error(
        "Family `{family}` declares {files} component files but {coefficients} coefficients."
    )]
    BindingCountMismatch {
        family: String,
        files: usize,
        coefficients: usize,
    },

    /// A coefficient expression raised or returned an unsupported value.
    #[error(
        "Evaluation error in family `{family}`, component {component}, parameter index {parameter_index}: {message}"
    )]
    Eval {
        family: String,
        component: usize,
        parameter_index: usize,
        message: String,
    },

    /// The eigensolver collaborator reported a failure.
    #[error("Eigensolver error: {0}")]
    Solver(String),

    /// Wraps an error originating from [`faer`]'s eigendecomposition module.
    #[error("A numerical error occurred during the eigendecomposition of the linearization: {0:?}")]
    EvdError(faer::linalg::evd::EvdError),

    /// Persisting a vector or a results row failed.
    #[error("Storage error for {path:?}: {message}")]
    Storage { path: PathBuf, message: String },
}

impl SweepError {
    pub(crate) fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        SweepErrorKind::Config {
            key: key.into(),
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn solver(message: impl Into<String>) -> Self {
        SweepErrorKind::Solver(message.into()).into()
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SweepErrorKind::Storage {
            path: path.into(),
            message: message.to_string(),
        }
        .into()
    }

    /// Returns the broad class of this error.
    pub fn category(&self) -> ErrorCategory {
        match &self.0 {
            SweepErrorKind::Config { .. }
            | SweepErrorKind::ComponentFile { .. }
            | SweepErrorKind::BindingCountMismatch { .. } => ErrorCategory::Config,
            SweepErrorKind::Eval { .. } => ErrorCategory::Eval,
            SweepErrorKind::Solver(_) | SweepErrorKind::EvdError(_) => ErrorCategory::Solver,
            SweepErrorKind::Storage { .. } => ErrorCategory::Storage,
        }
    }
}

// Manually implement PartialEq for the public error type.
impl PartialEq for SweepError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
