//! CSV table of the eigenvalues found at each parameter step.

use crate::{error::SweepError, sweep::StepResult};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// A single converged eigenvalue of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub step: usize,
    pub parameter_re: f64,
    pub parameter_im: f64,
    pub eigenpair: usize,
    pub lambda_re: f64,
    pub lambda_im: f64,
}

/// Appends one row per converged eigenpair and flushes after every step, so the rows
/// of finished steps survive an aborted or failed sweep.
pub struct ResultsWriter {
    writer: csv::Writer<Box<dyn Write>>,
    path: PathBuf,
}

impl ResultsWriter {
    /// Creates (or truncates) the CSV file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SweepError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| SweepError::storage(&path, e))?;
        Ok(Self {
            writer: csv::Writer::from_writer(Box::new(file)),
            path,
        })
    }

    /// Writes to an arbitrary sink, e.g. standard output.
    pub fn from_writer(sink: impl Write + 'static, label: impl Into<PathBuf>) -> Self {
        Self {
            writer: csv::Writer::from_writer(Box::new(sink)),
            path: label.into(),
        }
    }

    pub fn write_step(&mut self, step: &StepResult) -> Result<(), SweepError> {
        let parameter = step.parameter.to_complex();
        for (i, pair) in step.eigenpairs.iter().enumerate() {
            self.writer
                .serialize(ResultRow {
                    step: step.index,
                    parameter_re: parameter.re,
                    parameter_im: parameter.im,
                    eigenpair: i,
                    lambda_re: pair.eigenvalue.re,
                    lambda_im: pair.eigenvalue.im,
                })
                .map_err(|e| SweepError::storage(&self.path, e))?;
        }
        self.writer
            .flush()
            .map_err(|e| SweepError::storage(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scalar::Scalar, solvers::EigenPair};
    use faer::c64;

    #[test]
    fn test_rows_are_flushed_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut writer = ResultsWriter::from_path(&path).unwrap();

        let step = StepResult {
            index: 3,
            parameter: Scalar::Complex(c64::new(0.5, -2.0)),
            eigenpairs: vec![
                EigenPair {
                    eigenvalue: c64::new(1.0, 1.0),
                    eigenvector: None,
                },
                EigenPair {
                    eigenvalue: c64::new(-4.0, 0.0),
                    eigenvector: None,
                },
            ],
            saved: vec![],
        };
        writer.write_step(&step).unwrap();

        // Read back while the writer is still open.
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<ResultRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            rows,
            vec![
                ResultRow {
                    step: 3,
                    parameter_re: 0.5,
                    parameter_im: -2.0,
                    eigenpair: 0,
                    lambda_re: 1.0,
                    lambda_im: 1.0
                },
                ResultRow {
                    step: 3,
                    parameter_re: 0.5,
                    parameter_im: -2.0,
                    eigenpair: 1,
                    lambda_re: -4.0,
                    lambda_im: 0.0
                },
            ]
        );
        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("step,parameter_re,parameter_im,eigenpair,lambda_re,lambda_im\n"));
    }

    #[test]
    fn test_unwritable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResultsWriter::from_path(dir.path().join("missing").join("r.csv"))
            .err()
            .unwrap();
        assert_eq!(err.category(), crate::error::ErrorCategory::Storage);
    }
}
