//! State carried between consecutive parameter steps.

use crate::{config::SweepOptions, solvers::EigenPair};
use faer::{Mat, MatRef, c64};

/// What carries over from one parameter step to the next.
///
/// The target starts at `lambda_tgt` and there is no warm start. After a step that
/// converged at least one pair, [`advance`](Self::advance) replaces the target by the
/// leading eigenvalue when `update_lambda_tgt` is set, and keeps the leading eigenvector
/// as the next warm start when `update_initspace` is set. With both flags off the state
/// never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationState {
    target: c64,
    warm_start: Option<Mat<c64>>,
    update_target: bool,
    update_warm_start: bool,
}

impl ContinuationState {
    pub fn new(options: &SweepOptions) -> Self {
        Self {
            target: options.lambda_tgt,
            warm_start: None,
            update_target: options.update_lambda_tgt,
            update_warm_start: options.update_initspace,
        }
    }

    pub fn target(&self) -> c64 {
        self.target
    }

    /// The vector to seed the next solve with, once a step has produced one.
    pub fn warm_start(&self) -> Option<MatRef<'_, c64>> {
        self.warm_start.as_ref().map(|v| v.as_ref())
    }

    /// Folds the leading eigenpair of a completed step into the state.
    pub fn advance(&mut self, leading: &EigenPair) {
        if self.update_target {
            log::debug!(
                "Continuation target moves from {} to {}.",
                self.target,
                leading.eigenvalue
            );
            self.target = leading.eigenvalue;
        }
        if self.update_warm_start {
            if let Some(vector) = &leading.eigenvector {
                self.warm_start = Some(vector.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    fn pair(re: f64) -> EigenPair {
        EigenPair {
            eigenvalue: c64::new(re, 0.5),
            eigenvector: Some(mat![[c64::new(re, 0.0)], [c64::new(0.0, 1.0)]]),
        }
    }

    #[test]
    fn test_flags_off_keep_initial_state() {
        let options = SweepOptions {
            lambda_tgt: c64::new(2.0, -1.0),
            ..SweepOptions::default()
        };
        let mut state = ContinuationState::new(&options);
        state.advance(&pair(7.0));
        state.advance(&pair(9.0));
        assert_eq!(state.target(), c64::new(2.0, -1.0));
        assert!(state.warm_start().is_none());
    }

    #[test]
    fn test_flags_on_track_the_leading_pair() {
        let options = SweepOptions {
            update_lambda_tgt: true,
            update_initspace: true,
            ..SweepOptions::default()
        };
        let mut state = ContinuationState::new(&options);
        assert!(state.warm_start().is_none());

        state.advance(&pair(7.0));
        assert_eq!(state.target(), c64::new(7.0, 0.5));
        assert_eq!(state.warm_start().unwrap()[(0, 0)], c64::new(7.0, 0.0));

        // A pair without a vector keeps the previous warm start.
        state.advance(&EigenPair {
            eigenvalue: c64::new(3.0, 0.0),
            eigenvector: None,
        });
        assert_eq!(state.target(), c64::new(3.0, 0.0));
        assert_eq!(state.warm_start().unwrap()[(0, 0)], c64::new(7.0, 0.0));
    }

    #[test]
    fn test_target_only() {
        let options = SweepOptions {
            update_lambda_tgt: true,
            ..SweepOptions::default()
        };
        let mut state = ContinuationState::new(&options);
        state.advance(&pair(4.0));
        assert_eq!(state.target(), c64::new(4.0, 0.5));
        assert!(state.warm_start().is_none());
    }
}
