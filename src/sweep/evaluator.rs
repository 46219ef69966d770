//! Evaluation of a family's bound coefficients at one parameter value.

use crate::{
    config::ParameterSet,
    error::{SweepError, SweepErrorKind},
    sweep::loader::{Coefficient, CoefficientBinding},
};
use faer::c64;

/// Resolves coefficient bindings to complex weights at a given parameter step.
///
/// Constants are returned as-is. Callables are invoked with the parameter value in its
/// native type (a real parameter is passed as a number, a complex one as a complex value)
/// and their result is widened to complex.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientEvaluator<'a> {
    parameters: &'a ParameterSet,
}

impl<'a> CoefficientEvaluator<'a> {
    pub fn new(parameters: &'a ParameterSet) -> Self {
        Self { parameters }
    }

    /// Evaluates coefficient `component_index` of `binding` at parameter `parameter_index`.
    ///
    /// # Errors
    ///
    /// An evaluation error naming the family, component and parameter step when either
    /// index is out of range, the script function raises, returns something that is not a
    /// number, or returns a non-finite value.
    pub fn evaluate(
        &self,
        binding: &CoefficientBinding,
        component_index: usize,
        parameter_index: usize,
    ) -> Result<c64, SweepError> {
        let fail = |message: String| -> SweepError {
            SweepErrorKind::Eval {
                family: binding.family().to_string(),
                component: component_index,
                parameter_index,
                message,
            }
            .into()
        };

        let coefficient = binding.get(component_index).ok_or_else(|| {
            fail(format!(
                "the family binds only {} coefficients",
                binding.len()
            ))
        })?;

        let value = match coefficient {
            Coefficient::Constant(value) => *value,
            Coefficient::Callable(function) => {
                let parameter = self.parameters.get(parameter_index).ok_or_else(|| {
                    fail(format!(
                        "only {} parameters are defined",
                        self.parameters.len()
                    ))
                })?;
                function.call(parameter).map_err(|e| fail(e.to_string()))?
            }
        };

        let z = value.to_complex();
        if !(z.re.is_finite() && z.im.is_finite()) {
            return Err(fail(format!("the coefficient evaluated to {z}")));
        }
        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorCategory, scalar::Scalar, script::ScriptContext};

    fn binding(ctx: &ScriptContext) -> CoefficientBinding {
        let coefficients = (0..ctx.array_len("Efuncs").unwrap())
            .map(|i| match ctx.array_element("Efuncs", i).unwrap() {
                crate::script::ScriptValue::Scalar(s) => Coefficient::Constant(s),
                crate::script::ScriptValue::Callable(f) => Coefficient::Callable(f),
                other => panic!("unexpected {}", other.type_name()),
            })
            .collect();
        CoefficientBinding::new("E", coefficients)
    }

    #[test]
    fn test_constants_and_callables() {
        let ctx = ScriptContext::from_source(
            "eval.lua",
            r#"Efuncs = { 3.0, function(w) return w * w end, function(w) return w:conj() end }"#,
        )
        .unwrap();
        let b = binding(&ctx);
        let parameters = ParameterSet::new(vec![
            Scalar::Real(2.0),
            Scalar::Complex(c64::new(1.0, 1.0)),
        ]);
        let evaluator = CoefficientEvaluator::new(&parameters);

        assert_eq!(evaluator.evaluate(&b, 0, 0).unwrap(), c64::new(3.0, 0.0));
        assert_eq!(evaluator.evaluate(&b, 0, 1).unwrap(), c64::new(3.0, 0.0));
        assert_eq!(evaluator.evaluate(&b, 1, 0).unwrap(), c64::new(4.0, 0.0));
        assert_eq!(evaluator.evaluate(&b, 1, 1).unwrap(), c64::new(0.0, 2.0));
        assert_eq!(evaluator.evaluate(&b, 2, 1).unwrap(), c64::new(1.0, -1.0));
    }

    #[test]
    fn test_failures_carry_context() {
        let ctx = ScriptContext::from_source(
            "eval.lua",
            r#"Efuncs = {
                function(w) error("boom") end,
                function(w) return "text" end,
                function(w) return 0 / 0 end,
            }"#,
        )
        .unwrap();
        let b = binding(&ctx);
        let parameters = ParameterSet::new(vec![Scalar::Real(1.0)]);
        let evaluator = CoefficientEvaluator::new(&parameters);

        let err = evaluator.evaluate(&b, 0, 0).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Eval);
        let message = err.to_string();
        assert!(message.contains("family `E`, component 0, parameter index 0"), "{message}");
        assert!(message.contains("boom"), "{message}");

        for component in [1, 2] {
            let err = evaluator.evaluate(&b, component, 0).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Eval, "{err}");
        }
        assert!(evaluator.evaluate(&b, 0, 5).is_err());
        assert!(evaluator.evaluate(&b, 3, 0).is_err());
    }
}
