//! Sweep configuration read from the configuration script.
//!
//! A script declares, besides the matrix families handled by
//! [`crate::sweep::ComponentLoader`]:
//!
//! ```lua
//! parameters = { 0.5, 1.0, 1.5 }          -- numbers or complex(re, im)
//! families   = { "K", "D", "E" }          -- optional, ascending degree
//! options = {
//!   lambda_tgt        = complex(1.2, -0.1),
//!   update_lambda_tgt = true,
//!   update_initspace  = false,
//!   save_solutions    = true,
//!   output_dir        = "./out/",
//!   nev = 4, tol = 1e-8,
//! }
//! ```
//!
//! Every option may also be given as a plain global. Missing options take the defaults
//! of [`SweepOptions::default`].

use crate::{
    error::SweepError,
    scalar::Scalar,
    script::{ScriptContext, ScriptError, ScriptValue},
};
use faer::c64;
use std::path::PathBuf;

/// Global array holding the parameter sequence.
pub const PARAMETERS_KEY: &str = "parameters";

/// Family names used when the script does not declare `families`:
/// constant, linear and quadratic degree.
pub const DEFAULT_FAMILIES: [&str; 3] = ["K", "D", "E"];

/// Attaches the offending option name to a script error.
fn wrap(key: &'static str) -> impl Fn(ScriptError) -> SweepError {
    move |e| SweepError::config(key, e.to_string())
}

/// Continuation, persistence and solver options of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOptions {
    /// Initial target eigenvalue.
    pub lambda_tgt: c64,
    /// Replace the target by the leading eigenvalue after each step.
    pub update_lambda_tgt: bool,
    /// Seed the next solve with the leading eigenvector.
    pub update_initspace: bool,
    /// Persist the leading eigenvector of every step.
    pub save_solutions: bool,
    /// With `save_solutions`, persist every converged eigenvector instead.
    pub save_all_solutions: bool,
    /// Destination directory for persisted vectors.
    pub output_dir: PathBuf,
    /// Number of eigenpairs requested from the solver.
    pub nev: usize,
    /// Relative residual tolerance of the solver.
    pub tol: f64,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            lambda_tgt: c64::new(1.0, 0.0),
            update_lambda_tgt: false,
            update_initspace: false,
            save_solutions: false,
            save_all_solutions: false,
            output_dir: PathBuf::from("./"),
            nev: 1,
            tol: 1e-8,
        }
    }
}

impl SweepOptions {
    /// Reads every option from the script, falling back to the defaults.
    pub fn from_script(ctx: &ScriptContext) -> Result<Self, SweepError> {
        let defaults = Self::default();

        let options = Self {
            lambda_tgt: ctx
                .option_scalar("lambda_tgt", Scalar::Complex(defaults.lambda_tgt))
                .map_err(wrap("lambda_tgt"))?
                .to_complex(),
            update_lambda_tgt: ctx
                .option_bool("update_lambda_tgt", defaults.update_lambda_tgt)
                .map_err(wrap("update_lambda_tgt"))?,
            update_initspace: ctx
                .option_bool("update_initspace", defaults.update_initspace)
                .map_err(wrap("update_initspace"))?,
            save_solutions: ctx
                .option_bool("save_solutions", defaults.save_solutions)
                .map_err(wrap("save_solutions"))?,
            save_all_solutions: ctx
                .option_bool("save_all_solutions", defaults.save_all_solutions)
                .map_err(wrap("save_all_solutions"))?,
            output_dir: PathBuf::from(
                ctx.option_string("output_dir", "./")
                    .map_err(wrap("output_dir"))?,
            ),
            nev: ctx
                .option_usize("nev", defaults.nev)
                .map_err(wrap("nev"))?,
            tol: ctx.option_f64("tol", defaults.tol).map_err(wrap("tol"))?,
        };

        if options.nev == 0 {
            return Err(SweepError::config("nev", "must request at least one eigenpair"));
        }
        if options.tol.is_nan() || options.tol <= 0.0 {
            return Err(SweepError::config("tol", "must be a positive number"));
        }
        Ok(options)
    }
}

/// The immutable sequence of parameter values a sweep runs over.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    values: Vec<Scalar>,
}

impl ParameterSet {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    /// Reads the global `parameters` array.
    pub fn from_script(ctx: &ScriptContext) -> Result<Self, SweepError> {
        let len = ctx
            .array_len(PARAMETERS_KEY)
            .map_err(|e| SweepError::config(PARAMETERS_KEY, e.to_string()))?;

        let values = (0..len)
            .map(|i| match ctx.array_element(PARAMETERS_KEY, i) {
                Ok(ScriptValue::Scalar(value)) => Ok(value),
                Ok(other) => Err(SweepError::config(
                    PARAMETERS_KEY,
                    format!(
                        "element {} must be a number or a complex value, found {}",
                        i + 1,
                        other.type_name()
                    ),
                )),
                Err(e) => Err(SweepError::config(PARAMETERS_KEY, e.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Scalar> {
        self.values.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.values.iter().copied()
    }
}

/// Everything a sweep needs from the script apart from the matrix families themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub options: SweepOptions,
    pub parameters: ParameterSet,
    /// Family names in ascending degree: `families[i]` multiplies `λ^i`.
    pub families: Vec<String>,
}

impl SweepConfig {
    pub fn from_script(ctx: &ScriptContext) -> Result<Self, SweepError> {
        let options = SweepOptions::from_script(ctx)?;
        let parameters = ParameterSet::from_script(ctx)?;
        let families = ctx
            .option_string_list("families", &DEFAULT_FAMILIES)
            .map_err(|e| SweepError::config("families", e.to_string()))?;

        if families.len() < 2 {
            return Err(SweepError::config(
                "families",
                format!(
                    "a polynomial eigenproblem needs at least 2 families, got {}",
                    families.len()
                ),
            ));
        }
        if let Some(dup) = families
            .iter()
            .enumerate()
            .find_map(|(i, f)| families[..i].contains(f).then_some(f))
        {
            return Err(SweepError::config(
                "families",
                format!("family `{dup}` is declared twice"),
            ));
        }

        if parameters.is_empty() {
            log::warn!("The parameter sequence is empty; the sweep has nothing to do.");
        }
        log::info!(
            "Found {} parameters and {} matrix families ({}).",
            parameters.len(),
            families.len(),
            families.join(", ")
        );

        Ok(Self {
            options,
            parameters,
            families,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_defaults_when_options_are_absent() {
        let ctx = ScriptContext::from_source("cfg.lua", "parameters = { 1, 2 }").unwrap();
        let config = SweepConfig::from_script(&ctx).unwrap();
        assert_eq!(config.options, SweepOptions::default());
        assert_eq!(config.options.lambda_tgt, c64::new(1.0, 0.0));
        assert_eq!(config.options.output_dir, PathBuf::from("./"));
        assert_eq!(config.families, vec!["K", "D", "E"]);
        assert_eq!(
            config.parameters,
            ParameterSet::new(vec![Scalar::Real(1.0), Scalar::Real(2.0)])
        );
    }

    #[test]
    fn test_options_are_read() {
        let ctx = ScriptContext::from_source(
            "cfg.lua",
            r#"
                parameters = { complex(0, 1) }
                families = { "A0", "A1" }
                options = {
                    lambda_tgt = complex(2, -1),
                    update_lambda_tgt = true,
                    update_initspace = true,
                    save_solutions = true,
                    output_dir = "results/",
                    nev = 4,
                }
                tol = 1e-6
            "#,
        )
        .unwrap();
        let config = SweepConfig::from_script(&ctx).unwrap();
        let o = &config.options;
        assert_eq!(o.lambda_tgt, c64::new(2.0, -1.0));
        assert!(o.update_lambda_tgt && o.update_initspace && o.save_solutions);
        assert!(!o.save_all_solutions);
        assert_eq!(o.output_dir, PathBuf::from("results/"));
        assert_eq!((o.nev, o.tol), (4, 1e-6));
        assert_eq!(config.families, vec!["A0", "A1"]);
        assert_eq!(
            config.parameters.get(0),
            Some(Scalar::Complex(c64::new(0.0, 1.0)))
        );
    }

    #[test]
    fn test_invalid_declarations_are_config_errors() {
        let cases = [
            "x = 1",
            "parameters = 3",
            "parameters = { 1, 'two' }",
            "parameters = { 1 }; families = { 'K' }",
            "parameters = { 1 }; families = { 'K', 'K' }",
            "parameters = { 1 }; options = { nev = 0 }",
            "parameters = { 1 }; options = { update_initspace = 'yes' }",
        ];
        for source in cases {
            let ctx = ScriptContext::from_source("bad.lua", source).unwrap();
            let err = SweepConfig::from_script(&ctx).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Config, "{source}");
        }
    }
}
