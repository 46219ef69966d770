//! Loading the sparse components and coefficient bindings of a matrix family.
//!
//! A family named `F` is declared by two parallel script arrays:
//!
//! ```lua
//! Fdat   = { "F0.mtx", "F1.mtx" }                 -- component matrix files
//! Ffuncs = { 1.0, function(w) return w * w end }  -- one coefficient per file
//! ```
//!
//! The family's coefficient matrix at parameter `p` is `Σ_i Ffuncs[i](p) · Fdat[i]`.

use crate::{
    error::{SweepError, SweepErrorKind},
    scalar::Scalar,
    script::{ScriptContext, ScriptFunction, ScriptValue},
    utils::data_loader::MatrixStore,
};
use faer::{c64, sparse::SparseColMat};
use std::path::PathBuf;

/// Suffix of the array listing a family's component files.
pub const FILES_SUFFIX: &str = "dat";
/// Suffix of the array listing a family's coefficients.
pub const COEFFICIENTS_SUFFIX: &str = "funcs";

/// The ordered, non-empty list of component matrices of one family.
///
/// All components share the same dimensions.
#[derive(Debug, Clone)]
pub struct MatrixComponentSet {
    family: String,
    components: Vec<SparseColMat<usize, c64>>,
}

impl MatrixComponentSet {
    /// Builds a set from already loaded matrices, checking it is non-empty and uniform.
    pub fn new(
        family: impl Into<String>,
        components: Vec<SparseColMat<usize, c64>>,
    ) -> Result<Self, SweepError> {
        let family = family.into();
        let Some(first) = components.first() else {
            return Err(SweepError::config(
                format!("{family}{FILES_SUFFIX}"),
                "the family declares no components",
            ));
        };
        let shape = (first.nrows(), first.ncols());
        if let Some((i, c)) = components
            .iter()
            .enumerate()
            .find(|(_, c)| (c.nrows(), c.ncols()) != shape)
        {
            return Err(SweepError::config(
                format!("{family}{FILES_SUFFIX}"),
                format!(
                    "component {} is {}x{} but component 1 is {}x{}",
                    i + 1,
                    c.nrows(),
                    c.ncols(),
                    shape.0,
                    shape.1
                ),
            ));
        }
        Ok(Self { family, components })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Shared `(nrows, ncols)` of the components.
    pub fn shape(&self) -> (usize, usize) {
        let first = &self.components[0];
        (first.nrows(), first.ncols())
    }

    pub fn components(&self) -> &[SparseColMat<usize, c64>] {
        &self.components
    }
}

/// A coefficient bound to one component.
#[derive(Debug, Clone)]
pub enum Coefficient {
    /// A literal weight, independent of the parameter.
    Constant(Scalar),
    /// A script function of the parameter.
    Callable(ScriptFunction),
}

/// The coefficients of one family, one per component, in declaration order.
#[derive(Debug, Clone)]
pub struct CoefficientBinding {
    family: String,
    coefficients: Vec<Coefficient>,
}

impl CoefficientBinding {
    pub fn new(family: impl Into<String>, coefficients: Vec<Coefficient>) -> Self {
        Self {
            family: family.into(),
            coefficients,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Coefficient> {
        self.coefficients.get(index)
    }
}

/// A family's components together with their coefficients.
#[derive(Debug, Clone)]
pub struct LoadedFamily {
    pub components: MatrixComponentSet,
    pub binding: CoefficientBinding,
}

/// Reads family declarations from the script and loads their component matrices.
pub struct ComponentLoader<'a, M> {
    script: &'a ScriptContext,
    store: &'a M,
}

impl<'a, M: MatrixStore> ComponentLoader<'a, M> {
    pub fn new(script: &'a ScriptContext, store: &'a M) -> Self {
        Self { script, store }
    }

    /// Loads every component of `family` and its coefficient binding.
    ///
    /// # Errors
    ///
    /// A configuration error if either array is missing or not an array, if their
    /// lengths differ, if the family is empty, if an entry has the wrong type, if a file
    /// cannot be loaded, or if the components differ in shape.
    pub fn load(&self, family: &str) -> Result<LoadedFamily, SweepError> {
        let files_key = format!("{family}{FILES_SUFFIX}");
        let coefficients_key = format!("{family}{COEFFICIENTS_SUFFIX}");

        let files = self
            .script
            .array_len(&files_key)
            .map_err(|e| SweepError::config(&files_key, e.to_string()))?;
        let coefficients = self
            .script
            .array_len(&coefficients_key)
            .map_err(|e| SweepError::config(&coefficients_key, e.to_string()))?;

        if files != coefficients {
            return Err(SweepErrorKind::BindingCountMismatch {
                family: family.to_string(),
                files,
                coefficients,
            }
            .into());
        }
        if files == 0 {
            return Err(SweepError::config(
                &files_key,
                "the family declares no components",
            ));
        }

        let mut matrices = Vec::with_capacity(files);
        let mut bound = Vec::with_capacity(files);
        for index in 0..files {
            let path = match self.script.array_element(&files_key, index) {
                Ok(ScriptValue::Text(path)) => PathBuf::from(path),
                Ok(other) => {
                    return Err(SweepError::config(
                        &files_key,
                        format!(
                            "element {} must be a file path, found {}",
                            index + 1,
                            other.type_name()
                        ),
                    ));
                }
                Err(e) => return Err(SweepError::config(&files_key, e.to_string())),
            };

            let matrix = self.store.load_sparse(&path).map_err(|e| {
                SweepError::from(SweepErrorKind::ComponentFile {
                    family: family.to_string(),
                    index,
                    path: path.clone(),
                    message: e.to_string(),
                })
            })?;
            log::debug!(
                "Loaded component {} of family `{family}` from {path:?} ({}x{}).",
                index + 1,
                matrix.nrows(),
                matrix.ncols()
            );
            matrices.push(matrix);

            let coefficient = match self.script.array_element(&coefficients_key, index) {
                Ok(ScriptValue::Scalar(value)) => Coefficient::Constant(value),
                Ok(ScriptValue::Callable(function)) => Coefficient::Callable(function),
                Ok(other) => {
                    return Err(SweepError::config(
                        &coefficients_key,
                        format!(
                            "element {} must be a number, a complex value or a function, found {}",
                            index + 1,
                            other.type_name()
                        ),
                    ));
                }
                Err(e) => return Err(SweepError::config(&coefficients_key, e.to_string())),
            };
            bound.push(coefficient);
        }

        let components = MatrixComponentSet::new(family, matrices)?;
        let (nrows, ncols) = components.shape();
        log::info!(
            "Family `{family}`: {} components of size {nrows}x{ncols}.",
            components.len()
        );

        Ok(LoadedFamily {
            components,
            binding: CoefficientBinding::new(family, bound),
        })
    }
}
