//! The configuration-script collaborator.
//!
//! A sweep is declared in a Lua script: the parameter sequence, the component files
//! and coefficient functions of every matrix family, and a handful of options. This
//! module owns the single interpreter state and exposes only the primitives the rest
//! of the crate needs:
//!
//! - running the script ([`ScriptContext::from_file`], [`ScriptContext::from_source`]);
//! - the length and the elements of a named global array;
//! - typed option lookups with caller-supplied defaults;
//! - calling a coefficient function with one scalar argument ([`ScriptFunction::call`]).
//!
//! [`mlua::Lua`] is neither `Send` nor `Sync`, so all calls into the interpreter are
//! serialized through the one [`ScriptContext`] that owns it.
//!
//! Before the script runs, a global constructor `complex(re, im)` is installed. It
//! returns a userdata value supporting `+ - * / ^`, unary minus, `tostring`, the
//! fields `re`/`im` and the methods `abs`, `arg`, `conj`, `exp` and `sqrt`, so
//! coefficient functions can be written naturally for complex parameters.

use crate::scalar::Scalar;
use faer::c64;
use mlua::{
    Function, Lua, MetaMethod, Table, UserData, UserDataFields, UserDataMethods, Value,
};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Name of the optional global table holding sweep options.
pub const OPTIONS_TABLE: &str = "options";

/// Represents all errors raised by the scripting collaborator.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("I/O error reading script {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The interpreter raised an error.
    #[error("Lua error while {context}: {message}")]
    Lua { context: String, message: String },
    /// A required global is not defined.
    #[error("`{name}` is not defined")]
    Missing { name: String },
    /// A value has an unexpected type.
    #[error("`{name}` must be {expected}, found {found}")]
    Type {
        name: String,
        expected: &'static str,
        found: String,
    },
}

/// Maps an interpreter error to a [`ScriptError`] carrying what was being attempted.
fn lua_error(context: impl Into<String>) -> impl FnOnce(mlua::Error) -> ScriptError {
    let context = context.into();
    move |e| ScriptError::Lua {
        context,
        message: e.to_string(),
    }
}

/// A complex number living inside the interpreter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LuaComplex(pub(crate) c64);

/// Reads an arithmetic operand: a Lua number or a [`LuaComplex`].
fn operand(value: &Value) -> mlua::Result<c64> {
    match value {
        Value::Integer(i) => Ok(c64::new(*i as f64, 0.0)),
        Value::Number(x) => Ok(c64::new(*x, 0.0)),
        Value::UserData(ud) => Ok(ud.borrow::<LuaComplex>()?.0),
        other => Err(mlua::Error::runtime(format!(
            "attempt to perform complex arithmetic on a {} value",
            other.type_name()
        ))),
    }
}

impl UserData for LuaComplex {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("re", |_, this| Ok(this.0.re));
        fields.add_field_method_get("im", |_, this| Ok(this.0.im));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("abs", |_, this, ()| Ok(this.0.norm()));
        methods.add_method("arg", |_, this, ()| Ok(this.0.arg()));
        methods.add_method("conj", |_, this, ()| Ok(LuaComplex(this.0.conj())));
        methods.add_method("exp", |_, this, ()| Ok(LuaComplex(this.0.exp())));
        methods.add_method("sqrt", |_, this, ()| Ok(LuaComplex(this.0.sqrt())));

        methods.add_meta_function(MetaMethod::Add, |_, (a, b): (Value, Value)| {
            Ok(LuaComplex(operand(&a)? + operand(&b)?))
        });
        methods.add_meta_function(MetaMethod::Sub, |_, (a, b): (Value, Value)| {
            Ok(LuaComplex(operand(&a)? - operand(&b)?))
        });
        methods.add_meta_function(MetaMethod::Mul, |_, (a, b): (Value, Value)| {
            Ok(LuaComplex(operand(&a)? * operand(&b)?))
        });
        methods.add_meta_function(MetaMethod::Div, |_, (a, b): (Value, Value)| {
            Ok(LuaComplex(operand(&a)? / operand(&b)?))
        });
        methods.add_meta_function(MetaMethod::Pow, |_, (a, b): (Value, Value)| {
            Ok(LuaComplex(operand(&a)?.powc(operand(&b)?)))
        });
        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| Ok(LuaComplex(-this.0)));
        methods.add_meta_function(MetaMethod::Eq, |_, (a, b): (Value, Value)| {
            Ok(operand(&a)? == operand(&b)?)
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}{:+}i", this.0.re, this.0.im))
        });
    }
}

/// Resolves a script value to a [`Scalar`], if it has a numeric representation.
///
/// Accepted forms are Lua numbers, `complex(re, im)` values, tables `{re = x, im = y}`
/// and two-element arrays `{x, y}`.
fn value_to_scalar(value: &Value) -> Option<Scalar> {
    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    match value {
        Value::Integer(_) | Value::Number(_) => number(value).map(Scalar::Real),
        Value::UserData(ud) => ud
            .borrow::<LuaComplex>()
            .ok()
            .map(|z| Scalar::Complex(z.0)),
        Value::Table(t) => {
            let re = t.raw_get::<Value>("re").ok()?;
            if !re.is_nil() {
                let im = match t.raw_get::<Value>("im").ok()? {
                    Value::Nil => 0.0,
                    im => number(&im)?,
                };
                return Some(Scalar::Complex(c64::new(number(&re)?, im)));
            }
            if t.raw_len() == 2 {
                let re = number(&t.raw_get::<Value>(1).ok()?)?;
                let im = number(&t.raw_get::<Value>(2).ok()?)?;
                return Some(Scalar::Complex(c64::new(re, im)));
            }
            None
        }
        _ => None,
    }
}

/// A one-argument function defined in the configuration script.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    function: Function,
}

impl ScriptFunction {
    /// Calls the function with `argument` and resolves the returned value to a [`Scalar`].
    ///
    /// Real arguments are passed as Lua numbers, complex ones as `complex` values.
    pub fn call(&self, argument: Scalar) -> Result<Scalar, ScriptError> {
        let result: Value = match argument {
            Scalar::Real(x) => self.function.call::<Value>(x),
            Scalar::Complex(z) => self.function.call::<Value>(LuaComplex(z)),
        }
        .map_err(lua_error("calling a coefficient function"))?;

        value_to_scalar(&result).ok_or_else(|| ScriptError::Type {
            name: "coefficient function result".to_string(),
            expected: "a number or a complex value",
            found: result.type_name().to_string(),
        })
    }
}

/// An element of a script array, classified for the caller.
#[derive(Debug, Clone)]
pub enum ScriptValue {
    Scalar(Scalar),
    Callable(ScriptFunction),
    Text(String),
    /// Anything else; carries the Lua type name for error messages.
    Other(&'static str),
}

impl ScriptValue {
    fn classify(value: Value) -> Self {
        if let Some(scalar) = value_to_scalar(&value) {
            return ScriptValue::Scalar(scalar);
        }
        match value {
            Value::Function(function) => ScriptValue::Callable(ScriptFunction { function }),
            Value::String(s) => ScriptValue::Text(s.to_string_lossy()),
            other => ScriptValue::Other(other.type_name()),
        }
    }

    /// The Lua-side type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Scalar(Scalar::Real(_)) => "number",
            ScriptValue::Scalar(Scalar::Complex(_)) => "complex",
            ScriptValue::Callable(_) => "function",
            ScriptValue::Text(_) => "string",
            ScriptValue::Other(name) => name,
        }
    }
}

/// Owns the interpreter state that a configuration script was run in.
pub struct ScriptContext {
    lua: Lua,
    name: String,
}

impl std::fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ScriptContext {
    /// Creates an interpreter and runs the script at `path` in it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(&path.display().to_string(), &source)
    }

    /// Creates an interpreter and runs `source` in it; `name` appears in Lua error messages.
    pub fn from_source(name: &str, source: &str) -> Result<Self, ScriptError> {
        let lua = Lua::new();

        let constructor = lua
            .create_function(|_, (re, im): (f64, Option<f64>)| {
                Ok(LuaComplex(c64::new(re, im.unwrap_or(0.0))))
            })
            .map_err(lua_error("installing the complex constructor"))?;
        lua.globals()
            .set("complex", constructor)
            .map_err(lua_error("installing the complex constructor"))?;

        lua.load(source)
            .set_name(name)
            .exec()
            .map_err(lua_error(format!("running configuration script {name}")))?;

        log::debug!("Configuration script {name} executed.");
        Ok(Self {
            lua,
            name: name.to_string(),
        })
    }

    /// The name the script was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn global(&self, name: &str) -> Result<Value, ScriptError> {
        self.lua
            .globals()
            .raw_get::<Value>(name)
            .map_err(lua_error(format!("reading global `{name}`")))
    }

    fn array(&self, name: &str) -> Result<Table, ScriptError> {
        match self.global(name)? {
            Value::Table(t) => Ok(t),
            Value::Nil => Err(ScriptError::Missing {
                name: name.to_string(),
            }),
            other => Err(ScriptError::Type {
                name: name.to_string(),
                expected: "an array",
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Length of the global array `name`.
    pub fn array_len(&self, name: &str) -> Result<usize, ScriptError> {
        Ok(self.array(name)?.raw_len())
    }

    /// Element `index` (0-based) of the global array `name`.
    pub fn array_element(&self, name: &str, index: usize) -> Result<ScriptValue, ScriptError> {
        let value = self
            .array(name)?
            .raw_get::<Value>(index + 1)
            .map_err(lua_error(format!("reading {name}[{}]", index + 1)))?;
        Ok(ScriptValue::classify(value))
    }

    /// Looks `name` up in the `options` table, then among the globals.
    fn option(&self, name: &str) -> Result<Option<Value>, ScriptError> {
        match self.global(OPTIONS_TABLE)? {
            Value::Table(options) => {
                let value = options
                    .raw_get::<Value>(name)
                    .map_err(lua_error(format!("reading option `{name}`")))?;
                if !value.is_nil() {
                    return Ok(Some(value));
                }
            }
            Value::Nil => {}
            other => {
                return Err(ScriptError::Type {
                    name: OPTIONS_TABLE.to_string(),
                    expected: "a table",
                    found: other.type_name().to_string(),
                });
            }
        }
        let value = self.global(name)?;
        Ok((!value.is_nil()).then_some(value))
    }

    fn type_error(name: &str, expected: &'static str, found: &Value) -> ScriptError {
        ScriptError::Type {
            name: name.to_string(),
            expected,
            found: found.type_name().to_string(),
        }
    }

    pub fn option_bool(&self, name: &str, default: bool) -> Result<bool, ScriptError> {
        match self.option(name)? {
            None => Ok(default),
            Some(Value::Boolean(b)) => Ok(b),
            Some(other) => Err(Self::type_error(name, "a boolean", &other)),
        }
    }

    pub fn option_f64(&self, name: &str, default: f64) -> Result<f64, ScriptError> {
        match self.option(name)? {
            None => Ok(default),
            Some(Value::Integer(i)) => Ok(i as f64),
            Some(Value::Number(x)) => Ok(x),
            Some(other) => Err(Self::type_error(name, "a number", &other)),
        }
    }

    pub fn option_usize(&self, name: &str, default: usize) -> Result<usize, ScriptError> {
        match self.option(name)? {
            None => Ok(default),
            Some(Value::Integer(i)) if i >= 0 => Ok(i as usize),
            Some(Value::Number(x)) if x >= 0.0 && x.fract() == 0.0 => Ok(x as usize),
            Some(other) => Err(Self::type_error(name, "a non-negative integer", &other)),
        }
    }

    /// A real or complex option.
    pub fn option_scalar(&self, name: &str, default: Scalar) -> Result<Scalar, ScriptError> {
        match self.option(name)? {
            None => Ok(default),
            Some(value) => value_to_scalar(&value)
                .ok_or_else(|| Self::type_error(name, "a number or a complex value", &value)),
        }
    }

    pub fn option_string(&self, name: &str, default: &str) -> Result<String, ScriptError> {
        match self.option(name)? {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.to_string_lossy()),
            Some(other) => Err(Self::type_error(name, "a string", &other)),
        }
    }

    /// An array-of-strings option.
    pub fn option_string_list(
        &self,
        name: &str,
        default: &[&str],
    ) -> Result<Vec<String>, ScriptError> {
        let table = match self.option(name)? {
            None => return Ok(default.iter().map(|s| s.to_string()).collect()),
            Some(Value::Table(t)) => t,
            Some(other) => return Err(Self::type_error(name, "an array of strings", &other)),
        };
        (1..=table.raw_len())
            .map(|i| {
                match table
                    .raw_get::<Value>(i)
                    .map_err(lua_error(format!("reading {name}[{i}]")))?
                {
                    Value::String(s) => Ok(s.to_string_lossy()),
                    other => Err(Self::type_error(name, "an array of strings", &other)),
                }
            })
            .collect()
    }

    /// Wraps a value into a userdata handle; used by tests to check round trips.
    #[cfg(test)]
    fn complex_userdata(&self, z: c64) -> mlua::Result<mlua::AnyUserData> {
        self.lua.create_userdata(LuaComplex(z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        parameters = { 0.5, 1, complex(2, -1), { re = 3, im = 0.5 }, { 4, 1 } }
        Kdat = { "k0.mtx", "k1.mtx" }
        Kfuncs = { 1.0, function(w) return w * w end }
        options = { update_lambda_tgt = true, nev = 3, tol = 1e-6 }
        output_dir = "out/"
        families = { "K", "E" }
    "#;

    fn context() -> ScriptContext {
        ScriptContext::from_source("test.lua", SCRIPT).unwrap()
    }

    #[test]
    fn test_array_len_and_numeric_elements() {
        let ctx = context();
        assert_eq!(ctx.array_len("parameters").unwrap(), 5);

        let expected = [
            Scalar::Real(0.5),
            Scalar::Real(1.0),
            Scalar::Complex(c64::new(2.0, -1.0)),
            Scalar::Complex(c64::new(3.0, 0.5)),
            Scalar::Complex(c64::new(4.0, 1.0)),
        ];
        for (i, want) in expected.iter().enumerate() {
            match ctx.array_element("parameters", i).unwrap() {
                ScriptValue::Scalar(s) => assert_eq!(s, *want, "element {i}"),
                other => panic!("element {i} classified as {}", other.type_name()),
            }
        }
    }

    #[test]
    fn test_text_and_callable_elements() {
        let ctx = context();
        assert!(matches!(
            ctx.array_element("Kdat", 1).unwrap(),
            ScriptValue::Text(ref s) if s == "k1.mtx"
        ));
        let ScriptValue::Callable(f) = ctx.array_element("Kfuncs", 1).unwrap() else {
            panic!("expected a callable");
        };
        assert_eq!(f.call(Scalar::Real(3.0)).unwrap(), Scalar::Real(9.0));
        // Complex arguments go through the complex userdata arithmetic.
        assert_eq!(
            f.call(Scalar::Complex(c64::new(0.0, 1.0))).unwrap(),
            Scalar::Complex(c64::new(-1.0, 0.0))
        );
    }

    #[test]
    fn test_missing_and_mistyped_arrays() {
        let ctx = context();
        assert!(matches!(
            ctx.array_len("Ddat"),
            Err(ScriptError::Missing { .. })
        ));
        assert!(matches!(
            ctx.array_len("output_dir"),
            Err(ScriptError::Type { .. })
        ));
    }

    #[test]
    fn test_option_lookup_order_and_defaults() {
        let ctx = context();
        assert!(ctx.option_bool("update_lambda_tgt", false).unwrap());
        assert!(!ctx.option_bool("save_solutions", false).unwrap());
        assert_eq!(ctx.option_usize("nev", 1).unwrap(), 3);
        assert_eq!(ctx.option_f64("tol", 1e-8).unwrap(), 1e-6);
        // Falls back to a plain global when the options table lacks the key.
        assert_eq!(ctx.option_string("output_dir", "./").unwrap(), "out/");
        assert_eq!(
            ctx.option_scalar("lambda_tgt", Scalar::Real(1.0)).unwrap(),
            Scalar::Real(1.0)
        );
        assert_eq!(
            ctx.option_string_list("families", &["K", "D", "E"]).unwrap(),
            vec!["K".to_string(), "E".to_string()]
        );
    }

    #[test]
    fn test_option_type_mismatch() {
        let ctx = ScriptContext::from_source("bad.lua", "options = { save_solutions = 1 }").unwrap();
        let err = ctx.option_bool("save_solutions", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`save_solutions` must be a boolean, found integer"
        );
    }

    #[test]
    fn test_script_errors_are_reported() {
        let err = ScriptContext::from_source("broken.lua", "parameters = {").unwrap_err();
        assert!(matches!(err, ScriptError::Lua { .. }));
        assert!(err.to_string().contains("broken.lua"));
    }

    #[test]
    fn test_function_raising_or_returning_garbage() {
        let ctx = ScriptContext::from_source(
            "f.lua",
            r#"f = { function(w) error("boom") end, function(w) return "text" end }"#,
        )
        .unwrap();
        let ScriptValue::Callable(raises) = ctx.array_element("f", 0).unwrap() else {
            panic!("expected a callable");
        };
        assert!(matches!(
            raises.call(Scalar::Real(1.0)),
            Err(ScriptError::Lua { .. })
        ));
        let ScriptValue::Callable(garbage) = ctx.array_element("f", 1).unwrap() else {
            panic!("expected a callable");
        };
        assert!(matches!(
            garbage.call(Scalar::Real(1.0)),
            Err(ScriptError::Type { .. })
        ));
    }

    #[test]
    fn test_complex_userdata_methods() {
        let ctx = ScriptContext::from_source(
            "c.lua",
            r#"
                local z = complex(3, 4)
                magnitude = z:abs()
                conj_im = z:conj().im
                sum = z + 1
                scaled = 2 * z
            "#,
        )
        .unwrap();
        assert_eq!(ctx.option_f64("magnitude", 0.0).unwrap(), 5.0);
        assert_eq!(ctx.option_f64("conj_im", 0.0).unwrap(), -4.0);
        assert_eq!(
            ctx.option_scalar("sum", Scalar::Real(0.0)).unwrap(),
            Scalar::Complex(c64::new(4.0, 4.0))
        );
        assert_eq!(
            ctx.option_scalar("scaled", Scalar::Real(0.0)).unwrap(),
            Scalar::Complex(c64::new(6.0, 8.0))
        );

        let ud = ctx.complex_userdata(c64::new(1.0, 2.0)).unwrap();
        assert_eq!(
            value_to_scalar(&Value::UserData(ud)),
            Some(Scalar::Complex(c64::new(1.0, 2.0)))
        );
    }
}
