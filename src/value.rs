use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::{eval::error::EvalError, number::Number};

/// A function callable from a script, supplied by the host or the built-in
/// math root.
#[derive(Clone)]
pub struct Callable {
    arity: u8,
    func: Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>,
}

impl Callable {
    pub fn new(
        arity: u8,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            arity,
            func: Rc::new(func),
        }
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }

    /// Invokes the underlying function. Arity is the caller's problem; the
    /// evaluator checks it before ever reaching this point.
    pub fn invoke(&self, args: &[Value]) -> Result<Value, EvalError> {
        (self.func)(args)
    }
}

impl Debug for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "callable/{}", self.arity)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity
            && std::ptr::eq(
                Rc::as_ptr(&self.func) as *const (),
                Rc::as_ptr(&other.func) as *const (),
            )
    }
}

/// A named query root: a table of members addressed as `name.member`.
///
/// Hosts build one per root they expose to the interpreter. Member values
/// are numbers, nulls, or callables.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryObject {
    name: CompactString,
    members: FxHashMap<CompactString, Value>,
}

impl QueryObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: CompactString::from(name),
            members: FxHashMap::default(),
        }
    }

    pub fn number(mut self, name: &str, value: f64) -> Self {
        self.members
            .insert(CompactString::from(name), Value::Number(Number::new(value)));
        self
    }

    pub fn null(mut self, name: &str) -> Self {
        self.members.insert(CompactString::from(name), Value::Null);
        self
    }

    pub fn callable(
        mut self,
        name: &str,
        arity: u8,
        func: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        self.members.insert(
            CompactString::from(name),
            Value::Callable(Callable::new(arity, func)),
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }
}

/// The interpreter's runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Null,
    Callable(Callable),
    Object(Rc<QueryObject>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn name(&self) -> &str {
        match self {
            Value::Number(_) => "number",
            Value::Null => "null",
            Value::Callable(_) => "callable",
            Value::Object(_) => "query",
        }
    }

    /// The numeric projection used by arithmetic and comparisons: `Null`
    /// coerces to `0.0`, callables and query objects do not project.
    pub(crate) fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.value()),
            Value::Null => Some(0.0),
            Value::Callable(_) | Value::Object(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::new(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Null => write!(f, "null"),
            Value::Callable(c) => write!(f, "callable/{}", c.arity),
            Value::Object(o) => write!(f, "{}", o.name()),
        }
    }
}
