//! The dynamically-typed runtime value.
//!
//! A tagged sum over `{Nil, Bool, Number(f64), Obj(ObjRef)}`, matching the
//! "tagged struct" representation permitted by the data model: a discriminant
//! plus payload, rather than a NaN-boxed word. See DESIGN.md for why.

use std::fmt;

use crate::heap::Heap;
use crate::object::ObjRef;

/// A runtime value. `Copy` because every variant is either a scalar or a
/// `Copy` handle into the heap.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(ObjRef),
}

impl Value {
    /// `nil` and `false` are falsey; every other value, including `0` and
    /// the empty string, is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_truthy(&self) -> bool {
        !self.is_falsey()
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Obj(o) => Some(*o),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl PartialEq for Value {
    /// Nil=Nil; Bool by value; Number by IEEE `==` (so NaN != NaN); Obj by
    /// reference identity. Because strings are interned, string equality
    /// reduces to `ObjRef` equality, which this already gives for free.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<ObjRef> for Value {
    fn from(o: ObjRef) -> Self {
        Value::Obj(o)
    }
}

/// The name of a value's runtime type, as used by the `type()` native and by
/// error messages. Does not require heap access.
pub fn type_name(value: &Value, heap: &Heap) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::Obj(o) => heap.type_name_of(*o),
    }
}

/// Renders a value the way `print` and string concatenation do. Needs heap
/// access because `Obj` values only carry a handle, not their payload.
///
/// Representations: Number prints minimal decimal; Bool as `true`/`false`;
/// Nil as `nil`; String as its raw contents; Function as `<fn name>` or
/// `<script>`; Class as its name; Instance as `<name> instance`; BoundMethod
/// as its method's function form; Native as `<native fn>`.
pub fn format_value(value: &Value, heap: &Heap) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Obj(o) => heap.format_object(*o),
    }
}

/// Minimal decimal rendering: integral doubles print without a fractional
/// part, matching clox's `%g`-ish behaviour for the values test programs
/// actually produce.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n.is_sign_positive() { "inf".to_string() } else { "-inf".to_string() }
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    /// Context-free `Display` is only meaningful for non-`Obj` values; `Obj`
    /// prints its handle for debugging since it has no heap access here.
    /// Use [`format_value`] for the language's actual `print` semantics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Obj(o) => write!(f, "<obj #{}>", o.index()),
        }
    }
}
