use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::FunctionLiteral;
use crate::builtins::Builtin;

pub mod environment;

pub use environment::Environment;

/// A runtime value. Compound values are reference counted, so cloning an
/// `Object` never copies its contents and aliases stay observable through
/// identity comparison.
#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
    Null,
    Array(Rc<Vec<Object>>),
    Map(Rc<IndexMap<MapKey, MapPair>>),
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// A closure: the literal it was created from plus the scope it captured.
#[derive(Debug)]
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub env: Environment,
}

/// Hashable projection of the objects allowed as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
}

/// Map entry keeping the original key object for display.
#[derive(Debug, Clone)]
pub struct MapPair {
    pub key: Object,
    pub value: Object,
}

impl Object {
    pub const TRUE: Object = Object::Boolean(true);
    pub const FALSE: Object = Object::Boolean(false);

    pub fn string(value: impl Into<Rc<str>>) -> Self {
        Object::String(value.into())
    }

    pub fn array(elements: Vec<Object>) -> Self {
        Object::Array(Rc::new(elements))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::String(_) => "STRING",
            Object::Null => "NULL",
            Object::Array(_) => "ARRAY",
            Object::Map(_) => "MAP",
            Object::Function(_) => "FUNCTION",
            Object::Builtin(_) => "BUILTIN",
        }
    }

    /// Everything except `false` and `null` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    pub fn map_key(&self) -> Option<MapKey> {
        match self {
            Object::Integer(value) => Some(MapKey::Integer(*value)),
            Object::Boolean(value) => Some(MapKey::Boolean(*value)),
            Object::String(value) => Some(MapKey::String(Rc::clone(value))),
            _ => None,
        }
    }

    /// Identity comparison used by `==` on anything but two integers.
    ///
    /// `null` and each boolean are singletons; every other value is only
    /// identical to itself, so two strings built separately differ even when
    /// their contents match.
    pub fn is_identical(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(left), Object::Integer(right)) => left == right,
            (Object::Boolean(left), Object::Boolean(right)) => left == right,
            (Object::Null, Object::Null) => true,
            (Object::String(left), Object::String(right)) => Rc::ptr_eq(left, right),
            (Object::Array(left), Object::Array(right)) => Rc::ptr_eq(left, right),
            (Object::Map(left), Object::Map(right)) => Rc::ptr_eq(left, right),
            (Object::Function(left), Object::Function(right)) => Rc::ptr_eq(left, right),
            (Object::Builtin(left), Object::Builtin(right)) => left == right,
            _ => false,
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        if value { Object::TRUE } else { Object::FALSE }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{value}"),
            Object::Boolean(value) => write!(f, "{value}"),
            Object::String(value) => f.write_str(value),
            Object::Null => f.write_str("null"),
            Object::Array(elements) => {
                f.write_str("[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            Object::Map(pairs) => {
                f.write_str("{")?;
                for (index, pair) in pairs.values().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("}")
            }
            Object::Function(function) => write!(f, "{}", function.literal),
            Object::Builtin(builtin) => write!(f, "builtin {}", builtin.name()),
        }
    }
}
