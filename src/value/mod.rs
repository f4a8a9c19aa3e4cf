//! Dynamic values and type descriptors.
//!
//! Calls reach the engine as structured events, so argument and return values are
//! carried as [`Value`]. The collaborator layer describes declared types with
//! [`TypeDesc`]; the engine never inspects host types itself.

use std::fmt;
use std::sync::Arc;

/// Stable identity of a mocked object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockId(Arc<str>);

impl MockId {
    /// Create an identity from its textual form.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The identity as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dynamically typed argument or return value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The value of a call that returns nothing.
    Unit,
    /// Absence of a value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integral number.
    Int(i64),
    /// Any floating point number.
    Float(f64),
    /// Single character.
    Char(char),
    /// Text.
    Str(String),
    /// Ordered sequence. The only sequence-like variant.
    List(Vec<Value>),
    /// Reference to a mocked object.
    Mock(MockId),
    /// Opaque stand-in produced when nothing better can be synthesized.
    Placeholder(String),
}

impl Value {
    /// Build a list from anything convertible into values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns the elements if the value is sequence-like.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the integer if the value is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float if the value is one.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean if the value is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if the value is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the mock identity if the value references a mock.
    #[must_use]
    pub fn as_mock(&self) -> Option<&MockId> {
        match self {
            Self::Mock(id) => Some(id),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Unit`].
    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Mock(id) => write!(f, "{id}"),
            Self::Placeholder(name) => write!(f, "<{name}>"),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl From<MockId> for Value {
    fn from(id: MockId) -> Self {
        Self::Mock(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Declared type of a parameter or return value, supplied by the collaborator layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// No meaningful value.
    Unit,
    /// Boolean.
    Bool,
    /// Integral number.
    Int,
    /// Floating point number.
    Float,
    /// Character.
    Char,
    /// Text.
    Str,
    /// Type without instances.
    Nothing,
    /// Growable collection of the element type.
    List(Box<TypeDesc>),
    /// Fixed array of the element type.
    Array(Box<TypeDesc>),
    /// Any other type, by name.
    Named(String),
}

impl TypeDesc {
    /// Shorthand for [`TypeDesc::List`].
    #[must_use]
    pub fn list_of(elem: TypeDesc) -> Self {
        Self::List(Box::new(elem))
    }

    /// Shorthand for [`TypeDesc::Array`].
    #[must_use]
    pub fn array_of(elem: TypeDesc) -> Self {
        Self::Array(Box::new(elem))
    }

    /// Shorthand for [`TypeDesc::Named`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::Bool => f.write_str("Bool"),
            Self::Int => f.write_str("Int"),
            Self::Float => f.write_str("Float"),
            Self::Char => f.write_str("Char"),
            Self::Str => f.write_str("String"),
            Self::Nothing => f.write_str("Nothing"),
            Self::List(elem) => write!(f, "List<{elem}>"),
            Self::Array(elem) => write!(f, "Array<{elem}>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}
