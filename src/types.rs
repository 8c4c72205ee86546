use crate::constraint::Constraint;
use crate::model::ModelSchema;
use crate::router::KeyRouted;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// The target type of a field, a collection element or a mapping value.
///
/// Model schemas are shared through [`Arc`], so a type can only refer to
/// schemas that already exist. Self reference is rejected when a model is
/// built.
#[derive(Clone, Debug)]
pub enum TypeSpec {
    /// Accepts any value unchanged.
    Any,
    Scalar(ScalarKind),
    /// One of a fixed set of scalar values.
    Literal(Vec<Value>),
    Model(Arc<ModelSchema>),
    /// Alternatives tried in declaration order; the first that accepts the
    /// value wins, even when later alternatives would accept it too.
    Union(Vec<TypeSpec>),
    Collection(Box<TypeSpec>),
    Mapping(Box<TypeSpec>),
    /// A mapping whose entries are dispatched to models by their key.
    Routed(KeyRouted),
    /// The inner type, followed by constraint checks on the coerced value.
    Constrained(Box<TypeSpec>, Vec<Constraint>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float,
    String,
    Null,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float => "float",
            Self::String => "string",
            Self::Null => "null",
        }
    }

    /// Inclusive bounds for the integer kinds.
    pub(crate) fn int_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Integer => Some((i64::MIN, i64::MAX)),
            Self::Int8 => Some((-128, 127)),
            Self::Uint8 => Some((0, 255)),
            Self::Int16 => Some((-32768, 32767)),
            Self::Uint16 => Some((0, 65535)),
            Self::Int32 => Some((-2147483648, 2147483647)),
            Self::Uint32 => Some((0, 4294967295)),
            _ => None,
        }
    }
}

impl FromStr for ScalarKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "integer" => Ok(Self::Integer),
            "int8" => Ok(Self::Int8),
            "uint8" => Ok(Self::Uint8),
            "int16" => Ok(Self::Int16),
            "uint16" => Ok(Self::Uint16),
            "int32" => Ok(Self::Int32),
            "uint32" => Ok(Self::Uint32),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "null" => Ok(Self::Null),
            _ => Err(()),
        }
    }
}

impl TypeSpec {
    pub fn boolean() -> Self {
        Self::Scalar(ScalarKind::Boolean)
    }

    pub fn integer() -> Self {
        Self::Scalar(ScalarKind::Integer)
    }

    pub fn float() -> Self {
        Self::Scalar(ScalarKind::Float)
    }

    pub fn string() -> Self {
        Self::Scalar(ScalarKind::String)
    }

    pub fn null() -> Self {
        Self::Scalar(ScalarKind::Null)
    }

    pub fn literal(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Literal(values.into_iter().collect())
    }

    pub fn model(schema: &Arc<ModelSchema>) -> Self {
        Self::Model(Arc::clone(schema))
    }

    pub fn union(alternatives: impl IntoIterator<Item = TypeSpec>) -> Self {
        Self::Union(alternatives.into_iter().collect())
    }

    pub fn list_of(element: TypeSpec) -> Self {
        Self::Collection(Box::new(element))
    }

    pub fn map_of(value: TypeSpec) -> Self {
        Self::Mapping(Box::new(value))
    }

    /// This type or `null`, tried in that order.
    pub fn nullable(self) -> Self {
        Self::Union(vec![self, Self::null()])
    }

    /// Adds a constraint checked after this type has been coerced.
    pub fn with(self, constraint: Constraint) -> Self {
        match self {
            Self::Constrained(inner, mut constraints) => {
                constraints.push(constraint);
                Self::Constrained(inner, constraints)
            }
            other => Self::Constrained(Box::new(other), vec![constraint]),
        }
    }
}

impl From<ScalarKind> for TypeSpec {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl From<&Arc<ModelSchema>> for TypeSpec {
    fn from(schema: &Arc<ModelSchema>) -> Self {
        Self::model(schema)
    }
}
