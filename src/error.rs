use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The category of a single validation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The value has the wrong shape or kind for its type.
    TypeError,
    /// A required field is absent and has no default.
    MissingRequired,
    /// The value has the right shape but fails a declared constraint.
    ConstraintViolation,
    /// No alternative of a union accepted the value.
    UnionNoMatch,
    /// A hook or router rejected the value.
    CustomError,
    /// An undeclared key was present while extra keys are forbidden.
    ExtraForbidden,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeError => "type_error",
            Self::MissingRequired => "missing_required",
            Self::ConstraintViolation => "constraint_violation",
            Self::UnionNoMatch => "union_no_match",
            Self::CustomError => "custom_error",
            Self::ExtraForbidden => "extra_forbidden",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the path from the document root to a failing value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A single validation failure, addressed by its path from the root.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub path: Vec<PathSegment>,
    pub kind: ErrorKind,
    pub message: String,

    /// Errors of the individual alternatives when `kind` is
    /// [`ErrorKind::UnionNoMatch`], in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<FieldError>,
}

impl FieldError {
    pub fn new(path: Vec<PathSegment>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            causes: vec![],
        }
    }

    /// The path rendered with `.` separators, e.g. `devices.0.mac`.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {} [{}]", self.message, self.kind)
        } else {
            write!(f, "{}: {} [{}]", self.path_string(), self.message, self.kind)
        }
    }
}

/// Every error found while validating one document, in declaration order.
///
/// An empty report means validation succeeded.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.errors
    }
}

impl From<Vec<FieldError>> for ValidationReport {
    fn from(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}

impl IntoIterator for ValidationReport {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        write!(
            f,
            "{count} validation error{}",
            if count == 1 { "" } else { "s" }
        )?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// A schema could not be constructed.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model '{model}' declares field '{field}' more than once")]
    DuplicateField { model: String, field: String },

    #[error("model '{model}' uses external name '{alias}' for more than one field")]
    DuplicateAlias { model: String, alias: String },

    #[error("cyclic model reference: {}", .0.join(" -> "))]
    CyclicReference(Vec<String>),

    #[error("unknown model: {0:?}")]
    UnknownModel(String),

    #[error("unknown {kind} hook: {name:?}")]
    UnknownHook { kind: &'static str, name: String },

    #[error("unknown format: {0:?}")]
    UnknownFormat(String),

    #[error("unknown scalar type: {0:?}")]
    UnknownScalarKind(String),

    #[error("invalid schema at {context}: {reason}")]
    InvalidForm { context: String, reason: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
