//! Declarative validation, coercion and serialization of JSON value trees.
//!
//! A [`TypeSpec`] describes the shape a document must have. [`validate`]
//! walks a [`serde_json::Value`] against it, coercing scalars where a lossless
//! conversion exists, and returns either a typed [`Validated`] tree or a
//! [`ValidationReport`] listing every failure with its path. [`serialize`]
//! turns a validated tree back into a `Value`, and [`deep_eq`] / [`diff`]
//! check that the two agree.
//!
//! ```
//! use jsonshape::{validate, Constraint, FieldDescriptor, ModelSchema, TypeSpec, ValidateOptions};
//! use serde_json::json;
//!
//! let user = ModelSchema::builder("User")
//!     .field(FieldDescriptor::new("id", TypeSpec::integer()).constraint(Constraint::Positive))
//!     .field(
//!         FieldDescriptor::new("name", TypeSpec::string())
//!             .constraint(Constraint::MinLength(1)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let spec = TypeSpec::model(&user);
//! let validation = validate(&spec, &json!({"id": "15", "name": "John"}), ValidateOptions::new());
//! assert_eq!(Some(15), validation.value.unwrap().get("id").and_then(|v| v.as_i64()));
//!
//! let validation = validate(&spec, &json!({"id": -1, "name": "John"}), ValidateOptions::new());
//! assert_eq!("id", validation.report.errors()[0].path_string());
//! ```

pub mod hook;

mod constraint;
mod error;
mod model;
mod roundtrip;
mod router;
mod serde_schema;
mod serialize;
mod types;
mod validate;
mod value;

pub use constraint::*;
pub use error::*;
pub use hook::{AfterHook, BeforeHook, Hooks, SerializeHook};
pub use model::*;
pub use roundtrip::*;
pub use router::*;
pub use serde_schema::*;
pub use serialize::*;
pub use types::*;
pub use validate::*;
pub use value::*;
