use crate::constraint::{Constraint, Format};
use crate::error::SchemaError;
use crate::hook::Hooks;
use crate::model::{FieldDescriptor, ModelSchema};
use crate::router::{DispatchMode, KeyRouted, Registry, Router};
use crate::types::{ScalarKind, TypeSpec};
use crate::validate::{validate, ValidateOptions, Validation};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A JSON representation of a set of models and a root type, compatible with
/// `serde_json`.
///
/// Hooks are referred to by name and resolved against a [`Hooks`] registry
/// when the document is compiled.
///
/// ```
/// use jsonshape::{SerdeSchema, SerdeType};
/// use serde_json::json;
///
/// assert_eq!(
///     SerdeSchema {
///         root: SerdeType { type_: Some("uint8".to_owned()), ..Default::default() },
///         ..Default::default()
///     },
///     serde_json::from_value::<SerdeSchema>(json!({ "root": { "type": "uint8" } })).unwrap()
/// )
/// ```
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SerdeSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, SerdeModel>>,

    pub root: SerdeType,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SerdeModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,

    /// Keyed by internal field name, in declaration order.
    #[serde(default)]
    pub fields: IndexMap<String, SerdeField>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SerdeField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub serializer: Option<String>,

    pub schema: SerdeType,
}

/// A type with at most one form keyword. No form keyword means any value is
/// accepted.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SerdeType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SerdeType>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<Box<SerdeType>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Box<SerdeType>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub routed: Option<SerdeRouted>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub positive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct SerdeRouted {
    /// Key prefix to definition name, tried in order.
    pub prefixes: IndexMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DispatchMode>,
}

/// The models and root type of a compiled [`SerdeSchema`].
#[derive(Clone, Debug)]
pub struct CompiledSchema {
    models: IndexMap<String, Arc<ModelSchema>>,
    root: TypeSpec,
}

impl CompiledSchema {
    pub fn root(&self) -> &TypeSpec {
        &self.root
    }

    pub fn model(&self, name: &str) -> Option<&Arc<ModelSchema>> {
        self.models.get(name)
    }

    /// Compiled models, in the order their compilation finished.
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelSchema>> {
        self.models.values()
    }

    pub fn validate(&self, instance: &Value, options: ValidateOptions) -> Validation {
        validate(&self.root, instance, options)
    }
}

impl SerdeSchema {
    /// Resolves every definition and the root type.
    ///
    /// Definitions are compiled depth-first, so a reference cycle through
    /// `ref`, `extends`, union alternatives or a routed registry is reported
    /// even when no document would reach it.
    pub fn compile(&self, hooks: &Hooks) -> Result<CompiledSchema, SchemaError> {
        let empty = IndexMap::new();
        let definitions = self.definitions.as_ref().unwrap_or(&empty);
        let mut compiler = Compiler {
            definitions,
            hooks,
            done: IndexMap::new(),
            stack: vec![],
        };

        for name in definitions.keys() {
            compiler.model(name)?;
        }

        let root = compiler.type_spec(&self.root, "root")?;

        Ok(CompiledSchema {
            models: compiler.done,
            root,
        })
    }
}

struct Compiler<'a> {
    definitions: &'a IndexMap<String, SerdeModel>,
    hooks: &'a Hooks,
    done: IndexMap<String, Arc<ModelSchema>>,
    stack: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn model(&mut self, name: &str) -> Result<Arc<ModelSchema>, SchemaError> {
        if let Some(schema) = self.done.get(name) {
            return Ok(Arc::clone(schema));
        }

        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut cycle = self.stack[pos..].to_vec();
            cycle.push(name.to_owned());
            return Err(SchemaError::CyclicReference(cycle));
        }

        let definitions = self.definitions;
        let def = definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnknownModel(name.to_owned()))?;

        self.stack.push(name.to_owned());

        let mut builder = ModelSchema::builder(name);
        if let Some(parent) = &def.extends {
            builder = builder.extends(&self.model(parent)?);
        }
        if let Some(strict) = def.strict {
            builder = builder.strict(strict);
        }
        for (field_name, field) in &def.fields {
            builder = builder.field(self.field(name, field_name, field)?);
        }

        self.stack.pop();

        let schema = builder.build()?;
        tracing::debug!(model = name, fields = schema.fields().len(), "compiled model");

        self.done.insert(name.to_owned(), Arc::clone(&schema));
        Ok(schema)
    }

    fn field(
        &mut self,
        model: &str,
        name: &str,
        field: &SerdeField,
    ) -> Result<FieldDescriptor, SchemaError> {
        let context = format!("{model}.{name}");

        // Top-level constraints of a non-nullable field run after its after
        // hooks; nested ones run as part of coercion.
        let mut descriptor = if field.schema.nullable == Some(true) {
            FieldDescriptor::new(name, self.type_spec(&field.schema, &context)?)
        } else {
            let (spec, constraints) = self.parts(&field.schema, &context)?;
            constraints
                .into_iter()
                .fold(FieldDescriptor::new(name, spec), FieldDescriptor::constraint)
        };

        if let Some(alias) = &field.alias {
            descriptor = descriptor.alias(alias.as_str());
        }
        if field.optional == Some(true) {
            descriptor = descriptor.optional();
        }
        if let Some(default) = &field.default {
            descriptor = descriptor.default(default.clone());
        }
        for hook in field.before.iter().flatten() {
            descriptor = descriptor.before(self.hooks.before(hook)?);
        }
        for hook in field.after.iter().flatten() {
            descriptor = descriptor.after(self.hooks.after(hook)?);
        }
        if let Some(hook) = &field.serializer {
            descriptor = descriptor.serialize_with(self.hooks.serializer(hook)?);
        }

        Ok(descriptor)
    }

    fn type_spec(&mut self, schema: &SerdeType, context: &str) -> Result<TypeSpec, SchemaError> {
        let (spec, constraints) = self.parts(schema, context)?;
        let spec = constraints.into_iter().fold(spec, TypeSpec::with);

        Ok(if schema.nullable == Some(true) {
            spec.nullable()
        } else {
            spec
        })
    }

    /// The form of `schema` and its inline constraints, without `nullable`.
    fn parts(
        &mut self,
        schema: &SerdeType,
        context: &str,
    ) -> Result<(TypeSpec, Vec<Constraint>), SchemaError> {
        let forms = [
            schema.type_.is_some(),
            schema.enum_.is_some(),
            schema.ref_.is_some(),
            schema.any_of.is_some(),
            schema.elements.is_some(),
            schema.values.is_some(),
            schema.routed.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if forms > 1 {
            return Err(invalid(context, "more than one form keyword"));
        }

        let spec = if let Some(type_) = &schema.type_ {
            let kind = type_
                .parse::<ScalarKind>()
                .map_err(|()| SchemaError::UnknownScalarKind(type_.clone()))?;
            TypeSpec::Scalar(kind)
        } else if let Some(values) = &schema.enum_ {
            if values.is_empty() {
                return Err(invalid(context, "enum must not be empty"));
            }
            TypeSpec::literal(values.iter().cloned())
        } else if let Some(name) = &schema.ref_ {
            TypeSpec::model(&self.model(name)?)
        } else if let Some(alternatives) = &schema.any_of {
            if alternatives.is_empty() {
                return Err(invalid(context, "anyOf must not be empty"));
            }
            let alternatives = alternatives
                .iter()
                .map(|alternative| self.type_spec(alternative, context))
                .collect::<Result<Vec<_>, _>>()?;
            TypeSpec::union(alternatives)
        } else if let Some(elements) = &schema.elements {
            TypeSpec::list_of(self.type_spec(elements, context)?)
        } else if let Some(values) = &schema.values {
            TypeSpec::map_of(self.type_spec(values, context)?)
        } else if let Some(routed) = &schema.routed {
            self.routed(routed, context)?
        } else {
            TypeSpec::Any
        };

        let mut constraints = vec![];
        if let Some(min) = schema.min_length {
            constraints.push(Constraint::MinLength(min));
        }
        if let Some(max) = schema.max_length {
            constraints.push(Constraint::MaxLength(max));
        }
        if let Some(pattern) = &schema.pattern {
            constraints.push(Constraint::pattern(pattern)?);
        }
        if schema.positive == Some(true) {
            constraints.push(Constraint::Positive);
        }
        if schema.minimum.is_some() || schema.maximum.is_some() {
            constraints.push(Constraint::range(
                schema.minimum.unwrap_or(f64::NEG_INFINITY),
                schema.maximum.unwrap_or(f64::INFINITY),
            ));
        }
        if let Some(values) = &schema.one_of {
            constraints.push(Constraint::one_of(values.iter().cloned()));
        }
        if let Some(format) = &schema.format {
            let format = format
                .parse::<Format>()
                .map_err(|()| SchemaError::UnknownFormat(format.clone()))?;
            constraints.push(Constraint::Format(format));
        }

        Ok((spec, constraints))
    }

    fn routed(&mut self, routed: &SerdeRouted, context: &str) -> Result<TypeSpec, SchemaError> {
        if routed.prefixes.is_empty() {
            return Err(invalid(context, "routed needs at least one prefix"));
        }

        let mut registry = Registry::new();
        for id in routed.prefixes.values() {
            if registry.get(id).is_none() {
                registry.register(id.as_str(), &self.model(id)?);
            }
        }

        let router = Router::prefixes(
            routed
                .prefixes
                .iter()
                .map(|(p, id)| (p.as_str(), id.as_str())),
        );

        Ok(KeyRouted::new(router, registry)
            .mode(routed.mode.unwrap_or_default())
            .into())
    }
}

fn invalid(context: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidForm {
        context: context.to_owned(),
        reason: reason.to_owned(),
    }
}
