use crate::constraint::Constraint;
use crate::error::SchemaError;
use crate::hook::{AfterHook, BeforeHook, SerializeHook};
use crate::types::TypeSpec;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// One field of a model: where it is read from, what it is coerced into and
/// which checks it has to pass.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    alias: Option<String>,
    spec: TypeSpec,
    constraints: Vec<Constraint>,
    optional: bool,
    default: Option<Value>,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    serializer: Option<SerializeHook>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, spec: impl Into<TypeSpec>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            spec: spec.into(),
            constraints: vec![],
            optional: false,
            default: None,
            before: vec![],
            after: vec![],
            serializer: None,
        }
    }

    /// The key used for this field in external documents.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// The field may be absent or `null`; an absent field validates to `null`
    /// unless a default is set.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is absent. Defaults are not validated.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn before(mut self, hook: BeforeHook) -> Self {
        self.before.push(hook);
        self
    }

    pub fn after(mut self, hook: AfterHook) -> Self {
        self.after.push(hook);
        self
    }

    pub fn serialize_with(mut self, hook: SerializeHook) -> Self {
        self.serializer = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn spec(&self) -> &TypeSpec {
        &self.spec
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    pub fn before_hooks(&self) -> &[BeforeHook] {
        &self.before
    }

    pub fn after_hooks(&self) -> &[AfterHook] {
        &self.after
    }

    pub fn serializer(&self) -> Option<&SerializeHook> {
        self.serializer.as_ref()
    }

    /// False when a before hook changes the representation of the input, in
    /// which case serializing the validated value will not reproduce it.
    pub fn preserves_round_trip(&self) -> bool {
        !self.before.iter().any(BeforeHook::reshapes)
    }
}

/// An ordered set of fields forming one validated entity.
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
    strict: bool,
}

impl ModelSchema {
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            parent: None,
            fields: vec![],
            strict: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields after composition, parent fields first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Internal names of the fields exempt from the exact round-trip
    /// guarantee.
    pub fn round_trip_exemptions(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !f.preserves_round_trip())
            .map(FieldDescriptor::name)
            .collect()
    }
}

pub struct ModelSchemaBuilder {
    name: String,
    parent: Option<Arc<ModelSchema>>,
    fields: Vec<FieldDescriptor>,
    strict: Option<bool>,
}

impl ModelSchemaBuilder {
    /// Starts from the fields of `parent`. A field declared here with the
    /// same internal name replaces the parent's field in place.
    pub fn extends(mut self, parent: &Arc<ModelSchema>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Reject undeclared input keys. Inherited from the parent when unset.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn build(self) -> Result<Arc<ModelSchema>, SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: self.name,
                    field: field.name.clone(),
                });
            }
        }

        let mut fields = match &self.parent {
            Some(parent) => parent.fields.clone(),
            None => vec![],
        };
        for field in self.fields {
            match fields.iter().position(|f| f.name == field.name) {
                Some(i) => fields[i] = field,
                None => fields.push(field),
            }
        }

        let mut aliases = HashSet::new();
        for field in &fields {
            if !aliases.insert(field.external_name()) {
                return Err(SchemaError::DuplicateAlias {
                    model: self.name,
                    alias: field.external_name().to_owned(),
                });
            }
        }

        let strict = self
            .strict
            .unwrap_or_else(|| self.parent.as_ref().map_or(false, |p| p.strict));

        Ok(Arc::new(ModelSchema {
            name: self.name,
            fields,
            strict,
        }))
    }
}
