//! Named transform stages attached to fields.
//!
//! A field runs its [`BeforeHook`]s on the raw input before coercion and its
//! [`AfterHook`]s on the coerced value before constraint checks. A
//! [`SerializeHook`] replaces the default rendering of a field when the value
//! is serialized. A hook is a name plus a shared function, so schemas that
//! hold hooks stay cloneable and `Send + Sync`.

use crate::constraint::Format;
use crate::error::SchemaError;
use crate::serialize::{serialize, SerializeOptions};
use crate::value::Validated;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

type BeforeFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;
type AfterFn = dyn Fn(Validated) -> Result<Validated, String> + Send + Sync;
type SerializeFn = dyn Fn(&Validated, &SerializeOptions) -> Value + Send + Sync;

#[derive(Clone)]
pub struct BeforeHook {
    name: String,
    reshapes: bool,
    func: Arc<BeforeFn>,
}

impl BeforeHook {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reshapes: false,
            func: Arc::new(func),
        }
    }

    /// Marks the hook as changing the representation of its input, which
    /// exempts fields using it from the exact round-trip guarantee.
    pub fn reshaping(mut self) -> Self {
        self.reshapes = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reshapes(&self) -> bool {
        self.reshapes
    }

    pub fn apply(&self, value: Value) -> Result<Value, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for BeforeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeHook")
            .field("name", &self.name)
            .field("reshapes", &self.reshapes)
            .finish()
    }
}

#[derive(Clone)]
pub struct AfterHook {
    name: String,
    func: Arc<AfterFn>,
}

impl AfterHook {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Validated) -> Result<Validated, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: Validated) -> Result<Validated, String> {
        (self.func)(value)
    }
}

impl fmt::Debug for AfterHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterHook").field("name", &self.name).finish()
    }
}

#[derive(Clone)]
pub struct SerializeHook {
    name: String,
    func: Arc<SerializeFn>,
}

impl SerializeHook {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Validated, &SerializeOptions) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders `value`. The options are those of the enclosing call, so a
    /// hook that falls back to [`serialize`] keeps the caller's settings.
    pub fn apply(&self, value: &Validated, options: &SerializeOptions) -> Value {
        (self.func)(value, options)
    }
}

impl fmt::Debug for SerializeHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeHook").field("name", &self.name).finish()
    }
}

/// Wraps a scalar into a one-element list; lists pass through.
pub fn singleton_to_list() -> BeforeHook {
    BeforeHook::new("singleton_to_list", |value| match value {
        Value::Array(_) => Ok(value),
        Value::Object(_) => Err("expected a scalar or a list, got an object".to_owned()),
        scalar => Ok(Value::Array(vec![scalar])),
    })
    .reshaping()
}

/// Rejects strings that are not EUI-48 MAC addresses.
pub fn mac_address() -> AfterHook {
    AfterHook::new("mac_address", |value| match value.as_str() {
        Some(s) if Format::MacAddress.matches(s) => Ok(value),
        Some(s) => Err(format!("invalid MAC address: {s}")),
        None => Err(format!("expected a MAC address string, got {}", value.kind_name())),
    })
}

/// Renders integers as decimal strings.
pub fn int_as_string() -> SerializeHook {
    SerializeHook::new("int_as_string", |value, options| match value {
        Validated::Int(n) => Value::String(n.to_string()),
        Validated::UInt(n) => Value::String(n.to_string()),
        other => serialize(other, options),
    })
}

/// Hooks addressable by name, used when compiling schema documents.
#[derive(Clone, Debug, Default)]
pub struct Hooks {
    before: BTreeMap<String, BeforeHook>,
    after: BTreeMap<String, AfterHook>,
    serializers: BTreeMap<String, SerializeHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `singleton_to_list`, `mac_address` and
    /// `int_as_string`.
    pub fn with_builtins() -> Self {
        let mut hooks = Self::new();
        hooks
            .register_before(singleton_to_list())
            .register_after(mac_address())
            .register_serializer(int_as_string());
        hooks
    }

    pub fn register_before(&mut self, hook: BeforeHook) -> &mut Self {
        self.before.insert(hook.name.clone(), hook);
        self
    }

    pub fn register_after(&mut self, hook: AfterHook) -> &mut Self {
        self.after.insert(hook.name.clone(), hook);
        self
    }

    pub fn register_serializer(&mut self, hook: SerializeHook) -> &mut Self {
        self.serializers.insert(hook.name.clone(), hook);
        self
    }

    pub fn before(&self, name: &str) -> Result<BeforeHook, SchemaError> {
        self.before.get(name).cloned().ok_or_else(|| SchemaError::UnknownHook {
            kind: "before",
            name: name.to_owned(),
        })
    }

    pub fn after(&self, name: &str) -> Result<AfterHook, SchemaError> {
        self.after.get(name).cloned().ok_or_else(|| SchemaError::UnknownHook {
            kind: "after",
            name: name.to_owned(),
        })
    }

    pub fn serializer(&self, name: &str) -> Result<SerializeHook, SchemaError> {
        self.serializers
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownHook {
                kind: "serializer",
                name: name.to_owned(),
            })
    }
}
