use crate::value::{Instance, Validated};
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value};

#[derive(Clone, Copy, Debug, Default)]
pub struct SerializeOptions {
    use_alias: bool,
    exclude_null: bool,
    indent: Option<usize>,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit model fields under their external name.
    pub fn with_alias(mut self, use_alias: bool) -> Self {
        self.use_alias = use_alias;
        self
    }

    /// Omit model fields whose value is null. Nulls inside lists and
    /// mappings are kept.
    pub fn with_exclude_null(mut self, exclude_null: bool) -> Self {
        self.exclude_null = exclude_null;
        self
    }

    /// Indentation width used by [`to_json_string`].
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn use_alias(&self) -> bool {
        self.use_alias
    }

    pub fn exclude_null(&self) -> bool {
        self.exclude_null
    }

    pub fn indent(&self) -> Option<usize> {
        self.indent
    }
}

/// Renders a validated tree back into the external representation.
///
/// Each model is rendered with the schema recorded in its [`Instance`], so
/// values chosen by a union or a key-routed mapping keep the shape of the
/// schema that accepted them. Non-finite floats render as null.
pub fn serialize(value: &Validated, options: &SerializeOptions) -> Value {
    match value {
        Validated::Null => Value::Null,
        Validated::Bool(b) => Value::Bool(*b),
        Validated::Int(n) => Value::from(*n),
        Validated::UInt(n) => Value::from(*n),
        Validated::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Validated::String(s) => Value::String(s.clone()),
        Validated::List(items) => {
            Value::Array(items.iter().map(|v| serialize(v, options)).collect())
        }
        Validated::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), serialize(v, options)))
                .collect(),
        ),
        Validated::Model(instance) => serialize_model(instance, options),
    }
}

/// Renders one model instance, applying field serializer hooks.
pub fn serialize_model(instance: &Instance, options: &SerializeOptions) -> Value {
    let mut out = Map::new();

    for field in instance.schema().fields() {
        let value = match instance.get(field.name()) {
            Some(value) => value,
            None => continue,
        };

        if options.exclude_null && value.is_null() {
            continue;
        }

        let key = if options.use_alias {
            field.external_name()
        } else {
            field.name()
        };

        let rendered = match field.serializer() {
            Some(hook) => hook.apply(value, options),
            None => serialize(value, options),
        };

        out.insert(key.to_owned(), rendered);
    }

    Value::Object(out)
}

/// Serializes to JSON text, pretty-printed when an indent is set.
pub fn to_json_string(value: &Validated, options: &SerializeOptions) -> serde_json::Result<String> {
    let json = serialize(value, options);

    let width = match options.indent {
        Some(width) => width,
        None => return serde_json::to_string(&json),
    };

    let indent = vec![b' '; width];
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
    json.serialize(&mut ser)?;

    String::from_utf8(buf).map_err(serde_json::Error::custom)
}
