use crate::constraint::Constraint;
use crate::error::{ErrorKind, FieldError, PathSegment, ValidationReport};
use crate::model::{FieldDescriptor, ModelSchema};
use crate::router::{DispatchMode, KeyRouted};
use crate::types::{ScalarKind, TypeSpec};
use crate::value::{json_kind, Instance, Validated};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
pub struct ValidateOptions {
    strict: bool,
    max_errors: usize,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject undeclared keys in every model, not only in strict models.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Caps the number of errors kept in the report. Zero keeps all of them.
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }
}

/// The outcome of validating one document.
#[derive(Clone, Debug)]
pub struct Validation {
    /// Present exactly when `report` is empty.
    pub value: Option<Validated>,
    pub report: ValidationReport,
    /// Errors of entries dropped by key-routed mappings in
    /// [`DispatchMode::Partial`]. These do not fail validation.
    pub dropped: ValidationReport,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_result(self) -> Result<Validated, ValidationReport> {
        match self.value {
            Some(value) => Ok(value),
            None => Err(self.report),
        }
    }
}

pub fn validate(spec: &TypeSpec, instance: &Value, options: ValidateOptions) -> Validation {
    let mut vm = Vm {
        options,
        path: vec![],
        errors: vec![],
        dropped: vec![],
    };

    let value = vm.coerce(spec, instance);
    let Vm {
        mut errors,
        dropped,
        ..
    } = vm;

    if options.max_errors > 0 {
        errors.truncate(options.max_errors);
    }

    Validation {
        value: value.filter(|_| errors.is_empty()),
        report: errors.into(),
        dropped: dropped.into(),
    }
}

pub fn validate_model(
    schema: &Arc<ModelSchema>,
    instance: &Value,
    options: ValidateOptions,
) -> Validation {
    validate(&TypeSpec::model(schema), instance, options)
}

/// Coerces `instance` into `spec` with default options.
///
/// Errors of entries dropped by partial key-routed mappings are discarded;
/// use [`validate`] to see them.
pub fn coerce(instance: &Value, spec: &TypeSpec) -> Result<Validated, ValidationReport> {
    validate(spec, instance, ValidateOptions::new()).into_result()
}

/// Walks a value and a type together.
///
/// Every `coerce_*` method returns `Some` exactly when it pushed no error,
/// which is what lets unions roll back a failed alternative by truncating
/// `errors` and `dropped`.
struct Vm {
    options: ValidateOptions,
    path: Vec<PathSegment>,
    errors: Vec<FieldError>,
    dropped: Vec<FieldError>,
}

impl Vm {
    fn coerce(&mut self, spec: &TypeSpec, instance: &Value) -> Option<Validated> {
        match spec {
            TypeSpec::Any => Some(Validated::from(instance.clone())),
            TypeSpec::Scalar(kind) => match coerce_scalar(*kind, instance) {
                Ok(value) => Some(value),
                Err(message) => {
                    self.push_error(ErrorKind::TypeError, message);
                    None
                }
            },
            TypeSpec::Literal(allowed) => self.coerce_literal(allowed, instance),
            TypeSpec::Model(schema) => self.coerce_model(schema, instance),
            TypeSpec::Union(alternatives) => self.coerce_union(alternatives, instance),
            TypeSpec::Collection(element) => self.coerce_collection(element, instance),
            TypeSpec::Mapping(values) => self.coerce_mapping(values, instance),
            TypeSpec::Routed(routed) => self.coerce_routed(routed, instance),
            TypeSpec::Constrained(inner, constraints) => {
                let value = self.coerce(inner, instance)?;
                self.check_constraints(constraints, value)
            }
        }
    }

    fn coerce_literal(&mut self, allowed: &[Value], instance: &Value) -> Option<Validated> {
        for literal in allowed {
            match literal_kind(literal) {
                Some(kind) => {
                    if let Ok(value) = coerce_scalar(kind, instance) {
                        if value == Validated::from(literal.clone()) {
                            return Some(value);
                        }
                    }
                }
                None => {
                    if literal == instance {
                        return Some(Validated::from(instance.clone()));
                    }
                }
            }
        }

        let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
        self.push_error(
            ErrorKind::TypeError,
            format!("input should be {}", listed.join(" or ")),
        );
        None
    }

    fn coerce_model(&mut self, schema: &Arc<ModelSchema>, instance: &Value) -> Option<Validated> {
        tracing::trace!(model = schema.name(), "validating model");

        let obj = self.expect_object(instance)?;
        let mark = self.errors.len();

        let mut fields = IndexMap::with_capacity(schema.fields().len());
        for field in schema.fields() {
            self.push_token(field.external_name());
            if let Some(value) = self.validate_field(field, obj.get(field.external_name())) {
                fields.insert(field.name().to_owned(), value);
            }
            self.pop_token();
        }

        if schema.is_strict() || self.options.strict {
            for key in obj.keys() {
                if schema.fields().iter().all(|f| f.external_name() != key) {
                    self.push_token(key.as_str());
                    self.push_error(ErrorKind::ExtraForbidden, "extra inputs are not permitted");
                    self.pop_token();
                }
            }
        }

        if self.errors.len() > mark {
            None
        } else {
            Some(Validated::Model(Instance::new(Arc::clone(schema), fields)))
        }
    }

    /// Start → before hooks → coercion → after hooks → constraints, stopping
    /// at the first failing stage.
    fn validate_field(
        &mut self,
        field: &FieldDescriptor,
        raw: Option<&Value>,
    ) -> Option<Validated> {
        let raw = match raw {
            None => {
                if let Some(default) = field.default_value() {
                    return Some(Validated::from(default.clone()));
                }
                if field.is_optional() {
                    return Some(Validated::Null);
                }
                self.push_error(ErrorKind::MissingRequired, "field required");
                return None;
            }
            Some(Value::Null) if field.is_optional() => return Some(Validated::Null),
            Some(raw) => raw,
        };

        let mut value = raw.clone();
        for hook in field.before_hooks() {
            value = match hook.apply(value) {
                Ok(value) => value,
                Err(message) => {
                    self.push_error(ErrorKind::CustomError, message);
                    return None;
                }
            };
        }

        let mut validated = self.coerce(field.spec(), &value)?;

        for hook in field.after_hooks() {
            validated = match hook.apply(validated) {
                Ok(value) => value,
                Err(message) => {
                    self.push_error(ErrorKind::CustomError, message);
                    return None;
                }
            };
        }

        self.check_constraints(field.constraints(), validated)
    }

    fn check_constraints(
        &mut self,
        constraints: &[Constraint],
        value: Validated,
    ) -> Option<Validated> {
        for constraint in constraints {
            if let Err(message) = constraint.check(&value) {
                self.push_error(ErrorKind::ConstraintViolation, message);
                return None;
            }
        }

        Some(value)
    }

    fn coerce_union(&mut self, alternatives: &[TypeSpec], instance: &Value) -> Option<Validated> {
        let mut causes = vec![];

        for (i, alternative) in alternatives.iter().enumerate() {
            let errors_mark = self.errors.len();
            let dropped_mark = self.dropped.len();

            if let Some(value) = self.coerce(alternative, instance) {
                return Some(value);
            }

            causes.extend(self.errors.drain(errors_mark..));
            self.dropped.truncate(dropped_mark);
            tracing::debug!(alternative = i, path = ?self.path, "union alternative rejected");
        }

        let mut error = FieldError::new(
            self.path.clone(),
            ErrorKind::UnionNoMatch,
            format!(
                "input does not match any of the {} alternatives",
                alternatives.len()
            ),
        );
        error.causes = causes;
        self.errors.push(error);
        None
    }

    fn coerce_collection(&mut self, element: &TypeSpec, instance: &Value) -> Option<Validated> {
        let items = match instance.as_array() {
            Some(items) => items,
            None => {
                self.push_error(ErrorKind::TypeError, expected("a valid list", instance));
                return None;
            }
        };

        let mark = self.errors.len();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.push_token(i);
            if let Some(value) = self.coerce(element, item) {
                out.push(value);
            }
            self.pop_token();
        }

        if self.errors.len() > mark {
            None
        } else {
            Some(Validated::List(out))
        }
    }

    fn coerce_mapping(&mut self, values: &TypeSpec, instance: &Value) -> Option<Validated> {
        let obj = self.expect_object(instance)?;

        let mark = self.errors.len();
        let mut out = IndexMap::with_capacity(obj.len());
        for (key, raw) in obj {
            self.push_token(key.as_str());
            if let Some(value) = self.coerce(values, raw) {
                out.insert(key.clone(), value);
            }
            self.pop_token();
        }

        if self.errors.len() > mark {
            None
        } else {
            Some(Validated::Map(out))
        }
    }

    fn coerce_routed(&mut self, routed: &KeyRouted, instance: &Value) -> Option<Validated> {
        let obj = self.expect_object(instance)?;

        let mark = self.errors.len();
        let mut out = IndexMap::with_capacity(obj.len());
        for (key, raw) in obj {
            self.push_token(key.as_str());
            let entry_mark = self.errors.len();

            let entry = match routed.resolve(key) {
                Ok(schema) => self.coerce_model(schema, raw),
                Err(message) => {
                    self.push_error(ErrorKind::CustomError, message);
                    None
                }
            };

            match entry {
                Some(value) => {
                    out.insert(key.clone(), value);
                }
                None if routed.dispatch_mode() == DispatchMode::Partial => {
                    let failed: Vec<FieldError> = self.errors.drain(entry_mark..).collect();
                    for error in &failed {
                        tracing::warn!(key = key.as_str(), %error, "dropping invalid entry");
                    }
                    self.dropped.extend(failed);
                }
                None => {}
            }

            self.pop_token();
        }

        if self.errors.len() > mark {
            None
        } else {
            Some(Validated::Map(out))
        }
    }

    fn expect_object<'v>(&mut self, instance: &'v Value) -> Option<&'v Map<String, Value>> {
        let obj = instance.as_object();
        if obj.is_none() {
            self.push_error(ErrorKind::TypeError, expected("an object", instance));
        }
        obj
    }

    fn push_error(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(FieldError::new(self.path.clone(), kind, message));
    }

    fn push_token(&mut self, token: impl Into<PathSegment>) {
        self.path.push(token.into());
    }

    fn pop_token(&mut self) {
        self.path.pop();
    }
}

fn coerce_scalar(kind: ScalarKind, instance: &Value) -> Result<Validated, String> {
    match kind {
        ScalarKind::Boolean => match instance {
            Value::Bool(b) => Ok(Validated::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Validated::Bool(true)),
            Value::String(s) if s == "false" => Ok(Validated::Bool(false)),
            _ => Err(expected("a valid boolean", instance)),
        },
        ScalarKind::Float => {
            let parsed = match instance {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok().filter(|f| f.is_finite()),
                _ => None,
            };
            parsed
                .map(Validated::Float)
                .ok_or_else(|| expected("a valid number", instance))
        }
        ScalarKind::String => match instance {
            Value::String(s) => Ok(Validated::String(s.clone())),
            _ => Err(expected("a valid string", instance)),
        },
        ScalarKind::Null => match instance {
            Value::Null => Ok(Validated::Null),
            _ => Err(expected("null", instance)),
        },
        ScalarKind::Integer
        | ScalarKind::Int8
        | ScalarKind::Uint8
        | ScalarKind::Int16
        | ScalarKind::Uint16
        | ScalarKind::Int32
        | ScalarKind::Uint32 => {
            let n = integer_of(instance).ok_or_else(|| expected("a valid integer", instance))?;
            match kind.int_bounds() {
                Some((min, max)) if n < min || n > max => Err(format!(
                    "input should be a valid {} between {min} and {max}",
                    kind.as_str()
                )),
                _ => Ok(Validated::Int(n)),
            }
        }
    }
}

/// Integers, integral floats and decimal strings that fit an `i64`.
fn integer_of(instance: &Value) -> Option<i64> {
    match instance {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|_| n.is_f64())
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

fn literal_kind(literal: &Value) -> Option<ScalarKind> {
    match literal {
        Value::Null => Some(ScalarKind::Null),
        Value::Bool(_) => Some(ScalarKind::Boolean),
        Value::Number(n) if n.is_i64() => Some(ScalarKind::Integer),
        // Above `i64::MAX`: matched exactly, never coerced.
        Value::Number(n) if n.is_u64() => None,
        Value::Number(_) => Some(ScalarKind::Float),
        Value::String(_) => Some(ScalarKind::String),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn expected(what: &str, instance: &Value) -> String {
    format!("input should be {what}, got {}", json_kind(instance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Format;
    use crate::hook::{self, AfterHook, BeforeHook};
    use crate::router::{Registry, Router};
    use serde_json::json;

    fn kinds(report: &ValidationReport) -> Vec<(String, ErrorKind)> {
        report
            .iter()
            .map(|e| (e.path_string(), e.kind))
            .collect()
    }

    fn user() -> Arc<ModelSchema> {
        ModelSchema::builder("User")
            .field(FieldDescriptor::new("id", TypeSpec::integer()).constraint(Constraint::Positive))
            .field(
                FieldDescriptor::new("name", TypeSpec::string())
                    .constraint(Constraint::MinLength(1)),
            )
            .field(
                FieldDescriptor::new("email", TypeSpec::string())
                    .constraint(Constraint::Format(Format::Email)),
            )
            .build()
            .unwrap()
    }

    fn device(name: &str, extra: FieldDescriptor) -> Arc<ModelSchema> {
        ModelSchema::builder(name)
            .field(
                FieldDescriptor::new("hostname", TypeSpec::string())
                    .constraint(Constraint::MinLength(1)),
            )
            .field(FieldDescriptor::new("role", TypeSpec::list_of(TypeSpec::string())))
            .field(
                FieldDescriptor::new("addr", TypeSpec::string())
                    .constraint(Constraint::Format(Format::Ipv4Interface)),
            )
            .field(extra)
            .build()
            .unwrap()
    }

    #[test]
    fn scalar_coercion() {
        let cases = vec![
            (TypeSpec::integer(), json!(15), Some(Validated::Int(15))),
            (TypeSpec::integer(), json!("15"), Some(Validated::Int(15))),
            (TypeSpec::integer(), json!(3.0), Some(Validated::Int(3))),
            (TypeSpec::integer(), json!(1.5), None),
            (TypeSpec::integer(), json!("1.5"), None),
            (TypeSpec::integer(), json!(u64::MAX), None),
            (TypeSpec::integer(), json!(true), None),
            (ScalarKind::Uint8.into(), json!(255), Some(Validated::Int(255))),
            (ScalarKind::Uint8.into(), json!(256), None),
            (ScalarKind::Int8.into(), json!("-128"), Some(Validated::Int(-128))),
            (TypeSpec::float(), json!(1.5), Some(Validated::Float(1.5))),
            (TypeSpec::float(), json!(2), Some(Validated::Float(2.0))),
            (TypeSpec::float(), json!("2.5"), Some(Validated::Float(2.5))),
            (TypeSpec::float(), json!("NaN"), None),
            (TypeSpec::boolean(), json!(false), Some(Validated::Bool(false))),
            (TypeSpec::boolean(), json!("true"), Some(Validated::Bool(true))),
            (TypeSpec::boolean(), json!(1), None),
            (TypeSpec::string(), json!("x"), Some(Validated::String("x".to_owned()))),
            (TypeSpec::string(), json!(15), None),
            (TypeSpec::null(), json!(null), Some(Validated::Null)),
            (TypeSpec::null(), json!(""), None),
        ];

        for (spec, input, expected) in cases {
            let validation = validate(&spec, &input, ValidateOptions::new());
            assert_eq!(expected, validation.value, "{spec:?} with {input}");
            if expected.is_none() {
                assert_eq!(ErrorKind::TypeError, validation.report.errors()[0].kind);
            }
        }
    }

    #[test]
    fn type_error_message() {
        let report = coerce(&json!([1]), &TypeSpec::string()).unwrap_err();
        assert_eq!("input should be a valid string, got array", report.errors()[0].message);

        let report = coerce(&json!(300), &ScalarKind::Uint8.into()).unwrap_err();
        assert_eq!(
            "input should be a valid uint8 between 0 and 255",
            report.errors()[0].message
        );
    }

    #[test]
    fn literal() {
        let spec = TypeSpec::literal(vec![json!("EX4000"), json!("EX4400")]);
        assert_eq!(
            Ok(Validated::String("EX4400".to_owned())),
            coerce(&json!("EX4400"), &spec)
        );

        let report = coerce(&json!("EX9000"), &spec).unwrap_err();
        assert_eq!(ErrorKind::TypeError, report.errors()[0].kind);
        assert_eq!(
            r#"input should be "EX4000" or "EX4400""#,
            report.errors()[0].message
        );
    }

    #[test]
    fn literal_compares_after_coercion() {
        let spec = TypeSpec::literal(vec![json!(15), json!("")]);
        assert_eq!(Ok(Validated::Int(15)), coerce(&json!("15"), &spec));
        assert_eq!(Ok(Validated::String(String::new())), coerce(&json!(""), &spec));
        assert!(coerce(&json!(16), &spec).is_err());
    }

    #[test]
    fn literal_above_i64_matches_exactly() {
        let spec = TypeSpec::literal(vec![json!(u64::MAX)]);
        assert_eq!(Ok(Validated::UInt(u64::MAX)), coerce(&json!(u64::MAX), &spec));
        assert!(coerce(&json!(u64::MAX - 1), &spec).is_err());
        assert!(coerce(&json!(18446744073709551615.0), &spec).is_err());
    }

    #[test]
    fn model_success_keeps_declaration_order() {
        let value = coerce(
            &json!({"email": "some@email.com", "name": "John Doe", "id": "15"}),
            &TypeSpec::model(&user()),
        )
        .unwrap();

        let instance = value.as_model().unwrap();
        assert_eq!("User", instance.schema().name());
        assert_eq!(
            vec!["id", "name", "email"],
            instance.fields().map(|(k, _)| k).collect::<Vec<_>>()
        );
        assert_eq!(Some(15), value.get("id").and_then(Validated::as_i64));
    }

    #[test]
    fn model_rejects_non_objects() {
        let report = coerce(&json!([]), &TypeSpec::model(&user())).unwrap_err();
        assert_eq!(vec![(String::new(), ErrorKind::TypeError)], kinds(&report));
    }

    #[test]
    fn model_errors_are_aggregated_in_declaration_order() {
        let validation = validate_model(
            &user(),
            &json!({"email": "some@email@com", "name": ""}),
            ValidateOptions::new(),
        );

        assert!(validation.value.is_none());
        assert_eq!(
            vec![
                ("id".to_owned(), ErrorKind::MissingRequired),
                ("name".to_owned(), ErrorKind::ConstraintViolation),
                ("email".to_owned(), ErrorKind::ConstraintViolation),
            ],
            kinds(&validation.report)
        );
    }

    #[test]
    fn missing_required_reported_once() {
        let validation = validate_model(
            &user(),
            &json!({"id": 1, "email": "some@email.com"}),
            ValidateOptions::new(),
        );

        assert_eq!(
            vec![("name".to_owned(), ErrorKind::MissingRequired)],
            kinds(&validation.report)
        );
        assert_eq!("field required", validation.report.errors()[0].message);
    }

    #[test]
    fn optional_and_default_fields() {
        let schema = ModelSchema::builder("Device")
            .field(FieldDescriptor::new("rack", TypeSpec::string()).optional())
            .field(FieldDescriptor::new("vlan", TypeSpec::integer()).default(json!(1)))
            .build()
            .unwrap();

        let value = coerce(&json!({}), &TypeSpec::model(&schema)).unwrap();
        assert_eq!(Some(&Validated::Null), value.get("rack"));
        assert_eq!(Some(&Validated::Int(1)), value.get("vlan"));

        let value = coerce(&json!({"rack": null, "vlan": "7"}), &TypeSpec::model(&schema)).unwrap();
        assert_eq!(Some(&Validated::Null), value.get("rack"));
        assert_eq!(Some(&Validated::Int(7)), value.get("vlan"));

        let report = coerce(&json!({"vlan": null}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(vec![("vlan".to_owned(), ErrorKind::TypeError)], kinds(&report));
    }

    #[test]
    fn alias_is_read_and_reported() {
        let schema = ModelSchema::builder("Console")
            .field(FieldDescriptor::new("instance_id", TypeSpec::integer()).alias("instance-id"))
            .build()
            .unwrap();

        let value = coerce(&json!({"instance-id": "456"}), &TypeSpec::model(&schema)).unwrap();
        assert_eq!(Some(&Validated::Int(456)), value.get("instance_id"));

        let report = coerce(&json!({"instance_id": 456}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(
            vec![("instance-id".to_owned(), ErrorKind::MissingRequired)],
            kinds(&report)
        );
    }

    #[test]
    fn extra_keys_ignored_unless_strict() {
        let input = json!({"id": 1, "name": "n", "email": "a@b.co", "extra": true});
        assert!(validate_model(&user(), &input, ValidateOptions::new()).is_valid());

        let validation = validate_model(&user(), &input, ValidateOptions::new().with_strict(true));
        assert_eq!(
            vec![("extra".to_owned(), ErrorKind::ExtraForbidden)],
            kinds(&validation.report)
        );

        let strict = ModelSchema::builder("StrictUser")
            .extends(&user())
            .strict(true)
            .build()
            .unwrap();
        assert!(!validate_model(&strict, &input, ValidateOptions::new()).is_valid());
    }

    #[test]
    fn pipeline_stages_run_in_order() {
        let upper = BeforeHook::new("upper", |value| match value {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            other => Err(format!("cannot uppercase {other}")),
        });
        let suffix = AfterHook::new("suffix", |value| match value {
            Validated::String(s) => Ok(Validated::String(format!("{s}-X"))),
            other => Ok(other),
        });
        let schema = ModelSchema::builder("M")
            .field(
                FieldDescriptor::new("code", TypeSpec::string())
                    .before(upper)
                    .after(suffix)
                    .constraint(Constraint::pattern("^[A-Z]+-X$").unwrap()),
            )
            .build()
            .unwrap();

        let value = coerce(&json!({"code": "abc"}), &TypeSpec::model(&schema)).unwrap();
        assert_eq!(Some("ABC-X"), value.get("code").and_then(Validated::as_str));

        let report = coerce(&json!({"code": 5}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(vec![("code".to_owned(), ErrorKind::CustomError)], kinds(&report));
        assert_eq!("cannot uppercase 5", report.errors()[0].message);

        let report = coerce(&json!({"code": "a1"}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(
            vec![("code".to_owned(), ErrorKind::ConstraintViolation)],
            kinds(&report)
        );
    }

    #[test]
    fn constraints_fail_fast_per_field() {
        let schema = ModelSchema::builder("M")
            .field(
                FieldDescriptor::new("n", TypeSpec::integer())
                    .constraint(Constraint::Positive)
                    .constraint(Constraint::range(10.0, 20.0)),
            )
            .field(FieldDescriptor::new("m", TypeSpec::integer()).constraint(Constraint::Positive))
            .build()
            .unwrap();

        let report = coerce(&json!({"n": -1, "m": 0}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(
            vec![
                ("n".to_owned(), ErrorKind::ConstraintViolation),
                ("m".to_owned(), ErrorKind::ConstraintViolation),
            ],
            kinds(&report)
        );
        assert_eq!("input should be greater than 0", report.errors()[0].message);
    }

    #[test]
    fn after_hook_rejects_bad_mac() {
        let schema = ModelSchema::builder("Nic")
            .field(FieldDescriptor::new("mac", TypeSpec::string()).after(hook::mac_address()))
            .build()
            .unwrap();

        let report = coerce(&json!({"mac": "00:1A:2B"}), &TypeSpec::model(&schema)).unwrap_err();
        assert_eq!(vec![("mac".to_owned(), ErrorKind::CustomError)], kinds(&report));
    }

    #[test]
    fn collection_errors_are_index_tagged() {
        let spec = TypeSpec::list_of(TypeSpec::literal(vec![json!("core"), json!("access")]));
        let report = coerce(&json!(["core", "edge", "access", 4]), &spec).unwrap_err();

        assert_eq!(
            vec![("1".to_owned(), ErrorKind::TypeError), ("3".to_owned(), ErrorKind::TypeError)],
            kinds(&report)
        );
        assert_eq!(vec![PathSegment::Index(1)], report.errors()[0].path);
    }

    #[test]
    fn collection_requires_a_list() {
        let report = coerce(&json!("access"), &TypeSpec::list_of(TypeSpec::string())).unwrap_err();
        assert_eq!(vec![(String::new(), ErrorKind::TypeError)], kinds(&report));
    }

    #[test]
    fn mapping_errors_are_key_tagged() {
        let spec = TypeSpec::map_of(TypeSpec::integer());
        assert_eq!(
            Ok(Validated::Map(
                vec![("a".to_owned(), Validated::Int(1)), ("b".to_owned(), Validated::Int(2))]
                    .into_iter()
                    .collect()
            )),
            coerce(&json!({"a": 1, "b": "2"}), &spec)
        );

        let report = coerce(&json!({"a": 1, "b": "x", "c": []}), &spec).unwrap_err();
        assert_eq!(
            vec![("b".to_owned(), ErrorKind::TypeError), ("c".to_owned(), ErrorKind::TypeError)],
            kinds(&report)
        );
    }

    #[test]
    fn union_first_declared_alternative_wins() {
        // Deliberate: ambiguous input resolves to the first alternative in
        // declaration order, not the best match.
        let spec = TypeSpec::union(vec![TypeSpec::string(), TypeSpec::integer()]);
        assert_eq!(Ok(Validated::String("15".to_owned())), coerce(&json!("15"), &spec));

        let spec = TypeSpec::union(vec![TypeSpec::integer(), TypeSpec::string()]);
        assert_eq!(Ok(Validated::Int(15)), coerce(&json!("15"), &spec));
    }

    #[test]
    fn union_of_string_or_list() {
        let spec = TypeSpec::union(vec![TypeSpec::string(), TypeSpec::list_of(TypeSpec::string())]);
        assert_eq!(Ok(Validated::String("access".to_owned())), coerce(&json!("access"), &spec));
        assert_eq!(
            Ok(Validated::List(vec![Validated::String("core".to_owned())])),
            coerce(&json!(["core"]), &spec)
        );
    }

    #[test]
    fn union_no_match_carries_every_alternative() {
        let iface = TypeSpec::string().with(Constraint::Format(Format::Ipv4Interface));
        let spec = TypeSpec::union(vec![
            iface.clone(),
            TypeSpec::list_of(iface),
            TypeSpec::literal(vec![json!("")]),
        ]);

        assert!(coerce(&json!("192.168.1.1/24"), &spec).is_ok());
        assert!(coerce(&json!(["192.168.1.1/24"]), &spec).is_ok());
        assert!(coerce(&json!(""), &spec).is_ok());

        let report = coerce(&json!("192.168.1.1"), &spec).unwrap_err();
        assert_eq!(vec![(String::new(), ErrorKind::UnionNoMatch)], kinds(&report));

        let causes: Vec<ErrorKind> = report.errors()[0].causes.iter().map(|e| e.kind).collect();
        assert_eq!(
            vec![
                ErrorKind::ConstraintViolation,
                ErrorKind::TypeError,
                ErrorKind::TypeError
            ],
            causes
        );
    }

    #[test]
    fn union_of_models_nested_paths() {
        let rtr = device("Rtr", FieldDescriptor::new("monitor", TypeSpec::boolean()));
        let switch = device("Switch", FieldDescriptor::new("id", TypeSpec::integer()));
        let spec = TypeSpec::map_of(TypeSpec::union(vec![
            TypeSpec::model(&rtr),
            TypeSpec::model(&switch),
        ]));

        let value = coerce(
            &json!({
                "r": {"hostname": "R", "role": ["core"], "addr": "10.0.0.1/8", "monitor": true},
                "s": {"hostname": "S", "role": ["access"], "addr": "10.0.0.2/8", "id": 5},
            }),
            &spec,
        )
        .unwrap();

        assert_eq!("Rtr", value.get("r").unwrap().as_model().unwrap().schema().name());
        assert_eq!("Switch", value.get("s").unwrap().as_model().unwrap().schema().name());

        let report = coerce(&json!({"x": {"hostname": "X"}}), &spec).unwrap_err();
        let error = &report.errors()[0];
        assert_eq!("x", error.path_string());
        assert_eq!(ErrorKind::UnionNoMatch, error.kind);
        assert!(error.causes.iter().any(|c| c.path_string() == "x.role"));
    }

    fn routed(mode: DispatchMode) -> TypeSpec {
        let rtr = device("Rtr", FieldDescriptor::new("monitor", TypeSpec::boolean()));
        let switch = device("Switch", FieldDescriptor::new("id", TypeSpec::integer()));
        KeyRouted::new(
            Router::prefixes(vec![("rtr", "rtr"), ("switch", "switch"), ("fw", "fw")]),
            Registry::new().with("rtr", &rtr).with("switch", &switch),
        )
        .mode(mode)
        .into()
    }

    fn routed_input() -> Value {
        json!({
            "rtr1": {"hostname": "Router-1", "role": ["core"], "addr": "192.168.1.1/24", "monitor": true},
            "switch1": {"hostname": "Switch-1", "role": ["access"], "addr": "192.168.10.1/24", "id": 532},
            "bogus1": {"hostname": "Bogus-1", "role": [], "addr": "10.0.0.1/8"},
            "fw1": {"hostname": "Fw-1", "role": [], "addr": "10.0.0.2/8"},
            "switch2": {"hostname": "", "role": ["access"], "addr": "192.168.10.2/24", "id": 321},
        })
    }

    #[test]
    fn routed_atomic_fails_together() {
        let validation =
            validate(&routed(DispatchMode::Atomic), &routed_input(), ValidateOptions::new());

        assert!(validation.value.is_none());
        assert!(validation.dropped.is_empty());
        assert_eq!(
            vec![
                ("bogus1".to_owned(), ErrorKind::CustomError),
                ("fw1".to_owned(), ErrorKind::CustomError),
                ("switch2.hostname".to_owned(), ErrorKind::ConstraintViolation),
            ],
            kinds(&validation.report)
        );
    }

    #[test]
    fn routed_partial_drops_failing_entries() {
        let validation =
            validate(&routed(DispatchMode::Partial), &routed_input(), ValidateOptions::new());

        assert!(validation.report.is_empty());
        let value = validation.value.unwrap();
        assert_eq!(
            vec!["rtr1", "switch1"],
            value.as_map().unwrap().keys().collect::<Vec<_>>()
        );
        assert_eq!("Switch", value.get("switch1").unwrap().as_model().unwrap().schema().name());
        assert_eq!(
            vec![
                ("bogus1".to_owned(), ErrorKind::CustomError),
                ("fw1".to_owned(), ErrorKind::CustomError),
                ("switch2.hostname".to_owned(), ErrorKind::ConstraintViolation),
            ],
            kinds(&validation.dropped)
        );
    }

    #[test]
    fn routed_requires_an_object() {
        let report = coerce(&json!([]), &routed(DispatchMode::Partial)).unwrap_err();
        assert_eq!(vec![(String::new(), ErrorKind::TypeError)], kinds(&report));
    }

    #[test]
    fn failed_union_alternative_discards_its_drops() {
        let inventory = ModelSchema::builder("Inventory")
            .field(FieldDescriptor::new("devices", routed(DispatchMode::Partial)))
            .field(FieldDescriptor::new("site", TypeSpec::string()))
            .build()
            .unwrap();
        let spec = TypeSpec::union(vec![
            TypeSpec::model(&inventory),
            TypeSpec::map_of(TypeSpec::Any),
        ]);

        let input = json!({"devices": {"bogus1": {}}});
        let validation = validate(&spec, &input, ValidateOptions::new());
        assert!(validation.is_valid());
        assert!(validation.value.unwrap().as_map().is_some());
        assert!(validation.dropped.is_empty());

        let input = json!({"devices": {"bogus1": {}}, "site": "lab"});
        let validation = validate(&spec, &input, ValidateOptions::new());
        assert!(validation.value.unwrap().as_model().is_some());
        assert_eq!(1, validation.dropped.len());
        assert_eq!("devices.bogus1", validation.dropped.errors()[0].path_string());
    }

    #[test]
    fn max_errors_caps_report() {
        let spec = TypeSpec::list_of(TypeSpec::string());
        let validation = validate(
            &spec,
            &json!([null, null, null, null, null]),
            ValidateOptions::new().with_max_errors(3),
        );

        assert_eq!(3, validation.report.len());
        assert!(validation.value.is_none());
    }

    #[test]
    fn any_accepts_everything() {
        let input = json!({"a": [1, "x", null]});
        assert_eq!(Ok(Validated::from(input.clone())), coerce(&input, &TypeSpec::Any));
    }
}
