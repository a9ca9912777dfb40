//! Schema validation capability for method parameters
//!
//! The engine does not hard-wire a schema language. Parameter checks go
//! through the `SchemaValidator` trait, which reports a list of violations
//! (empty means valid). Two implementations ship with the crate:
//!
//! - `JsonSchemaValidator` (the default): full JSON Schema draft 7 through
//!   the `jsonschema` crate, including `$ref`, `pattern`, `uniqueItems`,
//!   `dependencies` and `if`/`then`/`else`
//! - `BasicSchemaValidator`: a small dependency-free subset
//!
//! `BasicSchemaValidator` covers:
//!
//! - `type` (single name or list), `enum`, `const`
//! - `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`
//! - `minLength`, `maxLength`
//! - `minItems`, `maxItems`, `items` (single schema or tuple form)
//! - `required`, `properties`, `additionalProperties`
//! - `allOf`, `anyOf`, `oneOf`, `not`, and boolean schemas
//!
//! Its `check_schema` refuses any other validation keyword, so a schema it
//! accepts is enforced in full. Annotations such as `title` or `format` are
//! ignored. Keywords are evaluated in a fixed order so the same instance and
//! schema always yield the same violation list.
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::{JsonSchemaValidator, SchemaValidator};
//! use serde_json::json;
//!
//! let schema = json!({"type": "array", "items": {"type": "number"}, "minItems": 2, "maxItems": 2});
//! let validator = JsonSchemaValidator::new();
//!
//! assert!(validator.validate(&json!([2, 3]), &schema).is_empty());
//!
//! let violations = validator.validate(&json!(["x", 3]), &schema);
//! assert_eq!(violations[0].message, r#""x" is not of type "number""#);
//! ```

use jsonschema::{Draft, Validator};
use serde::Serialize;
use serde_json::{json, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One step in the path from the params root to an offending value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object member name
    Key(String),
    /// Array position
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// A single schema violation
///
/// Serializes as `{"message": ..., "path": [...]}`, which is the element
/// shape of the `data` array in an Invalid params error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Human-readable description
    pub message: String,
    /// Location of the offending value, empty for the root
    pub path: Vec<PathSegment>,
}

impl Violation {
    /// Create a violation at the params root
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Create a violation at the given path
    pub fn at(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

/// Render violations as the `data` member of an Invalid params error
pub fn violations_to_value(violations: &[Violation]) -> Value {
    Value::Array(
        violations
            .iter()
            .map(|v| {
                let path: Vec<Value> = v
                    .path
                    .iter()
                    .map(|segment| match segment {
                        PathSegment::Key(key) => Value::String(key.clone()),
                        PathSegment::Index(index) => Value::from(*index),
                    })
                    .collect();
                json!({ "message": v.message, "path": path })
            })
            .collect(),
    )
}

/// Capability that checks a value against a schema
///
/// Implementations must be deterministic: the same instance and schema
/// always produce the same violations in the same order.
pub trait SchemaValidator: Send + Sync {
    /// Validate `instance` against `schema`, returning every violation found
    fn validate(&self, instance: &Value, schema: &Value) -> Vec<Violation>;

    /// Check that `schema` itself is usable
    ///
    /// Called once at registration so that malformed schemas fail early
    /// instead of on every request.
    fn check_schema(&self, schema: &Value) -> std::result::Result<(), String>;
}

/// Default validator, backed by the `jsonschema` crate
///
/// Schemas are compiled as draft 7, which keeps the tuple form of `items`
/// and `dependencies`. Compiled schemas are cached by their JSON text, so a
/// method's schema is compiled once and reused for every call.
#[derive(Default)]
pub struct JsonSchemaValidator {
    compiled: RwLock<HashMap<String, Arc<Validator>>>,
}

impl JsonSchemaValidator {
    /// Create the validator with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn compile(&self, schema: &Value) -> std::result::Result<Arc<Validator>, String> {
        let key = schema.to_string();
        if let Some(validator) = self.read().get(&key) {
            return Ok(Arc::clone(validator));
        }

        let validator = jsonschema::options()
            .with_draft(Draft::Draft7)
            .build(schema)
            .map_err(|e| e.to_string())?;
        let validator = Arc::new(validator);
        self.write().insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    // Entries are only ever inserted whole
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Validator>>> {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Validator>>> {
        self.compiled.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, instance: &Value, schema: &Value) -> Vec<Violation> {
        match self.compile(schema) {
            Ok(validator) => validator
                .iter_errors(instance)
                .map(|error| {
                    let pointer = error.instance_path.to_string();
                    Violation::at(error.to_string(), pointer_path(instance, &pointer))
                })
                .collect(),
            Err(reason) => vec![Violation::new(format!("Schema is not usable: {}", reason))],
        }
    }

    fn check_schema(&self, schema: &Value) -> std::result::Result<(), String> {
        self.compile(schema).map(|_| ())
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("compiled", &self.read().len())
            .finish()
    }
}

/// Split a JSON Pointer into path segments
///
/// The instance decides whether a numeric token is an array position or an
/// object member that happens to be named like one.
fn pointer_path(instance: &Value, pointer: &str) -> Vec<PathSegment> {
    let mut current = Some(instance);
    let mut path = Vec::new();
    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        let segment = match (current, token.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                current = items.get(index);
                PathSegment::Index(index)
            }
            (Some(Value::Object(members)), _) => {
                current = members.get(&token);
                PathSegment::Key(token)
            }
            (_, Ok(index)) => {
                current = None;
                PathSegment::Index(index)
            }
            _ => {
                current = None;
                PathSegment::Key(token)
            }
        };
        path.push(segment);
    }
    path
}

/// Built-in validator for a deterministic JSON Schema subset
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicSchemaValidator;

const TYPE_NAMES: [&str; 7] = [
    "null", "boolean", "object", "array", "number", "integer", "string",
];

/// Validation keywords outside the subset `walk` evaluates
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$dynamicRef",
    "$recursiveRef",
    "$ref",
    "additionalItems",
    "contains",
    "dependencies",
    "dependentRequired",
    "dependentSchemas",
    "else",
    "if",
    "maxContains",
    "maxProperties",
    "minContains",
    "minProperties",
    "multipleOf",
    "pattern",
    "patternProperties",
    "prefixItems",
    "propertyNames",
    "then",
    "unevaluatedItems",
    "unevaluatedProperties",
    "uniqueItems",
];

impl BasicSchemaValidator {
    /// Create the validator
    pub fn new() -> Self {
        Self
    }

    fn walk(&self, instance: &Value, schema: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Violation>) {
        let keywords = match schema {
            Value::Bool(true) => return,
            Value::Bool(false) => {
                out.push(Violation::at(
                    format!("False schema does not allow {}", instance),
                    path.clone(),
                ));
                return;
            }
            Value::Object(keywords) => keywords,
            _ => return,
        };

        if let Some(expected) = keywords.get("type") {
            let names: Vec<&str> = match expected {
                Value::String(name) => vec![name.as_str()],
                Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            if !names.is_empty() && !names.iter().any(|name| type_matches(instance, name)) {
                let quoted: Vec<String> = names.iter().map(|n| format!("\"{}\"", n)).collect();
                report(path, format!("{} is not of type {}", instance, quoted.join(", ")), out);
            }
        }

        if let Some(Value::Array(allowed)) = keywords.get("enum") {
            if !allowed.iter().any(|candidate| json_eq(candidate, instance)) {
                report(path, format!("{} is not one of {}", instance, Value::Array(allowed.clone())), out);
            }
        }

        if let Some(expected) = keywords.get("const") {
            if !json_eq(expected, instance) {
                report(path, format!("{} was expected", expected), out);
            }
        }

        if let Value::Number(n) = instance {
            if let Some(Value::Number(min)) = keywords.get("minimum") {
                if compare_numbers(n, min) == Some(Ordering::Less) {
                    report(path, format!("{} is less than the minimum of {}", instance, min), out);
                }
            }
            if let Some(Value::Number(max)) = keywords.get("maximum") {
                if compare_numbers(n, max) == Some(Ordering::Greater) {
                    report(path, format!("{} is greater than the maximum of {}", instance, max), out);
                }
            }
            if let Some(Value::Number(min)) = keywords.get("exclusiveMinimum") {
                if compare_numbers(n, min).is_some_and(Ordering::is_le) {
                    report(
                        path,
                        format!("{} is less than or equal to the minimum of {}", instance, min),
                        out,
                    );
                }
            }
            if let Some(Value::Number(max)) = keywords.get("exclusiveMaximum") {
                if compare_numbers(n, max).is_some_and(Ordering::is_ge) {
                    report(
                        path,
                        format!("{} is greater than or equal to the maximum of {}", instance, max),
                        out,
                    );
                }
            }
        }

        if let Value::String(s) = instance {
            let len = s.chars().count() as u64;
            if let Some(min) = keywords.get("minLength").and_then(Value::as_u64) {
                if len < min {
                    report(path, format!("{} is too short", instance), out);
                }
            }
            if let Some(max) = keywords.get("maxLength").and_then(Value::as_u64) {
                if len > max {
                    report(path, format!("{} is too long", instance), out);
                }
            }
        }

        if let Value::Array(items) = instance {
            let len = items.len() as u64;
            if let Some(min) = keywords.get("minItems").and_then(Value::as_u64) {
                if len < min {
                    report(path, format!("{} is too short", instance), out);
                }
            }
            if let Some(max) = keywords.get("maxItems").and_then(Value::as_u64) {
                if len > max {
                    report(path, format!("{} is too long", instance), out);
                }
            }
            match keywords.get("items") {
                Some(Value::Array(tuple)) => {
                    for (index, (item, item_schema)) in items.iter().zip(tuple).enumerate() {
                        path.push(PathSegment::Index(index));
                        self.walk(item, item_schema, path, out);
                        path.pop();
                    }
                }
                Some(item_schema) => {
                    for (index, item) in items.iter().enumerate() {
                        path.push(PathSegment::Index(index));
                        self.walk(item, item_schema, path, out);
                        path.pop();
                    }
                }
                None => {}
            }
        }

        if let Value::Object(members) = instance {
            if let Some(Value::Array(required)) = keywords.get("required") {
                for name in required.iter().filter_map(Value::as_str) {
                    if !members.contains_key(name) {
                        report(path, format!("{} is a required property", Value::from(name)), out);
                    }
                }
            }

            let properties = keywords.get("properties").and_then(Value::as_object);
            if let Some(properties) = properties {
                for (name, property_schema) in properties {
                    if let Some(member) = members.get(name) {
                        path.push(PathSegment::Key(name.clone()));
                        self.walk(member, property_schema, path, out);
                        path.pop();
                    }
                }
            }

            if let Some(additional) = keywords.get("additionalProperties") {
                let extra: Vec<&String> = members
                    .keys()
                    .filter(|name| properties.map_or(true, |p| !p.contains_key(*name)))
                    .collect();
                match additional {
                    Value::Bool(false) if !extra.is_empty() => {
                        let listed: Vec<String> =
                            extra.iter().map(|name| Value::from(name.as_str()).to_string()).collect();
                        let verb = if extra.len() == 1 { "was" } else { "were" };
                        report(
                            path,
                            format!(
                                "Additional properties are not allowed ({} {} unexpected)",
                                listed.join(", "),
                                verb
                            ),
                            out,
                        );
                    }
                    Value::Object(_) => {
                        for name in extra {
                            path.push(PathSegment::Key(name.clone()));
                            self.walk(&members[name.as_str()], additional, path, out);
                            path.pop();
                        }
                    }
                    _ => {}
                }
            }
        }

        if let Some(Value::Array(all)) = keywords.get("allOf") {
            for sub in all {
                self.walk(instance, sub, path, out);
            }
        }

        if let Some(Value::Array(any)) = keywords.get("anyOf") {
            if !any.iter().any(|sub| self.is_valid(instance, sub)) {
                report(path, format!("{} is not valid under any of the given schemas", instance), out);
            }
        }

        if let Some(Value::Array(one)) = keywords.get("oneOf") {
            match one.iter().filter(|sub| self.is_valid(instance, sub)).count() {
                1 => {}
                0 => report(path, format!("{} is not valid under any of the given schemas", instance), out),
                _ => report(
                    path,
                    format!("{} is valid under more than one of the given schemas", instance),
                    out,
                ),
            }
        }

        if let Some(negated) = keywords.get("not") {
            if self.is_valid(instance, negated) {
                report(path, format!("{} should not be valid under {}", instance, negated), out);
            }
        }
    }

    fn is_valid(&self, instance: &Value, schema: &Value) -> bool {
        let mut scratch = Vec::new();
        self.walk(instance, schema, &mut Vec::new(), &mut scratch);
        scratch.is_empty()
    }

    fn check(&self, schema: &Value, location: &str) -> std::result::Result<(), String> {
        let keywords = match schema {
            Value::Bool(_) => return Ok(()),
            Value::Object(keywords) => keywords,
            other => {
                return Err(format!(
                    "{} must be an object or a boolean, got {}",
                    location, other
                ))
            }
        };

        if let Some(keyword) = UNSUPPORTED_KEYWORDS.iter().find(|k| keywords.contains_key(**k)) {
            return Err(format!(
                "{}: \"{}\" is not supported by the basic validator",
                location, keyword
            ));
        }

        if let Some(expected) = keywords.get("type") {
            let known = |name: &Value| name.as_str().is_some_and(|n| TYPE_NAMES.contains(&n));
            let ok = match expected {
                Value::String(_) => known(expected),
                Value::Array(names) => !names.is_empty() && names.iter().all(known),
                _ => false,
            };
            if !ok {
                return Err(format!("{}: {} is not a valid type", location, expected));
            }
        }

        for keyword in ["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"] {
            if let Some(bound) = keywords.get(keyword) {
                if !bound.is_number() {
                    return Err(format!("{}: \"{}\" must be a number", location, keyword));
                }
            }
        }

        for keyword in ["minLength", "maxLength", "minItems", "maxItems"] {
            if let Some(bound) = keywords.get(keyword) {
                if bound.as_u64().is_none() {
                    return Err(format!(
                        "{}: \"{}\" must be a non-negative integer",
                        location, keyword
                    ));
                }
            }
        }

        if let Some(required) = keywords.get("required") {
            let ok = required
                .as_array()
                .is_some_and(|names| names.iter().all(Value::is_string));
            if !ok {
                return Err(format!("{}: \"required\" must be an array of strings", location));
            }
        }

        if let Some(allowed) = keywords.get("enum") {
            if !allowed.is_array() {
                return Err(format!("{}: \"enum\" must be an array", location));
            }
        }

        match keywords.get("items") {
            Some(Value::Array(tuple)) => {
                for (index, sub) in tuple.iter().enumerate() {
                    self.check(sub, &format!("{}/items/{}", location, index))?;
                }
            }
            Some(sub) => self.check(sub, &format!("{}/items", location))?,
            None => {}
        }

        if let Some(properties) = keywords.get("properties") {
            let properties = properties
                .as_object()
                .ok_or_else(|| format!("{}: \"properties\" must be an object", location))?;
            for (name, sub) in properties {
                self.check(sub, &format!("{}/properties/{}", location, name))?;
            }
        }

        if let Some(additional) = keywords.get("additionalProperties") {
            self.check(additional, &format!("{}/additionalProperties", location))?;
        }

        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(subs) = keywords.get(keyword) {
                let subs = subs
                    .as_array()
                    .filter(|subs| !subs.is_empty())
                    .ok_or_else(|| format!("{}: \"{}\" must be a non-empty array", location, keyword))?;
                for (index, sub) in subs.iter().enumerate() {
                    self.check(sub, &format!("{}/{}/{}", location, keyword, index))?;
                }
            }
        }

        if let Some(negated) = keywords.get("not") {
            self.check(negated, &format!("{}/not", location))?;
        }

        Ok(())
    }
}

impl SchemaValidator for BasicSchemaValidator {
    fn validate(&self, instance: &Value, schema: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.walk(instance, schema, &mut Vec::new(), &mut violations);
        violations
    }

    fn check_schema(&self, schema: &Value) -> std::result::Result<(), String> {
        self.check(schema, "schema")
    }
}

fn report(path: &[PathSegment], message: String, out: &mut Vec<Violation>) {
    out.push(Violation::at(message, path.to_vec()));
}

fn type_matches(instance: &Value, name: &str) -> bool {
    match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            _ => false,
        },
        _ => false,
    }
}

/// Order two JSON numbers, exactly when both are integers
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    // A u64 above i64::MAX against a negative integer
    if a.is_u64() && b.is_i64() {
        return Some(Ordering::Greater);
    }
    if a.is_i64() && b.is_u64() {
        return Some(Ordering::Less);
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

/// Structural equality where `1` and `1.0` are the same number
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(instance: Value, schema: Value) -> Vec<String> {
        BasicSchemaValidator::new()
            .validate(&instance, &schema)
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_type_keyword() {
        assert!(messages(json!(1), json!({"type": "number"})).is_empty());
        assert!(messages(json!(2.0), json!({"type": "integer"})).is_empty());
        assert!(messages(json!(null), json!({"type": ["string", "null"]})).is_empty());

        assert_eq!(
            messages(json!(1.5), json!({"type": "integer"})),
            vec![r#"1.5 is not of type "integer""#]
        );
        assert_eq!(
            messages(json!(true), json!({"type": ["string", "null"]})),
            vec![r#"true is not of type "string", "null""#]
        );
    }

    #[test]
    fn test_required_and_properties_paths() {
        let schema = json!({
            "type": "object",
            "required": ["a", "c"],
            "properties": {"a": {"type": "string"}, "b": {"type": "array", "items": {"type": "number"}}}
        });
        let violations = BasicSchemaValidator::new()
            .validate(&json!({"a": 1, "b": [1, "two"]}), &schema);

        assert_eq!(
            violations,
            vec![
                Violation::new(r#""c" is a required property"#),
                Violation::at(r#"1 is not of type "string""#, vec![PathSegment::Key("a".into())]),
                Violation::at(
                    r#""two" is not of type "number""#,
                    vec![PathSegment::Key("b".into()), PathSegment::Index(1)]
                ),
            ]
        );
    }

    #[test]
    fn test_tuple_items() {
        let schema = json!({"type": "array", "items": [{"type": "string"}, {"type": "integer"}]});
        assert!(messages(json!(["a", 1, "extra"]), schema.clone()).is_empty());
        assert_eq!(
            messages(json!([1, 1]), schema),
            vec![r#"1 is not of type "string""#]
        );
    }

    #[test]
    fn test_numeric_bounds() {
        let schema = json!({"minimum": 0, "exclusiveMaximum": 10});
        assert!(messages(json!(0), schema.clone()).is_empty());
        assert_eq!(messages(json!(-1), schema.clone()), vec!["-1 is less than the minimum of 0"]);
        assert_eq!(
            messages(json!(10), schema),
            vec!["10 is greater than or equal to the maximum of 10"]
        );
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(messages(json!("ab"), json!({"minLength": 3})), vec![r#""ab" is too short"#]);
        assert_eq!(messages(json!([1, 2, 3]), json!({"maxItems": 2})), vec!["[1,2,3] is too long"]);
        // Length counts characters, not bytes
        assert!(messages(json!("héé"), json!({"maxLength": 3})).is_empty());
    }

    #[test]
    fn test_enum_and_const() {
        assert!(messages(json!(1.0), json!({"enum": [1, 2]})).is_empty());
        assert_eq!(messages(json!(3), json!({"enum": [1, 2]})), vec!["3 is not one of [1,2]"]);
        assert_eq!(messages(json!("b"), json!({"const": "a"})), vec![r#""a" was expected"#]);
    }

    #[test]
    fn test_additional_properties() {
        let schema = json!({"properties": {"a": {}}, "additionalProperties": false});
        assert_eq!(
            messages(json!({"a": 1, "z": 2}), schema),
            vec![r#"Additional properties are not allowed ("z" was unexpected)"#]
        );

        let schema = json!({"additionalProperties": {"type": "integer"}});
        let violations = BasicSchemaValidator::new().validate(&json!({"x": "no"}), &schema);
        assert_eq!(violations[0].path, vec![PathSegment::Key("x".into())]);
    }

    #[test]
    fn test_combinators() {
        let any = json!({"anyOf": [{"type": "string"}, {"type": "null"}]});
        assert!(messages(json!(null), any.clone()).is_empty());
        assert_eq!(
            messages(json!(1), any),
            vec!["1 is not valid under any of the given schemas"]
        );

        let one = json!({"oneOf": [{"type": "number"}, {"type": "integer"}]});
        assert_eq!(
            messages(json!(1), one),
            vec!["1 is valid under more than one of the given schemas"]
        );

        assert_eq!(
            messages(json!(1), json!({"not": {"type": "number"}})),
            vec![r#"1 should not be valid under {"type":"number"}"#]
        );

        let all = json!({"allOf": [{"minimum": 5}, {"maximum": 0}]});
        assert_eq!(messages(json!(3), all).len(), 2);
    }

    #[test]
    fn test_boolean_schemas() {
        assert!(messages(json!({"any": "thing"}), json!(true)).is_empty());
        assert_eq!(messages(json!(1), json!(false)), vec!["False schema does not allow 1"]);
    }

    #[test]
    fn test_annotations_ignored() {
        assert!(messages(json!(1), json!({"format": "email", "title": "n", "x-custom": true})).is_empty());
    }

    #[test]
    fn test_deterministic_output() {
        let schema = json!({"type": "object", "required": ["a", "b", "c"]});
        let first = BasicSchemaValidator::new().validate(&json!({}), &schema);
        let second = BasicSchemaValidator::new().validate(&json!({}), &schema);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_check_schema() {
        let validator = BasicSchemaValidator::new();
        assert!(validator.check_schema(&json!(true)).is_ok());
        assert!(validator
            .check_schema(&json!({"type": "array", "items": {"type": "number"}}))
            .is_ok());

        assert!(validator.check_schema(&json!(42)).is_err());
        assert!(validator.check_schema(&json!({"type": "float"})).is_err());
        assert!(validator.check_schema(&json!({"required": "a"})).is_err());
        assert!(validator.check_schema(&json!({"minItems": -1})).is_err());

        let err = validator
            .check_schema(&json!({"properties": {"a": {"type": 7}}}))
            .unwrap_err();
        assert!(err.contains("schema/properties/a"));
    }

    #[test]
    fn test_violations_to_value() {
        let data = violations_to_value(&[Violation::at(
            "bad",
            vec![PathSegment::Key("a".into()), PathSegment::Index(0)],
        )]);
        assert_eq!(data, json!([{"message": "bad", "path": ["a", 0]}]));
    }

    #[test]
    fn test_check_schema_rejects_unsupported_keywords() {
        let validator = BasicSchemaValidator::new();

        let err = validator
            .check_schema(&json!({"type": "array", "uniqueItems": true}))
            .unwrap_err();
        assert!(err.contains("uniqueItems"));

        let err = validator
            .check_schema(&json!({"properties": {"n": {"multipleOf": 2}}}))
            .unwrap_err();
        assert!(err.contains("schema/properties/n"));
        assert!(err.contains("multipleOf"));

        let err = validator
            .check_schema(&json!({
                "definitions": {"n": {"type": "number"}},
                "items": {"$ref": "#/definitions/n"}
            }))
            .unwrap_err();
        assert!(err.contains("$ref"));

        assert!(validator.check_schema(&json!({"if": {"type": "string"}})).is_err());
        assert!(validator.check_schema(&json!({"pattern": "^a"})).is_err());
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let above = json!(9_007_199_254_740_993u64);

        assert_eq!(
            messages(above.clone(), json!({"maximum": 9_007_199_254_740_992u64})).len(),
            1
        );
        assert!(messages(above.clone(), json!({"minimum": 9_007_199_254_740_993u64})).is_empty());
        assert_eq!(
            messages(above.clone(), json!({"exclusiveMinimum": 9_007_199_254_740_993u64})).len(),
            1
        );
        assert_eq!(
            messages(above.clone(), json!({"const": 9_007_199_254_740_992u64})).len(),
            1
        );
        assert_eq!(
            messages(above.clone(), json!({"enum": [9_007_199_254_740_992u64]})).len(),
            1
        );
        assert!(messages(above, json!({"enum": [9_007_199_254_740_993u64]})).is_empty());

        assert!(messages(json!(u64::MAX), json!({"minimum": -1})).is_empty());
        assert_eq!(messages(json!(i64::MIN), json!({"minimum": u64::MAX})).len(), 1);
        assert!(messages(json!(1.0), json!({"const": 1})).is_empty());
    }

    mod json_schema {
        use super::*;

        fn check(instance: Value, schema: Value) -> Vec<Violation> {
            JsonSchemaValidator::new().validate(&instance, &schema)
        }

        #[test]
        fn test_type_message_and_path() {
            let violations = check(
                json!(["x", 3]),
                json!({"type": "array", "items": {"type": "number"}}),
            );
            assert_eq!(
                violations,
                vec![Violation::at(
                    r#""x" is not of type "number""#,
                    vec![PathSegment::Index(0)],
                )]
            );
        }

        #[test]
        fn test_unique_items() {
            let schema = json!({"type": "array", "uniqueItems": true});
            assert_eq!(check(json!([1, 1]), schema.clone()).len(), 1);
            assert!(check(json!([1, 2]), schema).is_empty());
        }

        #[test]
        fn test_multiple_of_and_min_properties() {
            let schema = json!({"properties": {"n": {"multipleOf": 2}}, "minProperties": 2});
            let violations = check(json!({"n": 3}), schema.clone());
            assert_eq!(violations.len(), 2);
            assert!(violations
                .iter()
                .any(|v| v.path == vec![PathSegment::Key("n".into())]));
            assert!(check(json!({"n": 4, "m": 0}), schema).is_empty());
        }

        #[test]
        fn test_ref_to_definitions() {
            let schema = json!({
                "definitions": {"n": {"type": "number"}},
                "items": {"$ref": "#/definitions/n"}
            });
            let violations = check(json!(["x"]), schema.clone());
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].path, vec![PathSegment::Index(0)]);
            assert!(check(json!([1, 2.5]), schema).is_empty());
        }

        #[test]
        fn test_pattern_and_conditionals() {
            let schema = json!({
                "type": "object",
                "properties": {"code": {"type": "string", "pattern": "^[A-Z]{3}$"}},
                "if": {"required": ["amount"]},
                "then": {"required": ["code"]}
            });
            assert_eq!(check(json!({"code": "usd"}), schema.clone()).len(), 1);
            assert_eq!(check(json!({"amount": 5}), schema.clone()).len(), 1);
            assert!(check(json!({"amount": 5, "code": "USD"}), schema).is_empty());
        }

        #[test]
        fn test_numeric_member_names_stay_keys() {
            let violations = check(
                json!({"0": 1}),
                json!({"properties": {"0": {"type": "string"}}}),
            );
            assert_eq!(violations[0].path, vec![PathSegment::Key("0".into())]);
        }

        #[test]
        fn test_pointer_path_unescapes() {
            let instance = json!({"a/b": [{"~c": 1}]});
            assert_eq!(
                pointer_path(&instance, "/a~1b/0/~0c"),
                vec![
                    PathSegment::Key("a/b".into()),
                    PathSegment::Index(0),
                    PathSegment::Key("~c".into()),
                ]
            );
            assert!(pointer_path(&instance, "").is_empty());
        }

        #[test]
        fn test_check_schema() {
            let validator = JsonSchemaValidator::new();
            assert!(validator.check_schema(&json!({"type": "object"})).is_ok());
            assert!(validator.check_schema(&json!({"type": "tuple"})).is_err());
            assert!(validator.check_schema(&json!({"type": 5})).is_err());
        }

        #[test]
        fn test_compiled_schemas_are_cached() {
            let validator = JsonSchemaValidator::new();
            let schema = json!({"type": "string"});
            validator.validate(&json!("a"), &schema);
            validator.validate(&json!("b"), &schema);
            assert_eq!(validator.read().len(), 1);
        }
    }
}
