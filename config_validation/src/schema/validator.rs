use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::SchemaValidationError;

type Result<T> = std::result::Result<T, SchemaValidationError>;

/// Decides whether a value belongs to a named schema type.
pub type TypeCheck = fn(&Value) -> bool;

/// The type classification rules used by a `Validator`.
#[derive(Clone)]
pub struct TypeChecker {
    checks: HashMap<&'static str, TypeCheck>,
}

impl TypeChecker {
    /// The draft-7 classification of the seven primitive schema types.
    pub fn draft7() -> Self {
        let mut checks: HashMap<&'static str, TypeCheck> = HashMap::new();
        checks.insert("null", Value::is_null);
        checks.insert("boolean", Value::is_boolean);
        checks.insert("object", Value::is_object);
        checks.insert("array", Value::is_array);
        checks.insert("number", Value::is_number);
        checks.insert("string", Value::is_string);
        checks.insert("integer", is_integer);
        Self { checks }
    }

    /// Replaces the rule for `name`, returning the modified checker.
    ///
    /// # Arguments
    /// * `name` - The schema type name to redefine.
    /// * `check` - The new classification rule.
    pub fn redefine(mut self, name: &'static str, check: TypeCheck) -> Self {
        self.checks.insert(name, check);
        self
    }

    /// Returns true if `instance` is of the schema type `name`.
    ///
    /// Unknown type names never match.
    pub fn is_type(&self, instance: &Value, name: &str) -> bool {
        self.checks.get(name).is_some_and(|check| check(instance))
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Structural validation engine over a JSON-schema-like document.
///
/// Reports the first violation found, depth first, in document order.
#[derive(Clone)]
pub struct Validator {
    types: TypeChecker,
}

impl Validator {
    /// Creates a new `Validator` with the given type rules.
    pub fn new(types: TypeChecker) -> Self {
        Self { types }
    }

    /// Returns the type rules of this validator.
    pub fn type_checker(&self) -> &TypeChecker {
        &self.types
    }

    /// Validates `instance` against `schema`.
    ///
    /// # Arguments
    /// * `instance` - The value to check.
    /// * `schema` - The schema describing the expected shape.
    ///
    /// # Returns
    /// The first `SchemaValidationError` found, if any.
    pub fn validate(&self, instance: &Value, schema: &Value) -> Result<()> {
        self.descend(instance, schema, "$")
    }

    /// Returns true if `instance` satisfies `schema`.
    pub fn is_valid(&self, instance: &Value, schema: &Value) -> bool {
        self.validate(instance, schema).is_ok()
    }

    fn descend(&self, instance: &Value, schema: &Value, path: &str) -> Result<()> {
        let schema = match schema {
            Value::Bool(true) => return Ok(()),
            Value::Bool(false) => return Err(violation(path, "false", "no value at all", instance)),
            Value::Object(schema) => schema,
            _ => return Ok(()),
        };

        self.check_type(instance, schema, path)?;
        check_enum(instance, schema, path)?;
        check_numeric(instance, schema, path)?;
        check_string(instance, schema, path)?;

        match instance {
            Value::Object(object) => self.check_object(object, schema, path)?,
            Value::Array(items) => self.check_array(items, instance, schema, path)?,
            _ => {}
        }

        self.check_combinators(instance, schema, path)
    }

    fn check_type(&self, instance: &Value, schema: &Map<String, Value>, path: &str) -> Result<()> {
        let Some(expected) = schema.get("type") else {
            return Ok(());
        };

        let names: Vec<&str> = match expected {
            Value::String(name) => vec![name.as_str()],
            Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
            _ => return Ok(()),
        };

        if names.iter().any(|name| self.types.is_type(instance, name)) {
            return Ok(());
        }

        let expected = match names.as_slice() {
            [name] => format!("type '{name}'"),
            names => format!("one of types {names:?}"),
        };
        Err(violation(path, "type", expected, instance))
    }

    fn check_object(
        &self,
        object: &Map<String, Value>,
        schema: &Map<String, Value>,
        path: &str,
    ) -> Result<()> {
        if let Some(Value::Array(required)) = schema.get("required") {
            for key in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(key) {
                    let present: Vec<Value> = object.keys().cloned().map(Value::String).collect();
                    return Err(violation(
                        path,
                        "required",
                        format!("required property '{key}'"),
                        &Value::Array(present),
                    ));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        for (key, value) in object {
            let child = format!("{path}.{key}");
            match properties.and_then(|p| p.get(key)) {
                Some(subschema) => self.descend(value, subschema, &child)?,
                None => match schema.get("additionalProperties") {
                    Some(Value::Bool(false)) => {
                        let allowed: Vec<&String> =
                            properties.map(|p| p.keys().collect()).unwrap_or_default();
                        return Err(violation(
                            &child,
                            "additionalProperties",
                            format!("no property '{key}', allowed properties are {allowed:?}"),
                            value,
                        ));
                    }
                    Some(extra @ Value::Object(_)) => self.descend(value, extra, &child)?,
                    _ => {}
                },
            }
        }

        Ok(())
    }

    fn check_array(
        &self,
        items: &[Value],
        instance: &Value,
        schema: &Map<String, Value>,
        path: &str,
    ) -> Result<()> {
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                let expected = format!("at least {min} item(s)");
                return Err(violation(path, "minItems", expected, instance));
            }
        }

        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if items.len() as u64 > max {
                return Err(violation(path, "maxItems", format!("at most {max} item(s)"), instance));
            }
        }

        match schema.get("items") {
            Some(Value::Array(positional)) => {
                for (i, (item, subschema)) in items.iter().zip(positional).enumerate() {
                    self.descend(item, subschema, &format!("{path}[{i}]"))?;
                }
            }
            Some(subschema) => {
                for (i, item) in items.iter().enumerate() {
                    self.descend(item, subschema, &format!("{path}[{i}]"))?;
                }
            }
            None => {}
        }

        Ok(())
    }

    fn check_combinators(
        &self,
        instance: &Value,
        schema: &Map<String, Value>,
        path: &str,
    ) -> Result<()> {
        if let Some(Value::Array(all)) = schema.get("allOf") {
            for subschema in all {
                self.descend(instance, subschema, path)?;
            }
        }

        if let Some(Value::Array(any)) = schema.get("anyOf") {
            if !any.iter().any(|s| self.is_valid_at(instance, s, path)) {
                let expected =
                    format!("a value matching at least one of {} alternatives", any.len());
                return Err(violation(path, "anyOf", expected, instance));
            }
        }

        if let Some(Value::Array(one)) = schema.get("oneOf") {
            let matches = one.iter().filter(|s| self.is_valid_at(instance, s, path)).count();
            if matches != 1 {
                let expected = format!(
                    "a value matching exactly one of {} alternatives, matched {matches}",
                    one.len()
                );
                return Err(violation(path, "oneOf", expected, instance));
            }
        }

        if let Some(condition) = schema.get("if") {
            let branch = if self.is_valid_at(instance, condition, path) { "then" } else { "else" };
            if let Some(subschema) = schema.get(branch) {
                self.descend(instance, subschema, path)?;
            }
        }

        Ok(())
    }

    fn is_valid_at(&self, instance: &Value, schema: &Value, path: &str) -> bool {
        self.descend(instance, schema, path).is_ok()
    }
}

fn check_enum(instance: &Value, schema: &Map<String, Value>, path: &str) -> Result<()> {
    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(instance) {
            let expected = format!("one of {}", Value::Array(allowed.clone()));
            return Err(violation(path, "enum", expected, instance));
        }
    }

    if let Some(expected) = schema.get("const") {
        if expected != instance {
            return Err(violation(path, "const", expected.to_string(), instance));
        }
    }

    Ok(())
}

fn check_numeric(instance: &Value, schema: &Map<String, Value>, path: &str) -> Result<()> {
    let Some(n) = instance.as_f64() else {
        return Ok(());
    };

    let bound = |key| schema.get(key).and_then(Value::as_f64);

    if let Some(min) = bound("minimum").filter(|min| n < *min) {
        return Err(violation(path, "minimum", format!("a number >= {min}"), instance));
    }
    if let Some(max) = bound("maximum").filter(|max| n > *max) {
        return Err(violation(path, "maximum", format!("a number <= {max}"), instance));
    }
    if let Some(min) = bound("exclusiveMinimum").filter(|min| n <= *min) {
        return Err(violation(path, "exclusiveMinimum", format!("a number > {min}"), instance));
    }
    if let Some(max) = bound("exclusiveMaximum").filter(|max| n >= *max) {
        return Err(violation(path, "exclusiveMaximum", format!("a number < {max}"), instance));
    }

    Ok(())
}

fn check_string(instance: &Value, schema: &Map<String, Value>, path: &str) -> Result<()> {
    let min_length = schema.get("minLength").and_then(Value::as_u64);
    let (Some(s), Some(min)) = (instance.as_str(), min_length) else {
        return Ok(());
    };

    if (s.chars().count() as u64) < min {
        let expected = format!("a string of at least {min} char(s)");
        return Err(violation(path, "minLength", expected, instance));
    }

    Ok(())
}

fn violation(
    path: &str,
    keyword: &'static str,
    expected: impl Into<String>,
    instance: &Value,
) -> SchemaValidationError {
    SchemaValidationError {
        path: path.to_string(),
        keyword,
        expected: expected.into(),
        instance: instance.clone(),
    }
}
