//! Parameter values for driven requests: synthesized or from fixtures.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{json, Value};

use crate::client::ParameterValues;
use crate::error::LoadError;
use crate::loader::load_document;
use crate::operation::OperationTemplate;
use crate::parameter::ParameterTemplate;
use crate::types::{Method, Primitive};

/// Externally supplied values, keyed by operation.
///
/// The JSON form maps `"METHOD /path"` to an object of parameter values:
///
/// ```json
/// { "GET /apps/{appid}": { "appid": "known-app" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    entries: BTreeMap<(Method, String), ParameterValues>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, path: impl Into<String>, values: ParameterValues) {
        self.entries.insert((method, path.into()), values);
    }

    pub fn get(&self, operation: &OperationTemplate) -> Option<&ParameterValues> {
        self.entries
            .get(&(operation.method(), operation.path().to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse fixtures from their JSON form.
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let invalid = |message: String| LoadError::InvalidDocument { message };
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("fixtures must be an object".to_string()))?;

        let mut fixtures = Self::new();
        for (key, values) in obj {
            let (method, path) = key
                .split_once(' ')
                .and_then(|(m, p)| Some((Method::parse(m)?, p.trim())))
                .ok_or_else(|| invalid(format!("fixture key \"{}\" is not \"METHOD /path\"", key)))?;
            let values = values
                .as_object()
                .ok_or_else(|| invalid(format!("fixture \"{}\" must be an object", key)))?
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            fixtures.insert(method, path, values);
        }
        Ok(fixtures)
    }

    /// Load fixtures from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_value(&load_document(path)?)
    }
}

/// A representative value for `param`: its declared example if any,
/// otherwise a fixed value of its type.
pub fn synthesize(param: &ParameterTemplate) -> Value {
    if let Some(example) = param.example() {
        return example.clone();
    }
    let scalar = match param.param_type().primitive() {
        Primitive::String => json!("test_string"),
        Primitive::Integer => json!(1),
        Primitive::Number => json!(1.5),
        Primitive::Boolean => json!(true),
    };
    if param.param_type().is_array() {
        Value::Array(vec![scalar])
    } else {
        scalar
    }
}

/// Values for one request: fixture values win, the remaining required
/// parameters (and optional ones when `include_optional`) are synthesized.
///
/// Fixture entries that don't name a templated parameter are dropped.
pub fn values_for(
    operation: &OperationTemplate,
    fixtures: &Fixtures,
    include_optional: bool,
) -> ParameterValues {
    let supplied = fixtures.get(operation);

    operation
        .parameters()
        .values()
        .filter_map(|param| {
            let value = supplied
                .and_then(|s| s.get(param.name()).cloned())
                .or_else(|| (param.required() || include_optional).then(|| synthesize(param)))?;
            Some((param.name().to_string(), value))
        })
        .collect()
}
