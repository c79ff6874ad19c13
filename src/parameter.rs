//! Flat, fully typed parameter templates.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::error::InvalidParameterError;
use crate::types::{CollectionFormat, ParamLocation, ParamType, Primitive};

/// Schema keywords that make a parameter schema more than a flat primitive.
const NESTED_KEYWORDS: &[&str] = &["$ref", "properties", "allOf", "anyOf", "oneOf", "not"];

/// One declared parameter with a name and a primitive (or array) type.
///
/// Equality, hashing and `Display` only look at `name` and `type`.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterTemplate {
    name: String,
    #[serde(rename = "type")]
    param_type: ParamType,
    #[serde(rename = "in")]
    location: ParamLocation,
    required: bool,
    #[serde(skip)]
    collection_format: CollectionFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,
}

/// Outcome of templating one raw parameter definition.
#[derive(Debug, Clone)]
pub enum ParameterResolution {
    Resolved(ParameterTemplate),
    /// The parameter needs body or nested schema resolution and is left out.
    Unsupported(Diagnostic),
}

impl ParameterTemplate {
    /// Create a query parameter that is not required.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameterError::EmptyName` if `name` is empty.
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Result<Self, InvalidParameterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidParameterError::EmptyName);
        }
        Ok(Self {
            name,
            param_type,
            location: ParamLocation::Query,
            required: false,
            collection_format: CollectionFormat::default(),
            example: None,
        })
    }

    /// Set the location. Path parameters are always required.
    pub fn with_location(mut self, location: ParamLocation) -> Self {
        self.location = location;
        if location == ParamLocation::Path {
            self.required = true;
        }
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParamLocation::Path;
        self
    }

    pub fn with_collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }

    pub fn with_example(mut self, example: Option<Value>) -> Self {
        self.example = example;
        self
    }

    /// Template a raw parameter definition (already `$ref`-resolved).
    ///
    /// Body parameters, file uploads and parameters described by a nested
    /// schema come back as [`ParameterResolution::Unsupported`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameterError` if the definition lacks a name, a
    /// location or a type, or names a type outside the primitive set.
    pub fn from_definition(definition: &Value) -> Result<ParameterResolution, InvalidParameterError> {
        let name = match definition.get("name").and_then(Value::as_str) {
            Some("") => return Err(InvalidParameterError::EmptyName),
            Some(name) => name,
            None => return Err(InvalidParameterError::MissingName),
        };

        let location_name = definition.get("in").and_then(Value::as_str).unwrap_or("");
        let location =
            ParamLocation::parse(location_name).ok_or_else(|| InvalidParameterError::UnknownLocation {
                name: name.to_string(),
                location: location_name.to_string(),
            })?;

        if location == ParamLocation::Body || definition.get("content").is_some() {
            return Ok(unsupported_schema(name));
        }

        // Swagger 2 puts the type on the parameter, OpenAPI 3 in a `schema`.
        let typed = match definition.get("schema") {
            Some(schema) if is_nested(schema) => return Ok(unsupported_schema(name)),
            Some(schema) => schema,
            None => definition,
        };

        let type_name = typed
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| InvalidParameterError::MissingType {
                name: name.to_string(),
            })?;

        let param_type = match type_name {
            "file" => {
                return Ok(ParameterResolution::Unsupported(Diagnostic::warning(
                    "W002",
                    name,
                    "file upload parameters are not supported",
                )))
            }
            "object" => return Ok(unsupported_schema(name)),
            "array" => match typed.get("items") {
                Some(items) if is_nested(items) => return Ok(unsupported_schema(name)),
                Some(items) => items
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(Primitive::parse)
                    .map(ParamType::Array)
                    .ok_or_else(|| InvalidParameterError::UnsupportedItems {
                        name: name.to_string(),
                    })?,
                None => {
                    return Err(InvalidParameterError::UnsupportedItems {
                        name: name.to_string(),
                    })
                }
            },
            other => Primitive::parse(other).map(ParamType::from).ok_or_else(|| {
                InvalidParameterError::UnknownType {
                    name: name.to_string(),
                    type_name: other.to_string(),
                }
            })?,
        };

        let required = definition
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let template = Self::new(name, param_type)?
            .with_location(location)
            .with_required(required)
            .with_collection_format(collection_format(definition, location))
            .with_example(example(definition, typed));

        Ok(ParameterResolution::Resolved(template))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn location(&self) -> ParamLocation {
        self.location
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn collection_format(&self) -> CollectionFormat {
        self.collection_format
    }

    /// Declared `default`, `example` or first `enum` value, if any.
    pub fn example(&self) -> Option<&Value> {
        self.example.as_ref()
    }
}

impl PartialEq for ParameterTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.param_type == other.param_type
    }
}

impl Eq for ParameterTemplate {}

impl Hash for ParameterTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.param_type.hash(state);
    }
}

impl fmt::Display for ParameterTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.param_type)
    }
}

fn unsupported_schema(name: &str) -> ParameterResolution {
    ParameterResolution::Unsupported(Diagnostic::warning(
        "W001",
        name,
        "unsupported schema parameter",
    ))
}

fn is_nested(schema: &Value) -> bool {
    match schema {
        Value::Object(obj) => {
            NESTED_KEYWORDS.iter().any(|k| obj.contains_key(*k))
                || obj.get("type").and_then(Value::as_str) == Some("object")
        }
        _ => true,
    }
}

fn collection_format(definition: &Value, location: ParamLocation) -> CollectionFormat {
    if let Some(format) = definition
        .get("collectionFormat")
        .and_then(Value::as_str)
        .and_then(CollectionFormat::parse)
    {
        return format;
    }

    if definition.get("schema").is_none() {
        return CollectionFormat::Csv;
    }

    // OpenAPI 3 style/explode; form style explodes by default.
    let style = definition.get("style").and_then(Value::as_str);
    let style = style.unwrap_or(match location {
        ParamLocation::Query | ParamLocation::Cookie => "form",
        _ => "simple",
    });
    let explode = definition
        .get("explode")
        .and_then(Value::as_bool)
        .unwrap_or(style == "form");

    match style {
        "form" if explode => CollectionFormat::Multi,
        "spaceDelimited" => CollectionFormat::Ssv,
        "pipeDelimited" => CollectionFormat::Pipes,
        _ => CollectionFormat::Csv,
    }
}

fn example(definition: &Value, typed: &Value) -> Option<Value> {
    let first_enum = |v: &Value| {
        v.get("enum")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .cloned()
    };

    typed
        .get("default")
        .or_else(|| definition.get("example"))
        .or_else(|| typed.get("example"))
        .cloned()
        .or_else(|| first_enum(typed))
        .or_else(|| {
            typed
                .get("items")
                .and_then(first_enum)
                .map(|item| Value::Array(vec![item]))
        })
        .filter(|v| !matches!(v, Value::Null | Value::Object(_)))
}
