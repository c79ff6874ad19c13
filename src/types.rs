//! Core types shared by the document model and the request engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTTP method of an operation.
///
/// Variant order is the order in which operations of one path are expanded
/// and iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl Method {
    /// Every method a path item may declare.
    pub const ALL: &'static [Method] = &[
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
    ];

    /// Returns the path item key for this method (e.g. `"get"`).
    pub fn key(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
        }
    }

    /// Returns the method as sent on the wire (e.g. `"GET"`).
    pub fn as_http(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
        }
    }

    /// Parse a method name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.key().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_http())
    }
}

/// Scalar type a parameter or array item can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Primitive::String),
            "integer" => Some(Primitive::Integer),
            "number" => Some(Primitive::Number),
            "boolean" => Some(Primitive::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
        }
    }

    /// Whether a JSON value is acceptable for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Primitive::String => value.is_string(),
            Primitive::Integer => value.is_i64() || value.is_u64(),
            Primitive::Number => value.is_number(),
            Primitive::Boolean => value.is_boolean(),
        }
    }
}

/// Declared type of a flat parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Primitive),
}

impl ParamType {
    /// The scalar type of the parameter, or of its items for arrays.
    pub fn primitive(&self) -> Primitive {
        match self {
            ParamType::String => Primitive::String,
            ParamType::Integer => Primitive::Integer,
            ParamType::Number => Primitive::Number,
            ParamType::Boolean => Primitive::Boolean,
            ParamType::Array(items) => *items,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ParamType::Array(_))
    }
}

impl From<Primitive> for ParamType {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::String => ParamType::String,
            Primitive::Integer => ParamType::Integer,
            Primitive::Number => ParamType::Number,
            Primitive::Boolean => ParamType::Boolean,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Array(items) => write!(f, "array[{}]", items.as_str()),
            other => f.write_str(other.primitive().as_str()),
        }
    }
}

impl Serialize for ParamType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    FormData,
    Body,
}

impl ParamLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            "formData" => Some(ParamLocation::FormData),
            "body" => Some(ParamLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
            ParamLocation::FormData => "formData",
            ParamLocation::Body => "body",
        }
    }
}

/// How array values are serialized (Swagger `collectionFormat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    #[default]
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// One `name=value` pair per item; only meaningful for query and form data.
    Multi,
}

impl CollectionFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(CollectionFormat::Csv),
            "ssv" => Some(CollectionFormat::Ssv),
            "tsv" => Some(CollectionFormat::Tsv),
            "pipes" => Some(CollectionFormat::Pipes),
            "multi" => Some(CollectionFormat::Multi),
            _ => None,
        }
    }

    /// Item separator for the joined formats.
    pub fn separator(&self) -> &'static str {
        match self {
            CollectionFormat::Csv | CollectionFormat::Multi => ",",
            CollectionFormat::Ssv => " ",
            CollectionFormat::Tsv => "\t",
            CollectionFormat::Pipes => "|",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse("DELETE"), Some(Method::Delete));
        assert_eq!(Method::parse("Patch"), Some(Method::Patch));
        assert_eq!(Method::parse("trace"), None);
    }

    #[test]
    fn method_order_follows_expansion_order() {
        let mut methods = vec![Method::Patch, Method::Delete, Method::Get, Method::Put];
        methods.sort();
        assert_eq!(
            methods,
            vec![Method::Get, Method::Put, Method::Delete, Method::Patch]
        );
    }

    #[test]
    fn param_type_display() {
        assert_eq!(ParamType::String.to_string(), "string");
        assert_eq!(ParamType::Integer.to_string(), "integer");
        assert_eq!(
            ParamType::Array(Primitive::Boolean).to_string(),
            "array[boolean]"
        );
    }

    #[test]
    fn primitive_accepts_matching_values() {
        assert!(Primitive::String.accepts(&json!("x")));
        assert!(Primitive::Integer.accepts(&json!(3)));
        assert!(!Primitive::Integer.accepts(&json!(3.5)));
        assert!(Primitive::Number.accepts(&json!(3.5)));
        assert!(Primitive::Boolean.accepts(&json!(false)));
        assert!(!Primitive::Boolean.accepts(&json!("false")));
    }

    #[test]
    fn location_parse() {
        assert_eq!(ParamLocation::parse("formData"), Some(ParamLocation::FormData));
        assert_eq!(ParamLocation::parse("path"), Some(ParamLocation::Path));
        assert_eq!(ParamLocation::parse("matrix"), None);
    }

    #[test]
    fn collection_format_separators() {
        assert_eq!(CollectionFormat::default().separator(), ",");
        assert_eq!(CollectionFormat::parse("pipes").unwrap().separator(), "|");
        assert_eq!(CollectionFormat::parse("ssv").unwrap().separator(), " ");
        assert_eq!(CollectionFormat::parse("xml"), None);
    }
}
