//! Checking responses against an operation's declared responses.

use serde::Serialize;
use serde_json::Value;

use crate::client::RequestResult;
use crate::document::SchemaDocument;
use crate::error::{SchemaError, ValidationMismatch};
use crate::operation::OperationTemplate;

/// Root keys copied next to a response schema so its internal `$ref`s resolve.
const REF_ROOTS: &[&str] = &["definitions", "components"];

/// How strictly responses are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// The status code must be declared (exactly, by range, or `default`).
    #[default]
    Status,
    /// Additionally, a JSON body must match the declared response schema.
    Body,
}

/// Check `result` against what `operation` declares.
///
/// # Errors
///
/// Returns `ValidationMismatch::UnexpectedStatus` for an undeclared status
/// and, at [`ValidationLevel::Body`], `ValidationMismatch::BodyMismatch` when
/// the body violates the declared schema.
pub fn check_response(
    document: &SchemaDocument,
    operation: &OperationTemplate,
    result: &RequestResult,
    level: ValidationLevel,
) -> Result<(), ValidationMismatch> {
    let responses = operation.responses();
    let declared = responses
        .lookup(result.status)
        .ok_or_else(|| ValidationMismatch::UnexpectedStatus {
            status: result.status,
            expected: responses.statuses().map(str::to_string).collect(),
        })?;

    if level == ValidationLevel::Status || result.body.is_null() {
        return Ok(());
    }
    let Some(schema) = declared.schema else {
        return Ok(());
    };

    let schema = with_ref_roots(schema, document.root());
    validate_against_schema(&schema, &result.body).map_err(|e| match e {
        BodyError::Schema(message) => ValidationMismatch::InvalidResponseSchema {
            status: result.status,
            message,
        },
        BodyError::Invalid(errors) => ValidationMismatch::BodyMismatch {
            status: result.status,
            errors,
        },
    })
}

/// Why a body failed validation.
#[derive(Debug)]
pub enum BodyError {
    /// The schema itself doesn't compile.
    Schema(String),
    Invalid(Vec<SchemaError>),
}

/// Validate a payload against a JSON schema, collecting every violation.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), BodyError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| BodyError::Schema(e.to_string()))?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BodyError::Invalid(errors))
    }
}

/// Copy the document's definition roots into `schema` so `#/definitions/..`
/// and `#/components/..` references resolve against it.
fn with_ref_roots(schema: &Value, root: &Value) -> Value {
    let mut schema = schema.clone();
    if let Value::Object(obj) = &mut schema {
        for key in REF_ROOTS {
            if let Some(defs) = root.get(*key) {
                obj.entry(key.to_string()).or_insert_with(|| defs.clone());
            }
        }
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::EndpointCollection;
    use crate::types::Method;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn document() -> SchemaDocument {
        SchemaDocument::from_value(
            json!({
                "swagger": "2.0",
                "paths": {
                    "/apps": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "apps",
                                    "schema": { "type": "array", "items": { "$ref": "#/definitions/App" } }
                                },
                                "404": { "description": "none" }
                            }
                        }
                    }
                },
                "definitions": {
                    "App": {
                        "type": "object",
                        "required": ["id"],
                        "properties": { "id": { "type": "string" } }
                    }
                }
            }),
            None,
        )
        .unwrap()
    }

    fn result(status: u16, body: Value) -> RequestResult {
        RequestResult {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    fn check(status: u16, body: Value, level: ValidationLevel) -> Result<(), ValidationMismatch> {
        let doc = document();
        let endpoints = EndpointCollection::build(&doc);
        let op = endpoints.get("/apps", Method::Get).unwrap();
        check_response(&doc, op, &result(status, body), level)
    }

    #[test]
    fn declared_status_passes() {
        assert!(check(200, json!([{ "id": "a" }]), ValidationLevel::Status).is_ok());
        assert!(check(404, Value::Null, ValidationLevel::Body).is_ok());
    }

    #[test]
    fn undeclared_status_fails() {
        match check(500, Value::Null, ValidationLevel::Status) {
            Err(ValidationMismatch::UnexpectedStatus { status, expected }) => {
                assert_eq!(status, 500);
                assert_eq!(expected, vec!["200".to_string(), "404".to_string()]);
            }
            other => panic!("expected unexpected status, got {:?}", other),
        }
    }

    #[test]
    fn status_level_ignores_body() {
        assert!(check(200, json!({ "not": "an array" }), ValidationLevel::Status).is_ok());
    }

    #[test]
    fn body_level_checks_schema_with_refs() {
        assert!(check(200, json!([{ "id": "a" }, { "id": "b" }]), ValidationLevel::Body).is_ok());

        match check(200, json!([{ "id": 1 }, {}]), ValidationLevel::Body) {
            Err(ValidationMismatch::BodyMismatch { status, errors }) => {
                assert_eq!(status, 200);
                assert_eq!(errors.len(), 2);
            }
            other => panic!("expected body mismatch, got {:?}", other),
        }
    }

    #[test]
    fn invalid_schema_is_reported() {
        let result = validate_against_schema(&json!({ "type": 12 }), &json!({}));
        assert!(matches!(result, Err(BodyError::Schema(_))));
    }
}
