//! Operation templates: one (method, path) pair with its flat parameters.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostic;
use crate::document::{OperationHandle, SchemaDocument, SpecVersion};
use crate::parameter::{ParameterResolution, ParameterTemplate};
use crate::types::{Method, ParamLocation};

/// Diagnostic subject for an OpenAPI 3 `requestBody`.
const REQUEST_BODY: &str = "requestBody";

/// Declared responses of an operation, keyed by status (`"200"`, `"2XX"`,
/// `"default"`), with the body schema when one is declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSpec {
    responses: IndexMap<String, Option<Value>>,
}

/// The declared response a status code falls under.
#[derive(Debug, Clone, Copy)]
pub struct ResponseMatch<'a> {
    pub key: &'a str,
    pub schema: Option<&'a Value>,
}

impl ResponseSpec {
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Declared status keys in document order.
    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(String::as_str)
    }

    /// Find the declared response for `status`: exact code first, then a
    /// `NXX` range, then `default`.
    pub fn lookup(&self, status: u16) -> Option<ResponseMatch<'_>> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);

        self.responses
            .get_key_value(exact.as_str())
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&range))
            })
            .or_else(|| self.responses.get_key_value("default"))
            .map(|(key, schema)| ResponseMatch {
                key,
                schema: schema.as_ref(),
            })
    }
}

impl Serialize for ResponseSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.statuses())
    }
}

/// One schema-declared operation with its resolved flat parameters.
///
/// Parameters that need body or nested schema resolution are never stored;
/// each one leaves a [`Diagnostic`] instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationTemplate {
    method: Method,
    path: String,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    operation_id: Option<String>,
    parameters: IndexMap<String, ParameterTemplate>,
    responses: ResponseSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
    /// Required parameters that could not be templated.
    #[serde(skip)]
    unsupported_required: Vec<String>,
    #[serde(skip)]
    definition: Value,
}

impl OperationTemplate {
    /// Build the template for one raw operation of `document`.
    ///
    /// Never fails: unsupported or invalid parameters are left out and
    /// reported through [`OperationTemplate::diagnostics`].
    pub fn build(document: &SchemaDocument, handle: OperationHandle<'_>) -> Self {
        debug!(method = %handle.method, path = handle.path, "building operation template");

        let mut template = Self {
            method: handle.method,
            path: handle.path.to_string(),
            operation_id: handle
                .definition
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            parameters: IndexMap::new(),
            responses: collect_responses(document, handle.definition),
            diagnostics: Vec::new(),
            unsupported_required: Vec::new(),
            definition: handle.definition.clone(),
        };

        for raw in merged_parameters(document, handle) {
            template.add_parameter(document, raw);
        }
        template.check_request_body(document);
        template.check_placeholders();
        template
    }

    fn add_parameter(&mut self, document: &SchemaDocument, raw: &Value) {
        let definition = match document.resolve(raw) {
            Ok(definition) => definition,
            Err(e) => {
                warn!(operation = %self, error = %e, "skipping unresolved parameter");
                self.diagnostics
                    .push(Diagnostic::warning("W004", ref_name(raw), e.to_string()));
                return;
            }
        };
        let name = definition.get("name").and_then(Value::as_str).unwrap_or("");
        debug!(parameter = name, "handling parameter");

        match ParameterTemplate::from_definition(definition) {
            Ok(ParameterResolution::Resolved(param)) => {
                if self.parameters.contains_key(param.name()) {
                    self.diagnostics.push(Diagnostic::warning(
                        "W003",
                        param.name(),
                        "duplicate parameter name in another location",
                    ));
                    if param.required() {
                        self.mark_unsupported(param.name());
                    }
                    return;
                }
                self.parameters.insert(param.name().to_string(), param);
            }
            Ok(ParameterResolution::Unsupported(diag)) => {
                warn!(operation = %self, parameter = name, "{}", diag.message);
                if is_required(definition) {
                    self.mark_unsupported(name);
                }
                self.diagnostics.push(diag);
            }
            Err(e) => {
                warn!(operation = %self, error = %e, "skipping invalid parameter");
                if is_required(definition) {
                    self.mark_unsupported(if name.is_empty() { "<unnamed>" } else { name });
                }
                self.diagnostics
                    .push(Diagnostic::warning("W003", name, e.to_string()));
            }
        }
    }

    /// OpenAPI 3 request bodies get the same treatment as Swagger `in: body`.
    fn check_request_body(&mut self, document: &SchemaDocument) {
        let Some(raw) = self.definition.get("requestBody") else {
            return;
        };
        let required = document
            .resolve(raw)
            .map(|body| body.get("required").and_then(Value::as_bool).unwrap_or(false))
            .unwrap_or(false);

        warn!(operation = %self, "request body is not supported");
        self.diagnostics.push(Diagnostic::warning(
            "W001",
            REQUEST_BODY,
            "unsupported request body",
        ));
        if required {
            self.mark_unsupported(REQUEST_BODY);
        }
    }

    /// Every `{placeholder}` must be backed by a path parameter, otherwise
    /// no request can be formed.
    fn check_placeholders(&mut self) {
        let missing: Vec<String> = placeholders(&self.path)
            .filter(|name| {
                !self
                    .parameters
                    .get(*name)
                    .is_some_and(|p| p.location() == ParamLocation::Path)
            })
            .map(str::to_string)
            .collect();
        for name in missing {
            self.mark_unsupported(&name);
        }
    }

    fn mark_unsupported(&mut self, name: &str) {
        if !self.unsupported_required.iter().any(|n| n == name) {
            self.unsupported_required.push(name.to_string());
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Path template, possibly with `{placeholder}` segments.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Flat parameters keyed by name, in declaration order.
    pub fn parameters(&self) -> &IndexMap<String, ParameterTemplate> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterTemplate> {
        self.parameters.get(name)
    }

    pub fn responses(&self) -> &ResponseSpec {
        &self.responses
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Names of required parameters that were left out of the template.
    pub fn unsupported_required(&self) -> &[String] {
        &self.unsupported_required
    }

    /// The raw operation definition this template was built from.
    pub fn definition(&self) -> &Value {
        &self.definition
    }
}

impl fmt::Display for OperationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Path-level parameters followed by operation-level ones; an operation-level
/// parameter replaces a path-level one with the same name and location.
fn merged_parameters<'a>(document: &'a SchemaDocument, handle: OperationHandle<'a>) -> Vec<&'a Value> {
    let own: &[Value] = handle
        .definition
        .get("parameters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let identity = |raw: &Value| -> Option<(String, String)> {
        let def = document.resolve(raw).ok()?;
        Some((
            def.get("name")?.as_str()?.to_string(),
            def.get("in")?.as_str()?.to_string(),
        ))
    };
    let overridden: Vec<(String, String)> = own.iter().filter_map(identity).collect();

    handle
        .path_parameters
        .iter()
        .filter(|raw| identity(*raw).map_or(true, |id| !overridden.contains(&id)))
        .chain(own.iter())
        .collect()
}

fn is_required(definition: &Value) -> bool {
    definition.get("in").and_then(Value::as_str) == Some("path")
        || definition
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false)
}

/// Names of the `{placeholder}` segments of a path template.
fn placeholders(path: &str) -> impl Iterator<Item = &str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
}

fn ref_name(raw: &Value) -> String {
    raw.get("$ref")
        .and_then(Value::as_str)
        .unwrap_or("<parameter>")
        .to_string()
}

fn collect_responses(document: &SchemaDocument, definition: &Value) -> ResponseSpec {
    let Some(Value::Object(declared)) = definition.get("responses") else {
        return ResponseSpec::default();
    };

    let responses = declared
        .iter()
        .map(|(status, response)| {
            let schema = document
                .resolve(response)
                .ok()
                .and_then(|r| response_schema(document.version(), r))
                .cloned();
            (status.clone(), schema)
        })
        .collect();

    ResponseSpec { responses }
}

fn response_schema(version: SpecVersion, response: &Value) -> Option<&Value> {
    match version {
        SpecVersion::Swagger2 => response.get("schema"),
        SpecVersion::OpenApi3 => {
            let content = response.get("content")?.as_object()?;
            content
                .get("application/json")
                .or_else(|| {
                    content
                        .iter()
                        .find(|(media, _)| media.ends_with("json"))
                        .map(|(_, v)| v)
                })?
                .get("schema")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamLocation, ParamType};
    use serde_json::json;

    fn build(doc: Value, path: &str, method: Method) -> OperationTemplate {
        let document = SchemaDocument::from_value(doc, None).unwrap();
        let handle = document.get_operation(path, method).unwrap();
        OperationTemplate::build(&document, handle)
    }

    #[test]
    fn fully_typed_parameters_in_declaration_order() {
        let op = build(
            json!({
                "swagger": "2.0",
                "paths": {
                    "/apps/{appid}": {
                        "get": {
                            "operationId": "getApp",
                            "parameters": [
                                { "name": "appid", "in": "path", "type": "string", "required": true },
                                { "name": "verbose", "in": "query", "type": "boolean" },
                                { "name": "X-Trace", "in": "header", "type": "integer" }
                            ],
                            "responses": { "200": { "description": "ok" } }
                        }
                    }
                }
            }),
            "/apps/{appid}",
            Method::Get,
        );

        let names: Vec<&str> = op.parameters().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["appid", "verbose", "X-Trace"]);
        assert_eq!(op.parameter("appid").unwrap().param_type(), ParamType::String);
        assert_eq!(op.parameter("verbose").unwrap().param_type(), ParamType::Boolean);
        assert_eq!(
            op.parameter("X-Trace").unwrap().location(),
            ParamLocation::Header
        );
        assert_eq!(op.operation_id(), Some("getApp"));
        assert!(op.diagnostics().is_empty());
        assert_eq!(op.to_string(), "GET /apps/{appid}");
    }

    #[test]
    fn body_parameter_is_excluded_with_diagnostic() {
        let op = build(
            json!({
                "swagger": "2.0",
                "paths": {
                    "/example/{id}": {
                        "put": {
                            "parameters": [
                                { "name": "id", "in": "path", "type": "integer", "required": true },
                                { "name": "payload", "in": "body", "required": true,
                                  "schema": { "$ref": "#/definitions/Example" } }
                            ],
                            "responses": { "204": { "description": "updated" } }
                        }
                    }
                },
                "definitions": { "Example": { "type": "object" } }
            }),
            "/example/{id}",
            Method::Put,
        );

        assert_eq!(op.parameters().len(), 1);
        assert!(op.parameter("payload").is_none());
        assert_eq!(op.diagnostics().len(), 1);
        assert_eq!(op.diagnostics()[0].code, "W001");
        assert_eq!(op.unsupported_required().to_vec(), vec!["payload".to_string()]);
    }

    #[test]
    fn invalid_and_unresolved_parameters_degrade() {
        let op = build(
            json!({
                "swagger": "2.0",
                "paths": {
                    "/items": {
                        "get": {
                            "parameters": [
                                { "name": "untyped", "in": "query" },
                                { "$ref": "#/parameters/missing" },
                                { "name": "page", "in": "query", "type": "integer" }
                            ]
                        }
                    }
                }
            }),
            "/items",
            Method::Get,
        );

        let names: Vec<&str> = op.parameters().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["page"]);
        let codes: Vec<&str> = op.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["W003", "W004"]);
        assert!(op.unsupported_required().is_empty());
    }

    #[test]
    fn untemplatable_required_parameters_are_recorded() {
        let doc = json!({
            "swagger": "2.0",
            "paths": {
                "/items/{id}": {
                    "get": {
                        "parameters": [{ "name": "id", "in": "path", "required": true }],
                        "responses": { "200": { "description": "ok" } }
                    }
                },
                "/orders/{orderId}": {
                    "get": {
                        "parameters": [{ "$ref": "#/parameters/orderId" }],
                        "responses": { "200": { "description": "ok" } }
                    }
                },
                "/search": {
                    "get": {
                        "parameters": [
                            { "name": "q", "in": "query", "type": "string" },
                            { "name": "q", "in": "header", "type": "string", "required": true }
                        ],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        });

        let untyped = build(doc.clone(), "/items/{id}", Method::Get);
        assert!(untyped.parameters().is_empty());
        assert_eq!(untyped.diagnostics()[0].code, "W003");
        assert_eq!(untyped.unsupported_required().to_vec(), vec!["id".to_string()]);

        let unresolved = build(doc.clone(), "/orders/{orderId}", Method::Get);
        assert_eq!(unresolved.diagnostics()[0].code, "W004");
        assert_eq!(
            unresolved.unsupported_required().to_vec(),
            vec!["orderId".to_string()]
        );

        let duplicate = build(doc, "/search", Method::Get);
        assert_eq!(duplicate.parameters().len(), 1);
        assert_eq!(duplicate.diagnostics()[0].code, "W003");
        assert_eq!(duplicate.unsupported_required().to_vec(), vec!["q".to_string()]);
    }

    #[test]
    fn request_body_is_unsupported() {
        let doc = json!({
            "openapi": "3.0.0",
            "components": {
                "requestBodies": {
                    "Item": {
                        "required": true,
                        "content": { "application/json": { "schema": { "type": "object" } } }
                    }
                }
            },
            "paths": {
                "/items": {
                    "put": {
                        "requestBody": { "$ref": "#/components/requestBodies/Item" },
                        "responses": { "204": { "description": "stored" } }
                    },
                    "patch": {
                        "requestBody": {
                            "content": { "application/json": { "schema": { "type": "object" } } }
                        },
                        "responses": { "204": { "description": "patched" } }
                    }
                }
            }
        });

        let put = build(doc.clone(), "/items", Method::Put);
        assert_eq!(put.diagnostics().len(), 1);
        assert_eq!(put.diagnostics()[0].code, "W001");
        assert_eq!(put.diagnostics()[0].subject, "requestBody");
        assert_eq!(put.unsupported_required().to_vec(), vec!["requestBody".to_string()]);

        let patch = build(doc, "/items", Method::Patch);
        assert_eq!(patch.diagnostics()[0].code, "W001");
        assert!(patch.unsupported_required().is_empty());
    }

    #[test]
    fn path_level_parameters_merge_and_override() {
        let op = build(
            json!({
                "swagger": "2.0",
                "parameters": {
                    "appid": { "name": "appid", "in": "path", "type": "string", "required": true }
                },
                "paths": {
                    "/apps/{appid}": {
                        "parameters": [
                            { "$ref": "#/parameters/appid" },
                            { "name": "lang", "in": "query", "type": "string" }
                        ],
                        "get": {
                            "parameters": [
                                { "name": "lang", "in": "query", "type": "string", "enum": ["en", "fr"] }
                            ]
                        }
                    }
                }
            }),
            "/apps/{appid}",
            Method::Get,
        );

        let names: Vec<&str> = op.parameters().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["appid", "lang"]);
        assert_eq!(op.parameter("lang").unwrap().example(), Some(&json!("en")));
    }

    #[test]
    fn responses_lookup_exact_range_default() {
        let op = build(
            json!({
                "openapi": "3.0.0",
                "paths": {
                    "/things": {
                        "get": {
                            "responses": {
                                "200": {
                                    "description": "ok",
                                    "content": { "application/json": { "schema": { "type": "array" } } }
                                },
                                "4XX": { "description": "client error" },
                                "default": { "description": "anything else" }
                            }
                        }
                    }
                }
            }),
            "/things",
            Method::Get,
        );

        let responses = op.responses();
        let ok = responses.lookup(200).unwrap();
        assert_eq!(ok.key, "200");
        assert_eq!(ok.schema, Some(&json!({ "type": "array" })));
        assert_eq!(responses.lookup(404).unwrap().key, "4XX");
        assert_eq!(responses.lookup(503).unwrap().key, "default");
        let statuses: Vec<&str> = responses.statuses().collect();
        assert_eq!(statuses, vec!["200", "4XX", "default"]);
    }

    #[test]
    fn missing_responses_are_empty() {
        let op = build(
            json!({ "swagger": "2.0", "paths": { "/x": { "delete": {} } } }),
            "/x",
            Method::Delete,
        );
        assert!(op.responses().is_empty());
        assert!(op.responses().lookup(204).is_none());
    }
}
