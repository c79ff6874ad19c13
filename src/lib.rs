//! Swagger Tester
//!
//! Exercise a running web API against its Swagger 2.0 / OpenAPI 3 description.
//!
//! The document is loaded once into a [`SchemaDocument`], expanded into an
//! [`EndpointCollection`] of [`OperationTemplate`]s (one per declared path and
//! method, with flat typed [`ParameterTemplate`]s), and a [`Driver`] then sends
//! one request per operation through an [`ApiClient`] and checks each response
//! against the declared statuses.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use swagger_tester::{EndpointCollection, Method, ParamType, SchemaDocument};
//!
//! let document = SchemaDocument::from_value(
//!     json!({
//!         "swagger": "2.0",
//!         "host": "127.0.0.1:5000",
//!         "basePath": "/api",
//!         "paths": {
//!             "/apps/{appid}": {
//!                 "get": {
//!                     "parameters": [
//!                         { "name": "appid", "in": "path", "type": "string", "required": true }
//!                     ],
//!                     "responses": { "200": { "description": "the app" } }
//!                 }
//!             }
//!         }
//!     }),
//!     None,
//! )
//! .unwrap();
//!
//! let endpoints = EndpointCollection::build(&document);
//! let op = endpoints.get("/apps/{appid}", Method::Get).unwrap();
//! assert_eq!(op.parameter("appid").unwrap().param_type(), ParamType::String);
//! ```
//!
//! # Unsupported parameters
//!
//! Body parameters, file uploads and parameters described by nested schemas
//! are left out of the template and reported as [`Diagnostic`]s. An operation
//! missing a *required* parameter this way is skipped by the driver.

mod client;
mod diagnostics;
mod document;
mod driver;
mod endpoints;
mod error;
mod loader;
mod operation;
mod parameter;
mod security;
mod transport;
mod types;
mod validator;
mod values;

pub use client::{ApiClient, ApiClientBuilder, ParameterValues, RequestResult};
pub use diagnostics::{Diagnostic, Severity};
pub use document::{OperationHandle, PathItem, SchemaDocument, SecurityScheme, SpecVersion};
pub use driver::{Driver, DriverOptions, OperationReport, Outcome, TestReport};
pub use endpoints::EndpointCollection;
pub use error::{
    InvalidParameterError, LoadError, ParameterMismatchError, RequestError, RunError, SchemaError,
    SecurityError, ValidationMismatch,
};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, navigate_fragment};
pub use operation::{OperationTemplate, ResponseMatch, ResponseSpec};
pub use parameter::{ParameterResolution, ParameterTemplate};
pub use security::{Credential, SecurityContext};
pub use transport::{HttpRequest, RawResponse, Transport};
pub use types::{json_type_name, CollectionFormat, Method, ParamLocation, ParamType, Primitive};
pub use validator::{check_response, validate_against_schema, BodyError, ValidationLevel};
pub use values::{synthesize, values_for, Fixtures};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
#[cfg(feature = "remote")]
pub use transport::ReqwestTransport;

/// Load `source`, expand it and drive every operation against the
/// document's own base URL with default options.
///
/// # Errors
///
/// Returns `RunError` if the document can't be loaded or declares no usable
/// base URL. Per-operation failures are in the returned report.
#[cfg(feature = "remote")]
pub fn validate_schema(source: &str) -> Result<TestReport, RunError> {
    let document = SchemaDocument::load(source)?;
    let client = ApiClient::new(document)?;
    let endpoints = EndpointCollection::from_client(&client);
    Ok(Driver::default().run(&endpoints, &client))
}
