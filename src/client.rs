//! Issuing one templated operation against the live API.

use std::collections::BTreeMap;
#[cfg(feature = "remote")]
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::document::SchemaDocument;
use crate::error::{ParameterMismatchError, RequestError};
use crate::operation::OperationTemplate;
use crate::parameter::ParameterTemplate;
use crate::security::{append_cookies, SecurityContext};
use crate::transport::{HttpRequest, RawResponse, Transport};
use crate::types::{CollectionFormat, ParamLocation, ParamType};

#[cfg(feature = "remote")]
use crate::transport::ReqwestTransport;

/// Default per-request timeout (30 seconds).
#[cfg(feature = "remote")]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Concrete values for an operation's parameters, keyed by parameter name.
pub type ParameterValues = BTreeMap<String, Value>;

/// A normalized response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestResult {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body; non-JSON bodies become a string, empty bodies null.
    pub body: Value,
}

impl RequestResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl From<RawResponse> for RequestResult {
    fn from(raw: RawResponse) -> Self {
        let headers = raw
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            status: raw.status,
            headers,
            body: parse_body_value(&raw.body),
        }
    }
}

/// Live connection context: document, base URL, credentials, transport.
pub struct ApiClient {
    document: SchemaDocument,
    base_url: String,
    security: SecurityContext,
    transport: Box<dyn Transport>,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    document: SchemaDocument,
    base_url: Option<String>,
    security: SecurityContext,
    transport: Option<Box<dyn Transport>>,
    #[cfg(feature = "remote")]
    timeout: Duration,
}

impl ApiClientBuilder {
    /// Override the base URL declared by the document.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn security(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    /// Use a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Timeout for the default transport.
    #[cfg(feature = "remote")]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Returns `RequestError::InvalidUrl` if neither the document nor the
    /// builder provides a base URL.
    pub fn build(self) -> Result<ApiClient, RequestError> {
        let base_url = self
            .base_url
            .or_else(|| self.document.base_url().map(str::to_string))
            .ok_or_else(|| RequestError::InvalidUrl {
                url: String::new(),
                message: "document declares no host; a base URL is required".to_string(),
            })?;
        let parsed = Url::parse(&base_url).map_err(|e| RequestError::InvalidUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(RequestError::InvalidUrl {
                url: base_url,
                message: "base URL must be absolute http(s)".to_string(),
            });
        }

        let transport = match self.transport {
            Some(transport) => transport,
            #[cfg(feature = "remote")]
            None => Box::new(ReqwestTransport::new(self.timeout)?),
            #[cfg(not(feature = "remote"))]
            None => {
                return Err(RequestError::Transport {
                    url: base_url,
                    message: "no transport configured".to_string(),
                })
            }
        };

        Ok(ApiClient {
            document: self.document,
            base_url: base_url.trim_end_matches('/').to_string(),
            security: self.security,
            transport,
        })
    }
}

impl ApiClient {
    pub fn builder(document: SchemaDocument) -> ApiClientBuilder {
        ApiClientBuilder {
            document,
            base_url: None,
            security: SecurityContext::anonymous(),
            transport: None,
            #[cfg(feature = "remote")]
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// A client with the document's base URL, no credentials and the
    /// default transport.
    pub fn new(document: SchemaDocument) -> Result<Self, RequestError> {
        Self::builder(document).build()
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    /// Perform `operation` with the given parameter values.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Mismatch` if `values` names a parameter the
    /// operation doesn't have, misses a required one or carries a value of
    /// the wrong type, and `RequestError::Transport` if no response arrives.
    /// Any received status, including 4xx/5xx, is a successful result.
    pub fn request(
        &self,
        operation: &OperationTemplate,
        values: &ParameterValues,
    ) -> Result<RequestResult, RequestError> {
        let request = self.prepare(operation, values)?;
        debug!(method = %request.method, url = %request.url, "sending request");
        let raw = self.transport.send(&request)?;
        Ok(raw.into())
    }

    /// Build the wire request for `operation` without sending it.
    pub fn prepare(
        &self,
        operation: &OperationTemplate,
        values: &ParameterValues,
    ) -> Result<HttpRequest, RequestError> {
        if let Some(name) = values.keys().find(|name| operation.parameter(name).is_none()) {
            return Err(ParameterMismatchError::Unknown { name: name.clone() }.into());
        }

        let mut path_values = Vec::new();
        let mut query = Vec::new();
        let mut headers = Vec::new();
        let mut cookies = Vec::new();
        let mut form = Vec::new();

        for param in operation.parameters().values() {
            let Some(value) = values.get(param.name()) else {
                if param.required() {
                    return Err(ParameterMismatchError::Missing {
                        name: param.name().to_string(),
                    }
                    .into());
                }
                continue;
            };
            let items = serialize_value(param, value)?;
            let joined = || items.join(param.collection_format().separator());

            match param.location() {
                ParamLocation::Path => {
                    path_values.push((format!("{{{}}}", param.name()), joined()));
                }
                ParamLocation::Query | ParamLocation::FormData => {
                    let target = if param.location() == ParamLocation::Query {
                        &mut query
                    } else {
                        &mut form
                    };
                    if param.collection_format() == CollectionFormat::Multi {
                        target.extend(items.iter().map(|v| (param.name().to_string(), v.clone())));
                    } else {
                        target.push((param.name().to_string(), joined()));
                    }
                }
                ParamLocation::Header => headers.push((param.name().to_string(), joined())),
                ParamLocation::Cookie => cookies.push(format!("{}={}", param.name(), joined())),
                ParamLocation::Body => {}
            }
        }

        let url = self.request_url(operation.path(), &path_values)?;
        let mut request = HttpRequest::new(operation.method(), url);
        request.query = query;
        request.headers = headers;
        request.form = form;
        if !cookies.is_empty() {
            append_cookies(&mut request, &cookies.join("; "));
        }
        self.security.apply(&mut request);
        Ok(request)
    }

    /// Base URL plus the path template, each segment filled in and
    /// percent-encoded.
    fn request_url(&self, template: &str, values: &[(String, String)]) -> Result<String, RequestError> {
        let invalid = |message: &str| RequestError::InvalidUrl {
            url: self.base_url.clone(),
            message: message.to_string(),
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid("base URL cannot carry a path"))?;
            segments.pop_if_empty();
            for raw in template.trim_start_matches('/').split('/') {
                let segment = values
                    .iter()
                    .fold(raw.to_string(), |segment, (placeholder, value)| {
                        segment.replace(placeholder, value)
                    });
                if let Some(name) = unfilled_placeholder(&segment) {
                    return Err(ParameterMismatchError::Missing { name }.into());
                }
                segments.push(&segment);
            }
        }
        Ok(url.into())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

/// Render a value as the list of wire strings for `param`.
fn serialize_value(param: &ParameterTemplate, value: &Value) -> Result<Vec<String>, ParameterMismatchError> {
    let invalid = |message: String| ParameterMismatchError::InvalidValue {
        name: param.name().to_string(),
        message,
    };
    let scalar = |v: &Value| -> Result<String, ParameterMismatchError> {
        match v {
            Value::String(s) => Ok(s.clone()),
            v if param.param_type().primitive().accepts(v) => Ok(v.to_string()),
            other => Err(invalid(format!(
                "expected {}, got {}",
                param.param_type().primitive().as_str(),
                crate::types::json_type_name(other)
            ))),
        }
    };

    match (param.param_type(), value) {
        (ParamType::Array(_), Value::Array(items)) => items.iter().map(scalar).collect(),
        (_, Value::Array(_)) => Err(invalid("expected a scalar, got array".to_string())),
        (_, v) => Ok(vec![scalar(v)?]),
    }
}

fn unfilled_placeholder(path: &str) -> Option<String> {
    let start = path.find('{')?;
    let end = path[start..].find('}')?;
    Some(path[start + 1..start + end].to_string())
}

fn parse_body_value(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
