//! Normalized schema document.
//!
//! A [`SchemaDocument`] is parsed once from a Swagger 2.0 or OpenAPI 3.x
//! description and never mutated afterwards. Path items are flattened into a
//! plain `path -> method -> raw operation` map so that callers ask
//! [`SchemaDocument::has_method`] / [`SchemaDocument::get_operation`] instead
//! of poking at the raw JSON.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use url::{ParseError, Url};

use crate::error::LoadError;
use crate::loader::{is_url, load_document_auto, navigate_fragment};
use crate::types::Method;

/// Maximum number of `$ref` hops followed before giving up.
const MAX_REF_DEPTH: usize = 16;

/// Which description format the document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

/// One path of the document with its operations.
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    /// Parameters declared on the path item, shared by all its operations.
    pub parameters: Vec<Value>,
    /// Raw operation definitions keyed by method.
    pub operations: BTreeMap<Method, Value>,
}

/// Handle to one raw operation, sufficient to template and issue it.
#[derive(Debug, Clone, Copy)]
pub struct OperationHandle<'a> {
    pub path: &'a str,
    pub method: Method,
    pub definition: &'a Value,
    pub path_parameters: &'a [Value],
}

/// Kind of a declared security scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityScheme {
    ApiKey { name: String, location: String },
    Basic,
    Bearer,
    OAuth2,
    Other(String),
}

/// A loaded and normalized schema document.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    root: Value,
    version: SpecVersion,
    paths: IndexMap<String, PathItem>,
    base_url: Option<String>,
    security_schemes: IndexMap<String, SecurityScheme>,
}

impl SchemaDocument {
    /// Load a document from a file path or URL.
    ///
    /// When the document is fetched from a URL and doesn't name a host, the
    /// host of that URL is used for the base URL.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the source is unreachable, isn't JSON, or isn't
    /// a Swagger/OpenAPI description.
    pub fn load(source: &str) -> Result<Self, LoadError> {
        debug!(source, "loading schema document");
        let root = load_document_auto(source)?;
        let origin = if is_url(source) { Some(source) } else { None };
        Self::from_value(root, origin)
    }

    /// Normalize an already-parsed document.
    ///
    /// `origin` is the URL the document came from, if any.
    pub fn from_value(root: Value, origin: Option<&str>) -> Result<Self, LoadError> {
        if !root.is_object() {
            return Err(invalid("document root must be an object"));
        }
        let version = detect_version(&root)?;

        let paths = match root.get("paths") {
            Some(Value::Object(map)) => {
                let mut paths = IndexMap::with_capacity(map.len());
                for (path, item) in map {
                    paths.insert(path.clone(), normalize_path_item(&root, path, item)?);
                }
                paths
            }
            Some(_) => return Err(invalid("\"paths\" must be an object")),
            None if version == SpecVersion::OpenApi3 => IndexMap::new(),
            None => return Err(invalid("missing \"paths\"")),
        };
        debug!(count = paths.len(), "found paths");

        let base_url = match version {
            SpecVersion::Swagger2 => swagger_base_url(&root, origin),
            SpecVersion::OpenApi3 => openapi_base_url(&root, origin),
        };

        Ok(Self {
            security_schemes: collect_security_schemes(&root, version),
            root,
            version,
            paths,
            base_url,
        })
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    /// The raw document, for resolving `$ref`s and response schemas.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The normalized `path -> operations` structure, in document order.
    pub fn path_map(&self) -> &IndexMap<String, PathItem> {
        &self.paths
    }

    /// Path strings in document order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn has_method(&self, path: &str, method: Method) -> bool {
        self.paths
            .get(path)
            .is_some_and(|item| item.operations.contains_key(&method))
    }

    pub fn get_operation(&self, path: &str, method: Method) -> Option<OperationHandle<'_>> {
        let (path, item) = self.paths.get_key_value(path)?;
        let definition = item.operations.get(&method)?;
        Some(OperationHandle {
            path,
            method,
            definition,
            path_parameters: &item.parameters,
        })
    }

    /// Base URL requests are issued against (no trailing slash).
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn security_schemes(&self) -> &IndexMap<String, SecurityScheme> {
        &self.security_schemes
    }

    /// Follow `$ref` chains inside this document until a non-reference
    /// object is reached.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> Result<&'a Value, LoadError> {
        follow_refs(&self.root, value)
    }
}

fn invalid(message: &str) -> LoadError {
    LoadError::InvalidDocument {
        message: message.to_string(),
    }
}

fn detect_version(root: &Value) -> Result<SpecVersion, LoadError> {
    if let Some(v) = root.get("swagger") {
        return match v.as_str() {
            Some(s) if s.starts_with("2.") => Ok(SpecVersion::Swagger2),
            _ => Err(invalid("unsupported \"swagger\" version")),
        };
    }
    if let Some(v) = root.get("openapi") {
        return match v.as_str() {
            Some(s) if s.starts_with("3.") => Ok(SpecVersion::OpenApi3),
            _ => Err(invalid("unsupported \"openapi\" version")),
        };
    }
    Err(invalid("missing \"swagger\" or \"openapi\" version field"))
}

fn follow_refs<'a>(root: &'a Value, value: &'a Value) -> Result<&'a Value, LoadError> {
    let mut current = value;
    for _ in 0..MAX_REF_DEPTH {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) if reference.starts_with('#') => {
                current = navigate_fragment(root, reference)?;
            }
            Some(reference) => {
                return Err(LoadError::UnresolvedRef {
                    reference: reference.to_string(),
                })
            }
            None => return Ok(current),
        }
    }
    Err(LoadError::UnresolvedRef {
        reference: "reference chain too deep".to_string(),
    })
}

fn normalize_path_item(root: &Value, path: &str, item: &Value) -> Result<PathItem, LoadError> {
    let item = follow_refs(root, item)?;
    let obj = item.as_object().ok_or_else(|| LoadError::InvalidDocument {
        message: format!("path item {} must be an object", path),
    })?;

    let parameters = match obj.get("parameters") {
        Some(Value::Array(params)) => params.clone(),
        Some(_) => {
            return Err(LoadError::InvalidDocument {
                message: format!("parameters of {} must be an array", path),
            })
        }
        None => Vec::new(),
    };

    let mut operations = BTreeMap::new();
    for method in Method::ALL {
        if let Some(op) = obj.get(method.key()) {
            if !op.is_object() {
                return Err(LoadError::InvalidDocument {
                    message: format!("{} {} must be an object", method, path),
                });
            }
            operations.insert(*method, op.clone());
        }
    }

    Ok(PathItem {
        parameters,
        operations,
    })
}

/// Scheme and `host[:port]` of an absolute URL.
fn url_origin(url: &str) -> Option<(String, String)> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    let authority = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Some((url.scheme().to_string(), authority))
}

fn swagger_base_url(root: &Value, origin: Option<&str>) -> Option<String> {
    let origin = origin.and_then(url_origin);

    let host = root
        .get("host")
        .and_then(Value::as_str)
        .or(origin.as_ref().map(|(_, authority)| authority.as_str()))?;

    let schemes: Vec<&str> = root
        .get("schemes")
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let scheme = schemes
        .first()
        .copied()
        .or(origin.as_ref().map(|(scheme, _)| scheme.as_str()))
        .unwrap_or("http");

    let base_path = root.get("basePath").and_then(Value::as_str).unwrap_or("/");
    let base_path = base_path.trim_end_matches('/');

    Some(format!("{}://{}{}", scheme, host, base_path))
}

fn openapi_base_url(root: &Value, origin: Option<&str>) -> Option<String> {
    let server = root
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first());

    let Some(server) = server else {
        let (scheme, authority) = origin.and_then(url_origin)?;
        return Some(format!("{}://{}", scheme, authority));
    };

    let mut url = server.get("url").and_then(Value::as_str)?.to_string();
    if let Some(Value::Object(vars)) = server.get("variables") {
        for (name, var) in vars {
            if let Some(default) = var.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{}}}", name), default);
            }
        }
    }

    // Relative server URLs are relative to where the document came from.
    if let Err(ParseError::RelativeUrlWithoutBase) = Url::parse(&url) {
        url = Url::parse(origin?).ok()?.join(&url).ok()?.into();
    }
    Some(url.trim_end_matches('/').to_string())
}

fn collect_security_schemes(root: &Value, version: SpecVersion) -> IndexMap<String, SecurityScheme> {
    let defs = match version {
        SpecVersion::Swagger2 => root.get("securityDefinitions"),
        SpecVersion::OpenApi3 => root.pointer("/components/securitySchemes"),
    };
    let Some(Value::Object(defs)) = defs else {
        return IndexMap::new();
    };

    defs.iter()
        .map(|(name, def)| {
            let def = follow_refs(root, def).unwrap_or(def);
            let kind = def.get("type").and_then(Value::as_str).unwrap_or("");
            let scheme = match kind {
                "apiKey" => SecurityScheme::ApiKey {
                    name: def
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(name)
                        .to_string(),
                    location: def
                        .get("in")
                        .and_then(Value::as_str)
                        .unwrap_or("header")
                        .to_string(),
                },
                "basic" => SecurityScheme::Basic,
                "http" => match def.get("scheme").and_then(Value::as_str) {
                    Some(s) if s.eq_ignore_ascii_case("basic") => SecurityScheme::Basic,
                    _ => SecurityScheme::Bearer,
                },
                "oauth2" => SecurityScheme::OAuth2,
                other => SecurityScheme::Other(other.to_string()),
            };
            (name.clone(), scheme)
        })
        .collect()
}
