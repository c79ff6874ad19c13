//! Credentials applied uniformly to every request.

use crate::document::{SchemaDocument, SecurityScheme};
use crate::error::SecurityError;
use crate::transport::HttpRequest;

/// One credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Header { name: String, value: String },
    Query { name: String, value: String },
    Cookie { name: String, value: String },
    Basic { username: String, password: Option<String> },
    Bearer(String),
}

impl Credential {
    /// Build a credential for a security scheme declared by the document.
    ///
    /// Basic schemes take `secret` as `user:password`; bearer and OAuth2
    /// schemes take a token.
    pub fn for_scheme(document: &SchemaDocument, scheme: &str, secret: &str) -> Result<Self, SecurityError> {
        let declared = document
            .security_schemes()
            .get(scheme)
            .ok_or_else(|| SecurityError::UnknownScheme {
                name: scheme.to_string(),
            })?;

        match declared {
            SecurityScheme::ApiKey { name, location } => {
                let (name, value) = (name.clone(), secret.to_string());
                match location.as_str() {
                    "query" => Ok(Credential::Query { name, value }),
                    "cookie" => Ok(Credential::Cookie { name, value }),
                    _ => Ok(Credential::Header { name, value }),
                }
            }
            SecurityScheme::Basic => Ok(Credential::basic(secret)),
            SecurityScheme::Bearer | SecurityScheme::OAuth2 => Ok(Credential::Bearer(secret.to_string())),
            SecurityScheme::Other(kind) => Err(SecurityError::Unsupported {
                name: scheme.to_string(),
                kind: kind.clone(),
            }),
        }
    }

    /// Parse `user:password` (password optional).
    pub fn basic(secret: &str) -> Self {
        match secret.split_once(':') {
            Some((user, password)) => Credential::Basic {
                username: user.to_string(),
                password: Some(password.to_string()),
            },
            None => Credential::Basic {
                username: secret.to_string(),
                password: None,
            },
        }
    }
}

/// The authentication context of a client. Immutable once the client is
/// built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    credentials: Vec<Credential>,
}

impl SecurityContext {
    /// A context without credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential: Credential) -> Self {
        self.credentials.push(credential);
        self
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Add every credential to `request`.
    pub fn apply(&self, request: &mut HttpRequest) {
        let mut cookies = Vec::new();
        for credential in &self.credentials {
            match credential {
                Credential::Header { name, value } => {
                    request.headers.push((name.clone(), value.clone()));
                }
                Credential::Query { name, value } => {
                    request.query.push((name.clone(), value.clone()));
                }
                Credential::Cookie { name, value } => cookies.push(format!("{}={}", name, value)),
                Credential::Basic { username, password } => {
                    request.basic_auth = Some((username.clone(), password.clone()));
                }
                Credential::Bearer(token) => {
                    request
                        .headers
                        .push(("Authorization".to_string(), format!("Bearer {}", token)));
                }
            }
        }
        if !cookies.is_empty() {
            append_cookies(request, &cookies.join("; "));
        }
    }
}

/// Merge `cookies` into an existing `Cookie` header or add one.
pub(crate) fn append_cookies(request: &mut HttpRequest, cookies: &str) {
    match request
        .headers
        .iter_mut()
        .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
    {
        Some((_, existing)) => {
            existing.push_str("; ");
            existing.push_str(cookies);
        }
        None => request.headers.push(("Cookie".to_string(), cookies.to_string())),
    }
}
