//! The HTTP transport seam.
//!
//! [`ApiClient`](crate::ApiClient) builds a fully resolved [`HttpRequest`] and
//! hands it to a [`Transport`]. A non-2xx answer is a normal [`RawResponse`];
//! only failing to get an answer at all is an error.

use crate::error::RequestError;
use crate::types::Method;

/// A request ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// `application/x-www-form-urlencoded` body fields.
    pub form: Vec<(String, String)>,
    pub basic_auth: Option<(String, Option<String>)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            form: Vec::new(),
            basic_auth: None,
        }
    }
}

/// What came back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Sends requests. Implementations own timeouts and connection handling.
pub trait Transport {
    /// # Errors
    ///
    /// Returns `RequestError::Transport` when no response was received
    /// (connection refused, timeout, TLS failure).
    fn send(&self, request: &HttpRequest) -> Result<RawResponse, RequestError>;
}

#[cfg(feature = "remote")]
pub use self::remote::ReqwestTransport;

#[cfg(feature = "remote")]
mod remote {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use reqwest::header::HeaderMap;

    use super::{HttpRequest, RawResponse, Transport};
    use crate::error::RequestError;

    /// Blocking transport backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self, RequestError> {
            let client = Client::builder()
                .user_agent(concat!("swagger-tester/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .map_err(|e| RequestError::Transport {
                    url: String::new(),
                    message: e.to_string(),
                })?;
            Ok(Self { client })
        }
    }

    impl Transport for ReqwestTransport {
        fn send(&self, request: &HttpRequest) -> Result<RawResponse, RequestError> {
            let transport_error = |e: reqwest::Error| RequestError::Transport {
                url: request.url.clone(),
                message: e.to_string(),
            };

            let method = reqwest::Method::from_bytes(request.method.as_http().as_bytes()).map_err(|e| {
                RequestError::InvalidUrl {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            })?;

            let mut req = self.client.request(method, &request.url);
            if !request.query.is_empty() {
                req = req.query(&request.query);
            }
            for (name, value) in &request.headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if !request.form.is_empty() {
                req = req.form(&request.form);
            }
            if let Some((user, password)) = &request.basic_auth {
                req = req.basic_auth(user, password.as_ref());
            }

            let resp = req.send().map_err(transport_error)?;
            let status = resp.status().as_u16();
            let headers = header_pairs(resp.headers());
            let body = resp.text().map_err(transport_error)?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        }
    }

    /// Header values are not guaranteed to be ASCII; decode them lossily.
    fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect()
    }

}
