//! Raw document loading from various sources.
//!
//! Sources are files, JSON strings and (with the `remote` feature) HTTP URLs.
//! Normalization into the path map happens in [`crate::document`].

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Timeout for fetching a document over HTTP.
#[cfg(feature = "remote")]
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Read and parse a JSON document from disk.
///
/// # Errors
///
/// `LoadError::FileNotFound` for a missing file, `LoadError::ReadError` for
/// other IO failures and `LoadError::InvalidJson` for unparsable content.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    load_document_str(&content)
}

pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Fetch a JSON document with a blocking GET.
///
/// Error statuses are treated like connection failures: both end up as
/// `LoadError::NetworkError`.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .and_then(|client| client.get(url).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// True for `http://` and `https://` sources.
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load from a URL when `source` looks like one, from disk otherwise.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if !is_url(source) {
        return load_document(Path::new(source));
    }

    #[cfg(feature = "remote")]
    return load_document_url(source);

    #[cfg(not(feature = "remote"))]
    Err(LoadError::RemoteDisabled {
        url: source.to_string(),
    })
}

/// Look up a local `$ref` target such as `#/parameters/appid`.
///
/// The part after `#` is a JSON Pointer, `~1` and `~0` escapes included.
pub fn navigate_fragment<'a>(document: &'a Value, fragment: &str) -> Result<&'a Value, LoadError> {
    let pointer = fragment.strip_prefix('#').unwrap_or(fragment);
    document
        .pointer(pointer)
        .ok_or_else(|| LoadError::UnresolvedRef {
            reference: fragment.to_string(),
        })
}
