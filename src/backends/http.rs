//! Read-only HTTP(S) backend.

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::backends::StorageBackend;
use crate::error::IoError;

/// Backend for `http://` and `https://` URLs.
///
/// Strictly read-only: only `get`, `get_text`, and the download-based
/// `get_local_path` default are available; writes, existence checks, and
/// listing keep their [`IoError::Unsupported`] defaults.
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    /// Create a backend with a default blocking client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a backend with a caller-configured client, for timeouts,
    /// proxies, or custom headers.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, IoError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(IoError::InvalidPath {
                path: url.to_owned(),
                reason: "expected an http:// or https:// url".into(),
            });
        }
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| IoError::Http {
                url: url.to_owned(),
                source: e,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound {
                path: url.to_owned(),
            });
        }
        let response = response.error_for_status().map_err(|e| IoError::Http {
            url: url.to_owned(),
            source: e,
        })?;
        let body = response.bytes().map_err(|e| IoError::Http {
            url: url.to_owned(),
            source: e,
        })?;
        Ok(body.to_vec())
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, IoError> {
        self.fetch(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let err = HttpBackend::new().get("ftp://host/file.json").unwrap_err();
        assert!(matches!(err, IoError::InvalidPath { .. }));
    }

    #[test]
    fn writes_are_unsupported() {
        let err = HttpBackend::new()
            .put(b"data", "http://host/file.json")
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::Unsupported {
                operation: "put",
                ..
            }
        ));
    }

    #[test]
    fn remove_is_unsupported() {
        let err = HttpBackend::new().remove("http://host/file.json").unwrap_err();
        assert!(matches!(err, IoError::Unsupported { .. }));
    }
}
