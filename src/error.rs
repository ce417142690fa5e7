//! Error types for the omnio load/dump abstraction.

use std::path::Path;

/// Crate-wide error type with contextual variants.
///
/// All variants carry the path, operation, or format they relate to.
/// Transport and codec causes stay reachable through [`std::error::Error::source`];
/// the dispatch layer never swallows or re-maps an error from a backend or
/// handler, it only releases its own resources before propagating.
///
/// Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use omnio::IoError;
///
/// let err = IoError::UnknownFormat { format: "xyz123".into() };
/// assert!(err.to_string().contains("xyz123"));
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    // Configuration errors - raised at registration or first resolution.
    /// The path has no extension and no explicit format override was given.
    #[error("no file format: {path} has no extension and no format override was given")]
    NoFormat {
        /// The path that could not be mapped to a format.
        path: String,
    },

    /// No handler is registered for the requested format.
    #[error("unknown file format: {format}")]
    UnknownFormat {
        /// The unregistered format/extension.
        format: String,
    },

    /// A backend name is already registered.
    #[error("{name} is already registered as a storage backend, pass force to override it")]
    BackendExists {
        /// The colliding backend name.
        name: String,
    },

    /// A path prefix is already registered.
    #[error("prefix {prefix:?} is already registered as a storage backend, pass force to override it")]
    PrefixExists {
        /// The colliding prefix (normalized form).
        prefix: String,
    },

    /// A prefix string-overlaps a different registered prefix.
    ///
    /// Overlapping prefixes would make backend resolution ambiguous, so this
    /// is rejected at registration time regardless of `force`.
    #[error("prefix {prefix:?} overlaps registered prefix {existing:?}")]
    PrefixOverlap {
        /// The rejected prefix.
        prefix: String,
        /// The already-registered prefix it overlaps.
        existing: String,
    },

    /// A file format is already bound to a handler.
    #[error("{format} is already registered as a file handler, pass force to override it")]
    HandlerExists {
        /// The colliding format.
        format: String,
    },

    /// No backend is registered for the path and no default backend exists.
    #[error("no storage backend registered for {path}")]
    NoBackend {
        /// The unresolvable path.
        path: String,
    },

    /// Invalid argument to a core operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Capability errors - the resolved component lacks an optional operation.
    /// An optional operation is not implemented by the resolved component.
    #[error("{subject} does not support {operation}")]
    Unsupported {
        /// The unsupported operation.
        operation: &'static str,
        /// The backend or handler lacking it.
        subject: &'static str,
    },

    /// A shared backend client has not been configured yet.
    #[error("{0} backend is not configured, call its set-backend entry point first")]
    NotConfigured(&'static str),

    // Transport / IO errors.
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// Expected a file but found something else.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: String,
    },

    /// A path was malformed for the backend that resolved it.
    #[error("invalid path {path}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why the backend rejected it.
        reason: String,
    },

    /// I/O error with operation and path context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport error.
    #[cfg(feature = "http")]
    #[error("http request failed for {url}: {source}")]
    Http {
        /// The requested URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Object store transport error.
    #[cfg(feature = "s3")]
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // Data / codec errors.
    /// File content is not valid for the channel it was read through.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: String,
        /// Details about the invalid data.
        details: String,
    },

    /// The text channel was requested but the encoded output is not UTF-8.
    #[error("encoded output is not valid UTF-8: {source}")]
    NotUtf8 {
        /// The failed conversion.
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A handler could not decode the input for its format.
    #[error("{format} decode error: {source}")]
    Decode {
        /// The handler format.
        format: &'static str,
        /// The codec's own error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A handler could not encode the value for its format.
    #[error("{format} encode error: {source}")]
    Encode {
        /// The handler format.
        format: &'static str,
        /// The codec's own error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The value has the wrong shape for the handler.
    #[error("value type mismatch: expected {expected}, got {found}")]
    ValueType {
        /// What the handler requires.
        expected: &'static str,
        /// What it was given.
        found: &'static str,
    },
}

impl IoError {
    /// Wrap an [`std::io::Error`] with operation and path context, mapping
    /// common kinds to more specific variants.
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().display().to_string();
        match source.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound { path },
            _ => IoError::Io {
                operation,
                path,
                source,
            },
        }
    }

    /// Construct the typed capability error for an optional operation.
    pub fn unsupported(operation: &'static str, subject: &'static str) -> Self {
        IoError::Unsupported { operation, subject }
    }

    /// Wrap a codec decode failure for `format`.
    pub fn decode(
        format: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IoError::Decode {
            format,
            source: Box::new(source),
        }
    }

    /// Wrap a codec encode failure for `format`.
    pub fn encode(
        format: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IoError::Encode {
            format,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = IoError::io(
            "get",
            "/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "test"),
        );
        assert!(matches!(err, IoError::NotFound { .. }));
        assert_eq!(err.to_string(), "not found: /missing.json");
    }

    #[test]
    fn io_other_keeps_operation_context() {
        let err = IoError::io(
            "put",
            "/denied.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test"),
        );
        assert!(err.to_string().starts_with("put failed for /denied.json"));
    }

    #[test]
    fn unsupported_names_operation_and_subject() {
        let err = IoError::unsupported("put", "http");
        assert_eq!(err.to_string(), "http does not support put");
    }

    #[test]
    fn decode_preserves_source() {
        use std::error::Error as _;
        let inner = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = IoError::decode("json", inner);
        assert!(err.source().is_some());
    }
}
