//! Top-level `load`/`dump` entry points.
//!
//! Each call resolves a [`FileHandler`](crate::handlers::FileHandler) from
//! the file extension and a [`StorageBackend`](crate::backends::StorageBackend)
//! from the path prefix, then moves data between them in the cheapest shape
//! the handler supports: text, bytes, or a staged local file.
//!
//! The handler is always resolved before any backend I/O, so an unknown
//! extension fails fast without touching storage.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::backends::{ListIter, ListOptions, LocalPath, resolve_backend};
use crate::error::IoError;
use crate::handlers::{FileHandler, resolve_handler};
use crate::value::Value;

/// Extract the format (extension) from the last component of `path`.
///
/// # Errors
///
/// [`IoError::NoFormat`] when the last component has no `.` or nothing
/// after it.
pub fn format_from_path(path: &str) -> Result<&str, IoError> {
    let name = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Ok(ext),
        _ => Err(IoError::NoFormat {
            path: path.to_owned(),
        }),
    }
}

/// Load the value stored at `path`, picking the format from the extension.
pub fn load(path: &str) -> Result<Value, IoError> {
    let format = format_from_path(path)?;
    load_with(path, format)
}

/// Load the value stored at `path` as `format`, ignoring the extension.
pub fn load_with(path: &str, format: &str) -> Result<Value, IoError> {
    let handler = resolve_handler(format)?;
    let backend = resolve_backend(path)?;
    tracing::debug!(path, format, backend = backend.name(), "load");

    if handler.path_only() {
        let local = backend.get_local_path(path)?;
        return handler.load_from_path(local.as_path());
    }
    let data = if handler.str_like() {
        backend.get_text(path)?.into_bytes()
    } else {
        backend.get(path)?
    };
    handler.load_from_reader(&mut Cursor::new(data))
}

/// Store `value` at `path`, picking the format from the extension.
pub fn dump(value: &Value, path: &str) -> Result<(), IoError> {
    let format = format_from_path(path)?;
    dump_with(value, path, format)
}

/// Store `value` at `path` as `format`, ignoring the extension.
pub fn dump_with(value: &Value, path: &str, format: &str) -> Result<(), IoError> {
    let handler = resolve_handler(format)?;
    let backend = resolve_backend(path)?;
    tracing::debug!(path, format, backend = backend.name(), "dump");

    if handler.path_only() {
        return dump_via_staging(&*handler, value, path, &*backend);
    }
    if handler.str_like() {
        let text = handler.dump_to_string(value)?;
        return backend.put_text(&text, path);
    }
    let mut buf = Vec::new();
    handler.dump_to_writer(value, &mut buf)?;
    backend.put(&buf, path)
}

/// Serialize through a temporary local file for handlers that can only work
/// with real paths. The staging file is removed on every exit path.
fn dump_via_staging(
    handler: &dyn FileHandler,
    value: &Value,
    path: &str,
    backend: &dyn crate::backends::StorageBackend,
) -> Result<(), IoError> {
    let staging = tempfile::NamedTempFile::new()
        .map_err(|e| IoError::io("create staging file", path, e))?;
    handler.dump_to_path(value, staging.path())?;
    backend.put_local_path(staging.path(), path)
}

/// Check whether `path` exists on its backend.
pub fn exists(path: &str) -> Result<bool, IoError> {
    resolve_backend(path)?.exists(path)
}

/// Remove the file at `path` on its backend.
pub fn remove(path: &str) -> Result<(), IoError> {
    resolve_backend(path)?.remove(path)
}

/// List entries under `path` on its backend. See
/// [`StorageBackend::list_dir_or_file`](crate::backends::StorageBackend::list_dir_or_file).
pub fn list_dir_or_file(path: &str, options: &ListOptions) -> Result<ListIter, IoError> {
    options.validate()?;
    resolve_backend(path)?.list_dir_or_file(path, options)
}

/// Upload the local file at `local_path` to `path`, byte-identical, with no
/// format interpretation.
pub fn copyfile_from_local(local_path: impl AsRef<Path>, path: &str) -> Result<(), IoError> {
    resolve_backend(path)?.put_local_path(local_path.as_ref(), path)
}

/// Materialize `path` as a real local file.
///
/// For remote backends the returned [`LocalPath`] owns a temporary download
/// that is removed on drop; for local paths it borrows the original file.
pub fn get_local_path(path: &str) -> Result<LocalPath, IoError> {
    resolve_backend(path)?.get_local_path(path)
}

/// Resolve the backend for `path` for direct use.
pub fn backend_for(path: &str) -> Result<Arc<dyn crate::backends::StorageBackend>, IoError> {
    resolve_backend(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_the_last_extension() {
        assert_eq!(format_from_path("/a/b/c.json").unwrap(), "json");
        assert_eq!(format_from_path("s3://bucket/d.tar.zst").unwrap(), "zst");
        assert_eq!(format_from_path("plain.yaml").unwrap(), "yaml");
    }

    #[test]
    fn missing_extension_is_no_format() {
        for path in ["/a/b/noext", "/dotted.dir/noext", "trailing.", ".hidden"] {
            assert!(
                matches!(format_from_path(path), Err(IoError::NoFormat { .. })),
                "{path}"
            );
        }
    }

    #[test]
    fn unknown_format_fails_before_backend_io() {
        // A path on a prefix nothing is registered for still fails on the
        // extension, proving handler resolution comes first.
        let err = load("nothing-registered://x/y.xyz123").unwrap_err();
        assert!(matches!(err, IoError::UnknownFormat { .. }));
    }
}
