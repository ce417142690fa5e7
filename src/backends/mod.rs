//! Storage backends and the prefix registry.
//!
//! A [`StorageBackend`] performs raw byte/text I/O against one storage
//! system. Backends are selected from a path string by matching the longest
//! registered URI-style prefix (`s3://`, `http://`, ...); paths with no
//! matching prefix fall through to the default local filesystem backend.
//!
//! The contract is capability-style: `get`/`get_text` are required, every
//! other operation defaults to a typed [`IoError::Unsupported`] so callers
//! get a precise capability error instead of a missing-method failure.

use std::collections::HashMap;
use std::io::Write as _;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, RwLock};

use tempfile::NamedTempFile;

use crate::error::IoError;

pub mod local;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalBackend;

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "s3")]
pub use s3::{S3Backend, S3Options, set_s3_backend};

/// Options for [`StorageBackend::list_dir_or_file`].
///
/// The defaults list both files and directories, one level deep, without a
/// suffix filter.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Recurse into subdirectories.
    pub recursive: bool,
    /// Skip directories in the output.
    pub skip_dirs: bool,
    /// Skip files in the output.
    pub skip_files: bool,
    /// Only yield files ending with this suffix. Incompatible with listing
    /// directories.
    pub suffix: Option<String>,
}

impl ListOptions {
    /// Whether directories should be yielded.
    pub fn list_dir(&self) -> bool {
        !self.skip_dirs
    }

    /// Whether files should be yielded.
    pub fn list_file(&self) -> bool {
        !self.skip_files
    }

    /// Reject incoherent option combinations before any I/O happens.
    pub fn validate(&self) -> Result<(), IoError> {
        if self.suffix.is_some() && self.list_dir() {
            return Err(IoError::InvalidArgument(
                "suffix filtering requires skip_dirs".into(),
            ));
        }
        if !self.list_dir() && !self.list_file() {
            return Err(IoError::InvalidArgument(
                "nothing to list with both skip_dirs and skip_files".into(),
            ));
        }
        Ok(())
    }

    fn wants_file(&self, name: &str) -> bool {
        self.list_file()
            && self
                .suffix
                .as_deref()
                .is_none_or(|suffix| name.ends_with(suffix))
    }
}

/// Iterator over listed entries, relative to the listed directory.
///
/// Wraps a boxed iterator so every backend can return its own shape. The
/// sequence is finite and not restartable.
pub struct ListIter(Box<dyn Iterator<Item = Result<String, IoError>> + Send + 'static>);

impl ListIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<String, IoError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector of paths.
    pub fn from_vec(entries: Vec<String>) -> Self {
        Self::new(entries.into_iter().map(Ok))
    }
}

impl std::fmt::Debug for ListIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListIter").finish_non_exhaustive()
    }
}

impl Iterator for ListIter {
    type Item = Result<String, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// A local filesystem mirror of a (possibly remote) object.
///
/// Remote backends materialize objects into a temporary file that is removed
/// when this value is dropped, on every exit path. The local backend returns
/// the real path with no cleanup.
#[derive(Debug)]
pub enum LocalPath {
    /// A real local path; nothing to clean up.
    Borrowed(PathBuf),
    /// A scoped temporary download, removed on drop.
    Temp(tempfile::TempPath),
}

impl LocalPath {
    /// Borrow the underlying filesystem path.
    pub fn as_path(&self) -> &Path {
        match self {
            LocalPath::Borrowed(p) => p,
            LocalPath::Temp(t) => t,
        }
    }
}

impl Deref for LocalPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<Path> for LocalPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

/// Contract every storage backend implements.
///
/// Required: [`get`](Self::get) (raw bytes) and, implicitly,
/// [`get_text`](Self::get_text) which defaults to UTF-8 validation of `get`.
/// All other operations are optional capabilities whose defaults return
/// [`IoError::Unsupported`] naming the operation and backend.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; methods take `&self` and one
/// shared instance serves every call for its prefix. Backends with internal
/// client state manage their own synchronization.
pub trait StorageBackend: Send + Sync {
    /// Short stable backend name used in logs and capability errors.
    fn name(&self) -> &'static str;

    /// Whether the backend can create symlinks for local-style optimizations.
    fn allow_symlink(&self) -> bool {
        false
    }

    /// Read the object at `path` as raw bytes.
    fn get(&self, path: &str) -> Result<Vec<u8>, IoError>;

    /// Read the object at `path` as UTF-8 text.
    fn get_text(&self, path: &str) -> Result<String, IoError> {
        String::from_utf8(self.get(path)?).map_err(|e| IoError::InvalidData {
            path: path.to_owned(),
            details: format!("not valid UTF-8: {e}"),
        })
    }

    /// Write raw bytes to `path`.
    fn put(&self, data: &[u8], path: &str) -> Result<(), IoError> {
        let _ = (data, path);
        Err(IoError::unsupported("put", self.name()))
    }

    /// Write text to `path`. Defaults to [`put`](Self::put) on the UTF-8
    /// bytes.
    fn put_text(&self, text: &str, path: &str) -> Result<(), IoError> {
        self.put(text.as_bytes(), path)
    }

    /// Check whether `path` exists.
    fn exists(&self, path: &str) -> Result<bool, IoError> {
        let _ = path;
        Err(IoError::unsupported("exists", self.name()))
    }

    /// Remove the object at `path`.
    fn remove(&self, path: &str) -> Result<(), IoError> {
        let _ = path;
        Err(IoError::unsupported("remove", self.name()))
    }

    /// List entries under `path` according to `options`. Yielded paths are
    /// relative to `path`; directories carry no trailing separator.
    fn list_dir_or_file(&self, path: &str, options: &ListOptions) -> Result<ListIter, IoError> {
        let _ = (path, options);
        Err(IoError::unsupported("list_dir_or_file", self.name()))
    }

    /// Materialize the object at `path` as a real local file.
    ///
    /// Default: download through [`get`](Self::get) into a named temporary
    /// file that is removed when the returned [`LocalPath`] is dropped.
    fn get_local_path(&self, path: &str) -> Result<LocalPath, IoError> {
        let data = self.get(path)?;
        let mut file =
            NamedTempFile::new().map_err(|e| IoError::io("create temp file", path, e))?;
        file.write_all(&data)
            .map_err(|e| IoError::io("write temp file", path, e))?;
        file.flush()
            .map_err(|e| IoError::io("flush temp file", path, e))?;
        Ok(LocalPath::Temp(file.into_temp_path()))
    }

    /// Upload the local file at `local_path` to `path`, byte-identical.
    ///
    /// Default: read the file and delegate to [`put`](Self::put).
    fn put_local_path(&self, local_path: &Path, path: &str) -> Result<(), IoError> {
        let data = std::fs::read(local_path).map_err(|e| IoError::io("read", local_path, e))?;
        self.put(&data, path)
    }
}

/// Normalize a registration prefix to its `scheme://` form.
///
/// The empty string (the catch-all local default) stays empty; a bare scheme
/// gets `://` appended, so `"s3"` and `"s3://"` register identically. A
/// prefix that already carries `://` (possibly with a path part after it) is
/// kept as-is.
fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.contains("://") {
        prefix.to_owned()
    } else {
        format!("{prefix}://")
    }
}

/// Two mappings selecting a backend: name for explicit lookup, normalized
/// prefix for path-based autodetection.
///
/// The maps are updated independently: a name may be registered without
/// prefixes, and several prefixes may alias one backend instance. Mutation
/// happens at startup; resolution is read-only afterwards.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
    prefix_to_backend: HashMap<String, Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry with no default backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in backends, in documented order:
    /// `local` under the empty (default) prefix, then `s3` under `s3://`,
    /// then `http` under `http://` and `https://`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // Defaults cannot collide with each other; the errors are unreachable.
        let _ = registry.register("local", Arc::new(LocalBackend), false, &[""]);
        #[cfg(feature = "s3")]
        let _ = registry.register("s3", s3::shared_backend(), false, &["s3"]);
        #[cfg(feature = "http")]
        let _ = registry.register("http", Arc::new(HttpBackend::new()), false, &["http", "https"]);
        registry
    }

    /// Register `backend` under `name` and each prefix in `prefixes`.
    ///
    /// Prefixes are normalized to `scheme://` form; the empty string is the
    /// catch-all default checked after every other prefix.
    ///
    /// # Errors
    ///
    /// - [`IoError::BackendExists`] if `name` is taken and `force` is false
    /// - [`IoError::PrefixExists`] if a prefix is taken and `force` is false
    ///   (including the empty default - it cannot be silently shadowed)
    /// - [`IoError::PrefixOverlap`] if a non-empty prefix string-overlaps a
    ///   different registered prefix. Overlap makes resolution ambiguous, so
    ///   it is rejected even with `force`.
    pub fn register(
        &mut self,
        name: &str,
        backend: Arc<dyn StorageBackend>,
        force: bool,
        prefixes: &[&str],
    ) -> Result<(), IoError> {
        if !force && self.backends.contains_key(name) {
            return Err(IoError::BackendExists {
                name: name.to_owned(),
            });
        }

        let normalized: Vec<String> = prefixes.iter().map(|p| normalize_prefix(p)).collect();
        // The batch itself must be mutually exclusive too; nothing may land
        // in the prefix map until every prefix has passed.
        for (i, prefix) in normalized.iter().enumerate() {
            for other in &normalized[..i] {
                if prefix == other {
                    return Err(IoError::PrefixExists {
                        prefix: prefix.clone(),
                    });
                }
                if !prefix.is_empty()
                    && !other.is_empty()
                    && (prefix.starts_with(other.as_str()) || other.starts_with(prefix.as_str()))
                {
                    return Err(IoError::PrefixOverlap {
                        prefix: prefix.clone(),
                        existing: other.clone(),
                    });
                }
            }
        }
        for prefix in &normalized {
            if self.prefix_to_backend.contains_key(prefix) {
                if !force {
                    return Err(IoError::PrefixExists {
                        prefix: prefix.clone(),
                    });
                }
                continue;
            }
            if !prefix.is_empty() {
                for existing in self.prefix_to_backend.keys() {
                    if existing.is_empty() {
                        continue;
                    }
                    if prefix.starts_with(existing.as_str()) || existing.starts_with(prefix.as_str())
                    {
                        return Err(IoError::PrefixOverlap {
                            prefix: prefix.clone(),
                            existing: existing.clone(),
                        });
                    }
                }
            }
        }

        self.backends.insert(name.to_owned(), Arc::clone(&backend));
        for prefix in normalized {
            self.prefix_to_backend.insert(prefix, Arc::clone(&backend));
        }
        Ok(())
    }

    /// Look up a backend by registered name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn StorageBackend>, IoError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| IoError::NoBackend {
                path: name.to_owned(),
            })
    }

    /// Resolve the backend for `path`.
    ///
    /// The longest registered non-empty prefix that literally prefixes the
    /// path wins; if none matches, the empty-prefix default is used.
    pub fn resolve_path(&self, path: &str) -> Result<Arc<dyn StorageBackend>, IoError> {
        let mut best: Option<(&str, &Arc<dyn StorageBackend>)> = None;
        for (prefix, backend) in &self.prefix_to_backend {
            if prefix.is_empty() || !path.starts_with(prefix.as_str()) {
                continue;
            }
            if best.is_none_or(|(current, _)| prefix.len() > current.len()) {
                best = Some((prefix, backend));
            }
        }
        if let Some((_, backend)) = best {
            return Ok(Arc::clone(backend));
        }
        self.prefix_to_backend
            .get("")
            .cloned()
            .ok_or_else(|| IoError::NoBackend {
                path: path.to_owned(),
            })
    }

    /// Registered backend names, in arbitrary order.
    pub fn names(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

/// The process-wide backend registry backing [`crate::load`] and
/// [`crate::dump`]. Built-ins are installed on first use, before any user
/// registration can observe the registry.
static BACKENDS: LazyLock<RwLock<BackendRegistry>> =
    LazyLock::new(|| RwLock::new(BackendRegistry::with_defaults()));

/// Register a backend in the process-wide registry.
///
/// Intended for startup-time use; the registry is treated as read-only once
/// I/O begins.
///
/// # Errors
///
/// Same as [`BackendRegistry::register`].
pub fn register_backend(
    name: &str,
    backend: Arc<dyn StorageBackend>,
    force: bool,
    prefixes: &[&str],
) -> Result<(), IoError> {
    BACKENDS
        .write()
        .expect("backend registry poisoned")
        .register(name, backend, force, prefixes)
}

/// Resolve a backend for `path` from the process-wide registry.
pub(crate) fn resolve_backend(path: &str) -> Result<Arc<dyn StorageBackend>, IoError> {
    BACKENDS
        .read()
        .expect("backend registry poisoned")
        .resolve_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend(&'static str);

    impl StorageBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        fn get(&self, _: &str) -> Result<Vec<u8>, IoError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    fn backend(name: &'static str) -> Arc<dyn StorageBackend> {
        Arc::new(StubBackend(name))
    }

    #[test]
    fn prefixes_are_normalized_to_scheme_form() {
        assert_eq!(normalize_prefix("s3"), "s3://");
        assert_eq!(normalize_prefix("s3://"), "s3://");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn distinct_prefixes_resolve_independently() {
        let mut registry = BackendRegistry::new();
        registry.register("a", backend("a"), false, &[""]).unwrap();
        registry
            .register("memory", backend("memory"), false, &["memory"])
            .unwrap();
        registry
            .register("memdb", backend("memdb"), false, &["memdb"])
            .unwrap();

        let resolved = registry.resolve_path("memory://bucket/x.json").unwrap();
        assert_eq!(resolved.name(), "memory");
        let resolved = registry.resolve_path("memdb://bucket/x.json").unwrap();
        assert_eq!(resolved.name(), "memdb");
    }

    #[test]
    fn unmatched_prefix_falls_back_to_default() {
        let mut registry = BackendRegistry::new();
        registry
            .register("local", backend("local"), false, &[""])
            .unwrap();
        registry
            .register("remote", backend("remote"), false, &["rem"])
            .unwrap();
        assert_eq!(registry.resolve_path("/tmp/x.json").unwrap().name(), "local");
        assert_eq!(
            registry.resolve_path("rem://x.json").unwrap().name(),
            "remote"
        );
    }

    #[test]
    fn no_default_backend_is_an_error() {
        let registry = BackendRegistry::new();
        assert!(matches!(
            registry.resolve_path("/tmp/x.json"),
            Err(IoError::NoBackend { .. })
        ));
    }

    #[test]
    fn duplicate_name_requires_force() {
        let mut registry = BackendRegistry::new();
        registry.register("b", backend("one"), false, &[]).unwrap();
        assert!(matches!(
            registry.register("b", backend("two"), false, &[]),
            Err(IoError::BackendExists { .. })
        ));
        registry.register("b", backend("two"), true, &[]).unwrap();
        assert_eq!(registry.get("b").unwrap().name(), "two");
    }

    #[test]
    fn duplicate_default_prefix_requires_force() {
        let mut registry = BackendRegistry::new();
        registry.register("a", backend("a"), false, &[""]).unwrap();
        assert!(matches!(
            registry.register("b", backend("b"), false, &[""]),
            Err(IoError::PrefixExists { .. })
        ));
        registry.register("b", backend("b"), true, &[""]).unwrap();
        assert_eq!(registry.resolve_path("anything.json").unwrap().name(), "b");
    }

    #[test]
    fn overlapping_prefixes_are_rejected_even_with_force() {
        let mut registry = BackendRegistry::new();
        registry
            .register("wide", backend("wide"), false, &["data"])
            .unwrap();
        // data://archive/ is a strict extension of data:// - any path it
        // matches, data:// also matches, so resolution would be ambiguous.
        let err = registry
            .register("narrow", backend("narrow"), true, &["data://archive/"])
            .unwrap_err();
        assert!(matches!(err, IoError::PrefixOverlap { .. }));
    }

    #[test]
    fn overlapping_prefixes_in_one_call_are_rejected() {
        let mut registry = BackendRegistry::new();
        let err = registry
            .register("d", backend("d"), false, &["data", "data://deep/"])
            .unwrap_err();
        assert!(matches!(err, IoError::PrefixOverlap { .. }));
        // Nothing from the rejected call was registered.
        assert!(registry.get("d").is_err());
        assert!(matches!(
            registry.resolve_path("data://x.json"),
            Err(IoError::NoBackend { .. })
        ));
    }

    #[test]
    fn duplicate_prefix_in_one_call_is_rejected() {
        let mut registry = BackendRegistry::new();
        // "s3" and "s3://" normalize to the same prefix.
        let err = registry
            .register("s3", backend("s3"), false, &["s3", "s3://"])
            .unwrap_err();
        assert!(matches!(err, IoError::PrefixExists { .. }));
        assert!(registry.get("s3").is_err());
    }

    #[test]
    fn http_and_https_do_not_overlap() {
        let mut registry = BackendRegistry::new();
        registry
            .register("http", backend("http"), false, &["http", "https"])
            .unwrap();
        assert_eq!(
            registry.resolve_path("https://host/x.json").unwrap().name(),
            "http"
        );
    }

    #[test]
    fn name_only_registration_has_no_prefix() {
        let mut registry = BackendRegistry::new();
        registry.register("a", backend("a"), false, &[""]).unwrap();
        registry
            .register("hidden", backend("hidden"), false, &[])
            .unwrap();
        assert_eq!(registry.get("hidden").unwrap().name(), "hidden");
        assert_eq!(registry.resolve_path("hidden://x").unwrap().name(), "a");
    }

    #[test]
    fn list_options_validation() {
        let bad = ListOptions {
            suffix: Some(".json".into()),
            ..ListOptions::default()
        };
        assert!(bad.validate().is_err());

        let good = ListOptions {
            suffix: Some(".json".into()),
            skip_dirs: true,
            ..ListOptions::default()
        };
        assert!(good.validate().is_ok());

        let nothing = ListOptions {
            skip_dirs: true,
            skip_files: true,
            ..ListOptions::default()
        };
        assert!(nothing.validate().is_err());
    }
}
