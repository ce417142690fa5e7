//! File-format handlers and the extension registry.
//!
//! A [`FileHandler`] serializes and deserializes one file format to and from
//! byte streams, strings, or local paths. Handlers are stateless strategy
//! objects: one instance is registered at startup and reused for every file
//! of its extensions, so implementations must be safe to call concurrently.
//!
//! The process-wide registry is pre-populated with the built-in handlers
//! before any user registration can observe it. Additional formats are added
//! through [`register_handler`]; resolution of an unregistered extension is a
//! caller error, never a silent default.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use crate::error::IoError;
use crate::value::Value;

mod bytes;
mod csv;
mod json;
mod jsonl;
mod text;
mod toml;
mod yaml;
mod zstd;

pub use bytes::ByteHandler;
pub use csv::CsvHandler;
pub use json::JsonHandler;
pub use jsonl::JsonlHandler;
pub use text::TextHandler;
pub use toml::TomlHandler;
pub use yaml::YamlHandler;
pub use zstd::ZstdHandler;

/// Contract every format codec implements.
///
/// Two operations are required: [`load_from_reader`](Self::load_from_reader)
/// and [`dump_to_writer`](Self::dump_to_writer). Everything else has a
/// default derived from them. The two capability flags tell the dispatcher
/// which channel to use:
///
/// - [`str_like`](Self::str_like): the natural representation is text, so
///   the dispatcher moves data through the backend's text channel
///   (`get_text`/`put_text`) and [`dump_to_string`](Self::dump_to_string).
/// - [`path_only`](Self::path_only): the codec needs a real filesystem path
///   (memory-mapped or external-process codecs); the dispatcher materializes
///   a scoped local copy for loads and stages a temporary file for dumps.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and hold no per-call mutable state;
/// one instance serves concurrent calls from independent threads.
pub trait FileHandler: Send + Sync {
    /// Whether the natural in-memory representation is text-like.
    fn str_like(&self) -> bool {
        true
    }

    /// Whether this codec can only work through real filesystem paths.
    fn path_only(&self) -> bool {
        false
    }

    /// Decode a value from a byte stream.
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError>;

    /// Encode a value into a byte stream.
    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError>;

    /// Encode a value to a string.
    ///
    /// Default: encode through [`dump_to_writer`](Self::dump_to_writer) and
    /// validate UTF-8. Byte-oriented handlers override this to report the
    /// operation as unsupported.
    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        let mut buf = Vec::new();
        self.dump_to_writer(value, &mut buf)?;
        String::from_utf8(buf).map_err(|source| IoError::NotUtf8 { source })
    }

    /// Decode a value from a local file.
    fn load_from_path(&self, path: &Path) -> Result<Value, IoError> {
        let file = File::open(path).map_err(|e| IoError::io("open", path, e))?;
        let mut reader = BufReader::new(file);
        self.load_from_reader(&mut reader)
    }

    /// Encode a value into a local file.
    fn dump_to_path(&self, value: &Value, path: &Path) -> Result<(), IoError> {
        let file = File::create(path).map_err(|e| IoError::io("create", path, e))?;
        let mut writer = BufWriter::new(file);
        self.dump_to_writer(value, &mut writer)?;
        writer.flush().map_err(|e| IoError::io("flush", path, e))
    }
}

/// Mapping from file extension (without dot) to a shared handler instance.
///
/// Keys are unique unless an override is explicitly forced. One handler
/// instance may be registered under several extensions. The registry is
/// populated near process start and treated as read-only afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FileHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in handler.
    ///
    /// Built-ins, in registration order: `json`, `yaml`/`yml`, `toml`,
    /// `jsonl`, `csv`, `txt`, `byte`/`bin`, `zst`/`zstd`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        // Defaults cannot collide with each other, so the errors are
        // unreachable and dropped here.
        let _ = registry.register(&["json"], Arc::new(JsonHandler), false);
        let _ = registry.register(&["yaml", "yml"], Arc::new(YamlHandler), false);
        let _ = registry.register(&["toml"], Arc::new(TomlHandler), false);
        let _ = registry.register(&["jsonl"], Arc::new(JsonlHandler), false);
        let _ = registry.register(&["csv"], Arc::new(CsvHandler), false);
        let _ = registry.register(&["txt"], Arc::new(TextHandler), false);
        let _ = registry.register(&["byte", "bin"], Arc::new(ByteHandler), false);
        let _ = registry.register(&["zst", "zstd"], Arc::new(ZstdHandler::default()), false);
        registry
    }

    /// Register `handler` under every extension in `formats`.
    ///
    /// # Errors
    ///
    /// - [`IoError::InvalidArgument`] if `formats` is empty
    /// - [`IoError::HandlerExists`] if an extension is already registered and
    ///   `force` is false; nothing is registered in that case
    pub fn register(
        &mut self,
        formats: &[&str],
        handler: Arc<dyn FileHandler>,
        force: bool,
    ) -> Result<(), IoError> {
        if formats.is_empty() {
            return Err(IoError::InvalidArgument(
                "at least one file format is required".into(),
            ));
        }
        if !force {
            for format in formats {
                if self.handlers.contains_key(*format) {
                    return Err(IoError::HandlerExists {
                        format: (*format).to_owned(),
                    });
                }
            }
        }
        for format in formats {
            self.handlers
                .insert((*format).to_owned(), Arc::clone(&handler));
        }
        Ok(())
    }

    /// Look up the handler for `format`.
    ///
    /// # Errors
    ///
    /// [`IoError::UnknownFormat`] if nothing is registered for `format`.
    pub fn resolve(&self, format: &str) -> Result<Arc<dyn FileHandler>, IoError> {
        self.handlers
            .get(format)
            .cloned()
            .ok_or_else(|| IoError::UnknownFormat {
                format: format.to_owned(),
            })
    }

    /// Registered extensions, in arbitrary order.
    pub fn formats(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

/// The process-wide handler registry backing [`crate::load`] and
/// [`crate::dump`]. Built-ins are installed on first use, before any user
/// registration can observe the registry.
static FILE_HANDLERS: LazyLock<RwLock<HandlerRegistry>> =
    LazyLock::new(|| RwLock::new(HandlerRegistry::with_defaults()));

/// Register a handler in the process-wide registry under one or more
/// extensions.
///
/// Intended for startup-time use; the registry is treated as read-only once
/// I/O begins.
///
/// # Errors
///
/// Same as [`HandlerRegistry::register`].
///
/// # Examples
///
/// ```rust
/// use omnio::{register_handler, JsonHandler};
/// use std::sync::Arc;
///
/// register_handler(&["geojson"], Arc::new(JsonHandler), false).unwrap();
/// ```
pub fn register_handler(
    formats: &[&str],
    handler: Arc<dyn FileHandler>,
    force: bool,
) -> Result<(), IoError> {
    FILE_HANDLERS
        .write()
        .expect("handler registry poisoned")
        .register(formats, handler, force)
}

/// Resolve a handler from the process-wide registry.
pub(crate) fn resolve_handler(format: &str) -> Result<Arc<dyn FileHandler>, IoError> {
    FILE_HANDLERS
        .read()
        .expect("handler registry poisoned")
        .resolve(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    impl FileHandler for NoopHandler {
        fn load_from_reader(&self, _: &mut dyn Read) -> Result<Value, IoError> {
            Ok(Value::Null)
        }

        fn dump_to_writer(&self, _: &Value, _: &mut dyn Write) -> Result<(), IoError> {
            Ok(())
        }
    }

    struct RawHandler;

    impl FileHandler for RawHandler {
        fn load_from_reader(&self, _: &mut dyn Read) -> Result<Value, IoError> {
            Ok(Value::Null)
        }

        fn dump_to_writer(&self, _: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
            writer
                .write_all(&[0xff, 0xfe])
                .map_err(|e| IoError::encode("raw", e))
        }
    }

    #[test]
    fn default_string_dump_requires_utf8_output() {
        let err = RawHandler.dump_to_string(&Value::Null).unwrap_err();
        assert!(matches!(err, IoError::NotUtf8 { .. }));
    }

    #[test]
    fn defaults_cover_builtin_extensions() {
        let registry = HandlerRegistry::with_defaults();
        for ext in ["json", "yaml", "yml", "toml", "jsonl", "csv", "txt", "byte", "bin", "zst"] {
            assert!(registry.resolve(ext).is_ok(), "missing builtin {ext}");
        }
    }

    #[test]
    fn unregistered_extension_is_an_error() {
        let registry = HandlerRegistry::with_defaults();
        assert!(matches!(
            registry.resolve("xyz123"),
            Err(IoError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn duplicate_registration_requires_force() {
        let mut registry = HandlerRegistry::with_defaults();
        let err = registry
            .register(&["json"], Arc::new(NoopHandler), false)
            .unwrap_err();
        assert!(matches!(err, IoError::HandlerExists { .. }));

        registry
            .register(&["json"], Arc::new(NoopHandler), true)
            .unwrap();
        let handler = registry.resolve("json").unwrap();
        assert!(!handler.path_only());
    }

    #[test]
    fn one_instance_serves_many_extensions() {
        let mut registry = HandlerRegistry::new();
        let handler: Arc<dyn FileHandler> = Arc::new(NoopHandler);
        registry
            .register(&["aaa", "bbb"], Arc::clone(&handler), false)
            .unwrap();
        let a = registry.resolve("aaa").unwrap();
        let b = registry.resolve("bbb").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn empty_format_list_is_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(matches!(
            registry.register(&[], Arc::new(NoopHandler), false),
            Err(IoError::InvalidArgument(_))
        ));
    }
}
