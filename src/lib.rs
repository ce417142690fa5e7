//! # omnio
//!
//! One `load`/`dump` pair for every file format and storage system you use.
//!
//! A path like `s3://corpus/meta/run.json` is split along two axes: the
//! prefix picks a [`StorageBackend`] (local disk, HTTP, S3) and the
//! extension picks a [`FileHandler`] (JSON, YAML, TOML, JSON Lines, CSV,
//! text, raw bytes, zstd). Both axes are open: register your own backends
//! and handlers and the same two calls cover them.
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Value`] | Self-describing data model moved in and out of files |
//! | [`FileHandler`] | Encodes/decodes one format |
//! | [`StorageBackend`] | Raw byte/text I/O against one storage system |
//! | [`IoError`] | Every failure, as a typed variant |
//! | [`LocalPath`] | Scoped local mirror of a possibly-remote file |
//!
//! ## Quick Start
//!
//! ```no_run
//! use omnio::{Value, dump, load, map_from};
//!
//! # fn main() -> Result<(), omnio::IoError> {
//! let config = map_from([
//!     ("name", Value::from("run-7")),
//!     ("epochs", Value::from(20)),
//! ]);
//! dump(&config, "/tmp/run.json")?;
//!
//! let back = load("/tmp/run.json")?;
//! assert_eq!(back["epochs"].as_i64(), Some(20));
//! # Ok(())
//! # }
//! ```
//!
//! The same calls work against remote storage once the backend is
//! configured:
//!
//! ```no_run
//! use omnio::{S3Options, load, set_s3_backend};
//!
//! # fn main() -> Result<(), omnio::IoError> {
//! set_s3_backend(&S3Options {
//!     bucket: "corpus".into(),
//!     ..S3Options::default()
//! })?;
//! let manifest = load("s3://corpus/meta/manifest.yaml")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Registries
//!
//! Two process-wide registries back the entry points. Built-ins are
//! installed on first use: the local backend under the empty (default)
//! prefix, `s3` under `s3://`, `http` under `http://` and `https://`, and a
//! handler for each built-in extension. [`register_backend`] and
//! [`register_handler`] extend them; registration is meant for startup,
//! after which the registries are effectively read-only.
//!
//! ## Thread Safety
//!
//! All entry points take shared references and are safe to call from any
//! thread. Backends and handlers are `Send + Sync` and one instance serves
//! every call.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Provides |
//! |---------|---------|----------|
//! | `http` | yes | [`HttpBackend`] for `http://`/`https://` URLs |
//! | `s3` | yes | [`S3Backend`] for `s3://` paths |

pub mod backends;
pub mod error;
pub mod handlers;
pub mod value;

mod dispatch;

pub use backends::{
    BackendRegistry, ListIter, ListOptions, LocalBackend, LocalPath, StorageBackend,
    register_backend,
};
pub use dispatch::{
    backend_for, copyfile_from_local, dump, dump_with, exists, format_from_path, get_local_path,
    list_dir_or_file, load, load_with, remove,
};
pub use error::IoError;
pub use handlers::{
    ByteHandler, CsvHandler, FileHandler, HandlerRegistry, JsonHandler, JsonlHandler, TextHandler,
    TomlHandler, YamlHandler, ZstdHandler, register_handler,
};
pub use value::{Value, map_from};

#[cfg(feature = "http")]
pub use backends::HttpBackend;

#[cfg(feature = "s3")]
pub use backends::{S3Backend, S3Options, set_s3_backend};
