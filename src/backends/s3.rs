//! S3-compatible object storage backend.
//!
//! Built on [`object_store`] with a private current-thread tokio runtime, so
//! the blocking [`StorageBackend`] contract holds without the caller running
//! an async executor.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use serde::{Deserialize, Serialize};

use crate::backends::{ListIter, ListOptions, StorageBackend};
use crate::error::IoError;

/// Connection settings for [`set_s3_backend`].
///
/// Credentials may be omitted to fall back on the ambient AWS environment;
/// `endpoint` plus `allow_http` covers S3-compatible stores such as MinIO.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Options {
    /// Bucket every `s3://` path must address.
    pub bucket: String,
    /// AWS region, if the endpoint needs one.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static access key id; omit to use the environment.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Static secret access key; omit to use the environment.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Optional session token for temporary credentials.
    #[serde(default)]
    pub session_token: Option<String>,
    /// Permit plain-HTTP endpoints (local test stores).
    #[serde(default)]
    pub allow_http: bool,
}

impl S3Options {
    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| IoError::io("read config", path, e))?;
        toml::from_str(&text).map_err(|e| IoError::InvalidData {
            path: path.display().to_string(),
            details: e.to_string(),
        })
    }
}

/// A connected store plus the runtime that drives it.
struct S3Client {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    runtime: tokio::runtime::Runtime,
}

/// Backend for `s3://bucket/key` paths.
///
/// Starts unconfigured; every operation returns [`IoError::NotConfigured`]
/// until [`set_s3_backend`] (or [`S3Backend::configure`]) installs
/// connection settings. Reconfiguration at runtime replaces the client for
/// all subsequent calls.
#[derive(Default)]
pub struct S3Backend {
    client: RwLock<Option<S3Client>>,
}

impl S3Backend {
    /// Create an unconfigured backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to the bucket described by `options`, replacing any previous
    /// connection.
    pub fn configure(&self, options: &S3Options) -> Result<(), IoError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&options.bucket)
            .with_allow_http(options.allow_http);
        if let Some(region) = &options.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &options.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(key) = &options.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &options.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &options.session_token {
            builder = builder.with_token(token);
        }
        let store = builder.build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| IoError::io("start runtime", "s3", e))?;
        let client = S3Client {
            store: Arc::new(store),
            bucket: options.bucket.clone(),
            runtime,
        };
        *self.client.write().expect("s3 client lock poisoned") = Some(client);
        tracing::info!(bucket = %options.bucket, "s3 backend configured");
        Ok(())
    }

    /// Run `op` against the connected client, or fail with
    /// [`IoError::NotConfigured`].
    fn with_client<T>(&self, op: impl FnOnce(&S3Client) -> Result<T, IoError>) -> Result<T, IoError> {
        let guard = self.client.read().expect("s3 client lock poisoned");
        match guard.as_ref() {
            Some(client) => op(client),
            None => Err(IoError::NotConfigured("s3")),
        }
    }
}

impl S3Client {
    /// Split `s3://bucket/key` and check the bucket against the connection.
    fn key_for(&self, path: &str) -> Result<ObjectPath, IoError> {
        let rest = path
            .strip_prefix("s3://")
            .ok_or_else(|| IoError::InvalidPath {
                path: path.to_owned(),
                reason: "expected an s3:// path".into(),
            })?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket != self.bucket {
            return Err(IoError::InvalidPath {
                path: path.to_owned(),
                reason: format!("bucket {bucket:?} is not the configured {:?}", self.bucket),
            });
        }
        Ok(ObjectPath::from(key))
    }
}

fn map_store_error(path: &str, err: object_store::Error) -> IoError {
    match err {
        object_store::Error::NotFound { .. } => IoError::NotFound {
            path: path.to_owned(),
        },
        other => IoError::from(other),
    }
}

impl StorageBackend for S3Backend {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, IoError> {
        self.with_client(|client| {
            let key = client.key_for(path)?;
            let bytes = client
                .runtime
                .block_on(async {
                    let result = client.store.get(&key).await?;
                    result.bytes().await
                })
                .map_err(|e| map_store_error(path, e))?;
            Ok(bytes.to_vec())
        })
    }

    fn put(&self, data: &[u8], path: &str) -> Result<(), IoError> {
        self.with_client(|client| {
            let key = client.key_for(path)?;
            client
                .runtime
                .block_on(client.store.put(&key, data.to_vec().into()))
                .map_err(|e| map_store_error(path, e))?;
            Ok(())
        })
    }

    fn exists(&self, path: &str) -> Result<bool, IoError> {
        self.with_client(|client| {
            let key = client.key_for(path)?;
            match client.runtime.block_on(client.store.head(&key)) {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(e) => Err(map_store_error(path, e)),
            }
        })
    }

    fn remove(&self, path: &str) -> Result<(), IoError> {
        self.with_client(|client| {
            let key = client.key_for(path)?;
            client
                .runtime
                .block_on(client.store.delete(&key))
                .map_err(|e| map_store_error(path, e))?;
            Ok(())
        })
    }

    fn list_dir_or_file(&self, path: &str, options: &ListOptions) -> Result<ListIter, IoError> {
        options.validate()?;
        self.with_client(|client| {
            let root = client.key_for(path)?;
            let root_prefix = if root.as_ref().is_empty() {
                String::new()
            } else {
                format!("{}/", root.as_ref())
            };

            // Breadth-first over delimited listings so shallow and recursive
            // walks share one code path.
            let mut entries = Vec::new();
            let mut queue = VecDeque::from([root]);
            while let Some(prefix) = queue.pop_front() {
                let listing = client
                    .runtime
                    .block_on(client.store.list_with_delimiter(Some(&prefix)))
                    .map_err(|e| map_store_error(path, e))?;
                for dir in listing.common_prefixes {
                    if let Some(relative) = dir.as_ref().strip_prefix(&root_prefix) {
                        if options.list_dir() {
                            entries.push(relative.to_owned());
                        }
                    }
                    if options.recursive {
                        queue.push_back(dir);
                    }
                }
                for object in listing.objects {
                    let Some(relative) = object.location.as_ref().strip_prefix(&root_prefix)
                    else {
                        continue;
                    };
                    if options.wants_file(relative) {
                        entries.push(relative.to_owned());
                    }
                }
            }
            Ok(ListIter::from_vec(entries))
        })
    }
}

/// The process-wide S3 backend instance registered under `s3://`.
static SHARED: LazyLock<Arc<S3Backend>> = LazyLock::new(|| Arc::new(S3Backend::new()));

pub(crate) fn shared_backend() -> Arc<S3Backend> {
    Arc::clone(&SHARED)
}

/// Configure the shared `s3://` backend.
///
/// Callable at any time; paths resolved after the call use the new
/// connection. Until the first call, every `s3://` operation fails with
/// [`IoError::NotConfigured`].
pub fn set_s3_backend(options: &S3Options) -> Result<(), IoError> {
    SHARED.configure(options)
}
