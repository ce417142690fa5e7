//! Zstd-compressed container handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.zst`/`.zstd` files: a zstd stream wrapping a compact JSON
/// document. The compressed-container slot the original tooling filled with
/// gzip, using the compression codec this stack already carries.
#[derive(Debug, Clone, Copy)]
pub struct ZstdHandler {
    level: i32,
}

impl ZstdHandler {
    /// Create a handler compressing at the given zstd level.
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self {
            level: ::zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl FileHandler for ZstdHandler {
    fn str_like(&self) -> bool {
        false
    }

    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let decoder =
            ::zstd::stream::read::Decoder::new(reader).map_err(|e| IoError::decode("zstd", e))?;
        serde_json::from_reader(decoder).map_err(|e| IoError::decode("zstd", e))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let mut encoder = ::zstd::stream::write::Encoder::new(writer, self.level)
            .map_err(|e| IoError::encode("zstd", e))?;
        serde_json::to_writer(&mut encoder, value).map_err(|e| IoError::encode("zstd", e))?;
        encoder.finish().map_err(|e| IoError::encode("zstd", e))?;
        Ok(())
    }

    fn dump_to_string(&self, _: &Value) -> Result<String, IoError> {
        Err(IoError::unsupported("dump_to_string", "zstd handler"))
    }
}
