//! Raw byte passthrough handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.byte` and `.bin` files: no interpretation, the payload is
/// moved as-is between [`Value::Bytes`] and the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteHandler;

impl FileHandler for ByteHandler {
    fn str_like(&self) -> bool {
        false
    }

    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| IoError::decode("byte", e))?;
        Ok(Value::Bytes(buf))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let bytes = value.as_bytes().ok_or(IoError::ValueType {
            expected: "bytes",
            found: value.type_name(),
        })?;
        writer
            .write_all(bytes)
            .map_err(|e| IoError::encode("byte", e))
    }

    fn dump_to_string(&self, _: &Value) -> Result<String, IoError> {
        Err(IoError::unsupported("dump_to_string", "byte handler"))
    }
}
