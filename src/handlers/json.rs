//! JSON handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.json` files, backed by `serde_json`. Output is compact;
/// register a configured instance under another extension for pretty output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

impl FileHandler for JsonHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        serde_json::from_reader(reader).map_err(|e| IoError::decode("json", e))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        serde_json::to_writer(writer, value).map_err(|e| IoError::encode("json", e))
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        serde_json::to_string(value).map_err(|e| IoError::encode("json", e))
    }
}
