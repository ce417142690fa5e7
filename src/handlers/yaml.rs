//! YAML handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.yaml` and `.yml` files, backed by `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlHandler;

impl FileHandler for YamlHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        serde_yaml::from_reader(reader).map_err(|e| IoError::decode("yaml", e))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        serde_yaml::to_writer(writer, value).map_err(|e| IoError::encode("yaml", e))
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        serde_yaml::to_string(value).map_err(|e| IoError::encode("yaml", e))
    }
}
