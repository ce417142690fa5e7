//! TOML handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.toml` files.
///
/// TOML is string-based, so both directions go through the string form.
/// Dumping requires a top-level [`Value::Map`]; the `toml` serializer rejects
/// anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlHandler;

impl FileHandler for TomlHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| IoError::decode("toml", e))?;
        ::toml::from_str(&text).map_err(|e| IoError::decode("toml", e))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let text = self.dump_to_string(value)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| IoError::encode("toml", e))
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        if value.as_map().is_none() {
            return Err(IoError::ValueType {
                expected: "map",
                found: value.type_name(),
            });
        }
        ::toml::to_string(value).map_err(|e| IoError::encode("toml", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::map_from;
    use std::io::Cursor;

    #[test]
    fn round_trip_table() {
        let value = map_from([
            ("title", Value::from("example")),
            ("port", Value::Int(8080)),
        ]);
        let text = TomlHandler.dump_to_string(&value).unwrap();
        let back = TomlHandler
            .load_from_reader(&mut Cursor::new(text.into_bytes()))
            .unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn non_table_dump_is_rejected() {
        let err = TomlHandler.dump_to_string(&Value::Int(3)).unwrap_err();
        assert!(matches!(err, IoError::ValueType { expected: "map", .. }));
    }
}
