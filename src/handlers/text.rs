//! Plain text handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.txt` files. Loads the whole file as a [`Value::String`];
/// dumps strings as-is and renders scalar values in their canonical text
/// form. Composite values are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextHandler;

impl FileHandler for TextHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| IoError::decode("txt", e))?;
        Ok(Value::String(text))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let text = self.dump_to_string(value)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| IoError::encode("txt", e))
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(IoError::ValueType {
                expected: "string or scalar",
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_string() {
        let value = Value::from("two\nlines");
        let text = TextHandler.dump_to_string(&value).unwrap();
        let back = TextHandler
            .load_from_reader(&mut Cursor::new(text.into_bytes()))
            .unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn scalars_are_stringified() {
        assert_eq!(TextHandler.dump_to_string(&Value::Int(7)).unwrap(), "7");
        assert_eq!(
            TextHandler.dump_to_string(&Value::Bool(false)).unwrap(),
            "false"
        );
    }

    #[test]
    fn composite_values_are_rejected() {
        let err = TextHandler
            .dump_to_string(&Value::Array(vec![]))
            .unwrap_err();
        assert!(matches!(err, IoError::ValueType { .. }));
    }
}
