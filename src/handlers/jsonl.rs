//! Newline-delimited JSON (JSONL) handler.

use std::io::{BufRead, BufReader, Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.jsonl` files: one JSON document per line.
///
/// Loading yields a [`Value::Array`] with one element per non-empty line;
/// dumping requires an array and writes one compact document per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlHandler;

impl FileHandler for JsonlHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let mut items = Vec::new();
        for line in BufReader::new(reader).lines() {
            let line = line.map_err(|e| IoError::decode("jsonl", e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            items.push(serde_json::from_str(line).map_err(|e| IoError::decode("jsonl", e))?);
        }
        Ok(Value::Array(items))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let items = value.as_array().ok_or(IoError::ValueType {
            expected: "array",
            found: value.type_name(),
        })?;
        for item in items {
            serde_json::to_writer(&mut *writer, item).map_err(|e| IoError::encode("jsonl", e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| IoError::encode("jsonl", e))?;
        }
        Ok(())
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        let items = value.as_array().ok_or(IoError::ValueType {
            expected: "array",
            found: value.type_name(),
        })?;
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            lines.push(serde_json::to_string(item).map_err(|e| IoError::encode("jsonl", e))?);
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::map_from;
    use std::io::Cursor;

    #[test]
    fn skips_blank_lines_on_load() {
        let input = b"{\"a\":1}\n\n{\"a\":2}\n".to_vec();
        let v = JsonlHandler
            .load_from_reader(&mut Cursor::new(input))
            .unwrap();
        let items = v.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["a"], Value::Int(2));
    }

    #[test]
    fn round_trip_array_of_maps() {
        let value = Value::Array(vec![
            map_from([("k", Value::Int(1))]),
            map_from([("k", Value::Int(2))]),
        ]);
        let mut buf = Vec::new();
        JsonlHandler.dump_to_writer(&value, &mut buf).unwrap();
        let back = JsonlHandler.load_from_reader(&mut Cursor::new(buf)).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn non_array_dump_is_rejected() {
        let err = JsonlHandler.dump_to_string(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, IoError::ValueType { .. }));
    }
}
