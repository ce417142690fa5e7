//! CSV handler.

use std::io::{Read, Write};

use crate::error::IoError;
use crate::handlers::FileHandler;
use crate::value::Value;

/// Handler for `.csv` files.
///
/// Loading yields rows as a [`Value::Array`] of arrays of strings; no type
/// inference is attempted on cells. Dumping requires an array of array rows
/// (the same shape), where cells may be strings or scalars; scalars are
/// rendered in their canonical text form.
///
/// Quoting follows RFC 4180: fields containing a comma, quote, or line break
/// are quoted on output, and quoted fields with doubled quotes are accepted
/// on input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvHandler;

impl FileHandler for CsvHandler {
    fn load_from_reader(&self, reader: &mut dyn Read) -> Result<Value, IoError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| IoError::decode("csv", e))?;
        let rows = parse_csv(&text)?;
        Ok(Value::Array(
            rows.into_iter()
                .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                .collect(),
        ))
    }

    fn dump_to_writer(&self, value: &Value, writer: &mut dyn Write) -> Result<(), IoError> {
        let text = self.dump_to_string(value)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| IoError::encode("csv", e))
    }

    fn dump_to_string(&self, value: &Value) -> Result<String, IoError> {
        let rows = value.as_array().ok_or(IoError::ValueType {
            expected: "array of array rows",
            found: value.type_name(),
        })?;
        let mut out = String::new();
        for row in rows {
            let cells = row.as_array().ok_or(IoError::ValueType {
                expected: "array of array rows",
                found: row.type_name(),
            })?;
            for (i, cell) in cells.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_cell(&mut out, cell)?;
            }
            out.push_str("\r\n");
        }
        Ok(out)
    }
}

fn write_cell(out: &mut String, cell: &Value) -> Result<(), IoError> {
    let text = match cell {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => {
            return Err(IoError::ValueType {
                expected: "string or scalar cell",
                found: other.type_name(),
            });
        }
    };
    if text.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&text.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(&text);
    }
    Ok(())
}

/// Minimal RFC 4180 record parser. A trailing line terminator does not
/// produce an empty final record.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, IoError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // True once the current record has any content, so blank trailing input
    // is not a record of one empty field.
    let mut field_started = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                // A fully blank line is not a record of one empty field.
                if field_started || !field.is_empty() || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                field_started = false;
            }
            '\n' => {
                if field_started || !field.is_empty() || !row.is_empty() {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                field_started = false;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }
    if in_quotes {
        return Err(IoError::decode(
            "csv",
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unterminated quoted field",
            ),
        ));
    }
    if field_started || !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}
