//! Delimited-text reading and writing.
//!
//! Handles the subset of RFC 4180 that model-scoring tools actually emit:
//! a header row, a single-character delimiter, double-quoted fields with
//! `""` escapes and embedded newlines, and either `\n` or `\r\n` line ends.
//! Input bytes are decoded lossily so a stray Latin-1 byte does not abort a
//! whole run; a leading UTF-8 BOM is dropped.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::Dataset;
use crate::types::Value;

/// Split delimited text into raw records. Blank lines are skipped.
pub fn parse_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        bail!("unterminated quoted field starting before line {}", line);
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

/// Parse delimited text with a header row into a typed [`Dataset`].
pub fn read_delimited(text: &str, delimiter: char) -> Result<Dataset> {
    let mut records = parse_records(text, delimiter)?.into_iter();
    let Some(header) = records.next() else {
        bail!("delimited input has no header row");
    };

    let width = header.len();
    let rows = records
        .enumerate()
        .map(|(idx, record)| {
            if record.len() != width {
                bail!(
                    "data row {} has {} fields, header has {}",
                    idx + 1,
                    record.len(),
                    width
                );
            }
            Ok(record.iter().map(|cell| Value::parse_cell(cell)).collect())
        })
        .collect::<Result<Vec<Vec<Value>>>>()?;

    let columns = header.into_iter().map(|h| h.trim().to_string()).collect();
    Ok(Dataset::new(columns, rows)?)
}

/// Load a dataset from a delimited text file.
pub fn read_delimited_path(path: &Path, delimiter: char) -> Result<Dataset> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    read_delimited(&text, delimiter).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a dataset with a header row. Missing cells are written empty.
pub fn write_delimited<W: Write>(dataset: &Dataset, writer: W, delimiter: char) -> io::Result<()> {
    let mut out = BufWriter::new(writer);
    write_record(&mut out, dataset.columns().iter().map(String::as_str), delimiter)?;
    for row in dataset.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        write_record(&mut out, cells.iter().map(String::as_str), delimiter)?;
    }
    out.flush()
}

pub fn write_delimited_path(dataset: &Dataset, path: &Path, delimiter: char) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_delimited(dataset, file, delimiter).with_context(|| format!("Failed to write {}", path.display()))
}

pub(crate) fn write_record<'a, W: Write>(
    out: &mut W,
    fields: impl Iterator<Item = &'a str>,
    delimiter: char,
) -> io::Result<()> {
    for (idx, field) in fields.enumerate() {
        if idx > 0 {
            write!(out, "{}", delimiter)?;
        }
        let needs_quotes = field.contains(delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r');
        if needs_quotes {
            write!(out, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            out.write_all(field.as_bytes())?;
        }
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let records = parse_records("a,b\n\"x, y\",\"say \"\"hi\"\"\"\r\n\n1,\n", ',').unwrap();
        assert_eq!(
            records,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["x, y".to_string(), "say \"hi\"".to_string()],
                vec!["1".to_string(), String::new()],
            ]
        );
    }

    #[test]
    fn test_parse_embedded_newline_and_no_trailing_newline() {
        let records = parse_records("a\n\"line1\nline2\"", ',').unwrap();
        assert_eq!(records[1], vec!["line1\nline2".to_string()]);
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert!(parse_records("a\n\"oops", ',').is_err());
    }

    #[test]
    fn test_read_typed_dataset() {
        let ds = read_delimited("\u{feff}price;colour\n10;red\n;blue\n", ';').unwrap();
        assert_eq!(ds.columns(), &["price".to_string(), "colour".to_string()]);
        assert_eq!(ds.rows()[0], vec![Value::Number(10.0), Value::text("red")]);
        assert_eq!(ds.rows()[1], vec![Value::Missing, Value::text("blue")]);
    }

    #[test]
    fn test_read_rejects_ragged_rows() {
        let err = read_delimited("a,b\n1,2,3\n", ',').unwrap_err();
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_write_then_read_preserves_cells() {
        let ds = read_delimited("name,score\n\"Smith, J\",1.5\nLee,\n", ',').unwrap();
        let mut buf = Vec::new();
        write_delimited(&ds, &mut buf, ',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "name,score\n\"Smith, J\",1.5\nLee,\n");
    }

    #[test]
    fn test_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let ds = read_delimited("x,y\n1,2\n", ',').unwrap();
        write_delimited_path(&ds, &path, ',').unwrap();
        assert_eq!(read_delimited_path(&path, ',').unwrap(), ds);
    }
}
