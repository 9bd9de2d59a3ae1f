//! I/O utilities for opening and decoding the sales source.
//!
//! Every read of the source flows through this module:
//!
//! - **Delimiter resolution**: extension-based detection (`.tsv` → tab,
//!   anything else → comma) with manual override.
//! - **Encoding**: cells are decoded via `encoding_rs`, defaulting to UTF-8.
//!   Spreadsheet exports are frequently `windows-1252`.
//! - **Reader construction**: strict field counts, double-quote escaping.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::anyhow;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{ReportError, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const UTF8_BOM: &str = "\u{feff}";

pub fn resolve_encoding(label: Option<&str>) -> anyhow::Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| ReportError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Decodes every field of `record`; `row` is the 1-based line used in errors.
pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    row: usize,
) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| {
            decode_bytes(field, encoding).ok_or(ReportError::Encoding {
                row,
                encoding: encoding.name(),
            })
        })
        .collect()
}

/// Reads the header row, stripping a leading byte-order mark.
pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    let mut decoded = decode_record(&headers, encoding, 1)?;
    if let Some(first) = decoded.first_mut()
        && let Some(stripped) = first.strip_prefix(UTF8_BOM)
    {
        *first = stripped.to_string();
    }
    Ok(decoded)
}
