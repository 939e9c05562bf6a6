use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Map, Value as JsonValue};
use std::io::Cursor;

use super::UploadError;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Json,
    Csv,
    Excel,
}

impl UploadFormat {
    /// Pick a format from the file extension.
    pub fn from_file_name(name: &str) -> Result<Self, UploadError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Excel),
            _ => Err(UploadError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// Decode the whole payload into raw rows. Rows are not validated here.
pub fn decode(bytes: &[u8], format: UploadFormat) -> Result<Vec<JsonValue>, UploadError> {
    match format {
        UploadFormat::Json => decode_json(bytes),
        UploadFormat::Csv => decode_csv(bytes),
        UploadFormat::Excel => decode_excel(bytes),
    }
}

fn decode_json(bytes: &[u8]) -> Result<Vec<JsonValue>, UploadError> {
    let value: JsonValue =
        serde_json::from_slice(bytes).map_err(|e| UploadError::Malformed(e.to_string()))?;
    match value {
        JsonValue::Array(rows) => Ok(rows),
        _ => Err(UploadError::NotAnArray),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<JsonValue>, UploadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| UploadError::Malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(UploadError::EmptySheet);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| UploadError::Malformed(e.to_string()))?;
        let mut row = Map::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if !header.is_empty() {
                row.insert(header.clone(), JsonValue::String(field.to_string()));
            }
        }
        rows.push(JsonValue::Object(row));
    }

    Ok(rows)
}

fn decode_excel(bytes: &[u8]) -> Result<Vec<JsonValue>, UploadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| UploadError::Malformed(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(UploadError::EmptySheet)?
        .map_err(|e| UploadError::Malformed(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect(),
        None => return Err(UploadError::EmptySheet),
    };

    let rows = rows_iter
        .map(|cells| {
            let mut row = Map::new();
            for (header, cell) in headers.iter().zip(cells) {
                if !header.is_empty() {
                    row.insert(header.clone(), cell_to_json(cell));
                }
            }
            JsonValue::Object(row)
        })
        .collect();

    Ok(rows)
}

fn cell_to_json(cell: &Data) -> JsonValue {
    match cell {
        Data::Empty => JsonValue::Null,
        Data::Bool(b) => JsonValue::Bool(*b),
        Data::Int(i) => JsonValue::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Data::String(s) => JsonValue::String(s.clone()),
        other => JsonValue::String(other.to_string()),
    }
}
