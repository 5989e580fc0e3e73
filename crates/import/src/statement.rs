use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use std::collections::{BTreeMap, HashSet};

use crate::error::ImportError;

/// One data row of a statement table, keyed by its trimmed transaction id.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl StatementRow {
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or_default()
    }
}

/// Decodes `bytes` with the named encoding, refusing any input that would
/// need replacement characters. A matching BOM is honoured and stripped.
pub fn decode_strict(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom, len)) if bom == encoding => (bom, &bytes[len..]),
        Some((bom, len)) if encoding == UTF_16LE && bom == UTF_16BE => (bom, &bytes[len..]),
        _ => (encoding, bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
}

/// Returns the text after `checkpoint_line` (1-indexed) when that line starts
/// with `marker`.
pub fn after_checkpoint<'a>(text: &'a str, checkpoint_line: usize, marker: &str) -> Option<&'a str> {
    if checkpoint_line == 0 {
        return None;
    }
    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        if idx + 1 == checkpoint_line {
            return line.starts_with(marker).then(|| &text[offset..]);
        }
    }
    None
}

pub fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

/// Parses a headed CSV table into rows sorted by trimmed id. Rows without an
/// id are skipped; a header lacking `id_column` is a format error.
pub fn read_table(csv_text: &str, id_column: &str) -> Result<Vec<StatementRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if !headers.iter().any(|h| h == id_column) {
        return Err(ImportError::Format(format!("missing column '{id_column}'")));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(h, _)| !h.is_empty())
            .map(|(h, v)| (h.clone(), v.trim().to_string()))
            .collect();
        let id = fields.get(id_column).cloned().unwrap_or_default();
        if id.is_empty() {
            tracing::debug!("skipping statement row without {id_column}");
            continue;
        }
        rows.push(StatementRow { id, fields });
    }

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(rows)
}

/// Fails on the first transaction id that appears twice.
pub fn ensure_unique(rows: &[StatementRow]) -> Result<(), ImportError> {
    let mut seen = HashSet::new();
    for row in rows {
        if !seen.insert(row.id.as_str()) {
            return Err(ImportError::Duplicate(row.id.clone()));
        }
    }
    Ok(())
}
