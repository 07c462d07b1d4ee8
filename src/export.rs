use std::fs;

use camino::Utf8Path;
use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

use crate::domain::MetagenomeId;
use crate::error::SurveyError;

pub const ID_COLUMN: &str = "id";
pub const BPS_COLUMN: &str = "bps";
pub const SEQUENCES_COLUMN: &str = "sequences";
pub const AVG_SEQ_LENGTH_COLUMN: &str = "avg_seq_length";
pub const METHOD_COLUMN: &str = "sequencing_method";
pub const TYPE_COLUMN: &str = "sequencing_type";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: MetagenomeId,
    pub bps: u64,
    pub sequences: u64,
    pub avg_seq_length: f64,
    pub sequencing_method: String,
    pub sequencing_type: String,
    pub fields: Vec<(String, String)>,
}

impl ExportRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        lookup(&self.fields, column)
    }

    fn from_fields(line: usize, fields: Vec<(String, String)>) -> Result<Self, SurveyError> {
        let id = required(&fields, ID_COLUMN)?.parse()?;
        let bps = coerce(line, &fields, BPS_COLUMN)?;
        let sequences = coerce(line, &fields, SEQUENCES_COLUMN)?;
        let avg_seq_length = coerce(line, &fields, AVG_SEQ_LENGTH_COLUMN)?;
        let sequencing_method = lookup(&fields, METHOD_COLUMN).unwrap_or_default().to_string();
        let sequencing_type = lookup(&fields, TYPE_COLUMN).unwrap_or_default().to_string();
        Ok(Self {
            id,
            bps,
            sequences,
            avg_seq_length,
            sequencing_method,
            sequencing_type,
            fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Export {
    pub header: Vec<String>,
    pub rows: Vec<ExportRow>,
}

// a repeated header name resolves to its last cell
fn lookup<'a>(fields: &'a [(String, String)], column: &str) -> Option<&'a str> {
    fields
        .iter()
        .rev()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value.as_str())
}

fn required<'a>(fields: &'a [(String, String)], column: &str) -> Result<&'a str, SurveyError> {
    lookup(fields, column).ok_or_else(|| SurveyError::MissingColumn(column.to_string()))
}

fn coerce<T: std::str::FromStr>(
    line: usize,
    fields: &[(String, String)],
    column: &str,
) -> Result<T, SurveyError> {
    let value = required(fields, column)?;
    value
        .trim()
        .parse()
        .map_err(|_| SurveyError::TypeConversion {
            row: line,
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Repairs the two artifacts the web table's TSV download is known to carry:
/// doubled tabs and literal `&nbsp;` entities.
pub fn normalize(text: &str) -> String {
    text.replace("\t\t", "\t").replace("&nbsp;", "_")
}

fn tsv_reader(text: &str) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_bytes())
}

fn read_header(reader: &mut Reader<&[u8]>) -> Result<Option<Vec<String>>, SurveyError> {
    let header: Vec<String> = reader
        .headers()
        .map_err(|err| SurveyError::MalformedExport(err.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.iter().all(|cell| cell.is_empty()) {
        return Ok(None);
    }
    Ok(Some(header))
}

fn data_records(reader: &mut Reader<&[u8]>) -> Result<Vec<(usize, StringRecord)>, SurveyError> {
    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|err| SurveyError::MalformedExport(err.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(index + 2);
        records.push((line, record));
    }
    Ok(records)
}

pub fn parse(text: &str) -> Result<Option<Export>, SurveyError> {
    let mut reader = tsv_reader(text);
    let Some(header) = read_header(&mut reader)? else {
        return Ok(None);
    };

    let mut rows = Vec::new();
    for (line, record) in data_records(&mut reader)? {
        let fields = header
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(ExportRow::from_fields(line, fields)?);
    }
    Ok(Some(Export { header, rows }))
}

fn read_normalized(path: &Utf8Path) -> Result<(String, String), SurveyError> {
    let raw = fs::read_to_string(path.as_std_path())
        .map_err(|err| SurveyError::Filesystem(format!("read {path}: {err}")))?;
    let text = normalize(&raw);
    Ok((raw, text))
}

pub fn load(path: &Utf8Path, rewrite: bool) -> Result<Export, SurveyError> {
    let (raw, text) = read_normalized(path)?;
    if rewrite && text != raw {
        crate::fs_util::write_atomic(path, text.as_bytes())?;
        tracing::info!("rewrote normalized export {path}");
    }
    let export =
        parse(&text)?.ok_or_else(|| SurveyError::EmptyExport(path.as_std_path().to_path_buf()))?;
    tracing::info!("loaded {} metagenomes from {path}", export.rows.len());
    Ok(export)
}

pub fn load_ids(path: &Utf8Path) -> Result<Vec<MetagenomeId>, SurveyError> {
    let (_, text) = read_normalized(path)?;
    let mut reader = tsv_reader(&text);
    if read_header(&mut reader)?.is_none() {
        return Err(SurveyError::EmptyExport(path.as_std_path().to_path_buf()));
    }
    data_records(&mut reader)?
        .iter()
        .map(|(_, record)| record.get(0).unwrap_or_default().parse())
        .collect()
}
