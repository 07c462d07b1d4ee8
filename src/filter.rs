use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::Thresholds;
use crate::export::{AVG_SEQ_LENGTH_COLUMN, BPS_COLUMN, ExportRow, SEQUENCES_COLUMN};

impl Thresholds {
    pub fn accepts(&self, row: &ExportRow) -> bool {
        row.avg_seq_length >= self.min_avg_seq_length
            && row.avg_seq_length <= self.max_avg_seq_length
            && row.bps as f64 >= self.min_bps
    }
}

pub fn filter<'a, I>(rows: I, thresholds: &Thresholds) -> Vec<&'a ExportRow>
where
    I: IntoIterator<Item = &'a ExportRow>,
{
    rows.into_iter()
        .filter(|row| thresholds.accepts(row))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub field: &'static str,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

pub fn column_stats(rows: &[&ExportRow]) -> Vec<ColumnStats> {
    if rows.is_empty() {
        return Vec::new();
    }
    let columns: [(&'static str, fn(&ExportRow) -> f64); 3] = [
        (BPS_COLUMN, |row| row.bps as f64),
        (SEQUENCES_COLUMN, |row| row.sequences as f64),
        (AVG_SEQ_LENGTH_COLUMN, |row| row.avg_seq_length),
    ];
    columns
        .into_iter()
        .map(|(field, value)| {
            let values = rows.iter().map(|row| value(*row));
            let (min, max, sum) = values.fold(
                (f64::INFINITY, f64::NEG_INFINITY, 0.0),
                |(min, max, sum), v| (min.min(v), max.max(v), sum + v),
            );
            ColumnStats {
                field,
                min,
                mean: sum / rows.len() as f64,
                max,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodCount {
    pub method: String,
    pub filtered: usize,
    pub all: usize,
}

pub fn method_counts(filtered: &[&ExportRow], all: &[ExportRow]) -> Vec<MethodCount> {
    let mut counts = BTreeMap::<&str, (usize, usize)>::new();
    for row in all {
        counts.entry(row.sequencing_method.as_str()).or_default().1 += 1;
    }
    for row in filtered {
        counts.entry(row.sequencing_method.as_str()).or_default().0 += 1;
    }
    let mut result: Vec<MethodCount> = counts
        .into_iter()
        .map(|(method, (filtered, all))| MethodCount {
            method: method.to_string(),
            filtered,
            all,
        })
        .collect();
    result.push(MethodCount {
        method: "Total".to_string(),
        filtered: filtered.len(),
        all: all.len(),
    });
    result
}
