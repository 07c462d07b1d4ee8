use serde::Serialize;
use serde_json::Value;

use crate::cache::MetadataCache;
use crate::error::SurveyError;

pub const TAXONOMY_LEVELS: [&str; 3] = ["phylum", "class", "order"];
pub const TAXONOMY_TOP: usize = 10;
pub const SEQUENCE_STAT_FIELDS: [&str; 6] = [
    "bp_count_raw",
    "sequence_count_raw",
    "average_length_raw",
    "standard_deviation_length_raw",
    "average_gc_content_raw",
    "standard_deviation_gc_content_raw",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyLevel {
    pub level: &'static str,
    pub top: Vec<TaxonCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetagenomeSummary {
    pub name: String,
    pub id: String,
    pub project: String,
    pub sequence_type: String,
    pub mixs: Vec<(String, String)>,
    pub taxonomy: Vec<TaxonomyLevel>,
    pub sequence_stats: Vec<(&'static str, String)>,
}

fn field<'a>(document: &'a Value, path: &[&str]) -> Result<&'a Value, SurveyError> {
    path.iter().try_fold(document, |value, key| {
        value
            .get(*key)
            .ok_or_else(|| SurveyError::MissingField(path.join(".")))
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn parse_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn top_taxa(document: &Value, level: &str) -> Result<Vec<TaxonCount>, SurveyError> {
    let path = ["statistics", "taxonomy", level];
    let entries = field(document, &path)?
        .as_array()
        .ok_or_else(|| SurveyError::MissingField(path.join(".")))?;

    let mut taxa = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<TaxonCount, SurveyError> {
            let missing = || SurveyError::MissingField(format!("{}[{index}]", path.join(".")));
            let name = entry.get(0).ok_or_else(missing)?;
            let count = entry.get(1).and_then(parse_count).ok_or_else(missing)?;
            Ok(TaxonCount {
                name: display(name),
                count,
            })
        })
        .collect::<Result<Vec<_>, SurveyError>>()?;
    // stable, so ties keep document order
    taxa.sort_by(|a, b| b.count.cmp(&a.count));
    taxa.truncate(TAXONOMY_TOP);
    Ok(taxa)
}

impl MetagenomeSummary {
    pub fn from_document(document: &Value) -> Result<Self, SurveyError> {
        let project = field(document, &["project"])?
            .get(0)
            .ok_or_else(|| SurveyError::MissingField("project[0]".to_string()))?;
        let mixs = field(document, &["mixs"])?
            .as_object()
            .ok_or_else(|| SurveyError::MissingField("mixs".to_string()))?
            .iter()
            .map(|(key, value)| (key.clone(), display(value)))
            .collect();
        let taxonomy = TAXONOMY_LEVELS
            .iter()
            .map(|level| -> Result<TaxonomyLevel, SurveyError> {
                Ok(TaxonomyLevel {
                    level: *level,
                    top: top_taxa(document, level)?,
                })
            })
            .collect::<Result<Vec<_>, SurveyError>>()?;
        let sequence_stats = SEQUENCE_STAT_FIELDS
            .iter()
            .map(|name| -> Result<(&'static str, String), SurveyError> {
                let value = field(document, &["statistics", "sequence_stats", *name])?;
                Ok((*name, display(value)))
            })
            .collect::<Result<Vec<_>, SurveyError>>()?;

        Ok(Self {
            name: display(field(document, &["name"])?),
            id: display(field(document, &["id"])?),
            project: display(project),
            sequence_type: display(field(document, &["sequence_type"])?),
            mixs,
            taxonomy,
            sequence_stats,
        })
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn html_table<K: AsRef<str>, V: AsRef<str>>(rows: &[(K, V)]) -> String {
    let mut html = String::from("<table class=\"wikitable\">\n");
    for (key, value) in rows {
        html.push_str("    <tr>\n");
        html.push_str(&format!("        <td>{}</td>\n", escape_html(key.as_ref())));
        html.push_str(&format!("        <td>{}</td>\n", escape_html(value.as_ref())));
        html.push_str("    </tr>\n");
    }
    html.push_str("</table>");
    html
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_html(summaries: &[MetagenomeSummary]) -> String {
    let mut html = String::from("== Putative Assemblies ==\n");
    for summary in summaries {
        html.push_str(&format!("=== {} ===\n", escape_html(&summary.name)));
        html.push_str(&html_table(&[
            ("Name", summary.name.as_str()),
            ("ID", summary.id.as_str()),
            ("Project", summary.project.as_str()),
            ("Sequence Type", summary.sequence_type.as_str()),
        ]));
        html.push_str("\n\n");

        html.push_str("==== MIXS ====\n");
        html.push_str(&html_table(&summary.mixs));
        html.push_str("\n\n");

        html.push_str("==== Taxonomy ====\n");
        for level in &summary.taxonomy {
            html.push_str(&format!("===== {} =====\n", capitalize(level.level)));
            let rows: Vec<(&str, String)> = level
                .top
                .iter()
                .map(|taxon| (taxon.name.as_str(), taxon.count.to_string()))
                .collect();
            html.push_str(&html_table(&rows));
            html.push_str("\n\n");
        }

        html.push_str("==== Sequence Statistics ====\n");
        html.push_str(&html_table(&summary.sequence_stats));
        html.push_str("\n\n\n");
    }
    html
}

pub fn build_report(cache: &MetadataCache) -> Result<(String, usize), SurveyError> {
    let mut summaries = Vec::new();
    for id in cache.ids()? {
        let document = cache.load(&id)?;
        let summary = MetagenomeSummary::from_document(&document).map_err(|err| match err {
            SurveyError::MissingField(path) => SurveyError::MissingField(format!("{id}: {path}")),
            other => other,
        })?;
        summaries.push(summary);
    }
    Ok((render_html(&summaries), summaries.len()))
}

pub fn render_table(headers: Option<&[&str]>, rows: &[Vec<String>]) -> String {
    let columns = headers
        .map(|headers| headers.len())
        .into_iter()
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    let all_rows = headers
        .map(|headers| headers.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
        .into_iter()
        .chain(rows.iter().cloned());
    for row in all_rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };
    let format_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (index, width) in widths.iter().enumerate() {
            let cell = cells.get(index).map(String::as_str).unwrap_or("");
            let pad = width - cell.chars().count();
            line.push_str(&format!(" {cell}{} |", " ".repeat(pad)));
        }
        line
    };

    let mut out = vec![border.clone()];
    if let Some(headers) = headers {
        let cells: Vec<String> = headers.iter().map(|cell| cell.to_string()).collect();
        out.push(format_row(&cells));
        out.push(border.clone());
    }
    for row in rows {
        out.push(format_row(row));
    }
    out.push(border);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn document() -> Value {
        let phylum: Vec<Value> = (0..12)
            .map(|n| json!([format!("phylum{n}"), (n * 10).to_string()]))
            .collect();
        json!({
            "name": "soil <A>",
            "id": "mgm4447192.3",
            "project": ["mgp128", "http://api.metagenomics.anl.gov/project/mgp128"],
            "sequence_type": "WGS",
            "mixs": {"biome": "soil", "latitude": 41.7},
            "statistics": {
                "taxonomy": {
                    "phylum": phylum,
                    "class": [["Bacilli", 5], ["Clostridia", "7"]],
                    "order": []
                },
                "sequence_stats": {
                    "bp_count_raw": "150000000",
                    "sequence_count_raw": "500000",
                    "average_length_raw": "3000",
                    "standard_deviation_length_raw": "120",
                    "average_gc_content_raw": "52",
                    "standard_deviation_gc_content_raw": "9",
                    "ignored": "x"
                }
            }
        })
    }

    #[test]
    fn summary_extracts_fields() {
        let summary = MetagenomeSummary::from_document(&document()).unwrap();
        assert_eq!(summary.project, "mgp128");
        assert_eq!(
            summary.mixs,
            vec![
                ("biome".to_string(), "soil".to_string()),
                ("latitude".to_string(), "41.7".to_string())
            ]
        );
        let phylum = &summary.taxonomy[0];
        assert_eq!(phylum.top.len(), TAXONOMY_TOP);
        assert_eq!(phylum.top[0].name, "phylum11");
        assert_eq!(summary.taxonomy[1].top[0].name, "Clostridia");
        assert!(summary.taxonomy[2].top.is_empty());
        assert_eq!(summary.sequence_stats.len(), 6);
    }

    #[test]
    fn missing_field_is_fatal() {
        let mut doc = document();
        doc["statistics"]["sequence_stats"]
            .as_object_mut()
            .unwrap()
            .remove("average_gc_content_raw");
        let err = MetagenomeSummary::from_document(&doc).unwrap_err();
        assert_matches!(
            err,
            SurveyError::MissingField(ref path)
                if path == "statistics.sequence_stats.average_gc_content_raw"
        );
    }

    #[test]
    fn html_sections_and_escaping() {
        let summary = MetagenomeSummary::from_document(&document()).unwrap();
        let html = render_html(&[summary]);
        assert!(html.starts_with("== Putative Assemblies ==\n=== soil &lt;A&gt; ===\n"));
        assert!(html.contains("<table class=\"wikitable\">\n    <tr>\n        <td>Name</td>"));
        assert!(html.contains("===== Phylum =====\n"));
        assert!(html.contains("==== Sequence Statistics ====\n"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn text_table_alignment() {
        let table = render_table(
            Some(&["Field", "Min"][..]),
            &[vec!["bps".to_string(), "100".to_string()]],
        );
        assert_eq!(
            table,
            "+-------+-----+\n| Field | Min |\n+-------+-----+\n| bps   | 100 |\n+-------+-----+"
        );
    }
}
