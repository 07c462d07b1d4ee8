use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    DownloadResult, ProgressEvent, ProgressSink, ReportResult, SurveyResult,
};
use crate::domain::Thresholds;
use crate::reconcile::ReconcileReport;
use crate::report::render_table;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} [{:.2}s]", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_reconcile(report: &ReconcileReport) {
        println!("IDs found from API: {}", report.api_count);
        println!("IDs loaded from table: {}", report.export_count);
        println!("Entries not in API: {}", report.not_in_api.len());
        println!("Entries not in web: {}", report.not_in_export.len());
        for item in &report.verified {
            println!("{} - {}", item.id, item.status.label());
        }
    }

    pub fn print_thresholds(thresholds: &Thresholds) {
        println!("Parameters:");
        let rows = vec![
            vec![
                "min_avg_seq_length".to_string(),
                thresholds.min_avg_seq_length.to_string(),
            ],
            vec![
                "max_avg_seq_length".to_string(),
                thresholds.max_avg_seq_length.to_string(),
            ],
            vec!["min_bps".to_string(), thresholds.min_bps.to_string()],
        ];
        println!("{}\n", render_table(None, &rows));
    }

    pub fn print_survey(result: &SurveyResult) {
        println!(
            "Loaded {} metagenomes from {}.\n",
            result.total, result.export
        );
        println!(
            "Detected {} assemblies based on parameters.",
            result.assemblies.len()
        );
        let rows: Vec<Vec<String>> = result
            .assemblies
            .iter()
            .map(|row| {
                vec![
                    row.id.to_string(),
                    row.avg_seq_length.to_string(),
                    row.bps.to_string(),
                    row.sequencing_method.clone(),
                    row.sequencing_type.clone(),
                ]
            })
            .collect();
        println!(
            "{}\n",
            render_table(
                Some(&[
                    "id",
                    "avg_seq_length",
                    "bps",
                    "sequencing_method",
                    "sequencing_type"
                ][..]),
                &rows
            )
        );

        println!("Statistics:");
        let rows: Vec<Vec<String>> = result
            .stats
            .iter()
            .map(|stat| {
                vec![
                    stat.field.to_string(),
                    stat.min.to_string(),
                    format!("{:.2}", stat.mean),
                    stat.max.to_string(),
                ]
            })
            .collect();
        println!(
            "{}\n",
            render_table(Some(&["Field", "Min", "Mean", "Max"][..]), &rows)
        );

        println!("Metagenomes per sequencing_method:");
        let rows: Vec<Vec<String>> = result
            .methods
            .iter()
            .map(|count| {
                vec![
                    count.method.clone(),
                    count.filtered.to_string(),
                    count.all.to_string(),
                ]
            })
            .collect();
        println!(
            "{}\n",
            render_table(Some(&["Method", "Assemblies", "All"][..]), &rows)
        );

        println!(
            "Metadata: {} fetched, {} cached, {} planned.",
            result.fetch.count("download"),
            result.fetch.count("cache"),
            result.fetch.count("planned")
        );
    }

    pub fn print_report(result: &ReportResult) {
        println!(
            "Wrote {} metagenome summaries to {}.",
            result.metagenomes, result.path
        );
    }

    pub fn print_download(result: &DownloadResult) {
        println!("Saved {} ({} bytes).", result.path, result.bytes);
        if let Some(size) = result.uncompressed_bytes {
            println!("gzip ok, {size} bytes uncompressed.");
        }
    }
}
