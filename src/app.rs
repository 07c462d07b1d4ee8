use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::api::{MgRastClient, Verbosity};
use crate::cache::MetadataCache;
use crate::config::SurveyConfig;
use crate::domain::{MetagenomeId, Thresholds};
use crate::error::SurveyError;
use crate::export::{self, Export, ExportRow};
use crate::filter::{self, ColumnStats, MethodCount};
use crate::pager::Pages;
use crate::reconcile::{self, ReconcileReport};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub items: Vec<FetchItemResult>,
}

impl FetchResult {
    pub fn count(&self, action: &str) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub id: MetagenomeId,
    pub action: String,
    pub path: String,
    pub fetched_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyRow {
    pub id: MetagenomeId,
    pub avg_seq_length: f64,
    pub bps: u64,
    pub sequencing_method: String,
    pub sequencing_type: String,
}

impl From<&ExportRow> for AssemblyRow {
    fn from(row: &ExportRow) -> Self {
        Self {
            id: row.id.clone(),
            avg_seq_length: row.avg_seq_length,
            bps: row.bps,
            sequencing_method: row.sequencing_method.clone(),
            sequencing_type: row.sequencing_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyResult {
    pub export: String,
    pub thresholds: Thresholds,
    pub total: usize,
    pub assemblies: Vec<AssemblyRow>,
    pub stats: Vec<ColumnStats>,
    pub methods: Vec<MethodCount>,
    pub fetch: FetchResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub path: String,
    pub metagenomes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub id: MetagenomeId,
    pub file: String,
    pub path: String,
    pub bytes: u64,
    pub uncompressed_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>, elapsed: Option<Duration>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed,
    });
}

#[derive(Clone)]
pub struct App<C: MgRastClient> {
    config: SurveyConfig,
    cache: MetadataCache,
    client: C,
}

impl<C: MgRastClient> App<C> {
    pub fn new(config: SurveyConfig, client: C) -> Self {
        let cache = MetadataCache::new(config.cache_dir.clone());
        Self {
            config,
            cache,
            client,
        }
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn reconcile(&self, sink: &dyn ProgressSink) -> Result<ReconcileReport, SurveyError> {
        let mut api_ids = Vec::new();
        let mut pages = Pages::new(&self.client, self.config.page_size)?;
        loop {
            let start = Instant::now();
            let Some(page) = pages.next() else {
                break;
            };
            let page = page?;
            emit(
                sink,
                format!(
                    "fetched items {}-{} of {}",
                    page.offset + 1,
                    page.offset + page.ids.len() as u64,
                    page.total_count
                ),
                Some(start.elapsed()),
            );
            api_ids.extend(page.ids);
        }
        emit(sink, format!("ids found from API: {}", api_ids.len()), None);

        let export_ids = export::load_ids(&self.config.export)?;
        emit(
            sink,
            format!("ids loaded from table: {}", export_ids.len()),
            None,
        );

        let diff = reconcile::diff(&export_ids, &api_ids);
        tracing::info!(
            not_in_api = diff.only_in_a.len(),
            not_in_export = diff.only_in_b.len(),
            "reconciled"
        );

        let verified = reconcile::verify(&self.client, &diff.only_in_a, self.config.verify_limit)?;
        for item in &verified {
            emit(sink, format!("{} - {}", item.id, item.status.label()), None);
        }

        Ok(ReconcileReport {
            api_count: api_ids.len(),
            export_count: export_ids.len(),
            not_in_api: diff.only_in_a,
            not_in_export: diff.only_in_b,
            verified,
        })
    }

    pub fn load_export(&self, rewrite: bool) -> Result<Export, SurveyError> {
        export::load(&self.config.export, rewrite)
    }

    pub fn survey(
        &self,
        rewrite_export: bool,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SurveyResult, SurveyError> {
        let export = self.load_export(rewrite_export)?;
        emit(
            sink,
            format!(
                "loaded {} metagenomes from {}",
                export.rows.len(),
                self.config.export
            ),
            None,
        );

        let thresholds = self.config.thresholds;
        let filtered = filter::filter(&export.rows, &thresholds);
        emit(
            sink,
            format!("detected {} assemblies based on parameters", filtered.len()),
            None,
        );

        let mut assemblies: Vec<AssemblyRow> =
            filtered.iter().map(|row| AssemblyRow::from(*row)).collect();
        assemblies.sort_by(|a, b| b.avg_seq_length.total_cmp(&a.avg_seq_length));

        let stats = filter::column_stats(&filtered);
        let methods = filter::method_counts(&filtered, &export.rows);
        let fetch = self.fetch_metadata(&filtered, options, sink)?;

        Ok(SurveyResult {
            export: self.config.export.to_string(),
            thresholds,
            total: export.rows.len(),
            assemblies,
            stats,
            methods,
            fetch,
        })
    }

    pub fn fetch_metadata(
        &self,
        rows: &[&ExportRow],
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, SurveyError> {
        if !options.dry_run {
            self.cache.ensure_root()?;
        }

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let id = &row.id;
            let path = self.cache.path(id);

            if !options.force && self.cache.contains(id) {
                tracing::debug!("{id} already cached");
                items.push(FetchItemResult {
                    id: id.clone(),
                    action: "cache".to_string(),
                    path: path.to_string(),
                    fetched_at: None,
                });
                continue;
            }

            if options.dry_run {
                items.push(FetchItemResult {
                    id: id.clone(),
                    action: "planned".to_string(),
                    path: path.to_string(),
                    fetched_at: None,
                });
                continue;
            }

            let start = Instant::now();
            let document = self.client.fetch_metagenome(id, Verbosity::Full)?;
            let path = self.cache.store(id, &document)?;
            let elapsed = start.elapsed();
            tracing::info!(
                id = %id,
                bytes = document.len(),
                latency_ms = elapsed.as_millis() as u64,
                "metadata fetched"
            );
            emit(sink, format!("fetched {id}"), Some(elapsed));
            items.push(FetchItemResult {
                id: id.clone(),
                action: "download".to_string(),
                path: path.to_string(),
                fetched_at: Some(iso_timestamp()),
            });
        }

        Ok(FetchResult { items })
    }

    pub fn report(
        &self,
        output: Option<&Utf8Path>,
        sink: &dyn ProgressSink,
    ) -> Result<ReportResult, SurveyError> {
        let path = output.unwrap_or(self.config.report.as_path());
        let (html, metagenomes) = crate::report::build_report(&self.cache)?;
        crate::fs_util::write_atomic(path, html.as_bytes())?;
        emit(
            sink,
            format!("wrote report for {metagenomes} metagenomes to {path}"),
            None,
        );
        Ok(ReportResult {
            path: path.to_string(),
            metagenomes,
        })
    }

    pub fn download(
        &self,
        id: &MetagenomeId,
        file: &str,
        output: Option<&Utf8Path>,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, SurveyError> {
        let path = output
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| default_download_path(&self.cache, id, file));
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        std::fs::create_dir_all(parent.as_std_path())
            .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
        let staging = tempfile::Builder::new()
            .prefix(".mg-survey-download")
            .tempdir_in(parent.as_std_path())
            .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
        let staged = staging.path().join(format!("{}.{file}", id.api_form()));

        let start = Instant::now();
        let bytes = self.client.download(id, file, &staged)?;
        emit(
            sink,
            format!("downloaded {} file {file} ({bytes} bytes)", id.api_form()),
            Some(start.elapsed()),
        );

        let uncompressed_bytes = if crate::fs_util::is_gzip(&staged)? {
            Some(crate::fs_util::validate_gzip(&staged)?)
        } else {
            None
        };
        crate::fs_util::move_into_place(&staged, &path)?;

        Ok(DownloadResult {
            id: id.clone(),
            file: file.to_string(),
            path: path.to_string(),
            bytes,
            uncompressed_bytes,
        })
    }
}

fn default_download_path(cache: &MetadataCache, id: &MetagenomeId, file: &str) -> Utf8PathBuf {
    cache.dir(id).join(format!("{}.{file}", id.api_form()))
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
