use std::fs;

use camino::Utf8PathBuf;

use mg_survey::cache::MetadataCache;
use mg_survey::domain::MetagenomeId;
use mg_survey::report::{MetagenomeSummary, build_report};

fn fixture() -> Vec<u8> {
    fs::read("tests/fixtures/mgm4447192.3.json").unwrap()
}

#[test]
fn summary_from_fixture() {
    let value: serde_json::Value = serde_json::from_slice(&fixture()).unwrap();
    let summary = MetagenomeSummary::from_document(&value).unwrap();

    assert_eq!(summary.name, "Soil core A");
    assert_eq!(summary.id, "mgm4447192.3");
    assert_eq!(summary.project, "mgp128");
    assert_eq!(summary.mixs.len(), 5);

    let phylum = &summary.taxonomy[0];
    assert_eq!(phylum.level, "phylum");
    assert_eq!(phylum.top.len(), 10);
    assert_eq!(phylum.top[0].name, "Proteobacteria");
    assert!(phylum.top.iter().all(|taxon| taxon.name != "Euryarchaeota"));

    let order = &summary.taxonomy[2];
    assert_eq!(order.top[0].name, "Actinomycetales");

    let names: Vec<&str> = summary.sequence_stats.iter().map(|(name, _)| *name).collect();
    assert!(!names.contains(&"drisee_score_raw"));
    assert_eq!(summary.sequence_stats[0], ("bp_count_raw", "150000000".to_string()));
}

#[test]
fn report_from_cache() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let cache = MetadataCache::new(root);
    let id: MetagenomeId = "4447192.3".parse().unwrap();
    cache.store(&id, &fixture()).unwrap();

    let (html, count) = build_report(&cache).unwrap();

    assert_eq!(count, 1);
    assert!(html.contains("=== Soil core A ===\n<table class=\"wikitable\">"));
    assert!(html.contains("===== Order =====\n"));
    assert!(html.contains("<td>standard_deviation_gc_content_raw</td>"));
    assert!(html.ends_with("</table>\n\n\n"));
}

#[test]
fn incomplete_cached_document_fails_report() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let cache = MetadataCache::new(root);
    let id: MetagenomeId = "4447192.3".parse().unwrap();
    cache
        .store(&id, br#"{"name": "x", "id": "mgm4447192.3"}"#)
        .unwrap();

    let err = build_report(&cache).unwrap_err();
    assert!(err.to_string().contains("4447192.3: project"));
}
