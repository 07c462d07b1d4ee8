use std::fs;

use assert_matches::assert_matches;

use mg_survey::config::{Config, ConfigLoader, DEFAULT_API_URL, SurveyConfig};
use mg_survey::domain::Thresholds;
use mg_survey::error::SurveyError;

#[test]
fn parse_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mg-survey.json");
    fs::write(
        &path,
        r#"{
            "page_size": 500,
            "export": "data/web_table.tsv",
            "verify_limit": 25,
            "thresholds": { "min_bps": 5e8 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.api_url, DEFAULT_API_URL);
    assert_eq!(resolved.page_size, 500);
    assert_eq!(resolved.export, "data/web_table.tsv");
    assert_eq!(resolved.verify_limit, 25);
    assert_eq!(resolved.thresholds.min_bps, 5e8);
    assert_eq!(resolved.thresholds.min_avg_seq_length, 1000.0);
    assert_eq!(resolved.thresholds.max_avg_seq_length, 20000.0);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SurveyError::MissingConfig(_));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("mg-survey.json");
    fs::write(&path, "{ page_size: }").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SurveyError::ConfigParse(_));
}

#[test]
fn zero_page_size_is_rejected() {
    let config = Config {
        page_size: Some(0),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SurveyError::InvalidPageSize);
}

#[test]
fn inverted_length_bounds_are_rejected() {
    let config = Config {
        thresholds: Some(Thresholds {
            min_avg_seq_length: 5000.0,
            max_avg_seq_length: 100.0,
            min_bps: 0.0,
        }),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, SurveyError::InvalidThresholds { .. });
}

#[test]
fn flag_overrides_replace_single_bounds() {
    let mut config = SurveyConfig::default();
    config
        .override_thresholds(Some(2000.0), None, Some(5e8))
        .unwrap();
    assert_eq!(config.thresholds.min_avg_seq_length, 2000.0);
    assert_eq!(config.thresholds.max_avg_seq_length, 20000.0);
    assert_eq!(config.thresholds.min_bps, 5e8);
}

#[test]
fn inverted_flag_overrides_are_rejected() {
    let mut config = SurveyConfig::default();
    let err = config
        .override_thresholds(Some(30000.0), None, None)
        .unwrap_err();
    assert_matches!(err, SurveyError::InvalidThresholds { .. });
    assert_eq!(config.thresholds, Thresholds::default());
}
