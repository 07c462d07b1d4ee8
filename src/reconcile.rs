use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::api::{MgRastClient, Verbosity};
use crate::domain::MetagenomeId;
use crate::error::SurveyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub only_in_a: Vec<MetagenomeId>,
    pub only_in_b: Vec<MetagenomeId>,
}

pub fn diff(a: &[MetagenomeId], b: &[MetagenomeId]) -> Diff {
    let set_a: HashSet<&MetagenomeId> = a.iter().collect();
    let set_b: HashSet<&MetagenomeId> = b.iter().collect();
    Diff {
        only_in_a: ordered_difference(a, &set_b),
        only_in_b: ordered_difference(b, &set_a),
    }
}

fn ordered_difference(
    items: &[MetagenomeId],
    exclude: &HashSet<&MetagenomeId>,
) -> Vec<MetagenomeId> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|id| !exclude.contains(id) && seen.insert(*id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Found,
    NotFound,
}

impl LookupStatus {
    pub fn label(self) -> &'static str {
        match self {
            LookupStatus::Found => "Found",
            LookupStatus::NotFound => "Not found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub id: MetagenomeId,
    pub status: LookupStatus,
}

/// A lookup counts as missing when the decoded body is an object carrying an
/// `ERROR` key.
pub fn classify_body(body: &[u8]) -> Result<LookupStatus, SurveyError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| SurveyError::ApiHttp(err.to_string()))?;
    Ok(classify_value(&value))
}

fn classify_value(value: &Value) -> LookupStatus {
    if value.get("ERROR").is_some() {
        LookupStatus::NotFound
    } else {
        LookupStatus::Found
    }
}

pub fn lookup<C: MgRastClient + ?Sized>(
    client: &C,
    id: &MetagenomeId,
) -> Result<LookupStatus, SurveyError> {
    match client.fetch_metagenome(id, Verbosity::Default) {
        Ok(body) => classify_body(&body),
        // The API answers unknown ids with an error status and an `ERROR` body.
        Err(SurveyError::ApiStatus { status, message }) => {
            match serde_json::from_str::<Value>(&message) {
                Ok(value) if classify_value(&value) == LookupStatus::NotFound => {
                    Ok(LookupStatus::NotFound)
                }
                _ => Err(SurveyError::ApiStatus { status, message }),
            }
        }
        Err(err) => Err(err),
    }
}

pub fn verify<C: MgRastClient + ?Sized>(
    client: &C,
    ids: &[MetagenomeId],
    limit: usize,
) -> Result<Vec<Verification>, SurveyError> {
    ids.iter()
        .take(limit)
        .map(|id| -> Result<Verification, SurveyError> {
            let status = lookup(client, id)?;
            tracing::info!("{id} - {}", status.label());
            Ok(Verification {
                id: id.clone(),
                status,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub api_count: usize,
    pub export_count: usize,
    pub not_in_api: Vec<MetagenomeId>,
    pub not_in_export: Vec<MetagenomeId>,
    pub verified: Vec<Verification>,
}
