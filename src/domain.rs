use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SurveyError;

pub const API_ID_PREFIX: &str = "mgm";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetagenomeId(String);

impl MetagenomeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalizes an id as returned by the API by dropping its fixed-width
    /// prefix, so `mgm4447192.3` compares equal to the export's `4447192.3`.
    pub fn from_api(value: &str) -> Result<Self, SurveyError> {
        let trimmed = value.trim();
        let rest = trimmed
            .get(API_ID_PREFIX.len()..)
            .ok_or_else(|| SurveyError::InvalidIdentifier(value.to_string()))?;
        rest.parse()
    }

    pub fn api_form(&self) -> String {
        format!("{API_ID_PREFIX}{}", self.0)
    }
}

impl fmt::Display for MetagenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MetagenomeId {
    type Err = SurveyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && !normalized.contains(['/', '\\'])
            && normalized != "."
            && normalized != "..";
        if !is_valid {
            return Err(SurveyError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_min_avg_seq_length")]
    pub min_avg_seq_length: f64,
    #[serde(default = "default_max_avg_seq_length")]
    pub max_avg_seq_length: f64,
    #[serde(default = "default_min_bps")]
    pub min_bps: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_avg_seq_length: default_min_avg_seq_length(),
            max_avg_seq_length: default_max_avg_seq_length(),
            min_bps: default_min_bps(),
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.min_avg_seq_length > self.max_avg_seq_length {
            return Err(SurveyError::InvalidThresholds {
                min: self.min_avg_seq_length,
                max: self.max_avg_seq_length,
            });
        }
        Ok(())
    }
}

fn default_min_avg_seq_length() -> f64 {
    1000.0
}

fn default_max_avg_seq_length() -> f64 {
    20000.0
}

fn default_min_bps() -> f64 {
    1e8
}
