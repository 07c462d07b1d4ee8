use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

use crate::domain::MetagenomeId;
use crate::error::SurveyError;

pub const DOCUMENT_FILE: &str = "metadata.json";

#[derive(Debug, Clone)]
pub struct MetadataCache {
    root: Utf8PathBuf,
}

impl MetadataCache {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn dir(&self, id: &MetagenomeId) -> Utf8PathBuf {
        self.root.join(id.as_str())
    }

    pub fn path(&self, id: &MetagenomeId) -> Utf8PathBuf {
        self.dir(id).join(DOCUMENT_FILE)
    }

    pub fn ensure_root(&self) -> Result<(), SurveyError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SurveyError::Filesystem(err.to_string()))
    }

    pub fn contains(&self, id: &MetagenomeId) -> bool {
        self.path(id).as_std_path().is_file()
    }

    pub fn store(&self, id: &MetagenomeId, document: &[u8]) -> Result<Utf8PathBuf, SurveyError> {
        let path = self.path(id);
        crate::fs_util::write_atomic(&path, document)?;
        Ok(path)
    }

    pub fn load_raw(&self, id: &MetagenomeId) -> Result<Vec<u8>, SurveyError> {
        if !self.contains(id) {
            return Err(SurveyError::CacheMiss(id.to_string()));
        }
        let path = self.path(id);
        fs::read(path.as_std_path())
            .map_err(|err| SurveyError::Filesystem(format!("read {path}: {err}")))
    }

    pub fn load(&self, id: &MetagenomeId) -> Result<Value, SurveyError> {
        let raw = self.load_raw(id)?;
        serde_json::from_slice(&raw)
            .map_err(|err| SurveyError::Filesystem(format!("decode {}: {err}", self.path(id))))
    }

    pub fn ids(&self) -> Result<Vec<MetagenomeId>, SurveyError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| SurveyError::Filesystem(err.to_string()))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Ok(id) = name.parse::<MetagenomeId>() else {
                continue;
            };
            if self.contains(&id) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
