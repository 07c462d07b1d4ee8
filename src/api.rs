use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::domain::MetagenomeId;
use crate::error::SurveyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
    pub order: String,
    pub direction: String,
    pub match_mode: String,
    pub status: String,
}

impl PageRequest {
    pub fn all(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            order: "id".to_string(),
            direction: "asc".to_string(),
            match_mode: "all".to_string(),
            status: "both".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingResponse {
    pub total_count: u64,
    #[serde(default)]
    pub data: Vec<BriefRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BriefRecord {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Default,
    Minimal,
    Full,
}

impl Verbosity {
    fn as_query(self) -> Option<&'static str> {
        match self {
            Verbosity::Default => None,
            Verbosity::Minimal => Some("minimal"),
            Verbosity::Full => Some("full"),
        }
    }
}

pub trait MgRastClient: Send + Sync {
    fn fetch_page(&self, request: &PageRequest) -> Result<ListingResponse, SurveyError>;

    fn fetch_metagenome(
        &self,
        id: &MetagenomeId,
        verbosity: Verbosity,
    ) -> Result<Vec<u8>, SurveyError>;

    fn download(
        &self,
        id: &MetagenomeId,
        file: &str,
        destination: &Path,
    ) -> Result<u64, SurveyError>;
}

#[derive(Clone)]
pub struct MgRastHttpClient {
    client: Client,
    base_url: String,
}

impl MgRastHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SurveyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("mg-survey/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SurveyError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SurveyError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}metagenome", self.base_url)
    }

    pub fn metagenome_url(&self, id: &MetagenomeId) -> String {
        format!("{}metagenome/{}", self.base_url, id.as_str())
    }

    pub fn download_url(&self, id: &MetagenomeId) -> String {
        format!("{}download/{}", self.base_url, id.api_form())
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, SurveyError> {
        let response = request
            .send()
            .map_err(|err| SurveyError::ApiHttp(err.to_string()))?;
        Self::handle_status(response)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SurveyError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "MG-RAST request failed".to_string());
        Err(SurveyError::ApiStatus { status, message })
    }
}

impl MgRastClient for MgRastHttpClient {
    fn fetch_page(&self, request: &PageRequest) -> Result<ListingResponse, SurveyError> {
        let offset = request.offset.to_string();
        let limit = request.limit.to_string();
        let builder = self.client.get(self.listing_url()).query(&[
            ("verbosity", "minimal"),
            ("limit", limit.as_str()),
            ("order", request.order.as_str()),
            ("direction", request.direction.as_str()),
            ("match", request.match_mode.as_str()),
            ("status", request.status.as_str()),
            ("offset", offset.as_str()),
        ]);
        let response = self.send(builder)?;
        response
            .json::<ListingResponse>()
            .map_err(|err| SurveyError::ApiHttp(err.to_string()))
    }

    fn fetch_metagenome(
        &self,
        id: &MetagenomeId,
        verbosity: Verbosity,
    ) -> Result<Vec<u8>, SurveyError> {
        let mut builder = self.client.get(self.metagenome_url(id));
        if let Some(value) = verbosity.as_query() {
            builder = builder.query(&[("verbosity", value)]);
        }
        let response = self.send(builder)?;
        let bytes = response
            .bytes()
            .map_err(|err| SurveyError::ApiHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn download(
        &self,
        id: &MetagenomeId,
        file: &str,
        destination: &Path,
    ) -> Result<u64, SurveyError> {
        let builder = self
            .client
            .get(self.download_url(id))
            .query(&[("file", file)]);
        let mut response = self.send(builder)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SurveyError::Filesystem(err.to_string()))?;
        }
        let mut out =
            File::create(destination).map_err(|err| SurveyError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut out)
            .map_err(|err| SurveyError::Filesystem(err.to_string()))
    }
}
