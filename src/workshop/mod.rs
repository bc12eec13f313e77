// src/workshop/mod.rs

//! Steam workshop item lookups
//!
//! Uses the unauthenticated `GetPublishedFileDetails` Web API call to learn
//! the title and last update time of a workshop item.

use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Published file details endpoint
pub const DETAILS_URL: &str =
    "http://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1";

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `result` value of a successful lookup
const RESULT_OK: i64 = 1;

#[derive(Error, Debug)]
pub enum WorkshopError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Lookup of MOD[{item_id}] failed: {source}")]
    Request {
        item_id: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid details response for MOD[{item_id}]: {reason}")]
    InvalidResponse { item_id: u64, reason: String },

    #[error("MOD[{item_id}] lookup returned result code {code}")]
    ResultCode { item_id: u64, code: i64 },

    #[error("MOD[{item_id}] not found in workshop")]
    NoDetails { item_id: u64 },
}

/// What the workshop knows about an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetails {
    pub title: String,
    /// Seconds since the epoch
    pub time_updated: i64,
}

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    response: DetailsResponse,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    publishedfiledetails: Vec<PublishedFileDetails>,
}

#[derive(Debug, Deserialize)]
struct PublishedFileDetails {
    result: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    time_updated: i64,
}

/// Decode a `GetPublishedFileDetails` response body for `item_id`
pub fn parse_details_response(item_id: u64, body: &str) -> Result<ItemDetails, WorkshopError> {
    let envelope: DetailsEnvelope =
        serde_json::from_str(body).map_err(|e| WorkshopError::InvalidResponse {
            item_id,
            reason: e.to_string(),
        })?;

    let details = envelope
        .response
        .publishedfiledetails
        .into_iter()
        .next()
        .ok_or(WorkshopError::NoDetails { item_id })?;

    if details.result != RESULT_OK {
        return Err(WorkshopError::ResultCode {
            item_id,
            code: details.result,
        });
    }

    Ok(ItemDetails {
        title: details.title,
        time_updated: details.time_updated,
    })
}

/// Blocking client for workshop lookups
pub struct WorkshopClient {
    client: Client,
    url: String,
}

impl WorkshopClient {
    pub fn new() -> Result<Self, WorkshopError> {
        Self::with_url(DETAILS_URL)
    }

    /// Client against a different endpoint
    pub fn with_url(url: impl Into<String>) -> Result<Self, WorkshopError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(WorkshopError::Client)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Look up one item; no retries
    pub fn fetch_details(&self, item_id: u64) -> Result<ItemDetails, WorkshopError> {
        debug!("Fetching workshop details for MOD[{}]", item_id);

        let id = item_id.to_string();
        let request_err = |source| WorkshopError::Request { item_id, source };
        let body = self
            .client
            .post(&self.url)
            .form(&[("itemcount", "1"), ("publishedfileids[0]", id.as_str())])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(request_err)?;

        parse_details_response(item_id, &body)
    }
}
