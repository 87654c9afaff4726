//! Contracts for the three remote pipeline operations.
//!
//! The workflow only talks to [`PipelineService`]; [`HttpPipeline`] is the
//! production transport and tests substitute in-process fakes.
mod http;

pub use http::{HttpPipeline, DEFAULT_SERVER_URL};

use crate::workflow::MetadataRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One image selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as the name.
    pub fn read(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("no usable file name in {}", path.display()))?
            .to_string();
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self { filename, bytes })
    }
}

/// Body returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Body sent to the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub session_id: String,
    pub api_key: String,
    pub context_map: BTreeMap<String, String>,
}

/// Body returned by the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub results: Vec<MetadataRecord>,
}

/// Body sent to the embed-and-upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub session_id: String,
    pub project_name: String,
    pub metadata: Vec<MetadataRecord>,
    #[serde(rename = "ftp_user")]
    pub transfer_user: String,
    #[serde(rename = "ftp_pass")]
    pub transfer_pass: String,
}

/// Discriminated body of the embed-and-upload endpoint.
///
/// `status: "completed"` carries the three outcome lists; any other status
/// carries a single error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPublishResponse", into = "RawPublishResponse")]
pub enum PublishResponse {
    Completed {
        uploaded: Vec<String>,
        upload_errors: Vec<String>,
        embed_errors: Vec<String>,
    },
    Failed {
        status: String,
        error: String,
    },
}

const COMPLETED_STATUS: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPublishResponse {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uploaded: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upload_errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embed_errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<RawPublishResponse> for PublishResponse {
    fn from(raw: RawPublishResponse) -> Self {
        if raw.status == COMPLETED_STATUS {
            return PublishResponse::Completed {
                uploaded: raw.uploaded.unwrap_or_default(),
                upload_errors: raw.upload_errors.unwrap_or_default(),
                embed_errors: raw.embed_errors.unwrap_or_default(),
            };
        }
        let error = raw
            .error
            .unwrap_or_else(|| format!("publish ended with status {:?}", raw.status));
        PublishResponse::Failed {
            status: raw.status,
            error,
        }
    }
}

impl From<PublishResponse> for RawPublishResponse {
    fn from(response: PublishResponse) -> Self {
        match response {
            PublishResponse::Completed {
                uploaded,
                upload_errors,
                embed_errors,
            } => RawPublishResponse {
                status: COMPLETED_STATUS.to_string(),
                uploaded: Some(uploaded),
                upload_errors: Some(upload_errors),
                embed_errors: Some(embed_errors),
                error: None,
            },
            PublishResponse::Failed { status, error } => RawPublishResponse {
                status,
                uploaded: None,
                upload_errors: None,
                embed_errors: None,
                error: Some(error),
            },
        }
    }
}

/// Transport-level failure of a remote pipeline call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} response could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The remote pipeline as the workflow sees it.
pub trait PipelineService {
    fn upload(&self, files: &[UploadFile]) -> Result<UploadResponse, ServiceError>;

    fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ServiceError>;

    fn embed_and_upload(&self, request: &PublishRequest) -> Result<PublishResponse, ServiceError>;
}
