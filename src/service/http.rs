//! HTTP transport for the pipeline backend.
//!
//! Endpoints mirror the backend routes: `POST /upload` (multipart),
//! `POST /analyze` and `POST /embed-and-upload` (JSON), plus the static
//! `/temp/<session>/<file>` preview surface.
use super::{
    AnalyzeRequest, AnalyzeResponse, PipelineService, PublishRequest, PublishResponse,
    ServiceError, UploadFile, UploadResponse,
};
use crate::workflow::Session;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use ureq::http::Response;
use ureq::unversioned::multipart::{Form, Part};
use ureq::{Agent, Body};

/// Backend address used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

const UPLOAD_ENDPOINT: &str = "upload";
const ANALYZE_ENDPOINT: &str = "analyze";
const PUBLISH_ENDPOINT: &str = "embed-and-upload";

/// Form field every uploaded image is sent under.
const UPLOAD_FIELD: &str = "files";

/// Longest error body echoed back into messages.
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Blocking client for the pipeline backend.
#[derive(Clone)]
pub struct HttpPipeline {
    base_url: String,
    agent: Agent,
}

impl HttpPipeline {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an uploaded file on the static preview surface.
    pub fn preview_url(&self, session: &Session, filename: &str) -> String {
        format!("{}{}", self.base_url, session.preview_path(filename))
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<(u16, T), ServiceError>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let response = self
            .agent
            .post(self.endpoint_url(endpoint))
            .send_json(body)
            .map_err(|err| transport(endpoint, err))?;
        let (status, text) = read_body(endpoint, response)?;
        tracing::info!(
            endpoint,
            status,
            elapsed_ms = start.elapsed().as_millis(),
            response_bytes = text.len(),
            "pipeline call complete"
        );
        if !(200..300).contains(&status) {
            // Publish reports its own failures in the body, so a decodable body wins.
            return match serde_json::from_str(&text) {
                Ok(parsed) if endpoint == PUBLISH_ENDPOINT => Ok((status, parsed)),
                _ => Err(status_error(endpoint, status, &text)),
            };
        }
        let parsed = decode(endpoint, &text)?;
        Ok((status, parsed))
    }
}

impl PipelineService for HttpPipeline {
    fn upload(&self, files: &[UploadFile]) -> Result<UploadResponse, ServiceError> {
        let start = Instant::now();
        let form = upload_form(files).map_err(|err| transport(UPLOAD_ENDPOINT, err))?;
        let response = self
            .agent
            .post(self.endpoint_url(UPLOAD_ENDPOINT))
            .send(form)
            .map_err(|err| transport(UPLOAD_ENDPOINT, err))?;
        let (status, text) = read_body(UPLOAD_ENDPOINT, response)?;
        tracing::info!(
            endpoint = UPLOAD_ENDPOINT,
            status,
            files = files.len(),
            request_bytes = files.iter().map(|file| file.bytes.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis(),
            "pipeline call complete"
        );
        if !(200..300).contains(&status) {
            return Err(status_error(UPLOAD_ENDPOINT, status, &text));
        }
        decode(UPLOAD_ENDPOINT, &text)
    }

    fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse, ServiceError> {
        self.post_json(ANALYZE_ENDPOINT, request)
            .map(|(_, parsed)| parsed)
    }

    fn embed_and_upload(&self, request: &PublishRequest) -> Result<PublishResponse, ServiceError> {
        let (status, parsed) = self.post_json(PUBLISH_ENDPOINT, request)?;
        if !(200..300).contains(&status) {
            tracing::warn!(status, "publish body decoded from non-success status");
        }
        Ok(parsed)
    }
}

/// One `files` part per image, in input order, typed by extension.
fn upload_form(files: &[UploadFile]) -> Result<Form<'_>, ureq::Error> {
    files.iter().try_fold(Form::new(), |form, file| {
        let mime = mime_guess::from_path(&file.filename).first_or_octet_stream();
        let part = Part::bytes(&file.bytes)
            .file_name(&file.filename)
            .mime_str(mime.essence_str())?;
        Ok(form.part(UPLOAD_FIELD, part))
    })
}

fn read_body(
    endpoint: &'static str,
    mut response: Response<Body>,
) -> Result<(u16, String), ServiceError> {
    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|err| transport(endpoint, err))?;
    Ok((status, text))
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, text: &str) -> Result<T, ServiceError> {
    serde_json::from_str(text).map_err(|source| ServiceError::Decode { endpoint, source })
}

fn transport(endpoint: &'static str, err: ureq::Error) -> ServiceError {
    ServiceError::Transport {
        endpoint,
        source: Box::new(err),
    }
}

fn status_error(endpoint: &'static str, status: u16, text: &str) -> ServiceError {
    ServiceError::Status {
        endpoint,
        status,
        body: truncate_body(text.trim(), MAX_ERROR_BODY_BYTES),
    }
}

fn truncate_body(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
