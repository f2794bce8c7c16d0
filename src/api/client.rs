use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;

use super::request::SubmissionRequest;
use super::types::{ErrorBody, ProcessResult};
use crate::error::{ExportError, SubmitError};

/// Path of the processing endpoint, relative to the service base URL.
pub const PROCESS_PATH: &str = "/api/process";
/// Prefix under which the service publishes a job's output files.
pub const OUTPUT_PATH: &str = "/api/output";

/// The remote processing service, as seen by the form.
pub trait ProcessingEndpoint: Send + Sync {
    /// Send one submission and resolve to the parsed result or the reason it
    /// failed. Exactly one outbound request per call.
    fn process(
        &self,
        request: SubmissionRequest,
    ) -> BoxFuture<'static, Result<ProcessResult, SubmitError>>;

    /// Save one of a job's output files (`file` is relative to the job's
    /// output directory) to `dest`. Resolves to the bytes written.
    fn download_output(
        &self,
        job_id: String,
        file: String,
        dest: PathBuf,
    ) -> BoxFuture<'static, Result<u64, ExportError>>;
}

/// reqwest-backed client for the processing service.
#[derive(Debug, Clone)]
pub struct ProcessClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProcessClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn process_url(&self) -> String {
        format!("{}{PROCESS_PATH}", self.base_url)
    }

    pub fn output_url(&self, job_id: &str, file: &str) -> String {
        format!(
            "{}{OUTPUT_PATH}/{job_id}/{}",
            self.base_url,
            file.trim_start_matches('/')
        )
    }

    /// POST the submission as multipart and interpret the reply.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<ProcessResult, SubmitError> {
        let url = self.process_url();
        let templates = request.template_count();
        let form = request.into_form().await?;

        log::info!("POST {url} ({templates} templates)");
        let resp = self.http.post(&url).multipart(form).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        interpret_response(status, &body)
    }

    /// GET one of a job's output files.
    pub async fn fetch_output(
        &self,
        job_id: &str,
        file: &str,
    ) -> Result<reqwest::Response, ExportError> {
        let url = self.output_url(job_id, file);
        log::debug!("GET {url}");
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ExportError::Status {
                file: file.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }

    /// Stream one of a job's output files to `dest`. Returns the bytes written.
    pub async fn download_output(
        &self,
        job_id: &str,
        file: &str,
        dest: &Path,
    ) -> Result<u64, ExportError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let resp = self.fetch_output(job_id, file).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut out = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        log::info!("Saved {file} to {} ({written} bytes)", dest.display());
        Ok(written)
    }
}

impl ProcessingEndpoint for ProcessClient {
    fn process(
        &self,
        request: SubmissionRequest,
    ) -> BoxFuture<'static, Result<ProcessResult, SubmitError>> {
        let client = self.clone();
        Box::pin(async move { client.submit(request).await })
    }

    fn download_output(
        &self,
        job_id: String,
        file: String,
        dest: PathBuf,
    ) -> BoxFuture<'static, Result<u64, ExportError>> {
        let client = self.clone();
        Box::pin(async move { client.download_output(&job_id, &file, &dest).await })
    }
}

/// Map a status and raw body onto the submission outcome.
///
/// Success statuses must carry a result body; anything unparsable there is a
/// transport failure. Failure statuses surface `{"error": ...}` when present
/// and fall back to a fixed message otherwise.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<ProcessResult, SubmitError> {
    if (200..300).contains(&status) {
        let result: ProcessResult = serde_json::from_slice(body)?;
        return Ok(result);
    }

    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);
    Err(SubmitError::rejected(status, message))
}
