use std::path::{Path, PathBuf};

use super::state::{AppState, BackendEvent, SubmissionState};
use crate::api::{output_relative, ProcessResult, ProcessingEndpoint};
use crate::error::ExportError;

/// Metadata file the service writes next to every job's captures.
pub const METADATA_FILE: &str = "capturas.json";

impl AppState {
    /// Download the shown job's metadata and images into `dir/{job_id}/`.
    /// Completion arrives as [`BackendEvent::ExportFinished`].
    pub fn export_captures(&mut self, dir: &Path) -> Result<(), ExportError> {
        let result = match (self.status, &self.result) {
            (SubmissionState::Succeeded, Some(result)) => result.clone(),
            _ => return Err(ExportError::NoResult),
        };
        let target = dir.join(&result.job_id);
        log::info!("Exporting job {} to {}", result.job_id, target.display());

        self.exporting = true;
        self.export_message = Some(format!("Exportando capturas de {}...", result.job_id));

        let endpoint = self.endpoint.clone();
        let sender = self.backend_sender.clone();
        self.runtime.spawn(async move {
            let written = export_job(endpoint.as_ref(), &result, &target).await;
            let outcome = written.map(|_| target);
            let job_id = result.job_id;
            if sender
                .send(BackendEvent::ExportFinished {
                    job_id: job_id.clone(),
                    outcome,
                })
                .await
                .is_err()
            {
                log::warn!("Export of job {job_id} finished after the form closed");
            }
        });

        self.refresh();
        Ok(())
    }
}

/// Fetch the metadata file and one image per capture into `target`.
/// Returns the number of files written.
pub async fn export_job(
    endpoint: &dyn ProcessingEndpoint,
    result: &ProcessResult,
    target: &Path,
) -> Result<usize, ExportError> {
    let job_id = &result.job_id;
    let metadata = result
        .captures_json
        .as_deref()
        .map(|path| output_relative(path, job_id))
        .unwrap_or_else(|| METADATA_FILE.to_string());

    endpoint
        .download_output(job_id.clone(), metadata.clone(), local_path(target, &metadata))
        .await?;
    let mut written = 1;

    for capture in &result.captures {
        let Some(name) = capture.output_name(job_id) else {
            log::debug!("Capture {} has no image", capture.id);
            continue;
        };
        endpoint
            .download_output(job_id.clone(), name.clone(), local_path(target, &name))
            .await?;
        written += 1;
    }

    log::info!("Exported {written} files for job {job_id}");
    Ok(written)
}

/// Join an output-relative name below `target`, dropping anything that would
/// climb out of it.
fn local_path(target: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(target.to_path_buf(), |path, part| path.join(part))
}
