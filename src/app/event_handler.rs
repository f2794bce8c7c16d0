use super::state::{AppState, BackendEvent, SubmissionState};

/// Handle a backend event. This is where every submission ends.
pub fn handle_backend_event(state: &mut AppState, event: BackendEvent) {
    match event {
        BackendEvent::SubmissionFinished {
            generation,
            outcome,
        } => {
            if generation != state.generation {
                log::warn!(
                    "Discarding response of submission {generation}, latest is {}",
                    state.generation
                );
                return;
            }
            match outcome {
                Ok(result) => {
                    log::info!(
                        "Job {} done: {} captures",
                        result.job_id,
                        result.captures.len()
                    );
                    state.error.clear();
                    state.result = Some(result);
                    state.status = SubmissionState::Succeeded;
                }
                Err(e) => {
                    log::error!("Submission {generation} failed: {e}");
                    state.result = None;
                    state.error = e.to_string();
                    state.status = SubmissionState::Failed;
                }
            }
        }
        BackendEvent::ExportFinished { job_id, outcome } => {
            state.exporting = false;
            state.export_message = Some(match outcome {
                Ok(dir) => {
                    log::info!("Exported job {job_id} to {}", dir.display());
                    format!("Capturas guardadas en {}", dir.display())
                }
                Err(e) => {
                    log::error!("Export of job {job_id} failed: {e}");
                    format!("No se pudieron exportar las capturas: {e}")
                }
            });
        }
    }
    state.refresh();
}
