use std::path::PathBuf;
use std::sync::Arc;

use crate::api::{ProcessResult, ProcessingEndpoint};
use crate::config::Config;
use crate::error::{ExportError, SubmitError};
use crate::form::{InputSet, Threshold};
use crate::projection::{project, DisplaySurface};

/// Events sent from runtime tasks back to the thread that owns the state.
#[derive(Debug)]
pub enum BackendEvent {
    /// A submission reached a terminal outcome. `generation` identifies which
    /// submit produced it.
    SubmissionFinished {
        generation: u64,
        outcome: Result<ProcessResult, SubmitError>,
    },
    /// A capture export finished, successfully or not.
    ExportFinished {
        job_id: String,
        outcome: Result<PathBuf, ExportError>,
    },
}

/// Lifecycle of the current submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Central form state. Owned by a single thread; runtime tasks only talk to
/// it through [`BackendEvent`]s.
pub struct AppState {
    pub status: SubmissionState,
    pub inputs: InputSet,
    pub threshold: Threshold,
    /// Empty when no error is shown.
    pub error: String,
    pub result: Option<ProcessResult>,
    /// Bumped on every submit that passes validation.
    pub generation: u64,
    pub config: Config,

    // Export feedback
    pub exporting: bool,
    pub export_message: Option<String>,

    pub endpoint: Arc<dyn ProcessingEndpoint>,
    pub runtime: tokio::runtime::Handle,
    pub backend_sender: async_channel::Sender<BackendEvent>,
    pub surface: Option<Box<dyn DisplaySurface>>,
}

impl AppState {
    pub fn new(
        config: Config,
        endpoint: Arc<dyn ProcessingEndpoint>,
        runtime: tokio::runtime::Handle,
        sender: async_channel::Sender<BackendEvent>,
    ) -> Self {
        let threshold = Threshold::new(config.default_threshold);
        log::info!("Form ready for {} (threshold {threshold})", config.server_url);
        Self {
            status: SubmissionState::Idle,
            inputs: InputSet::new(),
            threshold,
            error: String::new(),
            result: None,
            generation: 0,
            config,
            exporting: false,
            export_message: None,
            endpoint,
            runtime,
            backend_sender: sender,
            surface: None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionState::Submitting
    }

    /// Attach the surface that shows this state and draw it once.
    pub fn attach_surface(&mut self, surface: Box<dyn DisplaySurface>) {
        self.surface = Some(surface);
        self.refresh();
    }

    /// Re-render the attached surface from the current state.
    pub fn refresh(&self) {
        if let Some(ref surface) = self.surface {
            surface.render(&project(self));
        }
    }
}
