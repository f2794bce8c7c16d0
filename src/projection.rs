//! Read-only view of the form state.
//!
//! Nothing here owns state; [`project`] is recomputed from [`AppState`] after
//! every change and handed to whatever [`DisplaySurface`] is attached.

use std::fmt;

use crate::api::{Capture, ProcessResult};
use crate::app::{AppState, SubmissionState};
use crate::form::InputSet;

pub const SUBMIT_LABEL: &str = "Procesar vídeo";
pub const SUBMITTING_LABEL: &str = "Procesando...";

/// Anything that can show a [`FormView`].
pub trait DisplaySurface {
    fn render(&self, view: &FormView);
}

/// Everything a surface needs to draw the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub status: SubmissionState,
    pub inputs: InputSet,
    pub threshold_label: String,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub error: Option<String>,
    pub result: Option<ResultView>,
    pub export_message: Option<String>,
    pub export_enabled: bool,
}

/// Rendered form of a [`ProcessResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub job_id: String,
    pub capture_count: usize,
    /// One line per capture, in response order.
    pub lines: Vec<String>,
}

impl ResultView {
    pub fn from_result(result: &ProcessResult) -> Self {
        Self {
            job_id: result.job_id.clone(),
            capture_count: result.captures.len(),
            lines: result.captures.iter().map(capture_line).collect(),
        }
    }
}

/// `t=3.2s — intro`
pub fn capture_line(capture: &Capture) -> String {
    format!("t={}s — {}", capture.timestamp_seconds, capture.text)
}

/// Derive the view from the current state.
pub fn project(state: &AppState) -> FormView {
    let submitting = state.is_submitting();
    let error = (!state.error.is_empty()).then(|| state.error.clone());
    let result = state.result.as_ref().map(ResultView::from_result);

    FormView {
        status: state.status,
        inputs: state.inputs.clone(),
        threshold_label: format!("Umbral: {}", state.threshold),
        submit_label: if submitting {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        },
        submit_enabled: !submitting,
        export_enabled: result.is_some() && !state.exporting,
        error,
        result,
        export_message: state.export_message.clone(),
    }
}

/// Plain-text rendering, used for logs and by text surfaces.
impl fmt::Display for FormView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.threshold_label)?;
        writeln!(f, "[{}]", self.submit_label)?;
        if let Some(ref error) = self.error {
            writeln!(f, "{error}")?;
        }
        if let Some(ref result) = self.result {
            writeln!(f, "Resultado")?;
            writeln!(f, "Job: {}", result.job_id)?;
            writeln!(f, "Capturas generadas: {}", result.capture_count)?;
            for line in &result.lines {
                writeln!(f, "- {line}")?;
            }
        }
        if let Some(ref message) = self.export_message {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}
