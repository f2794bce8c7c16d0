use std::path::Path;
use std::sync::Arc;

use super::state::{AppState, SubmissionState};
use crate::api::{ProcessClient, SubmissionRequest};
use crate::error::SubmitError;
use crate::form::{InputUpdate, Threshold};

impl AppState {
    /// Replace one input field. Errors and results shown are left alone.
    pub fn set_input(&mut self, update: InputUpdate) {
        log::debug!("Input {:?} changed", update.key());
        self.inputs.apply(update);
        self.refresh();
    }

    /// Move the threshold slider. Out-of-range values are clamped.
    pub fn set_threshold(&mut self, value: f64) {
        self.threshold = Threshold::new(value);
        log::debug!("Threshold set to {}", self.threshold);
        self.refresh();
    }

    /// Point later submissions at another service. A request already in
    /// flight keeps the endpoint it was sent to.
    pub fn set_server_url(&mut self, url: &str) {
        let url = url.trim();
        if url.is_empty() || url == self.config.server_url {
            return;
        }
        log::info!("Processing service changed to {url}");
        self.config.server_url = url.to_string();
        self.endpoint = Arc::new(ProcessClient::new(url));
    }

    /// Keep the current slider position as the threshold the form opens with.
    pub fn remember_threshold(&mut self) {
        self.config.default_threshold = self.threshold.value();
    }

    /// Persist the current configuration to `path`.
    pub fn save_config(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.config.save_to(path).inspect_err(|e| {
            log::warn!("Failed to save config: {e}");
        })
    }

    /// Validate the form and, if complete, send it. Returns the generation of
    /// the dispatched request.
    ///
    /// A missing mandatory file never reaches the network: the error is shown
    /// and the lifecycle goes back to `Idle` (an in-flight request keeps its
    /// `Submitting` state).
    pub fn submit(&mut self) -> Result<u64, SubmitError> {
        log::info!(
            "Submit requested ({} templates, threshold {})",
            self.inputs.templates.len(),
            self.threshold
        );
        self.export_message = None;

        let request = match SubmissionRequest::from_inputs(&self.inputs, self.threshold) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Submission blocked, missing {:?}", self.inputs.missing());
                self.error = e.to_string();
                self.result = None;
                if self.status != SubmissionState::Submitting {
                    self.status = SubmissionState::Idle;
                }
                self.refresh();
                return Err(e);
            }
        };

        self.error.clear();
        self.result = None;
        self.status = SubmissionState::Submitting;
        self.generation += 1;
        let generation = self.generation;

        self.dispatch_submission(generation, request);
        self.refresh();
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use futures_util::future::BoxFuture;

    use super::*;
    use crate::api::{Capture, FieldValue, ProcessResult, ProcessingEndpoint};
    use crate::app::{handle_backend_event, BackendEvent};
    use crate::config::Config;
    use crate::error::{ExportError, MISSING_FILES_MESSAGE};
    use crate::form::FileHandle;
    use crate::projection::{DisplaySurface, FormView, SUBMITTING_LABEL};

    type Outcome = Result<ProcessResult, SubmitError>;

    /// Endpoint whose replies are released by the test, one per call.
    #[derive(Default)]
    struct FakeEndpoint {
        requests: Mutex<Vec<SubmissionRequest>>,
        pending: Mutex<Vec<async_channel::Sender<Outcome>>>,
    }

    impl FakeEndpoint {
        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, idx: usize) -> SubmissionRequest {
            self.requests.lock().unwrap()[idx].clone()
        }

        fn reply(&self, idx: usize, outcome: Outcome) {
            self.pending.lock().unwrap()[idx].try_send(outcome).unwrap();
        }

        async fn wait_for_calls(&self, n: usize) {
            while self.calls() < n {
                tokio::task::yield_now().await;
            }
        }
    }

    impl ProcessingEndpoint for FakeEndpoint {
        fn process(&self, request: SubmissionRequest) -> BoxFuture<'static, Outcome> {
            self.requests.lock().unwrap().push(request);
            let (tx, rx) = async_channel::bounded(1);
            self.pending.lock().unwrap().push(tx);
            Box::pin(async move {
                rx.recv()
                    .await
                    .unwrap_or_else(|_| Err(SubmitError::Transport("reply dropped".into())))
            })
        }

        fn download_output(
            &self,
            _job_id: String,
            _file: String,
            _dest: PathBuf,
        ) -> BoxFuture<'static, Result<u64, ExportError>> {
            Box::pin(async { Ok(0) })
        }
    }

    struct RecordingSurface(Rc<RefCell<Vec<FormView>>>);

    impl DisplaySurface for RecordingSurface {
        fn render(&self, view: &FormView) {
            self.0.borrow_mut().push(view.clone());
        }
    }

    struct Harness {
        state: AppState,
        fake: Arc<FakeEndpoint>,
        events: async_channel::Receiver<BackendEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let fake = Arc::new(FakeEndpoint::default());
            let (tx, rx) = async_channel::unbounded();
            let state = AppState::new(
                Config::default(),
                fake.clone(),
                tokio::runtime::Handle::current(),
                tx,
            );
            Self {
                state,
                fake,
                events: rx,
            }
        }

        fn fill_inputs(&mut self) {
            self.state
                .set_input(InputUpdate::Video(Some(FileHandle::new("v.mp4"))));
            self.state
                .set_input(InputUpdate::Transcript(Some(FileHandle::new("t.json"))));
            self.state
                .set_input(InputUpdate::TemplateMap(Some(FileHandle::new("m.json"))));
        }

        async fn pump(&mut self) {
            let event = self.events.recv().await.unwrap();
            handle_backend_event(&mut self.state, event);
        }
    }

    fn scenario_a_result() -> ProcessResult {
        ProcessResult {
            job_id: "j1".into(),
            captures: vec![Capture {
                id: "c1".into(),
                timestamp_seconds: 3.2,
                text: "intro".into(),
                raw_capture: None,
                marked_capture: None,
                bbox: None,
            }],
            captures_json: None,
        }
    }

    #[tokio::test]
    async fn successful_submission_shows_result() {
        let mut h = Harness::new();
        h.fill_inputs();

        let generation = h.state.submit().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(h.state.status, SubmissionState::Submitting);

        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Ok(scenario_a_result()));
        h.pump().await;

        assert_eq!(h.state.status, SubmissionState::Succeeded);
        assert!(h.state.error.is_empty());
        let view = crate::projection::project(&h.state);
        let result = view.result.unwrap();
        assert_eq!(result.capture_count, 1);
        assert_eq!(result.lines, vec!["t=3.2s — intro"]);
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn missing_transcript_never_reaches_endpoint() {
        let mut h = Harness::new();
        h.state
            .set_input(InputUpdate::Video(Some(FileHandle::new("v.mp4"))));
        h.state
            .set_input(InputUpdate::TemplateMap(Some(FileHandle::new("m.json"))));

        let err = h.state.submit().unwrap_err();
        tokio::task::yield_now().await;

        assert!(err.is_validation());
        assert_eq!(h.state.error, MISSING_FILES_MESSAGE);
        assert_eq!(h.state.status, SubmissionState::Idle);
        assert!(h.state.result.is_none());
        assert_eq!(h.state.generation, 0);
        assert_eq!(h.fake.calls(), 0);
    }

    #[tokio::test]
    async fn every_missing_mandatory_field_blocks_submit() {
        for missing in [InputKeyCase::Video, InputKeyCase::Transcript, InputKeyCase::TemplateMap] {
            let mut h = Harness::new();
            h.fill_inputs();
            h.state.set_input(missing.clear());

            assert!(h.state.submit().is_err());
            assert!(!h.state.error.is_empty());
            tokio::task::yield_now().await;
            assert_eq!(h.fake.calls(), 0);
        }
    }

    enum InputKeyCase {
        Video,
        Transcript,
        TemplateMap,
    }

    impl InputKeyCase {
        fn clear(&self) -> InputUpdate {
            match self {
                InputKeyCase::Video => InputUpdate::Video(None),
                InputKeyCase::Transcript => InputUpdate::Transcript(None),
                InputKeyCase::TemplateMap => InputUpdate::TemplateMap(None),
            }
        }
    }

    #[tokio::test]
    async fn rejection_message_is_shown() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();

        h.fake.wait_for_calls(1).await;
        h.fake
            .reply(0, Err(SubmitError::rejected(400, Some("formato inválido".into()))));
        h.pump().await;

        assert_eq!(h.state.status, SubmissionState::Failed);
        assert_eq!(h.state.error, "formato inválido");
        assert!(h.state.result.is_none());
    }

    #[tokio::test]
    async fn transport_failure_shows_its_text() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();

        h.fake.wait_for_calls(1).await;
        h.fake
            .reply(0, Err(SubmitError::Transport("error sending request".into())));
        h.pump().await;

        assert_eq!(h.state.status, SubmissionState::Failed);
        assert_eq!(h.state.error, "error sending request");
        assert!(h.state.result.is_none());
    }

    #[tokio::test]
    async fn resubmit_clears_previous_outcome() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();
        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Err(SubmitError::rejected(500, None)));
        h.pump().await;
        assert!(!h.state.error.is_empty());

        h.state.submit().unwrap();
        assert!(h.state.error.is_empty());
        assert!(h.state.result.is_none());
        assert_eq!(h.state.status, SubmissionState::Submitting);

        h.fake.wait_for_calls(2).await;
        h.fake.reply(1, Ok(scenario_a_result()));
        h.pump().await;

        // Exactly one of error / result after a terminal response.
        assert!(h.state.error.is_empty());
        assert!(h.state.result.is_some());
    }

    #[tokio::test]
    async fn failed_validation_after_success_returns_to_idle() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();
        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Ok(scenario_a_result()));
        h.pump().await;

        h.state.set_input(InputUpdate::Video(None));
        assert!(h.state.result.is_some(), "edits keep the shown result");

        h.state.submit().unwrap_err();
        assert_eq!(h.state.status, SubmissionState::Idle);
        assert!(h.state.result.is_none());
        assert_eq!(h.state.error, MISSING_FILES_MESSAGE);
    }

    #[tokio::test]
    async fn set_input_keeps_error_and_other_fields() {
        let mut h = Harness::new();
        h.state.submit().unwrap_err();
        h.state
            .set_input(InputUpdate::Templates(vec![FileHandle::new("a.png")]));
        h.state
            .set_input(InputUpdate::Video(Some(FileHandle::new("v.mp4"))));

        assert_eq!(h.state.error, MISSING_FILES_MESSAGE);
        assert_eq!(h.state.inputs.templates, vec![FileHandle::new("a.png")]);
        assert_eq!(h.state.inputs.video, Some(FileHandle::new("v.mp4")));
    }

    #[tokio::test]
    async fn request_snapshot_ignores_later_edits() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.set_input(InputUpdate::Templates(vec![
            FileHandle::new("b.png"),
            FileHandle::new("a.png"),
        ]));
        h.state.set_threshold(0.85);
        h.state.submit().unwrap();

        h.state
            .set_input(InputUpdate::Video(Some(FileHandle::new("other.mp4"))));
        h.state.set_threshold(0.6);
        h.fake.wait_for_calls(1).await;

        let request = h.fake.request(0);
        assert_eq!(request.threshold(), Some("0.85"));
        assert_eq!(request.template_count(), 2);
        let first = &request.fields()[0];
        assert_eq!(first.value, FieldValue::File(FileHandle::new("v.mp4")));
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let mut h = Harness::new();
        h.fill_inputs();
        let first = h.state.submit().unwrap();
        let second = h.state.submit().unwrap();
        assert!(second > first);

        h.fake.wait_for_calls(2).await;
        assert_eq!(h.fake.calls(), 2);

        // Deliver both outcomes by hand so the older one provably lands first.
        handle_backend_event(
            &mut h.state,
            BackendEvent::SubmissionFinished {
                generation: first,
                outcome: Ok(scenario_a_result()),
            },
        );
        assert_eq!(h.state.status, SubmissionState::Submitting);
        assert!(h.state.result.is_none());

        handle_backend_event(
            &mut h.state,
            BackendEvent::SubmissionFinished {
                generation: second,
                outcome: Err(SubmitError::rejected(400, Some("formato inválido".into()))),
            },
        );
        assert_eq!(h.state.status, SubmissionState::Failed);
        assert_eq!(h.state.error, "formato inválido");
    }

    #[tokio::test]
    async fn surface_sees_in_flight_and_terminal_views() {
        let mut h = Harness::new();
        let views = Rc::new(RefCell::new(Vec::new()));
        h.state
            .attach_surface(Box::new(RecordingSurface(views.clone())));
        h.fill_inputs();

        h.state.submit().unwrap();
        {
            let views = views.borrow();
            let last = views.last().unwrap();
            assert!(!last.submit_enabled);
            assert_eq!(last.submit_label, SUBMITTING_LABEL);
        }

        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Ok(scenario_a_result()));
        h.pump().await;

        let views = views.borrow();
        let last = views.last().unwrap();
        assert!(last.submit_enabled);
        assert!(last.error.is_none());
        assert_eq!(last.result.as_ref().unwrap().job_id, "j1");
    }

    #[tokio::test]
    async fn threshold_is_clamped_and_labelled() {
        let mut h = Harness::new();
        h.state.set_threshold(1.2);
        assert_eq!(h.state.threshold.value(), 0.99);
        h.state.set_threshold(0.85);
        assert_eq!(
            crate::projection::project(&h.state).threshold_label,
            "Umbral: 0.85"
        );
    }

    #[tokio::test]
    async fn settings_changes_are_saved() {
        let mut h = Harness::new();
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");

        h.state.set_server_url("  http://media.local:9000/  ");
        h.state.set_threshold(0.82);
        h.state.remember_threshold();
        h.state.save_config(&path).unwrap();

        let saved = Config::load_from(&path);
        assert_eq!(saved.server_url, "http://media.local:9000/");
        assert_eq!(saved.default_threshold, 0.82);
    }

    #[tokio::test]
    async fn blank_server_url_is_ignored() {
        let mut h = Harness::new();
        let before = h.state.config.server_url.clone();
        h.state.set_server_url("   ");
        assert_eq!(h.state.config.server_url, before);
    }

    #[tokio::test]
    async fn export_after_form_closed_is_quiet() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();
        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Ok(scenario_a_result()));
        h.pump().await;

        drop(h.events);
        h.state.export_captures(Path::new("/tmp/exports")).unwrap();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(h.state.exporting);
        assert_eq!(h.state.status, SubmissionState::Succeeded);
    }

    #[tokio::test]
    async fn export_requires_a_result() {
        let mut h = Harness::new();
        let err = h.state.export_captures(Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, ExportError::NoResult));
        assert!(!h.state.exporting);
    }

    #[tokio::test]
    async fn export_reports_completion() {
        let mut h = Harness::new();
        h.fill_inputs();
        h.state.submit().unwrap();
        h.fake.wait_for_calls(1).await;
        h.fake.reply(0, Ok(scenario_a_result()));
        h.pump().await;

        h.state.export_captures(Path::new("/tmp/exports")).unwrap();
        assert!(h.state.exporting);
        assert!(!crate::projection::project(&h.state).export_enabled);

        h.pump().await;
        assert!(!h.state.exporting);
        assert_eq!(
            h.state.export_message.as_deref(),
            Some("Capturas guardadas en /tmp/exports/j1")
        );
    }
}
