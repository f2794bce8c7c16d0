use super::state::{AppState, BackendEvent};
use crate::api::SubmissionRequest;

impl AppState {
    /// Run the request on the tokio runtime and report back exactly once.
    pub(super) fn dispatch_submission(&self, generation: u64, request: SubmissionRequest) {
        let endpoint = self.endpoint.clone();
        let sender = self.backend_sender.clone();

        self.runtime.spawn(async move {
            let outcome = endpoint.process(request).await;
            if sender
                .send(BackendEvent::SubmissionFinished { generation, outcome })
                .await
                .is_err()
            {
                log::warn!("Submission {generation} finished after the form closed");
            }
        });
    }
}
