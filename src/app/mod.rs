mod controller;
mod event_handler;
mod export;
mod pipeline;
mod state;

pub use event_handler::handle_backend_event;
pub use export::{export_job, METADATA_FILE};
pub use state::{AppState, BackendEvent, SubmissionState};
