//! Client side of the key-moment capture service.
//!
//! The form collects a video, its transcript, a template map and optional
//! template images, then posts them as one multipart request to
//! `/api/process` and shows the returned captures (or the reason there are
//! none).
//!
//! The workflow lives in [`app::AppState`] and runs without any GUI toolkit;
//! the `gui` feature adds the GTK front end in `src/ui`.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod form;
pub mod projection;

pub use app::{handle_backend_event, AppState, BackendEvent, SubmissionState};
pub use config::Config;
pub use error::{ExportError, SubmitError};
pub use form::{FileHandle, InputKey, InputSet, InputUpdate, Threshold};
