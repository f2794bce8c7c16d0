mod client;
mod request;
mod types;

pub use client::{interpret_response, ProcessClient, ProcessingEndpoint, OUTPUT_PATH, PROCESS_PATH};
pub use request::{
    FieldValue, FormField, SubmissionRequest, FIELD_TEMPLATES, FIELD_TEMPLATE_MAP,
    FIELD_THRESHOLD, FIELD_TRANSCRIPT, FIELD_VIDEO,
};
pub use types::{output_relative, Capture, ErrorBody, ProcessResult};
