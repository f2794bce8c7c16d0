use reqwest::multipart::{Form, Part};

use crate::error::SubmitError;
use crate::form::{FileHandle, InputSet, Threshold};

pub const FIELD_VIDEO: &str = "video";
pub const FIELD_TRANSCRIPT: &str = "transcript";
pub const FIELD_TEMPLATE_MAP: &str = "template_map";
pub const FIELD_THRESHOLD: &str = "threshold";
pub const FIELD_TEMPLATES: &str = "templates";

/// Value of one multipart field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    File(FileHandle),
    Text(String),
}

/// One multipart field, in the order it goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

/// Snapshot of everything one submission sends. Taken when the user submits,
/// so later edits to the form cannot leak into an in-flight request.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    fields: Vec<FormField>,
}

impl SubmissionRequest {
    /// Build the field list from a validated input set.
    pub fn from_inputs(inputs: &InputSet, threshold: Threshold) -> Result<Self, SubmitError> {
        let (Some(video), Some(transcript), Some(template_map)) =
            (&inputs.video, &inputs.transcript, &inputs.template_map)
        else {
            return Err(SubmitError::Validation);
        };

        let mut fields = vec![
            FormField {
                name: FIELD_VIDEO,
                value: FieldValue::File(video.clone()),
            },
            FormField {
                name: FIELD_TRANSCRIPT,
                value: FieldValue::File(transcript.clone()),
            },
            FormField {
                name: FIELD_TEMPLATE_MAP,
                value: FieldValue::File(template_map.clone()),
            },
            FormField {
                name: FIELD_THRESHOLD,
                value: FieldValue::Text(threshold.to_string()),
            },
        ];
        // One repeated field per template, selection order preserved.
        fields.extend(inputs.templates.iter().map(|tpl| FormField {
            name: FIELD_TEMPLATES,
            value: FieldValue::File(tpl.clone()),
        }));

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn template_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.name == FIELD_TEMPLATES)
            .count()
    }

    /// The `threshold` field as sent.
    pub fn threshold(&self) -> Option<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == FIELD_THRESHOLD)
            .find_map(|f| match &f.value {
                FieldValue::Text(text) => Some(text.as_str()),
                FieldValue::File(_) => None,
            })
    }

    /// Read every referenced file and assemble the multipart body.
    pub async fn into_form(self) -> Result<Form, SubmitError> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field.value {
                FieldValue::Text(text) => form.text(field.name, text),
                FieldValue::File(file) => form.part(field.name, file_part(&file).await?),
            };
        }
        Ok(form)
    }
}

async fn file_part(file: &FileHandle) -> Result<Part, SubmitError> {
    let data = tokio::fs::read(file.path())
        .await
        .map_err(|source| SubmitError::Io {
            path: file.path().to_path_buf(),
            source,
        })?;
    log::debug!("Attaching {} ({} bytes)", file, data.len());
    Part::bytes(data)
        .file_name(file.file_name())
        .mime_str(&file.mime_type())
        .map_err(|e| SubmitError::Transport(e.to_string()))
}
