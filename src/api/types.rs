use serde::{Deserialize, Deserializer, Serialize};

/// Success body of `POST /api/process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub job_id: String,
    pub captures: Vec<Capture>,
    /// Path of the job's metadata file, e.g. `/api/output/demo/capturas.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captures_json: Option<String>,
}

/// One detected moment in the processed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "timestamp")]
    pub timestamp_seconds: f64,
    pub text: String,
    /// Server-side path of the unmarked frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_capture: Option<String>,
    /// Server-side path of the frame with the matched element outlined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_capture: Option<String>,
    /// `[x1, y1, x2, y2]` of the matched template, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[i64; 4]>,
}

impl Capture {
    /// Name of the best available image relative to the job's output
    /// directory (`marked/momento_001.png`), if the server reported one.
    pub fn output_name(&self, job_id: &str) -> Option<String> {
        self.marked_capture
            .as_deref()
            .or(self.raw_capture.as_deref())
            .map(|path| output_relative(path, job_id))
    }
}

/// Failure body of `POST /api/process`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Strip everything up to and including `output/{job_id}/` so a server path
/// becomes something `GET /api/output/{job_id}/...` can serve.
pub fn output_relative(path: &str, job_id: &str) -> String {
    let normalized = path.replace('\\', "/");
    let marker = format!("{job_id}/");
    match normalized.find(&format!("/{marker}")) {
        Some(idx) => normalized[idx + marker.len() + 1..].to_string(),
        None => match normalized.strip_prefix(&marker) {
            Some(rest) => rest.to_string(),
            None => normalized
                .rsplit('/')
                .next()
                .unwrap_or(normalized.as_str())
                .to_string(),
        },
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
