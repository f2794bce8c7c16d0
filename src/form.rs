use std::fmt;
use std::path::{Path, PathBuf};

/// Lowest threshold the slider offers.
pub const THRESHOLD_MIN: f64 = 0.50;
/// Highest threshold the slider offers.
pub const THRESHOLD_MAX: f64 = 0.99;
/// Slider step.
pub const THRESHOLD_STEP: f64 = 0.01;
/// Threshold used until the user moves the slider.
pub const THRESHOLD_DEFAULT: f64 = 0.70;

/// A file the user picked. Only the reference is held; contents are read
/// when the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent in the multipart `Content-Disposition`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into())
    }

    /// MIME type guessed from the extension, the way a browser would label
    /// a picked file.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Which form control changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Video,
    Transcript,
    TemplateMap,
    Templates,
}

/// A change to exactly one field of the [`InputSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum InputUpdate {
    Video(Option<FileHandle>),
    Transcript(Option<FileHandle>),
    TemplateMap(Option<FileHandle>),
    /// The full selection the multi-file picker currently reports.
    Templates(Vec<FileHandle>),
}

impl InputUpdate {
    pub fn key(&self) -> InputKey {
        match self {
            InputUpdate::Video(_) => InputKey::Video,
            InputUpdate::Transcript(_) => InputKey::Transcript,
            InputUpdate::TemplateMap(_) => InputKey::TemplateMap,
            InputUpdate::Templates(_) => InputKey::Templates,
        }
    }
}

/// Files collected by the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSet {
    pub video: Option<FileHandle>,
    pub transcript: Option<FileHandle>,
    pub template_map: Option<FileHandle>,
    pub templates: Vec<FileHandle>,
}

impl InputSet {
    /// Fresh, all-empty input set for a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the one field named by `update`; every other field is kept.
    pub fn apply(&mut self, update: InputUpdate) {
        match update {
            InputUpdate::Video(file) => self.video = file,
            InputUpdate::Transcript(file) => self.transcript = file,
            InputUpdate::TemplateMap(file) => self.template_map = file,
            InputUpdate::Templates(files) => self.templates = files,
        }
    }

    /// Mandatory fields that are still empty, in form order.
    pub fn missing(&self) -> Vec<InputKey> {
        let mut missing = Vec::new();
        if self.video.is_none() {
            missing.push(InputKey::Video);
        }
        if self.transcript.is_none() {
            missing.push(InputKey::Transcript);
        }
        if self.template_map.is_none() {
            missing.push(InputKey::TemplateMap);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.video.is_some() && self.transcript.is_some() && self.template_map.is_some()
    }
}

/// Template-match threshold sent with each submission.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Clamp into the slider range and snap to the nearest step.
    /// Non-finite input falls back to the default.
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        let clamped = value.clamp(THRESHOLD_MIN, THRESHOLD_MAX);
        let steps = (clamped / THRESHOLD_STEP).round();
        Self(steps / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(THRESHOLD_DEFAULT)
    }
}

/// Shortest decimal form, e.g. `0.7`, `0.85`.
impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
