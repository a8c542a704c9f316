//! Merged artifact naming and classification.

use crate::fingerprint::Fingerprint;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a client-supplied file name in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// URL prefix under which merged artifacts are served.
pub const ASSETS_PREFIX: &str = "/assets";

/// Bytes left unescaped in an artifact URL segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Validate a client-supplied file name.
///
/// Names are a single path segment: no separators, no NUL, not `.`/`..`, and
/// not hidden (a leading `.` is reserved for in-flight temp files).
pub fn validate_file_name(name: &str) -> crate::Result<()> {
    let reason = if name.is_empty() {
        "empty"
    } else if name.len() > MAX_FILE_NAME_LEN {
        "too long"
    } else if name.contains(['/', '\\', '\0']) {
        "contains a path separator or NUL"
    } else if name.starts_with('.') {
        "starts with '.'"
    } else if name.chars().any(char::is_control) {
        "contains control characters"
    } else {
        return Ok(());
    };
    Err(crate::Error::InvalidFileName(format!("{name:?}: {reason}")))
}

/// Deterministic name of a merged artifact: `<fingerprint>-<fileName>`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn new(fingerprint: &Fingerprint, file_name: &str) -> crate::Result<Self> {
        validate_file_name(file_name)?;
        Ok(Self(format!("{fingerprint}-{file_name}")))
    }

    /// Parse a stored artifact name back into its parts.
    pub fn parse(name: &str) -> crate::Result<Self> {
        let (fp, file_name) = name.split_once('-').ok_or_else(|| {
            crate::Error::InvalidFileName(format!("{name:?}: not an artifact name"))
        })?;
        let fingerprint = Fingerprint::parse(fp)?;
        Self::new(&fingerprint, file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fingerprint part.
    pub fn fingerprint(&self) -> &str {
        self.0.split_once('-').map(|(fp, _)| fp).unwrap_or(&self.0)
    }

    /// The original file name part.
    pub fn file_name(&self) -> &str {
        self.0.split_once('-').map(|(_, name)| name).unwrap_or("")
    }

    /// Public URL path of the artifact, percent-encoded as one segment.
    pub fn url(&self) -> String {
        format!("{ASSETS_PREFIX}/{}", utf8_percent_encode(&self.0, SEGMENT))
    }

    pub fn kind(&self) -> ArtifactKind {
        ArtifactKind::classify(&self.0)
    }
}

impl TryFrom<String> for ArtifactName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<ArtifactName> for String {
    fn from(value: ArtifactName) -> Self {
        value.0
    }
}

impl fmt::Debug for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactName({})", self.0)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse media classification, used by listings to offer previews.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Video,
    Audio,
    Text,
    Other,
}

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const VIDEO_EXTS: &[&str] = &[
    "mp4", "avi", "wmv", "flv", "webm", "mkv", "mpeg", "mpg", "m4v", "3gp", "ogv",
];
const AUDIO_EXTS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "wma", "aiff"];
const TEXT_EXTS: &[&str] = &[
    "txt", "md", "json", "xml", "log", "css", "js", "html", "csv",
];

fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

impl ArtifactKind {
    /// Classify a file name by extension (case-insensitive).
    pub fn classify(name: &str) -> Self {
        let Some(ext) = extension(name) else {
            return Self::Other;
        };
        let ext = ext.as_str();
        if IMAGE_EXTS.contains(&ext) {
            Self::Image
        } else if VIDEO_EXTS.contains(&ext) {
            Self::Video
        } else if AUDIO_EXTS.contains(&ext) {
            Self::Audio
        } else if TEXT_EXTS.contains(&ext) {
            Self::Text
        } else {
            Self::Other
        }
    }
}

/// Content type for serving an artifact, from a fixed extension table.
pub fn content_type(name: &str) -> &'static str {
    let Some(ext) = extension(name) else {
        return "application/octet-stream";
    };
    match ext.as_str() {
        // .mov is served as mp4 for wider player support
        "mp4" | "mov" => "video/mp4",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mpeg" | "mpg" => "video/mpeg",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        "ogv" => "video/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wma" => "audio/x-ms-wma",
        "aiff" => "audio/aiff",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" | "log" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

/// Human-readable size in base-1024 units with at most two decimals.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
