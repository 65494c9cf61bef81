//! Media type recognition for inbound uploads.
//!
//! The upload surface only accepts files it can later transcribe or clip:
//! long-form video, audio, and caption/transcript text. The extension table
//! is the single source for both init-time validation and the mime type
//! recorded with the assembled file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad media category of an accepted upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Video,
    Audio,
    Text,
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A recognized media type: category plus concrete mime type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaType {
    pub category: MediaCategory,
    pub mime_type: &'static str,
}

/// Extension table for accepted uploads.
const MEDIA_TYPES: &[(&str, MediaCategory, &str)] = &[
    ("mp4", MediaCategory::Video, "video/mp4"),
    ("mov", MediaCategory::Video, "video/quicktime"),
    ("mkv", MediaCategory::Video, "video/x-matroska"),
    ("webm", MediaCategory::Video, "video/webm"),
    ("avi", MediaCategory::Video, "video/x-msvideo"),
    ("mp3", MediaCategory::Audio, "audio/mpeg"),
    ("wav", MediaCategory::Audio, "audio/wav"),
    ("m4a", MediaCategory::Audio, "audio/mp4"),
    ("flac", MediaCategory::Audio, "audio/flac"),
    ("ogg", MediaCategory::Audio, "audio/ogg"),
    ("txt", MediaCategory::Text, "text/plain"),
    ("srt", MediaCategory::Text, "application/x-subrip"),
    ("vtt", MediaCategory::Text, "text/vtt"),
];

/// Look up the media type for a filename.
///
/// Matching is on the final extension, case-insensitive.
pub fn media_type_for(filename: &str) -> Option<MediaType> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, category, mime_type)| MediaType {
            category: *category,
            mime_type,
        })
}

/// Validate a filename at session init.
///
/// Rejects unsupported extensions and names that could address outside the
/// session's storage area.
pub fn validate_filename(filename: &str) -> crate::Result<MediaType> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(crate::Error::Validation(format!(
            "invalid filename: {filename:?}"
        )));
    }
    media_type_for(filename).ok_or_else(|| {
        crate::Error::Validation(format!("unsupported file type: {filename}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_extensions() {
        let mp4 = media_type_for("interview.mp4").unwrap();
        assert_eq!(mp4.category, MediaCategory::Video);
        assert_eq!(mp4.mime_type, "video/mp4");

        let wav = media_type_for("podcast.WAV").unwrap();
        assert_eq!(wav.category, MediaCategory::Audio);

        let srt = media_type_for("episode.final.srt").unwrap();
        assert_eq!(srt.category, MediaCategory::Text);
    }

    #[test]
    fn test_unrecognized_extensions() {
        assert!(media_type_for("archive.zip").is_none());
        assert!(media_type_for("noextension").is_none());
        assert!(media_type_for("binary.exe").is_none());
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("clip.mp4").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("dir/clip.mp4").is_err());
        assert!(validate_filename("..\\clip.mp4").is_err());
        assert!(matches!(
            validate_filename("notes.pdf"),
            Err(crate::Error::Validation(_))
        ));
    }
}
