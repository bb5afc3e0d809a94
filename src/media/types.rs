use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Video container
    #[default]
    Mp4,
    /// Audio only, transcoded
    Mp3,
}

impl OutputKind {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Mp4 => "mp4",
            OutputKind::Mp3 => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputKind::Mp4 => "video/mp4",
            OutputKind::Mp3 => "audio/mpeg",
        }
    }

    pub fn needs_transcode(&self) -> bool {
        matches!(self, OutputKind::Mp3)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(OutputKind::Mp4),
            "mp3" => Ok(OutputKind::Mp3),
            other => Err(format!("unsupported download type: {other}")),
        }
    }
}

/// Descriptive metadata for a source URL
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Seconds; fractional for some extractors
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Byte-level report from an in-progress transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    /// Unknown for progressive or chunked transfers
    pub total: Option<u64>,
}

/// What the fetcher should retrieve and where to put it
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub kind: OutputKind,
    /// Output path without extension; the fetcher picks the extension
    pub output_stem: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_parse() {
        assert_eq!("mp4".parse::<OutputKind>().unwrap(), OutputKind::Mp4);
        assert_eq!(" MP3 ".parse::<OutputKind>().unwrap(), OutputKind::Mp3);
        assert!("flac".parse::<OutputKind>().is_err());
    }

    #[test]
    fn test_output_kind_content_types() {
        assert_eq!(OutputKind::Mp4.content_type(), "video/mp4");
        assert_eq!(OutputKind::Mp3.content_type(), "audio/mpeg");
        assert!(OutputKind::Mp3.needs_transcode());
        assert!(!OutputKind::Mp4.needs_transcode());
    }

    #[test]
    fn test_media_info_from_tool_json() {
        let json = r#"{"id": "dQw4w9WgXcQ", "title": "Song", "duration": 212, "thumbnail": "https://i.ytimg.com/x.jpg", "formats": []}"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "dQw4w9WgXcQ");
        assert_eq!(info.duration, Some(212.0));

        let bare: MediaInfo = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(bare.title.is_none());
        assert!(bare.thumbnail.is_none());
    }
}
