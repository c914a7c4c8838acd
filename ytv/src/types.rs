use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::options::build_options;

/// One step of the subtitle fallback sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleTier {
    languages: &'static [&'static str],
}

impl SubtitleTier {
    /// Tier that requests no subtitles at all
    pub const NONE: SubtitleTier = SubtitleTier { languages: &[] };

    pub const fn new(languages: &'static [&'static str]) -> Self {
        Self { languages }
    }

    pub fn languages(&self) -> &'static [&'static str] {
        self.languages
    }

    pub fn requests_subtitles(&self) -> bool {
        !self.languages.is_empty()
    }

    /// Language codes as owned strings, or `None` for a tier without subtitles
    pub fn subtitle_languages(&self) -> Option<Vec<String>> {
        if self.requests_subtitles() {
            Some(self.languages.iter().map(|lang| lang.to_string()).collect())
        } else {
            None
        }
    }
}

impl fmt::Display for SubtitleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requests_subtitles() {
            write!(f, "{}", self.languages.join(", "))
        } else {
            write!(f, "no subtitles")
        }
    }
}

/// Subtitle fallback sequence, most ambitious request first
pub const SUBTITLE_TIERS: [SubtitleTier; 3] = [
    SubtitleTier::new(&["en", "nl"]),
    SubtitleTier::new(&["en"]),
    SubtitleTier::NONE,
];

/// A single download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub subtitle_languages: Option<Vec<String>>,
}

impl DownloadRequest {
    pub fn new(url: &str, output_dir: &Path, tier: &SubtitleTier) -> Self {
        Self {
            url: url.to_string(),
            output_dir: output_dir.to_path_buf(),
            subtitle_languages: tier.subtitle_languages(),
        }
    }

    /// Downloader options for this attempt
    pub fn options(&self) -> DownloadOptions {
        build_options(&self.output_dir, self.subtitle_languages.as_deref())
    }
}

/// Post-processing step applied after the download finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "key")]
pub enum PostProcessor {
    /// Write metadata tags into the container
    FFmpegMetadata,
    /// Embed the thumbnail into the container
    EmbedThumbnail,
}

/// Subtitle part of the options, present only when subtitles are requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleOptions {
    #[serde(rename = "writesubtitles")]
    pub write_subtitles: bool,
    #[serde(rename = "writeautomaticsub")]
    pub write_automatic_subtitles: bool,
    #[serde(rename = "subtitleslangs")]
    pub languages: Vec<String>,
}

/// Options handed to the downloader, serialized under the downloader's own option names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOptions {
    pub format: String,
    pub merge_output_format: String,
    #[serde(rename = "writethumbnail")]
    pub write_thumbnail: bool,
    #[serde(rename = "embedthumbnail")]
    pub embed_thumbnail: bool,
    #[serde(rename = "writedescription")]
    pub write_description: bool,
    #[serde(rename = "writeinfojson")]
    pub write_info_json: bool,
    #[serde(rename = "outtmpl")]
    pub output_template: String,
    pub postprocessors: Vec<PostProcessor>,
    #[serde(flatten)]
    pub subtitles: Option<SubtitleOptions>,
}

impl DownloadOptions {
    pub fn requests_subtitles(&self) -> bool {
        self.subtitles.is_some()
    }

    pub fn subtitle_languages(&self) -> &[String] {
        self.subtitles
            .as_ref()
            .map(|subs| subs.languages.as_slice())
            .unwrap_or_default()
    }
}

/// Outcome of a successful download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadReport {
    /// Number of downloader invocations, including the successful one
    pub attempts: usize,
    /// Tier whose options succeeded
    pub tier: SubtitleTier,
}
