use std::path::Path;

use crate::types::{DownloadOptions, PostProcessor, SubtitleOptions};

/// Best combined stream, otherwise the best single stream available
pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";

/// Container the streams are merged into
pub const MERGE_OUTPUT_FORMAT: &str = "mkv";

/// Output file name, relative to the output directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Build downloader options for one attempt.
///
/// Subtitle options are only added for a non-empty language list; the
/// languages keep the order they were given in.
pub fn build_options(output_dir: &Path, subtitle_languages: Option<&[String]>) -> DownloadOptions {
    let subtitles = subtitle_languages
        .filter(|langs| !langs.is_empty())
        .map(|langs| SubtitleOptions {
            write_subtitles: true,
            write_automatic_subtitles: true,
            languages: langs.to_vec(),
        });

    DownloadOptions {
        format: DEFAULT_FORMAT.to_string(),
        merge_output_format: MERGE_OUTPUT_FORMAT.to_string(),
        write_thumbnail: true,
        embed_thumbnail: true,
        write_description: true,
        write_info_json: true,
        output_template: output_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
        postprocessors: vec![PostProcessor::FFmpegMetadata, PostProcessor::EmbedThumbnail],
        subtitles,
    }
}
