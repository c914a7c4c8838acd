pub mod config;
pub mod downloader;
pub mod error;
pub mod options;
pub mod types;

pub use downloader::{Downloader, YtDlp};
pub use error::{YtvError, YtvResult};
pub use options::build_options;
pub use types::{
    DownloadOptions, DownloadReport, DownloadRequest, PostProcessor, SUBTITLE_TIERS,
    SubtitleOptions, SubtitleTier,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Downloads a video, dropping subtitle languages when the downloader is rate limited
pub struct VideoDownloader<D> {
    downloader: D,
    output_dir: PathBuf,
    tiers: Vec<SubtitleTier>,
}

impl<D: Downloader> VideoDownloader<D> {
    /// Create a downloader writing into `output_dir`, using the standard subtitle tiers
    pub fn new(downloader: D, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            output_dir: output_dir.into(),
            tiers: SUBTITLE_TIERS.to_vec(),
        }
    }

    /// Replace the subtitle tiers, most ambitious first
    pub fn with_tiers(mut self, tiers: &[SubtitleTier]) -> Self {
        self.tiers = tiers.to_vec();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn tiers(&self) -> &[SubtitleTier] {
        &self.tiers
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Download `url`, walking the tiers until one succeeds.
    ///
    /// A rate-limited attempt that requested subtitles moves on to the next
    /// tier. Every other failure, including a rate limit on the last tier,
    /// is returned unchanged.
    pub async fn download(&self, url: &str) -> YtvResult<DownloadReport> {
        if self.tiers.is_empty() {
            return Err(YtvError::Configuration {
                message: "no subtitle tiers configured".to_string(),
            });
        }

        info!("Downloading {} into {}", url, self.output_dir.display());

        let mut index = 0;
        loop {
            let tier = self.tiers[index];
            let request = DownloadRequest::new(url, &self.output_dir, &tier);
            let options = request.options();

            debug!("Attempt {} with subtitles: {}", index + 1, tier);
            if let Ok(json) = serde_json::to_string(&options) {
                debug!("Options: {}", json);
            }

            match self.downloader.download(&options, &request.url).await {
                Ok(()) => {
                    return Ok(DownloadReport {
                        attempts: index + 1,
                        tier,
                    });
                }
                Err(e) if e.is_rate_limited()
                    && tier.requests_subtitles()
                    && index + 1 < self.tiers.len() =>
                {
                    warn!("Rate limited on subtitles ({}), retrying with fewer...", tier);
                    index += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
