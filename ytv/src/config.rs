use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::{YtvError, YtvResult};

/// Downloader executable looked up on `PATH` when nothing else is configured
pub const DEFAULT_YT_DLP: &str = "yt-dlp";

/// Environment variable that overrides the downloader executable
pub const YT_DLP_ENV: &str = "YT_DLP_PATH";

/// Location of the output directory below the home directory
pub const OUTPUT_SUBDIR: [&str; 2] = ["Desktop", "videos"];

/// Output directory below the given home directory
pub fn output_dir_in(home: &Path) -> PathBuf {
    OUTPUT_SUBDIR
        .iter()
        .fold(home.to_path_buf(), |path, part| path.join(part))
}

/// `<home>/Desktop/videos` for the current user
pub fn default_output_dir() -> YtvResult<PathBuf> {
    let home = dirs::home_dir().ok_or(YtvError::HomeDirectoryNotFound)?;
    Ok(output_dir_in(&home))
}

/// Create the output directory and any missing parents; existing directories are left alone
pub async fn ensure_output_dir(path: &Path) -> YtvResult<()> {
    fs::create_dir_all(path).await?;
    debug!("Output directory ready: {}", path.display());
    Ok(())
}
