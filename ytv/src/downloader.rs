use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_YT_DLP;
use crate::error::{YtvError, YtvResult};
use crate::types::{DownloadOptions, PostProcessor};

/// Anything that can attempt a download given options and a URL.
///
/// A failure must carry the downloader's own failure text so the caller can
/// look for the rate-limit marker in it.
pub trait Downloader {
    fn download(
        &self,
        options: &DownloadOptions,
        url: &str,
    ) -> impl Future<Output = YtvResult<()>> + Send;
}

/// Downloader backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Translate options into `yt-dlp` command line arguments
    pub fn args(options: &DownloadOptions, url: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format.clone(),
            "--merge-output-format".to_string(),
            options.merge_output_format.clone(),
        ];

        if options.write_thumbnail {
            args.push("--write-thumbnail".to_string());
        }
        if options.write_description {
            args.push("--write-description".to_string());
        }
        if options.write_info_json {
            args.push("--write-info-json".to_string());
        }

        args.push("-o".to_string());
        args.push(options.output_template.clone());

        let embed_thumbnail = options.embed_thumbnail
            || options
                .postprocessors
                .contains(&PostProcessor::EmbedThumbnail);

        // Post-processors run in the order yt-dlp defines for them
        for processor in &options.postprocessors {
            if *processor == PostProcessor::FFmpegMetadata {
                args.push("--embed-metadata".to_string());
            }
        }
        if embed_thumbnail {
            args.push("--embed-thumbnail".to_string());
        }

        if let Some(subs) = &options.subtitles {
            if subs.write_subtitles {
                args.push("--write-subs".to_string());
            }
            if subs.write_automatic_subtitles {
                args.push("--write-auto-subs".to_string());
            }
            args.push("--sub-langs".to_string());
            args.push(subs.languages.join(","));
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

impl Downloader for YtDlp {
    async fn download(&self, options: &DownloadOptions, url: &str) -> YtvResult<()> {
        let args = Self::args(options, url);
        info!("Running {} for {}", self.program.display(), url);
        debug!("Arguments: {:?}", args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| YtvError::DownloaderUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        let mut captured = String::new();
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\r', '\n']);
                        forward_stderr_line(line);
                        captured.push_str(line);
                        captured.push('\n');
                    }
                    Err(e) => {
                        warn!("Stopped reading yt-dlp stderr: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            return Ok(());
        }

        Err(YtvError::Download {
            message: failure_message(&captured, status),
        })
    }
}

/// Surface yt-dlp warnings to the user; everything else is debug output
fn forward_stderr_line(line: &str) {
    if is_warning(line) {
        warn!("yt-dlp: {}", line);
    } else {
        debug!("yt-dlp: {}", line);
    }
}

fn is_warning(line: &str) -> bool {
    line.starts_with("WARNING:")
}

fn is_error(line: &str) -> bool {
    line.starts_with("ERROR:")
}

/// Failure text for a non-zero exit.
///
/// Only the `ERROR:` lines are kept when there are any, so a warning that
/// happens to mention `429` does not mark an unrelated failure as rate
/// limited. Without `ERROR:` lines the whole stderr is used, and the exit
/// status when stderr is empty.
fn failure_message(stderr: &str, status: ExitStatus) -> String {
    let errors: Vec<&str> = stderr.lines().filter(|line| is_error(line)).collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }

    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("yt-dlp exited with {}", status)
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::build_options;
    use std::path::Path;

    fn position(args: &[String], flag: &str) -> Option<usize> {
        args.iter().position(|arg| arg == flag)
    }

    #[test]
    fn test_args_without_subtitles() {
        let options = build_options(Path::new("/videos"), None);
        let args = YtDlp::args(&options, "https://youtu.be/abc123");

        assert_eq!(
            args,
            vec![
                "-f",
                "bestvideo+bestaudio/best",
                "--merge-output-format",
                "mkv",
                "--write-thumbnail",
                "--write-description",
                "--write-info-json",
                "-o",
                "/videos/%(title)s.%(ext)s",
                "--embed-metadata",
                "--embed-thumbnail",
                "--",
                "https://youtu.be/abc123",
            ]
        );
    }

    #[test]
    fn test_args_with_subtitles() {
        let langs = vec!["en".to_string(), "nl".to_string()];
        let options = build_options(Path::new("/videos"), Some(langs.as_slice()));
        let args = YtDlp::args(&options, "https://youtu.be/abc123");

        assert!(position(&args, "--write-subs").is_some());
        assert!(position(&args, "--write-auto-subs").is_some());
        let langs_at = position(&args, "--sub-langs").expect("--sub-langs present") + 1;
        assert_eq!(args[langs_at], "en,nl");
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc123"));
    }

    #[test]
    fn test_embed_thumbnail_appears_once() {
        let options = build_options(Path::new("/videos"), None);
        let args = YtDlp::args(&options, "https://youtu.be/abc123");
        let count = args.iter().filter(|arg| *arg == "--embed-thumbnail").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_url_is_passed_after_separator() {
        let options = build_options(Path::new("/videos"), None);
        let args = YtDlp::args(&options, "-not-a-flag");
        let separator = position(&args, "--").unwrap();
        assert_eq!(args[separator + 1], "-not-a-flag");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let downloader = YtDlp::new("/nonexistent/ytv-test/yt-dlp");
        let options = build_options(Path::new("/videos"), None);
        let result = downloader.download(&options, "https://youtu.be/abc123").await;

        assert!(matches!(
            result,
            Err(YtvError::DownloaderUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_message_prefers_stderr() {
        use std::os::unix::process::ExitStatusExt;

        let status = ExitStatus::from_raw(1 << 8);
        assert_eq!(
            failure_message("ERROR: HTTP Error 429: Too Many Requests\n", status),
            "ERROR: HTTP Error 429: Too Many Requests"
        );
        assert_eq!(
            failure_message("[youtube] abc123: something odd\n", status),
            "[youtube] abc123: something odd"
        );
        assert_eq!(
            failure_message("  \n", status),
            "yt-dlp exited with exit status: 1"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_message_keeps_only_error_lines() {
        use std::os::unix::process::ExitStatusExt;

        let status = ExitStatus::from_raw(1 << 8);
        let stderr = "WARNING: [youtube] retrying after HTTP Error 429\n\
                      ERROR: [youtube] abc123: Video unavailable\n";
        let message = failure_message(stderr, status);

        assert_eq!(message, "ERROR: [youtube] abc123: Video unavailable");
        let err = YtvError::Download { message };
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_warning_lines() {
        assert!(is_warning("WARNING: [youtube] Falling back to generic n function search"));
        assert!(!is_warning("ERROR: HTTP Error 429: Too Many Requests"));
        assert!(!is_warning("[download] Destination: video.mkv"));
    }

    #[cfg(unix)]
    mod fake_program {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(body: &str) -> (TempDir, YtDlp) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("yt-dlp");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            (dir, YtDlp::new(path))
        }

        #[tokio::test]
        async fn test_invalid_utf8_on_stderr_keeps_failure_text() {
            let (_dir, downloader) = script(
                "printf 'WARNING: title caf\\351\\n' >&2\n\
                 echo 'ERROR: HTTP Error 429: Too Many Requests' >&2\n\
                 exit 1",
            );
            let options = build_options(Path::new("/videos"), None);
            let err = downloader
                .download(&options, "https://youtu.be/abc123")
                .await
                .unwrap_err();

            assert!(err.is_rate_limited(), "unexpected error: {:?}", err);
            match err {
                YtvError::Download { message } => {
                    assert_eq!(message, "ERROR: HTTP Error 429: Too Many Requests")
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_success_with_warnings() {
            let (_dir, downloader) = script("printf 'WARNING: caf\\351\\n' >&2\nexit 0");
            let options = build_options(Path::new("/videos"), None);
            let result = downloader.download(&options, "https://youtu.be/abc123").await;

            assert!(result.is_ok());
        }
    }
}
