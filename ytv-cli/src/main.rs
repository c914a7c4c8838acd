use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytv::config::{DEFAULT_YT_DLP, YT_DLP_ENV, default_output_dir, ensure_output_dir};
use ytv::{VideoDownloader, YtDlp};

#[derive(Parser, Debug)]
#[command(name = "yt")]
#[command(version, about = "Download a video with subtitles, thumbnail and metadata")]
#[command(long_about = None)]
struct Cli {
    /// Video URL
    #[arg(value_name = "youtube-url")]
    url: String,

    /// yt-dlp executable to run
    #[arg(long = "yt-dlp", value_name = "PATH", env = YT_DLP_ENV, default_value = DEFAULT_YT_DLP)]
    yt_dlp: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return Ok(usage_error(e)),
    };

    init_logging(cli.verbose);

    let output_dir = default_output_dir()?;
    ensure_output_dir(&output_dir)
        .await
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let downloader = VideoDownloader::new(YtDlp::new(&cli.yt_dlp), output_dir);
    let report = downloader.download(&cli.url).await?;

    info!(
        "Downloaded {} into {} ({})",
        cli.url,
        downloader.output_dir().display(),
        report.tier
    );
    debug!("Finished after {} attempt(s)", report.attempts);

    Ok(ExitCode::SUCCESS)
}

/// Print the parse error and pick the exit code; a missing URL always exits with 1
fn usage_error(error: clap::Error) -> ExitCode {
    let _ = error.print();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Initialize logging based on verbosity level; all log output goes to stderr
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ytv_cli=debug,ytv=debug".into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ytv_cli=info,ytv=info".into())
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .with_level(verbose),
        )
        .with(env_filter)
        .init();
}
