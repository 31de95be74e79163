//! reup-upload - Publish a batch of videos to one or more destinations
//!
//! Videos are published one at a time, in the order given, with an optional
//! pause between them. One result per video is written to stdout as soon as
//! it is known; logs go to stderr.

use clap::{Parser, ValueEnum};
use libreupcast::config::Config;
use libreupcast::logging;
use libreupcast::permissions::check_token;
use libreupcast::platforms::graph::GraphClient;
use libreupcast::publish::{
    BatchOrchestrator, BatchSummary, FanOutPolicy, JsonLinesSink, ProgressSink, TextSink,
    VideoPublisher,
};
use libreupcast::staging::StagingArea;
use libreupcast::store::TokenStore;
use libreupcast::types::BatchRequest;
use libreupcast::{ReupcastError, Result};
use secrecy::ExposeSecret;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line
    Json,
    /// One human-readable line per video
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "reup-upload")]
#[command(version)]
#[command(about = "Publish a batch of videos to one or more destinations")]
#[command(long_about = "\
reup-upload - Publish a batch of videos to one or more destinations

DESCRIPTION:
    Publishes each video, in order, to the given destination tokens and
    reports one result per video on stdout as soon as it is known.

    Videos are copied into the staging directory first; the staged copy is
    deleted after its video has been processed, whether publishing
    succeeded or not. With --consume the given files themselves are
    published and deleted.

USAGE:
    # One video, two pages, broadcast to both
    reup-upload clip.mp4 -t \"My clip\" --token PAGE_TOKEN_1 --token PAGE_TOKEN_2

    # Two videos, ten minutes apart, using stored tokens
    reup-upload a.mp4 b.mp4 -t \"First\" -t \"Second\" --stored token1.txt --interval 10

    # Try tokens in order until one works
    reup-upload clip.mp4 -t \"Clip\" --stored 1 --stored 2 --policy first-success

    # Tokens from stdin, one per line
    cat tokens.txt | reup-upload clip.mp4 -t \"Clip\" --token-stdin

SIGNALS:
    SIGTERM, SIGINT - Stop after cleaning up; remaining staged files are removed

CONFIGURATION:
    Configuration file: ~/.config/reupcast/config.toml (or $REUPCAST_CONFIG)

    [upload]
    interval_minutes = 0     # pause between videos
    policy = \"broadcast\"     # or \"first-success\"
    staging_dir = \"~/.local/share/reupcast/uploads\"

EXIT CODES:
    0 - Every video was published
    1 - At least one video failed, or the batch was cancelled
    2 - Authentication or permission error
    3 - Invalid input
")]
struct Cli {
    /// Video files to publish, in order
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Title for each video, matched by position
    #[arg(short, long = "title", value_name = "TITLE")]
    titles: Vec<String>,

    /// Destination access token (repeatable)
    #[arg(long = "token", value_name = "TOKEN")]
    tokens: Vec<String>,

    /// Read destination tokens from stdin, one per line
    #[arg(long)]
    token_stdin: bool,

    /// Use a token from the token store (repeatable, e.g. token1.txt or 1)
    #[arg(long = "stored", value_name = "NAME")]
    stored: Vec<String>,

    /// Minutes to wait between videos (overrides config)
    #[arg(short, long, value_name = "MINUTES")]
    interval: Option<u64>,

    /// Fan-out policy: broadcast or first-success (overrides config)
    #[arg(short, long)]
    policy: Option<FanOutPolicy>,

    /// Output format for per-video results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Verify every token's permissions before publishing anything
    #[arg(long)]
    check_permissions: bool,

    /// Publish the given files directly and delete them afterwards
    #[arg(long)]
    consume: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init_default(cli.verbose);

    match run(cli).await {
        Ok(summary) if summary.all_succeeded() => {}
        Ok(summary) => {
            if summary.cancelled {
                warn!("Batch cancelled");
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<BatchSummary> {
    let config = Config::load()?;

    let tokens = collect_tokens(&cli, &config)?;
    let interval = cli.interval.unwrap_or(config.upload.interval_minutes);
    let policy = cli.policy.unwrap_or(config.upload.policy);

    let mut request =
        BatchRequest::from_intake(cli.files.clone(), cli.titles.clone(), tokens, interval)?;

    let client = Arc::new(GraphClient::new(&config.graph)?);

    if cli.check_permissions {
        for (i, destination) in request.destinations.iter().enumerate() {
            info!("Checking permissions for destination #{} ({})", i + 1, destination.hint());
            check_token(&client, destination.credential())
                .await
                .inspect_err(|e| warn!("Destination #{} failed the permission check: {}", i + 1, e))?;
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    if !cli.consume {
        let staging = StagingArea::new(config.staging_dir()).with_shutdown(shutdown_rx.clone());
        let staged = staging.stage_all(&cli.files).await?;
        for (video, path) in request.videos.iter_mut().zip(staged) {
            video.source_path = path;
        }
    }

    let publisher = VideoPublisher::new(client, policy);
    let orchestrator = BatchOrchestrator::new(publisher).with_shutdown(shutdown_rx);

    let mut sink: Box<dyn ProgressSink> = match cli.format {
        OutputFormat::Json => Box::new(JsonLinesSink::new(tokio::io::stdout())),
        OutputFormat::Text => Box::new(TextSink::new(tokio::io::stdout())),
    };

    orchestrator.run(request, sink.as_mut()).await
}

/// Tokens from flags, stdin and the token store, in that order
fn collect_tokens(cli: &Cli, config: &Config) -> Result<Vec<String>> {
    let mut tokens = cli.tokens.clone();

    if cli.token_stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| ReupcastError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
        tokens.extend(
            input
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }

    if !cli.stored.is_empty() {
        let store = TokenStore::new(config.tokens_dir());
        for secret in store.load_all(&cli.stored)? {
            tokens.push(secret.expose_secret().to_string());
        }
    }

    Ok(tokens)
}

fn spawn_signal_listener(shutdown: watch::Sender<bool>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, stopping after cleanup...");
        let _ = shutdown.send(true);
    });
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}
