use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use session_weave::{
    config::EngineConfig,
    engine::{Dispatcher, EngineState},
    model::SessionId,
    paths::Paths,
    stream,
};

/// Reconcile assistant CLI stream logs into session summaries and the
/// focused session's transcript.
#[derive(Debug, Parser)]
#[command(name = "session-weave", version, about)]
struct Cli {
    /// Project root; stream logs default to <root>/.session-weave/streams
    #[arg(default_value = ".")]
    project_root: PathBuf,

    /// Directory of <session-id>.jsonl / <session-id>.stderr logs
    #[arg(long, env = "SESSION_WEAVE_STREAM_DIR")]
    stream_dir: Option<PathBuf>,

    /// Session whose transcript is assembled
    #[arg(long)]
    focus: Option<String>,

    /// Keep tailing the logs until Ctrl-C instead of replaying once
    #[arg(long)]
    follow: bool,

    #[arg(long, env = "SESSION_WEAVE_CHANNEL_CAPACITY", default_value_t = 1024)]
    channel_capacity: usize,

    #[arg(long, env = "SESSION_WEAVE_POLL_MS", default_value_t = 200)]
    poll_ms: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "SESSION_WEAVE_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = EngineConfig::default()
        .with_channel_capacity(cli.channel_capacity)
        .with_poll_interval(Duration::from_millis(cli.poll_ms))
        .with_log_filter(cli.log_level.clone());
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_writer(std::io::stderr)
        .init();

    let project_root = std::fs::canonicalize(&cli.project_root)
        .map_err(|e| eyre!("project root {}: {}", cli.project_root.display(), e))?;
    let paths = Paths::resolve(&project_root, cli.stream_dir.as_deref());

    let dispatcher = Dispatcher::start(EngineState::new(), &config);
    if let Some(id) = cli.focus.as_deref() {
        let id = SessionId::try_new(id).ok_or_else(|| eyre!("--focus must not be empty"))?;
        dispatcher.focus(Some(id), Vec::new()).await?;
    }

    let sink = dispatcher.subscribe();
    if cli.follow {
        let tail = stream::start_tailing(&paths.stream_dir, sink, config.poll_interval)?;
        tokio::signal::ctrl_c().await?;
        drop(tail);
    } else {
        let sent = stream::replay_dir(&paths.stream_dir, &sink).await?;
        tracing::info!(events = sent, dir = %paths.stream_dir.display(), "replay finished");
    }

    dispatcher.flush().await?;
    let snapshot = dispatcher.snapshot();
    dispatcher.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&*snapshot)?);
    Ok(())
}
