use clap::Parser;
use tokio::process::Child;
use tokio::sync::mpsc;

use devtail_logs::{
    AndroidFilter, AndroidParser, EntryFilter, EntryParser, IosFilter, IosParser, LogSession,
    Pipeline, StreamError, StreamEvent,
};

mod cli;
mod error;
mod render;

use cli::{Args, FilterCommand, PlatformArg};
use error::CliError;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_app(args).await {
        eprintln!("{}", render::format_error(&err));
        std::process::exit(err.exit_code());
    }
}

async fn run_app(args: Args) -> Result<(), CliError> {
    let platform = devtail_types::Platform::from(args.platform);
    tracing::debug!(%platform, "starting log session");

    match args.platform {
        PlatformArg::Android => run_android(args).await,
        PlatformArg::Ios => run_ios(args).await,
    }
}

async fn run_android(args: Args) -> Result<(), CliError> {
    let min = args.priorities.min_priority();
    let adb = args.adb_path.as_deref();

    let filter = match args.command.unwrap_or(FilterCommand::All) {
        FilterCommand::All => AndroidFilter::all(min),
        FilterCommand::Tag { tags } => AndroidFilter::by_tag(min, tags),
        FilterCommand::App { app_id } => {
            let pid = devtail_device::application_pid(&app_id, adb).await?;
            tracing::debug!(%app_id, pid, "resolved application pid");
            AndroidFilter::by_process(min, pid)
        }
        FilterCommand::Match { regexes } => AndroidFilter::by_match(min, &regexes)?,
        FilterCommand::Custom { patterns } => AndroidFilter::custom(&patterns)?,
    };

    let child = devtail_device::spawn_logcat(adb).await?;
    stream_to_stdout(child, Pipeline::new(AndroidParser::new(), filter)).await
}

async fn run_ios(args: Args) -> Result<(), CliError> {
    let min = args.priorities.min_priority();

    let filter = match args.command.unwrap_or(FilterCommand::All) {
        FilterCommand::All => IosFilter::all(min),
        FilterCommand::Tag { tags } => IosFilter::by_tag(min, tags),
        FilterCommand::Match { regexes } => IosFilter::by_match(min, &regexes)?,
        FilterCommand::App { .. } => {
            return Err(CliError::UnsupportedFilter { filter: "app" });
        }
        FilterCommand::Custom { .. } => {
            return Err(CliError::UnsupportedFilter { filter: "custom" });
        }
    };

    let child = devtail_device::spawn_simulator_log()?;
    stream_to_stdout(child, Pipeline::new(IosParser::new(), filter)).await
}

/// Run a session to completion, printing accepted entries as they arrive.
/// Ctrl-C requests a clean stop; the session then kills the logging process
/// and emits its final `Terminated` event.
async fn stream_to_stdout<Pa, F>(child: Child, pipeline: Pipeline<Pa, F>) -> Result<(), CliError>
where
    Pa: EntryParser + Send + 'static,
    F: EntryFilter<Priority = Pa::Priority> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = LogSession::attach(child, pipeline, tx)?;
    let mut fatal: Option<StreamError> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.stop();
            }

            event = rx.recv() => match event {
                Some(StreamEvent::Entry(entry)) => render::print_entry(&entry),
                Some(StreamEvent::Error(err)) if err.is_fatal() => {
                    fatal = Some(err);
                }
                Some(StreamEvent::Error(err)) => {
                    tracing::warn!(%err, "log source error");
                }
                Some(StreamEvent::Terminated) | None => break,
            }
        }
    }
    session.wait().await;

    match fatal {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
