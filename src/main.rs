use std::process;

use serde::Serialize;
use tagflush::{
    application::error::AppError,
    cache::{
        CommitReport, ContentCacheFlusher, FlusherConfig, PendingTag, implemented_type_names,
    },
    config::{self, ReplayArgs, SupertypesArgs},
    infra::{error::InfraError, fixture::Fixture, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Replay(args) => run_replay(settings, args).await,
        config::Command::Supertypes(args) => run_supertypes(args).await,
    }
}

#[derive(Serialize)]
struct DryRunOutput {
    pending: Vec<PendingTag>,
}

#[derive(Serialize)]
struct ReplayOutput {
    report: CommitReport,
    remaining_entries: usize,
}

async fn run_replay(settings: config::Settings, args: ReplayArgs) -> Result<(), AppError> {
    let fixture = Fixture::load(&args.fixture).await?;
    let world = fixture.build(settings.store.capacity)?;
    let flusher = ContentCacheFlusher::new(
        FlusherConfig::from(&settings.flusher),
        world.collaborators(),
    );

    info!(
        fixture = %args.fixture.display(),
        changes = world.changes.len(),
        cached_entries = world.cache.len(),
        "Replaying fixture"
    );

    for change in &world.changes {
        flusher.handle(change).await?;
    }

    if args.dry_run {
        return print_json(&DryRunOutput {
            pending: flusher.pending_tags(),
        });
    }

    let report = flusher.commit().await;
    print_json(&ReplayOutput {
        report,
        remaining_entries: world.cache.len(),
    })
}

async fn run_supertypes(args: SupertypesArgs) -> Result<(), AppError> {
    let fixture = Fixture::load(&args.fixture).await?;
    let world = fixture.build(std::num::NonZeroUsize::MIN)?;

    let node_type = world
        .node_types
        .get(&args.node_type)
        .ok_or_else(|| AppError::validation(format!("unknown node type `{}`", args.node_type)))?;

    print_json(&implemented_type_names(&node_type))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let encoded = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{encoded}");
    Ok(())
}
