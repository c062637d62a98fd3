use anyhow::{Context, Result, bail};
use chrono::Utc;
use colored::Colorize;
use pblink_core::{LinkWorkflow, LinkerConfig};
use pblink_models::{AuthBundle, LinkRequest};
use pblink_storage::{DEFAULT_KEEP_RUNS, Storage};
use std::sync::Arc;

use crate::cli::LinkArgs;
use crate::commands::auth::read_bundle_file;
use crate::config::CliConfig;
use crate::error::ReportedFailure;
use crate::output::{OutputFormat, json::print_json};

pub async fn run(
    storage: Storage,
    args: LinkArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    let project = args
        .project
        .or_else(|| config.default.project.clone())
        .unwrap_or_default();
    let request = LinkRequest::new(args.url, project, args.story_id);

    // An incomplete request is rejected before any session is needed.
    let auth = match &args.auth_file {
        Some(path) => read_bundle_file(path)?,
        None if request.is_complete() => latest_session(&storage)?,
        None => AuthBundle::default(),
    };

    let mut linker = LinkerConfig::load()?;
    if args.headed {
        linker.launch.headless = false;
    }
    let launcher = Arc::new(linker.node.launcher());
    let workflow = LinkWorkflow::new(launcher, linker)?;

    let started_at_ms = Utc::now().timestamp_millis();
    let outcome = workflow.run(&request, &auth).await;

    if !args.no_record
        && let Err(err) = storage
            .link_runs
            .record(&request, &outcome, started_at_ms)
            .and_then(|_| storage.link_runs.prune(DEFAULT_KEEP_RUNS))
    {
        tracing::warn!("Failed to record link run: {:#}", err);
    }

    if format.is_json() {
        print_json(&outcome)?;
        if !outcome.success {
            return Err(ReportedFailure.into());
        }
        return Ok(());
    }

    if !outcome.success {
        bail!("{}", outcome.message);
    }
    println!("{} {}", "Linked:".green().bold(), outcome.message);
    Ok(())
}

fn latest_session(storage: &Storage) -> Result<AuthBundle> {
    let session = storage
        .auth_sessions
        .latest()
        .context("Failed to read stored sessions")?;
    match session {
        Some(session) => {
            tracing::info!(session = %session.id, "Using latest captured session");
            Ok(session.bundle)
        }
        None => bail!("No captured session found. Import one with `pblink auth import` first"),
    }
}
