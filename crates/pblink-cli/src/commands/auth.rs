use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Table};
use pblink_core::{LinkerConfig, capture_session};
use pblink_models::{AuthBundle, CapturedSessionSummary, CookieRecord};
use pblink_storage::Storage;
use serde::Deserialize;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::AuthCommands;
use crate::config::CliConfig;
use crate::output::{
    OutputFormat,
    json::print_json,
    table::{format_ms, print_table},
};

/// Accepted import shapes: a full bundle or a bare cookie export.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Cookies(Vec<CookieRecord>),
    Bundle(AuthBundle),
}

pub async fn run(
    storage: Storage,
    command: AuthCommands,
    config: &CliConfig,
    format: OutputFormat,
) -> Result<()> {
    match command {
        AuthCommands::Import { file, source } => import(&storage, &file, &source, format),
        AuthCommands::Show => show(&storage, format),
        AuthCommands::List => list(&storage, format),
        AuthCommands::Capture { login_url } => {
            let login_url = login_url.unwrap_or_else(|| config.login_url().to_string());
            capture(&storage, &login_url, format).await
        }
        AuthCommands::Prune { keep } => prune(&storage, keep, format),
    }
}

pub fn read_bundle_file(path: &Path) -> Result<AuthBundle> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: ImportFile = serde_json::from_str(&contents).with_context(|| {
        format!(
            "{} is neither an auth bundle nor a cookie array",
            path.display()
        )
    })?;
    Ok(match parsed {
        ImportFile::Cookies(cookies) => AuthBundle {
            cookies,
            ..AuthBundle::default()
        },
        ImportFile::Bundle(bundle) => bundle,
    })
}

fn import(storage: &Storage, file: &Path, source: &str, format: OutputFormat) -> Result<()> {
    let bundle = read_bundle_file(file)?;
    if bundle.is_empty() {
        bail!("{} contains no cookies and no localStorage", file.display());
    }

    let saved = storage.auth_sessions.save(bundle, source)?;
    print_summary(&saved.summary(), "Stored session", format)
}

fn show(storage: &Storage, format: OutputFormat) -> Result<()> {
    match storage.auth_sessions.latest()? {
        Some(session) => print_summary(&session.summary(), "Latest session", format),
        None => bail!("No captured session found"),
    }
}

fn list(storage: &Storage, format: OutputFormat) -> Result<()> {
    let sessions = storage.auth_sessions.list()?;

    if format.is_json() {
        return print_json(&sessions);
    }

    if sessions.is_empty() {
        println!("No captured sessions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Captured", "Source", "Cookies", "Local storage"]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(&session.id),
            Cell::new(format_ms(session.captured_at_ms)),
            Cell::new(&session.source),
            Cell::new(session.cookie_count),
            Cell::new(session.local_storage_count),
        ]);
    }
    print_table(table);
    Ok(())
}

async fn capture(storage: &Storage, login_url: &str, format: OutputFormat) -> Result<()> {
    let linker = LinkerConfig::load()?;
    let launcher = linker.node.launcher();

    let bundle = capture_session(&launcher, &linker, login_url, wait_for_enter()).await?;
    if bundle.cookies.is_empty() {
        bail!(
            "No cookies for {} were found. Was the login completed?",
            linker.target_domain
        );
    }

    let saved = storage.auth_sessions.save(bundle, "capture")?;
    print_summary(&saved.summary(), "Captured session", format)
}

async fn wait_for_enter() -> Result<()> {
    eprintln!("Log in to ProductBoard in the opened browser window, then press Enter here.");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation from stdin")?;
    Ok(())
}

fn prune(storage: &Storage, keep: usize, format: OutputFormat) -> Result<()> {
    let removed = storage.auth_sessions.prune(keep)?;

    if format.is_json() {
        return print_json(&serde_json::json!({ "removed": removed, "kept": keep }));
    }

    println!("Removed {removed} session(s), kept up to {keep}.");
    Ok(())
}

fn print_summary(summary: &CapturedSessionSummary, title: &str, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        return print_json(summary);
    }

    println!("{title}");
    println!("  ID:            {}", summary.id);
    println!("  Captured:      {}", format_ms(summary.captured_at_ms));
    println!("  Source:        {}", summary.source);
    println!("  Cookies:       {}", summary.cookie_count);
    println!("  Local storage: {}", summary.local_storage_count);
    Ok(())
}
