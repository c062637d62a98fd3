use anyhow::{Result, bail};
use colored::Colorize;
use pblink_browser::probe_runtime;
use pblink_core::LinkerConfig;

use crate::output::{OutputFormat, json::print_json};

pub async fn run(format: OutputFormat) -> Result<()> {
    let config = LinkerConfig::load()?;
    let probe = probe_runtime(&config.node.program, config.node.cwd.as_deref()).await?;

    if format.is_json() {
        print_json(&probe)?;
    } else {
        let mark = |ok: bool| if ok { "yes".green() } else { "no".red() };
        println!("Browser runtime");
        println!(
            "  Node.js:     {} {}",
            mark(probe.node_available),
            probe.node_version.as_deref().unwrap_or("")
        );
        println!("  Playwright:  {}", mark(probe.playwright_package_available));
        println!("  Chromium:    {}", mark(probe.chromium_cache_detected));
        for note in &probe.notes {
            println!("  {} {}", "note:".yellow(), note);
        }
    }

    if !probe.ready {
        bail!("Browser runtime is not ready: {}", probe.notes.join(" "));
    }
    Ok(())
}
