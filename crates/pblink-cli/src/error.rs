use colored::Colorize;
use std::fmt;

/// The failure was already reported on stdout; exit non-zero without
/// printing anything else.
#[derive(Debug)]
pub struct ReportedFailure;

impl fmt::Display for ReportedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failure already reported")
    }
}

impl std::error::Error for ReportedFailure {}

pub fn handle_error(err: anyhow::Error) -> ! {
    if err.is::<ReportedFailure>() {
        std::process::exit(1);
    }

    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("no captured session") || msg.contains("authentication check") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Store a fresh ProductBoard session with:");
        eprintln!("  {} pblink auth capture", "$".dimmed());
    }

    if msg.contains("playwright") || msg.contains("node.js") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Install the browser runtime with:");
        eprintln!(
            "  {} npm i playwright && npx playwright install chromium",
            "$".dimmed()
        );
    }

    if msg.contains("all") && msg.contains("strategies failed") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  The ProductBoard UI may have changed. Check the step screenshots");
        eprintln!("  and adjust selectors in a custom step plan (see `pblink plan`).");
    }

    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_failure_survives_anyhow_conversion() {
        let err = anyhow::Error::new(ReportedFailure);
        assert!(err.is::<ReportedFailure>());
        assert!(!anyhow::anyhow!("boom").is::<ReportedFailure>());
    }
}
