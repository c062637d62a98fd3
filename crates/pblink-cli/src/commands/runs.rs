use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Table};
use pblink_storage::Storage;

use crate::output::{
    OutputFormat,
    json::print_json,
    table::{format_ms, print_table},
};

pub fn run(storage: Storage, limit: usize, format: OutputFormat) -> Result<()> {
    let runs = storage.link_runs.list(limit)?;

    if format.is_json() {
        return print_json(&runs);
    }

    if runs.is_empty() {
        println!("No link runs recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Started", "Work item", "Project", "Result", "Failed step"]);
    for run in runs {
        let result = if run.outcome.success {
            "linked".green().to_string()
        } else {
            "failed".red().to_string()
        };
        table.add_row(vec![
            Cell::new(format_ms(run.started_at_ms)),
            Cell::new(&run.request.ado_story_id),
            Cell::new(&run.request.ado_project_name),
            Cell::new(result),
            Cell::new(run.outcome.failed_step.as_deref().unwrap_or("-")),
        ]);
    }
    print_table(table);
    Ok(())
}
