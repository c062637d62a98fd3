use anyhow::Result;
use comfy_table::{Cell, Table};
use pblink_core::{LinkerConfig, OnExhausted, StepPlan};

use crate::cli::PlanArgs;
use crate::output::{OutputFormat, json::print_json, table::print_table};

pub fn run(args: PlanArgs, format: OutputFormat) -> Result<()> {
    let plan = match &args.file {
        Some(path) => StepPlan::load(path)?,
        None => LinkerConfig::load()?.step_plan()?,
    };

    if format.is_json() {
        return print_json(&plan);
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Step", "If exhausted", "Strategies"]);
    for (index, step) in plan.steps.iter().enumerate() {
        let mut strategies: Vec<String> = step
            .strategies
            .iter()
            .enumerate()
            .map(|(n, strategy)| format!("{}. {}", n + 1, strategy.label()))
            .collect();
        if let Some(guard) = &step.guard {
            strategies.insert(0, format!("only if visible: {}", guard.selector));
        }
        for followup in &step.followups {
            strategies.push(format!("then try: {}", followup.label()));
        }

        let on_exhausted = match step.on_exhausted {
            OnExhausted::Fail => "fail",
            OnExhausted::Warn => "warn",
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&step.name),
            Cell::new(on_exhausted),
            Cell::new(strategies.join("\n")),
        ]);
    }
    print_table(table);
    Ok(())
}
