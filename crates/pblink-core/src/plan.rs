//! The UI step plan: an ordered list of named steps, each with an ordered
//! list of strategies to try.
//!
//! Selectors in ProductBoard's UI change without notice, so the plan is data.
//! The default ships embedded from `plans/default.toml`; a deployment can
//! point `step_plan` in the config at its own copy.

use anyhow::{Context, Result, bail};
use pblink_models::LinkRequest;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_PLAN: &str = include_str!("../plans/default.toml");

const PROJECT_PLACEHOLDER: &str = "{project}";
const STORY_ID_PLACEHOLDER: &str = "{story_id}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepPlan {
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnExhausted {
    /// Stop the run and report this step as failed.
    #[default]
    Fail,
    /// Log a warning and carry on with the next step.
    Warn,
}

/// Precondition for optional steps. If the selector is not visible within
/// the wait window the step is skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guard {
    pub selector: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSpec {
    pub name: String,
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub on_exhausted: OnExhausted,
    #[serde(default)]
    pub guard: Option<Guard>,
    /// Best-effort actions after the step succeeded.
    #[serde(default)]
    pub followups: Vec<Strategy>,
    /// Default per-strategy timeout for this step.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Fixed delay after the step for client-side rendering.
    #[serde(default)]
    pub settle_ms: u64,
    #[serde(default = "default_true")]
    pub screenshot: bool,
}

/// One way of getting a step done. Text fields accept `{project}` and
/// `{story_id}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Hover {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    HoverClick {
        hover: String,
        click: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Fill {
        selector: String,
        text: String,
        #[serde(default)]
        dispatch_events: bool,
        #[serde(default)]
        then_press: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Open a combobox, type into its search input, wait for the matching
    /// option and confirm with the keyboard.
    TypeAhead {
        opener: String,
        input: String,
        text: String,
        option: String,
        #[serde(default = "default_confirm_key")]
        confirm_key: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Open a combobox and click the option directly.
    SelectOption {
        opener: String,
        option: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Set the control's value from page script and fire input/change.
    InjectValue { selector: String, text: String },
    /// Scan block elements for text and click the first visible hit.
    ScanClick {
        text: String,
        #[serde(default = "default_scan_tags")]
        tags: String,
    },
    WaitHidden {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    ScrollToBottom,
    /// All inner strategies must succeed, in order.
    Sequence { strategies: Vec<Strategy> },
}

impl Strategy {
    /// Short human-readable form for logs.
    pub fn label(&self) -> String {
        match self {
            Strategy::Click { selector, .. } => format!("click {}", selector),
            Strategy::Hover { selector, .. } => format!("hover {}", selector),
            Strategy::HoverClick { hover, click, .. } => {
                format!("hover {} then click {}", hover, click)
            }
            Strategy::Fill { selector, .. } => format!("fill {}", selector),
            Strategy::TypeAhead { opener, .. } => format!("type-ahead in {}", opener),
            Strategy::SelectOption { option, .. } => format!("select option {}", option),
            Strategy::InjectValue { selector, .. } => format!("inject value into {}", selector),
            Strategy::ScanClick { text, .. } => format!("scan for text '{}'", text),
            Strategy::WaitHidden { selector, .. } => format!("wait until {} is hidden", selector),
            Strategy::ScrollToBottom => "scroll to bottom".to_string(),
            Strategy::Sequence { strategies } => strategies
                .iter()
                .map(Strategy::label)
                .collect::<Vec<_>>()
                .join(" > "),
        }
    }
}

impl StepPlan {
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_PLAN).context("Built-in step plan is invalid")
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let plan: StepPlan = toml::from_str(contents)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read step plan {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse step plan {}", path.display()))
    }

    pub fn step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|step| step.name == name)
    }

    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("Step plan has no steps");
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                bail!("Step #{} has no name", index + 1);
            }
            if step.strategies.is_empty() {
                bail!("Step '{}' has no strategies", step.name);
            }
            if self.steps[..index].iter().any(|other| other.name == step.name) {
                bail!("Step '{}' appears twice", step.name);
            }
            let nested = step
                .strategies
                .iter()
                .chain(&step.followups)
                .filter_map(|strategy| match strategy {
                    Strategy::Sequence { strategies } => Some(strategies),
                    _ => None,
                })
                .flatten()
                .any(|inner| matches!(inner, Strategy::Sequence { .. }));
            if nested {
                bail!("Step '{}' nests a sequence inside a sequence", step.name);
            }
        }
        Ok(())
    }
}

/// Placeholder values for one run.
#[derive(Debug, Clone)]
pub struct Vars {
    project: String,
    story_id: String,
}

impl Vars {
    pub fn from_request(request: &LinkRequest) -> Self {
        Self {
            project: request.ado_project_name.trim().to_string(),
            story_id: request.ado_story_id.trim().to_string(),
        }
    }

    /// Resolve placeholders in text that will be typed or matched verbatim.
    pub fn text(&self, template: &str) -> String {
        self.substitute(template, str::to_string)
    }

    /// Resolve placeholders inside a selector, escaping values so they stay
    /// inside quoted selector arguments.
    pub fn selector(&self, template: &str) -> String {
        self.substitute(template, escape_quoted)
    }

    /// Single pass over `template`; substituted values are never rescanned.
    fn substitute(&self, template: &str, render: impl Fn(&str) -> String) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let value = if tail.starts_with(PROJECT_PLACEHOLDER) {
                Some((self.project.as_str(), PROJECT_PLACEHOLDER.len()))
            } else if tail.starts_with(STORY_ID_PLACEHOLDER) {
                Some((self.story_id.as_str(), STORY_ID_PLACEHOLDER.len()))
            } else {
                None
            };
            match value {
                Some((value, consumed)) => {
                    out.push_str(&render(value));
                    rest = &tail[consumed..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn default_true() -> bool {
    true
}

fn default_confirm_key() -> String {
    "Enter".to_string()
}

fn default_scan_tags() -> String {
    "div, li, span, button, a".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_plan_has_the_ten_ui_steps_in_order() {
        let plan = StepPlan::builtin().unwrap();
        let names: Vec<_> = plan.steps.iter().map(|step| step.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Expand Integrations",
                "Open ADO Integration",
                "Push Button",
                "Link Existing Tab",
                "Project Dropdown Selection",
                "Work Item ID Entry",
                "Item Preview Selection",
                "Link Button",
                "Conflict Resolution",
                "Completion",
            ]
        );
    }

    #[test]
    fn builtin_plan_project_step_degrades_in_three_stages() {
        let plan = StepPlan::builtin().unwrap();
        let step = plan.step("Project Dropdown Selection").unwrap();
        assert!(matches!(step.strategies[0], Strategy::TypeAhead { .. }));
        assert!(matches!(step.strategies[1], Strategy::SelectOption { .. }));
        assert!(matches!(step.strategies[2], Strategy::InjectValue { .. }));
        assert_eq!(step.strategies.len(), 3);
    }

    #[test]
    fn builtin_plan_marks_optional_steps() {
        let plan = StepPlan::builtin().unwrap();
        assert_eq!(
            plan.step("Expand Integrations").unwrap().on_exhausted,
            OnExhausted::Warn
        );
        assert_eq!(plan.step("Completion").unwrap().on_exhausted, OnExhausted::Warn);
        assert!(plan.step("Conflict Resolution").unwrap().guard.is_some());
        assert_eq!(
            plan.step("Work Item ID Entry").unwrap().strategies.len(),
            6
        );
    }

    #[test]
    fn plan_rejects_duplicate_and_empty_steps() {
        let duplicate = r#"
            [[steps]]
            name = "A"
            strategies = [{ kind = "scroll_to_bottom" }]

            [[steps]]
            name = "A"
            strategies = [{ kind = "scroll_to_bottom" }]
        "#;
        assert!(StepPlan::from_toml(duplicate).is_err());

        let empty = r#"
            [[steps]]
            name = "A"
            strategies = []
        "#;
        assert!(StepPlan::from_toml(empty).is_err());
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let vars = Vars::from_request(&LinkRequest::new(
            "https://acme.productboard.com/f/1",
            "Team {story_id}",
            "4711",
        ));
        assert_eq!(vars.text("{project}"), "Team {story_id}");
        assert_eq!(vars.text("{project} #{story_id} {other}"), "Team {story_id} #4711 {other}");
        assert_eq!(
            vars.selector(r#"text="{project}""#),
            r#"text="Team {story_id}""#
        );
    }

    #[test]
    fn selector_placeholders_are_escaped_but_text_is_verbatim() {
        let vars = Vars::from_request(&LinkRequest::new(
            "https://acme.productboard.com/f/1",
            "Team \"Alpha\"",
            " 1234 ",
        ));
        assert_eq!(
            vars.selector(r#"[role="option"]:has-text("{project}")"#),
            r#"[role="option"]:has-text("Team \"Alpha\"")"#
        );
        assert_eq!(vars.text("{project} #{story_id}"), "Team \"Alpha\" #1234");
    }
}
