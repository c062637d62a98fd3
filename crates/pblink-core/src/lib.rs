//! Story-link automation between ProductBoard and Azure DevOps.
//!
//! A [`LinkWorkflow`] drives one isolated headless browser through the
//! ProductBoard "link existing work item" dialog:
//! - [`session`] launches the browser and registers fingerprint overrides
//! - [`auth`] injects the captured ProductBoard session
//! - [`navigator`] opens the story and checks the session survived
//! - [`executor`] runs the [`StepPlan`], falling back across strategies
//! - [`outcome`] folds the result into a [`WorkflowOutcome`]
//!
//! Screenshots and step logging go through [`diagnostics`] and never affect
//! the reported outcome.

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod navigator;
pub mod outcome;
pub mod plan;
pub mod scripts;
pub mod session;
pub mod workflow;

pub use auth::{InjectionReport, capture_auth, inject_auth};
pub use config::LinkerConfig;
pub use error::LinkError;
pub use plan::{OnExhausted, StepPlan, StepSpec, Strategy};
pub use workflow::{LinkWorkflow, capture_session};

pub use pblink_models::{AuthBundle, LinkRequest, StepResult, WorkflowOutcome};
