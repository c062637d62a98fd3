//! Shared data model for the story linker.
//!
//! These types cross every boundary in the workspace: the HTTP trigger, the
//! CLI, the redb stores and the workflow itself. Wire names are camelCase to
//! match the JSON the dashboard sends and expects back.

pub mod auth;
pub mod outcome;
pub mod request;

pub use auth::{AuthBundle, CapturedSession, CapturedSessionSummary, CookieRecord, SameSite};
pub use outcome::{LinkRunRecord, StepResult, WorkflowOutcome};
pub use request::LinkRequest;
