//! The seam between the engine and the external AI text-generation
//! service. The engine only sees this trait; prompt construction, HTTP,
//! and fallback templates live behind it in `coplan-agent`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CapturedData, Ideation, Phase, Stage, WizardContext};
use crate::flows::{AdjustKind, DeliverableComponent, DeliverablesProposal};

/// Generation failure taxonomy. Each variant maps to a distinct
/// user-facing degraded-mode string; a structurally valid response with
/// no usable text is a failure, never an empty success.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation service unavailable: {0}")]
    Unavailable(String),
    #[error("generation service rate limited")]
    RateLimited,
    #[error("generation service rejected credentials")]
    Auth,
    #[error("generation returned no usable text")]
    Empty,
}

impl GenerationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::Unavailable(_) => {
                "I couldn't reach the idea service just now. Your work is safe; \
                 try that again in a moment."
            }
            GenerationError::RateLimited => {
                "The idea service is catching its breath. Give it a few seconds \
                 and resend your message."
            }
            GenerationError::Auth => {
                "The idea service isn't accepting this project's credentials. \
                 You can keep writing your own content while that gets fixed."
            }
            GenerationError::Empty => {
                "The idea service came back empty-handed. Let's try rephrasing, \
                 or write your own version and I'll work with that."
            }
        }
    }
}

/// Produces proposal content for the micro-flows and option lists for the
/// ideation stages.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Proposes a phase set (at least 3 phases) for the journey from the
    /// wizard context and prior ideation content.
    async fn propose_phases(
        &self,
        wizard: &WizardContext,
        ideation: &Ideation,
        adjust: Option<AdjustKind>,
    ) -> Result<Vec<Phase>, GenerationError>;

    /// Proposes a full deliverables package.
    async fn propose_deliverables(
        &self,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<DeliverablesProposal, GenerationError>;

    /// Regenerates a single deliverables component; only the matching part
    /// of the returned proposal is used.
    async fn regenerate_component(
        &self,
        component: DeliverableComponent,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<DeliverablesProposal, GenerationError>;

    /// Offers a short list of candidate texts for an ideation stage.
    async fn suggest_options(
        &self,
        stage: Stage,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<Vec<String>, GenerationError>;
}
