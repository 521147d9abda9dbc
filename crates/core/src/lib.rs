pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod flows;
pub mod gating;
pub mod generate;
pub mod intent;
pub mod messages;
pub mod quality;
pub mod suggestions;
pub mod text;

pub use domain::{
    CapturedData, DeliverablesPlan, Ideation, JourneyPlan, NamedItem, Phase, ProjectSnapshot,
    Rubric, Stage, WizardContext,
};
pub use engine::{CancelHandle, SessionEngine, TurnReply};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    AdjustKind, DeliverableComponent, DeliverablesMicroState, DeliverablesProposal,
    DeliverablesSubStep, JourneyMicroState, JourneyState, MicroFlowError,
};
pub use gating::{derive_current_stage, validate, GateResult};
pub use generate::{ContentGenerator, GenerationError};
pub use intent::{detect_intent, DetectedIntent, UserIntent};
pub use messages::AssistantMessage;
pub use quality::{assess, QualityResult};
pub use suggestions::{Suggestion, SuggestionSource, SuggestionTracker};
