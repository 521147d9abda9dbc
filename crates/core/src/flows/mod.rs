//! Nested conversational micro-flows for negotiating compound content.
//!
//! The outer stage progression engine and these inner state machines
//! communicate only through events in and outcome actions out; the micro
//! state is owned here and never shared as a mutable field with another
//! component. Transitions are pure: they inspect state and event and
//! describe what should happen, and the engine applies the result.

pub mod deliverables;
pub mod journey;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MicroFlowError {
    #[error("no transition from `{state}` on `{event}`")]
    InvalidTransition { state: String, event: String },
    #[error("item index {index} out of bounds ({len} items)")]
    IndexOutOfBounds { index: usize, len: usize },
}

pub use deliverables::{
    DeliverableComponent, DeliverablesAction, DeliverablesEvent, DeliverablesFlow,
    DeliverablesMicroState, DeliverablesOutcome, DeliverablesProposal, DeliverablesSubStep,
};
pub use journey::{
    AdjustKind, JourneyAction, JourneyEvent, JourneyFlow, JourneyMicroState, JourneyOutcome,
    JourneyState,
};
