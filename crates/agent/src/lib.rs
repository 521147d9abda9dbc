//! AI generation and session orchestration.
//!
//! This crate sits between the pure stage-progression core and the outside
//! world:
//! - `llm` - a thin chat-completion client with a closed failure taxonomy
//! - `generator` - prompt construction and completion parsing behind the
//!   core's `ContentGenerator` seam
//! - `runtime` - one live session: the engine behind a turn mutex, wired
//!   to the debounced snapshot writer
//!
//! # Safety principle
//!
//! The LLM only drafts text. Stage gating, capture decisions, and every
//! state transition are deterministic calls into `coplan-core`; a bad or
//! missing completion degrades the draft, never the captured plan.

pub mod generator;
pub mod llm;
pub mod runtime;

pub use generator::PlanGenerator;
pub use llm::{CompletionRequest, HttpLlmClient, LlmClient, LlmError};
pub use runtime::SessionRuntime;
