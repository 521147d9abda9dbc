//! The stage progression engine: receives one user utterance per turn,
//! consults the intent classifier, quality assessor, and the active
//! micro-flow, mutates captured data, and decides whether to advance the
//! stage pointer. The orchestration here is thin; the complexity lives in
//! the components it calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{CapturedData, ProjectSnapshot, Rubric, Stage, WizardContext};
use crate::errors::ApplicationError;
use crate::flows::{
    AdjustKind, DeliverableComponent, DeliverablesAction, DeliverablesEvent, DeliverablesFlow,
    DeliverablesMicroState, DeliverablesProposal, DeliverablesSubStep, JourneyAction,
    JourneyEvent, JourneyFlow, JourneyMicroState, JourneyState,
};
use crate::gating::{derive_current_stage, validate};
use crate::generate::ContentGenerator;
use crate::intent::{detect_intent, DetectedIntent, UserIntent};
use crate::messages::{self, AssistantMessage};
use crate::quality::{assess, meets_capture_bar};
use crate::suggestions::{SuggestionSource, SuggestionTracker, DEFAULT_SUGGESTION_WINDOW};
use crate::text::{parse_ordinal, strip_conversational_wrapper, tokenize};

const HISTORY_WINDOW: usize = 10;
/// After this many turns stuck on one stage, coaching replies append the
/// stage explainer.
const STUCK_TURN_THRESHOLD: u32 = 4;

/// Shared cancellation stamp for in-flight generation calls. Bumping it
/// invalidates any generation that was stamped earlier: the arriving
/// response is discarded rather than applied.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicU64>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn stamp(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn is_stale(&self, stamp: u64) -> bool {
        self.0.load(Ordering::SeqCst) != stamp
    }
}

/// What one processed turn produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub messages: Vec<AssistantMessage>,
    pub stage: Stage,
    pub stage_advanced: bool,
    pub captured_changed: bool,
}

impl TurnReply {
    fn new(stage: Stage) -> Self {
        Self { messages: Vec::new(), stage, stage_advanced: false, captured_changed: false }
    }

    fn say(&mut self, text: impl Into<String>) {
        self.messages.push(AssistantMessage::new(text));
    }
}

pub struct SessionEngine<G> {
    generator: G,
    project_id: String,
    wizard: WizardContext,
    captured: CapturedData,
    stage: Stage,
    tracker: SuggestionTracker,
    journey: Option<JourneyMicroState>,
    deliverables: Option<DeliverablesMicroState>,
    journey_flow: JourneyFlow,
    deliverables_flow: DeliverablesFlow,
    history: Vec<String>,
    pending_modify: Option<Stage>,
    turns_on_stage: u32,
    generation_seq: CancelHandle,
}

impl<G: ContentGenerator> SessionEngine<G> {
    pub fn new(project_id: impl Into<String>, wizard: WizardContext, generator: G) -> Self {
        Self {
            generator,
            project_id: project_id.into(),
            wizard,
            captured: CapturedData::default(),
            stage: Stage::BigIdea,
            tracker: SuggestionTracker::new(),
            journey: None,
            deliverables: None,
            journey_flow: JourneyFlow,
            deliverables_flow: DeliverablesFlow,
            history: Vec::new(),
            pending_modify: None,
            turns_on_stage: 0,
            generation_seq: CancelHandle::default(),
        }
    }

    /// Resumes from a persisted snapshot. The stored stage hint is never
    /// trusted over the stage derived from the captured data itself.
    pub fn from_snapshot(snapshot: ProjectSnapshot, generator: G) -> Self {
        let mut engine = Self::new(snapshot.id, snapshot.wizard, generator);
        engine.stage = derive_current_stage(&snapshot.captured);
        engine.captured = snapshot.captured;
        engine
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn captured(&self) -> &CapturedData {
        &self.captured
    }

    pub fn journey_state(&self) -> Option<&JourneyMicroState> {
        self.journey.as_ref()
    }

    pub fn deliverables_state(&self) -> Option<&DeliverablesMicroState> {
        self.deliverables.as_ref()
    }

    /// Handle for cancelling in-flight generation from outside the turn
    /// loop (the turn mutex serializes everything else).
    pub fn cancel_handle(&self) -> CancelHandle {
        self.generation_seq.clone()
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            id: self.project_id.clone(),
            wizard: self.wizard.clone(),
            captured: self.captured.clone(),
            stage_hint: Some(self.stage),
            updated_at: Utc::now(),
        }
    }

    /// Opens (or re-opens) the session: greets with the current stage and,
    /// when resuming directly into a compound stage, kicks off its
    /// micro-flow.
    pub async fn open_session(&mut self) -> Result<TurnReply, ApplicationError> {
        let mut reply = TurnReply::new(self.stage);
        reply.say(messages::stage_intro(self.stage));
        match self.stage {
            Stage::Journey if self.journey.is_none() => {
                self.start_journey_flow(&mut reply).await?;
            }
            Stage::Deliverables if self.deliverables.is_none() => {
                self.start_deliverables_flow(&mut reply).await?;
            }
            _ => {}
        }
        reply.stage = self.stage;
        Ok(reply)
    }

    /// Processes one user turn. Turns are strictly serialized by the
    /// caller; the only suspension point is AI generation.
    pub async fn handle_turn(&mut self, text: &str) -> Result<TurnReply, ApplicationError> {
        self.history.push(text.to_string());
        if self.history.len() > HISTORY_WINDOW {
            self.history.remove(0);
        }
        self.turns_on_stage += 1;

        let recent = self.tracker.get_recent_texts(DEFAULT_SUGGESTION_WINDOW);
        let detected = detect_intent(text, &recent, &self.history);

        let mut reply = TurnReply::new(self.stage);
        match detected.intent {
            UserIntent::AcceptSuggestion => self.handle_accept(&detected, &mut reply).await?,
            UserIntent::RequestAlternatives => {
                self.handle_alternatives(text, &mut reply).await?;
            }
            UserIntent::RequestClarification => reply.say(messages::clarification(self.stage)),
            UserIntent::ShowProgress => reply.say(messages::progress_summary(&self.captured)),
            UserIntent::ModifyPrevious => self.handle_modify(&detected, &mut reply).await?,
            UserIntent::CancelFlow => self.handle_cancel(&mut reply),
            UserIntent::SubstantiveInput => {
                let payload = detected
                    .extracted_value
                    .clone()
                    .unwrap_or_else(|| strip_conversational_wrapper(text).to_string());
                self.handle_substantive(&payload, &mut reply).await?;
            }
        }

        reply.stage = self.stage;
        Ok(reply)
    }

    // ---- intent handlers -------------------------------------------------

    async fn handle_accept(
        &mut self,
        detected: &DetectedIntent,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        if self.stage == Stage::Journey {
            if self.journey.is_some() {
                return self.journey_accept_all(reply).await;
            }
            // The flow was cancelled or its entry failed; re-enter it
            // rather than treating the accept as an ideation capture.
            reply.say(messages::nothing_to_accept());
            return self.start_journey_flow(reply).await;
        }
        if self.stage == Stage::Deliverables {
            if self.deliverables.is_some() {
                return self.deliverables_accept(reply).await;
            }
            reply.say(messages::nothing_to_accept());
            return self.start_deliverables_flow(reply).await;
        }

        // Plain ideation stage: resolve the referenced suggestion.
        let index = detected.last_suggestion_index.unwrap_or(crate::intent::MOST_RECENT);
        let Some(suggestion) = self.tracker.resolve_index(index) else {
            // Accept arrived with nothing on offer: no-op with a
            // clarifying message, never a fatal error.
            reply.say(messages::nothing_to_accept());
            return Ok(());
        };
        let id = suggestion.id;
        let value = suggestion.text.clone();
        self.tracker.record_selection(id);

        if !meets_capture_bar(self.stage, &value) {
            reply.say(messages::quality_correction(assess(self.stage, &value).hint.as_deref()));
            return Ok(());
        }
        self.commit_ideation(self.stage, value, reply).await
    }

    async fn handle_alternatives(
        &mut self,
        text: &str,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        if self.stage == Stage::Journey {
            if self.journey.is_some() {
                let adjust = parse_adjust_kind(text).unwrap_or(AdjustKind::Regenerate);
                return self.journey_adjust(adjust, reply).await;
            }
            return self.start_journey_flow(reply).await;
        }
        if self.stage == Stage::Deliverables {
            if self.deliverables.is_some() {
                return self.deliverables_regenerate(reply).await;
            }
            return self.start_deliverables_flow(reply).await;
        }

        let stamp = self.generation_seq.stamp();
        let options =
            self.generator.suggest_options(self.stage, &self.wizard, &self.captured).await;
        if self.generation_seq.is_stale(stamp) {
            return Ok(());
        }
        match options {
            Ok(options) if !options.is_empty() => {
                self.tracker.track_multiple(self.stage, &options, SuggestionSource::Ai);
                reply.say(messages::suggestion_list(self.stage, &options));
            }
            Ok(_) => reply.say(crate::generate::GenerationError::Empty.user_message()),
            Err(error) => reply.say(error.user_message()),
        }
        Ok(())
    }

    async fn handle_modify(
        &mut self,
        detected: &DetectedIntent,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let Some(target) = detected.modify_target else {
            reply.say(messages::clarification(self.stage));
            return Ok(());
        };
        if self.captured.ideation.field(target).is_none() {
            reply.say(messages::nothing_to_modify(target));
            return Ok(());
        }

        match &detected.extracted_value {
            Some(value) => {
                if !meets_capture_bar(target, value) {
                    reply.say(messages::quality_correction(
                        assess(target, value).hint.as_deref(),
                    ));
                    return Ok(());
                }
                // Overwrite in place; the stage pointer never moves
                // backwards, and later stages keep their data.
                self.captured.set_ideation_field(target, value.clone());
                reply.captured_changed = true;
                reply.say(messages::capture_confirmation(target, value));
            }
            None => {
                self.pending_modify = Some(target);
                reply.say(format!(
                    "Sure — what should the new {} be?",
                    target.label().to_ascii_lowercase()
                ));
            }
        }
        Ok(())
    }

    fn handle_cancel(&mut self, reply: &mut TurnReply) {
        // Invalidate any in-flight generation before anything else.
        self.generation_seq.cancel();

        if self.pending_modify.take().is_some() {
            reply.say("Okay, leaving it as it is.");
            return;
        }
        if self.journey.take().is_some() || self.deliverables.take().is_some() {
            reply.say(messages::cancelled_flow(self.stage));
            return;
        }
        reply.say(messages::cancelled_flow(self.stage));
    }

    async fn handle_substantive(
        &mut self,
        payload: &str,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        if let Some(target) = self.pending_modify.take() {
            let quality = assess(target, payload);
            if !quality.ok || !meets_capture_bar(target, payload) {
                self.pending_modify = Some(target);
                reply.say(messages::quality_correction(quality.hint.as_deref()));
                return Ok(());
            }
            self.captured.set_ideation_field(target, payload.to_string());
            reply.captured_changed = true;
            reply.say(messages::capture_confirmation(target, payload));
            return Ok(());
        }

        if self.stage == Stage::Journey {
            if self.journey.is_some() {
                return self.journey_choice(payload, reply).await;
            }
            // No micro-state at a compound stage (cancelled, or entry
            // generation failed): substantive input re-enters the flow.
            // It never falls through to the ideation capture path.
            reply.say(messages::stage_intro(Stage::Journey));
            return self.start_journey_flow(reply).await;
        }
        if self.stage == Stage::Deliverables {
            if self.deliverables.is_some() {
                return self.deliverables_choice(payload, reply).await;
            }
            reply.say(messages::stage_intro(Stage::Deliverables));
            return self.start_deliverables_flow(reply).await;
        }

        // Generic capture for the simple ideation stages: quality gate
        // first, then commit, then stage gating.
        let quality = assess(self.stage, payload);
        if !quality.ok {
            reply.say(messages::quality_correction(quality.hint.as_deref()));
            if self.turns_on_stage >= STUCK_TURN_THRESHOLD {
                reply.say(messages::clarification(self.stage));
            }
            return Ok(());
        }
        if !meets_capture_bar(self.stage, payload) {
            reply.say(messages::quality_correction(Some(
                "That's close — stretch it into a fuller sentence and we'll lock it in.",
            )));
            return Ok(());
        }

        self.commit_ideation(self.stage, payload.to_string(), reply).await
    }

    /// Writes an ideation field, re-runs gating, and advances on pass.
    async fn commit_ideation(
        &mut self,
        stage: Stage,
        value: String,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        self.captured.set_ideation_field(stage, value.clone());
        reply.captured_changed = true;
        reply.say(messages::capture_confirmation(stage, &value));

        let gate = validate(self.stage, &self.captured);
        if gate.ok {
            self.advance_stage(reply).await?;
        } else {
            reply.say(messages::gating_incomplete(gate.reason.as_deref()));
        }
        Ok(())
    }

    /// Moves the stage pointer forward by exactly one position, resets the
    /// per-stage turn counter, and initializes the new stage's micro-flow
    /// when it has one.
    async fn advance_stage(&mut self, reply: &mut TurnReply) -> Result<(), ApplicationError> {
        let Some(next) = self.stage.next() else {
            reply.say(messages::session_complete());
            return Ok(());
        };
        self.stage = next;
        self.turns_on_stage = 0;
        self.generation_seq.cancel();
        reply.stage_advanced = true;
        reply.say(messages::stage_advanced(next));

        match next {
            Stage::Journey => self.start_journey_flow(reply).await?,
            Stage::Deliverables => self.start_deliverables_flow(reply).await?,
            _ => {}
        }
        Ok(())
    }

    // ---- journey micro-flow ---------------------------------------------

    async fn start_journey_flow(&mut self, reply: &mut TurnReply) -> Result<(), ApplicationError> {
        let mut micro = JourneyMicroState::default();
        let outcome = self
            .journey_flow
            .transition(&micro, &JourneyEvent::Begin)
            .map_err(crate::errors::DomainError::from)?;
        micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
        self.journey = Some(micro);
        self.run_journey_generation(None, reply).await
    }

    async fn run_journey_generation(
        &mut self,
        adjust: Option<AdjustKind>,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let stamp = self.generation_seq.stamp();
        let generated =
            self.generator.propose_phases(&self.wizard, &self.captured.ideation, adjust).await;
        if self.generation_seq.is_stale(stamp) {
            // Cancelled or advanced while the call was in flight: the
            // response is discarded, never applied.
            return Ok(());
        }
        let Some(micro) = self.journey.as_mut() else {
            return Ok(());
        };
        match generated {
            Ok(phases) => {
                let outcome = self
                    .journey_flow
                    .transition(micro, &JourneyEvent::PhasesReady { phases })
                    .map_err(crate::errors::DomainError::from)?;
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                reply.say(messages::journey_proposal(&micro.working_phases));
            }
            Err(error) => {
                // Drop the half-started flow so the next turn can retry
                // entry cleanly.
                self.journey = None;
                reply.say(error.user_message());
            }
        }
        Ok(())
    }

    async fn journey_accept_all(&mut self, reply: &mut TurnReply) -> Result<(), ApplicationError> {
        let Some(micro) = self.journey.as_ref() else {
            reply.say(messages::nothing_to_accept());
            return Ok(());
        };
        let outcome = match self.journey_flow.transition(micro, &JourneyEvent::AcceptAll) {
            Ok(outcome) => outcome,
            Err(_) => {
                reply.say(messages::nothing_to_accept());
                return Ok(());
            }
        };

        // The micro-flow's completion is necessary but not sufficient:
        // final gating is always re-checked before the commit is applied.
        let mut tentative = self.captured.clone();
        tentative.journey.phases = micro.working_phases.clone();
        let gate = validate(Stage::Journey, &tentative);
        if !gate.ok {
            reply.say(messages::gating_incomplete(gate.reason.as_deref()));
            return Ok(());
        }

        debug_assert!(outcome.to == JourneyState::Accepted);
        self.captured = tentative;
        reply.captured_changed = true;
        self.journey = None;
        self.advance_stage(reply).await
    }

    async fn journey_adjust(
        &mut self,
        adjust: AdjustKind,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let Some(micro) = self.journey.as_mut() else {
            return Ok(());
        };
        match self.journey_flow.transition(micro, &JourneyEvent::Adjust(adjust)) {
            Ok(outcome) => {
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                self.run_journey_generation(Some(adjust), reply).await
            }
            Err(_) => {
                reply.say(messages::clarification(Stage::Journey));
                Ok(())
            }
        }
    }

    async fn journey_choice(
        &mut self,
        payload: &str,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        // A cancelled or discarded generation left the flow waiting with
        // no proposal; any fresh input retries it.
        if matches!(
            self.journey.as_ref().map(|micro| micro.sub_step),
            Some(JourneyState::ContextGathering | JourneyState::Refining)
        ) {
            return self.run_journey_generation(None, reply).await;
        }

        let Some(event) = parse_journey_command(payload) else {
            reply.say(
                "We're shaping the journey right now. You can say \"accept all\", \
                 \"next phase\", \"shorten\", \"lengthen\", \"regenerate\", or e.g. \
                 \"rename phase 2 to Prototype\".",
            );
            return Ok(());
        };

        if let JourneyEvent::Adjust(adjust) = event {
            return self.journey_adjust(adjust, reply).await;
        }
        if matches!(event, JourneyEvent::AcceptAll) {
            return self.journey_accept_all(reply).await;
        }

        let Some(micro) = self.journey.as_mut() else {
            return Ok(());
        };
        match self.journey_flow.transition(micro, &event) {
            Ok(outcome) => {
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                for action in &outcome.actions {
                    match action {
                        JourneyAction::PresentPhase { index } => {
                            if let Some(phase) = micro.working_phases.get(*index) {
                                reply.say(messages::journey_phase_detail(*index, phase));
                            }
                        }
                        JourneyAction::ApplyRename { .. } | JourneyAction::ApplyReorder { .. } => {
                            reply.say(messages::journey_proposal(&micro.working_phases));
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            Err(error) => {
                reply.say(messages::gating_incomplete(Some(&error.to_string())));
                Ok(())
            }
        }
    }

    // ---- deliverables micro-flow ----------------------------------------

    async fn start_deliverables_flow(
        &mut self,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let mut micro = DeliverablesMicroState::default();
        let outcome = self
            .deliverables_flow
            .transition(&micro, &DeliverablesEvent::Begin)
            .map_err(crate::errors::DomainError::from)?;
        micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
        self.deliverables = Some(micro);
        self.run_deliverables_generation(reply).await
    }

    async fn run_deliverables_generation(
        &mut self,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let stamp = self.generation_seq.stamp();
        let generated = self.generator.propose_deliverables(&self.wizard, &self.captured).await;
        if self.generation_seq.is_stale(stamp) {
            return Ok(());
        }
        let Some(micro) = self.deliverables.as_mut() else {
            return Ok(());
        };
        match generated {
            Ok(proposal) => {
                let outcome = self
                    .deliverables_flow
                    .transition(micro, &DeliverablesEvent::ProposalReady { proposal })
                    .map_err(crate::errors::DomainError::from)?;
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                reply.say(messages::deliverables_intro());
            }
            Err(error) => {
                self.deliverables = None;
                reply.say(error.user_message());
            }
        }
        Ok(())
    }

    fn component_items(micro: &DeliverablesMicroState, component: DeliverableComponent) -> Vec<String> {
        match component {
            DeliverableComponent::Milestones => {
                messages::named_item_lines(&micro.proposal.milestones)
            }
            DeliverableComponent::Artifacts => {
                messages::named_item_lines(&micro.proposal.artifacts)
            }
            DeliverableComponent::Criteria => micro.proposal.criteria.clone(),
        }
    }

    fn apply_deliverables_commit(&mut self, component: DeliverableComponent) {
        // One single-field assignment per component: atomic with respect
        // to observers, and already-committed components survive a later
        // cancel.
        let Some(micro) = self.deliverables.as_ref() else {
            return;
        };
        match component {
            DeliverableComponent::Milestones => {
                self.captured.deliverables.milestones = micro.proposal.milestones.clone();
            }
            DeliverableComponent::Artifacts => {
                self.captured.deliverables.artifacts = micro.proposal.artifacts.clone();
            }
            DeliverableComponent::Criteria => {
                self.captured.deliverables.rubric =
                    Rubric { criteria: micro.proposal.criteria.clone() };
            }
        }
    }

    async fn deliverables_accept(&mut self, reply: &mut TurnReply) -> Result<(), ApplicationError> {
        let Some(micro) = self.deliverables.as_ref() else {
            reply.say(messages::nothing_to_accept());
            return Ok(());
        };
        let event = match micro.sub_step {
            DeliverablesSubStep::Intro => {
                if micro.proposal == DeliverablesProposal::default() {
                    // No proposal landed; retry instead of reviewing
                    // empty lists.
                    return self.run_deliverables_generation(reply).await;
                }
                DeliverablesEvent::BeginReview
            }
            _ => DeliverablesEvent::AcceptComponent,
        };
        let outcome = match self.deliverables_flow.transition(micro, &event) {
            Ok(outcome) => outcome,
            Err(_) => {
                reply.say(messages::nothing_to_accept());
                return Ok(());
            }
        };

        if outcome.to == DeliverablesSubStep::Accepted {
            // Final accept: validate the complete package against gating
            // before any of this turn's writes land. A failure here leaves
            // captured data exactly as it was.
            let mut tentative = self.captured.clone();
            tentative.deliverables.rubric = Rubric { criteria: micro.proposal.criteria.clone() };
            let gate = validate(Stage::Deliverables, &tentative);
            if !gate.ok {
                reply.say(messages::gating_incomplete(gate.reason.as_deref()));
                return Ok(());
            }
            self.captured = tentative;
            reply.captured_changed = true;
            self.deliverables = None;
            self.generation_seq.cancel();
            reply.say(messages::session_complete());
            return Ok(());
        }

        let Some(mut micro) = self.deliverables.take() else {
            return Ok(());
        };
        micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
        self.deliverables = Some(micro);
        for action in &outcome.actions {
            match action {
                DeliverablesAction::CommitComponent { component } => {
                    self.apply_deliverables_commit(*component);
                    reply.captured_changed = true;
                }
                DeliverablesAction::PresentComponent { component } => {
                    if let Some(micro) = self.deliverables.as_ref() {
                        let items = Self::component_items(micro, *component);
                        reply.say(messages::deliverables_component(*component, &items));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn deliverables_regenerate(
        &mut self,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let Some(micro) = self.deliverables.as_ref() else {
            return Ok(());
        };
        let Some(component) = micro.sub_step.component_under_review() else {
            reply.say(messages::clarification(Stage::Deliverables));
            return Ok(());
        };

        let stamp = self.generation_seq.stamp();
        let generated =
            self.generator.regenerate_component(component, &self.wizard, &self.captured).await;
        if self.generation_seq.is_stale(stamp) {
            return Ok(());
        }
        let Some(micro) = self.deliverables.as_mut() else {
            return Ok(());
        };
        match generated {
            Ok(proposal) => {
                let outcome = self
                    .deliverables_flow
                    .transition(micro, &DeliverablesEvent::ComponentReady { component, proposal })
                    .map_err(crate::errors::DomainError::from)?;
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                let items = Self::component_items(micro, component);
                reply.say(messages::deliverables_component(component, &items));
            }
            Err(error) => reply.say(error.user_message()),
        }
        Ok(())
    }

    async fn deliverables_choice(
        &mut self,
        payload: &str,
        reply: &mut TurnReply,
    ) -> Result<(), ApplicationError> {
        let Some(micro) = self.deliverables.as_ref() else {
            return Ok(());
        };

        if micro.sub_step == DeliverablesSubStep::Intro {
            if micro.proposal == DeliverablesProposal::default() {
                // The initial proposal was cancelled or discarded in
                // flight; retry it before reviewing anything.
                return self.run_deliverables_generation(reply).await;
            }
            if is_ready_phrase(payload) {
                return self.deliverables_accept(reply).await;
            }
            reply.say(
                "We're reviewing deliverables next. Say \"yes\" when you're ready to look \
                 at the milestones.",
            );
            return Ok(());
        }

        let Some(event) = parse_deliverables_command(payload) else {
            reply.say(
                "You can accept this component, ask me to regenerate it, or say e.g. \
                 \"rename 2 to Field interviews\" or \"move 3 to 1\".",
            );
            return Ok(());
        };

        if matches!(event, DeliverablesEvent::AcceptComponent) {
            return self.deliverables_accept(reply).await;
        }
        if matches!(event, DeliverablesEvent::RegenerateComponent) {
            return self.deliverables_regenerate(reply).await;
        }

        let component = micro.sub_step.component_under_review();
        let Some(mut micro) = self.deliverables.take() else {
            return Ok(());
        };
        match self.deliverables_flow.transition(&micro, &event) {
            Ok(outcome) => {
                micro.apply(&outcome).map_err(crate::errors::DomainError::from)?;
                if let Some(component) = component {
                    let items = Self::component_items(&micro, component);
                    reply.say(messages::deliverables_component(component, &items));
                }
                self.deliverables = Some(micro);
                Ok(())
            }
            Err(error) => {
                self.deliverables = Some(micro);
                reply.say(messages::gating_incomplete(Some(&error.to_string())));
                Ok(())
            }
        }
    }
}

// ---- free-text command parsing for the micro-flows ----------------------

fn parse_adjust_kind(text: &str) -> Option<AdjustKind> {
    let normalized = text.to_ascii_lowercase();
    if normalized.contains("shorten")
        || normalized.contains("shorter")
        || normalized.contains("fewer")
    {
        Some(AdjustKind::Shorten)
    } else if normalized.contains("lengthen")
        || normalized.contains("longer")
        || normalized.contains("more phases")
        || normalized.contains("add a phase")
    {
        Some(AdjustKind::Lengthen)
    } else if normalized.contains("regenerate")
        || normalized.contains("redo")
        || normalized.contains("different")
    {
        Some(AdjustKind::Regenerate)
    } else {
        None
    }
}

/// Parses "rename phase 2 to Prototype" / "move phase 3 to 1" style edits
/// and walkthrough commands within the journey flow.
fn parse_journey_command(text: &str) -> Option<JourneyEvent> {
    let normalized = text.to_ascii_lowercase();
    let tokens = tokenize(&normalized);

    if tokens.iter().any(|token| token == "next") {
        return Some(JourneyEvent::NextPhase);
    }
    if let Some(adjust) = parse_adjust_kind(text) {
        return Some(JourneyEvent::Adjust(adjust));
    }
    if normalized.starts_with("accept") || normalized.starts_with("keep") {
        return Some(JourneyEvent::AcceptAll);
    }

    if normalized.starts_with("rename") {
        let (index, name) = parse_rename(text)?;
        return Some(JourneyEvent::RenamePhase { index, name });
    }
    if normalized.starts_with("move") || normalized.starts_with("swap") {
        let (from, to) = parse_reorder(&tokens)?;
        return Some(JourneyEvent::ReorderPhase { from, to });
    }
    None
}

fn parse_deliverables_command(text: &str) -> Option<DeliverablesEvent> {
    let normalized = text.to_ascii_lowercase();
    let tokens = tokenize(&normalized);

    if normalized.starts_with("accept") || normalized.starts_with("keep") {
        return Some(DeliverablesEvent::AcceptComponent);
    }
    if normalized.contains("regenerate") || normalized.contains("redo") {
        return Some(DeliverablesEvent::RegenerateComponent);
    }
    if normalized.starts_with("rename") {
        let (index, name) = parse_rename(text)?;
        return Some(DeliverablesEvent::RenameItem { index, name });
    }
    if normalized.starts_with("move") || normalized.starts_with("swap") {
        let (from, to) = parse_reorder(&tokens)?;
        return Some(DeliverablesEvent::ReorderItem { from, to });
    }
    None
}

/// "rename [phase] N to New Name" → (N-1, "New Name"). The replacement
/// name keeps the user's original casing.
fn parse_rename(text: &str) -> Option<(usize, String)> {
    let lowered = text.to_ascii_lowercase();
    let to_at = lowered.find(" to ")?;
    let head_tokens = tokenize(&lowered[..to_at]);
    let index = head_tokens.iter().find_map(|token| parse_ordinal(token))?;
    let name = text[to_at + 4..].trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some((index, name))
}

/// "move [phase] 3 to 1" → (2, 0).
fn parse_reorder(tokens: &[String]) -> Option<(usize, usize)> {
    let mut positions = tokens.iter().filter_map(|token| parse_ordinal(token));
    let from = positions.next()?;
    let to = positions.next()?;
    Some((from, to))
}

fn is_ready_phrase(text: &str) -> bool {
    let normalized = text.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "ready" | "i'm ready" | "im ready" | "start" | "begin" | "go" | "let's go" | "lets go"
            | "show me" | "sure"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_kind_parsing() {
        assert_eq!(parse_adjust_kind("can you shorten this"), Some(AdjustKind::Shorten));
        assert_eq!(parse_adjust_kind("make it longer"), Some(AdjustKind::Lengthen));
        assert_eq!(parse_adjust_kind("regenerate please"), Some(AdjustKind::Regenerate));
        assert_eq!(parse_adjust_kind("looks fine"), None);
    }

    #[test]
    fn journey_rename_command_parses_index_and_name() {
        let event = parse_journey_command("rename phase 2 to Prototype Sprint").unwrap();
        assert_eq!(
            event,
            JourneyEvent::RenamePhase { index: 1, name: "Prototype Sprint".to_string() }
        );
    }

    #[test]
    fn journey_reorder_command_parses_positions() {
        let event = parse_journey_command("move phase 3 to 1").unwrap();
        assert_eq!(event, JourneyEvent::ReorderPhase { from: 2, to: 0 });
    }

    #[test]
    fn unknown_journey_command_is_none() {
        assert_eq!(parse_journey_command("what a lovely day"), None);
    }

    #[test]
    fn deliverables_rename_keeps_original_casing() {
        let event = parse_deliverables_command("rename 1 to Field Interviews").unwrap();
        assert_eq!(
            event,
            DeliverablesEvent::RenameItem { index: 0, name: "Field Interviews".to_string() }
        );
    }
}
