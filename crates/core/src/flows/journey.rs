//! Journey micro-flow: negotiates the multi-phase learning journey through
//! an accept/refine/regenerate dialogue rather than a single capture.

use serde::{Deserialize, Serialize};

use crate::domain::Phase;
use crate::flows::MicroFlowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyState {
    NotStarted,
    ContextGathering,
    PhasesProposed,
    Refining,
    Accepted,
    Cancelled,
}

impl JourneyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JourneyState::Accepted | JourneyState::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustKind {
    Shorten,
    Lengthen,
    Regenerate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JourneyEvent {
    /// Engine entered the Journey stage with no micro-state.
    Begin,
    /// A generation call resolved with a usable phase set.
    PhasesReady { phases: Vec<Phase> },
    AcceptAll,
    /// Page through the proposal one phase at a time.
    NextPhase,
    Adjust(AdjustKind),
    RenamePhase { index: usize, name: String },
    ReorderPhase { from: usize, to: usize },
    Cancel,
}

impl JourneyEvent {
    fn describe(&self) -> &'static str {
        match self {
            JourneyEvent::Begin => "begin",
            JourneyEvent::PhasesReady { .. } => "phases_ready",
            JourneyEvent::AcceptAll => "accept_all",
            JourneyEvent::NextPhase => "next_phase",
            JourneyEvent::Adjust(_) => "adjust",
            JourneyEvent::RenamePhase { .. } => "rename_phase",
            JourneyEvent::ReorderPhase { .. } => "reorder_phase",
            JourneyEvent::Cancel => "cancel",
        }
    }
}

/// Effects for the engine to carry out after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JourneyAction {
    GeneratePhases { adjust: Option<AdjustKind> },
    AdoptPhases { phases: Vec<Phase> },
    PresentProposal,
    PresentPhase { index: usize },
    ApplyRename { index: usize, name: String },
    ApplyReorder { from: usize, to: usize },
    CommitPhases,
    DiscardState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JourneyOutcome {
    pub from: JourneyState,
    pub to: JourneyState,
    pub actions: Vec<JourneyAction>,
}

/// Ledger owned exclusively by this flow; exists only between initiation
/// and the terminal accept/cancel transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyMicroState {
    pub suggested_phases: Vec<Phase>,
    pub working_phases: Vec<Phase>,
    pub current_phase_index: usize,
    pub sub_step: JourneyState,
}

impl Default for JourneyState {
    fn default() -> Self {
        JourneyState::NotStarted
    }
}

impl JourneyMicroState {
    pub fn named_phase_count(&self) -> usize {
        self.working_phases.iter().filter(|phase| phase.has_name()).count()
    }

    /// Applies a transition outcome: advances `sub_step` and carries out
    /// the in-place actions. Presentation and generation actions are left
    /// for the engine; commit is the engine's explicit captured-data write.
    pub fn apply(&mut self, outcome: &JourneyOutcome) -> Result<(), MicroFlowError> {
        for action in &outcome.actions {
            match action {
                JourneyAction::AdoptPhases { phases } => {
                    self.suggested_phases = phases.clone();
                    self.working_phases = phases.clone();
                    self.current_phase_index = 0;
                }
                JourneyAction::PresentPhase { index } => {
                    self.current_phase_index = *index;
                }
                JourneyAction::ApplyRename { index, name } => {
                    let len = self.working_phases.len();
                    let phase = self
                        .working_phases
                        .get_mut(*index)
                        .ok_or(MicroFlowError::IndexOutOfBounds { index: *index, len })?;
                    phase.name = name.clone();
                }
                JourneyAction::ApplyReorder { from, to } => {
                    let len = self.working_phases.len();
                    if *from >= len {
                        return Err(MicroFlowError::IndexOutOfBounds { index: *from, len });
                    }
                    if *to >= len {
                        return Err(MicroFlowError::IndexOutOfBounds { index: *to, len });
                    }
                    let phase = self.working_phases.remove(*from);
                    self.working_phases.insert(*to, phase);
                }
                JourneyAction::GeneratePhases { .. }
                | JourneyAction::PresentProposal
                | JourneyAction::CommitPhases
                | JourneyAction::DiscardState => {}
            }
        }
        self.sub_step = outcome.to;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JourneyFlow;

impl JourneyFlow {
    pub fn initial_state(&self) -> JourneyState {
        JourneyState::NotStarted
    }

    /// Pure transition: no side effects, returns the outcome the engine
    /// should apply. Cancel is honored from every non-terminal state.
    pub fn transition(
        &self,
        state: &JourneyMicroState,
        event: &JourneyEvent,
    ) -> Result<JourneyOutcome, MicroFlowError> {
        let from = state.sub_step;

        if matches!(event, JourneyEvent::Cancel) && !from.is_terminal() {
            return Ok(JourneyOutcome {
                from,
                to: JourneyState::Cancelled,
                actions: vec![JourneyAction::DiscardState],
            });
        }

        match (from, event) {
            (JourneyState::NotStarted, JourneyEvent::Begin) => Ok(JourneyOutcome {
                from,
                to: JourneyState::ContextGathering,
                actions: vec![JourneyAction::GeneratePhases { adjust: None }],
            }),
            (
                JourneyState::ContextGathering | JourneyState::Refining,
                JourneyEvent::PhasesReady { phases },
            ) => Ok(JourneyOutcome {
                from,
                to: JourneyState::PhasesProposed,
                actions: vec![
                    JourneyAction::AdoptPhases { phases: phases.clone() },
                    JourneyAction::PresentProposal,
                ],
            }),
            (JourneyState::PhasesProposed, JourneyEvent::AcceptAll) => Ok(JourneyOutcome {
                from,
                to: JourneyState::Accepted,
                actions: vec![JourneyAction::CommitPhases, JourneyAction::DiscardState],
            }),
            (JourneyState::PhasesProposed, JourneyEvent::NextPhase) => {
                let len = state.working_phases.len().max(1);
                let index = (state.current_phase_index + 1) % len;
                Ok(JourneyOutcome {
                    from,
                    to: JourneyState::PhasesProposed,
                    actions: vec![JourneyAction::PresentPhase { index }],
                })
            }
            (JourneyState::PhasesProposed, JourneyEvent::Adjust(adjust)) => Ok(JourneyOutcome {
                from,
                to: JourneyState::Refining,
                actions: vec![JourneyAction::GeneratePhases { adjust: Some(*adjust) }],
            }),
            (JourneyState::PhasesProposed, JourneyEvent::RenamePhase { index, name }) => {
                Ok(JourneyOutcome {
                    from,
                    to: JourneyState::PhasesProposed,
                    actions: vec![JourneyAction::ApplyRename {
                        index: *index,
                        name: name.clone(),
                    }],
                })
            }
            (JourneyState::PhasesProposed, JourneyEvent::ReorderPhase { from: a, to: b }) => {
                Ok(JourneyOutcome {
                    from,
                    to: JourneyState::PhasesProposed,
                    actions: vec![JourneyAction::ApplyReorder { from: *a, to: *b }],
                })
            }
            _ => Err(MicroFlowError::InvalidTransition {
                state: format!("{from:?}"),
                event: event.describe().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposed_state(names: &[&str]) -> JourneyMicroState {
        let phases = names.iter().map(|name| Phase::named(*name)).collect::<Vec<_>>();
        JourneyMicroState {
            suggested_phases: phases.clone(),
            working_phases: phases,
            current_phase_index: 0,
            sub_step: JourneyState::PhasesProposed,
        }
    }

    #[test]
    fn begin_requests_generation() {
        let flow = JourneyFlow;
        let state = JourneyMicroState::default();
        let outcome = flow.transition(&state, &JourneyEvent::Begin).unwrap();
        assert_eq!(outcome.to, JourneyState::ContextGathering);
        assert_eq!(outcome.actions, vec![JourneyAction::GeneratePhases { adjust: None }]);
    }

    #[test]
    fn phases_ready_adopts_and_presents() {
        let flow = JourneyFlow;
        let mut state = JourneyMicroState {
            sub_step: JourneyState::ContextGathering,
            ..JourneyMicroState::default()
        };
        let phases =
            vec![Phase::named("Investigate"), Phase::named("Plan"), Phase::named("Share")];
        let outcome =
            flow.transition(&state, &JourneyEvent::PhasesReady { phases: phases.clone() }).unwrap();
        state.apply(&outcome).unwrap();

        assert_eq!(state.sub_step, JourneyState::PhasesProposed);
        assert_eq!(state.working_phases, phases);
        assert_eq!(state.suggested_phases, phases);
    }

    #[test]
    fn paging_wraps_around_the_proposal() {
        let flow = JourneyFlow;
        let mut state = proposed_state(&["Investigate", "Plan", "Share"]);

        for expected in [1, 2, 0, 1] {
            let outcome = flow.transition(&state, &JourneyEvent::NextPhase).unwrap();
            state.apply(&outcome).unwrap();
            assert_eq!(state.current_phase_index, expected);
            assert_eq!(state.sub_step, JourneyState::PhasesProposed);
        }
    }

    #[test]
    fn adjust_moves_to_refining_and_back_on_ready() {
        let flow = JourneyFlow;
        let mut state = proposed_state(&["A", "B", "C"]);

        let outcome =
            flow.transition(&state, &JourneyEvent::Adjust(AdjustKind::Shorten)).unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.sub_step, JourneyState::Refining);
        assert_eq!(
            outcome.actions,
            vec![JourneyAction::GeneratePhases { adjust: Some(AdjustKind::Shorten) }]
        );

        let shorter = vec![Phase::named("Explore"), Phase::named("Make"), Phase::named("Tell")];
        let outcome = flow
            .transition(&state, &JourneyEvent::PhasesReady { phases: shorter.clone() })
            .unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.sub_step, JourneyState::PhasesProposed);
        assert_eq!(state.working_phases, shorter);
    }

    #[test]
    fn rename_and_reorder_do_not_change_state() {
        let flow = JourneyFlow;
        let mut state = proposed_state(&["Investigate", "Plan", "Share"]);

        let outcome = flow
            .transition(
                &state,
                &JourneyEvent::RenamePhase { index: 1, name: "Prototype".to_string() },
            )
            .unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.working_phases[1].name, "Prototype");
        assert_eq!(state.sub_step, JourneyState::PhasesProposed);

        let outcome =
            flow.transition(&state, &JourneyEvent::ReorderPhase { from: 2, to: 0 }).unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.working_phases[0].name, "Share");
    }

    #[test]
    fn rename_out_of_bounds_is_an_error_not_a_panic() {
        let flow = JourneyFlow;
        let mut state = proposed_state(&["A", "B"]);
        let outcome = flow
            .transition(&state, &JourneyEvent::RenamePhase { index: 7, name: "X".to_string() })
            .unwrap();
        let error = state.apply(&outcome).unwrap_err();
        assert_eq!(error, MicroFlowError::IndexOutOfBounds { index: 7, len: 2 });
    }

    #[test]
    fn cancel_is_honored_from_every_non_terminal_state() {
        let flow = JourneyFlow;
        for sub_step in [
            JourneyState::NotStarted,
            JourneyState::ContextGathering,
            JourneyState::PhasesProposed,
            JourneyState::Refining,
        ] {
            let state = JourneyMicroState { sub_step, ..JourneyMicroState::default() };
            let outcome = flow.transition(&state, &JourneyEvent::Cancel).unwrap();
            assert_eq!(outcome.to, JourneyState::Cancelled);
            assert_eq!(outcome.actions, vec![JourneyAction::DiscardState]);
        }
    }

    #[test]
    fn terminal_states_reject_further_events() {
        let flow = JourneyFlow;
        let state = JourneyMicroState {
            sub_step: JourneyState::Accepted,
            ..JourneyMicroState::default()
        };
        assert!(flow.transition(&state, &JourneyEvent::AcceptAll).is_err());
        assert!(flow.transition(&state, &JourneyEvent::Cancel).is_err());
    }

    #[test]
    fn accept_is_only_valid_from_proposed() {
        let flow = JourneyFlow;
        let state = JourneyMicroState {
            sub_step: JourneyState::ContextGathering,
            ..JourneyMicroState::default()
        };
        assert!(flow.transition(&state, &JourneyEvent::AcceptAll).is_err());
    }
}
