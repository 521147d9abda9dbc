//! Deliverables micro-flow: a strictly linear walk through milestones,
//! artifacts, and rubric criteria. Unlike the journey's free paging, the
//! three components are independent rather than sequential-narrative, so
//! the review order is fixed.

use serde::{Deserialize, Serialize};

use crate::domain::NamedItem;
use crate::flows::MicroFlowError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverablesSubStep {
    #[default]
    NotStarted,
    Intro,
    ReviewMilestones,
    ReviewArtifacts,
    ReviewCriteria,
    Accepted,
    Cancelled,
}

impl DeliverablesSubStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliverablesSubStep::Accepted | DeliverablesSubStep::Cancelled)
    }

    pub fn component_under_review(self) -> Option<DeliverableComponent> {
        match self {
            DeliverablesSubStep::ReviewMilestones => Some(DeliverableComponent::Milestones),
            DeliverablesSubStep::ReviewArtifacts => Some(DeliverableComponent::Artifacts),
            DeliverablesSubStep::ReviewCriteria => Some(DeliverableComponent::Criteria),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableComponent {
    Milestones,
    Artifacts,
    Criteria,
}

impl DeliverableComponent {
    pub fn label(self) -> &'static str {
        match self {
            DeliverableComponent::Milestones => "milestones",
            DeliverableComponent::Artifacts => "artifacts",
            DeliverableComponent::Criteria => "rubric criteria",
        }
    }
}

/// The in-progress proposal for all three components.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverablesProposal {
    pub milestones: Vec<NamedItem>,
    pub artifacts: Vec<NamedItem>,
    pub criteria: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverablesMicroState {
    pub proposal: DeliverablesProposal,
    pub sub_step: DeliverablesSubStep,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliverablesEvent {
    /// Engine entered the Deliverables stage with no micro-state.
    Begin,
    ProposalReady { proposal: DeliverablesProposal },
    /// User is ready to leave the intro and start reviewing.
    BeginReview,
    /// Accept the component under review and advance.
    AcceptComponent,
    RegenerateComponent,
    ComponentReady { component: DeliverableComponent, proposal: DeliverablesProposal },
    RenameItem { index: usize, name: String },
    ReorderItem { from: usize, to: usize },
    Cancel,
}

impl DeliverablesEvent {
    fn describe(&self) -> &'static str {
        match self {
            DeliverablesEvent::Begin => "begin",
            DeliverablesEvent::ProposalReady { .. } => "proposal_ready",
            DeliverablesEvent::BeginReview => "begin_review",
            DeliverablesEvent::AcceptComponent => "accept_component",
            DeliverablesEvent::RegenerateComponent => "regenerate_component",
            DeliverablesEvent::ComponentReady { .. } => "component_ready",
            DeliverablesEvent::RenameItem { .. } => "rename_item",
            DeliverablesEvent::ReorderItem { .. } => "reorder_item",
            DeliverablesEvent::Cancel => "cancel",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliverablesAction {
    GenerateProposal,
    AdoptProposal { proposal: DeliverablesProposal },
    PresentIntro,
    PresentComponent { component: DeliverableComponent },
    RegenerateComponent { component: DeliverableComponent },
    AdoptComponent { component: DeliverableComponent, proposal: DeliverablesProposal },
    ApplyRename { index: usize, name: String },
    ApplyReorder { from: usize, to: usize },
    /// Commit the named component into captured data as one atomic write.
    CommitComponent { component: DeliverableComponent },
    DiscardState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliverablesOutcome {
    pub from: DeliverablesSubStep,
    pub to: DeliverablesSubStep,
    pub actions: Vec<DeliverablesAction>,
}

impl DeliverablesMicroState {
    fn items_under_review_mut(
        &mut self,
        component: DeliverableComponent,
    ) -> Option<&mut Vec<NamedItem>> {
        match component {
            DeliverableComponent::Milestones => Some(&mut self.proposal.milestones),
            DeliverableComponent::Artifacts => Some(&mut self.proposal.artifacts),
            DeliverableComponent::Criteria => None,
        }
    }

    pub fn apply(&mut self, outcome: &DeliverablesOutcome) -> Result<(), MicroFlowError> {
        for action in &outcome.actions {
            match action {
                DeliverablesAction::AdoptProposal { proposal } => {
                    self.proposal = proposal.clone();
                }
                DeliverablesAction::AdoptComponent { component, proposal } => match component {
                    DeliverableComponent::Milestones => {
                        self.proposal.milestones = proposal.milestones.clone();
                    }
                    DeliverableComponent::Artifacts => {
                        self.proposal.artifacts = proposal.artifacts.clone();
                    }
                    DeliverableComponent::Criteria => {
                        self.proposal.criteria = proposal.criteria.clone();
                    }
                },
                DeliverablesAction::ApplyRename { index, name } => {
                    let component = outcome
                        .from
                        .component_under_review()
                        .unwrap_or(DeliverableComponent::Milestones);
                    if component == DeliverableComponent::Criteria {
                        let len = self.proposal.criteria.len();
                        let criterion = self
                            .proposal
                            .criteria
                            .get_mut(*index)
                            .ok_or(MicroFlowError::IndexOutOfBounds { index: *index, len })?;
                        *criterion = name.clone();
                    } else if let Some(items) = self.items_under_review_mut(component) {
                        let len = items.len();
                        let item = items
                            .get_mut(*index)
                            .ok_or(MicroFlowError::IndexOutOfBounds { index: *index, len })?;
                        item.name = name.clone();
                    }
                }
                DeliverablesAction::ApplyReorder { from, to } => {
                    let component = outcome
                        .from
                        .component_under_review()
                        .unwrap_or(DeliverableComponent::Milestones);
                    if component == DeliverableComponent::Criteria {
                        let len = self.proposal.criteria.len();
                        if *from >= len || *to >= len {
                            return Err(MicroFlowError::IndexOutOfBounds {
                                index: (*from).max(*to),
                                len,
                            });
                        }
                        let criterion = self.proposal.criteria.remove(*from);
                        self.proposal.criteria.insert(*to, criterion);
                    } else if let Some(items) = self.items_under_review_mut(component) {
                        let len = items.len();
                        if *from >= len || *to >= len {
                            return Err(MicroFlowError::IndexOutOfBounds {
                                index: (*from).max(*to),
                                len,
                            });
                        }
                        let item = items.remove(*from);
                        items.insert(*to, item);
                    }
                }
                DeliverablesAction::GenerateProposal
                | DeliverablesAction::PresentIntro
                | DeliverablesAction::PresentComponent { .. }
                | DeliverablesAction::RegenerateComponent { .. }
                | DeliverablesAction::CommitComponent { .. }
                | DeliverablesAction::DiscardState => {}
            }
        }
        self.sub_step = outcome.to;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeliverablesFlow;

impl DeliverablesFlow {
    pub fn initial_state(&self) -> DeliverablesSubStep {
        DeliverablesSubStep::NotStarted
    }

    pub fn transition(
        &self,
        state: &DeliverablesMicroState,
        event: &DeliverablesEvent,
    ) -> Result<DeliverablesOutcome, MicroFlowError> {
        let from = state.sub_step;

        if matches!(event, DeliverablesEvent::Cancel) && !from.is_terminal() {
            return Ok(DeliverablesOutcome {
                from,
                to: DeliverablesSubStep::Cancelled,
                actions: vec![DeliverablesAction::DiscardState],
            });
        }

        match (from, event) {
            (DeliverablesSubStep::NotStarted, DeliverablesEvent::Begin) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::Intro,
                    actions: vec![DeliverablesAction::GenerateProposal],
                })
            }
            (DeliverablesSubStep::Intro, DeliverablesEvent::ProposalReady { proposal }) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::Intro,
                    actions: vec![
                        DeliverablesAction::AdoptProposal { proposal: proposal.clone() },
                        DeliverablesAction::PresentIntro,
                    ],
                })
            }
            (DeliverablesSubStep::Intro, DeliverablesEvent::BeginReview) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::ReviewMilestones,
                    actions: vec![DeliverablesAction::PresentComponent {
                        component: DeliverableComponent::Milestones,
                    }],
                })
            }
            (DeliverablesSubStep::ReviewMilestones, DeliverablesEvent::AcceptComponent) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::ReviewArtifacts,
                    actions: vec![
                        DeliverablesAction::CommitComponent {
                            component: DeliverableComponent::Milestones,
                        },
                        DeliverablesAction::PresentComponent {
                            component: DeliverableComponent::Artifacts,
                        },
                    ],
                })
            }
            (DeliverablesSubStep::ReviewArtifacts, DeliverablesEvent::AcceptComponent) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::ReviewCriteria,
                    actions: vec![
                        DeliverablesAction::CommitComponent {
                            component: DeliverableComponent::Artifacts,
                        },
                        DeliverablesAction::PresentComponent {
                            component: DeliverableComponent::Criteria,
                        },
                    ],
                })
            }
            (DeliverablesSubStep::ReviewCriteria, DeliverablesEvent::AcceptComponent) => {
                Ok(DeliverablesOutcome {
                    from,
                    to: DeliverablesSubStep::Accepted,
                    actions: vec![
                        DeliverablesAction::CommitComponent {
                            component: DeliverableComponent::Criteria,
                        },
                        DeliverablesAction::DiscardState,
                    ],
                })
            }
            (
                DeliverablesSubStep::ReviewMilestones
                | DeliverablesSubStep::ReviewArtifacts
                | DeliverablesSubStep::ReviewCriteria,
                DeliverablesEvent::RegenerateComponent,
            ) => {
                let component = from.component_under_review().ok_or_else(|| {
                    MicroFlowError::InvalidTransition {
                        state: format!("{from:?}"),
                        event: event.describe().to_string(),
                    }
                })?;
                Ok(DeliverablesOutcome {
                    from,
                    to: from,
                    actions: vec![DeliverablesAction::RegenerateComponent { component }],
                })
            }
            (
                DeliverablesSubStep::ReviewMilestones
                | DeliverablesSubStep::ReviewArtifacts
                | DeliverablesSubStep::ReviewCriteria,
                DeliverablesEvent::ComponentReady { component, proposal },
            ) => Ok(DeliverablesOutcome {
                from,
                to: from,
                actions: vec![
                    DeliverablesAction::AdoptComponent {
                        component: *component,
                        proposal: proposal.clone(),
                    },
                    DeliverablesAction::PresentComponent { component: *component },
                ],
            }),
            (
                DeliverablesSubStep::ReviewMilestones
                | DeliverablesSubStep::ReviewArtifacts
                | DeliverablesSubStep::ReviewCriteria,
                DeliverablesEvent::RenameItem { index, name },
            ) => Ok(DeliverablesOutcome {
                from,
                to: from,
                actions: vec![DeliverablesAction::ApplyRename {
                    index: *index,
                    name: name.clone(),
                }],
            }),
            (
                DeliverablesSubStep::ReviewMilestones
                | DeliverablesSubStep::ReviewArtifacts
                | DeliverablesSubStep::ReviewCriteria,
                DeliverablesEvent::ReorderItem { from: a, to: b },
            ) => Ok(DeliverablesOutcome {
                from,
                to: from,
                actions: vec![DeliverablesAction::ApplyReorder { from: *a, to: *b }],
            }),
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

    fn sample_proposal() -> DeliverablesProposal {
        DeliverablesProposal {
            milestones: vec![
                NamedItem::named("Research brief"),
                NamedItem::named("Prototype review"),
                NamedItem::named("Final showcase"),
            ],
            artifacts: vec![NamedItem::named("Campaign poster")],
            criteria: vec![
                "Evidence of research".to_string(),
                "Clarity of message".to_string(),
                "Community relevance".to_string(),
            ],
        }
    }

    fn state_at(sub_step: DeliverablesSubStep) -> DeliverablesMicroState {
        DeliverablesMicroState { proposal: sample_proposal(), sub_step }
    }

    #[test]
    fn review_order_is_strictly_linear() {
        let flow = DeliverablesFlow;
        let mut state = DeliverablesMicroState::default();

        let outcome = flow.transition(&state, &DeliverablesEvent::Begin).unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.sub_step, DeliverablesSubStep::Intro);

        let outcome = flow
            .transition(
                &state,
                &DeliverablesEvent::ProposalReady { proposal: sample_proposal() },
            )
            .unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.sub_step, DeliverablesSubStep::Intro);
        assert_eq!(state.proposal, sample_proposal());

        let expected = [
            DeliverablesSubStep::ReviewMilestones,
            DeliverablesSubStep::ReviewArtifacts,
            DeliverablesSubStep::ReviewCriteria,
            DeliverablesSubStep::Accepted,
        ];
        let events = [
            DeliverablesEvent::BeginReview,
            DeliverablesEvent::AcceptComponent,
            DeliverablesEvent::AcceptComponent,
            DeliverablesEvent::AcceptComponent,
        ];
        for (event, next) in events.iter().zip(expected) {
            let outcome = flow.transition(&state, event).unwrap();
            state.apply(&outcome).unwrap();
            assert_eq!(state.sub_step, next);
        }
    }

    #[test]
    fn accepting_milestones_commits_them_and_presents_artifacts() {
        let flow = DeliverablesFlow;
        let state = state_at(DeliverablesSubStep::ReviewMilestones);
        let outcome = flow.transition(&state, &DeliverablesEvent::AcceptComponent).unwrap();
        assert_eq!(
            outcome.actions[0],
            DeliverablesAction::CommitComponent { component: DeliverableComponent::Milestones }
        );
        assert_eq!(
            outcome.actions[1],
            DeliverablesAction::PresentComponent { component: DeliverableComponent::Artifacts }
        );
    }

    #[test]
    fn regenerate_stays_on_the_same_component() {
        let flow = DeliverablesFlow;
        let state = state_at(DeliverablesSubStep::ReviewArtifacts);
        let outcome =
            flow.transition(&state, &DeliverablesEvent::RegenerateComponent).unwrap();
        assert_eq!(outcome.to, DeliverablesSubStep::ReviewArtifacts);
        assert_eq!(
            outcome.actions,
            vec![DeliverablesAction::RegenerateComponent {
                component: DeliverableComponent::Artifacts
            }]
        );
    }

    #[test]
    fn rename_edits_the_component_under_review() {
        let flow = DeliverablesFlow;
        let mut state = state_at(DeliverablesSubStep::ReviewMilestones);
        let outcome = flow
            .transition(
                &state,
                &DeliverablesEvent::RenameItem { index: 0, name: "Kickoff brief".to_string() },
            )
            .unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.proposal.milestones[0].name, "Kickoff brief");
        // Other components untouched.
        assert_eq!(state.proposal.artifacts, sample_proposal().artifacts);
    }

    #[test]
    fn rename_during_criteria_review_edits_criteria() {
        let flow = DeliverablesFlow;
        let mut state = state_at(DeliverablesSubStep::ReviewCriteria);
        let outcome = flow
            .transition(
                &state,
                &DeliverablesEvent::RenameItem { index: 1, name: "Depth of analysis".to_string() },
            )
            .unwrap();
        state.apply(&outcome).unwrap();
        assert_eq!(state.proposal.criteria[1], "Depth of analysis");
    }

    #[test]
    fn reorder_out_of_bounds_is_an_error() {
        let flow = DeliverablesFlow;
        let mut state = state_at(DeliverablesSubStep::ReviewCriteria);
        let outcome = flow
            .transition(&state, &DeliverablesEvent::ReorderItem { from: 0, to: 9 })
            .unwrap();
        assert!(state.apply(&outcome).is_err());
    }

    #[test]
    fn cancel_discards_from_any_review_state() {
        let flow = DeliverablesFlow;
        for sub_step in [
            DeliverablesSubStep::Intro,
            DeliverablesSubStep::ReviewMilestones,
            DeliverablesSubStep::ReviewArtifacts,
            DeliverablesSubStep::ReviewCriteria,
        ] {
            let state = state_at(sub_step);
            let outcome = flow.transition(&state, &DeliverablesEvent::Cancel).unwrap();
            assert_eq!(outcome.to, DeliverablesSubStep::Cancelled);
            assert_eq!(outcome.actions, vec![DeliverablesAction::DiscardState]);
        }
    }

    #[test]
    fn accept_outside_review_is_rejected() {
        let flow = DeliverablesFlow;
        let state = state_at(DeliverablesSubStep::Intro);
        assert!(flow.transition(&state, &DeliverablesEvent::AcceptComponent).is_err());
    }
}
