//! Stage gating: pass/fail checks deciding whether a stage's captured
//! content is sufficient to advance, and stage derivation from data.

use crate::domain::{CapturedData, Stage};
use crate::quality::meets_capture_bar;

pub const MIN_JOURNEY_PHASES: usize = 3;
pub const MIN_MILESTONES: usize = 3;
pub const MIN_ARTIFACTS: usize = 1;
pub const MIN_RUBRIC_CRITERIA: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateResult {
    pub ok: bool,
    pub reason: Option<String>,
}

impl GateResult {
    fn pass() -> Self {
        Self { ok: true, reason: None }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self { ok: false, reason: Some(reason.into()) }
    }
}

/// Pure function of the captured data: no hidden state, idempotent.
pub fn validate(stage: Stage, captured: &CapturedData) -> GateResult {
    match stage {
        Stage::BigIdea | Stage::EssentialQuestion | Stage::Challenge => {
            match captured.ideation.field(stage) {
                Some(text) if meets_capture_bar(stage, text) => GateResult::pass(),
                Some(_) => GateResult::fail(format!(
                    "the captured {} does not meet the substance bar",
                    stage.label().to_ascii_lowercase()
                )),
                None => GateResult::fail(format!(
                    "no {} captured yet",
                    stage.label().to_ascii_lowercase()
                )),
            }
        }
        Stage::Journey => {
            let named = captured.journey.phases.iter().filter(|phase| phase.has_name()).count();
            if captured.journey.phases.len() >= MIN_JOURNEY_PHASES && named >= MIN_JOURNEY_PHASES {
                GateResult::pass()
            } else {
                GateResult::fail(format!(
                    "the journey needs at least {MIN_JOURNEY_PHASES} named phases ({named} named so far)"
                ))
            }
        }
        Stage::Deliverables => {
            let milestones =
                captured.deliverables.milestones.iter().filter(|item| item.has_name()).count();
            let artifacts =
                captured.deliverables.artifacts.iter().filter(|item| item.has_name()).count();
            let criteria = captured
                .deliverables
                .rubric
                .criteria
                .iter()
                .filter(|criterion| !criterion.trim().is_empty())
                .count();

            if milestones >= MIN_MILESTONES
                && artifacts >= MIN_ARTIFACTS
                && criteria >= MIN_RUBRIC_CRITERIA
            {
                GateResult::pass()
            } else {
                GateResult::fail(format!(
                    "deliverables need {MIN_MILESTONES} milestones, {MIN_ARTIFACTS} artifact, and \
                     {MIN_RUBRIC_CRITERIA} rubric criteria ({milestones}/{artifacts}/{criteria} so far)"
                ))
            }
        }
    }
}

/// Walks the stage order and returns the first stage that does not yet
/// validate. This is the single source of truth for "where are we": a
/// session resumes at the correct point purely from data, self-healing
/// if a persisted cursor and the data ever disagree. When everything
/// validates, the session rests on the final stage.
pub fn derive_current_stage(captured: &CapturedData) -> Stage {
    for stage in Stage::ORDER {
        if !validate(stage, captured).ok {
            return stage;
        }
    }
    Stage::Deliverables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NamedItem, Phase};

    fn captured_with_ideation() -> CapturedData {
        let mut captured = CapturedData::default();
        captured.ideation.big_idea = Some("Systems thinking reveals hidden connections".into());
        captured.ideation.essential_question =
            Some("How do invisible systems shape our daily choices?".into());
        captured.ideation.challenge = Some("Design a campaign exposing one hidden system".into());
        captured
    }

    #[test]
    fn empty_data_derives_big_idea() {
        assert_eq!(derive_current_stage(&CapturedData::default()), Stage::BigIdea);
    }

    #[test]
    fn captured_big_idea_validates_and_advances_derivation() {
        let mut captured = CapturedData::default();
        captured.ideation.big_idea = Some("Systems thinking reveals hidden connections".into());

        assert!(validate(Stage::BigIdea, &captured).ok);
        assert_eq!(derive_current_stage(&captured), Stage::EssentialQuestion);
    }

    #[test]
    fn low_substance_ideation_field_fails_gating() {
        let mut captured = CapturedData::default();
        captured.ideation.big_idea = Some("art stuff".into());
        let result = validate(Stage::BigIdea, &captured);
        assert!(!result.ok);
        assert!(result.reason.unwrap().contains("substance"));
    }

    #[test]
    fn journey_requires_three_named_phases() {
        let mut captured = captured_with_ideation();
        captured.journey.phases = vec![Phase::named("Investigate"), Phase::named("Plan")];
        assert!(!validate(Stage::Journey, &captured).ok);

        captured.journey.phases.push(Phase::named("  "));
        assert!(!validate(Stage::Journey, &captured).ok, "unnamed phase does not count");

        captured.journey.phases.push(Phase::named("Share"));
        assert!(validate(Stage::Journey, &captured).ok);
        assert_eq!(derive_current_stage(&captured), Stage::Deliverables);
    }

    #[test]
    fn deliverables_requires_all_three_components() {
        let mut captured = captured_with_ideation();
        captured.journey.phases =
            vec![Phase::named("Investigate"), Phase::named("Plan"), Phase::named("Share")];
        captured.deliverables.milestones = vec![
            NamedItem::named("Research brief"),
            NamedItem::named("Prototype review"),
            NamedItem::named("Final showcase"),
        ];
        captured.deliverables.artifacts = vec![NamedItem::named("Campaign poster")];
        assert!(!validate(Stage::Deliverables, &captured).ok, "criteria still missing");

        captured.deliverables.rubric.criteria = vec![
            "Evidence of research".into(),
            "Clarity of message".into(),
            "Community relevance".into(),
        ];
        assert!(validate(Stage::Deliverables, &captured).ok);
        assert_eq!(derive_current_stage(&captured), Stage::Deliverables);
    }

    #[test]
    fn derivation_is_monotonic_with_more_data() {
        // Adding fields never moves the derived stage backwards.
        let mut captured = CapturedData::default();
        let mut last = derive_current_stage(&captured);

        captured.ideation.big_idea = Some("Systems thinking reveals hidden connections".into());
        let derived = derive_current_stage(&captured);
        assert!(derived >= last);
        last = derived;

        captured.ideation.essential_question =
            Some("How do invisible systems shape our daily choices?".into());
        let derived = derive_current_stage(&captured);
        assert!(derived >= last);
        last = derived;

        captured.ideation.challenge =
            Some("Design a campaign exposing one hidden system".into());
        assert!(derive_current_stage(&captured) >= last);
    }

    #[test]
    fn validation_is_idempotent() {
        let captured = captured_with_ideation();
        let first = validate(Stage::Challenge, &captured);
        let second = validate(Stage::Challenge, &captured);
        assert_eq!(first, second);
    }
}
