use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::Stage;

/// Immutable per-session setup gathered before the conversation starts.
/// Read-only input to every component; never mutated by the core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardContext {
    pub grade_level: String,
    pub subjects: Vec<String>,
    pub duration: String,
    pub space: Option<String>,
    pub materials: Option<String>,
    pub prior_experience: Option<String>,
}

/// The three single-field ideation captures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ideation {
    pub big_idea: Option<String>,
    pub essential_question: Option<String>,
    pub challenge: Option<String>,
}

impl Ideation {
    pub fn field(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::BigIdea => self.big_idea.as_deref(),
            Stage::EssentialQuestion => self.essential_question.as_deref(),
            Stage::Challenge => self.challenge.as_deref(),
            Stage::Journey | Stage::Deliverables => None,
        }
    }
}

/// One phase of the learning journey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: Uuid,
    pub name: String,
    pub focus: Option<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    pub checkpoint: Option<String>,
}

impl Phase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            focus: None,
            activities: Vec::new(),
            checkpoint: None,
        }
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyPlan {
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A named milestone or artifact within the deliverables package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl NamedItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), description: None }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub criteria: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverablesPlan {
    pub milestones: Vec<NamedItem>,
    pub artifacts: Vec<NamedItem>,
    pub rubric: Rubric,
}

/// The accumulating design document, partitioned by stage. Append or
/// overwrite only: later edits never clear a prior stage's data. Mutated
/// exclusively through the stage progression engine's capture path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedData {
    pub ideation: Ideation,
    pub journey: JourneyPlan,
    pub deliverables: DeliverablesPlan,
}

impl CapturedData {
    pub fn set_ideation_field(&mut self, stage: Stage, value: String) {
        match stage {
            Stage::BigIdea => self.ideation.big_idea = Some(value),
            Stage::EssentialQuestion => self.ideation.essential_question = Some(value),
            Stage::Challenge => self.ideation.challenge = Some(value),
            Stage::Journey | Stage::Deliverables => {}
        }
    }
}

/// The persisted form of a session: everything needed to resume. The
/// stage is re-derivable from `captured`; `stage_hint` is kept only as a
/// resumption hint and is never trusted over derived state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: String,
    pub wizard: WizardContext,
    pub captured: CapturedData,
    pub stage_hint: Option<Stage>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    pub fn new(id: impl Into<String>, wizard: WizardContext) -> Self {
        Self {
            id: id.into(),
            wizard,
            captured: CapturedData::default(),
            stage_hint: None,
            updated_at: Utc::now(),
        }
    }
}
