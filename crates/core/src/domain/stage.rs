use serde::{Deserialize, Serialize};

/// The five ordered phases of project design. Progression is monotonic
/// forward only; the active stage is derived from captured data rather
/// than stored as independent state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BigIdea,
    EssentialQuestion,
    Challenge,
    Journey,
    Deliverables,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::BigIdea,
        Stage::EssentialQuestion,
        Stage::Challenge,
        Stage::Journey,
        Stage::Deliverables,
    ];

    /// The next stage in design order, or `None` at the end.
    pub fn next(self) -> Option<Stage> {
        let position = Stage::ORDER.iter().position(|stage| *stage == self)?;
        Stage::ORDER.get(position + 1).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::BigIdea => "Big Idea",
            Stage::EssentialQuestion => "Essential Question",
            Stage::Challenge => "Challenge",
            Stage::Journey => "Journey",
            Stage::Deliverables => "Deliverables",
        }
    }

    /// True for the stages negotiated through a micro-flow rather than a
    /// single free-text capture.
    pub fn uses_micro_flow(self) -> bool {
        matches!(self, Stage::Journey | Stage::Deliverables)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.label())
    }
}
