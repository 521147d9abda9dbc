pub mod captured;
pub mod stage;

pub use captured::{
    CapturedData, DeliverablesPlan, Ideation, JourneyPlan, NamedItem, Phase, ProjectSnapshot,
    Rubric, WizardContext,
};
pub use stage::Stage;
