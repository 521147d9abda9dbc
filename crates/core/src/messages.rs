//! The assistant-role text the engine emits: transition messages,
//! correction prompts, and coaching after capture. An external renderer
//! displays these verbatim.

use crate::domain::{CapturedData, NamedItem, Phase, Stage};
use crate::flows::DeliverableComponent;
use crate::gating::derive_current_stage;

/// One assistant-role message in the outgoing turn reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantMessage {
    pub text: String,
}

impl AssistantMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub fn stage_intro(stage: Stage) -> String {
    match stage {
        Stage::BigIdea => {
            "Let's start with the big idea: the broad concept your project explores. \
             What theme do you want students to dig into?"
                .to_string()
        }
        Stage::EssentialQuestion => {
            "Now the essential question: an open-ended question that makes the big idea \
             personal. How might you phrase it?"
                .to_string()
        }
        Stage::Challenge => {
            "Time for the challenge: a concrete call to action students can own. \
             What will they actually do?"
                .to_string()
        }
        Stage::Journey => {
            "Let's map the journey: the phases students move through from first \
             questions to final work. I'll sketch a draft to react to."
                .to_string()
        }
        Stage::Deliverables => {
            "Last stage: deliverables. We'll pin down milestones, the artifacts \
             students produce, and the rubric criteria, one piece at a time."
                .to_string()
        }
    }
}

pub fn capture_confirmation(stage: Stage, value: &str) -> String {
    format!("Captured your {}: \"{value}\"", stage.label().to_ascii_lowercase())
}

pub fn stage_advanced(to: Stage) -> String {
    format!("Great, that's solid. Moving on to the {}.\n\n{}", to.label(), stage_intro(to))
}

pub fn session_complete() -> String {
    "That's every stage captured. Your project plan is complete — review it any time \
     with \"what have we got so far\"."
        .to_string()
}

pub fn quality_correction(hint: Option<&str>) -> String {
    match hint {
        Some(hint) => hint.to_string(),
        None => "Can you say a bit more about that?".to_string(),
    }
}

pub fn gating_incomplete(reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Almost there: {reason}."),
        None => "We need a little more before moving on.".to_string(),
    }
}

pub fn clarification(stage: Stage) -> String {
    let explainer = match stage {
        Stage::BigIdea => {
            "A big idea is a broad, transferable concept — \"systems\", \"resilience\", \
             \"identity\" — stated as a short claim rather than a question."
        }
        Stage::EssentialQuestion => {
            "An essential question opens the big idea up for inquiry. It has no single \
             right answer and usually starts with \"how\" or \"why\"."
        }
        Stage::Challenge => {
            "The challenge turns the question into action: something students design, \
             build, or organize for a real audience."
        }
        Stage::Journey => {
            "The journey is the sequence of phases students work through. You can accept \
             my draft, page through it phase by phase, or ask for a different shape."
        }
        Stage::Deliverables => {
            "Deliverables are how the work becomes visible: milestones along the way, \
             final artifacts, and the rubric criteria for judging them."
        }
    };
    format!("{explainer} We're on the {} stage right now.", stage.label())
}

pub fn cancelled_flow(stage: Stage) -> String {
    format!(
        "No problem, I've set that draft aside. Tell me in your own words what you want \
         the {} to look like.",
        stage.label().to_ascii_lowercase()
    )
}

pub fn nothing_to_accept() -> String {
    "I don't have an open suggestion for you to accept right now. Tell me your idea in \
     your own words, or ask for options."
        .to_string()
}

pub fn nothing_to_modify(stage: Stage) -> String {
    format!(
        "There's no captured {} to revise yet — we can just write it now.",
        stage.label().to_ascii_lowercase()
    )
}

pub fn suggestion_list(stage: Stage, options: &[String]) -> String {
    let mut lines = vec![format!(
        "Here are a few directions for the {}:",
        stage.label().to_ascii_lowercase()
    )];
    for (index, option) in options.iter().enumerate() {
        lines.push(format!("{}. {option}", index + 1));
    }
    lines.push("Pick one, ask for others, or write your own.".to_string());
    lines.join("\n")
}

pub fn journey_proposal(phases: &[Phase]) -> String {
    let mut lines = vec![format!("Here's a draft journey with {} phases:", phases.len())];
    for (index, phase) in phases.iter().enumerate() {
        match &phase.focus {
            Some(focus) => lines.push(format!("{}. {} — {focus}", index + 1, phase.name)),
            None => lines.push(format!("{}. {}", index + 1, phase.name)),
        }
    }
    lines.push(
        "Say \"accept all\" to keep it, \"next phase\" to walk through one at a time, \
         or ask me to shorten, lengthen, or regenerate."
            .to_string(),
    );
    lines.join("\n")
}

pub fn journey_phase_detail(index: usize, phase: &Phase) -> String {
    let mut lines = vec![format!("Phase {}: {}", index + 1, phase.name)];
    if let Some(focus) = &phase.focus {
        lines.push(format!("Focus: {focus}"));
    }
    if !phase.activities.is_empty() {
        lines.push(format!("Activities: {}", phase.activities.join("; ")));
    }
    if let Some(checkpoint) = &phase.checkpoint {
        lines.push(format!("Checkpoint: {checkpoint}"));
    }
    lines.join("\n")
}

pub fn deliverables_intro() -> String {
    "I've drafted a full deliverables package. We'll review it in three passes — \
     milestones, then artifacts, then rubric criteria. Say \"yes\" when you're ready \
     to start with milestones."
        .to_string()
}

pub fn deliverables_component(component: DeliverableComponent, items: &[String]) -> String {
    let mut lines = vec![format!("Proposed {}:", component.label())];
    for (index, item) in items.iter().enumerate() {
        lines.push(format!("{}. {item}", index + 1));
    }
    lines.push(
        "Accept these to move on, ask me to regenerate them, or rename/reorder \
         individual entries."
            .to_string(),
    );
    lines.join("\n")
}

pub fn named_item_lines(items: &[NamedItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match &item.description {
            Some(description) => format!("{} — {description}", item.name),
            None => item.name.clone(),
        })
        .collect()
}

/// Compact stage-by-stage summary of everything captured so far.
pub fn progress_summary(captured: &CapturedData) -> String {
    let mut lines = vec!["Here's the plan so far:".to_string()];

    let field = |label: &str, value: &Option<String>| match value {
        Some(value) => format!("{label}: {value}"),
        None => format!("{label}: (not captured yet)"),
    };
    lines.push(field("Big Idea", &captured.ideation.big_idea));
    lines.push(field("Essential Question", &captured.ideation.essential_question));
    lines.push(field("Challenge", &captured.ideation.challenge));

    if captured.journey.phases.is_empty() {
        lines.push("Journey: (not captured yet)".to_string());
    } else {
        let names: Vec<&str> =
            captured.journey.phases.iter().map(|phase| phase.name.as_str()).collect();
        lines.push(format!("Journey: {}", names.join(" → ")));
    }

    let deliverables = &captured.deliverables;
    if deliverables.milestones.is_empty()
        && deliverables.artifacts.is_empty()
        && deliverables.rubric.criteria.is_empty()
    {
        lines.push("Deliverables: (not captured yet)".to_string());
    } else {
        lines.push(format!(
            "Deliverables: {} milestones, {} artifacts, {} rubric criteria",
            deliverables.milestones.len(),
            deliverables.artifacts.len(),
            deliverables.rubric.criteria.len()
        ));
    }

    lines.push(format!("Current stage: {}", derive_current_stage(captured)));
    lines.join("\n")
}
