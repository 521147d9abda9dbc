//! Prompt construction and completion parsing. Implements the core's
//! `ContentGenerator` seam on top of any `LlmClient`.
//!
//! Completions are requested in a line-oriented plain-text format rather
//! than JSON; small local models follow it far more reliably, and a
//! partially malformed reply still yields usable lines.

use async_trait::async_trait;

use coplan_core::domain::{CapturedData, Ideation, NamedItem, Phase, Stage, WizardContext};
use coplan_core::flows::{AdjustKind, DeliverableComponent, DeliverablesProposal};
use coplan_core::gating::MIN_JOURNEY_PHASES;
use coplan_core::generate::{ContentGenerator, GenerationError};

use crate::llm::{CompletionRequest, LlmClient, LlmError};

const SYSTEM_PROMPT: &str = "You are a curriculum design assistant helping a teacher draft a \
    challenge-based learning project. Follow the requested output format exactly. Do not add \
    commentary before or after the requested lines.";

pub struct PlanGenerator<C> {
    client: C,
}

impl<C> PlanGenerator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: LlmClient> PlanGenerator<C> {
    async fn complete(&self, prompt: String) -> Result<String, GenerationError> {
        let request = CompletionRequest { system_prompt: SYSTEM_PROMPT.to_string(), prompt };
        self.client.complete(&request).await.map_err(map_llm_error)
    }
}

fn map_llm_error(error: LlmError) -> GenerationError {
    match error {
        LlmError::RateLimited => GenerationError::RateLimited,
        LlmError::Auth => GenerationError::Auth,
        LlmError::EmptyCompletion => GenerationError::Empty,
        LlmError::Timeout | LlmError::Upstream { .. } | LlmError::Transport(_) => {
            GenerationError::Unavailable(error.to_string())
        }
    }
}

// ---- prompt construction ----------------------------------------------

fn context_block(wizard: &WizardContext, ideation: &Ideation) -> String {
    let mut lines = Vec::new();
    if !wizard.grade_level.is_empty() {
        lines.push(format!("Grade level: {}", wizard.grade_level));
    }
    if !wizard.subjects.is_empty() {
        lines.push(format!("Subjects: {}", wizard.subjects.join(", ")));
    }
    if !wizard.duration.is_empty() {
        lines.push(format!("Duration: {}", wizard.duration));
    }
    if let Some(space) = &wizard.space {
        lines.push(format!("Learning space: {space}"));
    }
    if let Some(materials) = &wizard.materials {
        lines.push(format!("Available materials: {materials}"));
    }
    if let Some(big_idea) = &ideation.big_idea {
        lines.push(format!("Big idea: {big_idea}"));
    }
    if let Some(question) = &ideation.essential_question {
        lines.push(format!("Essential question: {question}"));
    }
    if let Some(challenge) = &ideation.challenge {
        lines.push(format!("Challenge: {challenge}"));
    }
    lines.join("\n")
}

fn phases_prompt(wizard: &WizardContext, ideation: &Ideation, adjust: Option<AdjustKind>) -> String {
    let phase_count = match adjust {
        Some(AdjustKind::Shorten) => 3,
        Some(AdjustKind::Lengthen) => 5,
        Some(AdjustKind::Regenerate) | None => 4,
    };
    format!(
        "{}\n\nDraft the learning journey for this project as exactly {phase_count} phases.\n\
         Output one phase per line in the form `Phase name :: one-sentence focus`.\n\
         No numbering, no extra lines.",
        context_block(wizard, ideation)
    )
}

fn deliverables_prompt(wizard: &WizardContext, captured: &CapturedData) -> String {
    format!(
        "{}\n\nDraft the deliverables package for this project.\n\
         Output three sections with these exact headers, one item per line under each:\n\
         MILESTONES: (3 to 5 checkpoints)\n\
         ARTIFACTS: (1 to 3 things students produce)\n\
         CRITERIA: (3 to 5 rubric criteria)\n\
         An item may be `Name :: short description`. No other text.",
        context_block(wizard, &captured.ideation)
    )
}

fn component_prompt(
    component: DeliverableComponent,
    wizard: &WizardContext,
    captured: &CapturedData,
) -> String {
    let (what, count) = match component {
        DeliverableComponent::Milestones => ("project milestones (checkpoints)", "3 to 5"),
        DeliverableComponent::Artifacts => ("final artifacts students produce", "1 to 3"),
        DeliverableComponent::Criteria => ("rubric criteria", "3 to 5"),
    };
    format!(
        "{}\n\nDraft a fresh set of {what} for this project: {count} items.\n\
         Output one item per line, optionally `Name :: short description`. No other text.",
        context_block(wizard, &captured.ideation)
    )
}

fn options_prompt(stage: Stage, wizard: &WizardContext, captured: &CapturedData) -> String {
    let ask = match stage {
        Stage::BigIdea => "broad big-idea themes, each a short declarative statement",
        Stage::EssentialQuestion => "open-ended essential questions exploring the big idea",
        Stage::Challenge => "concrete, actionable challenge statements for students",
        Stage::Journey | Stage::Deliverables => "short framing statements for this stage",
    };
    format!(
        "{}\n\nOffer 3 candidate {ask}.\nOutput one per line, no numbering, no other text.",
        context_block(wizard, &captured.ideation)
    )
}

// ---- completion parsing -----------------------------------------------

/// Strips bullets and numbering; returns `None` for blank or header lines.
fn clean_line(line: &str) -> Option<&str> {
    let mut rest = line.trim();
    rest = rest.trim_start_matches(['-', '*', '•']).trim_start();
    if let Some(dot) = rest.find(['.', ')']) {
        if dot <= 2 && rest[..dot].chars().all(|c| c.is_ascii_digit()) && dot > 0 {
            rest = rest[dot + 1..].trim_start();
        }
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

fn split_name_description(line: &str) -> (String, Option<String>) {
    match line.split_once("::") {
        Some((name, description)) => {
            (name.trim().to_string(), Some(description.trim().to_string()))
        }
        None => (line.trim().to_string(), None),
    }
}

fn parse_phases(text: &str) -> Vec<Phase> {
    text.lines()
        .filter_map(clean_line)
        .map(|line| {
            let (name, focus) = split_name_description(line);
            let mut phase = Phase::named(name);
            phase.focus = focus.filter(|focus| !focus.is_empty());
            phase
        })
        .filter(Phase::has_name)
        .collect()
}

fn parse_named_items(lines: &[String]) -> Vec<NamedItem> {
    lines
        .iter()
        .map(|line| {
            let (name, description) = split_name_description(line);
            let mut item = NamedItem::named(name);
            item.description = description.filter(|description| !description.is_empty());
            item
        })
        .filter(NamedItem::has_name)
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Sections {
    milestones: Vec<String>,
    artifacts: Vec<String>,
    criteria: Vec<String>,
}

fn parse_sections(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut current: Option<DeliverableComponent> = None;
    for raw in text.lines() {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.starts_with("MILESTONES") {
            current = Some(DeliverableComponent::Milestones);
            continue;
        }
        if upper.starts_with("ARTIFACTS") {
            current = Some(DeliverableComponent::Artifacts);
            continue;
        }
        if upper.starts_with("CRITERIA") || upper.starts_with("RUBRIC") {
            current = Some(DeliverableComponent::Criteria);
            continue;
        }
        let Some(line) = clean_line(raw) else { continue };
        match current {
            Some(DeliverableComponent::Milestones) => sections.milestones.push(line.to_string()),
            Some(DeliverableComponent::Artifacts) => sections.artifacts.push(line.to_string()),
            Some(DeliverableComponent::Criteria) => {
                let (name, _) = split_name_description(line);
                sections.criteria.push(name);
            }
            None => {}
        }
    }
    sections
}

// ---- deterministic fallbacks ------------------------------------------

/// Used when the model replies but the reply parses to fewer phases than
/// gating will ever accept. Templated from the captured challenge so the
/// draft still reads as project-specific.
fn fallback_phases(ideation: &Ideation, adjust: Option<AdjustKind>) -> Vec<Phase> {
    let topic = ideation
        .challenge
        .as_deref()
        .or(ideation.big_idea.as_deref())
        .unwrap_or("the project topic");
    let mut phases = vec![
        Phase::named("Investigate").with_focus(format!("Build background knowledge on {topic}")),
        Phase::named("Plan").with_focus("Scope the work and divide responsibilities"),
        Phase::named("Create").with_focus("Produce and iterate on the project work"),
        Phase::named("Share").with_focus("Present outcomes to the intended audience"),
    ];
    match adjust {
        Some(AdjustKind::Shorten) => {
            phases.truncate(3);
        }
        Some(AdjustKind::Lengthen) => {
            phases.push(
                Phase::named("Reflect").with_focus("Review what worked and what to change"),
            );
        }
        Some(AdjustKind::Regenerate) | None => {}
    }
    phases
}

fn fallback_milestones() -> Vec<String> {
    vec![
        "Research summary shared".to_string(),
        "Draft reviewed with feedback".to_string(),
        "Final work presented".to_string(),
    ]
}

fn fallback_criteria() -> Vec<String> {
    vec![
        "Depth of investigation".to_string(),
        "Quality of the final product".to_string(),
        "Clarity of presentation".to_string(),
    ]
}

fn top_up(target: &mut Vec<String>, minimum: usize, defaults: Vec<String>) {
    for default in defaults {
        if target.len() >= minimum {
            break;
        }
        if !target.iter().any(|existing| existing.eq_ignore_ascii_case(&default)) {
            target.push(default);
        }
    }
}

#[async_trait]
impl<C: LlmClient> ContentGenerator for PlanGenerator<C> {
    async fn propose_phases(
        &self,
        wizard: &WizardContext,
        ideation: &Ideation,
        adjust: Option<AdjustKind>,
    ) -> Result<Vec<Phase>, GenerationError> {
        let text = self.complete(phases_prompt(wizard, ideation, adjust)).await?;
        let phases = parse_phases(&text);
        if phases.len() < MIN_JOURNEY_PHASES {
            tracing::warn!(
                parsed = phases.len(),
                "phase completion too thin, using templated journey"
            );
            return Ok(fallback_phases(ideation, adjust));
        }
        Ok(phases)
    }

    async fn propose_deliverables(
        &self,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<DeliverablesProposal, GenerationError> {
        let text = self.complete(deliverables_prompt(wizard, captured)).await?;
        let mut sections = parse_sections(&text);

        // A thin section is topped up rather than rejected; the user can
        // still rename or regenerate in review.
        top_up(&mut sections.milestones, 3, fallback_milestones());
        if sections.artifacts.is_empty() {
            sections.artifacts.push("Final presentation".to_string());
        }
        top_up(&mut sections.criteria, 3, fallback_criteria());

        Ok(DeliverablesProposal {
            milestones: parse_named_items(&sections.milestones),
            artifacts: parse_named_items(&sections.artifacts),
            criteria: sections.criteria,
        })
    }

    async fn regenerate_component(
        &self,
        component: DeliverableComponent,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<DeliverablesProposal, GenerationError> {
        let text = self.complete(component_prompt(component, wizard, captured)).await?;
        let lines: Vec<String> =
            text.lines().filter_map(clean_line).map(str::to_string).collect();
        if lines.is_empty() {
            return Err(GenerationError::Empty);
        }

        // Only the requested component is populated; the flow merges it
        // into the proposal under review.
        let mut proposal = DeliverablesProposal::default();
        match component {
            DeliverableComponent::Milestones => proposal.milestones = parse_named_items(&lines),
            DeliverableComponent::Artifacts => proposal.artifacts = parse_named_items(&lines),
            DeliverableComponent::Criteria => {
                proposal.criteria =
                    lines.iter().map(|line| split_name_description(line).0).collect();
            }
        }
        Ok(proposal)
    }

    async fn suggest_options(
        &self,
        stage: Stage,
        wizard: &WizardContext,
        captured: &CapturedData,
    ) -> Result<Vec<String>, GenerationError> {
        let text = self.complete(options_prompt(stage, wizard, captured)).await?;
        let options: Vec<String> =
            text.lines().filter_map(clean_line).map(str::to_string).collect();
        if options.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(options)
    }
}
