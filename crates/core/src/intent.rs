//! Free-text intent classification. Cascading pattern rules, evaluated in
//! a fixed priority order held in [`RULES`]: the first rule to match wins.
//! The ordering is a contract — "yes, show me something else" must resolve
//! as an alternatives request, not an acceptance — so each rule is an
//! independently testable predicate rather than a branch in a nested
//! conditional.

use serde::{Deserialize, Serialize};

use crate::domain::Stage;
use crate::text::{parse_ordinal, strip_conversational_wrapper, token_count, tokenize};

/// The closed set of things a free-text turn can mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIntent {
    AcceptSuggestion,
    RequestAlternatives,
    RequestClarification,
    ShowProgress,
    ModifyPrevious,
    CancelFlow,
    SubstantiveInput,
}

/// Index of the most recently offered suggestion, used when a bare
/// affirmation or "that one" carries no ordinal.
pub const MOST_RECENT: i32 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectedIntent {
    pub intent: UserIntent,
    /// Which offered suggestion an acceptance refers to: a zero-based
    /// index into the offered list, [`MOST_RECENT`] for "that one"/"yes",
    /// or `None` for a wholesale "accept all".
    pub last_suggestion_index: Option<i32>,
    /// The substantive payload, wrapper-stripped, for capture.
    pub extracted_value: Option<String>,
    /// For `ModifyPrevious`: which ideation stage the user wants to edit.
    pub modify_target: Option<Stage>,
}

impl DetectedIntent {
    fn of(intent: UserIntent) -> Self {
        Self { intent, last_suggestion_index: None, extracted_value: None, modify_target: None }
    }
}

struct RuleInput<'a> {
    payload: &'a str,
    normalized: String,
    tokens: Vec<String>,
    recent_suggestions: &'a [String],
}

type IntentRule = fn(&RuleInput<'_>) -> Option<DetectedIntent>;

/// Priority-ordered rule list. Order is load-bearing; see module docs.
const RULES: &[(&str, IntentRule)] = &[
    ("accept_suggestion", accept_rule),
    ("cancel_flow", cancel_rule),
    ("request_alternatives", alternatives_rule),
    ("request_clarification", clarification_rule),
    ("show_progress", show_progress_rule),
    ("modify_previous", modify_rule),
];

/// Classifies one utterance against the rule cascade. `recent_suggestions`
/// is the most recently offered suggestion batch in display order;
/// `history` is the short window of prior user turns (currently unused by
/// the rules but part of the classification contract).
pub fn detect_intent(
    text: &str,
    recent_suggestions: &[String],
    history: &[String],
) -> DetectedIntent {
    let _ = history;
    let payload = strip_conversational_wrapper(text);
    let input = RuleInput {
        payload,
        normalized: normalize_for_matching(payload),
        tokens: tokenize(payload),
        recent_suggestions,
    };

    for (_, rule) in RULES {
        if let Some(detected) = rule(&input) {
            return detected;
        }
    }

    DetectedIntent {
        intent: UserIntent::SubstantiveInput,
        last_suggestion_index: None,
        extracted_value: Some(payload.to_string()),
        modify_target: None,
    }
}

fn normalize_for_matching(text: &str) -> String {
    text.trim().trim_end_matches(['!', '.', '?']).trim().to_ascii_lowercase()
}

const BARE_AFFIRMATIONS: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "yes please",
    "sounds good",
    "sounds great",
    "that works",
    "that's perfect",
    "perfect",
    "great",
    "love it",
    "i love it",
    "i like it",
    "i like that",
    "looks good",
    "let's do it",
    "lets do it",
    "let's go with that",
    "go with that",
    "use that",
    "that one",
    "this one",
    "that's it",
    "that's the one",
];

const ACCEPT_ALL_PHRASES: &[&str] = &[
    "accept",
    "accept all",
    "accept them all",
    "accept these",
    "keep them all",
    "keep all of them",
    "use these",
    "use them all",
    "take them all",
    "all of them",
];

fn accept_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    let normalized = input.normalized.as_str();

    if BARE_AFFIRMATIONS.contains(&normalized) {
        return Some(DetectedIntent {
            last_suggestion_index: Some(MOST_RECENT),
            ..DetectedIntent::of(UserIntent::AcceptSuggestion)
        });
    }

    if ACCEPT_ALL_PHRASES.contains(&normalized) {
        return Some(DetectedIntent::of(UserIntent::AcceptSuggestion));
    }

    // Ordinal selection: "the second one", "option 3", "go with the first".
    // Whole-utterance matching only; a longer sentence that merely contains
    // an ordinal falls through to later rules.
    if input.tokens.len() <= 6 {
        let has_selection_context = input.tokens.iter().any(|token| {
            matches!(
                token.as_str(),
                "one" | "option" | "number" | "go" | "use" | "pick" | "choose" | "take" | "the"
            )
        });
        if has_selection_context {
            if let Some(index) = input.tokens.iter().find_map(|token| parse_ordinal(token)) {
                return Some(DetectedIntent {
                    last_suggestion_index: Some(index as i32),
                    ..DetectedIntent::of(UserIntent::AcceptSuggestion)
                });
            }
            if input.tokens.iter().any(|token| token == "last" || token == "latest") {
                let index = if input.recent_suggestions.is_empty() {
                    MOST_RECENT
                } else {
                    input.recent_suggestions.len() as i32 - 1
                };
                return Some(DetectedIntent {
                    last_suggestion_index: Some(index),
                    ..DetectedIntent::of(UserIntent::AcceptSuggestion)
                });
            }
        }
    }

    None
}

const CANCEL_PHRASES: &[&str] = &[
    "never mind",
    "nevermind",
    "start over",
    "cancel",
    "forget it",
    "forget that",
    "scrap that",
    "scratch that",
    "let's stop",
    "stop this",
];

fn cancel_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    if input.tokens.len() > 8 {
        return None;
    }
    let matched =
        CANCEL_PHRASES.iter().any(|phrase| input.normalized.contains(phrase));
    matched.then(|| DetectedIntent::of(UserIntent::CancelFlow))
}

const ALTERNATIVES_PHRASES: &[&str] = &[
    "something else",
    "something different",
    "other ideas",
    "other options",
    "more options",
    "more ideas",
    "different idea",
    "different options",
    "alternatives",
    "another one",
    "another idea",
    "what else",
    "show me more",
    "give me more",
    "try again",
    "fresh ideas",
    "new ideas",
];

fn alternatives_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    let matched =
        ALTERNATIVES_PHRASES.iter().any(|phrase| input.normalized.contains(phrase));
    matched.then(|| DetectedIntent::of(UserIntent::RequestAlternatives))
}

const CLARIFICATION_PHRASES: &[&str] = &[
    "what do you mean",
    "what does that mean",
    "how does this work",
    "how does that work",
    "i don't understand",
    "i dont understand",
    "i'm not sure what",
    "im not sure what",
    "i'm confused",
    "im confused",
    "can you explain",
    "could you explain",
    "help me understand",
    "what is a",
    "what's a",
    "what is an",
];

fn clarification_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    let matched =
        CLARIFICATION_PHRASES.iter().any(|phrase| input.normalized.contains(phrase));
    matched.then(|| DetectedIntent::of(UserIntent::RequestClarification))
}

const SHOW_PROGRESS_PHRASES: &[&str] = &[
    "what have we got",
    "what have we",
    "what do we have",
    "show me what we have",
    "where are we",
    "show progress",
    "progress so far",
    "summary so far",
    "recap",
    "what's captured",
    "whats captured",
];

fn show_progress_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    let matched =
        SHOW_PROGRESS_PHRASES.iter().any(|phrase| input.normalized.contains(phrase));
    matched.then(|| DetectedIntent::of(UserIntent::ShowProgress))
}

const MODIFY_VERBS: &[&str] =
    &["change", "edit", "revise", "update", "rework", "redo", "rewrite", "fix"];

fn modify_rule(input: &RuleInput<'_>) -> Option<DetectedIntent> {
    let has_verb = input.tokens.iter().any(|token| MODIFY_VERBS.contains(&token.as_str()))
        || input.normalized.contains("go back to");
    if !has_verb {
        return None;
    }

    let target = if input.normalized.contains("big idea") {
        Stage::BigIdea
    } else if input.normalized.contains("essential question")
        || input.normalized.contains("question")
    {
        Stage::EssentialQuestion
    } else if input.normalized.contains("challenge") {
        Stage::Challenge
    } else {
        return None;
    };

    // "change the big idea to X" carries the replacement inline.
    let extracted_value = input
        .payload
        .to_ascii_lowercase()
        .find(" to ")
        .map(|at| input.payload[at + 4..].trim().to_string())
        .filter(|value| token_count(value) >= 2);

    Some(DetectedIntent {
        extracted_value,
        modify_target: Some(target),
        ..DetectedIntent::of(UserIntent::ModifyPrevious)
    })
}
