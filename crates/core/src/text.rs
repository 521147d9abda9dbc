//! Shared text preprocessing for the intent classifier and the input
//! quality assessor.

pub fn normalize_text(text: &str) -> String {
    text.trim().to_ascii_lowercase()
}

pub fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || character == '\'' {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_ascii_lowercase()).collect()
}

pub fn token_count(text: &str) -> usize {
    tokenize(text).len()
}

const WRAPPER_PREFIXES: &[&str] = &[
    "what about ",
    "how about we say ",
    "how about ",
    "what if we said ",
    "what if we ",
    "maybe something like ",
    "maybe ",
    "i was thinking ",
    "i think ",
    "let's say ",
    "lets say ",
    "could it be ",
    "could we say ",
];

/// Strips a conversational wrapper ("what about X", "how about we say X")
/// down to its payload. Returns the original trimmed text when no wrapper
/// applies or when stripping would leave nothing substantive.
pub fn strip_conversational_wrapper(text: &str) -> &str {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    for prefix in WRAPPER_PREFIXES {
        if lowered.starts_with(prefix) {
            let payload = trimmed[prefix.len()..].trim().trim_end_matches(['?', '!', '.']);
            if token_count(payload) >= 2 {
                return payload.trim();
            }
        }
    }
    trimmed
}

/// True when the utterance reads as a question: ends with a question mark
/// or opens with an interrogative word.
pub fn reads_as_question(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') {
        return true;
    }
    let first = tokenize(trimmed).into_iter().next().unwrap_or_default();
    matches!(
        first.as_str(),
        "what" | "why" | "how" | "when" | "where" | "who" | "which" | "can" | "could" | "should"
            | "would" | "do" | "does" | "is" | "are"
    )
}

/// Parses an ordinal reference ("second", "2", "option 3") to a zero-based
/// index. Bounded at the suggestion window size; larger numbers are not
/// treated as ordinals. Plain number words ("one", "two") are deliberately
/// excluded: "the last one" and "another one" are not ordinal references.
pub fn parse_ordinal(token: &str) -> Option<usize> {
    let index = match token {
        "first" | "1" | "1st" => 0,
        "second" | "2" | "2nd" => 1,
        "third" | "3" | "3rd" => 2,
        "fourth" | "4" | "4th" => 3,
        "fifth" | "5" | "5th" => 4,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_stripping_unwraps_payload() {
        assert_eq!(
            strip_conversational_wrapper("What about students mapping their watershed?"),
            "students mapping their watershed"
        );
        assert_eq!(
            strip_conversational_wrapper("how about we say design for everyone"),
            "design for everyone"
        );
    }

    #[test]
    fn wrapper_stripping_keeps_short_payloads_wrapped() {
        // "maybe yes" would strip to a single token; leave it alone.
        assert_eq!(strip_conversational_wrapper("maybe yes"), "maybe yes");
        assert_eq!(strip_conversational_wrapper("  plain input  "), "plain input");
    }

    #[test]
    fn question_detection_covers_mark_and_interrogatives() {
        assert!(reads_as_question("How might we reduce waste?"));
        assert!(reads_as_question("why does this matter"));
        assert!(!reads_as_question("Design a zero-waste cafeteria plan"));
    }

    #[test]
    fn ordinals_parse_zero_based_and_reject_large_numbers() {
        assert_eq!(parse_ordinal("second"), Some(1));
        assert_eq!(parse_ordinal("3rd"), Some(2));
        assert_eq!(parse_ordinal("5"), Some(4));
        assert_eq!(parse_ordinal("17"), None);
        assert_eq!(parse_ordinal("one"), None);
        assert_eq!(parse_ordinal("next"), None);
    }

    #[test]
    fn tokenize_keeps_apostrophes_and_lowercases() {
        assert_eq!(tokenize("Let's GO, team!"), vec!["let's", "go", "team"]);
    }
}
