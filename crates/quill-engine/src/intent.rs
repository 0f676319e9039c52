//! Classifies one line of user input into an [`Intent`].
//!
//! A line starting with `/` and a single command letter is a command:
//!
//! ```text
//! /e<N> <text>   edit the N-th user message (most recent when N is omitted)
//! /c<N>          copy conversation entry N (last entry when N is omitted)
//! /s <target>    save the conversation
//! /l <target>    load a conversation, replacing the current one
//! /r             retry the pending request
//! ```
//!
//! Anything else, including malformed commands, is a plain message.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Message,
    Edit,
    Copy,
    Save,
    Load,
    Retry,
}

/// Structured form of one input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub index: Option<usize>,
    pub payload: String,
}

impl Intent {
    /// A plain message carrying the whole input
    pub fn message(payload: impl Into<String>) -> Self {
        Self {
            kind: IntentKind::Message,
            index: None,
            payload: payload.into(),
        }
    }
}

/// Letter, optional index, then end of input or whitespace and a payload.
static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^/([ecslr])(\d+)?(?:\s+(.*))?$").expect("command pattern is valid")
});

/// Parse a raw input line. Never fails.
pub fn parse_intent(input: &str) -> Intent {
    let Some(caps) = COMMAND_PATTERN.captures(input) else {
        return Intent::message(input);
    };

    let index = match caps.get(2) {
        Some(digits) => match digits.as_str().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => return Intent::message(input),
        },
        None => None,
    };
    let payload = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let kind = match &caps[1] {
        "e" => IntentKind::Edit,
        "c" => IntentKind::Copy,
        "s" => IntentKind::Save,
        "l" => IntentKind::Load,
        "r" => IntentKind::Retry,
        _ => return Intent::message(input),
    };

    // An edit needs replacement text and a load needs somewhere to load from
    if matches!(kind, IntentKind::Edit | IntentKind::Load) && payload.is_empty() {
        return Intent::message(input);
    }
    // Retry takes no arguments
    if kind == IntentKind::Retry && (index.is_some() || !payload.is_empty()) {
        return Intent::message(input);
    }

    Intent {
        kind,
        index,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_with_index() {
        assert_eq!(
            parse_intent("/e1 new text"),
            Intent {
                kind: IntentKind::Edit,
                index: Some(1),
                payload: "new text".into(),
            }
        );
    }

    #[test]
    fn test_plain_message() {
        assert_eq!(
            parse_intent("hello"),
            Intent {
                kind: IntentKind::Message,
                index: None,
                payload: "hello".into(),
            }
        );
    }

    #[test]
    fn test_edit_without_index() {
        let intent = parse_intent("/e try this instead");
        assert_eq!(intent.kind, IntentKind::Edit);
        assert_eq!(intent.index, None);
        assert_eq!(intent.payload, "try this instead");
    }

    #[test]
    fn test_edit_keeps_multiline_payload() {
        let intent = parse_intent("/e0 first line\nsecond line");
        assert_eq!(intent.kind, IntentKind::Edit);
        assert_eq!(intent.payload, "first line\nsecond line");
    }

    #[test]
    fn test_edit_without_text_is_message() {
        assert_eq!(parse_intent("/e2"), Intent::message("/e2"));
        assert_eq!(parse_intent("/e2   "), Intent::message("/e2   "));
    }

    #[test]
    fn test_copy() {
        let intent = parse_intent("/c3");
        assert_eq!(intent.kind, IntentKind::Copy);
        assert_eq!(intent.index, Some(3));
        assert_eq!(intent.payload, "");

        let intent = parse_intent("/c");
        assert_eq!(intent.kind, IntentKind::Copy);
        assert_eq!(intent.index, None);
    }

    #[test]
    fn test_save_and_load() {
        let intent = parse_intent("/s notes.json");
        assert_eq!(intent.kind, IntentKind::Save);
        assert_eq!(intent.payload, "notes.json");

        let intent = parse_intent("/s");
        assert_eq!(intent.kind, IntentKind::Save);
        assert_eq!(intent.payload, "");

        let intent = parse_intent("/l  notes.json ");
        assert_eq!(intent.kind, IntentKind::Load);
        assert_eq!(intent.payload, "notes.json");
    }

    #[test]
    fn test_load_without_target_is_message() {
        assert_eq!(parse_intent("/l"), Intent::message("/l"));
    }

    #[test]
    fn test_retry() {
        let intent = parse_intent("/r");
        assert_eq!(intent.kind, IntentKind::Retry);
        assert_eq!(intent.index, None);
    }

    #[test]
    fn test_retry_with_arguments_is_message() {
        let input = "/r rust is a great subreddit";
        assert_eq!(parse_intent(input), Intent::message(input));
        assert_eq!(parse_intent("/r5"), Intent::message("/r5"));
        assert_eq!(parse_intent("/r extra"), Intent::message("/r extra"));
    }

    #[test]
    fn test_letter_glued_to_text_is_message() {
        assert_eq!(parse_intent("/cat is cute"), Intent::message("/cat is cute"));
        assert_eq!(parse_intent("/e1x text"), Intent::message("/e1x text"));
    }

    #[test]
    fn test_unknown_command_is_message() {
        assert_eq!(parse_intent("/x1 hi"), Intent::message("/x1 hi"));
        assert_eq!(parse_intent("/"), Intent::message("/"));
    }

    #[test]
    fn test_index_overflow_is_message() {
        let input = "/e99999999999999999999999999 text";
        assert_eq!(parse_intent(input), Intent::message(input));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_intent(""), Intent::message(""));
    }

    #[test]
    fn test_command_must_lead() {
        assert_eq!(parse_intent(" /r"), Intent::message(" /r"));
    }
}
