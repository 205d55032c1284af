//! Trailer parsing for commit messages and note bodies.
//!
//! A trailer block is the last paragraph of a message when every line in it
//! is either `Key: value` or an indented continuation of the previous value:
//!
//! ```text
//! Fix the flux capacitor
//!
//! Release-Channel: beta
//! Reviewed-by: Jane Doe <jdoe@example.org>
//! ```

use regex::Regex;
use std::sync::OnceLock;

/// A single `key: value` pair from a trailer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub key: String,
    pub value: String,
}

fn trailer_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(BREAKING CHANGE|[A-Za-z0-9][A-Za-z0-9_-]*):\s*(.*)$").ok())
        .as_ref()
}

/// Parse the trailers of `message`, in order of appearance.
///
/// Returns an empty list when the last paragraph is not a trailer block.
pub fn parse_trailers(message: &str) -> Vec<Trailer> {
    let lines: Vec<&str> = message.trim_end().lines().collect();
    let start = lines
        .iter()
        .rposition(|line| line.trim().is_empty())
        .map_or(0, |blank| blank + 1);

    let mut trailers: Vec<Trailer> = Vec::new();
    for line in &lines[start..] {
        if line.starts_with([' ', '\t']) {
            // Continuation of the previous value
            match trailers.last_mut() {
                Some(previous) => {
                    previous.value.push(' ');
                    previous.value.push_str(line.trim());
                }
                None => return Vec::new(),
            }
            continue;
        }

        match trailer_pattern().and_then(|pattern| pattern.captures(line)) {
            Some(caps) => trailers.push(Trailer {
                key: caps[1].to_string(),
                value: caps[2].trim_end().to_string(),
            }),
            None => return Vec::new(),
        }
    }

    trailers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_trailing_block() {
        let message = "Fix the thing\n\nLonger body here.\n\nRelease-Channel: beta\nTicket: ABC-12\n";
        let trailers = parse_trailers(message);
        assert_eq!(
            trailers,
            vec![
                Trailer {
                    key: "Release-Channel".into(),
                    value: "beta".into()
                },
                Trailer {
                    key: "Ticket".into(),
                    value: "ABC-12".into()
                },
            ]
        );
    }

    #[test]
    fn test_whole_message_can_be_trailers() {
        let trailers = parse_trailers("Checklist: done\nQA: passed");
        assert_eq!(trailers.len(), 2);
        assert_eq!(trailers[1].value, "passed");
    }

    #[test]
    fn test_body_paragraph_is_not_a_trailer_block() {
        assert!(parse_trailers("Subject\n\nJust some prose: with a colon\nand more prose").is_empty());
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let trailers = parse_trailers("Notes: first part\n  second part");
        assert_eq!(trailers[0].value, "first part second part");
    }

    #[test]
    fn test_breaking_change_key() {
        let trailers = parse_trailers("feat: x\n\nBREAKING CHANGE: removes y");
        assert_eq!(trailers[0].key, "BREAKING CHANGE");
    }
}
