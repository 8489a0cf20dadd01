//! Acceptance check a draft must pass before it may be posted.

use serde::Serialize;

pub const MIN_WORDS: usize = 100;
pub const TARGET_MAX_WORDS: usize = 200;
/// 20% over the target is still accepted.
pub const HARD_MAX_WORDS: usize = TARGET_MAX_WORDS + TARGET_MAX_WORDS / 5;

const POSITIVE_MARKERS: &[&str] = &[
    "thanks",
    "thank you",
    "great",
    "nice",
    "good",
    "well done",
    "love",
    "like how",
    "appreciate",
    "clean",
    "solid",
    "neat",
];

const SUGGESTION_MARKERS: &[&str] = &[
    "consider",
    "suggest",
    "could",
    "should",
    "instead",
    "might",
    "would",
    "prefer",
    "recommend",
    "how about",
    "can you",
];

pub trait Rubric: Send + Sync {
    fn evaluate(&self, draft: &str) -> RubricVerdict;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RubricVerdict {
    pub word_count: usize,
    pub problems: Vec<String>,
}

impl RubricVerdict {
    pub fn passed(&self) -> bool {
        self.problems.is_empty()
    }

    /// Text handed back to the drafter when the check fails.
    pub fn explanation(&self) -> String {
        if self.passed() {
            return format!("The review passes the rubric ({} words).", self.word_count);
        }
        let mut text = format!(
            "The review does not meet the rubric ({} words):",
            self.word_count
        );
        for problem in &self.problems {
            text.push_str("\n- ");
            text.push_str(problem);
        }
        text
    }
}

/// Mechanical rubric: length band, positive remarks, quoted suggestions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftRubric;

impl Rubric for DraftRubric {
    fn evaluate(&self, draft: &str) -> RubricVerdict {
        let word_count = draft.split_whitespace().count();
        let lower = draft.to_lowercase();
        let mut problems = Vec::new();

        if word_count < MIN_WORDS {
            problems.push(format!(
                "It is too short: write {MIN_WORDS}-{TARGET_MAX_WORDS} words."
            ));
        } else if word_count > HARD_MAX_WORDS {
            problems.push(format!(
                "It is too long: trim it to {MIN_WORDS}-{TARGET_MAX_WORDS} words."
            ));
        }

        if !POSITIVE_MARKERS.iter().any(|m| lower.contains(m)) {
            problems.push("It does not say what is good about the PR.".to_string());
        }

        if !has_quoted_line(draft) {
            problems.push(
                "It does not quote any line from the patch. Quote the lines that could be improved."
                    .to_string(),
            );
        } else if !SUGGESTION_MARKERS.iter().any(|m| lower.contains(m)) {
            problems.push("It quotes lines but does not suggest how to improve them.".to_string());
        }

        RubricVerdict {
            word_count,
            problems,
        }
    }
}

/// Backtick spans, fenced blocks, `>` blockquotes or double-quoted text.
fn has_quoted_line(draft: &str) -> bool {
    if draft.contains("```") {
        return true;
    }
    if draft
        .lines()
        .any(|line| line.trim_start().starts_with('>') && line.trim_start().len() > 1)
    {
        return true;
    }
    has_closed_span(draft, '`') || has_closed_span(draft, '"')
}

fn has_closed_span(text: &str, delimiter: char) -> bool {
    let parts: Vec<&str> = text.split(delimiter).collect();
    // Odd parts sit between delimiters, but only when another part follows.
    (1..parts.len().saturating_sub(1))
        .step_by(2)
        .any(|i| !parts[i].trim().is_empty())
}
