//! Template types: randomness sources, lint issues and render results

use std::collections::HashMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;

/// Variable bindings used when substituting `[[name]]` references
pub type Bindings = HashMap<String, String>;

/// Source of choice-group selections.
///
/// `choose` returns an index in `0..len`; `len` is always at least 1.
pub trait ChoiceSource {
    fn choose(&mut self, len: usize) -> usize;
}

/// Uniform selection backed by the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadChoice;

impl ChoiceSource for ThreadChoice {
    fn choose(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

/// Replays a fixed sequence of indices, wrapping around when exhausted.
///
/// Each index is reduced modulo the group size, so `SequenceChoice::new([1])`
/// always picks the second option of every group that has one.
#[derive(Debug, Clone)]
pub struct SequenceChoice {
    indices: Vec<usize>,
    cursor: usize,
}

impl SequenceChoice {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            cursor: 0,
        }
    }
}

impl ChoiceSource for SequenceChoice {
    fn choose(&mut self, len: usize) -> usize {
        if self.indices.is_empty() || len == 0 {
            return 0;
        }
        let index = self.indices[self.cursor % self.indices.len()];
        self.cursor += 1;
        index % len
    }
}

/// Output of rendering one template against one binding set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    /// Final text, trimmed
    pub text: String,
    /// Variable names referenced by the template, first-occurrence order
    pub variables_used: Vec<String>,
}

/// A syntax warning reported by the template linter.
///
/// Issues never block rendering; they are surfaced to the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateIssue {
    /// Count of `{` differs from count of `}`
    UnbalancedBraces,
    /// Count of `[[` differs from count of `]]`
    UnbalancedBrackets,
    /// A `{}` group with whitespace-only content
    EmptyChoiceGroup,
    /// A `[[ ]]` reference with whitespace-only content
    EmptyVariable,
    /// A group made only of separators, like `{||}`
    SeparatorOnlyGroup,
}

impl TemplateIssue {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TemplateIssue::UnbalancedBraces => "UNBALANCED_BRACES",
            TemplateIssue::UnbalancedBrackets => "UNBALANCED_BRACKETS",
            TemplateIssue::EmptyChoiceGroup => "EMPTY_CHOICE_GROUP",
            TemplateIssue::EmptyVariable => "EMPTY_VARIABLE",
            TemplateIssue::SeparatorOnlyGroup => "SEPARATOR_ONLY_GROUP",
        }
    }
}

impl fmt::Display for TemplateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            TemplateIssue::UnbalancedBraces => "Opening and closing braces are not balanced",
            TemplateIssue::UnbalancedBrackets => {
                "Opening and closing double brackets are not balanced"
            }
            TemplateIssue::EmptyChoiceGroup => "Found an empty spintax group: {}",
            TemplateIssue::EmptyVariable => "Found an empty variable name: [[]]",
            TemplateIssue::SeparatorOnlyGroup => {
                "Found a spintax group containing only separators: {|||}"
            }
        };
        f.write_str(message)
    }
}

/// Combined view of a template, as shown next to the composer
#[derive(Debug, Clone, Serialize)]
pub struct TemplateAnalysis {
    pub issues: Vec<TemplateIssue>,
    pub variables: Vec<String>,
    /// Saturates at `u128::MAX`
    pub variations: u128,
    pub previews: Vec<String>,
}

impl TemplateAnalysis {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_choice_wraps_and_reduces() {
        let mut choice = SequenceChoice::new([0, 5]);
        assert_eq!(choice.choose(3), 0);
        assert_eq!(choice.choose(3), 2);
        assert_eq!(choice.choose(3), 0);
    }

    #[test]
    fn test_thread_choice_in_range() {
        let mut choice = ThreadChoice;
        for _ in 0..200 {
            assert!(choice.choose(4) < 4);
        }
        assert_eq!(choice.choose(1), 0);
    }

    #[test]
    fn test_issue_codes_are_distinct() {
        let issues = [
            TemplateIssue::UnbalancedBraces,
            TemplateIssue::UnbalancedBrackets,
            TemplateIssue::EmptyChoiceGroup,
            TemplateIssue::EmptyVariable,
            TemplateIssue::SeparatorOnlyGroup,
        ];
        let codes: std::collections::HashSet<_> = issues.iter().map(|i| i.code()).collect();
        assert_eq!(codes.len(), issues.len());
    }
}
