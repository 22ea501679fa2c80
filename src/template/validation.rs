//! Heuristic template linter.
//!
//! Counts and pattern checks only. A clean result does not prove the
//! template renders the way the author intended.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::TemplateIssue;

lazy_static! {
    static ref EMPTY_GROUP: Regex = Regex::new(r"\{\s*\}").unwrap();
    static ref EMPTY_VARIABLE: Regex = Regex::new(r"\[\[\s*\]\]").unwrap();
    static ref SEPARATOR_ONLY_GROUP: Regex = Regex::new(r"\{\|+\}").unwrap();
}

/// Lint a template, returning every issue found (each kind at most once)
pub fn validate(template: &str) -> Vec<TemplateIssue> {
    let mut issues = Vec::new();

    let open_braces = template.matches('{').count();
    let close_braces = template.matches('}').count();
    if open_braces != close_braces {
        issues.push(TemplateIssue::UnbalancedBraces);
    }

    let open_brackets = template.matches("[[").count();
    let close_brackets = template.matches("]]").count();
    if open_brackets != close_brackets {
        issues.push(TemplateIssue::UnbalancedBrackets);
    }

    if EMPTY_GROUP.is_match(template) {
        issues.push(TemplateIssue::EmptyChoiceGroup);
    }

    if EMPTY_VARIABLE.is_match(template) {
        issues.push(TemplateIssue::EmptyVariable);
    }

    if SEPARATOR_ONLY_GROUP.is_match(template) {
        issues.push(TemplateIssue::SeparatorOnlyGroup);
    }

    issues
}
