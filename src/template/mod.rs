//! Message template engine.
//!
//! This module provides:
//! - Spintax expansion: `{Hi|Hello|Hey}` picks one option per render
//! - Variable substitution: `[[nama]]` is replaced from a binding set
//! - A heuristic linter, variation counting and preview generation
//!
//! Expansion always runs before substitution, so a variable reference may
//! live inside a choice option.
//!
//! # Example
//!
//! ```ignore
//! let mut bindings = Bindings::new();
//! bindings.insert("nama".to_string(), "Budi".to_string());
//!
//! let rendered = render("{Hi|Hello} [[nama]]!", &bindings, &mut ThreadChoice);
//! // "Hi Budi!" or "Hello Budi!"
//! ```

mod spintax;
mod types;
mod validation;

pub use spintax::{count_variations, expand, extract_variable_names, preview, render, substitute};
pub use types::{
    Bindings, ChoiceSource, RenderedMessage, SequenceChoice, TemplateAnalysis, TemplateIssue,
    ThreadChoice,
};
pub use validation::validate;

/// Variable every recipient with a display name is bound to
pub const NAME_VARIABLE: &str = "nama";

/// Value bound to [`NAME_VARIABLE`] when generating previews
pub const SAMPLE_NAME: &str = "Contoh Nama";

/// Number of preview renders made by [`analyze`]
pub const DEFAULT_PREVIEW_COUNT: usize = 3;

/// Bindings used for previews when the caller supplies none
pub fn sample_bindings() -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(NAME_VARIABLE.to_string(), SAMPLE_NAME.to_string());
    bindings
}

/// Lint, inspect and preview a template in one pass
pub fn analyze(
    template: &str,
    sample: &Bindings,
    preview_count: usize,
    choice: &mut dyn ChoiceSource,
) -> TemplateAnalysis {
    TemplateAnalysis {
        issues: validate(template),
        variables: extract_variable_names(template),
        variations: count_variations(template),
        previews: preview(template, sample, preview_count, choice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_combines_results() {
        let mut choice = SequenceChoice::new([0, 1]);
        let analysis = analyze(
            "{Halo|Hai} [[nama]]",
            &sample_bindings(),
            DEFAULT_PREVIEW_COUNT,
            &mut choice,
        );

        assert!(analysis.is_valid());
        assert_eq!(analysis.variables, vec!["nama"]);
        assert_eq!(analysis.variations, 2);
        assert_eq!(analysis.previews, vec!["Halo Contoh Nama", "Hai Contoh Nama"]);
    }

    #[test]
    fn test_analyze_reports_issues_but_still_previews() {
        let mut choice = ThreadChoice;
        let analysis = analyze("Hi {} [[nama]", &Bindings::new(), 2, &mut choice);

        assert!(!analysis.is_valid());
        assert!(analysis.issues.contains(&TemplateIssue::EmptyChoiceGroup));
        assert!(analysis.issues.contains(&TemplateIssue::UnbalancedBrackets));
        assert_eq!(analysis.previews, vec!["Hi {} [[nama]"]);
    }
}
