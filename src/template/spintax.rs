//! Spintax expansion and variable substitution engine

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::types::{Bindings, ChoiceSource, RenderedMessage};

lazy_static! {
    /// `{a|b|c}` with no nested braces
    pub(crate) static ref CHOICE_GROUP: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
    /// `[[name]]`
    pub(crate) static ref VARIABLE_REF: Regex = Regex::new(r"\[\[([^\]]+)\]\]").unwrap();
}

/// Resolve every choice group to one of its options.
///
/// Options are trimmed but not deduplicated, and an option that trims to
/// empty is a legal choice. Malformed groups are left untouched.
pub fn expand(template: &str, choice: &mut dyn ChoiceSource) -> String {
    CHOICE_GROUP
        .replace_all(template, |caps: &Captures<'_>| {
            let options: Vec<&str> = caps[1].split('|').map(str::trim).collect();
            let index = choice.choose(options.len()).min(options.len() - 1);
            options[index].to_string()
        })
        .into_owned()
}

/// Replace `[[name]]` references with their binding, or with nothing when
/// unbound. Returns the text and the distinct names referenced.
pub fn substitute(text: &str, bindings: &Bindings) -> (String, Vec<String>) {
    let mut referenced: Vec<String> = Vec::new();

    let rendered = VARIABLE_REF
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            if !referenced.iter().any(|seen| seen == name) {
                referenced.push(name.to_string());
            }
            bindings.get(name).cloned().unwrap_or_default()
        })
        .into_owned();

    (rendered, referenced)
}

/// Expand, then substitute, then trim.
pub fn render(template: &str, bindings: &Bindings, choice: &mut dyn ChoiceSource) -> RenderedMessage {
    let expanded = expand(template, choice);
    let (text, variables_used) = substitute(&expanded, bindings);

    RenderedMessage {
        text: text.trim().to_string(),
        variables_used,
    }
}

/// Number of distinct selections the template allows.
///
/// Only options that are non-empty after trimming are counted, unlike
/// [`expand`] which may pick an empty option. A group with no non-empty
/// option renders one way and counts as 1. The product saturates.
pub fn count_variations(template: &str) -> u128 {
    CHOICE_GROUP
        .captures_iter(template)
        .map(|caps| {
            let options = caps[1]
                .split('|')
                .filter(|option| !option.trim().is_empty())
                .count();
            options.max(1) as u128
        })
        .fold(1u128, |acc, options| acc.saturating_mul(options))
}

/// Distinct, non-empty variable names in first-occurrence order
pub fn extract_variable_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for caps in VARIABLE_REF.captures_iter(template) {
        let name = caps[1].trim();
        if !name.is_empty() && !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Render `count` times and keep the distinct results in order.
///
/// Stops after `count` attempts, so collisions shorten the list.
pub fn preview(
    template: &str,
    sample_bindings: &Bindings,
    count: usize,
    choice: &mut dyn ChoiceSource,
) -> Vec<String> {
    let mut previews: Vec<String> = Vec::with_capacity(count);

    for _ in 0..count {
        let rendered = render(template, sample_bindings, choice);
        if !previews.contains(&rendered.text) {
            previews.push(rendered.text);
        }
    }

    previews
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::{SequenceChoice, ThreadChoice};

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_picks_scripted_options() {
        let mut choice = SequenceChoice::new([1, 0]);
        let result = expand("{Hi|Hello} there, {friend|pal}!", &mut choice);
        assert_eq!(result, "Hello there, friend!");
    }

    #[test]
    fn test_expand_trims_options_and_allows_empty() {
        let mut choice = SequenceChoice::new([1]);
        assert_eq!(expand("a{ x |  }b", &mut choice), "ab");

        let mut choice = SequenceChoice::new([0]);
        assert_eq!(expand("a{ x |  }b", &mut choice), "axb");
    }

    #[test]
    fn test_expand_leaves_malformed_groups() {
        let mut choice = SequenceChoice::new([0]);
        assert_eq!(expand("open { only", &mut choice), "open { only");
        assert_eq!(expand("empty {} group", &mut choice), "empty {} group");
        // Inner group resolves, outer brace stays literal
        assert_eq!(expand("{{a|b}", &mut choice), "{a");
    }

    #[test]
    fn test_substitute_bound_and_unbound() {
        let vars = bindings(&[("nama", "Budi")]);
        let (text, used) = substitute("Hi [[nama]], from [[ sender ]] and [[nama]]", &vars);
        assert_eq!(text, "Hi Budi, from  and Budi");
        assert_eq!(used, vec!["nama".to_string(), "sender".to_string()]);
    }

    #[test]
    fn test_variable_inside_choice_option() {
        let vars = bindings(&[("nama", "Sari")]);
        let mut choice = SequenceChoice::new([1]);
        let rendered = render("{Halo|Hai [[nama]]}", &vars, &mut choice);
        assert_eq!(rendered.text, "Hai Sari");
        assert_eq!(rendered.variables_used, vec!["nama".to_string()]);
    }

    #[test]
    fn test_render_plain_text_is_trimmed_identity() {
        let mut choice = ThreadChoice;
        let template = "   plain message with no markup \n";
        let rendered = render(template, &Bindings::new(), &mut choice);
        assert_eq!(rendered.text, template.trim());
        assert!(rendered.variables_used.is_empty());
    }

    #[test]
    fn test_render_unbound_name_renders_empty() {
        let mut choice = ThreadChoice;
        let rendered = render("Hi [[nama]]", &Bindings::new(), &mut choice);
        assert_eq!(rendered.text, "Hi");
    }

    #[test]
    fn test_render_randomness_produces_variety() {
        let mut choice = ThreadChoice;
        let template = "{a|b|c|d} {e|f|g|h}";
        let outputs: std::collections::HashSet<String> = (0..200)
            .map(|_| render(template, &Bindings::new(), &mut choice).text)
            .collect();
        assert!(outputs.len() > 1);
    }

    #[test]
    fn test_count_variations() {
        assert_eq!(count_variations("no groups"), 1);
        assert_eq!(count_variations("{a|b} {c|d|e}"), 6);
        // Empty options are not counted
        assert_eq!(count_variations("{a| |b}"), 2);
        // Separator-only group counts as a single rendering
        assert_eq!(count_variations("{||} {x|y}"), 2);
    }

    #[test]
    fn test_count_variations_saturates() {
        let template = "{a|b|c|d|e|f|g|h|i|j}".repeat(60);
        assert_eq!(count_variations(&template), u128::MAX);
    }

    #[test]
    fn test_extract_variable_names_dedup_in_order() {
        let names = extract_variable_names("[[b]] [[a]] [[ b ]] [[c]] [[a]] [[ ]]");
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_preview_dedups_and_caps_attempts() {
        let vars = bindings(&[("nama", "Contoh Nama")]);
        let mut choice = SequenceChoice::new([0, 0, 1]);
        let previews = preview("{Hi|Hey} [[nama]]", &vars, 3, &mut choice);
        assert_eq!(previews, vec!["Hi Contoh Nama", "Hey Contoh Nama"]);

        let mut choice = ThreadChoice;
        let previews = preview("static", &vars, 5, &mut choice);
        assert_eq!(previews, vec!["static"]);
    }
}
