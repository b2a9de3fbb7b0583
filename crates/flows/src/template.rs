//! `{variable}` interpolation for reply templates.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("static placeholder regex"))
}

/// Replace every `{name}` with the session variable of that name.
///
/// Unknown variables render as empty text.  Braces that do not wrap a
/// plain identifier (`{ }`, `{a b}`, a lone `{`) are left untouched.
pub fn render(template: &str, variables: &BTreeMap<String, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Variable names referenced by a template, in order of appearance.
pub fn referenced_variables(template: &str) -> Vec<&str> {
    placeholder()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}
