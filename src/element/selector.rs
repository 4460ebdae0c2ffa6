//! Selector resolution
//!
//! Turns prefixed, human-readable selectors (`id:login-button`, `name:q`, `input:email`,
//! `css:.btn`) into CSS the page understands. Resolution never fails: text that is not valid
//! CSS only shows up later, as a wait that never matches.

use std::collections::HashMap;
use std::fmt;

/// Prefix of a selector string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorPrefix {
    Id,
    Name,
    Css,
    Input,
}

impl SelectorPrefix {
    /// Parse a prefix name; matching is exact
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SelectorPrefix::Id),
            "name" => Some(SelectorPrefix::Name),
            "css" => Some(SelectorPrefix::Css),
            "input" => Some(SelectorPrefix::Input),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorPrefix::Id => "id",
            SelectorPrefix::Name => "name",
            SelectorPrefix::Css => "css",
            SelectorPrefix::Input => "input",
        }
    }

    /// Candidate templates used when no strategy overrides them
    fn default_templates(&self) -> &'static [&'static str] {
        match self {
            SelectorPrefix::Id => &["#{value}"],
            SelectorPrefix::Name => &[r#"[name="{attr}"]"#],
            SelectorPrefix::Css => &["{value}"],
            SelectorPrefix::Input => &[r#"input[name="{attr}"]"#, "input#{value}"],
        }
    }
}

impl fmt::Display for SelectorPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed selector: prefix plus raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub prefix: SelectorPrefix,
    pub value: String,
}

impl Selector {
    /// Split `input` at its first `:`
    ///
    /// Without a separator, or when the text before it is not a known prefix, the whole
    /// string is taken as CSS. That keeps pseudo-classes such as `a:hover` intact.
    pub fn parse(input: &str) -> Self {
        if let Some((prefix, value)) = input.split_once(':') {
            if let Some(prefix) = SelectorPrefix::from_name(prefix) {
                return Self {
                    prefix,
                    value: value.to_string(),
                };
            }
        }

        Self {
            prefix: SelectorPrefix::Css,
            value: input.to_string(),
        }
    }

    /// Primary CSS selector for this selector
    pub fn native(&self) -> String {
        render(self.prefix.default_templates()[0], &self.value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.value)
    }
}

/// Resolve a selector string to its primary CSS selector
pub fn resolve(selector: &str) -> String {
    Selector::parse(selector).native()
}

/// Ordered candidate templates per prefix
///
/// A template may contain `{value}` (the raw value) and `{attr}` (the value escaped for a
/// double-quoted attribute string). The waiter tries candidates in order and moves on only
/// when a candidate times out.
#[derive(Debug, Clone)]
pub struct ResolutionStrategy {
    templates: HashMap<SelectorPrefix, Vec<String>>,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        let templates = [
            SelectorPrefix::Id,
            SelectorPrefix::Name,
            SelectorPrefix::Css,
            SelectorPrefix::Input,
        ]
        .into_iter()
        .map(|prefix| {
            let templates = prefix
                .default_templates()
                .iter()
                .map(|t| t.to_string())
                .collect();
            (prefix, templates)
        })
        .collect();

        Self { templates }
    }
}

impl ResolutionStrategy {
    /// Replace the candidate templates of `prefix`
    ///
    /// An empty list restores the built-in templates for that prefix.
    pub fn with_templates(mut self, prefix: SelectorPrefix, templates: &[&str]) -> Self {
        if templates.is_empty() {
            self.templates.remove(&prefix);
        } else {
            self.templates
                .insert(prefix, templates.iter().map(|t| t.to_string()).collect());
        }
        self
    }

    /// Concrete CSS candidates for `selector`, most preferred first
    pub fn candidates(&self, selector: &Selector) -> Vec<String> {
        match self.templates.get(&selector.prefix) {
            Some(templates) => templates
                .iter()
                .map(|template| render(template, &selector.value))
                .collect(),
            None => selector
                .prefix
                .default_templates()
                .iter()
                .map(|template| render(template, &selector.value))
                .collect(),
        }
    }
}

fn render(template: &str, value: &str) -> String {
    template
        .replace("{attr}", &escape_attribute(value))
        .replace("{value}", value)
}

fn escape_attribute(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
