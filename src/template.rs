//! Named-placeholder templates.
//!
//! A template is literal text with `{name}` placeholders. `{{` and `}}` write
//! literal braces. Nothing else is interpreted: rendering only substitutes
//! values looked up by name, so configuration text is never evaluated.
//!
//! Templates parse when the configuration is deserialized; which names are
//! allowed depends on where a template is used and is checked by
//! [`Template::check_placeholders`] during configuration validation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised when template text is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// `{` without matching `}`.
    #[error("unclosed '{{' at byte {position} in template {template:?}")]
    Unclosed {
        /// Template text.
        template: String,
        /// Byte offset of the opening brace.
        position: usize,
    },
    /// `}` without matching `{`.
    #[error("unmatched '}}' at byte {position} in template {template:?}")]
    Unmatched {
        /// Template text.
        template: String,
        /// Byte offset of the closing brace.
        position: usize,
    },
    /// Placeholder name is not an identifier.
    #[error("invalid placeholder name {name:?} in template {template:?}")]
    InvalidName {
        /// Template text.
        template: String,
        /// Offending name.
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &source[i + 1..];
                    let end = rest.find('}').ok_or_else(|| TemplateError::Unclosed {
                        template: source.to_string(),
                        position: i,
                    })?;
                    let name = &rest[..end];
                    if !is_identifier(name) {
                        return Err(TemplateError::InvalidName {
                            template: source.to_string(),
                            name: name.to_string(),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                    // Skip the name and the closing brace.
                    for _ in 0..=name.chars().count() {
                        chars.next();
                    }
                }
                '}' => {
                    return Err(TemplateError::Unmatched {
                        template: source.to_string(),
                        position: i,
                    })
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Original template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (with repetitions).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the template references `name`.
    pub fn references(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Return the first placeholder not in `allowed`.
    pub fn check_placeholders(&self, allowed: &[&str]) -> Result<(), String> {
        match self.placeholders().find(|p| !allowed.contains(p)) {
            Some(unknown) => Err(unknown.to_string()),
            None => Ok(()),
        }
    }

    /// Substitute placeholders. Names the lookup does not know render as
    /// nothing.
    pub fn render<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    if let Some(value) = lookup(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            source: String::new(),
            segments: Vec::new(),
        }
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Template> for String {
    fn from(template: Template) -> Self {
        template.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
