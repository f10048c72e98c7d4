//! Atoms: ground facts as returned by the solver.

use serde::{Serialize, Serializer};
use std::fmt;

/// Error raised when the text form of an atom cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtomParseError {
    /// Empty input.
    #[error("empty atom")]
    Empty,
    /// Parentheses or quotes do not balance.
    #[error("unbalanced atom text: {0}")]
    Unbalanced(String),
}

/// A single argument of an atom.
///
/// Ordering follows the solver's term order: numbers, then symbolic terms,
/// then strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Integer term.
    Int(i64),
    /// Constant or compound term, kept in its textual form (`alice`, `f(1,x)`).
    Sym(String),
    /// Quoted string term, unescaped.
    Str(String),
}

impl Value {
    /// Parse a single term.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(n) = text.parse::<i64>() {
            return Self::Int(n);
        }
        if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            return Self::Str(unescape(&text[1..text.len() - 1]));
        }
        Self::Sym(text.to_string())
    }

    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Text used to look up a label for this value.
    ///
    /// Strings are looked up by their unquoted content, so `"alice"` and
    /// `alice` resolve to the same configured label.
    pub fn key(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Sym(s) | Self::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Sym(s) => f.write_str(s),
            Self::Str(s) => write!(f, "\"{}\"", escape(s)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i64(*n),
            // Strings keep their quotes so `"a"` and `a` never hash alike.
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

/// A ground fact: predicate name and ordered arguments.
///
/// Serializes as `{"predicate": ..., "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Atom {
    /// Predicate name (may be empty for tuple terms).
    pub predicate: String,
    /// Ordered argument tuple.
    pub args: Vec<Value>,
}

impl Atom {
    /// Create an atom.
    pub fn new(predicate: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// `predicate/arity` signature.
    pub fn signature(&self) -> String {
        format!("{}/{}", self.predicate, self.arity())
    }

    /// Parse the textual form printed by the solver, e.g. `assign(alice,"x",f(1,2))`.
    pub fn parse(text: &str) -> Result<Self, AtomParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AtomParseError::Empty);
        }
        let Some(open) = text.find('(') else {
            return Ok(Self::new(text, Vec::new()));
        };
        if !text.ends_with(')') {
            return Err(AtomParseError::Unbalanced(text.to_string()));
        }
        let predicate = &text[..open];
        let inner = &text[open + 1..text.len() - 1];
        let args = split_top_level(inner)
            .ok_or_else(|| AtomParseError::Unbalanced(text.to_string()))?
            .into_iter()
            .map(Value::parse)
            .collect();
        Ok(Self::new(predicate, args))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// One satisfying assignment as returned by the solver.
///
/// Atom order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSolution {
    /// Atoms of the answer set.
    pub atoms: Vec<Atom>,
    /// Optimization costs, highest priority first. Empty without optimization.
    pub costs: Vec<i64>,
}

impl RawSolution {
    /// Create a solution without costs.
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            costs: Vec::new(),
        }
    }

    /// Attach optimization costs.
    pub fn with_costs(mut self, costs: Vec<i64>) -> Self {
        self.costs = costs;
        self
    }

    /// Parse a solution from atom texts.
    pub fn from_texts<I, S>(texts: I) -> Result<Self, AtomParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let atoms = texts
            .into_iter()
            .map(|t| Atom::parse(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(atoms))
    }
}

/// Split on commas that are outside parentheses and quotes.
fn split_top_level(inner: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_string {
        return None;
    }
    parts.push(&inner[start..]);
    Some(parts)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}
