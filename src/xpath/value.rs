//! XPath Value Types
//!
//! What an evaluation produces: a single location, an ordered list of
//! locations, a number, a boolean, or nothing.

/// A location selected by a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Match {
    /// An element, by element index
    Element(u32),
    /// An attribute of `element`; `value` is the AttrValue token index
    Attribute { element: u32, value: u32 },
}

impl Match {
    /// Element the match belongs to
    #[inline]
    pub fn element(&self) -> u32 {
        match *self {
            Match::Element(idx) => idx,
            Match::Attribute { element, .. } => element,
        }
    }
}

/// How many matches the caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First match in document order
    Single,
    /// Every match in document order
    List,
}

/// Result of evaluating a compiled path
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum EvalResult {
    Single(Match),
    /// Matches in document order, without duplicates
    List(Vec<Match>),
    /// Result of `count()`
    Number(usize),
    /// Result of `boolean()`
    Boolean(bool),
    /// Single mode with no match
    Missing,
}

impl EvalResult {
    /// Convert to boolean (XPath boolean() semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            EvalResult::Single(_) => true,
            EvalResult::List(matches) => !matches.is_empty(),
            EvalResult::Number(n) => *n != 0,
            EvalResult::Boolean(b) => *b,
            EvalResult::Missing => false,
        }
    }

    /// Number of selected locations (the value itself for `count()`)
    pub fn to_count(&self) -> usize {
        match self {
            EvalResult::Single(_) => 1,
            EvalResult::List(matches) => matches.len(),
            EvalResult::Number(n) => *n,
            EvalResult::Boolean(b) => usize::from(*b),
            EvalResult::Missing => 0,
        }
    }

    /// Selected locations, empty for scalar results
    pub fn into_matches(self) -> Vec<Match> {
        match self {
            EvalResult::Single(m) => vec![m],
            EvalResult::List(matches) => matches,
            _ => Vec::new(),
        }
    }
}
