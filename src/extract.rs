//! Extraction Layer
//!
//! Turns evaluation results into the strings callers see. Element values
//! follow the "end of open tag to first `</`" rule: nested markup inside a
//! value is returned as-is.

use crate::core::entities::decode_text;
use crate::core::scanner::is_whitespace;
use crate::error::TimestampError;
use crate::index::{TokenIndex, TokenKind};
use crate::xpath::{EvalResult, Match};
use chrono::{DateTime, NaiveDateTime};
use memchr::memmem;
use std::borrow::Cow;
use std::collections::HashSet;

/// Converts matches into caller-facing values
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    index: &'a TokenIndex,
    input: &'a [u8],
    raw_fields: &'a HashSet<String>,
}

impl<'a> Extractor<'a> {
    pub fn new(index: &'a TokenIndex, input: &'a [u8], raw_fields: &'a HashSet<String>) -> Self {
        Extractor {
            index,
            input,
            raw_fields,
        }
    }

    /// Scalar value of an evaluation result; `""` when nothing matched
    pub fn value_of(&self, result: &EvalResult, xpath: &str) -> String {
        match result {
            EvalResult::Single(m) => self.value(*m, xpath),
            EvalResult::List(matches) => matches
                .first()
                .map(|m| self.value(*m, xpath))
                .unwrap_or_default(),
            EvalResult::Number(n) => n.to_string(),
            EvalResult::Boolean(b) => b.to_string(),
            EvalResult::Missing => String::new(),
        }
    }

    /// Verbatim markup of an evaluation result; `""` when nothing matched
    pub fn block_of(&self, result: &EvalResult) -> String {
        match result {
            EvalResult::Single(m) => self.block(*m),
            EvalResult::List(matches) => matches.first().map(|m| self.block(*m)).unwrap_or_default(),
            EvalResult::Number(n) => n.to_string(),
            EvalResult::Boolean(b) => b.to_string(),
            EvalResult::Missing => String::new(),
        }
    }

    /// Text between the open tag and the first `</`, unescaped unless raw
    pub fn value(&self, m: Match, xpath: &str) -> String {
        let idx = match m {
            Match::Element(idx) => idx,
            Match::Attribute { .. } => return self.attribute(m),
        };
        let Some(elem) = self.index.get_element(idx) else {
            return String::new();
        };
        if elem.is_empty() {
            return String::new();
        }

        let content = &self.input[elem.content_start as usize..elem.fragment.end as usize];
        let end = memmem::find(content, b"</").unwrap_or(content.len());
        let text = String::from_utf8_lossy(&content[..end]);

        if self.is_raw(idx, xpath) {
            text.trim().to_string()
        } else {
            decode_text(&text).trim().to_string()
        }
    }

    /// The matched element's full span, trimmed, never unescaped
    pub fn block(&self, m: Match) -> String {
        match m {
            Match::Element(idx) => self
                .index
                .fragment(idx)
                .map(|f| String::from_utf8_lossy(f.slice(self.input)).trim().to_string())
                .unwrap_or_default(),
            Match::Attribute { .. } => self.attribute(m),
        }
    }

    /// Raw attribute value, trimmed
    pub fn attribute(&self, m: Match) -> String {
        match m {
            Match::Attribute { value, .. } => self
                .index
                .token(value)
                .map(|t| String::from_utf8_lossy(t.span.slice(self.input)).trim().to_string())
                .unwrap_or_default(),
            Match::Element(_) => String::new(),
        }
    }

    /// List entry for a match: elements without immediate text are skipped
    pub fn list_value(&self, m: Match, xpath: &str) -> Option<String> {
        match m {
            Match::Element(idx) => {
                let has_text = self.index.get_element(idx).is_some_and(|e| e.has_text());
                has_text.then(|| self.value(m, xpath))
            }
            Match::Attribute { .. } => Some(self.attribute(m)),
        }
    }

    /// All descendant text and CDATA, decoded, without separators
    pub fn concatenated(&self, m: Match) -> String {
        let idx = match m {
            Match::Element(idx) => idx,
            Match::Attribute { .. } => return self.attribute(m),
        };

        let mut out = String::new();
        for token in self.index.character_data(idx) {
            let text = String::from_utf8_lossy(token.span.slice(self.input));
            if token.kind == TokenKind::Text && token.needs_decode() {
                out.push_str(&decode_text(&text));
            } else {
                out.push_str(&text);
            }
        }
        out.trim().to_string()
    }

    /// Raw fields match on qualified name, local name or the queried path
    fn is_raw(&self, idx: u32, xpath: &str) -> bool {
        if self.raw_fields.is_empty() {
            return false;
        }
        self.raw_fields.contains(xpath)
            || self
                .index
                .element_name(idx, self.input)
                .is_some_and(|n| self.raw_fields.contains(n))
            || self
                .index
                .element_local_name(idx, self.input)
                .is_some_and(|n| self.raw_fields.contains(n))
    }

    /// (qualified name, text) for every element with immediate text, in
    /// document order
    ///
    /// Raw fields keep their text as written; everything else is decoded
    /// with whitespace collapsed. CDATA is always verbatim.
    pub fn fields(&self) -> impl Iterator<Item = (String, String)> + 'a {
        let this = *self;
        (0..self.index.element_count() as u32).filter_map(move |idx| {
            let elem = this.index.get_element(idx)?;
            let token = this.index.token(elem.first_text)?;
            let name = this.index.element_name(idx, this.input)?.to_string();
            let text = String::from_utf8_lossy(token.span.slice(this.input));

            let value = if token.kind == TokenKind::CData || this.raw_fields.contains(&name) {
                text.into_owned()
            } else {
                normalize(&text)
            };
            Some((name, value))
        })
    }
}

const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const OFFSET_INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Decode entities, collapse whitespace runs to one space, trim
pub fn normalize(text: &str) -> String {
    let decoded: Cow<'_, str> = decode_text(text);
    decoded.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an ISO-8601 instant into epoch milliseconds
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.fff]` followed by `Z` or a `+HH:MM`
/// offset. The `T` separator and `Z` designator are uppercase only, and no
/// whitespace is allowed anywhere.
pub fn parse_timestamp(value: &str) -> Result<i64, TimestampError> {
    let error = |source| TimestampError {
        value: value.to_string(),
        source,
    };
    // chrono skips whitespace before numeric fields
    if value.bytes().any(is_whitespace) {
        return Err(error(None));
    }

    let parsed = match value.strip_suffix('Z') {
        Some(local) => NaiveDateTime::parse_from_str(local, INSTANT_FORMAT).map(|dt| dt.and_utc().timestamp_millis()),
        None => DateTime::parse_from_str(value, OFFSET_INSTANT_FORMAT).map(|dt| dt.timestamp_millis()),
    };
    parsed.map_err(|e| error(Some(e)))
}
