//! Index Builder
//!
//! Builds a TokenIndex from tokenizer events.
//! Implements the ScanHandler trait for use with the strict Tokenizer.

use super::element::{element_flags, prefix_len, token_flags, IndexElement, Token, TokenKind, NO_NODE};
use super::span::{Fragment, Span};
use super::structural::TokenIndex;
use crate::core::scanner::is_whitespace;
use crate::core::tokenizer::{ScanHandler, Tokenizer};
use crate::error::ParseError;

/// One open element during the scan
struct OpenElement {
    idx: u32,
    /// Last child element linked so far
    last_child: u32,
}

/// Builder state for constructing a TokenIndex
pub struct IndexBuilder<'a> {
    /// The index being built
    index: TokenIndex,
    input: &'a [u8],
    /// Stack of open elements
    stack: Vec<OpenElement>,
}

impl<'a> IndexBuilder<'a> {
    /// Create a new builder for the given input
    pub fn new(input: &'a [u8]) -> Self {
        // Estimate capacity based on input size
        // ~1 element per 35 bytes, ~3 tokens per element (tag, end tag, text)
        let estimated_elements = (input.len() / 35).max(16);
        let estimated_tokens = estimated_elements * 3;

        Self {
            index: TokenIndex::with_capacity(estimated_tokens, estimated_elements),
            input,
            stack: Vec::with_capacity(32),
        }
    }

    /// Finish building and return the index
    pub fn finish(mut self) -> TokenIndex {
        // Release over-allocated capacity from initial estimates.
        self.index.shrink_to_fit();

        log::debug!(
            "indexed {} bytes: {} tokens, {} elements",
            self.input.len(),
            self.index.token_count(),
            self.index.element_count()
        );

        self.index
    }

    /// Get the current parent element index
    #[inline]
    fn current_parent(&self) -> u32 {
        self.stack.last().map(|o| o.idx).unwrap_or(NO_NODE)
    }

    /// Link a new element into its parent's child list
    fn link_child(&mut self, child: u32) {
        let Some(open) = self.stack.last_mut() else {
            return;
        };
        let parent = open.idx;
        let prev = std::mem::replace(&mut open.last_child, child);

        if prev == NO_NODE {
            if let Some(p) = self.index.get_element_mut(parent) {
                p.first_child = child;
            }
        } else if let Some(s) = self.index.get_element_mut(prev) {
            s.next_sibling = child;
        }
    }

    /// Record the first immediate character data token of the open element
    fn note_text(&mut self, token: u32) {
        let parent = self.current_parent();
        if let Some(p) = self.index.get_element_mut(parent) {
            if p.first_text == NO_NODE {
                p.first_text = token;
            }
        }
    }
}

// ============================================================================
// ScanHandler Implementation for Zero-Copy Index Building
// ============================================================================

impl ScanHandler for IndexBuilder<'_> {
    fn start_element(&mut self, tag: Span, name: Span, attrs: &[(Span, Span)], is_empty: bool) {
        let parent = self.current_parent();
        let name_bytes = name.slice(self.input);
        let mut elem = IndexElement::new(name, prefix_len(name_bytes), parent);

        elem.start_token = self.index.add_token(Token::new(TokenKind::StartTag, name));
        for (attr_name, attr_value) in attrs {
            self.index.add_token(Token::new(TokenKind::AttrName, *attr_name));
            self.index.add_token(Token::new(TokenKind::AttrValue, *attr_value));
        }
        elem.attr_count = attrs.len() as u32;
        elem.fragment = Fragment {
            start: tag.offset,
            end: tag.end(),
        };
        elem.content_start = tag.end();

        if is_empty {
            elem.flags |= element_flags::IS_EMPTY;
            elem.end_token = self.index.token_count() as u32;
        }

        let local = elem.local_name().slice(self.input);
        let idx = self.index.add_element(elem, local);

        if self.index.root.is_none() {
            self.index.root = Some(idx);
        }
        self.link_child(idx);

        if !is_empty {
            self.stack.push(OpenElement {
                idx,
                last_child: NO_NODE,
            });
        }
    }

    fn end_element(&mut self, tag: Span, name: Span) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        self.index.add_token(Token::new(TokenKind::EndTag, name));
        let end_token = self.index.token_count() as u32;

        if let Some(elem) = self.index.get_element_mut(open.idx) {
            elem.end_token = end_token;
            elem.fragment.end = tag.end();
        }
    }

    fn text(&mut self, span: Span, needs_entity_decode: bool) {
        // Whitespace-only runs between tags are not indexed
        if span.slice(self.input).iter().all(|&b| is_whitespace(b)) {
            return;
        }

        let mut token = Token::new(TokenKind::Text, span);
        if needs_entity_decode {
            token.flags |= token_flags::NEEDS_ENTITY_DECODE;
        }
        let idx = self.index.add_token(token);
        self.note_text(idx);
    }

    fn cdata(&mut self, span: Span) {
        let idx = self.index.add_token(Token::new(TokenKind::CData, span));
        self.note_text(idx);
    }

    fn comment(&mut self, span: Span) {
        self.index.add_token(Token::new(TokenKind::Comment, span));
    }
}

// ============================================================================
// Build Functions
// ============================================================================

/// Largest indexable input; offsets are stored as u32
pub const MAX_INPUT_LEN: usize = u32::MAX as usize;

/// Build a TokenIndex, failing atomically on malformed input
pub fn build_index(input: &[u8]) -> Result<TokenIndex, ParseError> {
    check_input_len(input.len())?;
    let mut builder = IndexBuilder::new(input);
    Tokenizer::new(input).scan(&mut builder)?;
    Ok(builder.finish())
}

fn check_input_len(len: usize) -> Result<(), ParseError> {
    if len > MAX_INPUT_LEN {
        return Err(ParseError::new(
            format!("Input of {len} bytes exceeds the {MAX_INPUT_LEN} byte limit"),
            MAX_INPUT_LEN,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple() {
        let xml = b"<root><child>text</child></root>";
        let index = build_index(xml).unwrap();

        assert_eq!(index.element_count(), 2);
        assert_eq!(index.root, Some(0));
        let kinds: Vec<_> = index.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StartTag,
                TokenKind::StartTag,
                TokenKind::Text,
                TokenKind::EndTag,
                TokenKind::EndTag
            ]
        );
    }

    #[test]
    fn test_token_offsets_increase() {
        let xml = b"<a x=\"1\"><!--c--><b>t</b><c y='2'/><![CDATA[d]]></a>";
        let index = build_index(xml).unwrap();
        for pair in index.tokens.windows(2) {
            assert!(pair[0].span.offset < pair[1].span.offset);
        }
    }

    #[test]
    fn test_build_with_attributes() {
        let xml = b"<root id=\"1\" name=\"test\"><child/></root>";
        let index = build_index(xml).unwrap();
        let root = index.get_element(0).unwrap();
        assert_eq!(root.attr_count, 2);
        assert_eq!(index.get_attribute(0, "name", xml), Some("test"));
        assert_eq!(index.token(2).unwrap().kind, TokenKind::AttrValue);
    }

    #[test]
    fn test_fragments() {
        let xml = b"<a><b>x</b><c/></a>";
        let index = build_index(xml).unwrap();
        let b = index.fragment(1).unwrap();
        assert_eq!(b.slice(xml), b"<b>x</b>");
        let c = index.fragment(2).unwrap();
        assert_eq!(c.slice(xml), b"<c/>");
        assert_eq!(index.fragment(0).unwrap().slice(xml), xml);
        assert!(index.get_element(2).unwrap().is_empty());
    }

    #[test]
    fn test_sibling_links() {
        let xml = b"<a><b><c/></b><d/><e/></a>";
        let index = build_index(xml).unwrap();
        let a = index.get_element(0).unwrap();
        assert_eq!(a.first_child, 1);
        assert_eq!(index.get_element(1).unwrap().next_sibling, 3);
        assert_eq!(index.get_element(3).unwrap().next_sibling, 4);
        assert_eq!(index.get_element(4).unwrap().next_sibling, NO_NODE);
        assert_eq!(index.get_element(2).unwrap().parent, 1);
    }

    #[test]
    fn test_whitespace_text_not_indexed() {
        let xml = b"<a>\n  <b>x</b>\n</a>";
        let index = build_index(xml).unwrap();
        assert!(!index.get_element(0).unwrap().has_text());
        assert!(index.get_element(1).unwrap().has_text());
    }

    #[test]
    fn test_prefixed_names() {
        let xml = b"<doc:a xmlns:doc=\"urn:d\"><doc:b/></doc:a>";
        let index = build_index(xml).unwrap();
        assert_eq!(index.element_name(1, xml), Some("doc:b"));
        assert_eq!(index.element_local_name(1, xml), Some("b"));
        assert_eq!(index.elements_named(b"b"), &[1]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_input_len_limit() {
        assert!(check_input_len(MAX_INPUT_LEN).is_ok());
        let err = check_input_len(MAX_INPUT_LEN + 1).unwrap_err();
        assert_eq!(err.offset, MAX_INPUT_LEN);
    }

    #[test]
    fn test_malformed_fails() {
        assert!(build_index(b"<a><b></a>").is_err());
        assert!(build_index(b"<a>").is_err());
    }
}
