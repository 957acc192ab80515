//! Token and Element Types
//!
//! Compact structures storing XML structure as offsets into the original
//! input. Tokens are the flat lexical record; elements are the navigable
//! tree built over them.

use super::span::{Fragment, Span};

/// Sentinel value for "no node"
pub const NO_NODE: u32 = u32::MAX;

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Element start tag; the span covers the qualified name
    StartTag,
    /// Element end tag; the span covers the name. Absent for `<a/>`.
    EndTag,
    AttrName,
    AttrValue,
    /// Character data (entities still encoded)
    Text,
    /// CDATA section content
    CData,
    /// Comment content
    Comment,
}

/// Flags for Token
pub mod token_flags {
    /// Text needs entity decoding (contains &amp; etc.)
    pub const NEEDS_ENTITY_DECODE: u8 = 0x01;
}

/// A classified lexical unit with its location in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub flags: u8,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            flags: 0,
        }
    }

    #[inline]
    pub fn needs_decode(&self) -> bool {
        self.flags & token_flags::NEEDS_ENTITY_DECODE != 0
    }

    /// Text or CDATA
    #[inline]
    pub fn is_character_data(&self) -> bool {
        matches!(self.kind, TokenKind::Text | TokenKind::CData)
    }
}

/// Flags for IndexElement
pub mod element_flags {
    /// Element is empty (self-closing)
    pub const IS_EMPTY: u16 = 0x0001;
}

/// An element of the structural index
///
/// Links are element indices; token references are token indices.
#[derive(Debug, Clone, Copy)]
pub struct IndexElement {
    /// Qualified name span (tag name in input)
    pub name: Span,
    /// Length of the prefix before ':' (0 when unprefixed)
    pub prefix_len: u32,
    /// Index of the StartTag token
    pub start_token: u32,
    /// Index one past the last token of this element's subtree
    pub end_token: u32,
    /// Number of attributes; their tokens follow the StartTag token
    pub attr_count: u32,
    /// Whole element, `<` of the open tag through `>` of the close tag
    pub fragment: Fragment,
    /// Offset just past the `>` of the open tag
    pub content_start: u32,
    /// Parent element index (NO_NODE for root)
    pub parent: u32,
    /// First child element index (NO_NODE if no children)
    pub first_child: u32,
    /// Next sibling element index (NO_NODE if last child)
    pub next_sibling: u32,
    /// First immediate text/CDATA token (NO_NODE if none)
    pub first_text: u32,
    /// Flags (see element_flags)
    pub flags: u16,
}

impl IndexElement {
    #[inline]
    pub fn new(name: Span, prefix_len: u32, parent: u32) -> Self {
        Self {
            name,
            prefix_len,
            start_token: 0,
            end_token: 0,
            attr_count: 0,
            fragment: Fragment { start: 0, end: 0 },
            content_start: 0,
            parent,
            first_child: NO_NODE,
            next_sibling: NO_NODE,
            first_text: NO_NODE,
            flags: 0,
        }
    }

    #[inline]
    pub fn has_text(&self) -> bool {
        self.first_text != NO_NODE
    }

    /// Check if this is an empty/self-closing element
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags & element_flags::IS_EMPTY != 0
    }

    /// Span of the prefix (empty when unprefixed)
    #[inline]
    pub fn prefix(&self) -> Span {
        Span::new(self.name.offset, self.prefix_len)
    }

    /// Span of the local name
    #[inline]
    pub fn local_name(&self) -> Span {
        split_qname(self.name, self.prefix_len).1
    }

    /// Token indices of this element's (name, value) attribute pairs
    #[inline]
    pub fn attribute_tokens(&self) -> impl Iterator<Item = (u32, u32)> {
        let first = self.start_token + 1;
        (0..self.attr_count).map(move |i| (first + 2 * i, first + 2 * i + 1))
    }
}

/// Length of the prefix of a qualified name (0 when there is none)
#[inline]
pub fn prefix_len(qname: &[u8]) -> u32 {
    match memchr::memchr(b':', qname) {
        Some(pos) if pos > 0 && pos + 1 < qname.len() => pos as u32,
        _ => 0,
    }
}

/// Split a qualified name span into (prefix, local)
#[inline]
pub fn split_qname(name: Span, prefix_len: u32) -> (Span, Span) {
    if prefix_len == 0 {
        return (Span::new(name.offset, 0), name);
    }
    let local_offset = name.offset + prefix_len + 1;
    (
        Span::new(name.offset, prefix_len),
        Span::new(local_offset, name.len - prefix_len - 1),
    )
}
