//! Token Index - Main index structure
//!
//! Stores the entire XML document as offsets into the original input:
//! the flat token sequence plus an element table linking parents, children
//! and siblings, and a lookup from local element name to elements.

use super::element::{IndexElement, Token};
use super::span::{Fragment, Span};
use std::collections::HashMap;

/// The token index of an XML document
///
/// Memory layout:
/// - Tokens stored contiguously in document order
/// - Elements stored in document (pre-)order, so an element's descendants
///   are the elements immediately following it
/// - Name lookup maps local names to ordered element indices
#[derive(Debug, Default)]
pub struct TokenIndex {
    /// All tokens in document order
    pub tokens: Vec<Token>,
    /// Element table (index 0 is the root element)
    pub elements: Vec<IndexElement>,
    /// Local element name -> element indices in document order
    by_local_name: HashMap<Vec<u8>, Vec<u32>>,
    /// Root element index (None only for an index under construction)
    pub root: Option<u32>,
}

impl TokenIndex {
    /// Create with estimated capacity
    pub fn with_capacity(tokens: usize, elements: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(tokens),
            elements: Vec::with_capacity(elements),
            by_local_name: HashMap::new(),
            root: None,
        }
    }

    #[inline]
    pub fn get_element(&self, idx: u32) -> Option<&IndexElement> {
        self.elements.get(idx as usize)
    }

    #[inline]
    pub fn token(&self, idx: u32) -> Option<&Token> {
        self.tokens.get(idx as usize)
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Qualified element name as string
    pub fn element_name<'a>(&self, idx: u32, input: &'a [u8]) -> Option<&'a str> {
        self.get_element(idx)?.name.as_str(input)
    }

    /// Element name with any prefix removed
    pub fn element_local_name<'a>(&self, idx: u32, input: &'a [u8]) -> Option<&'a str> {
        self.get_element(idx)?.local_name().as_str(input)
    }

    /// Byte span of the element including its subtree
    pub fn fragment(&self, idx: u32) -> Option<Fragment> {
        self.get_element(idx).map(|e| e.fragment)
    }

    /// (name, value) spans of an element's attributes in source order
    pub fn attributes(&self, idx: u32) -> impl Iterator<Item = (Span, Span)> + '_ {
        self.get_element(idx)
            .into_iter()
            .flat_map(|e| e.attribute_tokens())
            .filter_map(move |(name, value)| Some((self.token(name)?.span, self.token(value)?.span)))
    }

    /// Get attribute value by qualified name
    pub fn get_attribute<'a>(&self, idx: u32, name: &str, input: &'a [u8]) -> Option<&'a str> {
        self.attributes(idx)
            .find(|(n, _)| n.slice(input) == name.as_bytes())
            .and_then(|(_, v)| v.as_str(input))
    }

    /// Iterate over all descendant elements in document order
    pub fn descendants(&self, idx: u32) -> DescendantIter<'_> {
        let end = self.get_element(idx).map(|e| e.fragment.end).unwrap_or(0);
        DescendantIter {
            index: self,
            next: idx.saturating_add(1),
            end,
        }
    }

    /// All elements with the given local name, in document order
    pub fn elements_named(&self, local_name: &[u8]) -> &[u32] {
        self.by_local_name
            .get(local_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Text and CDATA tokens of the element's whole subtree, in document order
    pub fn character_data(&self, idx: u32) -> impl Iterator<Item = &Token> + '_ {
        let range = self
            .get_element(idx)
            .map(|e| e.start_token as usize..e.end_token as usize)
            .unwrap_or(0..0);
        self.tokens[range].iter().filter(|t| t.is_character_data())
    }

    // ========================================================================
    // Construction (used by IndexBuilder)
    // ========================================================================

    pub(crate) fn add_token(&mut self, token: Token) -> u32 {
        let idx = self.tokens.len() as u32;
        self.tokens.push(token);
        idx
    }

    pub(crate) fn add_element(&mut self, elem: IndexElement, local_name: &[u8]) -> u32 {
        let idx = self.elements.len() as u32;
        self.elements.push(elem);
        self.by_local_name
            .entry(local_name.to_vec())
            .or_default()
            .push(idx);
        idx
    }

    #[inline]
    pub(crate) fn get_element_mut(&mut self, idx: u32) -> Option<&mut IndexElement> {
        self.elements.get_mut(idx as usize)
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.tokens.shrink_to_fit();
        self.elements.shrink_to_fit();
        self.by_local_name.shrink_to_fit();
    }
}

/// Iterator over descendant elements (pre-order)
pub struct DescendantIter<'a> {
    index: &'a TokenIndex,
    next: u32,
    /// Fragment end of the ancestor; descendants start before it
    end: u32,
}

impl Iterator for DescendantIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let elem = self.index.get_element(self.next)?;
        if elem.fragment.start >= self.end {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        Some(idx)
    }
}
