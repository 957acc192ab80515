//! Navigator - cursor over a TokenIndex
//!
//! A cheap, per-call cursor. It never mutates the index; several navigators
//! may walk the same document at once.

use crate::index::{Fragment, TokenIndex, NO_NODE};

/// Where the cursor currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The document node (parent of the root element)
    Document,
    /// An element, by index into the element table
    Element(u32),
}

/// Stateful cursor over an indexed document
///
/// Movement methods return `false` and leave the cursor unchanged when the
/// target does not exist.
#[derive(Debug, Clone)]
pub struct Navigator<'a> {
    index: &'a TokenIndex,
    input: &'a [u8],
    position: Position,
}

impl<'a> Navigator<'a> {
    /// Create a cursor positioned at the document node
    pub fn new(index: &'a TokenIndex, input: &'a [u8]) -> Self {
        Navigator {
            index,
            input,
            position: Position::Document,
        }
    }

    #[inline]
    pub fn index(&self) -> &'a TokenIndex {
        self.index
    }

    #[inline]
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Current element index, if the cursor is on an element
    #[inline]
    pub fn current(&self) -> Option<u32> {
        match self.position {
            Position::Element(idx) => Some(idx),
            Position::Document => None,
        }
    }

    pub fn to_document(&mut self) {
        self.position = Position::Document;
    }

    pub fn to_root(&mut self) -> bool {
        match self.index.root {
            Some(root) => {
                self.position = Position::Element(root);
                true
            }
            None => false,
        }
    }

    /// Jump to an arbitrary element
    pub fn move_to(&mut self, idx: u32) -> bool {
        if self.index.get_element(idx).is_some() {
            self.position = Position::Element(idx);
            true
        } else {
            false
        }
    }

    pub fn first_child(&mut self) -> bool {
        let child = match self.position {
            Position::Document => self.index.root.unwrap_or(NO_NODE),
            Position::Element(idx) => self
                .index
                .get_element(idx)
                .map(|e| e.first_child)
                .unwrap_or(NO_NODE),
        };
        self.move_to_link(child)
    }

    pub fn next_sibling(&mut self) -> bool {
        let sibling = match self.position {
            Position::Document => NO_NODE,
            Position::Element(idx) => self
                .index
                .get_element(idx)
                .map(|e| e.next_sibling)
                .unwrap_or(NO_NODE),
        };
        self.move_to_link(sibling)
    }

    /// Move to the parent; the root element's parent is the document node
    pub fn parent(&mut self) -> bool {
        let Position::Element(idx) = self.position else {
            return false;
        };
        match self.index.get_element(idx).map(|e| e.parent) {
            Some(NO_NODE) => {
                self.position = Position::Document;
                true
            }
            Some(parent) => self.move_to_link(parent),
            None => false,
        }
    }

    fn move_to_link(&mut self, idx: u32) -> bool {
        if idx == NO_NODE {
            return false;
        }
        self.move_to(idx)
    }

    /// Qualified name of the current element
    pub fn name(&self) -> Option<&'a str> {
        self.index.element_name(self.current()?, self.input)
    }

    pub fn local_name(&self) -> Option<&'a str> {
        self.index.element_local_name(self.current()?, self.input)
    }

    /// Byte span of the current element; the whole buffer at the document node
    pub fn fragment(&self) -> Fragment {
        match self.position {
            Position::Document => Fragment {
                start: 0,
                end: self.input.len() as u32,
            },
            Position::Element(idx) => self
                .index
                .fragment(idx)
                .unwrap_or(Fragment { start: 0, end: 0 }),
        }
    }

    /// Bytes of the current element including its subtree
    pub fn element_fragment(&self) -> &'a [u8] {
        self.fragment().slice(self.input)
    }

    /// Raw value of an attribute on the current element
    pub fn attribute_value(&self, name: &str) -> Option<&'a str> {
        self.index.get_attribute(self.current()?, name, self.input)
    }

    /// First immediate text (or CDATA) of the current element, still encoded
    pub fn text(&self) -> Option<&'a str> {
        let elem = self.index.get_element(self.current()?)?;
        if !elem.has_text() {
            return None;
        }
        self.index.token(elem.first_text)?.span.as_str(self.input)
    }

    /// Elements with the given local name below the cursor, in document order
    pub fn descendants_named(&self, local_name: &str) -> impl Iterator<Item = u32> + 'a {
        let candidates = self.index.elements_named(local_name.as_bytes());
        let (after, end) = match self.position {
            Position::Document => (None, u32::MAX),
            Position::Element(idx) => (Some(idx), self.fragment().end),
        };
        let index = self.index;
        candidates.iter().copied().filter(move |&c| {
            after.map_or(true, |a| c > a)
                && index.get_element(c).is_some_and(|e| e.fragment.start < end)
        })
    }

    /// Namespace URI in scope for an element's prefix (or default namespace)
    ///
    /// Walks the element and its ancestors for the nearest `xmlns:prefix`
    /// (or `xmlns`) declaration. An empty default declaration means no
    /// namespace.
    pub fn namespace_uri(&self, idx: u32) -> Option<&'a str> {
        let elem = self.index.get_element(idx)?;
        let prefix = elem.prefix().as_str(self.input)?;
        let decl = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };

        let mut current = idx;
        while current != NO_NODE {
            if let Some(uri) = self.index.get_attribute(current, &decl, self.input) {
                return (!uri.is_empty()).then_some(uri);
            }
            current = self.index.get_element(current)?.parent;
        }
        None
    }
}
