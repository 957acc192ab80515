//! Span - offset and length into original input
//!
//! Zero-copy reference to a portion of the input document.
//! Used for tag names, attribute names/values, text content and fragments.

/// A span referencing a portion of the input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset into the original input
    pub offset: u32,
    /// Length in bytes
    pub len: u32,
}

impl Span {
    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Span covering `start..end` (exclusive)
    #[inline]
    pub fn from_range(start: usize, end: usize) -> Self {
        Self::new(start as u32, end.saturating_sub(start) as u32)
    }

    /// Get the end offset (exclusive)
    #[inline]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.len)
    }

    /// Extract the byte slice from input
    #[inline]
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        let start = self.offset as usize;
        let end = start.saturating_add(self.len as usize);
        if end <= input.len() {
            &input[start..end]
        } else {
            &[]
        }
    }

    /// Extract as UTF-8 string from input
    #[inline]
    pub fn as_str<'a>(&self, input: &'a [u8]) -> Option<&'a str> {
        std::str::from_utf8(self.slice(input)).ok()
    }
}

/// Byte span of an element including its open/close tags and subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub start: u32,
    /// Exclusive end
    pub end: u32,
}

impl Fragment {
    #[inline]
    pub fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        input.get(self.start as usize..self.end as usize).unwrap_or(&[])
    }
}
