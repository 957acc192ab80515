//! Strict XML Tokenizer with ScanHandler Trait
//!
//! Scans the input exactly once, left to right, and reports every lexical
//! unit to a [`ScanHandler`] as spans (byte offsets) instead of string copies.
//!
//! Well-formedness is enforced here so handlers never see broken structure:
//! - start/end tag matching and unclosed elements
//! - attribute syntax (`name="value"`, no duplicates, no `<` in values)
//! - terminated comments, CDATA sections, PIs and DOCTYPE
//! - exactly one root element, no text outside it
//!
//! The first violation aborts the scan with a [`ParseError`] carrying the
//! byte offset.

use super::scanner::{is_name_start_char, is_whitespace, Scanner};
use crate::error::ParseError;
use crate::index::Span;
use memchr::memchr;

/// Trait for handling scan events
///
/// Implement this trait to receive XML tokens. Events arrive in document
/// order and only for well-formed input up to the current position.
pub trait ScanHandler {
    /// Called when an element starts
    ///
    /// # Arguments
    /// * `tag` - Span of the whole start tag, `<` through `>`
    /// * `name` - Span of the qualified element name
    /// * `attrs` - Slice of (name_span, value_span) pairs
    /// * `is_empty` - True if this is a self-closing element (e.g., `<br/>`)
    fn start_element(&mut self, tag: Span, name: Span, attrs: &[(Span, Span)], is_empty: bool);

    /// Called when an element ends
    ///
    /// # Arguments
    /// * `tag` - Span of the whole end tag, `</` through `>`
    /// * `name` - Span of the element name in the input
    fn end_element(&mut self, tag: Span, name: Span);

    /// Called for text content inside the root element
    ///
    /// # Arguments
    /// * `span` - Span of the text in the input
    /// * `needs_entity_decode` - True if the text contains entity references
    fn text(&mut self, span: Span, needs_entity_decode: bool);

    /// Called for CDATA sections (span excludes `<![CDATA[` and `]]>`)
    fn cdata(&mut self, span: Span);

    /// Called for comments (span excludes `<!--` and `-->`)
    fn comment(&mut self, span: Span);

    /// Called for processing instructions (optional, default does nothing)
    fn processing_instruction(&mut self, _target: Span, _data: Option<Span>) {}

    /// Called for DOCTYPE (optional, default does nothing)
    fn doctype(&mut self, _content: Span) {}
}

/// Strict single-pass tokenizer
pub struct Tokenizer<'a> {
    input: &'a [u8],
    scanner: Scanner<'a>,
    /// Reusable attribute buffer to avoid per-element allocations
    attrs_buf: Vec<(Span, Span)>,
    /// Names of currently open elements
    open: Vec<Span>,
    seen_root: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            scanner: Scanner::new(input),
            attrs_buf: Vec::with_capacity(8), // Most elements have < 8 attrs
            open: Vec::with_capacity(32),
            seen_root: false,
        }
    }

    /// Scan the entire document, calling handler methods for each token
    pub fn scan<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        if self.scanner.starts_with(b"\xEF\xBB\xBF") {
            self.scanner.advance(3);
        }

        while !self.scanner.is_eof() {
            match self.scanner.peek() {
                Some(b'<') => self.scan_markup(handler)?,
                Some(_) => self.scan_text(handler)?,
                None => break,
            }
        }

        if let Some(unclosed) = self.open.last() {
            return Err(self.error_at(
                format!("Unclosed tag: <{}>", self.name_str(*unclosed)),
                self.input.len(),
            ));
        }
        if !self.seen_root {
            return Err(self.error_at("No root element", self.input.len()));
        }
        Ok(())
    }

    fn error_at(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError::new(message, offset)
    }

    fn name_str(&self, span: Span) -> String {
        String::from_utf8_lossy(span.slice(self.input)).into_owned()
    }

    /// Scan markup starting with '<'
    fn scan_markup<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let start = self.scanner.position();

        match self.scanner.peek_at(1) {
            Some(b'/') => self.scan_end_tag(handler, start),
            Some(b'!') => {
                if self.scanner.starts_with(b"<!--") {
                    self.scan_comment(handler, start)
                } else if self.scanner.starts_with(b"<![CDATA[") {
                    self.scan_cdata(handler, start)
                } else if self.scanner.starts_with(b"<!DOCTYPE") {
                    self.scan_doctype(handler, start)
                } else {
                    Err(self.error_at("Invalid markup declaration", start))
                }
            }
            Some(b'?') => self.scan_pi(handler, start),
            Some(c) if is_name_start_char(c) => self.scan_start_tag(handler, start),
            _ => Err(self.error_at("Invalid element name", start + 1)),
        }
    }

    /// Scan a start tag
    fn scan_start_tag<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        if self.open.is_empty() && self.seen_root {
            return Err(self.error_at("Document has multiple root elements", start));
        }

        self.scanner.advance(1); // Skip '<'
        let name_start = self.scanner.position();
        if self.scanner.read_name().is_none() {
            return Err(self.error_at("Invalid element name", name_start));
        }
        let name = Span::from_range(name_start, self.scanner.position());

        // Parse attributes - reuse buffer to avoid per-element allocations
        self.attrs_buf.clear();

        loop {
            let skipped = self.scanner.skip_whitespace();
            let pos = self.scanner.position();
            match self.scanner.peek() {
                Some(b'>') => {
                    self.scanner.advance(1);
                    let tag = Span::from_range(start, self.scanner.position());
                    handler.start_element(tag, name, &self.attrs_buf, false);
                    self.open.push(name);
                    break;
                }
                Some(b'/') => {
                    if self.scanner.peek_at(1) != Some(b'>') {
                        return Err(self.error_at("Expected '>' after '/' in start tag", pos + 1));
                    }
                    self.scanner.advance(2);
                    let tag = Span::from_range(start, self.scanner.position());
                    handler.start_element(tag, name, &self.attrs_buf, true);
                    break;
                }
                Some(c) if is_name_start_char(c) => {
                    if skipped == 0 {
                        return Err(self.error_at("Expected whitespace before attribute", pos));
                    }
                    let attr = self.scan_attribute()?;
                    self.attrs_buf.push(attr);
                }
                Some(_) => {
                    return Err(self.error_at("Unexpected character in start tag", pos));
                }
                None => {
                    return Err(self.error_at(
                        format!("Unterminated start tag: <{}", self.name_str(name)),
                        pos,
                    ));
                }
            }
        }

        self.seen_root = true;
        Ok(())
    }

    /// Scan an attribute, returning (name_span, value_span)
    fn scan_attribute(&mut self) -> Result<(Span, Span), ParseError> {
        let name_start = self.scanner.position();
        if self.scanner.read_name().is_none() {
            return Err(self.error_at("Invalid attribute name", name_start));
        }
        let name = Span::from_range(name_start, self.scanner.position());

        let name_bytes = name.slice(self.input);
        if self
            .attrs_buf
            .iter()
            .any(|(existing, _)| existing.slice(self.input) == name_bytes)
        {
            return Err(self.error_at(
                format!("Duplicate attribute: {}", self.name_str(name)),
                name_start,
            ));
        }

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'=') {
            return Err(self.error_at(
                "Malformed attribute: expected '='",
                self.scanner.position(),
            ));
        }
        self.scanner.advance(1);
        self.scanner.skip_whitespace();

        let quote_pos = self.scanner.position();
        let quote = match self.scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                return Err(self.error_at("Malformed attribute: expected quoted value", quote_pos));
            }
        };
        self.scanner.advance(1);

        let value_start = self.scanner.position();
        let value_end = self
            .scanner
            .find_byte(quote)
            .ok_or_else(|| self.error_at("Unterminated attribute value", quote_pos))?;
        if let Some(lt) = memchr(b'<', &self.input[value_start..value_end]) {
            return Err(self.error_at("'<' not allowed in attribute value", value_start + lt));
        }
        self.scanner.set_position(value_end + 1);

        Ok((name, Span::from_range(value_start, value_end)))
    }

    /// Scan an end tag
    fn scan_end_tag<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        self.scanner.advance(2); // Skip '</'

        let name_start = self.scanner.position();
        if self.scanner.read_name().is_none() {
            return Err(self.error_at("Malformed end tag", name_start));
        }
        let name = Span::from_range(name_start, self.scanner.position());

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(self.error_at("Malformed end tag: expected '>'", self.scanner.position()));
        }
        self.scanner.advance(1);

        match self.open.pop() {
            Some(open) if open.slice(self.input) == name.slice(self.input) => {
                let tag = Span::from_range(start, self.scanner.position());
                handler.end_element(tag, name);
                Ok(())
            }
            Some(open) => Err(self.error_at(
                format!(
                    "Tag mismatch: <{}> closed with </{}>",
                    self.name_str(open),
                    self.name_str(name)
                ),
                start,
            )),
            None => Err(self.error_at(
                format!(
                    "Unexpected end tag: </{}> without matching start tag",
                    self.name_str(name)
                ),
                start,
            )),
        }
    }

    /// Scan text content up to the next '<'
    fn scan_text<H: ScanHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        self.scanner.set_position(end);

        let text = &self.input[start..end];
        if self.open.is_empty() {
            // Only whitespace may appear outside the root element
            if let Some(i) = text.iter().position(|&b| !is_whitespace(b)) {
                return Err(self.error_at("Text content not allowed at document level", start + i));
            }
            return Ok(());
        }

        let needs_decode = memchr(b'&', text).is_some();
        handler.text(Span::from_range(start, end), needs_decode);
        Ok(())
    }

    /// Scan a comment
    fn scan_comment<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        self.scanner.advance(4); // Skip '<!--'
        let content_start = self.scanner.position();
        let content_end = self
            .scanner
            .find_seq(b"-->")
            .ok_or_else(|| self.error_at("Unterminated comment", start))?;
        self.scanner.set_position(content_end + 3);
        handler.comment(Span::from_range(content_start, content_end));
        Ok(())
    }

    /// Scan a CDATA section
    fn scan_cdata<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        if self.open.is_empty() {
            return Err(self.error_at("CDATA section not allowed at document level", start));
        }
        self.scanner.advance(9); // Skip '<![CDATA['
        let content_start = self.scanner.position();
        let content_end = self
            .scanner
            .find_seq(b"]]>")
            .ok_or_else(|| self.error_at("Unterminated CDATA section", start))?;
        self.scanner.set_position(content_end + 3);
        handler.cdata(Span::from_range(content_start, content_end));
        Ok(())
    }

    /// Scan a processing instruction (including the XML declaration)
    fn scan_pi<H: ScanHandler>(&mut self, handler: &mut H, start: usize) -> Result<(), ParseError> {
        self.scanner.advance(2); // Skip '<?'
        let target_start = self.scanner.position();
        if self.scanner.read_name().is_none() {
            return Err(self.error_at("Invalid processing instruction target", target_start));
        }
        let target = Span::from_range(target_start, self.scanner.position());
        self.scanner.skip_whitespace();

        let data_start = self.scanner.position();
        let data_end = self
            .scanner
            .find_seq(b"?>")
            .ok_or_else(|| self.error_at("Unterminated processing instruction", start))?;
        self.scanner.set_position(data_end + 2);

        let data = (data_end > data_start).then(|| Span::from_range(data_start, data_end));
        handler.processing_instruction(target, data);
        Ok(())
    }

    /// Scan DOCTYPE, skipping any internal subset
    fn scan_doctype<H: ScanHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
    ) -> Result<(), ParseError> {
        if self.seen_root {
            return Err(self.error_at("DOCTYPE must come before root element", start));
        }
        self.scanner.advance(9); // Skip '<!DOCTYPE'

        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        while let Some(c) = self.scanner.peek() {
            match (c, quote) {
                (q, Some(open)) if q == open => quote = None,
                (_, Some(_)) => {}
                (b'"' | b'\'', None) => quote = Some(c),
                (b'[', None) => depth += 1,
                (b']', None) => depth = depth.saturating_sub(1),
                (b'>', None) if depth == 0 => {
                    let span = Span::from_range(start, self.scanner.position());
                    self.scanner.advance(1);
                    handler.doctype(span);
                    return Ok(());
                }
                _ => {}
            }
            self.scanner.advance(1);
        }

        Err(self.error_at("Unterminated DOCTYPE", start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test handler that collects events as strings
    struct TestHandler<'a> {
        input: &'a [u8],
        events: Vec<String>,
    }

    impl<'a> TestHandler<'a> {
        fn new(input: &'a [u8]) -> Self {
            Self {
                input,
                events: Vec::new(),
            }
        }

        fn s(&self, span: Span) -> &str {
            span.as_str(self.input).unwrap_or("?")
        }
    }

    impl ScanHandler for TestHandler<'_> {
        fn start_element(&mut self, _tag: Span, name: Span, attrs: &[(Span, Span)], is_empty: bool) {
            let mut event = format!("start {}", self.s(name));
            for (n, v) in attrs {
                event.push_str(&format!(" {}={}", self.s(*n), self.s(*v)));
            }
            if is_empty {
                event.push_str(" /");
            }
            self.events.push(event);
        }

        fn end_element(&mut self, _tag: Span, name: Span) {
            let event = format!("end {}", self.s(name));
            self.events.push(event);
        }

        fn text(&mut self, span: Span, needs_decode: bool) {
            let event = format!("text {:?} {}", self.s(span), needs_decode);
            self.events.push(event);
        }

        fn cdata(&mut self, span: Span) {
            let event = format!("cdata {}", self.s(span));
            self.events.push(event);
        }

        fn comment(&mut self, span: Span) {
            let event = format!("comment {}", self.s(span));
            self.events.push(event);
        }
    }

    fn scan(input: &[u8]) -> Result<Vec<String>, ParseError> {
        let mut handler = TestHandler::new(input);
        Tokenizer::new(input).scan(&mut handler)?;
        Ok(handler.events)
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(scan(b"<root/>").unwrap(), vec!["start root /"]);
    }

    #[test]
    fn test_nested_with_attributes() {
        let events = scan(b"<?xml version=\"1.0\"?>\n<a x='1' y = \"2\"><b/>t&amp;</a>\n").unwrap();
        assert_eq!(
            events,
            vec!["start a x=1 y=2", "start b /", "text \"t&amp;\" true", "end a"]
        );
    }

    #[test]
    fn test_comment_and_cdata() {
        let events = scan(b"<!-- c --><a><![CDATA[<x>]]></a>").unwrap();
        assert_eq!(events, vec!["comment  c ", "start a", "cdata <x>", "end a"]);
    }

    #[test]
    fn test_doctype_with_subset() {
        let events = scan(b"<!DOCTYPE a [<!ENTITY e \"]>\">]><a/>").unwrap();
        assert_eq!(events, vec!["start a /"]);
    }

    #[test]
    fn test_bom_is_skipped() {
        assert!(scan(b"\xEF\xBB\xBF<a/>").is_ok());
    }

    #[test]
    fn test_tag_mismatch() {
        let err = scan(b"<a><b></a>").unwrap_err();
        assert_eq!(err.message, "Tag mismatch: <b> closed with </a>");
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_unexpected_end_tag() {
        let err = scan(b"<a/></b>").unwrap_err();
        assert!(err.message.starts_with("Unexpected end tag"));
    }

    #[test]
    fn test_unclosed() {
        let err = scan(b"<a><b>").unwrap_err();
        assert_eq!(err.message, "Unclosed tag: <b>");
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_malformed_attributes() {
        assert!(scan(b"<a x=1/>").is_err());
        assert!(scan(b"<a x/>").is_err());
        assert!(scan(b"<a x=\"1/>").is_err());
        assert!(scan(b"<a x=\"1\"y=\"2\"/>").is_err());
        assert!(scan(b"<a x=\"<\"/>").is_err());
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = scan(b"<a x=\"1\" x=\"2\"/>").unwrap_err();
        assert_eq!(err.message, "Duplicate attribute: x");
    }

    #[test]
    fn test_document_level_errors() {
        assert!(scan(b"").is_err());
        assert!(scan(b"text<a/>").is_err());
        assert!(scan(b"<a/><b/>").is_err());
        assert!(scan(b"<a/>trailing").is_err());
        assert!(scan(b"<!-- open <a/>").is_err());
        assert!(scan(b"<1invalid/>").is_err());
    }
}
