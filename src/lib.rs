//! xmlview - Read-only XPath view over an indexed XML buffer
//!
//! The buffer is scanned once into a token index (byte offsets only, no
//! copied character data). Queries compile a restricted XPath grammar,
//! walk the index with a per-call cursor and extract values straight from
//! the original bytes.
//!
//! ## Architecture
//!
//! - `core/` - SIMD-accelerated scanner, strict tokenizer, entity decoding
//! - `index/` - token index: spans, tokens, element table, builder
//! - `nav` - cursor over the index
//! - `xpath/` - lexer, compiler, evaluator, compiled path cache
//! - `extract` - values, blocks, attributes, text, timestamps
//! - `document` - the public facade
//! - `parallel` - rayon batch evaluation (feature `parallel`)
//!
//! ## Example
//!
//! ```
//! use xmlview::Document;
//!
//! let doc = Document::parse(r#"<order id="7"><line>a</line><line>b</line></order>"#)?;
//! assert_eq!(doc.element_value("/order/line")?, "a");
//! assert_eq!(doc.element_value_list("line")?, vec!["a", "b"]);
//! assert_eq!(doc.node_count("/order/line")?, 2);
//! assert_eq!(doc.attribute("@id")?, "7");
//! # Ok::<(), xmlview::Error>(())
//! ```

pub mod core;
pub mod document;
pub mod error;
pub mod extract;
pub mod index;
pub mod nav;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod xpath;

pub use document::{Document, DocumentOptions, DEFAULT_XPATH_CACHE_CAPACITY};
pub use error::{Error, ParseError, Result, TimestampError, XPathError};
pub use index::{Fragment, Span, Token, TokenIndex, TokenKind};
pub use nav::{Navigator, Position};
pub use xpath::{CompiledPath, EvalResult, Match, Mode, Namespaces};
