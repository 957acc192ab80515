//! Token Index Module
//!
//! A memory-efficient representation of an XML document using only byte
//! offsets into the original input:
//!
//! - **Zero-copy strings**: element names, attribute values and text content
//!   are (offset, length) spans into the input buffer.
//! - **Flat tokens**: every start tag, attribute, text run, CDATA section,
//!   comment and end tag is one [`Token`] in document order.
//! - **Element table**: elements in pre-order with parent, first-child and
//!   next-sibling links plus the byte [`Fragment`] of each subtree.
//!
//! ## Architecture
//!
//! ```text
//! TokenIndex
//! ├── tokens: Vec<Token>            # kind + span + flags
//! ├── elements: Vec<IndexElement>   # pre-order element table
//! └── by_local_name                 # local name -> element indices
//! ```

pub mod builder;
pub mod element;
pub mod span;
pub mod structural;

// Re-export what's needed externally
pub use builder::{build_index, MAX_INPUT_LEN};
pub use element::{IndexElement, Token, TokenKind, NO_NODE};
pub use span::{Fragment, Span};
pub use structural::TokenIndex;
