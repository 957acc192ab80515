//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: strict single-pass scanner dispatching to a ScanHandler
//! - Entities: XML entity decoding with Cow (zero-copy when possible)

pub mod entities;
pub mod scanner;
pub mod tokenizer;
