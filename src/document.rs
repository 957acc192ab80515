//! Document facade
//!
//! Owns the original bytes and their token index. Every query builds a fresh
//! [`Navigator`] over the shared, immutable index, so a `Document` can be
//! queried from many threads at once.

use crate::error::{Error, ParseError, XPathError};
use crate::extract::{parse_timestamp, Extractor};
use crate::index::{build_index, TokenIndex};
use crate::nav::Navigator;
use crate::xpath::{evaluate, EvalResult, Match, Mode, Namespaces, PathCache};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Default number of compiled paths kept per document
pub const DEFAULT_XPATH_CACHE_CAPACITY: usize = 64;

/// Construction options
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Element names (qualified or local) or paths whose values are returned
    /// without entity decoding
    pub raw_fields: HashSet<String>,
    /// Prefix -> URI bindings. Non-empty bindings make name tests
    /// namespace-aware.
    pub namespaces: Namespaces,
    /// Compiled path cache size; 0 disables caching
    pub xpath_cache_capacity: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        DocumentOptions {
            raw_fields: HashSet::new(),
            namespaces: Namespaces::new(),
            xpath_cache_capacity: DEFAULT_XPATH_CACHE_CAPACITY,
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn namespaces<I, P, U>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (P, U)>,
        P: Into<String>,
        U: Into<String>,
    {
        self.namespaces
            .extend(bindings.into_iter().map(|(p, u)| (p.into(), u.into())));
        self
    }

    pub fn xpath_cache_capacity(mut self, capacity: usize) -> Self {
        self.xpath_cache_capacity = capacity;
        self
    }
}

/// A read-only, XPath-addressable view over an XML buffer
#[derive(Debug)]
pub struct Document {
    bytes: Vec<u8>,
    index: TokenIndex,
    options: DocumentOptions,
    cache: PathCache,
}

impl Document {
    /// Index `bytes` with default options
    ///
    /// Inputs longer than [`MAX_INPUT_LEN`](crate::index::MAX_INPUT_LEN)
    /// bytes are rejected with a [`ParseError`].
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self, ParseError> {
        Self::with_options(bytes, DocumentOptions::default())
    }

    /// Index `bytes`; malformed XML never produces a document
    pub fn with_options(bytes: impl Into<Vec<u8>>, options: DocumentOptions) -> Result<Self, ParseError> {
        let bytes = bytes.into();
        let index = build_index(&bytes)?;
        let cache = PathCache::new(options.xpath_cache_capacity);
        Ok(Document {
            bytes,
            index,
            options,
            cache,
        })
    }

    /// The original buffer, unchanged
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    #[inline]
    pub fn index(&self) -> &TokenIndex {
        &self.index
    }

    /// A new cursor at the document node
    pub fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.index, &self.bytes)
    }

    fn extractor(&self) -> Extractor<'_> {
        Extractor::new(&self.index, &self.bytes, &self.options.raw_fields)
    }

    /// Compile (or fetch from cache) and evaluate
    pub fn evaluate(&self, xpath: &str, mode: Mode) -> Result<EvalResult, XPathError> {
        let path = self.cache.get_or_compile(xpath, &self.options.namespaces)?;
        let mut nav = self.navigator();
        Ok(evaluate(&path, &mut nav, mode))
    }

    /// Trimmed value of the first match, `""` when nothing matches
    pub fn element_value(&self, xpath: &str) -> Result<String, XPathError> {
        let result = self.evaluate(xpath, Mode::Single)?;
        Ok(self.extractor().value_of(&result, xpath))
    }

    /// Verbatim markup of the first match, `""` when nothing matches
    pub fn element_block(&self, xpath: &str) -> Result<String, XPathError> {
        let result = self.evaluate(xpath, Mode::Single)?;
        Ok(self.extractor().block_of(&result))
    }

    /// Values of every match that has text, in document order
    pub fn element_value_list(&self, xpath: &str) -> Result<Vec<String>, XPathError> {
        let extractor = self.extractor();
        let values = match self.evaluate(xpath, Mode::List)? {
            EvalResult::List(matches) => matches
                .into_iter()
                .filter_map(|m| extractor.list_value(m, xpath))
                .collect(),
            EvalResult::Missing => Vec::new(),
            scalar => vec![extractor.value_of(&scalar, xpath)],
        };
        log::trace!("{xpath}: {} values", values.len());
        Ok(values)
    }

    /// Number of matches
    pub fn node_count(&self, xpath: &str) -> Result<usize, XPathError> {
        Ok(self.evaluate(xpath, Mode::List)?.to_count())
    }

    /// Attribute of the root element, given as `@name`
    pub fn attribute(&self, name: &str) -> Result<String, XPathError> {
        self.attribute_from_xpath("/", name)
    }

    /// Attribute `@name` of the first match of `xpath`
    ///
    /// An empty `xpath` or `/` addresses the root element.
    pub fn attribute_from_xpath(&self, xpath: &str, name: &str) -> Result<String, XPathError> {
        let name = name.trim();
        let attr = if name.starts_with('@') {
            name.to_string()
        } else {
            format!("@{name}")
        };
        let base = xpath.trim().trim_end_matches('/');
        let full = if base.is_empty() {
            attr
        } else {
            format!("{base}/{attr}")
        };

        let result = self.evaluate(&full, Mode::Single)?;
        Ok(match result {
            EvalResult::Single(m) => self.extractor().attribute(m),
            _ => String::new(),
        })
    }

    /// Descendant text of the first match concatenated without separators
    pub fn concatenated_string(&self, xpath: &str) -> Result<String, XPathError> {
        Ok(match self.evaluate(xpath, Mode::Single)? {
            EvalResult::Single(m) => self.extractor().concatenated(m),
            EvalResult::Number(n) => n.to_string(),
            EvalResult::Boolean(b) => b.to_string(),
            EvalResult::List(_) | EvalResult::Missing => String::new(),
        })
    }

    /// Boolean value of the path: `boolean()`/`count()` results, or whether
    /// anything matches
    pub fn boolean_value(&self, xpath: &str) -> Result<bool, XPathError> {
        Ok(self.evaluate(xpath, Mode::Single)?.to_boolean())
    }

    /// Whether the path matches at all (with or without a value)
    pub fn exists(&self, xpath: &str) -> Result<bool, XPathError> {
        self.boolean_value(xpath)
    }

    /// Element value parsed as an ISO-8601 instant, in epoch milliseconds
    pub fn timestamp(&self, xpath: &str) -> Result<i64, Error> {
        let value = self.element_value(xpath)?;
        Ok(parse_timestamp(&value)?)
    }

    /// Qualified element name -> text, last value wins
    pub fn to_map(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for (name, value) in self.extractor().fields() {
            map.insert(name, value);
        }
        map
    }

    /// Qualified element name -> distinct texts in document order
    pub fn to_multimap(&self) -> IndexMap<String, Vec<String>> {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for (name, value) in self.extractor().fields() {
            let values = map.entry(name).or_default();
            if !values.contains(&value) {
                values.push(value);
            }
        }
        map
    }

    /// An independent document for each matched element, sharing options
    pub fn sub_documents(&self, xpath: &str) -> Result<Vec<Document>, Error> {
        let matches = self.evaluate(xpath, Mode::List)?.into_matches();
        let mut docs = Vec::with_capacity(matches.len());
        for m in matches {
            let Match::Element(idx) = m else {
                continue;
            };
            if let Some(fragment) = self.index.fragment(idx) {
                let bytes = fragment.slice(&self.bytes).to_vec();
                docs.push(Document::with_options(bytes, self.options.clone())?);
            }
        }
        Ok(docs)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
