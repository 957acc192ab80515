//! Parallel XPath Evaluation
//!
//! Uses Rayon to evaluate many paths against one document. Each path gets
//! its own navigator, so results are independent of each other.

use crate::document::Document;
use crate::error::XPathError;
use indexmap::IndexMap;
use rayon::prelude::*;

impl Document {
    /// Element values of several paths, evaluated in parallel
    ///
    /// Results keep the order of `xpaths`; a bad path fails only its slot.
    pub fn element_values_parallel(&self, xpaths: &[&str]) -> Vec<Result<String, XPathError>> {
        xpaths
            .par_iter()
            .map(|xpath| self.element_value(xpath))
            .collect()
    }

    /// Parallel xmap - evaluate (key, xpath) pairs into a map of values
    ///
    /// Keys keep the order of `queries`. Fails on the first bad path.
    pub fn xmap(&self, queries: &[(&str, &str)]) -> Result<IndexMap<String, String>, XPathError> {
        let values: Vec<(String, String)> = queries
            .par_iter()
            .map(|(key, xpath)| self.element_value(xpath).map(|v| (key.to_string(), v)))
            .collect::<Result<_, _>>()?;
        Ok(values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;

    #[test]
    fn test_parallel_eval() {
        let doc = Document::parse("<root><a>1</a><b>2</b><c/></root>").unwrap();
        let xpaths = ["//a", "/root/b", "count(//*)", "/root/["];

        let results = doc.element_values_parallel(&xpaths);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_deref(), Ok("1"));
        assert_eq!(results[1].as_deref(), Ok("2"));
        assert_eq!(results[2].as_deref(), Ok("4"));
        assert!(results[3].is_err());
    }

    #[test]
    fn test_xmap() {
        let doc = Document::parse("<root><a>x</a><b>y</b></root>").unwrap();
        let queries = [("second", "//b"), ("first", "//a")];

        let results = doc.xmap(&queries).unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["second", "first"]);
        assert_eq!(results["first"], "x");

        assert!(doc.xmap(&[("bad", "//[")]).is_err());
    }
}
