//! XPath Expression Compiler
//!
//! Recursive descent over the lexer's tokens, producing a [`CompiledPath`].
//! Supported grammar:
//!
//! ```text
//! expr      := function '(' path ')' | path
//! function  := 'count' | 'boolean'
//! path      := ('/' | '//')? step (('/' | '//') step)* ('/' attribute)?
//!            | ('/')? attribute
//! step      := (name | prefix ':' name | '*') predicate*
//! predicate := '[' number ']' | '[' attribute ']' | '[' attribute '=' literal ']'
//! attribute := '@' (name | prefix ':' name | '*')
//! ```
//!
//! Compilation never looks at a document.

use super::lexer::{Lexer, Token};
use crate::error::XPathError;
use indexmap::IndexMap;

/// Namespace bindings, prefix -> URI
pub type Namespaces = IndexMap<String, String>;

/// Wrapping function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Count,
    Boolean,
}

/// Supported axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

/// Element test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Wildcard,
    Name {
        /// Name as written, e.g. `doc:Item`
        qname: String,
        /// Local part, used for the name lookup
        local: String,
        /// Bound namespace URI of the prefix, when namespace-aware
        uri: Option<String>,
    },
}

/// Attribute selector, in predicates and trailing `@` steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeTest {
    /// `@*`
    Any,
    /// `@name`, compared as written
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[N]`, 1-based
    Position(usize),
    /// `[@name]`
    AttributeExists(String),
    /// `[@name = "literal"]`
    AttributeEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

/// A compiled XPath expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    pub function: Option<Function>,
    /// Starts at the document node instead of the root element
    pub absolute: bool,
    pub steps: Vec<Step>,
    /// Trailing attribute selection
    pub attribute: Option<AttributeTest>,
    /// Names carry namespace URIs instead of comparing as written
    pub namespace_aware: bool,
}

/// XPath parser
struct Parser<'a> {
    xpath: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
    namespaces: &'a Namespaces,
}

impl<'a> Parser<'a> {
    fn new(xpath: &'a str, namespaces: &'a Namespaces) -> Self {
        Parser {
            xpath,
            tokens: Lexer::new(xpath).tokenize(),
            pos: 0,
            namespaces,
        }
    }

    /// Current token
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).map(|(t, _)| t).unwrap_or(&Token::Eof)
    }

    /// Byte position of the current token
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or(self.xpath.len())
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    /// Advance to next token
    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::new(self.xpath, message, self.offset())
    }

    /// Error for the current token, naming what was expected
    fn unexpected(&self, expected: &str) -> XPathError {
        match self.current() {
            Token::Eof => self.error(format!("Unexpected end of expression, expected {expected}")),
            Token::Unexpected(c) => self.error(format!("Unexpected character '{c}'")),
            Token::UnterminatedString => self.error("Unterminated string literal"),
            other => self.error(format!("Unexpected {other:?}, expected {expected}")),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), XPathError> {
        if *self.current() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Parse a whole expression
    fn parse(&mut self) -> Result<CompiledPath, XPathError> {
        if matches!(self.current(), Token::Eof) {
            return Err(self.error("Empty expression"));
        }

        let function = match (self.current(), self.peek()) {
            (Token::Name(name), Token::LeftParen) => {
                let function = match name.as_str() {
                    "count" => Function::Count,
                    "boolean" => Function::Boolean,
                    other => return Err(self.error(format!("Unknown function: {other}()"))),
                };
                self.advance();
                self.advance();
                Some(function)
            }
            _ => None,
        };

        let mut path = self.parse_location_path()?;
        path.function = function;

        if function.is_some() {
            self.expect(Token::RightParen, "')'")?;
        }
        if !matches!(self.current(), Token::Eof) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(path)
    }

    fn parse_location_path(&mut self) -> Result<CompiledPath, XPathError> {
        let mut path = CompiledPath {
            function: None,
            absolute: false,
            steps: Vec::new(),
            attribute: None,
            namespace_aware: !self.namespaces.is_empty(),
        };

        let mut axis = Axis::Child;
        match self.current() {
            Token::Slash => {
                path.absolute = true;
                self.advance();
            }
            Token::DoubleSlash => {
                path.absolute = true;
                axis = Axis::Descendant;
                self.advance();
            }
            _ => {}
        }

        // Attributes of the root element: `@x` or `/@x`
        if matches!(self.current(), Token::At) && axis == Axis::Child {
            path.attribute = Some(self.parse_attribute()?);
            return Ok(path);
        }

        loop {
            path.steps.push(self.parse_step(axis)?);

            match self.current() {
                Token::Slash => {
                    self.advance();
                    if matches!(self.current(), Token::At) {
                        path.attribute = Some(self.parse_attribute()?);
                        break;
                    }
                    axis = Axis::Child;
                }
                Token::DoubleSlash => {
                    self.advance();
                    axis = Axis::Descendant;
                }
                _ => break,
            }
        }

        Ok(path)
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, XPathError> {
        let test = match self.current().clone() {
            Token::Star => NameTest::Wildcard,
            Token::Name(name) => self.name_test(&name, None)?,
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, local)) => self.name_test(&qname, Some((prefix, local)))?,
                None => self.name_test(&qname, None)?,
            },
            _ => return Err(self.unexpected("element name")),
        };
        self.advance();

        let mut predicates = Vec::new();
        while matches!(self.current(), Token::LeftBracket) {
            self.advance();
            predicates.push(self.parse_predicate()?);
            self.expect(Token::RightBracket, "']'")?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    /// Resolve a step name against the namespace bindings
    fn name_test(&self, qname: &str, split: Option<(&str, &str)>) -> Result<NameTest, XPathError> {
        let (local, uri) = match split {
            Some((prefix, local)) if !self.namespaces.is_empty() => {
                let uri = self
                    .namespaces
                    .get(prefix)
                    .ok_or_else(|| self.error(format!("Unbound namespace prefix: {prefix}")))?;
                (local, Some(uri.clone()))
            }
            Some((_, local)) => (local, None),
            None => (qname, None),
        };
        Ok(NameTest::Name {
            qname: qname.to_string(),
            local: local.to_string(),
            uri,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate, XPathError> {
        match self.current().clone() {
            Token::Number(digits) => {
                // Positions beyond usize::MAX match nothing
                let position = match digits.parse::<usize>() {
                    Ok(0) => return Err(self.error(format!("Invalid position: {digits}"))),
                    Ok(n) => n,
                    Err(_) => usize::MAX,
                };
                self.advance();
                Ok(Predicate::Position(position))
            }
            Token::At => {
                let name = match self.parse_attribute()? {
                    AttributeTest::Named(name) => name,
                    AttributeTest::Any => return Err(self.error("Wildcard not allowed in attribute predicate")),
                };
                if !matches!(self.current(), Token::Eq) {
                    return Ok(Predicate::AttributeExists(name));
                }
                self.advance();
                match self.current().clone() {
                    Token::String(literal) => {
                        self.advance();
                        Ok(Predicate::AttributeEquals(name, literal))
                    }
                    _ => Err(self.unexpected("string literal")),
                }
            }
            _ => Err(self.unexpected("position or attribute predicate")),
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeTest, XPathError> {
        self.expect(Token::At, "'@'")?;
        let test = match self.current() {
            Token::Star => AttributeTest::Any,
            Token::Name(name) | Token::NameTest(name) => AttributeTest::Named(name.clone()),
            _ => return Err(self.unexpected("attribute name")),
        };
        self.advance();
        Ok(test)
    }
}

/// Compile an XPath expression string
pub fn compile(xpath: &str, namespaces: &Namespaces) -> Result<CompiledPath, XPathError> {
    Parser::new(xpath, namespaces).parse().inspect_err(|e| {
        log::debug!("{e}");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn no_ns() -> Namespaces {
        Namespaces::new()
    }

    fn name(n: &str) -> NameTest {
        NameTest::Name {
            qname: n.to_string(),
            local: n.to_string(),
            uri: None,
        }
    }

    #[test]
    fn test_compile_absolute() {
        let compiled = compile("/root/child", &no_ns()).unwrap();
        assert!(compiled.absolute);
        assert_eq!(compiled.function, None);
        assert_eq!(compiled.steps.len(), 2);
        assert_eq!(compiled.steps[1].test, name("child"));
        assert_eq!(compiled.steps[1].axis, Axis::Child);
    }

    #[test]
    fn test_compile_relative_and_descendant() {
        let compiled = compile("zone//Element", &no_ns()).unwrap();
        assert!(!compiled.absolute);
        assert_eq!(compiled.steps[0].axis, Axis::Child);
        assert_eq!(compiled.steps[1].axis, Axis::Descendant);

        let compiled = compile("//*", &no_ns()).unwrap();
        assert_eq!(compiled.steps[0].axis, Axis::Descendant);
        assert_eq!(compiled.steps[0].test, NameTest::Wildcard);
    }

    #[test]
    fn test_compile_predicates() {
        let compiled = compile("/a/b[@type='x'][2][@id]", &no_ns()).unwrap();
        assert_eq!(
            compiled.steps[1].predicates,
            vec![
                Predicate::AttributeEquals("type".to_string(), "x".to_string()),
                Predicate::Position(2),
                Predicate::AttributeExists("id".to_string()),
            ]
        );
    }

    #[test]
    fn test_compile_predicate_literals() {
        let compiled = compile(r#"/a[@k="it's"][99999999999999999999999]"#, &no_ns()).unwrap();
        assert_eq!(
            compiled.steps[0].predicates,
            vec![
                Predicate::AttributeEquals("k".to_string(), "it's".to_string()),
                Predicate::Position(usize::MAX),
            ]
        );
    }

    #[test]
    fn test_compile_functions() {
        let compiled = compile("count(/a/b)", &no_ns()).unwrap();
        assert_eq!(compiled.function, Some(Function::Count));
        let compiled = compile("boolean( a )", &no_ns()).unwrap();
        assert_eq!(compiled.function, Some(Function::Boolean));
        assert!(!compiled.absolute);
    }

    #[test]
    fn test_compile_attributes() {
        let compiled = compile("@number", &no_ns()).unwrap();
        assert!(compiled.steps.is_empty());
        assert_eq!(compiled.attribute, Some(AttributeTest::Named("number".to_string())));

        let compiled = compile("/a/b[1]/@*", &no_ns()).unwrap();
        assert_eq!(compiled.steps.len(), 2);
        assert_eq!(compiled.attribute, Some(AttributeTest::Any));
    }

    #[test]
    fn test_compile_namespaces() {
        let mut ns = Namespaces::new();
        ns.insert("doc".to_string(), "document".to_string());

        let compiled = compile("/doc:Root/Item", &ns).unwrap();
        assert!(compiled.namespace_aware);
        assert_eq!(
            compiled.steps[0].test,
            NameTest::Name {
                qname: "doc:Root".to_string(),
                local: "Root".to_string(),
                uri: Some("document".to_string()),
            }
        );

        let err = compile("/zzz:Root", &ns).unwrap_err();
        assert_eq!(err.message, "Unbound namespace prefix: zzz");
        assert_eq!(err.position, 1);

        // Without bindings prefixed names compare as written
        let compiled = compile("/zzz:Root", &no_ns()).unwrap();
        assert!(!compiled.namespace_aware);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("/a/")]
    #[case("/a[")]
    #[case("/a[0]")]
    #[case("/a[@x=]")]
    #[case("/a[@x='y]")]
    #[case("/a[@*]")]
    #[case("sum(/a)")]
    #[case("count(/a")]
    #[case("/a | /b")]
    #[case("/a/..")]
    #[case("/a/@x/b")]
    fn test_compile_rejects(#[case] xpath: &str) {
        let err = compile(xpath, &no_ns()).unwrap_err();
        assert_eq!(err.xpath, xpath);
    }
}
