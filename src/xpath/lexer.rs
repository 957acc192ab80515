//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. Every token carries the byte
//! position where it starts so errors can point into the expression.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    At,          // @
    Star,        // *
    Eq,          // =

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(String),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:local

    /// Anything outside the supported grammar
    Unexpected(char),
    /// String literal without closing quote
    UnterminatedString,

    // End of input
    Eof,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Get the remaining input
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Peek at current character
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at character at offset
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token and its starting byte position
    pub fn next_token(&mut self) -> (Token, usize) {
        self.skip_whitespace();
        let start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return (Token::Eof, start),
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '*' => {
                self.advance(1);
                Token::Star
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            '"' | '\'' => self.read_string(c),
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name(),
            _ => {
                self.advance(c.len_utf8());
                Token::Unexpected(c)
            }
        };
        (token, start)
    }

    /// Read an integer literal
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(1);
            } else {
                break;
            }
        }
        Token::Number(self.input[start..self.pos].to_string())
    }

    /// Read a string literal
    fn read_string(&mut self, quote: char) -> Token {
        self.advance(1); // Skip opening quote
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.input[start..self.pos].to_string();
                self.advance(1); // Skip closing quote
                return Token::String(value);
            }
            self.advance(c.len_utf8());
        }

        Token::UnterminatedString
    }

    /// Read a name, or a `prefix:local` name test
    fn read_name(&mut self) -> Token {
        let name = self.read_ncname();

        if self.peek() == Some(':') && self.peek_at(1).is_some_and(is_name_start_char) {
            self.advance(1); // Skip ':'
            let local = self.read_ncname();
            Token::NameTest(format!("{}:{}", name, local))
        } else {
            Token::Name(name.to_string())
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Vec<(Token, usize)> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.0, Token::Eof);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
