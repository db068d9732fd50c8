//! Source → token stream.
//!
//! A lazy, single-pass scanner: `Scanner::scan_token` is called on demand by
//! the compiler and never buffers more than the token it just produced. No
//! token allocates; every `Token` borrows its lexeme straight out of the
//! source string, matching spec.md §4.1.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // single-character
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // one or two character
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // literals
    Identifier,
    StringLit,
    Number,

    // keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error,
    Eof,
}

/// Borrows its lexeme out of the original source, so scanning never
/// allocates. For an `Error` token, `lexeme` holds the diagnostic message
/// instead of source text (there is no source span to report for e.g. an
/// unterminated string).
#[derive(Debug, Clone, Copy)]
pub struct Token<'src> {
    pub kind: TokenType,
    pub lexeme: &'src str,
    pub line: u32,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.kind, self.lexeme)
    }
}

pub struct Scanner<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner { source, bytes: source.as_bytes(), start: 0, current: 0, line: 1 }
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenType::Eof);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenType::LeftParen),
            b')' => self.make_token(TokenType::RightParen),
            b'{' => self.make_token(TokenType::LeftBrace),
            b'}' => self.make_token(TokenType::RightBrace),
            b';' => self.make_token(TokenType::Semicolon),
            b',' => self.make_token(TokenType::Comma),
            b'.' => self.make_token(TokenType::Dot),
            b'-' => self.make_token(TokenType::Minus),
            b'+' => self.make_token(TokenType::Plus),
            b'/' => self.make_token(TokenType::Slash),
            b'*' => self.make_token(TokenType::Star),
            b'!' => {
                let kind = if self.matches(b'=') { TokenType::BangEqual } else { TokenType::Bang };
                self.make_token(kind)
            }
            b'=' => {
                let kind =
                    if self.matches(b'=') { TokenType::EqualEqual } else { TokenType::Equal };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.matches(b'=') { TokenType::LessEqual } else { TokenType::Less };
                self.make_token(kind)
            }
            b'>' => {
                let kind =
                    if self.matches(b'=') { TokenType::GreaterEqual } else { TokenType::Greater };
                self.make_token(kind)
            }
            b'"' => self.string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'src> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }
        self.advance(); // closing quote
        self.make_token(TokenType::StringLit)
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.make_token(TokenType::Number)
    }

    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }
        let kind = self.identifier_type();
        self.make_token(kind)
    }

    /// A trie over the keyword set, matched one character at a time like
    /// clox's `identifierType`.
    fn identifier_type(&self) -> TokenType {
        let text = &self.source[self.start..self.current];
        match text {
            "and" => TokenType::And,
            "class" => TokenType::Class,
            "else" => TokenType::Else,
            "false" => TokenType::False,
            "for" => TokenType::For,
            "fun" => TokenType::Fun,
            "if" => TokenType::If,
            "nil" => TokenType::Nil,
            "or" => TokenType::Or,
            "print" => TokenType::Print,
            "return" => TokenType::Return,
            "super" => TokenType::Super,
            "this" => TokenType::This,
            "true" => TokenType::True,
            "var" => TokenType::Var,
            "while" => TokenType::While,
            _ => TokenType::Identifier,
        }
    }

    fn make_token(&self, kind: TokenType) -> Token<'src> {
        Token { kind, lexeme: &self.source[self.start..self.current], line: self.line }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token { kind: TokenType::Error, lexeme: message, line: self.line }
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        loop {
            let tok = scanner.scan_token();
            let done = tok.kind == TokenType::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_arithmetic_expression() {
        use TokenType::*;
        assert_eq!(kinds("1 + 2;"), vec![Number, Plus, Number, Semicolon, Eof]);
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        use TokenType::*;
        assert_eq!(kinds("var x = nil;"), vec![Var, Identifier, Equal, Nil, Semicolon, Eof]);
    }

    #[test]
    fn tracks_line_numbers_across_newlines_in_strings() {
        let mut scanner = Scanner::new("\"a\nb\" 1");
        let str_tok = scanner.scan_token();
        assert_eq!(str_tok.kind, TokenType::StringLit);
        let num_tok = scanner.scan_token();
        assert_eq!(num_tok.line, 2);
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let mut scanner = Scanner::new("\"abc");
        let tok = scanner.scan_token();
        assert_eq!(tok.kind, TokenType::Error);
        assert_eq!(tok.lexeme, "Unterminated string.");
    }

    #[test]
    fn line_comment_is_skipped() {
        use TokenType::*;
        assert_eq!(kinds("// comment\n1;"), vec![Number, Semicolon, Eof]);
    }
}
