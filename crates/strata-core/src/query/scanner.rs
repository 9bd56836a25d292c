//! Depth-aware SQL scanner.
//!
//! The scanner does not build an AST. It splits text into coarse tokens
//! (words, quoted names, string literals, punctuation) and records the
//! parenthesis depth of each one, which is all the clause splitter needs to
//! find top-level keywords without being fooled by subqueries, literals or
//! comments.

/// Coarse token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword.
    Word,
    /// `"name"`, `[name]` or `` `name` ``.
    Quoted,
    /// `'text'`.
    Str,
    Number,
    OpenParen,
    CloseParen,
    Comma,
    Dot,
    Semicolon,
    /// Any other single character.
    Symbol,
    /// A string or quoted name without its closing quote.
    Unterminated,
}

/// A token and its location in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Parenthesis depth the token sits at. Parentheses themselves carry the
    /// outer depth.
    pub depth: i32,
}

impl Token {
    /// Returns the source text of the token.
    pub fn text(self, input: &str) -> &str {
        &input[self.start..self.end]
    }

    /// Returns `true` if this is a top-level word equal to `keyword`.
    pub fn is_keyword(self, input: &str, keyword: &str) -> bool {
        self.depth == 0
            && self.kind == TokenKind::Word
            && self.text(input).eq_ignore_ascii_case(keyword)
    }
}

/// Character scanner over a SQL fragment.
pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    depth: i32,
}

impl<'a> Scanner<'a> {
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    /// Consumes a quoted run ending in `close`. A doubled `close` is an
    /// escaped quote.
    fn scan_quoted(&mut self, close: char) -> bool {
        self.advance();
        loop {
            match self.advance() {
                Some(c) if c == close => {
                    if self.peek() == Some(close) {
                        self.advance();
                    } else {
                        return true;
                    }
                }
                Some(_) => {}
                None => return false,
            }
        }
    }

    fn scan_word(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$'))
        {
            self.advance();
        }
    }

    fn scan_number(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let c = self.peek()?;
        let mut depth = self.depth;

        let kind = match c {
            '\'' => {
                if self.scan_quoted('\'') {
                    TokenKind::Str
                } else {
                    TokenKind::Unterminated
                }
            }
            '"' | '`' => {
                if self.scan_quoted(c) {
                    TokenKind::Quoted
                } else {
                    TokenKind::Unterminated
                }
            }
            '[' => {
                if self.scan_quoted(']') {
                    TokenKind::Quoted
                } else {
                    TokenKind::Unterminated
                }
            }
            '(' => {
                self.advance();
                self.depth += 1;
                TokenKind::OpenParen
            }
            ')' => {
                self.advance();
                self.depth -= 1;
                depth = self.depth;
                TokenKind::CloseParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '.' if !self.peek_next().is_some_and(|n| n.is_ascii_digit()) => {
                self.advance();
                TokenKind::Dot
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            c if c.is_ascii_digit() || c == '.' => {
                self.scan_number();
                TokenKind::Number
            }
            c if c.is_alphabetic() || matches!(c, '_' | '@' | '#' | '$') => {
                self.scan_word();
                TokenKind::Word
            }
            _ => {
                self.advance();
                TokenKind::Symbol
            }
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
            depth,
        })
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Tokenizes `input`.
pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    Scanner::new(input).collect()
}

/// Returns `true` when every quote is closed and parentheses balance.
pub(crate) fn is_well_formed(tokens: &[Token]) -> bool {
    let mut depth = 0;
    for token in tokens {
        match token.kind {
            TokenKind::Unterminated => return false,
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Rebuilds the text covered by `tokens`, dropping comments and collapsing
/// every gap between tokens to a single space.
pub(crate) fn join_tokens(input: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev_end: Option<usize> = None;
    for token in tokens {
        if let Some(end) = prev_end {
            if token.start > end {
                out.push(' ');
            }
        }
        out.push_str(token.text(input));
        prev_end = Some(token.end);
    }
    out
}

/// Splits `input` on top-level commas.
pub(crate) fn split_top_level(input: &str) -> Vec<String> {
    let tokens = tokenize(input);
    tokens
        .split(|t| t.kind == TokenKind::Comma && t.depth == 0)
        .map(|part| join_tokens(input, part))
        .filter(|part| !part.is_empty())
        .collect()
}

/// Finds the first top-level occurrence of the keyword sequence `words`
/// and returns the index of its first token.
pub(crate) fn find_keywords(input: &str, tokens: &[Token], words: &[&str]) -> Option<usize> {
    if words.is_empty() {
        return None;
    }
    tokens.windows(words.len()).position(|window| {
        window
            .iter()
            .zip(words)
            .all(|(token, word)| token.is_keyword(input, word))
    })
}

/// Returns `true` if `input` contains `keyword` outside parentheses,
/// literals and comments.
pub(crate) fn contains_top_level(input: &str, keyword: &str) -> bool {
    tokenize(input)
        .iter()
        .any(|t| t.is_keyword(input, keyword))
}

/// Strips a table qualifier from a column reference: `T.Id` becomes `Id`.
/// Expressions without a top-level dot are returned unchanged.
pub(crate) fn unqualify(input: &str) -> String {
    let tokens = tokenize(input);
    match tokens
        .iter()
        .rposition(|t| t.kind == TokenKind::Dot && t.depth == 0)
    {
        Some(dot) => join_tokens(input, &tokens[dot + 1..]),
        None => join_tokens(input, &tokens),
    }
}
