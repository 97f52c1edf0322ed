use super::token::{Directive, Keyword, Pos, Token, TokenKind};
use crate::cpu::{Category, Cpu};
use crate::error::{Error, ErrorKind};
use std::iter::Peekable;
use std::rc::Rc;
use std::str::CharIndices;

/// One logical line: physical lines joined at continuation markers by `\n`
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub file: Rc<str>,
    /// 1-based physical line the logical line starts on
    pub line: usize,
    /// Sequence number of the logical line
    pub index: usize,
}

/// Tokenizer for logical lines.
///
/// Block comments may span lines, so the lexer keeps that state between calls.
pub struct Lexer<'c> {
    cpu: &'c dyn Cpu,
    in_comment: bool,
}

impl<'c> Lexer<'c> {
    pub fn new(cpu: &'c dyn Cpu) -> Self {
        Self {
            cpu,
            in_comment: false,
        }
    }

    pub fn in_comment(&self) -> bool {
        self.in_comment
    }

    pub fn tokenize(&mut self, line: &Line) -> Result<Vec<Token>, Error> {
        let lexer = LineLexer {
            iter: line.text.char_indices().peekable(),
            text: &line.text,
            file: &line.file,
            row: line.line,
            row_start: 0,
            index: line.index,
            cpu: self.cpu,
            in_comment: &mut self.in_comment,
        };
        lexer.parse()
    }

    /// Tokenize a whole text, one physical line per logical line
    pub fn tokenize_str(&mut self, file: &str, code: &str) -> Result<Vec<Token>, Error> {
        let file: Rc<str> = Rc::from(file);
        let mut tokens = Vec::new();
        for (idx, text) in code.lines().enumerate() {
            let line = Line {
                text: text.to_string(),
                file: Rc::clone(&file),
                line: idx + 1,
                index: idx,
            };
            tokens.extend(self.tokenize(&line)?);
        }
        Ok(tokens)
    }
}

struct LineLexer<'a> {
    iter: Peekable<CharIndices<'a>>,
    text: &'a str,
    file: &'a Rc<str>,
    row: usize,
    row_start: usize,
    index: usize,
    cpu: &'a dyn Cpu,
    in_comment: &'a mut bool,
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

impl<'a> LineLexer<'a> {
    fn peek_nth(&self, n: usize) -> Option<(usize, char)> {
        self.iter.clone().nth(n)
    }

    fn peek_char(&self, n: usize) -> Option<char> {
        self.peek_nth(n).map(|(_, ch)| ch)
    }

    fn consume(&mut self) -> Option<(usize, char)> {
        let next = self.iter.next();
        if let Some((idx, '\n')) = next {
            self.row += 1;
            self.row_start = idx + 1;
        }
        next
    }

    fn pos(&self, idx: usize) -> Pos {
        Pos::new(self.file, self.row, idx - self.row_start + 1)
    }

    fn offset(&mut self) -> usize {
        self.iter.peek().map(|&(idx, _)| idx).unwrap_or(self.text.len())
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize, pos: Pos) -> Token {
        Token::new(kind, &self.text[start..end], pos, self.index)
    }

    fn error(&self, kind: ErrorKind, pos: &Pos) -> Error {
        Error::new(kind, pos)
    }
}

// ----------------------------------------------------------------------------
// Lexer
// ----------------------------------------------------------------------------

impl<'a> LineLexer<'a> {
    fn parse(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        while let Some((idx, ch0)) = self.peek_nth(0) {
            let ch1 = self.peek_char(1);

            // 0. Inside a block comment
            if *self.in_comment {
                self.consume();
                if ch0 == '*' && ch1 == Some('/') {
                    self.consume();
                    *self.in_comment = false;
                }
                continue;
            }

            // 1. Skip whitespaces
            if ch0.is_whitespace() {
                self.consume();
                continue;
            }

            let pos = self.pos(idx);

            // 2. Comments
            if ch0 == '/' && ch1 == Some('/') {
                while self.peek_char(0).is_some_and(|ch| ch != '\n') {
                    self.consume();
                }
                continue;
            }
            if ch0 == '/' && ch1 == Some('*') {
                self.consume();
                self.consume();
                *self.in_comment = true;
                continue;
            }

            // 3. Directive
            if ch0 == '#' && directive_allowed(&tokens) {
                if let Some(token) = self.parse_directive(idx, pos.clone(), tokens.is_empty())? {
                    tokens.push(token);
                    continue;
                }
            }

            // 4. Double character token
            if let Some(kind) = ch1.and_then(|ch1| double_char_token(ch0, ch1)) {
                self.consume();
                self.consume();
                tokens.push(self.token(kind, idx, idx + 2, pos));
                continue;
            }

            // 5. Prefixed number literals
            let binary = ch0 == '%'
                && matches!(ch1, Some('0' | '1'))
                && !tokens.last().is_some_and(ends_operand);
            if binary || ch0 == '$' {
                let kind = self.parse_prefixed(ch0, &pos)?;
                let end = self.offset();
                tokens.push(self.token(kind, idx, end, pos));
                continue;
            }

            // 6. Single character token
            if let Some(kind) = single_char_token(ch0) {
                self.consume();
                tokens.push(self.token(kind, idx, idx + 1, pos));
                continue;
            }

            // 7. Number literal
            if ch0.is_ascii_digit() {
                let kind = self.parse_number(&pos)?;
                let end = self.offset();
                tokens.push(self.token(kind, idx, end, pos));
                continue;
            }

            // 8. String literal
            if ch0 == '"' {
                let kind = self.parse_text(&pos)?;
                let end = self.offset();
                tokens.push(self.token(kind, idx, end, pos));
                continue;
            }

            // 9. Identifier or reserved word
            if ch0.is_ascii_alphabetic() || ch0 == '_' {
                let word = self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
                let end = idx + word.len();
                let kind = classify(self.cpu, &word);
                tokens.push(self.token(kind, idx, end, pos));
                continue;
            }

            return Err(self.error(ErrorKind::UnexpectedChar(ch0), &pos));
        }
        Ok(tokens)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, cond: F) -> String {
        let mut lexeme = String::new();
        while let Some(ch) = self.peek_char(0).filter(|&ch| cond(ch)) {
            lexeme.push(ch);
            self.consume();
        }
        lexeme
    }

    // #name or #name.sub
    fn parse_directive(&mut self, idx: usize, pos: Pos, leading: bool) -> Result<Option<Token>, Error> {
        let name: String = self
            .iter
            .clone()
            .skip(1)
            .map(|(_, ch)| ch)
            .take_while(|&ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
            .collect();
        match name.to_ascii_lowercase().parse::<Directive>() {
            Ok(directive) => {
                for _ in 0..=name.len() {
                    self.consume();
                }
                let end = idx + 1 + name.len();
                Ok(Some(self.token(TokenKind::Directive(directive), idx, end, pos)))
            }
            Err(_) if leading && !name.is_empty() => {
                Err(self.error(ErrorKind::UnknownDirective(name), &pos))
            }
            Err(_) => Ok(None),
        }
    }

    // $hex or %binary
    fn parse_prefixed(&mut self, prefix: char, pos: &Pos) -> Result<TokenKind, Error> {
        self.consume();
        let radix = if prefix == '$' { 16 } else { 2 };
        let digits = self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        self.to_number(&digits, radix, 1, &format!("{prefix}{digits}"), pos)
    }

    // 123, 4K, 0x1F
    fn parse_number(&mut self, pos: &Pos) -> Result<TokenKind, Error> {
        if self.peek_char(0) == Some('0') && matches!(self.peek_char(1), Some('x' | 'X')) {
            self.consume();
            self.consume();
            let digits = self.take_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
            return self.to_number(&digits, 16, 1, &format!("0x{digits}"), pos);
        }
        let digits = self.take_while(|ch| ch.is_ascii_digit());
        let kilo = matches!(self.peek_char(0), Some('k' | 'K'))
            && !self
                .peek_char(1)
                .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if kilo {
            self.consume();
            return self.to_number(&digits, 10, 1024, &format!("{digits}K"), pos);
        }
        if let Some(ch) = self.peek_char(0).filter(|ch| ch.is_ascii_alphabetic() || *ch == '_') {
            return Err(self.error(ErrorKind::InvalidNumber(format!("{digits}{ch}")), pos));
        }
        self.to_number(&digits, 10, 1, &digits, pos)
    }

    fn to_number(
        &self,
        digits: &str,
        radix: u32,
        scale: i64,
        spelling: &str,
        pos: &Pos,
    ) -> Result<TokenKind, Error> {
        i64::from_str_radix(digits, radix)
            .ok()
            .filter(|_| !digits.is_empty())
            .and_then(|value| value.checked_mul(scale))
            .map(TokenKind::Number)
            .ok_or_else(|| self.error(ErrorKind::InvalidNumber(spelling.to_string()), pos))
    }

    // Text: "hoge\nfuga"
    fn parse_text(&mut self, pos: &Pos) -> Result<TokenKind, Error> {
        self.consume();
        let mut lexeme = String::new();
        loop {
            let ch = match self.consume() {
                Some((_, '"')) => break,
                Some((_, '\n')) | None => {
                    return Err(self.error(ErrorKind::UnterminatedString, pos));
                }
                Some((_, ch)) => ch,
            };
            if ch != '\\' {
                lexeme.push(ch);
                continue;
            }
            match self.consume().map(|(_, ch)| ch) {
                Some('n') => lexeme.push('\n'),
                Some('t') => lexeme.push('\t'),
                Some('r') => lexeme.push('\r'),
                Some('0') => lexeme.push('\0'),
                Some('x') => {
                    let hex: String = (0..2).filter_map(|_| self.consume()).map(|(_, c)| c).collect();
                    let code = u8::from_str_radix(&hex, 16)
                        .map_err(|_| self.error(ErrorKind::InvalidNumber(format!("\\x{hex}")), pos))?;
                    lexeme.push(code as char);
                }
                Some(ch @ ('\\' | '"' | '\'')) => lexeme.push(ch),
                Some(ch) => {
                    return Err(self.error(
                        ErrorKind::Syntax(format!("invalid escape sequence \\{ch}")),
                        pos,
                    ));
                }
                None => return Err(self.error(ErrorKind::UnterminatedString, pos)),
            }
        }
        Ok(TokenKind::Text(lexeme))
    }
}

/// Classify a word: language keyword, conditional word, CPU word, or identifier
pub fn classify(cpu: &dyn Cpu, word: &str) -> TokenKind {
    let lower = word.to_ascii_lowercase();
    if let Ok(kw) = lower.parse::<Keyword>() {
        return TokenKind::Kw(kw);
    }
    if cpu.is_conditional(&lower) {
        return TokenKind::Reserved(Category::Condition, lower);
    }
    match cpu.reserved(&lower) {
        Some(category) => TokenKind::Reserved(category, lower),
        None => TokenKind::Ident(word.to_string()),
    }
}

// A directive may lead the line or follow `label:`
fn directive_allowed(tokens: &[Token]) -> bool {
    match tokens {
        [] => true,
        [label, colon] => {
            matches!(label.kind, TokenKind::Ident(_) | TokenKind::Reserved(..))
                && colon.kind == TokenKind::Colon
        }
        _ => false,
    }
}

fn ends_operand(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Number(_)
            | TokenKind::Ident(_)
            | TokenKind::Reserved(..)
            | TokenKind::RParen
            | TokenKind::RBracket
    )
}

fn double_char_token(ch0: char, ch1: char) -> Option<TokenKind> {
    match (ch0, ch1) {
        ('=', '=') => Some(TokenKind::EqualEqual),
        ('!', '=') => Some(TokenKind::ExclEqual),
        ('<', '=') => Some(TokenKind::LAngleEqual),
        ('>', '=') => Some(TokenKind::RAngleEqual),
        ('<', '<') => Some(TokenKind::LAngleLAngle),
        ('>', '>') => Some(TokenKind::RAngleRAngle),
        _ => None,
    }
}

fn single_char_token(ch: char) -> Option<TokenKind> {
    match ch {
        '=' => Some(TokenKind::Equal),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '/' => Some(TokenKind::Slash),
        '%' => Some(TokenKind::Percent),
        '&' => Some(TokenKind::Ampersand),
        '|' => Some(TokenKind::Pipe),
        '^' => Some(TokenKind::Caret),
        '!' => Some(TokenKind::Excl),
        '~' => Some(TokenKind::Tilde),
        '#' => Some(TokenKind::Hash),
        ':' => Some(TokenKind::Colon),
        ';' => Some(TokenKind::Semicolon),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Period),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '{' => Some(TokenKind::LCurly),
        '}' => Some(TokenKind::RCurly),
        '<' => Some(TokenKind::LAngle),
        '>' => Some(TokenKind::RAngle),
        _ => None,
    }
}
