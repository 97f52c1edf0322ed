use super::token::{Pos, Token};
use crate::cpu::Cpu;
use crate::error::{Error, ErrorKind};

pub type TokenStream<'a> = Box<dyn Iterator<Item = Result<Token, Error>> + 'a>;

/// Token cursor shared by the expression, declaration and CPU grammars.
///
/// A failure from the token source ends the stream; it is reported in
/// preference to whatever the grammar makes of the early end.
pub struct Cursor<'a> {
    tokens: TokenStream<'a>,
    peeked: Option<Token>,
    fault: Option<Error>,
    last: Option<Pos>,
    pub cpu: &'a dyn Cpu,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: TokenStream<'a>, cpu: &'a dyn Cpu) -> Self {
        Cursor {
            tokens,
            peeked: None,
            fault: None,
            last: None,
            cpu,
        }
    }

    pub fn from_tokens(tokens: Vec<Token>, cpu: &'a dyn Cpu) -> Self {
        Self::new(Box::new(tokens.into_iter().map(Ok)), cpu)
    }

    /// Error raised by the token source, if any
    pub fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }

    /// Error for a grammar that ran out of tokens
    pub fn eof(&mut self) -> Error {
        if let Some(e) = self.fault.take() {
            return e;
        }
        match &self.last {
            Some(pos) => Error::new(ErrorKind::UnexpectedEOF, pos),
            None => ErrorKind::UnexpectedEOF.into(),
        }
    }
}

impl<'a> Cursor<'a> {
    fn fill(&mut self) {
        if self.peeked.is_some() || self.fault.is_some() {
            return;
        }
        match self.tokens.next() {
            Some(Ok(token)) => self.peeked = Some(token),
            Some(Err(e)) => self.fault = Some(e),
            None => {}
        }
    }

    /// Peek : Watch next token without consuming it
    pub fn peek(&mut self) -> Option<&Token> {
        self.fill();
        self.peeked.as_ref()
    }

    /// Next : Consume next token and return it
    pub fn next(&mut self) -> Option<Token> {
        self.fill();
        let token = self.peeked.take();
        if let Some(token) = &token {
            self.last = Some(token.pos.clone());
        }
        token
    }

    pub fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Peek and check next token is match with condition
    pub fn check_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> bool {
        self.peek().is_some_and(cond)
    }

    /// Consume if next token is match with condition
    pub fn consume_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Option<Token> {
        if self.check_if(cond) {
            self.next()
        } else {
            None
        }
    }

    /// Next token must be match with condition
    pub fn expect_tobe<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Result<Token, Error> {
        match self.peek() {
            Some(token) if cond(token) => self.next().ok_or_else(|| self.eof()),
            Some(token) => Err(Error::unexpected(token)),
            None => Err(self.eof()),
        }
    }

    /// Next token exists and was read from the given logical line
    pub fn on_line(&mut self, line: usize) -> bool {
        self.check_if(|token| token.line == line)
    }
}

#[macro_export]
macro_rules! check {
    ($parser:expr, $kind:pat) => {
        $parser.check_if(|token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! expect {
    ($parser:expr, $kind:pat) => {
        $parser.expect_tobe(|token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! optional {
    ($parser:expr, $trigger:pat, $following:expr) => {
        if check!($parser, $trigger) {
            expect!($parser, $trigger)?;
            Some($following)
        } else {
            None
        }
    };
    ($parser:expr, $trigger:pat) => {
        $parser.consume_if(|token| matches!(&token.kind, $trigger))
    };
}

/// Parse repeated elements with optional delimiters
/// 3 args: { element } terminal (no delimiter)
/// 4 args: [ element { delimiter element } ] terminal (with delimiter)
#[macro_export]
macro_rules! repeat {
    ($parser:expr, $elem:expr, $terminal:pat) => {{
        let mut items = Vec::new();
        while !check!($parser, $terminal) {
            if $parser.is_eof() {
                return Err($parser.eof());
            }
            items.push($elem?);
        }
        items
    }};

    ($parser:expr, $elem:expr, $delimiter:pat, $terminal:pat) => {{
        let mut items = Vec::new();
        if !check!($parser, $terminal) {
            items.push($elem?);
            while check!($parser, $delimiter) {
                expect!($parser, $delimiter)?;
                items.push($elem?);
            }
        }
        items
    }};
}
