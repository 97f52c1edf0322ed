use crate::grammer::token::{Pos, Token};
use crate::memory::RegionOverflow;
use color_print::cprintln;
use std::fmt;
use thiserror::Error;

// Offending token without the resolved value
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub text: String,
    pub pos: Pos,
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.text)
    }
}

impl From<&Token> for TokenInfo {
    fn from(token: &Token) -> Self {
        TokenInfo {
            text: token.text.clone(),
            pos: token.pos.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Failed to read {0}")]
    Io(String, #[source] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    // Preprocessor errors
    #[error("Unknown directive: #{0}")]
    UnknownDirective(String),

    #[error("#{0} without matching #ifdef/#ifndef")]
    UnmatchedDirective(String),

    #[error("Unclosed conditional block")]
    UnclosedConditional,

    #[error("{0}")]
    UserError(String),

    // Lexer errors
    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Unterminated string literal")]
    UnterminatedString,

    #[error("Unexpected character: {0:?}")]
    UnexpectedChar(char),

    // Parse errors
    #[error("Unexpected end of file")]
    UnexpectedEOF,

    #[error("Unexpected token: {0}")]
    UnexpectedToken(TokenInfo),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Invalid addressing mode: {0}")]
    InvalidAddressingMode(String),

    // Registry errors
    #[error("Duplicate type: {0}")]
    DuplicateType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Call to undeclared name: {0}")]
    UnknownCall(String),

    #[error("{0} takes {1} argument(s) but {2} were given")]
    MacroArityMismatch(String, usize, usize),

    #[error("{0} is not callable")]
    NotCallable(String),

    #[error("Irregular array shape: {0}")]
    IrregularArrayShape(String),

    // Evaluation errors
    #[error("{0} is not a constant")]
    NotAConstant(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{0} does not fit in {1} byte(s)")]
    ValueOutOfRange(i64, usize),

    // Layout errors
    #[error(transparent)]
    RegionOverflow(#[from] RegionOverflow),
}

/// Error raised by the front end, located at the offending token when known
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub pos: Option<Pos>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl Error {
    pub fn new(kind: ErrorKind, pos: &Pos) -> Self {
        Error {
            kind,
            pos: Some(pos.clone()),
        }
    }

    pub fn unexpected(token: &Token) -> Self {
        Error::new(ErrorKind::UnexpectedToken(token.into()), &token.pos)
    }

    /// Print the error with the offending source line
    pub fn print_diag(&self) {
        cprintln!("<red,bold>error</>: {}", self.kind);
        let Some(pos) = &self.pos else {
            return;
        };
        cprintln!("     <blue>--></> <underline>{}</>", pos);
        cprintln!("      <blue>|</>");

        // Sources held in memory have no file to show
        let line = std::fs::read_to_string(&*pos.file)
            .ok()
            .and_then(|text| text.lines().nth(pos.line.saturating_sub(1)).map(str::to_string))
            .unwrap_or_default();
        cprintln!(" <blue>{:>4} |</> {}", pos.line, line);
        let indent = " ".repeat(pos.col.saturating_sub(1));
        cprintln!("      <blue>|</> {}<red,bold>^</>", indent);
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind, pos: None }
    }
}

impl From<RegionOverflow> for Error {
    fn from(e: RegionOverflow) -> Self {
        ErrorKind::RegionOverflow(e).into()
    }
}

/// Attach a source position to errors that do not carry one yet
pub trait At<T> {
    fn at(self, pos: &Pos) -> Result<T, Error>;
}

impl<T, E: Into<Error>> At<T> for Result<T, E> {
    fn at(self, pos: &Pos) -> Result<T, Error> {
        self.map_err(|e| {
            let mut e: Error = e.into();
            if e.pos.is_none() {
                e.pos = Some(pos.clone());
            }
            e
        })
    }
}
