use crate::cpu::Category;
use crate::preprocess::{Blob, Layout};
use std::fmt;
use std::rc::Rc;
use strum::{Display, EnumString};

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal spelling as written
    pub text: String,
    pub pos: Pos,
    /// Index of the logical line the token was read from
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Pos, line: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            pos,
            line,
        }
    }

    /// Lowercased spelling, used for case-insensitive word matching
    pub fn word(&self) -> String {
        self.text.to_ascii_lowercase()
    }
}

// Tokens are equal when they are spelled the same
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Double character tokens
    EqualEqual,   // ==
    ExclEqual,    // !=
    LAngleEqual,  // <=
    RAngleEqual,  // >=
    LAngleLAngle, // <<
    RAngleRAngle, // >>

    // Single character tokens
    Equal,     // =
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Ampersand, // &
    Pipe,      // |
    Caret,     // ^
    Excl,      // !
    Tilde,     // ~
    Hash,      // #
    Colon,     // :
    Semicolon, // ;
    Comma,     // ,
    Period,    // .
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LCurly,    // {
    RCurly,    // }
    LAngle,    // <
    RAngle,    // >

    // Words
    Directive(Directive),
    Kw(Keyword),
    Reserved(Category, String),
    Ident(String),

    // Literals
    Number(i64),
    Text(String),

    // Forwarded by the preprocessor
    Layout(Layout),
    Blob(Blob),
}

/// Preprocessor directives, written after `#`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Directive {
    Define,
    Undef,
    Ifdef,
    Ifndef,
    Else,
    Endif,
    Include,
    Incbin,
    Todo,
    Warning,
    Error,
    Fatal,
    Setpad,
    Align,
    #[strum(serialize = "ram.org")]
    RamOrg,
    #[strum(serialize = "ram.end")]
    RamEnd,
    #[strum(serialize = "rom.org")]
    RomOrg,
    #[strum(serialize = "rom.end")]
    RomEnd,
    #[strum(serialize = "rom.bank")]
    RomBank,
    #[strum(serialize = "rom.banksize")]
    RomBankSize,
    #[strum(serialize = "tell.bank")]
    TellBank,
    #[strum(serialize = "tell.bankoffset")]
    TellBankOffset,
    #[strum(serialize = "tell.banksize")]
    TellBankSize,
    #[strum(serialize = "tell.bankfree")]
    TellBankFree,
}

impl Directive {
    pub fn is_conditional(self) -> bool {
        use Directive::*;
        matches!(self, Ifdef | Ifndef | Else | Endif)
    }
}

/// Language reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Struct,
    Typedef,
    Shared,
    Noreturn,
    Return,
    Inline,
    Function,
    Interrupt,
    Lo,
    Hi,
    Nylo,
    Nyhi,
    Sizeof,
    If,
    Else,
    While,
    Do,
    Forever,
    Switch,
    Case,
    Default,
    Reg,
    Near,
    Far,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pos {
    pub file: Rc<str>,
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(file: &Rc<str>, line: usize, col: usize) -> Self {
        Pos {
            file: Rc::clone(file),
            line,
            col,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
