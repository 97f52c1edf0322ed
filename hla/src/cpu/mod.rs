pub mod mos6502;

pub use mos6502::Mos6502;

use crate::error::Error;
use crate::grammer::ast::{Clause, Instr};
use crate::grammer::parser::Parser;
use crate::grammer::token::Token;
use crate::memory::Endian;
use hla_arch::Register;
use strum::{Display, EnumString};

/// Categories of CPU reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Category {
    Condition,
    Register,
    Opcode,
    Type,
}

/// Grammar position at which a reserved word is met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// Declared or referenced name: variables, labels, calls, members
    Name,
    /// Operand of an immediate expression
    Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Read the word as a plain identifier
    Ident,
    /// Not allowed here
    Reject,
}

/// Supported CPU families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, clap::ValueEnum)]
pub enum CpuKind {
    #[default]
    #[strum(serialize = "6502")]
    #[value(name = "6502")]
    Mos6502,
}

impl CpuKind {
    pub fn cpu(self) -> Box<dyn Cpu> {
        match self {
            CpuKind::Mos6502 => Box::new(Mos6502),
        }
    }
}

/// CPU family extension of the lexer and parser
pub trait Cpu {
    fn name(&self) -> &'static str;

    fn endian(&self) -> Endian;

    /// Primitive types added to the language ones
    fn primitives(&self) -> &'static [(&'static str, usize)];

    /// Words of conditional clauses
    fn is_conditional(&self, word: &str) -> bool;

    /// Category of a lowercased reserved word
    fn reserved(&self, word: &str) -> Option<Category>;

    /// How a reserved word reads at a grammar site
    fn resolve(&self, category: Category, site: Site) -> Resolution;

    fn is_opcode(&self, word: &str) -> bool;

    /// Instruction line after its mnemonic
    fn instruction(&self, p: &mut Parser<'_>, mnemonic: Token) -> Result<Instr, Error>;

    /// Condition inside the parentheses of `if`/`while`
    fn clause(&self, p: &mut Parser<'_>) -> Result<Clause, Error>;

    /// Register tested by `switch`
    fn register(&self, p: &mut Parser<'_>) -> Result<Register, Error>;
}
