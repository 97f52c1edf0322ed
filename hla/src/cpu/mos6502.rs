use super::{Category, Cpu, Resolution, Site};
use crate::error::{At, Error, ErrorKind};
use crate::eval;
use crate::grammer::ast::{Clause, Expr, Instr, Operand};
use crate::grammer::parser::Parser;
use crate::grammer::token::{Keyword, Token, TokenKind};
use crate::memory::Endian;
use crate::{check, expect, optional};
use hla_arch::{Distance, Flag, Modifier, Opcode, Register};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::IntoEnumIterator;

const CONDITION_WORDS: &[&str] = &[
    "is", "has", "no", "not", "plus", "positive", "minus", "negative", "greater", "less",
    "overflow", "carry", "nonzero", "set", "true", "zero", "unset", "false", "clear", "equal",
];

static RESERVED: Lazy<HashMap<String, Category>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for op in Opcode::iter() {
        table.insert(op.to_string().to_ascii_lowercase(), Category::Opcode);
    }
    for reg in Register::iter() {
        table.insert(reg.to_string().to_ascii_lowercase(), Category::Register);
    }
    table.insert("pointer".to_string(), Category::Type);
    table
});

/// MOS 6502 family
#[derive(Debug, Clone, Copy, Default)]
pub struct Mos6502;

impl Cpu for Mos6502 {
    fn name(&self) -> &'static str {
        "6502"
    }

    fn endian(&self) -> Endian {
        Endian::Little
    }

    fn primitives(&self) -> &'static [(&'static str, usize)] {
        &[("pointer", 2)]
    }

    fn is_conditional(&self, word: &str) -> bool {
        CONDITION_WORDS.contains(&word)
    }

    fn reserved(&self, word: &str) -> Option<Category> {
        RESERVED.get(word).copied()
    }

    fn resolve(&self, category: Category, site: Site) -> Resolution {
        match (category, site) {
            (Category::Condition | Category::Register, _) => Resolution::Ident,
            (Category::Type, Site::Expr) => Resolution::Ident,
            (Category::Type, Site::Name) | (Category::Opcode, _) => Resolution::Reject,
        }
    }

    fn is_opcode(&self, word: &str) -> bool {
        Opcode::is_mnemonic(word)
    }

    /// operand = "#" expr
    ///         | [ "reg" "." ] "a"
    ///         | "(" expr "," "x" ")" | "(" expr ")" "," "y" | "(" expr ")"
    ///         | expr [ "," ( "x" | "y" ) ]
    fn instruction(&self, p: &mut Parser<'_>, mnemonic: Token) -> Result<Instr, Error> {
        let opcode = Opcode::parse(&mnemonic.text)
            .map_err(|e| Error::new(ErrorKind::Syntax(e), &mnemonic.pos))?;
        let line = mnemonic.line;

        let operand = if !p.on_line(line) || check!(p, TokenKind::RCurly | TokenKind::Semicolon) {
            Operand::Implied
        } else if check!(p, TokenKind::Hash) {
            expect!(p, TokenKind::Hash)?;
            Operand::Immediate(p.parse_expr()?)
        } else if check!(p, TokenKind::Kw(Keyword::Reg)) {
            let reg = self.register(p)?;
            if reg != Register::A {
                return Err(invalid(&mnemonic, "only the accumulator can be an operand"));
            }
            Operand::Accumulator
        } else if check!(p, TokenKind::LParen) {
            expect!(p, TokenKind::LParen)?;
            let inner = p.parse_expr()?;
            if optional!(p, TokenKind::Comma).is_some() {
                let reg = index_register(p)?;
                expect!(p, TokenKind::RParen)?;
                if reg != Register::X {
                    return Err(invalid(&mnemonic, "indexed indirect addressing must use x"));
                }
                Operand::IndexedIndirect(inner)
            } else {
                expect!(p, TokenKind::RParen)?;
                if p.on_line(line) && check!(p, TokenKind::Comma) {
                    expect!(p, TokenKind::Comma)?;
                    let reg = index_register(p)?;
                    if reg != Register::Y {
                        return Err(invalid(&mnemonic, "indirect indexed addressing must use y"));
                    }
                    Operand::IndirectIndexed(inner)
                } else if p.on_line(line) && p.at_binary_op() {
                    // parenthesised head of a longer expression
                    let expr = p.parse_binary(inner, 0)?;
                    indexed(p, &mnemonic, expr)?
                } else {
                    Operand::Indirect(inner)
                }
            }
        } else if check!(p, TokenKind::Reserved(Category::Register, _)) {
            let first = p.next().ok_or_else(|| p.eof())?;
            let accumulator = matches!(&first.kind, TokenKind::Reserved(_, w) if w == "a")
                && (!p.on_line(line) || check!(p, TokenKind::RCurly | TokenKind::Semicolon));
            if accumulator {
                Operand::Accumulator
            } else {
                let expr = p.parse_expr_from(first)?;
                indexed(p, &mnemonic, expr)?
            }
        } else {
            let expr = p.parse_expr()?;
            indexed(p, &mnemonic, expr)?
        };

        let value = match operand.expr() {
            Some(expr) => eval::try_fold(expr, &*p.ctx).at(&mnemonic.pos)?,
            None => None,
        };
        Ok(Instr {
            opcode,
            operand,
            value,
            pos: mnemonic.pos,
        })
    }

    /// clause = [ "near" | "far" ] [ "is" | "has" | "no" | "not" ] flag
    fn clause(&self, p: &mut Parser<'_>) -> Result<Clause, Error> {
        let distance = if optional!(p, TokenKind::Kw(Keyword::Far)).is_some() {
            Distance::Far
        } else {
            optional!(p, TokenKind::Kw(Keyword::Near));
            Distance::Near
        };

        let mut negated = false;
        let modifier = p.consume_if(|t| {
            matches!(&t.kind, TokenKind::Reserved(Category::Condition, w) if w.parse::<Modifier>().is_ok())
        });
        if let Some(token) = modifier {
            negated = token.word().parse::<Modifier>().is_ok_and(Modifier::negates);
        }

        let token = p.next().ok_or_else(|| p.eof())?;
        let flag = match &token.kind {
            TokenKind::Reserved(Category::Condition, w) => w.parse::<Flag>().ok(),
            TokenKind::Number(1) => Some(Flag::True),
            TokenKind::Number(0) => Some(Flag::False),
            _ => None,
        };
        match flag {
            Some(flag) => Ok(Clause {
                distance,
                negated,
                flag,
            }),
            None => Err(Error::unexpected(&token)),
        }
    }

    /// register = [ "reg" "." ] ( "a" | "x" | "y" )
    fn register(&self, p: &mut Parser<'_>) -> Result<Register, Error> {
        if optional!(p, TokenKind::Kw(Keyword::Reg)).is_some() {
            expect!(p, TokenKind::Period)?;
        }
        let token = expect!(p, TokenKind::Reserved(Category::Register, _))?;
        Register::parse(&token.text).map_err(|e| Error::new(ErrorKind::Syntax(e), &token.pos))
    }
}

fn index_register(p: &mut Parser<'_>) -> Result<Register, Error> {
    let token = expect!(p, TokenKind::Reserved(Category::Register, _))?;
    Register::parse(&token.text).map_err(|e| Error::new(ErrorKind::Syntax(e), &token.pos))
}

// expr [ "," ( "x" | "y" ) ]
fn indexed(p: &mut Parser<'_>, mnemonic: &Token, expr: Expr) -> Result<Operand, Error> {
    if !(p.on_line(mnemonic.line) && check!(p, TokenKind::Comma)) {
        return Ok(Operand::Direct(expr));
    }
    expect!(p, TokenKind::Comma)?;
    match index_register(p)? {
        Register::A => Err(invalid(mnemonic, "the accumulator cannot index")),
        reg => Ok(Operand::Indexed(expr, reg)),
    }
}

fn invalid(mnemonic: &Token, msg: &str) -> Error {
    Error::new(
        ErrorKind::InvalidAddressingMode(format!("{}: {msg}", mnemonic.text)),
        &mnemonic.pos,
    )
}
