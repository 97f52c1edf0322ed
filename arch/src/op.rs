use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// 6502 instruction mnemonics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
pub enum Opcode {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PLA,
    PLP,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
}

static MNEMONICS: Lazy<HashSet<String>> =
    Lazy::new(|| Opcode::iter().map(|op| op.to_string().to_lowercase()).collect());

impl Opcode {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(op) => Ok(op),
            Err(_) => Err(format!("Unknown opcode: {s}")),
        }
    }

    /// Case-insensitive membership test
    pub fn is_mnemonic(s: &str) -> bool {
        MNEMONICS.contains(&s.to_ascii_lowercase())
    }

    pub fn is_branch(self) -> bool {
        use Opcode::*;
        matches!(self, BCC | BCS | BEQ | BMI | BNE | BPL | BVC | BVS)
    }

    /// Branch with the opposite condition
    pub fn invert_branch(self) -> Option<Self> {
        use Opcode::*;
        Some(match self {
            BCC => BCS,
            BCS => BCC,
            BEQ => BNE,
            BNE => BEQ,
            BMI => BPL,
            BPL => BMI,
            BVC => BVS,
            BVS => BVC,
            _ => return None,
        })
    }

    /// Compare instruction used to test a register against a value
    pub fn compare_for(reg: crate::Register) -> Self {
        match reg {
            crate::Register::A => Opcode::CMP,
            crate::Register::X => Opcode::CPX,
            crate::Register::Y => Opcode::CPY,
        }
    }
}

#[test]
fn test() {
    assert_eq!(Opcode::iter().count(), 56);
    assert_eq!(Opcode::parse("lda"), Ok(Opcode::LDA));
    assert_eq!(Opcode::parse("Sta"), Ok(Opcode::STA));
    assert!(Opcode::parse("hoge").is_err());
    assert!(Opcode::is_mnemonic("TXS"));
    assert!(!Opcode::is_mnemonic("foo"));
    assert_eq!(Opcode::BEQ.invert_branch(), Some(Opcode::BNE));
    assert_eq!(Opcode::LDA.invert_branch(), None);
    assert!(Opcode::BVS.is_branch());
}
