use crate::Opcode;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Bit numbers of the processor status register
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive, Display,
)]
#[repr(u8)]
pub enum StatusFlag {
    Carry = 0,
    Zero = 1,
    InterruptDisable = 2,
    Decimal = 3,
    Break = 4,
    Overflow = 6,
    Negative = 7,
}

impl StatusFlag {
    pub fn mask(self) -> u8 {
        1 << u8::from(self)
    }
}

/// Flag conditions usable in `if`/`while` clauses
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Flag {
    #[strum(to_string = "positive", serialize = "plus")]
    Positive,
    #[strum(to_string = "negative", serialize = "minus")]
    Negative,
    #[strum(to_string = "greater")]
    Greater,
    #[strum(to_string = "less")]
    Less,
    #[strum(to_string = "overflow")]
    Overflow,
    #[strum(to_string = "carry")]
    Carry,
    #[strum(to_string = "true", serialize = "set", serialize = "nonzero")]
    True,
    #[strum(to_string = "false", serialize = "unset", serialize = "zero", serialize = "clear")]
    False,
    #[strum(to_string = "equal")]
    Equal,
}

impl Flag {
    /// Status bit tested by this condition and the bit value for which it holds
    pub fn status(self) -> (StatusFlag, bool) {
        match self {
            Flag::Positive | Flag::Greater => (StatusFlag::Negative, false),
            Flag::Negative | Flag::Less => (StatusFlag::Negative, true),
            Flag::Overflow => (StatusFlag::Overflow, true),
            Flag::Carry => (StatusFlag::Carry, true),
            Flag::True => (StatusFlag::Zero, false),
            Flag::False | Flag::Equal => (StatusFlag::Zero, true),
        }
    }

    /// Branch instruction taken when the (possibly negated) condition holds
    pub fn branch(self, negated: bool) -> Opcode {
        let (flag, set) = self.status();
        match (flag, set != negated) {
            (StatusFlag::Negative, false) => Opcode::BPL,
            (StatusFlag::Negative, true) => Opcode::BMI,
            (StatusFlag::Overflow, false) => Opcode::BVC,
            (StatusFlag::Overflow, true) => Opcode::BVS,
            (StatusFlag::Carry, false) => Opcode::BCC,
            (StatusFlag::Carry, true) => Opcode::BCS,
            (_, false) => Opcode::BNE,
            (_, true) => Opcode::BEQ,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Distance {
    #[default]
    Near,
    Far,
}

/// `is`/`has` keep the condition, `no`/`not` negate it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Modifier {
    Is,
    Has,
    No,
    Not,
}

impl Modifier {
    pub fn negates(self) -> bool {
        matches!(self, Modifier::No | Modifier::Not)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_words() {
        assert_eq!("plus".parse::<Flag>(), Ok(Flag::Positive));
        assert_eq!("NONZERO".parse::<Flag>(), Ok(Flag::True));
        assert_eq!("clear".parse::<Flag>(), Ok(Flag::False));
        assert_eq!(Flag::True.to_string(), "true");
        assert!("sideways".parse::<Flag>().is_err());
    }

    #[test]
    fn branches() {
        assert_eq!(Flag::Carry.branch(false), Opcode::BCS);
        assert_eq!(Flag::Carry.branch(true), Opcode::BCC);
        assert_eq!(Flag::Equal.branch(false), Opcode::BEQ);
        assert_eq!(Flag::Equal.branch(true), Opcode::BNE);
        assert_eq!(Flag::Less.branch(false), Opcode::BMI);
        assert_eq!(Flag::Overflow.branch(true), Opcode::BVC);
        for flag in [Flag::Positive, Flag::True, Flag::Overflow] {
            assert_eq!(flag.branch(false).invert_branch(), Some(flag.branch(true)));
        }
    }

    #[test]
    fn status_bits() {
        assert_eq!(StatusFlag::Negative.mask(), 0x80);
        assert_eq!(StatusFlag::try_from(6u8).ok(), Some(StatusFlag::Overflow));
        assert!(StatusFlag::try_from(5u8).is_err());
        assert!(Modifier::Not.negates());
        assert!(!Modifier::Has.negates());
        assert_eq!("FAR".parse::<Distance>(), Ok(Distance::Far));
    }
}
