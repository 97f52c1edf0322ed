use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
pub enum Register {
    A,
    X,
    Y,
}

impl Register {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_uppercase().parse::<Self>() {
            Ok(r) => Ok(r),
            Err(_) => Err(format!("Unknown register: {s}")),
        }
    }

    pub fn is_index(self) -> bool {
        matches!(self, Register::X | Register::Y)
    }
}

#[test]
fn test() {
    assert_eq!(Register::parse("a"), Ok(Register::A));
    assert_eq!(Register::parse("Y"), Ok(Register::Y));
    assert!(Register::parse("z").is_err());
    assert!(!Register::A.is_index());
}
