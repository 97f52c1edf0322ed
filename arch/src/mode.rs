use serde::{Deserialize, Serialize};
use strum::Display;

/// Operand addressing modes as tagged by the parser.
///
/// `Direct` covers both absolute and zero page; the final width is chosen
/// from the operand value once it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    Indirect,
    Direct,
    DirectX,
    DirectY,
    /// `(zp,x)`
    IndexedIndirect,
    /// `(zp),y`
    IndirectIndexed,
}

impl Mode {
    /// Whether a resolved direct address fits the zero page
    pub fn fits_zero_page(addr: i64) -> bool {
        (0..=0xFF).contains(&addr)
    }

    pub fn operand_bytes(self, addr: Option<i64>) -> usize {
        match self {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate | Mode::IndexedIndirect | Mode::IndirectIndexed => 1,
            Mode::Indirect => 2,
            Mode::Direct | Mode::DirectX | Mode::DirectY => match addr {
                Some(a) if Self::fits_zero_page(a) => 1,
                _ => 2,
            },
        }
    }
}

#[test]
fn test() {
    assert!(Mode::fits_zero_page(0xFF));
    assert!(!Mode::fits_zero_page(0x100));
    assert_eq!(Mode::Direct.operand_bytes(Some(0x10)), 1);
    assert_eq!(Mode::DirectX.operand_bytes(Some(0x0200)), 2);
    assert_eq!(Mode::Direct.operand_bytes(None), 2);
    assert_eq!(Mode::Implied.operand_bytes(None), 0);
}
