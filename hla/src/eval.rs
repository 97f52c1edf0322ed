use crate::error::{Error, ErrorKind};
use crate::grammer::ast::{BinaryOp, Expr, KeywordOp, UnaryOp, Value};

/// Names visible to constant folding
pub trait Scope {
    /// Numeric value of a name or member path
    fn value(&self, path: &[String]) -> Option<i64>;
    /// Size in bytes of a type, variable or member path
    fn size_of(&self, path: &[String]) -> Option<usize>;
}

/// Folded initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Init {
    Number(i64),
    List(Vec<Init>),
}

impl Init {
    pub fn flatten(&self) -> Vec<i64> {
        match self {
            Init::Number(n) => vec![*n],
            Init::List(items) => items.iter().flat_map(Init::flatten).collect(),
        }
    }
}

pub fn fold(expr: &Expr, scope: &dyn Scope) -> Result<i64, Error> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Name(path, pos) => scope
            .value(path)
            .ok_or_else(|| Error::new(ErrorKind::NotAConstant(path.join(".")), pos)),
        Expr::Unary(op, e) => {
            let v = fold(e, scope)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Neg => v.wrapping_neg(),
                UnaryOp::Not => (v == 0) as i64,
                UnaryOp::BitNot => !v,
            })
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, fold(lhs, scope)?, fold(rhs, scope)?),
        Expr::Keyword(KeywordOp::Sizeof, e) => match e.as_ref() {
            Expr::Name(path, pos) => scope
                .size_of(path)
                .map(|size| size as i64)
                .ok_or_else(|| Error::new(ErrorKind::UnknownSymbol(path.join(".")), pos)),
            other => Ok(width(fold(other, scope)?) as i64),
        },
        Expr::Keyword(op, e) => {
            let v = fold(e, scope)?;
            Ok(match op {
                KeywordOp::Lo => v & 0xFF,
                KeywordOp::Hi => (v >> 8) & 0xFF,
                KeywordOp::Nylo => v & 0x0F,
                KeywordOp::Nyhi => (v >> 4) & 0x0F,
                KeywordOp::Sizeof => width(v) as i64,
            })
        }
    }
}

/// Fold unless a name is unresolved
pub fn try_fold(expr: &Expr, scope: &dyn Scope) -> Result<Option<i64>, Error> {
    match fold(expr, scope) {
        Ok(v) => Ok(Some(v)),
        Err(Error {
            kind: ErrorKind::NotAConstant(_) | ErrorKind::UnknownSymbol(_),
            ..
        }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fold an initializer; strings become their bytes and a terminating zero
pub fn fold_value(value: &Value, scope: &dyn Scope) -> Result<Init, Error> {
    match value {
        Value::Expr(e) => Ok(Init::Number(fold(e, scope)?)),
        Value::Text(s) => Ok(Init::List(
            s.bytes()
                .chain(std::iter::once(0))
                .map(|b| Init::Number(b as i64))
                .collect(),
        )),
        Value::List(items) => Ok(Init::List(
            items
                .iter()
                .map(|v| fold_value(v, scope))
                .collect::<Result<_, _>>()?,
        )),
    }
}

fn binary(op: BinaryOp, l: i64, r: i64) -> Result<i64, Error> {
    Ok(match op {
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div if r == 0 => return Err(ErrorKind::DivisionByZero.into()),
        BinaryOp::Mod if r == 0 => return Err(ErrorKind::DivisionByZero.into()),
        BinaryOp::Div => l.wrapping_div(r),
        BinaryOp::Mod => l.wrapping_rem(r),
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Shl => l.wrapping_shl(r as u32),
        BinaryOp::Shr => l.wrapping_shr(r as u32),
        BinaryOp::Lt => (l < r) as i64,
        BinaryOp::Gt => (l > r) as i64,
        BinaryOp::Le => (l <= r) as i64,
        BinaryOp::Ge => (l >= r) as i64,
        BinaryOp::Eq => (l == r) as i64,
        BinaryOp::Ne => (l != r) as i64,
        BinaryOp::And => l & r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Or => l | r,
    })
}

/// Bytes needed to hold a number: 1, 2, 4 or 8
fn width(v: i64) -> usize {
    match v.unsigned_abs() {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => 8,
    }
}

/// Scope without names
pub struct Empty;

impl Scope for Empty {
    fn value(&self, _: &[String]) -> Option<i64> {
        None
    }

    fn size_of(&self, _: &[String]) -> Option<usize> {
        None
    }
}
