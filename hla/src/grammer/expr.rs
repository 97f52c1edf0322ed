use super::ast::{BinaryOp, Expr, KeywordOp, UnaryOp, Value};
use super::parsercore::Cursor;
use super::token::{Keyword, Token, TokenKind};
use crate::cpu::{Resolution, Site};
use crate::error::{Error, ErrorKind};
use crate::{check, expect, repeat};

impl<'a> Cursor<'a> {
    /// value = "{" [ value { "," value } ] "}" | text | expr
    pub fn parse_value(&mut self) -> Result<Value, Error> {
        if check!(self, TokenKind::LCurly) {
            expect!(self, TokenKind::LCurly)?;
            let items = repeat!(self, self.parse_value(), TokenKind::Comma, TokenKind::RCurly);
            expect!(self, TokenKind::RCurly)?;
            return Ok(Value::List(items));
        }
        if let Some(token) = self.consume_if(|t| matches!(t.kind, TokenKind::Text(_))) {
            if let TokenKind::Text(text) = token.kind {
                return Ok(Value::Text(text));
            }
        }
        Ok(Value::Expr(self.parse_expr()?))
    }

    /// expr = unary { binop unary }
    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_unary()?;
        self.parse_binary(lhs, 0)
    }

    /// Continue a binary expression whose left operand is already parsed
    pub fn parse_binary(&mut self, mut lhs: Expr, min: u8) -> Result<Expr, Error> {
        while let Some((op, prec)) = self.peek().and_then(binary_op) {
            if prec < min {
                break;
            }
            self.next();
            let mut rhs = self.parse_unary()?;
            while let Some((_, next)) = self.peek().and_then(binary_op) {
                if next <= prec {
                    break;
                }
                rhs = self.parse_binary(rhs, prec + 1)?;
            }
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// Expression whose leading name token was already consumed
    pub fn parse_expr_from(&mut self, first: Token) -> Result<Expr, Error> {
        let lhs = self.name_path(first)?;
        self.parse_binary(lhs, 0)
    }

    pub fn at_binary_op(&mut self) -> bool {
        self.peek().and_then(binary_op).is_some()
    }

    /// unary = ( "+" | "-" | "!" | "~" ) unary | keyword "(" expr ")" | prim
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Plus) => Some(UnaryOp::Plus),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            Some(TokenKind::Excl) => Some(UnaryOp::Not),
            Some(TokenKind::Tilde) => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.next();
            return Ok(Expr::Unary(op, Box::new(self.parse_unary()?)));
        }

        let op = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Kw(Keyword::Lo)) => Some(KeywordOp::Lo),
            Some(TokenKind::Kw(Keyword::Hi)) => Some(KeywordOp::Hi),
            Some(TokenKind::Kw(Keyword::Nylo)) => Some(KeywordOp::Nylo),
            Some(TokenKind::Kw(Keyword::Nyhi)) => Some(KeywordOp::Nyhi),
            Some(TokenKind::Kw(Keyword::Sizeof)) => Some(KeywordOp::Sizeof),
            _ => None,
        };
        if let Some(op) = op {
            let keyword = self.next().ok_or_else(|| self.eof())?;
            expect!(self, TokenKind::LParen)?;
            let arg = self.parse_expr()?;
            expect!(self, TokenKind::RParen)?;
            if op == KeywordOp::Sizeof && !matches!(arg, Expr::Name(..) | Expr::Number(_)) {
                return Err(Error::new(
                    ErrorKind::InvalidAddressingMode(
                        "sizeof takes a type, variable or number".to_string(),
                    ),
                    &keyword.pos,
                ));
            }
            return Ok(Expr::Keyword(op, Box::new(arg)));
        }

        self.parse_prim()
    }

    /// prim = number | name { "." name } | "(" expr ")"
    fn parse_prim(&mut self) -> Result<Expr, Error> {
        let token = self.next().ok_or_else(|| self.eof())?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                expect!(self, TokenKind::RParen)?;
                Ok(expr)
            }
            _ => self.name_path(token),
        }
    }

    fn name_path(&mut self, token: Token) -> Result<Expr, Error> {
        let mut path = vec![self.name_of(&token, Site::Expr)?];
        while check!(self, TokenKind::Period) {
            expect!(self, TokenKind::Period)?;
            let member = self.next().ok_or_else(|| self.eof())?;
            path.push(self.name_of(&member, Site::Expr)?);
        }
        Ok(Expr::Name(path, token.pos))
    }

    /// Identifier spelling of a word token at the given site
    pub fn name_of(&self, token: &Token, site: Site) -> Result<String, Error> {
        match &token.kind {
            TokenKind::Ident(name) => Ok(name.clone()),
            TokenKind::Reserved(category, _) => match self.cpu.resolve(*category, site) {
                Resolution::Ident => Ok(token.text.clone()),
                Resolution::Reject => Err(Error::unexpected(token)),
            },
            _ => Err(Error::unexpected(token)),
        }
    }
}

fn binary_op(token: &Token) -> Option<(BinaryOp, u8)> {
    let op = match token.kind {
        TokenKind::Star => (BinaryOp::Mul, 8),
        TokenKind::Slash => (BinaryOp::Div, 8),
        TokenKind::Percent => (BinaryOp::Mod, 8),
        TokenKind::Plus => (BinaryOp::Add, 7),
        TokenKind::Minus => (BinaryOp::Sub, 7),
        TokenKind::LAngleLAngle => (BinaryOp::Shl, 6),
        TokenKind::RAngleRAngle => (BinaryOp::Shr, 6),
        TokenKind::LAngle => (BinaryOp::Lt, 5),
        TokenKind::RAngle => (BinaryOp::Gt, 5),
        TokenKind::LAngleEqual => (BinaryOp::Le, 5),
        TokenKind::RAngleEqual => (BinaryOp::Ge, 5),
        TokenKind::EqualEqual => (BinaryOp::Eq, 4),
        TokenKind::ExclEqual => (BinaryOp::Ne, 4),
        TokenKind::Ampersand => (BinaryOp::And, 3),
        TokenKind::Caret => (BinaryOp::Xor, 2),
        TokenKind::Pipe => (BinaryOp::Or, 1),
        _ => return None,
    };
    Some(op)
}
