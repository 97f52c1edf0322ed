use super::token::Pos;
use crate::preprocess::Blob;
use hla_arch::{Distance, Flag, Mode, Opcode, Register};

#[derive(Debug, Clone, Default)]
pub struct Ast(pub Vec<Def>);

/// Top level item
#[derive(Debug, Clone)]
pub enum Def {
    Decl(Vec<Decl>),
    Func(FuncDecl),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),             // [shared] type name[dims]:addr = value
    Struct(String, Pos),      // struct name { members }
    Typedef(String, Pos),     // typedef type name
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: String,
    pub shared: bool,
    pub dims: Vec<Option<Expr>>,
    pub address: Option<Expr>,
    pub init: Option<Value>,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
    Function,  // function name()
    Interrupt, // interrupt[.vector] name()
    Macro,     // inline name(params)
}

/// Declaration header; the body is held by the symbol table
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub kind: FuncKind,
    pub name: String,
    pub noreturn: bool,
    pub params: Vec<String>,
    pub vector: Option<String>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),                // { stmt* }
    Decl(Vec<Decl>),                 // byte x, y
    Assign(Vec<String>, Expr, Pos),  // a.b = expr
    Instr(Instr),                    // lda #1
    Label(String, Pos),              // name:
    Call(Call),                      // name(args)
    Return(Pos),                     // return
    If(Clause, Box<Stmt>, Option<Box<Stmt>>), // if (clause) stmt [else stmt]
    While(Clause, Box<Stmt>),        // while (clause) stmt
    DoWhile(Box<Stmt>, Clause),      // do stmt while (clause)
    Forever(Box<Stmt>),              // forever stmt
    Switch(Switch),                  // switch (reg) { case v stmt ... default stmt }
    Incbin(Blob),                    // [label:] #incbin "file"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Function,
    Macro,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub kind: CallKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub register: Register,
    pub cases: Vec<(Expr, Stmt)>,
    pub default: Option<Box<Stmt>>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub opcode: Opcode,
    pub operand: Operand,
    /// Operand value when it folds to a constant
    pub value: Option<i64>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Implied,                 //
    Accumulator,             // a
    Immediate(Expr),         // #expr
    Indirect(Expr),          // (expr)
    Direct(Expr),            // expr
    Indexed(Expr, Register), // expr,x | expr,y
    IndexedIndirect(Expr),   // (expr,x)
    IndirectIndexed(Expr),   // (expr),y
}

impl Operand {
    pub fn mode(&self) -> Mode {
        match self {
            Operand::Implied => Mode::Implied,
            Operand::Accumulator => Mode::Accumulator,
            Operand::Immediate(_) => Mode::Immediate,
            Operand::Indirect(_) => Mode::Indirect,
            Operand::Direct(_) => Mode::Direct,
            Operand::Indexed(_, Register::Y) => Mode::DirectY,
            Operand::Indexed(..) => Mode::DirectX,
            Operand::IndexedIndirect(_) => Mode::IndexedIndirect,
            Operand::IndirectIndexed(_) => Mode::IndirectIndexed,
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Operand::Implied | Operand::Accumulator => None,
            Operand::Immediate(e)
            | Operand::Indirect(e)
            | Operand::Direct(e)
            | Operand::Indexed(e, _)
            | Operand::IndexedIndirect(e)
            | Operand::IndirectIndexed(e) => Some(e),
        }
    }
}

/// `[near|far] [is|has|no|not] flag`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause {
    pub distance: Distance,
    pub negated: bool,
    pub flag: Flag,
}

impl Clause {
    /// Branch taken when the clause holds
    pub fn branch(&self) -> Opcode {
        self.flag.branch(self.negated)
    }

    /// Branch that skips a guarded block. Near blocks branch over the body on
    /// the opposite condition; far blocks branch to the body and fall into a jump.
    pub fn skip(&self) -> Opcode {
        match self.distance {
            Distance::Near => self.flag.branch(!self.negated),
            Distance::Far => self.branch(),
        }
    }
}

/// Initializer value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Expr(Expr),
    Text(String),
    List(Vec<Value>), // { value, ... }
}

/// Immediate expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(i64),
    Name(Vec<String>, Pos), // a.b.c
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Keyword(KeywordOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,   // +
    Neg,    // -
    Not,    // !
    BitNot, // ~
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul, // *
    Div, // /
    Mod, // %
    Add, // +
    Sub, // -
    Shl, // <<
    Shr, // >>
    Lt,  // <
    Gt,  // >
    Le,  // <=
    Ge,  // >=
    Eq,  // ==
    Ne,  // !=
    And, // &
    Xor, // ^
    Or,  // |
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOp {
    Lo,     // lo(v)
    Hi,     // hi(v)
    Nylo,   // nylo(v)
    Nyhi,   // nyhi(v)
    Sizeof, // sizeof(name)
}
