use crate::error::ErrorKind;
use crate::eval::Init;
use crate::grammer::ast::Stmt;
use crate::types::Type;
use indexmap::IndexMap;
use serde::Serialize;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(Variable),
    Function(Function),
    Interrupt(Function),
    Macro(Macro),
}

impl Symbol {
    pub fn kind(&self) -> &'static str {
        match self {
            Symbol::Variable(_) => "variable",
            Symbol::Function(_) => "function",
            Symbol::Interrupt(_) => "interrupt",
            Symbol::Macro(_) => "macro",
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Symbol::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Statement body of functions, interrupts and macros
    pub fn body_mut(&mut self) -> Option<&mut Vec<Stmt>> {
        match self {
            Symbol::Function(f) | Symbol::Interrupt(f) => Some(&mut f.body),
            Symbol::Macro(m) => Some(&mut m.body),
            Symbol::Variable(_) => None,
        }
    }
}

/// Where a variable landed in the memory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub region: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Rc<Type>,
    pub shared: bool,
    pub address: Option<i64>,
    pub dims: Vec<usize>,
    pub value: Option<Init>,
    pub placement: Option<Placement>,
}

impl Variable {
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    pub fn size(&self) -> Option<usize> {
        self.ty.size()
    }

    /// Initializer values in storage order
    pub fn values(&self) -> Option<Vec<i64>> {
        self.value.as_ref().map(Init::flatten)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub noreturn: bool,
    pub vector: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub noreturn: bool,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Single global namespace of one compilation
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a name. The existing entry is kept when the name is taken.
    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), ErrorKind> {
        if self.symbols.contains_key(name) {
            return Err(ErrorKind::DuplicateSymbol(name.to_string()));
        }
        log::debug!("{} {name}", symbol.kind());
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Reference probe for forward calls: never fails, `None` when undeclared yet
    pub fn probe(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<&Symbol, ErrorKind> {
        self.symbols
            .get(name)
            .ok_or_else(|| ErrorKind::UnknownSymbol(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Symbol)> {
        self.symbols.iter_mut().map(|(name, sym)| (name.as_str(), sym))
    }
}
