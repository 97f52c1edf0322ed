use super::ast::{Ast, Call, CallKind, Clause, Decl, Def, Expr, FuncDecl, FuncKind, Stmt, Switch, VarDecl};
use super::parsercore::{Cursor, TokenStream};
use super::token::{Keyword, Pos, Token, TokenKind};
use crate::compile::Context;
use crate::cpu::{Category, Cpu, Resolution, Site};
use crate::error::{At, Error, ErrorKind};
use crate::eval::{self, Init};
use crate::memory::RegionKind;
use crate::preprocess::{Blob, Layout, Tell};
use crate::symbols::{Function, Macro, Placement, Symbol, Variable};
use crate::types::{self, Struct, Type};
use crate::{check, expect, optional, repeat};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Recursive descent over the preprocessed token stream.
///
/// Declarations are entered into the context's registries as they are
/// parsed, so later statements can refer to earlier types and variables.
pub struct Parser<'a> {
    cur: Cursor<'a>,
    pub ctx: &'a mut Context,
}

impl<'a> Deref for Parser<'a> {
    type Target = Cursor<'a>;

    fn deref(&self) -> &Self::Target {
        &self.cur
    }
}

impl<'a> DerefMut for Parser<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cur
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: TokenStream<'a>, ctx: &'a mut Context, cpu: &'a dyn Cpu) -> Self {
        Parser {
            cur: Cursor::new(tokens, cpu),
            ctx,
        }
    }

    pub fn parse(mut self) -> Result<Ast, Error> {
        let ast = self.parse_program();
        match self.take_fault() {
            Some(e) => Err(e),
            None => ast,
        }
    }
}

impl<'a> Parser<'a> {
    /// program = { layout | func | decl | stmt }
    fn parse_program(&mut self) -> Result<Ast, Error> {
        let mut defs = Vec::new();
        while !self.is_eof() {
            if optional!(self, TokenKind::Semicolon).is_some() {
                continue;
            }
            if check!(self, TokenKind::Layout(_) | TokenKind::Blob(_)) {
                if let Some(stmt) = self.parse_layout()? {
                    defs.push(Def::Stmt(stmt));
                }
            } else if check!(
                self,
                TokenKind::Kw(Keyword::Function | Keyword::Interrupt | Keyword::Inline | Keyword::Noreturn)
            ) {
                defs.push(Def::Func(self.parse_func()?));
            } else if self.at_decl() {
                defs.push(Def::Decl(self.parse_decl()?));
            } else {
                defs.push(Def::Stmt(self.parse_stmt()?));
            }
        }
        Ok(Ast(defs))
    }

    /// A layout token is applied to the memory model; a blob becomes a statement
    fn parse_layout(&mut self) -> Result<Option<Stmt>, Error> {
        let token = self.next().ok_or_else(|| self.eof())?;
        match token.kind {
            TokenKind::Layout(layout) => {
                self.apply_layout(layout, &token.pos)?;
                Ok(None)
            }
            TokenKind::Blob(blob) => {
                self.place_blob(&blob)?;
                Ok(Some(Stmt::Incbin(blob)))
            }
            _ => Err(Error::unexpected(&token)),
        }
    }

    fn apply_layout(&mut self, layout: Layout, pos: &Pos) -> Result<(), Error> {
        let memory = &mut self.ctx.memory;
        match layout {
            Layout::Org {
                kind,
                origin,
                max_size,
            } => {
                let origin = u64::try_from(origin)
                    .map_err(|_| Error::new(ErrorKind::Syntax(format!("negative origin {origin}")), pos))?;
                let max_size = max_size.map(|n| size(n, pos)).transpose()?;
                memory.new_region(kind, Some(origin), max_size, None);
            }
            Layout::End(_) => {
                memory.new_region(RegionKind::Rom, None, None, None);
            }
            Layout::Bank { tag, max_size } => {
                if !memory.select(&tag) {
                    let max_size = match max_size {
                        Some(n) => Some(size(n, pos)?),
                        None => memory.bank_size,
                    };
                    memory.new_region(RegionKind::Rom, None, max_size, None);
                    memory.tag(&tag);
                }
            }
            Layout::BankSize(n) => memory.bank_size = Some(size(n, pos)?),
            Layout::Pad(padding) => {
                let region = memory.current();
                memory.set_padding(region, padding);
            }
            Layout::Align(n) => {
                let n = size(n, pos)?;
                if n == 0 {
                    return Err(Error::new(ErrorKind::Syntax("alignment of zero".to_string()), pos));
                }
                let region = memory.current();
                memory.set_alignment(region, n);
            }
            Layout::Tell(tell) => {
                let idx = memory.current();
                let region = memory.current_region();
                match tell {
                    Tell::Bank => log::info!("{pos}: bank {idx}"),
                    Tell::BankOffset => log::info!("{pos}: bank offset {:#06x}", region.len()),
                    Tell::BankSize => match region.max_size {
                        Some(max) => log::info!("{pos}: bank size {max:#06x}"),
                        None => log::info!("{pos}: bank size unbounded"),
                    },
                    Tell::BankFree => match region.free() {
                        Some(free) => log::info!("{pos}: bank free {free:#06x}"),
                        None => {
                            return Err(Error::new(
                                ErrorKind::Syntax(format!("bank {idx} has no size")),
                                pos,
                            ));
                        }
                    },
                }
            }
        }
        Ok(())
    }

    /// Append blob bytes to the current region, declaring its label
    fn place_blob(&mut self, blob: &Blob) -> Result<(), Error> {
        let region = self.ctx.memory.current();
        let offset = self.ctx.memory.append_bytes(region, &blob.bytes).at(&blob.pos)?;
        let Some(label) = &blob.label else {
            return Ok(());
        };
        let byte = self
            .ctx
            .types
            .lookup("byte")
            .ok_or_else(|| Error::new(ErrorKind::UnknownType("byte".to_string()), &blob.pos))?;
        let len = blob.bytes.len();
        let values = blob.bytes.iter().map(|&b| Init::Number(b as i64)).collect();
        let var = Variable {
            name: label.clone(),
            ty: Type::array(byte, &[len]),
            shared: false,
            address: None,
            dims: vec![len],
            value: Some(Init::List(values)),
            placement: Some(Placement { region, offset }),
        };
        self.ctx.symbols.declare(label, Symbol::Variable(var)).at(&blob.pos)
    }

    /// func = ( "function" | "interrupt" [ "." name ] | "inline" ) [ "noreturn" ] name "(" [ name { "," name } ] ")" block
    fn parse_func(&mut self) -> Result<FuncDecl, Error> {
        let mut noreturn = optional!(self, TokenKind::Kw(Keyword::Noreturn)).is_some();
        let head = self.next().ok_or_else(|| self.eof())?;
        let kind = match head.kind {
            TokenKind::Kw(Keyword::Function) => FuncKind::Function,
            TokenKind::Kw(Keyword::Interrupt) => FuncKind::Interrupt,
            TokenKind::Kw(Keyword::Inline) => FuncKind::Macro,
            _ => return Err(Error::unexpected(&head)),
        };
        let vector = match kind {
            FuncKind::Interrupt => optional!(self, TokenKind::Period, self.parse_name()?.0),
            _ => None,
        };
        noreturn |= optional!(self, TokenKind::Kw(Keyword::Noreturn)).is_some();

        let (name, pos) = self.parse_name()?;
        expect!(self, TokenKind::LParen)?;
        let params = repeat!(self, self.parse_name().map(|(n, _)| n), TokenKind::Comma, TokenKind::RParen);
        expect!(self, TokenKind::RParen)?;
        if kind != FuncKind::Macro && !params.is_empty() {
            return Err(Error::new(
                ErrorKind::Syntax(format!("{name} cannot take parameters")),
                &pos,
            ));
        }

        // Declared before the body so it can call itself
        let symbol = match kind {
            FuncKind::Macro => Symbol::Macro(Macro {
                name: name.clone(),
                noreturn,
                params: params.clone(),
                body: Vec::new(),
            }),
            _ => {
                let func = Function {
                    name: name.clone(),
                    noreturn,
                    vector: vector.clone(),
                    body: Vec::new(),
                };
                match kind {
                    FuncKind::Interrupt => Symbol::Interrupt(func),
                    _ => Symbol::Function(func),
                }
            }
        };
        self.ctx.symbols.declare(&name, symbol).at(&pos)?;

        let body = self.parse_block()?;
        if let Some(slot) = self.ctx.symbols.get_mut(&name).and_then(Symbol::body_mut) {
            *slot = body;
        }
        log::debug!("{kind:?} {name}");
        Ok(FuncDecl {
            kind,
            name,
            noreturn,
            params,
            vector,
            pos,
        })
    }

    /// block = "{" { layout | decl | stmt } "}"
    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        expect!(self, TokenKind::LCurly)?;
        let mut stmts = Vec::new();
        while !check!(self, TokenKind::RCurly) {
            if self.is_eof() {
                return Err(self.eof());
            }
            if optional!(self, TokenKind::Semicolon).is_some() {
                continue;
            }
            if check!(self, TokenKind::Layout(_) | TokenKind::Blob(_)) {
                stmts.extend(self.parse_layout()?);
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        expect!(self, TokenKind::RCurly)?;
        Ok(stmts)
    }

    fn at_decl(&mut self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        match &token.kind {
            TokenKind::Kw(Keyword::Typedef | Keyword::Shared | Keyword::Struct) => true,
            TokenKind::Reserved(Category::Type, _) => true,
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.ctx.types.contains(&name)
            }
            _ => false,
        }
    }

    /// decl = "typedef" typeref name { "[" expr "]" } [ ":" expr ]
    ///      | [ "shared" ] typeref [ var { "," var } ]
    fn parse_decl(&mut self) -> Result<Vec<Decl>, Error> {
        let mut decls = Vec::new();
        if optional!(self, TokenKind::Kw(Keyword::Typedef)).is_some() {
            let (target, _, def) = self.parse_typeref()?;
            decls.extend(def.map(|(def, _)| def));
            let (name, pos) = self.parse_name()?;
            let dims = self.parse_dims()?;
            let address = optional!(self, TokenKind::Colon, self.parse_expr()?);

            let scope = &*self.ctx;
            let dims = dims
                .iter()
                .map(|dim| match dim {
                    Some(e) => size(eval::fold(e, scope).at(&pos)?, &pos),
                    None => Err(Error::new(
                        ErrorKind::IrregularArrayShape(format!("typedef {name} needs explicit sizes")),
                        &pos,
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let address = address.map(|e| eval::fold(&e, scope)).transpose().at(&pos)?;
            let ty = Type::Typedef {
                name: name.clone(),
                target: Type::array(target, &dims),
                address,
            };
            self.ctx.types.register(&name, ty).at(&pos)?;
            decls.push(Decl::Typedef(name, pos));
            return Ok(decls);
        }

        let shared = optional!(self, TokenKind::Kw(Keyword::Shared)).is_some();
        let (ty, ty_name, def) = self.parse_typeref()?;
        if let Some((def, close)) = def {
            decls.push(def);
            // variables of an inline struct follow its closing brace on the same line
            if !(self.on_line(close) && self.at_var_name()) {
                return Ok(decls);
            }
        }
        loop {
            let var = self.parse_var(&ty_name, shared)?;
            self.declare_var(&var, Rc::clone(&ty))?;
            decls.push(Decl::Var(var));
            if optional!(self, TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(decls)
    }

    fn at_var_name(&mut self) -> bool {
        let cpu = self.cpu;
        self.check_if(|t| match &t.kind {
            TokenKind::Ident(_) => true,
            TokenKind::Reserved(category, _) => {
                cpu.resolve(*category, Site::Name) == Resolution::Ident
            }
            _ => false,
        })
    }

    /// typeref = "struct" name [ "{" { member } "}" ] | type
    ///
    /// Returns the type, its name and, for an inline struct, its definition with
    /// the logical line of the closing brace.
    fn parse_typeref(&mut self) -> Result<(Rc<Type>, String, Option<(Decl, usize)>), Error> {
        if optional!(self, TokenKind::Kw(Keyword::Struct)).is_some() {
            let (name, pos) = self.parse_name()?;
            if !check!(self, TokenKind::LCurly) {
                let ty = self
                    .ctx
                    .types
                    .lookup(&name)
                    .filter(|ty| ty.as_struct().is_some())
                    .ok_or_else(|| Error::new(ErrorKind::UnknownType(name.clone()), &pos))?;
                return Ok((ty, name, None));
            }
            if self.ctx.types.contains(&name) {
                return Err(Error::new(ErrorKind::DuplicateType(name), &pos));
            }
            let (body, close) = self.parse_members(&name)?;
            let ty = self.ctx.types.register(&name, Type::Struct(body)).at(&pos)?;
            return Ok((ty, name.clone(), Some((Decl::Struct(name, pos), close))));
        }

        let token = self.next().ok_or_else(|| self.eof())?;
        let name = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Reserved(Category::Type, word) => word.clone(),
            _ => return Err(Error::unexpected(&token)),
        };
        let ty = self
            .ctx
            .types
            .lookup(&name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownType(name.clone()), &token.pos))?;
        Ok((ty, name, None))
    }

    /// members = "{" { typeref name { "[" expr "]" } { "," name { "[" expr "]" } } [ ";" ] } "}"
    fn parse_members(&mut self, name: &str) -> Result<(Struct, usize), Error> {
        expect!(self, TokenKind::LCurly)?;
        let mut body = Struct::new(name);
        loop {
            if let Some(close) = optional!(self, TokenKind::RCurly) {
                return Ok((body, close.line));
            }
            if optional!(self, TokenKind::Semicolon).is_some() {
                continue;
            }
            if self.is_eof() {
                return Err(self.eof());
            }
            let (ty, _, _) = self.parse_typeref()?;
            loop {
                let (member, pos) = self.parse_name()?;
                let dims = self.parse_dims()?;
                let dims = dims
                    .iter()
                    .map(|dim| match dim {
                        Some(e) => size(eval::fold(e, &*self.ctx).at(&pos)?, &pos),
                        None => Err(Error::new(
                            ErrorKind::IrregularArrayShape(format!("{name}.{member} needs a size")),
                            &pos,
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let (len, inner) = match dims.split_first() {
                    Some((&len, inner)) => (Some(len), inner),
                    None => (None, &[][..]),
                };
                body.push(&member, Type::array(Rc::clone(&ty), inner), len).at(&pos)?;
                if optional!(self, TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
    }

    /// var = name { "[" [ expr ] "]" } [ ":" expr ] [ "=" value ]
    fn parse_var(&mut self, ty: &str, shared: bool) -> Result<VarDecl, Error> {
        let (name, pos) = self.parse_name()?;
        if self.cpu.is_opcode(&name) {
            return Err(Error::new(ErrorKind::Syntax(format!("{name} is an opcode")), &pos));
        }
        let dims = self.parse_dims()?;
        let address = optional!(self, TokenKind::Colon, self.parse_expr()?);
        let init = optional!(self, TokenKind::Equal, self.parse_value()?);
        Ok(VarDecl {
            name,
            ty: ty.to_string(),
            shared,
            dims,
            address,
            init,
            pos,
        })
    }

    fn parse_dims(&mut self) -> Result<Vec<Option<Expr>>, Error> {
        let mut dims = Vec::new();
        while optional!(self, TokenKind::LBracket).is_some() {
            if optional!(self, TokenKind::RBracket).is_some() {
                dims.push(None);
                continue;
            }
            dims.push(Some(self.parse_expr()?));
            expect!(self, TokenKind::RBracket)?;
        }
        Ok(dims)
    }

    /// Fold a declaration, place it in memory and enter it into the symbol table
    fn declare_var(&mut self, var: &VarDecl, base: Rc<Type>) -> Result<(), Error> {
        let pos = &var.pos;
        if self.ctx.symbols.contains(&var.name) {
            return Err(Error::new(ErrorKind::DuplicateSymbol(var.name.clone()), pos));
        }

        let scope = &*self.ctx;
        let declared = var
            .dims
            .iter()
            .map(|dim| dim.as_ref().map(|e| size(eval::fold(e, scope).at(pos)?, pos)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let value = var.init.as_ref().map(|v| eval::fold_value(v, scope)).transpose().at(pos)?;
        let dims = types::infer_dims(&declared, value.as_ref()).at(pos)?;
        let address = match &var.address {
            Some(e) => Some(eval::fold(e, scope).at(pos)?),
            None => match base.as_ref() {
                Type::Typedef { address, .. } => *address,
                _ => None,
            },
        };
        let ty = Type::array(base, &dims);
        let bytes = ty.encode(value.as_ref(), self.ctx.memory.endian).at(pos)?;

        let placement = match address {
            Some(_) => None,
            None => {
                let memory = &mut self.ctx.memory;
                let region = memory.current();
                let bytes = match memory.current_region().kind {
                    RegionKind::Ram => vec![0; bytes.len()],
                    RegionKind::Rom => bytes,
                };
                let offset = memory.append_bytes(region, &bytes).at(pos)?;
                Some(Placement { region, offset })
            }
        };

        let symbol = Symbol::Variable(Variable {
            name: var.name.clone(),
            ty,
            shared: var.shared,
            address,
            dims,
            value,
            placement,
        });
        self.ctx.symbols.declare(&var.name, symbol).at(pos)
    }

    /// stmt = block | if | while | do | forever | switch | "return" | instr | decl
    ///      | name ":" | name "(" [ expr { "," expr } ] ")" | name { "." name } "=" expr
    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        if self.at_decl() {
            return Ok(Stmt::Decl(self.parse_decl()?));
        }
        let Some(token) = self.peek().cloned() else {
            return Err(self.eof());
        };
        match token.kind {
            TokenKind::LCurly => Ok(Stmt::Block(self.parse_block()?)),

            // if = "if" "(" clause ")" stmt [ "else" stmt ]
            TokenKind::Kw(Keyword::If) => {
                self.next();
                let clause = self.parse_clause()?;
                let then = self.parse_stmt()?;
                let otherwise = optional!(self, TokenKind::Kw(Keyword::Else), Box::new(self.parse_stmt()?));
                Ok(Stmt::If(clause, Box::new(then), otherwise))
            }

            // while = "while" "(" clause ")" stmt
            TokenKind::Kw(Keyword::While) => {
                self.next();
                let clause = self.parse_clause()?;
                Ok(Stmt::While(clause, Box::new(self.parse_stmt()?)))
            }

            // do = "do" stmt "while" "(" clause ")"
            TokenKind::Kw(Keyword::Do) => {
                self.next();
                let body = self.parse_stmt()?;
                expect!(self, TokenKind::Kw(Keyword::While))?;
                Ok(Stmt::DoWhile(Box::new(body), self.parse_clause()?))
            }

            // forever = "forever" stmt
            TokenKind::Kw(Keyword::Forever) => {
                self.next();
                Ok(Stmt::Forever(Box::new(self.parse_stmt()?)))
            }

            TokenKind::Kw(Keyword::Switch) => Ok(Stmt::Switch(self.parse_switch()?)),

            TokenKind::Kw(Keyword::Return) => {
                self.next();
                Ok(Stmt::Return(token.pos))
            }

            TokenKind::Reserved(Category::Opcode, _) => {
                self.next();
                let cpu = self.cpu;
                Ok(Stmt::Instr(cpu.instruction(self, token)?))
            }

            _ => {
                let (name, pos) = self.parse_name()?;
                if optional!(self, TokenKind::Colon).is_some() {
                    return Ok(Stmt::Label(name, pos));
                }
                if optional!(self, TokenKind::LParen).is_some() {
                    let args = repeat!(self, self.parse_expr(), TokenKind::Comma, TokenKind::RParen);
                    expect!(self, TokenKind::RParen)?;
                    return Ok(Stmt::Call(self.call(name, args, pos)?));
                }
                let mut path = vec![name];
                while optional!(self, TokenKind::Period).is_some() {
                    path.push(self.parse_name()?.0);
                }
                expect!(self, TokenKind::Equal)?;
                let expr = self.parse_expr()?;
                Ok(Stmt::Assign(path, expr, pos))
            }
        }
    }

    /// "(" clause ")"
    fn parse_clause(&mut self) -> Result<Clause, Error> {
        expect!(self, TokenKind::LParen)?;
        let cpu = self.cpu;
        let clause = cpu.clause(self)?;
        expect!(self, TokenKind::RParen)?;
        Ok(clause)
    }

    /// switch = "switch" ( "(" register ")" | register ) "{" { case } [ default ] "}"
    /// case = "case" [ "#" ] expr [ ":" ] stmt
    /// default = "default" [ ":" ] stmt
    fn parse_switch(&mut self) -> Result<Switch, Error> {
        let head = expect!(self, TokenKind::Kw(Keyword::Switch))?;
        let cpu = self.cpu;
        let register = if optional!(self, TokenKind::LParen).is_some() {
            let register = cpu.register(self)?;
            expect!(self, TokenKind::RParen)?;
            register
        } else {
            cpu.register(self)?
        };

        expect!(self, TokenKind::LCurly)?;
        let mut cases = Vec::new();
        let mut default = None;
        while optional!(self, TokenKind::RCurly).is_none() {
            let token = self.next().ok_or_else(|| self.eof())?;
            match token.kind {
                TokenKind::Kw(Keyword::Case) if default.is_none() => {
                    optional!(self, TokenKind::Hash);
                    let value = self.parse_expr()?;
                    optional!(self, TokenKind::Colon);
                    cases.push((value, self.parse_stmt()?));
                }
                TokenKind::Kw(Keyword::Default) if default.is_none() => {
                    optional!(self, TokenKind::Colon);
                    default = Some(Box::new(self.parse_stmt()?));
                }
                TokenKind::Semicolon => {}
                _ => return Err(Error::unexpected(&token)),
            }
        }
        Ok(Switch {
            register,
            cases,
            default,
            pos: head.pos,
        })
    }

    /// Classify a call against what is declared so far
    fn call(&self, name: String, args: Vec<Expr>, pos: Pos) -> Result<Call, Error> {
        let kind = match self.ctx.symbols.probe(&name) {
            None => CallKind::Unknown,
            Some(symbol) => check_call(&name, symbol, args.len()).at(&pos)?,
        };
        Ok(Call {
            name,
            args,
            kind,
            pos,
        })
    }

    /// Declared or referenced name
    fn parse_name(&mut self) -> Result<(String, Pos), Error> {
        let token = self.next().ok_or_else(|| self.eof())?;
        let name = self.name_of(&token, Site::Name)?;
        Ok((name, token.pos))
    }
}

/// Kind of a call to a declared symbol
pub fn check_call(name: &str, symbol: &Symbol, args: usize) -> Result<CallKind, ErrorKind> {
    match symbol {
        Symbol::Macro(m) if m.params.len() != args => Err(ErrorKind::MacroArityMismatch(
            name.to_string(),
            m.params.len(),
            args,
        )),
        Symbol::Macro(_) => Ok(CallKind::Macro),
        Symbol::Function(_) if args != 0 => Err(ErrorKind::MacroArityMismatch(name.to_string(), 0, args)),
        Symbol::Function(_) => Ok(CallKind::Function),
        Symbol::Interrupt(_) | Symbol::Variable(_) => Err(ErrorKind::NotCallable(name.to_string())),
    }
}

fn size(n: i64, pos: &Pos) -> Result<usize, Error> {
    usize::try_from(n).map_err(|_| Error::new(ErrorKind::Syntax(format!("negative size {n}")), pos))
}
