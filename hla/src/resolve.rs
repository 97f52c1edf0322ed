use crate::error::{At, Error, ErrorKind};
use crate::grammer::ast::{Ast, Def, Stmt};
use crate::grammer::parser::check_call;
use crate::symbols::{Symbol, SymbolTable};

/// Settle the calls left open by forward references.
///
/// Runs once the whole unit is parsed, over every function, interrupt and
/// macro body and the top level statements.
pub fn resolve_calls(ast: &mut Ast, symbols: &mut SymbolTable) -> Result<(), Error> {
    let owners: Vec<String> = symbols
        .iter()
        .filter(|(_, sym)| !matches!(sym, Symbol::Variable(_)))
        .map(|(name, _)| name.to_string())
        .collect();

    for owner in owners {
        let mut body = match symbols.get_mut(&owner).and_then(Symbol::body_mut) {
            Some(body) => std::mem::take(body),
            None => continue,
        };
        let result = body.iter_mut().try_for_each(|stmt| resolve_stmt(stmt, symbols));
        if let Some(slot) = symbols.get_mut(&owner).and_then(Symbol::body_mut) {
            *slot = body;
        }
        result?;
    }

    for def in &mut ast.0 {
        if let Def::Stmt(stmt) = def {
            resolve_stmt(stmt, symbols)?;
        }
    }
    Ok(())
}

fn resolve_stmt(stmt: &mut Stmt, symbols: &SymbolTable) -> Result<(), Error> {
    match stmt {
        Stmt::Call(call) => {
            call.kind = match symbols.probe(&call.name) {
                Some(symbol) => check_call(&call.name, symbol, call.args.len()).at(&call.pos)?,
                None => {
                    return Err(Error::new(ErrorKind::UnknownCall(call.name.clone()), &call.pos));
                }
            };
        }
        Stmt::Block(stmts) => {
            for stmt in stmts {
                resolve_stmt(stmt, symbols)?;
            }
        }
        Stmt::If(_, then, otherwise) => {
            resolve_stmt(then, symbols)?;
            if let Some(otherwise) = otherwise {
                resolve_stmt(otherwise, symbols)?;
            }
        }
        Stmt::While(_, body) | Stmt::DoWhile(body, _) | Stmt::Forever(body) => {
            resolve_stmt(body, symbols)?;
        }
        Stmt::Switch(switch) => {
            for (_, stmt) in &mut switch.cases {
                resolve_stmt(stmt, symbols)?;
            }
            if let Some(default) = &mut switch.default {
                resolve_stmt(default, symbols)?;
            }
        }
        Stmt::Decl(_)
        | Stmt::Assign(..)
        | Stmt::Instr(_)
        | Stmt::Label(..)
        | Stmt::Return(_)
        | Stmt::Incbin(_) => {}
    }
    Ok(())
}
