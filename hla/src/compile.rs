use crate::config::Config;
use crate::cpu::Cpu;
use crate::error::Error;
use crate::eval::Scope;
use crate::grammer::ast::Ast;
use crate::grammer::parser::Parser;
use crate::grammer::token::Pos;
use crate::memory::Memory;
use crate::preprocess::{FsLoader, Loader, MemLoader, Preprocessor};
use crate::resolve::resolve_calls;
use crate::symbols::{SymbolTable, Variable};
use crate::types::{Type, TypeRegistry, PRIMITIVES};
use std::path::Path;
use std::rc::Rc;

/// Registries filled while one unit is parsed
#[derive(Debug, Clone)]
pub struct Context {
    pub types: TypeRegistry,
    pub symbols: SymbolTable,
    pub memory: Memory,
}

impl Context {
    pub fn new(cpu: &dyn Cpu) -> Self {
        Context {
            types: TypeRegistry::new(PRIMITIVES.iter().chain(cpu.primitives())),
            symbols: SymbolTable::new(),
            memory: Memory::new(cpu.endian()),
        }
    }

    /// Variable, type and address of a member path such as `player.pos.x`
    fn member(&self, path: &[String]) -> Option<(&Variable, Rc<Type>, usize)> {
        let (first, members) = path.split_first()?;
        let var = self.symbols.probe(first)?.as_variable()?;
        let mut ty = Rc::clone(&var.ty);
        let mut offset = 0;
        for name in members {
            let (member, at) = ty.as_struct()?.member(name)?;
            offset += at;
            let next = Rc::clone(&member.ty);
            ty = next;
        }
        Some((var, ty, offset))
    }
}

impl Scope for Context {
    fn value(&self, path: &[String]) -> Option<i64> {
        let (var, _, offset) = self.member(path)?;
        let base = match (var.address, var.placement) {
            (Some(address), _) => address,
            (None, Some(placement)) => {
                let origin = self.memory.get(placement.region)?.origin?;
                (origin + placement.offset as u64) as i64
            }
            (None, None) => return None,
        };
        Some(base + offset as i64)
    }

    fn size_of(&self, path: &[String]) -> Option<usize> {
        if let [name] = path {
            if let Some(ty) = self.types.lookup(name) {
                return ty.size();
            }
        }
        self.member(path)?.1.size()
    }
}

/// Result of compiling one source file
#[derive(Debug)]
pub struct Unit {
    pub ast: Ast,
    pub ctx: Context,
}

pub fn compile(path: &Path, config: &Config, cpu: &dyn Cpu) -> Result<Unit, Error> {
    let loader = FsLoader::new(config.search_paths.clone());
    compile_with(Box::new(loader), &path.display().to_string(), config, cpu)
}

/// Compile source text held in memory under the given file name
pub fn compile_source(name: &str, text: &str, config: &Config, cpu: &dyn Cpu) -> Result<Unit, Error> {
    let loader = MemLoader::new().add(name, text);
    compile_with(Box::new(loader), name, config, cpu)
}

pub fn compile_with<'c>(
    loader: Box<dyn Loader + 'c>,
    entry: &str,
    config: &Config,
    cpu: &'c dyn Cpu,
) -> Result<Unit, Error> {
    let mut pre = Preprocessor::new(cpu, loader);
    let origin = Pos::new(&Rc::from("<command line>"), 0, 0);
    for (name, value) in &config.defines {
        pre.define_text(name, value.as_deref(), &origin);
    }
    pre.include(entry, false)?;

    let mut ctx = Context::new(cpu);
    let mut ast = Parser::new(Box::new(pre), &mut ctx, cpu).parse()?;
    resolve_calls(&mut ast, &mut ctx.symbols)?;
    log::info!(
        "{entry}: {} symbol(s), {} type(s), {} region(s)",
        ctx.symbols.len(),
        ctx.types.user_types().count(),
        ctx.memory.regions().len()
    );
    Ok(Unit { ast, ctx })
}
