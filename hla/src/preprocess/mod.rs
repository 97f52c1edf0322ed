pub mod cond;
pub mod macros;
pub mod source;

pub use cond::CondStack;
pub use macros::{MacroTable, MacroValue};
pub use source::{FsLoader, Loader, MemLoader, Source};

use crate::cpu::Cpu;
use crate::error::{At, Error, ErrorKind};
use crate::eval;
use crate::grammer::lexer::{Lexer, Line};
use crate::grammer::parsercore::Cursor;
use crate::grammer::token::{Directive, Pos, Token, TokenKind};
use crate::memory::{Padding, RegionKind};
use std::collections::VecDeque;
use std::rc::Rc;

const MAX_INCLUDE_DEPTH: usize = 64;

/// Memory layout directive, applied by the parser in stream order
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Org {
        kind: RegionKind,
        origin: i64,
        max_size: Option<i64>,
    },
    End(RegionKind),
    Bank {
        tag: String,
        max_size: Option<i64>,
    },
    BankSize(i64),
    Pad(Padding),
    Align(i64),
    Tell(Tell),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tell {
    Bank,
    BankOffset,
    BankSize,
    BankFree,
}

/// Raw bytes of an `#incbin`
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub path: String,
    pub label: Option<String>,
    pub bytes: Rc<[u8]>,
    pub pos: Pos,
}

/// Line-oriented preprocessor producing the parser's token stream
pub struct Preprocessor<'c> {
    cpu: &'c dyn Cpu,
    loader: Box<dyn Loader + 'c>,
    files: Vec<Source>,
    macros: MacroTable,
    conds: CondStack,
    lexer: Lexer<'c>,
    pending: VecDeque<Token>,
    lines: usize,
    done: bool,
}

impl<'c> Preprocessor<'c> {
    pub fn new(cpu: &'c dyn Cpu, loader: Box<dyn Loader + 'c>) -> Self {
        Preprocessor {
            cpu,
            loader,
            files: Vec::new(),
            macros: MacroTable::default(),
            conds: CondStack::default(),
            lexer: Lexer::new(cpu),
            pending: VecDeque::new(),
            lines: 0,
            done: false,
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn ignoring(&self) -> bool {
        self.conds.ignoring()
    }

    pub fn define(&mut self, name: &str, value: Option<MacroValue>) {
        self.macros.define(name, value);
    }

    /// Define from source text: expanded with the current macros, then folded
    pub fn define_text(&mut self, name: &str, value: Option<&str>, pos: &Pos) {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|text| self.evaluate(text, pos));
        self.macros.define(name, value);
    }

    pub fn undef(&mut self, name: &str) {
        self.macros.undef(name);
    }

    /// `#ifdef` when `want` is true, `#ifndef` otherwise
    pub fn ifdef(&mut self, name: &str, want: bool, pos: Pos) {
        let ignore = self.macros.is_defined(name) != want;
        self.conds.push(ignore, pos);
    }

    pub fn else_branch(&mut self) -> Result<(), ErrorKind> {
        self.conds.flip()
    }

    pub fn endif(&mut self) -> Result<(), ErrorKind> {
        self.conds.pop()
    }

    /// Push a file onto the include stack
    pub fn include(&mut self, path: &str, system: bool) -> Result<(), ErrorKind> {
        if self.files.len() >= MAX_INCLUDE_DEPTH {
            return Err(ErrorKind::Syntax(format!("include nesting too deep at {path}")));
        }
        let from = self.files.last().map(|f| Rc::clone(&f.name));
        let (name, bytes) = self.loader.load(path, from.as_deref(), system)?;
        log::debug!("include {name}");
        self.files.push(Source::new(&name, &bytes));
        Ok(())
    }

    /// Read a binary file without tokenizing it
    pub fn incbin(&mut self, path: &str, label: Option<String>, pos: Pos) -> Result<Blob, ErrorKind> {
        let from = self.files.last().map(|f| Rc::clone(&f.name));
        let (name, bytes) = self.loader.load(path, from.as_deref(), false)?;
        log::debug!("incbin {name}: {} bytes", bytes.len());
        Ok(Blob {
            path: name,
            label,
            bytes: Rc::from(bytes),
            pos,
        })
    }

    fn evaluate(&self, text: &str, pos: &Pos) -> MacroValue {
        let expanded = self.macros.substitute(text);
        let line = Line {
            text: expanded.clone(),
            file: Rc::clone(&pos.file),
            line: pos.line,
            index: 0,
        };
        let Ok(tokens) = Lexer::new(self.cpu).tokenize(&line) else {
            return MacroValue::Raw(expanded.trim().to_string());
        };
        if let [Token {
            kind: TokenKind::Text(s),
            ..
        }] = tokens.as_slice()
        {
            return MacroValue::Text(s.clone());
        }
        let raw = tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
        let mut cursor = Cursor::from_tokens(tokens, self.cpu);
        match cursor.parse_expr() {
            Ok(expr) if cursor.is_eof() => match eval::fold(&expr, &self.macros) {
                Ok(n) => MacroValue::Number(n),
                Err(_) => MacroValue::Raw(raw),
            },
            _ => MacroValue::Raw(raw),
        }
    }

    fn next_line(&mut self) -> Option<Line> {
        loop {
            let top = self.files.last_mut()?;
            if let Some(line) = top.next_line(self.lines) {
                self.lines += 1;
                return Some(line);
            }
            log::debug!("end of {}", top.name);
            self.files.pop();
        }
    }

    fn process(&mut self, line: Line) -> Result<(), Error> {
        if !self.lexer.in_comment() {
            if let Some(word) = directive_word(&line.text) {
                let Ok(directive) = word.parse::<Directive>() else {
                    if self.conds.ignoring() {
                        return Ok(());
                    }
                    let pos = Pos::new(&line.file, line.line, 1);
                    return Err(Error::new(ErrorKind::UnknownDirective(word), &pos));
                };
                if self.conds.ignoring() && !directive.is_conditional() {
                    return Ok(());
                }
                return self.directive(&line, directive);
            }
        }
        if self.conds.ignoring() {
            return Ok(());
        }
        let text = self.macros.substitute(&line.text);
        let tokens = self.lexer.tokenize(&Line { text, ..line })?;
        self.pending.extend(tokens);
        Ok(())
    }

    fn directive(&mut self, line: &Line, directive: Directive) -> Result<(), Error> {
        let hash = line.text.find('#').unwrap_or(0);
        let pos = Pos::new(&line.file, line.line, hash + 1);
        let label = line.text[..hash]
            .trim()
            .strip_suffix(':')
            .map(|label| label.trim().to_string());
        if label.is_some() && directive != Directive::Incbin {
            return Err(Error::new(
                ErrorKind::Syntax(format!("#{directive} does not take a label")),
                &pos,
            ));
        }
        let rest = after_directive(&line.text[hash..]);
        let head = Token::new(
            TokenKind::Directive(directive),
            format!("#{directive}"),
            pos.clone(),
            line.index,
        );
        // lexed even when unused so a block comment opened here stays open
        let args = self.lexer.tokenize(&Line {
            text: rest.to_string(),
            ..line.clone()
        });

        match directive {
            Directive::Define => {
                let name = name_arg(&args?, &pos)?;
                let value = rest.trim_start().get(name.len()..);
                self.define_text(&name, value, &pos);
            }
            Directive::Undef => {
                let name = name_arg(&args?, &pos)?;
                self.undef(&name);
            }
            Directive::Ifdef | Directive::Ifndef => {
                let name = name_arg(&args?, &pos)?;
                self.ifdef(&name, directive == Directive::Ifdef, pos);
            }
            Directive::Else => self.else_branch().at(&pos)?,
            Directive::Endif => self.endif().at(&pos)?,
            Directive::Include => {
                let (path, system) = path_arg(rest).at(&pos)?;
                self.include(&path, system).at(&pos)?;
            }
            Directive::Incbin => {
                let (path, _) = path_arg(rest).at(&pos)?;
                let blob = self.incbin(&path, label, pos.clone()).at(&pos)?;
                self.push(TokenKind::Blob(blob), &head);
            }
            Directive::Todo => log::info!("{pos}: TODO: {}", message(args.ok(), rest)),
            Directive::Warning => log::warn!("{pos}: {}", message(args.ok(), rest)),
            Directive::Error | Directive::Fatal => {
                let msg = message(args.ok(), rest);
                return Err(Error::new(ErrorKind::UserError(msg), &pos));
            }
            _ => {
                let layout = self.layout(directive, args?, &pos)?;
                self.push(TokenKind::Layout(layout), &head);
            }
        }
        Ok(())
    }

    fn layout(&self, directive: Directive, args: Vec<Token>, pos: &Pos) -> Result<Layout, Error> {
        let mut cursor = Cursor::from_tokens(args.clone(), self.cpu);
        let layout = match directive {
            Directive::Setpad => match args.as_slice() {
                [Token {
                    kind: TokenKind::Text(s),
                    ..
                }] => {
                    cursor.next();
                    Layout::Pad(Padding::Text(s.clone()))
                }
                _ => Layout::Pad(Padding::Value(self.number(&mut cursor, pos)? as u64)),
            },
            Directive::Align => Layout::Align(self.number(&mut cursor, pos)?),
            Directive::RamOrg | Directive::RomOrg => {
                let kind = match directive {
                    Directive::RamOrg => RegionKind::Ram,
                    _ => RegionKind::Rom,
                };
                let origin = self.number(&mut cursor, pos)?;
                let max_size = self.max_size(&mut cursor, pos)?;
                Layout::Org {
                    kind,
                    origin,
                    max_size,
                }
            }
            Directive::RamEnd => Layout::End(RegionKind::Ram),
            Directive::RomEnd => Layout::End(RegionKind::Rom),
            Directive::RomBank => {
                let tag = match args.as_slice() {
                    [Token {
                        kind: TokenKind::Ident(name),
                        ..
                    }, ..]
                        if !self.macros.is_defined(name) =>
                    {
                        cursor.next();
                        name.clone()
                    }
                    _ => self.number(&mut cursor, pos)?.to_string(),
                };
                let max_size = self.max_size(&mut cursor, pos)?;
                Layout::Bank { tag, max_size }
            }
            Directive::RomBankSize => Layout::BankSize(self.number(&mut cursor, pos)?),
            Directive::TellBank => Layout::Tell(Tell::Bank),
            Directive::TellBankOffset => Layout::Tell(Tell::BankOffset),
            Directive::TellBankSize => Layout::Tell(Tell::BankSize),
            Directive::TellBankFree => Layout::Tell(Tell::BankFree),
            _ => return Err(Error::new(ErrorKind::UnknownDirective(directive.to_string()), pos)),
        };
        match cursor.next() {
            Some(extra) => Err(Error::unexpected(&extra)),
            None => Ok(layout),
        }
    }

    fn number(&self, cursor: &mut Cursor, pos: &Pos) -> Result<i64, Error> {
        if cursor.is_eof() {
            return Err(Error::new(
                ErrorKind::Syntax("directive needs a numeric argument".to_string()),
                pos,
            ));
        }
        let expr = cursor.parse_expr()?;
        eval::fold(&expr, &self.macros).at(pos)
    }

    fn max_size(&self, cursor: &mut Cursor, pos: &Pos) -> Result<Option<i64>, Error> {
        if cursor.consume_if(|t| t.kind == TokenKind::Comma).is_some() {
            return Ok(Some(self.number(cursor, pos)?));
        }
        Ok(None)
    }

    fn push(&mut self, kind: TokenKind, head: &Token) {
        let token = Token::new(kind, head.text.clone(), head.pos.clone(), head.line);
        self.pending.push_back(token);
    }
}

impl Iterator for Preprocessor<'_> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.done {
                return None;
            }
            match self.next_line() {
                Some(line) => {
                    if let Err(e) = self.process(line) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                None => {
                    self.done = true;
                    let pos = self.conds.innermost()?;
                    return Some(Err(Error::new(ErrorKind::UnclosedConditional, pos)));
                }
            }
        }
    }
}

/// Directive name of a `#name ...` or `label: #name ...` line
fn directive_word(text: &str) -> Option<String> {
    let text = text.trim_start();
    let rest = match text.strip_prefix('#') {
        Some(rest) => rest,
        None => {
            let label_end = text
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .filter(|&end| end > 0)?;
            text[label_end..].trim_start().strip_prefix(':')?.trim_start().strip_prefix('#')?
        }
    };
    let word: String = rest
        .chars()
        .take_while(|&ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
        .collect();
    (!word.is_empty()).then(|| word.to_ascii_lowercase())
}

/// Text following the directive word
fn after_directive(text: &str) -> &str {
    let Some(hash) = text.find('#') else {
        return "";
    };
    let rest = &text[hash + 1..];
    let end = rest
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'))
        .unwrap_or(rest.len());
    &rest[end..]
}

fn name_arg(args: &[Token], pos: &Pos) -> Result<String, Error> {
    match args.first() {
        Some(token)
            if matches!(
                token.kind,
                TokenKind::Ident(_) | TokenKind::Reserved(..) | TokenKind::Kw(_)
            ) =>
        {
            Ok(token.text.clone())
        }
        Some(token) => Err(Error::unexpected(token)),
        None => Err(Error::new(
            ErrorKind::Syntax("directive needs a name".to_string()),
            pos,
        )),
    }
}

/// `"file"` or `<file>`
fn path_arg(rest: &str) -> Result<(String, bool), ErrorKind> {
    let rest = rest.trim();
    let (close, system) = match rest.chars().next() {
        Some('"') => ('"', false),
        Some('<') => ('>', true),
        _ => return Err(ErrorKind::Syntax("expected \"file\" or <file>".to_string())),
    };
    rest[1..]
        .find(close)
        .map(|end| (rest[1..1 + end].to_string(), system))
        .ok_or_else(|| ErrorKind::Syntax(format!("unterminated file name {rest}")))
}

fn message(args: Option<Vec<Token>>, rest: &str) -> String {
    match args.as_deref() {
        Some(
            [Token {
                kind: TokenKind::Text(s),
                ..
            }],
        ) => s.clone(),
        _ => rest.trim().to_string(),
    }
}
