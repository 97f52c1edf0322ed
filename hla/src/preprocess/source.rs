use crate::error::ErrorKind;
use crate::grammer::lexer::Line;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Resolves and reads included files
pub trait Loader {
    /// Read `path` as included from the file `from`; `system` marks `<path>` includes.
    /// Returns the resolved name and the raw bytes.
    fn load(&self, path: &str, from: Option<&str>, system: bool) -> Result<(String, Vec<u8>), ErrorKind>;
}

/// Loader over the file system and a search path list
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    search_paths: Vec<PathBuf>,
}

impl FsLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FsLoader { search_paths }
    }
}

impl Loader for FsLoader {
    fn load(&self, path: &str, from: Option<&str>, system: bool) -> Result<(String, Vec<u8>), ErrorKind> {
        let mut candidates = Vec::new();
        if system {
            if self.search_paths.is_empty() {
                return Err(ErrorKind::FileNotFound(format!(
                    "<{path}> (no include directories configured)"
                )));
            }
        } else {
            let dir = from
                .and_then(|f| Path::new(f).parent())
                .unwrap_or_else(|| Path::new(""));
            candidates.push(dir.join(path));
        }
        candidates.extend(self.search_paths.iter().map(|dir| dir.join(path)));

        for candidate in candidates {
            if candidate.is_file() {
                let name = candidate.display().to_string();
                let bytes = std::fs::read(&candidate).map_err(|e| ErrorKind::Io(name.clone(), e))?;
                return Ok((name, bytes));
            }
        }
        Err(ErrorKind::FileNotFound(path.to_string()))
    }
}

/// Loader over named in-memory files
#[derive(Debug, Clone, Default)]
pub struct MemLoader {
    files: IndexMap<String, Vec<u8>>,
}

impl MemLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), contents.into());
        self
    }
}

impl Loader for MemLoader {
    fn load(&self, path: &str, from: Option<&str>, system: bool) -> Result<(String, Vec<u8>), ErrorKind> {
        let sibling = from
            .filter(|_| !system)
            .and_then(|f| f.rsplit_once('/'))
            .map(|(dir, _)| format!("{dir}/{path}"));
        sibling
            .into_iter()
            .chain(std::iter::once(path.to_string()))
            .find_map(|name| self.files.get(&name).map(|bytes| (name, bytes.clone())))
            .ok_or_else(|| ErrorKind::FileNotFound(path.to_string()))
    }
}

/// Open input file on the include stack
#[derive(Debug)]
pub struct Source {
    pub name: Rc<str>,
    lines: Vec<String>,
    next: usize,
}

impl Source {
    pub fn new(name: &str, bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        Source {
            name: Rc::from(name),
            lines: text.lines().map(str::to_string).collect(),
            next: 0,
        }
    }

    /// Next logical line, joining lines that end in an unescaped `\`
    pub fn next_line(&mut self, index: usize) -> Option<Line> {
        let start = self.next;
        let mut text = self.lines.get(start)?.clone();
        self.next += 1;
        while continues(&text) {
            text.pop();
            text.push('\n');
            match self.lines.get(self.next) {
                Some(next) => {
                    text.push_str(next);
                    self.next += 1;
                }
                None => break,
            }
        }
        Some(Line {
            text,
            file: Rc::clone(&self.name),
            line: start + 1,
            index,
        })
    }
}

fn continues(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|&ch| ch == '\\').count();
    trailing % 2 == 1
}
