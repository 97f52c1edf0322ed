use std::path::PathBuf;

/// Settings of one compilation supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directories searched by `#include` and `#incbin`
    pub search_paths: Vec<PathBuf>,
    /// Macros defined before the first line is read
    pub defines: Vec<(String, Option<String>)>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn define(mut self, name: &str, value: Option<&str>) -> Self {
        self.defines.push((name.to_string(), value.map(str::to_string)));
        self
    }

    /// Command line form `NAME` or `NAME=VALUE`
    pub fn define_arg(&mut self, arg: &str) {
        let (name, value) = match arg.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.to_string())),
            None => (arg.trim(), None),
        };
        self.defines.push((name.to_string(), value));
    }
}
