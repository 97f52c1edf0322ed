use crate::eval::Scope;
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroValue {
    Number(i64),
    Text(String),
    /// Token text that is not a constant expression
    Raw(String),
}

impl fmt::Display for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroValue::Number(n) => write!(f, "{n}"),
            MacroValue::Text(s) => write!(f, "\"{}\"", s.escape_default()),
            MacroValue::Raw(s) => write!(f, "{s}"),
        }
    }
}

/// `#define` table with whole-word substitution
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: IndexMap<String, Option<MacroValue>>,
}

impl MacroTable {
    pub fn define(&mut self, name: &str, value: Option<MacroValue>) {
        log::debug!("define {name} {value:?}");
        self.macros.insert(name.to_string(), value);
    }

    /// Remove a macro; undefined names are ignored
    pub fn undef(&mut self, name: &str) -> bool {
        log::debug!("undef {name}");
        self.macros.shift_remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Option<&MacroValue>> {
        self.macros.get(name).map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Replace defined names in one left-to-right pass. Replacement text is
    /// not rescanned and string literals are left alone.
    pub fn substitute(&self, line: &str) -> String {
        if self.macros.is_empty() {
            return line.to_string();
        }
        let mut out = String::with_capacity(line.len());
        let mut chars = line.char_indices().peekable();
        while let Some((start, ch)) = chars.next() {
            if ch == '"' {
                out.push(ch);
                let mut escape = false;
                for (_, ch) in chars.by_ref() {
                    out.push(ch);
                    match ch {
                        '\\' if !escape => escape = true,
                        '"' if !escape => break,
                        _ => escape = false,
                    }
                }
                continue;
            }
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                out.push(ch);
                continue;
            }
            let mut end = start + ch.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !(next.is_ascii_alphanumeric() || next == '_') {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            let word = &line[start..end];
            let replacement = match self.macros.get(word) {
                Some(value) if !ch.is_ascii_digit() && !out.ends_with('$') => value,
                _ => {
                    out.push_str(word);
                    continue;
                }
            };
            if let Some(value) = replacement {
                out.push_str(&value.to_string());
            }
        }
        out
    }
}

impl Scope for MacroTable {
    fn value(&self, path: &[String]) -> Option<i64> {
        match path {
            [name] => match self.macros.get(name) {
                Some(Some(MacroValue::Number(n))) => Some(*n),
                _ => None,
            },
            _ => None,
        }
    }

    fn size_of(&self, _: &[String]) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_words_only() {
        let mut table = MacroTable::default();
        table.define("FOO", Some(MacroValue::Number(5)));
        assert_eq!(table.substitute("lda #FOO+FOOD"), "lda #5+FOOD");
        assert_eq!(table.substitute("byte s = \"FOO\" // FOO"), "byte s = \"FOO\" // 5");
    }

    #[test]
    fn not_rescanned() {
        let mut table = MacroTable::default();
        table.define("A", Some(MacroValue::Raw("B".to_string())));
        table.define("B", Some(MacroValue::Raw("A".to_string())));
        assert_eq!(table.substitute("A B"), "B A");
    }

    #[test]
    fn flag_and_undef() {
        let mut table = MacroTable::default();
        table.define("NES", None);
        assert_eq!(table.substitute("x NES y"), "x  y");
        assert!(table.undef("NES"));
        assert!(!table.undef("NES"));
        assert_eq!(table.substitute("x NES y"), "x NES y");
    }
}
