use crate::error::ErrorKind;
use crate::grammer::token::Pos;

#[derive(Debug, Clone)]
struct Frame {
    ignore: bool,
    pos: Pos,
}

/// Open `#ifdef`/`#ifndef` blocks, innermost last
#[derive(Debug, Clone, Default)]
pub struct CondStack {
    frames: Vec<Frame>,
}

impl CondStack {
    pub fn push(&mut self, ignore: bool, pos: Pos) {
        self.frames.push(Frame { ignore, pos });
    }

    /// `#else`: flip the innermost frame
    pub fn flip(&mut self) -> Result<(), ErrorKind> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.ignore = !frame.ignore;
                Ok(())
            }
            None => Err(ErrorKind::UnmatchedDirective("else".to_string())),
        }
    }

    /// `#endif`
    pub fn pop(&mut self) -> Result<(), ErrorKind> {
        self.frames
            .pop()
            .map(|_| ())
            .ok_or_else(|| ErrorKind::UnmatchedDirective("endif".to_string()))
    }

    /// Lines are dropped while any open frame ignores
    pub fn ignoring(&self) -> bool {
        self.frames.iter().any(|f| f.ignore)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Where the innermost open block started
    pub fn innermost(&self) -> Option<&Pos> {
        self.frames.last().map(|f| &f.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn pos() -> Pos {
        Pos::new(&Rc::from("t.hla"), 1, 1)
    }

    #[test]
    fn or_of_frames() {
        let mut stack = CondStack::default();
        stack.push(true, pos());
        stack.push(false, pos());
        assert!(stack.ignoring());
        stack.flip().unwrap();
        assert!(stack.ignoring());
        stack.pop().unwrap();
        stack.flip().unwrap();
        assert!(!stack.ignoring());
        stack.pop().unwrap();
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn unmatched() {
        let mut stack = CondStack::default();
        assert!(matches!(stack.flip(), Err(ErrorKind::UnmatchedDirective(_))));
        assert!(matches!(stack.pop(), Err(ErrorKind::UnmatchedDirective(_))));
    }
}
