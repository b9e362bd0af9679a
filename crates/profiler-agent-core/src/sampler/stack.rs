//! Stack representation handed over by a [`StackCollector`](super::StackCollector).

use std::fmt;

/// One frame of a captured stack. Every field is optional because collectors
/// differ in what they can resolve.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub module: Option<String>,
    pub name: Option<String>,
    pub filename: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, line: u32) -> Self {
        Self {
            module: None,
            name: Some(name.into()),
            filename: Some(filename.into()),
            line: Some(line),
        }
    }

    #[must_use]
    pub fn module(self, module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..self
        }
    }
}

impl fmt::Display for StackFrame {
    /// `file:line - function`, with missing parts left empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}",
            self.filename.as_deref().unwrap_or_default(),
            self.line.unwrap_or(0),
            self.name.as_deref().unwrap_or_default()
        )
    }
}

/// Stack of one thread at one instant.
///
/// `frames` is ordered innermost first, as collectors walk the stack.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct StackTrace {
    pub pid: Option<u32>,
    pub thread_id: u64,
    pub thread_name: Option<String>,
    pub frames: Vec<StackFrame>,
}

impl StackTrace {
    pub fn new(thread_id: u64, frames: Vec<StackFrame>) -> Self {
        Self {
            pid: None,
            thread_id,
            thread_name: None,
            frames,
        }
    }

    #[must_use]
    pub fn pid(self, pid: u32) -> Self {
        Self {
            pid: Some(pid),
            ..self
        }
    }

    #[must_use]
    pub fn thread_name(self, thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: Some(thread_name.into()),
            ..self
        }
    }
}

impl fmt::Display for StackTrace {
    /// Folded form, outermost frame first: `outer;...;inner`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}
