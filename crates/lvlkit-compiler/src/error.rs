use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Broad class of a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Missing header key, malformed block, row/column count mismatch.
    Structural,
    /// Unknown name in any namespace.
    Referential,
    /// Stamp shape mismatch, overlap, out-of-map placement.
    Geometric,
    /// A count or value that does not fit the fixed-width format.
    Limit,
}

/// One located compile error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{file}:{line}: {kind} error: {msg}")]
pub struct Diagnostic {
    pub file: String,
    /// 1-based; 0 when the error is not tied to a line.
    pub line: usize,
    pub kind: ErrorKind,
    pub msg: String,
}

/// Collects every error of one compilation unit so they can be reported
/// together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    file: String,
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            list: Vec::new(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn push(&mut self, line: usize, kind: ErrorKind, msg: impl Into<String>) {
        let msg = msg.into();
        log::debug!("{}:{line}: {kind}: {msg}", self.file);
        self.list.push(Diagnostic {
            file: self.file.clone(),
            line,
            kind,
            msg,
        });
    }

    pub fn structural(&mut self, line: usize, msg: impl Into<String>) {
        self.push(line, ErrorKind::Structural, msg);
    }

    pub fn referential(&mut self, line: usize, msg: impl Into<String>) {
        self.push(line, ErrorKind::Referential, msg);
    }

    pub fn geometric(&mut self, line: usize, msg: impl Into<String>) {
        self.push(line, ErrorKind::Geometric, msg);
    }

    pub fn limit(&mut self, line: usize, msg: impl Into<String>) {
        self.push(line, ErrorKind::Limit, msg);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    /// Fold another unit's errors into this one.
    pub fn extend(&mut self, other: Diagnostics) {
        self.list.extend(other.list);
    }

    /// `Ok(value)` only when nothing was reported.
    pub fn finish<T>(self, value: T) -> Result<T, CompileError> {
        if self.list.is_empty() {
            Ok(value)
        } else {
            Err(CompileError::Invalid(self))
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.list {
            writeln!(f, "  {d}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{} failed with {} error(s):\n{}", .0.file(), .0.len(), .0)]
    Invalid(Diagnostics),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot render debug json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{} unit(s) failed:\n{}", .0.len(), join_errors(.0))]
    Build(Vec<CompileError>),
}

fn join_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl CompileError {
    /// The collected diagnostics, empty for I/O failures.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Invalid(d) => &d.list,
            Self::Build(errors) => errors.first().map_or(&[][..], |e| e.diagnostics()),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_collects_everything() {
        let mut d = Diagnostics::new("boot.lvl");
        d.structural(3, "MAP has 4 rows, expected 5");
        d.referential(9, "unknown action `NOPE`");
        let err = d.finish(()).unwrap_err();
        let diags = err.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1].kind, ErrorKind::Referential);
        let text = err.to_string();
        assert!(text.contains("boot.lvl failed with 2 error(s)"));
        assert!(text.contains("boot.lvl:9: referential error: unknown action `NOPE`"));
    }

    #[test]
    fn finish_empty_is_ok() {
        assert_eq!(Diagnostics::new("x").finish(7).unwrap(), 7);
    }
}
