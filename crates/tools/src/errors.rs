use colored::*;
use serde::Serialize;
use std::fmt::Display;

/// A point in the source text. Both fields are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Lexical,
    Syntactic,
    Semantic,
    Fatal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Lexical => "Lexical",
            ErrorKind::Syntactic => "Syntactic",
            ErrorKind::Semantic => "Semantic",
            ErrorKind::Fatal => "Fatal",
        };

        write!(f, "{label}")
    }
}

/// One reported problem. Descriptions stay plain text so they can travel
/// through JSON, colors are only added by `Display`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub description: String,
    pub line: u32,
    pub column: u32,
}

impl ErrorEntry {
    pub fn new(kind: ErrorKind, description: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            description: description.into(),
            line: pos.line,
            column: pos.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = format!("{} error", self.kind);
        let header = match self.kind {
            ErrorKind::Fatal => header.on_red().white().bold(),
            _ => header.red().bold(),
        };

        write!(
            f,
            "{} [{}:{}]: {}",
            header, self.line, self.column, self.description
        )
    }
}

/// Ordered, append-only collection of errors shared by every stage of a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Diagnostics {
    entries: Vec<ErrorEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        self.entries.push(entry);
    }

    pub fn report<E: ReportCodeErr + Display>(&mut self, err: &E, pos: Position) {
        self.entries.push(err.report(pos));
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ErrorEntry>) {
        self.entries.extend(entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn into_entries(self) -> Vec<ErrorEntry> {
        self.entries
    }
}

/// Every error family of the workspace turns itself into an `ErrorEntry`
/// through this trait. Only the kind has to be given by the implementor.
pub trait ReportCodeErr {
    fn kind(&self) -> ErrorKind;

    fn report(&self, pos: Position) -> ErrorEntry
    where
        Self: Display,
    {
        ErrorEntry::new(self.kind(), self.to_string(), pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy;

    impl Display for Dummy {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "dummy failure")
        }
    }

    impl ReportCodeErr for Dummy {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Semantic
        }
    }

    #[test]
    fn report_keeps_plain_description() {
        let mut diags = Diagnostics::new();
        diags.report(&Dummy, Position::new(3, 7));

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.entries()[0],
            ErrorEntry {
                kind: ErrorKind::Semantic,
                description: "dummy failure".into(),
                line: 3,
                column: 7
            }
        );
        assert_eq!(diags.count_of(ErrorKind::Fatal), 0);
    }
}
