use std::fmt;
use thiserror::Error;

/// Where a chunk, token, or tree node came from: pathname, 1-based
/// line, 1-based column.  Rendered verbatim in every error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub path: String,
    pub line: usize,
    pub column: usize,
}

impl SourceInfo {
    pub fn new(path: impl Into<String>, line: usize, column: usize) -> Self {
        SourceInfo {
            path: path.into(),
            line,
            column,
        }
    }

    /// A placeholder for errors raised before a location is known.
    /// The renderer fills these in with the enclosing node's location.
    pub fn unlocated() -> Self {
        SourceInfo::new("", 0, 0)
    }

    pub fn is_unlocated(&self) -> bool {
        self.line == 0
    }

    /// The location `consumed` characters further into the same source,
    /// counting line breaks.  Used to point at a spot inside a chunk.
    pub fn advanced(&self, consumed: &str) -> SourceInfo {
        let newlines = bytecount::count(consumed.as_bytes(), b'\n');
        if newlines == 0 {
            SourceInfo::new(&self.path, self.line, self.column + consumed.chars().count())
        } else {
            let tail = consumed.rsplit('\n').next().unwrap_or("");
            SourceInfo::new(&self.path, self.line + newlines, 1 + tail.chars().count())
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unlocated() {
            out.write_str("?")
        } else {
            write!(out, "{}:{}:{}", self.path, self.line, self.column)
        }
    }
}

/// Everything that can go wrong while scanning, parsing, or rendering a
/// template.  Parse-phase errors abort parsing; render-phase errors
/// abort the render unless the engine is configured to replace object
/// errors with a placeholder string.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{info}: {message}")]
    Scan { message: String, info: SourceInfo },

    #[error("{info}: {message}")]
    Parse { message: String, info: SourceInfo },

    #[error("{info}: unknown tag {name:?}")]
    UnknownTag { name: String, info: SourceInfo },

    #[error("{info}: block {name:?} has no matching end tag")]
    UnbalancedBlock { name: String, info: SourceInfo },

    #[error("{info}: unexpected tag {name:?} outside its block")]
    UnexpectedTag { name: String, info: SourceInfo },

    #[error("{info}: undefined filter {name:?}")]
    UndefinedFilter { name: String, info: SourceInfo },

    #[error("{info}: filter {name:?} takes {expected} argument(s), got {actual}")]
    FilterArity {
        name: String,
        expected: String,
        actual: usize,
        info: SourceInfo,
    },

    #[error("{info}: {message}")]
    Interpreter { message: String, info: SourceInfo },

    #[error("{info}: template {name:?} not found")]
    IncludeNotFound { name: String, info: SourceInfo },

    #[error("{info}: in included template: {source}")]
    Include {
        #[source]
        source: Box<Error>,
        info: SourceInfo,
    },
}

impl Error {
    pub fn interpreter(message: impl Into<String>) -> Self {
        Error::Interpreter {
            message: message.into(),
            info: SourceInfo::unlocated(),
        }
    }

    pub fn undefined_filter(name: impl Into<String>) -> Self {
        Error::UndefinedFilter {
            name: name.into(),
            info: SourceInfo::unlocated(),
        }
    }

    pub fn info(&self) -> &SourceInfo {
        match self {
            Error::Scan { info, .. }
            | Error::Parse { info, .. }
            | Error::UnknownTag { info, .. }
            | Error::UnbalancedBlock { info, .. }
            | Error::UnexpectedTag { info, .. }
            | Error::UndefinedFilter { info, .. }
            | Error::FilterArity { info, .. }
            | Error::Interpreter { info, .. }
            | Error::IncludeNotFound { info, .. }
            | Error::Include { info, .. } => info,
        }
    }

    /// Attach a location to an error raised without one.  Errors that
    /// already carry a location keep it.
    pub fn at(mut self, location: &SourceInfo) -> Self {
        {
            let info = match &mut self {
                Error::Scan { info, .. }
                | Error::Parse { info, .. }
                | Error::UnknownTag { info, .. }
                | Error::UnbalancedBlock { info, .. }
                | Error::UnexpectedTag { info, .. }
                | Error::UndefinedFilter { info, .. }
                | Error::FilterArity { info, .. }
                | Error::Interpreter { info, .. }
                | Error::IncludeNotFound { info, .. }
                | Error::Include { info, .. } => info,
            };
            if info.is_unlocated() {
                *info = location.clone();
            }
        }
        self
    }
}
