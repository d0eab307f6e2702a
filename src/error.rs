use thiserror::Error;

/// What went wrong while scanning a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    /// A character other than `+`, `:` or `#` where a prefix was expected.
    #[error("invalid prefix {0:?}")]
    InvalidPrefix(char),
    /// A backslash followed by something other than `n`, `"` or `\`.
    /// `None` when the backslash is the last character of the line.
    #[error("invalid escape sequence \\{}", escaped(.0))]
    InvalidEscape(Option<char>),
    /// The line ended inside a quoted argument.
    #[error("unterminated quoted argument")]
    UnterminatedQuote,
    /// The line has text but no `+`, `:` or `#` marker.
    #[error("missing statement prefix")]
    MissingPrefix,
    /// A label name declared twice.
    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
}

fn escaped(next: &Option<char>) -> String {
    next.map(String::from).unwrap_or_default()
}

/// Fatal parse failure. No program is produced when this is returned.
///
/// `line` is the 1-based source line, `column` the 1-based character
/// position in that line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {line}:{column}: {kind}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub(crate) fn new(kind: SyntaxErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

/// Fatal failure of a label-qualified run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("label {0:?} does not exist in the script")]
    UnknownLabel(String),
}

/// Errors that stop a run before any statement executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

/// Expected, recoverable failure a handler signals to the interpreter.
///
/// Return it through `anyhow` (`Err(RuntimeError::new("...").into())` or
/// `anyhow::bail!(RuntimeError::new(..))`); any other error a handler returns
/// is treated as an internal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuntimeError(pub String);

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A statement that failed during a run. Execution continued past it.
///
/// The `Display` form is the line written to the interpreter's report sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// No handler registered under the statement's command name.
    #[error("error: command not found: {name} (statement {index})")]
    CommandNotFound { index: usize, name: String },
    /// The handler returned a [`RuntimeError`].
    #[error("error: {name} (statement {index}): {message}")]
    Handler {
        index: usize,
        name: String,
        message: String,
    },
    /// The handler returned some other error or panicked.
    #[error("internal error: {name} (statement {index}): {detail}")]
    Internal {
        index: usize,
        name: String,
        detail: String,
    },
}

impl Failure {
    /// Position of the failing statement.
    pub fn index(&self) -> usize {
        match self {
            Failure::CommandNotFound { index, .. }
            | Failure::Handler { index, .. }
            | Failure::Internal { index, .. } => *index,
        }
    }

    /// Command name of the failing statement.
    pub fn name(&self) -> &str {
        match self {
            Failure::CommandNotFound { name, .. }
            | Failure::Handler { name, .. }
            | Failure::Internal { name, .. } => name,
        }
    }
}
