// Parser error types with helpful error messages
// Every malformed declaration surfaces as a ParseError before anything runs

use std::fmt;

/// Detailed configuration error with location and context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Line number (1-indexed, 0 when the error has no location)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
    /// Surrounding context (a few lines around the error)
    pub context: String,
    /// Optional suggestion for fixing the error
    pub suggestion: Option<String>,
    /// The kind of error
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Line could not be tokenized
    Syntax,
    /// Key or section declared twice
    DuplicateKey,
    /// Environment name listed twice in envlist
    DuplicateEnvironment,
    /// Required section or key is absent
    MissingField,
    /// No commands declared
    EmptyCommands,
    /// Value references a token that cannot be resolved
    UndefinedSubstitution,
    /// Value has the wrong shape
    InvalidValue,
    /// Key not known in its section (strict mode only)
    InvalidKey,
    /// Per-environment override section
    UnsupportedOverride,
    /// IO error (file not found, etc.)
    Io,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            context: String::new(),
            suggestion: None,
            kind: ParseErrorKind::Syntax,
        }
    }

    /// Error that is not tied to a position in the file
    pub fn unlocated(message: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self::new(message, 0, 0).with_kind(kind)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Create context from source content
    pub fn with_source_context(mut self, source: &str, context_lines: usize) -> Self {
        if self.line == 0 {
            return self;
        }

        let lines: Vec<&str> = source.lines().collect();
        let start = self.line.saturating_sub(context_lines + 1);
        let end = (self.line + context_lines).min(lines.len());

        let mut context = String::new();
        for (i, line) in lines.iter().enumerate().take(end).skip(start) {
            let line_num = i + 1;
            let prefix = if line_num == self.line { ">" } else { " " };
            context.push_str(&format!("{} {:4} | {}\n", prefix, line_num, line));

            if line_num == self.line && self.column > 0 {
                let indicator = " ".repeat(self.column - 1) + "^";
                context.push_str(&format!("       | {}\n", indicator));
            }
        }

        self.context = context;
        self
    }

    /// Whether this error carries a line/column location
    pub fn is_located(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;
        if self.is_located() {
            writeln!(f, "  --> line {}:{}", self.line, self.column)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.context)?;
        }

        if let Some(suggestion) = &self.suggestion {
            writeln!(f)?;
            writeln!(f, "help: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Suggest the canonical spelling for a misspelled key
pub(crate) fn suggest_key(key: &str, known: &[&str]) -> Option<String> {
    let lower = key.to_lowercase().replace('-', "_");
    known
        .iter()
        .find(|candidate| {
            **candidate == lower
                || candidate.trim_end_matches('s') == lower.trim_end_matches('s')
                || (lower == "whitelist" && candidate.starts_with("whitelist"))
                || (lower == "allowlist_externals" && candidate.starts_with("whitelist"))
        })
        .map(|candidate| format!("did you mean '{}'?", candidate))
}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;
