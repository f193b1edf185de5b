// INI Tokenizer
// Splits a matrix declaration into sections, keys and continuation lines

use crate::parser::error::{ParseError, ParseErrorKind, ParseResult};

/// One physical line of a value, with its position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueLine {
    /// Trimmed text of the line
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column where `text` starts (1-indexed)
    pub column: usize,
}

/// A `key = value` entry, possibly spanning several lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// Line of the key itself
    pub line: usize,
    /// Non-empty value lines in declaration order
    pub lines: Vec<ValueLine>,
}

impl Entry {
    /// Value lines joined with newlines
    pub fn value(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A `[name]` section with its entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub line: usize,
    pub entries: Vec<Entry>,
}

impl Section {
    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Tokenized document: sections in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    pub sections: Vec<Section>,
}

impl IniDocument {
    /// Tokenize source text
    pub fn parse(source: &str) -> ParseResult<Self> {
        Tokenizer::new(source)
            .run()
            .map_err(|e| e.with_source_context(source, 2))
    }

    /// Look up a section by name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

struct Tokenizer<'a> {
    source: &'a str,
    sections: Vec<Section>,
    /// Whether the previous non-blank line was a key (continuations allowed)
    in_entry: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            sections: Vec::new(),
            in_entry: false,
        }
    }

    fn run(mut self) -> ParseResult<IniDocument> {
        for (idx, raw) in self.source.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }

            let indent = raw.len() - raw.trim_start().len();
            if indent > 0 {
                self.continuation(trimmed, line_no, indent + 1)?;
            } else if trimmed.starts_with('[') {
                self.section_header(trimmed, line_no)?;
            } else {
                self.entry(raw, line_no)?;
            }
        }

        Ok(IniDocument {
            sections: self.sections,
        })
    }

    fn continuation(&mut self, text: &str, line: usize, column: usize) -> ParseResult<()> {
        let entry = match self.sections.last_mut().and_then(|s| s.entries.last_mut()) {
            Some(entry) if self.in_entry => entry,
            _ => {
                return Err(ParseError::new(
                    "indented line does not continue any key",
                    line,
                    column,
                )
                .with_suggestion("remove the leading whitespace or add 'key =' above it"));
            }
        };

        entry.lines.push(ValueLine {
            text: text.to_string(),
            line,
            column,
        });
        Ok(())
    }

    fn section_header(&mut self, trimmed: &str, line: usize) -> ParseResult<()> {
        let name = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .map(str::trim)
            .ok_or_else(|| {
                ParseError::new("unclosed section header", line, trimmed.len())
                    .with_suggestion("section headers look like '[testenv]'")
            })?;

        if name.is_empty() {
            return Err(ParseError::new("section name is empty", line, 1));
        }

        if self.sections.iter().any(|s| s.name == name) {
            return Err(
                ParseError::new(format!("section '{}' is declared twice", name), line, 1)
                    .with_kind(ParseErrorKind::DuplicateKey),
            );
        }

        self.sections.push(Section {
            name: name.to_string(),
            line,
            entries: Vec::new(),
        });
        self.in_entry = false;
        Ok(())
    }

    fn entry(&mut self, raw: &str, line: usize) -> ParseResult<()> {
        let section = self.sections.last_mut().ok_or_else(|| {
            ParseError::new("key declared outside of any section", line, 1)
                .with_suggestion("add a section header such as '[testenv]' above this line")
        })?;

        let (key, value) = raw.split_once('=').ok_or_else(|| {
            ParseError::new("expected 'key = value'", line, 1)
                .with_suggestion("use an empty value ('key =') and indented lines for lists")
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::new("key is empty", line, 1));
        }

        if section.entries.iter().any(|e| e.key == key) {
            return Err(ParseError::new(
                format!("key '{}' is declared twice in section '{}'", key, section.name),
                line,
                1,
            )
            .with_kind(ParseErrorKind::DuplicateKey));
        }

        let mut lines = Vec::new();
        let text = value.trim();
        if !text.is_empty() {
            // Column of the first non-space character after '='
            let offset = raw.len() - value.trim_start().len();
            lines.push(ValueLine {
                text: text.to_string(),
                line,
                column: offset + 1,
            });
        }

        section.entries.push(Entry {
            key: key.to_string(),
            line,
            lines,
        });
        self.in_entry = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_and_keys() {
        let source = "[tox]\nenvlist = py27,py34\n\n[testenv]\nusedevelop = true\n";
        let doc = IniDocument::parse(source).unwrap();

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].name, "tox");
        assert_eq!(doc.sections[1].name, "testenv");

        let envlist = doc.section("tox").unwrap().get("envlist").unwrap();
        assert_eq!(envlist.value(), "py27,py34");
        assert_eq!(envlist.lines[0].column, 11);
    }

    #[test]
    fn test_continuation_lines() {
        let source = "[testenv]\ncommands =\n    py.test\n\n    flake8 .\ndeps = pytest\n";
        let doc = IniDocument::parse(source).unwrap();
        let section = doc.section("testenv").unwrap();

        let commands = section.get("commands").unwrap();
        assert_eq!(commands.lines.len(), 2);
        assert_eq!(commands.lines[0].text, "py.test");
        assert_eq!(commands.lines[0].line, 3);
        assert_eq!(commands.lines[1].text, "flake8 .");
        assert_eq!(commands.lines[1].column, 5);
        assert_eq!(commands.value(), "py.test\nflake8 .");

        assert_eq!(section.get("deps").unwrap().value(), "pytest");
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "# header\n[testenv]\n; note\ndeps =\n    # not a dep\n    pytest\n";
        let doc = IniDocument::parse(source).unwrap();
        let deps = doc.section("testenv").unwrap().get("deps").unwrap();
        assert_eq!(deps.value(), "pytest");
    }

    #[test]
    fn test_key_outside_section() {
        let err = IniDocument::parse("envlist = py27\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.line, 1);
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_duplicate_key() {
        let source = "[testenv]\ndeps = a\ndeps = b\n";
        let err = IniDocument::parse(source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateKey);
        assert_eq!(err.line, 3);
        assert!(err.context.contains("deps = b"));
    }

    #[test]
    fn test_duplicate_section() {
        let err = IniDocument::parse("[testenv]\n[testenv]\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateKey);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_missing_equals() {
        let err = IniDocument::parse("[testenv]\ncommands\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unclosed_section() {
        let err = IniDocument::parse("[testenv\n").unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn test_orphan_continuation() {
        let err = IniDocument::parse("[testenv]\n    py.test\n").unwrap_err();
        assert!(err.message.contains("does not continue"));
        assert_eq!(err.column, 5);
    }
}
