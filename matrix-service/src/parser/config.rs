// Matrix Declaration Parser
// Turns a tokenized document into a validated, immutable Matrix

use crate::parser::error::{suggest_key, ParseError, ParseErrorKind, ParseResult};
use crate::parser::ini::{Entry, IniDocument, Section, ValueLine};
use crate::parser::models::{Matrix, MatrixBuilder, SubstitutionContext};
use crate::parser::substitution::{
    render, resolve_parse_token, SubstitutionError, SubstitutionErrorKind,
};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Section names accepted for the matrix declaration
pub const MATRIX_SECTIONS: &[&str] = &["tox", "matrix"];
/// Section names accepted for the shared environment group
pub const GROUP_SECTIONS: &[&str] = &["testenv", "env"];

const MATRIX_KEYS: &[&str] = &["envlist"];

const GROUP_KEYS: &[&str] = &[
    "deps",
    "setenv",
    "commands",
    "whitelist_externals",
    "allowlist_externals",
    "usedevelop",
];

/// Parser behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Reject unknown keys in the matrix and group sections instead of
    /// ignoring them
    pub strict_keys: bool,
}

impl ParserOptions {
    pub fn strict() -> Self {
        Self { strict_keys: true }
    }
}

/// Parser for matrix declaration files
pub struct MatrixParser;

impl MatrixParser {
    /// Parse a declaration from a string
    pub fn parse(content: &str, ctx: &SubstitutionContext) -> ParseResult<Matrix> {
        Self::parse_with(content, ctx, ParserOptions::default())
    }

    pub fn parse_with(
        content: &str,
        ctx: &SubstitutionContext,
        options: ParserOptions,
    ) -> ParseResult<Matrix> {
        let doc = IniDocument::parse(content)?;
        Self::from_document_with(&doc, ctx, options)
            .map_err(|e| e.with_source_context(content, 2))
    }

    /// Parse a declaration file, resolving tokens against the current process
    pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Matrix> {
        Self::parse_file_with(path, Vec::new(), ParserOptions::default())
    }

    /// Parse a declaration file with positional arguments for `{posargs}`
    pub fn parse_file_with_posargs<P: AsRef<Path>>(
        path: P,
        posargs: Vec<String>,
    ) -> ParseResult<Matrix> {
        Self::parse_file_with(path, posargs, ParserOptions::default())
    }

    pub fn parse_file_with<P: AsRef<Path>>(
        path: P,
        posargs: Vec<String>,
        options: ParserOptions,
    ) -> ParseResult<Matrix> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::unlocated(
                format!("failed to read {}: {}", path.display(), e),
                ParseErrorKind::Io,
            )
        })?;

        let ctx = SubstitutionContext::from_process(config_dir_of(path)).with_posargs(posargs);
        debug!(path = %path.display(), config_dir = %ctx.config_dir.display(), "parsing matrix");

        Self::parse_with(&content, &ctx, options)
    }

    /// Build a matrix from an already tokenized document
    pub fn from_document(doc: &IniDocument, ctx: &SubstitutionContext) -> ParseResult<Matrix> {
        Self::from_document_with(doc, ctx, ParserOptions::default())
    }

    pub fn from_document_with(
        doc: &IniDocument,
        ctx: &SubstitutionContext,
        options: ParserOptions,
    ) -> ParseResult<Matrix> {
        let matrix_section = find_single_section(doc, MATRIX_SECTIONS)?.ok_or_else(|| {
            ParseError::unlocated("missing matrix section", ParseErrorKind::MissingField)
                .with_suggestion("add a '[tox]' section with an 'envlist = ...' line")
        })?;
        let group = find_single_section(doc, GROUP_SECTIONS)?;

        for section in &doc.sections {
            if let Some(env) = section.name.strip_prefix("testenv:") {
                return Err(ParseError::new(
                    format!("per-environment section '[{}]' is not supported", section.name),
                    section.line,
                    1,
                )
                .with_kind(ParseErrorKind::UnsupportedOverride)
                .with_suggestion(format!(
                    "every environment shares '[testenv]'; move settings for '{}' there",
                    env
                )));
            }
            if !MATRIX_SECTIONS.contains(&section.name.as_str())
                && !GROUP_SECTIONS.contains(&section.name.as_str())
            {
                warn!(section = %section.name, line = section.line, "ignoring unknown section");
            }
        }

        check_keys(matrix_section, MATRIX_KEYS, options)?;

        let mut builder = MatrixBuilder::new(ctx.config_dir.clone());

        for name in parse_envlist(matrix_section, ctx)? {
            builder = builder.env(name);
        }

        let Some(group) = group else {
            return Err(ParseError::unlocated(
                "no commands declared",
                ParseErrorKind::EmptyCommands,
            )
            .with_suggestion("add a '[testenv]' section with 'commands =' lines"));
        };

        check_keys(group, GROUP_KEYS, options)?;

        if let Some(entry) = group.get("deps") {
            for dep in line_items(entry, ctx)? {
                builder = builder.dep_template(dep);
            }
        }

        if let Some(entry) = group.get("setenv") {
            for (key, value) in parse_setenv(entry, ctx)? {
                builder = builder.var_template(key, value);
            }
        }

        let commands = match group.get("commands") {
            Some(entry) => line_items(entry, ctx)?,
            None => Vec::new(),
        };
        if commands.is_empty() {
            let line = group.get("commands").map(|e| e.line).unwrap_or(group.line);
            let mut err = ParseError::new("no commands declared", line, 1)
                .with_kind(ParseErrorKind::EmptyCommands)
                .with_suggestion("add 'commands =' with one command per indented line");
            if let Some(near) = group
                .entries
                .iter()
                .find(|e| e.key != "commands" && suggest_key(&e.key, &["commands"]).is_some())
            {
                err = ParseError::new("no commands declared", near.line, 1)
                    .with_kind(ParseErrorKind::EmptyCommands)
                    .with_suggestion(format!(
                        "'{}' is not a known key; did you mean 'commands'?",
                        near.key
                    ));
            }
            return Err(err);
        }
        for command in commands {
            builder = builder.command_template(command);
        }

        let whitelist = match (
            group.get("whitelist_externals"),
            group.get("allowlist_externals"),
        ) {
            (Some(a), Some(_)) => {
                return Err(ParseError::new(
                    "both 'whitelist_externals' and 'allowlist_externals' are declared",
                    a.line,
                    1,
                )
                .with_kind(ParseErrorKind::DuplicateKey));
            }
            (Some(entry), None) | (None, Some(entry)) => Some(entry),
            (None, None) => None,
        };
        if let Some(entry) = whitelist {
            for program in whitespace_items(entry, ctx)? {
                builder = builder.whitelist_template(program);
            }
        }

        if let Some(entry) = group.get("usedevelop") {
            builder = builder.usedevelop(parse_bool(entry, ctx)?);
        }

        let matrix = builder.build()?;
        debug!(
            environments = matrix.envlist().len(),
            commands = matrix.commands().len(),
            deps = matrix.deps().len(),
            "parsed matrix"
        );
        Ok(matrix)
    }
}

/// Directory containing `path`, made absolute when possible
pub fn config_dir_of(path: &Path) -> PathBuf {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    match absolute.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Warn about unknown keys, or reject them under `strict_keys`
fn check_keys(section: &Section, known: &[&str], options: ParserOptions) -> ParseResult<()> {
    for entry in &section.entries {
        if known.contains(&entry.key.as_str()) {
            continue;
        }
        let hint = suggest_key(&entry.key, known);

        if options.strict_keys {
            let mut err = ParseError::new(
                format!("unknown key '{}' in '[{}]'", entry.key, section.name),
                entry.line,
                1,
            )
            .with_kind(ParseErrorKind::InvalidKey);
            err = match hint {
                Some(hint) => err.with_suggestion(hint),
                None => err.with_suggestion(format!("known keys: {}", known.join(", "))),
            };
            return Err(err);
        }

        match hint {
            Some(hint) => {
                warn!(key = %entry.key, line = entry.line, "ignoring unknown key, {}", hint)
            }
            None => debug!(key = %entry.key, line = entry.line, "ignoring unknown key"),
        }
    }
    Ok(())
}

fn find_single_section<'a>(
    doc: &'a IniDocument,
    names: &[&str],
) -> ParseResult<Option<&'a Section>> {
    let mut found: Option<&Section> = None;
    for section in doc.sections.iter().filter(|s| names.contains(&s.name.as_str())) {
        if let Some(first) = found {
            return Err(ParseError::new(
                format!(
                    "sections '[{}]' and '[{}]' declare the same thing",
                    first.name, section.name
                ),
                section.line,
                1,
            )
            .with_kind(ParseErrorKind::DuplicateKey));
        }
        found = Some(section);
    }
    Ok(found)
}

/// Resolve parse-time tokens in one value line.
///
/// With `defer_envname` the result goes through a second pass at expansion,
/// so `{envname}` and doubled braces are kept. Otherwise this is the only
/// pass and escapes are collapsed here.
fn substitute(
    line: &ValueLine,
    text: &str,
    column: usize,
    ctx: &SubstitutionContext,
    defer_envname: bool,
) -> ParseResult<String> {
    render(text, defer_envname, |token| {
        resolve_parse_token(token, ctx, defer_envname)
    })
    .map_err(|e| substitution_error(e, line.line, column))
}

fn substitution_error(err: SubstitutionError, line: usize, column: usize) -> ParseError {
    let column = column + err.offset;
    match err.kind {
        SubstitutionErrorKind::Unclosed => ParseError::new(err.to_string(), line, column)
            .with_suggestion("write '{{' for a literal brace"),
        SubstitutionErrorKind::Undefined => {
            let suggestion = if err.token == "envname" {
                "'{envname}' is only available in [testenv] values".to_string()
            } else {
                "known tokens: {toxinidir}, {envname}, {homedir}, {posargs}, {env:KEY}".to_string()
            };
            ParseError::new(err.to_string(), line, column)
                .with_kind(ParseErrorKind::UndefinedSubstitution)
                .with_suggestion(suggestion)
        }
    }
}

fn parse_envlist(section: &Section, ctx: &SubstitutionContext) -> ParseResult<Vec<String>> {
    let entry = section.get("envlist").ok_or_else(|| {
        ParseError::new(
            format!("section '[{}]' has no 'envlist'", section.name),
            section.line,
            1,
        )
        .with_kind(ParseErrorKind::MissingField)
        .with_suggestion("add 'envlist = py27,py34'")
    })?;

    let mut names: Vec<String> = Vec::new();
    let mut seen = BTreeSet::new();

    for line in &entry.lines {
        let mut offset = 0;
        for raw in line.text.split(',') {
            let item = raw.trim();
            let column = line.column + offset + (raw.len() - raw.trim_start().len());
            offset += raw.len() + 1;

            if item.is_empty() {
                continue;
            }

            let name = substitute(line, item, column, ctx, false)?;
            if !seen.insert(name.clone()) {
                return Err(ParseError::new(
                    format!("duplicate environment '{}' in envlist", name),
                    line.line,
                    column,
                )
                .with_kind(ParseErrorKind::DuplicateEnvironment)
                .with_suggestion(format!("remove the second '{}'", name)));
            }
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(ParseError::new("envlist is empty", entry.line, 1)
            .with_kind(ParseErrorKind::MissingField)
            .with_suggestion("list at least one environment, e.g. 'envlist = py27,py34'"));
    }

    Ok(names)
}

/// One item per value line; lines that substitute to nothing are dropped
fn line_items(entry: &Entry, ctx: &SubstitutionContext) -> ParseResult<Vec<String>> {
    let mut items = Vec::new();
    for line in &entry.lines {
        let item = substitute(line, &line.text, line.column, ctx, true)?;
        let item = item.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
    Ok(items)
}

/// Items separated by any whitespace
fn whitespace_items(entry: &Entry, ctx: &SubstitutionContext) -> ParseResult<Vec<String>> {
    let mut items = Vec::new();
    for line in &entry.lines {
        for (offset, word) in words(&line.text) {
            items.push(substitute(line, word, line.column + offset, ctx, true)?);
        }
    }
    Ok(items)
}

/// Whitespace separated words with their byte offsets
fn words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

fn parse_setenv(entry: &Entry, ctx: &SubstitutionContext) -> ParseResult<Vec<(String, String)>> {
    let mut vars: Vec<(String, String)> = Vec::new();

    for line in &entry.lines {
        let (key, value) = line.text.split_once('=').ok_or_else(|| {
            ParseError::new("expected 'KEY = value' in setenv", line.line, line.column)
                .with_kind(ParseErrorKind::InvalidValue)
        })?;

        let key = key.trim();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ParseError::new(
                format!("invalid variable name '{}' in setenv", key),
                line.line,
                line.column,
            )
            .with_kind(ParseErrorKind::InvalidValue));
        }

        if vars.iter().any(|(k, _)| k == key) {
            return Err(ParseError::new(
                format!("variable '{}' is set twice in setenv", key),
                line.line,
                line.column,
            )
            .with_kind(ParseErrorKind::DuplicateKey));
        }

        let value_column = line.column + (line.text.len() - value.trim_start().len());
        let value = substitute(line, value.trim(), value_column, ctx, true)?;
        vars.push((key.to_string(), value));
    }

    Ok(vars)
}

fn parse_bool(entry: &Entry, ctx: &SubstitutionContext) -> ParseResult<bool> {
    let Some(line) = entry.lines.first() else {
        return Ok(false);
    };
    let text = substitute(line, &entry.value(), line.column, ctx, false)?;

    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(ParseError::new(
            format!("'{}' is not a boolean", other),
            line.line,
            line.column,
        )
        .with_kind(ParseErrorKind::InvalidValue)
        .with_suggestion("use 'true' or 'false'")),
    }
}
