// Substitution Tokens
// Resolves `{token}` placeholders inside declaration values

use crate::parser::models::SubstitutionContext;

use std::fmt;

/// Token resolved per plan rather than at parse time
pub const ENVNAME_TOKEN: &str = "envname";

/// Outcome of resolving a single token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the token with this text
    Value(String),
    /// Leave the token in place for a later pass
    Keep,
    /// Token cannot be resolved
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionErrorKind {
    /// `{` without a matching `}`
    Unclosed,
    /// Token name has no value
    Undefined,
}

/// Error raised while rendering a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionError {
    pub kind: SubstitutionErrorKind,
    /// Token text between the braces (empty for `Unclosed`)
    pub token: String,
    /// Byte offset of the opening brace within the value
    pub offset: usize,
}

impl fmt::Display for SubstitutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SubstitutionErrorKind::Unclosed => write!(f, "unclosed '{{' in value"),
            SubstitutionErrorKind::Undefined => {
                write!(f, "undefined substitution '{{{}}}'", self.token)
            }
        }
    }
}

impl std::error::Error for SubstitutionError {}

/// Render `text`, resolving every `{token}` through `resolve`.
///
/// `{{` and `}}` are literal braces. With `keep_escapes` they are re-emitted
/// doubled (and resolved values are escaped) so the output can go through a
/// second pass safely.
pub fn render<F>(text: &str, keep_escapes: bool, mut resolve: F) -> Result<String, SubstitutionError>
where
    F: FnMut(&str) -> Resolution,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            if keep_escapes {
                out.push_str(&tail[..2]);
            } else {
                out.push_str(&tail[..1]);
            }
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }

        if tail.starts_with('}') {
            // Lone closing brace is literal
            out.push('}');
            rest = &tail[1..];
            offset += pos + 1;
            continue;
        }

        let close = tail.find('}').ok_or_else(|| SubstitutionError {
            kind: SubstitutionErrorKind::Unclosed,
            token: String::new(),
            offset: offset + pos,
        })?;
        let token = &tail[1..close];

        match resolve(token) {
            Resolution::Value(value) if keep_escapes => out.push_str(&escape(&value)),
            Resolution::Value(value) => out.push_str(&value),
            Resolution::Keep => out.push_str(&tail[..=close]),
            Resolution::Undefined => {
                return Err(SubstitutionError {
                    kind: SubstitutionErrorKind::Undefined,
                    token: token.to_string(),
                    offset: offset + pos,
                });
            }
        }

        rest = &tail[close + 1..];
        offset += pos + close + 1;
    }

    out.push_str(rest);
    Ok(out)
}

/// Double every brace so the text survives another render pass unchanged
pub fn escape(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// Resolve parse-time tokens; `{envname}` is kept for expansion when `defer_envname`
pub fn resolve_parse_token(
    token: &str,
    ctx: &SubstitutionContext,
    defer_envname: bool,
) -> Resolution {
    if token == ENVNAME_TOKEN {
        return if defer_envname {
            Resolution::Keep
        } else {
            Resolution::Undefined
        };
    }

    if token == "toxinidir" {
        return Resolution::Value(ctx.config_dir.display().to_string());
    }

    if token == "homedir" {
        return match &ctx.home_dir {
            Some(home) => Resolution::Value(home.display().to_string()),
            None => Resolution::Undefined,
        };
    }

    if token == "posargs" {
        return Resolution::Value(ctx.posargs.join(" "));
    }

    if let Some(default) = token.strip_prefix("posargs:") {
        return if ctx.posargs.is_empty() {
            Resolution::Value(default.to_string())
        } else {
            Resolution::Value(ctx.posargs.join(" "))
        };
    }

    if let Some(rest) = token.strip_prefix("env:") {
        let (key, default) = match rest.split_once(':') {
            Some((key, default)) => (key, Some(default)),
            None => (rest, None),
        };
        return match (ctx.env.get(key), default) {
            (Some(value), _) => Resolution::Value(value.clone()),
            (None, Some(default)) => Resolution::Value(default.to_string()),
            (None, None) => Resolution::Undefined,
        };
    }

    Resolution::Undefined
}

/// Second pass used during expansion: fills `{envname}` and unescapes braces
pub fn render_for_env(text: &str, env_name: &str) -> String {
    render(text, false, |token| {
        if token == ENVNAME_TOKEN {
            Resolution::Value(env_name.to_string())
        } else {
            Resolution::Keep
        }
    })
    .unwrap_or_else(|_| text.to_string())
}

/// Unescape braces, leaving `{envname}` where it was written
pub fn display_template(text: &str) -> String {
    render(text, false, |_| Resolution::Keep).unwrap_or_else(|_| text.to_string())
}
