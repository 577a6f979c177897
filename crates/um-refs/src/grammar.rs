//! Lexical grammar for reference calls inside template blocks.
//!
//! ```text
//! block    := "{{" body "}}" | "{%" body "%}"      ("{# ... #}" is dropped)
//! call     := ("ref" | "source") "(" args ")"     not preceded by [A-Za-z0-9_.]
//! args     := arg ("," arg)*
//! arg      := string | name "=" expr | expr
//! string   := "'" chars "'" | '"' chars '"'
//! ```
//!
//! Only string positional arguments carry meaning. Keyword arguments
//! (`v=2`, `version=2`) are ignored; any other positional expression marks
//! the call as non-literal.

use regex::Regex;
use std::sync::OnceLock;

/// Which template function was called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Ref,
    Source,
}

/// One `ref(...)` / `source(...)` call found in a template block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCall {
    pub kind: CallKind,
    /// String-literal positional arguments, in order
    pub args: Vec<String>,
    /// A positional argument was not a string literal
    pub has_non_literal: bool,
    /// The call text as written
    pub raw: String,
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{#.*?#\}").expect("valid regex"))
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").expect("valid regex"))
}

fn call_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^A-Za-z0-9_.])(ref|source)\s*\(").expect("valid regex"))
}

fn keyword_arg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*=[^=]").expect("valid regex"))
}

/// Split the argument list that starts right after `(`.
///
/// Returns the raw arguments and the byte length consumed up to and
/// including the closing `)`, or `None` when the call is never closed.
fn split_args(text: &str) -> Option<(Vec<&str>, usize)> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => {
                let last = &text[start..i];
                if !last.trim().is_empty() || !args.is_empty() {
                    args.push(last);
                }
                return Some((args, i + 1));
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    None
}

/// Content of a quoted string literal, or `None` for anything else.
fn string_literal(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let mut chars = arg.chars();
    let first = chars.next()?;
    if (first != '\'' && first != '"') || arg.len() < 2 || !arg.ends_with(first) {
        return None;
    }
    let inner = &arg[1..arg.len() - 1];
    if inner.contains(first) && !inner.contains('\\') {
        return None;
    }
    Some(inner.replace(&format!("\\{}", first), &first.to_string()))
}

fn scan_block(body: &str, calls: &mut Vec<RefCall>) {
    for caps in call_start_re().captures_iter(body) {
        let (Some(name), Some(whole)) = (caps.get(1), caps.get(0)) else {
            continue;
        };
        let kind = if name.as_str() == "ref" {
            CallKind::Ref
        } else {
            CallKind::Source
        };
        let args_start = whole.end();
        let Some((raw_args, consumed)) = split_args(&body[args_start..]) else {
            log::debug!("Unclosed {} call in template block", name.as_str());
            continue;
        };

        let mut args = Vec::new();
        let mut has_non_literal = false;
        for raw in raw_args {
            if let Some(value) = string_literal(raw) {
                args.push(value);
            } else if !keyword_arg_re().is_match(raw.trim()) {
                has_non_literal = true;
            }
        }

        calls.push(RefCall {
            kind,
            args,
            has_non_literal,
            raw: body[name.start()..args_start + consumed].to_string(),
        });
    }
}

/// Find every reference call in `text`, in order of appearance.
pub fn scan_calls(text: &str) -> Vec<RefCall> {
    let text = comment_re().replace_all(text, "");
    let mut calls = Vec::new();
    for caps in block_re().captures_iter(&text) {
        if let Some(body) = caps.get(1).or_else(|| caps.get(2)) {
            scan_block(body.as_str(), &mut calls);
        }
    }
    calls
}

#[cfg(test)]
#[path = "grammar_test.rs"]
mod tests;
