//! Best-effort projection column extraction.
//!
//! Used only when neither the catalog nor the manifest lists a node's
//! columns. Finds the first `SELECT` at parenthesis depth zero (so CTE
//! bodies are skipped), splits its projection on top-level commas and
//! names each item by alias or trailing identifier. Never fails: anything
//! it cannot name is skipped.

use regex::Regex;
use std::sync::OnceLock;

const TEMPLATE_PLACEHOLDER: &str = "__template__";

/// Keywords that can end an expression and must not be read as an alias.
const NON_ALIAS_KEYWORDS: &[&str] = &[
    "end", "null", "true", "false", "distinct", "and", "or", "not", "then", "else", "asc",
    "desc", "over", "when",
];

fn template_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{#.*?#\}").expect("valid regex"))
}

fn template_statement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{%.*?%\}").expect("valid regex"))
}

fn template_expression_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{.*?\}\}").expect("valid regex"))
}

fn sql_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/|--[^\n]*").expect("valid regex"))
}

fn explicit_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)^.+?\s+as\s+("[^"]+"|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)$"#)
            .expect("valid regex")
    })
}

fn implicit_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)^(.*[A-Za-z0-9_"`')\]])\s+([A-Za-z_][A-Za-z0-9_$]*)$"#)
            .expect("valid regex")
    })
}

fn column_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:(?:"[^"]+"|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)\.)*("[^"]+"|`[^`]+`|[A-Za-z_][A-Za-z0-9_$]*)$"#)
            .expect("valid regex")
    })
}

/// Remove template blocks and SQL comments.
///
/// Expression blocks become a placeholder identifier so that
/// `from {{ ref('x') }}` keeps its shape.
fn strip_noise(sql: &str) -> String {
    let sql = template_comment_re().replace_all(sql, " ");
    let sql = template_statement_re().replace_all(&sql, " ");
    let sql = template_expression_re().replace_all(&sql, format!(" {} ", TEMPLATE_PLACEHOLDER));
    sql_comment_re().replace_all(&sql, " ").into_owned()
}

/// Byte offsets (start of match) of `keyword` at depth zero, outside quotes.
fn top_level_keyword(sql: &str, from: usize, keyword: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let kw = keyword.as_bytes();
    let mut depth: i32 = 0;
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth = (depth - 1).max(0),
            _ if depth == 0 && is_keyword_at(bytes, i, kw) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_keyword_at(bytes: &[u8], i: usize, kw: &[u8]) -> bool {
    if i + kw.len() > bytes.len() || !bytes[i..i + kw.len()].eq_ignore_ascii_case(kw) {
        return false;
    }
    let before_ok = i == 0 || !is_word_byte(bytes[i - 1]);
    let after_ok = i + kw.len() == bytes.len() || !is_word_byte(bytes[i + kw.len()]);
    before_ok && after_ok
}

/// Split on commas at depth zero, outside quotes.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                items.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);
    items
}

fn unquote(name: &str) -> String {
    name.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Name a single projection item, or `None` when it cannot be named.
fn column_name(item: &str) -> Option<String> {
    let item = item.trim();
    if item.is_empty() || item == "*" || item.ends_with(".*") {
        return None;
    }

    if let Some(caps) = explicit_alias_re().captures(item) {
        return Some(unquote(&caps[1]));
    }

    if let Some(caps) = implicit_alias_re().captures(item) {
        let alias = &caps[2];
        let expr = caps[1].trim();
        if !NON_ALIAS_KEYWORDS.contains(&alias.to_lowercase().as_str())
            && !expr.to_lowercase().ends_with(" as")
        {
            return Some(alias.to_string());
        }
    }

    if let Some(caps) = column_ref_re().captures(item) {
        let name = unquote(&caps[1]);
        if name == TEMPLATE_PLACEHOLDER {
            return None;
        }
        return Some(name);
    }

    // Function calls and other expressions without an alias are skipped.
    None
}

/// Extract the projection column names of the top-level SELECT in `sql`.
pub fn extract_projection_columns(sql: &str) -> Vec<String> {
    let cleaned = strip_noise(sql);
    let Some(select_at) = top_level_keyword(&cleaned, 0, "select") else {
        return Vec::new();
    };
    let list_start = select_at + "select".len();
    let list_end = top_level_keyword(&cleaned, list_start, "from").unwrap_or(cleaned.len());
    let mut list = cleaned[list_start..list_end].trim_start();

    for modifier in ["distinct ", "all "] {
        if list
            .get(..modifier.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(modifier))
        {
            list = &list[modifier.len()..];
        }
    }

    let list = list.trim_end().trim_end_matches(';');
    let mut seen = std::collections::HashSet::new();
    split_top_level(list)
        .into_iter()
        .filter_map(column_name)
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

#[cfg(test)]
#[path = "projection_test.rs"]
mod tests;
