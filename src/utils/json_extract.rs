//! Loose JSON salvage for model output
//!
//! Models asked for JSON routinely wrap it in prose, markdown fences or
//! comments, or emit slightly malformed literals. [`parse_loose_json`] runs a
//! chain of increasingly permissive strategies and returns the first object
//! or array that parses. It never panics and never errors.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Extract the first JSON object or array from free-form text.
///
/// Strategies, in order: direct parse, balanced-bracket scan, fenced code
/// block, line scan with comment stripping, lenient repair.
pub fn parse_loose_json(text: &str) -> Option<Value> {
    let cleaned = text.replace('\t', " ").replace('\r', "");
    if cleaned.trim().is_empty() {
        return None;
    }

    parse_structured(cleaned.trim())
        .or_else(|| from_balanced_scan(&cleaned))
        .or_else(|| from_code_block(&cleaned))
        .or_else(|| from_line_scan(&cleaned))
        .or_else(|| from_lenient_repair(&cleaned))
}

/// Parse and accept only objects and arrays
fn parse_structured(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

// ============= Regexes =============

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)```").expect("fenced block regex must compile")
    })
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("inline code regex must compile"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)//[^\n]*$|/\*[\s\S]*?\*/").expect("comment regex must compile")
    })
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex must compile"))
}

fn unquoted_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)\s*:"#)
            .expect("unquoted key regex must compile")
    })
}

// ============= Strategies =============

/// Earliest balanced `{...}` or `[...]` span that parses, ignoring brackets
/// inside string literals.
fn from_balanced_scan(text: &str) -> Option<Value> {
    balanced_candidates(text).find_map(parse_structured)
}

fn balanced_candidates(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(b, b'{' | b'['))
        .filter_map(move |(start, _)| balanced_end(bytes, start).map(|end| &text[start..=end]))
}

/// Index of the bracket closing the one opened at `start`
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(b),
            b'}' | b']' => {
                let open = if b == b'}' { b'{' } else { b'[' };
                if stack.pop() != Some(open) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn from_code_block(text: &str) -> Option<Value> {
    let fenced = fenced_block_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()));
    let inline = inline_code_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()));

    fenced
        .chain(inline)
        .filter(|code| code.starts_with('{') || code.starts_with('['))
        .find_map(parse_structured)
}

/// Try every span of lines that opens with a bracket and ends with the
/// matching closer, with and without comments.
fn from_line_scan(text: &str) -> Option<Value> {
    let lines: Vec<&str> = text.lines().collect();

    for (i, first) in lines.iter().enumerate() {
        let first = first.trim();
        let closer = match first.chars().next() {
            Some('{') => '}',
            Some('[') => ']',
            _ => continue,
        };

        for j in i..lines.len() {
            if !lines[j].trim().ends_with(closer) {
                continue;
            }
            let block = lines[i..=j].join("\n");
            if let Some(value) = parse_structured(&block) {
                return Some(value);
            }
            let uncommented = comment_re().replace_all(&block, "");
            if let Some(value) = parse_structured(&uncommented) {
                return Some(value);
            }
        }
    }
    None
}

/// Repair common model mistakes (comments, single quotes, unquoted keys,
/// trailing commas) and parse the outermost bracketed span.
fn from_lenient_repair(text: &str) -> Option<Value> {
    let repaired = repair(text);
    parse_structured(repaired.trim())
        .or_else(|| balanced_candidates(&repaired).find_map(parse_structured))
        .or_else(|| outermost_span(&repaired).and_then(parse_structured))
}

fn repair(text: &str) -> String {
    let text = comment_re().replace_all(text, "");
    let text = single_to_double_quotes(&text);
    let text = unquoted_key_re().replace_all(&text, r#"$1"$2":"#);
    trailing_comma_re().replace_all(&text, "$1").into_owned()
}

fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Rewrite single-quoted string literals as double-quoted ones, leaving
/// apostrophes inside double-quoted strings alone.
fn single_to_double_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' if in_single => out.push_str("\\\""),
            '"' => {
                in_double = !in_double;
                out.push(c);
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}
