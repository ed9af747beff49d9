//! Tokenizer for the fixed placeholder grammar of stored panel SQL.
//!
//! Only these forms are recognised; everything else is passed through as text:
//!
//! | Form                  | Token                                  |
//! |-----------------------|----------------------------------------|
//! | `${name}`             | [`Token::Variable`] with `Plain`       |
//! | `${name:sqlstring}`   | [`Token::Variable`] with `SqlString`   |
//! | `$__timeFrom()`       | [`Macro::TimeFrom`]                    |
//! | `$__timeTo()`         | [`Macro::TimeTo`]                      |
//! | `$__timeFilter(col)`  | [`Macro::TimeFilter`]                  |

const TIME_FROM: &str = "$__timeFrom()";
const TIME_TO: &str = "$__timeTo()";
const TIME_FILTER_OPEN: &str = "$__timeFilter(";

/// How the selected values of a variable are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFormat {
    /// `v1, v2`
    Plain,
    /// `'v1', 'v2'`
    SqlString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro<'a> {
    TimeFrom,
    TimeTo,
    /// `column` is `None` when the parentheses hold no identifier.
    TimeFilter { column: Option<&'a str> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Variable {
        name: &'a str,
        format: VariableFormat,
        raw: &'a str,
    },
    Macro { kind: Macro<'a>, raw: &'a str },
}

impl<'a> Token<'a> {
    /// Source text the token was read from.
    pub fn raw(&self) -> &'a str {
        match self {
            Token::Text(s) => s,
            Token::Variable { raw, .. } | Token::Macro { raw, .. } => raw,
        }
    }
}

/// Split `input` into text and placeholder tokens.
///
/// Concatenating the `raw()` of every token reproduces `input` exactly.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('$') {
        let start = pos + offset;
        match read_placeholder(&input[start..]) {
            Some((token, len)) => {
                if text_start < start {
                    tokens.push(Token::Text(&input[text_start..start]));
                }
                tokens.push(token);
                pos = start + len;
                text_start = pos;
            }
            None => pos = start + 1,
        }
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }
    tokens
}

/// Try to read one placeholder at the start of `rest` (which begins with `$`).
fn read_placeholder(rest: &str) -> Option<(Token<'_>, usize)> {
    if let Some(body) = rest.strip_prefix("${") {
        let close = body.find('}')?;
        let inner = &body[..close];
        let (name, format) = match inner.split_once(':') {
            None => (inner, VariableFormat::Plain),
            Some((name, "sqlstring")) => (name, VariableFormat::SqlString),
            Some(_) => return None,
        };
        if !is_variable_name(name) {
            return None;
        }
        let len = 2 + close + 1;
        return Some((
            Token::Variable {
                name,
                format,
                raw: &rest[..len],
            },
            len,
        ));
    }

    if rest.starts_with(TIME_FROM) {
        let raw = &rest[..TIME_FROM.len()];
        return Some((
            Token::Macro {
                kind: Macro::TimeFrom,
                raw,
            },
            raw.len(),
        ));
    }

    if rest.starts_with(TIME_TO) {
        let raw = &rest[..TIME_TO.len()];
        return Some((
            Token::Macro {
                kind: Macro::TimeTo,
                raw,
            },
            raw.len(),
        ));
    }

    if let Some(args) = rest.strip_prefix(TIME_FILTER_OPEN) {
        let close = args.find(')')?;
        let len = TIME_FILTER_OPEN.len() + close + 1;
        let column = leading_identifier(args[..close].trim_start());
        return Some((
            Token::Macro {
                kind: Macro::TimeFilter { column },
                raw: &rest[..len],
            },
            len,
        ));
    }

    None
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// First SQL identifier of `s`: a letter or `_`, then letters, digits, `_` or `.`.
fn leading_identifier(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(s.len());
    Some(&s[..end])
}
