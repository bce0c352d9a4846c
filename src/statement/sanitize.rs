use crate::types::{Result, WidecolError};

/// Value bound to a `?` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Bind {
    /// Single quoted literal.
    Text(String),
    /// Comma-separated list of quoted literals, for `IN (?)`.
    List(Vec<String>),
}

/// Quotes `value` as a string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Quotes a column name the way the write statements expect it.
pub fn quote_column(name: &str) -> String {
    quote_literal(name)
}

/// Substitutes each `?` outside quoted literals with the next bind value.
pub fn sanitize(template: &str, binds: &[Bind]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + binds.len() * 8);
    let mut binds = binds.iter();
    let mut in_literal = false;
    for ch in template.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                let bind = binds.next().ok_or_else(|| {
                    WidecolError::invalid(format!("not enough bind values for '{template}'"))
                })?;
                match bind {
                    Bind::Text(value) => out.push_str(&quote_literal(value)),
                    Bind::List(values) => {
                        let quoted: Vec<String> = values.iter().map(|v| quote_literal(v)).collect();
                        out.push_str(&quoted.join(","));
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    if binds.next().is_some() {
        return Err(WidecolError::invalid(format!(
            "too many bind values for '{template}'"
        )));
    }
    Ok(out)
}
