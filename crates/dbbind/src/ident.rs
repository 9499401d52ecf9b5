//! Table and column names for generated SQL.
//!
//! Generated statements go through the placeholder compiler, which only knows about
//! single-quoted literals. Names are therefore restricted to text the compiler passes
//! through untouched:
//!
//! - unquoted parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - quoted parts (`"CamelCase"`) may not contain `"`, `'`, `:`, `.` or NUL

use crate::error::{DbError, DbResult};
use std::fmt;

/// One part of a dotted name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Plain(String),
    Quoted(String),
}

/// A validated SQL identifier such as `users` or `public."Users".id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<Part>,
}

impl Ident {
    pub fn parse(s: &str) -> DbResult<Self> {
        if s.is_empty() {
            return Err(DbError::validation("Identifier cannot be empty"));
        }
        let parts = s.split('.').map(parse_part).collect::<DbResult<Vec<_>>>()?;
        Ok(Self { parts })
    }
}

fn parse_part(part: &str) -> DbResult<Part> {
    if let Some(inner) = part.strip_prefix('"') {
        let Some(name) = inner.strip_suffix('"') else {
            return Err(DbError::validation(format!(
                "Unclosed quoted identifier: {part}"
            )));
        };
        if name.is_empty() {
            return Err(DbError::validation("Empty quoted identifier"));
        }
        if let Some(c) = name.chars().find(|c| matches!(c, '"' | '\'' | ':' | '\0')) {
            return Err(DbError::validation(format!(
                "Invalid character in quoted identifier: {c:?}"
            )));
        }
        return Ok(Part::Quoted(name.to_string()));
    }

    let mut chars = part.chars();
    match chars.next() {
        None => return Err(DbError::validation("Empty identifier segment")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        Some(c) => {
            return Err(DbError::validation(format!(
                "Invalid identifier start character: {c:?}"
            )));
        }
    }
    if let Some(c) = chars.find(|&c| !(c == '_' || c == '$' || c.is_ascii_alphanumeric())) {
        return Err(DbError::validation(format!(
            "Invalid character in identifier: {c:?}"
        )));
    }
    Ok(Part::Plain(part.to_string()))
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match part {
                Part::Plain(s) => f.write_str(s)?,
                Part::Quoted(s) => write!(f, "\"{s}\"")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_dotted() {
        assert_eq!(Ident::parse("users").unwrap().to_string(), "users");
        assert_eq!(Ident::parse("public.users").unwrap().to_string(), "public.users");
        assert_eq!(Ident::parse("my_var$1").unwrap().to_string(), "my_var$1");
    }

    #[test]
    fn quoted_parts() {
        let ident = Ident::parse(r#"public."UserTable""#).unwrap();
        assert_eq!(ident.to_string(), r#"public."UserTable""#);
        assert_ne!(ident, Ident::parse("public.UserTable").unwrap());
    }

    #[test]
    fn rejects_bad_names() {
        for bad in [
            "",
            "1table",
            "my table",
            "schema..table",
            "schema.",
            r#""unclosed"#,
            r#""""#,
            r#""a:b""#,
            r#""it's""#,
            "x;drop",
        ] {
            assert!(Ident::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
