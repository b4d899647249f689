//! Identifier and literal helpers
//!
//! DDL is assembled by string interpolation, so every name that reaches the
//! generator must be a plain identifier and every default must be quoted.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::mapper::Dialect;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Get maximum identifier length for a dialect
pub fn max_identifier_length(dialect: Dialect) -> usize {
    match dialect {
        Dialect::Postgres => 63,
        Dialect::MySql => 64,
        Dialect::Sqlite => 2048,
        Dialect::Generic => 63,
    }
}

/// Check if a name is a reserved SQL keyword
pub fn is_sql_keyword(name: &str) -> bool {
    const SQL_KEYWORDS: &[&str] = &[
        "add", "all", "alter", "and", "any", "as", "asc", "between", "by", "case", "check",
        "column", "constraint", "create", "database", "default", "delete", "desc", "distinct",
        "drop", "else", "end", "except", "exists", "foreign", "from", "full", "group", "having",
        "in", "index", "inner", "insert", "intersect", "into", "is", "join", "key", "left",
        "like", "limit", "not", "null", "on", "or", "order", "outer", "primary", "references",
        "right", "select", "set", "table", "to", "union", "unique", "update", "values", "where",
        "with",
    ];

    SQL_KEYWORDS.contains(&name.to_lowercase().as_str())
}

/// Validate a table or column name. `kind` is only used in the message.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation(format!("{} name is missing", kind)));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(Error::validation(format!(
            "{} name '{}' must start with a letter or underscore and contain only letters, digits and underscores",
            kind, name
        )));
    }
    if is_sql_keyword(name) {
        return Err(Error::validation(format!(
            "{} name '{}' is a reserved SQL keyword",
            kind, name
        )));
    }
    let limit = max_identifier_length(Dialect::Postgres).min(max_identifier_length(Dialect::MySql));
    if name.len() > limit {
        return Err(Error::validation(format!(
            "{} name '{}' exceeds {} characters",
            kind, name, limit
        )));
    }
    Ok(())
}

/// Reject default values that cannot be embedded in a quoted literal.
pub fn validate_default_value(column: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_control()) {
        return Err(Error::validation(format!(
            "default value for '{}' contains control characters",
            column
        )));
    }
    Ok(())
}

/// Render `value` as a single-quoted SQL string literal.
///
/// MySQL treats backslash as an escape inside literals, so it is doubled
/// there as well.
pub fn quote_literal(value: &str, dialect: Dialect) -> String {
    let escaped = match dialect {
        Dialect::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
        _ => value.replace('\'', "''"),
    };
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("users", true)]
    #[case("_private", true)]
    #[case("created_at2", true)]
    #[case("2fast", false)]
    #[case("user-name", false)]
    #[case("users; DROP TABLE x", false)]
    #[case("order", false)]
    #[case("", false)]
    fn test_validate_identifier(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_identifier("Table", name).is_ok(), valid);
    }

    #[test]
    fn test_validate_identifier_messages() {
        let err = validate_identifier("Table", "").unwrap_err();
        assert!(err.to_string().contains("Table name is missing"));

        let err = validate_identifier("Column", "select").unwrap_err();
        assert!(err.to_string().contains("reserved"));

        let long_name = "a".repeat(70);
        assert!(validate_identifier("Column", &long_name).is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("draft", Dialect::Postgres), "'draft'");
        assert_eq!(quote_literal("O'Brien", Dialect::Sqlite), "'O''Brien'");
        assert_eq!(
            quote_literal("'; DROP TABLE users; --", Dialect::Generic),
            "'''; DROP TABLE users; --'"
        );
    }

    #[rstest]
    #[case(Dialect::MySql, r"C:\temp", r"'C:\\temp'")]
    #[case(Dialect::MySql, r"\'); DROP TABLE users; -- ", r"'\\''); DROP TABLE users; -- '")]
    #[case(Dialect::Postgres, r"C:\temp", r"'C:\temp'")]
    #[case(Dialect::Sqlite, r"\'", r"'\'''")]
    fn test_quote_literal_backslashes(#[case] dialect: Dialect, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(quote_literal(value, dialect), expected);
    }

    #[test]
    fn test_validate_default_value() {
        assert!(validate_default_value("status", "draft").is_ok());
        assert!(validate_default_value("status", "line\nbreak").is_err());
    }
}
