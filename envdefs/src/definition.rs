use serde::{Deserialize, Serialize};

use crate::Error;

/// Key segments that mark a variable as secret
const SECRET_SEGMENTS: [&str; 7] =
    ["PASSWORD", "PASSWD", "PASS", "SECRET", "TOKEN", "KEY", "PSK"];

/// Placeholder logged instead of a secret value
pub const REDACTED: &str = "<redacted>";

/// Placeholder logged for a variable that is not set
pub const UNSET: &str = "<unset>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single preprocessor macro to inject into a build
pub struct Definition {
    /// The macro name
    pub name: String,
    /// The raw, unquoted value
    pub value: String,
}

impl Definition {
    /// Creates a new definition, validating the macro name
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Definition, Error> {
        let name = name.into();

        if !is_valid_macro_name(&name) {
            return Err(Error::InvalidMacroName(name));
        }

        Ok(Definition {
            name,
            value: value.into(),
        })
    }

    /// Returns the value as a C string literal, ready for a `-D` flag
    pub fn macro_value(&self) -> String {
        stringify_macro(&self.value)
    }

    /// Returns whether the value must stay out of logs
    pub fn is_secret(&self) -> bool {
        is_secret_key(&self.name)
    }

    /// Returns the value the way it may appear in a log line
    pub fn loggable_value(&self) -> &str {
        loggable(&self.name, Some(self.value.as_str()))
    }
}

/// Checks that `name` matches `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_macro_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Quotes a value as a C string literal
///
/// Backslashes and double quotes are escaped, and control characters that
/// would break a single-line compiler flag are written as escape sequences.
///
/// # Example
///
/// ```
/// assert_eq!(envdefs::stringify_macro("a\"b"), "\"a\\\"b\"");
/// ```
pub fn stringify_macro(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');

    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

/// Returns whether a key looks like it holds a password or credential
///
/// The key is split on `_` and each segment is compared against a small
/// list of secret markers, so `PIO_WIFI_PASSWORD` is secret while
/// `PIO_KEYBOARD_LAYOUT` is not.
pub fn is_secret_key(key: &str) -> bool {
    key.split('_').any(|segment| {
        SECRET_SEGMENTS
            .iter()
            .any(|marker| segment.eq_ignore_ascii_case(marker))
    })
}

/// Picks what to log for a variable: the value, a redaction or `<unset>`
pub fn loggable<'a>(key: &str, value: Option<&'a str>) -> &'a str {
    match value {
        None => UNSET,
        Some(_) if is_secret_key(key) => REDACTED,
        Some(value) => value,
    }
}
