use crate::error::DeclError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> DeclError {
    DeclError {
        msg: msg.to_string(),
        line,
        column,
    }
}

pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}
