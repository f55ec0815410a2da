//! Extraction of DARE codes from resource URLs
//!
//! Every resource the server creates is addressed by a URL whose path carries a
//! UUID-shaped code. The code is the only key used locally; it is never
//! generated on this side.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{DareError, Result};

const CODE_PATTERN: &str = concat!(
    r"/([a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-",
    r"[a-fA-F0-9]{4}-[a-fA-F0-9]{12})"
);

fn code_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(CODE_PATTERN).expect("code pattern is valid"))
}

/// Extract the code that follows a path separator in `url`
pub fn extract_code(url: &str) -> Result<String> {
    code_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DareError::MalformedResourceUrl {
            url: url.to_string(),
        })
}
