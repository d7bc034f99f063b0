//! Reply payload parsing
//!
//! Extracts the values carried in SIZE, MDTM and PWD replies.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Digits in an MDTM timestamp (`YYYYMMDDhhmmss`).
pub const MDTM_DATE_LENGTH: usize = 14;

/// Parses the byte count of a `213 <size>` reply.
pub fn parse_size(message: &str) -> Option<u64> {
    message.split_whitespace().next()?.parse().ok()
}

/// Parses the timestamp of a `213 YYYYMMDDhhmmss[.fff]` reply as UTC.
pub fn parse_mdtm(message: &str) -> Option<DateTime<Utc>> {
    let token = message.split_whitespace().next()?;
    let digits = token.split('.').next()?;
    if digits.len() != MDTM_DATE_LENGTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Extracts the directory from a `257 "<dir>" ...` reply. A doubled quote
/// inside the name stands for one literal quote.
pub fn parse_quoted_path(message: &str) -> Option<String> {
    let start = message.find('"')? + 1;
    let mut path = String::new();
    let mut chars = message[start..].chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                path.push('"');
            } else {
                return Some(path);
            }
        } else {
            path.push(c);
        }
    }
    None
}
