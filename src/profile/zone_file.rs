//! Zone file parsing
//!
//! Name records point at their profile through a zone file. Only `$ORIGIN`,
//! `$TTL` and `URI` records are read; everything else is skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn uri_record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\sURI\s").expect("valid URI record pattern"))
}

/// A `URI` resource record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriRecord {
    pub name: String,
    pub target: String,
    pub priority: u32,
    pub weight: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// The parts of a zone file the SDK understands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneFile {
    #[serde(rename = "$origin", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub uri: Vec<UriRecord>,
}

impl ZoneFile {
    /// Target of the first URI record, made absolute with `https://` if needed
    pub fn token_file_uri(&self) -> Option<String> {
        let target = &self.uri.first()?.target;
        if target.is_empty() {
            return None;
        }
        if target.starts_with("https") || target.starts_with("http") {
            Some(target.clone())
        } else {
            Some(format!("https://{}", target))
        }
    }
}

/// Remove `;` comments, leaving semicolons inside quoted strings alone
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn parse_uri(line: &str) -> Option<UriRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let len = tokens.len();
    if len < 4 {
        return None;
    }

    Some(UriRecord {
        name: tokens[0].to_string(),
        target: tokens[len - 1].replace('"', ""),
        priority: tokens[len - 3].parse().ok()?,
        weight: tokens[len - 2].parse().ok()?,
        ttl: tokens[1].parse().ok(),
    })
}

/// Parse the `$ORIGIN`, `$TTL` and `URI` records of a zone file
pub fn parse_zone_file(text: &str) -> ZoneFile {
    let mut zone_file = ZoneFile::default();

    for raw in text.lines() {
        let line = strip_comment(raw);
        if line.trim().is_empty() {
            continue;
        }
        let upper = line.trim_start().to_ascii_uppercase();

        if upper.starts_with("$ORIGIN") {
            zone_file.origin = line.split_whitespace().nth(1).map(String::from);
        } else if upper.starts_with("$TTL") {
            zone_file.ttl = line.split_whitespace().nth(1).and_then(|t| t.parse().ok());
        } else if uri_record_pattern().is_match(line) {
            match parse_uri(line) {
                Some(record) => zone_file.uri.push(record),
                None => log::warn!("Skipping malformed URI record: {}", line.trim()),
            }
        }
    }

    zone_file
}
