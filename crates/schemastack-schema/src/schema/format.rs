//! Named `format` checks
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use std::net::Ipv6Addr;
use std::sync::OnceLock;
use url::Url;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
        )
        .expect("email pattern is valid")
    })
}

/// Named string formats understood by `format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Uuid,
    Email,
    Ipv4,
    Ipv6,
    Uri,
    UriReference,
    Hostname,
    Date,
    Time,
    DateTime,
    Regex,
}

impl Format {
    /// Look up a format by its keyword value; `None` for unknown names
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "uuid" => Format::Uuid,
            "email" => Format::Email,
            "ipv4" => Format::Ipv4,
            "ipv6" => Format::Ipv6,
            "uri" => Format::Uri,
            "uri-reference" => Format::UriReference,
            "hostname" => Format::Hostname,
            "date" => Format::Date,
            "time" => Format::Time,
            "date-time" => Format::DateTime,
            "regex" => Format::Regex,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Uuid => "uuid",
            Format::Email => "email",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uri => "uri",
            Format::UriReference => "uri-reference",
            Format::Hostname => "hostname",
            Format::Date => "date",
            Format::Time => "time",
            Format::DateTime => "date-time",
            Format::Regex => "regex",
        }
    }

    /// Check `text` against the format
    pub fn is_valid(&self, text: &str) -> bool {
        match self {
            // Hyphenated form only; the uuid crate also takes simple and braced.
            Format::Uuid => text.len() == 36 && uuid::Uuid::parse_str(text).is_ok(),
            Format::Email => is_email(text),
            Format::Ipv4 => is_ipv4(text),
            Format::Ipv6 => text.parse::<Ipv6Addr>().is_ok(),
            Format::Uri => !has_space(text) && Url::parse(text).is_ok(),
            Format::UriReference => is_uri_reference(text),
            Format::Hostname => is_hostname(text),
            Format::Date => is_date(text),
            Format::Time => DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", text)).is_ok(),
            Format::DateTime => is_date_time(text),
            Format::Regex => Regex::new(text).is_ok(),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn has_space(text: &str) -> bool {
    text.chars().any(|c| c.is_whitespace() || c == '\\')
}

fn is_email(text: &str) -> bool {
    let Some((local, _)) = text.rsplit_once('@') else {
        return false;
    };
    !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && email_regex().is_match(text)
}

/// Dotted quad without leading zeros
fn is_ipv4(text: &str) -> bool {
    let parts: Vec<&str> = text.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            !part.is_empty()
                && part.len() <= 3
                && part.bytes().all(|b| b.is_ascii_digit())
                && (part.len() == 1 || !part.starts_with('0'))
                && part.parse::<u16>().map(|n| n <= 255).unwrap_or(false)
        })
}

fn is_uri_reference(text: &str) -> bool {
    if has_space(text) {
        return false;
    }
    if Url::parse(text).is_ok() {
        return true;
    }
    Url::parse("http://reference.invalid/")
        .and_then(|base| base.join(text))
        .is_ok()
}

fn is_hostname(text: &str) -> bool {
    let text = text.strip_suffix('.').unwrap_or(text);
    !text.is_empty()
        && text.len() <= 253
        && text.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

/// `YYYY-MM-DD` with a real calendar day
fn is_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
        && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn is_date_time(text: &str) -> bool {
    match text.find(['T', 't']) {
        Some(split) => is_date(&text[..split]) && DateTime::parse_from_rfc3339(text).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(format: Format, valid: &[&str], invalid: &[&str]) {
        for text in valid {
            assert!(format.is_valid(text), "{} should accept {:?}", format, text);
        }
        for text in invalid {
            assert!(!format.is_valid(text), "{} should reject {:?}", format, text);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for name in ["uuid", "email", "ipv4", "date-time", "uri-reference", "regex"] {
            assert_eq!(Format::from_name(name).unwrap().name(), name);
        }
        assert_eq!(Format::from_name("color"), None);
    }

    #[test]
    fn test_uuid() {
        check(
            Format::Uuid,
            &["123e4567-e89b-12d3-a456-426614174000"],
            &["123e4567e89b12d3a456426614174000", "not-a-uuid", ""],
        );
    }

    #[test]
    fn test_email() {
        check(
            Format::Email,
            &["alice@example.com", "a.b+tag@mail.example.org"],
            &["alice", "a..b@example.com", ".a@example.com", "a@-example.com"],
        );
    }

    #[test]
    fn test_ip_addresses() {
        check(
            Format::Ipv4,
            &["192.168.0.1", "0.0.0.0", "255.255.255.255"],
            &["256.1.1.1", "01.2.3.4", "1.2.3", "1.2.3.4.5", "a.b.c.d"],
        );
        check(Format::Ipv6, &["::1", "2001:db8::ff00:42:8329"], &["1.2.3.4", ":::"]);
    }

    #[test]
    fn test_uris() {
        check(
            Format::Uri,
            &["https://example.com/a?b=c", "urn:isbn:0451450523"],
            &["/relative/path", "has space:x"],
        );
        check(
            Format::UriReference,
            &["/relative/path", "#frag", "https://example.com"],
            &["with space", "back\\slash"],
        );
    }

    #[test]
    fn test_hostname() {
        check(
            Format::Hostname,
            &["example.com", "a-b.example", "localhost"],
            &["-bad.example", "bad-.example", "", "under_score.com"],
        );
    }

    #[test]
    fn test_dates_and_times() {
        check(Format::Date, &["2024-02-29"], &["2023-02-29", "2024-1-01", "20240101"]);
        check(
            Format::Time,
            &["12:30:00Z", "23:59:59.123+02:00"],
            &["25:00:00Z", "12:30:00"],
        );
        check(
            Format::DateTime,
            &["2024-05-01T12:30:00Z", "2024-05-01T12:30:00.5-07:00"],
            &["2024-05-01", "2024-13-01T00:00:00Z", "2024-05-01T12:30:00"],
        );
    }

    #[test]
    fn test_regex() {
        check(Format::Regex, &["^a+$", "[0-9]{2}"], &["(unclosed", "[z-a]"]);
    }
}
