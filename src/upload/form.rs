use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::gmail::decoders::sender_address;

pub const FILE_INPUT: &str = "//input[@type='file']";
pub const EMAIL_INPUT: &str = "//input[@placeholder=\"Enter person's email\"]";
pub const DATE_INPUT: &str = "//input[@placeholder='mm / dd / yyyy']";
pub const TIME_INPUT: &str = "//input[@placeholder='--:-- --']";
pub const SUBMIT_BUTTON: &str = "//button[contains(.,'Submit')]";

pub const FALLBACK_DATE: &str = "01/01/2024";

/// First `d Mon yyyy` token run in a Date header.
fn day_month_year(header: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = header
        .split_whitespace()
        .map(|t| t.trim_matches(','))
        .collect();

    tokens.windows(3).find_map(|w| {
        let (d, m, y) = (w[0], w[1], w[2]);
        let looks_right = (1..=2).contains(&d.len())
            && d.chars().all(|c| c.is_ascii_digit())
            && m.chars().count() == 3
            && m.chars().all(char::is_alphanumeric)
            && y.len() == 4
            && y.chars().all(|c| c.is_ascii_digit());
        if !looks_right {
            return None;
        }
        NaiveDate::parse_from_str(&format!("{d} {m} {y}"), "%d %b %Y").ok()
    })
}

fn parse_rfc2822(header: &str) -> Option<DateTime<FixedOffset>> {
    // drop a trailing "(UTC)"-style comment
    let head = header.split('(').next().unwrap_or(header).trim();
    DateTime::parse_from_rfc2822(head).ok()
}

/// `mm/dd/yyyy` for the form's date picker, `01/01/2024` when the header is unusable.
pub fn form_date(header: &str) -> String {
    day_month_year(header)
        .or_else(|| parse_rfc2822(header).map(|dt| dt.date_naive()))
        .map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|| FALLBACK_DATE.to_string())
}

/// `hh:mm AM` in the sender's own offset.
pub fn form_time(header: &str) -> Option<String> {
    parse_rfc2822(header).map(|dt| dt.format("%I:%M %p").to_string())
}

pub fn form_sender(sender: &str, address_only: bool) -> String {
    if address_only {
        sender_address(sender)
    } else {
        sender.to_string()
    }
}
