//! ISO calendar dates spoken in Portuguese.

use chrono::{Datelike, NaiveDate};

use super::numerals::to_words;

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// "2024-03-05" → "dia cinco de março de dois mil e vinte e quatro".
///
/// Anything that is not a real `YYYY-MM-DD` date comes back unchanged.
pub fn date_to_words(iso: &str) -> String {
    match parse_iso_date(iso) {
        Some(date) => naive_date_to_words(date),
        None => iso.to_string(),
    }
}

pub fn naive_date_to_words(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!(
        "dia {} de {month} de {}",
        to_words(i64::from(date.day())),
        year_to_words(i64::from(date.year()))
    )
}

/// Years split on the thousand: 1999 → "mil e novecentos e noventa e nove".
pub fn year_to_words(year: i64) -> String {
    let thousands = year / 1000;
    let remainder = year % 1000;

    let head = match thousands {
        0 => return to_words(remainder),
        1 => "mil".to_string(),
        2 => "dois mil".to_string(),
        t => format!("{} mil", to_words(t)),
    };

    if remainder == 0 {
        head
    } else {
        format!("{head} e {}", to_words(remainder))
    }
}

/// Strict shape check (four-digit year, two-digit month and day) before
/// handing off to chrono, which would otherwise accept "2024-3-5".
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
