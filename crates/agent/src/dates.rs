//! Spanish relative-date resolution.
//!
//! "hoy", "mañana", "la próxima semana" and literal `YYYY-MM-DD` / `DD/MM` /
//! `DD-MM` forms resolve against a caller-supplied `today`. Picking `today`
//! (and therefore the timezone) stays with the caller; nothing here touches
//! the clock.

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateResolveError {
    #[error("the day/month combination is not a valid date")]
    InvalidDate,
    #[error("the expression could not be interpreted as a date")]
    Unrecognized,
}

pub fn resolve_relative_date(text: &str, today: NaiveDate) -> Result<NaiveDate, DateResolveError> {
    let normalized = normalize(text);

    match normalized.as_str() {
        "hoy" => return Ok(today),
        "manana" => return Ok(today + Days::new(1)),
        "pasado manana" => return Ok(today + Days::new(2)),
        "la otra semana" | "la proxima semana" | "proxima semana" | "la semana que viene" => {
            return Ok(today + Days::new(7));
        }
        _ => {}
    }

    for token in normalized.split_whitespace() {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            return Ok(date);
        }
    }

    if let Some(result) = parse_day_month(&normalized, today) {
        return result;
    }

    Err(DateResolveError::Unrecognized)
}

/// `DD/MM` or `DD-MM`, assuming the current year; a date already past rolls
/// over to the next year.
fn parse_day_month(
    text: &str,
    today: NaiveDate,
) -> Option<Result<NaiveDate, DateResolveError>> {
    for token in text.split_whitespace() {
        let mut parts = token.splitn(2, ['/', '-']);
        let (Some(day_raw), Some(month_raw)) = (parts.next(), parts.next()) else {
            continue;
        };
        if day_raw.is_empty() || day_raw.len() > 2 || month_raw.is_empty() || month_raw.len() > 2 {
            continue;
        }
        let (Ok(day), Ok(month)) = (day_raw.parse::<u32>(), month_raw.parse::<u32>()) else {
            continue;
        };

        let year = today.year();
        let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) else {
            return Some(Err(DateResolveError::InvalidDate));
        };
        if candidate < today {
            return Some(
                NaiveDate::from_ymd_opt(year + 1, month, day)
                    .ok_or(DateResolveError::InvalidDate),
            );
        }
        return Some(Ok(candidate));
    }

    None
}

/// Lowercases and strips the Spanish accents, so "Mañana" and "manana" take
/// the same path.
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
