//! Best-effort date/time parsing for sort keys
//!
//! Strict formats are tried first (RFC 3339, RFC 2822, ISO 8601 local
//! forms). Anything else goes through a small token scanner that accepts
//! the usual human spellings: `03/15/2020`, `15.03.2020`, `January 5, 2022`,
//! `Tue, 5 Jan 2022 10:30 PM`, `2021-01-01T10:00:00+0500` and so on.
//! Values without an offset are taken as UTC so that every key compares.

use thiserror::Error;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("empty date/time value")]
    Empty,
    #[error("unrecognized date/time component {0:?}")]
    Unrecognized(String),
    #[error("date/time value has no year; add a year, e.g. \"January 5, 2022\"")]
    MissingYear,
    #[error("date/time value has a day but no month")]
    MissingMonth,
    #[error("date/time component out of range")]
    OutOfRange,
}

/// Parse a date, a time, or both
pub fn parse(raw: &str) -> Result<OffsetDateTime, DateTimeError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DateTimeError::Empty);
    }
    if let Ok(datetime) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(datetime);
    }
    if let Ok(datetime) = OffsetDateTime::parse(value, &Rfc2822) {
        return Ok(datetime);
    }
    if let Some(datetime) = parse_iso_local(value) {
        return Ok(datetime.assume_utc());
    }
    Fields::scan(value)?.build()
}

fn parse_iso_local(value: &str) -> Option<PrimitiveDateTime> {
    let formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    for format in formats {
        if let Ok(datetime) = PrimitiveDateTime::parse(value, format) {
            return Some(datetime);
        }
    }

    let date = format_description!("[year]-[month]-[day]");
    Date::parse(value, date)
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT))
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Word(String),
    Sep(char),
}

fn lex(value: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = value.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_ascii_digit() {
            let mut end = start + 1;
            while let Some(&(i, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                end = i + 1;
                chars.next();
            }
            tokens.push(Token::Number(value.get(start..end).unwrap_or_default()));
        } else if ch.is_alphabetic() {
            let mut word = ch.to_lowercase().to_string();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_alphabetic() {
                    break;
                }
                word.extend(c.to_lowercase());
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else if !ch.is_whitespace() {
            tokens.push(Token::Sep(ch));
        }
    }
    tokens
}

fn month_from_word(word: &str) -> Option<u8> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    if word.len() < 3 {
        return None;
    }
    let position = MONTHS.iter().position(|month| month.starts_with(word))?;
    u8::try_from(position + 1).ok()
}

fn is_weekday(word: &str) -> bool {
    const DAYS: [&str; 7] = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];
    word.len() >= 3 && DAYS.iter().any(|day| day.starts_with(word))
}

fn number(digits: &str) -> Result<u32, DateTimeError> {
    digits.parse().map_err(|_| DateTimeError::OutOfRange)
}

/// Two-digit years pivot at 69, as POSIX `%y` does
fn full_year(digits: &str) -> Result<i32, DateTimeError> {
    let year = i32::try_from(number(digits)?).map_err(|_| DateTimeError::OutOfRange)?;
    Ok(match (digits.len(), year) {
        (1 | 2, 0..=68) => year + 2000,
        (1 | 2, _) => year + 1900,
        _ => year,
    })
}

/// Components collected by the scanner
#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: u32,
    second: u32,
    nanosecond: u32,
    pm: Option<bool>,
    offset: Option<UtcOffset>,
    bare: Vec<String>,
}

impl Fields {
    fn scan(value: &str) -> Result<Self, DateTimeError> {
        let tokens = lex(value);
        let mut fields = Self::default();
        let mut i = 0;

        while let Some(token) = tokens.get(i) {
            i += 1;
            match token {
                Token::Number(digits) => {
                    i = fields.number_token(digits, &tokens, i)?;
                }
                Token::Word(word) => match word.as_str() {
                    "am" | "pm" => fields.pm = Some(word == "pm"),
                    "z" | "utc" | "gmt" => fields.offset = Some(UtcOffset::UTC),
                    "t" | "at" | "on" | "of" | "the" | "st" | "nd" | "rd" | "th" => {}
                    w if is_weekday(w) => {}
                    w => match month_from_word(w) {
                        Some(month) => fields.month = Some(u32::from(month)),
                        None => return Err(DateTimeError::Unrecognized(word.clone())),
                    },
                },
                Token::Sep(sign @ ('+' | '-')) if fields.hour.is_some() => {
                    if let Some(Token::Number(digits)) = tokens.get(i) {
                        i = fields.offset_token(*sign, digits, &tokens, i + 1)?;
                    }
                }
                Token::Sep(_) => {}
            }
        }

        Ok(fields)
    }

    /// Handle a number starting at `tokens[i - 1]`; returns the next index
    fn number_token(
        &mut self,
        digits: &str,
        tokens: &[Token<'_>],
        i: usize,
    ) -> Result<usize, DateTimeError> {
        match (tokens.get(i), tokens.get(i + 1)) {
            (Some(Token::Sep(':')), Some(Token::Number(minute))) if self.hour.is_none() => {
                self.hour = Some(number(digits)?);
                self.minute = number(minute)?;
                let mut next = i + 2;
                if let (Some(Token::Sep(':')), Some(Token::Number(second))) =
                    (tokens.get(next), tokens.get(next + 1))
                {
                    self.second = number(second)?;
                    next += 2;
                    if let (Some(Token::Sep('.' | ',')), Some(Token::Number(fraction))) =
                        (tokens.get(next), tokens.get(next + 1))
                    {
                        self.nanosecond = nanoseconds(fraction)?;
                        next += 2;
                    }
                }
                Ok(next)
            }
            (Some(Token::Word(word)), _) if (word == "am" || word == "pm") && self.hour.is_none() => {
                self.hour = Some(number(digits)?);
                Ok(i)
            }
            (Some(Token::Sep(sep @ ('/' | '-' | '.'))), Some(Token::Number(second)))
                if self.year.is_none() =>
            {
                let third = match (tokens.get(i + 2), tokens.get(i + 3)) {
                    (Some(Token::Sep(s)), Some(Token::Number(third))) if s == sep => Some(*third),
                    _ => None,
                };
                self.numeric_date(digits, *sep, second, third)?;
                Ok(if third.is_some() { i + 4 } else { i + 2 })
            }
            // basic-format time after a date: `20210101T1030[00]`
            _ if matches!(digits.len(), 4 | 6)
                && self.year.is_some()
                && self.hour.is_none()
                && matches!(
                    i.checked_sub(2).and_then(|prev| tokens.get(prev)),
                    Some(Token::Word(w)) if w == "t"
                ) =>
            {
                let (hour, rest) = digits.split_at(2);
                let (minute, second) = rest.split_at(2);
                self.hour = Some(number(hour)?);
                self.minute = number(minute)?;
                if !second.is_empty() {
                    self.second = number(second)?;
                }
                match (tokens.get(i), tokens.get(i + 1)) {
                    (Some(Token::Sep('.' | ',')), Some(Token::Number(fraction))) => {
                        self.nanosecond = nanoseconds(fraction)?;
                        Ok(i + 2)
                    }
                    _ => Ok(i),
                }
            }
            _ if digits.len() == 8 && self.year.is_none() && self.month.is_none() => {
                let (year, rest) = digits.split_at(4);
                let (month, day) = rest.split_at(2);
                self.year = Some(full_year(year)?);
                self.month = Some(number(month)?);
                self.day = Some(number(day)?);
                Ok(i)
            }
            _ => {
                self.bare.push(digits.to_string());
                Ok(i)
            }
        }
    }

    fn numeric_date(
        &mut self,
        first: &str,
        sep: char,
        second: &str,
        third: Option<&str>,
    ) -> Result<(), DateTimeError> {
        match third {
            Some(third) if first.len() == 4 => {
                self.year = Some(full_year(first)?);
                self.month = Some(number(second)?);
                self.day = Some(number(third)?);
            }
            Some(third) if sep == '.' => {
                self.day = Some(number(first)?);
                self.month = Some(number(second)?);
                self.year = Some(full_year(third)?);
            }
            Some(third) => {
                self.month = Some(number(first)?);
                self.day = Some(number(second)?);
                self.year = Some(full_year(third)?);
            }
            None if first.len() == 4 => {
                self.year = Some(full_year(first)?);
                self.month = Some(number(second)?);
            }
            None => {
                self.month = Some(number(first)?);
                self.year = Some(full_year(second)?);
            }
        }
        Ok(())
    }

    fn offset_token(
        &mut self,
        sign: char,
        digits: &str,
        tokens: &[Token<'_>],
        i: usize,
    ) -> Result<usize, DateTimeError> {
        let (hours, minutes, next) = match (digits.len(), tokens.get(i), tokens.get(i + 1)) {
            (4, _, _) => {
                let (h, m) = digits.split_at(2);
                (number(h)?, number(m)?, i)
            }
            (1 | 2, Some(Token::Sep(':')), Some(Token::Number(m))) => (number(digits)?, number(m)?, i + 2),
            (1 | 2, _, _) => (number(digits)?, 0, i),
            _ => return Err(DateTimeError::Unrecognized(format!("{sign}{digits}"))),
        };
        let hours = i8::try_from(hours).map_err(|_| DateTimeError::OutOfRange)?;
        let minutes = i8::try_from(minutes).map_err(|_| DateTimeError::OutOfRange)?;
        let (hours, minutes) = if sign == '-' {
            (-hours, -minutes)
        } else {
            (hours, minutes)
        };
        self.offset =
            Some(UtcOffset::from_hms(hours, minutes, 0).map_err(|_| DateTimeError::OutOfRange)?);
        Ok(next)
    }

    fn build(mut self) -> Result<OffsetDateTime, DateTimeError> {
        for digits in std::mem::take(&mut self.bare) {
            if digits.len() >= 3 && self.year.is_none() {
                self.year = Some(full_year(&digits)?);
            } else if digits.len() <= 2 && self.day.is_none() {
                self.day = Some(number(&digits)?);
            } else if self.year.is_none() {
                self.year = Some(full_year(&digits)?);
            } else {
                return Err(DateTimeError::Unrecognized(digits));
            }
        }

        let date = match (self.year, self.month, self.day) {
            (None, None, None) if self.hour.is_some() => Date::from_calendar_date(1970, Month::January, 1),
            (None, _, _) => return Err(DateTimeError::MissingYear),
            (Some(_), None, Some(_)) => return Err(DateTimeError::MissingMonth),
            (Some(year), month, day) => {
                let month = u8::try_from(month.unwrap_or(1)).map_err(|_| DateTimeError::OutOfRange)?;
                let month = Month::try_from(month).map_err(|_| DateTimeError::OutOfRange)?;
                let day = u8::try_from(day.unwrap_or(1)).map_err(|_| DateTimeError::OutOfRange)?;
                Date::from_calendar_date(year, month, day)
            }
        }
        .map_err(|_| DateTimeError::OutOfRange)?;

        let mut hour = self.hour.unwrap_or(0);
        match self.pm {
            Some(true) if hour < 12 => hour += 12,
            Some(false) if hour == 12 => hour = 0,
            _ => {}
        }
        let time = Time::from_hms_nano(
            u8::try_from(hour).map_err(|_| DateTimeError::OutOfRange)?,
            u8::try_from(self.minute).map_err(|_| DateTimeError::OutOfRange)?,
            u8::try_from(self.second).map_err(|_| DateTimeError::OutOfRange)?,
            self.nanosecond,
        )
        .map_err(|_| DateTimeError::OutOfRange)?;

        Ok(PrimitiveDateTime::new(date, time).assume_offset(self.offset.unwrap_or(UtcOffset::UTC)))
    }
}

fn nanoseconds(fraction: &str) -> Result<u32, DateTimeError> {
    let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
    number(&digits)
}
