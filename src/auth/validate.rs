use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;
use time::{Date, macros::format_description};

use crate::{AppError, AppResult};

pub(crate) const MISSING_FIELDS: &str = "Please provide all required fields.";
pub(crate) const WEAK_PASSWORD: &str = "Password must be 8-20 characters long and contain at least one letter, one number, and one special character.";

const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[0-9]{1,3}[0-9]{10,15}$").unwrap());

/// Trimmed, non-empty text or nothing.
pub(crate) fn required(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// 8-20 characters from `[A-Za-z0-9!@#$%^&*]` with at least one letter, one
/// digit and one symbol.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    if !(8..=20).contains(&len) {
        return false;
    }

    let is_symbol = |c: char| PASSWORD_SYMBOLS.contains(c);
    password.chars().all(|c| c.is_ascii_alphanumeric() || is_symbol(c))
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(is_symbol)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
        }
    }
}

/// The username: an email address or an international phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    pub fn parse(raw: &str) -> AppResult<Identifier> {
        let raw = raw.trim();
        if EMAIL.is_match(raw) {
            Ok(Identifier::Email(raw.to_owned()))
        } else if PHONE.is_match(raw) {
            Ok(Identifier::Phone(raw.to_owned()))
        } else {
            Err(AppError::validation("Invalid phone number or email format."))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Email(value) | Identifier::Phone(value) => value,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Identifier::Email(_) => Channel::Email,
            Identifier::Phone(_) => Channel::Sms,
        }
    }
}

/// `YYYY-MM-DD`, not after `today`.
pub(crate) fn parse_birth_date(raw: &str, today: Date) -> AppResult<Date> {
    let date = Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("Date of birth must be a valid date in YYYY-MM-DD format."))?;

    if date > today {
        return Err(AppError::validation("Date of birth cannot be in the future."));
    }

    Ok(date)
}

pub(crate) fn normalize_gender(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lowercased, deduplicated, blanks dropped; empty means invalid.
pub(crate) fn normalize_genders(raw: Vec<String>) -> Option<Vec<String>> {
    let mut genders: Vec<String> = Vec::with_capacity(raw.len());
    for gender in raw.iter().map(|g| normalize_gender(g)) {
        if !gender.is_empty() && !genders.contains(&gender) {
            genders.push(gender);
        }
    }

    (!genders.is_empty()).then_some(genders)
}
