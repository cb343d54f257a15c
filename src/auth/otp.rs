use rand::Rng;
use time::{Duration, OffsetDateTime};

pub const CODE_TTL: Duration = Duration::minutes(10);

pub struct OneTimeCode {
    pub code: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl OneTimeCode {
    pub fn issue() -> Self {
        Self::issue_at(OffsetDateTime::now_utc())
    }

    pub fn issue_at(now: OffsetDateTime) -> Self {
        let code = rand::rng().random_range(100_000..=999_999u32).to_string();
        OneTimeCode {
            code,
            issued_at: now,
            expires_at: now + CODE_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Accepted,
    Mismatch,
    Expired,
}

/// Compares a submitted code with the stored one. The code is good up to and
/// including the expiry second.
pub fn check_code(
    stored: Option<&str>,
    expires_at: Option<i64>,
    submitted: &str,
    now: OffsetDateTime,
) -> CodeCheck {
    let (Some(stored), Some(expires_at)) = (stored, expires_at) else {
        return CodeCheck::Mismatch;
    };

    if stored != submitted.trim() {
        CodeCheck::Mismatch
    } else if now.unix_timestamp() > expires_at {
        CodeCheck::Expired
    } else {
        CodeCheck::Accepted
    }
}
