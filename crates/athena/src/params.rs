//! Request parameter normalization.

pub const DEFAULT_KEY: &str = "dmartin";
pub const DEFAULT_DAYS: u32 = 30;
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 90;

/// Normalized inputs of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    /// Split traffic key to filter impressions by.
    pub key: String,
    /// Trailing window in days, always within `MIN_DAYS..=MAX_DAYS`.
    pub days: u32,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            days: DEFAULT_DAYS,
        }
    }
}

impl RequestParams {
    /// Build params from raw query-string values. Never fails: missing values
    /// take defaults and out-of-range windows are clamped.
    pub fn from_query(key: Option<&str>, days: Option<&str>) -> Self {
        let key = key
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_KEY)
            .to_string();

        let days = match days.filter(|d| !d.is_empty()) {
            None => DEFAULT_DAYS,
            // Non-numeric input lands on the lower bound.
            Some(raw) => clamp_days(parse_leading_int(raw).unwrap_or(MIN_DAYS as i64)),
        };

        Self { key, days }
    }
}

fn clamp_days(days: i64) -> u32 {
    days.clamp(MIN_DAYS as i64, MAX_DAYS as i64) as u32
}

/// Parse the leading base-10 integer of `raw`: optional whitespace, optional
/// sign, then digits. Trailing characters are ignored and overflow saturates.
/// Returns `None` when no digit follows the sign.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }

    seen.then(|| if negative { -value } else { value })
}
