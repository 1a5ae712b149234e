use chrono::{DateTime, NaiveDate, Utc};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as a row id.
///
/// Layout (53 bits, stays below JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC
///   - 12 bits: random
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Millisecond timestamp to a UTC datetime. Out-of-range values clamp to the epoch.
pub fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Calendar day (UTC) a millisecond timestamp falls on
pub fn utc_date(ms: i64) -> NaiveDate {
    millis_to_utc(ms).date_naive()
}

/// Normalize an email used as an identity key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_ids_are_positive_and_js_safe() {
        for _ in 0..100 {
            let id = snowflake_id();
            assert!(id > 0);
            assert!(id < (1_i64 << 53));
        }
    }

    #[test]
    fn test_utc_date() {
        // 2025-12-31T23:59:59.999Z
        let ms = 1_767_225_599_999;
        assert_eq!(utc_date(ms), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(
            utc_date(ms + 1),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@City.Test "), "jane@city.test");
    }
}
