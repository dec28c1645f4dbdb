//! Pure parsing of booking times: natural-language phrases such as
//! "tomorrow at 3pm" or "next monday at 2", and ISO-8601 timestamps returned
//! by the model.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc, Weekday,
};
use regex::{Captures, Regex};

static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b",
    )
    .expect("valid regex")
});
static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("valid regex")
});
static NEXT_WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bnext\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thu|fri|sat|sun)\b",
    )
    .expect("valid regex")
});
static NEXT_WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnext\s+week\b").expect("valid regex"));
static TOMORROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(tomorrow|tmrw|tmr)\b").expect("valid regex"));
static TODAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(today|tonight)\b").expect("valid regex"));

static AMPM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::([0-5]\d))?\s*([ap]\.m\.|[ap]\.?m\b)").expect("valid regex")
});
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("valid regex"));
static NOON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(noon|midday|midnight)\b").expect("valid regex"));
static AT_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+(\d{1,2})\b").expect("valid regex"));

const DEFAULT_HOUR: u32 = 9;
const TONIGHT_HOUR: u32 = 19;

/// Resolves a phrase against `now` (whose offset is the reference timezone).
/// Returns `None` when no date phrase is recognized.
pub fn parse_natural_datetime(
    text: &str,
    now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    let lower = text.to_lowercase();
    let today = now.date_naive();

    let (date, default_hour) = resolve_date(&lower, today)?;
    let time = resolve_time(&lower).unwrap_or(NaiveTime::from_hms_opt(default_hour, 0, 0)?);

    now.timezone()
        .from_local_datetime(&date.and_time(time))
        .single()
}

fn resolve_date(lower: &str, today: NaiveDate) -> Option<(NaiveDate, u32)> {
    if let Some(caps) = MONTH_DAY_RE.captures(lower) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        return upcoming_date(today, None, month, day).map(|d| (d, DEFAULT_HOUR));
    }

    if let Some(caps) = NUMERIC_DATE_RE.captures(lower) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps.get(3).and_then(|y| {
            let y: i32 = y.as_str().parse().ok()?;
            Some(if y < 100 { 2000 + y } else { y })
        });
        return upcoming_date(today, year, month, day).map(|d| (d, DEFAULT_HOUR));
    }

    if let Some(caps) = NEXT_WEEKDAY_RE.captures(lower) {
        let target = weekday(&caps[1])?;
        let current = today.weekday().num_days_from_monday() as i64;
        let wanted = target.num_days_from_monday() as i64;
        let mut ahead = (wanted - current).rem_euclid(7);
        if ahead == 0 {
            ahead = 7;
        }
        return Some((today + Duration::days(ahead), DEFAULT_HOUR));
    }

    if NEXT_WEEK_RE.is_match(lower) {
        return Some((today + Duration::days(7), DEFAULT_HOUR));
    }

    if TOMORROW_RE.is_match(lower) {
        return Some((today.succ_opt()?, DEFAULT_HOUR));
    }

    if let Some(caps) = TODAY_RE.captures(lower) {
        let hour = if &caps[1] == "tonight" {
            TONIGHT_HOUR
        } else {
            DEFAULT_HOUR
        };
        return Some((today, hour));
    }

    None
}

/// Explicit year wins; otherwise this year, or next year if already past.
fn upcoming_date(today: NaiveDate, year: Option<i32>, month: u32, day: u32) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

fn resolve_time(lower: &str) -> Option<NaiveTime> {
    if let Some(caps) = AMPM_RE.captures(lower) {
        return meridiem_time(&caps);
    }

    if let Some(caps) = CLOCK_RE.captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        // "2:30" follows the bare-hour rule; "02:30" and "14:30" are 24h.
        let hour = if caps[1].starts_with('0') {
            hour
        } else {
            bare_hour(hour).unwrap_or(hour)
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if let Some(caps) = NOON_RE.captures(lower) {
        let hour = if &caps[1] == "midnight" { 0 } else { 12 };
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }

    if let Some(caps) = AT_HOUR_RE.captures(lower) {
        let hour: u32 = caps[1].parse().ok()?;
        return NaiveTime::from_hms_opt(bare_hour(hour)?, 0, 0);
    }

    None
}

fn meridiem_time(caps: &Captures) -> Option<NaiveTime> {
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let is_pm = caps[3].starts_with('p');
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Hours without am/pm are read as business hours: 1-7 are afternoon.
fn bare_hour(hour: u32) -> Option<u32> {
    match hour {
        1..=7 => Some(hour + 12),
        8..=23 => Some(hour),
        _ => None,
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match &name[..3] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday(name: &str) -> Option<Weekday> {
    let day = match &name[..3] {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Parses a model-supplied timestamp. Accepts RFC 3339 (including a trailing
/// `Z`), explicit offsets, and naive values read in `offset`.
pub fn parse_iso_timestamp(value: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let normalized = match value.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    /// Monday 2025-06-16 10:30 in the reference timezone.
    fn monday_morning() -> DateTime<FixedOffset> {
        offset().with_ymd_and_hms(2025, 6, 16, 10, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<DateTime<FixedOffset>> {
        Some(offset().with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    #[test]
    fn test_phrase_table() {
        let now = monday_morning();
        let cases: &[(&str, Option<DateTime<FixedOffset>>)] = &[
            ("tomorrow at 3pm", at(2025, 6, 17, 15, 0)),
            ("Tomorrow at 3 PM please", at(2025, 6, 17, 15, 0)),
            ("tomorrow at 9:30am", at(2025, 6, 17, 9, 30)),
            ("tomorrow", at(2025, 6, 17, 9, 0)),
            ("next monday at 2", at(2025, 6, 23, 14, 0)),
            ("next tuesday at 10", at(2025, 6, 17, 10, 0)),
            ("next sunday at noon", at(2025, 6, 22, 12, 0)),
            ("next fri 16:45", at(2025, 6, 20, 16, 45)),
            ("next monday at 2:30", at(2025, 6, 23, 14, 30)),
            ("tomorrow 3:15", at(2025, 6, 17, 15, 15)),
            ("tomorrow at 02:30", at(2025, 6, 17, 2, 30)),
            ("tomorrow at 0:45", at(2025, 6, 17, 0, 45)),
            ("tomorrow at 10:15", at(2025, 6, 17, 10, 15)),
            ("tomorrow at 3 amazing", at(2025, 6, 17, 15, 0)),
            ("tomorrow at 7 p.m. sharp", at(2025, 6, 17, 19, 0)),
            ("next week", at(2025, 6, 23, 9, 0)),
            ("some time next week at 11am", at(2025, 6, 23, 11, 0)),
            ("june 20 at 4pm", at(2025, 6, 20, 16, 0)),
            ("Jan 3rd at 8 a.m.", at(2026, 1, 3, 8, 0)),
            ("on 7/4 at 12am", at(2025, 7, 4, 0, 0)),
            ("12/25/2026 at 5:15 pm", at(2026, 12, 25, 17, 15)),
            ("today at midnight", at(2025, 6, 16, 0, 0)),
            ("tonight", at(2025, 6, 16, 19, 0)),
            ("sometime soon", None),
            ("at 3pm", None),
            ("", None),
            ("february 30 at 2pm", None),
        ];

        for (phrase, expected) in cases {
            assert_eq!(
                parse_natural_datetime(phrase, now),
                *expected,
                "phrase: {phrase:?}"
            );
        }
    }

    #[test]
    fn test_next_weekday_excludes_today() {
        let now = monday_morning();
        let next = parse_natural_datetime("next monday", now).unwrap();
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 23).unwrap());
    }

    #[test]
    fn test_relative_terms_use_reference_offset() {
        let plus_ten = FixedOffset::east_opt(10 * 3600).unwrap();
        // 2025-06-16 20:00 UTC is already 2025-06-17 in UTC+10.
        let now = Utc
            .with_ymd_and_hms(2025, 6, 16, 20, 0, 0)
            .unwrap()
            .with_timezone(&plus_ten);
        let parsed = parse_natural_datetime("tomorrow at 3pm", now).unwrap();
        assert_eq!(parsed, plus_ten.with_ymd_and_hms(2025, 6, 18, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_iso_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let cases = [
            "2024-01-15T14:00:00Z",
            "2024-01-15T14:00:00+00:00",
            "2024-01-15T16:00:00+02:00",
            "2024-01-15T14:00:00.000Z",
            "2024-01-15T14:00Z",
            "2024-01-15T14:00:00",
            "2024-01-15 14:00",
        ];
        for case in cases {
            assert_eq!(parse_iso_timestamp(case, offset()), Some(expected), "case: {case}");
        }
    }

    #[test]
    fn test_naive_iso_timestamp_uses_reference_offset() {
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            parse_iso_timestamp("2024-01-15T09:00:00", minus_five),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_iso_timestamp() {
        for case in ["tomorrow", "2024-13-01T10:00:00Z", "", "15/01/2024 14:00"] {
            assert_eq!(parse_iso_timestamp(case, offset()), None, "case: {case}");
        }
    }
}
