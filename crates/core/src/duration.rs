//! Duration strings as they arrive from the catalog API and from CSV imports.
//!
//! Parsing never fails: anything unrecognised is treated as a zero-length video so
//! ingestion is not blocked by malformed metadata.

use std::sync::OnceLock;

use regex::Regex;

static ISO_DURATION: OnceLock<Regex> = OnceLock::new();
static LEADING_NUMBER: OnceLock<Regex> = OnceLock::new();

fn iso_duration() -> &'static Regex {
    ISO_DURATION.get_or_init(|| {
        Regex::new(r"^PT(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?(?:(?P<seconds>\d+)S)?")
            .expect("static duration pattern is valid")
    })
}

fn leading_number() -> &'static Regex {
    LEADING_NUMBER.get_or_init(|| {
        Regex::new(r"\d+(?:\.\d+)?").expect("static number pattern is valid")
    })
}

/// Parses catalog durations of the form `PT[#H][#M][#S]` into seconds.
///
/// ```
/// use study_core::duration::parse_iso_duration;
/// assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
/// assert_eq!(parse_iso_duration("garbage"), 0);
/// ```
#[must_use]
pub fn parse_iso_duration(raw: &str) -> u32 {
    let Some(caps) = iso_duration().captures(raw.trim()) else {
        return 0;
    };
    let component = |name: &str| -> u64 {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let total = component("hours")
        .saturating_mul(3600)
        .saturating_add(component("minutes").saturating_mul(60))
        .saturating_add(component("seconds"));
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Parses a CSV duration cell.
///
/// Accepts `MM:SS`, `HH:MM:SS`, or free text with a number and an optional unit hint
/// (`sec` for seconds, `hr`/`hour` for hours, minutes otherwise).
#[must_use]
pub fn parse_clock_duration(raw: &str) -> u32 {
    let trimmed = raw.trim();
    let parsed = if trimmed.contains(':') {
        parse_colon_separated(trimmed)
    } else {
        parse_free_text(trimmed)
    };
    parsed
        .map(|secs| u32::try_from(secs).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn parse_colon_separated(raw: &str) -> Option<u64> {
    let parts = raw
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [m, s] => Some(m.saturating_mul(60).saturating_add(*s)),
        [h, m, s] => Some(
            h.saturating_mul(3600)
                .saturating_add(m.saturating_mul(60))
                .saturating_add(*s),
        ),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_free_text(raw: &str) -> Option<u64> {
    let number: f64 = leading_number().find(raw)?.as_str().parse().ok()?;
    let hint = raw.to_lowercase();
    let multiplier = if hint.contains("sec") {
        1.0
    } else if hint.contains("hr") || hint.contains("hour") {
        3600.0
    } else {
        60.0
    };
    let seconds = (number * multiplier).round();
    seconds.is_finite().then_some(seconds as u64)
}

/// Formats seconds as `MM:SS`; minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_durations() {
        assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(parse_iso_duration("PT10M"), 600);
        assert_eq!(parse_iso_duration("PT2H"), 7200);
    }

    #[test]
    fn iso_degenerate_inputs_are_zero() {
        assert_eq!(parse_iso_duration("PT"), 0);
        assert_eq!(parse_iso_duration(""), 0);
        assert_eq!(parse_iso_duration("garbage"), 0);
        assert_eq!(parse_iso_duration("P1D"), 0);
    }

    #[test]
    fn clock_durations() {
        assert_eq!(parse_clock_duration("12:30"), 750);
        assert_eq!(parse_clock_duration("1:02:03"), 3723);
        assert_eq!(parse_clock_duration(" 00:00 "), 0);
    }

    #[test]
    fn free_text_durations() {
        assert_eq!(parse_clock_duration("10 mins"), 600);
        assert_eq!(parse_clock_duration("1.5 hours"), 5400);
        assert_eq!(parse_clock_duration("2 hr"), 7200);
        assert_eq!(parse_clock_duration("45 sec"), 45);
        assert_eq!(parse_clock_duration("90"), 5400);
    }

    #[test]
    fn unparseable_clock_durations_are_zero() {
        assert_eq!(parse_clock_duration(""), 0);
        assert_eq!(parse_clock_duration("soon"), 0);
        assert_eq!(parse_clock_duration("ab:cd"), 0);
        assert_eq!(parse_clock_duration("1:2:3:4"), 0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(75), "01:15");
        assert_eq!(format_clock(3000), "50:00");
    }
}
