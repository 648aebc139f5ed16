//! ISO-8601 duration parsing and watch-time formatting.

use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
});

/// Total seconds of a catalog duration such as `PT1H2M3S`
///
/// Absent components count as zero; a string the pattern does not match at
/// all (including day-based durations like `P1D`) contributes zero.
pub fn parse_duration_secs(duration: &str) -> u64 {
    let Some(caps) = DURATION_PATTERN.captures(duration) else {
        return 0;
    };

    let component = |index: usize| -> u64 {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    component(1)
        .saturating_mul(3600)
        .saturating_add(component(2).saturating_mul(60))
        .saturating_add(component(3))
}

/// Format a number of seconds as hours with exactly two decimals
pub fn format_watch_hours(total_secs: u64) -> String {
    format!("{:.2}", total_secs as f64 / 3600.0)
}
