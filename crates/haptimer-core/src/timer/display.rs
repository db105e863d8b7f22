//! Clock formatting and duration parsing.

use thiserror::Error;

/// Format seconds as `H:MM:SS`, `M:SS` or `0:SS`.
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else if minutes > 0 {
        format!("{minutes}:{secs:02}")
    } else {
        format!("0:{secs:02}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{0}' (expected e.g. 600, 10m, 1h30m or 1:30:00)")]
pub struct DurationParseError(pub String);

/// Parse `600`, `90s`, `10m`, `1h30m`, `10:00` or `1:30:00` into seconds.
pub fn parse_duration(input: &str) -> Result<u32, DurationParseError> {
    let s = input.trim();
    let fail = || DurationParseError(input.to_string());
    if s.is_empty() {
        return Err(fail());
    }

    let total: u64 = if s.contains(':') {
        let parts = s
            .split(':')
            .map(|p| p.parse::<u64>().map_err(|_| fail()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [m, sec] if *sec < 60 => m * 60 + sec,
            [h, m, sec] if *m < 60 && *sec < 60 => h * 3600 + m * 60 + sec,
            _ => return Err(fail()),
        }
    } else if s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().map_err(|_| fail())?
    } else {
        let mut total = 0u64;
        let mut digits = String::new();
        for c in s.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let unit = match c.to_ascii_lowercase() {
                'h' => 3600,
                'm' => 60,
                's' => 1,
                _ => return Err(fail()),
            };
            let value: u64 = digits.parse().map_err(|_| fail())?;
            total = value
                .checked_mul(unit)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(fail)?;
            digits.clear();
        }
        if !digits.is_empty() {
            return Err(fail());
        }
        total
    };

    u32::try_from(total).map_err(|_| fail())
}
