use std::time::Duration;

use ::time::OffsetDateTime;
use ::time::UtcOffset;
use ::time::macros::format_description;

pub trait TimeExt {
    /// RFC 3339 timestamp truncated to whole seconds, e.g. `2024-05-01T10:00:00Z`.
    fn rfc3339_seconds(&self) -> String;

    /// RFC 3339 timestamp with exactly three fractional digits, e.g. `2024-05-01T10:00:00.000Z`.
    fn rfc3339_millis(&self) -> String;
}

impl TimeExt for OffsetDateTime {
    fn rfc3339_seconds(&self) -> String {
        self.to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
            ))
            .unwrap_or_else(|_| self.to_string())
    }

    fn rfc3339_millis(&self) -> String {
        self.to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
            ))
            .unwrap_or_else(|_| self.to_string())
    }
}

pub trait DurationExt {
    /// Duration in Go's `time.Duration` notation, e.g. `1m30s`, `1h0m0s`, `1.5ms`, `0s`.
    fn go_string(&self) -> String;
}

impl DurationExt for Duration {
    fn go_string(&self) -> String {
        let nanos = self.as_nanos();
        if nanos == 0 {
            return "0s".to_string();
        }
        if nanos < 1_000 {
            return format!("{nanos}ns");
        }
        if nanos < 1_000_000 {
            return format!("{}\u{b5}s", decimal(nanos, 1_000));
        }
        if nanos < 1_000_000_000 {
            return format!("{}ms", decimal(nanos, 1_000_000));
        }

        let secs = self.as_secs();
        let (hours, minutes) = (secs / 3600, secs / 60 % 60);
        let seconds = decimal(
            u128::from(secs % 60) * 1_000_000_000 + u128::from(self.subsec_nanos()),
            1_000_000_000,
        );
        if hours > 0 {
            format!("{hours}h{minutes}m{seconds}s")
        } else if minutes > 0 {
            format!("{minutes}m{seconds}s")
        } else {
            format!("{seconds}s")
        }
    }
}

/// `value / unit` with the fraction written out and trailing zeros dropped.
fn decimal(value: u128, unit: u128) -> String {
    let (whole, fraction) = (value / unit, value % unit);
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let fraction = format!("{fraction:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
