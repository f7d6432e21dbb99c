//! # Schedule expressions.
//!
//! Accepted forms:
//! - `@every <duration>`: fixed interval, Go-style duration (`1s`, `500ms`, `1m30s`, `1.5h`).
//! - `@yearly` / `@annually`, `@monthly`, `@weekly`, `@daily` / `@midnight`, `@hourly`.
//! - 5-field cron (`min hour dom month dow`), fired at second `0`.
//! - 6/7-field cron with a leading seconds field (and optional trailing year).
//!
//! Calendar expressions are evaluated in local time by the `cron` crate.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use tokio::time::Instant;

use crate::error::Error;

/// Parsed schedule: when to fire next.
#[derive(Clone)]
pub struct Schedule {
    expr: Arc<str>,
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Every(Duration),
    Calendar(Box<cron::Schedule>),
}

impl Schedule {
    /// Parses a schedule expression.
    pub fn parse(expr: &str) -> Result<Self, Error> {
        let trimmed = expr.trim();
        let invalid = |reason: String| Error::InvalidSchedule {
            expr: expr.to_string(),
            reason,
        };

        let kind = if let Some(rest) = trimmed.strip_prefix("@every") {
            let every = parse_duration(rest.trim()).map_err(invalid)?;
            if every.is_zero() {
                return Err(invalid("interval must be positive".to_string()));
            }
            Kind::Every(every)
        } else {
            let fields = match trimmed {
                "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
                "@monthly" => "0 0 0 1 * *".to_string(),
                "@weekly" => "0 0 0 * * SUN".to_string(),
                "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
                "@hourly" => "0 0 * * * *".to_string(),
                other if other.starts_with('@') => {
                    return Err(invalid(format!("unknown descriptor {other:?}")));
                }
                other => match other.split_whitespace().count() {
                    5 => format!("0 {other}"),
                    6 | 7 => other.to_string(),
                    n => return Err(invalid(format!("expected 5 to 7 fields, found {n}"))),
                },
            };
            let calendar = cron::Schedule::from_str(&fields).map_err(|e| invalid(e.to_string()))?;
            Kind::Calendar(Box::new(calendar))
        };

        Ok(Self {
            expr: Arc::from(trimmed),
            kind,
        })
    }

    /// The expression this schedule was parsed from.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Fixed interval, for `@every` schedules.
    pub fn interval(&self) -> Option<Duration> {
        match self.kind {
            Kind::Every(every) => Some(every),
            Kind::Calendar(_) => None,
        }
    }

    /// First fire time strictly after `prev`, or `None` if the schedule is exhausted.
    pub fn next_after(&self, prev: Instant) -> Option<Instant> {
        match &self.kind {
            Kind::Every(every) => Some(prev + *every),
            Kind::Calendar(calendar) => {
                let now = Instant::now();
                let wall_now = Local::now();
                let offset = if prev >= now {
                    TimeDelta::from_std(prev - now).ok()?
                } else {
                    -TimeDelta::from_std(now - prev).ok()?
                };
                let next = calendar.after(&(wall_now + offset)).next()?;
                match (next - wall_now).to_std() {
                    Ok(ahead) => Some(now + ahead),
                    // Already in the past relative to `now`.
                    Err(_) => Some(now),
                }
            }
        }
    }

    /// First fire time after `prev` that is later than `now`; slots in between are skipped.
    pub fn next_from(&self, prev: Instant, now: Instant) -> Option<Instant> {
        let mut next = self.next_after(prev)?;
        if let Kind::Every(every) = self.kind {
            if next <= now {
                let behind = (now - next).as_nanos() / every.as_nanos() + 1;
                next += every * u32::try_from(behind).unwrap_or(u32::MAX);
            }
            return Some(next);
        }
        while next <= now {
            next = self.next_after(next)?;
        }
        Some(next)
    }
}

impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schedule").field(&self.expr).finish()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

/// Parses a Go-style duration such as `300ms`, `1.5h` or `2h45m`.
fn parse_duration(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("missing duration".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(format!("negative duration {s:?}"));
    }

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    let mut total = 0f64;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration {s:?}"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {s:?}"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration {s:?}")),
            unit => return Err(format!("unknown unit {unit:?} in duration {s:?}")),
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return Err(format!("duration {s:?} out of range"));
    }
    Ok(Duration::from_nanos(total as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_durations() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("10µs"), Ok(Duration::from_micros(10)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn every_schedule() {
        let s = Schedule::parse("@every 1s").unwrap();
        assert_eq!(s.interval(), Some(Duration::from_secs(1)));
        assert_eq!(s.expr(), "@every 1s");

        let base = Instant::now();
        assert_eq!(s.next_after(base), Some(base + Duration::from_secs(1)));
    }

    #[test]
    fn every_rejects_zero() {
        let err = Schedule::parse("@every 0s").unwrap_err();
        assert_eq!(err.as_label(), "invalid_schedule");
        assert!(Schedule::parse("@every").is_err());
    }

    #[test]
    fn missed_slots_are_skipped() {
        let s = Schedule::parse("@every 100ms").unwrap();
        let prev = Instant::now();
        let now = prev + Duration::from_millis(350);

        assert_eq!(s.next_from(prev, now), Some(prev + Duration::from_millis(400)));
        assert_eq!(
            s.next_from(prev, prev + Duration::from_millis(50)),
            Some(prev + Duration::from_millis(100))
        );
    }

    #[test]
    fn calendar_expressions() {
        assert!(Schedule::parse("*/5 * * * *").is_ok());
        assert!(Schedule::parse("0 */5 * * * *").is_ok());
        assert!(Schedule::parse("@hourly").is_ok());
        assert!(Schedule::parse("@midnight").is_ok());
        assert!(Schedule::parse("@weekly").is_ok());
        assert!(Schedule::parse("* * *").is_err());
        assert!(Schedule::parse("@sometimes").is_err());
        assert!(Schedule::parse("61 * * * *").is_err());
    }

    #[tokio::test]
    async fn calendar_next_is_in_the_future() {
        let s = Schedule::parse("* * * * * *").unwrap();
        let now = Instant::now();
        let next = s.next_from(now, now).unwrap();
        assert!(next > now);
        assert!(next <= now + Duration::from_secs(1) + Duration::from_millis(50));
    }
}
