//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds, UTC)
//! Fields: *, */N, N, A-B, A-B/N and comma lists of those.
//! Day of week: 0-7, where both 0 and 7 are Sunday.
//! Example: "0 4 * * 1,4" = Mondays and Thursdays at 04:00

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// Upper bound on search steps; every schedule we register matches well within it.
const MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct CronSchedule {
    expression: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, String> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(format!(
                "Invalid cron expression: '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            ));
        }
        let field = |idx: usize, min: u32, max: u32| {
            parse_field(parts[idx], min, max)
                .ok_or_else(|| format!("Invalid cron field '{}' in '{expression}'", parts[idx]))
        };

        let mut days_of_week = field(4, 0, 7)?;
        // 7 is an alias for Sunday.
        for d in days_of_week.iter_mut() {
            if *d == 7 {
                *d = 0;
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            minutes: field(0, 0, 59)?,
            hours: field(1, 0, 23)?,
            days_of_month: field(2, 1, 31)?,
            months: field(3, 1, 12)?,
            days_of_week,
            dom_restricted: parts[2] != "*",
            dow_restricted: parts[4] != "*",
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Classic cron: when both day fields are restricted, either may match.
    fn day_matches(&self, t: &DateTime<Utc>) -> bool {
        let dom = self.days_of_month.contains(&t.day());
        let dow = self.days_of_week.contains(&t.weekday().num_days_from_sunday());
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);

        for _ in 0..MAX_STEPS {
            if !self.months.contains(&candidate.month()) {
                let (y, m) = if candidate.month() == 12 {
                    (candidate.year() + 1, 1)
                } else {
                    (candidate.year(), candidate.month() + 1)
                };
                candidate = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(&candidate) {
                let next_day = candidate.date_naive().succ_opt()?;
                candidate = next_day.and_hms_opt(0, 0, 0)?.and_utc();
                continue;
            }
            if !self.hours.contains(&candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(&candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }
            return Some(candidate);
        }

        None
    }
}

/// Parse a cron field into a list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let mut values = Vec::new();
    for part in field.split(',') {
        values.extend(parse_part(part.trim(), min, max)?);
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn parse_part(part: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let (range, step) = match part.split_once('/') {
        Some((r, s)) => {
            let n: u32 = s.parse().ok()?;
            if n == 0 {
                return None;
            }
            (r, n)
        }
        None => (part, 1),
    };

    let (lo, hi) = if range == "*" {
        (min, max)
    } else if let Some((a, b)) = range.split_once('-') {
        (a.parse().ok()?, b.parse().ok()?)
    } else {
        let n: u32 = range.parse().ok()?;
        // "N/S" means from N to the end of the range.
        if step > 1 {
            (n, max)
        } else {
            (n, n)
        }
    };

    if lo < min || hi > max || lo > hi {
        return None;
    }
    Some((lo..=hi).step_by(step as usize).collect())
}
