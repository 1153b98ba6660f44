use chrono::{DateTime, TimeZone};

/// How the tracker converts hours to days and days to weeks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCalendar {
    pub day_hours: u64,
    pub week_days: u64,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            day_hours: 8,
            week_days: 5,
        }
    }
}

/// ISO-8601 duration for a worklog, rounded down to whole seconds.
///
/// Hours fold into work days and days into work weeks, e.g. 9h with an
/// 8h day is `P1DT1H`.
pub fn iso8601_duration(ms: u64, calendar: WorkCalendar) -> String {
    let day_hours = calendar.day_hours.max(1);
    let week_days = calendar.week_days.max(1);

    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / day_hours;
    let weeks = days / week_days;

    let mut date_part = String::new();
    if weeks > 0 {
        date_part.push_str(&format!("{}W", weeks));
    }
    if days % week_days > 0 {
        date_part.push_str(&format!("{}D", days % week_days));
    }

    let mut time_part = String::new();
    if hours % day_hours > 0 {
        time_part.push_str(&format!("{}H", hours % day_hours));
    }
    if minutes % 60 > 0 {
        time_part.push_str(&format!("{}M", minutes % 60));
    }
    if seconds % 60 > 0 {
        time_part.push_str(&format!("{}S", seconds % 60));
    }

    match (date_part.is_empty(), time_part.is_empty()) {
        (true, true) => "PT0S".to_string(),
        (_, true) => format!("P{}", date_part),
        _ => format!("P{}T{}", date_part, time_part),
    }
}

/// Timestamp as `YYYY-MM-DDThh:mm:ss.sss±hhmm` in the given zone
pub fn format_start<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}
