//! CF time coordinates
//!
//! Decodes `"<unit> since <reference>"` offsets into calendar dates, honouring
//! the coordinate's `calendar` attribute. Decoded dates become layer names.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Julian day number of 1582-10-15, the first day of the Gregorian calendar
const GREGORIAN_START_JDN: i64 = 2_299_161;

/// Julian day number of 0001-01-01 (proleptic Gregorian) minus chrono's day 1
const CE_TO_JDN: i64 = 1_721_425;

/// CF calendars with a well-defined date arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CfCalendar {
    /// Julian before 1582-10-15, Gregorian from then on
    #[default]
    Standard,
    ProlepticGregorian,
    Julian,
    /// Every year has 365 days
    NoLeap,
    /// Every year has 366 days
    AllLeap,
    /// Twelve 30-day months
    Day360,
}

/// A `calendar` attribute naming a calendar this crate cannot decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedCalendar(pub String);

impl fmt::Display for UnsupportedCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported CF calendar '{}'", self.0)
    }
}

impl std::error::Error for UnsupportedCalendar {}

impl FromStr for CfCalendar {
    type Err = UnsupportedCalendar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "gregorian" => Ok(Self::Standard),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            "julian" => Ok(Self::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "allleap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            _ => Err(UnsupportedCalendar(s.to_string())),
        }
    }
}

impl fmt::Display for CfCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::ProlepticGregorian => "proleptic_gregorian",
            Self::Julian => "julian",
            Self::NoLeap => "noleap",
            Self::AllLeap => "all_leap",
            Self::Day360 => "360_day",
        };
        f.write_str(name)
    }
}

/// Calendar date with the time of day in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CalendarTime {
    year: i64,
    month: u32,
    day: u32,
    millis: i64,
}

impl CfCalendar {
    fn is_leap_year(self, year: i64) -> bool {
        match self {
            Self::NoLeap | Self::Day360 => false,
            Self::AllLeap => true,
            Self::Julian => year.rem_euclid(4) == 0,
            Self::Standard | Self::ProlepticGregorian => {
                (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
            }
        }
    }

    fn days_in_month(self, year: i64, month: u32) -> u32 {
        match (self, month) {
            (Self::Day360, _) => 30,
            (_, 2) if self.is_leap_year(year) => 29,
            (_, 2) => 28,
            (_, 4 | 6 | 9 | 11) => 30,
            _ => 31,
        }
    }

    /// Days per year for calendars where that is constant
    const fn fixed_year_length(self) -> Option<i64> {
        match self {
            Self::NoLeap => Some(365),
            Self::AllLeap => Some(366),
            Self::Day360 => Some(360),
            _ => None,
        }
    }

    /// Continuous day count of a date in this calendar.
    fn day_number(self, year: i64, month: u32, day: u32) -> Option<i64> {
        if !(1..=12).contains(&month) || day == 0 || day > self.days_in_month(year, month) {
            return None;
        }
        if let Some(year_length) = self.fixed_year_length() {
            let before: i64 = (1..month).map(|m| i64::from(self.days_in_month(year, m))).sum();
            return Some(year * year_length + before + i64::from(day) - 1);
        }
        match self {
            Self::Julian => Some(julian_to_jdn(year, month, day)),
            Self::ProlepticGregorian => gregorian_to_jdn(year, month, day),
            _ => {
                let jdn = if (year, month, day) >= (1582, 10, 15) {
                    gregorian_to_jdn(year, month, day)?
                } else {
                    julian_to_jdn(year, month, day)
                };
                // 1582-10-05 to 1582-10-14 never happened
                (jdn < GREGORIAN_START_JDN || (year, month, day) >= (1582, 10, 15)).then_some(jdn)
            }
        }
    }

    /// Inverse of [`CfCalendar::day_number`].
    fn date(self, number: i64) -> Option<(i64, u32, u32)> {
        if let Some(year_length) = self.fixed_year_length() {
            let year = number.div_euclid(year_length);
            let mut remaining = number.rem_euclid(year_length);
            for month in 1..=12 {
                let length = i64::from(self.days_in_month(year, month));
                if remaining < length {
                    return Some((year, month, u32::try_from(remaining + 1).ok()?));
                }
                remaining -= length;
            }
            return None;
        }
        match self {
            Self::Julian => Some(jdn_to_julian(number)),
            Self::ProlepticGregorian => jdn_to_gregorian(number),
            _ if number >= GREGORIAN_START_JDN => jdn_to_gregorian(number),
            _ => Some(jdn_to_julian(number)),
        }
    }

    fn to_millis(self, t: CalendarTime) -> Option<i64> {
        self.day_number(t.year, t.month, t.day)?
            .checked_mul(MILLIS_PER_DAY)?
            .checked_add(t.millis)
    }

    fn from_millis(self, total: i64) -> Option<CalendarTime> {
        let (year, month, day) = self.date(total.div_euclid(MILLIS_PER_DAY))?;
        Some(CalendarTime {
            year,
            month,
            day,
            millis: total.rem_euclid(MILLIS_PER_DAY),
        })
    }
}

fn gregorian_to_jdn(year: i64, month: u32, day: u32) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    Some(i64::from(date.num_days_from_ce()) + CE_TO_JDN)
}

fn jdn_to_gregorian(jdn: i64) -> Option<(i64, u32, u32)> {
    let date = NaiveDate::from_num_days_from_ce_opt(i32::try_from(jdn - CE_TO_JDN).ok()?)?;
    Some((i64::from(date.year()), date.month(), date.day()))
}

fn julian_to_jdn(year: i64, month: u32, day: u32) -> i64 {
    let a = i64::from(14 - month) / 12;
    let y = year + 4800 - a;
    let m = i64::from(month) + 12 * a - 3;
    i64::from(day) + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32_083
}

fn jdn_to_julian(jdn: i64) -> (i64, u32, u32) {
    let c = jdn + 32_082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    (year, month as u32, day as u32)
}

/// Decode CF `"<unit> since <reference>"` offsets into ISO dates or date-times.
///
/// Returns `None` when the units are not a recognised time encoding or a value
/// falls outside the calendar's representable range.
pub fn decode_cf_times(values: &[f64], units: &str, calendar: CfCalendar) -> Option<Vec<String>> {
    let (unit, reference) = units.split_once(" since ")?;
    let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400_000.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000.0,
        "minutes" | "minute" | "mins" | "min" => 60_000.0,
        "seconds" | "second" | "secs" | "sec" | "s" => 1_000.0,
        _ => return None,
    };
    let origin = calendar.to_millis(parse_reference_time(reference)?)?;

    let times = values
        .iter()
        .map(|v| {
            let offset = (v * millis_per_unit).round();
            if !offset.is_finite() || offset.abs() > i64::MAX as f64 / 2.0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let total = origin.checked_add(offset as i64)?;
            calendar.from_millis(total)
        })
        .collect::<Option<Vec<_>>>()?;

    let all_midnight = times.iter().all(|t| t.millis == 0);
    Some(
        times
            .iter()
            .map(|t| {
                let date = format!("{:04}-{:02}-{:02}", t.year, t.month, t.day);
                if all_midnight {
                    date
                } else {
                    let seconds = t.millis / 1000;
                    format!(
                        "{date}T{:02}:{:02}:{:02}",
                        seconds / 3600,
                        (seconds / 60) % 60,
                        seconds % 60
                    )
                }
            })
            .collect(),
    )
}

/// Parse `YYYY-M-D[( |T)h:m[:s[.f]]]` without validating against any calendar.
fn parse_reference_time(text: &str) -> Option<CalendarTime> {
    let text = text
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim();
    let (date, time) = match text.split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time.trim())),
        None => (text, None),
    };

    let (year, rest) = match date.strip_prefix('-') {
        Some(unsigned) => {
            let (y, rest) = unsigned.split_once('-')?;
            (-y.parse::<i64>().ok()?, rest)
        }
        None => {
            let (y, rest) = date.split_once('-')?;
            (y.parse::<i64>().ok()?, rest)
        }
    };
    let (month, day) = rest.split_once('-')?;
    let (month, day) = (month.parse::<u32>().ok()?, day.parse::<u32>().ok()?);

    let millis = match time {
        None | Some("") => 0,
        Some(time) => {
            let mut parts = time.split(':');
            let hours = parts.next()?.parse::<u32>().ok()?;
            let minutes = parts.next().map_or(Some(0), |m| m.parse::<u32>().ok())?;
            let seconds = parts.next().map_or(Some(0.0), |s| s.parse::<f64>().ok())?;
            if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let sub = (seconds * 1000.0).round() as i64;
            i64::from(hours) * 3_600_000 + i64::from(minutes) * 60_000 + sub
        }
    };

    Some(CalendarTime {
        year,
        month,
        day,
        millis,
    })
}
