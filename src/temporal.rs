//! Local clock resolution and greeting bands.
//!
//! Sources in priority order: a literal `HH:MM[:SS]` from the client, an IANA
//! timezone name, a numeric UTC offset, then the configured default offset.
//! Anything that fails to parse falls through to the next source.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::ops::Range;

const MAX_OFFSET_HOURS: f64 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GreetingBand {
    Morning,
    Midday,
    Afternoon,
    Evening,
    LateNight,
    StillAwake,
}

impl GreetingBand {
    /// Evaluation order
    pub const ALL: [GreetingBand; 6] = [
        GreetingBand::Morning,
        GreetingBand::Midday,
        GreetingBand::Afternoon,
        GreetingBand::Evening,
        GreetingBand::LateNight,
        GreetingBand::StillAwake,
    ];

    /// Half-open range of local hours
    pub fn hours(&self) -> Range<u32> {
        match self {
            GreetingBand::Morning => 5..11,
            GreetingBand::Midday => 11..13,
            GreetingBand::Afternoon => 13..18,
            GreetingBand::Evening => 18..22,
            GreetingBand::LateNight => 22..24,
            GreetingBand::StillAwake => 0..5,
        }
    }

    pub fn from_hour(hour: u32) -> GreetingBand {
        Self::ALL
            .into_iter()
            .find(|band| band.hours().contains(&(hour % 24)))
            .unwrap_or(GreetingBand::StillAwake)
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            GreetingBand::Morning => "Good morning",
            GreetingBand::Midday => "Good midday",
            GreetingBand::Afternoon => "Good afternoon",
            GreetingBand::Evening => "Good evening",
            GreetingBand::LateNight => "It's getting late",
            GreetingBand::StillAwake => "Still awake",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            GreetingBand::Morning => "☀️",
            GreetingBand::Midday => "🍱",
            GreetingBand::Afternoon => "☕",
            GreetingBand::Evening => "🌙",
            GreetingBand::LateNight | GreetingBand::StillAwake => "🌃",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GreetingBand::Morning => "morning",
            GreetingBand::Midday => "midday",
            GreetingBand::Afternoon => "afternoon",
            GreetingBand::Evening => "evening",
            GreetingBand::LateNight => "late-night",
            GreetingBand::StillAwake => "still-awake",
        }
    }
}

/// Which input decided the local clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    LocalTime,
    Timezone,
    Offset,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeContext {
    pub band: GreetingBand,
    pub phrase: &'static str,
    pub tag: &'static str,
    pub hour: u32,
    pub minute: u32,
    /// Calendar date in the user's zone; a literal time never changes it
    pub date: NaiveDate,
    pub source: TimeSource,
}

impl TimeContext {
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// Client-supplied locale hints for one request
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleHints<'a> {
    pub timezone: Option<&'a str>,
    pub utc_offset: Option<f64>,
    pub local_time: Option<&'a str>,
}

pub fn resolve(hints: LocaleHints<'_>, now: DateTime<Utc>, default_offset: f64) -> TimeContext {
    let (zone_now, zone_source) = zone_local(hints, now, default_offset);

    let (time, source) = match hints.local_time.and_then(parse_local_time) {
        Some(time) => (time, TimeSource::LocalTime),
        None => (zone_now.time(), zone_source),
    };

    let band = GreetingBand::from_hour(time.hour());
    TimeContext {
        band,
        phrase: band.phrase(),
        tag: band.tag(),
        hour: time.hour(),
        minute: time.minute(),
        date: zone_now.date(),
        source,
    }
}

fn zone_local(hints: LocaleHints<'_>, now: DateTime<Utc>, default_offset: f64) -> (NaiveDateTime, TimeSource) {
    if let Some(tz) = hints.timezone.and_then(|name| name.trim().parse::<Tz>().ok()) {
        return (now.with_timezone(&tz).naive_local(), TimeSource::Timezone);
    }
    if let Some(offset) = hints.utc_offset.and_then(fixed_offset) {
        return (now.with_timezone(&offset).naive_local(), TimeSource::Offset);
    }
    let offset = fixed_offset(default_offset).unwrap_or_else(|| Utc.fix());
    (now.with_timezone(&offset).naive_local(), TimeSource::Default)
}

pub fn fixed_offset(hours: f64) -> Option<FixedOffset> {
    if !hours.is_finite() || hours.abs() > MAX_OFFSET_HOURS {
        return None;
    }
    FixedOffset::east_opt((hours * 3600.0).round() as i32)
}

fn parse_local_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // 2026-03-01 00:30 UTC
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap()
    }

    #[test]
    fn test_every_hour_has_exactly_one_band() {
        for hour in 0..24 {
            let matches = GreetingBand::ALL
                .iter()
                .filter(|band| band.hours().contains(&hour))
                .count();
            assert_eq!(matches, 1, "hour {}", hour);
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(GreetingBand::from_hour(4), GreetingBand::StillAwake);
        assert_eq!(GreetingBand::from_hour(5), GreetingBand::Morning);
        assert_eq!(GreetingBand::from_hour(11), GreetingBand::Midday);
        assert_eq!(GreetingBand::from_hour(13), GreetingBand::Afternoon);
        assert_eq!(GreetingBand::from_hour(18), GreetingBand::Evening);
        assert_eq!(GreetingBand::from_hour(22), GreetingBand::LateNight);
        assert_eq!(GreetingBand::from_hour(23), GreetingBand::LateNight);
        assert_eq!(GreetingBand::from_hour(0), GreetingBand::StillAwake);
    }

    #[test]
    fn test_default_offset_applies_without_hints() {
        let ctx = resolve(LocaleHints::default(), now(), 8.0);
        assert_eq!(ctx.source, TimeSource::Default);
        assert_eq!((ctx.hour, ctx.minute), (8, 30));
        assert_eq!(ctx.band, GreetingBand::Morning);
        assert_eq!(ctx.tag, "☀️");
        assert_eq!(ctx.date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_timezone_name_beats_offset() {
        let hints = LocaleHints {
            timezone: Some("America/New_York"),
            utc_offset: Some(9.0),
            local_time: None,
        };
        let ctx = resolve(hints, now(), 8.0);
        assert_eq!(ctx.source, TimeSource::Timezone);
        assert_eq!(ctx.hour, 19);
        assert_eq!(ctx.band, GreetingBand::Evening);
        assert_eq!(ctx.date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
    }

    #[test]
    fn test_bad_timezone_falls_through_to_offset() {
        let hints = LocaleHints {
            timezone: Some("Mars/Olympus_Mons"),
            utc_offset: Some(5.5),
            local_time: None,
        };
        let ctx = resolve(hints, now(), 8.0);
        assert_eq!(ctx.source, TimeSource::Offset);
        assert_eq!((ctx.hour, ctx.minute), (6, 0));
    }

    #[test]
    fn test_out_of_range_offset_falls_through_to_default() {
        let hints = LocaleHints { utc_offset: Some(20.0), ..LocaleHints::default() };
        let ctx = resolve(hints, now(), 8.0);
        assert_eq!(ctx.source, TimeSource::Default);
    }

    #[test]
    fn test_literal_time_takes_precedence() {
        let hints = LocaleHints {
            timezone: Some("Asia/Tokyo"),
            utc_offset: Some(-3.0),
            local_time: Some("14:05"),
        };
        let ctx = resolve(hints, now(), 8.0);
        assert_eq!(ctx.source, TimeSource::LocalTime);
        assert_eq!(ctx.band, GreetingBand::Afternoon);
        assert_eq!(ctx.clock(), "14:05");
        // Date still comes from the zone
        assert_eq!(ctx.date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let hints = LocaleHints { local_time: Some("23:59:10"), ..hints };
        assert_eq!(resolve(hints, now(), 8.0).band, GreetingBand::LateNight);
    }

    #[test]
    fn test_unparseable_literal_time_is_ignored() {
        let hints = LocaleHints {
            timezone: Some("UTC"),
            utc_offset: None,
            local_time: Some("quarter past"),
        };
        let ctx = resolve(hints, now(), 8.0);
        assert_eq!(ctx.source, TimeSource::Timezone);
        assert_eq!(ctx.band, GreetingBand::StillAwake);
    }
}
