//! Institutional office hours.
//!
//! Hours are evaluated in the institution's local time, expressed as a fixed
//! UTC offset. Each window is start-inclusive, end-exclusive: with the
//! default 09:00-17:00 window, 09:00:00 is open and 17:00:00 is closed.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};

/// One open interval on one weekday.
///
/// `end` of `None` keeps the window open until midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowSpec", into = "WindowSpec")]
pub struct OfficeWindow {
    weekday: Weekday,
    start: NaiveTime,
    end: Option<NaiveTime>,
}

#[derive(Serialize, Deserialize)]
struct WindowSpec {
    weekday: Weekday,
    start: NaiveTime,
    #[serde(default)]
    end: Option<NaiveTime>,
}

impl TryFrom<WindowSpec> for OfficeWindow {
    type Error = PolicyError;

    fn try_from(spec: WindowSpec) -> Result<Self> {
        match spec.end {
            Some(end) => Self::new(spec.weekday, spec.start, end),
            None => Ok(Self::until_midnight(spec.weekday, spec.start)),
        }
    }
}

impl From<OfficeWindow> for WindowSpec {
    fn from(w: OfficeWindow) -> Self {
        Self {
            weekday: w.weekday,
            start: w.start,
            end: w.end,
        }
    }
}

impl OfficeWindow {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(PolicyError::EmptyWindow);
        }
        Ok(Self {
            weekday,
            start,
            end: Some(end),
        })
    }

    /// A window from `start` to the end of the day.
    pub fn until_midnight(weekday: Weekday, start: NaiveTime) -> Self {
        Self {
            weekday,
            start,
            end: None,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    /// `None` means midnight.
    pub fn end(&self) -> Option<NaiveTime> {
        self.end
    }

    fn contains(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.weekday == weekday && self.start <= time && self.end.map_or(true, |end| time < end)
    }
}

/// Weekly office-hours schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeHours {
    /// Offset of institution local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
    pub windows: Vec<OfficeWindow>,
}

const WORK_WEEK: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

impl Default for OfficeHours {
    /// Monday to Friday, 09:00 to 17:00 UTC.
    fn default() -> Self {
        let start = NaiveTime::MIN + Duration::hours(9);
        let end = NaiveTime::MIN + Duration::hours(17);
        Self {
            utc_offset_minutes: 0,
            windows: WORK_WEEK
                .into_iter()
                .map(|weekday| OfficeWindow {
                    weekday,
                    start,
                    end: Some(end),
                })
                .collect(),
        }
    }
}

impl OfficeHours {
    /// Monday to Friday, `start_hour` to `end_hour` local time.
    ///
    /// `end_hour` may be 24 for a window that runs to midnight. Fails with
    /// [`PolicyError::EmptyWindow`] unless `start_hour < end_hour <= 24`.
    pub fn weekdays(utc_offset_minutes: i32, start_hour: u32, end_hour: u32) -> Result<Self> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(PolicyError::EmptyWindow);
        }
        let start = NaiveTime::from_hms_opt(start_hour, 0, 0).ok_or(PolicyError::EmptyWindow)?;
        let windows = WORK_WEEK
            .into_iter()
            .map(|weekday| match NaiveTime::from_hms_opt(end_hour, 0, 0) {
                Some(end) => OfficeWindow::new(weekday, start, end),
                None => Ok(OfficeWindow::until_midnight(weekday, start)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            utc_offset_minutes,
            windows,
        })
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }

    /// Whether `now` falls inside any window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset());
        let (weekday, time) = (local.weekday(), local.time());
        self.windows.iter().any(|w| w.contains(weekday, time))
    }

    /// The earliest instant at or after `now` when hours are open.
    ///
    /// Returns `now` itself when already open, and `None` for an empty
    /// schedule.
    pub fn next_opening(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.contains(now) {
            return Some(now);
        }

        let offset = self.offset();
        let local = now.with_timezone(&offset);
        (0..=7)
            .flat_map(|days| {
                let date = local.date_naive() + Duration::days(days);
                self.windows
                    .iter()
                    .filter(move |w| w.weekday == date.weekday())
                    .filter_map(move |w| offset.from_local_datetime(&date.and_time(w.start)).single())
            })
            .filter(|candidate| *candidate >= local)
            .min()
            .map(|opening| opening.with_timezone(&Utc))
    }
}
