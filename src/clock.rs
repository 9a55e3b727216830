//! Wall time and the 12-hour time codes used to index clock photographs

use std::fmt;

/// Minutes on the 12-hour dial expressed in time code units, 12:00 wraps to 1:00
pub const DIAL_PERIOD: u16 = 1200;

/// Wall clock reading in 24-hour form, as read from the RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
}

impl WallTime {
    /// Returns `None` for readings outside 00:00..=23:59
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// `HH:MM` in 24-hour form, which is what the poem service expects
    pub fn time24(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn time_code(&self) -> TimeCode {
        let hour12 = match self.hour % 12 {
            0 => 12,
            hour => hour,
        };
        TimeCode(hour12 as u16 * 100 + self.minute as u16)
    }
}

/// A 12-hour clock reading encoded as `hour * 100 + minute`
///
/// Hour is 1..=12 and minute 0..=59, so 12:05 is `1205` and 1:05 is `105`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeCode(u16);

impl TimeCode {
    pub fn new(code: u16) -> Option<Self> {
        let hour = code / 100;
        let minute = code % 100;
        ((1..=12).contains(&hour) && minute < 60).then_some(Self(code))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Distance on the circular dial: the shorter of the direct gap and the wrapped gap
    pub fn distance(&self, other: TimeCode) -> u16 {
        let diff = self.0.abs_diff(other.0);
        let wrapped = DIAL_PERIOD.saturating_sub(diff);
        if wrapped > 0 && wrapped < diff {
            wrapped
        } else {
            diff
        }
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}
