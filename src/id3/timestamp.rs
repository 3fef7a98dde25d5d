// Partial date/time values carried by ID3v2 timestamp frames

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};

/// Timestamp frames of ID3v2.4 (`yyyy[-MM[-dd[THH[:mm[:ss]]]]]`).
pub const V24_TIMESTAMP_FRAMES: [&str; 5] = ["TDRC", "TDRL", "TDOR", "TDEN", "TDTG"];

/// The ID3v2.3 frames that together hold a recording date.
pub const V23_DATE_FRAMES: [&str; 3] = ["TYER", "TDAT", "TIME"];

pub fn is_timestamp_frame(id: &str) -> bool {
    V24_TIMESTAMP_FRAMES.contains(&id) || V23_DATE_FRAMES.contains(&id)
}

/// A timestamp where every component after the first missing one is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub year: u16,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

impl Timestamp {
    pub fn year(year: u16) -> Self {
        Timestamp {
            year,
            ..Timestamp::default()
        }
    }

    /// Parse the ISO 8601 subset used by ID3v2.4. A space is accepted in
    /// place of the `T` separator.
    pub fn parse_iso(text: &str) -> Option<Self> {
        let text = text.trim();
        let (date, time) = match text.find(['T', ' ']) {
            Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
            None => (text, None),
        };

        let mut date_parts = date.split('-');
        let year = parse_component(date_parts.next()?, 4)?;
        let month = optional_component(date_parts.next())?;
        let day = optional_component(date_parts.next())?;
        if date_parts.next().is_some() || (day.is_some() && month.is_none()) {
            return None;
        }

        let (mut hour, mut minute, mut second) = (None, None, None);
        if let Some(time) = time {
            // A time only makes sense after a full date
            day?;
            let mut time_parts = time.split(':');
            hour = Some(parse_component(time_parts.next()?, 2)?);
            minute = optional_component(time_parts.next())?;
            second = optional_component(time_parts.next())?;
            if time_parts.next().is_some() || (second.is_some() && minute.is_none()) {
                return None;
            }
        }

        let timestamp = Timestamp {
            year: year as u16,
            month: month.map(|v| v as u8),
            day: day.map(|v| v as u8),
            hour: hour.map(|v| v as u8),
            minute: minute.map(|v| v as u8),
            second: second.map(|v| v as u8),
        };
        timestamp.is_valid().then_some(timestamp)
    }

    /// Check the components against the calendar.
    pub fn is_valid(&self) -> bool {
        let date_ok = match (self.month, self.day) {
            (Some(month), Some(day)) => {
                NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(month), u32::from(day))
                    .is_some()
            }
            (Some(month), None) => (1..=12).contains(&month),
            (None, None) => true,
            (None, Some(_)) => false,
        };
        let time_ok = match self.hour {
            Some(hour) => NaiveTime::from_hms_opt(
                u32::from(hour),
                u32::from(self.minute.unwrap_or(0)),
                u32::from(self.second.unwrap_or(0)),
            )
            .is_some(),
            None => self.minute.is_none() && self.second.is_none(),
        };
        date_ok && time_ok
    }

    /// Render as ISO text, stopping at the first absent component.
    pub fn to_iso(&self) -> String {
        let mut out = format!("{:04}", self.year);
        let Some(month) = self.month else { return out };
        out.push_str(&format!("-{month:02}"));
        let Some(day) = self.day else { return out };
        out.push_str(&format!("-{day:02}"));
        let Some(hour) = self.hour else { return out };
        out.push_str(&format!("T{hour:02}"));
        let Some(minute) = self.minute else { return out };
        out.push_str(&format!(":{minute:02}"));
        let Some(second) = self.second else { return out };
        out.push_str(&format!(":{second:02}"));
        out
    }

    /// `TYER` text: `yyyy`
    pub fn year_text(&self) -> String {
        format!("{:04}", self.year)
    }

    /// `TDAT` text: `DDMM`
    pub fn date_text(&self) -> Option<String> {
        Some(format!("{:02}{:02}", self.day?, self.month?))
    }

    /// `TIME` text: `HHMM`
    pub fn time_text(&self) -> Option<String> {
        Some(format!("{:02}{:02}", self.hour?, self.minute?))
    }

    /// Merge the ID3v2.3 frame texts. Parts that do not parse, or that come
    /// after a missing part, are ignored.
    pub fn from_v23(year: &str, date: Option<&str>, time: Option<&str>) -> Option<Self> {
        let mut timestamp = Timestamp::year(parse_component(year.trim(), 4)? as u16);

        if let Some((day, month)) = date.and_then(|d| split_pair(d.trim())) {
            let candidate = Timestamp {
                month: Some(month),
                day: Some(day),
                ..timestamp
            };
            if candidate.is_valid() {
                timestamp = candidate;
            }
        }

        if timestamp.day.is_some() {
            if let Some((hour, minute)) = time.and_then(|t| split_pair(t.trim())) {
                let candidate = Timestamp {
                    hour: Some(hour),
                    minute: Some(minute),
                    ..timestamp
                };
                if candidate.is_valid() {
                    timestamp = candidate;
                }
            }
        }

        Some(timestamp)
    }
}

impl FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timestamp::parse_iso(s).ok_or_else(|| format!("{s:?} is not a valid timestamp"))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

fn parse_component(text: &str, width: usize) -> Option<u32> {
    if text.len() == width && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// A two-digit component that may be missing. `None` means present but malformed.
fn optional_component(text: Option<&str>) -> Option<Option<u32>> {
    match text {
        Some(text) => parse_component(text, 2).map(Some),
        None => Some(None),
    }
}

fn split_pair(text: &str) -> Option<(u8, u8)> {
    if text.len() != 4 || !text.is_ascii() {
        return None;
    }
    let first = parse_component(&text[..2], 2)?;
    let second = parse_component(&text[2..], 2)?;
    Some((first as u8, second as u8))
}
