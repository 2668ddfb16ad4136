//! User input resolution: search terms, rover selection, and date ranges.
//!
//! Every constructor here either yields a value that is safe to send
//! upstream or an [`InputError`] whose `Display` is the prompt shown on the
//! status line. Failing here means no remote call is made.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;

/// Inclusive day counts above this are rejected.
///
/// The feed allows seven days, but the check has always compared the
/// inclusive count against eight, so a start/end pair seven days apart is
/// still accepted.
pub const MAX_INCLUSIVE_DAYS: i64 = 8;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    EmptyQuery,
    MissingDates,
    BadDate(String),
    EndBeforeStart,
    RangeTooLong { days: i64 },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::EmptyQuery => write!(f, "Please type a search term (e.g. Saturn)."),
            InputError::MissingDates => write!(f, "Please select both start and end dates."),
            InputError::BadDate(_) => write!(f, "Please enter dates as YYYY-MM-DD."),
            InputError::EndBeforeStart => {
                write!(f, "The end date must not be before the start date.")
            }
            InputError::RangeTooLong { .. } => {
                write!(f, "Please choose a date range of 7 days or less.")
            }
        }
    }
}

impl std::error::Error for InputError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let q = raw.trim();
        if q.is_empty() {
            return Err(InputError::EmptyQuery);
        }
        Ok(Self(q.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Rover {
    #[default]
    Curiosity,
    Perseverance,
    Opportunity,
    Spirit,
}

impl Rover {
    pub const ALL: [Rover; 4] = [
        Rover::Curiosity,
        Rover::Perseverance,
        Rover::Opportunity,
        Rover::Spirit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rover::Curiosity => "Curiosity",
            Rover::Perseverance => "Perseverance",
            Rover::Opportunity => "Opportunity",
            Rover::Spirit => "Spirit",
        }
    }

    /// Free-text query sent to the image library.
    pub fn keyword(self) -> String {
        format!("{} rover", self.name())
    }

    pub fn index(self) -> usize {
        Rover::ALL.iter().position(|r| *r == self).unwrap_or(0)
    }
}

impl fmt::Display for Rover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Rover::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown rover '{s}' (expected one of: {})",
                    Rover::ALL.map(Rover::name).join(", ")
                )
            })
    }
}

impl TryFrom<String> for Rover {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if end < start {
            return Err(InputError::EndBeforeStart);
        }
        let days = inclusive_days(start, end);
        if days > MAX_INCLUSIVE_DAYS {
            return Err(InputError::RangeTooLong { days });
        }
        Ok(Self { start, end })
    }

    /// Resolves the two raw date fields. Blank fields count as missing and
    /// are reported before any parse error.
    pub fn parse(start: &str, end: &str) -> Result<Self, InputError> {
        let (start, end) = (start.trim(), end.trim());
        if start.is_empty() || end.is_empty() {
            return Err(InputError::MissingDates);
        }
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        Self::new(start, end)
    }

    pub fn days(&self) -> i64 {
        inclusive_days(self.start, self.end)
    }

    pub fn start_param(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| InputError::BadDate(raw.to_string()))
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_trimmed_and_must_not_be_blank() {
        assert_eq!(SearchQuery::parse("  Saturn ").unwrap().as_str(), "Saturn");
        assert_eq!(SearchQuery::parse("   "), Err(InputError::EmptyQuery));
        assert_eq!(
            InputError::EmptyQuery.to_string(),
            "Please type a search term (e.g. Saturn)."
        );
    }

    #[test]
    fn seven_day_span_is_accepted() {
        let r = DateRange::parse("2024-01-01", "2024-01-07").unwrap();
        assert_eq!(r.days(), 7);
        assert_eq!(r.start_param(), "2024-01-01");
        assert_eq!(r.end_param(), "2024-01-07");
    }

    #[test]
    fn inclusive_count_of_eight_is_still_accepted() {
        let r = DateRange::parse("2024-01-01", "2024-01-08").unwrap();
        assert_eq!(r.days(), 8);
    }

    #[test]
    fn inclusive_count_above_eight_is_rejected() {
        let err = DateRange::parse("2024-01-01", "2024-01-09").unwrap_err();
        assert_eq!(err, InputError::RangeTooLong { days: 9 });
        assert_eq!(
            err.to_string(),
            "Please choose a date range of 7 days or less."
        );
    }

    #[test]
    fn missing_dates_win_over_malformed_ones() {
        assert_eq!(
            DateRange::parse("", "garbage"),
            Err(InputError::MissingDates)
        );
        assert_eq!(
            DateRange::parse("2024-01-01", "01/02/2024"),
            Err(InputError::BadDate("01/02/2024".into()))
        );
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert_eq!(
            DateRange::parse("2024-01-05", "2024-01-01"),
            Err(InputError::EndBeforeStart)
        );
    }

    #[test]
    fn same_day_range_counts_one_day() {
        assert_eq!(DateRange::parse("2024-03-01", "2024-03-01").unwrap().days(), 1);
    }

    #[test]
    fn rover_parsing_is_case_insensitive() {
        assert_eq!("spirit".parse::<Rover>().unwrap(), Rover::Spirit);
        assert_eq!(Rover::Perseverance.keyword(), "Perseverance rover");
        assert!("sojourner".parse::<Rover>().is_err());
    }
}
