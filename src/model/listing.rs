//! Admin-side question listing: search terms, the `pub_date` list filter and
//! the year/month/day date hierarchy.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rocket::FromFormField;
use serde::Serialize;

/// A half-open range of timestamps, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date < self.end
    }

    /// The range covered by both `self` and `other`. May be empty.
    pub fn intersect(self, other: DateRange) -> DateRange {
        DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    fn days(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            start: midnight(from),
            end: midnight(to),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// First day of the month after `year`/`month`.
fn next_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

/// The choices offered by the admin's `pub_date` list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum PubDateFilter {
    #[field(value = "today")]
    Today,
    #[field(value = "past_7_days")]
    Past7Days,
    #[field(value = "this_month")]
    ThisMonth,
    #[field(value = "this_year")]
    ThisYear,
}

impl PubDateFilter {
    /// The UTC calendar range this filter selects, relative to `now`.
    pub fn range(self, now: DateTime<Utc>) -> DateRange {
        let today = now.date_naive();
        let tomorrow = today + Duration::days(1);
        match self {
            Self::Today => DateRange::days(today, tomorrow),
            Self::Past7Days => DateRange::days(today - Duration::days(7), tomorrow),
            Self::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                let next = next_month(today.year(), today.month()).unwrap_or(tomorrow);
                DateRange::days(first, next)
            }
            Self::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = today
                    .year()
                    .checked_add(1)
                    .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1))
                    .unwrap_or(tomorrow);
                DateRange::days(first, next)
            }
        }
    }
}

/// A position in the year → month → day drill-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateHierarchy {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateHierarchy {
    /// The range selected by this position, `Ok(None)` at the top level, or
    /// `Err` if the components do not form a real date (or skip a level).
    pub fn range(&self) -> Result<Option<DateRange>, String> {
        match (self.year, self.month, self.day) {
            (None, None, None) => Ok(None),
            (Some(year), None, None) => {
                let start = NaiveDate::from_ymd_opt(year, 1, 1);
                let end = year
                    .checked_add(1)
                    .and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1));
                match (start, end) {
                    (Some(start), Some(end)) => Ok(Some(DateRange::days(start, end))),
                    _ => Err(format!("Invalid year {year}")),
                }
            }
            (Some(year), Some(month), None) => {
                let start = NaiveDate::from_ymd_opt(year, month, 1);
                let end = next_month(year, month);
                match (start, end) {
                    (Some(start), Some(end)) => Ok(Some(DateRange::days(start, end))),
                    _ => Err(format!("Invalid month {year}-{month}")),
                }
            }
            (Some(year), Some(month), Some(day)) => {
                let date = NaiveDate::from_ymd_opt(year, month, day);
                match date.and_then(|date| Some((date, date.succ_opt()?))) {
                    Some((date, next)) => Ok(Some(DateRange::days(date, next))),
                    None => Err(format!("Invalid date {year}-{month}-{day}")),
                }
            }
            _ => Err("Date hierarchy must be narrowed year, then month, then day".to_string()),
        }
    }

    /// The distinct values one level below this position among `dates`,
    /// in ascending order. Empty once a single day is selected.
    pub fn drill_down(&self, dates: impl IntoIterator<Item = DateTime<Utc>>) -> DateDrillDown {
        let level = match (self.year, self.month, self.day) {
            (None, _, _) => DateLevel::Year,
            (Some(_), None, _) => DateLevel::Month,
            (Some(_), Some(_), None) => DateLevel::Day,
            (Some(_), Some(_), Some(_)) => {
                return DateDrillDown {
                    level: DateLevel::Day,
                    values: Vec::new(),
                }
            }
        };
        let mut values: Vec<i32> = dates
            .into_iter()
            .map(|date| match level {
                DateLevel::Year => date.year(),
                DateLevel::Month => date.month() as i32,
                DateLevel::Day => date.day() as i32,
            })
            .collect();
        values.sort_unstable();
        values.dedup();
        DateDrillDown { level, values }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateLevel {
    Year,
    Month,
    Day,
}

/// The next level of the date hierarchy, for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateDrillDown {
    pub level: DateLevel,
    pub values: Vec<i32>,
}

/// Which questions an admin listing should select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionQuery {
    /// Each term must appear in the question text, ignoring case.
    pub search_terms: Vec<String>,
    /// Only questions published within this range.
    pub range: Option<DateRange>,
}

impl QuestionQuery {
    /// Split a raw search box value into terms.
    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search_terms = search
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        self
    }

    /// Narrow the date range, intersecting with any existing restriction.
    pub fn with_range(mut self, range: Option<DateRange>) -> Self {
        if let Some(range) = range {
            self.range = Some(match self.range {
                Some(existing) => existing.intersect(range),
                None => range,
            });
        }
        self
    }

    /// Does the given question text and publication date satisfy this query?
    pub fn matches(&self, question_text: &str, pub_date: DateTime<Utc>) -> bool {
        let text = question_text.to_lowercase();
        self.search_terms
            .iter()
            .all(|term| text.contains(&term.to_lowercase()))
            && self.range.map_or(true, |range| range.contains(pub_date))
    }
}
