//! Narrowing the event list by title and by relative date window.
//!
//! Both predicates are pure and are combined with AND, so the order they are applied in does not matter. The output
//! keeps the input order.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use event_utils::{DateFilterCriterion, Event};

/// Filters against the wall clock in the local time zone.
pub fn filter(events: &[Event], search_term: &str, criterion: DateFilterCriterion) -> Vec<Event> {
    filter_at(events, search_term, criterion, &Local::now())
}

/// Like [`filter`], with an explicit "now". Calendar days are taken in `now`'s time zone.
pub fn filter_at<Tz: TimeZone>(
    events: &[Event],
    search_term: &str,
    criterion: DateFilterCriterion,
    now: &DateTime<Tz>,
) -> Vec<Event> {
    let needle = search_term.to_lowercase();
    let window = DateWindow::new(criterion, now.date_naive());
    let tz = now.timezone();

    events
        .iter()
        .filter(|event| needle.is_empty() || event.title.to_lowercase().contains(&needle))
        .filter(|event| window.contains(event, &tz))
        .cloned()
        .collect()
}

/// The calendar day an event falls on in `tz`. Instants are converted; zone-less values are already wall-clock time.
pub fn local_date<Tz: TimeZone>(date_time: &str, tz: &Tz) -> Option<NaiveDate> {
    let date_time = date_time.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(date_time) {
        return Some(instant.with_timezone(tz).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date_time, format) {
            return Some(naive.date());
        }
    }
    NaiveDate::parse_from_str(date_time, "%Y-%m-%d").ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DateWindow {
    Any,
    /// Inclusive on both ends
    Days(NaiveDate, NaiveDate),
    Month { year: i32, month: u32 },
}

impl DateWindow {
    fn new(criterion: DateFilterCriterion, today: NaiveDate) -> Self {
        // weeks start on Sunday
        let week_start =
            || today - TimeDelta::days(i64::from(today.weekday().num_days_from_sunday()));

        match criterion {
            DateFilterCriterion::All => DateWindow::Any,
            DateFilterCriterion::Today => DateWindow::Days(today, today),
            DateFilterCriterion::CurrentWeek => {
                let start = week_start();
                DateWindow::Days(start, start + TimeDelta::days(6))
            }
            DateFilterCriterion::LastWeek => {
                let start = week_start() - TimeDelta::days(7);
                DateWindow::Days(start, start + TimeDelta::days(6))
            }
            DateFilterCriterion::CurrentMonth => DateWindow::Month {
                year: today.year(),
                month: today.month(),
            },
            DateFilterCriterion::LastMonth => {
                if today.month() == 1 {
                    DateWindow::Month {
                        year: today.year() - 1,
                        month: 12,
                    }
                } else {
                    DateWindow::Month {
                        year: today.year(),
                        month: today.month() - 1,
                    }
                }
            }
        }
    }

    fn contains<Tz: TimeZone>(&self, event: &Event, tz: &Tz) -> bool {
        if *self == DateWindow::Any {
            return true;
        }
        let Some(day) = event
            .date_time
            .as_deref()
            .and_then(|date_time| local_date(date_time, tz))
        else {
            return false;
        };

        match *self {
            DateWindow::Any => true,
            DateWindow::Days(start, end) => start <= day && day <= end,
            DateWindow::Month { year, month } => day.year() == year && day.month() == month,
        }
    }
}
