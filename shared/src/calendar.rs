//! Month-grid layout for the calendar view.
//!
//! Turns a target month plus a flat event list into the cell sequence the
//! dashboard paints: leading/trailing cells borrowed from adjacent months,
//! one cell per day with its date-bucketed events, and a per-cell display
//! cap with an overflow count.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{CalendarEvent, EventTag};
use crate::{Error, Result};

/// Honorific stripped from customer names when shortening labels.
const HONORIFIC: &str = "様";

/// Most events shown in one day cell before collapsing into an overflow count.
const MAX_VISIBLE_EVENTS: usize = 3;

/// A rendered month.
#[derive(Debug, Serialize)]
pub struct MonthGrid {
    /// Heading, e.g. `2025年2月`.
    pub title: String,
    /// Cells in display order, Sunday first; always a multiple of seven,
    /// but 4, 5, or 6 rows depending on the month.
    pub cells: Vec<DayCell>,
}

/// One cell of the month grid.
#[derive(Debug, Serialize)]
pub struct DayCell {
    pub day: u32,
    /// False for the leading/trailing cells borrowed from adjacent months.
    pub in_month: bool,
    pub today: bool,
    pub events: Vec<EventEntry>,
    /// Events hidden beyond the display cap; rendered as `+N`.
    pub overflow: usize,
}

impl DayCell {
    fn adjacent(day: u32) -> Self {
        Self {
            day,
            in_month: false,
            today: false,
            events: Vec::new(),
            overflow: 0,
        }
    }
}

/// A single visible event inside a day cell.
#[derive(Debug, Serialize)]
pub struct EventEntry {
    /// Family-name shorthand plus task label, for the cell itself.
    pub short_label: String,
    /// Full customer name plus task label, for tooltips.
    pub full_label: String,
    pub tag: EventTag,
}

impl EventEntry {
    fn from_event(event: &CalendarEvent) -> Self {
        Self {
            short_label: format!("{} {}", short_customer(&event.customer), event.label),
            full_label: format!("{} {}", event.customer, event.label),
            tag: event.tag,
        }
    }
}

/// Lay out `year`/`month` as a grid of day cells.
///
/// `today` is the caller's current date; the matching in-month cell is
/// marked. Out-of-range year/month is rejected.
pub fn render(
    year: i32,
    month: u32,
    events: &[CalendarEvent],
    today: NaiveDate,
) -> Result<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::Validation(format!("Invalid month: {}-{}", year, month)))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::Validation(format!("Month out of range: {}-{}", year, month)))?;

    let prev_last = prev_day(first)?;
    let first_weekday = first.weekday().num_days_from_sunday();
    let last_day = prev_day(next_first)?.day();

    let mut by_date: HashMap<NaiveDate, Vec<&CalendarEvent>> = HashMap::new();
    for event in events {
        by_date.entry(event.date).or_default().push(event);
    }

    let mut cells = Vec::with_capacity((first_weekday + last_day) as usize + 6);

    // Trailing days of the previous month.
    for offset in 0..first_weekday {
        cells.push(DayCell::adjacent(
            prev_last.day() - first_weekday + 1 + offset,
        ));
    }

    for date in first.iter_days().take(last_day as usize) {
        let bucket = by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let overflow = bucket.len().saturating_sub(MAX_VISIBLE_EVENTS);
        let shown = if overflow > 0 {
            &bucket[..MAX_VISIBLE_EVENTS]
        } else {
            bucket
        };

        cells.push(DayCell {
            day: date.day(),
            in_month: true,
            today: date == today,
            events: shown.iter().map(|e| EventEntry::from_event(e)).collect(),
            overflow,
        });
    }

    // Leading days of the next month, up to the row boundary.
    let trailing = (7 - (first_weekday + last_day) % 7) % 7;
    for day in 1..=trailing {
        cells.push(DayCell::adjacent(day));
    }

    Ok(MonthGrid {
        title: format!("{}年{}月", year, month),
        cells,
    })
}

fn prev_day(date: NaiveDate) -> Result<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| Error::Validation(format!("Date out of range: {}", date)))
}

/// Family-name shorthand: strip the trailing honorific, take the first
/// whitespace-delimited segment, and re-attach the honorific.
pub fn short_customer(name: &str) -> String {
    let name = name.trim();
    let stripped = name.strip_suffix(HONORIFIC).unwrap_or(name);
    match stripped.split_whitespace().next() {
        Some(family) => format!("{}{}", family, HONORIFIC),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event_on(day: NaiveDate, label: &str) -> CalendarEvent {
        CalendarEvent {
            date: day,
            customer: "山田 太郎様".to_string(),
            label: label.to_string(),
            tag: EventTag::Task,
            project_id: 1,
        }
    }

    #[test]
    fn test_february_2025_pads_to_five_rows() {
        // Feb 1, 2025 is a Saturday.
        let grid = render(2025, 2, &[], date(2025, 1, 15)).unwrap();

        let leading: Vec<&DayCell> = grid.cells.iter().take_while(|c| !c.in_month).collect();
        assert_eq!(leading.len(), 6);
        assert_eq!(
            leading.iter().map(|c| c.day).collect::<Vec<_>>(),
            vec![26, 27, 28, 29, 30, 31]
        );

        let in_month = grid.cells.iter().filter(|c| c.in_month).count();
        assert_eq!(in_month, 28);

        assert_eq!(grid.cells.len() % 7, 0);
        assert_eq!(grid.cells.len(), 35);
        assert_eq!(grid.title, "2025年2月");
    }

    #[test]
    fn test_february_2026_fits_exactly_four_rows() {
        // Feb 1, 2026 is a Sunday; 28 days fill the grid with no padding.
        let grid = render(2026, 2, &[], date(2026, 2, 1)).unwrap();

        assert_eq!(grid.cells.len(), 28);
        assert!(grid.cells.iter().all(|c| c.in_month));
        assert!(grid.cells[0].today);
    }

    #[test]
    fn test_may_2026_needs_six_rows() {
        // May 1, 2026 is a Friday; 5 leading + 31 + 6 trailing = 42 cells.
        let grid = render(2026, 5, &[], date(2026, 5, 20)).unwrap();

        assert_eq!(grid.cells.len(), 42);
        assert_eq!(grid.cells[0].day, 26);
        assert!(!grid.cells[0].in_month);
        let last = grid.cells.last().unwrap();
        assert_eq!(last.day, 6);
        assert!(!last.in_month);
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let grid = render(2025, 12, &[], date(2025, 12, 31)).unwrap();

        assert_eq!(grid.cells.iter().filter(|c| c.in_month).count(), 31);
        assert_eq!(grid.cells.len() % 7, 0);
    }

    #[test]
    fn test_invalid_month_rejected() {
        assert!(render(2025, 13, &[], date(2025, 1, 1)).is_err());
        assert!(render(2025, 0, &[], date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_events_bucket_by_date_with_overflow() {
        let day = date(2025, 2, 10);
        let events: Vec<CalendarEvent> = (0..5)
            .map(|i| event_on(day, &format!("タスク{}", i)))
            .collect();

        let grid = render(2025, 2, &events, date(2025, 2, 1)).unwrap();
        let cell = grid
            .cells
            .iter()
            .find(|c| c.in_month && c.day == 10)
            .unwrap();

        assert_eq!(cell.events.len(), 3);
        assert_eq!(cell.overflow, 2);
        assert_eq!(cell.events[0].short_label, "山田様 タスク0");

        let quiet = grid
            .cells
            .iter()
            .find(|c| c.in_month && c.day == 11)
            .unwrap();
        assert!(quiet.events.is_empty());
        assert_eq!(quiet.overflow, 0);
    }

    #[test]
    fn test_today_only_marks_the_matching_in_month_cell() {
        let grid = render(2025, 2, &[], date(2025, 2, 14)).unwrap();

        let marked: Vec<u32> = grid
            .cells
            .iter()
            .filter(|c| c.today)
            .map(|c| c.day)
            .collect();
        assert_eq!(marked, vec![14]);
    }

    #[test]
    fn test_short_customer_takes_family_name() {
        assert_eq!(short_customer("山田 太郎様"), "山田様");
        assert_eq!(short_customer("山田太郎様"), "山田太郎様");
        assert_eq!(short_customer("山田様"), "山田様");
    }

    #[test]
    fn test_entry_labels_combine_customer_and_task() {
        let event = event_on(date(2025, 2, 10), "上棟");
        let entry = EventEntry::from_event(&event);

        assert_eq!(entry.short_label, "山田様 上棟");
        assert_eq!(entry.full_label, "山田 太郎様 上棟");
    }
}
