//! Month grid layout and day-level navigation.

use chrono::{Datelike, Duration, Local, Months, NaiveDate, Weekday};

/// A day-granular calendar date. Time of day never takes part in equality.
pub type CalendarDate = NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Blank,
    Day(CalendarDate),
}

impl Cell {
    pub fn date(&self) -> Option<CalendarDate> {
        match self {
            Cell::Blank => None,
            Cell::Day(date) => Some(*date),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Blank)
    }
}

/// Lays out months as rows of seven cells starting at `first_weekday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthLayout {
    first_weekday: Weekday,
}

impl Default for MonthLayout {
    fn default() -> Self {
        MonthLayout::new(Weekday::Sun)
    }
}

impl MonthLayout {
    pub fn new(first_weekday: Weekday) -> Self {
        MonthLayout { first_weekday }
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    /// Cells for the month containing `reference`: leading blanks, every day
    /// of the month in order, then trailing blanks up to a full week.
    pub fn days_for_month(&self, reference: CalendarDate) -> Vec<Cell> {
        let (year, month) = (reference.year(), reference.month());
        let days = days_in_month(year, month) as usize;
        let leading = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(first) => self.column_of(first.weekday()),
            None => 0,
        };
        let filled = (leading + days) % 7;
        let trailing = if filled == 0 { 0 } else { 7 - filled };

        let mut cells = Vec::with_capacity(leading + days + trailing);
        cells.extend(std::iter::repeat(Cell::Blank).take(leading));
        cells.extend(
            (1..=days as u32)
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .map(Cell::Day),
        );
        cells.extend(std::iter::repeat(Cell::Blank).take(trailing));
        cells
    }

    pub fn weeks(&self, reference: CalendarDate) -> Vec<Vec<Cell>> {
        self.days_for_month(reference)
            .chunks(7)
            .map(|week| week.to_vec())
            .collect()
    }

    /// Grid column (0..7) a weekday lands in.
    pub fn column_of(&self, weekday: Weekday) -> usize {
        let start = self.first_weekday.num_days_from_sunday();
        ((weekday.num_days_from_sunday() + 7 - start) % 7) as usize
    }

    pub fn weekday_symbols(&self) -> [&'static str; 7] {
        let mut symbols = [""; 7];
        let mut day = self.first_weekday;
        for slot in symbols.iter_mut() {
            *slot = weekday_symbol(day);
            day = day.succ();
        }
        symbols
    }
}

/// Months outside 1..=12 are clamped into range first.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month.clamp(1, 12) {
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// One calendar month earlier, clamping the day when the target month is
/// shorter. Dates at the edge of the representable range stay put.
pub fn previous_month(date: CalendarDate) -> CalendarDate {
    date.checked_sub_months(Months::new(1)).unwrap_or(date)
}

pub fn next_month(date: CalendarDate) -> CalendarDate {
    date.checked_add_months(Months::new(1)).unwrap_or(date)
}

/// The 1st of the given month. Out-of-range input is clamped, never rejected.
pub fn jump_to_year_month(year: i32, month: u32) -> CalendarDate {
    let year = year.clamp(NaiveDate::MIN.year(), NaiveDate::MAX.year());
    let month = month.clamp(1, 12);
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn today() -> CalendarDate {
    Local::now().date_naive()
}

pub fn is_today(date: CalendarDate) -> bool {
    is_today_at(date, today())
}

pub fn is_today_at(date: CalendarDate, today: CalendarDate) -> bool {
    date == today
}

pub fn is_selected(date: CalendarDate, selected: Option<CalendarDate>) -> bool {
    selected == Some(date)
}

fn weekday_symbol(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

/// The month on screen plus the optional selected day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthContext {
    reference: CalendarDate,
    selected: Option<CalendarDate>,
}

impl MonthContext {
    pub fn new(reference: CalendarDate) -> Self {
        MonthContext {
            reference,
            selected: None,
        }
    }

    pub fn reference(&self) -> CalendarDate {
        self.reference
    }

    pub fn selected(&self) -> Option<CalendarDate> {
        self.selected
    }

    pub fn previous_month(&mut self) {
        self.reference = previous_month(self.reference);
    }

    pub fn next_month(&mut self) {
        self.reference = next_month(self.reference);
    }

    pub fn jump_to(&mut self, year: i32, month: u32) {
        self.reference = jump_to_year_month(year, month);
    }

    /// Selects a day. A day outside the displayed month also moves the
    /// reference date so the selection stays visible.
    pub fn select(&mut self, date: CalendarDate) {
        if !same_month(date, self.reference) {
            self.reference = date;
        }
        self.selected = Some(date);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Moves the selection by whole days, starting from the 1st of the
    /// displayed month when nothing is selected yet.
    pub fn move_selection(&mut self, days: i64) {
        let origin = self
            .selected
            .unwrap_or_else(|| jump_to_year_month(self.reference.year(), self.reference.month()));
        let target = if self.selected.is_none() {
            origin
        } else {
            origin
                .checked_add_signed(Duration::days(days))
                .unwrap_or(origin)
        };
        self.select(target);
    }

    pub fn month_label(&self) -> String {
        self.reference.format("%B %Y").to_string()
    }
}

fn same_month(a: CalendarDate, b: CalendarDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}
