use crate::calendar::{self, CalendarDate, Cell, MonthLayout};
use crate::config::{parse_weekday, Config};
use crate::model::{Note, NoteStore};
use crate::search::search as search_notes;
use crate::storage::{FilePreferences, PreferenceStore, StoreLocation};
use crate::ui;
use anyhow::{anyhow, bail, Result};
use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;

/// Resolved settings shared by every command.
pub struct Session {
    pub config: Config,
    pub location: StoreLocation,
}

impl Session {
    pub fn resolve(data: Option<PathBuf>, first_weekday: Option<String>) -> Result<Self> {
        let weekday = first_weekday.as_deref().map(parse_weekday).transpose()?;
        let config = Config::load().with_first_weekday(weekday);
        let location = StoreLocation::resolve(data)?;
        Ok(Session { config, location })
    }

    pub fn layout(&self) -> MonthLayout {
        MonthLayout::new(self.config.first_weekday)
    }

    pub fn open_store(&self) -> NoteStore<FilePreferences> {
        NoteStore::load(self.location.open())
    }
}

pub fn month(session: &Session, month: Option<String>) -> Result<()> {
    let reference = match month {
        Some(raw) => parse_month(&raw)?,
        None => calendar::today(),
    };
    let store = session.open_store();
    print!(
        "{}",
        render_month(&session.layout(), reference, &store, calendar::today())
    );
    Ok(())
}

pub fn show(session: &Session, date: String) -> Result<()> {
    let date = parse_date(&date)?;
    let store = session.open_store();
    match store.get(date) {
        Some(note) => print_note(note),
        None => println!("No note for {}", date.format("%Y-%m-%d")),
    }
    Ok(())
}

pub fn note(
    session: &Session,
    date: String,
    quick: Option<String>,
    detail: Option<String>,
) -> Result<()> {
    if quick.is_none() && detail.is_none() {
        bail!("nothing to save: pass --quick and/or --detail");
    }
    let date = parse_date(&date)?;
    let mut store = session.open_store();
    let mut saved = true;
    if let Some(text) = quick {
        saved &= store.save_quick_note(date, &text);
    }
    if let Some(text) = detail {
        saved &= store.save_detailed_note(date, &text);
    }
    if !saved {
        bail!(
            "could not write notes to {}",
            session.location.path.display()
        );
    }
    if let Some(note) = store.get(date) {
        println!("Saved note for {}", date.format("%Y-%m-%d"));
        print_note(note);
    }
    Ok(())
}

pub fn search(session: &Session, query: Option<String>) -> Result<()> {
    let store = session.open_store();
    let query = query.unwrap_or_default();
    let hits = search_notes(&store, &query);
    if hits.is_empty() {
        println!("No matching notes");
    }
    for note in hits {
        print_note(note);
    }
    Ok(())
}

pub fn tui(session: &Session) -> Result<()> {
    let store = session.open_store();
    ui::run(store, session)
}

/// Plain-text month grid. `*` marks today and `+` a day with a note.
pub fn render_month<P: PreferenceStore>(
    layout: &MonthLayout,
    reference: CalendarDate,
    store: &NoteStore<P>,
    today: CalendarDate,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:^35}\n", reference.format("%B %Y").to_string()));
    for symbol in layout.weekday_symbols() {
        out.push_str(&format!("{:<5}", symbol));
    }
    out.push('\n');
    for week in layout.weeks(reference) {
        let mut row = String::new();
        for cell in week {
            let text = match cell {
                Cell::Blank => String::new(),
                Cell::Day(date) => format!(
                    "{:>3}{}{}",
                    date.day(),
                    if calendar::is_today_at(date, today) { "*" } else { "" },
                    if store.has_note(date) { "+" } else { "" },
                ),
            };
            row.push_str(&format!("{:<5}", text));
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

fn parse_date(input: &str) -> Result<CalendarDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date (use YYYY-MM-DD): {}", input))
}

fn parse_month(input: &str) -> Result<CalendarDate> {
    NaiveDate::parse_from_str(&format!("{}-01", input.trim()), "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid month (use YYYY-MM): {}", input))
}

fn print_note(note: &Note) {
    println!("  - {} [{}]", note.date.format("%Y-%m-%d"), note.id);
    if !note.quick_note.is_empty() {
        println!("    {}", note.quick_note);
    }
    for line in note.detailed_note.lines() {
        println!("    | {}", line);
    }
}
