use crate::calendar::{self, CalendarDate, Cell, MonthContext, MonthLayout};
use crate::commands::Session;
use crate::model::{NoteStore, QUICK_NOTE_LIMIT};
use crate::search::{preview, search};
use crate::storage::{FilePreferences, PreferenceStore};
use crate::theme::{Palette, Season, ThemeWatcher};
use crate::tutorial::{self, Step, Tutorial, PAGES};
use anyhow::Result;
use chrono::Datelike;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

const PICKER_FIRST_YEAR: i32 = 1970;
const PICKER_LAST_YEAR: i32 = 2070;

pub fn run(store: NoteStore<FilePreferences>, session: &Session) -> Result<()> {
    let show_tutorial = session.config.show_tutorial && !tutorial::has_seen(store.prefs());
    let mut app = App::new(
        store,
        session.layout(),
        calendar::today(),
        show_tutorial,
        session.location.path.display().to_string(),
    );
    let mut terminal = setup_terminal()?;
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App<P: PreferenceStore> {
    store: NoteStore<P>,
    layout: MonthLayout,
    month: MonthContext,
    today: CalendarDate,
    theme: ThemeWatcher,
    season_changes: Receiver<Season>,
    data_label: String,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    QuickNote {
        date: CalendarDate,
        field: FieldValue,
    },
    DetailedNote {
        date: CalendarDate,
        field: FieldValue,
    },
    Search(SearchState),
    Picker(PickerState),
    Tutorial(Tutorial),
}

struct SearchState {
    query: FieldValue,
    selected: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum PickerField {
    Year,
    Month,
}

#[derive(Debug)]
struct PickerState {
    year: i32,
    month: u32,
    field: PickerField,
}

impl PickerState {
    fn new(reference: CalendarDate) -> Self {
        PickerState {
            year: reference.year().clamp(PICKER_FIRST_YEAR, PICKER_LAST_YEAR),
            month: reference.month(),
            field: PickerField::Year,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            PickerField::Year => PickerField::Month,
            PickerField::Month => PickerField::Year,
        };
    }

    fn adjust(&mut self, delta: i32) {
        match self.field {
            PickerField::Year => {
                self.year = (self.year + delta).clamp(PICKER_FIRST_YEAR, PICKER_LAST_YEAR);
            }
            PickerField::Month => {
                self.month = ((self.month as i32 - 1 + delta).rem_euclid(12) + 1) as u32;
            }
        }
    }
}

#[derive(Clone, Debug)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl<P: PreferenceStore> App<P> {
    fn new(
        store: NoteStore<P>,
        layout: MonthLayout,
        today: CalendarDate,
        show_tutorial: bool,
        data_label: String,
    ) -> Self {
        let mut theme = ThemeWatcher::new(today);
        let season_changes = theme.subscribe();
        let status = format!("Loaded {} notes from {}", store.len(), data_label);
        let mode = if show_tutorial {
            Mode::Tutorial(Tutorial::new())
        } else {
            Mode::Normal
        };
        App {
            store,
            layout,
            month: MonthContext::new(today),
            today,
            theme,
            season_changes,
            data_label,
            last_save: Instant::now(),
            status,
            mode,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.today = calendar::today();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let (quit, next) = match mode {
            Mode::Normal => (self.handle_normal_key(key), None),
            Mode::QuickNote { date, mut field } => {
                let keep = self.handle_quick_key(date, &mut field, key);
                (false, keep.then_some(Mode::QuickNote { date, field }))
            }
            Mode::DetailedNote { date, mut field } => {
                let keep = self.handle_detailed_key(date, &mut field, key);
                (false, keep.then_some(Mode::DetailedNote { date, field }))
            }
            Mode::Search(mut state) => {
                let keep = self.handle_search_key(&mut state, key);
                (false, keep.then_some(Mode::Search(state)))
            }
            Mode::Picker(mut state) => {
                let keep = self.handle_picker_key(&mut state, key);
                (false, keep.then_some(Mode::Picker(state)))
            }
            Mode::Tutorial(mut pager) => {
                let keep = self.handle_tutorial_key(&mut pager, key);
                (false, keep.then_some(Mode::Tutorial(pager)))
            }
        };
        // Keys in Normal mode may open a new overlay; don't clobber it.
        if let Some(mode) = next {
            self.mode = mode;
        }
        self.sync_theme();
        Ok(quit)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => self.month.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.month.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.month.move_selection(-7),
            KeyCode::Down | KeyCode::Char('j') => self.month.move_selection(7),
            KeyCode::Char('[') | KeyCode::PageUp => {
                self.month.previous_month();
                self.status = format!("Showing {}", self.month.month_label());
            }
            KeyCode::Char(']') | KeyCode::PageDown => {
                self.month.next_month();
                self.status = format!("Showing {}", self.month.month_label());
            }
            KeyCode::Char('t') => {
                self.month.select(self.today);
                self.status = "Jumped to today".into();
            }
            KeyCode::Char('g') => {
                self.mode = Mode::Picker(PickerState::new(self.month.reference()));
                self.status = "Pick a month (←→ field, ↑↓ change, Enter go, Esc cancel)".into();
            }
            KeyCode::Enter | KeyCode::Char('i') => self.open_quick_note(),
            KeyCode::Char('e') => self.open_detailed_note(),
            KeyCode::Char('/') => {
                self.mode = Mode::Search(SearchState {
                    query: FieldValue::new(""),
                    selected: 0,
                });
                self.status = "Search notes (↑↓ browse, Enter open, Esc close)".into();
            }
            KeyCode::Char('?') => self.mode = Mode::Tutorial(Tutorial::new()),
            KeyCode::Esc => self.month.clear_selection(),
            _ => {}
        }
        false
    }

    fn open_quick_note(&mut self) {
        let Some(date) = self.month.selected() else {
            self.status = "Select a day first".into();
            return;
        };
        let text = self
            .store
            .get(date)
            .map(|n| n.quick_note.as_str())
            .unwrap_or("");
        self.mode = Mode::QuickNote {
            date,
            field: FieldValue::new(text),
        };
        self.status = format!(
            "Quick note for {} (saved as you type, Enter/Esc done)",
            date.format("%Y-%m-%d")
        );
    }

    fn open_detailed_note(&mut self) {
        let Some(date) = self.month.selected() else {
            self.status = "Select a day first".into();
            return;
        };
        let text = self
            .store
            .get(date)
            .map(|n| n.detailed_note.as_str())
            .unwrap_or("");
        self.mode = Mode::DetailedNote {
            date,
            field: FieldValue::new(text),
        };
        self.status = "Editing detailed note (Ctrl+S save, Esc discard)".into();
    }

    /// Returns whether the quick note editor stays open.
    fn handle_quick_key(
        &mut self,
        date: CalendarDate,
        field: &mut FieldValue,
        key: KeyEvent,
    ) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.status = format!("Quick note for {} done", date.format("%Y-%m-%d"));
                return false;
            }
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Backspace => {
                if field.backspace() {
                    self.save_quick(date, field);
                }
            }
            KeyCode::Char(c) if !has_command_modifier(key) => {
                if field.char_count() >= QUICK_NOTE_LIMIT {
                    self.status = format!("Quick notes hold {} characters", QUICK_NOTE_LIMIT);
                } else {
                    field.insert_char(c);
                    self.save_quick(date, field);
                }
            }
            _ => {}
        }
        true
    }

    fn save_quick(&mut self, date: CalendarDate, field: &FieldValue) {
        let saved = self.store.save_quick_note(date, &field.value);
        self.record_save(saved, format!("Saved quick note for {}", date.format("%Y-%m-%d")));
    }

    fn handle_detailed_key(
        &mut self,
        date: CalendarDate,
        field: &mut FieldValue,
        key: KeyEvent,
    ) -> bool {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.status = "Discarded detailed note changes".into();
                return false;
            }
            KeyCode::Char('s') if control => {
                let saved = self.store.save_detailed_note(date, &field.value);
                self.record_save(
                    saved,
                    format!("Saved detailed note for {}", date.format("%Y-%m-%d")),
                );
                return false;
            }
            KeyCode::Enter => field.insert_char('\n'),
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Up => field.move_up(),
            KeyCode::Down => field.move_down(),
            KeyCode::Backspace => {
                field.backspace();
            }
            KeyCode::Char(c) if !has_command_modifier(key) => field.insert_char(c),
            _ => {}
        }
        true
    }

    fn handle_search_key(&mut self, state: &mut SearchState, key: KeyEvent) -> bool {
        let hit_count = search(&self.store, &state.query.value).len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Closed search".into();
                return false;
            }
            KeyCode::Up => state.selected = state.selected.saturating_sub(1),
            KeyCode::Down => {
                if state.selected + 1 < hit_count {
                    state.selected += 1;
                }
            }
            KeyCode::Left => state.query.move_left(),
            KeyCode::Right => state.query.move_right(),
            KeyCode::Enter => {
                let target = search(&self.store, &state.query.value)
                    .get(state.selected)
                    .map(|note| note.date);
                match target {
                    Some(date) => {
                        self.month.select(date);
                        self.status = format!("Opened {}", date.format("%Y-%m-%d"));
                        return false;
                    }
                    None => self.status = "No matching notes".into(),
                }
            }
            KeyCode::Backspace => {
                state.query.backspace();
                state.selected = 0;
            }
            KeyCode::Char(c) if !has_command_modifier(key) => {
                state.query.insert_char(c);
                state.selected = 0;
            }
            _ => {}
        }
        true
    }

    fn handle_picker_key(&mut self, state: &mut PickerState, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return false;
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                state.toggle_field()
            }
            KeyCode::Up | KeyCode::Char('k') => state.adjust(1),
            KeyCode::Down | KeyCode::Char('j') => state.adjust(-1),
            KeyCode::Enter => {
                self.month.jump_to(state.year, state.month);
                self.status = format!("Showing {}", self.month.month_label());
                return false;
            }
            _ => {}
        }
        true
    }

    fn handle_tutorial_key(&mut self, pager: &mut Tutorial, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Tutorial closed (press ? to reopen)".into();
                return false;
            }
            KeyCode::Left => pager.back(),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char(' ') => {
                if pager.advance() == Step::Finished {
                    tutorial::mark_seen(self.store.prefs_mut());
                    self.status = "Happy planning!".into();
                    return false;
                }
            }
            _ => {}
        }
        true
    }

    fn record_save(&mut self, saved: bool, message: String) {
        if saved {
            self.last_save = Instant::now();
            self.status = message;
        } else {
            self.status = "Save failed, notes are kept in memory for now".into();
        }
    }

    fn sync_theme(&mut self) {
        self.theme.observe(self.month.reference());
        while let Ok(season) = self.season_changes.try_recv() {
            self.status = format!("{} ({} colours)", self.status, season.label());
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[1]);
        self.draw_month(f, body[0]);
        self.draw_day(f, body[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::QuickNote { date, field } => self.draw_quick_editor(f, *date, field),
            Mode::DetailedNote { date, field } => self.draw_detailed_editor(f, *date, field),
            Mode::Search(state) => self.draw_search(f, state),
            Mode::Picker(state) => self.draw_picker(f, state),
            Mode::Tutorial(pager) => self.draw_tutorial(f, pager),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.theme.palette();
        let title = Line::from(vec![
            Span::styled(
                "dailycal ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.month.month_label(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                self.theme.season().label(),
                Style::default().fg(palette.header),
            ),
            Span::raw("  •  "),
            Span::styled(self.data_label.clone(), Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_month(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.theme.palette();
        let mut lines = vec![
            Line::from(Span::styled(
                self.month.month_label(),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        let header_spans: Vec<Span<'static>> = self
            .layout
            .weekday_symbols()
            .iter()
            .map(|h| {
                Span::styled(
                    format!("{:^6}", h),
                    Style::default()
                        .fg(palette.text)
                        .add_modifier(Modifier::BOLD),
                )
            })
            .collect();
        lines.push(Line::from(header_spans));

        for week in self.layout.weeks(self.month.reference()) {
            let mut spans = Vec::new();
            for cell in week {
                match cell {
                    Cell::Blank => spans.push(Span::raw("      ")),
                    Cell::Day(date) => {
                        let style = cell_style(date, self.month.selected(), self.today, &palette);
                        let marker = if self.store.has_note(date) { "•" } else { " " };
                        spans.push(Span::styled(format!(" {:>2}{}  ", date.day(), marker), style));
                    }
                }
            }
            lines.push(Line::from(spans));
            lines.push(Line::from(""));
        }

        let block = Block::default()
            .title(Span::styled(
                "Calendar",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border))
            .style(Style::default().bg(palette.background).fg(palette.text));
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_day(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.theme.palette();
        let label_style = Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD);
        let lines = match self.month.selected() {
            Some(date) => {
                let note = self.store.get(date);
                let quick = note.map(|n| n.quick_note.as_str()).unwrap_or("");
                let detailed = note.map(|n| n.detailed_note.as_str()).unwrap_or("");
                let mut lines = vec![
                    Line::from(Span::styled(
                        date.format("%A, %B %-d, %Y").to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from(Span::styled("Quick note", label_style)),
                    Line::from(if quick.is_empty() { "(empty)" } else { quick }.to_string()),
                    Line::from(""),
                    Line::from(Span::styled("Detailed note", label_style)),
                ];
                if detailed.is_empty() {
                    lines.push(Line::from("(empty)"));
                } else {
                    lines.extend(detailed.lines().map(|l| Line::from(l.to_string())));
                }
                lines
            }
            None => vec![Line::from("Select a day to see its notes")],
        };
        let block = Block::default()
            .title(Span::styled("Day", label_style))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.border));
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let keys: &[(&str, &str, Color)] = match self.mode {
            Mode::Normal => &[
                ("←↑↓→ / h j k l", " move  ", Color::LightCyan),
                ("[ ]", " month  ", Color::LightCyan),
                ("t", " today  ", Color::LightGreen),
                ("g", " go to  ", Color::LightGreen),
                ("Enter", " quick note  ", Color::LightMagenta),
                ("e", " detail  ", Color::LightYellow),
                ("/", " search  ", Color::LightYellow),
                ("?", " help  ", Color::Gray),
                ("q", " quit", Color::LightRed),
            ],
            Mode::QuickNote { .. } => &[
                ("type", " saves as you go  ", Color::LightMagenta),
                ("Enter/Esc", " done", Color::LightRed),
            ],
            Mode::DetailedNote { .. } => &[
                ("Ctrl+S", " save  ", Color::LightGreen),
                ("Enter", " newline  ", Color::LightCyan),
                ("Esc", " discard", Color::LightRed),
            ],
            Mode::Search(_) => &[
                ("↑↓", " browse  ", Color::LightCyan),
                ("Enter", " open day  ", Color::LightGreen),
                ("Esc", " close", Color::LightRed),
            ],
            Mode::Picker(_) => &[
                ("←→", " year/month  ", Color::LightCyan),
                ("↑↓", " change  ", Color::LightCyan),
                ("Enter", " go  ", Color::LightGreen),
                ("Esc", " cancel", Color::LightRed),
            ],
            Mode::Tutorial(_) => &[
                ("←→", " page  ", Color::LightCyan),
                ("Enter", " next  ", Color::LightGreen),
                ("Esc", " close", Color::LightRed),
            ],
        };
        let spans: Vec<Span<'static>> = keys
            .iter()
            .flat_map(|(key, label, color)| {
                [
                    Span::styled(key.to_string(), Style::default().fg(*color)),
                    Span::raw(label.to_string()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_quick_editor(
        &self,
        f: &mut ratatui::Frame<'_>,
        date: CalendarDate,
        field: &FieldValue,
    ) {
        let palette = self.theme.palette();
        let area = centered_rect(50, 25, f.size());
        let mut body = field_lines("Quick note", field, true);
        body.push(Line::from(""));
        body.push(Line::from(Span::styled(
            format!("{}/{} characters", field.char_count(), QUICK_NOTE_LIMIT),
            Style::default().fg(Color::Gray),
        )));
        self.render_dialog(f, area, &date.format("%B %-d, %Y").to_string(), body, palette);
    }

    fn draw_detailed_editor(
        &self,
        f: &mut ratatui::Frame<'_>,
        date: CalendarDate,
        field: &FieldValue,
    ) {
        let palette = self.theme.palette();
        let area = centered_rect(70, 60, f.size());
        let mut body = field_lines("Note", field, true);
        body.push(Line::from(""));
        body.push(Line::from(Span::styled(
            "Ctrl+S to save • Esc to discard • Enter adds a newline",
            Style::default().fg(Color::Gray),
        )));
        let title = format!("Detailed note • {}", date.format("%B %-d, %Y"));
        self.render_dialog(f, area, &title, body, palette);
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, state: &SearchState) {
        let palette = self.theme.palette();
        let area = centered_rect(60, 60, f.size());
        f.render_widget(Clear, area);
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let input = Paragraph::new(field_lines("Search", &state.query, true)).block(
            Block::default()
                .title(Span::styled(
                    "Search Notes",
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        );
        f.render_widget(input, sections[0]);

        let hits = search(&self.store, &state.query.value);
        let items: Vec<ListItem> = if hits.is_empty() {
            vec![ListItem::new("No matching notes")]
        } else {
            hits.iter()
                .map(|note| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            note.date.format("%Y-%m-%d").to_string(),
                            Style::default().fg(Color::LightYellow),
                        ),
                        Span::raw("  "),
                        Span::raw(preview(note, 40)),
                    ]))
                })
                .collect()
        };
        let mut list_state = ListState::default();
        if !hits.is_empty() {
            list_state.select(Some(state.selected.min(hits.len() - 1)));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.border))
                    .title(format!("{} found", hits.len())),
            )
            .highlight_style(
                Style::default()
                    .bg(palette.selected_date)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, sections[1], &mut list_state);
    }

    fn draw_picker(&self, f: &mut ratatui::Frame<'_>, state: &PickerState) {
        let palette = self.theme.palette();
        let area = centered_rect(40, 25, f.size());
        let active = Style::default()
            .bg(palette.selected_date)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        let idle = Style::default().fg(palette.text).bg(palette.input);
        let style_for = |field: PickerField| {
            if state.field == field {
                active
            } else {
                idle
            }
        };
        let body = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(format!(" {} ", state.year), style_for(PickerField::Year)),
                Span::raw("   "),
                Span::styled(
                    format!(" {:>2} ", state.month),
                    style_for(PickerField::Month),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("{}–{}", PICKER_FIRST_YEAR, PICKER_LAST_YEAR),
                Style::default().fg(Color::Gray),
            )),
        ];
        self.render_dialog(f, area, "Go to month", body, palette);
    }

    fn draw_tutorial(&self, f: &mut ratatui::Frame<'_>, pager: &Tutorial) {
        let palette = self.theme.palette();
        let area = centered_rect(60, 40, f.size());
        let page = pager.page();
        let body = vec![
            Line::from(Span::styled(
                page.title,
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(page.description),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "{}/{}  •  {}",
                    pager.index() + 1,
                    PAGES.len(),
                    if pager.is_last() { "Enter to start" } else { "Enter for next" }
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        self.render_dialog(f, area, "Welcome", body, palette);
    }

    fn render_dialog(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        title: &str,
        body: Vec<Line<'static>>,
        palette: Palette,
    ) {
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

/// Selected beats today, which beats a plain day.
fn cell_style(
    date: CalendarDate,
    selected: Option<CalendarDate>,
    today: CalendarDate,
    palette: &Palette,
) -> Style {
    if calendar::is_selected(date, selected) {
        Style::default()
            .bg(palette.selected_date)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else if calendar::is_today_at(date, today) {
        Style::default().bg(palette.today).fg(Color::White)
    } else {
        Style::default().bg(palette.normal_date).fg(palette.text)
    }
}

fn has_command_modifier(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
