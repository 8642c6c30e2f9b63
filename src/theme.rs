//! Seasonal colouring derived from the month on screen.

use crate::calendar::CalendarDate;
use chrono::Datelike;
use ratatui::style::Color;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn for_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn for_date(date: CalendarDate) -> Season {
        Season::for_month(date.month())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Season::Spring => Palette {
                background: Color::Rgb(245, 245, 220),
                header: Color::Rgb(189, 224, 189),
                normal_date: Color::Rgb(235, 245, 225),
                selected_date: Color::Rgb(126, 190, 76),
                today: Color::Rgb(180, 214, 140),
                accent: Color::Rgb(87, 159, 42),
                text: Color::Rgb(51, 51, 51),
                border: Color::Rgb(204, 229, 204),
                input: Color::Rgb(255, 255, 240),
            },
            Season::Summer => Palette {
                background: Color::Rgb(246, 240, 216),
                header: Color::Rgb(240, 179, 85),
                normal_date: Color::Rgb(255, 245, 225),
                selected_date: Color::Rgb(249, 150, 29),
                today: Color::Rgb(252, 193, 80),
                accent: Color::Rgb(243, 117, 36),
                text: Color::Rgb(51, 51, 51),
                border: Color::Rgb(245, 204, 119),
                input: Color::Rgb(255, 250, 235),
            },
            Season::Autumn => Palette {
                background: Color::Rgb(246, 233, 216),
                header: Color::Rgb(216, 133, 65),
                normal_date: Color::Rgb(252, 236, 216),
                selected_date: Color::Rgb(189, 80, 30),
                today: Color::Rgb(224, 133, 65),
                accent: Color::Rgb(153, 64, 27),
                text: Color::Rgb(51, 51, 51),
                border: Color::Rgb(235, 167, 99),
                input: Color::Rgb(255, 245, 230),
            },
            Season::Winter => Palette {
                background: Color::Rgb(236, 240, 246),
                header: Color::Rgb(134, 178, 204),
                normal_date: Color::Rgb(240, 245, 252),
                selected_date: Color::Rgb(48, 119, 172),
                today: Color::Rgb(99, 153, 189),
                accent: Color::Rgb(39, 99, 143),
                text: Color::Rgb(51, 51, 51),
                border: Color::Rgb(170, 204, 224),
                input: Color::Rgb(245, 249, 255),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub header: Color,
    pub normal_date: Color,
    pub selected_date: Color,
    pub today: Color,
    pub accent: Color,
    pub text: Color,
    pub border: Color,
    pub input: Color,
}

/// Tracks the season of the displayed month and tells subscribers when it
/// changes.
pub struct ThemeWatcher {
    season: Season,
    subscribers: Vec<Sender<Season>>,
}

impl ThemeWatcher {
    pub fn new(date: CalendarDate) -> Self {
        ThemeWatcher {
            season: Season::for_date(date),
            subscribers: Vec::new(),
        }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn palette(&self) -> Palette {
        self.season.palette()
    }

    pub fn subscribe(&mut self) -> Receiver<Season> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Re-derives the season for `date`; returns true when it changed.
    pub fn observe(&mut self, date: CalendarDate) -> bool {
        let next = Season::for_date(date);
        if next == self.season {
            return false;
        }
        tracing::debug!("season changed from {:?} to {:?}", self.season, next);
        self.season = next;
        self.subscribers.retain(|tx| tx.send(next).is_ok());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(m: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    #[test]
    fn months_map_to_seasons() {
        let seasons: Vec<Season> = (1..=12).map(Season::for_month).collect();
        use Season::*;
        assert_eq!(
            seasons,
            vec![
                Winter, Winter, Spring, Spring, Spring, Summer, Summer, Summer, Autumn, Autumn,
                Autumn, Winter
            ]
        );
    }

    #[test]
    fn watcher_notifies_only_on_change() {
        let mut watcher = ThemeWatcher::new(date(6));
        let rx = watcher.subscribe();
        assert!(!watcher.observe(date(8)));
        assert!(watcher.observe(date(9)));
        assert!(!watcher.observe(date(10)));
        assert!(watcher.observe(date(12)));
        let received: Vec<Season> = rx.try_iter().collect();
        assert_eq!(received, vec![Season::Autumn, Season::Winter]);
        assert_eq!(watcher.palette(), Season::Winter.palette());
    }

    #[test]
    fn dropped_subscribers_are_forgotten() {
        let mut watcher = ThemeWatcher::new(date(1));
        drop(watcher.subscribe());
        let rx = watcher.subscribe();
        watcher.observe(date(4));
        assert_eq!(watcher.subscribers.len(), 1);
        assert_eq!(rx.try_recv().ok(), Some(Season::Spring));
    }
}
