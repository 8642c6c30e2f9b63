use crate::storage::{PreferenceStore, TUTORIAL_SEEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorialPage {
    pub title: &'static str,
    pub description: &'static str,
}

pub const PAGES: [TutorialPage; 4] = [
    TutorialPage {
        title: "Calendar view",
        description: "Browse one month at a time. Move between days with the arrow keys and flip months with [ and ].",
    },
    TutorialPage {
        title: "Quick notes",
        description: "Press Enter on a day to jot a short note of up to 25 characters. Press e for a longer, detailed note.",
    },
    TutorialPage {
        title: "Seasons",
        description: "Colours follow the season of the month you are looking at.",
    },
    TutorialPage {
        title: "Get started",
        description: "Search your notes with /, jump to any month with g, and press ? to see this again.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Page(usize),
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct Tutorial {
    current: usize,
}

impl Tutorial {
    pub fn new() -> Self {
        Tutorial::default()
    }

    pub fn page(&self) -> &'static TutorialPage {
        &PAGES[self.current.min(PAGES.len() - 1)]
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= PAGES.len()
    }

    pub fn advance(&mut self) -> Step {
        if self.is_last() {
            Step::Finished
        } else {
            self.current += 1;
            Step::Page(self.current)
        }
    }

    pub fn back(&mut self) {
        self.current = self.current.saturating_sub(1);
    }
}

pub fn has_seen<P: PreferenceStore>(prefs: &P) -> bool {
    prefs.flag(TUTORIAL_SEEN_KEY)
}

pub fn mark_seen<P: PreferenceStore>(prefs: &mut P) {
    if let Err(err) = prefs.set(TUTORIAL_SEEN_KEY, "true".into()) {
        tracing::warn!("could not record finished tutorial: {}", err);
    }
}
