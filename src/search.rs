use crate::model::{Note, NoteStore};
use crate::storage::PreferenceStore;

/// Notes whose quick or detailed text contains `query`, ignoring case,
/// newest first. A blank query matches every note.
pub fn search<'a, P: PreferenceStore>(store: &'a NoteStore<P>, query: &str) -> Vec<&'a Note> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<&Note> = store
        .iter()
        .filter(|note| needle.is_empty() || matches(note, &needle))
        .collect();
    hits.sort_by(|a, b| b.date.cmp(&a.date));
    hits
}

fn matches(note: &Note, needle: &str) -> bool {
    note.quick_note.to_lowercase().contains(needle)
        || note.detailed_note.to_lowercase().contains(needle)
}

/// One-line summary used by result lists.
pub fn preview(note: &Note, max: usize) -> String {
    let source = if note.quick_note.trim().is_empty() {
        note.detailed_note.lines().next().unwrap_or("")
    } else {
        note.quick_note.as_str()
    };
    let mut out: String = source.chars().take(max).collect();
    if source.chars().count() > max {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPreferences;
    use chrono::NaiveDate;

    fn seeded() -> NoteStore<MemoryPreferences> {
        let mut store = NoteStore::empty(MemoryPreferences::new());
        let d = |month, day| NaiveDate::from_ymd_opt(2024, month, day).unwrap();
        store.save_quick_note(d(8, 1), "Dentist");
        store.save_detailed_note(d(8, 20), "Bring the DENTAL forms");
        store.save_quick_note(d(9, 2), "Groceries");
        store
    }

    #[test]
    fn blank_query_lists_everything_newest_first() {
        let store = seeded();
        let hits = search(&store, "  ");
        let quick: Vec<_> = hits.iter().map(|n| n.date.to_string()).collect();
        assert_eq!(quick, vec!["2024-09-02", "2024-08-20", "2024-08-01"]);
    }

    #[test]
    fn query_is_case_insensitive_across_both_fields() {
        let store = seeded();
        let hits = search(&store, "dent");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].date.to_string(), "2024-08-20");
        assert!(search(&store, "nothing").is_empty());
    }

    #[test]
    fn preview_prefers_quick_note() {
        let store = seeded();
        let hits = search(&store, "forms");
        assert_eq!(preview(hits[0], 8), "Bring th…");
        assert_eq!(preview(search(&store, "groc")[0], 20), "Groceries");
    }
}
