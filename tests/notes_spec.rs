use chrono::NaiveDate;
use dailycal::model::{NoteStore, QUICK_NOTE_LIMIT};
use dailycal::search::search;
use dailycal::storage::{FilePreferences, PreferenceStore, StoreLocation, NOTES_KEY};
use std::fs;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn notes_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data").join("preferences.yml");

    let mut store = NoteStore::load(FilePreferences::open(&path).expect("open"));
    assert!(store.is_empty());
    assert!(store.save_quick_note(date(2024, 8, 17), "Birthday"));
    assert!(store.save_detailed_note(date(2024, 8, 17), "Cake at 6\nCall grandma"));
    assert!(store.save_quick_note(date(2025, 1, 1), "New year"));
    let before: Vec<_> = store.iter().cloned().collect();

    let reopened = NoteStore::load(FilePreferences::open(&path).expect("reopen"));
    let after: Vec<_> = reopened.iter().cloned().collect();
    assert_eq!(before, after);
    let note = reopened.get(date(2024, 8, 17)).expect("note");
    assert_eq!(note.quick_note, "Birthday");
    assert_eq!(note.detailed_note, "Cake at 6\nCall grandma");
}

#[test]
fn blob_uses_iso_dates_and_camel_case_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("preferences.yml");
    let mut store = NoteStore::load(FilePreferences::open(&path).expect("open"));
    store.save_quick_note(date(2024, 2, 29), "leap");

    let prefs = FilePreferences::open(&path).expect("reopen");
    let blob = prefs.get(NOTES_KEY).expect("read").expect("blob present");
    let value: serde_json::Value = serde_json::from_str(&blob).expect("json");
    assert_eq!(value["version"], 1);
    let note = &value["notes"]["2024-02-29"];
    assert_eq!(note["quickNote"], "leap");
    assert_eq!(note["detailedNote"], "");
    assert_eq!(note["date"], "2024-02-29");
    assert!(note["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn garbage_on_disk_starts_fresh_and_is_replaced_on_save() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("preferences.yml");
    fs::write(&path, "savedNotes: \"[1, 2, 3\"\n").expect("write");

    let location = StoreLocation::resolve(Some(path.clone())).expect("location");
    let mut store = NoteStore::load(location.open());
    assert!(store.is_empty());
    assert!(store.save_quick_note(date(2024, 5, 5), "fresh"));

    let reloaded = NoteStore::load(location.open());
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn quick_note_limit_holds_through_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("preferences.yml");
    let mut store = NoteStore::load(FilePreferences::open(&path).expect("open"));
    let long = "a".repeat(QUICK_NOTE_LIMIT + 1);
    store.save_quick_note(date(2024, 3, 3), &long);

    let reloaded = NoteStore::load(FilePreferences::open(&path).expect("reopen"));
    let stored = &reloaded.get(date(2024, 3, 3)).expect("note").quick_note;
    assert_eq!(stored.as_str(), &long[..QUICK_NOTE_LIMIT]);
}

#[test]
fn search_sees_reloaded_notes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("preferences.yml");
    let mut store = NoteStore::load(FilePreferences::open(&path).expect("open"));
    store.save_quick_note(date(2024, 6, 1), "Trip to Kyoto");
    store.save_detailed_note(date(2024, 7, 1), "kyoto photos to sort");
    store.save_quick_note(date(2024, 7, 2), "Laundry");

    let reloaded = NoteStore::load(FilePreferences::open(&path).expect("reopen"));
    let hits: Vec<NaiveDate> = search(&reloaded, "KYOTO").iter().map(|n| n.date).collect();
    assert_eq!(hits, vec![date(2024, 7, 1), date(2024, 6, 1)]);
}
