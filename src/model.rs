use crate::calendar::CalendarDate;
use crate::storage::{PreferenceStore, StorageError, NOTES_KEY};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NoteId = String;

pub const QUICK_NOTE_LIMIT: usize = 25;
pub const BLOB_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub quick_note: String,
    pub detailed_note: String,
    pub date: CalendarDate,
}

impl Note {
    pub fn new(date: CalendarDate) -> Self {
        Note {
            id: generate_id(),
            quick_note: String::new(),
            detailed_note: String::new(),
            date,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.quick_note.trim().is_empty() && self.detailed_note.trim().is_empty()
    }
}

/// What gets written under [`NOTES_KEY`].
#[derive(Debug, Serialize, Deserialize)]
struct NotesBlob {
    version: u32,
    notes: BTreeMap<CalendarDate, Note>,
}

#[derive(thiserror::Error, Debug)]
enum BlobError {
    #[error("unsupported notes schema version {0}")]
    Version(u32),
    #[error("notes blob does not decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Date-keyed notes, persisted whole after every change.
pub struct NoteStore<P: PreferenceStore> {
    notes: BTreeMap<CalendarDate, Note>,
    prefs: P,
}

impl<P: PreferenceStore> NoteStore<P> {
    pub fn empty(prefs: P) -> Self {
        NoteStore {
            notes: BTreeMap::new(),
            prefs,
        }
    }

    /// Reads the persisted notes. Anything unreadable counts as a first run.
    pub fn load(prefs: P) -> Self {
        let mut store = NoteStore::empty(prefs);
        match store.read_blob() {
            Ok(Some(notes)) => {
                tracing::info!("loaded {} notes", notes.len());
                store.notes = notes;
            }
            Ok(None) => tracing::info!("no saved notes, starting empty"),
            Err(err) => tracing::warn!("discarding saved notes: {}", err),
        }
        store
    }

    pub fn get(&self, date: CalendarDate) -> Option<&Note> {
        self.notes.get(&date)
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.notes.contains_key(&date)
    }

    /// A stored entry with some text in it. Blank entries get no marker.
    pub fn has_note(&self, date: CalendarDate) -> bool {
        self.get(date).is_some_and(|note| !note.is_blank())
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut P {
        &mut self.prefs
    }

    /// Stores at most [`QUICK_NOTE_LIMIT`] characters of `text`. Returns
    /// whether the change reached storage.
    pub fn save_quick_note(&mut self, date: CalendarDate, text: &str) -> bool {
        let quick = truncate_quick_note(text);
        self.update(date, |note| note.quick_note = quick);
        self.persist()
    }

    pub fn save_detailed_note(&mut self, date: CalendarDate, text: &str) -> bool {
        let detailed = text.to_string();
        self.update(date, |note| note.detailed_note = detailed);
        self.persist()
    }

    /// Overwrites the saved blob with the full map. Failures are logged and
    /// the in-memory notes stay authoritative.
    pub fn persist(&mut self) -> bool {
        match self.write_blob() {
            Ok(()) => {
                tracing::debug!("persisted {} notes", self.notes.len());
                true
            }
            Err(err) => {
                tracing::warn!("failed to save notes: {}", err);
                false
            }
        }
    }

    fn update<F>(&mut self, date: CalendarDate, f: F)
    where
        F: FnOnce(&mut Note),
    {
        let note = self.notes.entry(date).or_insert_with(|| Note::new(date));
        f(note);
    }

    fn write_blob(&mut self) -> Result<(), BlobError> {
        let blob = NotesBlob {
            version: BLOB_VERSION,
            notes: self.notes.clone(),
        };
        let encoded = serde_json::to_string(&blob)?;
        self.prefs.set(NOTES_KEY, encoded)?;
        Ok(())
    }

    fn read_blob(&self) -> Result<Option<BTreeMap<CalendarDate, Note>>, BlobError> {
        let raw = match self.prefs.get(NOTES_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        let blob: NotesBlob = serde_json::from_str(&raw)?;
        if blob.version != BLOB_VERSION {
            return Err(BlobError::Version(blob.version));
        }
        // Re-key by each note's own date so the two can never disagree.
        let stored = blob.notes.len();
        let notes: BTreeMap<CalendarDate, Note> = blob
            .notes
            .into_values()
            .map(|note| (note.date, note))
            .collect();
        if notes.len() < stored {
            tracing::warn!(
                "{} saved notes share a date with another note and were dropped",
                stored - notes.len()
            );
        }
        Ok(Some(notes))
    }
}

pub fn truncate_quick_note(text: &str) -> String {
    text.chars().take(QUICK_NOTE_LIMIT).collect()
}

fn generate_id() -> NoteId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPreferences;
    use chrono::NaiveDate;

    fn day(d: u32) -> CalendarDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    fn store() -> NoteStore<MemoryPreferences> {
        NoteStore::empty(MemoryPreferences::new())
    }

    #[test]
    fn duplicate_dates_in_blob_collapse_to_one_note() {
        let mut prefs = MemoryPreferences::new();
        let blob = r#"{"version":1,"notes":{
            "2024-08-05":{"id":"a","quickNote":"one","detailedNote":"","date":"2024-08-05"},
            "2024-08-06":{"id":"b","quickNote":"two","detailedNote":"","date":"2024-08-05"}
        }}"#;
        prefs.set(NOTES_KEY, blob.into()).unwrap();
        let notes = NoteStore::load(prefs);
        assert_eq!(notes.len(), 1);
        assert!(notes.contains(day(5)));
        assert!(!notes.contains(day(6)));
    }

    #[test]
    fn has_note_ignores_blank_entries() {
        let mut notes = store();
        notes.save_detailed_note(day(3), "");
        assert!(notes.contains(day(3)));
        assert!(!notes.has_note(day(3)));
        notes.save_quick_note(day(3), "x");
        assert!(notes.has_note(day(3)));
    }

    #[test]
    fn quick_note_creates_note_with_empty_detail() {
        let mut notes = store();
        assert!(notes.get(day(17)).is_none());
        assert!(notes.save_quick_note(day(17), "x"));
        let note = notes.get(day(17)).unwrap();
        assert_eq!(note.quick_note, "x");
        assert_eq!(note.detailed_note, "");
        assert_eq!(note.date, day(17));
        assert_eq!(note.id.len(), 12);
    }

    #[test]
    fn saves_merge_without_clobbering() {
        let mut notes = store();
        notes.save_quick_note(day(3), "a");
        let id = notes.get(day(3)).unwrap().id.clone();
        notes.save_detailed_note(day(3), "b");
        let note = notes.get(day(3)).unwrap();
        assert_eq!(note.quick_note, "a");
        assert_eq!(note.detailed_note, "b");
        assert_eq!(note.id, id);

        notes.save_quick_note(day(3), "c");
        let note = notes.get(day(3)).unwrap();
        assert_eq!(note.quick_note, "c");
        assert_eq!(note.detailed_note, "b");
        assert_eq!(note.id, id);
    }

    #[test]
    fn detailed_note_first_leaves_quick_empty() {
        let mut notes = store();
        notes.save_detailed_note(day(9), "long text\nwith lines");
        let note = notes.get(day(9)).unwrap();
        assert_eq!(note.quick_note, "");
        assert_eq!(note.detailed_note, "long text\nwith lines");
    }

    #[test]
    fn quick_note_is_capped_at_limit() {
        let mut notes = store();
        let input = "abcdefghijklmnopqrstuvwxyz";
        assert_eq!(input.chars().count(), 26);
        notes.save_quick_note(day(1), input);
        assert_eq!(notes.get(day(1)).unwrap().quick_note, &input[..25]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "日".repeat(30);
        let truncated = truncate_quick_note(&text);
        assert_eq!(truncated.chars().count(), QUICK_NOTE_LIMIT);
    }

    #[test]
    fn emptied_note_is_kept() {
        let mut notes = store();
        notes.save_quick_note(day(2), "hello");
        notes.save_quick_note(day(2), "");
        let note = notes.get(day(2)).unwrap();
        assert!(note.is_blank());
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn every_save_writes_the_blob() {
        let mut notes = store();
        notes.save_quick_note(day(5), "first");
        let raw = notes.prefs().raw(NOTES_KEY).unwrap().to_string();
        assert!(raw.contains("\"2024-08-05\""));
        assert!(raw.contains("\"quickNote\":\"first\""));
        assert!(raw.contains("\"version\":1"));
    }

    #[test]
    fn persist_then_load_round_trips() {
        let mut notes = store();
        notes.save_quick_note(day(5), "one");
        notes.save_detailed_note(day(6), "two");
        notes.save_quick_note(day(6), "three");
        let prefs = notes.prefs().clone();

        let reloaded = NoteStore::load(prefs);
        assert_eq!(
            reloaded.iter().collect::<Vec<_>>(),
            notes.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn failed_persist_keeps_memory_state() {
        let mut notes = NoteStore::empty(MemoryPreferences::failing());
        assert!(!notes.save_quick_note(day(4), "kept"));
        assert_eq!(notes.get(day(4)).unwrap().quick_note, "kept");

        notes.prefs_mut().set_failing(false);
        assert!(notes.persist());
        assert!(notes.prefs().raw(NOTES_KEY).is_some());
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let mut prefs = MemoryPreferences::new();
        prefs.set(NOTES_KEY, "{not json".into()).unwrap();
        assert!(NoteStore::load(prefs).is_empty());
    }

    #[test]
    fn unknown_version_loads_empty() {
        let mut prefs = MemoryPreferences::new();
        prefs
            .set(NOTES_KEY, r#"{"version":99,"notes":{}}"#.into())
            .unwrap();
        assert!(NoteStore::load(prefs).is_empty());
    }

    #[test]
    fn missing_blob_loads_empty() {
        assert!(NoteStore::load(MemoryPreferences::new()).is_empty());
    }

    #[test]
    fn load_rekeys_by_note_date() {
        let mut prefs = MemoryPreferences::new();
        let blob = r#"{"version":1,"notes":{"2024-01-01":{"id":"abc","quickNote":"q","detailedNote":"","date":"2024-08-10"}}}"#;
        prefs.set(NOTES_KEY, blob.into()).unwrap();
        let notes = NoteStore::load(prefs);
        assert!(notes.get(day(10)).is_some());
        assert!(!notes.contains(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }
}
