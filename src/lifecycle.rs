use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entry::{Entry, Field};
use crate::store::EntryStore;
use crate::{Error, Result};

const NEW_NAME: &str = "(new entry)";
const NEW_ADDRESS: &str = "telnet://newbbs.example.com:23";
const DEFAULT_NAME: &str = "Default BBS";
const DEFAULT_ADDRESS: &str = "telnet://default.example.com";
const DEFAULT_DESCRIPTION: &str = "Default Entry";

/// Source of field changes while an entry is being edited.
pub trait FieldEditor {
    /// The next change to apply, or `None` once the user is done.
    fn next_edit(&mut self, entry: &Entry) -> Result<Option<(Field, String)>>;
}

/// Creates, edits and deletes entries on disk.
///
/// The cache is not touched here; after a mutation the owner of the entry
/// collection re-derives it with [`crate::Cache::save`].
pub struct Lifecycle<'a> {
    config: &'a AppConfig,
    store: EntryStore,
}

impl<'a> Lifecycle<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            store: EntryStore,
        }
    }

    /// A persisted placeholder entry, ready to be appended and edited.
    pub fn create(&self) -> Result<Entry> {
        self.persist_new(Entry::new(
            &self.config.local_entry_dir,
            NEW_NAME,
            NEW_ADDRESS,
            "",
        ))
    }

    /// The entry used to re-seed an empty collection.
    pub fn create_default(&self) -> Result<Entry> {
        self.persist_new(Entry::new(
            &self.config.local_entry_dir,
            DEFAULT_NAME,
            DEFAULT_ADDRESS,
            DEFAULT_DESCRIPTION,
        ))
    }

    fn persist_new(&self, entry: Entry) -> Result<Entry> {
        self.store.save(&entry)?;
        info!(id = %entry.id, name = %entry.name, "created entry");
        Ok(entry)
    }

    /// Applies every change `editor` yields, then rewrites the entry's file.
    pub fn edit(&self, entry: &mut Entry, editor: &mut impl FieldEditor) -> Result<()> {
        while let Some((field, value)) = editor.next_edit(entry)? {
            entry.set_field(field, value);
        }
        self.store.save(entry)
    }

    /// Removes the entry's file and drops it from `entries`. An emptied
    /// collection gets a freshly persisted default entry.
    pub fn delete(&self, id: Uuid, entries: &mut Vec<Entry>) -> Result<Entry> {
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::UnknownEntry(id))?;

        self.store.delete(&entries[index])?;
        let removed = entries.remove(index);
        self.ensure_seeded(entries)?;
        Ok(removed)
    }

    /// Returns true when a default entry had to be added.
    pub fn ensure_seeded(&self, entries: &mut Vec<Entry>) -> Result<bool> {
        if !entries.is_empty() {
            return Ok(false);
        }
        entries.push(self.create_default()?);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntrySource;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;

    struct Scripted(VecDeque<(Field, String)>);

    impl Scripted {
        fn new(edits: &[(Field, &str)]) -> Self {
            Self(edits.iter().map(|(f, v)| (*f, v.to_string())).collect())
        }
    }

    impl FieldEditor for Scripted {
        fn next_edit(&mut self, _entry: &Entry) -> Result<Option<(Field, String)>> {
            Ok(self.0.pop_front())
        }
    }

    fn config(root: &Path) -> AppConfig {
        AppConfig {
            source_dirs: vec![root.to_path_buf()],
            cache_file: root.join("cache.bin"),
            local_entry_dir: root.join("local"),
        }
    }

    #[test]
    fn test_create_persists_placeholder() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());

        let entry = Lifecycle::new(&config).create().unwrap();

        assert_eq!(entry.name, NEW_NAME);
        assert_eq!(
            entry.source_path,
            config.local_entry_dir.join(format!("{}.yaml", entry.id))
        );
        let loaded = EntryStore.load_all(&[config.local_entry_dir.clone()]).unwrap();
        assert_eq!(loaded, vec![entry]);
    }

    #[test]
    fn test_edit_applies_changes_and_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let mut entry = lifecycle.create().unwrap();
        let id = entry.id;

        lifecycle
            .edit(
                &mut entry,
                &mut Scripted::new(&[
                    (Field::Name, "Particles"),
                    (Field::Address, "ssh://particles.example.com"),
                ]),
            )
            .unwrap();

        assert_eq!(entry.id, id);
        let loaded = EntryStore.load_all(&config.source_dirs).unwrap();
        assert_eq!(loaded, vec![entry]);
        assert_eq!(loaded[0].name, "Particles");
    }

    #[test]
    fn test_idempotent_edit_overwrites_same_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let mut entry = lifecycle.create().unwrap();
        let before = entry.clone();

        let name = entry.name.clone();
        lifecycle
            .edit(&mut entry, &mut Scripted::new(&[(Field::Name, name.as_str())]))
            .unwrap();

        assert_eq!(entry, before);
        let files: Vec<_> = fs::read_dir(&config.local_entry_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_delete_removes_file_and_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let keep = lifecycle.create().unwrap();
        let gone = lifecycle.create().unwrap();
        let mut entries = vec![keep.clone(), gone.clone()];

        let removed = lifecycle.delete(gone.id, &mut entries).unwrap();

        assert_eq!(removed, gone);
        assert_eq!(entries, vec![keep]);
        assert!(!gone.source_path.exists());
    }

    #[test]
    fn test_deleting_last_entry_seeds_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let only = lifecycle.create().unwrap();
        let mut entries = vec![only.clone()];

        lifecycle.delete(only.id, &mut entries).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, DEFAULT_NAME);
        assert_ne!(entries[0].id, only.id);
        assert_eq!(EntryStore.load_all(&config.source_dirs).unwrap(), entries);
    }

    #[test]
    fn test_delete_unknown_id_leaves_collection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let mut entries = vec![lifecycle.create().unwrap()];

        let err = lifecycle.delete(Uuid::new_v4(), &mut entries).unwrap_err();

        assert!(matches!(err, Error::UnknownEntry(_)));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_delete_of_vanished_file_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let lifecycle = Lifecycle::new(&config);
        let entry = lifecycle.create().unwrap();
        fs::remove_file(&entry.source_path).unwrap();
        let mut entries = vec![entry.clone()];

        let err = lifecycle.delete(entry.id, &mut entries).unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(entries, vec![entry]);
    }
}
