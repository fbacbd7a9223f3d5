use std::io::Stdout;

use anyhow::{anyhow, bail, Context};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::Cache;
use crate::config::AppConfig;
use crate::entry::Entry;
use crate::launcher::{launch, ProcessSpawner};
use crate::lifecycle::Lifecycle;
use crate::menu::{confirm, ChoiceList, TerminalFieldEditor};
use crate::reconcile::Reconciler;
use crate::select_box::{SelectBox, Selection};
use crate::store::EntryStore;
use crate::terminal::Terminal;

/// Startup load: the cached set when fresh, a rescan otherwise, and never empty.
pub fn load_entries(config: &AppConfig) -> crate::Result<Vec<Entry>> {
    let mut entries = Reconciler::new(config, &EntryStore).refresh(Vec::new())?;
    if Lifecycle::new(config).ensure_seeded(&mut entries)? {
        sync_cache(config, &entries)?;
    }
    Ok(entries)
}

/// Forced rescan, used by "Refresh Cache".
pub fn rebuild_entries(config: &AppConfig) -> crate::Result<Vec<Entry>> {
    let mut entries = Reconciler::new(config, &EntryStore).rebuild()?;
    if Lifecycle::new(config).ensure_seeded(&mut entries)? {
        sync_cache(config, &entries)?;
    }
    Ok(entries)
}

/// Re-derives the cache from the in-memory collection after a mutation.
pub fn sync_cache(config: &AppConfig, entries: &[Entry]) -> crate::Result<()> {
    Cache::new(&config.cache_file).save(entries)
}

/// Looks an entry up by id, falling back to its (unique) name.
pub fn find_entry<'a>(entries: &'a [Entry], target: &str) -> anyhow::Result<&'a Entry> {
    if let Ok(id) = Uuid::parse_str(target) {
        if let Some(entry) = entries.iter().find(|e| e.id == id) {
            return Ok(entry);
        }
    }

    let mut matches = entries.iter().filter(|e| e.name == target);
    match (matches.next(), matches.next()) {
        (Some(entry), None) => Ok(entry),
        (Some(_), Some(_)) => bail!("several entries are named {target:?}, use the id instead"),
        (None, _) => Err(anyhow!("no entry named {target:?}")),
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Launch,
    Edit,
    Delete,
    Add,
    RefreshCache,
}

impl Action {
    const ALL: [Action; 5] = [
        Action::Launch,
        Action::Edit,
        Action::Delete,
        Action::Add,
        Action::RefreshCache,
    ];

    fn choice(self, name: &str) -> (String, String) {
        let (tag, description) = match self {
            Action::Launch => ("Launch", format!("Connect to {name}")),
            Action::Edit => ("Edit", format!("Edit {name}")),
            Action::Delete => ("Delete", format!("Delete {name}")),
            Action::Add => ("Add", "Add a new entry".to_string()),
            Action::RefreshCache => ("Refresh Cache", "Reload entries from sources".to_string()),
        };
        (tag.to_string(), description)
    }
}

/// The interactive session. Owns the working entry collection.
pub struct App {
    config: AppConfig,
    entries: Vec<Entry>,
    select_box: SelectBox,
    status: Option<String>,
}

impl App {
    pub fn new(config: AppConfig, entries: Vec<Entry>) -> Self {
        App {
            select_box: SelectBox::new(&entries),
            config,
            entries,
            status: None,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut terminal = Terminal::new().context("failed to set up the terminal")?;

        loop {
            self.select_box.set_entries(&self.entries);
            let status = self.status.take();
            match self.select_box.select(&mut terminal, status.as_deref())? {
                Selection::Quit => break,
                Selection::Add => self.add(),
                Selection::Entry(id) => self.manage(&mut terminal, id)?,
            }
        }

        Result::Ok(())
    }

    fn manage(&mut self, terminal: &mut Terminal<Stdout>, id: Uuid) -> anyhow::Result<()> {
        let Some(name) = self.entries.iter().find(|e| e.id == id).map(|e| e.name.clone()) else {
            return Ok(());
        };
        let choices = Action::ALL.iter().map(|a| a.choice(&name)).collect();
        let mut menu = ChoiceList::new(" Manage BBS Entries ", choices);
        let Some(index) = menu.choose(terminal)? else {
            return Ok(());
        };

        match Action::ALL[index] {
            Action::Launch => self.launch(terminal, id)?,
            Action::Edit => {
                let lifecycle = Lifecycle::new(&self.config);
                let result = match self.entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => lifecycle.edit(entry, &mut TerminalFieldEditor::new(terminal)),
                    None => Ok(()),
                };
                let result = result.and_then(|()| sync_cache(&self.config, &self.entries));
                self.report(result);
            }
            Action::Delete => {
                let backed = self
                    .entries
                    .iter()
                    .any(|e| e.id == id && e.source_path.exists());
                // a file already removed on disk needs no confirmation
                if !backed || confirm(terminal, &format!(" Delete {name}? "))? {
                    self.delete_entry(id);
                }
            }
            Action::Add => self.add(),
            Action::RefreshCache => match rebuild_entries(&self.config) {
                Ok(entries) => self.entries = entries,
                // the previous collection stays usable, the broken file is named
                Err(e) => {
                    error!(error = %e, "refresh failed");
                    self.status = Some(e.to_string());
                }
            },
        }
        Ok(())
    }

    /// Deletes the entry's file and drops it. An entry whose file has
    /// already vanished is only dropped from the collection.
    fn delete_entry(&mut self, id: Uuid) {
        let lifecycle = Lifecycle::new(&self.config);
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            return;
        };

        let result = if entry.source_path.exists() {
            lifecycle.delete(id, &mut self.entries).map(drop)
        } else {
            warn!(path = %entry.source_path.display(), "entry file already gone, dropping entry");
            self.entries.retain(|e| e.id != id);
            lifecycle.ensure_seeded(&mut self.entries).map(drop)
        };
        let result = result.and_then(|()| sync_cache(&self.config, &self.entries));
        self.report(result);
    }

    /// Failed mutations land on the status line; the session goes on.
    fn report(&mut self, result: crate::Result<()>) {
        if let Err(e) = result {
            error!(error = %e, "entry update failed");
            self.status = Some(e.to_string());
        }
    }

    fn add(&mut self) {
        let result = Lifecycle::new(&self.config).create().and_then(|entry| {
            self.entries.push(entry);
            sync_cache(&self.config, &self.entries)
        });
        self.report(result);
    }

    fn launch(&mut self, terminal: &mut Terminal<Stdout>, id: Uuid) -> anyhow::Result<()> {
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            return Ok(());
        };

        terminal.suspend()?;
        let result = launch(entry, &mut ProcessSpawner);
        terminal.resume()?;

        match result {
            Ok(()) => info!(name = %entry.name, "session ended"),
            Err(e) if e.is_recoverable() => self.status = Some(e.to_string()),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(root: &Path) -> AppConfig {
        let sources = root.join("sources");
        AppConfig {
            local_entry_dir: sources.join("local"),
            source_dirs: vec![sources],
            cache_file: root.join("cache").join("bbs_db.bin"),
        }
    }

    #[test]
    fn test_cold_start_seeds_and_caches_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());

        let entries = load_entries(&config).unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].source_path.exists());
        assert_eq!(Cache::new(&config.cache_file).load().unwrap(), entries);
    }

    #[test]
    fn test_second_start_sees_same_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let mut entries = load_entries(&config).unwrap();
        let lifecycle = Lifecycle::new(&config);
        entries.push(lifecycle.create().unwrap());
        sync_cache(&config, &entries).unwrap();

        let mut again = load_entries(&config).unwrap();
        again.sort_by_key(|e| e.id);
        entries.sort_by_key(|e| e.id);
        assert_eq!(again, entries);
    }

    #[test]
    fn test_rebuild_picks_up_external_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        load_entries(&config).unwrap();
        let external = Entry::new(&config.source_dirs[0].join("club"), "Club", "ssh://club", "");
        EntryStore.save(&external).unwrap();

        let entries = rebuild_entries(&config).unwrap();

        assert!(entries.contains(&external));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_delete_after_external_removal_keeps_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let mut entries = load_entries(&config).unwrap();
        entries.push(Lifecycle::new(&config).create().unwrap());
        sync_cache(&config, &entries).unwrap();
        let gone = entries[1].clone();
        std::fs::remove_file(&gone.source_path).unwrap();

        // nested removal leaves the cache fresh, so the entry is still listed
        let listed = load_entries(&config).unwrap();
        assert!(listed.iter().any(|e| e.id == gone.id));

        let mut app = App::new(config.clone(), listed);
        app.delete_entry(gone.id);

        assert_eq!(app.status, None);
        assert!(app.entries.iter().all(|e| e.id != gone.id));
        assert_eq!(Cache::new(&config.cache_file).load().unwrap(), app.entries);
    }

    #[test]
    fn test_failed_delete_is_reported_not_raised() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config(temp_dir.path());
        let entries = load_entries(&config).unwrap();
        let id = entries[0].id;
        // cache path blocked by a directory, so the cache sync fails
        std::fs::remove_file(&config.cache_file).unwrap();
        std::fs::create_dir_all(&config.cache_file).unwrap();

        let mut app = App::new(config.clone(), entries);
        app.delete_entry(id);

        assert!(app.status.is_some());
        assert_eq!(app.entries.len(), 1);
        assert_ne!(app.entries[0].id, id);
    }

    #[test]
    fn test_find_entry_by_id_and_name() {
        let dir = Path::new("/tmp");
        let entries = vec![
            Entry::new(dir, "Same", "telnet://a", ""),
            Entry::new(dir, "Same", "telnet://b", ""),
            Entry::new(dir, "Unique", "telnet://c", ""),
        ];

        assert_eq!(find_entry(&entries, "Unique").unwrap(), &entries[2]);
        assert_eq!(
            find_entry(&entries, &entries[1].id.to_string()).unwrap(),
            &entries[1]
        );
        assert!(find_entry(&entries, "Same").is_err());
        assert!(find_entry(&entries, "Missing").is_err());
    }
}
