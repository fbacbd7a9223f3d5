mod app;
mod cache;
mod config;
mod entry;
mod error;
mod input;
mod launcher;
mod lifecycle;
mod menu;
mod reconcile;
mod select_box;
mod store;
mod terminal;

pub use app::{find_entry, load_entries, rebuild_entries, sync_cache, App};
pub use cache::Cache;
pub use config::{AppConfig, BaseDirs, CRATE_NAME};
pub use entry::{Entry, EntryRecord, Field, RECORD_EXTENSION};
pub use error::{Error, Result};
pub use launcher::{launch, ClientCommand, ProcessSpawner, Spawner};
pub use lifecycle::{FieldEditor, Lifecycle};
pub use reconcile::Reconciler;
pub use store::{EntrySource, EntryStore};
pub use terminal::Terminal;
