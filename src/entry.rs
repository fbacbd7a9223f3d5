use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{Error, Result};

/// Extension of a single entry file; also the glob used when scanning.
pub const RECORD_EXTENSION: &str = "yaml";

/// One bulletin board listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub description: String,
    pub source_path: PathBuf,
}

/// The flat on-disk form of an [`Entry`]. Every field is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    pub name: String,
    #[serde(alias = "url")]
    pub address: String,
    pub description: String,
    pub source_path: String,
}

/// Fields a user may change. `id` and `source_path` are fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Address,
    Description,
}

impl Field {
    pub const EDITABLE: [Field; 3] = [Field::Name, Field::Address, Field::Description];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Address => "address",
            Field::Description => "description",
        }
    }
}

impl Entry {
    /// Builds an entry with a fresh id whose file lives directly in `local_dir`.
    pub fn new(
        local_dir: &Path,
        name: impl Into<String>,
        address: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.into(),
            address: address.into(),
            description: description.into(),
            source_path: local_dir.join(format!("{id}.{RECORD_EXTENSION}")),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Address => &self.address,
            Field::Description => &self.description,
        }
    }

    pub fn set_field(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Address => self.address = value,
            Field::Description => self.description = value,
        }
    }

    pub fn encode(&self) -> EntryRecord {
        EntryRecord {
            id: self.id.to_string(),
            name: self.name.clone(),
            address: self.address.clone(),
            description: self.description.clone(),
            source_path: self.source_path.to_string_lossy().into_owned(),
        }
    }

    /// Converts a record back into an entry. `origin` names the file the
    /// record was read from and only appears in errors.
    pub fn decode(record: EntryRecord, origin: &Path) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedEntry {
            path: origin.to_path_buf(),
            reason,
        };

        let id = Uuid::parse_str(record.id.trim())
            .map_err(|e| malformed(format!("id {:?} is not a valid UUID: {e}", record.id)))?;

        let source_path = PathBuf::from(&record.source_path);
        if record.source_path.is_empty() || !source_path.is_absolute() {
            return Err(malformed(format!(
                "source_path {:?} is not an absolute path",
                record.source_path
            )));
        }

        Ok(Self {
            id,
            name: record.name,
            address: record.address,
            description: record.description,
            source_path,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.encode()).map_err(|e| Error::MalformedEntry {
            path: self.source_path.clone(),
            reason: e.to_string(),
        })
    }

    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        let record: EntryRecord =
            serde_yaml::from_str(text).map_err(|e| Error::MalformedEntry {
                path: origin.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::decode(record, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new(
            &std::env::temp_dir().join("bbs"),
            "Level 29",
            "telnet://bbs.fozztexx.com:23",
            "Retro BBS: \"quoted\" and: colons",
        )
    }

    #[test]
    fn test_yaml_round_trip() {
        let entry = sample();
        let text = entry.to_yaml().unwrap();
        let decoded = Entry::from_yaml(&text, &entry.source_path).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_record_round_trip_with_empty_description() {
        let mut entry = sample();
        entry.description.clear();
        let decoded = Entry::decode(entry.encode(), &entry.source_path).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_new_derives_file_name_from_id() {
        let entry = sample();
        assert_eq!(
            entry.source_path.file_name().unwrap().to_string_lossy(),
            format!("{}.yaml", entry.id)
        );
    }

    #[test]
    fn test_url_alias_accepted() {
        let entry = sample();
        let text = format!(
            "id: {}\nname: Old\nurl: ssh://old.example.com\ndescription: ''\nsource_path: {}\n",
            entry.id,
            entry.source_path.display()
        );
        let decoded = Entry::from_yaml(&text, &entry.source_path).unwrap();
        assert_eq!(decoded.address, "ssh://old.example.com");
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let text = "name: x\naddress: telnet://x\ndescription: y\n";
        let err = Entry::from_yaml(text, Path::new("/tmp/x.yaml")).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { .. }));
    }

    #[test]
    fn test_bad_id_is_malformed() {
        let mut record = sample().encode();
        record.id = "not-a-uuid".into();
        let err = Entry::decode(record, Path::new("/tmp/x.yaml")).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { .. }));
    }

    #[test]
    fn test_relative_source_path_is_malformed() {
        let mut record = sample().encode();
        record.source_path = "relative/x.yaml".into();
        assert!(Entry::decode(record, Path::new("/tmp/x.yaml")).is_err());
    }

    #[test]
    fn test_set_field() {
        let mut entry = sample();
        for field in Field::EDITABLE {
            entry.set_field(field, format!("new {}", field.label()));
            assert_eq!(entry.field(field), format!("new {}", field.label()));
        }
    }
}
