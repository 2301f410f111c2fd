//! Persistence seams: groups (with their JSON metadata), events and code mappings.
//!
//! The issue tracker owns these records. The orchestrator only reads them and
//! writes back the group's metadata; a write replaces the whole group record,
//! so concurrent writers race and the last one wins.
use crate::models::{Event, Group, GroupId, Project, RepositoryProjectPathConfig};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("could not decode record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("group {0} does not exist")]
    MissingGroup(GroupId),
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, StoreError>;
    async fn save_group(&self, group: &Group) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn latest_event(&self, group: &Group) -> Result<Option<Event>, StoreError>;
}

#[async_trait]
pub trait CodeMappingStore: Send + Sync {
    async fn code_mappings(
        &self,
        project: &Project,
    ) -> Result<Vec<RepositoryProjectPathConfig>, StoreError>;
}

/// Seed data for [`InMemoryStore`].
#[derive(Debug, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub code_mappings: Vec<RepositoryProjectPathConfig>,
}

impl Fixtures {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[derive(Default)]
struct StoreData {
    groups: HashMap<GroupId, Group>,
    events: HashMap<GroupId, Vec<Event>>,
    code_mappings: Vec<RepositoryProjectPathConfig>,
}

/// Process-local implementation of every store seam.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        let store = Self::new();
        for group in fixtures.groups {
            store.insert_group(group);
        }
        for event in fixtures.events {
            store.insert_event(event);
        }
        for mapping in fixtures.code_mappings {
            store.insert_code_mapping(mapping);
        }
        store
    }

    pub fn insert_group(&self, group: Group) {
        self.data.write().groups.insert(group.id, group);
    }

    pub fn insert_event(&self, event: Event) {
        self.data
            .write()
            .events
            .entry(event.group_id)
            .or_default()
            .push(event);
    }

    pub fn insert_code_mapping(&self, mapping: RepositoryProjectPathConfig) {
        self.data.write().code_mappings.push(mapping);
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.data.read().groups.get(&group_id).cloned())
    }

    async fn save_group(&self, group: &Group) -> Result<(), StoreError> {
        let mut write_guard = self.data.write();
        match write_guard.groups.get_mut(&group.id) {
            Some(stored) => {
                *stored = group.clone();
                Ok(())
            }
            None => Err(StoreError::MissingGroup(group.id)),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn latest_event(&self, group: &Group) -> Result<Option<Event>, StoreError> {
        let read_guard = self.data.read();
        let latest = read_guard
            .events
            .get(&group.id)
            .and_then(|events| events.iter().max_by_key(|event| event.datetime))
            .cloned();
        Ok(latest)
    }
}

#[async_trait]
impl CodeMappingStore for InMemoryStore {
    async fn code_mappings(
        &self,
        project: &Project,
    ) -> Result<Vec<RepositoryProjectPathConfig>, StoreError> {
        Ok(self
            .data
            .read()
            .code_mappings
            .iter()
            .filter(|mapping| mapping.project_id == project.id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{sample_event, sample_group, sample_mapping};
    use chrono::{Duration, Utc};
    use std::io::Write;

    #[tokio::test]
    async fn test_latest_event_by_datetime() {
        let store = InMemoryStore::new();
        let group = sample_group();
        store.insert_group(group.clone());

        assert_eq!(store.latest_event(&group).await.unwrap(), None);

        let now = Utc::now();
        let mut older = sample_event(group.id);
        older.event_id = "older".to_string();
        older.datetime = now - Duration::minutes(5);
        let mut newer = sample_event(group.id);
        newer.event_id = "newer".to_string();
        newer.datetime = now;

        store.insert_event(newer);
        store.insert_event(older);

        let latest = store.latest_event(&group).await.unwrap().unwrap();
        assert_eq!(latest.event_id, "newer");
    }

    #[tokio::test]
    async fn test_save_group_replaces_record() {
        let store = InMemoryStore::new();
        let mut group = sample_group();
        store.insert_group(group.clone());

        group
            .data
            .metadata
            .insert("title".to_string(), "replaced".into());
        store.save_group(&group).await.unwrap();

        let stored = store.get_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.data.metadata["title"], "replaced");

        group.id += 1;
        assert!(matches!(
            store.save_group(&group).await,
            Err(StoreError::MissingGroup(_))
        ));
    }

    #[tokio::test]
    async fn test_code_mappings_scoped_to_project() {
        let store = InMemoryStore::new();
        let group = sample_group();
        let mut other = sample_mapping(2, "getsentry/relay");
        other.project_id = group.project.id + 1;

        store.insert_code_mapping(sample_mapping(1, "getsentry/sentry"));
        store.insert_code_mapping(other);

        let mappings = store.code_mappings(&group.project).await.unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].repository.name, "getsentry/sentry");
    }

    #[test]
    fn test_fixtures_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            tmp,
            r#"{{
                "groups": [{{
                    "id": 7,
                    "project": {{"id": 3, "organization_id": 1, "slug": "backend"}},
                    "title": "ValueError: bad"
                }}],
                "code_mappings": [{{
                    "project_id": 3,
                    "repository": {{"id": 1, "name": "getsentry/sentry", "provider": "integrations:github"}}
                }}]
            }}"#
        )
        .expect("write fixtures");

        let fixtures = Fixtures::from_file(tmp.path()).expect("load fixtures");
        assert_eq!(fixtures.groups.len(), 1);
        assert!(fixtures.groups[0].data.metadata.is_empty());
        assert!(fixtures.events.is_empty());
        assert_eq!(fixtures.code_mappings[0].repository.name, "getsentry/sentry");
    }
}
