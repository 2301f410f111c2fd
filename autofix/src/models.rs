//! Records owned by the surrounding issue tracker.
//!
//! These are the shapes the orchestrator reads from its collaborators. Only the
//! fields the autofix flow touches are modelled; everything else an event or a
//! group carries stays in untyped JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type GroupId = u64;
pub type ProjectId = u64;
pub type OrganizationId = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub organization_id: OrganizationId,
    pub slug: String,
}

/// An issue: one deduplicated class of recurring error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub project: Project,
    pub title: String,
    #[serde(default)]
    pub data: GroupData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    /// Free-form metadata. The autofix run lives under its own key; every other
    /// key belongs to someone else and is carried through untouched.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub group_id: GroupId,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Event payload keyed by interface name (`exception`, `request`, ...).
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// The caller on whose behalf a request runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum User {
    #[default]
    Anonymous,
    Authenticated {
        id: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    /// Stored as `owner/name` for hosted providers.
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Code mapping: links a project's stack frames to a path in a repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryProjectPathConfig {
    pub project_id: ProjectId,
    pub repository: Repository,
    #[serde(default)]
    pub stack_root: String,
    #[serde(default)]
    pub source_root: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}
