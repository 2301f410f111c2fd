//! Event serialization into API "entries".
//!
//! An entry is `{"type": <external type>, "data": <interface payload>}`, one per
//! interface present on the event. Seer only needs to see the exception entry,
//! but it receives every entry so it can use request and breadcrumb context too.

use crate::models::{Event, User};
use serde_json::{Value, json};

pub const EXCEPTION_ENTRY_TYPE: &str = "exception";

pub trait EventSerializer: Send + Sync {
    /// Serializes `event` as seen by `user`.
    fn entries(&self, event: &Event, user: &User) -> Vec<Value>;
}

/// Interface aliases mapped to their external entry type, in display order.
const INTERFACES: &[(&[&str], &str)] = &[
    (&["exception", "sentry.interfaces.Exception"], "exception"),
    (&["threads"], "threads"),
    (&["stacktrace", "sentry.interfaces.Stacktrace"], "stacktrace"),
    (&["request", "sentry.interfaces.Http"], "request"),
    (&["logentry", "sentry.interfaces.Message"], "message"),
    (&["template", "sentry.interfaces.Template"], "template"),
    (&["csp"], "csp"),
    (&["breadcrumbs"], "breadcrumbs"),
    (&["debug_meta"], "debugmeta"),
];

fn interface_rank(key: &str) -> Option<(usize, &'static str)> {
    INTERFACES
        .iter()
        .enumerate()
        .find(|(_, (aliases, _))| aliases.contains(&key))
        .map(|(rank, (_, external_type))| (rank, *external_type))
}

/// Builds entries from the known interfaces on the event payload.
///
/// The `user` interface and keys that are not interfaces (tags, contexts, ...)
/// never become entries. Null interfaces are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct InterfaceEntrySerializer;

impl EventSerializer for InterfaceEntrySerializer {
    fn entries(&self, event: &Event, _user: &User) -> Vec<Value> {
        let mut ranked: Vec<(usize, Value)> = event
            .data
            .iter()
            .filter(|(_, data)| !data.is_null())
            .filter_map(|(key, data)| {
                let (rank, external_type) = interface_rank(key)?;
                Some((rank, json!({"type": external_type, "data": data})))
            })
            .collect();

        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, entry)| entry).collect()
    }
}

pub fn has_exception_entry(entries: &[Value]) -> bool {
    entries
        .iter()
        .any(|entry| entry.get("type").and_then(Value::as_str) == Some(EXCEPTION_ENTRY_TYPE))
}
