use crate::events::InterfaceEntrySerializer;
use crate::features::{AI_AUTOFIX_FEATURE, FeatureConfig, StaticFeatureFlags};
use crate::models::{
    Event, Group, GroupData, GroupId, Project, Repository, RepositoryProjectPathConfig,
};
use crate::orchestrator::AutofixOrchestrator;
use crate::scheduler::{ScheduleError, TaskScheduler, TimeoutCheck};
use crate::seer::SeerClient;
use crate::store::InMemoryStore;
use async_trait::async_trait;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub fn sample_group() -> Group {
    let metadata = json!({"type": "error", "value": "bad"});
    Group {
        id: 42,
        project: Project {
            id: 2,
            organization_id: 1,
            slug: "backend".to_string(),
        },
        title: "ValueError: bad".to_string(),
        data: GroupData {
            metadata: serde_json::from_value(metadata).unwrap(),
        },
    }
}

pub fn event_with_data(data: Value) -> Event {
    Event {
        event_id: "b".repeat(32),
        group_id: sample_group().id,
        datetime: Utc::now(),
        platform: Some("python".to_string()),
        data: serde_json::from_value(data).unwrap(),
    }
}

pub fn sample_event(group_id: GroupId) -> Event {
    let mut event = event_with_data(json!({
        "exception": {
            "values": [{
                "type": "ValueError",
                "value": "bad",
                "stacktrace": {"frames": [{"filename": "app/views.py", "lineno": 12}]},
            }],
        },
        "request": {"url": "http://example.com/checkout"},
        "tags": [["level", "error"]],
    }));
    event.group_id = group_id;
    event
}

pub fn sample_mapping(id: u64, name: &str) -> RepositoryProjectPathConfig {
    RepositoryProjectPathConfig {
        project_id: sample_group().project.id,
        repository: Repository {
            id,
            name: name.to_string(),
            provider: Some("integrations:github".to_string()),
        },
        stack_root: "app/".to_string(),
        source_root: "src/app/".to_string(),
        default_branch: Some("master".to_string()),
    }
}

/// The sample group with one event and a linked repository.
pub fn seeded_store() -> Arc<InMemoryStore> {
    store_with(
        vec![sample_event(sample_group().id)],
        vec![sample_mapping(1, "getsentry/sentry")],
    )
}

pub fn store_with(
    events: Vec<Event>,
    mappings: Vec<RepositoryProjectPathConfig>,
) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_group(sample_group());
    for event in events {
        store.insert_event(event);
    }
    for mapping in mappings {
        store.insert_code_mapping(mapping);
    }
    store
}

pub fn test_orchestrator(
    store: Arc<InMemoryStore>,
    feature_enabled: bool,
    seer_url: &Url,
    scheduler: Arc<dyn TaskScheduler>,
) -> AutofixOrchestrator {
    let features = StaticFeatureFlags::new(HashMap::from([(
        AI_AUTOFIX_FEATURE.to_string(),
        FeatureConfig {
            enabled: feature_enabled,
            ..Default::default()
        },
    )]));

    AutofixOrchestrator::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(features),
        Arc::new(InterfaceEntrySerializer),
        SeerClient::new(seer_url, Duration::from_secs(5)).unwrap(),
        scheduler,
        Duration::from_secs(1800),
    )
}

/// Scheduler that keeps every task instead of running it.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(TimeoutCheck, Duration)>>,
    fail: bool,
}

impl RecordingScheduler {
    pub fn failing() -> Self {
        RecordingScheduler {
            fail: true,
            ..Default::default()
        }
    }

    pub fn scheduled(&self) -> Vec<(TimeoutCheck, Duration)> {
        self.scheduled.lock().clone()
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule(&self, task: TimeoutCheck, countdown: Duration) -> Result<(), ScheduleError> {
        if self.fail {
            return Err(ScheduleError::QueueClosed);
        }
        self.scheduled.lock().push((task, countdown));
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub body: Value,
}

/// Loopback stand-in for Seer that records what it receives and always
/// answers with the same status.
pub struct TestSeerServer {
    port: u16,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl TestSeerServer {
    pub async fn start(status: StatusCode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));

        let recorded = received.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let recorded = recorded.clone();

                let service = service_fn(move |req: Request<Incoming>| {
                    let recorded = recorded.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        let content_type = req
                            .headers()
                            .get(CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .map(String::from);
                        let bytes = req
                            .into_body()
                            .collect()
                            .await
                            .map(|collected| collected.to_bytes())
                            .unwrap_or_default();
                        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

                        recorded.lock().push(ReceivedRequest {
                            path,
                            content_type,
                            body,
                        });

                        let mut response = Response::new(Full::new(Bytes::new()));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });

                tokio::spawn(async move {
                    if let Err(err) =
                        hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                            .serve_connection(io, service)
                            .await
                    {
                        eprintln!("Error serving connection: {:?}", err);
                    }
                });
            }
        });

        TestSeerServer { port, received }
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}", self.port)).unwrap()
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().clone()
    }

    /// A loopback URL nothing is listening on.
    pub fn unreachable_url() -> Url {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }
}
