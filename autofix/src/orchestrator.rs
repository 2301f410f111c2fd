//! Starting autofix runs and reporting their status.
//!
//! A start request is checked against a fixed sequence of preconditions. The
//! first one that fails ends the request, and the failure is recorded on the
//! group as an `ERROR` run so that a poller sees why nothing happened. When
//! every check passes the issue is handed to Seer, a timeout check is scheduled,
//! and the group records a `PROCESSING` run.

use crate::errors::{AutofixError, DispatchError};
use crate::events::{EventSerializer, has_exception_entry};
use crate::features::{AI_AUTOFIX_FEATURE, FeatureFlags};
use crate::metadata::{AUTOFIX_METADATA_KEY, AutofixMetadata};
use crate::metrics_defs::AUTOFIX_START;
use crate::models::{Group, GroupId, User};
use crate::repos::{RepoDefinition, repos_from_code_mappings};
use crate::scheduler::{TaskScheduler, TimeoutCheck};
use crate::seer::{AutofixRequest, IssueDetails, IssueEvent, SeerClient};
use crate::store::{CodeMappingStore, EventStore, GroupStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;

/// Everything a start request needs once its preconditions hold.
struct ValidatedRun {
    entries: Vec<Value>,
    repos: Vec<RepoDefinition>,
}

pub struct AutofixOrchestrator {
    groups: Arc<dyn GroupStore>,
    events: Arc<dyn EventStore>,
    code_mappings: Arc<dyn CodeMappingStore>,
    features: Arc<dyn FeatureFlags>,
    serializer: Arc<dyn EventSerializer>,
    seer: SeerClient,
    scheduler: Arc<dyn TaskScheduler>,
    timeout: Duration,
}

impl AutofixOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        groups: Arc<dyn GroupStore>,
        events: Arc<dyn EventStore>,
        code_mappings: Arc<dyn CodeMappingStore>,
        features: Arc<dyn FeatureFlags>,
        serializer: Arc<dyn EventSerializer>,
        seer: SeerClient,
        scheduler: Arc<dyn TaskScheduler>,
        timeout: Duration,
    ) -> Self {
        AutofixOrchestrator {
            groups,
            events,
            code_mappings,
            features,
            serializer,
            seer,
            scheduler,
            timeout,
        }
    }

    pub async fn group(&self, group_id: GroupId) -> Result<Group, AutofixError> {
        self.groups
            .get_group(group_id)
            .await?
            .ok_or(AutofixError::GroupNotFound(group_id))
    }

    /// Starts a run for `group_id`, replacing whatever run was recorded before.
    ///
    /// Returns `Ok(())` once Seer has accepted the issue. Every error that
    /// [`AutofixError::is_recorded`] has already been written to the group
    /// when it is returned.
    pub async fn start(
        &self,
        group_id: GroupId,
        user: &User,
        additional_context: &str,
    ) -> Result<(), AutofixError> {
        let group = self.group(group_id).await?;
        self.start_for_group(group, user, additional_context).await
    }

    /// Same as [`start`](Self::start) for a group the caller already loaded.
    pub async fn start_for_group(
        &self,
        mut group: Group,
        user: &User,
        additional_context: &str,
    ) -> Result<(), AutofixError> {
        let created_at = Utc::now();

        let result = self
            .try_start(&group, user, additional_context, created_at)
            .await;

        let metadata = match &result {
            Ok(()) => Some(AutofixMetadata::started(created_at)),
            Err(err) if err.is_recorded() => Some(AutofixMetadata::failed(
                created_at,
                Utc::now(),
                err.to_string(),
            )),
            Err(_) => None,
        };
        let Some(metadata) = metadata else {
            counter!(AUTOFIX_START, "outcome" => "internal_error").increment(1);
            return result;
        };

        self.persist(&mut group, &metadata).await?;

        let outcome = match &result {
            Ok(()) => "started",
            Err(err) => err.kind(),
        };
        counter!(AUTOFIX_START, "outcome" => outcome).increment(1);

        result
    }

    /// The last recorded run of `group_id`, exactly as stored.
    pub async fn status(&self, group_id: GroupId) -> Result<Option<Value>, AutofixError> {
        let group = self.group(group_id).await?;
        Ok(group.data.metadata.get(AUTOFIX_METADATA_KEY).cloned())
    }

    async fn try_start(
        &self,
        group: &Group,
        user: &User,
        additional_context: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), AutofixError> {
        let run = self.validate(group, user).await?;

        if let Err(err) = self
            .dispatch(group, &run, additional_context, created_at)
            .await
        {
            tracing::error!(
                group_id = group.id,
                created_at = %created_at,
                error = %err,
                "Failed to send autofix to seer"
            );
            return Err(AutofixError::DownstreamCallFailure(err));
        }

        Ok(())
    }

    async fn validate(&self, group: &Group, user: &User) -> Result<ValidatedRun, AutofixError> {
        if !self.features.has(AI_AUTOFIX_FEATURE, &group.project) {
            return Err(AutofixError::FeatureDisabled);
        }

        let entries = match self.events.latest_event(group).await? {
            Some(event) => self.serializer.entries(&event, user),
            None => Vec::new(),
        };
        if entries.is_empty() {
            return Err(AutofixError::MissingEvent);
        }

        if !has_exception_entry(&entries) {
            return Err(AutofixError::MissingStacktrace);
        }

        let mappings = self.code_mappings.code_mappings(&group.project).await?;
        let repos = repos_from_code_mappings(&mappings);
        if repos.is_empty() {
            return Err(AutofixError::NoLinkedRepository);
        }

        Ok(ValidatedRun { entries, repos })
    }

    async fn dispatch(
        &self,
        group: &Group,
        run: &ValidatedRun,
        additional_context: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        let request = AutofixRequest {
            organization_id: group.project.organization_id,
            project_id: group.project.id,
            repos: &run.repos,
            issue: IssueDetails {
                id: group.id,
                title: &group.title,
                events: vec![IssueEvent {
                    entries: &run.entries,
                }],
            },
            additional_context,
        };
        self.seer.start_autofix(&request).await?;

        self.scheduler
            .schedule(
                TimeoutCheck {
                    group_id: group.id,
                    created_at,
                },
                self.timeout,
            )
            .await?;

        Ok(())
    }

    async fn persist(
        &self,
        group: &mut Group,
        metadata: &AutofixMetadata,
    ) -> Result<(), AutofixError> {
        let value = serde_json::to_value(metadata).map_err(AutofixError::Encode)?;
        group
            .data
            .metadata
            .insert(AUTOFIX_METADATA_KEY.to_string(), value);
        self.groups.save_group(group).await?;
        Ok(())
    }
}
