use crate::models::GroupId;
use crate::scheduler::ScheduleError;
use crate::seer::SeerError;
use crate::store::StoreError;
use hyper::StatusCode;
use thiserror::Error;

/// Why handing the run over to Seer failed.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Seer(#[from] SeerError),
    #[error("could not schedule timeout check: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Errors returned by the autofix endpoints.
///
/// The first five variants are the outcomes of a start request that get
/// recorded on the group; their `Display` is the user-facing reason.
#[derive(Error, Debug)]
pub enum AutofixError {
    #[error("AI Autofix is not enabled for this project.")]
    FeatureDisabled,

    #[error("Cannot fix issues without an event.")]
    MissingEvent,

    #[error("Cannot fix issues without a stacktrace.")]
    MissingStacktrace,

    #[error("Found no Github repositories linked to this project.")]
    NoLinkedRepository,

    #[error("Failed to send autofix to seer.")]
    DownstreamCallFailure(#[source] DispatchError),

    #[error("group {0} does not exist")]
    GroupNotFound(GroupId),

    #[error("Malformed request body.")]
    MalformedBody(#[source] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("could not encode autofix metadata: {0}")]
    Encode(#[source] serde_json::Error),
}

impl AutofixError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AutofixError::FeatureDisabled => StatusCode::FORBIDDEN,
            AutofixError::MissingEvent
            | AutofixError::MissingStacktrace
            | AutofixError::NoLinkedRepository
            | AutofixError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AutofixError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            AutofixError::DownstreamCallFailure(_)
            | AutofixError::Store(_)
            | AutofixError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this outcome is written to the group as an `ERROR` run.
    pub fn is_recorded(&self) -> bool {
        matches!(
            self,
            AutofixError::FeatureDisabled
                | AutofixError::MissingEvent
                | AutofixError::MissingStacktrace
                | AutofixError::NoLinkedRepository
                | AutofixError::DownstreamCallFailure(_)
        )
    }

    /// Message returned in the `detail` field of the error body.
    pub fn detail(&self) -> String {
        match self {
            AutofixError::GroupNotFound(_) => "The requested resource does not exist".to_string(),
            AutofixError::Store(_) | AutofixError::Encode(_) => "Internal Error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Short tag used for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            AutofixError::FeatureDisabled => "feature_disabled",
            AutofixError::MissingEvent => "missing_event",
            AutofixError::MissingStacktrace => "missing_stacktrace",
            AutofixError::NoLinkedRepository => "no_linked_repository",
            AutofixError::DownstreamCallFailure(_) => "downstream_call_failure",
            AutofixError::GroupNotFound(_) => "group_not_found",
            AutofixError::MalformedBody(_) => "malformed_body",
            AutofixError::Store(_) => "store_error",
            AutofixError::Encode(_) => "encode_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_outcomes() {
        let cases = [
            (
                AutofixError::FeatureDisabled,
                StatusCode::FORBIDDEN,
                "AI Autofix is not enabled for this project.",
            ),
            (
                AutofixError::MissingEvent,
                StatusCode::BAD_REQUEST,
                "Cannot fix issues without an event.",
            ),
            (
                AutofixError::MissingStacktrace,
                StatusCode::BAD_REQUEST,
                "Cannot fix issues without a stacktrace.",
            ),
            (
                AutofixError::NoLinkedRepository,
                StatusCode::BAD_REQUEST,
                "Found no Github repositories linked to this project.",
            ),
            (
                AutofixError::DownstreamCallFailure(DispatchError::Schedule(
                    ScheduleError::QueueClosed,
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send autofix to seer.",
            ),
        ];

        for (error, status, detail) in cases {
            assert!(error.is_recorded());
            assert_eq!(error.status_code(), status);
            assert_eq!(error.detail(), detail);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let error = AutofixError::Store(StoreError::MissingGroup(1));
        assert!(!error.is_recorded());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.detail(), "Internal Error");

        let error = AutofixError::GroupNotFound(1);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.detail(), "The requested resource does not exist");
    }
}
