use crate::errors::AutofixError;
use crate::metrics_defs::REQUEST_DURATION;
use crate::models::{GroupId, User};
use crate::orchestrator::AutofixOrchestrator;
use http::header::ALLOW;
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use serde::Deserialize;
use serde_json::json;
use shared::histogram;
use shared::http::{ResponseBody, empty_response, json_response};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

const NOT_FOUND_DETAIL: &str = "The requested resource does not exist";

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    #[serde(default)]
    additional_context: Option<String>,
}

/// Serves `GET` and `POST` on `/groups/{group_id}/ai-autofix/`.
///
/// The caller is taken from the [`User`] request extension; requests without
/// one run as [`User::Anonymous`].
#[derive(Clone)]
pub struct AutofixService {
    orchestrator: Arc<AutofixOrchestrator>,
}

impl AutofixService {
    pub fn new(orchestrator: Arc<AutofixOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle<B>(&self, request: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let started = Instant::now();
        let method = request.method().clone();

        let response = self.route(request).await;

        histogram!(
            REQUEST_DURATION,
            "method" => method.to_string(),
            "status" => response.status().as_str().to_owned()
        )
        .record(started.elapsed().as_secs_f64());

        response
    }

    async fn route<B>(&self, request: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let Some(group_id) = group_id_from_path(request.uri().path()) else {
            return detail_response(StatusCode::NOT_FOUND, NOT_FOUND_DETAIL);
        };

        let result = match request.method().clone() {
            Method::GET => self.get(group_id).await,
            Method::POST => self.post(group_id, request).await,
            other => return method_not_allowed(&other),
        };

        result.unwrap_or_else(|err| error_response(group_id, &err))
    }

    async fn get(&self, group_id: GroupId) -> Result<Response<ResponseBody>, AutofixError> {
        let autofix = self.orchestrator.status(group_id).await?;
        Ok(json_response(StatusCode::OK, &json!({ "autofix": autofix })))
    }

    async fn post<B>(
        &self,
        group_id: GroupId,
        request: Request<B>,
    ) -> Result<Response<ResponseBody>, AutofixError>
    where
        B: Body,
        B::Error: Display,
    {
        let group = self.orchestrator.group(group_id).await?;

        let (parts, body) = request.into_parts();
        let user = parts.extensions.get::<User>().cloned().unwrap_or_default();

        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::debug!(group_id, error = %err, "Failed to read request body");
                return Ok(detail_response(
                    StatusCode::BAD_REQUEST,
                    "Failed to read request body.",
                ));
            }
        };

        let start_request = if bytes.iter().all(u8::is_ascii_whitespace) {
            StartRequest::default()
        } else {
            serde_json::from_slice(&bytes).map_err(AutofixError::MalformedBody)?
        };
        let additional_context = start_request.additional_context.unwrap_or_default();

        self.orchestrator
            .start_for_group(group, &user, &additional_context)
            .await?;

        Ok(empty_response(StatusCode::ACCEPTED))
    }
}

impl Service<Request<Incoming>> for AutofixService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(request).await) })
    }
}

/// Extracts the group id from `/groups/{group_id}/ai-autofix/`. The trailing
/// slash is optional.
fn group_id_from_path(path: &str) -> Option<GroupId> {
    let rest = path.strip_prefix("/groups/")?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let id = rest.strip_suffix("/ai-autofix")?;
    id.parse().ok()
}

fn detail_response(status: StatusCode, detail: &str) -> Response<ResponseBody> {
    json_response(status, &json!({ "detail": detail }))
}

fn method_not_allowed(method: &Method) -> Response<ResponseBody> {
    let mut response = detail_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &format!("Method \"{method}\" not allowed."),
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, POST"));
    response
}

fn error_response(group_id: GroupId, err: &AutofixError) -> Response<ResponseBody> {
    let status = err.status_code();
    if status.is_server_error() && !err.is_recorded() {
        tracing::error!(group_id, error = %err, "Autofix request failed");
    }
    detail_response(status, &err.detail())
}
