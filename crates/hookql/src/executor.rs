//! Query execution against a compiled schema.
//!
//! [`QueryExecutor`] turns an [`ExecutionRequest`] into an engine request,
//! attaches the per-request [`ExecutionScope`] (variables, deadline and
//! cancellation token) and shapes the engine response into an
//! [`ExecutionResult`].
//!
//! Field errors never abort the query. Every failing field resolves to
//! null and adds one entry to `errors`; an expired deadline or a cancelled
//! token fails only the fields that had not resolved yet.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_graphql::{Request, Response, Variables};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::GraphQLConfig;
use crate::error::{ExecutionError, GraphQLError};
use crate::schema::CompiledSchema;

/// Per-request state visible to every field resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecutionScope {
    variables: Arc<Variables>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl ExecutionScope {
    pub(crate) fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Fails if the request was cancelled or ran past its deadline.
    pub(crate) fn ensure_active(&self) -> Result<(), ExecutionError> {
        if self.cancellation.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            return Err(ExecutionError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs a resolver future until it completes, the request is cancelled
    /// or the deadline passes.
    pub(crate) async fn run<F>(&self, fut: F) -> Result<async_graphql::Value, ExecutionError>
    where
        F: Future<Output = Result<async_graphql::Value, ExecutionError>>,
    {
        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(ExecutionError::Cancelled),
            () = expired => Err(ExecutionError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

/// A query plus everything that goes with it.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub query: String,
    pub operation_name: Option<String>,
    /// Variables as a JSON object.
    pub variables: Option<serde_json::Value>,
    /// Overrides the configured execution timeout.
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl ExecutionRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Result of executing a query.
///
/// Serializes to `{"data": ..., "errors": [...]}`. `errors` is left out
/// entirely when nothing failed, and `data` when the request failed before
/// execution started. A failing nullable field is null in `data` and its
/// error carries the field's `path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,
}

impl ExecutionResult {
    /// True if no error was reported.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The result as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Error codes (`extensions.code`) of all errors, in order.
    #[must_use]
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|e| e.pointer("/extensions/code")?.as_str())
            .collect()
    }
}

impl From<Response> for ExecutionResult {
    fn from(resp: Response) -> Self {
        let data_json = serde_json::to_value(&resp.data).unwrap_or(serde_json::Value::Null);
        // Request errors carry neither a path nor a code; once a field ran,
        // `data` is reported even when it ended up null.
        let executed = resp.errors.iter().any(|e| {
            !e.path.is_empty()
                || e.extensions
                    .as_ref()
                    .is_some_and(|ext| ext.get("code").is_some())
        });
        let data = if data_json.is_null() && !executed {
            None
        } else {
            Some(data_json)
        };

        let errors = resp
            .errors
            .iter()
            .map(|e| serde_json::to_value(e).unwrap_or_else(|_| serde_json::json!({"message": e.message})))
            .collect();

        Self { data, errors }
    }
}

/// Executes requests against a compiled schema.
#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    default_timeout: Option<Duration>,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(config: &GraphQLConfig) -> Self {
        Self {
            default_timeout: config.execution_timeout(),
        }
    }

    /// Executes `request` against `schema`.
    ///
    /// # Errors
    ///
    /// Returns `GraphQLError::InvalidRequest` for an empty query or
    /// variables that are not a JSON object. Parse, validation and field
    /// errors are reported inside the result.
    pub async fn execute(
        &self,
        schema: &CompiledSchema,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, GraphQLError> {
        if request.query.trim().is_empty() {
            return Err(GraphQLError::InvalidRequest("query must not be empty".into()));
        }
        let variables = match request.variables {
            None | Some(serde_json::Value::Null) => Variables::default(),
            Some(vars @ serde_json::Value::Object(_)) => Variables::from_json(vars),
            Some(_) => {
                return Err(GraphQLError::InvalidRequest(
                    "variables must be a JSON object".into(),
                ));
            }
        };

        let timeout = request.timeout.or(self.default_timeout);
        let scope = ExecutionScope {
            variables: Arc::new(variables.clone()),
            deadline: timeout.map(|t| Instant::now() + t),
            cancellation: request.cancellation.unwrap_or_default(),
        };

        let mut gql_request = Request::new(request.query).variables(variables).data(scope);
        if let Some(op_name) = request.operation_name {
            gql_request = gql_request.operation_name(op_name);
        }

        debug!(generation = schema.generation(), timeout = ?timeout, "Executing GraphQL query");
        let response = schema.schema().execute(gql_request).await;
        let result = ExecutionResult::from(response);
        if !result.is_ok() {
            debug!(errors = result.errors.len(), "GraphQL query finished with errors");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_key_absent_when_empty() {
        let result = ExecutionResult {
            data: Some(serde_json::json!({"testScalar": "test"})),
            errors: Vec::new(),
        };
        let json = result.to_json();
        assert_eq!(json, serde_json::json!({"data": {"testScalar": "test"}}));
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_error_codes() {
        let result = ExecutionResult {
            data: None,
            errors: vec![
                serde_json::json!({"message": "x", "extensions": {"code": "CANCELLED"}}),
                serde_json::json!({"message": "y"}),
            ],
        };
        assert_eq!(result.error_codes(), vec!["CANCELLED"]);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_data_kept_after_execution_started() {
        let mut resp = Response::new(async_graphql::Value::Null);
        let mut err = async_graphql::ServerError::new("boom", None);
        err.path = vec![async_graphql::PathSegment::Field("boom".into())];
        resp.errors.push(err);
        let result = ExecutionResult::from(resp);
        assert_eq!(result.data, Some(serde_json::Value::Null));
        assert_eq!(result.to_json()["data"], serde_json::Value::Null);
        assert!(result.to_json().get("data").is_some());
    }

    #[test]
    fn test_data_absent_for_request_errors() {
        let resp = Response::from_errors(vec![async_graphql::ServerError::new(
            "Unknown field \"nope\"",
            None,
        )]);
        let result = ExecutionResult::from(resp);
        assert_eq!(result.data, None);
        assert!(result.to_json().get("data").is_none());
    }

    #[tokio::test]
    async fn test_scope_cancellation() {
        let token = CancellationToken::new();
        let scope = ExecutionScope {
            cancellation: token.clone(),
            ..ExecutionScope::default()
        };
        assert!(scope.ensure_active().is_ok());

        token.cancel();
        assert_eq!(scope.ensure_active(), Err(ExecutionError::Cancelled));
        let result = scope
            .run(std::future::pending::<Result<async_graphql::Value, ExecutionError>>())
            .await;
        assert_eq!(result, Err(ExecutionError::Cancelled));
    }

    #[tokio::test]
    async fn test_scope_deadline() {
        let scope = ExecutionScope {
            deadline: Some(Instant::now() + Duration::from_millis(10)),
            ..ExecutionScope::default()
        };
        let result = scope
            .run(std::future::pending::<Result<async_graphql::Value, ExecutionError>>())
            .await;
        assert_eq!(result, Err(ExecutionError::DeadlineExceeded));
        assert_eq!(scope.ensure_active(), Err(ExecutionError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_scope_passes_result_through() {
        let scope = ExecutionScope::default();
        let result = scope
            .run(async { Ok(async_graphql::Value::Boolean(true)) })
            .await;
        assert_eq!(result, Ok(async_graphql::Value::Boolean(true)));
    }

    #[test]
    fn test_request_builder() {
        let request = ExecutionRequest::new("{ hello }")
            .operation_name("Hello")
            .variables(serde_json::json!({"id": "1"}))
            .timeout(Duration::from_secs(1));
        assert_eq!(request.operation_name.as_deref(), Some("Hello"));
        assert_eq!(request.timeout, Some(Duration::from_secs(1)));
    }
}
