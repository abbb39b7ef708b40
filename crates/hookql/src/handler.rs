//! Axum HTTP handlers for the GraphQL endpoint.
//!
//! - `POST /graphql` - JSON body `{query, operationName?, variables?}`
//! - `GET /graphql` - query, operation name and variables as URL params
//!
//! GraphQL errors (parse, validation, field) are answered with `200 OK` and
//! an `errors` list. Only failures before execution, such as a schema that
//! does not compile or a malformed request, change the status code.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GraphQLError;
use crate::executor::ExecutionRequest;
use crate::host::SchemaHost;

/// State shared across GraphQL handlers.
#[derive(Clone)]
pub struct GraphQLState {
    pub host: Arc<SchemaHost>,
}

/// GraphQL request body.
#[derive(Debug, Deserialize)]
pub struct GraphQLRequest {
    /// The GraphQL query string.
    pub query: String,

    /// Optional operation name for multi-operation documents.
    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,

    /// Optional variables for the query.
    pub variables: Option<serde_json::Value>,
}

/// Query parameters for GET requests.
#[derive(Debug, Deserialize)]
pub struct GraphQLQueryParams {
    /// The GraphQL query string.
    pub query: Option<String>,

    /// Optional operation name.
    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,

    /// Optional variables (JSON string).
    pub variables: Option<String>,
}

impl From<GraphQLRequest> for ExecutionRequest {
    fn from(request: GraphQLRequest) -> Self {
        let mut exec = ExecutionRequest::new(request.query);
        exec.operation_name = request.operation_name;
        exec.variables = request.variables;
        exec
    }
}

/// Routes `/graphql` to the handlers.
pub fn router(host: Arc<SchemaHost>) -> Router {
    Router::new()
        .route("/graphql", get(graphql_handler_get).post(graphql_handler))
        .with_state(GraphQLState { host })
}

/// Handles POST requests to /graphql.
pub async fn graphql_handler(
    State(state): State<GraphQLState>,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    debug!("Processing GraphQL request");
    execute_graphql(&state, request).await
}

/// Handles GET requests to /graphql.
pub async fn graphql_handler_get(
    State(state): State<GraphQLState>,
    Query(params): Query<GraphQLQueryParams>,
) -> Response {
    let request = match params_to_request(params) {
        Ok(req) => req,
        Err(e) => {
            return error_response(&GraphQLError::InvalidRequest(format!(
                "variables are not valid JSON: {e}"
            )));
        }
    };

    debug!("Processing GraphQL GET request");
    execute_graphql(&state, request).await
}

async fn execute_graphql(state: &GraphQLState, request: GraphQLRequest) -> Response {
    match state.host.execute_request(request.into()).await {
        Ok(result) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            Json(result),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "GraphQL request failed");
            error_response(&e)
        }
    }
}

/// Converts GET query params to a GraphQL request.
fn params_to_request(params: GraphQLQueryParams) -> Result<GraphQLRequest, serde_json::Error> {
    let variables = if let Some(vars_str) = params.variables {
        Some(serde_json::from_str(&vars_str)?)
    } else {
        None
    };

    Ok(GraphQLRequest {
        query: params.query.unwrap_or_default(),
        operation_name: params.operation_name,
        variables,
    })
}

/// Returns an error response.
fn error_response(error: &GraphQLError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error.to_response_body()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_request_deserialize() {
        let json = r#"{
            "query": "{ testScalar }",
            "operationName": "GetScalar",
            "variables": {"foo": "bar"}
        }"#;

        let request: GraphQLRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.query, "{ testScalar }");
        assert_eq!(request.operation_name, Some("GetScalar".to_string()));
        assert!(request.variables.is_some());
    }

    #[test]
    fn test_graphql_request_minimal() {
        let json = r#"{"query": "{ testScalar }"}"#;

        let request: GraphQLRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.query, "{ testScalar }");
        assert!(request.operation_name.is_none());
        assert!(request.variables.is_none());
    }

    #[test]
    fn test_params_to_request() {
        let params = GraphQLQueryParams {
            query: Some("{ testScalar }".to_string()),
            operation_name: Some("GetScalar".to_string()),
            variables: Some(r#"{"foo": "bar"}"#.to_string()),
        };

        let request = params_to_request(params).unwrap();
        assert_eq!(request.query, "{ testScalar }");
        assert_eq!(request.operation_name, Some("GetScalar".to_string()));
        assert!(request.variables.is_some());
    }

    #[test]
    fn test_params_to_request_invalid_variables() {
        let params = GraphQLQueryParams {
            query: Some("{ testScalar }".to_string()),
            operation_name: None,
            variables: Some("not valid json".to_string()),
        };

        assert!(params_to_request(params).is_err());
    }

    #[test]
    fn test_request_into_execution_request() {
        let request = GraphQLRequest {
            query: "query Q { a }".into(),
            operation_name: Some("Q".into()),
            variables: Some(serde_json::json!({"x": 1})),
        };
        let exec = ExecutionRequest::from(request);
        assert_eq!(exec.query, "query Q { a }");
        assert_eq!(exec.operation_name.as_deref(), Some("Q"));
        assert_eq!(exec.variables, Some(serde_json::json!({"x": 1})));
    }

    #[test]
    fn test_error_response_status() {
        let response = error_response(&GraphQLError::InvalidRequest("bad".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&GraphQLError::SchemaBuildFailed("broken".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
