//! Error types for the schema registry.
//!
//! Errors are split by the phase that produces them:
//!
//! - [`RegistryError`] - rejected registrations (the registry is left untouched)
//! - [`SchemaError`] - structural problems found while compiling the schema
//! - [`ExecutionError`] - per-field failures, reported in the `errors` list
//! - [`GraphQLError`] - request-level failures surfaced by the executor and
//!   the HTTP handlers

use thiserror::Error;

use crate::hooks::HookError;
use crate::types::TypeKind;

/// A registration call was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A type with this name already exists and overwrite was not requested.
    #[error("type `{0}` is already registered")]
    DuplicateName(String),

    /// A field was registered against a type that does not exist and
    /// deferred registration is disabled.
    #[error("cannot register field `{field_name}`: type `{type_name}` is not registered")]
    UnknownType {
        /// Owner type that was not found.
        type_name: String,
        /// Field that was being registered.
        field_name: String,
    },

    /// The registration input is malformed.
    #[error("invalid registration: {0}")]
    Validation(String),
}

impl RegistryError {
    /// Creates a validation error from a message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Compilation of the registry into a schema failed.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field, argument, interface or union member names an unknown type.
    #[error("`{owner}.{field}` references unknown type `{reference}`")]
    UnresolvedReference {
        /// Type owning the dangling reference.
        owner: String,
        /// Field (or `field(argument)`) holding the reference.
        field: String,
        /// The missing type name.
        reference: String,
    },

    /// A reference points at a type of the wrong kind for its position.
    #[error("`{owner}.{field}` cannot use {kind} type `{reference}` as {position}")]
    KindMismatch {
        /// Type owning the reference.
        owner: String,
        /// Field (or `field(argument)`) holding the reference.
        field: String,
        /// The referenced type.
        reference: String,
        /// Kind of the referenced type.
        kind: TypeKind,
        /// What the position expected, e.g. "an input type".
        position: &'static str,
    },

    /// A scalar is missing one of serialize / parseValue / parseLiteral.
    #[error("scalar `{name}` has no {missing} behaviour")]
    InvalidScalar {
        /// Scalar type name.
        name: String,
        /// The missing behaviour.
        missing: &'static str,
    },

    /// An object, interface or input type has no fields left after hooks ran.
    #[error("type `{0}` must define at least one field")]
    EmptyType(String),

    /// A hook handler failed while the schema was being assembled.
    #[error("hook `{hook}` failed on `{type_name}`: {source}")]
    Hook {
        /// Hook name that was firing.
        hook: String,
        /// Type whose fields were being assembled.
        type_name: String,
        /// Handler error.
        #[source]
        source: HookError,
    },

    /// The GraphQL engine rejected the assembled schema.
    #[error("schema build failed: {0}")]
    Build(String),
}

/// A resolver-level failure.
///
/// These never abort a query: each one nulls its field and becomes an entry
/// in the response's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The resolver returned an error.
    #[error("{0}")]
    Resolver(String),

    /// A custom scalar's serialize behaviour rejected a resolved value.
    #[error("cannot serialize value as `{scalar}`: {message}")]
    ScalarSerialize {
        /// Scalar type name.
        scalar: String,
        /// Message from the scalar.
        message: String,
    },

    /// A custom scalar's parse behaviour rejected an argument.
    #[error("invalid value for argument `{argument}` of type `{scalar}`: {message}")]
    ScalarParse {
        /// Argument name.
        argument: String,
        /// Scalar type name.
        scalar: String,
        /// Message from the scalar.
        message: String,
    },

    /// The request was cancelled before the field resolved.
    #[error("execution cancelled")]
    Cancelled,

    /// The request deadline passed before the field resolved.
    #[error("execution deadline exceeded")]
    DeadlineExceeded,
}

impl ExecutionError {
    /// Creates a resolver error from a message.
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }

    /// Returns the code placed in the error's `extensions.code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolver(_) => "RESOLVER_ERROR",
            Self::ScalarSerialize { .. } => "SCALAR_SERIALIZE_ERROR",
            Self::ScalarParse { .. } => "SCALAR_PARSE_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    /// Converts into the engine's field error, carrying the code as an extension.
    #[must_use]
    pub fn into_field_error(self) -> async_graphql::Error {
        use async_graphql::ErrorExtensions;

        let code = self.code();
        async_graphql::Error::new(self.to_string())
            .extend_with(|_, ext| ext.set("code", code.to_string()))
    }
}

/// Errors surfaced to callers of the query API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphQLError {
    /// The schema could not be compiled.
    #[error("Failed to build GraphQL schema: {0}")]
    SchemaBuildFailed(String),

    /// The request could not be understood (before GraphQL parsing).
    #[error("Invalid GraphQL request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GraphQLError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SchemaBuildFailed(_) | Self::Internal(_) => 500,
            Self::InvalidRequest(_) => 400,
        }
    }

    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaBuildFailed(_) => "SCHEMA_BUILD_FAILED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Renders the error as a GraphQL response body.
    #[must_use]
    pub fn to_response_body(&self) -> serde_json::Value {
        serde_json::json!({
            "errors": [{
                "message": self.to_string(),
                "extensions": {
                    "code": self.error_code()
                }
            }]
        })
    }
}

impl From<SchemaError> for GraphQLError {
    fn from(err: SchemaError) -> Self {
        Self::SchemaBuildFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GraphQLError::SchemaBuildFailed("x".into()).status_code(), 500);
        assert_eq!(GraphQLError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(GraphQLError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GraphQLError::SchemaBuildFailed("x".into()).error_code(),
            "SCHEMA_BUILD_FAILED"
        );
        assert_eq!(ExecutionError::Cancelled.code(), "CANCELLED");
        assert_eq!(ExecutionError::DeadlineExceeded.code(), "DEADLINE_EXCEEDED");
    }

    #[test]
    fn test_schema_error_converts_to_build_failure() {
        let err = SchemaError::UnresolvedReference {
            owner: "RootQuery".into(),
            field: "post".into(),
            reference: "Post".into(),
        };
        let converted = GraphQLError::from(err);

        assert_eq!(
            converted,
            GraphQLError::SchemaBuildFailed(
                "`RootQuery.post` references unknown type `Post`".into()
            )
        );
    }

    #[test]
    fn test_response_body() {
        let body = GraphQLError::InvalidRequest("missing query".into()).to_response_body();

        assert_eq!(body["errors"][0]["extensions"]["code"], "INVALID_REQUEST");
        assert_eq!(
            body["errors"][0]["message"],
            "Invalid GraphQL request: missing query"
        );
    }

    #[test]
    fn test_field_error_carries_code() {
        let err = ExecutionError::resolver("boom").into_field_error();
        assert_eq!(err.message, "boom");
        assert!(err.extensions.is_some());
    }
}
