//! # hookql
//!
//! A dynamic, hook-extensible GraphQL schema registry.
//!
//! Types, fields and custom scalars are registered at runtime. Third-party
//! code reshapes the schema through ordered field hooks that fire while the
//! schema compiles. Queries run against a lazily compiled schema that stays
//! cached until the next registration.
//!
//! ## Overview
//!
//! ```text
//! register_* --> TypeRegistry --compile + hooks--> SchemaCache --> QueryExecutor
//!      \______________________ invalidate ___________/
//! ```
//!
//! [`SchemaHost`] ties the pieces together and is the entry point for
//! both registration and queries.
//!
//! ## Endpoints
//!
//! - `POST /graphql` - JSON body `{query, operationName?, variables?}`
//! - `GET /graphql` - query via URL params
//!
//! ## Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! defer_unknown_types = true
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`types`] - Type, field, scalar and resolver definitions
//! - [`registry`] - Type registry and registrars
//! - [`hooks`] - Priority-ordered extension points
//! - [`schema`] - Schema compilation and caching
//! - [`executor`] - Query execution
//! - [`connection`] - Cursor-paginated connections
//! - [`host`] - Registration and query facade
//! - [`handler`] - Axum HTTP handlers
//! - [`error`] - Error types

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod handler;
pub mod hooks;
pub mod host;
pub mod registry;
pub mod schema;
pub mod types;

// Re-export main types
pub use config::GraphQLConfig;
pub use connection::{ConnectionConfig, PAGE_INFO_TYPE};
pub use error::{ExecutionError, GraphQLError, RegistryError, SchemaError};
pub use executor::{ExecutionRequest, ExecutionResult, QueryExecutor};
pub use handler::{GraphQLState, graphql_handler, graphql_handler_get, router};
pub use hooks::{
    DEFAULT_PRIORITY, ExtensionPointDispatcher, FieldHooks, FieldsHookContext, HookError, HookId,
    INPUT_FIELDS_HOOK, INTERFACE_FIELDS_HOOK, OBJECT_FIELDS_HOOK,
};
pub use host::SchemaHost;
pub use registry::{DuplicatePolicy, TypeRegistry, format_field_name, format_type_name};
pub use schema::{CompileConfig, CompiledSchema, SchemaCache, SchemaCompiler, SchemaState};
pub use types::{
    ArgumentDefinition, EnumValueDefinition, FieldDefinition, FieldMap, ResolveInfo, Resolver,
    ScalarBehavior, ScalarDefinition, TypeDefinition, TypeKind, TypeReference,
};

/// Result type for the query API.
pub type Result<T> = std::result::Result<T, GraphQLError>;
