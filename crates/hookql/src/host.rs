//! The registration and query facade.
//!
//! [`SchemaHost`] owns the type registry, the field hooks and the schema
//! cache. Every successful registration invalidates the cache, so the next
//! query compiles a schema that includes it.
//!
//! ```ignore
//! let host = SchemaHost::new(GraphQLConfig::default())?;
//! host.register_scalar(ScalarDefinition::identity("TestScalar"))?;
//! host.register_field(
//!     "RootQuery",
//!     "testScalar",
//!     FieldDefinition::new("testScalar", "TestScalar")?.resolver(Resolver::constant("test")),
//! )?;
//! let result = host.execute("{ testScalar }", None).await?;
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::GraphQLConfig;
use crate::connection::ConnectionConfig;
use crate::error::{GraphQLError, RegistryError};
use crate::executor::{ExecutionRequest, ExecutionResult, QueryExecutor};
use crate::hooks::{FieldHooks, FieldsHookContext, HookError, HookId, INPUT_FIELDS_HOOK};
use crate::registry::{DuplicatePolicy, TypeRegistry};
use crate::schema::{CompiledSchema, SchemaCache, SchemaCompiler, SchemaState};
use crate::types::{FieldDefinition, FieldMap, ScalarDefinition, TypeDefinition};

/// Owns the registry, hooks and compiled schema of one GraphQL API.
pub struct SchemaHost {
    config: GraphQLConfig,
    registry: RwLock<TypeRegistry>,
    hooks: RwLock<FieldHooks>,
    cache: SchemaCache,
    executor: QueryExecutor,
}

impl SchemaHost {
    /// Creates a host with an empty query root.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` if the config is invalid.
    pub fn new(config: GraphQLConfig) -> Result<Self, RegistryError> {
        config.validate().map_err(RegistryError::Validation)?;

        let mut registry = TypeRegistry::new();
        registry.set_defer_unknown_types(config.defer_unknown_types);
        registry.register_type(
            TypeDefinition::object(&config.query_type).description("The root entry point into the Graph"),
        )?;
        registry.register_type(
            TypeDefinition::object(&config.mutation_type)
                .description("The root mutation"),
        )?;

        info!(
            query_type = %config.query_type,
            defer_unknown_types = config.defer_unknown_types,
            "GraphQL schema host created"
        );

        Ok(Self {
            executor: QueryExecutor::new(&config),
            config,
            registry: RwLock::new(registry),
            hooks: RwLock::new(FieldHooks::new()),
            cache: SchemaCache::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &GraphQLConfig {
        &self.config
    }

    /// Applies `f` to the registry and invalidates the schema if it succeeded.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut TypeRegistry) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let result = f(&mut self.registry.write());
        if result.is_ok() {
            self.cache.invalidate();
        }
        result
    }

    /// Registers a type, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_type`].
    pub fn register_type(&self, def: TypeDefinition) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_type(def))
    }

    /// Registers a type with an explicit duplicate policy.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_type_with`].
    pub fn register_type_with(
        &self,
        def: TypeDefinition,
        policy: DuplicatePolicy,
    ) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_type_with(def, policy))
    }

    /// Removes a type. Fields other types declare against it stay and fail
    /// the next compile until they are removed too.
    pub fn deregister_type(&self, name: &str) -> bool {
        let removed = self.registry.write().remove_type(name).is_some();
        if removed {
            self.cache.invalidate();
        }
        removed
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_scalar`].
    pub fn register_scalar(&self, scalar: ScalarDefinition) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_scalar(scalar))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_scalar_with`].
    pub fn register_scalar_with(
        &self,
        scalar: ScalarDefinition,
        policy: DuplicatePolicy,
    ) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_scalar_with(scalar, policy))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_field`].
    pub fn register_field(
        &self,
        type_name: &str,
        field_name: &str,
        def: FieldDefinition,
    ) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_field(type_name, field_name, def))
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_fields`].
    pub fn register_fields<I>(&self, type_name: &str, fields: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = FieldDefinition>,
    {
        self.mutate(|registry| registry.register_fields(type_name, fields))
    }

    /// Removes a field, registered or pending. Always invalidates the schema.
    pub fn deregister_field(&self, type_name: &str, field_name: &str) -> bool {
        let removed = self.registry.write().deregister_field(type_name, field_name);
        self.cache.invalidate();
        removed
    }

    /// # Errors
    ///
    /// See [`TypeRegistry::register_connection`].
    pub fn register_connection(&self, config: ConnectionConfig) -> Result<(), RegistryError> {
        self.mutate(|registry| registry.register_connection(config))
    }

    /// Adds a field hook under `hook_name`.
    pub fn add_fields_hook<F>(&self, hook_name: impl Into<String>, priority: i32, handler: F) -> HookId
    where
        F: Fn(FieldMap, &FieldsHookContext) -> Result<FieldMap, HookError> + Send + Sync + 'static,
    {
        let id = self.hooks.write().add_hook(hook_name, priority, handler);
        self.cache.invalidate();
        id
    }

    /// Adds a hook fired for every input object type.
    pub fn add_input_fields_hook<F>(&self, priority: i32, handler: F) -> HookId
    where
        F: Fn(FieldMap, &FieldsHookContext) -> Result<FieldMap, HookError> + Send + Sync + 'static,
    {
        self.add_fields_hook(INPUT_FIELDS_HOOK, priority, handler)
    }

    pub fn remove_hook(&self, id: HookId) -> bool {
        let removed = self.hooks.write().remove_hook(id);
        if removed {
            self.cache.invalidate();
        }
        removed
    }

    /// Read access to the registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&TypeRegistry) -> R) -> R {
        f(&self.registry.read())
    }

    /// Drops the compiled schema; the next query recompiles.
    pub fn clear_schema(&self) {
        self.cache.invalidate();
    }

    /// Returns the compiled schema, compiling it first if needed.
    ///
    /// # Errors
    ///
    /// Returns `GraphQLError::SchemaBuildFailed` if compilation fails.
    pub async fn schema(&self) -> Result<Arc<CompiledSchema>, GraphQLError> {
        self.cache
            .get_or_compile(|| {
                let registry = Arc::new(self.registry.read().clone());
                let hooks = self.hooks.read().clone();
                let compiler = SchemaCompiler::new(registry, hooks, self.config.to_compile_config());
                move |generation: u64| compiler.compile(generation)
            })
            .await
    }

    /// Executes a query with optional JSON variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be compiled or the request is
    /// malformed. Field errors are reported inside the result.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<ExecutionResult, GraphQLError> {
        let mut request = ExecutionRequest::new(query);
        request.variables = variables;
        self.execute_request(request).await
    }

    /// Executes a fully specified request.
    ///
    /// # Errors
    ///
    /// See [`SchemaHost::execute`].
    pub async fn execute_request(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, GraphQLError> {
        let schema = self.schema().await?;
        debug!(operation = ?request.operation_name, "Executing request");
        self.executor.execute(&schema, request).await
    }

    #[must_use]
    pub fn schema_state(&self) -> SchemaState {
        self.cache.state()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cache.is_ready()
    }

    /// Message of the last failed compile, until the next change.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.cache.last_error()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Number of compiles run so far.
    #[must_use]
    pub fn compile_count(&self) -> u64 {
        self.cache.compile_count()
    }
}

impl std::fmt::Debug for SchemaHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaHost")
            .field("types", &self.registry.read().len())
            .field("state", &self.cache.state())
            .field("generation", &self.cache.generation())
            .finish()
    }
}
