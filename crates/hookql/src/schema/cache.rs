//! Lazily compiled, explicitly invalidated schema cache.
//!
//! [`SchemaCache`] holds at most one [`CompiledSchema`]. The first caller
//! after startup or after [`SchemaCache::invalidate`] compiles it; callers
//! arriving while that compile runs wait on the build lock and reuse the
//! result instead of compiling again.
//!
//! Every invalidation bumps a generation counter. A schema is only cached
//! if no invalidation happened while it was compiling, so a registration
//! racing a compile is never lost.
//!
//! ## States
//!
//! ```text
//! Uninitialized --get_or_compile--> Building --ok--> Ready
//!                                           \--err-> Failed
//! (any) --invalidate--> Uninitialized
//! ```
//!
//! A failed compile is reported to every caller until the next invalidation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::CompiledSchema;
use crate::error::{GraphQLError, SchemaError};

/// State of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Nothing compiled for the current generation.
    Uninitialized,
    /// A compile is in flight.
    Building,
    /// A schema for the current generation is cached.
    Ready,
    /// The last compile for the current generation failed.
    Failed,
}

/// Process-wide schema holder.
///
/// # Example
///
/// ```ignore
/// let cache = SchemaCache::new();
///
/// // First access compiles
/// let schema = cache.get_or_compile(|| move |generation: u64| compiler.compile(generation)).await?;
///
/// // Subsequent accesses reuse it without calling the closure
/// let schema = cache.get_or_compile(|| |_| unreachable!()).await?;
///
/// // Force a fresh compile on next access
/// cache.invalidate();
/// ```
pub struct SchemaCache {
    /// The cached schema (None if not compiled yet or invalidated).
    slot: ArcSwapOption<CompiledSchema>,

    /// Bumped on every invalidation.
    generation: AtomicU64,

    /// Build lock to ensure only one compile at a time.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    /// Generation and message of the last failed compile.
    last_error: RwLock<Option<(u64, String)>>,

    compile_count: AtomicU64,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            last_error: RwLock::new(None),
            compile_count: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchemaState {
        *self.state.read()
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of compiles started since creation.
    #[must_use]
    pub fn compile_count(&self) -> u64 {
        self.compile_count.load(Ordering::Relaxed)
    }

    /// Returns the cached schema without compiling.
    #[must_use]
    pub fn get(&self) -> Option<Arc<CompiledSchema>> {
        let current = self.generation();
        self.slot
            .load_full()
            .filter(|schema| schema.generation() == current)
    }

    /// Gets the schema, compiling it if necessary.
    ///
    /// `prepare` runs under the build lock and returns the compile job,
    /// typically after snapshotting whatever the compile reads. The job
    /// receives the generation it compiles for and runs on the blocking
    /// pool, at most once per generation across all concurrent callers.
    ///
    /// # Errors
    ///
    /// Returns `GraphQLError::SchemaBuildFailed` if the compile fails, or
    /// if it already failed for the current generation.
    pub async fn get_or_compile<P, C>(&self, prepare: P) -> Result<Arc<CompiledSchema>, GraphQLError>
    where
        P: FnOnce() -> C,
        C: FnOnce(u64) -> Result<CompiledSchema, SchemaError> + Send + 'static,
    {
        // Fast path: schema already compiled
        if let Some(schema) = self.get() {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        // Double-check after acquiring lock
        if let Some(schema) = self.get() {
            return Ok(schema);
        }

        let generation = self.generation();
        if let Some((failed_at, message)) = self.last_error.read().clone() {
            if failed_at == generation {
                return Err(GraphQLError::SchemaBuildFailed(message));
            }
        }

        self.set_if_current(generation, SchemaState::Building, || {});
        self.compile_count.fetch_add(1, Ordering::Relaxed);
        info!(generation, "Compiling GraphQL schema...");

        let job = prepare();
        let outcome = tokio::task::spawn_blocking(move || job(generation))
            .await
            .unwrap_or_else(|e| Err(SchemaError::Build(format!("compile task failed: {e}"))));

        match outcome {
            Ok(schema) => {
                let schema = Arc::new(schema);
                let cached = self.set_if_current(generation, SchemaState::Ready, || {
                    self.slot.store(Some(Arc::clone(&schema)));
                    *self.last_error.write() = None;
                });
                if cached {
                    info!(generation, "GraphQL schema compiled successfully");
                } else {
                    debug!(generation, "Registry changed during compile, result not cached");
                }
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(generation, error = %error_msg, "Failed to compile GraphQL schema");
                self.set_if_current(generation, SchemaState::Failed, || {
                    *self.last_error.write() = Some((generation, error_msg.clone()));
                });
                Err(GraphQLError::SchemaBuildFailed(error_msg))
            }
        }
    }

    /// Applies `update` and moves to `state` only while `generation` is
    /// current. Holding the state lock orders this against `invalidate`.
    fn set_if_current(&self, generation: u64, state: SchemaState, update: impl FnOnce()) -> bool {
        let mut current = self.state.write();
        if self.generation() != generation {
            return false;
        }
        update();
        *current = state;
        true
    }

    /// Drops the cached schema; the next `get_or_compile` compiles afresh.
    ///
    /// Does not wait for an in-flight compile. Its result is discarded
    /// because it belongs to an older generation.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.slot.store(None);
        *state = SchemaState::Uninitialized;
        *self.last_error.write() = None;
        drop(state);

        debug!(generation, "GraphQL schema invalidated - will recompile on next request");
    }

    /// Message of the last failed compile for the current generation.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        let current = self.generation();
        self.last_error
            .read()
            .as_ref()
            .filter(|(generation, _)| *generation == current)
            .map(|(_, message)| message.clone())
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == SchemaState::Ready && self.get().is_some()
    }
}
