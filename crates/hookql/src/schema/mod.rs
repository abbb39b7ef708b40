//! Schema compilation and caching.
//!
//! ## Components
//!
//! - [`SchemaCompiler`] - turns a registry snapshot and the field hooks into
//!   a [`CompiledSchema`]
//! - [`SchemaCache`] - holds the compiled schema, compiles it on demand and
//!   drops it on invalidation
//!
//! ## Lifecycle
//!
//! 1. Registrations mutate the registry and invalidate the cache
//! 2. The next query snapshots the registry and compiles
//! 3. Concurrent queries wait for that compile and share its result
//! 4. The schema stays cached until the next invalidation

mod cache;
mod compiler;
mod resolve;

pub use cache::{SchemaCache, SchemaState};
pub use compiler::{CompileConfig, CompiledSchema, SchemaCompiler};
