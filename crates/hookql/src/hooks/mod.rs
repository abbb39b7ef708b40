//! Named, priority-ordered extension points.
//!
//! An [`ExtensionPointDispatcher`] holds handler pipelines keyed by hook
//! name. Firing a hook threads a value through every handler registered for
//! that name, lowest priority first and in registration order among equal
//! priorities. Each handler sees the previous handler's output plus a fixed
//! context.
//!
//! A handler that returns an error or panics stops the pipeline; the error
//! is returned to the caller and nothing after it runs.

mod fields;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, trace};

use crate::error::RegistryError;

pub use fields::{
    FieldHooks, FieldsHookContext, INPUT_FIELDS_HOOK, INTERFACE_FIELDS_HOOK, OBJECT_FIELDS_HOOK,
    kind_fields_hook, type_fields_hook,
};

/// Priority used when the caller has no preference.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Handle returned by `add_hook`, used to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// Failure of a single hook handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<RegistryError> for HookError {
    fn from(err: RegistryError) -> Self {
        Self::Failed(err.to_string())
    }
}

/// A hook handler: takes the current value and the context, returns the
/// value for the next handler.
pub type HookHandler<V, C> = Arc<dyn Fn(V, &C) -> Result<V, HookError> + Send + Sync>;

struct Registration<V, C> {
    id: HookId,
    priority: i32,
    handler: HookHandler<V, C>,
}

impl<V, C> Clone for Registration<V, C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            priority: self.priority,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Handler pipelines keyed by hook name.
pub struct ExtensionPointDispatcher<V, C> {
    hooks: HashMap<String, Vec<Registration<V, C>>>,
    next_id: u64,
}

impl<V, C> Default for ExtensionPointDispatcher<V, C> {
    fn default() -> Self {
        Self {
            hooks: HashMap::new(),
            next_id: 0,
        }
    }
}

// Handlers are shared, so cloning is cheap and the clone fires identically.
impl<V, C> Clone for ExtensionPointDispatcher<V, C> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
            next_id: self.next_id,
        }
    }
}

impl<V, C> std::fmt::Debug for ExtensionPointDispatcher<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .hooks
            .iter()
            .map(|(name, handlers)| (name.as_str(), handlers.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("ExtensionPointDispatcher")
            .field("hooks", &counts)
            .finish()
    }
}

impl<V, C> ExtensionPointDispatcher<V, C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `hook_name`.
    ///
    /// Lower priorities run first. A handler added with the same priority as
    /// existing ones runs after them.
    pub fn add_hook<F>(&mut self, hook_name: impl Into<String>, priority: i32, handler: F) -> HookId
    where
        F: Fn(V, &C) -> Result<V, HookError> + Send + Sync + 'static,
    {
        let hook_name = hook_name.into();
        let id = HookId(self.next_id);
        self.next_id += 1;

        let handlers = self.hooks.entry(hook_name.clone()).or_default();
        let position = handlers.partition_point(|h| h.priority <= priority);
        handlers.insert(
            position,
            Registration {
                id,
                priority,
                handler: Arc::new(handler),
            },
        );

        debug!(hook = %hook_name, priority, id = id.0, "Added hook handler");
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        let mut removed = false;
        self.hooks.retain(|name, handlers| {
            if let Some(index) = handlers.iter().position(|h| h.id == id) {
                handlers.remove(index);
                removed = true;
                debug!(hook = %name, id = id.0, "Removed hook handler");
            }
            !handlers.is_empty()
        });
        removed
    }

    #[must_use]
    pub fn has_hooks(&self, hook_name: &str) -> bool {
        self.hooks.contains_key(hook_name)
    }

    #[must_use]
    pub fn hook_count(&self, hook_name: &str) -> usize {
        self.hooks.get(hook_name).map_or(0, Vec::len)
    }

    /// Threads `value` through every handler registered for `hook_name`.
    ///
    /// # Errors
    ///
    /// Returns the first handler error, or `HookError::Panicked` if a
    /// handler panicked. Handlers after the failing one are not run.
    pub fn fire(&self, hook_name: &str, value: V, context: &C) -> Result<V, HookError> {
        let Some(handlers) = self.hooks.get(hook_name) else {
            return Ok(value);
        };

        let mut value = value;
        for registration in handlers {
            let handler = &registration.handler;
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(value, context)));
            value = match outcome {
                Ok(Ok(next)) => next,
                Ok(Err(err)) => {
                    error!(
                        hook = %hook_name,
                        id = registration.id.0,
                        error = %err,
                        "Hook handler failed"
                    );
                    return Err(err);
                }
                Err(panic) => {
                    let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    error!(
                        hook = %hook_name,
                        id = registration.id.0,
                        panic = %panic_msg,
                        "Hook handler panicked"
                    );
                    return Err(HookError::Panicked(panic_msg));
                }
            };
            trace!(hook = %hook_name, id = registration.id.0, "Hook handler applied");
        }
        Ok(value)
    }
}
