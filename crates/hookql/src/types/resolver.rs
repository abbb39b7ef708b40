//! Field resolvers.
//!
//! A resolver receives an owned [`ResolveInfo`] and produces a GraphQL
//! [`Value`]. Object results are plain `Value::Object` maps; the child
//! fields read their values out of that map unless they have a resolver of
//! their own. Values returned for interface or union fields name their
//! concrete type in a `__typename` entry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_graphql::Value;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use indexmap::IndexMap;

use crate::error::ExecutionError;

/// Future returned by a resolver.
pub type ResolverFuture = BoxFuture<'static, Result<Value, ExecutionError>>;

/// Everything a resolver gets to see about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    /// Type that owns the field.
    pub type_name: String,
    /// Field being resolved.
    pub field_name: String,
    /// Value of the parent object (`Value::Null` at the root).
    pub parent: Value,
    /// Arguments, with custom scalar arguments already parsed.
    pub args: IndexMap<String, Value>,
}

impl ResolveInfo {
    /// Returns an argument value, if supplied.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !matches!(v, Value::Null))
    }

    /// Returns a string argument.
    #[must_use]
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        match self.arg(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns an integer argument.
    #[must_use]
    pub fn arg_i64(&self, name: &str) -> Option<i64> {
        match self.arg(name) {
            Some(Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// Reads a property of the parent object.
    #[must_use]
    pub fn parent_field(&self, name: &str) -> Option<&Value> {
        match &self.parent {
            Value::Object(obj) => obj.get(name),
            _ => None,
        }
    }
}

/// A shareable async field resolver.
#[derive(Clone)]
pub struct Resolver(Arc<dyn Fn(ResolveInfo) -> ResolverFuture + Send + Sync>);

impl Resolver {
    /// Wraps an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(ResolveInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ExecutionError>> + Send + 'static,
    {
        Self(Arc::new(move |info| f(info).boxed()))
    }

    /// Wraps a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ResolveInfo) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |info| {
            let result = f(&info);
            futures_util::future::ready(result).boxed()
        }))
    }

    /// Always resolves to `value`.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::sync(move |_| Ok(value.clone()))
    }

    /// Reads the property named like the field from the parent object.
    ///
    /// This is what fields without an explicit resolver use.
    #[must_use]
    pub fn property() -> Self {
        Self::sync(|info| {
            Ok(info
                .parent_field(&info.field_name)
                .cloned()
                .unwrap_or(Value::Null))
        })
    }

    /// Invokes the resolver.
    pub fn call(&self, info: ResolveInfo) -> ResolverFuture {
        (self.0)(info)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}

/// Converts a `serde_json::Value` to a GraphQL value.
#[must_use]
pub fn json_to_value(json: serde_json::Value) -> Value {
    Value::from_json(json).unwrap_or(Value::Null)
}

/// Builds a GraphQL object value from `(key, value)` pairs.
pub fn object<K, I>(entries: I) -> Value
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, Value)>,
{
    let map: async_graphql::indexmap::IndexMap<async_graphql::Name, Value> = entries
        .into_iter()
        .map(|(k, v)| (async_graphql::Name::new(k), v))
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_parent(parent: Value) -> ResolveInfo {
        ResolveInfo {
            type_name: "Post".into(),
            field_name: "title".into(),
            parent,
            args: IndexMap::new(),
        }
    }

    #[tokio::test]
    async fn test_constant_resolver() {
        let resolver = Resolver::constant("test".to_string());
        let value = resolver
            .call(info_with_parent(Value::Null))
            .await
            .unwrap();
        assert_eq!(value, Value::String("test".into()));
    }

    #[tokio::test]
    async fn test_property_resolver_reads_parent() {
        let parent = object([("title", Value::String("Hello".into()))]);
        let value = Resolver::property()
            .call(info_with_parent(parent))
            .await
            .unwrap();
        assert_eq!(value, Value::String("Hello".into()));
    }

    #[tokio::test]
    async fn test_property_resolver_missing_is_null() {
        let value = Resolver::property()
            .call(info_with_parent(object([("other", Value::Null)])))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_async_resolver_error() {
        let resolver = Resolver::new(|_| async { Err(ExecutionError::resolver("nope")) });
        let err = resolver
            .call(info_with_parent(Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::Resolver("nope".into()));
    }

    #[test]
    fn test_arg_helpers() {
        let mut info = info_with_parent(Value::Null);
        info.args.insert("first".into(), Value::Number(3.into()));
        info.args.insert("after".into(), Value::String("abc".into()));
        info.args.insert("where".into(), Value::Null);

        assert_eq!(info.arg_i64("first"), Some(3));
        assert_eq!(info.arg_str("after"), Some("abc"));
        assert!(info.arg("where").is_none());
    }

    #[test]
    fn test_json_to_value() {
        let value = json_to_value(serde_json::json!({"a": [1, "b", null]}));
        let expected = object([(
            "a",
            Value::List(vec![
                Value::Number(1.into()),
                Value::String("b".into()),
                Value::Null,
            ]),
        )]);
        assert_eq!(value, expected);
    }
}
