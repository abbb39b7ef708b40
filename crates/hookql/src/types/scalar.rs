//! Custom scalar behaviour.
//!
//! A custom scalar is defined by three functions:
//!
//! - `serialize` turns a resolved value into the value sent to the client
//! - `parse_value` turns a variable value into the internal value
//! - `parse_literal` turns an inline literal into the internal value
//!
//! None of them may touch registry state; they only see the value.

use std::fmt;
use std::sync::Arc;

use async_graphql::{Value, Variables};

/// Output conversion.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Variable input conversion.
pub type ParseValueFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Literal input conversion. Receives the request variables alongside the literal.
pub type ParseLiteralFn = Arc<dyn Fn(&Value, &Variables) -> Result<Value, String> + Send + Sync>;

/// The serialize / parseValue / parseLiteral triplet of a scalar.
///
/// Each piece is optional at construction so incomplete definitions can be
/// reported instead of failing to type-check; registration and compilation
/// both reject a behaviour with a missing piece.
#[derive(Clone, Default)]
pub struct ScalarBehavior {
    pub(crate) serialize: Option<SerializeFn>,
    pub(crate) parse_value: Option<ParseValueFn>,
    pub(crate) parse_literal: Option<ParseLiteralFn>,
}

impl ScalarBehavior {
    /// Passes every value through unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            serialize: Some(Arc::new(|v| Ok(v.clone()))),
            parse_value: Some(Arc::new(|v| Ok(v.clone()))),
            parse_literal: Some(Arc::new(|v, _| Ok(v.clone()))),
        }
    }

    /// Name of the first missing behaviour, if any.
    #[must_use]
    pub fn missing(&self) -> Option<&'static str> {
        if self.serialize.is_none() {
            Some("serialize")
        } else if self.parse_value.is_none() {
            Some("parseValue")
        } else if self.parse_literal.is_none() {
            Some("parseLiteral")
        } else {
            None
        }
    }

    pub(crate) fn serialize(&self, value: &Value) -> Result<Value, String> {
        match &self.serialize {
            Some(f) => f(value),
            None => Ok(value.clone()),
        }
    }

    pub(crate) fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match &self.parse_value {
            Some(f) => f(value),
            None => Ok(value.clone()),
        }
    }

    pub(crate) fn parse_literal(&self, value: &Value, variables: &Variables) -> Result<Value, String> {
        match &self.parse_literal {
            Some(f) => f(value, variables),
            None => Ok(value.clone()),
        }
    }
}

impl fmt::Debug for ScalarBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarBehavior")
            .field("serialize", &self.serialize.is_some())
            .field("parse_value", &self.parse_value.is_some())
            .field("parse_literal", &self.parse_literal.is_some())
            .finish()
    }
}

/// A custom scalar as handed to `register_scalar`.
///
/// # Example
///
/// ```ignore
/// let scalar = ScalarDefinition::new("TestScalar")
///     .description("Test Scalar")
///     .serialize(|v| Ok(v.clone()))
///     .parse_value(|v| Ok(v.clone()))
///     .parse_literal(|v, _| Ok(v.clone()));
/// host.register_scalar(scalar)?;
/// ```
#[derive(Debug, Clone)]
pub struct ScalarDefinition {
    pub name: String,
    pub description: Option<String>,
    pub specified_by_url: Option<String>,
    pub behavior: ScalarBehavior,
}

impl ScalarDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            specified_by_url: None,
            behavior: ScalarBehavior::default(),
        }
    }

    /// A scalar whose three behaviours are the identity.
    pub fn identity(name: impl Into<String>) -> Self {
        Self {
            behavior: ScalarBehavior::identity(),
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn specified_by_url(mut self, url: impl Into<String>) -> Self {
        self.specified_by_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.behavior.serialize = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn parse_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.behavior.parse_value = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn parse_literal<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Variables) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.behavior.parse_literal = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_complete() {
        assert_eq!(ScalarBehavior::identity().missing(), None);
    }

    #[test]
    fn test_missing_reports_first_gap() {
        let def = ScalarDefinition::new("Partial").serialize(|v| Ok(v.clone()));
        assert_eq!(def.behavior.missing(), Some("parseValue"));

        let def = def.parse_value(|v| Ok(v.clone()));
        assert_eq!(def.behavior.missing(), Some("parseLiteral"));
    }

    #[test]
    fn test_behaviour_functions_apply() {
        let def = ScalarDefinition::new("Upper")
            .serialize(|v| match v {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                _ => Err("expected a string".into()),
            })
            .parse_value(|v| Ok(v.clone()))
            .parse_literal(|v, _| Ok(v.clone()));

        assert_eq!(
            def.behavior.serialize(&Value::String("abc".into())),
            Ok(Value::String("ABC".into()))
        );
        assert!(def.behavior.serialize(&Value::Boolean(true)).is_err());
    }
}
