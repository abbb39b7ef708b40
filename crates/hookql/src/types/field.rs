//! Field and argument definitions.

use async_graphql::Value;
use indexmap::IndexMap;

use super::{Resolver, TypeReference};
use crate::error::RegistryError;

/// Ordered field-name to definition mapping.
///
/// This is the value handed through the field hooks.
pub type FieldMap = IndexMap<String, FieldDefinition>;

/// Whether a field or enum value is deprecated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeprecationState {
    #[default]
    Current,
    Deprecated(Option<String>),
}

impl DeprecationState {
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Self::Deprecated(_))
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Deprecated(reason) => reason.as_deref(),
            Self::Current => None,
        }
    }
}

/// An argument of an output field.
#[derive(Debug, Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub type_ref: TypeReference,
    pub description: Option<String>,
    pub default_value: Option<Value>,
}

impl ArgumentDefinition {
    /// Creates an argument from GraphQL type notation.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` if `type_ref` cannot be parsed.
    pub fn new(name: impl Into<String>, type_ref: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            name: name.into(),
            type_ref: TypeReference::parse(type_ref)?,
            description: None,
            default_value: None,
        })
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// A field of an object, interface or input object type.
///
/// Input object fields use the same definition but may not carry a resolver
/// or arguments.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub type_ref: TypeReference,
    pub arguments: IndexMap<String, ArgumentDefinition>,
    pub resolver: Option<Resolver>,
    pub description: Option<String>,
    pub deprecation: DeprecationState,
    /// Default value, for input object fields.
    pub default_value: Option<Value>,
}

impl FieldDefinition {
    /// Creates a field from GraphQL type notation, e.g. `"[Post!]!"`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` if `type_ref` cannot be parsed.
    pub fn new(name: impl Into<String>, type_ref: &str) -> Result<Self, RegistryError> {
        Ok(Self::with_type(name, TypeReference::parse(type_ref)?))
    }

    /// Creates a field from an already parsed type reference.
    pub fn with_type(name: impl Into<String>, type_ref: TypeReference) -> Self {
        Self {
            name: name.into(),
            type_ref,
            arguments: IndexMap::new(),
            resolver: None,
            description: None,
            deprecation: DeprecationState::Current,
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation = DeprecationState::Deprecated(reason.map(str::to_owned));
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Returns true if the field can live on an input object.
    #[must_use]
    pub fn is_input_compatible(&self) -> bool {
        self.resolver.is_none() && self.arguments.is_empty()
    }
}
