//! Type references in GraphQL notation.
//!
//! A field declares its type as a string such as `String`, `[Post!]!` or
//! `TestScalar`. The string is parsed when the field is created; the named
//! type itself is only looked up when the schema is compiled, so a field may
//! reference a type that is registered later.

use std::fmt;
use std::str::FromStr;

use async_graphql::dynamic::TypeRef;

use crate::error::RegistryError;
use crate::registry::naming::validate_name;

/// A parsed type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeReference {
    /// A named type, resolved at compile time.
    Named(String),
    /// A list of the inner type.
    List(Box<TypeReference>),
    /// A non-null wrapper around the inner type.
    NonNull(Box<TypeReference>),
}

impl TypeReference {
    /// A nullable named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps `inner` as non-null.
    #[must_use]
    pub fn non_null(inner: TypeReference) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Wraps `inner` as a list.
    #[must_use]
    pub fn list(inner: TypeReference) -> Self {
        Self::List(Box::new(inner))
    }

    /// Parses GraphQL type notation.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` for unbalanced brackets, doubled
    /// `!` or invalid names.
    pub fn parse(notation: &str) -> Result<Self, RegistryError> {
        let trimmed = notation.trim();
        if let Some(inner) = trimmed.strip_suffix('!') {
            let inner = Self::parse(inner)?;
            if matches!(inner, Self::NonNull(_)) {
                return Err(RegistryError::validation(format!(
                    "`{notation}` wraps a non-null type in non-null"
                )));
            }
            return Ok(Self::non_null(inner));
        }
        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return Ok(Self::list(Self::parse(inner)?));
        }
        validate_name(trimmed, "type")
            .map_err(|_| RegistryError::validation(format!("`{notation}` is not a valid type reference")))?;
        Ok(Self::named(trimmed))
    }

    /// The innermost named type.
    #[must_use]
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    /// Returns true if the outermost wrapper is non-null.
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Converts to the engine's type reference.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRef {
        match self {
            Self::Named(name) => TypeRef::named(name.clone()),
            Self::List(inner) => TypeRef::List(Box::new(inner.to_type_ref())),
            Self::NonNull(inner) => TypeRef::NonNull(Box::new(inner.to_type_ref())),
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl FromStr for TypeReference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named() {
        let ty = TypeReference::parse("String").unwrap();
        assert_eq!(ty, TypeReference::named("String"));
        assert!(!ty.is_non_null());
    }

    #[test]
    fn test_parse_wrapped() {
        let ty = TypeReference::parse("[Post!]!").unwrap();
        assert_eq!(
            ty,
            TypeReference::non_null(TypeReference::list(TypeReference::non_null(
                TypeReference::named("Post")
            )))
        );
        assert_eq!(ty.base_name(), "Post");
        assert_eq!(ty.to_string(), "[Post!]!");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TypeReference::parse("").is_err());
        assert!(TypeReference::parse("[String").is_err());
        assert!(TypeReference::parse("String!!").is_err());
        assert!(TypeReference::parse("Bad Name").is_err());
        assert!(TypeReference::parse("[]").is_err());
    }

    #[test]
    fn test_to_type_ref() {
        let ty = TypeReference::parse("[Int]!").unwrap();
        assert_eq!(ty.to_type_ref().to_string(), "[Int]!");
    }
}
