//! Type definitions held by the registry.

use std::fmt;

use indexmap::IndexMap;

use super::field::{DeprecationState, FieldDefinition, FieldMap};
use super::scalar::ScalarBehavior;

/// The six kinds of named types a registry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar,
    Object,
    InputObject,
    Enum,
    Interface,
    Union,
}

impl TypeKind {
    /// Can values of this kind appear in argument or input field positions?
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, Self::Scalar | Self::Enum | Self::InputObject)
    }

    /// Can values of this kind appear in output field positions?
    #[must_use]
    pub fn is_output(self) -> bool {
        !matches!(self, Self::InputObject)
    }

    /// Does this kind carry a field map?
    #[must_use]
    pub fn has_fields(self) -> bool {
        matches!(self, Self::Object | Self::InputObject | Self::Interface)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scalar => "SCALAR",
            Self::Object => "OBJECT",
            Self::InputObject => "INPUT_OBJECT",
            Self::Enum => "ENUM",
            Self::Interface => "INTERFACE",
            Self::Union => "UNION",
        };
        f.write_str(s)
    }
}

/// A value of an enum type.
#[derive(Debug, Clone)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: DeprecationState,
}

impl EnumValueDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation: DeprecationState::Current,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation = DeprecationState::Deprecated(reason.map(str::to_owned));
        self
    }
}

/// Kind-specific content of a type definition.
#[derive(Debug, Clone)]
pub enum TypeBody {
    Scalar {
        behavior: ScalarBehavior,
        specified_by_url: Option<String>,
    },
    Object {
        fields: FieldMap,
        interfaces: Vec<String>,
    },
    InputObject {
        fields: FieldMap,
    },
    Enum {
        values: IndexMap<String, EnumValueDefinition>,
    },
    Interface {
        fields: FieldMap,
    },
    Union {
        members: Vec<String>,
    },
}

/// A named type in the registry.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub description: Option<String>,
    /// Configuration the type was registered with, visible to field hooks.
    pub source: Option<serde_json::Value>,
    pub body: TypeBody,
}

impl TypeDefinition {
    fn with_body(name: impl Into<String>, body: TypeBody) -> Self {
        Self {
            name: name.into(),
            description: None,
            source: None,
            body,
        }
    }

    /// An object type with no fields yet.
    pub fn object(name: impl Into<String>) -> Self {
        Self::with_body(
            name,
            TypeBody::Object {
                fields: FieldMap::new(),
                interfaces: Vec::new(),
            },
        )
    }

    /// An input object type with no fields yet.
    pub fn input_object(name: impl Into<String>) -> Self {
        Self::with_body(
            name,
            TypeBody::InputObject {
                fields: FieldMap::new(),
            },
        )
    }

    /// An interface type with no fields yet.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_body(
            name,
            TypeBody::Interface {
                fields: FieldMap::new(),
            },
        )
    }

    /// An enum type with the given values.
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(|v| {
                let value = EnumValueDefinition::new(v);
                (value.name.clone(), value)
            })
            .collect();
        Self::with_body(name, TypeBody::Enum { values })
    }

    /// A union of the given object types.
    pub fn union<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_body(
            name,
            TypeBody::Union {
                members: members.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// A scalar type with the given behaviour.
    pub fn scalar(name: impl Into<String>, behavior: ScalarBehavior) -> Self {
        Self::with_body(
            name,
            TypeBody::Scalar {
                behavior,
                specified_by_url: None,
            },
        )
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match &self.body {
            TypeBody::Scalar { .. } => TypeKind::Scalar,
            TypeBody::Object { .. } => TypeKind::Object,
            TypeBody::InputObject { .. } => TypeKind::InputObject,
            TypeBody::Enum { .. } => TypeKind::Enum,
            TypeBody::Interface { .. } => TypeKind::Interface,
            TypeBody::Union { .. } => TypeKind::Union,
        }
    }

    /// The field map, for kinds that have one.
    #[must_use]
    pub fn fields(&self) -> Option<&FieldMap> {
        match &self.body {
            TypeBody::Object { fields, .. }
            | TypeBody::InputObject { fields }
            | TypeBody::Interface { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldMap> {
        match &mut self.body {
            TypeBody::Object { fields, .. }
            | TypeBody::InputObject { fields }
            | TypeBody::Interface { fields } => Some(fields),
            _ => None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches the registration config handed to field hooks.
    #[must_use]
    pub fn source(mut self, source: serde_json::Value) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a field. Ignored for kinds without fields.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        if let Some(fields) = self.fields_mut() {
            fields.insert(field.name.clone(), field);
        }
        self
    }

    /// Declares an implemented interface. Ignored for non-object kinds.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        if let TypeBody::Object { interfaces, .. } = &mut self.body {
            interfaces.push(interface.into());
        }
        self
    }

    /// Sets the scalar's `specifiedByURL`. Ignored for non-scalar kinds.
    #[must_use]
    pub fn specified_by_url(mut self, url: impl Into<String>) -> Self {
        if let TypeBody::Scalar {
            specified_by_url, ..
        } = &mut self.body
        {
            *specified_by_url = Some(url.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_positions() {
        assert!(TypeKind::Scalar.is_input());
        assert!(TypeKind::Scalar.is_output());
        assert!(TypeKind::InputObject.is_input());
        assert!(!TypeKind::InputObject.is_output());
        assert!(!TypeKind::Object.is_input());
        assert!(!TypeKind::Union.is_input());
        assert_eq!(TypeKind::InputObject.to_string(), "INPUT_OBJECT");
    }

    #[test]
    fn test_object_builder() {
        let def = TypeDefinition::object("Post")
            .description("A blog post")
            .field(FieldDefinition::new("title", "String").unwrap())
            .field(FieldDefinition::new("id", "ID!").unwrap())
            .implements("Node");

        assert_eq!(def.kind(), TypeKind::Object);
        let names: Vec<_> = def.fields().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["title", "id"]);
        match &def.body {
            TypeBody::Object { interfaces, .. } => assert_eq!(interfaces, &vec!["Node".to_string()]),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_field_on_fieldless_kind_is_ignored() {
        let def = TypeDefinition::enumeration("Status", ["DRAFT", "PUBLISHED"])
            .field(FieldDefinition::new("x", "String").unwrap());
        assert!(def.fields().is_none());
        match &def.body {
            TypeBody::Enum { values } => assert_eq!(values.len(), 2),
            other => panic!("unexpected body {other:?}"),
        }
    }
}
