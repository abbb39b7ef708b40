//! The type registry.
//!
//! [`TypeRegistry`] owns every named type definition. It is mutated only by
//! registration calls and never consulted by the engine directly: the schema
//! compiler snapshots it and builds an immutable schema from the snapshot.
//!
//! Fields registered against a type that does not exist yet are queued and
//! applied when the type shows up, unless deferral is switched off.

mod fields;
pub(crate) mod naming;
mod scalars;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::RegistryError;
use crate::types::{FieldDefinition, TypeBody, TypeDefinition, TypeKind};
use naming::validate_name;

pub use naming::{
    BUILTIN_SCALARS, format_field_name, format_type_name, is_builtin_scalar, is_valid_name,
};

/// What to do when a type name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with `RegistryError::DuplicateName`.
    #[default]
    Reject,
    /// Replace the existing definition, keeping its position.
    Overwrite,
}

/// All registered types plus fields waiting for their owner.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDefinition>,
    pending_fields: IndexMap<(String, String), FieldDefinition>,
    defer_unknown_types: bool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty registry with deferred field registration enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
            pending_fields: IndexMap::new(),
            defer_unknown_types: true,
        }
    }

    /// Chooses between queueing and rejecting fields registered on unknown types.
    pub fn set_defer_unknown_types(&mut self, defer: bool) {
        self.defer_unknown_types = defer;
    }

    #[must_use]
    pub fn defers_unknown_types(&self) -> bool {
        self.defer_unknown_types
    }

    /// Registers a type, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if the name is taken (built-in scalars included),
    /// `Validation` if the definition is malformed.
    pub fn register_type(&mut self, def: TypeDefinition) -> Result<(), RegistryError> {
        self.register_type_with(def, DuplicatePolicy::Reject)
    }

    /// Registers a type with an explicit duplicate policy.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_type`]. Built-in scalars can never be
    /// overwritten.
    pub fn register_type_with(
        &mut self,
        mut def: TypeDefinition,
        policy: DuplicatePolicy,
    ) -> Result<(), RegistryError> {
        validate_definition(&def)?;

        if is_builtin_scalar(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        let exists = self.types.contains_key(&def.name);
        if exists && policy == DuplicatePolicy::Reject {
            return Err(RegistryError::DuplicateName(def.name));
        }

        let name = def.name.clone();
        let kind = def.kind();
        let applied = self.apply_pending(&mut def);

        // `insert` keeps the original position when overwriting.
        self.types.insert(name.clone(), def);

        debug!(
            type_name = %name,
            kind = %kind,
            overwritten = exists,
            pending_applied = applied,
            "Registered type"
        );
        Ok(())
    }

    /// Moves queued fields for `def` into it. Returns how many were applied.
    fn apply_pending(&mut self, def: &mut TypeDefinition) -> usize {
        let keys: Vec<(String, String)> = self
            .pending_fields
            .keys()
            .filter(|(type_name, _)| type_name == &def.name)
            .cloned()
            .collect();
        if keys.is_empty() {
            return 0;
        }

        let kind = def.kind();
        let mut applied = 0;
        for key in keys {
            let Some(field) = self.pending_fields.shift_remove(&key) else {
                continue;
            };
            if kind == TypeKind::InputObject && !field.is_input_compatible() {
                tracing::warn!(
                    type_name = %key.0,
                    field_name = %key.1,
                    "Dropping queued field: input fields cannot have resolvers or arguments"
                );
                continue;
            }
            match def.fields_mut() {
                Some(fields) => {
                    fields.insert(key.1, field);
                    applied += 1;
                }
                None => {
                    tracing::warn!(
                        type_name = %key.0,
                        field_name = %key.1,
                        kind = %kind,
                        "Dropping queued field: type kind has no fields"
                    );
                }
            }
        }
        applied
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub(crate) fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.types.get_mut(name)
    }

    /// Returns true if `name` is registered or a built-in scalar.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        is_builtin_scalar(name) || self.types.contains_key(name)
    }

    /// Kind of a registered or built-in type.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if is_builtin_scalar(name) {
            return Some(TypeKind::Scalar);
        }
        self.types.get(name).map(TypeDefinition::kind)
    }

    /// Registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Removes a type. Queued fields for it are kept.
    pub fn remove_type(&mut self, name: &str) -> Option<TypeDefinition> {
        let removed = self.types.shift_remove(name);
        if removed.is_some() {
            debug!(type_name = %name, "Removed type");
        }
        removed
    }

    /// Fields queued for types that are not registered yet, as `(type, field)`.
    pub fn pending_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pending_fields
            .keys()
            .map(|(t, f)| (t.as_str(), f.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Checks names and kind-specific constraints of a definition.
fn validate_definition(def: &TypeDefinition) -> Result<(), RegistryError> {
    validate_name(&def.name, "type")?;

    match &def.body {
        TypeBody::Object { fields, interfaces } => {
            for field in fields.values() {
                validate_field(&def.name, field, false)?;
            }
            for interface in interfaces {
                validate_name(interface, "interface")?;
            }
        }
        TypeBody::Interface { fields } => {
            for field in fields.values() {
                validate_field(&def.name, field, false)?;
            }
        }
        TypeBody::InputObject { fields } => {
            for field in fields.values() {
                validate_field(&def.name, field, true)?;
            }
        }
        TypeBody::Enum { values } => {
            if values.is_empty() {
                return Err(RegistryError::validation(format!(
                    "enum `{}` must define at least one value",
                    def.name
                )));
            }
            for value in values.keys() {
                validate_name(value, "enum value")?;
            }
        }
        TypeBody::Union { members } => {
            if members.is_empty() {
                return Err(RegistryError::validation(format!(
                    "union `{}` must have at least one member",
                    def.name
                )));
            }
            for member in members {
                validate_name(member, "union member")?;
            }
        }
        // Scalar behaviours are checked by `register_scalar` and at compile time.
        TypeBody::Scalar { .. } => {}
    }
    Ok(())
}

pub(crate) fn validate_field(
    owner: &str,
    field: &FieldDefinition,
    input: bool,
) -> Result<(), RegistryError> {
    validate_name(&field.name, "field")?;
    if input && !field.is_input_compatible() {
        return Err(RegistryError::validation(format!(
            "input field `{owner}.{}` cannot have a resolver or arguments",
            field.name
        )));
    }
    for arg in field.arguments.values() {
        validate_name(&arg.name, "argument")?;
    }
    Ok(())
}
