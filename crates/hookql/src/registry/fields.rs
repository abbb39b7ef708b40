//! Field registration on existing and not-yet-registered types.

use tracing::{debug, trace};

use super::{TypeRegistry, validate_field};
use crate::error::RegistryError;
use crate::types::{FieldDefinition, TypeKind};

impl TypeRegistry {
    /// Adds `field_name` to `type_name`.
    ///
    /// The definition's name is set to `field_name`. Registering a field
    /// that already exists replaces it in place. If the type is not
    /// registered yet the field is queued, or rejected when deferral is off.
    ///
    /// # Errors
    ///
    /// `UnknownType` when the type is missing and deferral is disabled;
    /// `Validation` for invalid names, fieldless owner kinds, or input
    /// fields carrying resolvers or arguments.
    pub fn register_field(
        &mut self,
        type_name: &str,
        field_name: &str,
        mut def: FieldDefinition,
    ) -> Result<(), RegistryError> {
        def.name = field_name.to_string();

        let defer = self.defer_unknown_types;
        let Some(owner) = self.get_type_mut(type_name) else {
            if !defer {
                return Err(RegistryError::UnknownType {
                    type_name: type_name.to_string(),
                    field_name: field_name.to_string(),
                });
            }
            validate_field(type_name, &def, false)?;
            debug!(
                type_name = %type_name,
                field_name = %field_name,
                "Queued field for unregistered type"
            );
            self.pending_fields
                .insert((type_name.to_string(), field_name.to_string()), def);
            return Ok(());
        };

        let kind = owner.kind();
        if !kind.has_fields() {
            return Err(RegistryError::validation(format!(
                "cannot add field `{field_name}` to {kind} type `{type_name}`"
            )));
        }
        validate_field(type_name, &def, kind == TypeKind::InputObject)?;

        if let Some(fields) = owner.fields_mut() {
            let replaced = fields.insert(field_name.to_string(), def).is_some();
            trace!(
                type_name = %type_name,
                field_name = %field_name,
                replaced,
                "Registered field"
            );
        }
        Ok(())
    }

    /// Registers several fields on one type, stopping at the first error.
    ///
    /// Fields registered before the failing one stay registered.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_field`].
    pub fn register_fields<I>(&mut self, type_name: &str, fields: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = FieldDefinition>,
    {
        for field in fields {
            let name = field.name.clone();
            self.register_field(type_name, &name, field)?;
        }
        Ok(())
    }

    /// Removes a field, including a queued registration for it.
    ///
    /// Returns true if anything was removed. Removing a field that does not
    /// exist is a no-op.
    pub fn deregister_field(&mut self, type_name: &str, field_name: &str) -> bool {
        let pending = self
            .pending_fields
            .shift_remove(&(type_name.to_string(), field_name.to_string()))
            .is_some();

        let registered = self
            .get_type_mut(type_name)
            .and_then(|owner| owner.fields_mut())
            .is_some_and(|fields| fields.shift_remove(field_name).is_some());

        if pending || registered {
            debug!(type_name = %type_name, field_name = %field_name, "Deregistered field");
        }
        pending || registered
    }
}
