//! Custom scalar registration.

use super::{DuplicatePolicy, TypeRegistry};
use crate::error::RegistryError;
use crate::types::{ScalarDefinition, TypeBody, TypeDefinition};

impl TypeRegistry {
    /// Registers a custom scalar.
    ///
    /// # Errors
    ///
    /// `Validation` if serialize, parseValue or parseLiteral is missing;
    /// `DuplicateName` if the name is already taken.
    pub fn register_scalar(&mut self, scalar: ScalarDefinition) -> Result<(), RegistryError> {
        self.register_scalar_with(scalar, DuplicatePolicy::Reject)
    }

    /// Registers a custom scalar with an explicit duplicate policy.
    ///
    /// # Errors
    ///
    /// See [`TypeRegistry::register_scalar`].
    pub fn register_scalar_with(
        &mut self,
        scalar: ScalarDefinition,
        policy: DuplicatePolicy,
    ) -> Result<(), RegistryError> {
        if let Some(missing) = scalar.behavior.missing() {
            return Err(RegistryError::validation(format!(
                "scalar `{}` has no {missing} behaviour",
                scalar.name
            )));
        }

        let def = TypeDefinition {
            name: scalar.name,
            description: scalar.description,
            source: None,
            body: TypeBody::Scalar {
                behavior: scalar.behavior,
                specified_by_url: scalar.specified_by_url,
            },
        };
        self.register_type_with(def, policy)
    }
}
