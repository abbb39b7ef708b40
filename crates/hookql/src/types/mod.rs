//! Building blocks of a registry: type definitions, fields, type references,
//! resolvers and custom scalars.

mod definition;
mod field;
mod resolver;
mod scalar;
mod type_ref;

pub use definition::{EnumValueDefinition, TypeBody, TypeDefinition, TypeKind};
pub use field::{ArgumentDefinition, DeprecationState, FieldDefinition, FieldMap};
pub use resolver::{ResolveInfo, Resolver, ResolverFuture, json_to_value, object};
pub use scalar::{ParseLiteralFn, ParseValueFn, ScalarBehavior, ScalarDefinition, SerializeFn};
pub use type_ref::TypeReference;
