//! Field hooks fired while the schema is compiled.
//!
//! For every object, interface and input object type the compiler fires the
//! kind-wide hook first and the type-specific hook second:
//!
//! | Kind         | Kind-wide hook              | Type hook                  |
//! |--------------|-----------------------------|----------------------------|
//! | INPUT_OBJECT | `graphql_input_fields`      | `graphql_{TypeName}_fields` |
//! | OBJECT       | `graphql_object_fields`     | `graphql_{TypeName}_fields` |
//! | INTERFACE    | `graphql_interface_fields`  | `graphql_{TypeName}_fields` |

use std::sync::Arc;

use super::ExtensionPointDispatcher;
use crate::registry::TypeRegistry;
use crate::types::{FieldMap, TypeKind};

pub const INPUT_FIELDS_HOOK: &str = "graphql_input_fields";
pub const OBJECT_FIELDS_HOOK: &str = "graphql_object_fields";
pub const INTERFACE_FIELDS_HOOK: &str = "graphql_interface_fields";

/// Name of the hook fired for one specific type.
#[must_use]
pub fn type_fields_hook(type_name: &str) -> String {
    format!("graphql_{type_name}_fields")
}

/// Kind-wide hook name, for kinds that have fields.
#[must_use]
pub fn kind_fields_hook(kind: TypeKind) -> Option<&'static str> {
    match kind {
        TypeKind::InputObject => Some(INPUT_FIELDS_HOOK),
        TypeKind::Object => Some(OBJECT_FIELDS_HOOK),
        TypeKind::Interface => Some(INTERFACE_FIELDS_HOOK),
        _ => None,
    }
}

/// What a field hook handler can see besides the fields themselves.
#[derive(Debug, Clone)]
pub struct FieldsHookContext {
    /// Owner of the fields.
    pub type_name: String,
    pub kind: TypeKind,
    /// Config the type was registered with.
    pub source: Option<serde_json::Value>,
    /// The registry snapshot being compiled. Read-only.
    pub registry: Arc<TypeRegistry>,
}

impl FieldsHookContext {
    /// Reads a string entry of the source config.
    #[must_use]
    pub fn source_str(&self, key: &str) -> Option<&str> {
        self.source.as_ref()?.get(key)?.as_str()
    }
}

/// Dispatcher for the field hooks.
pub type FieldHooks = ExtensionPointDispatcher<FieldMap, FieldsHookContext>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDefinition;

    fn context(source: Option<serde_json::Value>) -> FieldsHookContext {
        FieldsHookContext {
            type_name: "RootQueryToPostConnectionWhereArgs".into(),
            kind: TypeKind::InputObject,
            source,
            registry: Arc::new(TypeRegistry::new()),
        }
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(type_fields_hook("Post"), "graphql_Post_fields");
        assert_eq!(kind_fields_hook(TypeKind::InputObject), Some("graphql_input_fields"));
        assert_eq!(kind_fields_hook(TypeKind::Enum), None);
    }

    #[test]
    fn test_source_str() {
        let ctx = context(Some(serde_json::json!({"queryClass": "ContentQuery"})));
        assert_eq!(ctx.source_str("queryClass"), Some("ContentQuery"));
        assert_eq!(ctx.source_str("missing"), None);
        assert_eq!(context(None).source_str("queryClass"), None);
    }

    #[test]
    fn test_field_hook_inserts_field() {
        let mut hooks = FieldHooks::new();
        hooks.add_hook(INPUT_FIELDS_HOOK, 10, |mut fields: FieldMap, ctx: &FieldsHookContext| {
            if ctx.source_str("queryClass") == Some("ContentQuery") {
                let field = FieldDefinition::new("testFilteredInputField", "String")?;
                fields.insert(field.name.clone(), field);
            }
            Ok(fields)
        });

        let with_source = context(Some(serde_json::json!({"queryClass": "ContentQuery"})));
        let out = hooks
            .fire(INPUT_FIELDS_HOOK, FieldMap::new(), &with_source)
            .unwrap();
        assert!(out.contains_key("testFilteredInputField"));

        let out = hooks.fire(INPUT_FIELDS_HOOK, FieldMap::new(), &context(None)).unwrap();
        assert!(out.is_empty());
    }
}
