//! Cursor-paginated connections between types.
//!
//! `register_connection` derives a family of types from one
//! [`ConnectionConfig`] and adds the connection field to the source type:
//!
//! ```graphql
//! type PageInfo { hasNextPage: Boolean! hasPreviousPage: Boolean! startCursor: String endCursor: String }
//! type RootQueryToPostConnectionEdge { cursor: String! node: Post! }
//! type RootQueryToPostConnection { edges: [RootQueryToPostConnectionEdge!]! nodes: [Post!]! pageInfo: PageInfo! }
//! input RootQueryToPostConnectionWhereArgs { ... }
//!
//! type RootQuery {
//!   posts(first: Int, last: Int, after: String, before: String, where: RootQueryToPostConnectionWhereArgs): RootQueryToPostConnection
//! }
//! ```
//!
//! The where-args input type carries the connection's source config, so
//! `graphql_input_fields` hooks can recognise the connection it belongs to.

use async_graphql::Value;
use tracing::debug;

use crate::error::{ExecutionError, RegistryError};
use crate::registry::{TypeRegistry, is_valid_name, validate_field};
use crate::types::{
    ArgumentDefinition, FieldDefinition, FieldMap, ResolveInfo, Resolver, TypeDefinition,
    TypeKind, TypeReference, object,
};

/// Name of the shared page info type.
pub const PAGE_INFO_TYPE: &str = "PageInfo";

/// Description of a connection from one type to another.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Type the connection field is added to.
    pub from_type: String,
    /// Type of the connected nodes.
    pub to_type: String,
    /// Name of the connection field on `from_type`.
    pub from_field_name: String,
    pub description: Option<String>,
    /// Fields of the where-args input type. No input type is created when empty.
    pub where_args: FieldMap,
    /// Config handed to field hooks of the derived types.
    pub source: Option<serde_json::Value>,
    /// Produces every node; pagination is applied to its result.
    pub resolve_nodes: Resolver,
}

impl ConnectionConfig {
    pub fn new(
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        from_field_name: impl Into<String>,
        resolve_nodes: Resolver,
    ) -> Self {
        Self {
            from_type: from_type.into(),
            to_type: to_type.into(),
            from_field_name: from_field_name.into(),
            description: None,
            where_args: FieldMap::new(),
            source: None,
            resolve_nodes,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn where_arg(mut self, field: FieldDefinition) -> Self {
        self.where_args.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn source(mut self, source: serde_json::Value) -> Self {
        self.source = Some(source);
        self
    }

    /// `{From}To{To}Connection`
    #[must_use]
    pub fn connection_type_name(&self) -> String {
        format!("{}To{}Connection", self.from_type, self.to_type)
    }

    #[must_use]
    pub fn edge_type_name(&self) -> String {
        format!("{}Edge", self.connection_type_name())
    }

    #[must_use]
    pub fn where_args_type_name(&self) -> String {
        format!("{}WhereArgs", self.connection_type_name())
    }
}

impl TypeRegistry {
    /// Registers the types of a connection and its field on the source type.
    ///
    /// The types are staged on a copy of the registry and committed only
    /// when every step succeeded, so a failing call leaves the registry
    /// untouched.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if a derived type exists already, `Validation` for
    /// invalid names, where args or a source type that cannot hold fields,
    /// `UnknownType` if the source type is missing and deferral is disabled.
    pub fn register_connection(&mut self, config: ConnectionConfig) -> Result<(), RegistryError> {
        let mut staged = self.clone();
        staged.stage_connection(config)?;
        *self = staged;
        Ok(())
    }

    fn stage_connection(&mut self, config: ConnectionConfig) -> Result<(), RegistryError> {
        let connection_name = config.connection_type_name();
        let edge_name = config.edge_type_name();
        let where_name = config.where_args_type_name();
        let has_where = !config.where_args.is_empty();

        if !is_valid_name(&config.to_type) {
            return Err(RegistryError::validation(format!(
                "`{}` is not a valid type name",
                config.to_type
            )));
        }
        if !is_valid_name(&config.from_field_name) {
            return Err(RegistryError::validation(format!(
                "`{}` is not a valid field name",
                config.from_field_name
            )));
        }
        let mut derived = vec![connection_name.as_str(), edge_name.as_str()];
        if has_where {
            derived.push(where_name.as_str());
        }
        for name in derived {
            if self.contains(name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
        }
        match self.kind_of(PAGE_INFO_TYPE) {
            None | Some(TypeKind::Object) => {}
            Some(kind) => {
                return Err(RegistryError::validation(format!(
                    "`{PAGE_INFO_TYPE}` is registered as a {kind} type"
                )));
            }
        }
        for field in config.where_args.values() {
            validate_field(&where_name, field, true)?;
        }
        if !self.contains(&config.from_type) && !self.defers_unknown_types() {
            return Err(RegistryError::UnknownType {
                type_name: config.from_type.clone(),
                field_name: config.from_field_name.clone(),
            });
        }

        if !self.contains(PAGE_INFO_TYPE) {
            self.register_type(page_info_type()?)?;
        }

        let node = TypeReference::non_null(TypeReference::named(&config.to_type));
        self.register_type(
            TypeDefinition::object(&edge_name)
                .description(format!("An edge in a connection to {}", config.to_type))
                .field(FieldDefinition::new("cursor", "String!")?)
                .field(FieldDefinition::with_type("node", node.clone())),
        )?;

        let mut connection = TypeDefinition::object(&connection_name)
            .description(format!(
                "Connection between {} and {}",
                config.from_type, config.to_type
            ))
            .field(FieldDefinition::with_type(
                "edges",
                TypeReference::non_null(TypeReference::list(TypeReference::non_null(
                    TypeReference::named(&edge_name),
                ))),
            ))
            .field(FieldDefinition::with_type(
                "nodes",
                TypeReference::non_null(TypeReference::list(node)),
            ))
            .field(FieldDefinition::new("pageInfo", &format!("{PAGE_INFO_TYPE}!"))?);
        if let Some(source) = &config.source {
            connection = connection.source(source.clone());
        }
        self.register_type(connection)?;

        let mut field = FieldDefinition::new(&config.from_field_name, &connection_name)?
            .argument(ArgumentDefinition::new("first", "Int")?.description(
                "The number of items to return after the referenced \"after\" cursor",
            ))
            .argument(ArgumentDefinition::new("last", "Int")?.description(
                "The number of items to return before the referenced \"before\" cursor",
            ))
            .argument(
                ArgumentDefinition::new("after", "String")?
                    .description("Cursor used along with the \"first\" argument"),
            )
            .argument(
                ArgumentDefinition::new("before", "String")?
                    .description("Cursor used along with the \"last\" argument"),
            )
            .resolver(paginate(config.resolve_nodes.clone()));
        if let Some(description) = &config.description {
            field = field.description(description.clone());
        }

        if has_where {
            let mut where_type = TypeDefinition::input_object(&where_name)
                .description(format!("Arguments for filtering the {connection_name}"));
            for arg in config.where_args.into_values() {
                where_type = where_type.field(arg);
            }
            if let Some(source) = config.source {
                where_type = where_type.source(source);
            }
            self.register_type(where_type)?;
            field = field.argument(
                ArgumentDefinition::new("where", &where_name)?
                    .description("Arguments for filtering the connection"),
            );
        }

        self.register_field(&config.from_type, &config.from_field_name, field)?;
        debug!(
            connection = %connection_name,
            from_field = %config.from_field_name,
            "Staged connection"
        );
        Ok(())
    }
}

fn page_info_type() -> Result<TypeDefinition, RegistryError> {
    Ok(TypeDefinition::object(PAGE_INFO_TYPE)
        .description("Information about pagination in a connection.")
        .field(FieldDefinition::new("hasNextPage", "Boolean!")?)
        .field(FieldDefinition::new("hasPreviousPage", "Boolean!")?)
        .field(FieldDefinition::new("startCursor", "String")?)
        .field(FieldDefinition::new("endCursor", "String")?))
}

/// Wraps a node resolver with offset pagination.
fn paginate(resolve_nodes: Resolver) -> Resolver {
    Resolver::new(move |info: ResolveInfo| {
        let resolve_nodes = resolve_nodes.clone();
        async move {
            let window = PageWindow::from_args(&info)?;
            let nodes = match resolve_nodes.call(info).await? {
                Value::List(items) => items,
                Value::Null => Vec::new(),
                _ => {
                    return Err(ExecutionError::resolver(
                        "connection nodes must resolve to a list",
                    ));
                }
            };
            Ok(window.apply(nodes))
        }
    })
}

/// Cursor encoding/decoding utilities.
pub mod cursor {
    use base64::Engine;
    use serde::{Deserialize, Serialize};

    /// Cursor data encoded in the cursor string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CursorData {
        /// Offset of the node in the full result list.
        pub offset: usize,
    }

    impl CursorData {
        #[must_use]
        pub fn new(offset: usize) -> Self {
            Self { offset }
        }

        /// Encode cursor data to a base64 string.
        #[must_use]
        pub fn encode(&self) -> String {
            let json = serde_json::to_string(self).unwrap_or_default();
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
        }

        /// Decode cursor data from a base64 string.
        #[must_use]
        pub fn decode(cursor: &str) -> Option<Self> {
            let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(cursor)
                .ok()?;
            serde_json::from_slice(&bytes).ok()
        }
    }
}

/// Pagination arguments of one connection request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    first: Option<usize>,
    last: Option<usize>,
    after: Option<usize>,
    before: Option<usize>,
}

impl PageWindow {
    fn from_args(info: &ResolveInfo) -> Result<Self, ExecutionError> {
        let count = |name: &str| -> Result<Option<usize>, ExecutionError> {
            match info.arg_i64(name) {
                None => Ok(None),
                Some(n) => usize::try_from(n).map(Some).map_err(|_| {
                    ExecutionError::resolver(format!("`{name}` must not be negative"))
                }),
            }
        };
        let offset = |name: &str| -> Result<Option<usize>, ExecutionError> {
            match info.arg_str(name) {
                None => Ok(None),
                Some(raw) => cursor::CursorData::decode(raw)
                    .map(|c| Some(c.offset))
                    .ok_or_else(|| ExecutionError::resolver(format!("`{name}` is not a valid cursor"))),
            }
        };

        Ok(Self {
            first: count("first")?,
            last: count("last")?,
            after: offset("after")?,
            before: offset("before")?,
        })
    }

    /// Slices `nodes` and builds the connection value.
    fn apply(self, nodes: Vec<Value>) -> Value {
        let total = nodes.len();
        let mut start = self.after.map_or(0, |after| after.saturating_add(1)).min(total);
        let mut end = self.before.map_or(total, |before| before.min(total)).max(start);
        if let Some(first) = self.first {
            end = end.min(start.saturating_add(first));
        }
        if let Some(last) = self.last {
            start = start.max(end.saturating_sub(last));
        }

        let page: Vec<(String, Value)> = nodes
            .into_iter()
            .enumerate()
            .skip(start)
            .take(end - start)
            .map(|(offset, node)| (cursor::CursorData::new(offset).encode(), node))
            .collect();

        let start_cursor = page
            .first()
            .map_or(Value::Null, |(c, _)| Value::String(c.clone()));
        let end_cursor = page
            .last()
            .map_or(Value::Null, |(c, _)| Value::String(c.clone()));

        let mut edges = Vec::with_capacity(page.len());
        let mut page_nodes = Vec::with_capacity(page.len());
        for (cursor, node) in page {
            edges.push(object([
                ("cursor", Value::String(cursor)),
                ("node", node.clone()),
            ]));
            page_nodes.push(node);
        }

        object([
            ("edges", Value::List(edges)),
            ("nodes", Value::List(page_nodes)),
            (
                "pageInfo",
                object([
                    ("hasNextPage", Value::Boolean(end < total)),
                    ("hasPreviousPage", Value::Boolean(start > 0)),
                    ("startCursor", start_cursor),
                    ("endCursor", end_cursor),
                ]),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::cursor::CursorData;
    use super::*;

    fn numbers(n: i32) -> Vec<Value> {
        (0..n).map(|i| Value::Number(i.into())).collect()
    }

    fn page_nodes(value: &Value) -> Vec<Value> {
        let Value::Object(obj) = value else {
            panic!("connection is not an object");
        };
        match obj.get("nodes") {
            Some(Value::List(items)) => items.clone(),
            other => panic!("unexpected nodes {other:?}"),
        }
    }

    fn page_info(value: &Value, key: &str) -> Value {
        let Value::Object(obj) = value else {
            panic!("connection is not an object");
        };
        let Some(Value::Object(info)) = obj.get("pageInfo") else {
            panic!("missing pageInfo");
        };
        info.get(key).cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn test_cursor_encode_decode() {
        let cursor = CursorData::new(10);
        let decoded = CursorData::decode(&cursor.encode()).expect("Should decode");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_decode_invalid() {
        assert!(CursorData::decode("not-valid-base64!!!").is_none());
        assert!(CursorData::decode("").is_none());
    }

    #[test]
    fn test_first_page() {
        let window = PageWindow {
            first: Some(2),
            ..PageWindow::default()
        };
        let value = window.apply(numbers(5));

        assert_eq!(page_nodes(&value), numbers(2));
        assert_eq!(page_info(&value, "hasNextPage"), Value::Boolean(true));
        assert_eq!(page_info(&value, "hasPreviousPage"), Value::Boolean(false));
        assert_eq!(
            page_info(&value, "endCursor"),
            Value::String(CursorData::new(1).encode())
        );
    }

    #[test]
    fn test_after_cursor() {
        let window = PageWindow {
            first: Some(2),
            after: Some(1),
            ..PageWindow::default()
        };
        let value = window.apply(numbers(5));

        assert_eq!(
            page_nodes(&value),
            vec![Value::Number(2.into()), Value::Number(3.into())]
        );
        assert_eq!(page_info(&value, "hasPreviousPage"), Value::Boolean(true));
    }

    #[test]
    fn test_last_before() {
        let window = PageWindow {
            last: Some(2),
            before: Some(4),
            ..PageWindow::default()
        };
        let value = window.apply(numbers(5));

        assert_eq!(
            page_nodes(&value),
            vec![Value::Number(2.into()), Value::Number(3.into())]
        );
        assert_eq!(page_info(&value, "hasNextPage"), Value::Boolean(true));
    }

    #[test]
    fn test_empty_page() {
        let value = PageWindow::default().apply(Vec::new());
        assert!(page_nodes(&value).is_empty());
        assert_eq!(page_info(&value, "startCursor"), Value::Null);
    }

    #[test]
    fn test_register_connection_types() {
        let mut registry = TypeRegistry::new();
        registry.register_type(TypeDefinition::object("RootQuery")).unwrap();
        registry
            .register_type(
                TypeDefinition::object("Post").field(FieldDefinition::new("title", "String").unwrap()),
            )
            .unwrap();

        let config = ConnectionConfig::new("RootQuery", "Post", "posts", Resolver::constant(Value::List(vec![])))
            .where_arg(FieldDefinition::new("search", "String").unwrap())
            .source(serde_json::json!({"queryClass": "ContentQuery"}));
        registry.register_connection(config).unwrap();

        assert!(registry.contains("PageInfo"));
        assert!(registry.contains("RootQueryToPostConnection"));
        assert!(registry.contains("RootQueryToPostConnectionEdge"));
        let where_args = registry.get_type("RootQueryToPostConnectionWhereArgs").unwrap();
        assert_eq!(where_args.kind(), TypeKind::InputObject);
        assert_eq!(
            where_args.source,
            Some(serde_json::json!({"queryClass": "ContentQuery"}))
        );

        let posts = &registry.get_type("RootQuery").unwrap().fields().unwrap()["posts"];
        let args: Vec<_> = posts.arguments.keys().cloned().collect();
        assert_eq!(args, vec!["first", "last", "after", "before", "where"]);
    }

    #[test]
    fn test_duplicate_connection_leaves_registry_untouched() {
        let mut registry = TypeRegistry::new();
        registry.register_type(TypeDefinition::object("RootQuery")).unwrap();
        let config = ConnectionConfig::new("RootQuery", "Post", "posts", Resolver::constant(Value::Null));
        registry.register_connection(config.clone()).unwrap();
        let before = registry.len();

        let err = registry.register_connection(config).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateName("RootQueryToPostConnection".into())
        );
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_failed_connection_registers_nothing() {
        let mut registry = TypeRegistry::new();
        registry.register_type(TypeDefinition::object("RootQuery")).unwrap();
        registry
            .register_type(TypeDefinition::enumeration("Status", ["OPEN", "CLOSED"]))
            .unwrap();
        let names = |r: &TypeRegistry| r.type_names().map(str::to_string).collect::<Vec<_>>();
        let before = names(&registry);

        let on_enum = ConnectionConfig::new("Status", "Post", "posts", Resolver::constant(Value::Null));
        assert!(matches!(
            registry.register_connection(on_enum),
            Err(RegistryError::Validation(_))
        ));
        assert_eq!(names(&registry), before);

        let bad_target =
            ConnectionConfig::new("RootQuery", "Bad Name", "posts", Resolver::constant(Value::Null));
        assert!(registry.register_connection(bad_target).is_err());
        assert_eq!(names(&registry), before);
        assert!(!registry.contains(PAGE_INFO_TYPE));
    }
}
