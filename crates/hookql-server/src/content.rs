//! In-memory demo content model.
//!
//! Registers a `DateTime` scalar, a `PostStatus` enum, the `Post` type with
//! a `posts` connection and a `post(id)` lookup on the query root, and a
//! `createPost` mutation. Posts live in memory and are lost on restart.

use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicU64, Ordering},
};

use async_graphql::Value;
use hookql::types::json_to_value;
use hookql::{
    ArgumentDefinition, ConnectionConfig, ExecutionError, FieldDefinition, RegistryError,
    ResolveInfo, Resolver, ScalarDefinition, SchemaHost, TypeDefinition,
};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Publish,
    Draft,
}

impl PostStatus {
    fn from_value(value: &Value) -> Option<Self> {
        let name = match value {
            Value::Enum(name) => name.as_str(),
            Value::String(s) => s.as_str(),
            _ => return None,
        };
        match name {
            "PUBLISH" => Some(Self::Publish),
            "DRAFT" => Some(Self::Draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: String,
    pub status: PostStatus,
}

impl Post {
    fn to_value(&self) -> Value {
        serde_json::to_value(self).map_or(Value::Null, json_to_value)
    }
}

/// Posts shared between resolvers.
#[derive(Debug, Default)]
pub struct ContentStore {
    posts: RwLock<Vec<Post>>,
    next_id: AtomicU64,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding a few sample posts.
    pub fn with_samples() -> Self {
        let store = Self::new();
        store.insert("Hello world", "Welcome to hookql.", "2024-01-01T09:00:00Z", PostStatus::Publish);
        store.insert("Hooks", "Fields can be added by hooks.", "2024-02-01T09:00:00Z", PostStatus::Publish);
        store.insert("Work in progress", "Not ready yet.", "2024-03-01T09:00:00Z", PostStatus::Draft);
        store
    }

    pub fn insert(&self, title: &str, content: &str, date: &str, status: PostStatus) -> Post {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let post = Post {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            date: date.to_string(),
            status,
        };
        self.posts.write().push(post.clone());
        post
    }

    pub fn get(&self, id: &str) -> Option<Post> {
        self.posts.read().iter().find(|p| p.id == id).cloned()
    }

    /// Posts matching an optional status and a case-insensitive title search.
    pub fn list(&self, status: Option<PostStatus>, search: Option<&str>) -> Vec<Post> {
        let search = search.map(str::to_lowercase);
        self.posts
            .read()
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .filter(|p| {
                search
                    .as_deref()
                    .is_none_or(|needle| p.title.to_lowercase().contains(needle))
            })
            .cloned()
            .collect()
    }
}

fn date_time_scalar() -> ScalarDefinition {
    fn check(value: &Value) -> Result<Value, String> {
        match value {
            Value::String(s) if DATE_TIME.is_match(s) => Ok(value.clone()),
            Value::String(s) => Err(format!("`{s}` is not an RFC 3339 date-time")),
            _ => Err("DateTime must be a string".into()),
        }
    }

    ScalarDefinition::new("DateTime")
        .description("An RFC 3339 date-time string, e.g. 2024-01-01T09:00:00Z")
        .specified_by_url("https://datatracker.ietf.org/doc/html/rfc3339")
        .serialize(check)
        .parse_value(check)
        .parse_literal(|value, _| check(value))
}

fn where_filter(info: &ResolveInfo) -> (Option<PostStatus>, Option<String>) {
    let Some(Value::Object(filter)) = info.arg("where") else {
        return (None, None);
    };
    let status = filter.get("status").and_then(PostStatus::from_value);
    let search = match filter.get("search") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    (status, search)
}

/// Registers the content model on `host`.
pub fn register_content(host: &SchemaHost, store: Arc<ContentStore>) -> Result<(), RegistryError> {
    let query_type = host.config().query_type.clone();
    let mutation_type = host.config().mutation_type.clone();

    host.register_scalar(date_time_scalar())?;
    host.register_type(
        TypeDefinition::enumeration("PostStatus", ["PUBLISH", "DRAFT"])
            .description("Publication status of a post"),
    )?;
    host.register_type(
        TypeDefinition::object("Post")
            .description("A blog post")
            .field(FieldDefinition::new("id", "ID!")?)
            .field(FieldDefinition::new("title", "String")?)
            .field(FieldDefinition::new("content", "String")?)
            .field(FieldDefinition::new("date", "DateTime")?)
            .field(FieldDefinition::new("status", "PostStatus")?),
    )?;

    let list_store = Arc::clone(&store);
    host.register_connection(
        ConnectionConfig::new(
            query_type.clone(),
            "Post",
            "posts",
            Resolver::sync(move |info| {
                let (status, search) = where_filter(info);
                let posts = list_store.list(status, search.as_deref());
                Ok(Value::List(posts.iter().map(Post::to_value).collect()))
            }),
        )
        .description("Connection to all posts")
        .where_arg(FieldDefinition::new("search", "String")?.description("Title contains"))
        .where_arg(FieldDefinition::new("status", "PostStatus")?)
        .source(serde_json::json!({"queryClass": "ContentQuery", "postType": "post"})),
    )?;

    let get_store = Arc::clone(&store);
    host.register_field(
        &query_type,
        "post",
        FieldDefinition::new("post", "Post")?
            .description("A post by id")
            .argument(ArgumentDefinition::new("id", "ID!")?)
            .resolver(Resolver::sync(move |info| {
                let id = info
                    .arg_str("id")
                    .ok_or_else(|| ExecutionError::resolver("`id` is required"))?;
                Ok(get_store.get(id).map_or(Value::Null, |p| p.to_value()))
            })),
    )?;

    host.register_field(
        &mutation_type,
        "createPost",
        FieldDefinition::new("createPost", "Post")?
            .description("Creates a draft post")
            .argument(ArgumentDefinition::new("title", "String!")?)
            .argument(ArgumentDefinition::new("content", "String")?)
            .argument(ArgumentDefinition::new("date", "DateTime!")?)
            .resolver(Resolver::sync(move |info| {
                let title = info
                    .arg_str("title")
                    .ok_or_else(|| ExecutionError::resolver("`title` is required"))?;
                let date = info
                    .arg_str("date")
                    .ok_or_else(|| ExecutionError::resolver("`date` is required"))?;
                let content = info.arg_str("content").unwrap_or_default();
                Ok(store.insert(title, content, date, PostStatus::Draft).to_value())
            })),
    )?;

    tracing::info!("Registered demo content model");
    Ok(())
}
