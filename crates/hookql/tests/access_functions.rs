//! Registration helpers exercised end to end through queries.

use async_graphql::Value;
use hookql::{
    ArgumentDefinition, ConnectionConfig, FieldDefinition, GraphQLConfig, INPUT_FIELDS_HOOK,
    RegistryError, Resolver, ScalarDefinition, SchemaHost, TypeDefinition, format_field_name,
};
use serde_json::json;

fn host() -> SchemaHost {
    SchemaHost::new(GraphQLConfig::default()).expect("default config is valid")
}

/// Registers `Post` plus the `posts` connection with a where-args type
/// tagged with a `queryClass` source config.
fn register_posts(host: &SchemaHost) {
    host.register_type(
        TypeDefinition::object("Post")
            .field(FieldDefinition::new("id", "ID!").unwrap())
            .field(FieldDefinition::new("title", "String").unwrap()),
    )
    .unwrap();

    let posts = Resolver::constant(hookql::types::json_to_value(json!([
        {"id": "1", "title": "Hello"},
        {"id": "2", "title": "World"},
    ])));
    host.register_connection(
        ConnectionConfig::new("RootQuery", "Post", "posts", posts)
            .where_arg(FieldDefinition::new("search", "String").unwrap())
            .source(json!({"queryClass": "ContentQuery"})),
    )
    .unwrap();
}

fn input_field_names(result: &serde_json::Value) -> Vec<String> {
    result["data"]["__type"]["inputFields"]
        .as_array()
        .expect("inputFields is a list")
        .iter()
        .filter_map(|f| f["name"].as_str().map(str::to_string))
        .collect()
}

const WHERE_ARGS_QUERY: &str = r#"
{
  __type(name: "RootQueryToPostConnectionWhereArgs") {
    name
    kind
    inputFields {
      name
    }
  }
}
"#;

#[tokio::test]
async fn test_custom_scalar_can_be_used_in_schema() {
    let host = host();
    host.register_scalar(
        ScalarDefinition::new("TestScalar")
            .description("Test Scalar")
            .serialize(|v| Ok(v.clone()))
            .parse_value(|v| Ok(v.clone()))
            .parse_literal(|v, _| Ok(v.clone())),
    )
    .unwrap();
    host.register_field(
        "RootQuery",
        "testScalar",
        FieldDefinition::new("testScalar", "TestScalar")
            .unwrap()
            .resolver(Resolver::constant("test")),
    )
    .unwrap();

    let actual = host
        .execute(r#"{ __type(name: "TestScalar") { kind } }"#, None)
        .await
        .unwrap()
        .to_json();
    assert!(actual.get("errors").is_none());
    assert_eq!(actual["data"]["__type"]["kind"], "SCALAR");

    let actual = host
        .execute(
            "{ __schema { queryType { fields { name type { name kind } } } } }",
            None,
        )
        .await
        .unwrap()
        .to_json();
    let fields = actual["data"]["__schema"]["queryType"]["fields"]
        .as_array()
        .unwrap();
    assert!(
        fields
            .iter()
            .any(|f| f["type"]["name"] == "TestScalar" && f["type"]["kind"] == "SCALAR")
    );

    let actual = host.execute("{ testScalar }", None).await.unwrap();
    assert_eq!(actual.to_json(), json!({"data": {"testScalar": "test"}}));
}

#[test]
fn test_format_field_name() {
    assert_eq!(format_field_name("This is some field name"), "thisIsSomeFieldName");
}

#[tokio::test]
async fn test_register_input_field() {
    let host = host();
    register_posts(&host);

    host.register_field(
        "RootQueryToPostConnectionWhereArgs",
        "testTest",
        FieldDefinition::new("testTest", "String")
            .unwrap()
            .description("just testing here"),
    )
    .unwrap();

    let actual = host.execute(WHERE_ARGS_QUERY, None).await.unwrap().to_json();
    assert!(input_field_names(&actual).contains(&"testTest".to_string()));

    host.deregister_field("RootQueryToPostConnectionWhereArgs", "testTest");

    let actual = host.execute(WHERE_ARGS_QUERY, None).await.unwrap().to_json();
    assert!(!input_field_names(&actual).contains(&"testTest".to_string()));
    assert!(!host.with_registry(|r| {
        r.get_type("RootQueryToPostConnectionWhereArgs")
            .and_then(TypeDefinition::fields)
            .is_some_and(|f| f.contains_key("testTest"))
    }));
}

#[tokio::test]
async fn test_filtered_input_field_doesnt_exist_by_default() {
    let host = host();
    register_posts(&host);

    let actual = host.execute(WHERE_ARGS_QUERY, None).await.unwrap().to_json();
    assert!(actual.get("errors").is_none());
    assert_eq!(actual["data"]["__type"]["kind"], "INPUT_OBJECT");
    assert!(!input_field_names(&actual).contains(&"testInputField".to_string()));
}

#[tokio::test]
async fn test_filter_input_fields() {
    let host = host();
    register_posts(&host);

    host.add_fields_hook(INPUT_FIELDS_HOOK, 10, |mut fields, ctx| {
        if ctx.source_str("queryClass") == Some("ContentQuery") {
            let field = FieldDefinition::new("testInputField", "String")?;
            fields.insert("testInputField".into(), field);
        }
        Ok(fields)
    });

    let actual = host.execute(WHERE_ARGS_QUERY, None).await.unwrap().to_json();
    assert!(actual.get("errors").is_none());
    let names = input_field_names(&actual);
    assert!(names.contains(&"testInputField".to_string()));
    assert!(names.contains(&"search".to_string()));
}

#[tokio::test]
async fn test_connection_pagination() {
    let host = host();
    register_posts(&host);

    let actual = host
        .execute(
            "{ posts(first: 1) { nodes { title } pageInfo { hasNextPage endCursor } } }",
            None,
        )
        .await
        .unwrap()
        .to_json();
    assert_eq!(actual["data"]["posts"]["nodes"], json!([{"title": "Hello"}]));
    assert_eq!(actual["data"]["posts"]["pageInfo"]["hasNextPage"], true);

    let cursor = actual["data"]["posts"]["pageInfo"]["endCursor"]
        .as_str()
        .unwrap()
        .to_string();
    let actual = host
        .execute(
            "query Next($after: String) { posts(first: 1, after: $after) { edges { node { id } } pageInfo { hasNextPage hasPreviousPage } } }",
            Some(json!({"after": cursor})),
        )
        .await
        .unwrap()
        .to_json();
    assert_eq!(
        actual["data"]["posts"]["edges"],
        json!([{"node": {"id": "2"}}])
    );
    assert_eq!(actual["data"]["posts"]["pageInfo"]["hasNextPage"], false);
    assert_eq!(actual["data"]["posts"]["pageInfo"]["hasPreviousPage"], true);
}

#[tokio::test]
async fn test_invalid_cursor_is_field_error() {
    let host = host();
    register_posts(&host);

    let result = host
        .execute(r#"{ posts(after: "garbage") { nodes { id } } }"#, None)
        .await
        .unwrap();
    assert_eq!(result.error_codes(), vec!["RESOLVER_ERROR"]);
    assert_eq!(result.data, Some(json!({"posts": null})));
}

#[tokio::test]
async fn test_failed_connection_keeps_registry_and_schema() {
    let host = host();
    register_posts(&host);
    host.register_type(TypeDefinition::enumeration("Status", ["OPEN", "CLOSED"]))
        .unwrap();
    assert!(host.execute("{ posts { nodes { id } } }", None).await.unwrap().is_ok());

    let types = |host: &SchemaHost| {
        host.with_registry(|r| r.type_names().map(str::to_string).collect::<Vec<_>>())
    };
    let before = types(&host);
    let generation = host.generation();

    let err = host
        .register_connection(ConnectionConfig::new(
            "Status",
            "Post",
            "posts",
            Resolver::constant(Value::Null),
        ))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)), "{err:?}");
    assert_eq!(types(&host), before);
    assert_eq!(host.generation(), generation);

    host.clear_schema();
    let result = host.execute("{ posts { nodes { id } } }", None).await.unwrap();
    assert!(result.is_ok(), "{:?}", result.errors);
}

/// `Tagged` marks which parser saw the value: `literal:` for inline
/// arguments, `value:` for variables.
fn register_tagged(host: &SchemaHost) {
    fn tag(prefix: &'static str) -> impl Fn(&Value) -> Result<Value, String> {
        move |v| match v {
            Value::String(s) => Ok(Value::String(format!("{prefix}:{s}"))),
            _ => Err("Tagged must be a string".into()),
        }
    }
    let literal = tag("literal");
    host.register_scalar(
        ScalarDefinition::new("Tagged")
            .serialize(|v| Ok(v.clone()))
            .parse_value(tag("value"))
            .parse_literal(move |v, _| literal(v)),
    )
    .unwrap();
    host.register_type(
        TypeDefinition::input_object("TaggedInput")
            .field(FieldDefinition::new("tag", "Tagged").unwrap())
            .field(FieldDefinition::new("label", "String").unwrap()),
    )
    .unwrap();
    host.register_field(
        "RootQuery",
        "echo",
        FieldDefinition::new("echo", "String")
            .unwrap()
            .argument(ArgumentDefinition::new("value", "Tagged").unwrap())
            .resolver(Resolver::sync(|info| Ok(info.arg("value").cloned().unwrap_or(Value::Null)))),
    )
    .unwrap();
    host.register_field(
        "RootQuery",
        "echoInput",
        FieldDefinition::new("echoInput", "String")
            .unwrap()
            .argument(ArgumentDefinition::new("input", "[TaggedInput!]").unwrap())
            .resolver(Resolver::sync(|info| {
                let tags = match info.arg("input") {
                    Some(Value::List(items)) => items
                        .iter()
                        .filter_map(|item| match item {
                            Value::Object(obj) => match obj.get("tag") {
                                Some(Value::String(s)) => Some(s.clone()),
                                _ => None,
                            },
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                    _ => Vec::new(),
                };
                Ok(Value::String(tags.join(",")))
            })),
    )
    .unwrap();
}

#[tokio::test]
async fn test_custom_scalar_argument_parsers() {
    let host = host();
    register_tagged(&host);

    let inline = host.execute(r#"{ echo(value: "x") }"#, None).await.unwrap();
    assert_eq!(inline.to_json(), json!({"data": {"echo": "literal:x"}}));

    let variable = host
        .execute(
            "query Echo($v: Tagged) { echo(value: $v) }",
            Some(json!({"v": "y"})),
        )
        .await
        .unwrap();
    assert_eq!(variable.to_json(), json!({"data": {"echo": "value:y"}}));

    let rejected = host.execute("{ echo(value: 5) }", None).await.unwrap();
    assert_eq!(rejected.error_codes(), vec!["SCALAR_PARSE_ERROR"]);
    assert_eq!(rejected.data, Some(json!({"echo": null})));
}

#[tokio::test]
async fn test_custom_scalar_nested_in_input_object() {
    let host = host();
    register_tagged(&host);

    let inline = host
        .execute(
            r#"{ echoInput(input: [{tag: "a", label: "first"}, {tag: "b"}]) }"#,
            None,
        )
        .await
        .unwrap();
    assert_eq!(inline.to_json(), json!({"data": {"echoInput": "literal:a,literal:b"}}));

    let variable = host
        .execute(
            "query Echo($i: [TaggedInput!]) { echoInput(input: $i) }",
            Some(json!({"i": [{"tag": "c"}]})),
        )
        .await
        .unwrap();
    assert_eq!(variable.to_json(), json!({"data": {"echoInput": "value:c"}}));

    let rejected = host
        .execute("{ echoInput(input: [{tag: 7}]) }", None)
        .await
        .unwrap();
    assert_eq!(rejected.error_codes(), vec!["SCALAR_PARSE_ERROR"]);
}
