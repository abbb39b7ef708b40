//! Glue between registered resolvers and the engine's field futures.
//!
//! Every output field of the compiled schema resolves through
//! [`resolve_field`], driven by a [`FieldPlan`] computed at compile time.
//! The plan says which arguments hold custom scalars to parse, which
//! scalar serializes the output, and how the resolved value maps onto the
//! field's declared type.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Name, Value};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::ExecutionError;
use crate::executor::ExecutionScope;
use crate::registry::is_builtin_scalar;
use crate::types::{ResolveInfo, Resolver, ScalarBehavior, TypeBody, TypeDefinition, TypeReference};

/// How the named type at the bottom of a field's type is produced.
#[derive(Debug, Clone)]
pub(crate) enum OutputKind {
    /// Built-in scalar: passed through.
    Builtin,
    /// Custom scalar: passed through `serialize`.
    Scalar {
        name: String,
        behavior: ScalarBehavior,
    },
    /// Enum: strings become enum values.
    Enum,
    /// Object: the value becomes the parent of the child fields.
    Object,
    /// Interface or union: the concrete type comes from `__typename`.
    Abstract,
}

/// An argument whose value contains custom scalars, directly or inside
/// input objects.
#[derive(Debug, Clone)]
pub(crate) struct ParsedArgument {
    pub name: String,
    pub type_ref: TypeReference,
}

/// Custom scalar parsers and the input object fields that lead to them.
/// Built once per compile and shared by every field plan.
#[derive(Debug, Default)]
pub(crate) struct InputParsers {
    scalars: HashMap<String, ScalarBehavior>,
    /// Input object name to the fields that need parsing.
    inputs: HashMap<String, Vec<(String, TypeReference)>>,
}

impl InputParsers {
    pub(crate) fn new(types: &IndexMap<String, TypeDefinition>) -> Self {
        let scalars: HashMap<String, ScalarBehavior> = types
            .values()
            .filter(|def| !is_builtin_scalar(&def.name))
            .filter_map(|def| match &def.body {
                TypeBody::Scalar { behavior, .. } => Some((def.name.clone(), behavior.clone())),
                _ => None,
            })
            .collect();

        // Input objects reaching a custom scalar, possibly through other
        // input objects. Grows until stable.
        let mut reaching: HashSet<&str> = HashSet::new();
        loop {
            let before = reaching.len();
            for def in types.values() {
                let TypeBody::InputObject { fields } = &def.body else {
                    continue;
                };
                if reaching.contains(def.name.as_str()) {
                    continue;
                }
                if fields.values().any(|f| {
                    let base = f.type_ref.base_name();
                    scalars.contains_key(base) || reaching.contains(base)
                }) {
                    reaching.insert(def.name.as_str());
                }
            }
            if reaching.len() == before {
                break;
            }
        }

        let inputs = reaching
            .iter()
            .filter_map(|name| {
                let TypeBody::InputObject { fields } = &types.get(*name)?.body else {
                    return None;
                };
                let parsed = fields
                    .values()
                    .filter(|f| {
                        let base = f.type_ref.base_name();
                        scalars.contains_key(base) || reaching.contains(base)
                    })
                    .map(|f| (f.name.clone(), f.type_ref.clone()))
                    .collect();
                Some(((*name).to_string(), parsed))
            })
            .collect();

        Self { scalars, inputs }
    }

    pub(crate) fn needs_parsing(&self, type_name: &str) -> bool {
        self.scalars.contains_key(type_name) || self.inputs.contains_key(type_name)
    }

    /// Runs every custom scalar inside `value` through `parse`. Errors name
    /// the scalar that rejected its value.
    fn parse<F>(&self, value: &Value, type_ref: &TypeReference, parse: &F) -> Result<Value, (String, String)>
    where
        F: Fn(&ScalarBehavior, &Value) -> Result<Value, String>,
    {
        match (type_ref, value) {
            (_, Value::Null) => Ok(Value::Null),
            (TypeReference::NonNull(inner), _) => self.parse(value, inner, parse),
            (TypeReference::List(inner), Value::List(items)) => items
                .iter()
                .map(|item| self.parse(item, inner, parse))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (TypeReference::List(inner), _) => self.parse(value, inner, parse),
            (TypeReference::Named(name), _) => {
                if let Some(behavior) = self.scalars.get(name) {
                    return parse(behavior, value).map_err(|message| (name.clone(), message));
                }
                match (self.inputs.get(name), value) {
                    (Some(fields), Value::Object(obj)) => {
                        let mut obj = obj.clone();
                        for (field, field_type) in fields {
                            if let Some(raw) = obj.get(field.as_str()) {
                                let parsed = self.parse(raw, field_type, parse)?;
                                obj.insert(Name::new(field), parsed);
                            }
                        }
                        Ok(Value::Object(obj))
                    }
                    _ => Ok(value.clone()),
                }
            }
        }
    }
}

/// Everything needed at execution time to resolve one field.
#[derive(Debug)]
pub(crate) struct FieldPlan {
    pub type_name: String,
    pub field_name: String,
    pub type_ref: TypeReference,
    pub resolver: Resolver,
    pub output: OutputKind,
    pub parsed_args: Vec<ParsedArgument>,
    pub inputs: Arc<InputParsers>,
}

/// Resolves one field for the engine.
///
/// A failing nullable field resolves to null and records its error with the
/// field's path, so sibling fields keep their data. Errors on non-null
/// fields propagate to the parent.
pub(crate) async fn resolve_field<'a>(
    plan: Arc<FieldPlan>,
    ctx: ResolverContext<'a>,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    match resolve_plan(&plan, &ctx).await {
        Ok(value) => Ok(value),
        Err(err) if plan.type_ref.is_non_null() => Err(err.into_field_error()),
        Err(err) => {
            let error = err.into_field_error().into_server_error(ctx.ctx.item.pos);
            ctx.ctx.add_error(ctx.ctx.set_error_path(error));
            Ok(None)
        }
    }
}

async fn resolve_plan<'a>(
    plan: &FieldPlan,
    ctx: &ResolverContext<'a>,
) -> Result<Option<FieldValue<'a>>, ExecutionError> {
    let scope = ctx
        .ctx
        .data_opt::<ExecutionScope>()
        .cloned()
        .unwrap_or_default();
    scope.ensure_active()?;

    let args = collect_arguments(plan, ctx, &scope)?;
    let parent = ctx
        .parent_value
        .as_value()
        .cloned()
        .unwrap_or(Value::Null);

    trace!(
        type_name = %plan.type_name,
        field_name = %plan.field_name,
        "Resolving field"
    );

    let info = ResolveInfo {
        type_name: plan.type_name.clone(),
        field_name: plan.field_name.clone(),
        parent,
        args,
    };

    let value = scope.run(plan.resolver.call(info)).await.inspect_err(|err| {
        debug!(
            type_name = %plan.type_name,
            field_name = %plan.field_name,
            error = %err,
            "Field resolution failed"
        );
    })?;

    let value = serialize_output(plan, value)?;
    to_field_value(value, &plan.type_ref, &plan.output)
}

/// Copies the coerced arguments, running custom scalars (top level or
/// nested in input objects) through `parse_literal` when the argument is
/// written inline and `parse_value` otherwise.
fn collect_arguments(
    plan: &FieldPlan,
    ctx: &ResolverContext<'_>,
    scope: &ExecutionScope,
) -> Result<IndexMap<String, Value>, ExecutionError> {
    let mut args: IndexMap<String, Value> = ctx
        .args
        .as_index_map()
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    for arg in &plan.parsed_args {
        let Some(raw) = args.get(&arg.name) else {
            continue;
        };
        // A literal that still contains variables has no const form.
        let inline = ctx
            .ctx
            .item
            .node
            .get_argument(&arg.name)
            .is_some_and(|written| written.node.clone().into_const().is_some());

        let parsed = plan
            .inputs
            .parse(raw, &arg.type_ref, &|behavior, leaf| {
                if inline {
                    behavior.parse_literal(leaf, scope.variables())
                } else {
                    behavior.parse_value(leaf)
                }
            })
            .map_err(|(scalar, message)| ExecutionError::ScalarParse {
                argument: arg.name.clone(),
                scalar,
                message,
            })?;
        args.insert(arg.name.clone(), parsed);
    }
    Ok(args)
}

fn serialize_output(plan: &FieldPlan, value: Value) -> Result<Value, ExecutionError> {
    match &plan.output {
        OutputKind::Scalar { name, behavior } => {
            map_leaves(&value, &plan.type_ref, &|leaf| behavior.serialize(leaf)).map_err(
                |message| ExecutionError::ScalarSerialize {
                    scalar: name.clone(),
                    message,
                },
            )
        }
        _ => Ok(value),
    }
}

/// Applies `f` to every non-null leaf of `value`, following the list
/// structure of `type_ref`.
pub(crate) fn map_leaves<F>(value: &Value, type_ref: &TypeReference, f: &F) -> Result<Value, String>
where
    F: Fn(&Value) -> Result<Value, String>,
{
    match (type_ref, value) {
        (_, Value::Null) => Ok(Value::Null),
        (TypeReference::NonNull(inner), _) => map_leaves(value, inner, f),
        (TypeReference::List(inner), Value::List(items)) => items
            .iter()
            .map(|item| map_leaves(item, inner, f))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        _ => f(value),
    }
}

/// Shapes a resolved value for the engine.
fn to_field_value<'a>(
    value: Value,
    type_ref: &TypeReference,
    output: &OutputKind,
) -> Result<Option<FieldValue<'a>>, ExecutionError> {
    if matches!(value, Value::Null) {
        return Ok(None);
    }
    match type_ref {
        TypeReference::NonNull(inner) => to_field_value(value, inner, output),
        TypeReference::List(inner) => {
            let Value::List(items) = value else {
                return Err(ExecutionError::resolver(
                    "resolver returned a single value for a list field",
                ));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(
                    to_field_value(item, inner, output)?
                        .unwrap_or_else(|| FieldValue::value(Value::Null)),
                );
            }
            Ok(Some(FieldValue::list(out)))
        }
        TypeReference::Named(type_name) => leaf_value(value, type_name, output).map(Some),
    }
}

fn leaf_value<'a>(
    value: Value,
    type_name: &str,
    output: &OutputKind,
) -> Result<FieldValue<'a>, ExecutionError> {
    match output {
        OutputKind::Abstract => {
            let concrete = match &value {
                Value::Object(obj) => match obj.get("__typename") {
                    Some(Value::String(name)) => Some(name.clone()),
                    _ => None,
                },
                _ => None,
            };
            let Some(concrete) = concrete else {
                return Err(ExecutionError::resolver(format!(
                    "value for abstract type `{type_name}` has no `__typename`"
                )));
            };
            Ok(FieldValue::value(value).with_type(concrete))
        }
        OutputKind::Enum => match value {
            Value::String(s) => Ok(FieldValue::value(Value::Enum(Name::new(s)))),
            other => Ok(FieldValue::value(other)),
        },
        OutputKind::Builtin | OutputKind::Scalar { .. } | OutputKind::Object => {
            Ok(FieldValue::value(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_leaves_follows_lists() {
        let ty = TypeReference::parse("[Int]!").unwrap();
        let value = Value::List(vec![Value::Number(1.into()), Value::Null, Value::Number(3.into())]);

        let doubled = map_leaves(&value, &ty, &|v| match v {
            Value::Number(n) => Ok(Value::Number((n.as_i64().unwrap_or(0) * 2).into())),
            _ => Err("not a number".into()),
        })
        .unwrap();

        assert_eq!(
            doubled,
            Value::List(vec![Value::Number(2.into()), Value::Null, Value::Number(6.into())])
        );
    }

    #[test]
    fn test_map_leaves_reports_errors() {
        let ty = TypeReference::parse("String").unwrap();
        let err = map_leaves(&Value::Boolean(true), &ty, &|_| Err("nope".to_string()));
        assert_eq!(err, Err("nope".to_string()));
    }

    #[test]
    fn test_list_field_rejects_single_value() {
        let ty = TypeReference::parse("[String]").unwrap();
        let result = to_field_value(Value::String("x".into()), &ty, &OutputKind::Builtin);
        assert!(result.is_err());
    }

    #[test]
    fn test_abstract_requires_typename() {
        let ty = TypeReference::parse("Node").unwrap();
        let result = to_field_value(
            crate::types::object([("id", Value::String("1".into()))]),
            &ty,
            &OutputKind::Abstract,
        );
        assert!(result.is_err());
    }
}
