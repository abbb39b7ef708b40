//! Compiles a registry snapshot into an executable schema.
//!
//! Compilation runs in two passes over an owned snapshot:
//!
//! 1. Every type's field map is run through the field hooks (kind-wide hook
//!    first, then the type-specific one), so the set of names and kinds is
//!    final before anything is resolved.
//! 2. Every reference is resolved by name and checked against the kind its
//!    position requires, then the engine types are built.
//!
//! No lock is held while hooks run: the compiler owns its snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputObject, InputValue, Interface, InterfaceField,
    Object, Scalar, Schema, SchemaBuilder, Union,
};
use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use super::resolve::{FieldPlan, InputParsers, OutputKind, ParsedArgument, resolve_field};
use crate::error::SchemaError;
use crate::hooks::{FieldHooks, FieldsHookContext, HookError, kind_fields_hook, type_fields_hook};
use crate::registry::{BUILTIN_SCALARS, TypeRegistry, is_builtin_scalar, validate_field};
use crate::types::{
    ArgumentDefinition, FieldDefinition, FieldMap, Resolver, TypeBody, TypeDefinition, TypeKind,
    TypeReference,
};

/// Schema-wide settings applied when compiling.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Name of the query root type.
    pub query_type: String,
    /// Name of the mutation root type. Attached only when registered with fields.
    pub mutation_type: String,
    pub max_depth: usize,
    pub max_complexity: usize,
    pub introspection_enabled: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            query_type: "RootQuery".to_string(),
            mutation_type: "RootMutation".to_string(),
            max_depth: 15,
            max_complexity: 500,
            introspection_enabled: true,
        }
    }
}

/// An immutable, executable schema.
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Schema,
    generation: u64,
    type_names: BTreeSet<String>,
}

impl CompiledSchema {
    /// The engine schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Cache generation this schema was compiled for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Exports the schema as SDL.
    #[must_use]
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// Returns true if the schema contains the named type (built-in scalars included).
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.type_names.contains(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.type_names.iter().map(String::as_str)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("generation", &self.generation)
            .field("types", &self.type_names.len())
            .finish()
    }
}

/// Turns a registry snapshot plus field hooks into a [`CompiledSchema`].
pub struct SchemaCompiler {
    registry: Arc<TypeRegistry>,
    hooks: FieldHooks,
    config: CompileConfig,
}

impl SchemaCompiler {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>, hooks: FieldHooks, config: CompileConfig) -> Self {
        Self {
            registry,
            hooks,
            config,
        }
    }

    /// Compiles the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found: a failing hook, a
    /// dangling or mis-kinded reference, an incomplete scalar, a type left
    /// without fields, or a rejection by the engine.
    pub fn compile(&self, generation: u64) -> Result<CompiledSchema, SchemaError> {
        debug!(generation, types = self.registry.len(), "Starting schema compile");

        let mut types = self.assemble_fields()?;

        // An empty mutation root is simply left out.
        if types
            .get(&self.config.mutation_type)
            .and_then(TypeDefinition::fields)
            .is_some_and(IndexMap::is_empty)
        {
            types.shift_remove(&self.config.mutation_type);
        }

        let kinds: IndexMap<String, TypeKind> = types
            .values()
            .map(|def| (def.name.clone(), def.kind()))
            .chain(
                BUILTIN_SCALARS
                    .iter()
                    .map(|name| ((*name).to_string(), TypeKind::Scalar)),
            )
            .collect();

        self.check_roots(&kinds)?;
        for def in types.values() {
            check_type(def, &kinds)?;
        }
        for (type_name, field_name) in self.registry.pending_fields() {
            warn!(
                type_name = %type_name,
                field_name = %field_name,
                "Ignoring field queued for a type that was never registered"
            );
        }

        let schema = self.build(&types)?;
        info!(generation, types = types.len(), "Compiled GraphQL schema");

        Ok(CompiledSchema {
            schema,
            generation,
            type_names: kinds.into_keys().collect(),
        })
    }

    /// Pass one: fires the field hooks for every type with fields.
    fn assemble_fields(&self) -> Result<IndexMap<String, TypeDefinition>, SchemaError> {
        let mut types: IndexMap<String, TypeDefinition> = self
            .registry
            .types()
            .map(|def| (def.name.clone(), def.clone()))
            .collect();

        for def in types.values_mut() {
            let kind = def.kind();
            let Some(kind_hook) = kind_fields_hook(kind) else {
                continue;
            };
            let context = FieldsHookContext {
                type_name: def.name.clone(),
                kind,
                source: def.source.clone(),
                registry: Arc::clone(&self.registry),
            };
            let Some(fields) = def.fields_mut() else {
                continue;
            };

            let mut current = std::mem::take(fields);
            for hook in [kind_hook.to_string(), type_fields_hook(&context.type_name)] {
                if !self.hooks.has_hooks(&hook) {
                    continue;
                }
                current = self
                    .hooks
                    .fire(&hook, current, &context)
                    .and_then(|out| normalize_hook_output(&context, out))
                    .map_err(|source| SchemaError::Hook {
                        hook: hook.clone(),
                        type_name: context.type_name.clone(),
                        source,
                    })?;
                trace!(hook = %hook, type_name = %context.type_name, fields = current.len(), "Applied field hook");
            }
            *fields = current;
        }
        Ok(types)
    }

    fn check_roots(&self, kinds: &IndexMap<String, TypeKind>) -> Result<(), SchemaError> {
        match kinds.get(&self.config.query_type) {
            Some(TypeKind::Object) => {}
            Some(other) => {
                return Err(SchemaError::Build(format!(
                    "query root `{}` is a {other} type, expected OBJECT",
                    self.config.query_type
                )));
            }
            None => {
                return Err(SchemaError::Build(format!(
                    "query root `{}` is not registered",
                    self.config.query_type
                )));
            }
        }
        if let Some(kind) = kinds.get(&self.config.mutation_type) {
            if *kind != TypeKind::Object {
                return Err(SchemaError::Build(format!(
                    "mutation root `{}` is a {kind} type, expected OBJECT",
                    self.config.mutation_type
                )));
            }
        }
        Ok(())
    }

    /// Pass two, final step: builds the engine types.
    fn build(&self, types: &IndexMap<String, TypeDefinition>) -> Result<Schema, SchemaError> {
        let mutation = types
            .contains_key(&self.config.mutation_type)
            .then_some(self.config.mutation_type.as_str());
        let mut builder = Schema::build(&self.config.query_type, mutation, None);
        let inputs = Arc::new(InputParsers::new(types));

        for def in types.values() {
            builder = register_type(builder, def, types, &inputs);
        }

        builder = builder
            .limit_depth(self.config.max_depth)
            .limit_complexity(self.config.max_complexity);
        if !self.config.introspection_enabled {
            builder = builder.disable_introspection();
        }

        builder.finish().map_err(|e| {
            warn!(error = %e, "Engine rejected the assembled schema");
            SchemaError::Build(e.to_string())
        })
    }
}

/// Makes hook output consistent: map keys are the field names, and every
/// field must be valid for its owner.
fn normalize_hook_output(context: &FieldsHookContext, fields: FieldMap) -> Result<FieldMap, HookError> {
    let input = context.kind == TypeKind::InputObject;
    let mut out = FieldMap::with_capacity(fields.len());
    for (name, mut field) in fields {
        field.name.clone_from(&name);
        validate_field(&context.type_name, &field, input)?;
        out.insert(name, field);
    }
    Ok(out)
}

fn check_type(def: &TypeDefinition, kinds: &IndexMap<String, TypeKind>) -> Result<(), SchemaError> {
    match &def.body {
        TypeBody::Object { fields, interfaces } => {
            check_output_fields(&def.name, fields, kinds)?;
            for interface in interfaces {
                check_reference(&def.name, "implements", interface, kinds, |k| {
                    (k == TypeKind::Interface).then_some(()).ok_or("an implemented interface")
                })?;
            }
        }
        TypeBody::Interface { fields } => check_output_fields(&def.name, fields, kinds)?,
        TypeBody::InputObject { fields } => {
            if fields.is_empty() {
                return Err(SchemaError::EmptyType(def.name.clone()));
            }
            for field in fields.values() {
                check_reference(&def.name, &field.name, field.type_ref.base_name(), kinds, input_position)?;
            }
        }
        TypeBody::Union { members } => {
            for member in members {
                check_reference(&def.name, "member", member, kinds, |k| {
                    (k == TypeKind::Object).then_some(()).ok_or("a union member")
                })?;
            }
        }
        TypeBody::Scalar { behavior, .. } => {
            if let Some(missing) = behavior.missing() {
                return Err(SchemaError::InvalidScalar {
                    name: def.name.clone(),
                    missing,
                });
            }
        }
        TypeBody::Enum { .. } => {}
    }
    Ok(())
}

fn check_output_fields(
    owner: &str,
    fields: &FieldMap,
    kinds: &IndexMap<String, TypeKind>,
) -> Result<(), SchemaError> {
    if fields.is_empty() {
        return Err(SchemaError::EmptyType(owner.to_string()));
    }
    for field in fields.values() {
        check_reference(owner, &field.name, field.type_ref.base_name(), kinds, output_position)?;
        for arg in field.arguments.values() {
            let position = format!("{}({})", field.name, arg.name);
            check_reference(owner, &position, arg.type_ref.base_name(), kinds, input_position)?;
        }
    }
    Ok(())
}

fn input_position(kind: TypeKind) -> Result<(), &'static str> {
    kind.is_input().then_some(()).ok_or("an input type")
}

fn output_position(kind: TypeKind) -> Result<(), &'static str> {
    kind.is_output().then_some(()).ok_or("an output type")
}

fn check_reference(
    owner: &str,
    field: &str,
    reference: &str,
    kinds: &IndexMap<String, TypeKind>,
    accepts: impl Fn(TypeKind) -> Result<(), &'static str>,
) -> Result<(), SchemaError> {
    let Some(kind) = kinds.get(reference).copied() else {
        return Err(SchemaError::UnresolvedReference {
            owner: owner.to_string(),
            field: field.to_string(),
            reference: reference.to_string(),
        });
    };
    accepts(kind).map_err(|position| SchemaError::KindMismatch {
        owner: owner.to_string(),
        field: field.to_string(),
        reference: reference.to_string(),
        kind,
        position,
    })
}

fn register_type(
    builder: SchemaBuilder,
    def: &TypeDefinition,
    types: &IndexMap<String, TypeDefinition>,
    inputs: &Arc<InputParsers>,
) -> SchemaBuilder {
    match &def.body {
        TypeBody::Object { fields, interfaces } => {
            let mut object = Object::new(&def.name);
            if let Some(description) = &def.description {
                object = object.description(description);
            }
            for interface in interfaces {
                object = object.implement(interface);
            }
            for field in fields.values() {
                object = object.field(build_field(&def.name, field, types, inputs));
            }
            builder.register(object)
        }
        TypeBody::Interface { fields } => {
            let mut interface = Interface::new(&def.name);
            if let Some(description) = &def.description {
                interface = interface.description(description);
            }
            for field in fields.values() {
                let mut iface_field = InterfaceField::new(&field.name, field.type_ref.to_type_ref());
                if let Some(description) = &field.description {
                    iface_field = iface_field.description(description);
                }
                if field.deprecation.is_deprecated() {
                    iface_field = iface_field.deprecation(field.deprecation.reason());
                }
                for arg in field.arguments.values() {
                    iface_field = iface_field.argument(build_argument(arg));
                }
                interface = interface.field(iface_field);
            }
            builder.register(interface)
        }
        TypeBody::InputObject { fields } => {
            let mut input = InputObject::new(&def.name);
            if let Some(description) = &def.description {
                input = input.description(description);
            }
            for field in fields.values() {
                input = input.field(build_input_field(field));
            }
            builder.register(input)
        }
        TypeBody::Enum { values } => {
            let mut enumeration = Enum::new(&def.name);
            if let Some(description) = &def.description {
                enumeration = enumeration.description(description);
            }
            for value in values.values() {
                let mut item = EnumItem::new(&value.name);
                if let Some(description) = &value.description {
                    item = item.description(description);
                }
                if value.deprecation.is_deprecated() {
                    item = item.deprecation(value.deprecation.reason());
                }
                enumeration = enumeration.item(item);
            }
            builder.register(enumeration)
        }
        TypeBody::Union { members } => {
            let mut union = Union::new(&def.name);
            if let Some(description) = &def.description {
                union = union.description(description);
            }
            for member in members {
                union = union.possible_type(member);
            }
            builder.register(union)
        }
        TypeBody::Scalar {
            specified_by_url, ..
        } => {
            let mut scalar = Scalar::new(&def.name);
            if let Some(description) = &def.description {
                scalar = scalar.description(description);
            }
            if let Some(url) = specified_by_url {
                scalar = scalar.specified_by_url(url);
            }
            builder.register(scalar)
        }
    }
}

fn build_field(
    owner: &str,
    field: &FieldDefinition,
    types: &IndexMap<String, TypeDefinition>,
    inputs: &Arc<InputParsers>,
) -> Field {
    let parsed_args = field
        .arguments
        .values()
        .filter(|arg| inputs.needs_parsing(arg.type_ref.base_name()))
        .map(|arg| ParsedArgument {
            name: arg.name.clone(),
            type_ref: arg.type_ref.clone(),
        })
        .collect();

    let plan = Arc::new(FieldPlan {
        type_name: owner.to_string(),
        field_name: field.name.clone(),
        type_ref: field.type_ref.clone(),
        resolver: field.resolver.clone().unwrap_or_else(Resolver::property),
        output: output_kind(&field.type_ref, types),
        parsed_args,
        inputs: Arc::clone(inputs),
    });

    let mut built = Field::new(&field.name, field.type_ref.to_type_ref(), move |ctx| {
        let plan = Arc::clone(&plan);
        FieldFuture::new(resolve_field(plan, ctx))
    });
    if let Some(description) = &field.description {
        built = built.description(description);
    }
    if field.deprecation.is_deprecated() {
        built = built.deprecation(field.deprecation.reason());
    }
    for arg in field.arguments.values() {
        built = built.argument(build_argument(arg));
    }
    built
}

fn build_argument(arg: &ArgumentDefinition) -> InputValue {
    let mut input = InputValue::new(&arg.name, arg.type_ref.to_type_ref());
    if let Some(description) = &arg.description {
        input = input.description(description);
    }
    if let Some(default) = &arg.default_value {
        input = input.default_value(default.clone());
    }
    input
}

fn build_input_field(field: &FieldDefinition) -> InputValue {
    let mut input = InputValue::new(&field.name, field.type_ref.to_type_ref());
    if let Some(description) = &field.description {
        input = input.description(description);
    }
    if let Some(default) = &field.default_value {
        input = input.default_value(default.clone());
    }
    input
}

fn custom_scalar(
    name: &str,
    types: &IndexMap<String, TypeDefinition>,
) -> Option<(String, crate::types::ScalarBehavior)> {
    if is_builtin_scalar(name) {
        return None;
    }
    match &types.get(name)?.body {
        TypeBody::Scalar { behavior, .. } => Some((name.to_string(), behavior.clone())),
        _ => None,
    }
}

fn output_kind(type_ref: &TypeReference, types: &IndexMap<String, TypeDefinition>) -> OutputKind {
    let name = type_ref.base_name();
    if let Some((name, behavior)) = custom_scalar(name, types) {
        return OutputKind::Scalar { name, behavior };
    }
    match types.get(name).map(TypeDefinition::kind) {
        Some(TypeKind::Enum) => OutputKind::Enum,
        Some(TypeKind::Object) => OutputKind::Object,
        Some(TypeKind::Interface | TypeKind::Union) => OutputKind::Abstract,
        _ => OutputKind::Builtin,
    }
}
