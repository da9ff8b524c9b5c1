//! Static `@cacheControl` declarations.
//!
//! Hints are declared in the schema with
//! `@cacheControl(maxAge: Int, scope: CacheControlScope)` on field
//! definitions, object types and interface types. [`HintDeclarations`]
//! extracts them once, when the plugin is built, into a read-only map.

use crate::error::{CacheControlError, CacheControlResult};
use crate::hint::CacheHint;
use crate::source::{FieldSite, ReturnKind};
use cachet_runtime::{
    Directive, DirectiveDefinition, DirectiveLocation, EnumDef, ResolverInfo, Schema,
    SchemaBuilder, TypeDef, TypeRef,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Name of the cache control directive.
pub const CACHE_CONTROL_DIRECTIVE: &str = "cacheControl";

/// Name of the enum backing the directive's `scope` argument.
pub const CACHE_CONTROL_SCOPE_ENUM: &str = "CacheControlScope";

/// Returns the `@cacheControl` directive definition.
pub fn cache_control_directive() -> DirectiveDefinition {
    DirectiveDefinition::new(CACHE_CONTROL_DIRECTIVE)
        .argument("maxAge", TypeRef::option(TypeRef::named("Int")))
        .argument(
            "scope",
            TypeRef::option(TypeRef::named(CACHE_CONTROL_SCOPE_ENUM)),
        )
        .on(DirectiveLocation::FieldDefinition)
        .on(DirectiveLocation::Object)
        .on(DirectiveLocation::Interface)
}

/// Adds the `@cacheControl` directive and the `CacheControlScope` enum to a
/// schema under construction.
pub fn augment_schema(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .enumeration(EnumDef::new(CACHE_CONTROL_SCOPE_ENUM, ["PUBLIC", "PRIVATE"]))
        .directive(cache_control_directive())
}

/// Builds a `@cacheControl` directive use carrying `hint`.
pub fn directive(hint: CacheHint) -> Directive {
    let mut directive = Directive::new(CACHE_CONTROL_DIRECTIVE);
    if let Some(max_age) = hint.max_age {
        directive = directive.arg("maxAge", max_age);
    }
    if let Some(scope) = hint.scope {
        directive = directive.arg("scope", scope.as_str());
    }
    directive
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Leaf,
    Object,
    Interface,
    Union,
}

#[derive(Debug, Default)]
struct TypeEntry {
    kind: Option<Kind>,
    hint: Option<CacheHint>,
    fields: FxHashMap<String, CacheHint>,
}

/// The static hints declared in a schema.
#[derive(Debug, Default)]
pub struct HintDeclarations {
    types: FxHashMap<String, TypeEntry>,
}

impl HintDeclarations {
    /// Extracts the declarations of `schema`.
    ///
    /// Uses are checked against the schema's `@cacheControl` definition, or
    /// [`cache_control_directive`] when the schema declares none. Fails on
    /// malformed directive arguments and on uses outside the definition's
    /// locations.
    pub fn from_schema(schema: &Schema) -> CacheControlResult<Self> {
        let definition = schema
            .directive_definition(CACHE_CONTROL_DIRECTIVE)
            .cloned()
            .unwrap_or_else(cache_control_directive);
        let mut types = FxHashMap::default();

        for (name, type_def) in schema.types() {
            let (kind, directive_location) = match type_def {
                TypeDef::Scalar(_) => (Kind::Leaf, DirectiveLocation::Scalar),
                TypeDef::Enum(_) => (Kind::Leaf, DirectiveLocation::Enum),
                TypeDef::Object(_) => (Kind::Object, DirectiveLocation::Object),
                TypeDef::Interface(_) => (Kind::Interface, DirectiveLocation::Interface),
                TypeDef::Union(_) => (Kind::Union, DirectiveLocation::Union),
            };

            let location = format!("type \"{name}\"");
            let hint = find_hint(
                &definition,
                directive_location,
                type_def.directives(),
                &location,
            )?;

            let mut fields = FxHashMap::default();
            for (field_name, field) in type_def.fields().into_iter().flatten() {
                let location = format!("field \"{name}.{field_name}\"");
                if let Some(hint) = find_hint(
                    &definition,
                    DirectiveLocation::FieldDefinition,
                    &field.directives,
                    &location,
                )? {
                    fields.insert(field_name.clone(), hint);
                }
            }

            types.insert(
                name.clone(),
                TypeEntry {
                    kind: Some(kind),
                    hint,
                    fields,
                },
            );
        }

        let declarations = Self { types };
        debug!(
            types = declarations.types.values().filter(|t| t.hint.is_some()).count(),
            fields = declarations.types.values().map(|t| t.fields.len()).sum::<usize>(),
            "extracted cache control declarations"
        );
        Ok(declarations)
    }

    /// Returns the hint declared on a field definition.
    pub fn field_hint(&self, parent_type: &str, field_name: &str) -> Option<CacheHint> {
        self.types.get(parent_type)?.fields.get(field_name).copied()
    }

    /// Returns the hint declared on an object or interface type.
    pub fn type_hint(&self, type_name: &str) -> Option<CacheHint> {
        self.types.get(type_name)?.hint
    }

    /// Describes the field about to resolve for hint resolution.
    pub fn site(&self, info: &ResolverInfo) -> FieldSite {
        let return_type = info.return_type.named_type();
        let return_kind = match self.types.get(return_type).and_then(|t| t.kind) {
            Some(Kind::Object | Kind::Interface) => ReturnKind::Composite {
                type_hint: self.type_hint(return_type),
            },
            Some(Kind::Union) => ReturnKind::Composite { type_hint: None },
            Some(Kind::Leaf) | None => ReturnKind::Leaf,
        };

        FieldSite {
            field_hint: self.field_hint(&info.parent_type, &info.field_name),
            return_kind,
            is_root: info.is_root_field(),
        }
    }
}

fn find_hint(
    definition: &DirectiveDefinition,
    directive_location: DirectiveLocation,
    directives: &[Directive],
    location: &str,
) -> CacheControlResult<Option<CacheHint>> {
    let mut uses = directives
        .iter()
        .filter(|d| d.name == CACHE_CONTROL_DIRECTIVE);
    let Some(first) = uses.next() else {
        return Ok(None);
    };
    if !definition.allows(directive_location) {
        return Err(CacheControlError::MisplacedDirective {
            location: location.to_string(),
        });
    }
    if uses.next().is_some() && !definition.repeatable {
        return Err(CacheControlError::RepeatedDirective {
            location: location.to_string(),
        });
    }
    CacheHint::from_arguments(&first.arguments, location).map(Some)
}
