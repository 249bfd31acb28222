//! Field classification across an inheritance chain.
//!
//! Folds a class chain into a single table holding, per field name, the
//! most-derived declaration, while preserving the ancestor-first declaration
//! order that derived-field resolution depends on. Authoring rules are
//! enforced here, so violations surface at first use of the class rather
//! than at read time.

use crate::error::ConfigError;
use crate::schema::{ConfigClass, FieldDecl, FieldKind, OpaqueFn, ResolverFn};
use serde_json::Value;
use std::collections::HashMap;

/// A field with its most-derived declaration and classification metadata.
#[derive(Clone)]
pub struct ClassifiedField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Most-derived static default. `Null` for opaque fields and (by the
    /// authoring precondition) for derived fields.
    pub default: Value,
    /// Whether derived-field resolvers may read this field.
    pub typed: bool,
    pub resolver: Option<ResolverFn>,
    pub accessor: Option<OpaqueFn>,
    /// Environment code of the class providing the winning declaration.
    pub declared_in: &'static str,
}

impl ClassifiedField {
    fn from_decl(decl: &FieldDecl, declared_in: &'static str) -> Self {
        match decl {
            FieldDecl::Plain {
                name,
                default,
                typed,
            } => Self {
                name: *name,
                kind: FieldKind::Plain,
                default: default.clone(),
                typed: *typed,
                resolver: None,
                accessor: None,
                declared_in,
            },
            FieldDecl::Derived {
                name,
                default,
                resolver,
            } => Self {
                name: *name,
                kind: FieldKind::Derived,
                default: default.clone(),
                typed: true,
                resolver: Some(resolver.clone()),
                accessor: None,
                declared_in,
            },
            FieldDecl::Opaque { name, accessor } => Self {
                name: *name,
                kind: FieldKind::Opaque,
                default: Value::Null,
                typed: false,
                resolver: None,
                accessor: Some(accessor.clone()),
                declared_in,
            },
        }
    }
}

impl std::fmt::Debug for ClassifiedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifiedField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("typed", &self.typed)
            .field("declared_in", &self.declared_in)
            .finish_non_exhaustive()
    }
}

/// Classified fields of one class chain, in ancestor-first declaration order.
#[derive(Debug, Clone)]
pub struct FieldTable {
    fields: Vec<ClassifiedField>,
}

impl FieldTable {
    pub fn fields(&self) -> &[ClassifiedField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&ClassifiedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Classify every field of `class`, including all ancestors.
///
/// The most-derived declaration of each name wins outright for kind and
/// payload; the field keeps the chain position of its first (least-derived)
/// declaration. A plain or derived redeclaration below an ancestor's opaque
/// declaration is rejected: the inherited accessor would shadow the plain
/// value, which would silently never take effect.
pub fn classify(class: &ConfigClass) -> Result<FieldTable, ConfigError> {
    let mut order: Vec<&'static str> = Vec::new();
    let mut by_name: HashMap<&'static str, ClassifiedField> = HashMap::new();

    for cls in class.chain() {
        for decl in cls.fields() {
            let name = decl.name();
            let incoming = ClassifiedField::from_decl(decl, cls.env_code());
            if let Some(previous) = by_name.get(name) {
                if previous.kind == FieldKind::Opaque && incoming.kind != FieldKind::Opaque {
                    return Err(ConfigError::shadowed(
                        name,
                        cls.env_code(),
                        previous.declared_in,
                        &incoming.kind.to_string(),
                    ));
                }
            } else {
                order.push(name);
            }
            by_name.insert(name, incoming);
        }
    }

    let fields: Vec<ClassifiedField> = order
        .into_iter()
        .filter_map(|name| by_name.remove(name))
        .collect();

    // Derived fields must declare an unset default; the resolver is the only
    // legitimate source of a computed value.
    for field in &fields {
        if field.kind == FieldKind::Derived && !field.default.is_null() {
            return Err(ConfigError::invalid_declaration(
                field.name,
                format!(
                    "derived field declared in '{}' must have an unset default; \
                     overrides and the resolver supply its value",
                    field.declared_in
                ),
            ));
        }
    }

    Ok(FieldTable { fields })
}
