//! Declarative configuration schemas.
//!
//! An environment is described by a [`ConfigClass`]: a unique environment
//! code plus an ordered field table, optionally chained to a parent class
//! (linear inheritance, no multiple inheritance). Field kinds are a closed
//! enumeration; there is no runtime reflection anywhere in the engine.

use crate::error::ConfigError;
use crate::resolved::ResolvedConfig;
use crate::resolver::FieldView;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Kind of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Static or inherited default, fully tracked by the override layers.
    Plain,
    /// Computed accessor evaluated at read time. Invisible to every override,
    /// validation, and enumeration mechanism.
    Opaque,
    /// Unset default plus a resolver that composes a value from other fields'
    /// final values; still overridable by any layer.
    Derived,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Plain => write!(f, "plain"),
            FieldKind::Opaque => write!(f, "opaque"),
            FieldKind::Derived => write!(f, "derived"),
        }
    }
}

/// Computed accessor bound to the resolved snapshot.
///
/// Evaluated at read time, so it observes the post-override values of the
/// fields it composes. Never consulted by the override layers.
pub type OpaqueFn = Arc<dyn Fn(&ResolvedConfig) -> Value + Send + Sync>;

/// Resolver for a derived field. Receives read access to the fields resolved
/// so far and returns the computed value.
pub type ResolverFn = Arc<dyn Fn(&FieldView<'_>) -> Result<Value, ConfigError> + Send + Sync>;

/// A single field declaration within one configuration class.
#[derive(Clone)]
pub enum FieldDecl {
    Plain {
        name: &'static str,
        default: Value,
        /// Untyped plain fields participate in all override layers and in the
        /// final mapping view, but derived-field resolvers may not read them.
        typed: bool,
    },
    Derived {
        name: &'static str,
        /// Must be `Value::Null`; enforced at classification time.
        default: Value,
        resolver: ResolverFn,
    },
    Opaque {
        name: &'static str,
        accessor: OpaqueFn,
    },
}

impl FieldDecl {
    pub fn name(&self) -> &'static str {
        match self {
            FieldDecl::Plain { name, .. }
            | FieldDecl::Derived { name, .. }
            | FieldDecl::Opaque { name, .. } => *name,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldDecl::Plain { .. } => FieldKind::Plain,
            FieldDecl::Derived { .. } => FieldKind::Derived,
            FieldDecl::Opaque { .. } => FieldKind::Opaque,
        }
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDecl::Plain {
                name,
                default,
                typed,
            } => f
                .debug_struct("Plain")
                .field("name", name)
                .field("default", default)
                .field("typed", typed)
                .finish(),
            FieldDecl::Derived { name, default, .. } => f
                .debug_struct("Derived")
                .field("name", name)
                .field("default", default)
                .finish_non_exhaustive(),
            FieldDecl::Opaque { name, .. } => f
                .debug_struct("Opaque")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// A configuration class: environment code, ordered field table, and an
/// optional parent forming a linear inheritance chain.
pub struct ConfigClass {
    env_code: &'static str,
    abstract_base: bool,
    parent: Option<Arc<ConfigClass>>,
    fields: Vec<FieldDecl>,
}

impl ConfigClass {
    /// Start declaring a class for the given environment code.
    pub fn builder(env_code: &'static str) -> ConfigClassBuilder {
        ConfigClassBuilder {
            env_code,
            abstract_base: false,
            parent: None,
            fields: Vec::new(),
        }
    }

    pub fn env_code(&self) -> &'static str {
        self.env_code
    }

    /// Abstract base classes declare shared fields but fail to resolve
    /// directly.
    pub fn is_abstract(&self) -> bool {
        self.abstract_base
    }

    pub fn parent(&self) -> Option<&Arc<ConfigClass>> {
        self.parent.as_ref()
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Inheritance chain, root class first.
    pub(crate) fn chain(&self) -> Vec<&ConfigClass> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(cls) = current {
            chain.push(cls);
            current = cls.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Environment code of the root (least-derived) class in the chain.
    pub(crate) fn root_code(&self) -> &'static str {
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            current = parent;
        }
        current.env_code
    }
}

impl fmt::Debug for ConfigClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigClass")
            .field("env_code", &self.env_code)
            .field("abstract_base", &self.abstract_base)
            .field("parent", &self.parent.as_ref().map(|p| p.env_code()))
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for [`ConfigClass`].
pub struct ConfigClassBuilder {
    env_code: &'static str,
    abstract_base: bool,
    parent: Option<Arc<ConfigClass>>,
    fields: Vec<FieldDecl>,
}

impl ConfigClassBuilder {
    /// Chain this class below `parent`.
    pub fn parent(mut self, parent: Arc<ConfigClass>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Mark the class as an abstract base.
    pub fn abstract_base(mut self) -> Self {
        self.abstract_base = true;
        self
    }

    /// Declare a typed plain field with a static default.
    pub fn plain(mut self, name: &'static str, default: impl Into<Value>) -> Self {
        self.fields.push(FieldDecl::Plain {
            name,
            default: default.into(),
            typed: true,
        });
        self
    }

    /// Declare an untyped plain field. It participates in every override
    /// layer but is not visible to derived-field resolvers.
    pub fn untyped(mut self, name: &'static str, default: impl Into<Value>) -> Self {
        self.fields.push(FieldDecl::Plain {
            name,
            default: default.into(),
            typed: false,
        });
        self
    }

    /// Declare a derived field. The default is the unset sentinel; the
    /// resolver computes the value unless an override layer supplies one.
    pub fn derived(
        mut self,
        name: &'static str,
        resolver: impl Fn(&FieldView<'_>) -> Result<Value, ConfigError> + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDecl::Derived {
            name,
            default: Value::Null,
            resolver: Arc::new(resolver),
        });
        self
    }

    /// Declare an opaque computed field.
    pub fn computed(
        mut self,
        name: &'static str,
        accessor: impl Fn(&ResolvedConfig) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDecl::Opaque {
            name,
            accessor: Arc::new(accessor),
        });
        self
    }

    /// Push a raw declaration. Escape hatch for declarations the convenience
    /// methods refuse to author.
    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn build(self) -> Arc<ConfigClass> {
        Arc::new(ConfigClass {
            env_code: self.env_code,
            abstract_base: self.abstract_base,
            parent: self.parent,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_declares_fields_in_order() {
        let class = ConfigClass::builder("tst")
            .plain("ALPHA", "a")
            .untyped("BETA", 2)
            .derived("GAMMA", |_| Ok(json!("g")))
            .computed("DELTA", |_| json!("d"))
            .build();

        let names: Vec<_> = class.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["ALPHA", "BETA", "GAMMA", "DELTA"]);
        assert_eq!(class.fields()[0].kind(), FieldKind::Plain);
        assert_eq!(class.fields()[2].kind(), FieldKind::Derived);
        assert_eq!(class.fields()[3].kind(), FieldKind::Opaque);
        assert!(!class.is_abstract());
    }

    #[test]
    fn test_chain_is_root_first() {
        let base = ConfigClass::builder("base").abstract_base().build();
        let mid = ConfigClass::builder("mid").parent(base).build();
        let leaf = ConfigClass::builder("leaf").parent(mid).build();

        let codes: Vec<_> = leaf.chain().iter().map(|c| c.env_code()).collect();
        assert_eq!(codes, vec!["base", "mid", "leaf"]);
        assert_eq!(leaf.root_code(), "base");
    }

    #[test]
    fn test_untyped_flag() {
        let class = ConfigClass::builder("tst")
            .plain("TYPED", "x")
            .untyped("UNTYPED", "y")
            .build();
        match &class.fields()[0] {
            FieldDecl::Plain { typed, .. } => assert!(*typed),
            other => panic!("unexpected decl: {:?}", other),
        }
        match &class.fields()[1] {
            FieldDecl::Plain { typed, .. } => assert!(!*typed),
            other => panic!("unexpected decl: {:?}", other),
        }
    }
}
