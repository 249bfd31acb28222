//! Derived-field resolution and the full resolution pipeline.
//!
//! Derived fields carry an unset default and a resolver composing a value
//! from other fields. The engine, not the resolver, enforces the override
//! policy: a present, non-placeholder incoming value is honored verbatim, so
//! any layer outranks the computed default. The resolver only runs when the
//! field is actually unset, and it reads other fields' final, post-override
//! values (late binding), never their static defaults.

use crate::classify::{ClassifiedField, classify};
use crate::error::ConfigError;
use crate::layers::{LayeredSources, OverrideLayer, RawValue, resolve_raw};
use crate::resolved::ResolvedConfig;
use crate::schema::{ConfigClass, FieldKind};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Placeholder meaning "a concrete environment must override this value".
pub const ENV_SPECIFIC_OVERRIDE: &str = "ENV_SPECIFIC_OVERRIDE";
/// Placeholder meaning "the user or deployment must override this value".
pub const USER_SPECIFIC_OVERRIDE: &str = "USER_SPECIFIC_OVERRIDE";

/// Whether a value is one of the designated "unset" placeholders.
pub fn is_unset_placeholder(value: &Value) -> bool {
    matches!(
        value,
        Value::String(s) if s == ENV_SPECIFIC_OVERRIDE || s == USER_SPECIFIC_OVERRIDE
    )
}

/// Read access to the fields resolved so far, handed to derived-field
/// resolvers.
///
/// Only typed fields that precede the derived field in declaration order are
/// visible. Reading anything else is a fatal authoring error, never a silent
/// default.
pub struct FieldView<'a> {
    values: &'a BTreeMap<String, Value>,
    untyped: &'a HashSet<&'static str>,
    declared: &'a HashSet<&'static str>,
}

impl FieldView<'_> {
    /// Final (post-override) value of a field resolved earlier.
    pub fn get(&self, name: &str) -> Result<&Value, ConfigError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value);
        }
        if self.untyped.contains(name) {
            return Err(ConfigError::invalid_declaration(
                name,
                "untyped fields are not visible to derived-field resolvers; \
                 declare the field as typed",
            ));
        }
        if self.declared.contains(name) {
            return Err(ConfigError::invalid_declaration(
                name,
                "field is declared after the derived field; resolvers may only \
                 read fields resolved earlier in declaration order",
            ));
        }
        Err(ConfigError::unknown_field(name))
    }

    /// String form of a field's value (numbers and booleans stringified).
    pub fn text(&self, name: &str) -> Result<String, ConfigError> {
        Ok(crate::resolved::value_text(self.get(name)?))
    }
}

/// Decide the final value for a derived field.
///
/// Honors a present, non-placeholder incoming value; otherwise invokes the
/// registered resolver against the fields resolved so far.
fn resolve_derived(
    field: &ClassifiedField,
    raw: &RawValue,
    view: &FieldView<'_>,
) -> Result<(Value, bool), ConfigError> {
    if !raw.value.is_null() && !is_unset_placeholder(&raw.value) {
        return Ok((raw.value.clone(), false));
    }
    let resolver = field.resolver.as_ref().ok_or_else(|| {
        ConfigError::invalid_declaration(field.name, "derived field has no registered resolver")
    })?;
    let computed = resolver(view)?;
    Ok((computed, true))
}

/// Resolve a configuration class against the override layer stack.
///
/// Plain fields are resolved first (typed and untyped), then derived fields
/// run in declaration order, each seeing the final values of every typed
/// field resolved before it. The result is an immutable snapshot; opaque
/// accessors are carried over by name only and never consult the layers.
pub fn resolve_class(
    class: &Arc<ConfigClass>,
    sources: &LayeredSources,
) -> Result<ResolvedConfig, ConfigError> {
    if class.is_abstract() {
        return Err(ConfigError::abstract_instantiation(class.env_code()));
    }

    let table = classify(class)?;
    let raw = resolve_raw(&table, class.root_code(), sources)?;

    let untyped: HashSet<&'static str> = table
        .fields()
        .iter()
        .filter(|f| f.kind == FieldKind::Plain && !f.typed)
        .map(|f| f.name)
        .collect();
    let declared: HashSet<&'static str> = table
        .fields()
        .iter()
        .filter(|f| f.kind != FieldKind::Opaque)
        .map(|f| f.name)
        .collect();

    let mut values: BTreeMap<String, Value> = BTreeMap::new();
    let mut untyped_values: BTreeMap<String, Value> = BTreeMap::new();
    let mut provenance: BTreeMap<String, OverrideLayer> = BTreeMap::new();

    // Phase 1: plain fields. Untyped values are held aside so resolvers
    // cannot observe them.
    for field in table.fields() {
        if field.kind != FieldKind::Plain {
            continue;
        }
        if let Some(value) = raw.get(field.name) {
            if field.typed {
                values.insert(field.name.to_string(), value.value.clone());
            } else {
                untyped_values.insert(field.name.to_string(), value.value.clone());
            }
            provenance.insert(field.name.to_string(), value.layer);
        }
    }

    // Phase 2: derived fields, in declaration order.
    for field in table.fields() {
        if field.kind != FieldKind::Derived {
            continue;
        }
        let Some(raw_value) = raw.get(field.name) else {
            continue;
        };
        let view = FieldView {
            values: &values,
            untyped: &untyped,
            declared: &declared,
        };
        let (value, computed) = resolve_derived(field, raw_value, &view)?;
        debug!(
            field = field.name,
            computed,
            layer = %raw_value.layer,
            "derived field resolved"
        );
        provenance.insert(field.name.to_string(), raw_value.layer);
        values.insert(field.name.to_string(), value);
    }

    values.append(&mut untyped_values);

    for (name, value) in &values {
        if is_unset_placeholder(value) {
            warn!(field = %name, value = %crate::resolved::value_text(value),
                "resolved value is still a placeholder; expected an override");
        }
    }

    let opaque: BTreeMap<&'static str, crate::schema::OpaqueFn> = table
        .fields()
        .iter()
        .filter(|f| f.kind == FieldKind::Opaque)
        .filter_map(|f| f.accessor.clone().map(|a| (f.name, a)))
        .collect();

    Ok(ResolvedConfig::new(
        class.env_code().to_string(),
        values,
        provenance,
        opaque,
    ))
}
