//! Immutable resolved-configuration snapshot.
//!
//! Created once per resolution and never mutated afterwards; changing the
//! configuration means discarding the cache and resolving again. The mapping
//! view exposes every plain and derived field's final value together with the
//! layer that supplied it. Opaque fields are reachable only by named access
//! and are absent from the mapping view by construction.

use crate::layers::OverrideLayer;
use crate::schema::OpaqueFn;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// String form of a field value. Strings pass through; numbers and booleans
/// are stringified the way they arrived from a text layer.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fully-resolved configuration for one environment.
pub struct ResolvedConfig {
    env_code: String,
    values: BTreeMap<String, Value>,
    provenance: BTreeMap<String, OverrideLayer>,
    opaque: BTreeMap<&'static str, OpaqueFn>,
    resolved_at: DateTime<Utc>,
}

impl ResolvedConfig {
    pub(crate) fn new(
        env_code: String,
        values: BTreeMap<String, Value>,
        provenance: BTreeMap<String, OverrideLayer>,
        opaque: BTreeMap<&'static str, OpaqueFn>,
    ) -> Self {
        Self {
            env_code,
            values,
            provenance,
            opaque,
            resolved_at: Utc::now(),
        }
    }

    /// Environment code the snapshot was resolved for.
    pub fn env_code(&self) -> &str {
        &self.env_code
    }

    /// When this snapshot was resolved.
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    /// Final value of a plain or derived field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String form of a field's final value. `None` for absent or null.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value_text(value)),
        }
    }

    /// Integer form of a field's final value, parsing text-layer strings.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean form of a field's final value, parsing text-layer strings.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// The override layer that supplied a field's final value.
    pub fn source(&self, name: &str) -> Option<OverrideLayer> {
        self.provenance.get(name).copied()
    }

    /// Evaluate an opaque computed field by name. Runs the accessor at read
    /// time against this snapshot.
    pub fn opaque(&self, name: &str) -> Option<Value> {
        self.opaque.get(name).map(|accessor| accessor(self))
    }

    /// Whether the class declared an opaque field with this name.
    pub fn has_opaque(&self, name: &str) -> bool {
        self.opaque.contains_key(name)
    }

    /// Names of the opaque fields, excluded from the mapping view.
    pub fn opaque_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.opaque.keys().copied()
    }

    /// Mapping view over every plain and derived field's final value.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of plain and derived fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Audit snapshot: every tracked field with its value and source layer.
    pub fn to_snapshot(&self) -> Value {
        let mut fields = Map::new();
        for (name, value) in &self.values {
            let source = self
                .provenance
                .get(name)
                .map(|layer| layer.to_string())
                .unwrap_or_default();
            fields.insert(
                name.clone(),
                json!({ "value": value, "source": source }),
            );
        }
        json!({
            "environment": self.env_code,
            "resolved_at": self.resolved_at.to_rfc3339(),
            "fields": Value::Object(fields),
        })
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("env_code", &self.env_code)
            .field("values", &self.values)
            .field("opaque", &self.opaque.keys().collect::<Vec<_>>())
            .field("resolved_at", &self.resolved_at)
            .finish_non_exhaustive()
    }
}
