//! Deterministic keys for generation calls.

use std::fmt;

use serde_json::Value;

/// Top-level parameter naming the owner of a generation, such as a conversation.
pub const SCOPE_PARAM: &str = "scope";

/// Cache key derived from an operation name and its parameters.
///
/// Object keys are written in sorted order at every depth, so two structurally
/// equal parameter records always produce the same key. A string
/// [`SCOPE_PARAM`] field is part of the key and is also kept aside so every
/// entry of one owner can be evicted together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationKey {
    key: String,
    scope: Option<String>,
}

impl GenerationKey {
    /// Build the key for `kind` called with `params`.
    #[must_use]
    pub fn new(kind: &str, params: &Value) -> Self {
        let mut key = String::with_capacity(kind.len() + 64);
        key.push_str(kind);
        key.push(':');
        write_canonical(params, &mut key);
        let scope = params
            .get(SCOPE_PARAM)
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { key, scope }
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Owner named by the parameters, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl fmt::Display for GenerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (name, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
