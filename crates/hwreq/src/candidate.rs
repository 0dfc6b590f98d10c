//! Candidate environment accessor
//!
//! A [`Candidate`] is the read-only description of one real or simulated
//! machine, supplied by the provisioner at evaluation time. The matcher
//! never mutates it; gathering the facts (inventory, introspection, cloud
//! metadata) is the caller's job and happens before evaluation.

use serde_json::Value;

use crate::path::FieldPath;

/// A read-only structured description of one machine's properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    facts: Value,
}

impl Candidate {
    /// Wraps a fact tree. Typically a JSON object:
    ///
    /// ```
    /// use hwreq::Candidate;
    /// use serde_json::json;
    ///
    /// let candidate = Candidate::new(json!({
    ///     "arch": "x86_64",
    ///     "memory": 16_000_000_000u64,
    ///     "disk": [{"size": 500_000_000_000u64}],
    /// }));
    /// assert!(candidate.get(&"arch".into()).is_some());
    /// ```
    pub fn new(facts: Value) -> Self {
        Self { facts }
    }

    /// The underlying fact tree.
    pub fn facts(&self) -> &Value {
        &self.facts
    }

    /// Strict path walk: objects only, `None` on the first missing or
    /// non-object step.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.facts;
        for segment in path.segments() {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Resolves a path, fanning out across intermediate arrays.
    ///
    /// `disk.size` against `{"disk": [{"size": a}, {"size": b}]}` yields
    /// `[a, b]`; the evaluator then applies its list semantics (any/all).
    /// An empty result means the field is absent.
    pub fn resolve(&self, path: &FieldPath) -> Vec<&Value> {
        let mut current = vec![&self.facts];
        for segment in path.segments() {
            let mut next = Vec::new();
            for value in current {
                match value {
                    Value::Object(map) => {
                        if let Some(child) = map.get(segment) {
                            next.push(child);
                        }
                    }
                    Value::Array(items) => {
                        for item in items {
                            if let Some(child) = item.as_object().and_then(|map| map.get(segment)) {
                                next.push(child);
                            }
                        }
                    }
                    _ => {}
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

impl From<Value> for Candidate {
    fn from(facts: Value) -> Self {
        Self::new(facts)
    }
}
