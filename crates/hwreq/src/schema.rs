//! Recognized-field schema
//!
//! The requirement format is extensible; the set of fields the engine knows
//! about is data, not code. [`Schema::builtin`] ships the `/hardware` field
//! list, and deployments can load an extended schema from configuration
//! (it deserializes from a plain mapping) without touching the matching
//! engine.
//!
//! The schema drives two parse-time checks: strict-mode rejection of
//! unknown fields, and unit-category validation of operands
//! (`memory: 8 GHz` fails with a unit mismatch before any candidate is seen).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::path::FieldPath;
use crate::quantity::UnitCategory;

/// What kind of value a recognized field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Storage size with unit suffix (`memory`, `disk.size`).
    Size,
    /// Frequency with unit suffix (`cpu.frequency`).
    Frequency,
    /// Dimensionless number (`cpu.cores`, `cpu.model`).
    Count,
    /// Exact or regex-matched text (`arch`, `hostname`, `cpu.model-name`).
    Text,
    /// Boolean fact (`virtualization.is-virtualized`).
    Boolean,
}

impl FieldKind {
    /// The unit category numeric fields compare in, if any.
    pub fn category(self) -> Option<UnitCategory> {
        match self {
            Self::Size => Some(UnitCategory::Size),
            Self::Frequency => Some(UnitCategory::Frequency),
            Self::Count => Some(UnitCategory::Count),
            Self::Text | Self::Boolean => None,
        }
    }

    /// Human-readable name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Frequency => "frequency",
            Self::Count => "count",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }
}

/// The recognized-field list: canonical dotted paths (without list indices)
/// mapped to their kinds, plus the set of list-typed container fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: HashMap<String, FieldKind>,
    #[serde(default)]
    lists: HashSet<String>,
}

impl Schema {
    /// An empty schema; every field is unknown.
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
            lists: HashSet::new(),
        }
    }

    /// The builtin `/hardware` field list.
    pub fn builtin() -> Self {
        let mut schema = Self::empty();

        schema.add_field("arch", FieldKind::Text);
        schema.add_field("hostname", FieldKind::Text);
        schema.add_field("memory", FieldKind::Size);
        schema.add_field("boot.method", FieldKind::Text);

        schema.add_field("cpu.processors", FieldKind::Count);
        schema.add_field("cpu.cores", FieldKind::Count);
        schema.add_field("cpu.model", FieldKind::Count);
        schema.add_field("cpu.family", FieldKind::Count);
        schema.add_field("cpu.model-name", FieldKind::Text);
        schema.add_field("cpu.family-name", FieldKind::Text);
        schema.add_field("cpu.vendor-name", FieldKind::Text);
        schema.add_field("cpu.frequency", FieldKind::Frequency);

        schema.add_list("disk");
        schema.add_field("disk.size", FieldKind::Size);
        schema.add_field("disk.model-name", FieldKind::Text);
        schema.add_field("disk.driver", FieldKind::Text);

        schema.add_list("network");
        schema.add_field("network.type", FieldKind::Text);
        schema.add_field("network.vendor-name", FieldKind::Text);
        schema.add_field("network.device-name", FieldKind::Text);
        schema.add_field("network.driver", FieldKind::Text);

        schema.add_field("virtualization.is-virtualized", FieldKind::Boolean);
        schema.add_field("virtualization.is-supported", FieldKind::Boolean);
        schema.add_field("virtualization.hypervisor", FieldKind::Text);

        schema
    }

    /// Registers a recognized field.
    pub fn add_field(&mut self, path: impl Into<String>, kind: FieldKind) {
        self.fields.insert(path.into(), kind);
    }

    /// Registers a list-typed container field.
    pub fn add_list(&mut self, path: impl Into<String>) {
        self.lists.insert(path.into());
    }

    /// Looks up the kind of a recognized field.
    pub fn kind_of(&self, path: &FieldPath) -> Option<FieldKind> {
        self.fields.get(&path.to_string()).copied()
    }

    /// True when `path` names a list-typed container (`disk`, `network`).
    pub fn is_list(&self, path: &FieldPath) -> bool {
        self.lists.contains(&path.to_string())
    }

    /// Number of recognized fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are recognized.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_knows_the_hardware_fields() {
        let schema = Schema::builtin();
        assert_eq!(schema.kind_of(&"memory".into()), Some(FieldKind::Size));
        assert_eq!(schema.kind_of(&"cpu.cores".into()), Some(FieldKind::Count));
        assert_eq!(schema.kind_of(&"cpu.model-name".into()), Some(FieldKind::Text));
        assert_eq!(
            schema.kind_of(&"virtualization.is-virtualized".into()),
            Some(FieldKind::Boolean)
        );
        assert_eq!(schema.kind_of(&"gpu.model".into()), None);
    }

    #[test]
    fn list_containers() {
        let schema = Schema::builtin();
        assert!(schema.is_list(&"disk".into()));
        assert!(schema.is_list(&"network".into()));
        assert!(!schema.is_list(&"cpu".into()));
        assert_eq!(schema.kind_of(&"disk.size".into()), Some(FieldKind::Size));
    }

    #[test]
    fn reloadable_from_configuration() {
        let json = serde_json::json!({
            "fields": {
                "memory": "size",
                "gpu.model-name": "text",
                "gpu.cores": "count"
            },
            "lists": ["gpu"]
        });
        let schema: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(schema.kind_of(&"gpu.model-name".into()), Some(FieldKind::Text));
        assert!(schema.is_list(&"gpu".into()));
        // Unlisted builtin fields stay unknown in a replacement schema.
        assert_eq!(schema.kind_of(&"arch".into()), None);
    }

    #[test]
    fn kinds_expose_unit_categories() {
        assert_eq!(FieldKind::Size.category(), Some(UnitCategory::Size));
        assert_eq!(FieldKind::Boolean.category(), None);
    }
}
