//! Requirement specification parser
//!
//! Converts a JSON-equivalent nested mapping (the `/hardware` block of a
//! provisioning request) into an immutable [`Requirements`] tree by
//! recursive descent:
//!
//! 1. `and` / `or` keys hold a list of sub-specifications and become groups
//!    with that combinator;
//! 2. nested mappings extend the field-path prefix (`cpu:` → `cpu.model`);
//! 3. lists under list-typed fields (`disk`, `network`) become independent
//!    per-element constraints with existential semantics;
//! 4. everything else is a scalar leaf: optional operator prefix, literal,
//!    optional unit.
//!
//! Only the two combinator keywords get special treatment; all other keys
//! are uniformly path segments. Sibling keys at one mapping level are
//! implicitly `and`-ed, explicit `and`/`or` blocks included.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::constraint::{
    Combinator, Constraint, Group, Leaf, Operand, Operator, Pattern, Requirements,
};
use crate::error::{RequirementError, RequirementResult};
use crate::path::FieldPath;
use crate::quantity::{Quantity, UnitCategory};
use crate::schema::{FieldKind, Schema};

// ============================================================================
// Options
// ============================================================================

/// Parser behavior toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Reject fields outside the schema with
    /// [`RequirementError::UnknownField`] instead of producing
    /// always-unsatisfied [`Constraint::Unsupported`] leaves.
    pub strict: bool,
}

// ============================================================================
// Parser
// ============================================================================

/// Parses requirement specifications against a recognized-field schema.
#[derive(Debug, Clone, Default)]
pub struct RequirementParser {
    schema: Schema,
    options: ParseOptions,
}

impl RequirementParser {
    /// A parser with the builtin schema and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the recognized-field schema (e.g. one loaded from
    /// configuration).
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Enables strict unknown-field rejection.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.options.strict = true;
        self
    }

    /// Parses a specification mapping into a requirement tree.
    ///
    /// The root of the result is always a group: an implicit `and` over the
    /// mapping's top-level keys.
    pub fn parse(&self, spec: &Value) -> RequirementResult<Requirements> {
        trace!(strict = self.options.strict, "parsing requirement specification");
        let map = spec.as_object().ok_or_else(|| {
            RequirementError::malformed_value(
                FieldPath::root().to_string(),
                "requirement specification must be a mapping",
            )
        })?;

        let children = self.parse_level(map, &FieldPath::root())?;
        let requirements = Requirements::new(Group::all(children));
        debug!(
            leaves = requirements.leaf_count(),
            "parsed requirement specification"
        );
        Ok(requirements)
    }

    /// One mapping level: every key becomes a child of the level's implicit
    /// conjunction.
    fn parse_level(
        &self,
        map: &Map<String, Value>,
        prefix: &FieldPath,
    ) -> RequirementResult<Vec<Constraint>> {
        let mut children = Vec::with_capacity(map.len());
        for (key, value) in map {
            if let Some(combinator) = combinator_keyword(key) {
                children.push(self.parse_combinator(combinator, value, prefix)?);
            } else {
                self.parse_field(&prefix.child(key.clone()), value, &mut children)?;
            }
        }
        Ok(children)
    }

    /// An explicit `and:` / `or:` block: a list of sub-specifications.
    fn parse_combinator(
        &self,
        combinator: Combinator,
        value: &Value,
        prefix: &FieldPath,
    ) -> RequirementResult<Constraint> {
        let items = value.as_array().ok_or_else(|| {
            RequirementError::malformed_value(
                prefix.child(combinator.keyword()).to_string(),
                format!("'{}' expects a list of mappings", combinator.keyword()),
            )
        })?;

        let mut members = Vec::with_capacity(items.len());
        for item in items {
            let map = item.as_object().ok_or_else(|| {
                RequirementError::malformed_value(
                    prefix.child(combinator.keyword()).to_string(),
                    format!("'{}' entries must be mappings", combinator.keyword()),
                )
            })?;
            members.push(Constraint::Group(Group::all(
                self.parse_level(map, prefix)?,
            )));
        }
        Ok(Constraint::Group(Group::new(combinator, members)))
    }

    /// One non-combinator key: nested mapping, list field, or scalar leaf.
    fn parse_field(
        &self,
        path: &FieldPath,
        value: &Value,
        out: &mut Vec<Constraint>,
    ) -> RequirementResult<()> {
        match value {
            Value::Object(inner) => {
                out.push(Constraint::Group(Group::all(
                    self.parse_level(inner, path)?,
                )));
            }
            Value::Array(items) => {
                out.extend(self.parse_list_field(path, items)?);
            }
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                out.push(self.parse_leaf(path, value)?);
            }
            Value::Null => {
                return Err(RequirementError::malformed_value(
                    path.to_string(),
                    "null is not a valid constraint value",
                ));
            }
        }
        Ok(())
    }

    /// A list under a list-typed field: each element is an independent
    /// constraint matched existentially against the candidate's list.
    fn parse_list_field(
        &self,
        path: &FieldPath,
        items: &[Value],
    ) -> RequirementResult<Vec<Constraint>> {
        if !self.schema.is_list(path) {
            if self.schema.kind_of(path).is_some() {
                return Err(RequirementError::malformed_value(
                    path.to_string(),
                    "scalar field given a list value",
                ));
            }
            if self.options.strict {
                return Err(RequirementError::unknown_field(path.to_string()));
            }
            return Ok(vec![Constraint::Unsupported(path.clone())]);
        }

        let mut constraints = Vec::with_capacity(items.len());
        for item in items {
            let map = item.as_object().ok_or_else(|| {
                RequirementError::malformed_value(
                    path.to_string(),
                    "list entries must be mappings",
                )
            })?;
            constraints.push(Constraint::Group(Group::all(
                self.parse_level(map, path)?,
            )));
        }
        Ok(constraints)
    }

    /// A scalar leaf: schema lookup, operator split, operand parse.
    fn parse_leaf(&self, path: &FieldPath, value: &Value) -> RequirementResult<Constraint> {
        let Some(kind) = self.schema.kind_of(path) else {
            if self.options.strict {
                return Err(RequirementError::unknown_field(path.to_string()));
            }
            return Ok(Constraint::Unsupported(path.clone()));
        };

        let leaf = match kind {
            FieldKind::Boolean => self.parse_boolean_leaf(path, value)?,
            FieldKind::Text => self.parse_text_leaf(path, value)?,
            FieldKind::Size | FieldKind::Frequency | FieldKind::Count => {
                let category = kind
                    .category()
                    .unwrap_or(UnitCategory::Count);
                self.parse_quantity_leaf(path, value, kind, category)?
            }
        };
        Ok(Constraint::Leaf(leaf))
    }

    fn parse_boolean_leaf(&self, path: &FieldPath, value: &Value) -> RequirementResult<Leaf> {
        match value {
            Value::Bool(b) => Ok(Leaf::new(path.clone(), Operator::Eq, Operand::Bool(*b))),
            Value::String(token) => {
                let (operator, rest) = Operator::split_prefix(token);
                let operator = operator.unwrap_or(Operator::Eq);
                if !matches!(operator, Operator::Eq | Operator::Ne) {
                    return Err(RequirementError::malformed_value(
                        path.to_string(),
                        format!("operator '{operator}' is not valid for a boolean field"),
                    ));
                }
                let flag = match rest.trim() {
                    t if t.eq_ignore_ascii_case("true") => true,
                    t if t.eq_ignore_ascii_case("false") => false,
                    other => {
                        return Err(RequirementError::malformed_value(
                            path.to_string(),
                            format!("expected true/false, found '{other}'"),
                        ));
                    }
                };
                Ok(Leaf::new(path.clone(), operator, Operand::Bool(flag)))
            }
            other => Err(RequirementError::malformed_value(
                path.to_string(),
                format!("expected a boolean, found {}", value_type(other)),
            )),
        }
    }

    fn parse_text_leaf(&self, path: &FieldPath, value: &Value) -> RequirementResult<Leaf> {
        match value {
            Value::String(token) => {
                let (operator, rest) = Operator::split_prefix(token);
                let operator = operator.unwrap_or(Operator::Eq);
                let rest = rest.trim();
                if rest.is_empty() {
                    return Err(RequirementError::malformed_value(
                        path.to_string(),
                        "missing value after operator",
                    ));
                }
                if operator.is_pattern() {
                    let pattern = Pattern::compile(rest).map_err(|err| {
                        RequirementError::invalid_pattern(
                            path.to_string(),
                            rest,
                            err.to_string(),
                        )
                    })?;
                    return Ok(Leaf::new(path.clone(), operator, Operand::Pattern(pattern)));
                }
                if operator.is_ordering() {
                    return Err(RequirementError::malformed_value(
                        path.to_string(),
                        format!("ordering operator '{operator}' is not valid for a text field"),
                    ));
                }
                Ok(Leaf::new(
                    path.clone(),
                    operator,
                    Operand::Text(rest.to_string()),
                ))
            }
            // `boot.method: 1`-style numeric spellings compare textually.
            Value::Number(n) => Ok(Leaf::new(
                path.clone(),
                Operator::Eq,
                Operand::Text(n.to_string()),
            )),
            other => Err(RequirementError::malformed_value(
                path.to_string(),
                format!("expected text, found {}", value_type(other)),
            )),
        }
    }

    fn parse_quantity_leaf(
        &self,
        path: &FieldPath,
        value: &Value,
        kind: FieldKind,
        category: UnitCategory,
    ) -> RequirementResult<Leaf> {
        // Declared sizes and frequencies are floors when no operator is
        // given: `memory: 8 GB` accepts any machine with at least 8 GB.
        // Counts stay exact (`cpu.model: 67` means that model).
        let default_operator = match category {
            UnitCategory::Size | UnitCategory::Frequency => Operator::Ge,
            UnitCategory::Count => Operator::Eq,
        };

        match value {
            // A bare number is already in base units (bytes, hertz, count).
            Value::Number(n) => {
                let magnitude = n.as_f64().ok_or_else(|| {
                    RequirementError::malformed_value(
                        path.to_string(),
                        format!("numeric literal '{n}' is out of range"),
                    )
                })?;
                Ok(Leaf::new(
                    path.clone(),
                    default_operator,
                    Operand::Quantity(Quantity::count(magnitude).assume_category(category)),
                ))
            }
            Value::String(token) => {
                let (operator, rest) = Operator::split_prefix(token);
                let operator = operator.unwrap_or(default_operator);
                if operator.is_pattern() {
                    return Err(RequirementError::malformed_value(
                        path.to_string(),
                        format!("regex operator '{operator}' is not valid for a {} field", kind.name()),
                    ));
                }
                let quantity: Quantity = rest.parse().map_err(
                    |err: crate::quantity::ParseQuantityError| {
                        RequirementError::malformed_value(path.to_string(), err.to_string())
                    },
                )?;
                let quantity = quantity.assume_category(category);
                if quantity.category() != category {
                    return Err(RequirementError::unit_mismatch(
                        path.to_string(),
                        category.name(),
                        quantity.category().name(),
                    ));
                }
                Ok(Leaf::new(path.clone(), operator, Operand::Quantity(quantity)))
            }
            other => Err(RequirementError::malformed_value(
                path.to_string(),
                format!("expected a {} value, found {}", kind.name(), value_type(other)),
            )),
        }
    }
}

/// Recognized combinator keywords; every other key is a path segment.
fn combinator_keyword(key: &str) -> Option<Combinator> {
    match key {
        "and" => Some(Combinator::And),
        "or" => Some(Combinator::Or),
        _ => None,
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Parses a specification with the builtin schema and default options.
pub fn parse_requirements(spec: &Value) -> RequirementResult<Requirements> {
    RequirementParser::new().parse(spec)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn flat_keys_become_an_implicit_and() {
        let req = parse_requirements(&json!({
            "arch": "x86_64",
            "memory": "8 GB",
        }))
        .unwrap();
        assert_eq!(req.root().combinator(), Combinator::And);
        assert_eq!(req.leaf_count(), 2);
    }

    #[test]
    fn nested_mapping_prefixes_the_path() {
        let req = parse_requirements(&json!({"cpu": {"cores": 8, "family": 15}})).unwrap();
        let Constraint::Group(cpu) = &req.root().children()[0] else {
            panic!("expected cpu group");
        };
        let paths: Vec<String> = cpu
            .children()
            .iter()
            .map(|c| match c {
                Constraint::Leaf(leaf) => leaf.path().to_string(),
                other => panic!("expected leaf, got {other:?}"),
            })
            .collect();
        assert_eq!(paths, ["cpu.cores", "cpu.family"]);
    }

    #[test]
    fn explicit_combinators_nest() {
        let req = parse_requirements(&json!({
            "and": [
                {"cpu": {"family": 15}},
                {"or": [{"cpu": {"model": 65}}, {"cpu": {"model": 67}}]},
            ]
        }))
        .unwrap();
        let Constraint::Group(and) = &req.root().children()[0] else {
            panic!("expected and group");
        };
        assert_eq!(and.combinator(), Combinator::And);
        assert_eq!(and.children().len(), 2);
    }

    #[test]
    fn empty_combinator_lists_parse() {
        let req = parse_requirements(&json!({"or": []})).unwrap();
        let Constraint::Group(or) = &req.root().children()[0] else {
            panic!("expected or group");
        };
        assert_eq!(or.combinator(), Combinator::Or);
        assert!(or.is_empty());
    }

    #[test]
    fn combinator_value_must_be_a_list() {
        let err = parse_requirements(&json!({"and": {"cpu": {"family": 15}}})).unwrap_err();
        assert_eq!(err.code(), "HW:VALUE");
        assert_eq!(err.path(), "and");
    }

    #[test]
    fn disk_list_becomes_independent_constraints() {
        let req = parse_requirements(&json!({
            "disk": [{"size": ">= 20 GB"}, {"size": ">= 100 GB"}]
        }))
        .unwrap();
        // Two independent existential constraints, siblings under the root.
        assert_eq!(req.root().children().len(), 2);
    }

    #[test]
    fn operator_and_unit_parse_into_the_leaf() {
        let req = parse_requirements(&json!({"memory": ">= 8 GB"})).unwrap();
        let Constraint::Leaf(leaf) = &req.root().children()[0] else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.operator(), Operator::Ge);
        assert_eq!(
            leaf.operand(),
            &Operand::Quantity(Quantity::bytes(8e9))
        );
    }

    #[test]
    fn bare_values_default_per_category() {
        let req = parse_requirements(&json!({"memory": "8 GB", "cpu": {"cores": 4}})).unwrap();
        let mut operators = Vec::new();
        collect_operators(&Constraint::Group(req.root().clone()), &mut operators);
        // Sizes floor, counts stay exact.
        assert!(operators.contains(&("memory".to_string(), Operator::Ge)));
        assert!(operators.contains(&("cpu.cores".to_string(), Operator::Eq)));
    }

    fn collect_operators(constraint: &Constraint, out: &mut Vec<(String, Operator)>) {
        match constraint {
            Constraint::Leaf(leaf) => out.push((leaf.path().to_string(), leaf.operator())),
            Constraint::Group(group) => {
                for child in group.children() {
                    collect_operators(child, out);
                }
            }
            Constraint::Unsupported(_) => {}
        }
    }

    #[test]
    fn regex_operand_compiles_at_parse_time() {
        let req = parse_requirements(&json!({"cpu": {"model-name": "=~ .*AMD.*"}})).unwrap();
        assert_eq!(req.leaf_count(), 1);

        let err =
            parse_requirements(&json!({"cpu": {"model-name": "~ ???"}})).unwrap_err();
        assert_eq!(err.code(), "HW:PATTERN");
        assert_eq!(err.path(), "cpu.model-name");
    }

    #[test]
    fn unit_mismatch_is_caught_at_parse_time() {
        let err = parse_requirements(&json!({"memory": "8 GHz"})).unwrap_err();
        assert_eq!(err.code(), "HW:UNIT");
        assert_eq!(err.path(), "memory");
    }

    #[test]
    fn unrecognized_unit_is_malformed() {
        let err = parse_requirements(&json!({"memory": "8 furlongs"})).unwrap_err();
        assert_eq!(err.code(), "HW:VALUE");
    }

    #[test]
    fn unknown_field_defaults_to_deny() {
        let req = parse_requirements(&json!({"gpu": {"model": 5}})).unwrap();
        let Constraint::Group(gpu) = &req.root().children()[0] else {
            panic!("expected group");
        };
        assert_eq!(
            gpu.children(),
            &[Constraint::Unsupported("gpu.model".into())][..]
        );
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let err = RequirementParser::new()
            .strict()
            .parse(&json!({"gpu": {"model": 5}}))
            .unwrap_err();
        assert_eq!(err, RequirementError::unknown_field("gpu.model"));
    }

    #[test]
    fn boolean_fields_take_bools_and_tokens() {
        let req = parse_requirements(&json!({
            "virtualization": {"is-virtualized": false, "is-supported": "!= true"}
        }))
        .unwrap();
        assert_eq!(req.leaf_count(), 2);

        let err = parse_requirements(
            &json!({"virtualization": {"is-virtualized": ">= true"}}),
        )
        .unwrap_err();
        assert_eq!(err.code(), "HW:VALUE");
    }

    #[test]
    fn ordering_on_text_is_rejected() {
        let err = parse_requirements(&json!({"hostname": ">= foo"})).unwrap_err();
        assert_eq!(err.code(), "HW:VALUE");
        assert_eq!(err.path(), "hostname");
    }

    #[test]
    fn root_must_be_a_mapping() {
        let err = parse_requirements(&json!(["memory", "8 GB"])).unwrap_err();
        assert_eq!(err.code(), "HW:VALUE");
    }

    #[test]
    fn null_values_are_rejected() {
        let err = parse_requirements(&json!({"memory": null})).unwrap_err();
        assert_eq!(err.path(), "memory");
    }
}
