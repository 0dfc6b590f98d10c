//! Matcher/evaluator
//!
//! Evaluates an immutable [`Requirements`] tree against one [`Candidate`].
//! Pure and deterministic: no side effects, no I/O, no shared state — many
//! candidates may be evaluated against the same tree concurrently.
//!
//! Evaluation-time conditions are never errors. The absence policy is:
//! a constraint on a missing field is unsatisfied, except under the negative
//! operators `!=` / `!~`, where absence is satisfied — a property that does
//! not exist cannot be violated. Wrong-typed candidate values are coerced
//! where safe (numeric strings, unit strings like `"9 GB"`, `"true"`) and
//! otherwise follow the same polarity rule.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::candidate::Candidate;
use crate::constraint::{Combinator, Constraint, Leaf, Operand, Operator, Requirements};
use crate::path::FieldPath;
use crate::quantity::Quantity;

// ============================================================================
// Options
// ============================================================================

/// Aggregation semantics for list-typed candidate fields.
///
/// The source format leaves this open, so it is a policy flag rather than a
/// hard-coded rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListSemantics {
    /// Existential: satisfied if at least one element meets the constraint.
    #[default]
    Any,
    /// Universal: every element must meet the constraint.
    All,
}

/// Evaluator behavior toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// How leaves resolve against list-typed fields. Defaults to
    /// [`ListSemantics::Any`].
    pub list_semantics: ListSemantics,
}

// ============================================================================
// Report
// ============================================================================

/// Why a leaf constraint was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum FailReason {
    /// The field is absent from the candidate.
    Absent,
    /// The field is present but its value does not satisfy the constraint.
    Mismatch {
        /// Rendering of the candidate value(s) that were compared.
        actual: String,
    },
    /// The field is present but holds a value the operand cannot compare to.
    Incomparable {
        /// Rendering of the offending candidate value.
        actual: String,
    },
    /// The field is outside the recognized schema (default-deny).
    UnrecognizedField,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("field is absent"),
            Self::Mismatch { actual } => write!(f, "value {actual} does not satisfy"),
            Self::Incomparable { actual } => write!(f, "value {actual} is not comparable"),
            Self::UnrecognizedField => f.write_str("unrecognized field"),
        }
    }
}

/// One leaf constraint that a candidate failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedLeaf {
    /// Field path of the failing constraint.
    pub path: FieldPath,
    /// Rendering of the constraint, e.g. `>= 8000000000 B`.
    pub constraint: String,
    /// Why it failed.
    pub reason: FailReason,
}

impl fmt::Display for FailedLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.path, self.constraint, self.reason)
    }
}

/// Outcome of a diagnostic evaluation.
///
/// `unsatisfied` lists, in tree order, every failing leaf of the branches
/// that caused the overall failure. A failing empty `or` group contributes
/// no leaves (there is nothing to point at); `ok` is still `false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    ok: bool,
    unsatisfied: Vec<FailedLeaf>,
}

impl MatchReport {
    /// True when the candidate satisfies the requirements.
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// The failing leaves, in tree order.
    pub fn unsatisfied(&self) -> &[FailedLeaf] {
        &self.unsatisfied
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok {
            return f.write_str("satisfied");
        }
        writeln!(f, "unsatisfied ({} constraint(s)):", self.unsatisfied.len())?;
        for leaf in &self.unsatisfied {
            writeln!(f, "  - {leaf}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// Evaluates requirement trees against candidate environments.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    options: MatchOptions,
}

impl Matcher {
    /// A matcher with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A matcher with explicit options.
    pub fn with_options(options: MatchOptions) -> Self {
        Self { options }
    }

    /// Fast satisfied/unsatisfied check; short-circuits inside groups.
    pub fn matches(&self, requirements: &Requirements, candidate: &Candidate) -> bool {
        trace!(leaves = requirements.leaf_count(), "matching candidate");
        self.check_group_fast(
            requirements.root().combinator(),
            requirements.root().children(),
            candidate,
        )
    }

    /// Diagnostic evaluation: same verdict as [`Matcher::matches`], plus the
    /// failing leaves of every branch that caused the failure.
    pub fn evaluate(&self, requirements: &Requirements, candidate: &Candidate) -> MatchReport {
        trace!(leaves = requirements.leaf_count(), "evaluating candidate");
        let mut unsatisfied = Vec::new();
        let ok = self.diagnose_group(
            requirements.root().combinator(),
            requirements.root().children(),
            candidate,
            &mut unsatisfied,
        );
        MatchReport { ok, unsatisfied }
    }

    // ------------------------------------------------------------------
    // Short-circuiting pass
    // ------------------------------------------------------------------

    fn check_fast(&self, constraint: &Constraint, candidate: &Candidate) -> bool {
        match constraint {
            Constraint::Leaf(leaf) => self.leaf_verdict(leaf, candidate).satisfied,
            Constraint::Group(group) => {
                self.check_group_fast(group.combinator(), group.children(), candidate)
            }
            Constraint::Unsupported(_) => false,
        }
    }

    fn check_group_fast(
        &self,
        combinator: Combinator,
        children: &[Constraint],
        candidate: &Candidate,
    ) -> bool {
        match combinator {
            // Empty `and` is vacuously true.
            Combinator::And => children.iter().all(|c| self.check_fast(c, candidate)),
            // Empty `or` is vacuously false.
            Combinator::Or => children.iter().any(|c| self.check_fast(c, candidate)),
        }
    }

    // ------------------------------------------------------------------
    // Diagnostic pass
    // ------------------------------------------------------------------

    fn diagnose(
        &self,
        constraint: &Constraint,
        candidate: &Candidate,
        out: &mut Vec<FailedLeaf>,
    ) -> bool {
        match constraint {
            Constraint::Leaf(leaf) => {
                let verdict = self.leaf_verdict(leaf, candidate);
                if !verdict.satisfied {
                    out.push(FailedLeaf {
                        path: leaf.path().clone(),
                        constraint: format!("{} {}", leaf.operator(), leaf.operand()),
                        reason: verdict.reason.unwrap_or(FailReason::Absent),
                    });
                }
                verdict.satisfied
            }
            Constraint::Group(group) => {
                self.diagnose_group(group.combinator(), group.children(), candidate, out)
            }
            Constraint::Unsupported(path) => {
                out.push(FailedLeaf {
                    path: path.clone(),
                    constraint: "(unsupported)".to_string(),
                    reason: FailReason::UnrecognizedField,
                });
                false
            }
        }
    }

    fn diagnose_group(
        &self,
        combinator: Combinator,
        children: &[Constraint],
        candidate: &Candidate,
        out: &mut Vec<FailedLeaf>,
    ) -> bool {
        match combinator {
            Combinator::And => {
                // No short-circuit: collect every failing child.
                let mut ok = true;
                for child in children {
                    ok &= self.diagnose(child, candidate, out);
                }
                ok
            }
            Combinator::Or => {
                let mut scratch = Vec::new();
                let mut ok = false;
                for child in children {
                    ok |= self.diagnose(child, candidate, &mut scratch);
                }
                // A satisfied `or` hides its alternatives' failures.
                if !ok {
                    out.append(&mut scratch);
                }
                ok
            }
        }
    }

    // ------------------------------------------------------------------
    // Leaf evaluation
    // ------------------------------------------------------------------

    fn leaf_verdict(&self, leaf: &Leaf, candidate: &Candidate) -> Verdict {
        let values = candidate.resolve(leaf.path());
        if values.is_empty() {
            // Absence policy: only negative operators are satisfied.
            return if leaf.operator().is_negative() {
                Verdict::ok()
            } else {
                Verdict::fail(FailReason::Absent)
            };
        }

        let mut comparable = false;
        let mut satisfied_any = false;
        let mut satisfied_all = true;
        for &value in &values {
            match value_satisfies(leaf.operator(), leaf.operand(), value) {
                Some(true) => {
                    comparable = true;
                    satisfied_any = true;
                }
                Some(false) => {
                    comparable = true;
                    satisfied_all = false;
                }
                None => satisfied_all = false,
            }
        }

        if !comparable {
            // Nothing the operand could compare to: same polarity rule as
            // absence, reported with the offending value.
            return if leaf.operator().is_negative() {
                Verdict::ok()
            } else {
                Verdict::fail(FailReason::Incomparable {
                    actual: render_values(&values),
                })
            };
        }

        let satisfied = match self.options.list_semantics {
            ListSemantics::Any => satisfied_any,
            ListSemantics::All => satisfied_all,
        };
        if satisfied {
            Verdict::ok()
        } else {
            Verdict::fail(FailReason::Mismatch {
                actual: render_values(&values),
            })
        }
    }
}

struct Verdict {
    satisfied: bool,
    reason: Option<FailReason>,
}

impl Verdict {
    fn ok() -> Self {
        Self {
            satisfied: true,
            reason: None,
        }
    }

    fn fail(reason: FailReason) -> Self {
        Self {
            satisfied: false,
            reason: Some(reason),
        }
    }
}

/// Tests one candidate value against a leaf's operator and operand.
///
/// `None` means the value is not comparable to the operand (wrong type and
/// no safe coercion).
fn value_satisfies(operator: Operator, operand: &Operand, value: &Value) -> Option<bool> {
    match operand {
        Operand::Quantity(expected) => {
            let actual = value_as_quantity(value)?.assume_category(expected.category());
            let ordering = actual.partial_cmp(expected)?;
            Some(operator.accepts(ordering))
        }
        Operand::Text(expected) => {
            let actual = value_as_text(value)?;
            let equal = actual == *expected;
            Some(match operator {
                Operator::Ne => !equal,
                _ => equal,
            })
        }
        Operand::Bool(expected) => {
            let actual = value_as_bool(value)?;
            let equal = actual == *expected;
            Some(match operator {
                Operator::Ne => !equal,
                _ => equal,
            })
        }
        Operand::Pattern(pattern) => {
            let text = value_as_text(value)?;
            let matched = pattern.is_match(&text);
            Some(match operator {
                Operator::NotMatch => !matched,
                _ => matched,
            })
        }
    }
}

/// Safe numeric coercion: numbers directly, strings via the quantity
/// grammar (`"9 GB"`, `"2500"`).
fn value_as_quantity(value: &Value) -> Option<Quantity> {
    match value {
        Value::Number(n) => n.as_f64().map(Quantity::count),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn render_values(values: &[&Value]) -> String {
    if values.len() == 1 {
        values[0].to_string()
    } else {
        let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
        format!("[{}]", rendered.join(", "))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_requirements;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn req(spec: serde_json::Value) -> Requirements {
        parse_requirements(&spec).unwrap()
    }

    #[test]
    fn bare_memory_value_is_a_floor() {
        let r = req(json!({"memory": "8 GB"}));
        assert!(r.matches(&Candidate::new(json!({"memory": 8_000_000_000u64}))));
        assert!(r.matches(&Candidate::new(json!({"memory": "9 GB"}))));
        assert!(!r.matches(&Candidate::new(json!({"memory": "4 GB"}))));
    }

    #[test]
    fn bare_count_value_is_exact() {
        let r = req(json!({"cpu": {"model": 67}}));
        assert!(r.matches(&Candidate::new(json!({"cpu": {"model": 67}}))));
        assert!(!r.matches(&Candidate::new(json!({"cpu": {"model": 99}}))));
    }

    #[test]
    fn explicit_equality_on_memory_stays_exact() {
        let r = req(json!({"memory": "= 8 GB"}));
        assert!(r.matches(&Candidate::new(json!({"memory": "8 GB"}))));
        assert!(!r.matches(&Candidate::new(json!({"memory": "9 GB"}))));
    }

    #[test]
    fn candidate_unit_strings_coerce() {
        let r = req(json!({"memory": ">= 8 GB"}));
        assert!(r.matches(&Candidate::new(json!({"memory": "9 GB"}))));
        assert!(r.matches(&Candidate::new(json!({"memory": "8.5 GB"}))));
        assert!(!r.matches(&Candidate::new(json!({"memory": "7.99 GB"}))));
    }

    #[test]
    fn absence_polarity() {
        let present = Candidate::new(json!({"arch": "x86_64"}));
        assert!(!req(json!({"hostname": "node-1"})).matches(&present));
        assert!(req(json!({"hostname": "!= node-1"})).matches(&present));
        assert!(req(json!({"cpu": {"model-name": "!~ Xeon"}})).matches(&present));
    }

    #[test]
    fn empty_groups_are_vacuous() {
        let anything = Candidate::new(json!({}));
        assert!(req(json!({"and": []})).matches(&anything));
        assert!(!req(json!({"or": []})).matches(&anything));
        let report = req(json!({"or": []})).evaluate(&anything);
        assert!(!report.ok());
        assert!(report.unsatisfied().is_empty());
    }

    #[test]
    fn existential_disk_match() {
        let r = req(json!({"disk": [{"size": ">= 20 GB"}]}));
        let small_and_big = Candidate::new(json!({
            "disk": [{"size": 10_000_000_000u64}, {"size": 40_000_000_000u64}]
        }));
        let small_only = Candidate::new(json!({
            "disk": [{"size": 10_000_000_000u64}]
        }));
        assert!(r.matches(&small_and_big));
        assert!(!r.matches(&small_only));
    }

    #[test]
    fn universal_list_semantics_flag() {
        let r = req(json!({"disk": [{"size": ">= 20 GB"}]}));
        let mixed = Candidate::new(json!({
            "disk": [{"size": 10_000_000_000u64}, {"size": 40_000_000_000u64}]
        }));
        let matcher = Matcher::with_options(MatchOptions {
            list_semantics: ListSemantics::All,
        });
        assert!(!matcher.matches(&r, &mixed));
        assert!(Matcher::new().matches(&r, &mixed));
    }

    #[test]
    fn incomparable_values_follow_polarity() {
        let candidate = Candidate::new(json!({"memory": {"total": 8}}));
        assert!(!req(json!({"memory": ">= 8 GB"})).matches(&candidate));
        let report = req(json!({"memory": ">= 8 GB"})).evaluate(&candidate);
        assert_eq!(report.unsatisfied().len(), 1);
        assert!(matches!(
            report.unsatisfied()[0].reason,
            FailReason::Incomparable { .. }
        ));
    }

    #[test]
    fn diagnostic_report_lists_failures_in_tree_order() {
        let r = req(json!({
            "arch": "aarch64",
            "memory": ">= 32 GB",
        }));
        let candidate = Candidate::new(json!({
            "arch": "x86_64",
            "memory": 16_000_000_000u64,
        }));
        let report = r.evaluate(&candidate);
        assert!(!report.ok());
        let paths: Vec<String> = report
            .unsatisfied()
            .iter()
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(paths, ["arch", "memory"]);
        assert!(matches!(
            report.unsatisfied()[0].reason,
            FailReason::Mismatch { .. }
        ));
    }

    #[test]
    fn satisfied_or_hides_alternative_failures() {
        let r = req(json!({
            "or": [{"cpu": {"model": 65}}, {"cpu": {"model": 67}}]
        }));
        let candidate = Candidate::new(json!({"cpu": {"model": 67}}));
        let report = r.evaluate(&candidate);
        assert!(report.ok());
        assert!(report.unsatisfied().is_empty());
    }

    #[test]
    fn failed_or_reports_all_alternatives() {
        let r = req(json!({
            "or": [{"cpu": {"model": 65}}, {"cpu": {"model": 67}}]
        }));
        let candidate = Candidate::new(json!({"cpu": {"model": 99}}));
        let report = r.evaluate(&candidate);
        assert!(!report.ok());
        assert_eq!(report.unsatisfied().len(), 2);
    }

    #[test]
    fn unsupported_fields_deny_and_report() {
        let r = req(json!({"gpu": {"model": 5}}));
        let candidate = Candidate::new(json!({"gpu": {"model": 5}}));
        assert!(!r.matches(&candidate));
        let report = r.evaluate(&candidate);
        assert_eq!(
            report.unsatisfied()[0].reason,
            FailReason::UnrecognizedField
        );
    }

    #[test]
    fn boolean_facts() {
        let r = req(json!({"virtualization": {"is-virtualized": false}}));
        assert!(r.matches(&Candidate::new(
            json!({"virtualization": {"is-virtualized": false}})
        )));
        assert!(!r.matches(&Candidate::new(
            json!({"virtualization": {"is-virtualized": true}})
        )));
        // String spellings coerce.
        assert!(r.matches(&Candidate::new(
            json!({"virtualization": {"is-virtualized": "false"}})
        )));
    }

    #[test]
    fn report_serializes_for_provisioner_logs() {
        let r = req(json!({"memory": ">= 32 GB"}));
        let report = r.evaluate(&Candidate::new(json!({"memory": 16_000_000_000u64})));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["unsatisfied"][0]["path"], json!("memory"));
    }
}
