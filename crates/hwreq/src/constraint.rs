//! Constraint node model
//!
//! A requirement specification parses into an immutable tree of
//! [`Constraint`] nodes: leaves (field path, operator, operand) combined by
//! `and`/`or` groups. The root is always a group — an implicit `and` over the
//! specification's top-level keys. Trees are `Send + Sync` and may be
//! evaluated against many candidates concurrently.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::candidate::Candidate;
use crate::error::RequirementResult;
use crate::eval::{MatchReport, Matcher};
use crate::parse::RequirementParser;
use crate::path::FieldPath;
use crate::quantity::Quantity;

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator of a constraint leaf.
///
/// An absent prefix in the specification means the field's default:
/// [`Operator::Ge`] for unit-bearing quantities, [`Operator::Eq`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `~` (also written `=~`): regex match
    Match,
    /// `!~`: regex non-match
    NotMatch,
}

impl Operator {
    /// Splits a leading operator token off a scalar value.
    ///
    /// Returns `None` for the operator when no prefix is present; the parser
    /// picks the field-appropriate default (`=`, or `>=` for unit-bearing
    /// quantities). Two-character tokens are tried first so `>=` never reads
    /// as `>` `=`.
    pub fn split_prefix(token: &str) -> (Option<Self>, &str) {
        let token = token.trim_start();
        for (tok, op) in [
            (">=", Self::Ge),
            ("<=", Self::Le),
            ("!=", Self::Ne),
            ("=~", Self::Match),
            ("!~", Self::NotMatch),
            (">", Self::Gt),
            ("<", Self::Lt),
            ("=", Self::Eq),
            ("~", Self::Match),
        ] {
            if let Some(rest) = token.strip_prefix(tok) {
                return (Some(op), rest.trim_start());
            }
        }
        (None, token)
    }

    /// Canonical token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Match => "~",
            Self::NotMatch => "!~",
        }
    }

    /// True for `!=` / `!~`.
    ///
    /// Negative operators are satisfied by absence: a property that does not
    /// exist cannot violate them.
    pub fn is_negative(self) -> bool {
        matches!(self, Self::Ne | Self::NotMatch)
    }

    /// True for the ordering operators `>` `>=` `<` `<=`.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }

    /// True for the regex operators `~` / `!~`.
    pub fn is_pattern(self) -> bool {
        matches!(self, Self::Match | Self::NotMatch)
    }

    /// Applies the operator to an ordering between candidate and operand.
    ///
    /// Only meaningful for the comparison operators; pattern operators are
    /// handled by the evaluator directly.
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Ge => matches!(ordering, Greater | Equal),
            Self::Lt => ordering == Less,
            Self::Le => matches!(ordering, Less | Equal),
            Self::Match | Self::NotMatch => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Operands
// ============================================================================

/// A compiled regular expression operand.
///
/// Compiled once at parse time; equality is on the source pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern.
    pub fn compile(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    /// The original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// The right-hand side of a constraint leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A unit-normalized quantity (sizes, frequencies, counts).
    Quantity(Quantity),
    /// Exact text (architecture names, hostnames, boot methods, ...).
    Text(String),
    /// Boolean facts (`virtualization.is-virtualized`).
    Bool(bool),
    /// A compiled regex for `~` / `!~`.
    Pattern(Pattern),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Text(t) => write!(f, "{t}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Pattern(p) => write!(f, "{}", p.source()),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A single testable condition on one candidate field.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    path: FieldPath,
    operator: Operator,
    operand: Operand,
}

impl Leaf {
    /// Creates a leaf constraint.
    pub fn new(path: FieldPath, operator: Operator, operand: Operand) -> Self {
        Self {
            path,
            operator,
            operand,
        }
    }

    /// The candidate field this leaf addresses.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// The comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The right-hand side.
    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.operator, self.operand)
    }
}

/// Boolean aggregation over child constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// All children must be satisfied. Empty `and` is vacuously true.
    And,
    /// At least one child must be satisfied. Empty `or` is vacuously false.
    Or,
}

impl Combinator {
    /// The specification keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// An ordered group of child constraints under one combinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    combinator: Combinator,
    children: Vec<Constraint>,
}

impl Group {
    /// Creates a group.
    pub fn new(combinator: Combinator, children: Vec<Constraint>) -> Self {
        Self {
            combinator,
            children,
        }
    }

    /// An `and` group.
    pub fn all(children: Vec<Constraint>) -> Self {
        Self::new(Combinator::And, children)
    }

    /// An `or` group.
    pub fn any(children: Vec<Constraint>) -> Self {
        Self::new(Combinator::Or, children)
    }

    /// The group's combinator.
    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// The child constraints, in specification order.
    pub fn children(&self) -> &[Constraint] {
        &self.children
    }

    /// True when the group has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node in a constraint tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// A single field condition.
    Leaf(Leaf),
    /// An `and`/`or` aggregation.
    Group(Group),
    /// A field outside the recognized schema (non-strict parsing only).
    ///
    /// Forward-compatible default-deny: the node always evaluates
    /// unsatisfied and is reported with a dedicated reason.
    Unsupported(FieldPath),
}

impl Constraint {
    /// Number of leaves in this subtree (unsupported fields count as one).
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) | Self::Unsupported(_) => 1,
            Self::Group(group) => group.children().iter().map(Self::leaf_count).sum(),
        }
    }
}

// ============================================================================
// Requirements — the tree root
// ============================================================================

/// A parsed requirement specification: an implicit `and` over its top-level
/// constraints.
///
/// Immutable once parsed. Evaluate candidates with [`Requirements::matches`]
/// (fast, short-circuiting) or [`Requirements::evaluate`] (diagnostic,
/// collects every failing leaf); both are pure and thread-safe.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirements {
    root: Group,
}

impl Requirements {
    /// Wraps an already-built root group.
    pub fn new(root: Group) -> Self {
        Self { root }
    }

    /// Parses a JSON-equivalent nested mapping with the default parser
    /// (builtin schema, non-strict).
    pub fn from_value(spec: &Value) -> RequirementResult<Self> {
        RequirementParser::new().parse(spec)
    }

    /// The root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// True when the specification declared no constraints at all.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Total number of leaf constraints.
    pub fn leaf_count(&self) -> usize {
        self.root.children().iter().map(Constraint::leaf_count).sum()
    }

    /// Short-circuiting check against one candidate, default match options.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        Matcher::new().matches(self, candidate)
    }

    /// Diagnostic evaluation against one candidate, default match options.
    pub fn evaluate(&self, candidate: &Candidate) -> MatchReport {
        Matcher::new().evaluate(self, candidate)
    }
}

impl FromStr for Requirements {
    type Err = crate::error::RequirementError;

    /// Parses a requirement specification from JSON text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(s).map_err(|err| {
            crate::error::RequirementError::malformed_value("", err.to_string())
        })?;
        Self::from_value(&value)
    }
}

// ============================================================================
// Tests
// ============================================================================
