//! Convenience re-exports for common usage.
//!
//! ```
//! use hwreq::prelude::*;
//! use serde_json::json;
//!
//! let req = parse_requirements(&json!({"memory": ">= 8 GB"})).unwrap();
//! assert!(req.matches(&Candidate::new(json!({"memory": 16_000_000_000u64}))));
//! ```

pub use crate::candidate::Candidate;
pub use crate::constraint::{Combinator, Constraint, Group, Leaf, Operand, Operator, Requirements};
pub use crate::error::{RequirementError, RequirementResult};
pub use crate::eval::{FailReason, FailedLeaf, ListSemantics, MatchOptions, MatchReport, Matcher};
pub use crate::parse::{RequirementParser, parse_requirements};
pub use crate::path::FieldPath;
pub use crate::quantity::{Quantity, UnitCategory};
pub use crate::schema::{FieldKind, Schema};
