//! # hwreq
//!
//! Hardware requirement constraint language and matching engine for
//! environment provisioning.
//!
//! A provisioning request declares what an environment must provide
//! (memory, CPU, disks, network, virtualization, boot mode, hostname) with
//! comparison operators, regular expressions and `and`/`or` composition.
//! This crate parses that declaration into an immutable constraint tree and
//! matches candidate environments against it, reporting which constraints a
//! rejected candidate failed.
//!
//! ## Quick Start
//!
//! ```
//! use hwreq::{Candidate, Requirements};
//! use serde_json::json;
//!
//! let requirements = Requirements::from_value(&json!({
//!     "arch": "x86_64",
//!     "memory": ">= 8 GB",
//!     "disk": [{"size": ">= 20 GB"}],
//! }))?;
//!
//! let candidate = Candidate::new(json!({
//!     "arch": "x86_64",
//!     "memory": 16_000_000_000u64,
//!     "disk": [{"size": 500_000_000_000u64}],
//! }));
//!
//! assert!(requirements.matches(&candidate));
//! # Ok::<(), hwreq::RequirementError>(())
//! ```
//!
//! ## Diagnostics
//!
//! [`Requirements::evaluate`] returns a [`MatchReport`] listing every leaf
//! constraint a candidate failed, with structured reasons, so a provisioner
//! can log why each candidate was rejected.
//!
//! ## Scope
//!
//! Parsing and matching only. Gathering candidate facts, provisioning
//! machines and enforcing timeouts are the caller's business; evaluation is
//! a pure, synchronous pass over the tree with no I/O.

pub mod candidate;
pub mod constraint;
pub mod error;
pub mod eval;
pub mod parse;
pub mod path;
pub mod prelude;
pub mod quantity;
pub mod schema;

pub use candidate::Candidate;
pub use constraint::{Combinator, Constraint, Group, Leaf, Operand, Operator, Pattern, Requirements};
pub use error::{RequirementError, RequirementResult};
pub use eval::{FailReason, FailedLeaf, ListSemantics, MatchOptions, MatchReport, Matcher};
pub use parse::{ParseOptions, RequirementParser, parse_requirements};
pub use path::FieldPath;
pub use quantity::{ParseQuantityError, Quantity, UnitCategory};
pub use schema::{FieldKind, Schema};
