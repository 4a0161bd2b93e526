//! implore-rules - Typed rule pipeline over scenes
//!
//! A [`Process`] owns an ordered list of rules and an append-only ledger of
//! named, typed values. Each rule reads one named value from the ledger,
//! transforms it, and appends exactly one new named value.
//!
//! # Rule Variants
//!
//! - **Filter**: keep nodes matching `and`/`or` combined conditions
//! - **Extract**: pull properties, faces, edges, wireframe, vertices or bounds
//! - **Math**: evaluate an expression elementwise over ledger variables
//! - **Reducer**: `min`, `max`, `average`, `sum`, `count` with provenance
//! - **Traverse**: flatten hierarchies depth-first
//! - **WriteProperty**: write values back into node attributes
//! - **NormalDistance**: minimum distances between geometry, per node pair
//! - **SubProcess**: run a nested pipeline once per collection element
//!
//! # Examples
//!
//! ```ignore
//! use implore_rules::*;
//!
//! let mut process = Process::new()
//!     .with_rule(FilterRule::new("scene", "walls")
//!         .with_condition(Condition::new("category", ConditionOp::Eq, "wall")))
//!     .with_rule(ExtractRule::new("walls", "heights", ExtractMode::property("height")));
//!
//! process.run(TypedValue::new("scene", Payload::Scene(root))).await?;
//! let heights = process.get_input("heights");
//! ```

pub mod condition;
pub mod config;
pub mod error;
pub mod ledger;
pub mod process;
pub mod rule;
pub mod rules;
pub mod value;

pub use condition::*;
pub use config::*;
pub use error::*;
pub use ledger::*;
pub use process::*;
pub use rule::*;
pub use rules::*;
pub use value::*;
