//! Rule variants

pub mod extract;
pub mod filter;
pub mod math;
pub mod normal_distance;
pub mod reducer;
pub mod sub_process;
pub mod traverse;
pub mod write_property;

pub use extract::*;
pub use filter::*;
pub use math::*;
pub use normal_distance::*;
pub use reducer::*;
pub use sub_process::*;
pub use traverse::*;
pub use write_property::*;

use crate::error::{RuleError, RuleResult};
use crate::rule::RuleKind;
use crate::value::TypedValue;

/// Primary input handed over by `apply`
pub(crate) fn require_input(input: Option<&TypedValue>, rule: RuleKind) -> RuleResult<&TypedValue> {
    input.ok_or(RuleError::MissingInputName { rule })
}

/// Resolve the second input of a binary rule
pub(crate) fn second_input<'a>(
    name: Option<&str>,
    ledger: &'a crate::ledger::Ledger,
    rule: RuleKind,
) -> RuleResult<&'a TypedValue> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(RuleError::MissingInputName { rule })?;
    ledger.get(name).ok_or_else(|| RuleError::InputNotFound {
        name: name.to_string(),
    })
}
