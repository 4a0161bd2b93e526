//! Reducer rule: collapse a collection to one number

use async_trait::async_trait;
use implore_scene::parse_number;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::require_input;
use crate::error::{describe_types, RuleError, RuleResult};
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Reference, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[
    ValueType::Numbers,
    ValueType::Strings,
    ValueType::NodeCollection,
    ValueType::Booleans,
    ValueType::Triangles,
    ValueType::LineSegments,
    ValueType::Points,
    ValueType::Boxes,
];
const NUMERIC: &[ValueType] = &[ValueType::Numbers, ValueType::Strings];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceOp {
    Min,
    Max,
    Average,
    Sum,
    Count,
}

impl ReduceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
            ReduceOp::Average => "average",
            ReduceOp::Sum => "sum",
            ReduceOp::Count => "count",
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduces numbers (or numeric strings) with min, max, average or sum;
/// `count` accepts any collection.
///
/// `min`/`max` reference every element that attains the extremum, so ties
/// keep all their provenance.
#[derive(Debug, Clone)]
pub struct ReducerRule {
    core: RuleCore,
    operation: ReduceOp,
    extremum_indices: Vec<usize>,
}

impl ReducerRule {
    pub fn new(input: impl Into<String>, output: impl Into<String>, operation: ReduceOp) -> Self {
        Self {
            core: RuleCore::new(input, output),
            operation,
            extremum_indices: Vec::new(),
        }
    }

    pub fn operation(&self) -> ReduceOp {
        self.operation
    }

    /// Indices attaining the extremum in the last `min`/`max` run
    pub fn extremum_indices(&self) -> &[usize] {
        &self.extremum_indices
    }
}

fn numbers(input: &TypedValue) -> RuleResult<Vec<f64>> {
    match &input.value {
        Payload::Numbers(values) => Ok(values.clone()),
        Payload::Strings(values) => values
            .iter()
            .map(|s| {
                parse_number(s).ok_or_else(|| RuleError::NotNumeric {
                    name: input.name.clone(),
                    value: s.clone(),
                })
            })
            .collect(),
        other => Err(RuleError::InvalidInputType {
            rule: RuleKind::Reducer,
            name: input.name.clone(),
            actual: other.value_type(),
            expected: describe_types(NUMERIC),
        }),
    }
}

/// Indices of every element equal to the extremum. NaN never wins.
fn extremum(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<(f64, Vec<usize>)> {
    let mut best: Option<(f64, Vec<usize>)> = None;
    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match &mut best {
            None => best = Some((value, vec![i])),
            Some((current, indices)) => {
                if better(value, *current) {
                    *current = value;
                    indices.clear();
                    indices.push(i);
                } else if value == *current {
                    indices.push(i);
                }
            }
        }
    }
    best
}

#[async_trait]
impl Rule for ReducerRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Reducer
    }

    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RuleCore {
        &mut self.core
    }

    fn allowed_input_types(&self) -> &'static [ValueType] {
        ALLOWED
    }

    async fn transform(
        &mut self,
        input: Option<&TypedValue>,
        _ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput> {
        self.extremum_indices.clear();
        let input = require_input(input, self.kind())?;
        let passthrough = || RuleOutput::new(Payload::Number(0.0)).with_reference(input.reference.clone());

        let values = match self.operation {
            ReduceOp::Count => Vec::new(),
            _ => numbers(input)?,
        };
        let empty = || RuleError::EmptyCollection {
            operation: self.operation.to_string(),
        };

        let output = match self.operation {
            ReduceOp::Count => RuleOutput {
                value: Payload::Number(input.value.len().unwrap_or(1) as f64),
                ..passthrough()
            },
            ReduceOp::Sum => RuleOutput {
                value: Payload::Number(values.iter().sum()),
                ..passthrough()
            },
            ReduceOp::Average => {
                if values.is_empty() {
                    return Err(empty());
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                RuleOutput {
                    value: Payload::Number(mean),
                    ..passthrough()
                }
            }
            ReduceOp::Min | ReduceOp::Max => {
                if values.is_empty() {
                    return Err(empty());
                }
                let found = if self.operation == ReduceOp::Min {
                    extremum(&values, |a, b| a < b)
                } else {
                    extremum(&values, |a, b| a > b)
                };
                let Some((value, indices)) = found else {
                    // Every element is NaN
                    return Ok(RuleOutput::new(Payload::Number(f64::NAN)));
                };

                let reference = match &input.reference {
                    Reference::Many(all) => {
                        Reference::Many(indices.iter().filter_map(|&i| all.get(i).cloned()).collect())
                    }
                    other => other.clone(),
                };
                self.extremum_indices = indices;
                RuleOutput::new(Payload::Number(value)).with_reference(reference)
            }
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::ledger::Ledger;
    use crate::rule::apply;
    use crate::value::Provenance;
    use implore_scene::SceneNode;

    async fn reduce(
        operation: ReduceOp,
        input: TypedValue,
    ) -> (RuleResult<Option<TypedValue>>, ReducerRule) {
        let mut ledger = Ledger::new();
        ledger.push(input.clone());
        let config = ProcessConfig::default();
        let mut rule = ReducerRule::new(input.name.as_str(), "out", operation);
        let result = apply(&mut rule, &RuleContext::new(&ledger, &config)).await;
        (result, rule)
    }

    fn with_nodes(values: &[f64]) -> (TypedValue, Vec<SceneNode>) {
        let nodes: Vec<SceneNode> = (0..values.len())
            .map(|i| SceneNode::new(format!("n{}", i)))
            .collect();
        let value = TypedValue::new("v", Payload::Numbers(values.to_vec()))
            .with_reference(Reference::nodes(nodes.clone()));
        (value, nodes)
    }

    #[tokio::test]
    async fn min_keeps_every_tied_reference() {
        let (input, nodes) = with_nodes(&[5.0, 3.0, 3.0, 8.0]);
        let (result, rule) = reduce(ReduceOp::Min, input).await;
        let out = result.unwrap().unwrap();

        assert_eq!(out.value, Payload::Number(3.0));
        assert_eq!(rule.extremum_indices(), &[1, 2]);
        assert_eq!(
            out.reference,
            Reference::Many(vec![
                Provenance::Node(nodes[1].clone()),
                Provenance::Node(nodes[2].clone()),
            ])
        );
    }

    #[tokio::test]
    async fn max_average_sum() {
        let (input, nodes) = with_nodes(&[5.0, 3.0, 3.0, 8.0]);
        let (result, _) = reduce(ReduceOp::Max, input.clone()).await;
        let out = result.unwrap().unwrap();
        assert_eq!(out.value, Payload::Number(8.0));
        assert_eq!(out.reference, Reference::Many(vec![Provenance::Node(nodes[3].clone())]));

        let (result, _) = reduce(ReduceOp::Average, input.clone()).await;
        assert_eq!(result.unwrap().unwrap().value, Payload::Number(4.75));

        let (result, _) = reduce(ReduceOp::Sum, input.clone()).await;
        let out = result.unwrap().unwrap();
        assert_eq!(out.value, Payload::Number(19.0));
        assert_eq!(out.reference, input.reference);
    }

    #[tokio::test]
    async fn numeric_strings_are_parsed() {
        let input = TypedValue::new("v", Payload::Strings(vec!["2".into(), " 4.5 ".into()]));
        let (result, _) = reduce(ReduceOp::Sum, input).await;
        assert_eq!(result.unwrap().unwrap().value, Payload::Number(6.5));

        let input = TypedValue::new("v", Payload::Strings(vec!["2".into(), "tall".into()]));
        let (result, _) = reduce(ReduceOp::Max, input).await;
        assert!(matches!(result, Err(RuleError::NotNumeric { .. })));
    }

    #[tokio::test]
    async fn count_accepts_nodes() {
        let nodes = vec![SceneNode::new("a"), SceneNode::new("b")];
        let (result, _) = reduce(ReduceOp::Count, TypedValue::new("v", Payload::Nodes(nodes))).await;
        assert_eq!(result.unwrap().unwrap().value, Payload::Number(2.0));

        let (result, _) = reduce(ReduceOp::Sum, TypedValue::new("v", Payload::Nodes(vec![]))).await;
        assert!(matches!(result, Err(RuleError::InvalidInputType { .. })));
    }

    #[tokio::test]
    async fn empty_collections() {
        let empty = TypedValue::new("v", Payload::Numbers(vec![]));
        let (result, _) = reduce(ReduceOp::Sum, empty.clone()).await;
        assert_eq!(result.unwrap().unwrap().value, Payload::Number(0.0));

        for op in [ReduceOp::Min, ReduceOp::Max, ReduceOp::Average] {
            let (result, _) = reduce(op, empty.clone()).await;
            assert!(matches!(result, Err(RuleError::EmptyCollection { .. })));
        }
    }

    #[tokio::test]
    async fn nan_never_wins() {
        let input = TypedValue::new("v", Payload::Numbers(vec![f64::NAN, 2.0, 1.0]));
        let (result, rule) = reduce(ReduceOp::Min, input).await;
        assert_eq!(result.unwrap().unwrap().value, Payload::Number(1.0));
        assert_eq!(rule.extremum_indices(), &[2]);
    }
}
