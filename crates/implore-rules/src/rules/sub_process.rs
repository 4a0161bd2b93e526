//! SubProcess rule: run a nested process once per element
//!
//! Each element of the input collection seeds a fresh run of the inner
//! process under `seed_name`, together with the element's provenance. The
//! value the inner process leaves under `result_name` is collected: singular
//! results become one element each, collection results are concatenated.
//!
//! The inner process runs under the parent's configuration unless
//! [`SubProcessRule::with_own_config`] is set.

use async_trait::async_trait;

use super::require_input;
use crate::error::{RuleError, RuleResult};
use crate::process::Process;
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Provenance, Reference, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[
    ValueType::Scene,
    ValueType::NodeCollection,
    ValueType::Triangles,
    ValueType::LineSegments,
    ValueType::Points,
    ValueType::Boxes,
    ValueType::Strings,
    ValueType::Numbers,
    ValueType::Booleans,
];

#[derive(Debug)]
pub struct SubProcessRule {
    core: RuleCore,
    process: Process,
    seed_name: String,
    result_name: String,
    inherit_config: bool,
    runs: usize,
}

impl SubProcessRule {
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        process: Process,
        seed_name: impl Into<String>,
        result_name: impl Into<String>,
    ) -> Self {
        Self {
            core: RuleCore::new(input, output),
            process,
            seed_name: seed_name.into(),
            result_name: result_name.into(),
            inherit_config: true,
            runs: 0,
        }
    }

    /// Keep the inner process's own configuration instead of the parent's
    pub fn with_own_config(mut self) -> Self {
        self.inherit_config = false;
        self
    }

    /// The nested process, holding the ledger of its most recent run
    pub fn process(&self) -> &Process {
        &self.process
    }

    pub fn runs(&self) -> usize {
        self.runs
    }
}

#[async_trait]
impl Rule for SubProcessRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SubProcess
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
        ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput> {
        self.runs = 0;
        let input = require_input(input, self.kind())?;

        let elements: Vec<Payload> = match &input.value {
            Payload::Scene(root) => root.traverse().into_iter().map(Payload::Node).collect(),
            other => other.elements(),
        };
        let references = input.reference.as_slice();
        if self.inherit_config {
            self.process.set_config(ctx.config.clone());
        }

        let mut collected = Vec::new();
        let mut collected_references = Vec::new();
        let mut result_type: Option<ValueType> = None;

        for (index, element) in elements.into_iter().enumerate() {
            let provenance = references.get(index).cloned().or_else(|| match &element {
                Payload::Node(node) => Some(Provenance::Node(node.clone())),
                _ => None,
            });
            let seed = TypedValue::new(self.seed_name.as_str(), element)
                .with_reference(provenance.clone().map(Reference::One).unwrap_or_default());

            self.process.reset();
            self.process.run(seed).await?;
            self.runs += 1;

            let result = self
                .process
                .get_input(&self.result_name)
                .ok_or_else(|| RuleError::InputNotFound {
                    name: self.result_name.clone(),
                })?;

            let actual = result.value_type();
            let plural = actual.plural();
            match result_type {
                Some(expected) if expected != plural => {
                    return Err(RuleError::NestedOutput {
                        name: self.result_name.clone(),
                        actual,
                        expected,
                    });
                }
                _ => result_type = Some(plural),
            }

            for item in result.value.elements() {
                collected.push(item);
                if let Some(provenance) = &provenance {
                    collected_references.push(provenance.clone());
                }
            }
        }

        // An empty input never reveals the element type
        let ty = result_type.unwrap_or(ValueType::Numbers);
        let value = Payload::from_elements(ty, collected).ok_or_else(|| RuleError::NestedOutput {
            name: self.result_name.clone(),
            actual: ty,
            expected: ty,
        })?;

        let reference = if value.len() == Some(collected_references.len()) {
            Reference::Many(collected_references)
        } else {
            Reference::None
        };
        tracing::debug!("Sub-process ran {} times", self.runs);
        Ok(RuleOutput::new(value).with_reference(reference))
    }

    fn summarize(&self, output: &RuleOutput) -> String {
        format!("{} runs: {}", self.runs, output.value.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::ledger::Ledger;
    use crate::rule::apply;
    use crate::rules::{ExtractMode, ExtractRule, MathRule, ReduceOp, ReducerRule};
    use implore_scene::{Mesh, SceneNode, Triangle};

    fn slab(name: &str, faces: usize, height: f64) -> SceneNode {
        let triangles: Vec<Triangle> = (0..faces)
            .map(|i| {
                let x = i as f64;
                Triangle::new([x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0])
            })
            .collect();
        SceneNode::new(name)
            .with_attribute("height", height)
            .with_geometry(Mesh::from_triangles(&triangles))
    }

    async fn run_outer(rule: &mut SubProcessRule, input: TypedValue) -> RuleResult<Option<TypedValue>> {
        let mut ledger = Ledger::new();
        ledger.push(input);
        let config = ProcessConfig::default();
        apply(rule, &RuleContext::new(&ledger, &config)).await
    }

    #[tokio::test]
    async fn singular_results_become_a_collection() {
        let nodes = vec![slab("a", 2, 3.0), slab("b", 5, 2.0)];
        let inner = Process::new()
            .with_rule(ExtractRule::new("node", "faces", ExtractMode::Faces))
            .with_rule(ReducerRule::new("faces", "face-count", ReduceOp::Count));
        let mut rule = SubProcessRule::new("nodes", "counts", inner, "node", "face-count");

        let input = TypedValue::new("nodes", Payload::Nodes(nodes.clone()))
            .with_reference(Reference::nodes(nodes.clone()));
        let out = run_outer(&mut rule, input).await.unwrap().unwrap();

        assert_eq!(out.value, Payload::Numbers(vec![2.0, 5.0]));
        assert_eq!(out.reference, Reference::nodes(nodes));
        assert_eq!(rule.runs(), 2);
    }

    #[tokio::test]
    async fn plural_results_are_concatenated_with_element_provenance() {
        let nodes = vec![slab("a", 2, 3.0), slab("b", 1, 2.0)];
        let inner = Process::new().with_rule(ExtractRule::new("node", "faces", ExtractMode::Faces));
        let mut rule = SubProcessRule::new("nodes", "all-faces", inner, "node", "faces");

        let out = run_outer(&mut rule, TypedValue::new("nodes", Payload::Nodes(nodes.clone())))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out.value_type(), ValueType::Triangles);
        assert_eq!(out.value.len(), Some(3));
        let owners: Vec<&str> = out
            .reference
            .as_slice()
            .iter()
            .map(|p| p.primary().name())
            .collect();
        assert_eq!(owners, vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn numeric_elements_seed_the_inner_process() {
        let inner = Process::new().with_rule(MathRule::new("x * x", "squared").unwrap());
        let mut rule = SubProcessRule::new("values", "squares", inner, "x", "squared");
        let out = run_outer(
            &mut rule,
            TypedValue::new("values", Payload::Numbers(vec![2.0, 3.0])),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![4.0, 9.0]));
        assert_eq!(out.reference, Reference::None);
    }

    #[tokio::test]
    async fn inner_config_is_inherited_unless_kept() {
        let lenient = ProcessConfig {
            strict_input_types: false,
            ..ProcessConfig::default()
        };
        // A scalar is not a collection, so the reducer's input is mistyped
        let inner = || {
            Process::with_config(lenient.clone())
                .with_rule(ReducerRule::new("x", "total", ReduceOp::Sum))
                .with_rule(MathRule::new("x + 1", "y").unwrap())
        };
        let values = || TypedValue::new("values", Payload::Numbers(vec![1.0, 2.0]));

        let mut inherited = SubProcessRule::new("values", "out", inner(), "x", "y");
        let result = run_outer(&mut inherited, values()).await;
        assert!(matches!(result, Err(RuleError::InvalidInputType { .. })));
        assert!(inherited.process().config().strict_input_types);

        let mut kept = SubProcessRule::new("values", "out", inner(), "x", "y").with_own_config();
        let out = run_outer(&mut kept, values()).await.unwrap().unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![2.0, 3.0]));
        assert!(!kept.process().config().strict_input_types);
    }

    #[tokio::test]
    async fn missing_inner_result_fails() {
        let mut rule = SubProcessRule::new("values", "out", Process::new(), "x", "never");
        let result = run_outer(
            &mut rule,
            TypedValue::new("values", Payload::Numbers(vec![1.0])),
        )
        .await;
        assert!(matches!(result, Err(RuleError::InputNotFound { name }) if name == "never"));
    }

    #[tokio::test]
    async fn empty_input_gives_an_empty_collection() {
        let inner = Process::new().with_rule(MathRule::new("x + 1", "y").unwrap());
        let mut rule = SubProcessRule::new("values", "out", inner, "x", "y");
        let out = run_outer(&mut rule, TypedValue::new("values", Payload::Numbers(vec![])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.value, Payload::Numbers(vec![]));
        assert_eq!(rule.runs(), 0);
    }
}
