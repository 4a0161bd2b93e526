//! Traverse rule: flatten hierarchies into a node list

use async_trait::async_trait;

use super::require_input;
use crate::error::RuleResult;
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Reference, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[ValueType::NodeCollection, ValueType::Scene, ValueType::Node];

/// Depth-first, pre-order walk of every input node's subtree.
///
/// Each input node appears before its descendants. Subtrees of separate
/// inputs are concatenated, so a node reachable from two inputs appears
/// twice.
#[derive(Debug, Clone)]
pub struct TraverseRule {
    core: RuleCore,
}

impl TraverseRule {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            core: RuleCore::new(input, output),
        }
    }
}

#[async_trait]
impl Rule for TraverseRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Traverse
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
        let input = require_input(input, self.kind())?;
        let roots = match &input.value {
            Payload::Scene(root) | Payload::Node(root) => vec![root.clone()],
            Payload::Nodes(nodes) => nodes.clone(),
            _ => Vec::new(),
        };

        let visited: Vec<_> = roots.iter().flat_map(|root| root.traverse()).collect();
        let reference = Reference::nodes(visited.iter().cloned());
        Ok(RuleOutput::new(Payload::Nodes(visited)).with_reference(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::ledger::Ledger;
    use crate::rule::apply;
    use implore_scene::SceneNode;

    #[tokio::test]
    async fn flattens_each_input_subtree() {
        let floor = SceneNode::new("floor")
            .with_child(SceneNode::new("room-a").with_child(SceneNode::new("desk")))
            .with_child(SceneNode::new("room-b"));
        let roof = SceneNode::new("roof");

        let mut ledger = Ledger::new();
        ledger.push(TypedValue::new("levels", Payload::Nodes(vec![floor, roof])));
        let config = ProcessConfig::default();
        let mut rule = TraverseRule::new("levels", "everything");
        let out = apply(&mut rule, &RuleContext::new(&ledger, &config))
            .await
            .unwrap()
            .unwrap();

        let names: Vec<String> = out
            .value
            .nodes()
            .unwrap()
            .iter()
            .map(|n| n.name().to_string())
            .collect();
        assert_eq!(names, vec!["floor", "room-a", "desk", "room-b", "roof"]);
        assert_eq!(out.reference.len(), 5);
    }

    #[tokio::test]
    async fn single_node_includes_itself() {
        let mut ledger = Ledger::new();
        ledger.push(TypedValue::new("n", Payload::Node(SceneNode::new("leaf"))));
        let config = ProcessConfig::default();
        let mut rule = TraverseRule::new("n", "out");
        let out = apply(&mut rule, &RuleContext::new(&ledger, &config))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.value.len(), Some(1));
    }
}
