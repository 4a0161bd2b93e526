//! WriteProperty rule: write ledger values back onto nodes

use async_trait::async_trait;

use super::{require_input, second_input};
use crate::error::{describe_types, RuleError, RuleResult};
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[ValueType::Node, ValueType::NodeCollection];
const WRITABLE: &[ValueType] = &[
    ValueType::Triangle,
    ValueType::Triangles,
    ValueType::LineSegment,
    ValueType::LineSegments,
    ValueType::Point,
    ValueType::Points,
    ValueType::Box,
    ValueType::Boxes,
    ValueType::String,
    ValueType::Strings,
    ValueType::Number,
    ValueType::Numbers,
    ValueType::Boolean,
    ValueType::Booleans,
    ValueType::Json,
];

/// Writes the value named by `input_var_name2` into attribute `key` of
/// every target node.
///
/// With `per_element` set and a value collection as long as the target list,
/// element `i` goes to node `i`. Otherwise the whole value is written to every
/// node. The targets pass through unchanged as the rule's output.
#[derive(Debug, Clone)]
pub struct WritePropertyRule {
    core: RuleCore,
    key: String,
    per_element: bool,
    written: usize,
}

impl WritePropertyRule {
    pub fn new(
        targets: impl Into<String>,
        value: impl Into<String>,
        key: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            core: RuleCore::new(targets, output).with_second_input(value),
            key: key.into(),
            per_element: true,
            written: 0,
        }
    }

    pub fn with_per_element(mut self, per_element: bool) -> Self {
        self.per_element = per_element;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl Rule for WritePropertyRule {
    fn kind(&self) -> RuleKind {
        RuleKind::WriteProperty
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
        self.written = 0;
        let targets = require_input(input, self.kind())?;
        let source = second_input(self.core.input_var_name2.as_deref(), ctx.ledger, self.kind())?;

        let actual = source.value_type();
        if !WRITABLE.contains(&actual) {
            return Err(RuleError::InvalidSecondaryInputType {
                rule: self.kind(),
                name: source.name.clone(),
                actual,
                expected: describe_types(WRITABLE),
            });
        }

        let nodes = targets.value.nodes().unwrap_or_default();
        if self.per_element && source.value.len() == Some(nodes.len()) {
            for (index, node) in nodes.iter().enumerate() {
                if let Some(element) = source.value.element(index) {
                    node.set_attribute(self.key.as_str(), element.to_attr_value());
                    self.written += 1;
                }
            }
        } else {
            let value = source.value.to_attr_value();
            for node in &nodes {
                node.set_attribute(self.key.as_str(), value.clone());
                self.written += 1;
            }
        }

        tracing::debug!("Wrote '{}' on {} nodes", self.key, self.written);
        Ok(RuleOutput::new(targets.value.clone()).with_reference(targets.reference.clone()))
    }

    fn summarize(&self, output: &RuleOutput) -> String {
        format!("wrote '{}' on {} of {}", self.key, self.written, output.value.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::ledger::Ledger;
    use crate::rule::apply;
    use implore_scene::{AttrValue, SceneNode};

    fn walls() -> Vec<SceneNode> {
        vec![SceneNode::new("w1"), SceneNode::new("w2"), SceneNode::new("w3")]
    }

    async fn write(rule: &mut WritePropertyRule, targets: Payload, value: Payload) -> RuleResult<Option<TypedValue>> {
        let mut ledger = Ledger::new();
        ledger.push(TypedValue::new("walls", targets));
        ledger.push(TypedValue::new("value", value));
        let config = ProcessConfig::default();
        apply(rule, &RuleContext::new(&ledger, &config)).await
    }

    #[tokio::test]
    async fn writes_per_element_when_lengths_match() {
        let nodes = walls();
        let mut rule = WritePropertyRule::new("walls", "value", "area", "walls-out");
        let out = write(
            &mut rule,
            Payload::Nodes(nodes.clone()),
            Payload::Numbers(vec![1.0, 2.0, 3.0]),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(nodes[0].attribute("area"), Some(AttrValue::Number(1.0)));
        assert_eq!(nodes[2].attribute("area"), Some(AttrValue::Number(3.0)));
        assert_eq!(out.value, Payload::Nodes(nodes));
        assert!(rule.output_summary().unwrap().starts_with("wrote 'area' on 3"));
    }

    #[tokio::test]
    async fn scalar_goes_to_every_node() {
        let nodes = walls();
        let mut rule = WritePropertyRule::new("walls", "value", "checked", "out");
        write(&mut rule, Payload::Nodes(nodes.clone()), Payload::Boolean(true))
            .await
            .unwrap();
        assert!(nodes.iter().all(|n| n.attribute("checked") == Some(AttrValue::Bool(true))));
    }

    #[tokio::test]
    async fn mismatched_collection_is_written_whole() {
        let nodes = walls();
        let mut rule = WritePropertyRule::new("walls", "value", "tags", "out");
        write(
            &mut rule,
            Payload::Nodes(nodes.clone()),
            Payload::Strings(vec!["a".into(), "b".into()]),
        )
        .await
        .unwrap();
        assert_eq!(
            nodes[1].attribute("tags"),
            Some(AttrValue::Json(serde_json::json!(["a", "b"])))
        );
    }

    #[tokio::test]
    async fn node_values_are_rejected() {
        let mut rule = WritePropertyRule::new("walls", "value", "k", "out");
        let result = write(
            &mut rule,
            Payload::Nodes(walls()),
            Payload::Node(SceneNode::new("x")),
        )
        .await;
        assert!(matches!(result, Err(RuleError::InvalidSecondaryInputType { .. })));
    }

    #[tokio::test]
    async fn single_node_target() {
        let node = SceneNode::new("slab");
        let mut rule = WritePropertyRule::new("walls", "value", "thickness", "out");
        write(&mut rule, Payload::Node(node.clone()), Payload::Number(0.2))
            .await
            .unwrap();
        assert_eq!(node.attribute("thickness"), Some(AttrValue::Number(0.2)));
    }
}
