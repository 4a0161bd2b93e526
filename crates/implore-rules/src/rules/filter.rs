//! Filter rule: keep the nodes that satisfy a set of conditions

use async_trait::async_trait;

use super::require_input;
use crate::condition::{Combinator, Condition};
use crate::error::RuleResult;
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, TypedValue, ValueType};

const ALLOWED: &[ValueType] = &[ValueType::NodeCollection, ValueType::Scene];

/// Selects nodes from a collection (or a whole scene, root included).
///
/// Output order follows input order. The selected nodes are their own
/// provenance, so the output carries no reference list.
#[derive(Debug, Clone)]
pub struct FilterRule {
    core: RuleCore,
    conditions: Vec<Condition>,
    combinator: Combinator,
}

impl FilterRule {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            core: RuleCore::new(input, output),
            conditions: Vec::new(),
            combinator: Combinator::And,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }
}

#[async_trait]
impl Rule for FilterRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Filter
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
        let nodes = input.value.nodes().unwrap_or_default();
        let total = nodes.len();

        let selected: Vec<_> = nodes
            .into_iter()
            .filter(|node| self.combinator.evaluate(&self.conditions, node))
            .collect();

        tracing::debug!("Filter kept {} of {} nodes", selected.len(), total);
        Ok(RuleOutput::new(Payload::Nodes(selected)))
    }
}
