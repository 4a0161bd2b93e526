//! Process: an ordered rule list over a ledger

use crate::config::ProcessConfig;
use crate::error::RuleResult;
use crate::ledger::Ledger;
use crate::rule::{apply, Rule, RuleContext};
use crate::value::TypedValue;

/// Initial values for a run.
///
/// Nested groups are flattened in order before being appended.
#[derive(Debug, Clone)]
pub enum Seed {
    One(TypedValue),
    Many(Vec<TypedValue>),
    Nested(Vec<Vec<TypedValue>>),
}

impl Seed {
    pub fn into_values(self) -> Vec<TypedValue> {
        match self {
            Seed::One(value) => vec![value],
            Seed::Many(values) => values,
            Seed::Nested(groups) => groups.into_iter().flatten().collect(),
        }
    }
}

impl From<TypedValue> for Seed {
    fn from(value: TypedValue) -> Self {
        Seed::One(value)
    }
}

impl From<Vec<TypedValue>> for Seed {
    fn from(values: Vec<TypedValue>) -> Self {
        Seed::Many(values)
    }
}

impl From<Vec<Vec<TypedValue>>> for Seed {
    fn from(groups: Vec<Vec<TypedValue>>) -> Self {
        Seed::Nested(groups)
    }
}

/// Owns rules and the ledger they read from and append to.
///
/// The ledger holds the values of one run. It stays readable after `run`
/// returns and is discarded when the next run starts. Entries given to
/// [`Process::add_data`] between runs are kept as pre-seeds of the next run.
#[derive(Default)]
pub struct Process {
    rules: Vec<Box<dyn Rule>>,
    ledger: Ledger,
    config: ProcessConfig,
    ran: bool,
}

impl Process {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProcessConfig) -> Self {
        Self {
            rules: Vec::new(),
            ledger: Ledger::with_lookup(config.lookup),
            config,
            ran: false,
        }
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ProcessConfig) {
        self.ledger.set_lookup(config.lookup);
        self.config = config;
    }

    pub fn add_rule(&mut self, rule: impl Rule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Builder-style [`Process::add_rule`]
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&dyn Rule> {
        self.rules.get(index).map(|r| r.as_ref())
    }

    /// Start a fresh ledger holding any pre-seeds and the seed values, then
    /// run every rule in order.
    ///
    /// Stops at the first failing rule; entries appended before the failure
    /// stay in the ledger until the next run.
    pub async fn run(&mut self, seed: impl Into<Seed>) -> RuleResult<()> {
        self.begin_ledger();
        for value in seed.into().into_values() {
            self.ledger.push(value);
        }
        self.ran = true;

        let Self {
            rules,
            ledger,
            config,
            ..
        } = self;

        for (index, rule) in rules.iter_mut().enumerate() {
            let produced = {
                let ctx = RuleContext::new(ledger, config);
                apply(rule.as_mut(), &ctx).await
            };
            match produced {
                Ok(Some(value)) => ledger.push(value),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Rule {} ({}) failed: {}", index, rule.kind(), e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Process finished: {} rules, {} ledger entries",
            rules.len(),
            ledger.len()
        );
        Ok(())
    }

    /// The whole ledger, in insertion order
    pub fn get_data(&self) -> &[TypedValue] {
        self.ledger.entries()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Append an entry ahead of the next run's seed values
    pub fn add_data(&mut self, entry: TypedValue) {
        self.begin_ledger();
        self.ledger.push(entry);
    }

    pub fn get_input(&self, name: &str) -> Option<&TypedValue> {
        self.ledger.get(name)
    }

    /// Clear the ledger, pre-seeds included. Rules are kept.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.ran = false;
    }

    /// Drop the previous run's entries, keeping pre-seeds added since
    fn begin_ledger(&mut self) {
        if self.ran {
            self.ledger.clear();
            self.ran = false;
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("rules", &self.rules.iter().map(|r| r.kind()).collect::<Vec<_>>())
            .field("ledger", &self.ledger.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LookupOrder;
    use crate::error::RuleError;
    use crate::rules::{MathRule, ReduceOp, ReducerRule};
    use crate::value::Payload;
    use implore_expr::ExprError;

    fn numbers(name: &str, values: &[f64]) -> TypedValue {
        TypedValue::new(name, Payload::Numbers(values.to_vec()))
    }

    #[tokio::test]
    async fn runs_rules_in_order() {
        let mut process = Process::new()
            .with_rule(MathRule::new("x * 2", "doubled").unwrap())
            .with_rule(ReducerRule::new("doubled", "total", ReduceOp::Sum));

        process.run(numbers("x", &[1.0, 2.0, 3.0])).await.unwrap();

        let names: Vec<&str> = process.get_data().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["x", "doubled", "total"]);
        assert_eq!(process.get_input("total").unwrap().value, Payload::Number(12.0));
        assert_eq!(process.rules().len(), 2);
        assert!(process.rule(1).unwrap().output_value().is_some());
    }

    #[tokio::test]
    async fn seeds_flatten_in_order() {
        let mut process = Process::new();
        process
            .run(vec![
                vec![numbers("a", &[1.0])],
                vec![numbers("b", &[2.0]), numbers("c", &[3.0])],
            ])
            .await
            .unwrap();
        let names: Vec<&str> = process.get_data().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn each_run_starts_from_a_fresh_ledger() {
        let mut process = Process::new().with_rule(MathRule::new("x * 10", "y").unwrap());
        process.run(numbers("x", &[1.0])).await.unwrap();
        assert_eq!(process.get_input("y").unwrap().value, Payload::Numbers(vec![10.0]));

        process.run(numbers("x", &[2.0])).await.unwrap();
        assert_eq!(process.get_data().len(), 2);
        assert_eq!(process.get_input("x").unwrap().value, Payload::Numbers(vec![2.0]));
        assert_eq!(process.get_input("y").unwrap().value, Payload::Numbers(vec![20.0]));
        assert_eq!(
            process.rule(0).unwrap().output_value(),
            Some(&Payload::Numbers(vec![20.0]))
        );

        process.reset();
        assert!(process.get_data().is_empty());
    }

    #[tokio::test]
    async fn added_data_seeds_the_next_run_only() {
        let mut process = Process::new().with_rule(MathRule::new("x + offset", "y").unwrap());
        process.add_data(TypedValue::new("offset", Payload::Number(100.0)));
        process.run(numbers("x", &[1.0])).await.unwrap();

        let names: Vec<&str> = process.ledger().names().collect();
        assert_eq!(names, vec!["offset", "x", "y"]);
        assert_eq!(process.get_input("y").unwrap().value, Payload::Numbers(vec![101.0]));

        // The pre-seed belonged to the first run
        let result = process.run(numbers("x", &[1.0])).await;
        assert!(matches!(
            result,
            Err(RuleError::Expression(ExprError::UnknownVariable(name))) if name == "offset"
        ));
        assert!(process.get_input("offset").is_none());
    }

    #[tokio::test]
    async fn last_match_lookup_sees_newest_value() {
        let config = ProcessConfig {
            lookup: LookupOrder::LastMatch,
            ..ProcessConfig::default()
        };
        let mut process = Process::with_config(config);
        process.add_data(numbers("x", &[1.0]));
        process.add_data(numbers("x", &[5.0]));
        assert_eq!(process.get_input("x").unwrap().value, Payload::Numbers(vec![5.0]));
    }

    #[tokio::test]
    async fn failure_stops_the_run() {
        let mut process = Process::new()
            .with_rule(ReducerRule::new("missing", "total", ReduceOp::Sum))
            .with_rule(MathRule::new("x + 1", "y").unwrap());

        let result = process.run(numbers("x", &[1.0])).await;
        assert!(matches!(result, Err(RuleError::InputNotFound { .. })));
        assert_eq!(process.get_data().len(), 1);
        assert!(process.rule(1).unwrap().output_value().is_none());
    }
}
