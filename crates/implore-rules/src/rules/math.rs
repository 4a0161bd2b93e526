//! Math rule: evaluate an expression over ledger variables
//!
//! Every ledger name that occurs as an identifier in the expression is bound.
//! Scalars bind once; arrays are iterated elementwise, so all bound arrays
//! must share one length. With no arrays bound the result is a single number.

use async_trait::async_trait;
use implore_expr::{compile, CompiledExpr};
use implore_scene::parse_number;
use std::collections::{BTreeMap, HashSet};

use crate::error::{describe_types, RuleError, RuleResult};
use crate::rule::{Rule, RuleContext, RuleCore, RuleKind, RuleOutput};
use crate::value::{Payload, Reference, TypedValue, ValueType};

/// Types a bound variable may have
const BINDABLE: &[ValueType] = &[
    ValueType::Number,
    ValueType::Numbers,
    ValueType::Boolean,
    ValueType::Booleans,
    ValueType::String,
    ValueType::Strings,
];

#[derive(Debug, Clone)]
pub struct MathRule {
    core: RuleCore,
    expression: CompiledExpr,
    bound: Vec<String>,
}

impl MathRule {
    /// Compile `expression`; syntax errors surface here rather than at run time.
    pub fn new(expression: &str, output: impl Into<String>) -> RuleResult<Self> {
        Ok(Self {
            core: RuleCore::output_only(output),
            expression: compile(expression)?,
            bound: Vec::new(),
        })
    }

    pub fn expression(&self) -> &str {
        self.expression.source()
    }

    /// Names bound during the last run, in ledger order
    pub fn bound_variables(&self) -> &[String] {
        &self.bound
    }
}

enum Binding {
    Scalar(f64),
    Array(Vec<f64>),
}

fn bind(entry: &TypedValue) -> RuleResult<Binding> {
    let parse = |text: &str| {
        parse_number(text).ok_or_else(|| RuleError::NotNumeric {
            name: entry.name.clone(),
            value: text.to_string(),
        })
    };
    let flag = |b: bool| if b { 1.0 } else { 0.0 };

    let binding = match &entry.value {
        Payload::Number(n) => Binding::Scalar(*n),
        Payload::Boolean(b) => Binding::Scalar(flag(*b)),
        Payload::String(s) => Binding::Scalar(parse(s)?),
        Payload::Numbers(v) => Binding::Array(v.clone()),
        Payload::Booleans(v) => Binding::Array(v.iter().copied().map(flag).collect()),
        Payload::Strings(v) => Binding::Array(v.iter().map(|s| parse(s)).collect::<RuleResult<_>>()?),
        other => {
            return Err(RuleError::InvalidInputType {
                rule: RuleKind::Math,
                name: entry.name.clone(),
                actual: other.value_type(),
                expected: describe_types(BINDABLE),
            })
        }
    };
    Ok(binding)
}

#[async_trait]
impl Rule for MathRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Math
    }

    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RuleCore {
        &mut self.core
    }

    fn allowed_input_types(&self) -> &'static [ValueType] {
        BINDABLE
    }

    fn reads_primary_input(&self) -> bool {
        false
    }

    async fn transform(
        &mut self,
        _input: Option<&TypedValue>,
        ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput> {
        self.bound.clear();
        let source = self.expression.source();

        let mut scope: BTreeMap<String, f64> = BTreeMap::new();
        let mut arrays: Vec<(&str, Vec<f64>, &Reference)> = Vec::new();
        let mut seen = HashSet::new();

        for candidate in ctx.ledger.iter() {
            let name = candidate.name.as_str();
            if name.chars().any(char::is_whitespace) {
                if source.contains(name) {
                    return Err(RuleError::NamingConflict {
                        name: name.to_string(),
                    });
                }
                continue;
            }
            if !self.expression.references(name) || !seen.insert(name) {
                continue;
            }

            // Duplicated names bind the entry the lookup policy selects
            let entry = ctx.ledger.get(name).unwrap_or(candidate);
            match bind(entry)? {
                Binding::Scalar(value) => {
                    scope.insert(name.to_string(), value);
                }
                Binding::Array(values) => arrays.push((name, values, &entry.reference)),
            }
            self.bound.push(name.to_string());
        }

        let Some(len) = arrays.first().map(|(_, values, _)| values.len()) else {
            return Ok(RuleOutput::new(Payload::Number(self.expression.evaluate(&scope)?)));
        };
        for (name, values, _) in &arrays {
            if values.len() != len {
                return Err(RuleError::ArrayLengthMismatch {
                    name: name.to_string(),
                    expected: len,
                    actual: values.len(),
                });
            }
        }

        let mut results = Vec::with_capacity(len);
        for index in 0..len {
            for (name, values, _) in &arrays {
                scope.insert(name.to_string(), values[index]);
            }
            results.push(self.expression.evaluate(&scope)?);
        }

        // Provenance comes from the first bound array that has one per element
        let reference = arrays
            .iter()
            .find(|(_, _, reference)| matches!(reference, Reference::Many(r) if r.len() == len))
            .map(|(_, _, reference)| (*reference).clone())
            .unwrap_or_default();

        Ok(RuleOutput::new(Payload::Numbers(results)).with_reference(reference))
    }
}
