//! The rule contract
//!
//! Rules are pipeline stages. Each one names an input variable, an output
//! variable, and the set of input types it accepts. [`apply`] is the single
//! entry point that validates a rule's input against the ledger, calls its
//! [`Rule::transform`], and records the produced value on the rule.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ProcessConfig;
use crate::error::{describe_types, RuleError, RuleResult};
use crate::ledger::Ledger;
use crate::value::{Payload, Reference, TypedValue, ValueType};

/// Rule variant, used in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Filter,
    Extract,
    Math,
    Reducer,
    Traverse,
    WriteProperty,
    NormalDistance,
    SubProcess,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Filter => "filter",
            RuleKind::Extract => "extract",
            RuleKind::Math => "math",
            RuleKind::Reducer => "reducer",
            RuleKind::Traverse => "traverse",
            RuleKind::WriteProperty => "write-property",
            RuleKind::NormalDistance => "normal-distance",
            RuleKind::SubProcess => "sub-process",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value produced by a transform, before it is named
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutput {
    pub value: Payload,
    pub reference: Reference,
}

impl RuleOutput {
    pub fn new(value: Payload) -> Self {
        Self {
            value,
            reference: Reference::None,
        }
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }
}

/// Naming and last-output state shared by every rule
#[derive(Debug, Clone, Default)]
pub struct RuleCore {
    pub input_var_name: Option<String>,
    /// Second input, for binary rules
    pub input_var_name2: Option<String>,
    pub output_var_name: String,
    /// Overrides `ProcessConfig::strict_input_types` when set
    pub strict: Option<bool>,
    output: Option<TypedValue>,
    output_summary: Option<String>,
}

impl RuleCore {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input_var_name: Some(input.into()),
            output_var_name: output.into(),
            ..Self::default()
        }
    }

    /// Core for rules that bind inputs themselves
    pub fn output_only(output: impl Into<String>) -> Self {
        Self {
            output_var_name: output.into(),
            ..Self::default()
        }
    }

    pub fn with_second_input(mut self, name: impl Into<String>) -> Self {
        self.input_var_name2 = Some(name.into());
        self
    }

    pub fn output(&self) -> Option<&TypedValue> {
        self.output.as_ref()
    }

    pub fn output_type(&self) -> Option<ValueType> {
        self.output.as_ref().map(TypedValue::value_type)
    }

    pub fn output_value(&self) -> Option<&Payload> {
        self.output.as_ref().map(|o| &o.value)
    }

    pub fn output_reference(&self) -> Option<&Reference> {
        self.output.as_ref().map(|o| &o.reference)
    }

    pub fn output_summary(&self) -> Option<&str> {
        self.output_summary.as_deref()
    }

    fn clear_output(&mut self) {
        self.output = None;
        self.output_summary = None;
    }

    fn record(&mut self, output: TypedValue, summary: String) {
        self.output = Some(output);
        self.output_summary = Some(summary);
    }
}

/// What a rule may read while transforming
pub struct RuleContext<'a> {
    pub ledger: &'a Ledger,
    pub config: &'a ProcessConfig,
}

impl<'a> RuleContext<'a> {
    pub fn new(ledger: &'a Ledger, config: &'a ProcessConfig) -> Self {
        Self { ledger, config }
    }
}

/// A pipeline stage
#[async_trait]
pub trait Rule: Send + Sync {
    fn kind(&self) -> RuleKind;

    fn core(&self) -> &RuleCore;

    fn core_mut(&mut self) -> &mut RuleCore;

    /// Types accepted as the primary input
    fn allowed_input_types(&self) -> &'static [ValueType];

    /// Whether [`apply`] should resolve and type-check `input_var_name`.
    fn reads_primary_input(&self) -> bool {
        true
    }

    /// Produce this rule's output. `input` is the validated primary input,
    /// or `None` for rules that do not read one.
    async fn transform(
        &mut self,
        input: Option<&TypedValue>,
        ctx: &RuleContext<'_>,
    ) -> RuleResult<RuleOutput>;

    fn summarize(&self, output: &RuleOutput) -> String {
        output.value.summary()
    }

    /// Override the process-wide strictness for this rule
    fn strict(mut self, strict: bool) -> Self
    where
        Self: Sized,
    {
        self.core_mut().strict = Some(strict);
        self
    }

    fn output_type(&self) -> Option<ValueType> {
        self.core().output_type()
    }

    fn output_value(&self) -> Option<&Payload> {
        self.core().output_value()
    }

    fn output_reference(&self) -> Option<&Reference> {
        self.core().output_reference()
    }

    fn output_summary(&self) -> Option<&str> {
        self.core().output_summary()
    }
}

/// Run one rule against the ledger.
///
/// Returns `Ok(None)` when a lenient rule skipped a mistyped input; nothing
/// should be appended in that case.
pub async fn apply(rule: &mut dyn Rule, ctx: &RuleContext<'_>) -> RuleResult<Option<TypedValue>> {
    let kind = rule.kind();
    rule.core_mut().clear_output();

    let output_name = rule.core().output_var_name.trim().to_string();
    if output_name.is_empty() {
        return Err(RuleError::MissingOutputName { rule: kind });
    }

    let input = if rule.reads_primary_input() {
        let name = rule
            .core()
            .input_var_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(RuleError::MissingInputName { rule: kind })?
            .to_string();
        let input = ctx
            .ledger
            .get(&name)
            .ok_or_else(|| RuleError::InputNotFound { name: name.clone() })?;

        let actual = input.value_type();
        let allowed = rule.allowed_input_types();
        if !allowed.contains(&actual) {
            if rule.core().strict.unwrap_or(ctx.config.strict_input_types) {
                return Err(RuleError::InvalidInputType {
                    rule: kind,
                    name,
                    actual,
                    expected: describe_types(allowed),
                });
            }
            tracing::warn!("Skipping {} rule: '{}' has type {}", kind, name, actual);
            return Ok(None);
        }
        Some(input)
    } else {
        None
    };

    tracing::debug!("Running {} rule into '{}'", kind, output_name);
    let output = rule.transform(input, ctx).await?;
    check_reference_shape(&output_name, &output)?;

    let summary = rule.summarize(&output);
    tracing::debug!("{} rule produced '{}': {}", kind, output_name, summary);

    let value = TypedValue {
        name: output_name,
        value: output.value,
        reference: output.reference,
    };
    rule.core_mut().record(value.clone(), summary);
    Ok(Some(value))
}

/// A collection carrying a reference list must carry one per element.
fn check_reference_shape(name: &str, output: &RuleOutput) -> RuleResult<()> {
    if let (Some(values), Reference::Many(references)) = (output.value.len(), &output.reference) {
        if values != references.len() {
            return Err(RuleError::ShapeMismatch {
                name: name.to_string(),
                values,
                references: references.len(),
            });
        }
    }
    Ok(())
}
