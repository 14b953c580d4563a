use serde_json::Value;

use super::{EvaluationContext, EvaluationResult, FlagDefinition, FlagValue, Reason};
use crate::rules::{json_type_name, RuleEvaluator};
use crate::store::FlagStore;

/// Evaluates flags fetched from a [`FlagStore`] against caller context.
///
/// Holds no state of its own: every call fetches and validates the flag again.
/// Evaluation never fails; anything that goes wrong is reported as
/// [`Reason::Error`] alongside the caller's default value.
pub struct FlagEvaluator<S, R> {
    store: S,
    rules: R,
}

impl<S: FlagStore, R: RuleEvaluator> FlagEvaluator<S, R> {
    pub fn new(store: S, rules: R) -> Self {
        Self { store, rules }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn boolean_evaluation(
        &self,
        flag_name: &str,
        default_value: bool,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<bool> {
        self.evaluate(flag_name, default_value, context).await
    }

    pub async fn string_evaluation(
        &self,
        flag_name: &str,
        default_value: String,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<String> {
        self.evaluate(flag_name, default_value, context).await
    }

    pub async fn integer_evaluation(
        &self,
        flag_name: &str,
        default_value: i64,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<i64> {
        self.evaluate(flag_name, default_value, context).await
    }

    pub async fn float_evaluation(
        &self,
        flag_name: &str,
        default_value: f64,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<f64> {
        self.evaluate(flag_name, default_value, context).await
    }

    pub async fn object_evaluation(
        &self,
        flag_name: &str,
        default_value: Value,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<Value> {
        self.evaluate(flag_name, default_value, context).await
    }

    /// Evaluate a flag as `T`, falling back to `default_value` on any error.
    pub async fn evaluate<T: FlagValue>(
        &self,
        flag_name: &str,
        default_value: T,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<T> {
        tracing::info!(flag = flag_name, kind = %T::KIND, "Starting flag evaluation");

        let result = self.resolve(flag_name, default_value, context).await;

        if result.reason == Reason::Error {
            tracing::error!(flag = flag_name, value = ?result.value, "Flag evaluation failed, returning default value");
        } else {
            tracing::info!(
                flag = flag_name,
                value = ?result.value,
                variant = ?result.variant,
                reason = %result.reason,
                "Flag evaluated successfully"
            );
        }
        tracing::debug!(flag = flag_name, "Finalizing flag evaluation");

        result
    }

    async fn resolve<T: FlagValue>(
        &self,
        flag_name: &str,
        default_value: T,
        context: Option<&EvaluationContext>,
    ) -> EvaluationResult<T> {
        if flag_name.is_empty() {
            tracing::error!("Flag name is empty");
            return EvaluationResult::error(default_value);
        }

        // Step 1: Lookup
        let flag = match self.store.find_by_name(flag_name).await {
            Ok(Some(flag)) => flag,
            Ok(None) => {
                tracing::warn!(flag = flag_name, "Flag not found");
                return EvaluationResult::error(default_value);
            }
            Err(e) => {
                tracing::error!(flag = flag_name, error = %e, "Failed to fetch flag");
                return EvaluationResult::error(default_value);
            }
        };

        // Step 2: Validate
        if let Err(invalid) = flag.validate() {
            tracing::warn!(flag = flag_name, reason = %invalid, "Flag cannot be evaluated");
            return EvaluationResult::error(default_value);
        }

        // Step 3: Static unless there is both a rule and a context to apply it to
        let context = context.filter(|c| !c.is_empty());
        match (flag.targeting_rule(), context) {
            (Some(rule), Some(context)) => {
                self.evaluate_dynamic(&flag, rule, context, default_value)
            }
            _ => evaluate_static(&flag, default_value),
        }
    }

    fn evaluate_dynamic<T: FlagValue>(
        &self,
        flag: &FlagDefinition,
        rule: &str,
        context: &EvaluationContext,
        default_value: T,
    ) -> EvaluationResult<T> {
        let data = context.to_rule_data();
        let outcome = match self.rules.apply(rule, &data) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(flag = %flag.name, error = %e, "Error evaluating flag targeting");
                return EvaluationResult::error(default_value);
            }
        };

        if outcome.is_null() {
            tracing::warn!(
                flag = %flag.name,
                targeting = rule,
                context = %data,
                "Targeting evaluated to null, using default variant"
            );
            return match flag.default_variant_entry() {
                Some((key, raw)) => match convert_variant::<T>(flag, raw) {
                    Some(value) => EvaluationResult::default_value(value, key),
                    None => EvaluationResult::error(default_value),
                },
                None => EvaluationResult::error(default_value),
            };
        }

        let Some(variant) = variant_key(&outcome) else {
            tracing::error!(
                flag = %flag.name,
                result_type = json_type_name(&outcome),
                "Targeting did not evaluate to a scalar"
            );
            return EvaluationResult::error(default_value);
        };

        let Some(raw) = flag.variants.get(&variant) else {
            tracing::error!(flag = %flag.name, variant = %variant, "Variant not found");
            return EvaluationResult::error(default_value);
        };

        match convert_variant::<T>(flag, raw) {
            Some(value) => EvaluationResult::targeting_match(value, variant),
            None => EvaluationResult::error(default_value),
        }
    }
}

fn evaluate_static<T: FlagValue>(flag: &FlagDefinition, default_value: T) -> EvaluationResult<T> {
    flag.default_variant_entry()
        .and_then(|(_, raw)| convert_variant::<T>(flag, raw))
        .map(EvaluationResult::static_value)
        .unwrap_or_else(|| EvaluationResult::error(default_value))
}

fn convert_variant<T: FlagValue>(flag: &FlagDefinition, raw: &Value) -> Option<T> {
    match T::convert(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(flag = %flag.name, error = %e, "Error converting variant value");
            None
        }
    }
}

/// Variant key named by a rule result: strings verbatim, numbers and booleans
/// by their JSON text. Arrays and objects cannot name a variant.
fn variant_key(outcome: &Value) -> Option<String> {
    match outcome {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
