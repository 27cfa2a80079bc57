use std::collections::BTreeMap;

use serde_json::Value;

use super::{CheckResult, features, is_set, lookup};
use crate::{
    constants::*,
    error::ConfigValidationError,
    metrics::{MetricRegistry, get_feature_to_metric_names_map},
};

/// Checks that `trainer.validation_field` and `trainer.validation_metric` name
/// an output feature (or the combined objective) and one of its metrics.
pub fn check_validation_metrics_are_valid(
    config: &Value,
    registry: &dyn MetricRegistry,
) -> CheckResult {
    let output_features = features(config, OUTPUT_FEATURES);
    let metric_names = get_feature_to_metric_names_map(output_features, registry)?;

    let field = lookup(config, "trainer.validation_field")
        .and_then(Value::as_str)
        .unwrap_or(COMBINED);
    let metric = lookup(config, "trainer.validation_metric")
        .and_then(Value::as_str)
        .unwrap_or(LOSS);

    check_metric_target(
        &metric_names,
        ("trainer.validation_field", field),
        ("trainer.validation_metric", metric),
    )
}

/// Checks a (feature, metric) pair against the feature to metrics map.
pub(super) fn check_metric_target(
    metric_names: &BTreeMap<String, Vec<String>>,
    (field_path, field): (&str, &str),
    (metric_path, metric): (&str, &str),
) -> CheckResult {
    let Some(valid_metrics) = metric_names.get(field) else {
        let available: Vec<&String> = metric_names.keys().collect();
        return Err(ConfigValidationError::new(
            "known validation field",
            format!(
                "the specified {field_path} '{field}' is not an output feature nor '{COMBINED}', \
                 available fields are {available:?}"
            ),
        )
        .at(field_path, Value::from(field)));
    };

    if !valid_metrics.iter().any(|m| m == metric) {
        return Err(ConfigValidationError::new(
            "metric valid for field",
            format!(
                "the specified {metric_path} '{metric}' is not valid for {field_path} '{field}', \
                 available metrics are {valid_metrics:?}"
            ),
        )
        .at(field_path, Value::from(field))
        .at(metric_path, Value::from(metric)));
    }

    Ok(())
}

/// Checks that `checkpoints_per_epoch` and `steps_per_checkpoint` aren't both set.
pub fn check_training_runway(config: &Value) -> CheckResult {
    let per_epoch = lookup(config, "trainer.checkpoints_per_epoch");
    let steps = lookup(config, "trainer.steps_per_checkpoint");

    if is_set(per_epoch) && is_set(steps) {
        return Err(ConfigValidationError::new(
            "checkpoint frequency exclusivity",
            format!("only one of {CHECKPOINTS_PER_EPOCH} and {STEPS_PER_CHECKPOINT} can be set"),
        )
        .at("trainer.checkpoints_per_epoch", per_epoch.cloned().unwrap_or_default())
        .at("trainer.steps_per_checkpoint", steps.cloned().unwrap_or_default()));
    }

    Ok(())
}
