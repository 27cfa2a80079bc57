use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    constants::*,
    error::ConfigValidationError,
};

/// Feature-type keyed registry of the metrics an output feature reports.
pub trait MetricRegistry: Send + Sync {
    /// Returns the metric names registered for `feature_type`, if the type is known.
    fn metric_names(&self, feature_type: &str) -> Option<&[&'static str]>;
}

/// The metrics of the built-in output feature types.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMetricRegistry;

const BINARY_METRICS: &[&str] = &[
    LOSS,
    "accuracy",
    "precision",
    "recall",
    "roc_auc",
    "specificity",
];
const CATEGORY_METRICS: &[&str] = &[LOSS, "accuracy", "hits_at_k", "roc_auc"];
const NUMBER_METRICS: &[&str] = &[
    LOSS,
    "mean_squared_error",
    "mean_absolute_error",
    "root_mean_squared_error",
    "root_mean_squared_percentage_error",
    "r2",
];
const SEQUENCE_METRICS: &[&str] = &[
    LOSS,
    "token_accuracy",
    "sequence_accuracy",
    "last_accuracy",
    "perplexity",
    "edit_distance",
];
const SET_METRICS: &[&str] = &[LOSS, "jaccard"];
const VECTOR_METRICS: &[&str] = &[LOSS, "mean_squared_error", "mean_absolute_error", "r2"];

impl MetricRegistry for DefaultMetricRegistry {
    fn metric_names(&self, feature_type: &str) -> Option<&[&'static str]> {
        Some(match feature_type {
            BINARY => BINARY_METRICS,
            CATEGORY => CATEGORY_METRICS,
            NUMBER => NUMBER_METRICS,
            SEQUENCE | TEXT => SEQUENCE_METRICS,
            SET => SET_METRICS,
            VECTOR => VECTOR_METRICS,
            _ => return None,
        })
    }
}

/// Maps every output feature name to the metrics valid for it.
///
/// The combined objective is added as a synthetic entry that only reports the loss.
///
/// # Arguments
/// * `output_features` - The `output_features` list of an upgraded config.
/// * `registry` - Where to look up the metrics of each feature type.
///
/// # Returns
/// The name to metrics map, or an error naming an output feature whose type
/// has no registered metrics.
pub fn get_feature_to_metric_names_map(
    output_features: &[Value],
    registry: &dyn MetricRegistry,
) -> Result<BTreeMap<String, Vec<String>>, ConfigValidationError> {
    let mut metric_names = BTreeMap::new();

    for (i, feature) in output_features.iter().enumerate() {
        let name = feature.get(NAME).and_then(Value::as_str).unwrap_or_default();
        let feature_type = feature.get(TYPE).and_then(Value::as_str).unwrap_or_default();

        let Some(metrics) = registry.metric_names(feature_type) else {
            return Err(ConfigValidationError::new(
                "registered output feature type",
                format!(
                    "output feature '{name}' has type '{feature_type}' which has no registered \
                     metrics"
                ),
            )
            .at(format!("{OUTPUT_FEATURES}[{i}].{TYPE}"), Value::from(feature_type)));
        };

        metric_names.insert(name.to_string(), metrics.iter().map(|m| m.to_string()).collect());
    }

    metric_names.insert(COMBINED.to_string(), vec![LOSS.to_string()]);
    Ok(metric_names)
}
