//! Cross-field invariants that a schema alone can't express.
//!
//! Every check is a pure read over an upgraded, structurally valid config and
//! reports the first violation it finds.

mod backend;
mod combiner;
mod features;
mod hyperopt;
mod preprocessing;
mod trainer;

use serde_json::Value;

use crate::{
    constants::*,
    error::ConfigValidationError,
    metrics::MetricRegistry,
};

pub use backend::{
    check_gbm_feature_types, check_gbm_horovod_incompatibility, check_gbm_single_output_feature,
    check_ray_backend_in_memory_preprocessing,
};
pub use combiner::{
    check_comparator_combiner_requirements, check_sequence_concat_combiner_requirements,
    check_tabtransformer_combiner_requirements,
};
pub use features::{
    check_dependent_features, check_feature_names_unique, check_tied_features_are_valid,
};
pub use hyperopt::{check_hyperopt_metric_targets, check_hyperopt_search_space};
pub use preprocessing::{check_class_balance_preprocessing, check_sampling_exclusivity};
pub use trainer::{check_training_runway, check_validation_metrics_are_valid};

/// The result of a single semantic check.
pub type CheckResult = Result<(), ConfigValidationError>;

/// A semantic check that only needs the config.
pub type Check = fn(&Value) -> CheckResult;

/// The checks run after the metric checks, in order.
pub const CHECKS: &[(&str, Check)] = &[
    ("feature_names_unique", check_feature_names_unique),
    ("tied_features_are_valid", check_tied_features_are_valid),
    ("dependent_features", check_dependent_features),
    ("training_runway", check_training_runway),
    ("gbm_horovod_incompatibility", check_gbm_horovod_incompatibility),
    ("gbm_feature_types", check_gbm_feature_types),
    ("ray_backend_in_memory_preprocessing", check_ray_backend_in_memory_preprocessing),
    ("sequence_concat_combiner_requirements", check_sequence_concat_combiner_requirements),
    ("tabtransformer_combiner_requirements", check_tabtransformer_combiner_requirements),
    ("comparator_combiner_requirements", check_comparator_combiner_requirements),
    ("class_balance_preprocessing", check_class_balance_preprocessing),
    ("sampling_exclusivity", check_sampling_exclusivity),
    ("hyperopt_search_space", check_hyperopt_search_space),
];

/// Runs the whole battery over `config`, stopping at the first violation.
///
/// # Arguments
/// * `config` - An upgraded, structurally valid config.
/// * `registry` - The metric registry used by the metric checks.
pub fn run_all(config: &Value, registry: &dyn MetricRegistry) -> CheckResult {
    check_validation_metrics_are_valid(config, registry)?;

    for (name, check) in CHECKS {
        log::trace!("running check {name}");
        check(config)?;
    }

    check_hyperopt_metric_targets(config, registry)?;
    check_gbm_single_output_feature(config)
}

pub(crate) fn features<'a>(config: &'a Value, section: &str) -> &'a [Value] {
    config
        .get(section)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub(crate) fn all_features(config: &Value) -> impl Iterator<Item = (&'static str, usize, &Value)> {
    [INPUT_FEATURES, OUTPUT_FEATURES].into_iter().flat_map(move |section| {
        features(config, section)
            .iter()
            .enumerate()
            .map(move |(i, feature)| (section, i, feature))
    })
}

pub(crate) fn name_of(feature: &Value) -> &str {
    feature.get(NAME).and_then(Value::as_str).unwrap_or_default()
}

pub(crate) fn type_of(feature: &Value) -> &str {
    feature.get(TYPE).and_then(Value::as_str).unwrap_or_default()
}

pub(crate) fn is_gbm(config: &Value) -> bool {
    config.get(MODEL_TYPE).and_then(Value::as_str) == Some(MODEL_GBM)
}

/// Looks up a dotted path such as `trainer.validation_field`.
pub(crate) fn lookup<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(config, |value, key| value.get(key))
}

/// A value counts as set when it's present, not null, not false and not zero.
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(_) => true,
    }
}
