use serde_json::Value;

use super::{CheckResult, all_features, features, is_gbm, lookup, name_of, type_of};
use crate::{
    constants::*,
    error::ConfigValidationError,
};

/// Checks that a GBM model isn't trained with the horovod distributed backend.
pub fn check_gbm_horovod_incompatibility(config: &Value) -> CheckResult {
    if !is_gbm(config) {
        return Ok(());
    }

    for path in ["backend.type", "backend.trainer.strategy"] {
        if lookup(config, path).and_then(Value::as_str) == Some(HOROVOD) {
            return Err(ConfigValidationError::new(
                "gbm backend compatibility",
                format!("'{MODEL_GBM}' models can't be trained with the '{HOROVOD}' backend"),
            )
            .at(MODEL_TYPE, Value::from(MODEL_GBM))
            .at(path, Value::from(HOROVOD)));
        }
    }

    Ok(())
}

/// Checks that a GBM model only uses tabular feature types.
pub fn check_gbm_feature_types(config: &Value) -> CheckResult {
    if !is_gbm(config) {
        return Ok(());
    }

    for (section, i, feature) in all_features(config) {
        let feature_type = type_of(feature);
        if !GBM_FEATURE_TYPES.contains(&feature_type) {
            return Err(ConfigValidationError::new(
                "gbm tabular features",
                format!(
                    "feature '{}' has type '{feature_type}', '{MODEL_GBM}' models only support \
                     {GBM_FEATURE_TYPES:?}",
                    name_of(feature)
                ),
            )
            .at(format!("{section}[{i}].{TYPE}"), Value::from(feature_type)));
        }
    }

    Ok(())
}

/// Checks that every feature is preprocessed in memory when running on the ray backend.
///
/// Features that leave `in_memory` unset inherit the default, which is in memory.
pub fn check_ray_backend_in_memory_preprocessing(config: &Value) -> CheckResult {
    if lookup(config, "backend.type").and_then(Value::as_str) != Some(RAY) {
        return Ok(());
    }

    let not_in_memory = |preprocessing: Option<&Value>| {
        preprocessing.and_then(|p| p.get(IN_MEMORY)) == Some(&Value::Bool(false))
    };

    for (section, i, feature) in all_features(config) {
        if not_in_memory(feature.get(PREPROCESSING)) {
            return Err(ray_in_memory_error(
                format!("feature '{}'", name_of(feature)),
                format!("{section}[{i}].{PREPROCESSING}.{IN_MEMORY}"),
            ));
        }
    }

    if let Some(Value::Object(defaults)) = config.get(DEFAULTS) {
        for (feature_type, section) in defaults {
            if not_in_memory(section.get(PREPROCESSING)) {
                return Err(ray_in_memory_error(
                    format!("defaults for '{feature_type}' features"),
                    format!("{DEFAULTS}.{feature_type}.{PREPROCESSING}.{IN_MEMORY}"),
                ));
            }
        }
    }

    Ok(())
}

fn ray_in_memory_error(what: String, path: String) -> ConfigValidationError {
    ConfigValidationError::new(
        "ray in-memory preprocessing",
        format!("{what} must be preprocessed in memory when using the '{RAY}' backend"),
    )
    .at(path, Value::Bool(false))
}

/// Checks that a GBM model predicts exactly one output feature.
pub fn check_gbm_single_output_feature(config: &Value) -> CheckResult {
    if !is_gbm(config) {
        return Ok(());
    }

    let output_features = features(config, OUTPUT_FEATURES);
    if output_features.len() != 1 {
        let names: Vec<Value> = output_features.iter().map(|f| Value::from(name_of(f))).collect();
        return Err(ConfigValidationError::new(
            "gbm single output feature",
            format!(
                "'{MODEL_GBM}' models support exactly one output feature, got {}",
                output_features.len()
            ),
        )
        .at(OUTPUT_FEATURES, Value::from(names)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gbm(inputs: Value, outputs: Value) -> Value {
        json!({"model_type": "gbm", "input_features": inputs, "output_features": outputs})
    }

    #[test]
    fn test_gbm_rejects_horovod() {
        let mut config = gbm(json!([]), json!([]));
        config["backend"] = json!({"type": "ray", "trainer": {"strategy": "horovod"}});
        let err = check_gbm_horovod_incompatibility(&config).unwrap_err();
        assert_eq!(err.paths[1], "backend.trainer.strategy");

        config["backend"] = json!({"type": "ray"});
        assert!(check_gbm_horovod_incompatibility(&config).is_ok());

        config["model_type"] = json!("ecd");
        config["backend"] = json!({"type": "horovod"});
        assert!(check_gbm_horovod_incompatibility(&config).is_ok());
    }

    #[test]
    fn test_gbm_feature_types() {
        let output = json!([{"name": "y", "type": "binary"}]);
        let ok = gbm(
            json!([{"name": "x", "type": "number"}, {"name": "c", "type": "category"}]),
            output.clone(),
        );
        assert!(check_gbm_feature_types(&ok).is_ok());

        let text = gbm(json!([{"name": "t", "type": "text"}]), output);
        let err = check_gbm_feature_types(&text).unwrap_err();
        assert_eq!(err.paths, vec!["input_features[0].type"]);
    }

    #[test]
    fn test_ray_in_memory() {
        let config = json!({
            "backend": {"type": "ray"},
            "input_features": [
                {"name": "x", "type": "number", "preprocessing": {"in_memory": true}}
            ],
            "output_features": [{"name": "y", "type": "binary"}],
        });
        assert!(check_ray_backend_in_memory_preprocessing(&config).is_ok());

        let mut lazy = config.clone();
        lazy["output_features"][0]["preprocessing"] = json!({"in_memory": false});
        let err = check_ray_backend_in_memory_preprocessing(&lazy).unwrap_err();
        assert_eq!(err.paths, vec!["output_features[0].preprocessing.in_memory"]);

        let mut lazy_defaults = config.clone();
        lazy_defaults["defaults"] = json!({"image": {"preprocessing": {"in_memory": false}}});
        assert!(check_ray_backend_in_memory_preprocessing(&lazy_defaults).is_err());

        lazy["backend"] = json!({"type": "local"});
        assert!(check_ray_backend_in_memory_preprocessing(&lazy).is_ok());
    }

    #[test]
    fn test_gbm_single_output() {
        let two = gbm(
            json!([]),
            json!([{"name": "a", "type": "binary"}, {"name": "b", "type": "binary"}]),
        );
        let err = check_gbm_single_output_feature(&two).unwrap_err();
        assert_eq!(err.values, vec![json!(["a", "b"])]);

        let one = gbm(json!([]), json!([{"name": "a", "type": "binary"}]));
        assert!(check_gbm_single_output_feature(&one).is_ok());
    }
}
