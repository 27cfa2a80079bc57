use serde_json::Value;

use super::{CheckResult, features, is_set, lookup, name_of, type_of};
use crate::{
    constants::*,
    error::ConfigValidationError,
};

const OVERSAMPLE_PATH: &str = "preprocessing.oversample_minority";
const UNDERSAMPLE_PATH: &str = "preprocessing.undersample_majority";

/// Checks that class balancing is only requested for a single binary output feature.
pub fn check_class_balance_preprocessing(config: &Value) -> CheckResult {
    let Some((path, value)) = [OVERSAMPLE_PATH, UNDERSAMPLE_PATH]
        .into_iter()
        .find_map(|path| lookup(config, path).filter(|v| is_set(Some(v))).map(|v| (path, v)))
    else {
        return Ok(());
    };

    let outputs = features(config, OUTPUT_FEATURES);
    if outputs.len() != 1 {
        return Err(ConfigValidationError::new(
            "class balancing single output",
            format!(
                "{path} is only available with exactly one output feature, got {}",
                outputs.len()
            ),
        )
        .at(path, value.clone()));
    }

    let output = &outputs[0];
    if type_of(output) != BINARY {
        return Err(ConfigValidationError::new(
            "class balancing binary output",
            format!(
                "{path} is only available for '{BINARY}' output features, '{}' is '{}'",
                name_of(output),
                type_of(output)
            ),
        )
        .at(path, value.clone())
        .at(format!("{OUTPUT_FEATURES}[0].{TYPE}"), Value::from(type_of(output))));
    }

    Ok(())
}

/// Checks that minority oversampling and majority undersampling aren't both requested.
pub fn check_sampling_exclusivity(config: &Value) -> CheckResult {
    let oversample = lookup(config, OVERSAMPLE_PATH);
    let undersample = lookup(config, UNDERSAMPLE_PATH);

    if is_set(oversample) && is_set(undersample) {
        return Err(ConfigValidationError::new(
            "sampling exclusivity",
            format!("{OVERSAMPLE_MINORITY} and {UNDERSAMPLE_MAJORITY} are mutually exclusive"),
        )
        .at(OVERSAMPLE_PATH, oversample.cloned().unwrap_or_default())
        .at(UNDERSAMPLE_PATH, undersample.cloned().unwrap_or_default()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(outputs: Value, preprocessing: Value) -> Value {
        json!({
            "input_features": [{"name": "x", "type": "number"}],
            "output_features": outputs,
            "preprocessing": preprocessing,
        })
    }

    #[test]
    fn test_class_balance_needs_one_binary_output() {
        let one = json!([{"name": "y", "type": "binary"}]);
        let oversampled = config(one.clone(), json!({"oversample_minority": 0.5}));
        assert!(check_class_balance_preprocessing(&oversampled).is_ok());
        assert!(check_class_balance_preprocessing(&config(one, json!({}))).is_ok());

        let two = json!([{"name": "y", "type": "binary"}, {"name": "z", "type": "binary"}]);
        let undersampled = config(two, json!({"undersample_majority": 0.5}));
        let err = check_class_balance_preprocessing(&undersampled).unwrap_err();
        assert_eq!(err.paths, vec![UNDERSAMPLE_PATH]);

        let numeric = json!([{"name": "y", "type": "number"}]);
        let numeric = config(numeric, json!({"oversample_minority": 0.5}));
        assert!(check_class_balance_preprocessing(&numeric).is_err());
    }

    #[test]
    fn test_sampling_exclusivity() {
        let one = json!([{"name": "y", "type": "binary"}]);
        let both = config(
            one.clone(),
            json!({"oversample_minority": 0.5, "undersample_majority": 0.5}),
        );
        assert!(check_sampling_exclusivity(&both).is_err());

        let one_null = config(
            one,
            json!({"oversample_minority": 0.5, "undersample_majority": null}),
        );
        assert!(check_sampling_exclusivity(&one_null).is_ok());
    }
}
