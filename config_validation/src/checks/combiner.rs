use std::collections::HashSet;

use serde_json::Value;

use super::{CheckResult, features, name_of, type_of};
use crate::{
    constants::*,
    error::ConfigValidationError,
};

fn combiner_type(config: &Value) -> Option<&str> {
    config.get(COMBINER).and_then(|c| c.get(TYPE)).and_then(Value::as_str)
}

/// Checks that the sequence concat combiner has at least one sequence input feature.
pub fn check_sequence_concat_combiner_requirements(config: &Value) -> CheckResult {
    if combiner_type(config) != Some(SEQUENCE_CONCAT_COMBINER) {
        return Ok(());
    }

    let inputs = features(config, INPUT_FEATURES);
    if inputs.iter().any(|f| SEQUENCE_FEATURE_TYPES.contains(&type_of(f))) {
        return Ok(());
    }

    let types: Vec<Value> = inputs.iter().map(|f| Value::from(type_of(f))).collect();
    Err(ConfigValidationError::new(
        "sequence concat combiner input",
        format!(
            "the '{SEQUENCE_CONCAT_COMBINER}' combiner needs at least one input feature \
             of type {SEQUENCE_FEATURE_TYPES:?}"
        ),
    )
    .at("combiner.type", Value::from(SEQUENCE_CONCAT_COMBINER))
    .at(format!("{INPUT_FEATURES}[*].{TYPE}"), Value::from(types)))
}

/// Checks that the tabtransformer combiner doesn't disable output reduction.
pub fn check_tabtransformer_combiner_requirements(config: &Value) -> CheckResult {
    if combiner_type(config) != Some(TABTRANSFORMER_COMBINER) {
        return Ok(());
    }

    let reduce_output = config.get(COMBINER).and_then(|c| c.get("reduce_output"));
    if reduce_output.is_some_and(Value::is_null) {
        return Err(ConfigValidationError::new(
            "tabtransformer reduce_output",
            format!(
                "the '{TABTRANSFORMER_COMBINER}' combiner requires combiner.reduce_output to be set"
            ),
        )
        .at("combiner.reduce_output", Value::Null));
    }

    Ok(())
}

/// Checks that both comparator entities only reference existing input features.
pub fn check_comparator_combiner_requirements(config: &Value) -> CheckResult {
    if combiner_type(config) != Some(COMPARATOR_COMBINER) {
        return Ok(());
    }

    let names: HashSet<&str> = features(config, INPUT_FEATURES).iter().map(name_of).collect();

    for entity in ["entity_1", "entity_2"] {
        let path = format!("{COMBINER}.{entity}");
        let members = config.get(COMBINER).and_then(|c| c.get(entity));
        let Some(members) = members.and_then(Value::as_array) else {
            return Err(ConfigValidationError::new(
                "comparator entities",
                format!(
                    "the '{COMPARATOR_COMBINER}' combiner requires {path} to list input \
                     feature names"
                ),
            )
            .at(path, Value::Null));
        };

        let unknown: Vec<Value> = members
            .iter()
            .filter(|m| !m.as_str().is_some_and(|m| names.contains(m)))
            .cloned()
            .collect();

        if !unknown.is_empty() {
            let mut available: Vec<&&str> = names.iter().collect();
            available.sort();
            return Err(ConfigValidationError::new(
                "comparator entities",
                format!(
                    "{path} references features that aren't inputs, available inputs are \
                     {available:?}"
                ),
            )
            .at(path, Value::from(unknown)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(inputs: Value, combiner: Value) -> Value {
        json!({
            "input_features": inputs,
            "output_features": [{"name": "y", "type": "binary"}],
            "combiner": combiner,
        })
    }

    #[test]
    fn test_sequence_concat_needs_sequence_input() {
        let ok = config(
            json!([{"name": "t", "type": "text"}, {"name": "x", "type": "number"}]),
            json!({"type": "sequence_concat"}),
        );
        assert!(check_sequence_concat_combiner_requirements(&ok).is_ok());

        let numeric = json!([{"name": "x", "type": "number"}]);
        let bad = config(numeric, json!({"type": "sequence_concat"}));
        assert!(check_sequence_concat_combiner_requirements(&bad).is_err());

        let other = config(json!([{"name": "x", "type": "number"}]), json!({"type": "concat"}));
        assert!(check_sequence_concat_combiner_requirements(&other).is_ok());
    }

    #[test]
    fn test_tabtransformer_reduce_output() {
        let inputs = json!([{"name": "x", "type": "number"}]);
        let unset = config(inputs.clone(), json!({"type": "tabtransformer"}));
        assert!(check_tabtransformer_combiner_requirements(&unset).is_ok());

        let set = config(inputs.clone(), json!({"type": "tabtransformer", "reduce_output": "sum"}));
        assert!(check_tabtransformer_combiner_requirements(&set).is_ok());

        let null = config(inputs, json!({"type": "tabtransformer", "reduce_output": null}));
        let err = check_tabtransformer_combiner_requirements(&null).unwrap_err();
        assert_eq!(err.paths, vec!["combiner.reduce_output"]);
    }

    #[test]
    fn test_comparator_entities() {
        let inputs = json!([{"name": "a", "type": "number"}, {"name": "b", "type": "number"}]);

        let ok = config(
            inputs.clone(),
            json!({"type": "comparator", "entity_1": ["a"], "entity_2": ["b"]}),
        );
        assert!(check_comparator_combiner_requirements(&ok).is_ok());

        let bad = config(
            inputs.clone(),
            json!({"type": "comparator", "entity_1": ["a"], "entity_2": ["b", "c"]}),
        );
        let err = check_comparator_combiner_requirements(&bad).unwrap_err();
        assert_eq!(err.paths, vec!["combiner.entity_2"]);
        assert_eq!(err.values, vec![json!(["c"])]);

        let missing = config(inputs, json!({"type": "comparator", "entity_1": ["a"]}));
        assert!(check_comparator_combiner_requirements(&missing).is_err());
    }
}
