use log::{debug, warn};
use serde_json::{Map, Value, json};

use crate::{
    constants::*,
    error::UpgradeError,
};

/// Normalizes a config written for an older version into the latest shape.
///
/// Implementations must be pure and idempotent: upgrading an already current
/// config returns it unchanged.
pub trait ConfigUpgrader: Send + Sync {
    fn upgrade(&self, config: &Value) -> Result<Value, UpgradeError>;
}

/// Upgrades the legacy section and key names still found in older configs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultUpgrader;

const LEGACY_TRAINER: &str = "training";
const LEGACY_NUMBER: &str = "numerical";
const LEGACY_FORCE_SPLIT: &str = "force_split";
const LEGACY_SPLIT_PROBABILITIES: &str = "split_probabilities";
const LEGACY_STRATIFY: &str = "stratify";
const LEGACY_SAMPLER: &str = "sampler";

impl ConfigUpgrader for DefaultUpgrader {
    fn upgrade(&self, config: &Value) -> Result<Value, UpgradeError> {
        let Value::Object(config) = config else {
            return Err(UpgradeError(format!("config must be a mapping, got {config}")));
        };

        let mut config = config.clone();
        upgrade_trainer_section(&mut config)?;

        for section in [INPUT_FEATURES, OUTPUT_FEATURES] {
            if let Some(Value::Array(features)) = config.get_mut(section) {
                features.iter_mut().for_each(upgrade_feature_type);
            }
        }

        if let Some(Value::Object(preprocessing)) = config.get_mut(PREPROCESSING) {
            upgrade_split(preprocessing);
        }

        if let Some(Value::Object(hyperopt)) = config.get_mut(HYPEROPT) {
            upgrade_sampler(hyperopt)?;
        }

        Ok(Value::Object(config))
    }
}

/// Upgrades `config` with the default upgrader.
pub fn upgrade_config_dict_to_latest_version(config: &Value) -> Result<Value, UpgradeError> {
    DefaultUpgrader.upgrade(config)
}

fn upgrade_trainer_section(config: &mut Map<String, Value>) -> Result<(), UpgradeError> {
    if let Some(legacy) = config.remove(LEGACY_TRAINER) {
        match config.get(TRAINER) {
            Some(current) if *current != legacy => {
                return Err(UpgradeError(format!(
                    "both '{LEGACY_TRAINER}' and '{TRAINER}' sections are present \
                     with different contents"
                )));
            }
            Some(_) => {}
            None => {
                debug!("renaming legacy '{LEGACY_TRAINER}' section to '{TRAINER}'");
                config.insert(TRAINER.to_string(), legacy);
            }
        }
    }

    if let Some(Value::Object(trainer)) = config.get_mut(TRAINER) {
        if trainer.get("eval_batch_size") == Some(&json!(0)) {
            trainer.insert("eval_batch_size".to_string(), Value::Null);
        }
    }

    Ok(())
}

fn upgrade_feature_type(feature: &mut Value) {
    if let Some(feature_type) = feature.get_mut(TYPE) {
        if *feature_type == LEGACY_NUMBER {
            *feature_type = Value::from(NUMBER);
        }
    }
}

fn upgrade_split(preprocessing: &mut Map<String, Value>) {
    let force_split = preprocessing.remove(LEGACY_FORCE_SPLIT);
    let probabilities = preprocessing.remove(LEGACY_SPLIT_PROBABILITIES);
    let stratify = preprocessing.remove(LEGACY_STRATIFY).filter(|s| !s.is_null());

    if force_split.is_none() && probabilities.is_none() && stratify.is_none() {
        return;
    }

    if preprocessing.contains_key(SPLIT) {
        warn!("ignoring legacy split options, '{PREPROCESSING}.{SPLIT}' is already set");
        return;
    }

    let force_split = force_split.and_then(|v| v.as_bool()).unwrap_or(false);
    let mut split = Map::new();

    if let Some(probabilities) = probabilities {
        split.insert("probabilities".to_string(), probabilities);
    }

    match stratify {
        Some(column) => {
            split.insert(TYPE.to_string(), Value::from("stratify"));
            split.insert("column".to_string(), column);
        }
        None if force_split || split.contains_key("probabilities") => {
            split.insert(TYPE.to_string(), Value::from("random"));
        }
        None => {
            split.insert(TYPE.to_string(), Value::from("fixed"));
        }
    }

    preprocessing.insert(SPLIT.to_string(), Value::Object(split));
}

fn upgrade_sampler(hyperopt: &mut Map<String, Value>) -> Result<(), UpgradeError> {
    let Some(sampler) = hyperopt.remove(LEGACY_SAMPLER) else {
        return Ok(());
    };

    let Value::Object(mut sampler) = sampler else {
        return Err(UpgradeError(format!("'{HYPEROPT}.{LEGACY_SAMPLER}' must be a mapping")));
    };

    if let Some(search_alg) = sampler.remove("search_alg") {
        hyperopt.entry("search_alg").or_insert(search_alg);
    }

    let executor = hyperopt
        .entry("executor")
        .or_insert_with(|| Value::Object(Map::new()));

    let Value::Object(executor) = executor else {
        return Err(UpgradeError(format!("'{HYPEROPT}.executor' must be a mapping")));
    };

    for key in ["num_samples", "scheduler"] {
        if let Some(value) = sampler.remove(key) {
            executor.entry(key).or_insert(value);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renames_legacy_sections_and_types() {
        let config = json!({
            "input_features": [{"name": "x", "type": "numerical"}],
            "output_features": [{"name": "y", "type": "binary"}],
            "training": {"epochs": 3, "eval_batch_size": 0},
        });

        let upgraded = DefaultUpgrader.upgrade(&config).unwrap();
        assert_eq!(upgraded["input_features"][0]["type"], "number");
        assert_eq!(upgraded["trainer"]["epochs"], 3);
        assert!(upgraded["trainer"]["eval_batch_size"].is_null());
        assert!(upgraded.get("training").is_none());
    }

    #[test]
    fn test_migrates_legacy_split_options() {
        let config = json!({
            "preprocessing": {"force_split": true, "split_probabilities": [0.8, 0.1, 0.1]},
        });
        let upgraded = DefaultUpgrader.upgrade(&config).unwrap();
        assert_eq!(
            upgraded["preprocessing"]["split"],
            json!({"type": "random", "probabilities": [0.8, 0.1, 0.1]})
        );

        let config = json!({"preprocessing": {"stratify": "label"}});
        let upgraded = DefaultUpgrader.upgrade(&config).unwrap();
        let expected = json!({"type": "stratify", "column": "label"});
        assert_eq!(upgraded["preprocessing"]["split"], expected);

        let config = json!({"preprocessing": {"force_split": false}});
        let upgraded = DefaultUpgrader.upgrade(&config).unwrap();
        assert_eq!(upgraded["preprocessing"]["split"]["type"], "fixed");
    }

    #[test]
    fn test_moves_sampler_into_executor() {
        let config = json!({
            "hyperopt": {"sampler": {"num_samples": 10, "search_alg": {"type": "hyperopt"}}},
        });
        let upgraded = DefaultUpgrader.upgrade(&config).unwrap();
        assert_eq!(upgraded["hyperopt"]["executor"]["num_samples"], 10);
        assert_eq!(upgraded["hyperopt"]["search_alg"]["type"], "hyperopt");
        assert!(upgraded["hyperopt"].get("sampler").is_none());
    }

    #[test]
    fn test_conflicting_trainer_sections_fail() {
        let config = json!({"training": {"epochs": 1}, "trainer": {"epochs": 2}});
        assert!(DefaultUpgrader.upgrade(&config).is_err());
    }

    #[test]
    fn test_rejects_non_mapping() {
        assert!(DefaultUpgrader.upgrade(&json!([1, 2])).is_err());
    }
}
