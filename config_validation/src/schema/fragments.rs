use serde_json::{Map, Value, json};

use super::ModelType;
use crate::constants::*;

/// Provides the per-section schema fragments a full config schema is composed from.
pub trait SchemaFragments: Send + Sync {
    fn model_type(&self) -> Value;
    fn input_features(&self) -> Value;
    fn output_features(&self) -> Value;
    fn combiner(&self) -> Value;
    fn trainer(&self, model_type: ModelType) -> Value;
    fn preprocessing(&self) -> Value;
    fn hyperopt(&self) -> Value;
    fn defaults(&self) -> Value;
}

/// The stock fragments for the top-level sections of a training config.
///
/// These only describe shape: types, required keys and enums. Everything that
/// needs more than one field to decide lives in the semantic checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFragments;

impl SchemaFragments for DefaultFragments {
    fn model_type(&self) -> Value {
        json!({"type": "string", "enum": [MODEL_ECD, MODEL_GBM]})
    }

    fn input_features(&self) -> Value {
        json!({
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "properties": {
                    NAME: {"type": "string", "minLength": 1},
                    TYPE: {"type": "string", "enum": INPUT_FEATURE_TYPES},
                    "column": {"type": "string"},
                    TIED: {"type": ["string", "null"]},
                    "encoder": {"type": ["object", "string"]},
                    PREPROCESSING: feature_preprocessing(),
                },
                "required": [NAME, TYPE],
            },
        })
    }

    fn output_features(&self) -> Value {
        json!({
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "properties": {
                    NAME: {"type": "string", "minLength": 1},
                    TYPE: {"type": "string", "enum": OUTPUT_FEATURE_TYPES},
                    "column": {"type": "string"},
                    DEPENDENCIES: {"type": "array", "items": {"type": "string"}},
                    "reduce_dependencies": {"type": ["string", "null"]},
                    "decoder": {"type": ["object", "string"]},
                    LOSS: {"type": "object"},
                    PREPROCESSING: feature_preprocessing(),
                },
                "required": [NAME, TYPE],
            },
        })
    }

    fn combiner(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                TYPE: {"type": "string", "enum": COMBINER_TYPES},
                "reduce_output": {"type": ["string", "null"]},
                "entity_1": {"type": "array", "items": {"type": "string"}},
                "entity_2": {"type": "array", "items": {"type": "string"}},
                "num_fc_layers": {"type": "integer", "minimum": 0},
                "output_size": {"type": "integer", "minimum": 1},
                "dropout": {"type": "number", "minimum": 0, "maximum": 1},
            },
        })
    }

    fn trainer(&self, model_type: ModelType) -> Value {
        let mut properties = common_trainer_properties();
        let extra = match model_type {
            ModelType::Ecd => json!({
                "epochs": {"type": "integer", "minimum": 1},
                "batch_size": {"anyOf": [{"type": "integer", "minimum": 1}, {"const": "auto"}]},
                "optimizer": {
                    "type": "object",
                    "properties": {
                        TYPE: {"enum": OPTIMIZER_TYPES},
                    },
                },
                "learning_rate_scaling": {"enum": ["constant", "sqrt", "linear"]},
                "gradient_clipping": {"type": ["object", "null"]},
            }),
            ModelType::Gbm => json!({
                "num_boost_round": {"type": "integer", "minimum": 1},
                "boosting_type": {"enum": ["gbdt", "dart", "goss", "rf"]},
                "num_leaves": {"type": "integer", "minimum": 2},
                "max_depth": {"type": "integer"},
                "tree_learner": {"enum": ["serial", "feature", "data", "voting"]},
            }),
        };

        if let Value::Object(extra) = extra {
            properties.extend(extra);
        }

        json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        })
    }

    fn preprocessing(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                SPLIT: {
                    "type": "object",
                    "properties": {
                        TYPE: {"enum": ["random", "fixed", "stratify", "datetime"]},
                        "probabilities": {
                            "type": "array",
                            "items": {"type": "number", "minimum": 0},
                            "minItems": 3,
                            "maxItems": 3,
                        },
                        "column": {"type": "string"},
                    },
                },
                "sample_ratio": {"type": "number", "exclusiveMinimum": 0, "maximum": 1},
                OVERSAMPLE_MINORITY: {"type": ["number", "null"], "exclusiveMinimum": 0},
                UNDERSAMPLE_MAJORITY: {"type": ["number", "null"], "exclusiveMinimum": 0},
            },
        })
    }

    fn hyperopt(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": {"enum": ["minimize", "maximize"]},
                "metric": {"type": "string"},
                OUTPUT_FEATURE: {"type": "string"},
                SPLIT: {"enum": ["train", "validation", "test"]},
                "parameters": {"type": "object", "additionalProperties": {"type": "object"}},
                "search_alg": {"type": "object"},
                "executor": {"type": "object"},
            },
        })
    }

    fn defaults(&self) -> Value {
        let sections: Map<String, Value> = INPUT_FEATURE_TYPES
            .iter()
            .map(|t| (t.to_string(), json!({"type": "object"})))
            .collect();

        json!({
            "type": "object",
            "properties": sections,
            "additionalProperties": false,
        })
    }
}

const OUTPUT_FEATURE: &str = "output_feature";

const OPTIMIZER_TYPES: &[&str] =
    &["sgd", "adam", "adamw", "adagrad", "adadelta", "rmsprop", "ftrl"];

fn feature_preprocessing() -> Value {
    json!({"type": "object", "properties": {IN_MEMORY: {"type": "boolean"}}})
}

fn common_trainer_properties() -> Map<String, Value> {
    let common = json!({
        TYPE: {"type": "string"},
        "learning_rate": {"anyOf": [{"type": "number", "exclusiveMinimum": 0}, {"const": "auto"}]},
        "early_stop": {"type": "integer"},
        "eval_batch_size": {
            "anyOf": [{"type": ["integer", "null"], "minimum": 1}, {"const": "auto"}]
        },
        CHECKPOINTS_PER_EPOCH: {"type": ["integer", "null"], "minimum": 0},
        STEPS_PER_CHECKPOINT: {"type": ["integer", "null"], "minimum": 0},
        VALIDATION_FIELD: {"type": "string"},
        VALIDATION_METRIC: {"type": "string"},
    });

    match common {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Composes the full config schema for `model_type` out of `fragments`.
pub fn compose_schema(fragments: &dyn SchemaFragments, model_type: ModelType) -> Value {
    json!({
        "type": "object",
        "properties": {
            MODEL_TYPE: fragments.model_type(),
            INPUT_FEATURES: fragments.input_features(),
            OUTPUT_FEATURES: fragments.output_features(),
            COMBINER: fragments.combiner(),
            TRAINER: fragments.trainer(model_type),
            PREPROCESSING: fragments.preprocessing(),
            HYPEROPT: fragments.hyperopt(),
            DEFAULTS: fragments.defaults(),
        },
        "definitions": {},
        "required": [INPUT_FEATURES, OUTPUT_FEATURES],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValidatorFactory;

    #[test]
    fn test_trainer_fragment_depends_on_model_type() {
        let ecd = DefaultFragments.trainer(ModelType::Ecd);
        let gbm = DefaultFragments.trainer(ModelType::Gbm);
        let validator = ValidatorFactory::build();

        let boosted = json!({"num_boost_round": 50});
        assert!(validator.is_valid(&boosted, &gbm));
        assert!(!validator.is_valid(&boosted, &ecd));

        let epochs = json!({"epochs": 10, "batch_size": "auto"});
        assert!(validator.is_valid(&epochs, &ecd));
        assert!(!validator.is_valid(&epochs, &gbm));
    }

    #[test]
    fn test_composed_schema_requires_features() {
        let schema = compose_schema(&DefaultFragments, ModelType::Ecd);
        let err = ValidatorFactory::build().validate(&json!({}), &schema).unwrap_err();
        assert_eq!(err.keyword, "required");
        assert!(err.expected.contains(INPUT_FEATURES));
    }
}
