use serde_json::{Value, json};

use config_validation::{
    ConfigValidator, ValidationError, upgrade_config_dict_to_latest_version, validate_config,
};

fn ecd_config() -> Value {
    json!({
        "model_type": "ecd",
        "input_features": [
            {"name": "title", "type": "text", "encoder": "parallel_cnn"},
            {"name": "summary", "type": "text", "tied": "title"},
            {"name": "price", "type": "number"},
        ],
        "output_features": [
            {"name": "label", "type": "category"},
            {"name": "rating", "type": "number", "dependencies": ["label"]},
        ],
        "combiner": {"type": "concat", "output_size": 128},
        "trainer": {
            "epochs": 10,
            "batch_size": "auto",
            "learning_rate": 0.001,
            "checkpoints_per_epoch": 2,
            "validation_field": "label",
            "validation_metric": "accuracy",
        },
        "preprocessing": {"split": {"type": "random", "probabilities": [0.8, 0.1, 0.1]}},
        "hyperopt": {
            "goal": "maximize",
            "output_feature": "label",
            "metric": "accuracy",
            "parameters": {
                "trainer.learning_rate": {"space": "loguniform", "lower": 0.0001, "upper": 0.1},
            },
        },
        "defaults": {"text": {"preprocessing": {"in_memory": true}}},
    })
}

fn gbm_config() -> Value {
    json!({
        "model_type": "gbm",
        "input_features": [
            {"name": "age", "type": "number"},
            {"name": "city", "type": "category"},
            {"name": "member", "type": "binary"},
        ],
        "output_features": [{"name": "churn", "type": "binary"}],
        "trainer": {"num_boost_round": 100, "learning_rate": 0.05},
    })
}

fn config_error(
    result: Result<Value, ValidationError>,
) -> config_validation::ConfigValidationError {
    match result {
        Err(ValidationError::Config(e)) => e,
        other => panic!("expected a config validation error, got {other:?}"),
    }
}

#[test]
fn valid_configs_pass() {
    validate_config(&ecd_config(), true).unwrap();
    validate_config(&gbm_config(), true).unwrap();
}

#[test]
fn minimal_config_passes() {
    let config = json!({
        "input_features": [{"name": "x", "type": "number"}],
        "output_features": [{"name": "y", "type": "binary"}],
    });
    validate_config(&config, true).unwrap();
}

#[test]
fn duplicate_output_names_are_rejected() {
    let mut config = ecd_config();
    config["output_features"] = json!([
        {"name": "label", "type": "category"},
        {"name": "label", "type": "binary"},
    ]);
    config["trainer"]["validation_field"] = json!("combined");
    config["trainer"]["validation_metric"] = json!("loss");
    config["hyperopt"]["output_feature"] = json!("combined");
    config["hyperopt"]["metric"] = json!("loss");

    let err = config_error(validate_config(&config, true));
    assert_eq!(err.invariant, "unique feature names");
    assert_eq!(err.paths, vec!["output_features[0].name", "output_features[1].name"]);
    assert!(err.to_string().contains("label"));
}

#[test]
fn unknown_validation_field_is_rejected() {
    let mut config = ecd_config();
    config["trainer"]["validation_field"] = json!("nonexistent");

    let err = config_error(validate_config(&config, true));
    assert!(err.msg.contains("'nonexistent'"));
    assert!(err.msg.contains("combined"));
    assert!(err.msg.contains("label"));
}

#[test]
fn checkpoint_frequency_is_exclusive() {
    let mut config = ecd_config();
    config["trainer"]["checkpoints_per_epoch"] = json!(2);
    config["trainer"]["steps_per_checkpoint"] = json!(100);

    let err = config_error(validate_config(&config, true));
    assert_eq!(err.invariant, "checkpoint frequency exclusivity");
    assert!(err.msg.contains("checkpoints_per_epoch"));
    assert!(err.msg.contains("steps_per_checkpoint"));
}

#[test]
fn gbm_requires_a_single_output() {
    let mut config = gbm_config();
    config["output_features"] = json!([
        {"name": "churn", "type": "binary"},
        {"name": "spend", "type": "number"},
    ]);

    let err = config_error(validate_config(&config, true));
    assert_eq!(err.invariant, "gbm single output feature");
}

#[test]
fn gbm_rejects_non_tabular_inputs() {
    let mut config = gbm_config();
    config["input_features"][0] = json!({"name": "bio", "type": "text"});

    let err = config_error(validate_config(&config, true));
    assert_eq!(err.invariant, "gbm tabular features");
}

#[test]
fn structural_errors_carry_a_path() {
    let mut config = ecd_config();
    config["input_features"][2]["type"] = json!("spreadsheet");

    match validate_config(&config, true) {
        Err(ValidationError::Schema(e)) => {
            assert_eq!(e.path, "$.input_features[2].type");
            assert_eq!(e.keyword, "enum");
        }
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn trainer_schema_follows_model_type() {
    let mut config = gbm_config();
    config["trainer"]["epochs"] = json!(3);

    match validate_config(&config, true) {
        Err(ValidationError::Schema(e)) => assert_eq!(e.path, "$.trainer.epochs"),
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn missing_features_fail_structurally() {
    let config = json!({"input_features": [{"name": "x", "type": "number"}]});
    assert!(matches!(validate_config(&config, true), Err(ValidationError::Schema(_))));

    let config = json!({
        "input_features": [],
        "output_features": [{"name": "y", "type": "binary"}],
    });
    assert!(matches!(validate_config(&config, true), Err(ValidationError::Schema(_))));
}

#[test]
fn unknown_model_type_fails_structurally() {
    let mut config = gbm_config();
    config["model_type"] = json!("forest");
    assert!(matches!(validate_config(&config, true), Err(ValidationError::Schema(_))));
}

#[test]
fn splitter_errors_propagate() {
    let mut config = ecd_config();
    config["preprocessing"]["split"] = json!({"type": "stratify", "column": "price"});
    assert!(matches!(validate_config(&config, true), Err(ValidationError::Splitter(_))));
}

#[test]
fn auxiliary_validations_can_be_skipped() {
    let mut config = ecd_config();
    config["trainer"]["validation_field"] = json!("nonexistent");
    config["preprocessing"]["split"] = json!({"type": "stratify", "column": "price"});

    validate_config(&config, false).unwrap();
}

#[test]
fn legacy_configs_are_upgraded_before_validation() {
    let config = json!({
        "input_features": [{"name": "x", "type": "numerical"}],
        "output_features": [{"name": "y", "type": "binary"}],
        "training": {"epochs": 2},
        "preprocessing": {"stratify": "y"},
    });

    let upgraded = validate_config(&config, true).unwrap();
    assert_eq!(upgraded["input_features"][0]["type"], "number");
    assert_eq!(upgraded["trainer"]["epochs"], 2);
    assert_eq!(upgraded["preprocessing"]["split"]["type"], "stratify");

    // The caller's config is left as it was.
    assert_eq!(config["input_features"][0]["type"], "numerical");
}

#[test]
fn upgrade_is_idempotent() {
    let configs = [
        ecd_config(),
        gbm_config(),
        json!({
            "input_features": [{"name": "x", "type": "numerical"}],
            "output_features": [{"name": "y", "type": "numerical"}],
            "training": {"eval_batch_size": 0},
            "preprocessing": {"force_split": true, "split_probabilities": [0.6, 0.2, 0.2]},
            "hyperopt": {"sampler": {"num_samples": 4}},
        }),
    ];

    for config in configs {
        let once = upgrade_config_dict_to_latest_version(&config).unwrap();
        let twice = upgrade_config_dict_to_latest_version(&once).unwrap();
        assert_eq!(once, twice);
    }
}

#[test]
fn checks_run_in_order() {
    // Both the metric check and the uniqueness check are violated, the metric
    // check comes first.
    let mut config = ecd_config();
    config["trainer"]["validation_field"] = json!("nonexistent");
    config["input_features"][2]["name"] = json!("title");

    let err = config_error(validate_config(&config, true));
    assert_eq!(err.invariant, "known validation field");
}

#[test]
fn custom_collaborators_are_used() {
    use config_validation::metrics::MetricRegistry;

    struct OnlyLoss;

    impl MetricRegistry for OnlyLoss {
        fn metric_names(&self, _feature_type: &str) -> Option<&[&'static str]> {
            Some(&["loss"][..])
        }
    }

    let validator = ConfigValidator::new().with_registry(OnlyLoss);
    let err = match validator.validate(&ecd_config(), true) {
        Err(ValidationError::Config(e)) => e,
        other => panic!("expected a config validation error, got {other:?}"),
    };
    assert_eq!(err.invariant, "metric valid for field");
}
