use serde_json::{Map, Value};

use super::{CheckResult, features, trainer::check_metric_target};
use crate::{
    constants::*,
    error::ConfigValidationError,
    metrics::{MetricRegistry, get_feature_to_metric_names_map},
};

const SPACE: &str = "space";

const BOUNDED_SPACES: &[&str] = &[
    "uniform",
    "quniform",
    "loguniform",
    "qloguniform",
    "randint",
    "qrandint",
    "lograndint",
    "qlograndint",
];
const NORMAL_SPACES: &[&str] = &["randn", "qrandn"];
const CHOICE: &str = "choice";
const GRID_SEARCH: &str = "grid_search";

/// Checks that every hyperopt parameter declares a well formed search space.
pub fn check_hyperopt_search_space(config: &Value) -> CheckResult {
    let parameters = config.get(HYPEROPT).and_then(|h| h.get("parameters"));
    let Some(Value::Object(parameters)) = parameters else {
        return Ok(());
    };

    for (name, definition) in parameters {
        let path = format!("{HYPEROPT}.parameters.{name}");
        let Value::Object(definition) = definition else {
            return Err(search_space_error(&path, "must be a mapping", definition));
        };

        check_space(&path, definition)?;
    }

    Ok(())
}

fn check_space(path: &str, definition: &Map<String, Value>) -> CheckResult {
    let Some(space) = definition.get(SPACE).and_then(Value::as_str) else {
        let found = definition.get(SPACE).cloned().unwrap_or_default();
        let space_path = format!("{path}.{SPACE}");
        return Err(search_space_error(&space_path, "must name a search space", &found));
    };

    let number = |key: &str| definition.get(key).and_then(Value::as_f64);
    let quantized = space.starts_with('q');

    if BOUNDED_SPACES.contains(&space) {
        let (Some(lower), Some(upper)) = (number("lower"), number("upper")) else {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires numeric 'lower' and 'upper' bounds"),
                &Value::Object(definition.clone()),
            ));
        };
        if lower >= upper {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires lower < upper, got lower={lower} upper={upper}"),
                &Value::Object(definition.clone()),
            ));
        }
        if space.contains("log") && lower <= 0.0 {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires a positive lower bound, got {lower}"),
                &Value::Object(definition.clone()),
            ));
        }
    } else if NORMAL_SPACES.contains(&space) {
        if !number("sd").is_some_and(|sd| sd > 0.0) {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires a positive numeric 'sd'"),
                &Value::Object(definition.clone()),
            ));
        }
        if definition.get("mean").is_some_and(|m| !m.is_number()) {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires a numeric 'mean'"),
                &Value::Object(definition.clone()),
            ));
        }
    } else if space == CHOICE || space == GRID_SEARCH {
        let key = if space == CHOICE { "categories" } else { "values" };
        if !definition.get(key).and_then(Value::as_array).is_some_and(|v| !v.is_empty()) {
            return Err(search_space_error(
                path,
                &format!("'{space}' requires a non-empty '{key}' list"),
                &Value::Object(definition.clone()),
            ));
        }
        return Ok(());
    } else {
        return Err(search_space_error(
            &format!("{path}.{SPACE}"),
            &format!("unknown search space '{space}'"),
            &Value::from(space),
        ));
    }

    if quantized && !number("q").is_some_and(|q| q > 0.0) {
        return Err(search_space_error(
            path,
            &format!("'{space}' requires a positive numeric 'q'"),
            &Value::Object(definition.clone()),
        ));
    }

    Ok(())
}

fn search_space_error(path: &str, problem: &str, value: &Value) -> ConfigValidationError {
    ConfigValidationError::new("hyperopt search space", format!("{path} {problem}"))
        .at(path, value.clone())
}

/// Checks that the hyperopt objective is a metric reported by its target feature.
pub fn check_hyperopt_metric_targets(config: &Value, registry: &dyn MetricRegistry) -> CheckResult {
    let Some(hyperopt) = config.get(HYPEROPT) else {
        return Ok(());
    };

    let output_features = features(config, OUTPUT_FEATURES);
    let metric_names = get_feature_to_metric_names_map(output_features, registry)?;

    let field = hyperopt.get("output_feature").and_then(Value::as_str).unwrap_or(COMBINED);
    let metric = hyperopt.get("metric").and_then(Value::as_str).unwrap_or(LOSS);

    check_metric_target(
        &metric_names,
        ("hyperopt.output_feature", field),
        ("hyperopt.metric", metric),
    )
}
