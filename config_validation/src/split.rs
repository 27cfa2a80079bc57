use serde_json::Value;

use crate::{
    constants::*,
    error::SplitterValidationError,
};

type Result<T> = std::result::Result<T, SplitterValidationError>;

const DEFAULT_PROBABILITIES: [f64; 3] = [0.7, 0.1, 0.2];
const DEFAULT_SPLIT_COLUMN: &str = "split";
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Partitions a dataset into train, validation and test subsets.
///
/// Only the config-time contract is modelled here: a splitter checks that the
/// config it will be run against can actually be split the requested way.
pub trait Splitter: Send + Sync {
    /// Returns a stable identifier for the split kind.
    fn kind(&self) -> &'static str;

    /// Checks that the upgraded `config` is compatible with this splitter.
    fn validate(&self, config: &Value) -> Result<()>;
}

/// Builds splitters out of a `preprocessing.split` section.
pub trait SplitterFactory: Send + Sync {
    fn get_splitter(&self, split: &Value) -> Result<Box<dyn Splitter>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSplitterFactory;

impl SplitterFactory for DefaultSplitterFactory {
    fn get_splitter(&self, split: &Value) -> Result<Box<dyn Splitter>> {
        let kind = split.get(TYPE).and_then(Value::as_str).unwrap_or("random");

        Ok(match kind {
            "random" => Box::new(RandomSplitter {
                probabilities: probabilities(split)?,
            }),
            "fixed" => Box::new(FixedSplitter {
                column: column(split).unwrap_or(DEFAULT_SPLIT_COLUMN).to_string(),
            }),
            "stratify" => Box::new(StratifySplitter {
                column: required_column(split, kind)?,
                probabilities: probabilities(split)?,
            }),
            "datetime" => Box::new(DatetimeSplitter {
                column: required_column(split, kind)?,
                probabilities: probabilities(split)?,
            }),
            other => return Err(SplitterValidationError(format!("unknown split type '{other}'"))),
        })
    }
}

/// Builds a splitter with the default factory.
pub fn get_splitter(split: &Value) -> Result<Box<dyn Splitter>> {
    DefaultSplitterFactory.get_splitter(split)
}

/// Random row assignment following fixed probabilities.
#[derive(Debug)]
pub struct RandomSplitter {
    probabilities: [f64; 3],
}

impl Splitter for RandomSplitter {
    fn kind(&self) -> &'static str {
        "random"
    }

    fn validate(&self, _config: &Value) -> Result<()> {
        check_probabilities(&self.probabilities)
    }
}

/// Uses a precomputed column of split ids.
#[derive(Debug)]
pub struct FixedSplitter {
    column: String,
}

impl Splitter for FixedSplitter {
    fn kind(&self) -> &'static str {
        "fixed"
    }

    fn validate(&self, _config: &Value) -> Result<()> {
        if self.column.is_empty() {
            return Err(SplitterValidationError("fixed split column must not be empty".into()));
        }
        Ok(())
    }
}

/// Random split that keeps the class distribution of a categorical column.
#[derive(Debug)]
pub struct StratifySplitter {
    column: String,
    probabilities: [f64; 3],
}

impl Splitter for StratifySplitter {
    fn kind(&self) -> &'static str {
        "stratify"
    }

    fn validate(&self, config: &Value) -> Result<()> {
        check_probabilities(&self.probabilities)?;

        let Some(feature_type) = feature_type_of(config, &self.column) else {
            return Err(SplitterValidationError(format!(
                "stratify column '{}' is not among the config's features",
                self.column
            )));
        };

        if feature_type != CATEGORY && feature_type != BINARY {
            return Err(SplitterValidationError(format!(
                "stratify column '{}' has type '{feature_type}', \
                 only '{CATEGORY}' or '{BINARY}' can be stratified",
                self.column
            )));
        }

        Ok(())
    }
}

/// Orders rows by a date column before splitting.
#[derive(Debug)]
pub struct DatetimeSplitter {
    column: String,
    probabilities: [f64; 3],
}

impl Splitter for DatetimeSplitter {
    fn kind(&self) -> &'static str {
        "datetime"
    }

    fn validate(&self, config: &Value) -> Result<()> {
        check_probabilities(&self.probabilities)?;

        match feature_type_of(config, &self.column) {
            Some(DATE) => Ok(()),
            Some(other) => Err(SplitterValidationError(format!(
                "datetime split column '{}' has type '{other}', expected '{DATE}'",
                self.column
            ))),
            None => Err(SplitterValidationError(format!(
                "datetime split column '{}' is not among the config's features",
                self.column
            ))),
        }
    }
}

fn column(split: &Value) -> Option<&str> {
    split.get("column").and_then(Value::as_str)
}

fn required_column(split: &Value, kind: &str) -> Result<String> {
    column(split)
        .map(str::to_string)
        .ok_or_else(|| SplitterValidationError(format!("'{kind}' split requires a 'column'")))
}

fn probabilities(split: &Value) -> Result<[f64; 3]> {
    let Some(raw) = split.get("probabilities") else {
        return Ok(DEFAULT_PROBABILITIES);
    };

    let parsed: Option<Vec<f64>> = raw
        .as_array()
        .map(|items| items.iter().map(Value::as_f64).collect::<Option<_>>())
        .unwrap_or_default();

    parsed
        .and_then(|p| <[f64; 3]>::try_from(p).ok())
        .ok_or_else(|| {
            SplitterValidationError(format!("split probabilities must be 3 numbers, got {raw}"))
        })
}

fn check_probabilities(probabilities: &[f64; 3]) -> Result<()> {
    if probabilities.iter().any(|p| *p < 0.0) {
        return Err(SplitterValidationError(format!(
            "split probabilities must be non-negative, got {probabilities:?}"
        )));
    }

    let total: f64 = probabilities.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SplitterValidationError(format!(
            "split probabilities must sum to 1, got {probabilities:?} (sum {total})"
        )));
    }

    Ok(())
}

fn feature_type_of<'a>(config: &'a Value, name: &str) -> Option<&'a str> {
    [INPUT_FEATURES, OUTPUT_FEATURES]
        .into_iter()
        .filter_map(|section| config.get(section).and_then(Value::as_array))
        .flatten()
        .find(|feature| feature.get(NAME).and_then(Value::as_str) == Some(name))
        .and_then(|feature| feature.get(TYPE))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> Value {
        json!({
            "input_features": [{"name": "when", "type": "date"}, {"name": "x", "type": "number"}],
            "output_features": [{"name": "label", "type": "category"}],
        })
    }

    #[test]
    fn test_default_is_random() {
        let splitter = get_splitter(&json!({})).unwrap();
        assert_eq!(splitter.kind(), "random");
        assert!(splitter.validate(&config()).is_ok());
    }

    #[test]
    fn test_random_probabilities_must_sum_to_one() {
        let split = json!({"type": "random", "probabilities": [0.5, 0.5, 0.5]});
        let splitter = get_splitter(&split).unwrap();
        assert!(splitter.validate(&config()).is_err());
    }

    #[test]
    fn test_stratify_requires_categorical_feature() {
        let ok = get_splitter(&json!({"type": "stratify", "column": "label"})).unwrap();
        assert!(ok.validate(&config()).is_ok());

        let numeric = get_splitter(&json!({"type": "stratify", "column": "x"})).unwrap();
        assert!(numeric.validate(&config()).is_err());

        let missing = get_splitter(&json!({"type": "stratify", "column": "nope"})).unwrap();
        assert!(missing.validate(&config()).is_err());

        assert!(get_splitter(&json!({"type": "stratify"})).is_err());
    }

    #[test]
    fn test_datetime_requires_date_feature() {
        let ok = get_splitter(&json!({"type": "datetime", "column": "when"})).unwrap();
        assert!(ok.validate(&config()).is_ok());

        let wrong = get_splitter(&json!({"type": "datetime", "column": "x"})).unwrap();
        assert!(wrong.validate(&config()).is_err());
    }

    #[test]
    fn test_unknown_split_type() {
        assert!(get_splitter(&json!({"type": "hash"})).is_err());
    }
}
