mod cache;
mod fragments;
mod validator;

use std::{fmt, str::FromStr, sync::Arc, sync::LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{MODEL_ECD, MODEL_GBM};

pub use cache::{BoundedCache, SchemaCache};
pub use fragments::{DefaultFragments, SchemaFragments, compose_schema};
pub use validator::{TypeCheck, TypeChecker, Validator};

/// The model families a config can describe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Encoder-combiner-decoder neural model.
    #[default]
    Ecd,
    /// Gradient-boosted trees.
    Gbm,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Ecd => MODEL_ECD,
            ModelType::Gbm => MODEL_GBM,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MODEL_ECD => Ok(ModelType::Ecd),
            MODEL_GBM => Ok(ModelType::Gbm),
            other => Err(format!("unknown model type '{other}'")),
        }
    }
}

/// Builds validator engines.
pub struct ValidatorFactory;

impl ValidatorFactory {
    /// Creates a draft-7 validator whose `array` type accepts tuple-like values.
    ///
    /// Serde encodes Rust tuples and fixed-size arrays as JSON sequences, so
    /// over `serde_json::Value` the relaxed rule classifies exactly what
    /// draft-7 does. It stays registered so the array rule is decided in one
    /// place if the value model grows a distinct tuple kind.
    pub fn build() -> Validator {
        let types = TypeChecker::draft7().redefine("array", is_array_like);
        Validator::new(types)
    }
}

fn is_array_like(value: &Value) -> bool {
    matches!(value, Value::Array(_))
}

static GLOBAL: LazyLock<SchemaCache> = LazyLock::new(|| SchemaCache::new(DefaultFragments));

/// The process-wide schema cache.
pub fn global() -> &'static SchemaCache {
    &GLOBAL
}

/// Returns the composed schema for `model_type` from the process-wide cache.
pub fn get_schema(model_type: ModelType) -> Arc<Value> {
    GLOBAL.get_schema(model_type)
}

/// Returns the validator engine from the process-wide cache.
pub fn get_validator() -> Arc<Validator> {
    GLOBAL.get_validator()
}
