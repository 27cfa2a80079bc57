use std::sync::Arc;

use log::{debug, info};
use parking_lot::{Mutex, const_mutex};
use serde_json::Value;

use crate::{
    checks,
    constants::*,
    error::Result,
    metrics::{DefaultMetricRegistry, MetricRegistry},
    schema::{self, ModelType, SchemaCache},
    split::{DefaultSplitterFactory, SplitterFactory},
    upgrade::{ConfigUpgrader, DefaultUpgrader},
};

/// Serializes schema lookup and structural validation across threads.
///
/// Building a schema or validator while another thread validates against a
/// half published one can observe it partially initialized, so every cache
/// access for structural validation happens under this lock. Semantic checks
/// never run under it.
pub static VALIDATION_LOCK: Mutex<()> = const_mutex(());

/// Validates training configs end to end with pluggable collaborators.
pub struct ConfigValidator {
    upgrader: Box<dyn ConfigUpgrader>,
    splitters: Box<dyn SplitterFactory>,
    registry: Box<dyn MetricRegistry>,
    cache: Option<Arc<SchemaCache>>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// Creates a `ConfigValidator` with the default collaborators and the
    /// process-wide schema cache.
    pub fn new() -> Self {
        Self {
            upgrader: Box::new(DefaultUpgrader),
            splitters: Box::new(DefaultSplitterFactory),
            registry: Box::new(DefaultMetricRegistry),
            cache: None,
        }
    }

    pub fn with_upgrader<U: ConfigUpgrader + 'static>(mut self, upgrader: U) -> Self {
        self.upgrader = Box::new(upgrader);
        self
    }

    pub fn with_splitters<S: SplitterFactory + 'static>(mut self, splitters: S) -> Self {
        self.splitters = Box::new(splitters);
        self
    }

    pub fn with_registry<R: MetricRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Box::new(registry);
        self
    }

    /// Uses `cache` instead of the process-wide schema cache.
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache(&self) -> &SchemaCache {
        self.cache.as_deref().unwrap_or_else(|| schema::global())
    }

    /// Validates `config`, returning its upgraded form.
    ///
    /// # Arguments
    /// * `config` - The raw config, left untouched.
    /// * `include_auxiliary_validations` - Whether to run the splitter and the
    ///   semantic checks after the structural validation.
    ///
    /// # Returns
    /// The upgraded config, or the first error found.
    ///
    /// # Errors
    /// * `ValidationError::Upgrade` if the config can't be upgraded.
    /// * `ValidationError::Schema` on a structural mismatch.
    /// * `ValidationError::Splitter` if the split section is unusable.
    /// * `ValidationError::Config` on the first violated semantic invariant.
    pub fn validate(&self, config: &Value, include_auxiliary_validations: bool) -> Result<Value> {
        let updated = self.upgrader.upgrade(config)?;

        // Unknown model types fall through to the default schema, whose
        // model type enum rejects them.
        let model_type = updated
            .get(MODEL_TYPE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(ModelType::Ecd);

        {
            let _guard = VALIDATION_LOCK.lock();
            let cache = self.cache();
            let schema = cache.get_schema(model_type);
            let validator = cache.get_validator();
            validator.validate(&updated, &schema)?;
        }
        debug!(model_type = model_type.as_str(); "structural validation passed");

        if include_auxiliary_validations {
            let split = updated
                .get(PREPROCESSING)
                .and_then(|p| p.get(SPLIT))
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));

            let splitter = self.splitters.get_splitter(&split)?;
            splitter.validate(&updated)?;

            checks::run_all(&updated, self.registry.as_ref())?;
        }

        info!(model_type = model_type.as_str(); "config is valid");
        Ok(updated)
    }
}

/// Validates `config` with the default collaborators.
///
/// See [`ConfigValidator::validate`].
pub fn validate_config(config: &Value, include_auxiliary_validations: bool) -> Result<Value> {
    ConfigValidator::new().validate(config, include_auxiliary_validations)
}
