pub mod checks;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod split;
pub mod upgrade;

pub use error::{
    ConfigValidationError, SchemaValidationError, SplitterValidationError, UpgradeError,
    ValidationError,
};
pub use pipeline::{ConfigValidator, VALIDATION_LOCK, validate_config};
pub use schema::{ModelType, SchemaCache, get_schema, get_validator};
pub use upgrade::upgrade_config_dict_to_latest_version;
