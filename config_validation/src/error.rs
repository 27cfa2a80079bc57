use std::{error::Error, fmt};

use serde_json::Value;

/// The validation module's result type.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Returned by the upgrader when a config can't be normalized to the latest version.
#[derive(Debug)]
pub struct UpgradeError(pub String);

impl fmt::Display for UpgradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config upgrade failed: {}", self.0)
    }
}

impl Error for UpgradeError {}

/// A structural mismatch between the config and the composed schema.
#[derive(Debug, Clone)]
pub struct SchemaValidationError {
    /// JSON path to the offending value, e.g. `$.input_features[0].type`.
    pub path: String,
    /// The schema keyword that failed (`type`, `required`, `enum`, ...).
    pub keyword: &'static str,
    /// Human-readable description of the expected constraint.
    pub expected: String,
    /// The offending value.
    pub instance: Value,
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema violation at {} ({}): expected {}, got {}",
            self.path, self.keyword, self.expected, self.instance
        )
    }
}

impl Error for SchemaValidationError {}

/// A violated cross-field invariant of the configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Short name of the violated rule.
    pub invariant: &'static str,
    /// Config paths involved in the violation.
    pub paths: Vec<String>,
    /// The offending values.
    pub values: Vec<Value>,
    /// Explanation of what to fix.
    pub msg: String,
}

impl ConfigValidationError {
    pub(crate) fn new(invariant: &'static str, msg: impl Into<String>) -> Self {
        Self {
            invariant,
            paths: Vec::new(),
            values: Vec::new(),
            msg: msg.into(),
        }
    }

    pub(crate) fn at(mut self, path: impl Into<String>, value: Value) -> Self {
        self.paths.push(path.into());
        self.values.push(value);
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.msg)?;
        for (path, value) in self.paths.iter().zip(&self.values) {
            write!(f, " [{path} = {value}]")?;
        }
        Ok(())
    }
}

impl Error for ConfigValidationError {}

/// Raised by a splitter when the split section is unusable for the config.
#[derive(Debug, Clone)]
pub struct SplitterValidationError(pub String);

impl fmt::Display for SplitterValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid split config: {}", self.0)
    }
}

impl Error for SplitterValidationError {}

/// Every way `validate_config` can fail.
#[derive(Debug)]
pub enum ValidationError {
    Upgrade(UpgradeError),
    Schema(SchemaValidationError),
    Splitter(SplitterValidationError),
    Config(ConfigValidationError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade(e) => e.fmt(f),
            Self::Schema(e) => e.fmt(f),
            Self::Splitter(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upgrade(e) => Some(e),
            Self::Schema(e) => Some(e),
            Self::Splitter(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<UpgradeError> for ValidationError {
    fn from(value: UpgradeError) -> Self {
        Self::Upgrade(value)
    }
}

impl From<SchemaValidationError> for ValidationError {
    fn from(value: SchemaValidationError) -> Self {
        Self::Schema(value)
    }
}

impl From<SplitterValidationError> for ValidationError {
    fn from(value: SplitterValidationError) -> Self {
        Self::Splitter(value)
    }
}

impl From<ConfigValidationError> for ValidationError {
    fn from(value: ConfigValidationError) -> Self {
        Self::Config(value)
    }
}
