//! Keys and well-known values of the training configuration.

pub const MODEL_TYPE: &str = "model_type";
pub const INPUT_FEATURES: &str = "input_features";
pub const OUTPUT_FEATURES: &str = "output_features";
pub const COMBINER: &str = "combiner";
pub const TRAINER: &str = "trainer";
pub const PREPROCESSING: &str = "preprocessing";
pub const HYPEROPT: &str = "hyperopt";
pub const DEFAULTS: &str = "defaults";
pub const BACKEND: &str = "backend";
pub const SPLIT: &str = "split";

pub const NAME: &str = "name";
pub const TYPE: &str = "type";
pub const TIED: &str = "tied";
pub const DEPENDENCIES: &str = "dependencies";
pub const IN_MEMORY: &str = "in_memory";

pub const MODEL_ECD: &str = "ecd";
pub const MODEL_GBM: &str = "gbm";

pub const COMBINED: &str = "combined";
pub const LOSS: &str = "loss";

pub const VALIDATION_FIELD: &str = "validation_field";
pub const VALIDATION_METRIC: &str = "validation_metric";
pub const CHECKPOINTS_PER_EPOCH: &str = "checkpoints_per_epoch";
pub const STEPS_PER_CHECKPOINT: &str = "steps_per_checkpoint";

pub const OVERSAMPLE_MINORITY: &str = "oversample_minority";
pub const UNDERSAMPLE_MAJORITY: &str = "undersample_majority";

pub const HOROVOD: &str = "horovod";
pub const RAY: &str = "ray";

pub const BINARY: &str = "binary";
pub const CATEGORY: &str = "category";
pub const NUMBER: &str = "number";
pub const SEQUENCE: &str = "sequence";
pub const TEXT: &str = "text";
pub const SET: &str = "set";
pub const VECTOR: &str = "vector";
pub const BAG: &str = "bag";
pub const IMAGE: &str = "image";
pub const AUDIO: &str = "audio";
pub const TIMESERIES: &str = "timeseries";
pub const DATE: &str = "date";
pub const H3: &str = "h3";

pub const INPUT_FEATURE_TYPES: &[&str] = &[
    AUDIO, BAG, BINARY, CATEGORY, DATE, H3, IMAGE, NUMBER, SEQUENCE, SET, TEXT, TIMESERIES, VECTOR,
];

pub const OUTPUT_FEATURE_TYPES: &[&str] = &[BINARY, CATEGORY, NUMBER, SEQUENCE, SET, TEXT, VECTOR];

/// Feature types a gradient-boosted model can consume.
pub const GBM_FEATURE_TYPES: &[&str] = &[BINARY, CATEGORY, NUMBER];

/// Feature types that produce a sequence of encodings.
pub const SEQUENCE_FEATURE_TYPES: &[&str] = &[SEQUENCE, TEXT, TIMESERIES, AUDIO];

pub const SEQUENCE_CONCAT_COMBINER: &str = "sequence_concat";
pub const TABTRANSFORMER_COMBINER: &str = "tabtransformer";
pub const COMPARATOR_COMBINER: &str = "comparator";

pub const COMBINER_TYPES: &[&str] = &[
    "concat",
    COMPARATOR_COMBINER,
    "project_aggregate",
    "sequence",
    SEQUENCE_CONCAT_COMBINER,
    TABTRANSFORMER_COMBINER,
    "tabnet",
    "transformer",
];
