//! Error handling and error types for the CEGB boosting core.
//!
//! Every fatal condition surfaces as a `LightGBMError` so the caller decides
//! whether to abort. Tree internals report through `anyhow` and are folded
//! into [`LightGBMError::TreeConstruction`] at the boosting boundary.

use std::io;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum LightGBMError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Dataset-related errors
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Tree construction errors
    #[error("Tree construction error: {message}")]
    TreeConstruction { message: String },

    /// Prediction errors
    #[error("Prediction error: {message}")]
    Prediction { message: String },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// A model file declares a storage tag the requested boosting type cannot load
    #[error("Type mismatch: requested boosting type '{declared}' cannot load a model tagged '{embedded}'")]
    TypeMismatch { declared: String, embedded: String },

    /// Boosting type name not known to the factory
    #[error("Unknown boosting type: {name}")]
    UnknownBoostingType { name: String },

    /// First line of a model does not name a known storage tag
    #[error("Unknown model type tag: '{tag}'")]
    UnknownModelTag { tag: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Not implemented functionality
    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },
}

/// Errors raised while parsing the model text format.
#[derive(Error, Debug, PartialEq)]
pub enum ModelTextError {
    #[error("Model text is empty")]
    Empty,

    #[error("Missing required key '{key}'")]
    MissingKey { key: String },

    #[error("Line {line}: cannot parse value of '{key}': {value}")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("Tree {tree}: array '{key}' has {actual} entries, expected {expected}")]
    ArrayLength {
        tree: usize,
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("Unterminated section: expected '{marker}'")]
    Unterminated { marker: &'static str },
}

/// Dataset construction errors
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Empty dataset provided")]
    Empty,

    #[error("Label count mismatch: {rows} rows, {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
}

/// Type alias for Results using LightGBMError
pub type Result<T> = std::result::Result<T, LightGBMError>;

/// Utility functions for error handling
impl LightGBMError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        LightGBMError::Config {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        LightGBMError::Dataset {
            message: message.into(),
        }
    }

    /// Create a tree construction error
    pub fn tree_construction<S: Into<String>>(message: S) -> Self {
        LightGBMError::TreeConstruction {
            message: message.into(),
        }
    }

    /// Create a prediction error
    pub fn prediction<S: Into<String>>(message: S) -> Self {
        LightGBMError::Prediction {
            message: message.into(),
        }
    }

    /// Create a type mismatch error between a requested boosting type and a model tag
    pub fn type_mismatch<D, E>(declared: D, embedded: E) -> Self
    where
        D: Into<String>,
        E: Into<String>,
    {
        LightGBMError::TypeMismatch {
            declared: declared.into(),
            embedded: embedded.into(),
        }
    }

    /// Create an unknown boosting type error
    pub fn unknown_boosting_type<S: Into<String>>(name: S) -> Self {
        LightGBMError::UnknownBoostingType { name: name.into() }
    }

    /// Create an unknown model tag error
    pub fn unknown_model_tag<S: Into<String>>(tag: S) -> Self {
        LightGBMError::UnknownModelTag { tag: tag.into() }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        LightGBMError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        LightGBMError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        LightGBMError::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        LightGBMError::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            LightGBMError::Config { .. } => false,
            LightGBMError::Dataset { .. } => false,
            LightGBMError::TreeConstruction { .. } => true,
            LightGBMError::Prediction { .. } => true,
            LightGBMError::Serialization { .. } => false,
            LightGBMError::TypeMismatch { .. } => false,
            LightGBMError::UnknownBoostingType { .. } => false,
            LightGBMError::UnknownModelTag { .. } => false,
            LightGBMError::IO { .. } => false,
            LightGBMError::Json { .. } => false,
            LightGBMError::InvalidParameter { .. } => false,
            LightGBMError::DimensionMismatch { .. } => false,
            LightGBMError::NotImplemented { .. } => false,
        }
    }

    /// Get error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            LightGBMError::Config { .. } => "config",
            LightGBMError::Dataset { .. } => "dataset",
            LightGBMError::TreeConstruction { .. } => "tree_construction",
            LightGBMError::Prediction { .. } => "prediction",
            LightGBMError::Serialization { .. } => "serialization",
            LightGBMError::TypeMismatch { .. } => "type_mismatch",
            LightGBMError::UnknownBoostingType { .. } => "unknown_boosting_type",
            LightGBMError::UnknownModelTag { .. } => "unknown_model_tag",
            LightGBMError::IO { .. } => "io",
            LightGBMError::Json { .. } => "json",
            LightGBMError::InvalidParameter { .. } => "invalid_parameter",
            LightGBMError::DimensionMismatch { .. } => "dimension_mismatch",
            LightGBMError::NotImplemented { .. } => "not_implemented",
        }
    }
}

impl From<ModelTextError> for LightGBMError {
    fn from(err: ModelTextError) -> Self {
        LightGBMError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<DatasetError> for LightGBMError {
    fn from(err: DatasetError) -> Self {
        LightGBMError::Dataset {
            message: err.to_string(),
        }
    }
}

/// Tree learners report through `anyhow`; anything reaching the booster is a
/// failed tree build.
impl From<anyhow::Error> for LightGBMError {
    fn from(err: anyhow::Error) -> Self {
        LightGBMError::TreeConstruction {
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LightGBMError::config("test configuration error");
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());

        let err = LightGBMError::tree_construction("leaf 3 is not open");
        assert_eq!(err.category(), "tree_construction");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_type_mismatch_carries_both_names() {
        let err = LightGBMError::type_mismatch("gbdt", "cegb_tree");
        let text = err.to_string();
        assert!(text.contains("gbdt"));
        assert!(text.contains("cegb_tree"));
        assert_eq!(err.category(), "type_mismatch");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_model_text_error_conversion() {
        let err: LightGBMError = ModelTextError::MissingKey {
            key: "num_features".to_string(),
        }
        .into();
        assert!(matches!(err, LightGBMError::Serialization { .. }));
        assert!(err.to_string().contains("num_features"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: LightGBMError = anyhow::anyhow!("node 7 is not a leaf").into();
        assert_eq!(err.category(), "tree_construction");
        assert!(err.to_string().contains("node 7"));
    }

    #[test]
    fn test_specialized_errors() {
        let err: LightGBMError = DatasetError::LabelMismatch { rows: 3, labels: 2 }.into();
        assert!(matches!(err, LightGBMError::Dataset { .. }));
    }

    #[test]
    fn test_parameter_errors() {
        let err = LightGBMError::invalid_parameter("cegb_tradeoff", "-0.5", "must be non-negative");
        assert_eq!(err.category(), "invalid_parameter");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let lightgbm_err: LightGBMError = io_err.into();
        assert!(matches!(lightgbm_err, LightGBMError::IO { .. }));
        assert_eq!(lightgbm_err.category(), "io");
    }
}
