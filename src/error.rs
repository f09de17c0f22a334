//! Error types for the contribution engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the rule engine, the batch stages, and the orchestrator
//! can report. Each error also carries an [`ErrorClass`] so stage fault
//! policies can decide between retry, skip, and abort without matching on
//! individual variants.

use thiserror::Error;

/// The main error type for the contribution engine.
///
/// # Example
///
/// ```
/// use contribution_engine::error::EngineError;
///
/// let error = EngineError::DataNotFound {
///     message: "no employment data for employee emp_007".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Data not found: no employment data for employee emp_007"
/// );
/// ```
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed or holds invalid values.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The rule store holds no definitions.
    #[error("No rules configured in the rule store")]
    NoRulesConfigured,

    /// One or more rule definitions failed to compile.
    #[error("Rule compilation failed: {}", diagnostics.join("; "))]
    RuleCompilation {
        /// Every diagnostic produced while compiling.
        diagnostics: Vec<String>,
    },

    /// A named rule base is absent from the active rule set.
    #[error("Rule base not found: {name}")]
    RuleBaseNotFound {
        /// The requested rule base name.
        name: String,
    },

    /// A fact could not be evaluated against a rule base.
    #[error("Invalid fact for rule '{rule}': {message}")]
    InvalidFact {
        /// The rule that was executing.
        rule: String,
        /// What was wrong with the fact.
        message: String,
    },

    /// A cross-referenced record is missing.
    #[error("Data not found: {message}")]
    DataNotFound {
        /// A description of the missing data.
        message: String,
    },

    /// An external payload could not be mapped into a domain record.
    #[error("Mapping error: {message}")]
    Mapping {
        /// A description of the mapping failure.
        message: String,
    },

    /// A remote API call failed.
    #[error("External API '{service}' failed: {message}")]
    ExternalApi {
        /// The remote service name.
        service: String,
        /// The failure reported by the client.
        message: String,
    },

    /// A write conflicted with persisted state (e.g. duplicate key).
    #[error("Storage conflict on '{key}': {message}")]
    StorageConflict {
        /// The conflicting record key.
        key: String,
        /// A description of the conflict.
        message: String,
    },

    /// A storage operation failed.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the storage failure.
        message: String,
    },

    /// A generic item processing failure.
    #[error("Processing error: {message}")]
    Processing {
        /// A description of the failure.
        message: String,
    },

    /// Job launch parameters were rejected.
    #[error("Invalid job parameters: {message}")]
    InvalidJobParameters {
        /// Why the parameters were rejected.
        message: String,
    },

    /// A stage exhausted its fault policy.
    #[error("Stage '{stage}' failed: {cause}")]
    StageFailed {
        /// The stage that failed.
        stage: String,
        /// The originating cause.
        cause: Box<EngineError>,
    },

    /// The job was cancelled before completion.
    #[error("Job cancelled")]
    Cancelled,
}

/// Coarse classification of an [`EngineError`] used by fault policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Missing rules, missing rule bases, bad configuration or parameters.
    /// Never retried, never skipped.
    Systemic,
    /// A fact did not fit the rule base.
    InvalidFact,
    /// A cross-reference is missing.
    DataNotFound,
    /// A malformed external payload.
    Mapping,
    /// A remote call failed.
    ExternalApi,
    /// A recoverable write conflict.
    StorageConflict,
    /// Any other storage failure.
    Storage,
    /// Generic processing failure.
    Processing,
    /// Cooperative cancellation.
    Cancelled,
}

impl EngineError {
    /// Returns the fault-policy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::NoRulesConfigured
            | EngineError::RuleCompilation { .. }
            | EngineError::RuleBaseNotFound { .. }
            | EngineError::InvalidJobParameters { .. } => ErrorClass::Systemic,
            EngineError::InvalidFact { .. } => ErrorClass::InvalidFact,
            EngineError::DataNotFound { .. } => ErrorClass::DataNotFound,
            EngineError::Mapping { .. } => ErrorClass::Mapping,
            EngineError::ExternalApi { .. } => ErrorClass::ExternalApi,
            EngineError::StorageConflict { .. } => ErrorClass::StorageConflict,
            EngineError::Storage { .. } => ErrorClass::Storage,
            EngineError::Processing { .. } => ErrorClass::Processing,
            EngineError::StageFailed { cause, .. } => cause.class(),
            EngineError::Cancelled => ErrorClass::Cancelled,
        }
    }

    /// Returns true if retrying the operation can change the outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.class(), ErrorClass::Systemic | ErrorClass::Cancelled)
    }

    /// Shorthand for a [`EngineError::Processing`] error.
    pub fn processing(message: impl Into<String>) -> Self {
        EngineError::Processing {
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::Storage`] error.
    pub fn storage(message: impl Into<String>) -> Self {
        EngineError::Storage {
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
