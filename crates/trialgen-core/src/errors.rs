//! Structured error types shared across trialgen crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`TrialgenError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (trial index, label, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the trial-sequence generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum TrialgenError {
    /// Invalid configuration knobs.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Missing or malformed condition pool.
    #[error("pool error: {0}")]
    Pool(ErrorInfo),
    /// A label whose relational precondition cannot be met.
    #[error("infeasible sequence: {0}")]
    Infeasible(ErrorInfo),
    /// Output directory layout violations.
    #[error("layout error: {0}")]
    Layout(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization and file I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl TrialgenError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            TrialgenError::Config(info)
            | TrialgenError::Pool(info)
            | TrialgenError::Infeasible(info)
            | TrialgenError::Layout(info)
            | TrialgenError::Rng(info)
            | TrialgenError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`TrialgenError::Config`] with a single context entry.
    pub fn config(code: &str, message: impl Into<String>, key: &str, value: impl ToString) -> Self {
        TrialgenError::Config(ErrorInfo::new(code, message).with_context(key, value.to_string()))
    }

    /// Wraps an I/O or serialization failure tied to a filesystem path.
    pub fn io(code: &str, err: impl ToString, path: &std::path::Path) -> Self {
        TrialgenError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }
}
