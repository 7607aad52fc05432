//! Structured error types shared across FFS crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`FfsError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, interface indices, offending lines).
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

/// Canonical error type for the FFS coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum FfsError {
    /// Invalid run construction (ladder, budgets, order parameter count).
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Corrupted configuration dumps or index lines.
    #[error("data error: {0}")]
    Data(ErrorInfo),
    /// Filesystem failures while touching run artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Collective communication failures, including population aborts.
    #[error("comm error: {0}")]
    Comm(ErrorInfo),
    /// Required records are missing (empty library, empty interface).
    #[error("exhausted: {0}")]
    Exhausted(ErrorInfo),
    /// Serialization and schema errors.
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

impl FfsError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            FfsError::Config(info)
            | FfsError::Data(info)
            | FfsError::Io(info)
            | FfsError::Comm(info)
            | FfsError::Exhausted(info)
            | FfsError::Serde(info) => info,
        }
    }

    /// Wraps an IO failure together with the path that caused it.
    pub fn io(code: &str, path: &std::path::Path, err: impl ToString) -> Self {
        FfsError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }

    /// Process exit status used when this error aborts the walker population.
    pub fn abort_code(&self) -> i32 {
        match self {
            FfsError::Config(_) => 2,
            FfsError::Data(_) => 3,
            FfsError::Exhausted(_) => 4,
            FfsError::Io(_) | FfsError::Comm(_) | FfsError::Serde(_) => 1,
        }
    }
}
