//! Unified application error model.
//! This module provides the common error enum used across the record manager,
//! storage, identity and CLI layers, along with helpers describing how each
//! kind should be handled by callers.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// The table identifier is not registered. Programmer error, fatal to the call.
    UnknownTable { code: String, message: String },
    /// The operation is disabled for the table. Checked before any backend call.
    PermissionDenied { code: String, message: String },
    /// Malformed or missing input. The caller should re-prompt.
    Validation { code: String, message: String },
    /// A key could not be resolved against the current session list.
    NotFound { code: String, message: String },
    /// A backend call failed; wraps the underlying cause.
    Storage { code: String, message: String },
    /// Login or registration rejected.
    Auth { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UnknownTable { code, .. }
            | AppError::PermissionDenied { code, .. }
            | AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UnknownTable { message, .. }
            | AppError::PermissionDenied { message, .. }
            | AppError::Validation { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn unknown_table<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::UnknownTable { code: code.into(), message: msg.into() } }
    pub fn permission_denied<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::PermissionDenied { code: code.into(), message: msg.into() } }
    pub fn validation<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn storage<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn auth<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Whether the caller can sensibly recover (re-prompt, retry or surface to
    /// the end user) rather than treat the failure as a bug.
    pub fn recoverable(&self) -> bool {
        match self {
            AppError::PermissionDenied { .. }
            | AppError::Validation { .. }
            | AppError::NotFound { .. }
            | AppError::Storage { .. }
            | AppError::Auth { .. } => true,
            AppError::UnknownTable { .. } | AppError::Internal { .. } => false,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_mapping() {
        assert!(AppError::permission_denied("op_disabled", "no").recoverable());
        assert!(AppError::validation("bad_input", "oops").recoverable());
        assert!(AppError::not_found("no_such_key", "missing").recoverable());
        assert!(AppError::storage("sqlite", "locked").recoverable());
        assert!(AppError::auth("invalid_credentials", "no").recoverable());
        assert!(!AppError::unknown_table("unknown_table", "bad id").recoverable());
        assert!(!AppError::internal("bug", "panic").recoverable());
    }

    #[test]
    fn display_includes_code_and_message() {
        let e = AppError::not_found("no_such_key", "key 7 not in hospitals");
        assert_eq!(e.code_str(), "no_such_key");
        assert_eq!(e.to_string(), "no_such_key: key 7 not in hospitals");
    }
}
