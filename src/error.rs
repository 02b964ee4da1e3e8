//! Error types for every fallible operation in the crate.
//!
//! Each concern gets its own enum so callers can match on exactly the
//! failures an operation can produce.

use thiserror::Error;

/// Invalid references passed to the attendance store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("session {session_id} not found in class {class_id}")]
    SessionNotFound { class_id: String, session_id: String },

    #[error("student {student_id} is not enrolled in class {class_id}")]
    StudentNotFound { class_id: String, student_id: String },
}

/// Failures while building or writing an export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Class data is malformed (bad JSON, missing collections, unusable name)
    #[error("invalid class data: {0}")]
    InvalidInput(String),

    #[error("no students found to export in {0}")]
    NoStudents(String),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("file operation error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the persisted key-value store.
#[derive(Error, Debug)]
pub enum KvError {
    #[error("file operation error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt key-value file: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failures of the authentication store.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no user is signed in")]
    NotAuthenticated,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("session storage error: {0}")]
    Storage(#[from] KvError),

    #[error("session state could not be encoded: {0}")]
    Serde(#[from] serde_json::Error),
}
