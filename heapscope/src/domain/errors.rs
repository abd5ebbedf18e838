//! Structured error types for heapscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! Errors fall in two groups. Fatal ones (`Io`, `Malformed`, `SessionClosed`)
//! end the exploration session. The others describe one bad identifier or one
//! bad field and are contained where they occur: a placeholder is rendered and
//! the rest of the listing carries on.

use super::types::{EntityKind, ObjectId};
use thiserror::Error;

pub type Result<T, E = HeapError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Failed to read heap dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed heap dump at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("No heap entity with identifier {0}")]
    NotFound(ObjectId),

    #[error("Schema error in {class}.{field}: {reason}")]
    Schema { class: String, field: String, reason: String },

    #[error("Identifier {id} names a {actual}, expected a {expected}")]
    WrongKind { id: ObjectId, expected: EntityKind, actual: EntityKind },

    #[error("Heap dump session is closed")]
    SessionClosed,
}

impl HeapError {
    /// Returns true if the error ends the session rather than one row
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, HeapError::Io(_) | HeapError::Malformed { .. } | HeapError::SessionClosed)
    }

    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        HeapError::Malformed { offset, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = HeapError::NotFound(ObjectId(1234));
        assert_eq!(err.to_string(), "No heap entity with identifier 1234");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_schema_error_names_field_and_class() {
        let err = HeapError::Schema {
            class: "com.example.Leak".to_string(),
            field: "name".to_string(),
            reason: "unrecognized type tag 13".to_string(),
        };
        assert!(err.to_string().contains("com.example.Leak.name"));
        assert!(err.to_string().contains("13"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(HeapError::malformed(12, "truncated record").is_fatal());
        assert!(HeapError::SessionClosed.is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(HeapError::from(io).is_fatal());
    }

    #[test]
    fn test_wrong_kind_display() {
        let err = HeapError::WrongKind {
            id: ObjectId(9),
            expected: EntityKind::Class,
            actual: EntityKind::PrimitiveArray,
        };
        assert_eq!(err.to_string(), "Identifier 9 names a primitive array, expected a class");
    }
}
