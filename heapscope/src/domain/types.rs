//! Domain types providing compile-time safety and self-documentation
//!
//! Identifiers read from the dump are wrapped so an object identifier cannot be
//! confused with a byte offset or a string-table identifier length.

use std::fmt;

/// Identifier of a heap entity (class, instance or array)
///
/// Dumps written with 4-byte identifiers are widened to 64 bits. Identifiers
/// are unique within one dump and mean nothing across dumps. Displayed in
/// decimal, the way the instance rows (`@<id>`) show them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// The null reference as encoded in the dump
    pub const NULL: ObjectId = ObjectId(0);

    /// Returns `None` for the null identifier
    #[must_use]
    pub fn non_null(self) -> Option<ObjectId> {
        if self == Self::NULL {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(id: u64) -> Self {
        ObjectId(id)
    }
}

/// The four kinds of heap entity an identifier can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Class,
    Instance,
    ObjectArray,
    PrimitiveArray,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Class => "class",
            EntityKind::Instance => "instance",
            EntityKind::ObjectArray => "object array",
            EntityKind::PrimitiveArray => "primitive array",
        };
        f.write_str(name)
    }
}

/// Width of identifiers in a dump, fixed by its header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSize {
    Four,
    Eight,
}

impl IdSize {
    /// Parse the header field, `None` for widths the format does not define
    #[must_use]
    pub fn from_header(size: u32) -> Option<IdSize> {
        match size {
            4 => Some(IdSize::Four),
            8 => Some(IdSize::Eight),
            _ => None,
        }
    }

    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            IdSize::Four => 4,
            IdSize::Eight => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_display_is_decimal() {
        assert_eq!(ObjectId(0x10).to_string(), "16");
    }

    #[test]
    fn test_null_id() {
        assert_eq!(ObjectId(0).non_null(), None);
        assert_eq!(ObjectId(7).non_null(), Some(ObjectId(7)));
    }

    #[test]
    fn test_id_size_from_header() {
        assert_eq!(IdSize::from_header(4), Some(IdSize::Four));
        assert_eq!(IdSize::from_header(8).map(IdSize::bytes), Some(8));
        assert_eq!(IdSize::from_header(2), None);
    }
}
