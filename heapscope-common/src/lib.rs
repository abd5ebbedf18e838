//! # Shared HPROF Format Definitions
//!
//! Constants and small value types describing the HPROF binary layout. They
//! are shared by the record scanner (reading), the fixture writer (tests and
//! the demo dump generator in `xtask`) and anything else that needs to agree
//! on tag values and encoded sizes.
//!
//! ## Layout Summary
//!
//! ```text
//! header   := version-string NUL  u32:id_size  u64:timestamp_ms
//! record   := u8:tag  u32:time_offset  u32:body_length  body
//! heapdump := sub-record*            (body of HEAP_DUMP / HEAP_DUMP_SEGMENT)
//! ```
//!
//! All multi-byte integers are big-endian. Identifiers are `id_size` bytes
//! wide (4 or 8).
//!
//! ## Key Types
//!
//! - [`BasicType`] - Type tag used for fields and primitive arrays
//! - [`PrimitiveType`] - The eight non-reference basic types

#![cfg_attr(not(test), no_std)]

// ============================================================================
// Header
// ============================================================================

/// Version strings accepted at the start of a dump.
///
/// `1.0.1` and `1.0.2` are written by HotSpot, `1.0.3` by the Android runtime.
pub const SUPPORTED_VERSIONS: [&str; 3] =
    ["JAVA PROFILE 1.0.1", "JAVA PROFILE 1.0.2", "JAVA PROFILE 1.0.3"];

/// Version string written by the fixture writer.
pub const DEFAULT_VERSION: &str = "JAVA PROFILE 1.0.2";

// ============================================================================
// Top-Level Record Tags
// ============================================================================

/// **String table entry**: `id:string_id  utf8-bytes`
///
/// Body length minus the identifier size gives the byte length of the text.
pub const TAG_STRING_IN_UTF8: u8 = 0x01;

/// **Class name binding**: `u32:serial  id:class_id  u32:stack_serial  id:name_string_id`
pub const TAG_LOAD_CLASS: u8 = 0x02;

/// **Heap dump**: body is a sequence of heap-dump sub-records
pub const TAG_HEAP_DUMP: u8 = 0x0C;

/// **Heap dump segment**: same body as [`TAG_HEAP_DUMP`], dumps may contain many
pub const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1C;

/// **End of segmented heap dump** (empty body)
pub const TAG_HEAP_DUMP_END: u8 = 0x2C;

/// Size of the `tag + time_offset + length` prefix of every top-level record
pub const RECORD_HEADER_SIZE: usize = 9;

// ============================================================================
// Heap-Dump Sub-Record Tags
// ============================================================================

/// Root of unknown type: `id`
pub const ROOT_UNKNOWN: u8 = 0xFF;
/// JNI global root: `id  id:jni_ref`
pub const ROOT_JNI_GLOBAL: u8 = 0x01;
/// JNI local root: `id  u32:thread  u32:frame`
pub const ROOT_JNI_LOCAL: u8 = 0x02;
/// Java frame root: `id  u32:thread  u32:frame`
pub const ROOT_JAVA_FRAME: u8 = 0x03;
/// Native stack root: `id  u32:thread`
pub const ROOT_NATIVE_STACK: u8 = 0x04;
/// Sticky class root: `id`
pub const ROOT_STICKY_CLASS: u8 = 0x05;
/// Thread block root: `id  u32:thread`
pub const ROOT_THREAD_BLOCK: u8 = 0x06;
/// Monitor used root: `id`
pub const ROOT_MONITOR_USED: u8 = 0x07;
/// Thread object root: `id  u32:thread  u32:stack`
pub const ROOT_THREAD_OBJECT: u8 = 0x08;

/// Android: interned string root: `id`
pub const ROOT_INTERNED_STRING: u8 = 0x89;
/// Android: finalizing root: `id`
pub const ROOT_FINALIZING: u8 = 0x8A;
/// Android: debugger root: `id`
pub const ROOT_DEBUGGER: u8 = 0x8B;
/// Android: reference cleanup root: `id`
pub const ROOT_REFERENCE_CLEANUP: u8 = 0x8C;
/// Android: VM internal root: `id`
pub const ROOT_VM_INTERNAL: u8 = 0x8D;
/// Android: JNI monitor root: `id  u32:thread  u32:depth`
pub const ROOT_JNI_MONITOR: u8 = 0x8E;
/// Android: unreachable object marker: `id`
pub const ROOT_UNREACHABLE: u8 = 0x90;
/// Android: heap switch marker: `u32:heap_id  id:heap_name`
pub const HEAP_DUMP_INFO: u8 = 0xFE;

/// Class definition, see the scanner for the full layout
pub const CLASS_DUMP: u8 = 0x20;
/// Object instance: `id  u32:stack  id:class  u32:n  [u8; n]`
pub const INSTANCE_DUMP: u8 = 0x21;
/// Object array: `id  u32:stack  u32:n  id:array_class  [id; n]`
pub const OBJECT_ARRAY_DUMP: u8 = 0x22;
/// Primitive array: `id  u32:stack  u32:n  u8:type  [elem; n]`
pub const PRIMITIVE_ARRAY_DUMP: u8 = 0x23;
/// Android: primitive array without contents: `id  u32:stack  u32:n  u8:type`
pub const PRIMITIVE_ARRAY_NODATA: u8 = 0xC3;

// ============================================================================
// Basic Types
// ============================================================================

/// The eight primitive basic types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl PrimitiveType {
    /// Encoded size of one value in bytes
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Byte => 1,
            PrimitiveType::Char | PrimitiveType::Short => 2,
            PrimitiveType::Float | PrimitiveType::Int => 4,
            PrimitiveType::Double | PrimitiveType::Long => 8,
        }
    }

    /// Tag value used in the dump
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            PrimitiveType::Boolean => 4,
            PrimitiveType::Char => 5,
            PrimitiveType::Float => 6,
            PrimitiveType::Double => 7,
            PrimitiveType::Byte => 8,
            PrimitiveType::Short => 9,
            PrimitiveType::Int => 10,
            PrimitiveType::Long => 11,
        }
    }

    /// Java keyword for the type (`int`, `boolean`, ...)
    #[must_use]
    pub const fn java_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
        }
    }
}

/// Type tag of a field or array element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    /// Reference, encoded as an identifier
    Object,
    Primitive(PrimitiveType),
}

/// Tag value of [`BasicType::Object`]
pub const OBJECT_TYPE_TAG: u8 = 2;

impl BasicType {
    /// Decode a type tag, `None` for values outside the format
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<BasicType> {
        let ty = match tag {
            OBJECT_TYPE_TAG => BasicType::Object,
            4 => BasicType::Primitive(PrimitiveType::Boolean),
            5 => BasicType::Primitive(PrimitiveType::Char),
            6 => BasicType::Primitive(PrimitiveType::Float),
            7 => BasicType::Primitive(PrimitiveType::Double),
            8 => BasicType::Primitive(PrimitiveType::Byte),
            9 => BasicType::Primitive(PrimitiveType::Short),
            10 => BasicType::Primitive(PrimitiveType::Int),
            11 => BasicType::Primitive(PrimitiveType::Long),
            _ => return None,
        };
        Some(ty)
    }

    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            BasicType::Object => OBJECT_TYPE_TAG,
            BasicType::Primitive(p) => p.tag(),
        }
    }

    /// Encoded size given the dump's identifier size
    #[must_use]
    pub const fn size(self, id_size: usize) -> usize {
        match self {
            BasicType::Object => id_size,
            BasicType::Primitive(p) => p.size(),
        }
    }
}

/// Fixed body size of a root sub-record (excluding its tag), `None` if `tag`
/// is not a root
#[must_use]
pub const fn root_record_size(tag: u8, id_size: usize) -> Option<usize> {
    let size = match tag {
        ROOT_UNKNOWN | ROOT_STICKY_CLASS | ROOT_MONITOR_USED | ROOT_INTERNED_STRING
        | ROOT_FINALIZING | ROOT_DEBUGGER | ROOT_REFERENCE_CLEANUP | ROOT_VM_INTERNAL
        | ROOT_UNREACHABLE => id_size,
        ROOT_JNI_GLOBAL => id_size * 2,
        ROOT_JNI_LOCAL | ROOT_JAVA_FRAME | ROOT_THREAD_OBJECT | ROOT_JNI_MONITOR => id_size + 8,
        ROOT_NATIVE_STACK | ROOT_THREAD_BLOCK | HEAP_DUMP_INFO => id_size + 4,
        _ => return None,
    };
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_type_tags_round_trip() {
        for tag in [2u8, 4, 5, 6, 7, 8, 9, 10, 11] {
            let ty = BasicType::from_tag(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert_eq!(BasicType::from_tag(3), None);
        assert_eq!(BasicType::from_tag(12), None);
    }

    #[test]
    fn test_sizes_follow_id_size() {
        assert_eq!(BasicType::Object.size(4), 4);
        assert_eq!(BasicType::Object.size(8), 8);
        assert_eq!(BasicType::Primitive(PrimitiveType::Long).size(4), 8);
        assert_eq!(root_record_size(ROOT_JAVA_FRAME, 8), Some(16));
        assert_eq!(root_record_size(HEAP_DUMP_INFO, 4), Some(8));
        assert_eq!(root_record_size(CLASS_DUMP, 8), None);
    }
}
