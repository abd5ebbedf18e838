//! `java.lang.String` contents
//!
//! A string instance does not hold its characters; its `value` field points
//! at a backing array. Which array type and which extra fields apply depends
//! on the runtime that wrote the dump:
//!
//! | Runtime             | `value`  | extra fields       | encoding         |
//! |---------------------|----------|--------------------|------------------|
//! | JDK 6 and older     | `char[]` | `offset`, `count`  | UTF-16           |
//! | JDK 7, 8, Android   | `char[]` | none               | UTF-16           |
//! | JDK 9+ compact      | `byte[]` | `coder`            | Latin-1/UTF-16LE |
//! | Android 8+ compact  | `byte[]` | none               | ASCII            |

use heapscope_common::PrimitiveType;

use super::entity::{HeapEntity, InstanceEntity, PrimitiveArrayEntity};
use super::fields::FieldResolver;
use super::heap_graph::HeapGraph;
use crate::domain::{EntityKind, HeapError, Result};

pub const JAVA_LANG_STRING: &str = "java.lang.String";

/// `coder` value of a UTF-16 compact string
const CODER_UTF16: i64 = 1;

impl HeapGraph {
    /// Decode the contents of a `java.lang.String` instance
    ///
    /// # Errors
    /// `Schema` if the instance has no usable `value` field or the backing
    /// array is missing its contents, `NotFound`/`WrongKind` if `value` does
    /// not point at a primitive array
    pub fn read_java_string(&self, instance: &InstanceEntity) -> Result<String> {
        let mut layout = StringLayout::default();
        for field in FieldResolver::new(self).fields(instance) {
            let field = field?;
            if field.declaring_class.name != JAVA_LANG_STRING {
                continue;
            }
            match field.name.as_str() {
                "value" => layout.value = Some(field.value),
                "offset" => layout.offset = field.value.as_i64(),
                "count" => layout.count = field.value.as_i64(),
                "coder" => layout.coder = field.value.as_i64(),
                _ => {}
            }
        }

        let array_id = layout
            .value
            .ok_or_else(|| string_schema_error("no value field"))?
            .as_reference()
            .ok_or_else(|| string_schema_error("value is null or not a reference"))?;
        let array = match self.resolve(array_id)? {
            HeapEntity::PrimitiveArray(array) => array,
            other => {
                return Err(HeapError::WrongKind {
                    id: array_id,
                    expected: EntityKind::PrimitiveArray,
                    actual: other.kind(),
                })
            }
        };
        decode_backing_array(&array, &layout)
    }
}

#[derive(Default)]
struct StringLayout {
    value: Option<super::HeapValue>,
    offset: Option<i64>,
    count: Option<i64>,
    coder: Option<i64>,
}

fn decode_backing_array(array: &PrimitiveArrayEntity, layout: &StringLayout) -> Result<String> {
    if array.bytes.is_empty() && array.len > 0 {
        return Err(string_schema_error("backing array contents are not in the dump"));
    }
    match array.element_type {
        PrimitiveType::Char => {
            let units: Vec<u16> = array
                .bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            Ok(String::from_utf16_lossy(window(&units, layout)))
        }
        PrimitiveType::Byte if layout.coder == Some(CODER_UTF16) => {
            let units: Vec<u16> = array
                .bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Ok(String::from_utf16_lossy(window(&units, layout)))
        }
        PrimitiveType::Byte => {
            Ok(window(&array.bytes, layout).iter().map(|&b| char::from(b)).collect())
        }
        other => Err(string_schema_error(&format!(
            "backing array of type {}[] is not text",
            other.java_name()
        ))),
    }
}

/// Slice selected by the `offset`/`count` fields, clamped to the array
fn window<'a, T>(items: &'a [T], layout: &StringLayout) -> &'a [T] {
    let len = items.len();
    let start = layout.offset.map_or(0, |o| usize::try_from(o).unwrap_or(0)).min(len);
    let end = layout
        .count
        .map_or(len, |c| start.saturating_add(usize::try_from(c).unwrap_or(0)))
        .min(len);
    &items[start..end]
}

fn string_schema_error(reason: &str) -> HeapError {
    HeapError::Schema {
        class: JAVA_LANG_STRING.to_string(),
        field: "value".to_string(),
        reason: reason.to_string(),
    }
}
