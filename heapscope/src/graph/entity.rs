//! Heap entities decoded from object sub-records
//!
//! Entities own their data: each lookup decodes a fresh copy and hands it to
//! the caller, nothing is cached behind the graph.

use heapscope_common::PrimitiveType;

use crate::domain::{EntityKind, ObjectId};
use crate::hprof::FieldSpec;

/// Class metadata: name and instance-field schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntity {
    pub id: ObjectId,
    /// Fully-qualified, normalized name (`java.lang.String`, `int[]`)
    pub name: String,
    pub superclass: Option<ObjectId>,
    pub instance_size: u32,
    /// Instance fields declared by this class only, in declaration order
    pub fields: Vec<FieldSpec>,
}

impl ClassEntity {
    /// Name without its package
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceEntity {
    pub id: ObjectId,
    pub class_id: ObjectId,
    /// Raw field storage: own fields first, then each superclass's
    pub field_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectArrayEntity {
    pub id: ObjectId,
    pub array_class_id: ObjectId,
    /// Display name of the array class, e.g. `java.lang.Object[]`
    pub class_name: String,
    pub elements: Vec<Option<ObjectId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveArrayEntity {
    pub id: ObjectId,
    pub element_type: PrimitiveType,
    pub len: usize,
    /// Big-endian elements; empty when the dump omitted the contents
    pub bytes: Vec<u8>,
}

/// Any entity an identifier can name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapEntity {
    Class(ClassEntity),
    Instance(InstanceEntity),
    ObjectArray(ObjectArrayEntity),
    PrimitiveArray(PrimitiveArrayEntity),
}

impl HeapEntity {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            HeapEntity::Class(e) => e.id,
            HeapEntity::Instance(e) => e.id,
            HeapEntity::ObjectArray(e) => e.id,
            HeapEntity::PrimitiveArray(e) => e.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            HeapEntity::Class(_) => EntityKind::Class,
            HeapEntity::Instance(_) => EntityKind::Instance,
            HeapEntity::ObjectArray(_) => EntityKind::ObjectArray,
            HeapEntity::PrimitiveArray(_) => EntityKind::PrimitiveArray,
        }
    }
}

/// Text after the last `.` of a qualified name
#[must_use]
pub fn simple_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, simple)| simple)
}

/// Turn a class name as stored in the dump into source form
///
/// HotSpot writes internal names (`java/lang/String`, `[Ljava/lang/Object;`,
/// `[[I`); Android writes source names already, which pass through unchanged.
#[must_use]
pub fn normalize_class_name(raw: &str) -> String {
    let dims = raw.bytes().take_while(|&b| b == b'[').count();
    if dims == 0 {
        return raw.replace('/', ".");
    }

    let element = &raw[dims..];
    let base = match element {
        "Z" => "boolean".to_string(),
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "S" => "short".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        _ => match element.strip_prefix('L').and_then(|e| e.strip_suffix(';')) {
            Some(class) => class.replace('/', "."),
            None => return raw.replace('/', "."),
        },
    };
    format!("{base}{}", "[]".repeat(dims))
}
