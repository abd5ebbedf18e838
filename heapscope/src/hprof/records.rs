//! Decoded HPROF records
//!
//! Records borrow from the mapped dump where they carry bulk data (field
//! bytes, array contents, string text), so scanning allocates only for class
//! schemas. [`decode_object`] is the pure point-lookup decoder used by the
//! heap graph: given the offset of an object sub-record it returns the record
//! without touching anything else in the file.

use heapscope_common::{
    BasicType, PrimitiveType, CLASS_DUMP, INSTANCE_DUMP, OBJECT_ARRAY_DUMP, PRIMITIVE_ARRAY_DUMP,
    PRIMITIVE_ARRAY_NODATA,
};

use super::reader::ByteReader;
use crate::domain::{EntityKind, HeapError, IdSize, ObjectId, Result};

/// `STRING_IN_UTF8` record
#[derive(Debug, Clone, Copy)]
pub struct StringRecord<'a> {
    pub id: ObjectId,
    /// Absolute offset of `text` in the dump
    pub text_offset: usize,
    pub text: &'a [u8],
}

/// `LOAD_CLASS` record, binds a class object to its name string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadClassRecord {
    pub class_serial: u32,
    pub class_id: ObjectId,
    pub name_id: ObjectId,
}

/// One entry of a class's instance-field schema
///
/// The type tag is kept raw: an unknown tag is reported when the field is
/// read, not when the class is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name_id: ObjectId,
    pub type_tag: u8,
}

impl FieldSpec {
    #[must_use]
    pub fn basic_type(&self) -> Option<BasicType> {
        BasicType::from_tag(self.type_tag)
    }
}

/// `CLASS_DUMP` sub-record (static fields and constant pool are skipped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDumpRecord {
    pub id: ObjectId,
    pub super_id: Option<ObjectId>,
    pub instance_size: u32,
    pub fields: Vec<FieldSpec>,
}

/// `INSTANCE_DUMP` sub-record
#[derive(Debug, Clone, Copy)]
pub struct InstanceDumpRecord<'a> {
    pub id: ObjectId,
    pub class_id: ObjectId,
    pub field_bytes: &'a [u8],
}

/// `OBJECT_ARRAY_DUMP` sub-record
#[derive(Debug, Clone, Copy)]
pub struct ObjectArrayDumpRecord<'a> {
    pub id: ObjectId,
    pub array_class_id: ObjectId,
    pub len: usize,
    elements: &'a [u8],
    id_size: IdSize,
}

impl ObjectArrayDumpRecord<'_> {
    /// Element identifiers in order, `None` for null slots
    #[must_use]
    pub fn elements(&self) -> Vec<Option<ObjectId>> {
        let mut reader = ByteReader::new(self.elements, self.id_size);
        // Length was checked when the record was decoded.
        (0..self.len).map_while(|_| reader.id().ok()).map(ObjectId::non_null).collect()
    }
}

/// `PRIMITIVE_ARRAY_DUMP` or `PRIMITIVE_ARRAY_NODATA` sub-record
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveArrayDumpRecord<'a> {
    pub id: ObjectId,
    pub element_type: PrimitiveType,
    pub len: usize,
    /// Empty for `PRIMITIVE_ARRAY_NODATA`
    pub bytes: &'a [u8],
}

/// Any object sub-record
#[derive(Debug, Clone)]
pub enum ObjectRecord<'a> {
    Class(ClassDumpRecord),
    Instance(InstanceDumpRecord<'a>),
    ObjectArray(ObjectArrayDumpRecord<'a>),
    PrimitiveArray(PrimitiveArrayDumpRecord<'a>),
}

impl ObjectRecord<'_> {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectRecord::Class(r) => r.id,
            ObjectRecord::Instance(r) => r.id,
            ObjectRecord::ObjectArray(r) => r.id,
            ObjectRecord::PrimitiveArray(r) => r.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            ObjectRecord::Class(_) => EntityKind::Class,
            ObjectRecord::Instance(_) => EntityKind::Instance,
            ObjectRecord::ObjectArray(_) => EntityKind::ObjectArray,
            ObjectRecord::PrimitiveArray(_) => EntityKind::PrimitiveArray,
        }
    }
}

/// Decode the object sub-record whose tag byte is at `offset`
///
/// # Errors
/// Returns `Malformed` if the bytes at `offset` are not a complete object
/// sub-record
pub fn decode_object(data: &[u8], offset: usize, id_size: IdSize) -> Result<ObjectRecord<'_>> {
    let mut reader = ByteReader::at(data, offset, id_size)?;
    let tag = reader.u8()?;
    read_object_body(tag, &mut reader)?
        .ok_or_else(|| HeapError::malformed(offset, format!("tag 0x{tag:02x} is not an object")))
}

/// Read the body of an object sub-record whose tag was already consumed
///
/// Returns `Ok(None)` if `tag` is not an object sub-record; the reader is
/// left untouched in that case.
pub(crate) fn read_object_body<'a>(
    tag: u8,
    reader: &mut ByteReader<'a>,
) -> Result<Option<ObjectRecord<'a>>> {
    let record = match tag {
        CLASS_DUMP => ObjectRecord::Class(read_class_dump(reader)?),
        INSTANCE_DUMP => {
            let id = reader.id()?;
            reader.skip(4)?; // stack trace serial
            let class_id = reader.id()?;
            let len = reader.len_u32()?;
            let field_bytes = reader.bytes(len)?;
            ObjectRecord::Instance(InstanceDumpRecord { id, class_id, field_bytes })
        }
        OBJECT_ARRAY_DUMP => {
            let id = reader.id()?;
            reader.skip(4)?;
            let len = reader.len_u32()?;
            let array_class_id = reader.id()?;
            let id_size = reader.id_size();
            let byte_len = len
                .checked_mul(id_size.bytes())
                .ok_or_else(|| HeapError::malformed(reader.position(), "array too large"))?;
            let elements = reader.bytes(byte_len)?;
            ObjectRecord::ObjectArray(ObjectArrayDumpRecord {
                id,
                array_class_id,
                len,
                elements,
                id_size,
            })
        }
        PRIMITIVE_ARRAY_DUMP | PRIMITIVE_ARRAY_NODATA => {
            let id = reader.id()?;
            reader.skip(4)?;
            let len = reader.len_u32()?;
            let type_offset = reader.position();
            let element_type = match BasicType::from_tag(reader.u8()?) {
                Some(BasicType::Primitive(p)) => p,
                _ => return Err(HeapError::malformed(type_offset, "bad primitive array type")),
            };
            let bytes = if tag == PRIMITIVE_ARRAY_DUMP {
                let byte_len = len
                    .checked_mul(element_type.size())
                    .ok_or_else(|| HeapError::malformed(type_offset, "array too large"))?;
                reader.bytes(byte_len)?
            } else {
                &[]
            };
            ObjectRecord::PrimitiveArray(PrimitiveArrayDumpRecord { id, element_type, len, bytes })
        }
        _ => return Ok(None),
    };
    Ok(Some(record))
}

fn read_class_dump(reader: &mut ByteReader<'_>) -> Result<ClassDumpRecord> {
    let id_bytes = reader.id_size().bytes();
    let id = reader.id()?;
    reader.skip(4)?; // stack trace serial
    let super_id = reader.id()?.non_null();
    // class loader, signers, protection domain, two reserved identifiers
    reader.skip(id_bytes * 5)?;
    let instance_size = reader.u32()?;

    let constant_pool = reader.u16()?;
    for _ in 0..constant_pool {
        reader.skip(2)?; // constant pool index
        skip_typed_value(reader)?;
    }

    let statics = reader.u16()?;
    for _ in 0..statics {
        reader.skip(id_bytes)?; // name
        skip_typed_value(reader)?;
    }

    let field_count = reader.u16()?;
    let mut fields = Vec::with_capacity(usize::from(field_count));
    for _ in 0..field_count {
        let name_id = reader.id()?;
        let type_tag = reader.u8()?;
        fields.push(FieldSpec { name_id, type_tag });
    }

    Ok(ClassDumpRecord { id, super_id, instance_size, fields })
}

/// Skip a `u8:type value` pair; the value size depends on the type, so an
/// unknown type makes the rest of the record unreadable.
fn skip_typed_value(reader: &mut ByteReader<'_>) -> Result<()> {
    let offset = reader.position();
    let tag = reader.u8()?;
    let ty = BasicType::from_tag(tag)
        .ok_or_else(|| HeapError::malformed(offset, format!("unknown value type {tag}")))?;
    reader.skip(ty.size(reader.id_size().bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HeapValue;
    use crate::hprof::writer::HprofWriter;
    use crate::hprof::{RecordScanner, RecordVisitor};

    #[derive(Default)]
    struct Offsets(Vec<(ObjectId, usize)>);

    impl RecordVisitor for Offsets {
        fn on_object(&mut self, offset: usize, record: &ObjectRecord<'_>) {
            self.0.push((record.id(), offset));
        }
    }

    #[test]
    fn test_decode_object_at_scanned_offsets() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let object = writer.class("java.lang.Object", None, &[]);
        let node = writer.class("com.example.Node", Some(object), &[("next", BasicType::Object)]);
        let instance = writer.instance(node, &[HeapValue::Reference(None)]);
        let array = writer.primitive_array(PrimitiveType::Int, &[0, 0, 0, 7]);
        let data = writer.into_bytes();

        let scanner = RecordScanner::new(&data).unwrap();
        let mut offsets = Offsets::default();
        scanner.scan(&mut offsets).unwrap();

        for (id, offset) in &offsets.0 {
            let record = decode_object(&data, *offset, IdSize::Eight).unwrap();
            assert_eq!(record.id(), *id);
        }

        let (_, node_offset) = offsets.0.iter().find(|(id, _)| *id == node).unwrap();
        let ObjectRecord::Class(class) = decode_object(&data, *node_offset, IdSize::Eight).unwrap()
        else {
            panic!("expected a class record");
        };
        assert_eq!(class.super_id, Some(object));
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].basic_type(), Some(BasicType::Object));

        let (_, instance_offset) = offsets.0.iter().find(|(id, _)| *id == instance).unwrap();
        let record = decode_object(&data, *instance_offset, IdSize::Eight).unwrap();
        assert_eq!(record.kind(), EntityKind::Instance);

        let (_, array_offset) = offsets.0.iter().find(|(id, _)| *id == array).unwrap();
        let ObjectRecord::PrimitiveArray(prim) =
            decode_object(&data, *array_offset, IdSize::Eight).unwrap()
        else {
            panic!("expected a primitive array");
        };
        assert_eq!(prim.element_type, PrimitiveType::Int);
        assert_eq!(prim.len, 1);
    }

    #[test]
    fn test_decode_object_rejects_non_object_offset() {
        let data = [0xFFu8, 0, 0, 0, 1];
        let err = decode_object(&data, 0, IdSize::Four).unwrap_err();
        assert!(matches!(err, HeapError::Malformed { offset: 0, .. }));
    }

    #[test]
    fn test_object_array_elements_map_zero_to_none() {
        let mut writer = HprofWriter::new(IdSize::Four);
        let object = writer.class("java.lang.Object", None, &[]);
        let array_class = writer.class("java.lang.Object[]", Some(object), &[]);
        let array = writer.object_array(array_class, &[Some(object), None]);
        let data = writer.into_bytes();

        let scanner = RecordScanner::new(&data).unwrap();
        let mut offsets = Offsets::default();
        scanner.scan(&mut offsets).unwrap();
        let (_, offset) = offsets.0.iter().find(|(id, _)| *id == array).unwrap();
        let ObjectRecord::ObjectArray(record) = decode_object(&data, *offset, IdSize::Four).unwrap()
        else {
            panic!("expected an object array");
        };
        assert_eq!(record.array_class_id, array_class);
        assert_eq!(record.elements(), vec![Some(object), None]);
    }

    #[test]
    fn test_constant_pool_and_statics_are_skipped() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let object = writer.class("java.lang.Object", None, &[]);
        let leak = writer.class_with_statics(
            "com.example.Leak",
            Some(object),
            &[(3, HeapValue::Double(0.5))],
            &[
                ("INSTANCE", HeapValue::Reference(Some(object))),
                ("CREATED", HeapValue::Long(1_700_000_000_000)),
            ],
            &[("size", BasicType::Primitive(PrimitiveType::Int)), ("next", BasicType::Object)],
        );
        // A class written after the statics must still decode
        let after = writer.class("com.example.After", Some(object), &[]);
        let instance = writer.instance(leak, &[HeapValue::Int(9), HeapValue::Reference(None)]);
        let data = writer.into_bytes();

        let scanner = RecordScanner::new(&data).unwrap();
        let mut offsets = Offsets::default();
        scanner.scan(&mut offsets).unwrap();
        let offset_of = |wanted: ObjectId| {
            offsets.0.iter().find(|(id, _)| *id == wanted).map(|(_, offset)| *offset).unwrap()
        };

        let ObjectRecord::Class(class) = decode_object(&data, offset_of(leak), IdSize::Eight).unwrap()
        else {
            panic!("expected a class record");
        };
        let types: Vec<_> = class.fields.iter().map(FieldSpec::basic_type).collect();
        assert_eq!(
            types,
            vec![Some(BasicType::Primitive(PrimitiveType::Int)), Some(BasicType::Object)]
        );
        assert_eq!(class.instance_size, 12);

        let record = decode_object(&data, offset_of(after), IdSize::Eight).unwrap();
        assert_eq!(record.kind(), EntityKind::Class);
        let ObjectRecord::Instance(record) =
            decode_object(&data, offset_of(instance), IdSize::Eight).unwrap()
        else {
            panic!("expected an instance");
        };
        assert_eq!(record.class_id, leak);
        assert_eq!(&record.field_bytes[..4], &9i32.to_be_bytes());
    }

    #[test]
    fn test_nodata_array_has_length_but_no_bytes() {
        let mut writer = HprofWriter::new(IdSize::Four);
        let array = writer.primitive_array_nodata(PrimitiveType::Char, 5);
        let data = writer.into_bytes();

        let scanner = RecordScanner::new(&data).unwrap();
        let mut offsets = Offsets::default();
        scanner.scan(&mut offsets).unwrap();
        assert_eq!(offsets.0.len(), 1);
        let (id, offset) = offsets.0[0];
        assert_eq!(id, array);
        assert_eq!(data[offset], PRIMITIVE_ARRAY_NODATA);

        let ObjectRecord::PrimitiveArray(record) = decode_object(&data, offset, IdSize::Four).unwrap()
        else {
            panic!("expected a primitive array");
        };
        assert_eq!(record.element_type, PrimitiveType::Char);
        assert_eq!(record.len, 5);
        assert!(record.bytes.is_empty());
    }
}
