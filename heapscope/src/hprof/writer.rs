//! HPROF writer for fixture dumps
//!
//! Builds small, well-formed dumps in memory: used by the tests and by the
//! `xtask demo-dump` command. Identifiers are allocated sequentially and
//! string-table entries are interned, so callers only deal with names and
//! values. A few escape hatches (`class_with_type_tags`,
//! `instance_with_bytes`, `raw_sub_record`) write deliberately corrupt data.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use heapscope_common::{
    BasicType, PrimitiveType, CLASS_DUMP, DEFAULT_VERSION, INSTANCE_DUMP, OBJECT_ARRAY_DUMP,
    PRIMITIVE_ARRAY_DUMP, PRIMITIVE_ARRAY_NODATA, ROOT_UNKNOWN, TAG_HEAP_DUMP_END,
    TAG_HEAP_DUMP_SEGMENT, TAG_LOAD_CLASS, TAG_STRING_IN_UTF8,
};

use crate::domain::{IdSize, ObjectId};
use crate::graph::{HeapValue, JAVA_LANG_STRING};

pub struct HprofWriter {
    id_size: IdSize,
    records: Vec<u8>,
    segment: Vec<u8>,
    strings: HashMap<String, ObjectId>,
    next_id: u64,
    next_class_serial: u32,
}

impl HprofWriter {
    /// Start a dump with the default version string and a zero timestamp
    #[must_use]
    pub fn new(id_size: IdSize) -> Self {
        let mut records = Vec::new();
        records.extend_from_slice(DEFAULT_VERSION.as_bytes());
        records.push(0);
        records.extend_from_slice(&u32::try_from(id_size.bytes()).unwrap_or(8).to_be_bytes());
        records.extend_from_slice(&0u64.to_be_bytes());

        Self {
            id_size,
            records,
            segment: Vec::new(),
            strings: HashMap::new(),
            next_id: 1,
            next_class_serial: 1,
        }
    }

    /// Allocate a fresh identifier without writing anything
    pub fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Intern `text` in the string table
    pub fn string(&mut self, text: &str) -> ObjectId {
        if let Some(&id) = self.strings.get(text) {
            return id;
        }
        let id = self.alloc_id();
        let mut body = Vec::new();
        self.put_id(&mut body, id);
        body.extend_from_slice(text.as_bytes());
        self.top_level(TAG_STRING_IN_UTF8, &body);
        self.strings.insert(text.to_string(), id);
        id
    }

    /// Define a class with the given instance fields, in declaration order
    pub fn class(
        &mut self,
        name: &str,
        superclass: Option<ObjectId>,
        fields: &[(&str, BasicType)],
    ) -> ObjectId {
        let tags: Vec<(&str, u8)> = fields.iter().map(|(n, ty)| (*n, ty.tag())).collect();
        self.write_class(name, superclass, &[], &[], &tags)
    }

    /// Define a class whose field type tags are written verbatim
    pub fn class_with_type_tags(
        &mut self,
        name: &str,
        superclass: Option<ObjectId>,
        fields: &[(&str, u8)],
    ) -> ObjectId {
        self.write_class(name, superclass, &[], &[], fields)
    }

    /// Define a class that also carries constant-pool entries and static
    /// fields, as real dumps do
    pub fn class_with_statics(
        &mut self,
        name: &str,
        superclass: Option<ObjectId>,
        constants: &[(u16, HeapValue)],
        statics: &[(&str, HeapValue)],
        fields: &[(&str, BasicType)],
    ) -> ObjectId {
        let tags: Vec<(&str, u8)> = fields.iter().map(|(n, ty)| (*n, ty.tag())).collect();
        self.write_class(name, superclass, constants, statics, &tags)
    }

    fn write_class(
        &mut self,
        name: &str,
        superclass: Option<ObjectId>,
        constants: &[(u16, HeapValue)],
        statics: &[(&str, HeapValue)],
        fields: &[(&str, u8)],
    ) -> ObjectId {
        let id = self.alloc_id();
        let name_id = self.string(name);

        let mut load = Vec::new();
        load.extend_from_slice(&self.next_class_serial.to_be_bytes());
        self.next_class_serial += 1;
        self.put_id(&mut load, id);
        load.extend_from_slice(&0u32.to_be_bytes());
        self.put_id(&mut load, name_id);
        self.top_level(TAG_LOAD_CLASS, &load);

        let static_names: Vec<ObjectId> = statics.iter().map(|(n, _)| self.string(n)).collect();
        let field_names: Vec<ObjectId> = fields.iter().map(|(n, _)| self.string(n)).collect();
        let instance_size: usize = fields
            .iter()
            .filter_map(|(_, tag)| BasicType::from_tag(*tag))
            .map(|ty| ty.size(self.id_size.bytes()))
            .sum();

        let mut body = vec![CLASS_DUMP];
        self.put_id(&mut body, id);
        body.extend_from_slice(&0u32.to_be_bytes());
        self.put_id(&mut body, superclass.unwrap_or(ObjectId::NULL));
        for _ in 0..5 {
            self.put_id(&mut body, ObjectId::NULL);
        }
        body.extend_from_slice(&u32::try_from(instance_size).unwrap_or(u32::MAX).to_be_bytes());
        body.extend_from_slice(&count_u16(constants.len()).to_be_bytes());
        for (index, value) in constants {
            body.extend_from_slice(&index.to_be_bytes());
            body.push(value.basic_type().tag());
            value.encode(self.id_size, &mut body);
        }
        body.extend_from_slice(&count_u16(statics.len()).to_be_bytes());
        for (name_id, (_, value)) in static_names.iter().zip(statics) {
            self.put_id(&mut body, *name_id);
            body.push(value.basic_type().tag());
            value.encode(self.id_size, &mut body);
        }
        body.extend_from_slice(&count_u16(fields.len()).to_be_bytes());
        for (name_id, (_, tag)) in field_names.iter().zip(fields) {
            self.put_id(&mut body, *name_id);
            body.push(*tag);
        }
        self.segment.extend_from_slice(&body);
        id
    }

    /// Write an instance; `values` follow the field layout, the class's own
    /// fields first, then each superclass's
    pub fn instance(&mut self, class_id: ObjectId, values: &[HeapValue]) -> ObjectId {
        let mut bytes = Vec::new();
        for value in values {
            value.encode(self.id_size, &mut bytes);
        }
        self.instance_with_bytes(class_id, &bytes)
    }

    /// Write an instance under an identifier from [`Self::alloc_id`], so
    /// objects written earlier can already point at it
    pub fn instance_at(&mut self, id: ObjectId, class_id: ObjectId, values: &[HeapValue]) {
        let mut bytes = Vec::new();
        for value in values {
            value.encode(self.id_size, &mut bytes);
        }
        self.write_instance(id, class_id, &bytes);
    }

    /// Write an instance with verbatim field bytes
    pub fn instance_with_bytes(&mut self, class_id: ObjectId, bytes: &[u8]) -> ObjectId {
        let id = self.alloc_id();
        self.write_instance(id, class_id, bytes);
        id
    }

    fn write_instance(&mut self, id: ObjectId, class_id: ObjectId, bytes: &[u8]) {
        let mut body = vec![INSTANCE_DUMP];
        self.put_id(&mut body, id);
        body.extend_from_slice(&0u32.to_be_bytes());
        self.put_id(&mut body, class_id);
        body.extend_from_slice(&count_u32(bytes.len()).to_be_bytes());
        body.extend_from_slice(bytes);
        self.segment.extend_from_slice(&body);
    }

    pub fn object_array(&mut self, array_class: ObjectId, elements: &[Option<ObjectId>]) -> ObjectId {
        let id = self.alloc_id();
        let mut body = vec![OBJECT_ARRAY_DUMP];
        self.put_id(&mut body, id);
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&count_u32(elements.len()).to_be_bytes());
        self.put_id(&mut body, array_class);
        for element in elements {
            self.put_id(&mut body, element.unwrap_or(ObjectId::NULL));
        }
        self.segment.extend_from_slice(&body);
        id
    }

    /// Write a primitive array from already-encoded big-endian elements
    pub fn primitive_array(&mut self, element_type: PrimitiveType, bytes: &[u8]) -> ObjectId {
        let id = self.alloc_id();
        let mut body = vec![PRIMITIVE_ARRAY_DUMP];
        self.put_id(&mut body, id);
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&count_u32(bytes.len() / element_type.size()).to_be_bytes());
        body.push(element_type.tag());
        body.extend_from_slice(bytes);
        self.segment.extend_from_slice(&body);
        id
    }

    /// Primitive array of `len` elements whose contents were left out of the
    /// dump (`PRIMITIVE_ARRAY_NODATA`)
    pub fn primitive_array_nodata(&mut self, element_type: PrimitiveType, len: usize) -> ObjectId {
        let id = self.alloc_id();
        let mut body = Vec::new();
        self.put_id(&mut body, id);
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&count_u32(len).to_be_bytes());
        body.push(element_type.tag());
        self.raw_sub_record(PRIMITIVE_ARRAY_NODATA, &body);
        id
    }

    /// `char[]` holding `text` as UTF-16 code units
    pub fn char_array(&mut self, text: &str) -> ObjectId {
        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        self.primitive_array(PrimitiveType::Char, &bytes)
    }

    /// Define `java.lang.String` as `{ value: char[], hash: int }`
    pub fn string_class(&mut self, object_class: ObjectId) -> ObjectId {
        self.class(
            JAVA_LANG_STRING,
            Some(object_class),
            &[("value", BasicType::Object), ("hash", BasicType::Primitive(PrimitiveType::Int))],
        )
    }

    /// Write a string instance of a class made by [`Self::string_class`]
    pub fn java_string(&mut self, string_class: ObjectId, text: &str) -> ObjectId {
        let value = self.char_array(text);
        self.instance(string_class, &[HeapValue::Reference(Some(value)), HeapValue::Int(0)])
    }

    pub fn root_unknown(&mut self, id: ObjectId) {
        let mut body = vec![ROOT_UNKNOWN];
        self.put_id(&mut body, id);
        self.segment.extend_from_slice(&body);
    }

    /// Append an arbitrary sub-record to the current segment
    pub fn raw_sub_record(&mut self, tag: u8, body: &[u8]) {
        self.segment.push(tag);
        self.segment.extend_from_slice(body);
    }

    /// Close the current heap dump segment; later objects go in a new one
    pub fn segment_break(&mut self) {
        if self.segment.is_empty() {
            return;
        }
        let segment = std::mem::take(&mut self.segment);
        self.top_level(TAG_HEAP_DUMP_SEGMENT, &segment);
    }

    /// Finish the dump
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.segment_break();
        self.top_level(TAG_HEAP_DUMP_END, &[]);
        self.records
    }

    /// Finish the dump and write it to `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn write_to(self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.into_bytes())
    }

    fn top_level(&mut self, tag: u8, body: &[u8]) {
        self.records.push(tag);
        self.records.extend_from_slice(&0u32.to_be_bytes());
        self.records.extend_from_slice(&count_u32(body.len()).to_be_bytes());
        self.records.extend_from_slice(body);
    }

    fn put_id(&self, out: &mut Vec<u8>, id: ObjectId) {
        put_id(self.id_size, out, id);
    }
}

// Fixture identifiers are small; truncation only matters for hand-built ids
// above 4G in 4-byte dumps.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn put_id(id_size: IdSize, out: &mut Vec<u8>, id: ObjectId) {
    match id_size {
        IdSize::Four => out.extend_from_slice(&(id.0 as u32).to_be_bytes()),
        IdSize::Eight => out.extend_from_slice(&id.0.to_be_bytes()),
    }
}

fn count_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hprof::RecordScanner;

    #[test]
    fn test_strings_are_interned() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let a = writer.string("name");
        let b = writer.string("name");
        assert_eq!(a, b);
        assert_ne!(a, writer.string("other"));
    }

    #[test]
    fn test_written_dump_has_valid_header() {
        let writer = HprofWriter::new(IdSize::Four);
        let data = writer.into_bytes();
        let scanner = RecordScanner::new(&data).unwrap();
        assert_eq!(scanner.header().version, DEFAULT_VERSION);
        assert_eq!(scanner.header().id_size, IdSize::Four);
    }

    #[test]
    fn test_char_array_is_utf16_big_endian() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        writer.char_array("é");
        let data = writer.into_bytes();
        assert!(data.windows(2).any(|w| w == [0x00, 0xE9]));
    }
}
