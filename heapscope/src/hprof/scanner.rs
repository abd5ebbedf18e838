//! Single-pass record scanner
//!
//! Walks every top-level record once and hands the records a caller cares
//! about to a [`RecordVisitor`]. Visitors override only the callbacks for the
//! record kinds they need; everything else is skipped by length.
//!
//! ```text
//! header ─▶ record ─▶ record ─▶ HEAP_DUMP_SEGMENT ─▶ record ...
//!             │                    │
//!        on_string            sub-record ─▶ on_object ─▶ on_class_dump
//!        on_load_class        sub-record                 on_instance_dump
//!                             (roots skipped)            on_object_array_dump
//!                                                        on_primitive_array_dump
//! ```

use heapscope_common::{
    root_record_size, RECORD_HEADER_SIZE, TAG_HEAP_DUMP, TAG_HEAP_DUMP_SEGMENT, TAG_LOAD_CLASS,
    TAG_STRING_IN_UTF8,
};
use log::debug;

use super::reader::{parse_header, ByteReader, HprofHeader};
use super::records::{
    read_object_body, ClassDumpRecord, InstanceDumpRecord, LoadClassRecord, ObjectArrayDumpRecord,
    ObjectRecord, PrimitiveArrayDumpRecord, StringRecord,
};
use crate::domain::{HeapError, Result};

/// Per-record-kind callbacks, all no-ops by default
///
/// Offsets passed to the object callbacks point at the sub-record's tag byte
/// and can be handed back to [`super::decode_object`] later.
pub trait RecordVisitor {
    fn on_string(&mut self, _record: &StringRecord<'_>) {}

    fn on_load_class(&mut self, _record: &LoadClassRecord) {}

    /// Called for every object sub-record; the default routes to the
    /// per-kind callbacks below
    fn on_object(&mut self, offset: usize, record: &ObjectRecord<'_>) {
        match record {
            ObjectRecord::Class(r) => self.on_class_dump(offset, r),
            ObjectRecord::Instance(r) => self.on_instance_dump(offset, r),
            ObjectRecord::ObjectArray(r) => self.on_object_array_dump(offset, r),
            ObjectRecord::PrimitiveArray(r) => self.on_primitive_array_dump(offset, r),
        }
    }

    fn on_class_dump(&mut self, _offset: usize, _record: &ClassDumpRecord) {}

    fn on_instance_dump(&mut self, _offset: usize, _record: &InstanceDumpRecord<'_>) {}

    fn on_object_array_dump(&mut self, _offset: usize, _record: &ObjectArrayDumpRecord<'_>) {}

    fn on_primitive_array_dump(
        &mut self,
        _offset: usize,
        _record: &PrimitiveArrayDumpRecord<'_>,
    ) {
    }
}

impl<V: RecordVisitor + ?Sized> RecordVisitor for &mut V {
    fn on_string(&mut self, record: &StringRecord<'_>) {
        (**self).on_string(record);
    }

    fn on_load_class(&mut self, record: &LoadClassRecord) {
        (**self).on_load_class(record);
    }

    fn on_object(&mut self, offset: usize, record: &ObjectRecord<'_>) {
        (**self).on_object(offset, record);
    }
}

impl RecordVisitor for () {}

/// Fan out every record to two visitors, first `A` then `B`
impl<A: RecordVisitor, B: RecordVisitor> RecordVisitor for (A, B) {
    fn on_string(&mut self, record: &StringRecord<'_>) {
        self.0.on_string(record);
        self.1.on_string(record);
    }

    fn on_load_class(&mut self, record: &LoadClassRecord) {
        self.0.on_load_class(record);
        self.1.on_load_class(record);
    }

    fn on_object(&mut self, offset: usize, record: &ObjectRecord<'_>) {
        self.0.on_object(offset, record);
        self.1.on_object(offset, record);
    }
}

/// Counters collected during a scan, logged when a session opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub records: usize,
    pub heap_dump_segments: usize,
    pub objects: usize,
    pub skipped_sub_records: usize,
}

/// Scanner over a complete dump held in memory (usually a mapping)
pub struct RecordScanner<'a> {
    data: &'a [u8],
    header: HprofHeader,
}

impl<'a> RecordScanner<'a> {
    /// Parse the header; records are not touched until [`Self::scan`]
    ///
    /// # Errors
    /// Returns `Malformed` if the header is invalid
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = parse_header(data)?;
        Ok(Self { data, header })
    }

    #[must_use]
    pub fn header(&self) -> &HprofHeader {
        &self.header
    }

    /// Walk every record once, feeding `visitor`
    ///
    /// # Errors
    /// Returns `Malformed` on truncated records or unknown heap-dump
    /// sub-records; the visitor may have seen a prefix of the dump by then
    pub fn scan<V: RecordVisitor>(&self, visitor: &mut V) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let mut reader =
            ByteReader::at(self.data, self.header.records_offset, self.header.id_size)?;

        while !reader.is_empty() {
            let record_offset = reader.position();
            if reader.remaining() < RECORD_HEADER_SIZE {
                return Err(HeapError::malformed(record_offset, "truncated record header"));
            }
            let tag = reader.u8()?;
            reader.skip(4)?; // time offset
            let len = reader.len_u32()?;
            let body_offset = reader.position();
            reader.skip(len)?;
            let body_end = body_offset + len;
            let mut body =
                ByteReader::at(&self.data[..body_end], body_offset, self.header.id_size)?;
            stats.records += 1;

            match tag {
                TAG_STRING_IN_UTF8 => {
                    let id = body.id()?;
                    let text_offset = body.position();
                    let text_len = len.checked_sub(self.header.id_size.bytes()).ok_or_else(|| {
                        HeapError::malformed(record_offset, "string record shorter than its id")
                    })?;
                    let text = body.bytes(text_len)?;
                    visitor.on_string(&StringRecord { id, text_offset, text });
                }
                TAG_LOAD_CLASS => {
                    let class_serial = body.u32()?;
                    let class_id = body.id()?;
                    body.skip(4)?; // stack trace serial
                    let name_id = body.id()?;
                    visitor.on_load_class(&LoadClassRecord { class_serial, class_id, name_id });
                }
                TAG_HEAP_DUMP | TAG_HEAP_DUMP_SEGMENT => {
                    stats.heap_dump_segments += 1;
                    self.scan_heap_dump(body_offset, body_end, visitor, &mut stats)?;
                }
                _ => {}
            }
        }

        debug!(
            "Scanned {} records, {} heap dump segments, {} objects",
            stats.records, stats.heap_dump_segments, stats.objects
        );
        Ok(stats)
    }

    fn scan_heap_dump<V: RecordVisitor>(
        &self,
        start: usize,
        end: usize,
        visitor: &mut V,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let id_size = self.header.id_size;
        // Sub-records must not run past the end of their segment.
        let mut reader = ByteReader::at(&self.data[..end], start, id_size)?;

        while !reader.is_empty() {
            let offset = reader.position();
            let tag = reader.u8()?;

            if let Some(size) = root_record_size(tag, id_size.bytes()) {
                reader.skip(size)?;
                stats.skipped_sub_records += 1;
                continue;
            }

            match read_object_body(tag, &mut reader)? {
                Some(record) => {
                    stats.objects += 1;
                    visitor.on_object(offset, &record);
                }
                None => {
                    return Err(HeapError::malformed(
                        offset,
                        format!("unknown heap dump sub-record tag 0x{tag:02x}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdSize, ObjectId};
    use crate::graph::HeapValue;
    use crate::hprof::writer::HprofWriter;
    use heapscope_common::{BasicType, PrimitiveType};

    #[derive(Default)]
    struct Recorder {
        strings: Vec<String>,
        classes: Vec<ObjectId>,
        instances: Vec<(ObjectId, ObjectId)>,
        arrays: usize,
    }

    impl RecordVisitor for Recorder {
        fn on_string(&mut self, record: &StringRecord<'_>) {
            self.strings.push(String::from_utf8_lossy(record.text).into_owned());
        }

        fn on_class_dump(&mut self, _offset: usize, record: &ClassDumpRecord) {
            self.classes.push(record.id);
        }

        fn on_instance_dump(&mut self, _offset: usize, record: &InstanceDumpRecord<'_>) {
            self.instances.push((record.class_id, record.id));
        }

        fn on_object_array_dump(&mut self, _offset: usize, _record: &ObjectArrayDumpRecord<'_>) {
            self.arrays += 1;
        }

        fn on_primitive_array_dump(
            &mut self,
            _offset: usize,
            _record: &PrimitiveArrayDumpRecord<'_>,
        ) {
            self.arrays += 1;
        }
    }

    fn sample_dump(id_size: IdSize) -> (Vec<u8>, ObjectId, Vec<ObjectId>) {
        let mut writer = HprofWriter::new(id_size);
        let object = writer.class("java.lang.Object", None, &[]);
        let leak = writer.class(
            "com.example.Leak",
            Some(object),
            &[("size", BasicType::Primitive(PrimitiveType::Int))],
        );
        writer.root_unknown(leak);
        let first = writer.instance(leak, &[HeapValue::Int(1)]);
        writer.segment_break();
        let second = writer.instance(leak, &[HeapValue::Int(2)]);
        writer.primitive_array(PrimitiveType::Byte, &[1, 2, 3]);
        (writer.into_bytes(), leak, vec![first, second])
    }

    #[test]
    fn test_scan_visits_records_across_segments() {
        for id_size in [IdSize::Four, IdSize::Eight] {
            let (data, leak, instances) = sample_dump(id_size);
            let scanner = RecordScanner::new(&data).unwrap();
            assert_eq!(scanner.header().id_size, id_size);

            let mut recorder = Recorder::default();
            let stats = scanner.scan(&mut recorder).unwrap();

            assert!(recorder.strings.contains(&"com.example.Leak".to_string()));
            assert_eq!(recorder.classes.len(), 2);
            assert_eq!(
                recorder.instances,
                vec![(leak, instances[0]), (leak, instances[1])],
                "instances must be reported in file order"
            );
            assert_eq!(recorder.arrays, 1);
            assert_eq!(stats.heap_dump_segments, 2);
            assert_eq!(stats.skipped_sub_records, 1);
            assert_eq!(stats.objects, 5);
        }
    }

    #[test]
    fn test_pair_visitor_feeds_both() {
        let (data, _, _) = sample_dump(IdSize::Eight);
        let scanner = RecordScanner::new(&data).unwrap();
        let mut pair = (Recorder::default(), Recorder::default());
        scanner.scan(&mut pair).unwrap();
        assert_eq!(pair.0.instances, pair.1.instances);
        assert_eq!(pair.0.instances.len(), 2);
    }

    #[test]
    fn test_truncated_dump_is_malformed() {
        let (data, _, _) = sample_dump(IdSize::Eight);
        let truncated = &data[..data.len() - 3];
        let scanner = RecordScanner::new(truncated).unwrap();
        let err = scanner.scan(&mut Recorder::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, HeapError::Malformed { .. }));
    }

    #[test]
    fn test_unknown_sub_record_is_malformed() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        writer.raw_sub_record(0x42, &[]);
        let data = writer.into_bytes();
        let scanner = RecordScanner::new(&data).unwrap();
        let err = scanner.scan(&mut Recorder::default()).unwrap_err();
        assert!(err.to_string().contains("0x42"), "got {err}");
    }
}
