//! Random-access view of a mapped heap dump
//!
//! Opening a graph maps the file read-only and scans it once, recording
//! where every object sub-record starts plus the string table and class-name
//! bindings. After that each lookup decodes a single sub-record straight out
//! of the mapping.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};
use memmap2::Mmap;

use super::entity::{
    normalize_class_name, ClassEntity, HeapEntity, InstanceEntity, ObjectArrayEntity,
    PrimitiveArrayEntity,
};
use crate::domain::{EntityKind, HeapError, IdSize, ObjectId, Result};
use crate::hprof::{
    decode_object, HprofHeader, LoadClassRecord, ObjectRecord, RecordScanner, RecordVisitor,
    StringRecord,
};

/// Location of a string-table entry's text inside the mapping
#[derive(Debug, Clone, Copy)]
struct TextSpan {
    offset: usize,
    len: usize,
}

/// Visitor building the lookup tables of a [`HeapGraph`]
#[derive(Default)]
struct GraphIndexer {
    objects: HashMap<ObjectId, usize>,
    strings: HashMap<ObjectId, TextSpan>,
    class_names: HashMap<ObjectId, ObjectId>,
}

impl RecordVisitor for GraphIndexer {
    fn on_string(&mut self, record: &StringRecord<'_>) {
        self.strings
            .insert(record.id, TextSpan { offset: record.text_offset, len: record.text.len() });
    }

    fn on_load_class(&mut self, record: &LoadClassRecord) {
        self.class_names.insert(record.class_id, record.name_id);
    }

    fn on_object(&mut self, offset: usize, record: &ObjectRecord<'_>) {
        // First definition wins when a dump repeats an identifier.
        self.objects.entry(record.id()).or_insert(offset);
    }
}

/// Read-only heap graph over a mapped dump
///
/// The graph owns the mapping. [`HeapGraph::close`] releases it; every
/// lookup after that fails with [`HeapError::SessionClosed`].
pub struct HeapGraph {
    path: PathBuf,
    mmap: Option<Mmap>,
    header: HprofHeader,
    objects: HashMap<ObjectId, usize>,
    strings: HashMap<ObjectId, TextSpan>,
    class_names: HashMap<ObjectId, ObjectId>,
}

impl HeapGraph {
    /// Map and index the dump at `path`
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be opened or mapped and `Malformed` if
    /// the scan hits a structural problem
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &mut ())
    }

    /// Like [`HeapGraph::open`], also feeding every record to `visitor`
    ///
    /// Lets other indexes be built in the same pass over the file.
    ///
    /// # Errors
    /// Same as [`HeapGraph::open`]
    pub fn open_with<V: RecordVisitor>(path: impl AsRef<Path>, visitor: &mut V) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        // SAFETY: the mapping is read-only and every access is bounds-checked
        // by `ByteReader`. Truncating the file while it is mapped is outside
        // what the tool supports, as with any mmap-based reader.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        let mut indexer = GraphIndexer::default();
        let (header, stats) = {
            let scanner = RecordScanner::new(&mmap)?;
            let stats = scanner.scan(&mut (&mut indexer, visitor))?;
            (scanner.header().clone(), stats)
        };

        info!(
            "Opened {} ({}, {}-byte ids): {} objects, {} strings, {} classes named",
            path.display(),
            header.version,
            header.id_size.bytes(),
            indexer.objects.len(),
            indexer.strings.len(),
            indexer.class_names.len()
        );
        debug!("Skipped {} root sub-records", stats.skipped_sub_records);

        Ok(Self {
            path: path.to_path_buf(),
            mmap: Some(mmap),
            header,
            objects: indexer.objects,
            strings: indexer.strings,
            class_names: indexer.class_names,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &HprofHeader {
        &self.header
    }

    #[must_use]
    pub fn identifier_size(&self) -> IdSize {
        self.header.id_size
    }

    /// Number of distinct object identifiers in the dump
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.mmap.is_none()
    }

    /// Release the mapping; calling it again does nothing
    pub fn close(&mut self) {
        if self.mmap.take().is_some() {
            debug!("Unmapped {}", self.path.display());
        }
    }

    /// Entity named by `id`
    ///
    /// # Errors
    /// `NotFound` if no object sub-record has this identifier,
    /// `SessionClosed` after [`HeapGraph::close`], `Malformed` if the
    /// sub-record cannot be decoded
    pub fn resolve(&self, id: ObjectId) -> Result<HeapEntity> {
        let record = self.record(id)?;
        let entity = match record {
            ObjectRecord::Class(r) => HeapEntity::Class(ClassEntity {
                id: r.id,
                name: self.class_name_or_placeholder(r.id)?,
                superclass: r.super_id,
                instance_size: r.instance_size,
                fields: r.fields,
            }),
            ObjectRecord::Instance(r) => HeapEntity::Instance(InstanceEntity {
                id: r.id,
                class_id: r.class_id,
                field_bytes: r.field_bytes.to_vec(),
            }),
            ObjectRecord::ObjectArray(r) => HeapEntity::ObjectArray(ObjectArrayEntity {
                id: r.id,
                array_class_id: r.array_class_id,
                class_name: self.class_name_or_placeholder(r.array_class_id)?,
                elements: r.elements(),
            }),
            ObjectRecord::PrimitiveArray(r) => HeapEntity::PrimitiveArray(PrimitiveArrayEntity {
                id: r.id,
                element_type: r.element_type,
                len: r.len,
                bytes: r.bytes.to_vec(),
            }),
        };
        Ok(entity)
    }

    /// Class entity named by `id`
    ///
    /// # Errors
    /// As [`HeapGraph::resolve`], plus `WrongKind` if `id` is not a class
    pub fn class(&self, id: ObjectId) -> Result<ClassEntity> {
        match self.resolve(id)? {
            HeapEntity::Class(class) => Ok(class),
            other => Err(wrong_kind(id, EntityKind::Class, other.kind())),
        }
    }

    /// Instance entity named by `id`
    ///
    /// # Errors
    /// As [`HeapGraph::resolve`], plus `WrongKind` if `id` is not an instance
    pub fn instance(&self, id: ObjectId) -> Result<InstanceEntity> {
        match self.resolve(id)? {
            HeapEntity::Instance(instance) => Ok(instance),
            other => Err(wrong_kind(id, EntityKind::Instance, other.kind())),
        }
    }

    /// Fully-qualified class name of a class, or of an instance's class
    ///
    /// # Errors
    /// `NotFound` if `id` is unknown or the class has no name binding,
    /// `WrongKind` for arrays
    pub fn class_name_of(&self, id: ObjectId) -> Result<String> {
        if self.class_names.contains_key(&id) {
            return self.class_name(id);
        }
        match self.record(id)? {
            ObjectRecord::Class(r) => self.class_name(r.id),
            ObjectRecord::Instance(r) => self.class_name(r.class_id),
            other => Err(wrong_kind(id, EntityKind::Class, other.kind())),
        }
    }

    /// Text of a string-table entry
    ///
    /// # Errors
    /// `NotFound` if there is no entry with this identifier
    pub fn string(&self, id: ObjectId) -> Result<String> {
        let span = self.strings.get(&id).ok_or(HeapError::NotFound(id))?;
        let data = self.data()?;
        let text = data
            .get(span.offset..span.offset + span.len)
            .ok_or_else(|| HeapError::malformed(span.offset, "string text out of bounds"))?;
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    fn data(&self) -> Result<&[u8]> {
        self.mmap.as_deref().ok_or(HeapError::SessionClosed)
    }

    fn record(&self, id: ObjectId) -> Result<ObjectRecord<'_>> {
        let data = self.data()?;
        let offset = *self.objects.get(&id).ok_or(HeapError::NotFound(id))?;
        decode_object(data, offset, self.header.id_size)
    }

    /// Name bound to a class object by its `LOAD_CLASS` record
    fn class_name(&self, class_id: ObjectId) -> Result<String> {
        let name_id = self.class_names.get(&class_id).ok_or(HeapError::NotFound(class_id))?;
        self.string(*name_id).map(|raw| normalize_class_name(&raw))
    }

    /// A class without a usable name binding is still a class; give it a
    /// stable placeholder name instead of failing the lookup.
    fn class_name_or_placeholder(&self, class_id: ObjectId) -> Result<String> {
        match self.class_name(class_id) {
            Ok(name) => Ok(name),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                debug!("Class {class_id} has no name: {err}");
                Ok(format!("<class@{class_id}>"))
            }
        }
    }
}

fn wrong_kind(id: ObjectId, expected: EntityKind, actual: EntityKind) -> HeapError {
    HeapError::WrongKind { id, expected, actual }
}
