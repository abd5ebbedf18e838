//! Instance field decoding
//!
//! An instance stores its field values back to back with no names or type
//! tags. The layout comes from the class chain: the instance's own class
//! fields first, in declaration order, then its superclass's, up to the root.
//!
//! ```text
//! field_bytes:  [ Leak.name | Leak.size | Base.id | Object... ]
//!                 └─ class_id schema ──┘ └─ super schema ─┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use super::entity::{ClassEntity, HeapEntity, InstanceEntity};
use super::heap_graph::HeapGraph;
use super::render::UNRESOLVED;
use super::value::HeapValue;
use crate::domain::{EntityKind, HeapError, ObjectId, Result};
use crate::hprof::{ByteReader, FieldSpec};

/// One decoded field of an instance
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Class whose schema declares the field; shared by its sibling fields
    pub declaring_class: Arc<ClassEntity>,
    pub name: String,
    pub value: HeapValue,
}

/// Decodes instance fields against the class chain of a [`HeapGraph`]
#[derive(Clone, Copy)]
pub struct FieldResolver<'g> {
    graph: &'g HeapGraph,
}

impl<'g> FieldResolver<'g> {
    #[must_use]
    pub fn new(graph: &'g HeapGraph) -> Self {
        Self { graph }
    }

    /// Lazily decode the fields of `instance`
    ///
    /// Items are yielded in layout order. After a schema error or a broken
    /// class chain the offsets of later fields are unknown, so the iterator
    /// ends right after reporting it.
    #[must_use]
    pub fn fields<'i>(&self, instance: &'i InstanceEntity) -> Fields<'g, 'i> {
        Fields {
            graph: self.graph,
            reader: ByteReader::new(&instance.field_bytes, self.graph.identifier_size()),
            state: State::Start(instance.class_id),
            instance_id: instance.id,
            visited: HashSet::new(),
        }
    }

    /// Every field of `instance`, failing on the first error
    ///
    /// # Errors
    /// The first error [`FieldResolver::fields`] would yield
    pub fn fields_of(&self, instance: &InstanceEntity) -> Result<Vec<Field>> {
        self.fields(instance).collect()
    }
}

enum State {
    /// Class of the instance not looked up yet
    Start(ObjectId),
    /// Reading the schema of `class`, next field at `next`
    Reading { class: Arc<ClassEntity>, next: usize },
    Done,
}

/// Iterator returned by [`FieldResolver::fields`]
pub struct Fields<'g, 'i> {
    graph: &'g HeapGraph,
    reader: ByteReader<'i>,
    state: State,
    instance_id: ObjectId,
    /// Classes entered so far; a corrupt dump can chain a class back to itself
    visited: HashSet<ObjectId>,
}

impl Fields<'_, '_> {
    fn enter_class(&mut self, class_id: ObjectId) -> Result<()> {
        if !self.visited.insert(class_id) {
            let class = match &self.state {
                State::Reading { class, .. } => class.name.clone(),
                State::Start(_) | State::Done => format!("<class@{class_id}>"),
            };
            return Err(HeapError::Schema {
                class,
                field: "<superclass>".to_string(),
                reason: format!("superclass cycle at {class_id}"),
            });
        }

        let class = match self.graph.resolve(class_id)? {
            HeapEntity::Class(class) => class,
            other => {
                return Err(HeapError::WrongKind {
                    id: class_id,
                    expected: EntityKind::Class,
                    actual: other.kind(),
                })
            }
        };
        self.state = State::Reading { class: Arc::new(class), next: 0 };
        Ok(())
    }

    fn read_field(&mut self, class: &Arc<ClassEntity>, spec: FieldSpec) -> Result<Field> {
        let name = match self.graph.string(spec.name_id) {
            Ok(name) => name,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!("Field name of {} unavailable: {err}", class.name);
                UNRESOLVED.to_string()
            }
        };

        let Some(ty) = spec.basic_type() else {
            return Err(schema_error(
                class,
                &name,
                format!("unrecognized type tag {}", spec.type_tag),
            ));
        };
        let value = HeapValue::read(ty, &mut self.reader).map_err(|_| {
            schema_error(
                class,
                &name,
                format!("field data of instance {} is truncated", self.instance_id),
            )
        })?;

        Ok(Field { declaring_class: Arc::clone(class), name, value })
    }
}

impl Iterator for Fields<'_, '_> {
    type Item = Result<Field>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match &mut self.state {
                State::Done => return None,
                State::Start(class_id) => Step::Enter(*class_id),
                State::Reading { class, next } => match class.fields.get(*next) {
                    Some(spec) => {
                        *next += 1;
                        Step::Read(Arc::clone(class), *spec)
                    }
                    None => match class.superclass {
                        Some(superclass) => Step::Enter(superclass),
                        None => Step::Finish,
                    },
                },
            };

            match step {
                Step::Enter(class_id) => {
                    if let Err(err) = self.enter_class(class_id) {
                        self.state = State::Done;
                        return Some(Err(err));
                    }
                }
                Step::Read(class, spec) => {
                    let field = self.read_field(&class, spec);
                    if field.is_err() {
                        self.state = State::Done;
                    }
                    return Some(field);
                }
                Step::Finish => {
                    if !self.reader.is_empty() {
                        debug!(
                            "Instance {} has {} bytes past its last field",
                            self.instance_id,
                            self.reader.remaining()
                        );
                    }
                    self.state = State::Done;
                    return None;
                }
            }
        }
    }
}

enum Step {
    Enter(ObjectId),
    Read(Arc<ClassEntity>, FieldSpec),
    Finish,
}

fn schema_error(class: &ClassEntity, field: &str, reason: String) -> HeapError {
    HeapError::Schema { class: class.name.clone(), field: field.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdSize;
    use crate::hprof::HprofWriter;
    use heapscope_common::{BasicType, PrimitiveType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const INT: BasicType = BasicType::Primitive(PrimitiveType::Int);

    fn open(writer: HprofWriter) -> (NamedTempFile, HeapGraph) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&writer.into_bytes()).unwrap();
        let graph = HeapGraph::open(file.path()).unwrap();
        (file, graph)
    }

    fn labels(fields: &[Field]) -> Vec<String> {
        fields.iter().map(|f| format!("{}.{}", f.declaring_class.name, f.name)).collect()
    }

    #[test]
    fn test_own_fields_then_superclass_fields() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let object = writer.class("java.lang.Object", None, &[]);
        let base = writer.class("Base", Some(object), &[("id", INT)]);
        let leak = writer.class("Leak", Some(base), &[("size", INT), ("next", BasicType::Object)]);
        let instance =
            writer.instance(leak, &[HeapValue::Int(7), HeapValue::Reference(None), HeapValue::Int(42)]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let fields = FieldResolver::new(&graph).fields_of(&instance).unwrap();

        assert_eq!(labels(&fields), vec!["Leak.size", "Leak.next", "Base.id"]);
        assert_eq!(fields[0].value, HeapValue::Int(7));
        assert_eq!(fields[1].value, HeapValue::Reference(None));
        assert_eq!(fields[2].value, HeapValue::Int(42));
    }

    #[test]
    fn test_same_name_in_two_classes_is_kept_twice() {
        let mut writer = HprofWriter::new(IdSize::Four);
        let base = writer.class("Base", None, &[("size", INT)]);
        let leak = writer.class("Leak", Some(base), &[("size", INT)]);
        let instance = writer.instance(leak, &[HeapValue::Int(1), HeapValue::Int(2)]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let fields = FieldResolver::new(&graph).fields_of(&instance).unwrap();
        assert_eq!(labels(&fields), vec!["Leak.size", "Base.size"]);
        assert_eq!(fields[0].declaring_class.id, leak);
        assert_eq!(fields[1].declaring_class.id, base);
    }

    #[test]
    fn test_unknown_type_tag_stops_iteration() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let weird = writer.class_with_type_tags("Weird", None, &[("ok", 10), ("bad", 13), ("never", 10)]);
        let instance = writer.instance_with_bytes(weird, &[0; 12]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let items: Vec<_> = FieldResolver::new(&graph).fields(&instance).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(HeapError::Schema { class, field, .. }) => {
                assert_eq!(class, "Weird");
                assert_eq!(field, "bad");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_field_bytes_is_schema_error() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let leak = writer.class("Leak", None, &[("a", INT), ("b", BasicType::Object)]);
        let instance = writer.instance_with_bytes(leak, &[0, 0, 0, 1, 0, 0]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let err = FieldResolver::new(&graph).fields_of(&instance).unwrap_err();
        assert!(matches!(err, HeapError::Schema { ref field, .. } if field == "b"), "got {err}");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_superclass_cycle_ends_iteration() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        // The first class written gets identifier 1
        let looped = writer.class("Loop", Some(ObjectId(1)), &[("a", INT)]);
        assert_eq!(looped, ObjectId(1));
        let instance = writer.instance(looped, &[HeapValue::Int(5)]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let items: Vec<_> = FieldResolver::new(&graph).fields(&instance).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().value, HeapValue::Int(5));
        match &items[1] {
            Err(HeapError::Schema { class, field, reason }) => {
                assert_eq!(class, "Loop");
                assert_eq!(field, "<superclass>");
                assert_eq!(reason, "superclass cycle at 1");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_two_class_cycle_without_fields_terminates() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        // "First" takes ids 1 (class) and 2 (name), "Second" takes 3 and 4
        let first = writer.class("First", Some(ObjectId(3)), &[]);
        let second = writer.class("Second", Some(first), &[]);
        assert_eq!((first, second), (ObjectId(1), ObjectId(3)));
        let instance = writer.instance(second, &[]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let items: Vec<_> = FieldResolver::new(&graph).fields(&instance).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(HeapError::Schema { .. })));
    }

    #[test]
    fn test_missing_superclass_is_not_found() {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let leak = writer.class("Leak", Some(ObjectId(777)), &[("a", INT)]);
        let instance = writer.instance(leak, &[HeapValue::Int(5)]);
        let (_file, graph) = open(writer);

        let instance = graph.instance(instance).unwrap();
        let items: Vec<_> = FieldResolver::new(&graph).fields(&instance).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().value, HeapValue::Int(5));
        assert!(matches!(items[1], Err(HeapError::NotFound(ObjectId(777)))));
    }
}
