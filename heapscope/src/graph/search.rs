//! Class search by name

use log::warn;

use super::class_index::ClassIndex;
use super::entity::{ClassEntity, HeapEntity};
use super::heap_graph::HeapGraph;
use crate::domain::{EntityKind, HeapError, Result};

/// Classes with at least one instance whose fully-qualified name contains
/// `query`, in class-index order
///
/// Matching is case-sensitive. An empty query matches every indexed class.
/// Classes whose name or record cannot be resolved are logged and skipped.
///
/// # Errors
/// Only fatal errors (the graph was closed or the dump is unreadable)
pub fn search_classes(
    graph: &HeapGraph,
    index: &ClassIndex,
    query: &str,
) -> Result<Vec<ClassEntity>> {
    let match_all = query.is_empty();
    let mut matches = Vec::new();

    for class_id in index.class_ids() {
        let name = match graph.class_name_of(class_id) {
            Ok(name) => name,
            Err(err) => {
                skip_or_fail(err)?;
                continue;
            }
        };
        if !match_all && !name.contains(query) {
            continue;
        }

        match graph.resolve(class_id) {
            Ok(HeapEntity::Class(class)) => matches.push(class),
            Ok(other) => warn!(
                "Skipping {class_id}: {}",
                HeapError::WrongKind { id: class_id, expected: EntityKind::Class, actual: other.kind() }
            ),
            Err(err) => skip_or_fail(err)?,
        }
    }
    Ok(matches)
}

fn skip_or_fail(err: HeapError) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!("Skipping class: {err}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdSize, ObjectId};
    use crate::graph::{ClassIndexBuilder, HeapValue};
    use crate::hprof::HprofWriter;
    use heapscope_common::{BasicType, PrimitiveType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Fixture {
        _file: NamedTempFile,
        graph: HeapGraph,
        index: ClassIndex,
    }

    fn fixture() -> Fixture {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let int = [("v", BasicType::Primitive(PrimitiveType::Int))];
        let object = writer.class("java.lang.Object", None, &[]);
        let zebra = writer.class("com.example.ZebraLeak", Some(object), &int);
        let apple = writer.class("com.example.AppleLeak", Some(object), &int);
        let other = writer.class("com.example.Other", Some(object), &int);
        writer.class("com.example.UnusedLeak", Some(object), &int);
        writer.instance(zebra, &[HeapValue::Int(1)]);
        writer.instance(apple, &[HeapValue::Int(2)]);
        writer.instance(other, &[HeapValue::Int(3)]);
        // Instance of a class the dump never defines
        writer.instance(ObjectId(4_242), &[HeapValue::Int(4)]);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&writer.into_bytes()).unwrap();
        let mut builder = ClassIndexBuilder::default();
        let graph = HeapGraph::open_with(file.path(), &mut builder).unwrap();
        Fixture { _file: file, graph, index: builder.finish() }
    }

    fn names(classes: &[ClassEntity]) -> Vec<&str> {
        classes.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_substring_match_in_index_order() {
        let f = fixture();
        let found = search_classes(&f.graph, &f.index, "Leak").unwrap();
        assert_eq!(names(&found), vec!["com.example.ZebraLeak", "com.example.AppleLeak"]);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let f = fixture();
        assert!(search_classes(&f.graph, &f.index, "leak").unwrap().is_empty());
    }

    #[test]
    fn test_empty_query_lists_every_class_with_instances() {
        let f = fixture();
        let found = search_classes(&f.graph, &f.index, "").unwrap();
        assert_eq!(
            names(&found),
            vec!["com.example.ZebraLeak", "com.example.AppleLeak", "com.example.Other"],
            "undefined classes are skipped, classes without instances never appear"
        );
    }

    #[test]
    fn test_closed_graph_fails() {
        let mut f = fixture();
        f.graph.close();
        let err = search_classes(&f.graph, &f.index, "Leak").unwrap_err();
        assert!(matches!(err, HeapError::SessionClosed));
    }
}
