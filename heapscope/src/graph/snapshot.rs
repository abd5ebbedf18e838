//! An opened dump: heap graph plus class index, built in one scan

use std::path::Path;

use serde::Serialize;

use super::class_index::{ClassIndex, ClassIndexBuilder};
use super::entity::ClassEntity;
use super::heap_graph::HeapGraph;
use super::search::search_classes;
use crate::domain::Result;

/// Headline numbers of an opened dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub path: String,
    pub version: String,
    pub identifier_size: usize,
    pub objects: usize,
    pub classes_with_instances: usize,
    pub instances: usize,
}

pub struct HeapSnapshot {
    graph: HeapGraph,
    classes: ClassIndex,
}

impl HeapSnapshot {
    /// Map `path` and build both indexes in a single pass
    ///
    /// # Errors
    /// Returns `Io` or `Malformed` if the dump cannot be opened or scanned
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut builder = ClassIndexBuilder::default();
        let graph = HeapGraph::open_with(path, &mut builder)?;
        Ok(Self { graph, classes: builder.finish() })
    }

    #[must_use]
    pub fn graph(&self) -> &HeapGraph {
        &self.graph
    }

    #[must_use]
    pub fn classes(&self) -> &ClassIndex {
        &self.classes
    }

    /// See [`search_classes`]
    ///
    /// # Errors
    /// Only fatal errors
    pub fn search(&self, query: &str) -> Result<Vec<ClassEntity>> {
        search_classes(&self.graph, &self.classes, query)
    }

    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        let header = self.graph.header();
        SnapshotSummary {
            path: self.graph.path().display().to_string(),
            version: header.version.clone(),
            identifier_size: header.id_size.bytes(),
            objects: self.graph.object_count(),
            classes_with_instances: self.classes.class_count(),
            instances: self.classes.instance_count(),
        }
    }

    /// Release the mapping; idempotent
    pub fn close(&mut self) {
        self.graph.close();
    }
}
