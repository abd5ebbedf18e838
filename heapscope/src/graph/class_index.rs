//! Class → instances index
//!
//! Built by [`ClassIndexBuilder`] during the same scan that indexes the heap
//! graph, frozen afterwards. Classes keep the order in which their first
//! instance appeared in the dump; instances keep file order.

use std::collections::HashMap;

use crate::domain::ObjectId;
use crate::hprof::{InstanceDumpRecord, RecordVisitor};

/// Immutable mapping from class identifier to the instances of that class
#[derive(Debug, Default, Clone)]
pub struct ClassIndex {
    order: Vec<ObjectId>,
    instances: HashMap<ObjectId, Vec<ObjectId>>,
}

impl ClassIndex {
    /// Instances of `class_id` in dump order, empty for unknown classes
    #[must_use]
    pub fn instances_of(&self, class_id: ObjectId) -> &[ObjectId] {
        self.instances.get(&class_id).map_or(&[], Vec::as_slice)
    }

    /// Classes with at least one instance, in first-seen order
    pub fn class_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().copied()
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }
}

/// Scan visitor that collects instance dumps into a [`ClassIndex`]
#[derive(Debug, Default)]
pub struct ClassIndexBuilder {
    index: ClassIndex,
}

impl ClassIndexBuilder {
    #[must_use]
    pub fn finish(self) -> ClassIndex {
        self.index
    }
}

impl RecordVisitor for ClassIndexBuilder {
    fn on_instance_dump(&mut self, _offset: usize, record: &InstanceDumpRecord<'_>) {
        let ClassIndex { order, instances } = &mut self.index;
        instances
            .entry(record.class_id)
            .or_insert_with(|| {
                order.push(record.class_id);
                Vec::new()
            })
            .push(record.id);
    }
}
