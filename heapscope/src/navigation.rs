//! # Navigation Stack
//!
//! The explorer is a stack of frames. A search replaces the whole stack,
//! selecting a row pushes a frame, going back pops one.
//!
//! ```text
//! Idle ──search──▶ SearchResults ──select──▶ InstanceList ──select──▶ FieldList
//!                        ▲                                              │  ▲
//!                        └────────────── back ◀─────────────────────────┘  │
//!                                                          select (ref) ───┘
//! ```
//!
//! Frames hold fully rendered rows: everything shown to the user is computed
//! when the frame is pushed, so moving around the list never touches the
//! dump.

use log::{debug, warn};
use serde::Serialize;

use crate::domain::{HeapError, ObjectId, Result};
use crate::graph::{
    ClassEntity, FieldResolver, HeapEntity, HeapSnapshot, InstanceEntity, ValueRenderer,
    UNRESOLVED,
};

/// A field row: label plus the object it points at, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub label: String,
    pub target: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub enum Frame {
    SearchResults { query: String, classes: Vec<ClassEntity> },
    InstanceList { class: ClassEntity, instances: Vec<ObjectId> },
    FieldList { instance: InstanceEntity, class_name: String, rows: Vec<FieldRow> },
}

impl Frame {
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Frame::SearchResults { query, classes } => match classes.len() {
                0 => format!("No class matching [{query}]"),
                1 => format!("1 class matching [{query}]"),
                n => format!("{n} classes matching [{query}]"),
            },
            Frame::InstanceList { class, instances } => match instances.len() {
                1 => format!("1 instance of class {}", class.name),
                n => format!("{n} instances of class {}", class.name),
            },
            Frame::FieldList { instance, class_name, .. } => {
                format!("@{} instance of class {class_name}", instance.id)
            }
        }
    }

    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        match self {
            Frame::SearchResults { classes, .. } => classes.iter().map(|c| c.name.clone()).collect(),
            Frame::InstanceList { instances, .. } => {
                instances.iter().map(|id| format!("@{id}")).collect()
            }
            Frame::FieldList { rows, .. } => rows.iter().map(|r| r.label.clone()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Frame::SearchResults { classes, .. } => classes.len(),
            Frame::InstanceList { instances, .. } => instances.len(),
            Frame::FieldList { rows, .. } => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a frame looks like on screen, detached from the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub title: String,
    pub rows: Vec<String>,
    /// Number of frames on the stack, 0 before the first search
    pub depth: usize,
}

/// Outcome of [`Navigator::select`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Pushed,
    /// Row out of range, or its target is not an instance
    Unchanged,
}

#[derive(Debug, Default)]
pub struct Navigator {
    stack: Vec<Frame>,
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Frame> {
        self.stack.last()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Start over with the classes matching `query`
    ///
    /// # Errors
    /// Only fatal errors; the stack is left untouched in that case
    pub fn search(&mut self, snapshot: &HeapSnapshot, query: &str) -> Result<&Frame> {
        let classes = snapshot.search(query)?;
        debug!("Search [{query}]: {} classes", classes.len());
        self.stack.clear();
        Ok(self.push(Frame::SearchResults { query: query.to_string(), classes }))
    }

    /// Drill into row `row` of the current frame
    ///
    /// # Errors
    /// Only fatal errors; non-fatal lookup failures leave the stack as is
    pub fn select(&mut self, snapshot: &HeapSnapshot, row: usize) -> Result<Selection> {
        let Some(frame) = self.stack.last() else {
            return Ok(Selection::Unchanged);
        };

        let next = match frame {
            Frame::SearchResults { classes, .. } => classes.get(row).map(|class| {
                Frame::InstanceList {
                    class: class.clone(),
                    instances: snapshot.classes().instances_of(class.id).to_vec(),
                }
            }),
            Frame::InstanceList { instances, .. } => match instances.get(row) {
                Some(&id) => open_instance(snapshot, id)?,
                None => None,
            },
            Frame::FieldList { rows, .. } => match rows.get(row).and_then(|r| r.target) {
                Some(id) => open_instance(snapshot, id)?,
                None => None,
            },
        };

        Ok(match next {
            Some(frame) => {
                self.push(frame);
                Selection::Pushed
            }
            None => Selection::Unchanged,
        })
    }

    /// Pop one frame; returns false at the root
    pub fn back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    #[must_use]
    pub fn view(&self) -> View {
        match self.current() {
            Some(frame) => View { title: frame.title(), rows: frame.rows(), depth: self.depth() },
            None => View { title: "No search yet".to_string(), rows: Vec::new(), depth: 0 },
        }
    }

    fn push(&mut self, frame: Frame) -> &Frame {
        self.stack.push(frame);
        &self.stack[self.stack.len() - 1]
    }
}

/// Field list frame for `id`, `None` if `id` is not an instance
fn open_instance(snapshot: &HeapSnapshot, id: ObjectId) -> Result<Option<Frame>> {
    let graph = snapshot.graph();
    let instance = match graph.resolve(id) {
        Ok(HeapEntity::Instance(instance)) => instance,
        Ok(other) => {
            debug!("{id} is a {}, nothing to open", other.kind());
            return Ok(None);
        }
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            warn!("Cannot open {id}: {err}");
            return Ok(None);
        }
    };

    let class_name = match graph.class_name_of(instance.class_id) {
        Ok(name) => name,
        Err(err) if err.is_fatal() => return Err(err),
        Err(_) => UNRESOLVED.to_string(),
    };
    let rows = field_rows(snapshot, &instance)?;
    Ok(Some(Frame::FieldList { instance, class_name, rows }))
}

/// One row per field; per-field failures become placeholder rows
fn field_rows(snapshot: &HeapSnapshot, instance: &InstanceEntity) -> Result<Vec<FieldRow>> {
    let graph = snapshot.graph();
    let renderer = ValueRenderer::new(graph);
    let mut rows = Vec::new();

    for field in FieldResolver::new(graph).fields(instance) {
        let row = match field {
            Ok(field) => FieldRow {
                label: format!(
                    "{}.{}={}",
                    field.declaring_class.name,
                    field.name,
                    renderer.render(&field.value)
                ),
                target: field.value.as_reference(),
            },
            Err(err) if err.is_fatal() => return Err(err),
            Err(HeapError::Schema { class, field, reason }) => FieldRow {
                label: format!("<schema error: {class}.{field}: {reason}>"),
                target: None,
            },
            Err(err) => FieldRow { label: format!("<unresolved: {err}>"), target: None },
        };
        rows.push(row);
    }
    Ok(rows)
}
