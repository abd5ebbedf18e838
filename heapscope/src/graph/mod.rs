//! # Heap Graph Layer
//!
//! Turns the raw records of the `hprof` layer into entities and answers the
//! questions the navigator asks.
//!
//! ## Module Structure
//!
//! - **`heap_graph`**: [`HeapGraph`], mapped dump + offset index, point lookups
//! - **`class_index`**: [`ClassIndex`], class → instances in dump order
//! - **`search`**: substring search over class names
//! - **`fields`**: [`FieldResolver`], instance bytes → named values
//! - **`render`**: [`ValueRenderer`], values → one-line text
//! - **`java_string`**: contents of `java.lang.String` instances
//! - **`snapshot`**: [`HeapSnapshot`], graph and class index opened together
//!
//! ## Data Flow
//!
//! ```text
//! HeapSnapshot::open ──▶ one scan ──┬─▶ HeapGraph (offsets, strings, names)
//!                                   └─▶ ClassIndex (class → instances)
//!
//! search ──▶ [ClassEntity] ──▶ instances_of ──▶ [ObjectId]
//!   ──▶ resolve ──▶ InstanceEntity ──▶ FieldResolver ──▶ [Field]
//!   ──▶ ValueRenderer ──▶ "com.example.Leak.name=\"foo\""
//! ```

pub mod class_index;
pub mod entity;
pub mod fields;
pub mod heap_graph;
pub mod java_string;
pub mod render;
pub mod search;
pub mod snapshot;
pub mod value;

pub use class_index::{ClassIndex, ClassIndexBuilder};
pub use entity::{
    normalize_class_name, ClassEntity, HeapEntity, InstanceEntity, ObjectArrayEntity,
    PrimitiveArrayEntity,
};
pub use fields::{Field, FieldResolver, Fields};
pub use heap_graph::HeapGraph;
pub use java_string::JAVA_LANG_STRING;
pub use render::{ValueRenderer, PRIMITIVE_ARRAY_LABEL, UNRESOLVED};
pub use search::search_classes;
pub use snapshot::{HeapSnapshot, SnapshotSummary};
pub use value::HeapValue;
