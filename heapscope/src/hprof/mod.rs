//! # HPROF Record Layer
//!
//! Reads the subset of the HPROF format needed to explore a heap: the
//! string table, class-name bindings and the four object sub-records of the
//! heap dump. Everything else (stack traces, roots, GC metadata) is skipped
//! by length.
//!
//! ## Module Structure
//!
//! - **`reader`**: bounds-checked big-endian cursor and header parsing
//! - **`records`**: record types and the point-lookup decoder
//!   [`decode_object`]
//! - **`scanner`**: [`RecordScanner`], one forward pass feeding a
//!   [`RecordVisitor`]
//! - **`writer`**: [`HprofWriter`], builds fixture dumps
//!
//! ## Two Access Paths
//!
//! ```text
//! open:    RecordScanner::scan ──▶ visitor records (id → offset)
//! lookup:  decode_object(data, offset) ──▶ ObjectRecord
//! ```
//!
//! The scan is the only operation that touches the whole file; lookups decode
//! exactly one sub-record.

pub mod reader;
pub mod records;
pub mod scanner;
pub mod writer;

pub use reader::{parse_header, ByteReader, HprofHeader};
pub use records::{
    decode_object, ClassDumpRecord, FieldSpec, InstanceDumpRecord, LoadClassRecord,
    ObjectArrayDumpRecord, ObjectRecord, PrimitiveArrayDumpRecord, StringRecord,
};
pub use scanner::{RecordScanner, RecordVisitor, ScanStats};
pub use writer::HprofWriter;
