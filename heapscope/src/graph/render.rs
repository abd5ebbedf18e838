//! One-line text for field values
//!
//! Rendering never fails: a reference that cannot be followed shows as
//! [`UNRESOLVED`] and the listing carries on.

use log::debug;

use super::entity::{HeapEntity, InstanceEntity};
use super::heap_graph::HeapGraph;
use super::java_string::JAVA_LANG_STRING;
use super::value::HeapValue;
use crate::domain::ObjectId;

/// Placeholder for anything that cannot be looked up
pub const UNRESOLVED: &str = "<unresolved>";

/// Shown for primitive array references, whose contents are not rendered
pub const PRIMITIVE_ARRAY_LABEL: &str = "primitive array";

/// Renders values of one heap graph
#[derive(Clone, Copy)]
pub struct ValueRenderer<'g> {
    graph: &'g HeapGraph,
}

impl<'g> ValueRenderer<'g> {
    #[must_use]
    pub fn new(graph: &'g HeapGraph) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn render(&self, value: &HeapValue) -> String {
        match *value {
            HeapValue::Boolean(v) => v.to_string(),
            HeapValue::Byte(v) => v.to_string(),
            HeapValue::Char(v) => render_char(v),
            HeapValue::Short(v) => v.to_string(),
            HeapValue::Int(v) => v.to_string(),
            HeapValue::Long(v) => v.to_string(),
            HeapValue::Float(v) => render_float(f64::from(v), || format!("{v:?}")),
            HeapValue::Double(v) => render_float(v, || format!("{v:?}")),
            HeapValue::Reference(None) => "null".to_string(),
            HeapValue::Reference(Some(id)) => self.render_reference(id),
        }
    }

    fn render_reference(&self, id: ObjectId) -> String {
        match self.graph.resolve(id) {
            Ok(HeapEntity::Instance(instance)) => self.render_instance(&instance),
            Ok(HeapEntity::Class(class)) => class.name,
            Ok(HeapEntity::ObjectArray(array)) => array.class_name,
            Ok(HeapEntity::PrimitiveArray(_)) => PRIMITIVE_ARRAY_LABEL.to_string(),
            Err(err) => {
                debug!("Cannot render reference {id}: {err}");
                UNRESOLVED.to_string()
            }
        }
    }

    fn render_instance(&self, instance: &InstanceEntity) -> String {
        let class_name = match self.graph.class_name_of(instance.class_id) {
            Ok(name) => name,
            Err(err) => {
                debug!("Class of instance {} unavailable: {err}", instance.id);
                UNRESOLVED.to_string()
            }
        };

        if class_name == JAVA_LANG_STRING {
            match self.graph.read_java_string(instance) {
                Ok(text) => return format!("\"{text}\""),
                Err(err) => debug!("String {} not decodable: {err}", instance.id),
            }
        }
        format!("{class_name}@{}", instance.id)
    }
}

/// The UTF-16 unit as a character; lone surrogates have no character of
/// their own
fn render_char(unit: u16) -> String {
    char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER).to_string()
}

/// Java spelling of the non-finite values, `Debug` output otherwise
///
/// Finite values keep Rust's shortest round-trip digits rather than Java's
/// `Float.toString` form: `1e10f32` prints as `10000000000.0`, not
/// `1.0E10`. The digits are exact either way.
fn render_float(value: f64, finite: impl FnOnce() -> String) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdSize;
    use crate::hprof::HprofWriter;
    use heapscope_common::{BasicType, PrimitiveType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Fixture {
        _file: NamedTempFile,
        graph: HeapGraph,
        leak_class: ObjectId,
        leak: ObjectId,
        text: ObjectId,
        array: ObjectId,
        ints: ObjectId,
        empty_text: ObjectId,
        hollow_text: ObjectId,
    }

    fn fixture() -> Fixture {
        let mut writer = HprofWriter::new(IdSize::Eight);
        let object = writer.class("java.lang.Object", None, &[]);
        let string = writer.string_class(object);
        let leak_class = writer.class(
            "com.example.Leak",
            Some(object),
            &[("size", BasicType::Primitive(PrimitiveType::Int))],
        );
        let array_class = writer.class("[Ljava/lang/Object;", Some(object), &[]);
        let leak = writer.instance(leak_class, &[HeapValue::Int(1)]);
        let text = writer.java_string(string, "say \"hi\"");
        let array = writer.object_array(array_class, &[Some(leak)]);
        let ints = writer.primitive_array(PrimitiveType::Int, &[0, 0, 0, 1]);
        let empty_text = writer.instance(string, &[HeapValue::Reference(None), HeapValue::Int(0)]);
        let hollow = writer.primitive_array_nodata(PrimitiveType::Char, 4);
        let hollow_text =
            writer.instance(string, &[HeapValue::Reference(Some(hollow)), HeapValue::Int(0)]);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&writer.into_bytes()).unwrap();
        let graph = HeapGraph::open(file.path()).unwrap();
        Fixture { _file: file, graph, leak_class, leak, text, array, ints, empty_text, hollow_text }
    }

    fn reference(id: ObjectId) -> HeapValue {
        HeapValue::Reference(Some(id))
    }

    #[test]
    fn test_primitives() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(renderer.render(&HeapValue::Boolean(true)), "true");
        assert_eq!(renderer.render(&HeapValue::Byte(-3)), "-3");
        assert_eq!(renderer.render(&HeapValue::Char(u16::from(b'x'))), "x");
        assert_eq!(renderer.render(&HeapValue::Char(0xD800)), "\u{FFFD}");
        assert_eq!(renderer.render(&HeapValue::Long(-9_000_000_000)), "-9000000000");
        assert_eq!(renderer.render(&HeapValue::Float(1.5)), "1.5");
        assert_eq!(renderer.render(&HeapValue::Double(2.0)), "2.0");
        assert_eq!(renderer.render(&HeapValue::Double(f64::NAN)), "NaN");
        assert_eq!(renderer.render(&HeapValue::Float(f32::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn test_references_by_target_kind() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(renderer.render(&HeapValue::Reference(None)), "null");
        assert_eq!(renderer.render(&reference(f.leak)), format!("com.example.Leak@{}", f.leak));
        assert_eq!(renderer.render(&reference(f.leak_class)), "com.example.Leak");
        assert_eq!(renderer.render(&reference(f.array)), "java.lang.Object[]");
        assert_eq!(renderer.render(&reference(f.ints)), PRIMITIVE_ARRAY_LABEL);
    }

    #[test]
    fn test_strings_are_quoted_without_escaping() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(renderer.render(&reference(f.text)), "\"say \"hi\"\"");
    }

    #[test]
    fn test_dangling_reference_renders_placeholder() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(renderer.render(&reference(ObjectId(123_456))), UNRESOLVED);
    }

    #[test]
    fn test_undecodable_string_falls_back_to_class_and_id() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(
            renderer.render(&reference(f.empty_text)),
            format!("java.lang.String@{}", f.empty_text)
        );
        assert_eq!(
            renderer.render(&reference(f.hollow_text)),
            format!("java.lang.String@{}", f.hollow_text)
        );
    }

    #[test]
    fn test_large_float_keeps_rust_digits() {
        let f = fixture();
        let renderer = ValueRenderer::new(&f.graph);
        assert_eq!(renderer.render(&HeapValue::Float(1e10)), "10000000000.0");
        assert_eq!(renderer.render(&HeapValue::Double(f64::INFINITY)), "Infinity");
    }
}
