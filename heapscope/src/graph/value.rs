//! Decoded field and array values

use heapscope_common::{BasicType, PrimitiveType};

use crate::domain::{IdSize, ObjectId, Result};
use crate::hprof::ByteReader;

/// A value read from an instance field
///
/// The variant is fixed by the declared field type when the value is decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeapValue {
    Boolean(bool),
    Byte(i8),
    /// UTF-16 code unit
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// `None` is the null reference
    Reference(Option<ObjectId>),
}

impl HeapValue {
    /// Decode one value of type `ty`
    ///
    /// # Errors
    /// Returns `Malformed` if the reader runs out of bytes
    pub fn read(ty: BasicType, reader: &mut ByteReader<'_>) -> Result<HeapValue> {
        let value = match ty {
            BasicType::Object => HeapValue::Reference(reader.id()?.non_null()),
            BasicType::Primitive(p) => match p {
                PrimitiveType::Boolean => HeapValue::Boolean(reader.u8()? != 0),
                PrimitiveType::Byte => HeapValue::Byte(reader.i8()?),
                PrimitiveType::Char => HeapValue::Char(reader.u16()?),
                PrimitiveType::Short => HeapValue::Short(reader.i16()?),
                PrimitiveType::Int => HeapValue::Int(reader.i32()?),
                PrimitiveType::Long => HeapValue::Long(reader.i64()?),
                PrimitiveType::Float => HeapValue::Float(reader.f32()?),
                PrimitiveType::Double => HeapValue::Double(reader.f64()?),
            },
        };
        Ok(value)
    }

    #[must_use]
    pub fn basic_type(&self) -> BasicType {
        let primitive = match self {
            HeapValue::Reference(_) => return BasicType::Object,
            HeapValue::Boolean(_) => PrimitiveType::Boolean,
            HeapValue::Byte(_) => PrimitiveType::Byte,
            HeapValue::Char(_) => PrimitiveType::Char,
            HeapValue::Short(_) => PrimitiveType::Short,
            HeapValue::Int(_) => PrimitiveType::Int,
            HeapValue::Long(_) => PrimitiveType::Long,
            HeapValue::Float(_) => PrimitiveType::Float,
            HeapValue::Double(_) => PrimitiveType::Double,
        };
        BasicType::Primitive(primitive)
    }

    /// Target of a non-null reference
    #[must_use]
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            HeapValue::Reference(target) => *target,
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null_reference(&self) -> bool {
        matches!(self, HeapValue::Reference(None))
    }

    /// Integral value widened to `i64`, for length/offset style fields
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            HeapValue::Byte(v) => Some(i64::from(v)),
            HeapValue::Short(v) => Some(i64::from(v)),
            HeapValue::Char(v) => Some(i64::from(v)),
            HeapValue::Int(v) => Some(i64::from(v)),
            HeapValue::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Append the big-endian encoding, as stored in instance field bytes
    pub(crate) fn encode(&self, id_size: IdSize, out: &mut Vec<u8>) {
        match *self {
            HeapValue::Boolean(v) => out.push(u8::from(v)),
            HeapValue::Byte(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Char(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            HeapValue::Reference(target) => {
                crate::hprof::writer::put_id(id_size, out, target.unwrap_or(ObjectId::NULL));
            }
        }
    }
}
