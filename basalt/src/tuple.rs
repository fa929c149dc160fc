use std::fmt;

use crate::error::{DbError, DbResult};
use crate::RecordId;

/// Fixed width of a serialized text field payload.
pub const TEXT_LEN: usize = 128;

/// The type of a tuple field. Every type serializes to a fixed number
/// of bytes so that tuples of one schema are all the same size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// Serialized size of a field of this type in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => 4 + TEXT_LEN,
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Text(_) => FieldType::Text,
        }
    }

    /// Writes the field into `buf`, which must be exactly
    /// `field_type().byte_size()` bytes. Ints are big-endian; text is a
    /// big-endian length prefix followed by a zero-padded fixed buffer.
    fn write_to(&self, buf: &mut [u8]) {
        match self {
            Field::Int(v) => buf.copy_from_slice(&v.to_be_bytes()),
            Field::Text(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(TEXT_LEN);
                buf[0..4].copy_from_slice(&(len as u32).to_be_bytes());
                buf[4..4 + len].copy_from_slice(&bytes[..len]);
                for b in &mut buf[4 + len..] {
                    *b = 0;
                }
            }
        }
    }

    fn read_from(ftype: FieldType, buf: &[u8]) -> Field {
        match ftype {
            FieldType::Int => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&buf[0..4]);
                Field::Int(i32::from_be_bytes(raw))
            }
            FieldType::Text => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&buf[0..4]);
                let len = (u32::from_be_bytes(raw) as usize).min(TEXT_LEN);
                let s = String::from_utf8_lossy(&buf[4..4 + len]).into_owned();
                Field::Text(s)
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{v}"),
            Field::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Describes the schema of a tuple: an ordered list of field types with
/// optional field names.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<FieldType>,
    names: Vec<Option<String>>,
}

impl TupleDesc {
    pub fn new(types: Vec<FieldType>, names: Vec<Option<String>>) -> Self {
        assert_eq!(types.len(), names.len());
        assert!(!types.is_empty());
        TupleDesc { types, names }
    }

    /// A descriptor with anonymous fields.
    pub fn unnamed(types: Vec<FieldType>) -> Self {
        let names = vec![None; types.len()];
        TupleDesc::new(types, names)
    }

    /// Merges two descriptors: all of `a`'s fields followed by `b`'s.
    pub fn combine(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut types = a.types.clone();
        types.extend(b.types.iter().copied());
        let mut names = a.names.clone();
        names.extend(b.names.iter().cloned());
        TupleDesc { types, names }
    }

    pub fn num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn field_type(&self, i: usize) -> FieldType {
        self.types[i]
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.names[i].as_deref()
    }

    /// Index of the first field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }

    /// Serialized size of one tuple of this schema in bytes.
    pub fn byte_size(&self) -> usize {
        self.types.iter().map(|t| t.byte_size()).sum()
    }
}

/// Two descriptors are equal when their type sequences are equal; field
/// names do not participate.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}

impl Eq for TupleDesc {}

/// One row: field values plus the schema they conform to, and the slot
/// the row lives in once it has been stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> DbResult<Tuple> {
        if fields.len() != desc.num_fields() {
            return Err(DbError::invalid(format!(
                "tuple has {} fields, schema expects {}",
                fields.len(),
                desc.num_fields()
            )));
        }
        for (i, f) in fields.iter().enumerate() {
            if f.field_type() != desc.field_type(i) {
                return Err(DbError::invalid(format!(
                    "field {} has type {:?}, schema expects {:?}",
                    i,
                    f.field_type(),
                    desc.field_type(i)
                )));
            }
        }
        Ok(Tuple {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    /// Serializes the tuple into `buf`, which must be exactly
    /// `desc().byte_size()` bytes.
    pub fn write_bytes(&self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), self.desc.byte_size());
        let mut offset = 0;
        for field in &self.fields {
            let size = field.field_type().byte_size();
            field.write_to(&mut buf[offset..offset + size]);
            offset += size;
        }
    }

    /// Reads a tuple of the given schema out of `buf`.
    pub fn from_bytes(desc: &TupleDesc, buf: &[u8]) -> Tuple {
        debug_assert_eq!(buf.len(), desc.byte_size());
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for i in 0..desc.num_fields() {
            let ftype = desc.field_type(i);
            let size = ftype.byte_size();
            fields.push(Field::read_from(ftype, &buf[offset..offset + size]));
            offset += size;
        }
        Tuple {
            desc: desc.clone(),
            fields,
            record_id: None,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}
