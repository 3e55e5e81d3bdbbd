use std::borrow::Cow;
use thiserror::Error;
use uuid::Uuid;
use crate::core::Value;
use super::EntityId;

/// Name of the identifier field and column.
pub const ID_FIELD: &str = "Id";

/// Suffix appended to a reference field's name to form its foreign-key column.
pub const REFERENCE_SUFFIX: &str = "Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    /// Field holding another entity; persisted as that entity's identifier.
    Reference { target: &'static str },
}

/// Type-erased description of one persistable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldMeta {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub fn is_identifier(&self) -> bool {
        self.name == ID_FIELD
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    /// Column this field is stored under: `<Name>Id` for references, the name otherwise.
    pub fn column_name(&self) -> Cow<'static, str> {
        match self.kind {
            FieldKind::Scalar => Cow::Borrowed(self.name),
            FieldKind::Reference { .. } => Cow::Owned(format!("{}{}", self.name, REFERENCE_SUFFIX)),
        }
    }
}

/// Raised when a stored value cannot be turned back into a field's Rust type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, got {found}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ConversionError {
    pub fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// One row of a model's descriptor table: metadata plus accessors.
pub struct Field<M> {
    pub meta: FieldMeta,
    pub get: fn(&M) -> Value,
    pub set: fn(&mut M, Value) -> Result<(), ConversionError>,
}

impl<M> std::fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("meta", &self.meta).finish()
    }
}

/// Rust types that can live in an entity field.
pub trait FieldType: Sized {
    const KIND: FieldKind = FieldKind::Scalar;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FieldType for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ConversionError::new("TEXT", &other)),
        }
    }
}

impl FieldType for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(ConversionError::new("INTEGER", &other)),
        }
    }
}

impl FieldType for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Integer(i) => {
                i32::try_from(i).map_err(|_| ConversionError::new("32-bit INTEGER", &Value::Integer(i)))
            }
            other => Err(ConversionError::new("INTEGER", &other)),
        }
    }
}

impl FieldType for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value
            .as_f64()
            .ok_or_else(|| ConversionError::new("FLOAT", &value))
    }
}

impl FieldType for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value
            .as_bool()
            .ok_or_else(|| ConversionError::new("BOOLEAN", &value))
    }
}

impl FieldType for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value
            .as_uuid()
            .ok_or_else(|| ConversionError::new("UUID", &value))
    }
}

impl FieldType for EntityId {
    fn to_value(&self) -> Value {
        Value::Uuid(self.as_uuid())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Uuid::from_value(value).map(EntityId::from_uuid)
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref().map(T::to_value).unwrap_or(Value::Null)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}
