use std::fmt;
use std::sync::{Arc, RwLock};
use crate::core::Value;
use super::{ConversionError, EntityId, FieldKind, FieldType, Model};

/// Shared, mutable handle to an entity.
///
/// Callers and the unit of work hold clones of the same handle, so edits made through
/// one are observed by the other.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(entity: T) -> Shared<T> {
    Arc::new(RwLock::new(entity))
}

/// Field value pointing at another entity.
///
/// Cloning shares the target; the referenced entity is never deep-copied. The target's
/// identifier is captured on construction since identifiers never change.
pub struct Reference<T> {
    target: Option<(EntityId, Shared<T>)>,
}

impl<T: Model> Reference<T> {
    pub const fn none() -> Self {
        Self { target: None }
    }

    pub fn to(entity: &Shared<T>) -> Self {
        let id = match entity.read() {
            Ok(guard) => guard.id(),
            Err(poisoned) => poisoned.into_inner().id(),
        };
        Self {
            target: Some((id, Arc::clone(entity))),
        }
    }

    pub fn new(entity: T) -> Self {
        let id = entity.id();
        Self {
            target: Some((id, super::shared(entity))),
        }
    }

    /// Stand-in target carrying only the identifier, as produced when reading rows back.
    pub fn stub(id: EntityId) -> Self {
        Self::new(T::with_id(id))
    }

    pub fn id(&self) -> Option<EntityId> {
        self.target.as_ref().map(|(id, _)| *id)
    }

    pub fn get(&self) -> Option<&Shared<T>> {
        self.target.as_ref().map(|(_, entity)| entity)
    }

    pub fn is_none(&self) -> bool {
        self.target.is_none()
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self {
            target: self
                .target
                .as_ref()
                .map(|(id, entity)| (*id, Arc::clone(entity))),
        }
    }
}

impl<T: Model> Default for Reference<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T: Model> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "Reference<{}>({})", T::TABLE, id),
            None => write!(f, "Reference<{}>(none)", T::TABLE),
        }
    }
}

impl<T: Model> From<&Shared<T>> for Reference<T> {
    fn from(entity: &Shared<T>) -> Self {
        Self::to(entity)
    }
}

impl<T: Model> FieldType for Reference<T> {
    const KIND: FieldKind = FieldKind::Reference { target: T::TABLE };

    fn to_value(&self) -> Value {
        self.id()
            .map(|id| Value::Uuid(id.as_uuid()))
            .unwrap_or(Value::Null)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(Self::none());
        }
        value
            .as_uuid()
            .map(|uuid| Self::stub(EntityId::from_uuid(uuid)))
            .ok_or_else(|| ConversionError::new("UUID reference", &value))
    }
}
