//! Entity model: identity, field descriptor tables and the object-safe entity view.

mod field;
mod id;
mod model;
mod reference;

pub use field::{ConversionError, Field, FieldKind, FieldMeta, FieldType, ID_FIELD, REFERENCE_SUFFIX};
pub use id::EntityId;
pub use model::{Entity, EntityKey, Model, changed_fields};
pub use reference::{Reference, Shared, shared};

pub(crate) use model::missing_field;
