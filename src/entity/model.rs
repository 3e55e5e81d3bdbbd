use std::any::{Any, TypeId};
use std::fmt;
use crate::core::{OrmError, OrmResult, Value};
use super::{EntityId, Field, FieldMeta};

/// A persistable record type with a compile-time field descriptor table.
///
/// Usually generated by [`entity!`](crate::entity!); implement it by hand for types the
/// macro cannot express.
pub trait Model: Clone + fmt::Debug + Send + Sync + 'static {
    /// Table name, equal to the simple type name.
    const TABLE: &'static str;

    fn fields() -> &'static [Field<Self>];

    fn id(&self) -> EntityId;

    /// Factory for an instance that carries only `id`, every other field defaulted.
    fn with_id(id: EntityId) -> Self;

    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|field| field.meta.name == name)
    }
}

/// Identity of a tracked entity: identifier plus concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub id: EntityId,
    pub type_id: TypeId,
}

impl EntityKey {
    pub fn of(entity: &dyn Entity) -> Self {
        Self {
            id: entity.entity_id(),
            type_id: Any::type_id(entity.as_any()),
        }
    }
}

/// Object-safe view over any [`Model`], used wherever entities of different types are
/// handled together.
pub trait Entity: Any + Send + Sync + fmt::Debug {
    fn entity_id(&self) -> EntityId;

    fn type_name(&self) -> &'static str;

    fn field_metas(&self) -> Vec<FieldMeta>;

    fn value_of(&self, field: &str) -> OrmResult<Value>;

    fn assign(&mut self, field: &str, value: Value) -> OrmResult<()>;

    /// Field-wise copy; referenced entities are shared, not duplicated.
    fn shallow_clone(&self) -> Box<dyn Entity>;

    fn as_any(&self) -> &dyn Any;

    /// Same identifier and same concrete type. Reference equality is never used.
    fn is_equal(&self, other: &dyn Entity) -> bool {
        EntityKey::of(self.as_dyn()) == EntityKey::of(other)
    }

    fn as_dyn(&self) -> &dyn Entity;
}

impl<M: Model> Entity for M {
    fn entity_id(&self) -> EntityId {
        Model::id(self)
    }

    fn type_name(&self) -> &'static str {
        M::TABLE
    }

    fn field_metas(&self) -> Vec<FieldMeta> {
        M::fields().iter().map(|field| field.meta).collect()
    }

    fn value_of(&self, field: &str) -> OrmResult<Value> {
        let field = M::field(field).ok_or_else(|| missing_field(M::TABLE, field))?;
        Ok((field.get)(self))
    }

    fn assign(&mut self, field: &str, value: Value) -> OrmResult<()> {
        let descriptor = M::field(field).ok_or_else(|| missing_field(M::TABLE, field))?;
        (descriptor.set)(self, value).map_err(|err| {
            OrmError::SchemaMismatch(format!("{}.{}: {}", M::TABLE, descriptor.meta.name, err))
        })
    }

    fn shallow_clone(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_dyn(&self) -> &dyn Entity {
        self
    }
}

pub(crate) fn missing_field(table: &str, field: &str) -> OrmError {
    OrmError::SchemaMismatch(format!("Field '{}' not found in {}", field, table))
}

/// Names of the non-identifier fields whose values differ between two versions of an
/// entity.
pub fn changed_fields(current: &dyn Entity, snapshot: &dyn Entity) -> OrmResult<Vec<&'static str>> {
    let mut changed = Vec::new();
    for meta in current.field_metas() {
        if meta.is_identifier() {
            continue;
        }
        if current.value_of(meta.name)? != snapshot.value_of(meta.name)? {
            changed.push(meta.name);
        }
    }
    Ok(changed)
}
