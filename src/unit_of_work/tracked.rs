use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use crate::core::OrmResult;
use crate::entity::{Entity, EntityId, EntityKey, Model, Shared};

/// Lifecycle state of a tracked entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EntityState {
    #[default]
    Clean,
    Update,
    Add,
    Delete,
}

impl EntityState {
    /// Add and Delete are set by the caller and never relabelled by change detection.
    pub fn is_explicit(&self) -> bool {
        matches!(self, EntityState::Add | EntityState::Delete)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityState::Clean => write!(f, "Clean"),
            EntityState::Update => write!(f, "Update"),
            EntityState::Add => write!(f, "Add"),
            EntityState::Delete => write!(f, "Delete"),
        }
    }
}

/// Bookkeeping for one entity: state, changed fields and commit ordering index.
pub struct TrackedEntity {
    entity: Arc<RwLock<dyn Entity>>,
    handle: Arc<dyn Any + Send + Sync>,
    key: EntityKey,
    type_name: &'static str,
    state: EntityState,
    dirty_fields: BTreeSet<String>,
    index: u64,
}

impl TrackedEntity {
    pub(crate) fn new<M: Model>(entity: &Shared<M>) -> OrmResult<Self> {
        let id = entity.read()?.id();
        let dynamic: Arc<RwLock<dyn Entity>> = entity.clone();
        let handle: Arc<dyn Any + Send + Sync> = entity.clone();
        Ok(Self {
            entity: dynamic,
            handle,
            key: EntityKey {
                id,
                type_id: TypeId::of::<M>(),
            },
            type_name: M::TABLE,
            state: EntityState::Clean,
            dirty_fields: BTreeSet::new(),
            index: 0,
        })
    }

    pub fn entity(&self) -> &Arc<RwLock<dyn Entity>> {
        &self.entity
    }

    /// The typed handle, if this record tracks an `M`.
    pub fn downcast<M: Model>(&self) -> Option<Shared<M>> {
        Arc::clone(&self.handle).downcast::<RwLock<M>>().ok()
    }

    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn id(&self) -> EntityId {
        self.key.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn dirty_fields(&self) -> &BTreeSet<String> {
        &self.dirty_fields
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub(crate) fn mark(&mut self, state: EntityState, index: u64) {
        self.state = state;
        self.index = index;
    }

    pub(crate) fn mark_dirty(&mut self, fields: Vec<&'static str>) {
        if fields.is_empty() {
            return;
        }
        self.dirty_fields.extend(fields.into_iter().map(String::from));
        self.state = EntityState::Update;
    }

    pub(crate) fn reset(&mut self) {
        self.state = EntityState::Clean;
        self.dirty_fields.clear();
        self.index = 0;
    }
}

impl fmt::Debug for TrackedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedEntity")
            .field("type_name", &self.type_name)
            .field("id", &self.key.id)
            .field("state", &self.state)
            .field("dirty_fields", &self.dirty_fields)
            .field("index", &self.index)
            .finish()
    }
}
